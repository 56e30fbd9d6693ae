//! Harvest records backing the harvest report

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::entities::{harvests, prelude::*};
use crate::error::ServiceError;
use crate::models::harvest::{CreateHarvestRequest, HarvestPage, HarvestResponse};
use crate::models::price::MAX_LIMIT;
use crate::models::report::DateRange;
use crate::services::cache::{self, keys, Cache};

/// Live harvests of a land commodity inside `range`, ordered by harvest date
pub async fn load_harvests_between<C: ConnectionTrait>(
    conn: &C,
    land_commodity_id: Uuid,
    range: DateRange,
) -> Result<Vec<harvests::Model>, DbErr> {
    Harvests::find()
        .filter(harvests::Column::LandCommodityId.eq(land_commodity_id))
        .filter(harvests::Column::DeletedAt.is_null())
        .filter(harvests::Column::HarvestDate.between(range.start_date, range.end_date))
        .order_by_asc(harvests::Column::HarvestDate)
        .order_by_asc(harvests::Column::CreatedAt)
        .all(conn)
        .await
}

#[derive(Clone)]
pub struct HarvestService {
    db: DatabaseConnection,
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl HarvestService {
    pub fn new(db: DatabaseConnection, cache: Arc<dyn Cache>, cache_config: &CacheConfig) -> Self {
        Self {
            db,
            cache,
            ttl: cache_config.default_ttl,
        }
    }

    pub async fn create_harvest(
        &self,
        request: CreateHarvestRequest,
    ) -> Result<HarvestResponse, ServiceError> {
        request.validate().map_err(ServiceError::Validation)?;

        let now = Utc::now().fixed_offset();
        let created = harvests::ActiveModel {
            id: Set(Uuid::new_v4()),
            land_commodity_id: Set(request.land_commodity_id),
            harvest_date: Set(request.harvest_date),
            quantity: Set(request.quantity),
            unit: Set(request.unit.trim().to_string()),
            notes: Set(request.notes),
            created_at: Set(now),
            updated_at: Set(now),
            deleted_at: Set(None),
        }
        .insert(&self.db)
        .await?;

        info!(
            harvest_id = %created.id,
            land_commodity_id = %created.land_commodity_id,
            "Harvest created"
        );

        self.invalidate().await?;
        Ok(HarvestResponse::from(created))
    }

    /// Soft delete
    pub async fn delete_harvest(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = Harvests::find_by_id(id)
            .filter(harvests::Column::DeletedAt.is_null())
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("harvest {}", id)))?;

        let now = Utc::now().fixed_offset();
        let mut active: harvests::ActiveModel = existing.into();
        active.deleted_at = Set(Some(now));
        active.updated_at = Set(now);
        active.update(&self.db).await?;

        info!(harvest_id = %id, "Harvest deleted");

        self.invalidate().await
    }

    pub async fn list_harvests(
        &self,
        land_commodity_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<HarvestPage, ServiceError> {
        if page == 0 || limit == 0 || limit > MAX_LIMIT {
            return Err(ServiceError::Validation(format!(
                "page must be at least 1 and limit between 1 and {}",
                MAX_LIMIT
            )));
        }

        let key = keys::harvest_list(land_commodity_id, page, limit);
        match cache::get_json::<HarvestPage>(self.cache.as_ref(), &key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(key = %key, error = %e, "Cache read failed, using database"),
        }

        let paginator = Harvests::find()
            .filter(harvests::Column::LandCommodityId.eq(land_commodity_id))
            .filter(harvests::Column::DeletedAt.is_null())
            .order_by_desc(harvests::Column::HarvestDate)
            .paginate(&self.db, limit);

        let total = paginator.num_items().await?;
        let data = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(HarvestResponse::from)
            .collect();

        let result = HarvestPage {
            data,
            page,
            limit,
            total,
        };

        if let Err(e) = cache::set_json(self.cache.as_ref(), &key, &result, self.ttl).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
        Ok(result)
    }

    async fn invalidate(&self) -> Result<(), ServiceError> {
        match self.cache.delete_by_pattern(keys::HARVEST_PREFIX).await {
            Ok(removed) => {
                debug!(removed, "Invalidated harvest cache");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Harvest write committed but cache invalidation failed");
                Err(ServiceError::CacheInvalidation {
                    entity: "harvest",
                    source: e,
                })
            }
        }
    }
}
