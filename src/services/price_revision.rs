//! Price Revision Engine
//!
//! Every price update snapshots the superseded value into `price_histories`
//! and applies the new value in the same transaction. Writes invalidate all
//! `price*` cache entries once the transaction has committed.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::CacheConfig;
use crate::entities::{price_histories, prices, prelude::*};
use crate::error::ServiceError;
use crate::models::price::{PricePage, PriceResponse, PriceSnapshot, MAX_LIMIT};
use crate::services::cache::{self, keys, Cache};
use crate::services::unit_of_work::atomically;

/// Rows behind a price history read, before merging
#[derive(Debug, Clone)]
pub struct PriceHistoryRows {
    /// Superseded snapshots, oldest first
    pub history: Vec<price_histories::Model>,
    /// The live price, if any
    pub current: Option<prices::Model>,
}

impl PriceHistoryRows {
    /// History followed by the live price
    pub fn into_snapshots(self) -> Vec<PriceSnapshot> {
        let mut snapshots: Vec<PriceSnapshot> =
            self.history.into_iter().map(PriceSnapshot::from).collect();
        if let Some(current) = self.current {
            snapshots.push(PriceSnapshot::from(current));
        }
        snapshots
    }
}

/// Uncached read of the history and live price of a (commodity, location) pair.
/// Also used by the report worker, which must see the primary store.
pub async fn load_price_history<C: ConnectionTrait>(
    conn: &C,
    commodity_id: Uuid,
    location_id: Uuid,
) -> Result<PriceHistoryRows, DbErr> {
    let history = PriceHistories::find()
        .filter(price_histories::Column::CommodityId.eq(commodity_id))
        .filter(price_histories::Column::LocationId.eq(location_id))
        .order_by_asc(price_histories::Column::Id)
        .all(conn)
        .await?;

    let current = find_live_for_pair(conn, commodity_id, location_id).await?;

    Ok(PriceHistoryRows { history, current })
}

async fn find_live_for_pair<C: ConnectionTrait>(
    conn: &C,
    commodity_id: Uuid,
    location_id: Uuid,
) -> Result<Option<prices::Model>, DbErr> {
    Prices::find()
        .filter(prices::Column::CommodityId.eq(commodity_id))
        .filter(prices::Column::LocationId.eq(location_id))
        .filter(prices::Column::DeletedAt.is_null())
        .one(conn)
        .await
}

async fn find_live_price<C: ConnectionTrait>(conn: &C, id: Uuid) -> Result<prices::Model, ServiceError> {
    Prices::find_by_id(id)
        .filter(prices::Column::DeletedAt.is_null())
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("price {}", id)))
}

fn validate_value(value: Decimal) -> Result<(), ServiceError> {
    if value.is_sign_negative() {
        return Err(ServiceError::Validation(
            "price value must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn pair_conflict(commodity_id: Uuid, location_id: Uuid) -> ServiceError {
    ServiceError::AlreadyExists(format!(
        "price for commodity {} at location {}",
        commodity_id, location_id
    ))
}

#[derive(Clone)]
pub struct PriceService {
    db: DatabaseConnection,
    cache: Arc<dyn Cache>,
    default_ttl: Duration,
    history_ttl: Duration,
}

impl PriceService {
    pub fn new(db: DatabaseConnection, cache: Arc<dyn Cache>, cache_config: &CacheConfig) -> Self {
        Self {
            db,
            cache,
            default_ttl: cache_config.default_ttl,
            history_ttl: cache_config.price_history_ttl,
        }
    }

    /// Revises a price: archives the current value, then applies `new_value`.
    ///
    /// The archive row copies the superseded price's own timestamps. Either
    /// both writes commit or neither does. A
    /// [`ServiceError::CacheInvalidation`] means the update is committed.
    pub async fn update_price(
        &self,
        id: Uuid,
        new_value: Decimal,
    ) -> Result<prices::Model, ServiceError> {
        validate_value(new_value)?;

        let updated = atomically(&self.db, move |txn| {
            Box::pin(async move {
                let existing = find_live_price(txn, id).await?;
                let previous_value = existing.value;
                let now = Utc::now().fixed_offset();

                price_histories::ActiveModel {
                    price_id: Set(existing.id),
                    commodity_id: Set(existing.commodity_id),
                    location_id: Set(existing.location_id),
                    value: Set(existing.value),
                    created_at: Set(existing.created_at),
                    updated_at: Set(existing.updated_at),
                    archived_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?;

                let mut active: prices::ActiveModel = existing.into();
                active.value = Set(new_value);
                active.updated_at = Set(now);
                active.update(txn).await?;

                debug!(
                    price_id = %id,
                    previous_value = %previous_value,
                    new_value = %new_value,
                    "Archived previous price"
                );

                find_live_price(txn, id).await
            })
        })
        .await
        .map_err(|e| {
            if !e.is_not_found() {
                error!(price_id = %id, error = %e, "Price revision rolled back");
            }
            e
        })?;

        info!(price_id = %id, value = %updated.value, "Price updated");

        self.invalidate().await?;
        Ok(updated)
    }

    pub async fn create_price(
        &self,
        commodity_id: Uuid,
        location_id: Uuid,
        value: Decimal,
    ) -> Result<prices::Model, ServiceError> {
        validate_value(value)?;

        let created = atomically(&self.db, move |txn| {
            Box::pin(async move {
                if find_live_for_pair(txn, commodity_id, location_id).await?.is_some() {
                    return Err(pair_conflict(commodity_id, location_id));
                }

                let now = Utc::now().fixed_offset();
                let created = prices::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    commodity_id: Set(commodity_id),
                    location_id: Set(location_id),
                    value: Set(value),
                    created_at: Set(now),
                    updated_at: Set(now),
                    deleted_at: Set(None),
                }
                .insert(txn)
                .await?;

                Ok(created)
            })
        })
        .await?;

        info!(
            price_id = %created.id,
            commodity_id = %commodity_id,
            location_id = %location_id,
            "Price created"
        );

        self.invalidate().await?;
        Ok(created)
    }

    /// Soft delete
    pub async fn delete_price(&self, id: Uuid) -> Result<(), ServiceError> {
        atomically(&self.db, move |txn| {
            Box::pin(async move {
                let existing = find_live_price(txn, id).await?;
                let now = Utc::now().fixed_offset();

                let mut active: prices::ActiveModel = existing.into();
                active.deleted_at = Set(Some(now));
                active.updated_at = Set(now);
                active.update(txn).await?;

                Ok::<_, ServiceError>(())
            })
        })
        .await?;

        info!(price_id = %id, "Price deleted");

        self.invalidate().await
    }

    pub async fn restore_price(&self, id: Uuid) -> Result<prices::Model, ServiceError> {
        let restored = atomically(&self.db, move |txn| {
            Box::pin(async move {
                let deleted = Prices::find_by_id(id)
                    .filter(prices::Column::DeletedAt.is_not_null())
                    .one(txn)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound(format!("deleted price {}", id)))?;

                if find_live_for_pair(txn, deleted.commodity_id, deleted.location_id)
                    .await?
                    .is_some()
                {
                    return Err(pair_conflict(deleted.commodity_id, deleted.location_id));
                }

                let mut active: prices::ActiveModel = deleted.into();
                active.deleted_at = Set(None);
                active.updated_at = Set(Utc::now().fixed_offset());
                let restored = active.update(txn).await?;

                Ok(restored)
            })
        })
        .await?;

        info!(price_id = %id, "Price restored");

        self.invalidate().await?;
        Ok(restored)
    }

    pub async fn get_price(&self, id: Uuid) -> Result<PriceResponse, ServiceError> {
        let key = keys::price(id);
        if let Some(cached) = self.read_cache::<PriceResponse>(&key).await {
            return Ok(cached);
        }

        let price = PriceResponse::from(find_live_price(&self.db, id).await?);
        self.write_cache(&key, &price, self.default_ttl).await;
        Ok(price)
    }

    pub async fn list_prices(&self, page: u64, limit: u64) -> Result<PricePage, ServiceError> {
        if page == 0 || limit == 0 || limit > MAX_LIMIT {
            return Err(ServiceError::Validation(format!(
                "page must be at least 1 and limit between 1 and {}",
                MAX_LIMIT
            )));
        }

        let key = keys::price_list(page, limit);
        if let Some(cached) = self.read_cache::<PricePage>(&key).await {
            return Ok(cached);
        }

        let paginator = Prices::find()
            .filter(prices::Column::DeletedAt.is_null())
            .order_by_asc(prices::Column::CreatedAt)
            .order_by_asc(prices::Column::Id)
            .paginate(&self.db, limit);

        let total = paginator.num_items().await?;
        let data = paginator
            .fetch_page(page - 1)
            .await?
            .into_iter()
            .map(PriceResponse::from)
            .collect();

        let result = PricePage {
            data,
            page,
            limit,
            total,
        };
        self.write_cache(&key, &result, self.default_ttl).await;
        Ok(result)
    }

    /// All archived snapshots of the pair, oldest first, then the live price.
    pub async fn get_price_history(
        &self,
        commodity_id: Uuid,
        location_id: Uuid,
    ) -> Result<Vec<PriceSnapshot>, ServiceError> {
        let key = keys::price_history(commodity_id, location_id);
        if let Some(cached) = self.read_cache::<Vec<PriceSnapshot>>(&key).await {
            return Ok(cached);
        }

        let rows = load_price_history(&self.db, commodity_id, location_id).await?;
        if rows.current.is_none() {
            return Err(ServiceError::NotFound(format!(
                "price for commodity {} at location {}",
                commodity_id, location_id
            )));
        }

        let snapshots = rows.into_snapshots();
        self.write_cache(&key, &snapshots, self.history_ttl).await;
        Ok(snapshots)
    }

    async fn invalidate(&self) -> Result<(), ServiceError> {
        match self.cache.delete_by_pattern(keys::PRICE_PREFIX).await {
            Ok(removed) => {
                debug!(removed, "Invalidated price cache");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Price write committed but cache invalidation failed");
                Err(ServiceError::CacheInvalidation {
                    entity: "price",
                    source: e,
                })
            }
        }
    }

    /// Cache errors on reads fall back to the database
    async fn read_cache<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match cache::get_json::<T>(self.cache.as_ref(), key).await {
            Ok(Some(value)) => {
                debug!(key = %key, "Cache hit");
                Some(value)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, using database");
                None
            }
        }
    }

    async fn write_cache<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) {
        if let Err(e) = cache::set_json(self.cache.as_ref(), key, value, ttl).await {
            warn!(key = %key, error = %e, "Cache write failed");
        }
    }
}
