//! Price request/response models

use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::{price_histories, prices};

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePriceRequest {
    pub commodity_id: Uuid,
    pub location_id: Uuid,
    pub value: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePriceRequest {
    pub value: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResponse {
    pub id: Uuid,
    pub commodity_id: Uuid,
    pub location_id: Uuid,
    pub value: Decimal,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<prices::Model> for PriceResponse {
    fn from(model: prices::Model) -> Self {
        Self {
            id: model.id,
            commodity_id: model.commodity_id,
            location_id: model.location_id,
            value: model.value,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePage {
    pub data: Vec<PriceResponse>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
}

/// One point of a price's history. The live price appears as the last
/// snapshot with `current` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub price_id: Uuid,
    pub commodity_id: Uuid,
    pub location_id: Uuid,
    pub value: Decimal,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub current: bool,
}

impl From<price_histories::Model> for PriceSnapshot {
    fn from(model: price_histories::Model) -> Self {
        Self {
            price_id: model.price_id,
            commodity_id: model.commodity_id,
            location_id: model.location_id,
            value: model.value,
            created_at: model.created_at,
            updated_at: model.updated_at,
            current: false,
        }
    }
}

impl From<prices::Model> for PriceSnapshot {
    fn from(model: prices::Model) -> Self {
        Self {
            price_id: model.id,
            commodity_id: model.commodity_id,
            location_id: model.location_id,
            value: model.value,
            created_at: model.created_at,
            updated_at: model.updated_at,
            current: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistoryResponse {
    pub commodity_id: Uuid,
    pub location_id: Uuid,
    pub data: Vec<PriceSnapshot>,
}

/// `?page=&limit=` for list endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PaginationQuery {
    /// Returns `(page, limit)` with defaults applied
    pub fn validate(&self) -> Result<(u64, u64), String> {
        let page = self.page.unwrap_or(DEFAULT_PAGE);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);

        if page == 0 {
            return Err("page must be at least 1".to_string());
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(format!("limit must be between 1 and {}", MAX_LIMIT));
        }

        Ok((page, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults() {
        let query = PaginationQuery::default();
        assert_eq!(query.validate().unwrap(), (1, 10));
    }

    #[test]
    fn test_pagination_rejects_zero_page() {
        let query = PaginationQuery {
            page: Some(0),
            limit: None,
        };
        assert!(query.validate().unwrap_err().contains("page"));
    }

    #[test]
    fn test_pagination_rejects_large_limit() {
        let query = PaginationQuery {
            page: Some(1),
            limit: Some(101),
        };
        assert!(query.validate().is_err());
    }
}
