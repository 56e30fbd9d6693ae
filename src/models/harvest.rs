//! Harvest request/response models

use chrono::{DateTime, FixedOffset, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::harvests;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateHarvestRequest {
    pub land_commodity_id: Uuid,
    pub harvest_date: NaiveDate,
    pub quantity: Decimal,
    pub unit: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateHarvestRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.quantity <= Decimal::ZERO {
            return Err("quantity must be greater than zero".to_string());
        }
        if self.unit.trim().is_empty() {
            return Err("unit must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestResponse {
    pub id: Uuid,
    pub land_commodity_id: Uuid,
    pub harvest_date: NaiveDate,
    pub quantity: Decimal,
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<harvests::Model> for HarvestResponse {
    fn from(model: harvests::Model) -> Self {
        Self {
            id: model.id,
            land_commodity_id: model.land_commodity_id,
            harvest_date: model.harvest_date,
            quantity: model.quantity,
            unit: model.unit,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarvestPage {
    pub data: Vec<HarvestResponse>,
    pub page: u64,
    pub limit: u64,
    pub total: u64,
}
