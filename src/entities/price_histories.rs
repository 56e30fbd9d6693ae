//! `SeaORM` Entity for immutable snapshots of superseded prices

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "price_histories")]
pub struct Model {
    /// Auto-increment id; doubles as insertion order
    #[sea_orm(primary_key)]
    pub id: i64,
    pub price_id: Uuid,
    pub commodity_id: Uuid,
    pub location_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((20, 4)))")]
    pub value: Decimal,
    /// Copied from the superseded price, not the time of archival
    pub created_at: DateTimeWithTimeZone,
    /// Copied from the superseded price, not the time of archival
    pub updated_at: DateTimeWithTimeZone,
    pub archived_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
