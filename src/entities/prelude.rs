//! `SeaORM` Entity prelude

pub use super::harvests::Entity as Harvests;
pub use super::price_histories::Entity as PriceHistories;
pub use super::prices::Entity as Prices;
