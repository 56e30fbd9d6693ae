mod common;

use agrimarket_backend::entities::{prelude::*, prices};
use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use crate::common::setup_test_db;

#[tokio::test]
async fn test_migrations_apply_on_sqlite() {
    let result = setup_test_db().await;
    assert!(result.is_ok(), "migration failed: {:?}", result.as_ref().err());

    let (_dir, db) = result.unwrap();
    let applied = migration::Migrator::get_applied_migrations(&db).await.unwrap();
    assert_eq!(applied.len(), 3);
}

#[tokio::test]
async fn test_decimal_value_is_stored_on_sqlite() {
    let (_dir, db) = setup_test_db().await.unwrap();
    let now = Utc::now().fixed_offset();
    let id = Uuid::new_v4();

    prices::ActiveModel {
        id: Set(id),
        commodity_id: Set(Uuid::new_v4()),
        location_id: Set(Uuid::new_v4()),
        value: Set(dec!(12500.25)),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    }
    .insert(&db)
    .await
    .unwrap();

    let stored = Prices::find_by_id(id).one(&db).await.unwrap().unwrap();
    assert_eq!(stored.value, dec!(12500.25));
}
