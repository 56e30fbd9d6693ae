pub use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

mod m20231020_000001_create_prices;
mod m20231020_000002_create_price_histories;
mod m20231021_000001_create_harvests;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20231020_000001_create_prices::Migration),
            Box::new(m20231020_000002_create_price_histories::Migration),
            Box::new(m20231021_000001_create_harvests::Migration),
        ]
    }
}

/// Money and quantity column, `NUMERIC(20, 4)` on Postgres.
/// SQLite caps decimal precision at 16 digits.
pub(crate) fn decimal_column<T: IntoIden>(manager: &SchemaManager, column: T) -> ColumnDef {
    let mut def = ColumnDef::new(column);
    match manager.get_database_backend() {
        DatabaseBackend::Sqlite => def.decimal_len(16, 4),
        _ => def.decimal_len(20, 4),
    };
    def.not_null();
    def
}
