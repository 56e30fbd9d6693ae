use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Prices::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Prices::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Prices::CommodityId).uuid().not_null())
                    .col(ColumnDef::new(Prices::LocationId).uuid().not_null())
                    .col(crate::decimal_column(manager, Prices::Value))
                    .col(
                        ColumnDef::new(Prices::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Prices::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Prices::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookup index for (commodity, location). Not unique: soft-deleted rows
        // share the pair with the live one.
        manager
            .create_index(
                Index::create()
                    .name("idx_prices_commodity_location")
                    .table(Prices::Table)
                    .col(Prices::CommodityId)
                    .col(Prices::LocationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Prices::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Prices {
    Table,
    Id,
    CommodityId,
    LocationId,
    Value,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
