use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PriceHistories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PriceHistories::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PriceHistories::PriceId).uuid().not_null())
                    .col(ColumnDef::new(PriceHistories::CommodityId).uuid().not_null())
                    .col(ColumnDef::new(PriceHistories::LocationId).uuid().not_null())
                    .col(crate::decimal_column(manager, PriceHistories::Value))
                    .col(
                        ColumnDef::new(PriceHistories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceHistories::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PriceHistories::ArchivedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_price_histories_commodity_location")
                    .table(PriceHistories::Table)
                    .col(PriceHistories::CommodityId)
                    .col(PriceHistories::LocationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PriceHistories::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PriceHistories {
    Table,
    Id,
    PriceId,
    CommodityId,
    LocationId,
    Value,
    CreatedAt,
    UpdatedAt,
    ArchivedAt,
}
