use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Harvests::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Harvests::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Harvests::LandCommodityId).uuid().not_null())
                    .col(ColumnDef::new(Harvests::HarvestDate).date().not_null())
                    .col(crate::decimal_column(manager, Harvests::Quantity))
                    .col(ColumnDef::new(Harvests::Unit).string_len(32).not_null())
                    .col(ColumnDef::new(Harvests::Notes).text().null())
                    .col(
                        ColumnDef::new(Harvests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Harvests::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Harvests::DeletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Report queries scan one land commodity over a date window
        manager
            .create_index(
                Index::create()
                    .name("idx_harvests_land_commodity_date")
                    .table(Harvests::Table)
                    .col(Harvests::LandCommodityId)
                    .col(Harvests::HarvestDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Harvests::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Harvests {
    Table,
    Id,
    LandCommodityId,
    HarvestDate,
    Quantity,
    Unit,
    Notes,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}
