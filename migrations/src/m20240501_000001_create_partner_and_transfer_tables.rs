use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240501_000001_create_partner_and_transfer_tables"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Partners::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Partners::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Partners::Name).string().not_null())
                    .col(ColumnDef::new(Partners::Phone).string().null())
                    .col(ColumnDef::new(Partners::Mobile).string().null())
                    .col(ColumnDef::new(Partners::City).string().null())
                    .col(ColumnDef::new(Partners::ContactAddress).text().null())
                    .col(
                        ColumnDef::new(Partners::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(StockTransfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StockTransfers::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StockTransfers::Name).string().not_null())
                    .col(ColumnDef::new(StockTransfers::PartnerId).uuid().null())
                    .col(
                        ColumnDef::new(StockTransfers::PickingType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::State)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::HasVehicleSelected)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StockTransfers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StockTransfers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Partners::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Partners {
    Table,
    Id,
    Name,
    Phone,
    Mobile,
    City,
    ContactAddress,
    CreatedAt,
}

#[derive(DeriveIden)]
enum StockTransfers {
    Table,
    Id,
    Name,
    PartnerId,
    PickingType,
    State,
    HasVehicleSelected,
    CreatedAt,
    UpdatedAt,
}
