use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240501_000002_create_district_day_rules_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DistrictDayRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DistrictDayRules::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DistrictDayRules::DistrictName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DistrictDayRules::Weekday).integer().not_null())
                    .col(
                        ColumnDef::new(DistrictDayRules::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(DistrictDayRules::MaxDeliveryCount)
                            .integer()
                            .not_null()
                            .default(7),
                    )
                    .col(ColumnDef::new(DistrictDayRules::Notes).text().null())
                    .col(
                        ColumnDef::new(DistrictDayRules::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DistrictDayRules::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_district_day_rules_district_weekday")
                    .table(DistrictDayRules::Table)
                    .col(DistrictDayRules::DistrictName)
                    .col(DistrictDayRules::Weekday)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DistrictDayRules::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DistrictDayRules {
    Table,
    Id,
    DistrictName,
    Weekday,
    IsActive,
    MaxDeliveryCount,
    Notes,
    CreatedAt,
    UpdatedAt,
}
