use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240501_000003_create_delivery_plannings_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryPlannings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeliveryPlannings::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryPlannings::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(DeliveryPlannings::State)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(DeliveryPlannings::PlanningDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryPlannings::VehicleType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryPlannings::TotalDistance)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(DeliveryPlannings::EstimatedDuration)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(DeliveryPlannings::Notes).text().null())
                    .col(
                        ColumnDef::new(DeliveryPlannings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryPlannings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryPlannings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DeliveryPlannings {
    Table,
    Id,
    Name,
    State,
    PlanningDate,
    VehicleType,
    TotalDistance,
    EstimatedDuration,
    Notes,
    CreatedAt,
    UpdatedAt,
}
