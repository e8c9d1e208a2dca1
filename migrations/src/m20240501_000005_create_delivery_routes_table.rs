use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240501_000005_create_delivery_routes_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryRoutes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeliveryRoutes::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryRoutes::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(DeliveryRoutes::PlanningId).uuid().not_null())
                    .col(
                        ColumnDef::new(DeliveryRoutes::VehicleType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryRoutes::State)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(DeliveryRoutes::StartLocation).string().not_null())
                    .col(ColumnDef::new(DeliveryRoutes::EndLocation).string().not_null())
                    .col(ColumnDef::new(DeliveryRoutes::Waypoints).text().null())
                    .col(
                        ColumnDef::new(DeliveryRoutes::TotalDistance)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(DeliveryRoutes::TotalDuration)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(DeliveryRoutes::OptimizedRoute).text().null())
                    .col(
                        ColumnDef::new(DeliveryRoutes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryRoutes::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_routes_planning")
                    .table(DeliveryRoutes::Table)
                    .col(DeliveryRoutes::PlanningId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryRoutes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DeliveryRoutes {
    Table,
    Id,
    Name,
    PlanningId,
    VehicleType,
    State,
    StartLocation,
    EndLocation,
    Waypoints,
    TotalDistance,
    TotalDuration,
    OptimizedRoute,
    CreatedAt,
    UpdatedAt,
}
