use sea_orm_migration::prelude::*;

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m20240501_000004_create_delivery_documents_table"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeliveryDocuments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeliveryDocuments::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DeliveryDocuments::Name).string().not_null())
                    .col(
                        ColumnDef::new(DeliveryDocuments::State)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(DeliveryDocuments::PickingId).uuid().not_null())
                    .col(ColumnDef::new(DeliveryDocuments::PlanningId).uuid().null())
                    .col(ColumnDef::new(DeliveryDocuments::PartnerId).uuid().null())
                    .col(ColumnDef::new(DeliveryDocuments::PartnerName).string().null())
                    .col(ColumnDef::new(DeliveryDocuments::PartnerPhone).string().null())
                    .col(ColumnDef::new(DeliveryDocuments::PartnerMobile).string().null())
                    .col(ColumnDef::new(DeliveryDocuments::DeliveryAddress).text().null())
                    .col(
                        ColumnDef::new(DeliveryDocuments::District)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(DeliveryDocuments::DeliveryDate).date().null())
                    .col(
                        ColumnDef::new(DeliveryDocuments::VehicleType)
                            .string_len(32)
                            .null(),
                    )
                    .col(ColumnDef::new(DeliveryDocuments::RouteInfo).text().null())
                    .col(ColumnDef::new(DeliveryDocuments::MapUrl).string().null())
                    .col(
                        ColumnDef::new(DeliveryDocuments::SmsSentOnRoad)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(DeliveryDocuments::SmsSentDelivered)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(DeliveryDocuments::CreatedBy).string().null())
                    .col(
                        ColumnDef::new(DeliveryDocuments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeliveryDocuments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Daily capacity counting filters on (delivery_date, vehicle_type, state).
        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_documents_date_vehicle")
                    .table(DeliveryDocuments::Table)
                    .col(DeliveryDocuments::DeliveryDate)
                    .col(DeliveryDocuments::VehicleType)
                    .col(DeliveryDocuments::State)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_documents_planning")
                    .table(DeliveryDocuments::Table)
                    .col(DeliveryDocuments::PlanningId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_delivery_documents_picking")
                    .table(DeliveryDocuments::Table)
                    .col(DeliveryDocuments::PickingId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeliveryDocuments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DeliveryDocuments {
    Table,
    Id,
    Name,
    State,
    PickingId,
    PlanningId,
    PartnerId,
    PartnerName,
    PartnerPhone,
    PartnerMobile,
    DeliveryAddress,
    District,
    DeliveryDate,
    VehicleType,
    RouteInfo,
    MapUrl,
    SmsSentOnRoad,
    SmsSentDelivered,
    CreatedBy,
    CreatedAt,
    UpdatedAt,
}
