use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::Principal,
    entities::{
        delivery_document::{Column as DeliveryColumn, Entity as DeliveryEntity, Model as DeliveryModel},
        stock_transfer::{Entity as TransferEntity, Model as TransferModel},
        VehicleClass,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::deliveries::{CreateDelivery, DeliveryService},
};

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SelectVehicle {
    pub vehicle_type: VehicleClass,
}

#[derive(Debug, Clone, Serialize)]
pub struct VehicleSelection {
    pub transfer: TransferModel,
    pub deliveries: Vec<DeliveryModel>,
    pub created: bool,
}

/// Picks a vehicle class for an outgoing transfer and opens its delivery document.
#[derive(Clone)]
pub struct VehicleSelectionService {
    db: Arc<DatabaseConnection>,
    deliveries: DeliveryService,
    event_sender: EventSender,
}

impl VehicleSelectionService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        deliveries: DeliveryService,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            deliveries,
            event_sender,
        }
    }

    /// Existing documents are returned untouched; otherwise one is created for today.
    #[instrument(skip(self, principal), fields(user = %principal.user_id))]
    pub async fn select_vehicle(
        &self,
        principal: &Principal,
        transfer_id: Uuid,
        vehicle: VehicleClass,
    ) -> Result<VehicleSelection, ServiceError> {
        let transfer = TransferEntity::find_by_id(transfer_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Transfer", transfer_id))?;

        let mut deliveries = DeliveryEntity::find()
            .filter(DeliveryColumn::PickingId.eq(transfer_id))
            .order_by_asc(DeliveryColumn::Name)
            .all(&*self.db)
            .await?;

        let created = deliveries.is_empty();
        if created {
            let document = self
                .deliveries
                .create(
                    principal,
                    CreateDelivery {
                        name: None,
                        picking_id: transfer_id,
                        planning_id: None,
                        delivery_date: Some(Utc::now().date_naive()),
                        vehicle_type: Some(vehicle),
                        route_info: None,
                    },
                )
                .await?;
            deliveries.push(document);
        }

        let transfer = if transfer.has_vehicle_selected {
            transfer
        } else {
            let mut active = transfer.into_active_model();
            active.has_vehicle_selected = Set(true);
            active.update(&*self.db).await?
        };

        info!(
            transfer = %transfer.name,
            vehicle = %vehicle,
            created,
            "Vehicle selected for transfer"
        );
        self.event_sender
            .send_or_log(Event::VehicleSelected {
                transfer_id,
                vehicle,
                created_documents: usize::from(created),
            })
            .await;

        Ok(VehicleSelection {
            transfer,
            deliveries,
            created,
        })
    }
}
