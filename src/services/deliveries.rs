use std::sync::Arc;

use chrono::NaiveDate;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::Principal,
    entities::{
        delivery_document::{
            ActiveModel as DeliveryActiveModel, Column as DeliveryColumn, DeliveryState,
            Entity as DeliveryEntity, Model as DeliveryModel,
        },
        delivery_planning::Entity as PlanningEntity,
        partner::{Entity as PartnerEntity, Model as PartnerModel},
        stock_transfer::{Entity as TransferEntity, Model as TransferModel, TransferState},
        VehicleClass,
    },
    errors::{RuleViolation, ServiceError},
    events::{Event, EventSender},
    notifications::{DeliveryMilestone, DeliveryNotifier, Recipient},
    services::{
        capacity::CapacityService,
        district_days::DistrictDayService,
        sequences::{self, SequenceCode},
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDelivery {
    #[validate(length(max = 64))]
    pub name: Option<String>,
    pub picking_id: Uuid,
    pub planning_id: Option<Uuid>,
    pub delivery_date: Option<NaiveDate>,
    pub vehicle_type: Option<VehicleClass>,
    pub route_info: Option<String>,
}

/// Partial update. Transfer, planning, date and vehicle are draft-only.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDelivery {
    pub picking_id: Option<Uuid>,
    pub planning_id: Option<Uuid>,
    pub delivery_date: Option<NaiveDate>,
    pub vehicle_type: Option<VehicleClass>,
    pub route_info: Option<String>,
    #[validate(url)]
    pub map_url: Option<String>,
}

impl UpdateDelivery {
    fn touches_schedule(&self) -> bool {
        self.picking_id.is_some() || self.delivery_date.is_some() || self.vehicle_type.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeliveryFilter {
    pub state: Option<DeliveryState>,
    pub delivery_date: Option<NaiveDate>,
    pub vehicle_type: Option<VehicleClass>,
    pub planning_id: Option<Uuid>,
    pub district: Option<String>,
}

/// Delivery document lifecycle.
#[derive(Clone)]
pub struct DeliveryService {
    db: Arc<DatabaseConnection>,
    district_days: DistrictDayService,
    capacity: CapacityService,
    notifier: DeliveryNotifier,
    event_sender: EventSender,
}

impl DeliveryService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        district_days: DistrictDayService,
        capacity: CapacityService,
        notifier: DeliveryNotifier,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            district_days,
            capacity,
            notifier,
            event_sender,
        }
    }

    #[instrument(skip(self, principal, input), fields(user = %principal.user_id, picking_id = %input.picking_id))]
    pub async fn create(
        &self,
        principal: &Principal,
        input: CreateDelivery,
    ) -> Result<DeliveryModel, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await.map_err(|e| {
            error!("Failed to begin transaction: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        let (transfer, partner) = load_eligible_transfer(&txn, input.picking_id).await?;
        if let Some(planning_id) = input.planning_id {
            ensure_open_planning(&txn, planning_id).await?;
        }

        let district = partner.as_ref().map(PartnerModel::district).unwrap_or_default();
        self.validate_schedule(
            &txn,
            principal,
            &district,
            input.delivery_date,
            input.vehicle_type,
            None,
        )
        .await?;

        let name = if sequences::needs_generated_name(input.name.as_deref()) {
            sequences::next_name(&txn, SequenceCode::DeliveryDocument).await?
        } else {
            input.name.unwrap_or_default().trim().to_string()
        };

        let mut document = DeliveryActiveModel {
            name: Set(name),
            state: Set(DeliveryState::Draft),
            picking_id: Set(transfer.id),
            planning_id: Set(input.planning_id),
            delivery_date: Set(input.delivery_date),
            vehicle_type: Set(input.vehicle_type),
            route_info: Set(input.route_info),
            map_url: Set(None),
            sms_sent_on_road: Set(false),
            sms_sent_delivered: Set(false),
            created_by: Set(Some(principal.user_id.clone())),
            ..Default::default()
        };
        apply_partner_snapshot(&mut document, partner.as_ref());

        let document = document.insert(&txn).await.map_err(|e| {
            error!("Failed to insert delivery document: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        txn.commit().await.map_err(|e| {
            error!("Failed to commit delivery creation: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(delivery = %document.name, district = %document.district, "Delivery document created");
        counter!("delivery.documents.created", 1);
        self.event_sender
            .send_or_log(Event::DeliveryCreated {
                delivery_id: document.id,
                name: document.name.clone(),
            })
            .await;
        Ok(document)
    }

    #[instrument(skip(self, principal, patch), fields(user = %principal.user_id))]
    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        patch: UpdateDelivery,
    ) -> Result<DeliveryModel, ServiceError> {
        patch.validate()?;

        let txn = self.db.begin().await?;
        let current = find_on(&txn, id).await?;

        if patch.picking_id.is_some() {
            current.ensure_editable("picking_id")?;
        }
        if patch.planning_id.is_some() {
            current.ensure_editable("planning_id")?;
        }
        if patch.delivery_date.is_some() {
            current.ensure_editable("delivery_date")?;
        }
        if patch.vehicle_type.is_some() {
            current.ensure_editable("vehicle_type")?;
        }

        let mut document: DeliveryActiveModel = current.clone().into();
        let mut district = current.district.clone();

        if let Some(picking_id) = patch.picking_id.filter(|p| *p != current.picking_id) {
            let (transfer, partner) = load_eligible_transfer(&txn, picking_id).await?;
            document.picking_id = Set(transfer.id);
            apply_partner_snapshot(&mut document, partner.as_ref());
            district = partner.as_ref().map(PartnerModel::district).unwrap_or_default();
        }
        if let Some(planning_id) = patch.planning_id {
            ensure_open_planning(&txn, planning_id).await?;
            document.planning_id = Set(Some(planning_id));
        }

        let date = patch.delivery_date.or(current.delivery_date);
        let vehicle = patch.vehicle_type.or(current.vehicle_type);
        if patch.touches_schedule() {
            self.validate_schedule(&txn, principal, &district, date, vehicle, Some(id))
                .await?;
        }
        document.delivery_date = Set(date);
        document.vehicle_type = Set(vehicle);

        if patch.route_info.is_some() {
            document.route_info = Set(patch.route_info);
        }
        if patch.map_url.is_some() {
            document.map_url = Set(patch.map_url);
        }

        let document = document.update(&txn).await?;
        txn.commit().await?;

        info!(delivery = %document.name, "Delivery document updated");
        Ok(document)
    }

    /// draft -> ready. The document takes a slot here, so the daily cap is checked again.
    #[instrument(skip(self, principal), fields(user = %principal.user_id))]
    pub async fn confirm(&self, principal: &Principal, id: Uuid) -> Result<DeliveryModel, ServiceError> {
        let txn = self.db.begin().await?;
        let mut document = find_on(&txn, id).await?;
        let old_state = document.state;

        if let Err(violation) = document.confirm() {
            warn!(delivery = %document.name, error = %violation, "Delivery transition refused");
            return Err(violation.into());
        }
        if let (Some(date), Some(vehicle)) = (document.delivery_date, document.vehicle_type) {
            self.ensure_capacity(&txn, principal, date, vehicle, Some(id))
                .await?;
        }

        let document = self.persist(&txn, document, "confirm").await?;
        txn.commit().await?;
        self.record_transition(&document, old_state, "confirm").await;
        Ok(document)
    }

    /// ready -> on_road, then the "on the way" message.
    pub async fn dispatch(&self, id: Uuid) -> Result<DeliveryModel, ServiceError> {
        let (document, owed) = self
            .transition(id, "dispatch", |doc| doc.dispatch())
            .await?;
        if owed {
            self.notify(&document, DeliveryMilestone::OnRoad).await;
        }
        Ok(document)
    }

    /// on_road -> delivered, then the "delivered" message.
    pub async fn complete(&self, id: Uuid) -> Result<DeliveryModel, ServiceError> {
        let (document, owed) = self
            .transition(id, "complete", |doc| doc.complete())
            .await?;
        if owed {
            self.notify(&document, DeliveryMilestone::Delivered).await;
        }
        Ok(document)
    }

    pub async fn cancel(&self, id: Uuid) -> Result<DeliveryModel, ServiceError> {
        let (document, _) = self.transition(id, "cancel", |doc| doc.cancel()).await?;
        Ok(document)
    }

    pub async fn reset_to_draft(&self, id: Uuid) -> Result<DeliveryModel, ServiceError> {
        let (document, _) = self
            .transition(id, "reset_to_draft", |doc| {
                doc.reset_to_draft();
                Ok(())
            })
            .await?;
        Ok(document)
    }

    pub async fn get(&self, id: Uuid) -> Result<DeliveryModel, ServiceError> {
        find_on(&*self.db, id).await
    }

    pub async fn list(&self, filter: DeliveryFilter) -> Result<Vec<DeliveryModel>, ServiceError> {
        let mut query = DeliveryEntity::find();
        if let Some(state) = filter.state {
            query = query.filter(DeliveryColumn::State.eq(state));
        }
        if let Some(date) = filter.delivery_date {
            query = query.filter(DeliveryColumn::DeliveryDate.eq(date));
        }
        if let Some(vehicle) = filter.vehicle_type {
            query = query.filter(DeliveryColumn::VehicleType.eq(vehicle));
        }
        if let Some(planning_id) = filter.planning_id {
            query = query.filter(DeliveryColumn::PlanningId.eq(planning_id));
        }
        if let Some(district) = filter.district {
            query = query.filter(DeliveryColumn::District.eq(district));
        }
        Ok(query
            .order_by_desc(DeliveryColumn::DeliveryDate)
            .order_by_desc(DeliveryColumn::Name)
            .all(&*self.db)
            .await?)
    }

    /// District/day compatibility and the daily cap for a prospective schedule.
    pub(crate) async fn validate_schedule<C: ConnectionTrait>(
        &self,
        conn: &C,
        principal: &Principal,
        district: &str,
        date: Option<NaiveDate>,
        vehicle: Option<VehicleClass>,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let Some(date) = date else {
            return Ok(());
        };
        self.district_days
            .check_delivery_date_on(conn, district, date)
            .await?;

        if let Some(vehicle) = vehicle {
            self.ensure_capacity(conn, principal, date, vehicle, exclude)
                .await?;
        }
        Ok(())
    }

    async fn ensure_capacity<C: ConnectionTrait>(
        &self,
        conn: &C,
        principal: &Principal,
        date: NaiveDate,
        vehicle: VehicleClass,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let result = self
            .capacity
            .ensure_within_limit(conn, principal, date, vehicle, exclude)
            .await;
        if let Err(ServiceError::Rule(RuleViolation::DailyCapExceeded { existing, cap, .. })) =
            &result
        {
            self.event_sender
                .send_or_log(Event::CapacityRejected {
                    date,
                    vehicle,
                    existing: *existing,
                    cap: *cap,
                })
                .await;
        }
        result
    }

    async fn transition<F, R>(
        &self,
        id: Uuid,
        action: &'static str,
        apply: F,
    ) -> Result<(DeliveryModel, R), ServiceError>
    where
        F: FnOnce(&mut DeliveryModel) -> Result<R, RuleViolation>,
    {
        let txn = self.db.begin().await?;
        let mut document = find_on(&txn, id).await?;
        let old_state = document.state;

        let outcome = match apply(&mut document) {
            Ok(outcome) => outcome,
            Err(violation) => {
                warn!(delivery = %document.name, action, error = %violation, "Delivery transition refused");
                return Err(violation.into());
            }
        };

        let document = self.persist(&txn, document, action).await?;
        txn.commit().await?;
        self.record_transition(&document, old_state, action).await;
        Ok((document, outcome))
    }

    async fn persist<C: ConnectionTrait>(
        &self,
        conn: &C,
        document: DeliveryModel,
        action: &'static str,
    ) -> Result<DeliveryModel, ServiceError> {
        let id = document.id;
        document
            .into_active_model()
            .reset_all()
            .update(conn)
            .await
            .map_err(|e| {
                error!("Failed to persist delivery {} after {}: {}", id, action, e);
                ServiceError::DatabaseError(e)
            })
    }

    async fn record_transition(
        &self,
        document: &DeliveryModel,
        old_state: DeliveryState,
        action: &'static str,
    ) {
        info!(delivery = %document.name, from = %old_state, to = %document.state, "Delivery {}", action);
        counter!("delivery.transitions", 1, "action" => action);
        self.event_sender
            .send_or_log(Event::DeliveryStateChanged {
                delivery_id: document.id,
                old_state: old_state.to_string(),
                new_state: document.state.to_string(),
            })
            .await;
    }

    async fn notify(&self, document: &DeliveryModel, milestone: DeliveryMilestone) {
        let recipient = Recipient {
            partner_id: document.partner_id,
            partner_name: document.partner_name.clone().unwrap_or_default(),
            number: document.sms_number().map(str::to_string),
            document_name: document.name.clone(),
        };
        if let Err(e) = self.notifier.notify(milestone, &recipient).await {
            self.event_sender
                .send_or_log(Event::NotificationFailed {
                    delivery_id: document.id,
                    reason: e.to_string(),
                })
                .await;
        }
    }
}

pub(crate) async fn find_on<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<DeliveryModel, ServiceError> {
    DeliveryEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Delivery", id))
}

/// Documents only join plannings that are still being assembled.
async fn ensure_open_planning<C: ConnectionTrait>(
    conn: &C,
    planning_id: Uuid,
) -> Result<(), ServiceError> {
    let planning = PlanningEntity::find_by_id(planning_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Planning", planning_id))?;
    planning.ensure_draft("attach documents to")?;
    Ok(())
}

/// Transfer plus its partner, provided the transfer is done and outgoing.
async fn load_eligible_transfer<C: ConnectionTrait>(
    conn: &C,
    picking_id: Uuid,
) -> Result<(TransferModel, Option<PartnerModel>), ServiceError> {
    let transfer = TransferEntity::find_by_id(picking_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Transfer", picking_id))?;

    if !transfer.is_outgoing() {
        return Err(RuleViolation::TransferNotEligible {
            transfer: transfer.name.clone(),
            reason: "not an outgoing transfer".to_string(),
        }
        .into());
    }
    if transfer.state != TransferState::Done {
        return Err(RuleViolation::TransferNotEligible {
            transfer: transfer.name.clone(),
            reason: format!("transfer is {}, expected done", transfer.state),
        }
        .into());
    }

    let partner = match transfer.partner_id {
        Some(partner_id) => PartnerEntity::find_by_id(partner_id).one(conn).await?,
        None => None,
    };
    Ok((transfer, partner))
}

fn apply_partner_snapshot(document: &mut DeliveryActiveModel, partner: Option<&PartnerModel>) {
    document.partner_id = Set(partner.map(|p| p.id));
    document.partner_name = Set(partner.map(|p| p.name.clone()));
    document.partner_phone = Set(partner.and_then(|p| p.phone.clone()));
    document.partner_mobile = Set(partner.and_then(|p| p.mobile.clone()));
    document.delivery_address = Set(partner.and_then(|p| p.contact_address.clone()));
    document.district = Set(partner.map(PartnerModel::district).unwrap_or_default());
}
