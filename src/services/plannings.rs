use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        delivery_document::{
            Column as DeliveryColumn, DeliveryState, Entity as DeliveryEntity,
            Model as DeliveryModel,
        },
        delivery_planning::{
            validate_planning_date, ActiveModel as PlanningActiveModel, ChildState,
            Column as PlanningColumn, Entity as PlanningEntity, Model as PlanningModel,
            PlanningState,
        },
        VehicleClass,
    },
    errors::{RuleViolation, ServiceError},
    events::{Event, EventSender},
    services::{
        deliveries,
        sequences::{self, SequenceCode},
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePlanning {
    #[validate(length(max = 64))]
    pub name: Option<String>,
    pub planning_date: NaiveDate,
    pub vehicle_type: VehicleClass,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePlanning {
    pub planning_date: Option<NaiveDate>,
    pub vehicle_type: Option<VehicleClass>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanningFilter {
    pub state: Option<PlanningState>,
    pub planning_date: Option<NaiveDate>,
    pub vehicle_type: Option<VehicleClass>,
}

/// Planning with its delivery documents, ordered by name.
#[derive(Debug, Clone, Serialize)]
pub struct PlanningDetail {
    #[serde(flatten)]
    pub planning: PlanningModel,
    pub delivery_count: usize,
    pub deliveries: Vec<DeliveryModel>,
}

#[derive(Clone)]
pub struct PlanningService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl PlanningService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    #[instrument(skip(self, input), fields(date = %input.planning_date, vehicle = %input.vehicle_type))]
    pub async fn create(&self, input: CreatePlanning) -> Result<PlanningModel, ServiceError> {
        input.validate()?;
        validate_planning_date(input.planning_date, Self::today())?;

        let txn = self.db.begin().await?;
        let name = if sequences::needs_generated_name(input.name.as_deref()) {
            sequences::next_name(&txn, SequenceCode::DeliveryPlanning).await?
        } else {
            input.name.unwrap_or_default().trim().to_string()
        };

        let planning = PlanningActiveModel {
            name: Set(name),
            state: Set(PlanningState::Draft),
            planning_date: Set(input.planning_date),
            vehicle_type: Set(input.vehicle_type),
            total_distance: Set(0.0),
            estimated_duration: Set(0.0),
            notes: Set(input.notes),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!("Failed to insert planning: {}", e);
            ServiceError::DatabaseError(e)
        })?;
        txn.commit().await?;

        info!(planning = %planning.name, "Planning created");
        self.event_sender
            .send_or_log(Event::PlanningCreated(planning.id))
            .await;
        Ok(planning)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: Uuid, patch: UpdatePlanning) -> Result<PlanningModel, ServiceError> {
        patch.validate()?;
        let current = find_on(&*self.db, id).await?;

        if let Some(date) = patch.planning_date.filter(|d| *d != current.planning_date) {
            validate_planning_date(date, Self::today())?;
        }

        let mut planning: PlanningActiveModel = current.into();
        if let Some(date) = patch.planning_date {
            planning.planning_date = Set(date);
        }
        if let Some(vehicle) = patch.vehicle_type {
            planning.vehicle_type = Set(vehicle);
        }
        if patch.notes.is_some() {
            planning.notes = Set(patch.notes);
        }
        Ok(planning.update(&*self.db).await?)
    }

    /// Attaches draft documents to a draft planning.
    #[instrument(skip(self, document_ids), fields(count = document_ids.len()))]
    pub async fn attach_documents(
        &self,
        id: Uuid,
        document_ids: Vec<Uuid>,
    ) -> Result<PlanningDetail, ServiceError> {
        let txn = self.db.begin().await?;
        let planning = find_on(&txn, id).await?;
        planning.ensure_draft("attach documents to")?;

        for document_id in document_ids {
            let document = deliveries::find_on(&txn, document_id).await?;
            document.ensure_editable("planning_id")?;
            let mut active = document.into_active_model();
            active.planning_id = Set(Some(id));
            active.update(&txn).await?;
        }
        txn.commit().await?;

        self.detail(planning).await
    }

    pub async fn detach_document(
        &self,
        id: Uuid,
        document_id: Uuid,
    ) -> Result<PlanningDetail, ServiceError> {
        let txn = self.db.begin().await?;
        let planning = find_on(&txn, id).await?;
        planning.ensure_draft("detach documents from")?;

        let document = deliveries::find_on(&txn, document_id).await?;
        if document.planning_id != Some(id) {
            return Err(ServiceError::InvalidInput(format!(
                "Delivery {} does not belong to planning {}",
                document.name, planning.name
            )));
        }
        document.ensure_editable("planning_id")?;
        let mut active = document.into_active_model();
        active.planning_id = Set(None);
        active.update(&txn).await?;
        txn.commit().await?;

        self.detail(planning).await
    }

    /// draft -> confirmed
    pub async fn confirm(&self, id: Uuid) -> Result<PlanningModel, ServiceError> {
        self.transition(id, "confirm", |planning, children| {
            planning.confirm(&child_states(children))?;
            Ok(None)
        })
        .await
    }

    /// confirmed -> in_progress; every child goes on the road.
    pub async fn start(&self, id: Uuid) -> Result<PlanningModel, ServiceError> {
        self.transition(id, "start", |planning, _| {
            planning.start()?;
            Ok(Some(DeliveryState::OnRoad))
        })
        .await
    }

    /// in_progress -> done
    pub async fn done(&self, id: Uuid) -> Result<PlanningModel, ServiceError> {
        self.transition(id, "done", |planning, children| {
            planning.done(&child_states(children))?;
            Ok(None)
        })
        .await
    }

    /// Cancels the planning and returns every child to ready.
    pub async fn cancel(&self, id: Uuid) -> Result<PlanningModel, ServiceError> {
        self.transition(id, "cancel", |planning, _| {
            planning.cancel()?;
            Ok(Some(DeliveryState::Ready))
        })
        .await
    }

    pub async fn reset_to_draft(&self, id: Uuid) -> Result<PlanningModel, ServiceError> {
        self.transition(id, "reset_to_draft", |planning, _| {
            planning.reset_to_draft();
            Ok(None)
        })
        .await
    }

    pub async fn get(&self, id: Uuid) -> Result<PlanningDetail, ServiceError> {
        let planning = find_on(&*self.db, id).await?;
        self.detail(planning).await
    }

    pub async fn list(&self, filter: PlanningFilter) -> Result<Vec<PlanningModel>, ServiceError> {
        let mut query = PlanningEntity::find();
        if let Some(state) = filter.state {
            query = query.filter(PlanningColumn::State.eq(state));
        }
        if let Some(date) = filter.planning_date {
            query = query.filter(PlanningColumn::PlanningDate.eq(date));
        }
        if let Some(vehicle) = filter.vehicle_type {
            query = query.filter(PlanningColumn::VehicleType.eq(vehicle));
        }
        Ok(query
            .order_by_desc(PlanningColumn::PlanningDate)
            .order_by_desc(PlanningColumn::Name)
            .all(&*self.db)
            .await?)
    }

    async fn detail(&self, planning: PlanningModel) -> Result<PlanningDetail, ServiceError> {
        let deliveries = children_on(&*self.db, planning.id).await?;
        Ok(PlanningDetail {
            delivery_count: deliveries.len(),
            deliveries,
            planning,
        })
    }

    /// Runs `apply` on the planning and, when it names a state, bulk-moves every
    /// child to it without the per-document guards.
    async fn transition<F>(
        &self,
        id: Uuid,
        action: &'static str,
        apply: F,
    ) -> Result<PlanningModel, ServiceError>
    where
        F: FnOnce(&mut PlanningModel, &[DeliveryModel]) -> Result<Option<DeliveryState>, RuleViolation>,
    {
        let txn = self.db.begin().await?;
        let mut planning = find_on(&txn, id).await?;
        let children = children_on(&txn, id).await?;
        let old_state = planning.state;

        let cascade = match apply(&mut planning, &children) {
            Ok(cascade) => cascade,
            Err(violation) => {
                warn!(planning = %planning.name, action, error = %violation, "Planning transition refused");
                return Err(violation.into());
            }
        };

        let affected = match cascade {
            Some(state) => {
                DeliveryEntity::update_many()
                    .col_expr(DeliveryColumn::State, Expr::value(state))
                    .col_expr(DeliveryColumn::UpdatedAt, Expr::value(Utc::now()))
                    .filter(DeliveryColumn::PlanningId.eq(id))
                    .exec(&txn)
                    .await?
                    .rows_affected
            }
            None => 0,
        };

        let planning = planning
            .into_active_model()
            .reset_all()
            .update(&txn)
            .await?;
        txn.commit().await?;

        info!(
            planning = %planning.name,
            from = %old_state,
            to = %planning.state,
            affected,
            "Planning {}", action
        );
        counter!("delivery.planning.transitions", 1, "action" => action);
        self.event_sender
            .send_or_log(Event::PlanningStateChanged {
                planning_id: id,
                old_state: old_state.to_string(),
                new_state: planning.state.to_string(),
                affected_deliveries: affected,
            })
            .await;
        Ok(planning)
    }
}

fn child_states(children: &[DeliveryModel]) -> Vec<ChildState<'_>> {
    children
        .iter()
        .map(|child| ChildState {
            name: &child.name,
            state: child.state,
        })
        .collect()
}

pub(crate) async fn find_on<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
) -> Result<PlanningModel, ServiceError> {
    PlanningEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Planning", id))
}

pub(crate) async fn children_on<C: ConnectionTrait>(
    conn: &C,
    planning_id: Uuid,
) -> Result<Vec<DeliveryModel>, ServiceError> {
    Ok(DeliveryEntity::find()
        .filter(DeliveryColumn::PlanningId.eq(planning_id))
        .order_by_asc(DeliveryColumn::Name)
        .all(conn)
        .await?)
}
