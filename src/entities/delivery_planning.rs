use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::delivery_document::DeliveryState;
use super::VehicleClass;
use crate::calendar;
use crate::errors::RuleViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum PlanningState {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "done")]
    Done,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl fmt::Display for PlanningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanningState::Draft => write!(f, "draft"),
            PlanningState::Confirmed => write!(f, "confirmed"),
            PlanningState::InProgress => write!(f, "in_progress"),
            PlanningState::Done => write!(f, "done"),
            PlanningState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A batch of delivery documents dispatched together on one vehicle and date.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_plannings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub state: PlanningState,
    pub planning_date: NaiveDate,
    pub vehicle_type: VehicleClass,
    /// Kilometres
    pub total_distance: f64,
    /// Minutes
    pub estimated_duration: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::delivery_document::Entity")]
    DeliveryDocuments,
    #[sea_orm(has_many = "super::delivery_route::Entity")]
    DeliveryRoutes,
}

impl Related<super::delivery_document::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryDocuments.def()
    }
}

impl Related<super::delivery_route::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryRoutes.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        let now = Utc::now();
        if insert {
            if active_model.id.is_not_set() {
                active_model.id = Set(Uuid::new_v4());
            }
            active_model.created_at = Set(now);
        }
        active_model.updated_at = Set(now);
        Ok(active_model)
    }
}

const ENTITY: &str = "planning";

/// A planning date must be a working day and not before `today`.
pub fn validate_planning_date(date: NaiveDate, today: NaiveDate) -> Result<(), RuleViolation> {
    if calendar::is_non_working(date) {
        return Err(RuleViolation::NonWorkingDay {
            date: Some(date),
            day: calendar::date_day_name(date),
        });
    }
    if date < today {
        return Err(RuleViolation::PastPlanningDate { date });
    }
    Ok(())
}

/// Child summary used by the transition guards.
#[derive(Debug, Clone)]
pub struct ChildState<'a> {
    pub name: &'a str,
    pub state: DeliveryState,
}

impl Model {
    /// draft -> confirmed. Every child must be ready.
    pub fn confirm(&mut self, children: &[ChildState<'_>]) -> Result<(), RuleViolation> {
        if self.state != PlanningState::Draft {
            return Err(RuleViolation::illegal(ENTITY, "confirm", self.state));
        }
        if children.is_empty() {
            return Err(RuleViolation::EmptyPlanning);
        }
        let pending = pending_names(children, DeliveryState::Ready);
        if !pending.is_empty() {
            return Err(RuleViolation::DeliveriesNotReady { pending });
        }
        self.state = PlanningState::Confirmed;
        Ok(())
    }

    /// confirmed -> in_progress. The caller moves the children to on_road.
    pub fn start(&mut self) -> Result<(), RuleViolation> {
        if self.state != PlanningState::Confirmed {
            return Err(RuleViolation::illegal(ENTITY, "start", self.state));
        }
        self.state = PlanningState::InProgress;
        Ok(())
    }

    /// in_progress -> done. Every child must be delivered.
    pub fn done(&mut self, children: &[ChildState<'_>]) -> Result<(), RuleViolation> {
        if self.state != PlanningState::InProgress {
            return Err(RuleViolation::illegal(ENTITY, "done", self.state));
        }
        let pending = pending_names(children, DeliveryState::Delivered);
        if !pending.is_empty() {
            return Err(RuleViolation::DeliveriesNotDelivered { pending });
        }
        self.state = PlanningState::Done;
        Ok(())
    }

    /// Any state but done -> cancelled. The caller returns the children to ready.
    pub fn cancel(&mut self) -> Result<(), RuleViolation> {
        if self.state == PlanningState::Done {
            return Err(RuleViolation::illegal(ENTITY, "cancel", self.state));
        }
        self.state = PlanningState::Cancelled;
        Ok(())
    }

    pub fn reset_to_draft(&mut self) {
        self.state = PlanningState::Draft;
    }

    pub fn ensure_draft(&self, action: &str) -> Result<(), RuleViolation> {
        if self.state == PlanningState::Draft {
            Ok(())
        } else {
            Err(RuleViolation::illegal(ENTITY, action, self.state))
        }
    }
}

fn pending_names(children: &[ChildState<'_>], expected: DeliveryState) -> Vec<String> {
    children
        .iter()
        .filter(|child| child.state != expected)
        .map(|child| child.name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn planning(state: PlanningState) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            name: "PLN/00001".into(),
            state,
            planning_date: NaiveDate::from_ymd_opt(2024, 5, 7).unwrap(),
            vehicle_type: VehicleClass::Anadolu,
            total_distance: 0.0,
            estimated_duration: 0.0,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn child(name: &str, state: DeliveryState) -> ChildState<'_> {
        ChildState { name, state }
    }

    #[test]
    fn confirm_needs_children() {
        let mut p = planning(PlanningState::Draft);
        assert_matches!(p.confirm(&[]), Err(RuleViolation::EmptyPlanning));
        assert_eq!(p.state, PlanningState::Draft);
    }

    #[test]
    fn confirm_lists_children_not_ready() {
        let mut p = planning(PlanningState::Draft);
        let children = [
            child("DLV/00001", DeliveryState::Ready),
            child("DLV/00002", DeliveryState::Draft),
            child("DLV/00003", DeliveryState::Cancelled),
        ];
        assert_matches!(
            p.confirm(&children),
            Err(RuleViolation::DeliveriesNotReady { pending })
                if pending == vec!["DLV/00002".to_string(), "DLV/00003".to_string()]
        );
    }

    #[test]
    fn done_requires_every_child_delivered() {
        let mut p = planning(PlanningState::InProgress);
        let children = [
            child("DLV/00001", DeliveryState::Delivered),
            child("DLV/00002", DeliveryState::OnRoad),
        ];
        assert_matches!(
            p.done(&children),
            Err(RuleViolation::DeliveriesNotDelivered { pending }) if pending == vec!["DLV/00002".to_string()]
        );
        let delivered = [child("DLV/00001", DeliveryState::Delivered)];
        p.done(&delivered).unwrap();
        assert_eq!(p.state, PlanningState::Done);
    }

    #[rstest]
    #[case(PlanningState::Draft, true)]
    #[case(PlanningState::Confirmed, true)]
    #[case(PlanningState::InProgress, true)]
    #[case(PlanningState::Cancelled, true)]
    #[case(PlanningState::Done, false)]
    fn cancel_allowed_except_done(#[case] from: PlanningState, #[case] allowed: bool) {
        let mut p = planning(from);
        assert_eq!(p.cancel().is_ok(), allowed);
    }

    #[test]
    fn start_only_from_confirmed() {
        let mut p = planning(PlanningState::Draft);
        assert_matches!(p.start(), Err(RuleViolation::IllegalTransition { .. }));
        p.state = PlanningState::Confirmed;
        p.start().unwrap();
        assert_eq!(p.state, PlanningState::InProgress);
    }

    #[test]
    fn planning_date_rules() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 8).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 5, 12).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();
        assert_matches!(
            validate_planning_date(sunday, today),
            Err(RuleViolation::NonWorkingDay { .. })
        );
        assert_matches!(
            validate_planning_date(yesterday, today),
            Err(RuleViolation::PastPlanningDate { .. })
        );
        assert!(validate_planning_date(today, today).is_ok());
    }
}
