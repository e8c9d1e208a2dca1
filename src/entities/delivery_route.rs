use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::VehicleClass;
use crate::errors::RuleViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum RouteState {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "optimized")]
    Optimized,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "done")]
    Done,
}

impl fmt::Display for RouteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteState::Draft => write!(f, "draft"),
            RouteState::Optimized => write!(f, "optimized"),
            RouteState::InProgress => write!(f, "in_progress"),
            RouteState::Done => write!(f, "done"),
        }
    }
}

/// One stop of an optimized route, in visiting order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStop {
    pub address: String,
    /// Leg distance as reported by the routing service, e.g. "5.2 km"
    pub distance: String,
    /// Leg duration as reported by the routing service, e.g. "14 mins"
    pub duration: String,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_routes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub planning_id: Uuid,
    pub vehicle_type: VehicleClass,
    pub state: RouteState,
    pub start_location: String,
    pub end_location: String,
    /// JSON array of the addresses sent for optimization
    pub waypoints: Option<String>,
    /// Kilometres
    pub total_distance: f64,
    /// Minutes
    pub total_duration: f64,
    /// JSON array of [`RouteStop`]
    pub optimized_route: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::delivery_planning::Entity",
        from = "Column::PlanningId",
        to = "super::delivery_planning::Column::Id",
        on_delete = "Cascade"
    )]
    Planning,
}

impl Related<super::delivery_planning::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Planning.def()
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

const ENTITY: &str = "route";

impl Model {
    pub fn ensure_optimizable(&self) -> Result<(), RuleViolation> {
        if self.state != RouteState::Draft {
            return Err(RuleViolation::illegal(ENTITY, "optimize", self.state));
        }
        Ok(())
    }

    /// optimized -> in_progress
    pub fn start(&mut self) -> Result<(), RuleViolation> {
        if self.state != RouteState::Optimized {
            return Err(RuleViolation::illegal(ENTITY, "start", self.state));
        }
        self.state = RouteState::InProgress;
        Ok(())
    }

    /// in_progress -> done
    pub fn complete(&mut self) -> Result<(), RuleViolation> {
        if self.state != RouteState::InProgress {
            return Err(RuleViolation::illegal(ENTITY, "complete", self.state));
        }
        self.state = RouteState::Done;
        Ok(())
    }

    /// Back to draft with every optimization result cleared.
    pub fn reset_to_draft(&mut self) {
        self.state = RouteState::Draft;
        self.total_distance = 0.0;
        self.total_duration = 0.0;
        self.waypoints = None;
        self.optimized_route = None;
    }

    /// Parsed stops; empty when the route has not been optimized.
    pub fn stops(&self) -> Vec<RouteStop> {
        self.optimized_route
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}
