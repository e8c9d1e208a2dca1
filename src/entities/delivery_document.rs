use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::VehicleClass;
use crate::errors::RuleViolation;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, DeriveActiveEnum,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "on_road")]
    OnRoad,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl DeliveryState {
    /// States that occupy a slot of the daily cap.
    pub const COUNTED: [DeliveryState; 3] = [
        DeliveryState::Ready,
        DeliveryState::OnRoad,
        DeliveryState::Delivered,
    ];

    pub fn counts_toward_capacity(&self) -> bool {
        Self::COUNTED.contains(self)
    }
}

impl fmt::Display for DeliveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryState::Draft => write!(f, "draft"),
            DeliveryState::Ready => write!(f, "ready"),
            DeliveryState::OnRoad => write!(f, "on_road"),
            DeliveryState::Delivered => write!(f, "delivered"),
            DeliveryState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Delivery document created from an outgoing transfer.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "delivery_documents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub state: DeliveryState,
    pub picking_id: Uuid,
    pub planning_id: Option<Uuid>,
    pub partner_id: Option<Uuid>,
    pub partner_name: Option<String>,
    pub partner_phone: Option<String>,
    pub partner_mobile: Option<String>,
    pub delivery_address: Option<String>,
    pub district: String,
    pub delivery_date: Option<NaiveDate>,
    pub vehicle_type: Option<VehicleClass>,
    pub route_info: Option<String>,
    pub map_url: Option<String>,
    pub sms_sent_on_road: bool,
    pub sms_sent_delivered: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::stock_transfer::Entity",
        from = "Column::PickingId",
        to = "super::stock_transfer::Column::Id"
    )]
    StockTransfer,
    #[sea_orm(
        belongs_to = "super::delivery_planning::Entity",
        from = "Column::PlanningId",
        to = "super::delivery_planning::Column::Id"
    )]
    Planning,
}

impl Related<super::stock_transfer::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockTransfer.def()
    }
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

const ENTITY: &str = "delivery";

impl Model {
    /// draft -> ready
    pub fn confirm(&mut self) -> Result<(), RuleViolation> {
        if self.state != DeliveryState::Draft {
            return Err(RuleViolation::illegal(ENTITY, "confirm", self.state));
        }
        if self.delivery_date.is_none() {
            return Err(RuleViolation::missing("delivery_date"));
        }
        if self.vehicle_type.is_none() {
            return Err(RuleViolation::missing("vehicle_type"));
        }
        self.state = DeliveryState::Ready;
        Ok(())
    }

    /// ready -> on_road. Returns true when the "on the way" message is still owed.
    pub fn dispatch(&mut self) -> Result<bool, RuleViolation> {
        if self.state != DeliveryState::Ready {
            return Err(RuleViolation::illegal(ENTITY, "dispatch", self.state));
        }
        self.state = DeliveryState::OnRoad;
        let owed = !self.sms_sent_on_road;
        self.sms_sent_on_road = true;
        Ok(owed)
    }

    /// on_road -> delivered. Returns true when the "delivered" message is still owed.
    pub fn complete(&mut self) -> Result<bool, RuleViolation> {
        if self.state != DeliveryState::OnRoad {
            return Err(RuleViolation::illegal(ENTITY, "complete", self.state));
        }
        self.state = DeliveryState::Delivered;
        let owed = !self.sms_sent_delivered;
        self.sms_sent_delivered = true;
        Ok(owed)
    }

    pub fn cancel(&mut self) -> Result<(), RuleViolation> {
        if self.state == DeliveryState::Delivered {
            return Err(RuleViolation::illegal(ENTITY, "cancel", self.state));
        }
        self.state = DeliveryState::Cancelled;
        Ok(())
    }

    pub fn reset_to_draft(&mut self) {
        self.state = DeliveryState::Draft;
        self.sms_sent_on_road = false;
        self.sms_sent_delivered = false;
    }

    pub fn is_draft(&self) -> bool {
        self.state == DeliveryState::Draft
    }

    /// Fails with `NotEditable` unless the document is still a draft.
    pub fn ensure_editable(&self, field: &str) -> Result<(), RuleViolation> {
        if self.is_draft() {
            Ok(())
        } else {
            Err(RuleViolation::NotEditable {
                document: self.name.clone(),
                field: field.to_string(),
            })
        }
    }

    pub fn sms_number(&self) -> Option<&str> {
        self.partner_mobile
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.partner_phone.as_deref().filter(|p| !p.trim().is_empty()))
    }
}
