use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

use crate::calendar::{self, NON_WORKING_WEEKDAY};
use crate::errors::RuleViolation;

pub const DEFAULT_MAX_DELIVERY_COUNT: i32 = 7;

/// Admin-managed "district X receives deliveries on weekday Y" row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "district_day_rules")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub district_name: String,
    /// Monday = 0 .. Sunday = 6
    pub weekday: i32,
    pub is_active: bool,
    pub max_delivery_count: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

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

impl Model {
    /// "<district> - <day name>"
    pub fn display_name(&self) -> String {
        display_name(&self.district_name, self.weekday)
    }
}

pub fn display_name(district: &str, weekday: i32) -> String {
    let day = u8::try_from(weekday)
        .ok()
        .and_then(calendar::day_name)
        .unwrap_or("?");
    format!("{} - {}", district, day)
}

/// Field-level checks shared by create, update and activation.
pub fn validate_rule(district: &str, weekday: i32, active: bool) -> Result<(), RuleViolation> {
    if district.trim().is_empty() {
        return Err(RuleViolation::EmptyDistrict);
    }
    if !(0..=6).contains(&weekday) {
        return Err(RuleViolation::InvalidWeekday { weekday });
    }
    if active && weekday == i32::from(NON_WORKING_WEEKDAY) {
        return Err(RuleViolation::NonWorkingDay {
            date: None,
            day: calendar::day_name(NON_WORKING_WEEKDAY)
                .unwrap_or_default()
                .to_string(),
        });
    }
    Ok(())
}
