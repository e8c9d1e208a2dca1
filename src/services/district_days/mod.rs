pub mod builtin;

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    calendar,
    config::RuleSource,
    entities::district_day_rule::{
        validate_rule, ActiveModel as RuleActiveModel, Column as RuleColumn,
        Entity as RuleEntity, Model as RuleModel, DEFAULT_MAX_DELIVERY_COUNT,
    },
    errors::{RuleViolation, ServiceError},
    events::{Event, EventSender},
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateDistrictRule {
    #[validate(length(min = 1, max = 100))]
    pub district_name: String,
    pub weekday: i32,
    pub is_active: Option<bool>,
    #[validate(range(min = 1))]
    pub max_delivery_count: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateDistrictRule {
    #[validate(length(min = 1, max = 100))]
    pub district_name: Option<String>,
    pub weekday: Option<i32>,
    pub is_active: Option<bool>,
    #[validate(range(min = 1))]
    pub max_delivery_count: Option<i32>,
    pub notes: Option<String>,
}

/// District/weekday eligibility, backed by rule rows or the static calendar.
#[derive(Clone)]
pub struct DistrictDayService {
    db: Arc<DatabaseConnection>,
    rule_source: RuleSource,
    event_sender: EventSender,
}

impl DistrictDayService {
    pub fn new(db: Arc<DatabaseConnection>, rule_source: RuleSource, event_sender: EventSender) -> Self {
        Self {
            db,
            rule_source,
            event_sender,
        }
    }

    pub fn rule_source(&self) -> RuleSource {
        self.rule_source
    }

    /// Weekdays the district may receive deliveries on.
    pub async fn allowed_weekdays(&self, district: &str) -> Result<BTreeSet<u8>, ServiceError> {
        self.allowed_weekdays_on(&*self.db, district).await
    }

    pub async fn is_compatible(&self, district: &str, weekday: u8) -> Result<bool, ServiceError> {
        self.is_compatible_on(&*self.db, district, weekday).await
    }

    /// Rule rows decide once the source says so; otherwise the regional plans do.
    async fn uses_records_on<C: ConnectionTrait>(&self, conn: &C) -> Result<bool, ServiceError> {
        Ok(match self.rule_source {
            RuleSource::Builtin => false,
            RuleSource::Records => true,
            RuleSource::RecordsWithBuiltinFallback => RuleEntity::find().count(conn).await? > 0,
        })
    }

    async fn is_compatible_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        district: &str,
        weekday: u8,
    ) -> Result<bool, ServiceError> {
        if self.uses_records_on(conn).await? {
            let matching = RuleEntity::find()
                .filter(RuleColumn::DistrictName.eq(district))
                .filter(RuleColumn::Weekday.eq(i32::from(weekday)))
                .filter(RuleColumn::IsActive.eq(true))
                .count(conn)
                .await?;
            Ok(matching > 0)
        } else {
            Ok(builtin::is_compatible(district, weekday))
        }
    }

    /// Per-rule override, or the default when no active rule exists.
    pub async fn max_delivery_count(&self, district: &str, weekday: u8) -> Result<i32, ServiceError> {
        let rule = RuleEntity::find()
            .filter(RuleColumn::DistrictName.eq(district))
            .filter(RuleColumn::Weekday.eq(i32::from(weekday)))
            .filter(RuleColumn::IsActive.eq(true))
            .one(&*self.db)
            .await?;
        Ok(rule.map_or(DEFAULT_MAX_DELIVERY_COUNT, |r| r.max_delivery_count))
    }

    pub(crate) async fn allowed_weekdays_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        district: &str,
    ) -> Result<BTreeSet<u8>, ServiceError> {
        if !self.uses_records_on(conn).await? {
            return Ok(builtin::allowed_weekdays_for(district).into_iter().collect());
        }

        let rules = RuleEntity::find()
            .filter(RuleColumn::DistrictName.eq(district))
            .filter(RuleColumn::IsActive.eq(true))
            .all(conn)
            .await?;
        Ok(rules
            .into_iter()
            .filter_map(|rule| u8::try_from(rule.weekday).ok())
            .collect())
    }

    /// Non-working day always applies; district compatibility only when a district is known.
    pub(crate) async fn check_delivery_date_on<C: ConnectionTrait>(
        &self,
        conn: &C,
        district: &str,
        date: NaiveDate,
    ) -> Result<(), ServiceError> {
        if calendar::is_non_working(date) {
            return Err(RuleViolation::NonWorkingDay {
                date: Some(date),
                day: calendar::date_day_name(date),
            }
            .into());
        }

        let district = district.trim();
        if district.is_empty() {
            return Ok(());
        }

        let weekday = calendar::weekday_of(date);
        if self.is_compatible_on(conn, district, weekday).await? {
            return Ok(());
        }

        let allowed = self.allowed_weekdays_on(conn, district).await?;
        Err(RuleViolation::DistrictDayMismatch {
            district: district.to_string(),
            day: calendar::date_day_name(date),
            allowed: allowed
                .iter()
                .filter_map(|day| calendar::day_name(*day))
                .map(str::to_string)
                .collect(),
        }
        .into())
    }

    #[instrument(skip(self))]
    pub async fn list_rules(&self, district: Option<String>) -> Result<Vec<RuleModel>, ServiceError> {
        let mut query = RuleEntity::find();
        if let Some(district) = district.filter(|d| !d.trim().is_empty()) {
            query = query.filter(RuleColumn::DistrictName.eq(district));
        }
        Ok(query
            .order_by_asc(RuleColumn::DistrictName)
            .order_by_asc(RuleColumn::Weekday)
            .all(&*self.db)
            .await?)
    }

    pub async fn get_rule(&self, id: Uuid) -> Result<RuleModel, ServiceError> {
        RuleEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("District rule", id))
    }

    #[instrument(skip(self, input), fields(district = %input.district_name, weekday = input.weekday))]
    pub async fn create_rule(&self, input: CreateDistrictRule) -> Result<RuleModel, ServiceError> {
        input.validate()?;
        let district = input.district_name.trim().to_string();
        let active = input.is_active.unwrap_or(true);
        validate_rule(&district, input.weekday, active)?;
        self.ensure_unique(&district, input.weekday, None).await?;

        let rule = RuleActiveModel {
            district_name: Set(district),
            weekday: Set(input.weekday),
            is_active: Set(active),
            max_delivery_count: Set(input
                .max_delivery_count
                .unwrap_or(DEFAULT_MAX_DELIVERY_COUNT)),
            notes: Set(input.notes),
            ..Default::default()
        }
        .insert(&*self.db)
        .await
        .map_err(|e| {
            error!("Failed to create district rule: {}", e);
            ServiceError::DatabaseError(e)
        })?;

        info!(rule = %rule.display_name(), "District rule created");
        self.publish(&rule).await;
        Ok(rule)
    }

    #[instrument(skip(self, patch))]
    pub async fn update_rule(&self, id: Uuid, patch: UpdateDistrictRule) -> Result<RuleModel, ServiceError> {
        patch.validate()?;
        let current = self.get_rule(id).await?;

        let district = patch
            .district_name
            .as_deref()
            .map(str::trim)
            .unwrap_or(&current.district_name)
            .to_string();
        let weekday = patch.weekday.unwrap_or(current.weekday);
        let active = patch.is_active.unwrap_or(current.is_active);
        validate_rule(&district, weekday, active)?;
        if district != current.district_name || weekday != current.weekday {
            self.ensure_unique(&district, weekday, Some(id)).await?;
        }

        let mut rule: RuleActiveModel = current.into();
        rule.district_name = Set(district);
        rule.weekday = Set(weekday);
        rule.is_active = Set(active);
        if let Some(max) = patch.max_delivery_count {
            rule.max_delivery_count = Set(max);
        }
        if patch.notes.is_some() {
            rule.notes = Set(patch.notes);
        }

        let rule = rule.update(&*self.db).await?;
        info!(rule = %rule.display_name(), "District rule updated");
        self.publish(&rule).await;
        Ok(rule)
    }

    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<RuleModel, ServiceError> {
        self.update_rule(
            id,
            UpdateDistrictRule {
                is_active: Some(active),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete_rule(&self, id: Uuid) -> Result<(), ServiceError> {
        let rule = self.get_rule(id).await?;
        RuleEntity::delete_by_id(id).exec(&*self.db).await?;
        info!(rule = %rule.display_name(), "District rule deleted");
        self.publish(&rule).await;
        Ok(())
    }

    async fn ensure_unique(
        &self,
        district: &str,
        weekday: i32,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = RuleEntity::find()
            .filter(RuleColumn::DistrictName.eq(district))
            .filter(RuleColumn::Weekday.eq(weekday));
        if let Some(id) = exclude {
            query = query.filter(RuleColumn::Id.ne(id));
        }
        if query.count(&*self.db).await? > 0 {
            return Err(RuleViolation::DuplicateRule {
                district: district.to_string(),
                day: u8::try_from(weekday)
                    .ok()
                    .and_then(calendar::day_name)
                    .unwrap_or_default()
                    .to_string(),
            }
            .into());
        }
        Ok(())
    }

    async fn publish(&self, rule: &RuleModel) {
        self.event_sender
            .send_or_log(Event::DistrictRuleChanged {
                rule_id: rule.id,
                district: rule.district_name.clone(),
                weekday: rule.weekday,
            })
            .await;
    }
}
