use chrono::NaiveDate;
use metrics::counter;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    auth::Principal,
    entities::{
        delivery_document::{Column as DeliveryColumn, DeliveryState, Entity as DeliveryEntity},
        VehicleClass,
    },
    errors::{RuleViolation, ServiceError},
};

/// Daily delivery cap per (date, vehicle class).
#[derive(Debug, Clone)]
pub struct CapacityService {
    daily_cap: u32,
    unlimited_users: Vec<String>,
}

impl CapacityService {
    pub fn new(daily_cap: u32, unlimited_users: Vec<String>) -> Self {
        Self {
            daily_cap,
            unlimited_users,
        }
    }

    pub fn daily_cap(&self) -> u32 {
        self.daily_cap
    }

    pub fn is_exempt(&self, principal: &Principal) -> bool {
        principal.is_capacity_exempt(&self.unlimited_users)
    }

    /// Documents already holding a slot on `date` for `vehicle`, excluding `exclude`.
    pub async fn count_existing<C: ConnectionTrait>(
        &self,
        conn: &C,
        date: NaiveDate,
        vehicle: VehicleClass,
        exclude: Option<Uuid>,
    ) -> Result<u64, ServiceError> {
        let mut query = DeliveryEntity::find()
            .filter(DeliveryColumn::DeliveryDate.eq(date))
            .filter(DeliveryColumn::VehicleType.eq(vehicle))
            .filter(DeliveryColumn::State.is_in(DeliveryState::COUNTED));
        if let Some(id) = exclude {
            query = query.filter(DeliveryColumn::Id.ne(id));
        }
        Ok(query.count(conn).await?)
    }

    /// Exemption first, then `count < cap`.
    pub async fn is_within_limit<C: ConnectionTrait>(
        &self,
        conn: &C,
        principal: &Principal,
        date: NaiveDate,
        vehicle: VehicleClass,
        exclude: Option<Uuid>,
    ) -> Result<bool, ServiceError> {
        if self.is_exempt(principal) {
            return Ok(true);
        }
        let existing = self.count_existing(conn, date, vehicle, exclude).await?;
        Ok(existing < u64::from(self.daily_cap))
    }

    #[instrument(skip(self, conn, principal), fields(user = %principal.user_id))]
    pub async fn ensure_within_limit<C: ConnectionTrait>(
        &self,
        conn: &C,
        principal: &Principal,
        date: NaiveDate,
        vehicle: VehicleClass,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        if self.is_exempt(principal) {
            debug!("Daily cap skipped for exempt principal");
            return Ok(());
        }

        let existing = self.count_existing(conn, date, vehicle, exclude).await?;
        check_count(existing, self.daily_cap, date, vehicle).map_err(|violation| {
            counter!("delivery.capacity.rejected", 1, "vehicle" => vehicle.code());
            violation.into()
        })
    }
}

/// Pure comparison used by [`CapacityService::ensure_within_limit`].
pub fn check_count(
    existing: u64,
    cap: u32,
    date: NaiveDate,
    vehicle: VehicleClass,
) -> Result<(), RuleViolation> {
    if existing >= u64::from(cap) {
        return Err(RuleViolation::DailyCapExceeded {
            date,
            vehicle: vehicle.code().to_string(),
            cap,
            existing,
        });
    }
    Ok(())
}
