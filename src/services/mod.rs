use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::{
    config::AppConfig,
    errors::ServiceError,
    events::EventSender,
    notifications::{self, DeliveryNotifier, SmsGateway},
    routing::{GoogleDirectionsClient, RoutingService},
};

pub mod capacity;
pub mod deliveries;
pub mod district_days;
pub mod plannings;
pub mod routes;
pub mod sequences;
pub mod vehicle_selection;

use capacity::CapacityService;
use deliveries::DeliveryService;
use district_days::DistrictDayService;
use plannings::PlanningService;
use routes::RouteService;
use vehicle_selection::VehicleSelectionService;

/// Every service the HTTP layer needs, sharing one pool and one event channel.
#[derive(Clone)]
pub struct AppServices {
    pub district_days: DistrictDayService,
    pub capacity: CapacityService,
    pub deliveries: DeliveryService,
    pub plannings: PlanningService,
    pub routes: RouteService,
    pub vehicle_selection: VehicleSelectionService,
}

impl AppServices {
    /// Wires services around the given adapters.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: &AppConfig,
        event_sender: EventSender,
        routing: Arc<dyn RoutingService>,
        sms_gateway: Arc<dyn SmsGateway>,
    ) -> Self {
        let district_days = DistrictDayService::new(
            db.clone(),
            config.delivery.rule_source,
            event_sender.clone(),
        );
        let capacity = CapacityService::new(
            config.delivery.daily_cap,
            config.delivery.unlimited_users.clone(),
        );
        let notifier = DeliveryNotifier::new(sms_gateway, &config.sms);
        let deliveries = DeliveryService::new(
            db.clone(),
            district_days.clone(),
            capacity.clone(),
            notifier,
            event_sender.clone(),
        );
        let plannings = PlanningService::new(db.clone(), event_sender.clone());
        let routes = RouteService::new(
            db.clone(),
            routing,
            config.routing.clone(),
            event_sender.clone(),
        );
        let vehicle_selection =
            VehicleSelectionService::new(db, deliveries.clone(), event_sender);

        Self {
            district_days,
            capacity,
            deliveries,
            plannings,
            routes,
            vehicle_selection,
        }
    }

    /// Builds the HTTP routing client and SMS gateway from configuration.
    pub fn from_config(
        db: Arc<DatabaseConnection>,
        config: &AppConfig,
        event_sender: EventSender,
    ) -> Result<Self, ServiceError> {
        let routing = GoogleDirectionsClient::from_config(&config.routing)
            .map_err(|e| ServiceError::ConfigError(format!("Routing client: {}", e)))?;
        let sms_gateway = notifications::gateway_from_config(&config.sms)
            .map_err(|e| ServiceError::ConfigError(format!("SMS gateway: {}", e)))?;
        Ok(Self::new(
            db,
            config,
            event_sender,
            Arc::new(routing),
            sms_gateway,
        ))
    }
}
