use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::VehicleClass;

/// Domain events published after a write commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    DeliveryCreated {
        delivery_id: Uuid,
        name: String,
    },
    DeliveryStateChanged {
        delivery_id: Uuid,
        old_state: String,
        new_state: String,
    },
    CapacityRejected {
        date: NaiveDate,
        vehicle: VehicleClass,
        existing: u64,
        cap: u32,
    },
    PlanningCreated(Uuid),
    PlanningStateChanged {
        planning_id: Uuid,
        old_state: String,
        new_state: String,
        affected_deliveries: u64,
    },
    RouteOptimized {
        route_id: Uuid,
        planning_id: Uuid,
        total_distance_km: f64,
        total_duration_min: f64,
    },
    RouteStateChanged {
        route_id: Uuid,
        old_state: String,
        new_state: String,
    },
    DistrictRuleChanged {
        rule_id: Uuid,
        district: String,
        weekday: i32,
    },
    VehicleSelected {
        transfer_id: Uuid,
        vehicle: VehicleClass,
        created_documents: usize,
    },
    NotificationFailed {
        delivery_id: Uuid,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends and logs on failure; events never fail the originating action.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Dropping domain event");
        }
    }
}

/// Creates an event channel with the given capacity.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Consumes events until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::CapacityRejected {
                date,
                vehicle,
                existing,
                cap,
            } => {
                warn!(%date, %vehicle, existing, cap, "Daily delivery cap reached");
            }
            Event::NotificationFailed {
                delivery_id,
                reason,
            } => {
                warn!(%delivery_id, %reason, "Customer notification failed");
            }
            other => {
                info!(event = ?other, "Domain event");
            }
        }
    }

    info!("Event processing loop stopped");
}
