#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::{Datelike, Duration, NaiveDate, Utc};
use delivery_management::{
    auth::{Principal, PERMISSIONS_HEADER, USER_ID_HEADER},
    build_router,
    config::AppConfig,
    db::{self, DbConfig},
    entities::{
        partner,
        stock_transfer::{self, PickingType, TransferState},
    },
    events::{self, EventSender},
    notifications::{NotificationError, SmsGateway, SmsMessage},
    routing::GoogleDirectionsClient,
    services::AppServices,
    AppState,
};
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

/// Records every message instead of sending it. `fail_sends(true)` makes it reject everything.
#[derive(Default)]
pub struct RecordingGateway {
    pub sent: Mutex<Vec<SmsMessage>>,
    fail: AtomicBool,
}

impl RecordingGateway {
    pub fn messages(&self) -> Vec<SmsMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SmsGateway for RecordingGateway {
    async fn send(&self, message: SmsMessage) -> Result<(), NotificationError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(NotificationError::Rejected(503));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
        Ok(())
    }
}

/// Application state backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub sms: Arc<RecordingGateway>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(cfg: AppConfig) -> Self {
        let pool = db::establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db = Arc::new(pool);
        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let sms = Arc::new(RecordingGateway::default());
        let routing = GoogleDirectionsClient::from_config(&cfg.routing)
            .expect("routing client for tests");
        let services = AppServices::new(
            db.clone(),
            &cfg,
            event_sender.clone(),
            Arc::new(routing),
            sms.clone(),
        );

        let state = AppState {
            db,
            config: cfg,
            event_sender,
            services,
        };
        let router = build_router(state.clone());

        Self {
            router,
            state,
            sms,
            _event_task: event_task,
        }
    }

    pub fn services(&self) -> &AppServices {
        &self.state.services
    }

    pub fn event_sender(&self) -> EventSender {
        self.state.event_sender.clone()
    }

    pub async fn seed_partner(&self, name: &str, city: &str, mobile: Option<&str>) -> partner::Model {
        partner::ActiveModel {
            name: Set(name.to_string()),
            phone: Set(Some("+90 216 000 00 00".to_string())),
            mobile: Set(mobile.map(str::to_string)),
            city: Set(Some(city.to_string())),
            contact_address: Set(Some(format!("{} Mah. No:1, {}", name, city))),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed partner")
    }

    pub async fn seed_transfer_with(
        &self,
        partner_id: Option<Uuid>,
        picking_type: PickingType,
        state: TransferState,
    ) -> stock_transfer::Model {
        stock_transfer::ActiveModel {
            name: Set(format!("WH/OUT/{}", &Uuid::new_v4().simple().to_string()[..6])),
            partner_id: Set(partner_id),
            picking_type: Set(picking_type),
            state: Set(state),
            has_vehicle_selected: Set(false),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("seed transfer")
    }

    /// Done outgoing transfer for a new partner in `city`.
    pub async fn seed_delivery_transfer(&self, city: &str) -> stock_transfer::Model {
        let partner = self
            .seed_partner(&format!("Müşteri {}", city), city, Some("+90 555 000 00 00"))
            .await;
        self.seed_transfer_with(Some(partner.id), PickingType::Outgoing, TransferState::Done)
            .await
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        principal: Option<&Principal>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(principal) = principal {
            builder = builder.header(USER_ID_HEADER, principal.user_id.as_str());
            let permissions: Vec<&str> = principal.permissions.iter().map(String::as_str).collect();
            if !permissions.is_empty() {
                builder = builder.header(PERMISSIONS_HEADER, permissions.join(","));
            }
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.environment = "test".to_string();
    cfg.database.url = "sqlite::memory:".to_string();
    cfg
}

pub fn dispatcher() -> Principal {
    Principal::new("dispatcher")
}

/// First date strictly after today falling on `weekday` (Monday = 0).
pub fn next_weekday(weekday: u8) -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(1);
    while date.weekday().num_days_from_monday() as u8 != weekday {
        date += Duration::days(1);
    }
    date
}

pub async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json body")
}
