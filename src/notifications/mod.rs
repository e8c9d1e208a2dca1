use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::SmsConfig;

/// Outgoing text message to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmsMessage {
    pub number: String,
    pub body: String,
    pub partner_id: Option<Uuid>,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Gateway rejected message with status {0}")]
    Rejected(u16),
    #[error("No phone number on file")]
    MissingNumber,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SmsGateway: Send + Sync {
    async fn send(&self, message: SmsMessage) -> Result<(), NotificationError>;
}

/// Posts `{number, body, partner_id}` as JSON to a configured endpoint.
#[derive(Clone)]
pub struct HttpSmsGateway {
    client: reqwest::Client,
    url: String,
}

impl HttpSmsGateway {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    #[instrument(skip(self, message), fields(number = %message.number))]
    async fn send(&self, message: SmsMessage) -> Result<(), NotificationError> {
        let response = self.client.post(&self.url).json(&message).send().await?;
        let status = response.status();
        if status.is_success() {
            info!("SMS accepted by gateway");
            Ok(())
        } else {
            Err(NotificationError::Rejected(status.as_u16()))
        }
    }
}

/// Used when no gateway is configured: the message is only logged.
#[derive(Debug, Clone, Default)]
pub struct LogOnlySmsGateway;

#[async_trait]
impl SmsGateway for LogOnlySmsGateway {
    async fn send(&self, message: SmsMessage) -> Result<(), NotificationError> {
        info!(number = %message.number, body = %message.body, "SMS gateway not configured; message logged only");
        Ok(())
    }
}

/// Builds the gateway described by configuration.
pub fn gateway_from_config(config: &SmsConfig) -> Result<Arc<dyn SmsGateway>, NotificationError> {
    match config
        .gateway_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
    {
        Some(url) => Ok(Arc::new(HttpSmsGateway::new(
            url,
            Duration::from_secs(config.timeout_secs),
        )?)),
        None => Ok(Arc::new(LogOnlySmsGateway)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMilestone {
    OnRoad,
    Delivered,
}

impl DeliveryMilestone {
    fn label(&self) -> &'static str {
        match self {
            DeliveryMilestone::OnRoad => "on_road",
            DeliveryMilestone::Delivered => "delivered",
        }
    }
}

/// Recipient data snapshotted on the delivery document.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub partner_id: Option<Uuid>,
    pub partner_name: String,
    pub number: Option<String>,
    pub document_name: String,
}

/// Renders the customer messages and hands them to the gateway.
#[derive(Clone)]
pub struct DeliveryNotifier {
    gateway: Arc<dyn SmsGateway>,
    on_road_template: String,
    delivered_template: String,
}

impl DeliveryNotifier {
    pub fn new(gateway: Arc<dyn SmsGateway>, config: &SmsConfig) -> Self {
        Self {
            gateway,
            on_road_template: config.on_road_template.clone(),
            delivered_template: config.delivered_template.clone(),
        }
    }

    pub fn render(&self, milestone: DeliveryMilestone, recipient: &Recipient) -> String {
        let template = match milestone {
            DeliveryMilestone::OnRoad => &self.on_road_template,
            DeliveryMilestone::Delivered => &self.delivered_template,
        };
        template
            .replace("{partner}", &recipient.partner_name)
            .replace("{document}", &recipient.document_name)
    }

    /// Sends the milestone message.
    pub async fn notify(
        &self,
        milestone: DeliveryMilestone,
        recipient: &Recipient,
    ) -> Result<(), NotificationError> {
        let number = recipient
            .number
            .clone()
            .ok_or(NotificationError::MissingNumber)?;
        let message = SmsMessage {
            number,
            body: self.render(milestone, recipient),
            partner_id: recipient.partner_id,
        };

        match self.gateway.send(message).await {
            Ok(()) => {
                counter!("delivery.sms.sent", 1, "milestone" => milestone.label());
                Ok(())
            }
            Err(e) => {
                counter!("delivery.sms.failed", 1, "milestone" => milestone.label());
                warn!(document = %recipient.document_name, error = %e, "SMS sending failed");
                Err(e)
            }
        }
    }
}
