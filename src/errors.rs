use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Bad Request")
    pub error: String,
    /// Machine-readable error code
    pub code: String,
    /// Human-readable error description
    pub message: String,
    /// Structured rule violation, when the failure came from a delivery rule
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// ISO 8601 timestamp when error occurred
    pub timestamp: String,
}

/// A delivery rule that blocked a write or a state transition.
///
/// Every variant carries enough context for the caller to tell the user what to change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleViolation {
    #[error("Deliveries cannot be scheduled on {day}")]
    NonWorkingDay {
        #[serde(skip_serializing_if = "Option::is_none")]
        date: Option<NaiveDate>,
        day: String,
    },

    #[error(
        "District {district} does not receive deliveries on {day}. Allowed days: {}",
        .allowed.join(", ")
    )]
    DistrictDayMismatch {
        district: String,
        day: String,
        allowed: Vec<String>,
    },

    #[error(
        "Daily delivery limit of {cap} reached for {vehicle} on {date} ({existing} already scheduled)"
    )]
    DailyCapExceeded {
        date: NaiveDate,
        vehicle: String,
        cap: u32,
        existing: u64,
    },

    #[error("{field} is required before this action")]
    MissingField { field: String },

    #[error("Cannot {action} a {entity} in state {from}")]
    IllegalTransition {
        entity: String,
        action: String,
        from: String,
    },

    #[error("Planning has no delivery documents")]
    EmptyPlanning,

    #[error("Delivery documents not ready: {}", .pending.join(", "))]
    DeliveriesNotReady { pending: Vec<String> },

    #[error("Delivery documents not delivered yet: {}", .pending.join(", "))]
    DeliveriesNotDelivered { pending: Vec<String> },

    #[error("Planning date {date} is in the past")]
    PastPlanningDate { date: NaiveDate },

    #[error("A rule for district {district} on {day} already exists")]
    DuplicateRule { district: String, day: String },

    #[error("Weekday {weekday} is outside 0-6")]
    InvalidWeekday { weekday: i32 },

    #[error("District name must not be empty")]
    EmptyDistrict,

    #[error("Transfer {transfer} is not eligible for delivery: {reason}")]
    TransferNotEligible { transfer: String, reason: String },

    #[error("{field} of {document} can only be changed while in draft")]
    NotEditable { document: String, field: String },
}

impl RuleViolation {
    pub fn illegal(entity: &str, action: &str, from: impl ToString) -> Self {
        Self::IllegalTransition {
            entity: entity.to_string(),
            action: action.to_string(),
            from: from.to_string(),
        }
    }

    pub fn missing(field: &str) -> Self {
        Self::MissingField {
            field: field.to_string(),
        }
    }

    /// Stable machine-readable code, also used as a metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NonWorkingDay { .. } => "non_working_day",
            Self::DistrictDayMismatch { .. } => "district_day_mismatch",
            Self::DailyCapExceeded { .. } => "daily_cap_exceeded",
            Self::MissingField { .. } => "missing_field",
            Self::IllegalTransition { .. } => "illegal_transition",
            Self::EmptyPlanning => "empty_planning",
            Self::DeliveriesNotReady { .. } => "deliveries_not_ready",
            Self::DeliveriesNotDelivered { .. } => "deliveries_not_delivered",
            Self::PastPlanningDate { .. } => "past_planning_date",
            Self::DuplicateRule { .. } => "duplicate_rule",
            Self::InvalidWeekday { .. } => "invalid_weekday",
            Self::EmptyDistrict => "empty_district",
            Self::TransferNotEligible { .. } => "transfer_not_eligible",
            Self::NotEditable { .. } => "not_editable",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("{0}")]
    Rule(#[from] RuleViolation),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl From<crate::routing::RoutingError> for ServiceError {
    fn from(err: crate::routing::RoutingError) -> Self {
        ServiceError::ExternalServiceError(err.to_string())
    }
}

impl ServiceError {
    pub fn not_found(entity: &str, id: impl std::fmt::Display) -> Self {
        ServiceError::NotFound(format!("{} {} not found", entity, id))
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Rule(RuleViolation::IllegalTransition { .. })
            | Self::Rule(RuleViolation::DuplicateRule { .. }) => StatusCode::CONFLICT,
            Self::Rule(_) => StatusCode::BAD_REQUEST,
            Self::ConfigError(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::ExternalServiceError(_) => StatusCode::BAD_GATEWAY,
            Self::DatabaseError(_)
            | Self::EventError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => {
                "Internal server error".to_string()
            }
            _ => self.to_string(),
        }
    }

    /// Machine-readable code for the response body. Rule violations use their own code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rule(violation) => violation.code(),
            Self::NotFound(_) => "not_found",
            Self::ValidationError(_) => "validation_error",
            Self::InvalidInput(_) => "invalid_input",
            Self::ConfigError(_) => "configuration_error",
            Self::ExternalServiceError(_) => "external_service_error",
            Self::DatabaseError(_) => "database_error",
            Self::EventError(_) | Self::InternalError(_) | Self::Other(_) => "internal_error",
        }
    }

    pub fn rule(&self) -> Option<&RuleViolation> {
        match self {
            Self::Rule(violation) => Some(violation),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let details = self
            .rule()
            .and_then(|violation| serde_json::to_value(violation).ok());

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            code: self.code().to_string(),
            message: self.response_message(),
            details,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}
