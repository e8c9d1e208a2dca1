//! Acting principal.
//!
//! Authentication happens upstream; requests arrive with the caller identity in
//! `x-user-id` and a comma-separated permission list in `x-user-permissions`.
//!
//! Both headers are trusted as sent. The service must sit behind a gateway that
//! authenticates the caller and strips or overwrites these headers on inbound
//! requests; exposed directly, any client can claim [`UNLIMITED_DELIVERIES`] and
//! lift the daily cap.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::convert::Infallible;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const PERMISSIONS_HEADER: &str = "x-user-permissions";

/// Permission that lifts the daily delivery cap.
pub const UNLIMITED_DELIVERIES: &str = "deliveries:unlimited";

const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub permissions: BTreeSet<String>,
}

impl Principal {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            permissions: BTreeSet::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS)
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }

    /// Exempt from the daily cap via permission or the configured user list.
    pub fn is_capacity_exempt(&self, unlimited_users: &[String]) -> bool {
        self.has_permission(UNLIMITED_DELIVERIES)
            || unlimited_users.iter().any(|user| user == &self.user_id)
    }

    fn from_headers(parts: &Parts) -> Self {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let user_id = header(USER_ID_HEADER).unwrap_or(ANONYMOUS).to_string();
        let permissions = header(PERMISSIONS_HEADER)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            user_id,
            permissions,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Principal::from_headers(parts))
    }
}
