//! Routing service adapter.
//!
//! The delivery side only needs one call: origin, destination and a set of
//! stops in, per-leg distances and the optimized stop order out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::RoutingConfig;

const TRAVEL_MODE: &str = "driving";
const MAPS_DIRECTIONS_URL: &str = "https://www.google.com/maps/dir/";

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("Routing request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Routing service returned {status}: {message}")]
    Status { status: String, message: String },
    #[error("Routing service returned no route")]
    NoRoute,
    #[error("Invalid routing URL: {0}")]
    Url(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectionsRequest {
    pub origin: String,
    pub destination: String,
    pub waypoints: Vec<String>,
    pub optimize_waypoints: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Leg {
    pub distance_meters: u64,
    pub distance_text: String,
    pub duration_seconds: u64,
    pub duration_text: String,
}

/// First route returned by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct Directions {
    pub legs: Vec<Leg>,
    /// Visiting order as indices into the request's waypoints.
    pub waypoint_order: Vec<usize>,
}

impl Directions {
    pub fn total_distance_km(&self) -> f64 {
        self.legs.iter().map(|leg| leg.distance_meters).sum::<u64>() as f64 / 1000.0
    }

    pub fn total_duration_min(&self) -> f64 {
        self.legs.iter().map(|leg| leg.duration_seconds).sum::<u64>() as f64 / 60.0
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoutingService: Send + Sync {
    async fn directions(
        &self,
        api_key: &str,
        request: &DirectionsRequest,
    ) -> Result<Directions, RoutingError>;
}

/// Google Directions API JSON client.
#[derive(Clone)]
pub struct GoogleDirectionsClient {
    client: reqwest::Client,
    base_url: String,
}

impl GoogleDirectionsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RoutingError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &RoutingConfig) -> Result<Self, RoutingError> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    fn request_url(&self, api_key: &str, request: &DirectionsRequest) -> Result<Url, RoutingError> {
        let mut url = Url::parse(&self.base_url)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("origin", &request.origin)
                .append_pair("destination", &request.destination)
                .append_pair("mode", TRAVEL_MODE);
            if !request.waypoints.is_empty() {
                let mut waypoints = request.waypoints.join("|");
                if request.optimize_waypoints {
                    waypoints = format!("optimize:true|{}", waypoints);
                }
                query.append_pair("waypoints", &waypoints);
            }
            query.append_pair("key", api_key);
        }
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    routes: Vec<ApiRoute>,
}

#[derive(Debug, Deserialize)]
struct ApiRoute {
    #[serde(default)]
    legs: Vec<ApiLeg>,
    #[serde(default)]
    waypoint_order: Vec<usize>,
}

#[derive(Debug, Deserialize)]
struct ApiLeg {
    distance: ApiValue,
    duration: ApiValue,
}

#[derive(Debug, Deserialize)]
struct ApiValue {
    value: u64,
    text: String,
}

#[async_trait]
impl RoutingService for GoogleDirectionsClient {
    #[instrument(skip(self, api_key, request), fields(stops = request.waypoints.len()))]
    async fn directions(
        &self,
        api_key: &str,
        request: &DirectionsRequest,
    ) -> Result<Directions, RoutingError> {
        let url = self.request_url(api_key, request)?;
        let body: ApiResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if body.status != "OK" {
            return Err(RoutingError::Status {
                message: body.error_message.unwrap_or_default(),
                status: body.status,
            });
        }

        let route = body.routes.into_iter().next().ok_or(RoutingError::NoRoute)?;
        if route.legs.is_empty() {
            return Err(RoutingError::NoRoute);
        }
        debug!(legs = route.legs.len(), "Directions received");

        Ok(Directions {
            legs: route
                .legs
                .into_iter()
                .map(|leg| Leg {
                    distance_meters: leg.distance.value,
                    distance_text: leg.distance.text,
                    duration_seconds: leg.duration.value,
                    duration_text: leg.duration.text,
                })
                .collect(),
            waypoint_order: route.waypoint_order,
        })
    }
}

/// Shareable Google Maps directions link visiting `stops` in order.
pub fn maps_url(origin: &str, destination: &str, stops: &[String]) -> Result<Url, RoutingError> {
    let mut url = Url::parse(MAPS_DIRECTIONS_URL)?;
    url.query_pairs_mut()
        .append_pair("api", "1")
        .append_pair("origin", origin)
        .append_pair("destination", destination)
        .append_pair("waypoints", &stops.join("|"))
        .append_pair("travelmode", TRAVEL_MODE);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_convert_units() {
        let directions = Directions {
            legs: vec![
                Leg {
                    distance_meters: 1500,
                    distance_text: "1.5 km".into(),
                    duration_seconds: 600,
                    duration_text: "10 mins".into(),
                },
                Leg {
                    distance_meters: 3500,
                    distance_text: "3.5 km".into(),
                    duration_seconds: 1200,
                    duration_text: "20 mins".into(),
                },
            ],
            waypoint_order: vec![0],
        };
        assert_eq!(directions.total_distance_km(), 5.0);
        assert_eq!(directions.total_duration_min(), 30.0);
    }

    #[test]
    fn request_url_marks_waypoints_for_optimization() {
        let client = GoogleDirectionsClient::new(
            "https://maps.example.com/directions/json",
            Duration::from_secs(1),
        )
        .unwrap();
        let url = client
            .request_url(
                "secret",
                &DirectionsRequest {
                    origin: "Depo".into(),
                    destination: "Depo".into(),
                    waypoints: vec!["A".into(), "B".into()],
                    optimize_waypoints: true,
                },
            )
            .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("waypoints".into(), "optimize:true|A|B".into())));
        assert!(pairs.contains(&("key".into(), "secret".into())));
        assert!(pairs.contains(&("mode".into(), "driving".into())));
    }

    #[test]
    fn maps_url_keeps_stop_order() {
        let url = maps_url(
            "Depo",
            "Depo",
            &["Kadıköy".to_string(), "Üsküdar".to_string()],
        )
        .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(url.host_str(), Some("www.google.com"));
        assert!(pairs.contains(&("origin".into(), "Depo".into())));
        assert!(pairs.contains(&("waypoints".into(), "Kadıköy|Üsküdar".into())));
    }
}
