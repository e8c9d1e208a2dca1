use std::sync::Arc;

use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::RoutingConfig,
    entities::{
        delivery_document::Model as DeliveryModel,
        delivery_route::{
            ActiveModel as RouteActiveModel, Column as RouteColumn, Entity as RouteEntity,
            Model as RouteModel, RouteState, RouteStop,
        },
    },
    errors::{RuleViolation, ServiceError},
    events::{Event, EventSender},
    routing::{self, Directions, DirectionsRequest, RoutingService},
    services::{
        plannings,
        sequences::{self, SequenceCode},
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoute {
    #[validate(length(max = 64))]
    pub name: Option<String>,
    pub planning_id: Uuid,
    #[validate(length(min = 1))]
    pub start_location: String,
    #[validate(length(min = 1))]
    pub end_location: String,
}

/// Route optimization over a planning's delivery addresses.
#[derive(Clone)]
pub struct RouteService {
    db: Arc<DatabaseConnection>,
    routing: Arc<dyn RoutingService>,
    config: RoutingConfig,
    event_sender: EventSender,
}

impl RouteService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        routing: Arc<dyn RoutingService>,
        config: RoutingConfig,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            routing,
            config,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(planning_id = %input.planning_id))]
    pub async fn create(&self, input: CreateRoute) -> Result<RouteModel, ServiceError> {
        input.validate()?;
        let txn = self.db.begin().await?;
        let planning = plannings::find_on(&txn, input.planning_id).await?;

        let name = if sequences::needs_generated_name(input.name.as_deref()) {
            sequences::next_name(&txn, SequenceCode::DeliveryRoute).await?
        } else {
            input.name.unwrap_or_default().trim().to_string()
        };

        let route = RouteActiveModel {
            name: Set(name),
            planning_id: Set(planning.id),
            vehicle_type: Set(planning.vehicle_type),
            state: Set(RouteState::Draft),
            start_location: Set(input.start_location),
            end_location: Set(input.end_location),
            waypoints: Set(None),
            total_distance: Set(0.0),
            total_duration: Set(0.0),
            optimized_route: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        info!(route = %route.name, planning = %planning.name, "Route created");
        Ok(route)
    }

    /// Calls the routing service once and stores the result on the route and its planning.
    #[instrument(skip(self))]
    pub async fn optimize(&self, id: Uuid) -> Result<RouteModel, ServiceError> {
        let route = find(&*self.db, id).await?;
        route.ensure_optimizable()?;
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| ServiceError::ConfigError("Routing API key is not configured".into()))?;

        let children = plannings::children_on(&*self.db, route.planning_id).await?;
        let addresses = delivery_addresses(&children);
        let request = DirectionsRequest {
            origin: route.start_location.clone(),
            destination: route.end_location.clone(),
            waypoints: addresses.clone(),
            optimize_waypoints: true,
        };

        let directions = match self.routing.directions(api_key, &request).await {
            Ok(directions) if !directions.legs.is_empty() => directions,
            Ok(_) => {
                counter!("delivery.routing.calls", 1, "outcome" => "empty");
                return Err(ServiceError::ExternalServiceError(
                    "Routing service returned no route".into(),
                ));
            }
            Err(e) => {
                counter!("delivery.routing.calls", 1, "outcome" => "error");
                warn!(route = %route.name, error = %e, "Route optimization failed");
                return Err(e.into());
            }
        };
        counter!("delivery.routing.calls", 1, "outcome" => "ok");

        let stops = pair_stops(&addresses, &directions);
        let total_distance = directions.total_distance_km();
        let total_duration = directions.total_duration_min();
        let waypoints_json = serde_json::to_string(&addresses)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;
        let stops_json = serde_json::to_string(&stops)
            .map_err(|e| ServiceError::InternalError(e.to_string()))?;

        let txn = self.db.begin().await?;
        // The route may have moved on while the routing call was in flight.
        let current = find(&txn, id).await?;
        current.ensure_optimizable()?;
        let planning = plannings::find_on(&txn, current.planning_id).await?;

        let mut active = current.into_active_model();
        active.state = Set(RouteState::Optimized);
        active.total_distance = Set(total_distance);
        active.total_duration = Set(total_duration);
        active.waypoints = Set(Some(waypoints_json));
        active.optimized_route = Set(Some(stops_json));
        let route = active.update(&txn).await.map_err(|e| {
            error!("Failed to store optimized route {}: {}", id, e);
            ServiceError::DatabaseError(e)
        })?;

        let mut planning = planning.into_active_model();
        planning.total_distance = Set(total_distance);
        planning.estimated_duration = Set(total_duration);
        planning.update(&txn).await?;
        txn.commit().await?;

        info!(
            route = %route.name,
            stops = stops.len(),
            km = total_distance,
            minutes = total_duration,
            "Route optimized"
        );
        self.event_sender
            .send_or_log(Event::RouteOptimized {
                route_id: route.id,
                planning_id: route.planning_id,
                total_distance_km: total_distance,
                total_duration_min: total_duration,
            })
            .await;
        Ok(route)
    }

    /// optimized -> in_progress
    pub async fn start(&self, id: Uuid) -> Result<RouteModel, ServiceError> {
        self.transition(id, "start", RouteModel::start).await
    }

    /// in_progress -> done
    pub async fn complete(&self, id: Uuid) -> Result<RouteModel, ServiceError> {
        self.transition(id, "complete", RouteModel::complete).await
    }

    /// Back to draft; the planning keeps its aggregates.
    pub async fn reset_to_draft(&self, id: Uuid) -> Result<RouteModel, ServiceError> {
        self.transition(id, "reset_to_draft", |route| {
            route.reset_to_draft();
            Ok(())
        })
        .await
    }

    pub async fn get(&self, id: Uuid) -> Result<RouteModel, ServiceError> {
        find(&*self.db, id).await
    }

    pub async fn list(&self, planning_id: Option<Uuid>) -> Result<Vec<RouteModel>, ServiceError> {
        let mut query = RouteEntity::find();
        if let Some(planning_id) = planning_id {
            query = query.filter(RouteColumn::PlanningId.eq(planning_id));
        }
        Ok(query
            .order_by_desc(RouteColumn::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Google Maps link through the optimized stops, `None` before optimization.
    pub async fn map_url(&self, id: Uuid) -> Result<Option<String>, ServiceError> {
        let route = find(&*self.db, id).await?;
        if route.optimized_route.is_none() {
            return Ok(None);
        }
        let stops: Vec<String> = route.stops().into_iter().map(|stop| stop.address).collect();
        let url = routing::maps_url(&route.start_location, &route.end_location, &stops)?;
        Ok(Some(url.to_string()))
    }

    async fn transition<F>(
        &self,
        id: Uuid,
        action: &'static str,
        apply: F,
    ) -> Result<RouteModel, ServiceError>
    where
        F: FnOnce(&mut RouteModel) -> Result<(), RuleViolation>,
    {
        let txn = self.db.begin().await?;
        let mut route = find(&txn, id).await?;
        let old_state = route.state;
        apply(&mut route)?;

        let route = route.into_active_model().reset_all().update(&txn).await?;
        txn.commit().await?;

        info!(route = %route.name, from = %old_state, to = %route.state, "Route {}", action);
        self.event_sender
            .send_or_log(Event::RouteStateChanged {
                route_id: id,
                old_state: old_state.to_string(),
                new_state: route.state.to_string(),
            })
            .await;
        Ok(route)
    }
}

async fn find<C: sea_orm::ConnectionTrait>(conn: &C, id: Uuid) -> Result<RouteModel, ServiceError> {
    RouteEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Route", id))
}

/// Non-empty delivery addresses, in document-name order.
fn delivery_addresses(children: &[DeliveryModel]) -> Vec<String> {
    children
        .iter()
        .filter_map(|child| child.delivery_address.as_deref())
        .map(str::trim)
        .filter(|address| !address.is_empty())
        .map(str::to_string)
        .collect()
}

/// Addresses in visiting order, each with the leg that reaches it.
fn pair_stops(addresses: &[String], directions: &Directions) -> Vec<RouteStop> {
    let order_is_valid = directions.waypoint_order.len() == addresses.len()
        && directions.waypoint_order.iter().all(|idx| *idx < addresses.len());
    let ordered: Vec<&String> = if order_is_valid {
        directions
            .waypoint_order
            .iter()
            .map(|idx| &addresses[*idx])
            .collect()
    } else {
        addresses.iter().collect()
    };

    ordered
        .into_iter()
        .zip(directions.legs.iter())
        .map(|(address, leg)| RouteStop {
            address: address.clone(),
            distance: leg.distance_text.clone(),
            duration: leg.duration_text.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Leg;

    fn leg(meters: u64, text: &str) -> Leg {
        Leg {
            distance_meters: meters,
            distance_text: text.into(),
            duration_seconds: 60,
            duration_text: "1 min".into(),
        }
    }

    #[test]
    fn stops_follow_optimized_order() {
        let addresses = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let directions = Directions {
            legs: vec![leg(1000, "1 km"), leg(2000, "2 km"), leg(3000, "3 km"), leg(500, "0.5 km")],
            waypoint_order: vec![2, 0, 1],
        };
        let stops = pair_stops(&addresses, &directions);
        let names: Vec<&str> = stops.iter().map(|s| s.address.as_str()).collect();
        assert_eq!(names, vec!["C", "A", "B"]);
        assert_eq!(stops[0].distance, "1 km");
        assert_eq!(stops[2].distance, "3 km");
    }

    #[test]
    fn inconsistent_order_falls_back_to_input_order() {
        let addresses = vec!["A".to_string(), "B".to_string()];
        let directions = Directions {
            legs: vec![leg(1000, "1 km"), leg(2000, "2 km"), leg(3000, "3 km")],
            waypoint_order: vec![5],
        };
        let stops = pair_stops(&addresses, &directions);
        assert_eq!(stops[0].address, "A");
        assert_eq!(stops[1].address, "B");
    }
}
