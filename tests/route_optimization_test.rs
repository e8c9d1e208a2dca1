mod common;

use assert_matches::assert_matches;
use common::{dispatcher, next_weekday, test_config, TestApp};
use rstest::rstest;
use delivery_management::{
    entities::{delivery_route::RouteState, VehicleClass},
    errors::{RuleViolation, ServiceError},
    services::{deliveries::CreateDelivery, plannings::CreatePlanning, routes::CreateRoute},
};
use serde_json::json;
use uuid::Uuid;
use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

const WEDNESDAY: u8 = 2;
const KADIKOY_ADDRESS: &str = "Müşteri Kadıköy Mah. No:1, Kadıköy";
const USKUDAR_ADDRESS: &str = "Müşteri Üsküdar Mah. No:1, Üsküdar";

async fn app_with_directions(server: &MockServer) -> TestApp {
    let mut cfg = test_config();
    cfg.routing.api_key = Some("test-key".to_string());
    cfg.routing.base_url = format!("{}/directions/json", server.uri());
    TestApp::with_config(cfg).await
}

/// Planning with a Kadıköy and an Üsküdar delivery plus a draft route over it.
async fn seed_route(app: &TestApp) -> (Uuid, Uuid) {
    let date = next_weekday(WEDNESDAY);
    let planning = app
        .services()
        .plannings
        .create(CreatePlanning {
            name: None,
            planning_date: date,
            vehicle_type: VehicleClass::Anadolu,
            notes: None,
        })
        .await
        .expect("planning");

    for city in ["Kadıköy", "Üsküdar"] {
        let transfer = app.seed_delivery_transfer(city).await;
        app.services()
            .deliveries
            .create(
                &dispatcher(),
                CreateDelivery {
                    name: None,
                    picking_id: transfer.id,
                    planning_id: Some(planning.id),
                    delivery_date: Some(date),
                    vehicle_type: Some(VehicleClass::Anadolu),
                    route_info: None,
                },
            )
            .await
            .expect("delivery");
    }

    let route = app
        .services()
        .routes
        .create(CreateRoute {
            name: None,
            planning_id: planning.id,
            start_location: "Depo, Ataşehir".into(),
            end_location: "Depo, Ataşehir".into(),
        })
        .await
        .expect("route");
    assert_eq!(route.name, "RT/00001");
    assert_eq!(route.vehicle_type, VehicleClass::Anadolu);
    (planning.id, route.id)
}

fn leg(meters: u64, km: &str, seconds: u64, mins: &str) -> serde_json::Value {
    json!({
        "distance": { "value": meters, "text": km },
        "duration": { "value": seconds, "text": mins }
    })
}

#[tokio::test]
async fn optimization_reorders_stops_and_updates_planning() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/directions/json"))
        .and(query_param("key", "test-key"))
        .and(query_param(
            "waypoints",
            format!("optimize:true|{}|{}", KADIKOY_ADDRESS, USKUDAR_ADDRESS).as_str(),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "routes": [{
                "waypoint_order": [1, 0],
                "legs": [
                    leg(2000, "2.0 km", 600, "10 mins"),
                    leg(3000, "3.0 km", 900, "15 mins"),
                    leg(5000, "5.0 km", 1500, "25 mins")
                ]
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_with_directions(&server).await;
    let (planning_id, route_id) = seed_route(&app).await;

    let route = app.services().routes.optimize(route_id).await.expect("optimize");
    assert_eq!(route.state, RouteState::Optimized);
    assert_eq!(route.total_distance, 10.0);
    assert_eq!(route.total_duration, 50.0);

    let stops = route.stops();
    assert_eq!(stops.len(), 2);
    assert_eq!(stops[0].address, USKUDAR_ADDRESS);
    assert_eq!(stops[0].distance, "2.0 km");
    assert_eq!(stops[1].address, KADIKOY_ADDRESS);
    assert_eq!(stops[1].duration, "15 mins");

    let planning = app.services().plannings.get(planning_id).await.expect("planning");
    assert_eq!(planning.planning.total_distance, 10.0);
    assert_eq!(planning.planning.estimated_duration, 50.0);

    let url = app
        .services()
        .routes
        .map_url(route_id)
        .await
        .expect("map url")
        .expect("optimized routes have a link");
    let parsed = url::Url::parse(&url).expect("valid url");
    let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
    assert!(pairs.contains(&(
        "waypoints".to_string(),
        format!("{}|{}", USKUDAR_ADDRESS, KADIKOY_ADDRESS)
    )));
    assert!(pairs.contains(&("origin".to_string(), "Depo, Ataşehir".to_string())));

    assert_matches!(
        app.services().routes.optimize(route_id).await,
        Err(ServiceError::Rule(RuleViolation::IllegalTransition { .. }))
    );
}

#[tokio::test]
async fn missing_api_key_is_a_configuration_error() {
    let app = TestApp::new().await;
    let (_, route_id) = seed_route(&app).await;

    let err = app.services().routes.optimize(route_id).await.unwrap_err();
    assert_matches!(err, ServiceError::ConfigError(_));
    assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);

    assert_eq!(app.services().routes.map_url(route_id).await.expect("map url"), None);
}

#[tokio::test]
async fn routing_failures_leave_the_route_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/directions/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "REQUEST_DENIED",
            "error_message": "The provided API key is invalid.",
            "routes": []
        })))
        .mount(&server)
        .await;

    let app = app_with_directions(&server).await;
    let (planning_id, route_id) = seed_route(&app).await;

    let err = app.services().routes.optimize(route_id).await.unwrap_err();
    assert_matches!(err, ServiceError::ExternalServiceError(_));
    assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);

    let route = app.services().routes.get(route_id).await.expect("route");
    assert_eq!(route.state, RouteState::Draft);
    assert_eq!(route.optimized_route, None);
    let planning = app.services().plannings.get(planning_id).await.expect("planning");
    assert_eq!(planning.planning.total_distance, 0.0);
}

#[tokio::test]
async fn route_lifecycle_and_reset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/directions/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "routes": [{
                "waypoint_order": [0, 1],
                "legs": [
                    leg(1000, "1.0 km", 60, "1 min"),
                    leg(1000, "1.0 km", 60, "1 min"),
                    leg(1000, "1.0 km", 60, "1 min")
                ]
            }]
        })))
        .mount(&server)
        .await;

    let app = app_with_directions(&server).await;
    let (_, route_id) = seed_route(&app).await;
    let routes = &app.services().routes;

    assert_matches!(
        routes.start(route_id).await,
        Err(ServiceError::Rule(RuleViolation::IllegalTransition { .. }))
    );
    routes.optimize(route_id).await.expect("optimize");
    assert_eq!(routes.start(route_id).await.expect("start").state, RouteState::InProgress);
    assert_eq!(routes.complete(route_id).await.expect("complete").state, RouteState::Done);

    let reset = routes.reset_to_draft(route_id).await.expect("reset");
    assert_eq!(reset.state, RouteState::Draft);
    assert_eq!(reset.total_distance, 0.0);
    assert!(reset.stops().is_empty());
    assert_eq!(routes.map_url(route_id).await.expect("map url"), None);
}

#[rstest]
#[case::no_routes(json!({ "status": "OK", "routes": [] }))]
#[case::no_legs(json!({ "status": "OK", "routes": [{ "waypoint_order": [0, 1], "legs": [] }] }))]
#[tokio::test]
async fn empty_directions_are_an_external_failure(#[case] body: serde_json::Value) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/directions/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let app = app_with_directions(&server).await;
    let (_, route_id) = seed_route(&app).await;

    let err = app.services().routes.optimize(route_id).await.unwrap_err();
    assert_matches!(err, ServiceError::ExternalServiceError(_));

    let route = app.services().routes.get(route_id).await.expect("route");
    assert_eq!(route.state, RouteState::Draft);
    assert_eq!(route.total_distance, 0.0);
    assert!(route.stops().is_empty());
}

#[tokio::test]
async fn failed_reoptimization_keeps_stored_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/directions/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "routes": [{
                "waypoint_order": [0, 1],
                "legs": [
                    leg(1000, "1.0 km", 60, "1 min"),
                    leg(2000, "2.0 km", 120, "2 mins"),
                    leg(3000, "3.0 km", 180, "3 mins")
                ]
            }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/directions/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "OK",
            "routes": [{ "waypoint_order": [], "legs": [] }]
        })))
        .mount(&server)
        .await;

    let app = app_with_directions(&server).await;
    let (planning_id, route_id) = seed_route(&app).await;
    let routes = &app.services().routes;

    routes.optimize(route_id).await.expect("first optimization");
    let reset = routes.reset_to_draft(route_id).await.expect("reset");

    assert_matches!(
        routes.optimize(route_id).await,
        Err(ServiceError::ExternalServiceError(_))
    );

    let route = routes.get(route_id).await.expect("route");
    assert_eq!(route.state, RouteState::Draft);
    assert_eq!(route.total_distance, reset.total_distance);
    assert_eq!(route.total_duration, reset.total_duration);
    assert_eq!(route.optimized_route, reset.optimized_route);
    assert_eq!(route.waypoints, reset.waypoints);

    let planning = app.services().plannings.get(planning_id).await.expect("planning");
    assert_eq!(planning.planning.total_distance, 6.0);
    assert_eq!(planning.planning.estimated_duration, 6.0);
}
