use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    entities::delivery_route::Model as RouteModel,
    services::routes::CreateRoute,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Default)]
pub struct RouteListQuery {
    pub planning_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MapLink {
    pub route_id: Uuid,
    pub url: Option<String>,
}

pub fn route_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_routes).post(create_route))
        .route("/:id", get(get_route))
        .route("/:id/optimize", post(optimize_route))
        .route("/:id/start", post(start_route))
        .route("/:id/complete", post(complete_route))
        .route("/:id/reset", post(reset_route))
        .route("/:id/map-url", get(route_map_url))
}

pub async fn list_routes(
    State(state): State<AppState>,
    Query(query): Query<RouteListQuery>,
) -> ApiResult<Vec<RouteModel>> {
    let routes = state.services.routes.list(query.planning_id).await?;
    Ok(Json(ApiResponse::success(routes)))
}

pub async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RouteModel> {
    let route = state.services.routes.get(id).await?;
    Ok(Json(ApiResponse::success(route)))
}

pub async fn create_route(
    State(state): State<AppState>,
    Json(payload): Json<CreateRoute>,
) -> ApiResult<RouteModel> {
    let route = state.services.routes.create(payload).await?;
    Ok(Json(ApiResponse::success(route)))
}

pub async fn optimize_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RouteModel> {
    let route = state.services.routes.optimize(id).await?;
    Ok(Json(ApiResponse::success(route)))
}

pub async fn start_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RouteModel> {
    let route = state.services.routes.start(id).await?;
    Ok(Json(ApiResponse::success(route)))
}

pub async fn complete_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RouteModel> {
    let route = state.services.routes.complete(id).await?;
    Ok(Json(ApiResponse::success(route)))
}

pub async fn reset_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RouteModel> {
    let route = state.services.routes.reset_to_draft(id).await?;
    Ok(Json(ApiResponse::success(route)))
}

pub async fn route_map_url(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<MapLink> {
    let url = state.services.routes.map_url(id).await?;
    Ok(Json(ApiResponse::success(MapLink { route_id: id, url })))
}
