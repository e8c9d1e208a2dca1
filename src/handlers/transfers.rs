use axum::{
    extract::{Path, State},
    response::Json,
    routing::post,
    Router,
};
use uuid::Uuid;

use crate::{
    auth::Principal,
    services::vehicle_selection::{SelectVehicle, VehicleSelection},
    ApiResponse, ApiResult, AppState,
};

pub fn transfer_routes() -> Router<AppState> {
    Router::new().route("/:id/select-vehicle", post(select_vehicle))
}

pub async fn select_vehicle(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<SelectVehicle>,
) -> ApiResult<VehicleSelection> {
    let selection = state
        .services
        .vehicle_selection
        .select_vehicle(&principal, id, payload.vehicle_type)
        .await?;
    Ok(Json(ApiResponse::success(selection)))
}
