use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use uuid::Uuid;

use crate::{
    auth::Principal,
    entities::delivery_document::Model as DeliveryModel,
    services::deliveries::{CreateDelivery, DeliveryFilter, UpdateDelivery},
    ApiResponse, ApiResult, AppState,
};

pub fn delivery_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_deliveries).post(create_delivery))
        .route("/:id", get(get_delivery).patch(update_delivery))
        .route("/:id/confirm", post(confirm_delivery))
        .route("/:id/dispatch", post(dispatch_delivery))
        .route("/:id/complete", post(complete_delivery))
        .route("/:id/cancel", post(cancel_delivery))
        .route("/:id/reset", post(reset_delivery))
}

pub async fn list_deliveries(
    State(state): State<AppState>,
    Query(filter): Query<DeliveryFilter>,
) -> ApiResult<Vec<DeliveryModel>> {
    let deliveries = state.services.deliveries.list(filter).await?;
    Ok(Json(ApiResponse::success(deliveries)))
}

pub async fn get_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeliveryModel> {
    let delivery = state.services.deliveries.get(id).await?;
    Ok(Json(ApiResponse::success(delivery)))
}

pub async fn create_delivery(
    State(state): State<AppState>,
    principal: Principal,
    Json(payload): Json<CreateDelivery>,
) -> ApiResult<DeliveryModel> {
    let delivery = state.services.deliveries.create(&principal, payload).await?;
    Ok(Json(ApiResponse::success(delivery)))
}

pub async fn update_delivery(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDelivery>,
) -> ApiResult<DeliveryModel> {
    let delivery = state
        .services
        .deliveries
        .update(&principal, id, payload)
        .await?;
    Ok(Json(ApiResponse::success(delivery)))
}

pub async fn confirm_delivery(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<Uuid>,
) -> ApiResult<DeliveryModel> {
    let delivery = state.services.deliveries.confirm(&principal, id).await?;
    Ok(Json(ApiResponse::success(delivery)))
}

pub async fn dispatch_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeliveryModel> {
    let delivery = state.services.deliveries.dispatch(id).await?;
    Ok(Json(ApiResponse::success(delivery)))
}

pub async fn complete_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeliveryModel> {
    let delivery = state.services.deliveries.complete(id).await?;
    Ok(Json(ApiResponse::success(delivery)))
}

pub async fn cancel_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeliveryModel> {
    let delivery = state.services.deliveries.cancel(id).await?;
    Ok(Json(ApiResponse::success(delivery)))
}

pub async fn reset_delivery(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<DeliveryModel> {
    let delivery = state.services.deliveries.reset_to_draft(id).await?;
    Ok(Json(ApiResponse::success(delivery)))
}
