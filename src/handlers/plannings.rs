use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::delivery_planning::Model as PlanningModel,
    services::plannings::{CreatePlanning, PlanningDetail, PlanningFilter, UpdatePlanning},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct AttachDeliveriesRequest {
    #[validate(length(min = 1))]
    pub delivery_ids: Vec<Uuid>,
}

pub fn planning_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_plannings).post(create_planning))
        .route("/:id", get(get_planning).patch(update_planning))
        .route("/:id/deliveries", post(attach_deliveries))
        .route("/:id/deliveries/:delivery_id", delete(detach_delivery))
        .route("/:id/confirm", post(confirm_planning))
        .route("/:id/start", post(start_planning))
        .route("/:id/done", post(finish_planning))
        .route("/:id/cancel", post(cancel_planning))
        .route("/:id/reset", post(reset_planning))
}

pub async fn list_plannings(
    State(state): State<AppState>,
    Query(filter): Query<PlanningFilter>,
) -> ApiResult<Vec<PlanningModel>> {
    let plannings = state.services.plannings.list(filter).await?;
    Ok(Json(ApiResponse::success(plannings)))
}

pub async fn get_planning(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PlanningDetail> {
    let planning = state.services.plannings.get(id).await?;
    Ok(Json(ApiResponse::success(planning)))
}

pub async fn create_planning(
    State(state): State<AppState>,
    Json(payload): Json<CreatePlanning>,
) -> ApiResult<PlanningModel> {
    let planning = state.services.plannings.create(payload).await?;
    Ok(Json(ApiResponse::success(planning)))
}

pub async fn update_planning(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlanning>,
) -> ApiResult<PlanningModel> {
    let planning = state.services.plannings.update(id, payload).await?;
    Ok(Json(ApiResponse::success(planning)))
}

pub async fn attach_deliveries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AttachDeliveriesRequest>,
) -> ApiResult<PlanningDetail> {
    payload.validate()?;
    let planning = state
        .services
        .plannings
        .attach_documents(id, payload.delivery_ids)
        .await?;
    Ok(Json(ApiResponse::success(planning)))
}

pub async fn detach_delivery(
    State(state): State<AppState>,
    Path((id, delivery_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<PlanningDetail> {
    let planning = state
        .services
        .plannings
        .detach_document(id, delivery_id)
        .await?;
    Ok(Json(ApiResponse::success(planning)))
}

pub async fn confirm_planning(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PlanningModel> {
    let planning = state.services.plannings.confirm(id).await?;
    Ok(Json(ApiResponse::success(planning)))
}

pub async fn start_planning(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PlanningModel> {
    let planning = state.services.plannings.start(id).await?;
    Ok(Json(ApiResponse::success(planning)))
}

pub async fn finish_planning(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PlanningModel> {
    let planning = state.services.plannings.done(id).await?;
    Ok(Json(ApiResponse::success(planning)))
}

pub async fn cancel_planning(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PlanningModel> {
    let planning = state.services.plannings.cancel(id).await?;
    Ok(Json(ApiResponse::success(planning)))
}

pub async fn reset_planning(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PlanningModel> {
    let planning = state.services.plannings.reset_to_draft(id).await?;
    Ok(Json(ApiResponse::success(planning)))
}
