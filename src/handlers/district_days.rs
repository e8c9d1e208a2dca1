use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    calendar,
    entities::district_day_rule::Model as RuleModel,
    services::district_days::{CreateDistrictRule, UpdateDistrictRule},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Default)]
pub struct RuleListQuery {
    pub district: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AllowedDaysQuery {
    pub district: String,
}

#[derive(Debug, Serialize)]
pub struct AllowedDay {
    pub weekday: u8,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AllowedDays {
    pub district: String,
    pub days: Vec<AllowedDay>,
}

pub fn district_day_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_rules).post(create_rule))
        .route("/allowed", get(allowed_days))
        .route(
            "/:id",
            get(get_rule).put(update_rule).delete(delete_rule),
        )
        .route("/:id/activate", post(activate_rule))
        .route("/:id/deactivate", post(deactivate_rule))
}

pub async fn list_rules(
    State(state): State<AppState>,
    Query(query): Query<RuleListQuery>,
) -> ApiResult<Vec<RuleModel>> {
    let rules = state.services.district_days.list_rules(query.district).await?;
    Ok(Json(ApiResponse::success(rules)))
}

pub async fn get_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RuleModel> {
    let rule = state.services.district_days.get_rule(id).await?;
    Ok(Json(ApiResponse::success(rule)))
}

pub async fn create_rule(
    State(state): State<AppState>,
    Json(payload): Json<CreateDistrictRule>,
) -> ApiResult<RuleModel> {
    let rule = state.services.district_days.create_rule(payload).await?;
    Ok(Json(ApiResponse::success(rule)))
}

pub async fn update_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDistrictRule>,
) -> ApiResult<RuleModel> {
    let rule = state.services.district_days.update_rule(id, payload).await?;
    Ok(Json(ApiResponse::success(rule)))
}

pub async fn activate_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RuleModel> {
    let rule = state.services.district_days.set_active(id, true).await?;
    Ok(Json(ApiResponse::success(rule)))
}

pub async fn deactivate_rule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<RuleModel> {
    let rule = state.services.district_days.set_active(id, false).await?;
    Ok(Json(ApiResponse::success(rule)))
}

pub async fn delete_rule(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<()> {
    state.services.district_days.delete_rule(id).await?;
    Ok(Json(ApiResponse::success(())))
}

/// Weekdays a district accepts deliveries on, under the configured rule source.
pub async fn allowed_days(
    State(state): State<AppState>,
    Query(query): Query<AllowedDaysQuery>,
) -> ApiResult<AllowedDays> {
    let weekdays = state
        .services
        .district_days
        .allowed_weekdays(&query.district)
        .await?;
    let days = weekdays
        .into_iter()
        .filter_map(|weekday| {
            calendar::day_name(weekday).map(|name| AllowedDay { weekday, name })
        })
        .collect();
    Ok(Json(ApiResponse::success(AllowedDays {
        district: query.district,
        days,
    })))
}
