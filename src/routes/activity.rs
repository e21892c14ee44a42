use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;

use crate::app_state::AppState;
use crate::models::api::{ActivityQuery, ActivityResponse};
use crate::routes::error::ApiResult;

const DEFAULT_LIMIT: usize = 50;

/// GET /api/v1/activity: newest entries first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ActivityQuery>,
) -> Json<ActivityResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    Json(ActivityResponse {
        items: state.reconciler.activity(limit),
        paused: state.reconciler.status().paused,
    })
}

pub async fn clear(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.reconciler.clear_log().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn pause(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.reconciler.pause().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn resume(State(state): State<AppState>) -> ApiResult<StatusCode> {
    state.reconciler.resume().await?;
    Ok(StatusCode::NO_CONTENT)
}
