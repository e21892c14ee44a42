use axum::extract::State;
use axum::Json;

use crate::app_state::AppState;
use crate::models::batch::BatchSnapshot;
use crate::routes::error::ApiResult;

/// GET /api/v1/batch: cursor and state of the current run.
pub async fn status(State(state): State<AppState>) -> Json<BatchSnapshot> {
    Json(state.batch.snapshot())
}

/// POST /api/v1/batch/start: submit the first batch of a new run.
pub async fn start(State(state): State<AppState>) -> ApiResult<Json<BatchSnapshot>> {
    Ok(Json(state.batch.start().await?))
}

/// POST /api/v1/batch/continue: submit the next batch from the saved offset.
pub async fn continue_queuing(State(state): State<AppState>) -> ApiResult<Json<BatchSnapshot>> {
    Ok(Json(state.batch.continue_queuing().await?))
}

pub async fn stop(State(state): State<AppState>) -> Json<BatchSnapshot> {
    Json(state.batch.stop())
}

pub async fn reset(State(state): State<AppState>) -> Json<BatchSnapshot> {
    Json(state.batch.reset())
}
