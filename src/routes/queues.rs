use axum::extract::{Path, Query, State};
use axum::Json;
use std::str::FromStr;

use crate::app_state::AppState;
use crate::models::api::{ClearQueueResponse, StatsQuery, StatsResponse};
use crate::models::job::{Job, QueueName, Worker};
use crate::routes::error::{ApiError, ApiResult};

fn parse_queues(raw: Option<&str>, tracked: &[QueueName]) -> ApiResult<Vec<QueueName>> {
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(tracked.to_vec());
    };
    raw.split(',')
        .map(|name| {
            QueueName::from_str(name.trim())
                .map_err(|_| ApiError::BadRequest(format!("Unknown queue: {}", name.trim())))
        })
        .collect()
}

/// GET /api/v1/queues/stats: per-queue counters plus the combined view.
pub async fn get_stats(
    State(state): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<StatsResponse>> {
    let queues = parse_queues(query.queues.as_deref(), state.reconciler.queues())?;
    Ok(Json(StatsResponse {
        queues: state.reconciler.stats(),
        combined: state.reconciler.aggregate(&queues),
        status: state.reconciler.status(),
    }))
}

/// GET /api/v1/queues/jobs
pub async fn recent_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.reconciler.recent_jobs())
}

/// GET /api/v1/queues/active
pub async fn active_jobs(State(state): State<AppState>) -> Json<Vec<Job>> {
    Json(state.reconciler.active_jobs())
}

/// GET /api/v1/workers
pub async fn workers(State(state): State<AppState>) -> Json<Vec<Worker>> {
    Json(state.reconciler.workers())
}

/// POST /api/v1/queues/refresh: poll now.
pub async fn refresh(State(state): State<AppState>) -> axum::http::StatusCode {
    state.reconciler.refresh();
    axum::http::StatusCode::ACCEPTED
}

/// DELETE /api/v1/queues/{queue}: drop pending jobs, then re-poll so the
/// counters reflect the store.
pub async fn clear_queue(
    State(state): State<AppState>,
    Path(queue): Path<QueueName>,
) -> ApiResult<Json<ClearQueueResponse>> {
    let removed = state.source.clear_queue(queue).await?;
    state.reconciler.refresh();
    Ok(Json(ClearQueueResponse { removed }))
}
