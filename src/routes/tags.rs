use axum::extract::{Path, State};
use axum::Json;
use garde::Validate;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::models::api::{ExclusionRequest, PreviewRequest, ToggleRequest, ToggleResponse};
use crate::models::tag::ApplyResponse;
use crate::routes::error::ApiResult;
use crate::services::selection::ExcludedFace;
use crate::services::tag_sync::TagSyncReview;

/// POST /api/v1/tags/preview: fetch candidates and recompute matches.
pub async fn preview(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> ApiResult<Json<TagSyncReview>> {
    request.validate()?;
    let threshold = request.iou_threshold.unwrap_or(state.default_iou_threshold);
    let review = state.tags.preview(threshold, request.limit).await?;
    Ok(Json(review))
}

pub async fn toggle(
    State(state): State<AppState>,
    Json(request): Json<ToggleRequest>,
) -> ApiResult<Json<ToggleResponse>> {
    request.validate()?;
    let selected = state.tags.toggle(request.manual_tag_id, request.ai_face_id)?;
    Ok(Json(ToggleResponse { selected }))
}

pub async fn select_all(State(state): State<AppState>) -> Json<TagSyncReview> {
    state.tags.select_all();
    Json(state.tags.review())
}

pub async fn clear(State(state): State<AppState>) -> Json<TagSyncReview> {
    state.tags.clear_selection();
    Json(state.tags.review())
}

/// POST /api/v1/tags/apply: submit the selected pairs.
pub async fn apply(State(state): State<AppState>) -> ApiResult<Json<ApplyResponse>> {
    let response = state.tags.apply().await?;
    Ok(Json(response))
}

pub async fn list_exclusions(
    State(state): State<AppState>,
    Path(cluster_id): Path<Uuid>,
) -> Json<Vec<ExcludedFace>> {
    Json(state.tags.exclusions(cluster_id))
}

pub async fn add_exclusion(
    State(state): State<AppState>,
    Path(cluster_id): Path<Uuid>,
    Json(request): Json<ExclusionRequest>,
) -> ApiResult<Json<Vec<ExcludedFace>>> {
    request.validate()?;
    Ok(Json(state.tags.exclude(cluster_id, request.asset_id, request.face_id)))
}

pub async fn remove_exclusion(
    State(state): State<AppState>,
    Path(cluster_id): Path<Uuid>,
    Json(request): Json<ExclusionRequest>,
) -> ApiResult<Json<Vec<ExcludedFace>>> {
    request.validate()?;
    Ok(Json(state.tags.include(cluster_id, request.asset_id, request.face_id)))
}
