use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::api::ErrorResponse;
use crate::services::batch::BatchError;
use crate::services::reconciler::ReconcilerError;
use crate::services::selection::SelectionError;
use crate::services::source::SourceError;
use crate::services::tag_sync::TagSyncError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Unavailable(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };
        let body = Json(ErrorResponse {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::BadRequest(report.to_string())
    }
}

impl From<SelectionError> for ApiError {
    fn from(err: SelectionError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<TagSyncError> for ApiError {
    fn from(err: TagSyncError) -> Self {
        match err {
            TagSyncError::Selection(err) => err.into(),
            TagSyncError::Service(err) => {
                tracing::error!(error = %err, "Tag sync request failed");
                ApiError::Upstream(err.to_string())
            }
        }
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::InvalidState { .. } => ApiError::Conflict(err.to_string()),
            BatchError::Transport { .. } => ApiError::Upstream(err.to_string()),
        }
    }
}

impl From<SourceError> for ApiError {
    fn from(err: SourceError) -> Self {
        tracing::error!(error = %err, "Job source request failed");
        ApiError::Unavailable(err.to_string())
    }
}

impl From<ReconcilerError> for ApiError {
    fn from(err: ReconcilerError) -> Self {
        ApiError::Unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::batch::BatchState;
    use crate::services::ai_client::AiServiceError;

    #[test]
    fn test_status_mapping() {
        let empty: ApiError = SelectionError::EmptySelection.into();
        assert_eq!(empty.into_response().status(), StatusCode::BAD_REQUEST);

        let state: ApiError = BatchError::InvalidState {
            action: "continue",
            state: BatchState::Idle,
        }
        .into();
        assert_eq!(state.into_response().status(), StatusCode::CONFLICT);

        let upstream: ApiError = TagSyncError::Service(AiServiceError::Status {
            status: 500,
            body: "boom".to_string(),
        })
        .into();
        assert_eq!(upstream.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
