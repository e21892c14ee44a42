use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;

use crate::models::batch::BatchResponse;
use crate::models::tag::{ApplyResponse, MatchPair, TagSyncPreview};
use crate::services::batch::BatchQueuer;

/// Face tag sync endpoints of the AI service.
#[async_trait]
pub trait TagSyncService: Send + Sync + 'static {
    async fn preview_tag_sync(&self, iou_threshold: f64, limit: u32) -> Result<TagSyncPreview, AiServiceError>;

    async fn apply_tag_sync(&self, matches: &[MatchPair]) -> Result<ApplyResponse, AiServiceError>;
}

/// HTTP client for the external AI inference service.
pub struct AiServiceClient {
    http: Client,
    base_url: String,
    api_token: Option<String>,
}

#[derive(Serialize)]
struct PreviewRequest {
    iou_threshold: f64,
    limit: u32,
}

#[derive(Serialize)]
struct ApplyRequest<'a> {
    matches: &'a [MatchPair],
}

#[derive(Serialize)]
struct QueueBatchRequest {
    batch_size: u32,
    offset: u64,
}

impl AiServiceClient {
    pub fn new(base_url: &str, api_token: Option<String>) -> Result<Self, AiServiceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(AiServiceError::Http)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response, AiServiceError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.http.post(&url).json(body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(AiServiceError::Http)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiServiceError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl TagSyncService for AiServiceClient {
    async fn preview_tag_sync(&self, iou_threshold: f64, limit: u32) -> Result<TagSyncPreview, AiServiceError> {
        let response = self
            .post("/tag-sync/preview", &PreviewRequest { iou_threshold, limit })
            .await?;
        response.json().await.map_err(AiServiceError::Http)
    }

    async fn apply_tag_sync(&self, matches: &[MatchPair]) -> Result<ApplyResponse, AiServiceError> {
        let response = self
            .post("/tag-sync/apply", &ApplyRequest { matches })
            .await?;
        response.json().await.map_err(AiServiceError::Http)
    }
}

#[async_trait]
impl BatchQueuer for AiServiceClient {
    async fn queue_batch(&self, batch_size: u32, offset: u64) -> Result<BatchResponse, AiServiceError> {
        let response = self
            .post("/queue/batch", &QueueBatchRequest { batch_size, offset })
            .await?;
        response.json().await.map_err(AiServiceError::Http)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AiServiceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("AI service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected AI service response: {0}")]
    Unexpected(String),
}
