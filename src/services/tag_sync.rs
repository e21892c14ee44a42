use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::tag::{ApplyResponse, MatchPair, MatchStatus, MatchSummary, TagMatch};
use crate::services::ai_client::{AiServiceError, TagSyncService};
use crate::services::matcher;
use crate::services::selection::{ExcludedFace, MatchSelection, SelectionError};

/// Outcome for one manual tag; `no_match` when no pair qualified.
#[derive(Debug, Clone, Serialize)]
pub struct TagReview {
    pub tag_id: Uuid,
    pub contact_name: Option<String>,
    pub status: MatchStatus,
    pub auto_matched: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetReview {
    pub asset_id: Uuid,
    pub matches: Vec<TagMatch>,
    pub tags: Vec<TagReview>,
    pub summary: MatchSummary,
}

/// Current proposals and selection, as shown for review.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TagSyncReview {
    pub iou_threshold: Option<f64>,
    pub assets: Vec<AssetReview>,
    pub summary: MatchSummary,
    pub selected: Vec<MatchPair>,
}

#[derive(Debug, Default)]
struct SessionState {
    iou_threshold: Option<f64>,
    assets: Vec<AssetReview>,
    summary: MatchSummary,
    selection: MatchSelection,
}

#[derive(Debug, thiserror::Error)]
pub enum TagSyncError {
    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error(transparent)]
    Service(#[from] AiServiceError),
}

/// Review session for syncing manual face tags with AI detections.
///
/// Matches are always recomputed locally from the boxes in the preview
/// payload, whether or not the service sent its own.
pub struct TagSyncSession {
    service: Arc<dyn TagSyncService>,
    state: Mutex<SessionState>,
}

impl TagSyncSession {
    pub fn new(service: Arc<dyn TagSyncService>) -> Self {
        Self {
            service,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub async fn preview(&self, iou_threshold: f64, limit: u32) -> Result<TagSyncReview, TagSyncError> {
        let preview = self.service.preview_tag_sync(iou_threshold, limit).await?;

        let mut assets = Vec::with_capacity(preview.assets.len());
        let mut summary = MatchSummary::default();
        let mut all_matches = Vec::new();
        for asset in &preview.assets {
            let matches = matcher::match_tags(
                &asset.manual_tags,
                &asset.ai_detections,
                iou_threshold,
                asset.dimensions(),
            );
            let asset_summary = matcher::summarize(&asset.manual_tags, &asset.ai_detections, &matches);
            summary.merge(&asset_summary);
            let tags = asset
                .manual_tags
                .iter()
                .map(|tag| TagReview {
                    tag_id: tag.tag_id,
                    contact_name: tag.contact_name.clone(),
                    status: matcher::tag_status(&matches, tag.tag_id),
                    auto_matched: tag.is_auto_matched(),
                })
                .collect();
            all_matches.extend(matches.iter().cloned());
            assets.push(AssetReview {
                asset_id: asset.asset_id,
                matches,
                tags,
                summary: asset_summary,
            });
        }

        tracing::info!(
            assets = assets.len(),
            matched = summary.matched,
            low_confidence = summary.low_confidence,
            unmatched_tags = summary.unmatched_tags,
            iou_threshold,
            "Tag sync preview computed"
        );

        let mut state = self.state.lock();
        state.iou_threshold = Some(iou_threshold);
        state.assets = assets;
        state.summary = summary;
        state.selection.replace_matches(all_matches);
        Ok(review_of(&state))
    }

    pub fn review(&self) -> TagSyncReview {
        review_of(&self.state.lock())
    }

    pub fn toggle(&self, manual_tag_id: Uuid, ai_face_id: Uuid) -> Result<bool, SelectionError> {
        self.state.lock().selection.toggle(manual_tag_id, ai_face_id)
    }

    pub fn select_all(&self) {
        self.state.lock().selection.select_all();
    }

    pub fn clear_selection(&self) {
        self.state.lock().selection.clear();
    }

    pub fn exclude(&self, cluster_id: Uuid, asset_id: Uuid, face_id: Uuid) -> Vec<ExcludedFace> {
        let mut state = self.state.lock();
        state.selection.exclude(cluster_id, asset_id, face_id);
        state.selection.exclusions(cluster_id)
    }

    pub fn include(&self, cluster_id: Uuid, asset_id: Uuid, face_id: Uuid) -> Vec<ExcludedFace> {
        let mut state = self.state.lock();
        state.selection.include(cluster_id, asset_id, face_id);
        state.selection.exclusions(cluster_id)
    }

    pub fn exclusions(&self, cluster_id: Uuid) -> Vec<ExcludedFace> {
        self.state.lock().selection.exclusions(cluster_id)
    }

    /// Submit the selected pairs. An empty selection is rejected before any
    /// request is made.
    pub async fn apply(&self) -> Result<ApplyResponse, TagSyncError> {
        let pairs = self.state.lock().selection.apply()?;

        let response = self.service.apply_tag_sync(&pairs).await?;
        metrics::counter!("tag_matches_applied_total").increment(response.applied);
        tracing::info!(submitted = pairs.len(), applied = response.applied, "Applied tag matches");

        self.state.lock().selection.deselect(&pairs);
        Ok(response)
    }
}

fn review_of(state: &SessionState) -> TagSyncReview {
    TagSyncReview {
        iou_threshold: state.iou_threshold,
        assets: state.assets.clone(),
        summary: state.summary,
        selected: state.selection.apply().unwrap_or_default(),
    }
}
