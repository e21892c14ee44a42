use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Box in either normalized `[0,1]` or pixel units. The source never says
/// which; see [`crate::services::geometry`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Pixel dimensions of the image a box belongs to, when known.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Who placed a manual tag. `source` is set when the tag came from an earlier
/// auto-match rather than a person.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaggedBy {
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManualTag {
    pub tag_id: Uuid,
    pub contact_id: Uuid,
    #[serde(default)]
    pub contact_name: Option<String>,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub tagged_by: Option<TaggedBy>,
}

impl ManualTag {
    pub fn is_auto_matched(&self) -> bool {
        self.tagged_by
            .as_ref()
            .is_some_and(|t| t.source.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiDetection {
    pub face_id: Uuid,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub cluster_id: Option<Uuid>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// `NoMatch` only ever describes a tag or detection in a summary; the matcher
/// never emits a pair with that status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchStatus {
    Matched,
    LowConfidence,
    NoMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagMatch {
    pub manual_tag_id: Uuid,
    pub ai_face_id: Uuid,
    pub iou_score: f64,
    pub status: MatchStatus,
}

impl TagMatch {
    pub fn pair(&self) -> MatchPair {
        MatchPair {
            manual_tag_id: self.manual_tag_id,
            ai_face_id: self.ai_face_id,
        }
    }
}

/// Pair submitted to the apply endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchPair {
    pub manual_tag_id: Uuid,
    pub ai_face_id: Uuid,
}

/// Per-run counts. Tags and detections with no qualifying pair are the
/// `no_match` category.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchSummary {
    pub matched: usize,
    pub low_confidence: usize,
    pub unmatched_tags: usize,
    pub unmatched_detections: usize,
    pub auto_matched_tags: usize,
}

impl MatchSummary {
    pub fn merge(&mut self, other: &MatchSummary) {
        self.matched += other.matched;
        self.low_confidence += other.low_confidence;
        self.unmatched_tags += other.unmatched_tags;
        self.unmatched_detections += other.unmatched_detections;
        self.auto_matched_tags += other.auto_matched_tags;
    }
}

/// One asset from the AI service preview payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssetPreview {
    pub asset_id: Uuid,
    #[serde(default)]
    pub image_width: Option<u32>,
    #[serde(default)]
    pub image_height: Option<u32>,
    #[serde(default)]
    pub manual_tags: Vec<ManualTag>,
    #[serde(default)]
    pub ai_detections: Vec<AiDetection>,
}

impl AssetPreview {
    pub fn dimensions(&self) -> ImageDimensions {
        ImageDimensions {
            width: self.image_width,
            height: self.image_height,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TagSyncPreview {
    pub assets: Vec<AssetPreview>,
    #[serde(default)]
    pub summary: serde_json::Value,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplyResponse {
    pub applied: u64,
}
