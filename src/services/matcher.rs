use crate::models::tag::{AiDetection, ImageDimensions, ManualTag, MatchStatus, MatchSummary, TagMatch};
use crate::services::geometry::{self, PercentBox};

/// Classify one IoU score. Pairs at or below half the threshold are dropped.
pub fn classify(iou_score: f64, iou_threshold: f64) -> Option<MatchStatus> {
    let floor = iou_threshold / 2.0;
    if iou_score <= 0.0 {
        None
    } else if iou_score >= iou_threshold {
        Some(MatchStatus::Matched)
    } else if iou_score > floor {
        Some(MatchStatus::LowConfidence)
    } else {
        None
    }
}

/// Match manual tags against AI detections on one image.
///
/// Every qualifying (tag, detection) pair is returned, in tag order and then
/// detection order; choosing between competing pairs is left to the
/// selection model. Pure and deterministic.
pub fn match_tags(
    manual_tags: &[ManualTag],
    ai_detections: &[AiDetection],
    iou_threshold: f64,
    dims: ImageDimensions,
) -> Vec<TagMatch> {
    let detection_boxes: Vec<PercentBox> = ai_detections
        .iter()
        .map(|d| geometry::to_percent(&d.bounding_box, dims))
        .collect();

    let mut matches = Vec::new();
    for tag in manual_tags {
        let tag_box = geometry::to_percent(&tag.bounding_box, dims);
        for (detection, detection_box) in ai_detections.iter().zip(&detection_boxes) {
            let score = geometry::iou(&tag_box, detection_box);
            if let Some(status) = classify(score, iou_threshold) {
                matches.push(TagMatch {
                    manual_tag_id: tag.tag_id,
                    ai_face_id: detection.face_id,
                    iou_score: score,
                    status,
                });
            }
        }
    }
    matches
}

/// Summary status of a single manual tag given the matcher output.
pub fn tag_status(matches: &[TagMatch], tag_id: uuid::Uuid) -> MatchStatus {
    let mut best = MatchStatus::NoMatch;
    for m in matches.iter().filter(|m| m.manual_tag_id == tag_id) {
        match m.status {
            MatchStatus::Matched => return MatchStatus::Matched,
            MatchStatus::LowConfidence => best = MatchStatus::LowConfidence,
            MatchStatus::NoMatch => {}
        }
    }
    best
}

pub fn summarize(
    manual_tags: &[ManualTag],
    ai_detections: &[AiDetection],
    matches: &[TagMatch],
) -> MatchSummary {
    MatchSummary {
        matched: matches
            .iter()
            .filter(|m| m.status == MatchStatus::Matched)
            .count(),
        low_confidence: matches
            .iter()
            .filter(|m| m.status == MatchStatus::LowConfidence)
            .count(),
        unmatched_tags: manual_tags
            .iter()
            .filter(|t| !matches.iter().any(|m| m.manual_tag_id == t.tag_id))
            .count(),
        unmatched_detections: ai_detections
            .iter()
            .filter(|d| !matches.iter().any(|m| m.ai_face_id == d.face_id))
            .count(),
        auto_matched_tags: manual_tags.iter().filter(|t| t.is_auto_matched()).count(),
    }
}
