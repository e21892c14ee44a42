use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

use crate::models::tag::{MatchPair, MatchStatus, TagMatch};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("No matches selected")]
    EmptySelection,

    #[error("Tag {manual_tag_id} and face {ai_face_id} are not a proposed match")]
    UnknownPair { manual_tag_id: Uuid, ai_face_id: Uuid },
}

/// Face left out of a cluster assignment.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExcludedFace {
    pub asset_id: Uuid,
    pub face_id: Uuid,
}

/// Which proposed matches will be applied, plus per-cluster exclusions used
/// when a whole face cluster is assigned to a contact.
#[derive(Debug, Clone, Default)]
pub struct MatchSelection {
    matches: Vec<TagMatch>,
    selected: BTreeSet<MatchPair>,
    exclusions: BTreeMap<Uuid, BTreeSet<ExcludedFace>>,
}

impl MatchSelection {
    /// `matched` pairs start selected, `low_confidence` pairs do not.
    pub fn from_matches(matches: Vec<TagMatch>) -> Self {
        let selected = matches
            .iter()
            .filter(|m| m.status == MatchStatus::Matched)
            .map(TagMatch::pair)
            .collect();
        Self {
            matches,
            selected,
            exclusions: BTreeMap::new(),
        }
    }

    /// Swap in a fresh matcher run. Selection is re-derived; cluster
    /// exclusions are kept.
    pub fn replace_matches(&mut self, matches: Vec<TagMatch>) {
        let exclusions = std::mem::take(&mut self.exclusions);
        *self = Self::from_matches(matches);
        self.exclusions = exclusions;
    }

    pub fn matches(&self) -> &[TagMatch] {
        &self.matches
    }

    pub fn is_selected(&self, pair: &MatchPair) -> bool {
        self.selected.contains(pair)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    /// Flip one pair in or out of the selection. Returns whether the pair is
    /// selected afterwards.
    pub fn toggle(&mut self, manual_tag_id: Uuid, ai_face_id: Uuid) -> Result<bool, SelectionError> {
        let pair = MatchPair {
            manual_tag_id,
            ai_face_id,
        };
        if !self.matches.iter().any(|m| m.pair() == pair) {
            return Err(SelectionError::UnknownPair {
                manual_tag_id,
                ai_face_id,
            });
        }
        if self.selected.remove(&pair) {
            Ok(false)
        } else {
            self.selected.insert(pair);
            Ok(true)
        }
    }

    pub fn select_all(&mut self) {
        self.selected = self.matches.iter().map(TagMatch::pair).collect();
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Remove pairs from the selection, e.g. once they have been applied.
    pub fn deselect(&mut self, pairs: &[MatchPair]) {
        for pair in pairs {
            self.selected.remove(pair);
        }
    }

    pub fn exclude(&mut self, cluster_id: Uuid, asset_id: Uuid, face_id: Uuid) {
        self.exclusions
            .entry(cluster_id)
            .or_default()
            .insert(ExcludedFace { asset_id, face_id });
    }

    pub fn include(&mut self, cluster_id: Uuid, asset_id: Uuid, face_id: Uuid) {
        if let Some(set) = self.exclusions.get_mut(&cluster_id) {
            set.remove(&ExcludedFace { asset_id, face_id });
            if set.is_empty() {
                self.exclusions.remove(&cluster_id);
            }
        }
    }

    pub fn exclusions(&self, cluster_id: Uuid) -> Vec<ExcludedFace> {
        self.exclusions
            .get(&cluster_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Selected pairs in a stable order, ready for the apply endpoint.
    pub fn apply(&self) -> Result<Vec<MatchPair>, SelectionError> {
        if self.selected.is_empty() {
            return Err(SelectionError::EmptySelection);
        }
        Ok(self.selected.iter().copied().collect())
    }
}
