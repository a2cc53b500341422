use serde::{Deserialize, Serialize};
use std::fmt;

use super::diff::PropertyChange;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassificationState {
    ExactMatch,
    Drifted,
    New,
    Orphaned,
}

impl ClassificationState {
    pub const ALL: [ClassificationState; 4] = [
        ClassificationState::ExactMatch,
        ClassificationState::Drifted,
        ClassificationState::New,
        ClassificationState::Orphaned,
    ];
}

impl fmt::Display for ClassificationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ClassificationState::ExactMatch => "EXACT_MATCH",
            ClassificationState::Drifted => "DRIFTED",
            ClassificationState::New => "NEW",
            ClassificationState::Orphaned => "ORPHANED",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    /// Original id recovered through the lineage edge
    LineageVerified,
    /// Original approximated from the abstracted node
    Heuristic,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::LineageVerified => f.write_str("lineage-verified"),
            Confidence::Heuristic => f.write_str("heuristic"),
        }
    }
}

/// Decision for one resource in one reconciliation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    /// Source resource; `None` for orphaned target entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstracted_id: Option<String>,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub state: ClassificationState,
    /// Matched (or, for orphans, unmatched) target id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    /// Identifier the resource is expected to have in the target, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_target_id: Option<String>,
    /// `None` for orphans: they have no source side to be confident about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    /// Changed fields, non-empty only for DRIFTED
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<PropertyChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ClassificationRecord {
    pub fn is_heuristic(&self) -> bool {
        self.confidence == Some(Confidence::Heuristic)
    }

    /// Identifier used for ordering: the abstracted id, or the target id for
    /// orphans
    pub fn sort_key(&self) -> &str {
        self.abstracted_id
            .as_deref()
            .or(self.target_id.as_deref())
            .unwrap_or_default()
    }
}
