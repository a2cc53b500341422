//! Layer integrity checks
//!
//! Works on a [`LayerBundle`], so the same checks cover a live layer (via
//! export) and a snapshot that has not been materialised yet.

use std::collections::HashMap;
use std::fmt;

use super::pair::LayerBundle;

/// Integrity report containing errors and warnings
#[derive(Debug, Default)]
pub struct IntegrityReport {
    /// Violations of the one-edge-per-abstracted-node rule
    pub errors: Vec<IntegrityError>,
    /// Findings that do not break lineage
    pub warnings: Vec<IntegrityWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    /// Abstracted node without a lineage edge
    MissingLineage { abstracted_id: String },
    /// Abstracted id carried by more than one pair
    DuplicateAbstracted { abstracted_id: String, count: usize },
    /// Original referenced by more than one lineage edge
    SharedOriginal {
        original_id: String,
        abstracted_ids: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityWarning {
    /// Original node that was never abstracted
    UnabstractedOriginal { original_id: String },
}

impl IntegrityReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Whether any pair shares an endpoint with another pair
    pub fn violates_pairing(&self) -> bool {
        self.errors.iter().any(|e| {
            matches!(
                e,
                IntegrityError::DuplicateAbstracted { .. } | IntegrityError::SharedOriginal { .. }
            )
        })
    }

    pub fn issue_count(&self) -> usize {
        self.errors.len() + self.warnings.len()
    }
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityError::MissingLineage { abstracted_id } => {
                write!(f, "Abstracted node '{}' has no lineage edge", abstracted_id)
            }
            IntegrityError::DuplicateAbstracted {
                abstracted_id,
                count,
            } => {
                write!(
                    f,
                    "Abstracted id '{}' appears in {} lineage pairs",
                    abstracted_id, count
                )
            }
            IntegrityError::SharedOriginal {
                original_id,
                abstracted_ids,
            } => {
                write!(
                    f,
                    "Original '{}' is linked from several abstracted nodes: {}",
                    original_id,
                    abstracted_ids.join(", ")
                )
            }
        }
    }
}

impl fmt::Display for IntegrityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntegrityWarning::UnabstractedOriginal { original_id } => {
                write!(f, "Original '{}' has no abstracted counterpart", original_id)
            }
        }
    }
}

/// Check a bundle for lineage violations
pub fn check_bundle(bundle: &LayerBundle) -> IntegrityReport {
    let mut report = IntegrityReport::default();

    let mut by_abstracted: HashMap<&str, usize> = HashMap::new();
    let mut by_original: HashMap<&str, Vec<&str>> = HashMap::new();

    for pair in &bundle.pairs {
        *by_abstracted.entry(pair.abstracted.id.as_str()).or_default() += 1;
        by_original
            .entry(pair.original.id.as_str())
            .or_default()
            .push(pair.abstracted.id.as_str());
    }

    let mut duplicates: Vec<_> = by_abstracted
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect();
    duplicates.sort();
    for (abstracted_id, count) in duplicates {
        report.errors.push(IntegrityError::DuplicateAbstracted {
            abstracted_id: abstracted_id.to_string(),
            count,
        });
    }

    let mut shared: Vec<_> = by_original
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .collect();
    shared.sort();
    for (original_id, ids) in shared {
        report.errors.push(IntegrityError::SharedOriginal {
            original_id: original_id.to_string(),
            abstracted_ids: ids.into_iter().map(String::from).collect(),
        });
    }

    for node in &bundle.detached_abstracted {
        report.errors.push(IntegrityError::MissingLineage {
            abstracted_id: node.id.clone(),
        });
    }

    for node in &bundle.detached_originals {
        report.warnings.push(IntegrityWarning::UnabstractedOriginal {
            original_id: node.id.clone(),
        });
    }

    report
}
