use serde::Serialize;
use std::collections::BTreeMap;

use super::comparator::{Classification, ClassificationFailure};
use super::record::ClassificationState;
use crate::traits::Output;

pub const DEFAULT_SUSPICION_THRESHOLD: f64 = 0.5;

/// End-of-run summary of a reconciliation
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationSummary {
    pub counts: BTreeMap<ClassificationState, usize>,
    /// Abstracted ids classified without a lineage edge
    pub heuristic: Vec<String>,
    pub failures: Vec<ClassificationFailure>,
    /// NEW records over source records
    pub new_fraction: f64,
    pub inventory_size: usize,
    pub threshold: f64,
    /// Too many NEW results against a non-empty target: lineage is likely damaged
    pub suspicious: bool,
}

impl ReconciliationSummary {
    pub fn from_classification(
        classification: &Classification,
        inventory_size: usize,
        threshold: f64,
    ) -> Self {
        let counts = ClassificationState::ALL
            .into_iter()
            .map(|state| (state, classification.count(state)))
            .collect();

        let heuristic = classification
            .records
            .iter()
            .filter(|r| r.is_heuristic())
            .filter_map(|r| r.abstracted_id.clone())
            .collect();

        let source_total = classification.source_records().count();
        let new_count = classification.count(ClassificationState::New);
        let new_fraction = if source_total == 0 {
            0.0
        } else {
            new_count as f64 / source_total as f64
        };

        Self {
            counts,
            heuristic,
            failures: classification.failures.clone(),
            new_fraction,
            inventory_size,
            threshold,
            suspicious: inventory_size > 0 && new_fraction > threshold,
        }
    }

    pub fn count(&self, state: ClassificationState) -> usize {
        self.counts.get(&state).copied().unwrap_or(0)
    }

    pub fn render(&self, output: &dyn Output) {
        output.section("Reconciliation summary");
        for state in ClassificationState::ALL {
            output.key_value(&state.to_string(), &self.count(state).to_string());
        }

        output.key_value("Heuristic", &self.heuristic.len().to_string());
        for id in &self.heuristic {
            output.dimmed(&format!("  {}", id));
        }

        if !self.failures.is_empty() {
            output.key_value("Unclassified", &self.failures.len().to_string());
            for failure in &self.failures {
                tracing::debug!(
                    abstracted_id = %failure.abstracted_id,
                    reason = %failure.reason,
                    "resource left unclassified"
                );
                output.dimmed(&format!("  {}", failure.abstracted_id));
            }
        }

        if self.suspicious {
            tracing::warn!(
                new_fraction = self.new_fraction,
                threshold = self.threshold,
                inventory_size = self.inventory_size,
                "NEW fraction above suspicion threshold"
            );
            output.blank();
            output.warning(&format!(
                "{:.0}% of source resources classified NEW while the target holds {} resources.",
                self.new_fraction * 100.0,
                self.inventory_size
            ));
            output.warning("Check lineage integrity with `tmirror layer verify` before acting on this plan.");
        }
    }
}
