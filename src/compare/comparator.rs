use serde::Serialize;
use std::collections::HashSet;

use super::diff::{DiffOptions, diff_properties};
use super::record::{ClassificationRecord, ClassificationState, Confidence};
use crate::error::TranslationError;
use crate::lineage::{GraphStore, InMemoryGraph, LayerId, LineageStore};
use crate::scanner::ValidatedInventory;
use crate::source::{
    AbstractedResource, OriginalResource, PropertyBag, TargetInventoryEntry, resource_name,
};
use crate::translation::{ArtifactTable, NameTranslator};

#[derive(Debug, Clone, Default)]
pub struct CompareOptions {
    pub diff: DiffOptions,
    pub artifacts: ArtifactTable,
}

/// A source resource that could not be classified
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationFailure {
    pub abstracted_id: String,
    pub reason: String,
}

/// Result of classifying a whole layer
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Source records sorted by abstracted id, then orphans sorted by target id
    pub records: Vec<ClassificationRecord>,
    pub failures: Vec<ClassificationFailure>,
}

impl Classification {
    pub fn count(&self, state: ClassificationState) -> usize {
        self.records.iter().filter(|r| r.state == state).count()
    }

    /// Records for source resources (everything but orphans)
    pub fn source_records(&self) -> impl Iterator<Item = &ClassificationRecord> {
        self.records
            .iter()
            .filter(|r| r.state != ClassificationState::Orphaned)
    }
}

/// Classifies abstracted resources against a validated target inventory.
///
/// The original behind each abstracted node is recovered through its lineage
/// edge. When the edge is missing the original is approximated from the node
/// itself and the result is marked heuristic.
pub struct ResourceComparator<'a, G: GraphStore = InMemoryGraph> {
    store: &'a LineageStore<G>,
    layer: LayerId,
    translator: NameTranslator,
    options: CompareOptions,
}

impl<'a, G: GraphStore> ResourceComparator<'a, G> {
    pub fn new(store: &'a LineageStore<G>, layer: LayerId, translator: NameTranslator) -> Self {
        Self {
            store,
            layer,
            translator,
            options: CompareOptions::default(),
        }
    }

    pub fn with_options(mut self, options: CompareOptions) -> Self {
        self.options = options;
        self
    }

    /// Classify one abstracted resource
    pub fn classify(
        &mut self,
        resource: &AbstractedResource,
        inventory: &ValidatedInventory,
    ) -> Result<ClassificationRecord, TranslationError> {
        let store = self.store;
        match store.original_for(&self.layer, &resource.id) {
            Ok(original) => self.classify_verified(resource, original, inventory),
            Err(err) => {
                tracing::debug!(
                    abstracted_id = %resource.id,
                    reason = %err,
                    "lineage unresolved, using heuristic match"
                );
                self.classify_heuristic(resource, inventory)
            }
        }
    }

    /// Classify every abstracted node of the layer, then report unmatched
    /// inventory entries as orphaned
    pub fn classify_all(&mut self, inventory: &ValidatedInventory) -> Classification {
        let store = self.store;
        let mut classification = Classification::default();
        let mut matched: HashSet<String> = HashSet::new();

        for resource in store.abstracted_resources(&self.layer) {
            match self.classify(resource, inventory) {
                Ok(record) => {
                    if let Some(target_id) = &record.target_id {
                        matched.insert(target_id.to_lowercase());
                    }
                    classification.records.push(record);
                }
                Err(err) => {
                    tracing::debug!(abstracted_id = %resource.id, error = %err, "resource not classified");
                    classification.failures.push(ClassificationFailure {
                        abstracted_id: resource.id.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        for entry in inventory.entries() {
            if !matched.contains(&entry.id.to_lowercase()) {
                classification.records.push(ClassificationRecord {
                    abstracted_id: None,
                    resource_type: entry.resource_type.clone(),
                    state: ClassificationState::Orphaned,
                    target_id: Some(entry.id.clone()),
                    expected_target_id: None,
                    confidence: None,
                    diff: Vec::new(),
                    note: None,
                });
            }
        }

        classification
    }

    fn classify_verified(
        &mut self,
        resource: &AbstractedResource,
        original: &OriginalResource,
        inventory: &ValidatedInventory,
    ) -> Result<ClassificationRecord, TranslationError> {
        let expected_id = self
            .translator
            .translate(&original.id, &original.resource_type)?;
        let expected = self.translator.rewrite_properties(&original.properties);

        let record = match inventory.get(&expected_id) {
            Some(entry) => self.compare_with(resource, &expected, entry, Confidence::LineageVerified),
            None => self.new_record(resource, Confidence::LineageVerified, Some(expected_id), None),
        };
        Ok(record)
    }

    fn classify_heuristic(
        &mut self,
        resource: &AbstractedResource,
        inventory: &ValidatedInventory,
    ) -> Result<ClassificationRecord, TranslationError> {
        let candidate = resource
            .name_hint()
            .unwrap_or_else(|| resource_name(&resource.id));

        let Some(base) = self
            .options
            .artifacts
            .strip(candidate, self.translator.suffix())
        else {
            return Ok(self.new_record(
                resource,
                Confidence::Heuristic,
                None,
                Some("no recoverable name in abstracted node".to_string()),
            ));
        };

        let expected_name = self
            .translator
            .expected_name(&base, &resource.resource_type)?;
        let group_hint = resource.resource_group_hint();

        let same_type: Vec<&TargetInventoryEntry> = inventory.of_type(&resource.resource_type).collect();
        let exact: Vec<&TargetInventoryEntry> = same_type
            .iter()
            .copied()
            .filter(|e| e.name().eq_ignore_ascii_case(&expected_name))
            .filter(|e| {
                group_hint.is_none_or(|hint| {
                    e.resource_group()
                        .is_some_and(|group| group.eq_ignore_ascii_case(hint))
                })
            })
            .collect();

        let Some(first) = exact.first() else {
            let partial = same_type
                .iter()
                .filter(|e| e.name().to_lowercase().contains(&base))
                .count();
            let note = (partial > 0)
                .then(|| format!("{} partial candidate(s), none exact", partial));
            return Ok(self.new_record(resource, Confidence::Heuristic, None, note));
        };

        let expected = self.translator.rewrite_properties(&resource.properties);
        let mut record = self.compare_with(resource, &expected, first, Confidence::Heuristic);
        if exact.len() > 1 {
            record.note = Some(format!(
                "{} exact candidates, took the first by id",
                exact.len()
            ));
        }
        Ok(record)
    }

    fn compare_with(
        &self,
        resource: &AbstractedResource,
        expected: &PropertyBag,
        entry: &TargetInventoryEntry,
        confidence: Confidence,
    ) -> ClassificationRecord {
        let diff = diff_properties(expected, &entry.properties, &self.options.diff);
        let state = if diff.is_empty() {
            ClassificationState::ExactMatch
        } else {
            ClassificationState::Drifted
        };

        ClassificationRecord {
            abstracted_id: Some(resource.id.clone()),
            resource_type: resource.resource_type.clone(),
            state,
            target_id: Some(entry.id.clone()),
            expected_target_id: Some(entry.id.clone()),
            confidence: Some(confidence),
            diff,
            note: None,
        }
    }

    fn new_record(
        &self,
        resource: &AbstractedResource,
        confidence: Confidence,
        expected_target_id: Option<String>,
        note: Option<String>,
    ) -> ClassificationRecord {
        ClassificationRecord {
            abstracted_id: Some(resource.id.clone()),
            resource_type: resource.resource_type.clone(),
            state: ClassificationState::New,
            target_id: None,
            expected_target_id,
            confidence: Some(confidence),
            diff: Vec::new(),
            note,
        }
    }
}
