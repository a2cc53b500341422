use super::graph::{GraphStore, InMemoryGraph};
use super::integrity::{IntegrityReport, check_bundle};
use super::pair::{LayerBundle, LayerId, LayerMetadata, LayerStats, LineagePair};
use super::snapshot::LayerSnapshot;
use crate::error::LineageError;
use crate::source::{AbstractedResource, OriginalResource};

/// Dual-graph lineage store over any [`GraphStore`].
///
/// Every operation names its layer. Bulk operations go through
/// [`LayerBundle`], so nodes never move without their lineage edge.
pub struct LineageStore<G: GraphStore = InMemoryGraph> {
    graph: G,
}

impl LineageStore<InMemoryGraph> {
    pub fn in_memory() -> Self {
        Self::new(InMemoryGraph::new())
    }
}

impl Default for LineageStore<InMemoryGraph> {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl<G: GraphStore> LineageStore<G> {
    pub fn new(graph: G) -> Self {
        Self { graph }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    pub fn layers(&self) -> Vec<LayerId> {
        self.graph.layers()
    }

    pub fn has_layer(&self, layer: &LayerId) -> bool {
        self.graph.has_layer(layer)
    }

    /// Create the layer if it does not exist yet
    pub fn ensure_layer(&mut self, layer: &LayerId) -> Result<(), LineageError> {
        if !self.graph.has_layer(layer) {
            self.graph.create_layer(layer)?;
        }
        Ok(())
    }

    pub fn metadata(&self, layer: &LayerId) -> Option<&LayerMetadata> {
        self.graph.metadata(layer)
    }

    pub fn set_metadata(
        &mut self,
        layer: &LayerId,
        metadata: LayerMetadata,
    ) -> Result<(), LineageError> {
        self.graph.set_metadata(layer, metadata)
    }

    /// Record an original, its abstracted node and the edge between them.
    ///
    /// Recording the same pair again replaces the node contents; pairing
    /// either side with a different partner is rejected before anything is
    /// written.
    pub fn record_pair(&mut self, layer: &LayerId, pair: LineagePair) -> Result<(), LineageError> {
        if !self.graph.has_layer(layer) {
            return Err(LineageError::UnknownLayer(layer.to_string()));
        }

        let LineagePair {
            original,
            abstracted,
        } = pair;

        if let Some(existing) = self.graph.lineage_of(layer, &abstracted.id)
            && existing != original.id
        {
            return Err(LineageError::AbstractedConflict {
                abstracted_id: abstracted.id.clone(),
                existing: existing.to_string(),
                original_id: original.id.clone(),
            });
        }

        if let Some(existing) = self.graph.abstraction_of(layer, &original.id)
            && existing != abstracted.id
        {
            return Err(LineageError::OriginalConflict {
                original_id: original.id.clone(),
                existing: existing.to_string(),
                abstracted_id: abstracted.id.clone(),
            });
        }

        let abstracted_id = abstracted.id.clone();
        let original_id = original.id.clone();
        self.graph.put_original(layer, original)?;
        self.graph.put_abstracted(layer, abstracted)?;
        self.graph.link(layer, &abstracted_id, &original_id)?;

        tracing::debug!(%layer, abstracted_id, original_id, "recorded lineage pair");
        Ok(())
    }

    /// Original id behind an abstracted id.
    ///
    /// A missing edge is reported as [`LineageError::NotFound`] for the
    /// caller to recover from.
    pub fn resolve_original(
        &self,
        layer: &LayerId,
        abstracted_id: &str,
    ) -> Result<&str, LineageError> {
        self.graph
            .lineage_of(layer, abstracted_id)
            .ok_or_else(|| LineageError::NotFound {
                layer: layer.to_string(),
                abstracted_id: abstracted_id.to_string(),
            })
    }

    /// Original node behind an abstracted id
    pub fn original_for(
        &self,
        layer: &LayerId,
        abstracted_id: &str,
    ) -> Result<&OriginalResource, LineageError> {
        let original_id = self.resolve_original(layer, abstracted_id)?;
        self.graph
            .original(layer, original_id)
            .ok_or_else(|| LineageError::NotFound {
                layer: layer.to_string(),
                abstracted_id: abstracted_id.to_string(),
            })
    }

    /// Abstracted id already issued for an original, if any
    pub fn abstraction_of(&self, layer: &LayerId, original_id: &str) -> Option<&str> {
        self.graph.abstraction_of(layer, original_id)
    }

    /// Abstracted nodes of a layer, sorted by id
    pub fn abstracted_resources(&self, layer: &LayerId) -> Vec<&AbstractedResource> {
        self.graph.abstracted_nodes(layer)
    }

    /// Replace an abstracted node's contents without touching its edge
    pub fn update_abstracted(
        &mut self,
        layer: &LayerId,
        node: AbstractedResource,
    ) -> Result<(), LineageError> {
        if self.graph.abstracted(layer, &node.id).is_none() {
            return Err(LineageError::NotFound {
                layer: layer.to_string(),
                abstracted_id: node.id,
            });
        }
        self.graph.put_abstracted(layer, node)
    }

    pub fn export(&self, layer: &LayerId) -> Result<LayerBundle, LineageError> {
        self.graph.export_layer(layer)
    }

    /// Copy a layer into a new one, edges included
    pub fn copy(&mut self, source: &LayerId, target: &LayerId) -> Result<LayerStats, LineageError> {
        if self.graph.has_layer(target) {
            return Err(LineageError::LayerExists(target.to_string()));
        }

        let bundle = self.graph.export_layer(source)?;
        let stats = bundle.stats();
        self.graph.import_layer(target, bundle)?;

        tracing::info!(%source, %target, pairs = stats.pairs, "copied layer");
        Ok(stats)
    }

    /// Freeze a layer into a verifiable snapshot
    pub fn archive(&self, layer: &LayerId) -> Result<LayerSnapshot, LineageError> {
        let bundle = self.graph.export_layer(layer)?;
        LayerSnapshot::capture(layer.clone(), bundle)
    }

    /// Materialise a snapshot under the layer name it was taken from
    pub fn restore(&mut self, snapshot: LayerSnapshot) -> Result<LayerStats, LineageError> {
        let layer = snapshot.layer.clone();
        self.restore_as(snapshot, &layer)
    }

    /// Materialise a snapshot under a new layer name
    pub fn restore_as(
        &mut self,
        snapshot: LayerSnapshot,
        layer: &LayerId,
    ) -> Result<LayerStats, LineageError> {
        snapshot.verify()?;

        if self.graph.has_layer(layer) {
            return Err(LineageError::LayerExists(layer.to_string()));
        }

        let stats = snapshot.bundle.stats();
        self.graph.import_layer(layer, snapshot.bundle)?;

        tracing::info!(%layer, snapshot_id = %snapshot.snapshot_id, pairs = stats.pairs, "restored layer");
        Ok(stats)
    }

    /// Check a layer for lineage violations
    pub fn verify(&self, layer: &LayerId) -> Result<IntegrityReport, LineageError> {
        let bundle = self.graph.export_layer(layer)?;
        Ok(check_bundle(&bundle))
    }

    pub fn drop_layer(&mut self, layer: &LayerId) -> bool {
        self.graph.drop_layer(layer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer(name: &str) -> LayerId {
        LayerId::parse(name).unwrap()
    }

    fn pair(original: &str, abstracted: &str) -> LineagePair {
        LineagePair {
            original: OriginalResource::new(original, "vm").with_property("size", json!("B2s")),
            abstracted: AbstractedResource::new(abstracted, "vm")
                .with_property("size", json!("B2s")),
        }
    }

    fn store_with_pairs() -> LineageStore {
        let mut store = LineageStore::in_memory();
        let source = layer("source");
        store.ensure_layer(&source).unwrap();
        store.record_pair(&source, pair("vm-0001", "vm-aaaaaaaa")).unwrap();
        store.record_pair(&source, pair("vm-0002", "vm-bbbbbbbb")).unwrap();
        store
    }

    #[test]
    fn test_record_and_resolve() {
        let store = store_with_pairs();

        assert_eq!(
            store.resolve_original(&layer("source"), "vm-aaaaaaaa").unwrap(),
            "vm-0001"
        );
        assert_eq!(
            store.original_for(&layer("source"), "vm-bbbbbbbb").unwrap().id,
            "vm-0002"
        );
    }

    #[test]
    fn test_resolve_unknown_returns_not_found() {
        let store = store_with_pairs();

        let err = store
            .resolve_original(&layer("source"), "vm-ffffffff")
            .unwrap_err();

        assert!(matches!(err, LineageError::NotFound { .. }));
    }

    #[test]
    fn test_record_pair_is_idempotent_and_rejects_repairing() {
        let mut store = store_with_pairs();
        let source = layer("source");

        assert!(store.record_pair(&source, pair("vm-0001", "vm-aaaaaaaa")).is_ok());
        assert!(matches!(
            store.record_pair(&source, pair("vm-0003", "vm-aaaaaaaa")),
            Err(LineageError::AbstractedConflict { .. })
        ));
        assert!(matches!(
            store.record_pair(&source, pair("vm-0001", "vm-cccccccc")),
            Err(LineageError::OriginalConflict { .. })
        ));
        assert!(store.graph().original(&source, "vm-0003").is_none());
        assert_eq!(store.abstracted_resources(&source).len(), 2);
    }

    #[test]
    fn test_record_pair_requires_layer() {
        let mut store = LineageStore::in_memory();

        let err = store
            .record_pair(&layer("missing"), pair("vm-0001", "vm-aaaaaaaa"))
            .unwrap_err();

        assert!(matches!(err, LineageError::UnknownLayer(_)));
    }

    #[test]
    fn test_copy_preserves_every_edge() {
        let mut store = store_with_pairs();

        let stats = store.copy(&layer("source"), &layer("working")).unwrap();

        assert_eq!(stats.pairs, 2);
        assert_eq!(
            store.graph().edges(&layer("working")),
            store.graph().edges(&layer("source"))
        );
        assert!(store.verify(&layer("working")).unwrap().is_valid());
    }

    #[test]
    fn test_copy_onto_existing_layer_fails() {
        let mut store = store_with_pairs();
        store.ensure_layer(&layer("working")).unwrap();

        assert!(matches!(
            store.copy(&layer("source"), &layer("working")),
            Err(LineageError::LayerExists(_))
        ));
    }

    #[test]
    fn test_archive_restore_round_trip() {
        let mut store = store_with_pairs();
        let snapshot = store.archive(&layer("source")).unwrap();

        let mut restored = LineageStore::in_memory();
        let stats = restored.restore(snapshot.clone()).unwrap();

        assert_eq!(stats.pairs, 2);
        assert_eq!(
            restored.export(&layer("source")).unwrap(),
            store.export(&layer("source")).unwrap()
        );

        let copy_stats = store.restore_as(snapshot, &layer("restored")).unwrap();
        assert_eq!(copy_stats.pairs, 2);
        assert_eq!(
            store.resolve_original(&layer("restored"), "vm-bbbbbbbb").unwrap(),
            "vm-0002"
        );
    }

    #[test]
    fn test_restore_rejects_tampered_snapshot() {
        let store = store_with_pairs();
        let mut snapshot = store.archive(&layer("source")).unwrap();
        snapshot.bundle.pairs.pop();

        let mut target = LineageStore::in_memory();
        let err = target.restore(snapshot).unwrap_err();

        assert!(matches!(err, LineageError::CorruptSnapshot { .. }));
        assert!(!target.has_layer(&layer("source")));
    }

    #[test]
    fn test_verify_reports_missing_lineage() {
        let mut store = store_with_pairs();
        let source = layer("source");
        let mut bundle = store.export(&source).unwrap();
        let detached = bundle.pairs.remove(0);
        bundle.detached_abstracted.push(detached.abstracted);
        bundle.detached_originals.push(detached.original);
        store.drop_layer(&source);
        store.graph.import_layer(&source, bundle).unwrap();

        let report = store.verify(&source).unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            store.resolve_original(&source, "vm-aaaaaaaa"),
            Err(LineageError::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_abstracted_keeps_edge() {
        let mut store = store_with_pairs();
        let source = layer("source");
        let updated = AbstractedResource::new("vm-aaaaaaaa", "vm").with_property("size", json!("D4"));

        store.update_abstracted(&source, updated).unwrap();

        assert_eq!(store.resolve_original(&source, "vm-aaaaaaaa").unwrap(), "vm-0001");
        assert_eq!(
            store.graph().abstracted(&source, "vm-aaaaaaaa").unwrap().properties["size"],
            json!("D4")
        );
    }
}
