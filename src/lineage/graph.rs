//! Property graph store interface and the in-memory implementation.
//!
//! Bulk layer transfer is only available through [`GraphStore::export_layer`]
//! and [`GraphStore::import_layer`], which move [`LayerBundle`]s. There is no
//! relation-type filter to get wrong.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::pair::{LayerBundle, LayerId, LayerMetadata, LineagePair};
use crate::error::LineageError;
use crate::source::{AbstractedResource, OriginalResource};

/// Typed nodes (Original, Abstracted) and the typed lineage edge, per layer
pub trait GraphStore: Send + Sync {
    fn has_layer(&self, layer: &LayerId) -> bool;

    /// All layer names, sorted
    fn layers(&self) -> Vec<LayerId>;

    /// Create an empty layer; fails if it exists
    fn create_layer(&mut self, layer: &LayerId) -> Result<(), LineageError>;

    /// Remove a layer and everything in it. Returns whether it existed.
    fn drop_layer(&mut self, layer: &LayerId) -> bool;

    fn metadata(&self, layer: &LayerId) -> Option<&LayerMetadata>;

    fn set_metadata(&mut self, layer: &LayerId, metadata: LayerMetadata)
    -> Result<(), LineageError>;

    fn put_original(
        &mut self,
        layer: &LayerId,
        node: OriginalResource,
    ) -> Result<(), LineageError>;

    fn put_abstracted(
        &mut self,
        layer: &LayerId,
        node: AbstractedResource,
    ) -> Result<(), LineageError>;

    /// Create the lineage edge. Both nodes must exist and the edge is 1:1.
    fn link(
        &mut self,
        layer: &LayerId,
        abstracted_id: &str,
        original_id: &str,
    ) -> Result<(), LineageError>;

    fn original(&self, layer: &LayerId, id: &str) -> Option<&OriginalResource>;

    fn abstracted(&self, layer: &LayerId, id: &str) -> Option<&AbstractedResource>;

    /// Target of the lineage edge leaving an abstracted node
    fn lineage_of(&self, layer: &LayerId, abstracted_id: &str) -> Option<&str>;

    /// Source of the lineage edge arriving at an original node
    fn abstraction_of(&self, layer: &LayerId, original_id: &str) -> Option<&str>;

    /// Abstracted nodes sorted by id
    fn abstracted_nodes(&self, layer: &LayerId) -> Vec<&AbstractedResource>;

    /// Original nodes sorted by id
    fn original_nodes(&self, layer: &LayerId) -> Vec<&OriginalResource>;

    /// Lineage edges as (abstracted id, original id), sorted
    fn edges(&self, layer: &LayerId) -> Vec<(&str, &str)>;

    /// Export a layer as one bundle: every node together with its edge
    fn export_layer(&self, layer: &LayerId) -> Result<LayerBundle, LineageError> {
        if !self.has_layer(layer) {
            return Err(LineageError::UnknownLayer(layer.to_string()));
        }

        let mut bundle = LayerBundle {
            metadata: self.metadata(layer).cloned().unwrap_or_default(),
            ..LayerBundle::default()
        };
        let mut paired = HashSet::new();

        for abstracted in self.abstracted_nodes(layer) {
            let original = self
                .lineage_of(layer, &abstracted.id)
                .and_then(|original_id| self.original(layer, original_id));

            match original {
                Some(original) => {
                    paired.insert(original.id.as_str());
                    bundle.pairs.push(LineagePair {
                        original: original.clone(),
                        abstracted: abstracted.clone(),
                    });
                }
                None => bundle.detached_abstracted.push(abstracted.clone()),
            }
        }

        for original in self.original_nodes(layer) {
            if !paired.contains(original.id.as_str()) {
                bundle.detached_originals.push(original.clone());
            }
        }

        Ok(bundle)
    }

    /// Materialise a bundle into a new layer, nodes and edges in one pass
    fn import_layer(&mut self, layer: &LayerId, bundle: LayerBundle) -> Result<(), LineageError> {
        self.create_layer(layer)?;

        let result = (|| {
            self.set_metadata(layer, bundle.metadata)?;

            for pair in bundle.pairs {
                let abstracted_id = pair.abstracted.id.clone();
                let original_id = pair.original.id.clone();
                self.put_original(layer, pair.original)?;
                self.put_abstracted(layer, pair.abstracted)?;
                self.link(layer, &abstracted_id, &original_id)?;
            }

            for node in bundle.detached_abstracted {
                self.put_abstracted(layer, node)?;
            }

            for node in bundle.detached_originals {
                self.put_original(layer, node)?;
            }

            Ok(())
        })();

        if result.is_err() {
            self.drop_layer(layer);
        }

        result
    }
}

#[derive(Debug, Default)]
struct LayerGraph {
    metadata: LayerMetadata,
    originals: BTreeMap<String, OriginalResource>,
    abstracted: BTreeMap<String, AbstractedResource>,
    lineage: BTreeMap<String, String>,
    reverse: HashMap<String, String>,
}

/// Graph store kept entirely in memory; persisted through layer snapshots
#[derive(Debug, Default)]
pub struct InMemoryGraph {
    layers: BTreeMap<LayerId, LayerGraph>,
}

impl InMemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn layer(&self, layer: &LayerId) -> Option<&LayerGraph> {
        self.layers.get(layer)
    }

    fn layer_mut(&mut self, layer: &LayerId) -> Result<&mut LayerGraph, LineageError> {
        self.layers
            .get_mut(layer)
            .ok_or_else(|| LineageError::UnknownLayer(layer.to_string()))
    }
}

impl GraphStore for InMemoryGraph {
    fn has_layer(&self, layer: &LayerId) -> bool {
        self.layers.contains_key(layer)
    }

    fn layers(&self) -> Vec<LayerId> {
        self.layers.keys().cloned().collect()
    }

    fn create_layer(&mut self, layer: &LayerId) -> Result<(), LineageError> {
        if self.layers.contains_key(layer) {
            return Err(LineageError::LayerExists(layer.to_string()));
        }
        self.layers.insert(layer.clone(), LayerGraph::default());
        Ok(())
    }

    fn drop_layer(&mut self, layer: &LayerId) -> bool {
        self.layers.remove(layer).is_some()
    }

    fn metadata(&self, layer: &LayerId) -> Option<&LayerMetadata> {
        self.layer(layer).map(|l| &l.metadata)
    }

    fn set_metadata(
        &mut self,
        layer: &LayerId,
        metadata: LayerMetadata,
    ) -> Result<(), LineageError> {
        self.layer_mut(layer)?.metadata = metadata;
        Ok(())
    }

    fn put_original(
        &mut self,
        layer: &LayerId,
        node: OriginalResource,
    ) -> Result<(), LineageError> {
        self.layer_mut(layer)?
            .originals
            .insert(node.id.clone(), node);
        Ok(())
    }

    fn put_abstracted(
        &mut self,
        layer: &LayerId,
        node: AbstractedResource,
    ) -> Result<(), LineageError> {
        self.layer_mut(layer)?
            .abstracted
            .insert(node.id.clone(), node);
        Ok(())
    }

    fn link(
        &mut self,
        layer: &LayerId,
        abstracted_id: &str,
        original_id: &str,
    ) -> Result<(), LineageError> {
        let graph = self.layer_mut(layer)?;

        if !graph.abstracted.contains_key(abstracted_id) || !graph.originals.contains_key(original_id)
        {
            return Err(LineageError::DanglingEdge {
                abstracted_id: abstracted_id.to_string(),
                original_id: original_id.to_string(),
            });
        }

        if let Some(existing) = graph.lineage.get(abstracted_id)
            && existing != original_id
        {
            return Err(LineageError::AbstractedConflict {
                abstracted_id: abstracted_id.to_string(),
                existing: existing.clone(),
                original_id: original_id.to_string(),
            });
        }

        if let Some(existing) = graph.reverse.get(original_id)
            && existing != abstracted_id
        {
            return Err(LineageError::OriginalConflict {
                original_id: original_id.to_string(),
                existing: existing.clone(),
                abstracted_id: abstracted_id.to_string(),
            });
        }

        graph
            .lineage
            .insert(abstracted_id.to_string(), original_id.to_string());
        graph
            .reverse
            .insert(original_id.to_string(), abstracted_id.to_string());
        Ok(())
    }

    fn original(&self, layer: &LayerId, id: &str) -> Option<&OriginalResource> {
        self.layer(layer)?.originals.get(id)
    }

    fn abstracted(&self, layer: &LayerId, id: &str) -> Option<&AbstractedResource> {
        self.layer(layer)?.abstracted.get(id)
    }

    fn lineage_of(&self, layer: &LayerId, abstracted_id: &str) -> Option<&str> {
        self.layer(layer)?
            .lineage
            .get(abstracted_id)
            .map(String::as_str)
    }

    fn abstraction_of(&self, layer: &LayerId, original_id: &str) -> Option<&str> {
        self.layer(layer)?
            .reverse
            .get(original_id)
            .map(String::as_str)
    }

    fn abstracted_nodes(&self, layer: &LayerId) -> Vec<&AbstractedResource> {
        self.layer(layer)
            .map(|l| l.abstracted.values().collect())
            .unwrap_or_default()
    }

    fn original_nodes(&self, layer: &LayerId) -> Vec<&OriginalResource> {
        self.layer(layer)
            .map(|l| l.originals.values().collect())
            .unwrap_or_default()
    }

    fn edges(&self, layer: &LayerId) -> Vec<(&str, &str)> {
        self.layer(layer)
            .map(|l| {
                l.lineage
                    .iter()
                    .map(|(a, o)| (a.as_str(), o.as_str()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(name: &str) -> LayerId {
        LayerId::parse(name).unwrap()
    }

    fn populated() -> InMemoryGraph {
        let mut graph = InMemoryGraph::new();
        let l = layer("source");
        graph.create_layer(&l).unwrap();
        graph
            .put_original(&l, OriginalResource::new("vm-0001", "vm"))
            .unwrap();
        graph
            .put_abstracted(&l, AbstractedResource::new("vm-aaaaaaaa", "vm"))
            .unwrap();
        graph.link(&l, "vm-aaaaaaaa", "vm-0001").unwrap();
        graph
    }

    #[test]
    fn test_link_requires_both_nodes() {
        let mut graph = populated();

        let err = graph
            .link(&layer("source"), "vm-missing", "vm-0001")
            .unwrap_err();

        assert!(matches!(err, LineageError::DanglingEdge { .. }));
    }

    #[test]
    fn test_link_is_one_to_one() {
        let mut graph = populated();
        let l = layer("source");
        graph
            .put_original(&l, OriginalResource::new("vm-0002", "vm"))
            .unwrap();
        graph
            .put_abstracted(&l, AbstractedResource::new("vm-bbbbbbbb", "vm"))
            .unwrap();

        assert!(matches!(
            graph.link(&l, "vm-aaaaaaaa", "vm-0002"),
            Err(LineageError::AbstractedConflict { .. })
        ));
        assert!(matches!(
            graph.link(&l, "vm-bbbbbbbb", "vm-0001"),
            Err(LineageError::OriginalConflict { .. })
        ));
        assert!(graph.link(&l, "vm-aaaaaaaa", "vm-0001").is_ok());
    }

    #[test]
    fn test_export_bundles_edges_with_nodes() {
        let graph = populated();

        let bundle = graph.export_layer(&layer("source")).unwrap();

        assert_eq!(bundle.pairs.len(), 1);
        assert_eq!(bundle.pairs[0].abstracted.id, "vm-aaaaaaaa");
        assert_eq!(bundle.pairs[0].original.id, "vm-0001");
        assert!(bundle.detached_abstracted.is_empty());
    }

    #[test]
    fn test_import_into_existing_layer_fails_without_touching_it() {
        let mut graph = populated();
        let bundle = graph.export_layer(&layer("source")).unwrap();

        let err = graph.import_layer(&layer("source"), bundle).unwrap_err();

        assert!(matches!(err, LineageError::LayerExists(_)));
        assert_eq!(graph.edges(&layer("source")).len(), 1);
    }

    #[test]
    fn test_failed_import_leaves_no_partial_layer() {
        let mut graph = InMemoryGraph::new();
        let bundle = LayerBundle {
            pairs: vec![
                LineagePair {
                    original: OriginalResource::new("vm-0001", "vm"),
                    abstracted: AbstractedResource::new("vm-aaaaaaaa", "vm"),
                },
                LineagePair {
                    original: OriginalResource::new("vm-0002", "vm"),
                    abstracted: AbstractedResource::new("vm-aaaaaaaa", "vm"),
                },
            ],
            ..LayerBundle::default()
        };

        assert!(graph.import_layer(&layer("copy"), bundle).is_err());
        assert!(!graph.has_layer(&layer("copy")));
    }

    #[test]
    fn test_unknown_layer_export() {
        let graph = InMemoryGraph::new();

        assert!(matches!(
            graph.export_layer(&layer("nope")),
            Err(LineageError::UnknownLayer(_))
        ));
    }
}
