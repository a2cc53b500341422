use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};

use super::graph::GraphStore;
use super::pair::{LayerId, LineagePair};
use super::store::LineageStore;
use crate::error::GraphBuildError;
use crate::identity::{IdentityAbstractor, redact_properties};
use crate::source::{AbstractedResource, OriginalResource};
use crate::translation::TenantContext;

/// Outcome of building one layer of the dual graph
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BuildReport {
    /// Pairs recorded in this pass
    pub recorded: usize,
    /// Originals that already had an abstracted node in the layer
    pub reused: usize,
    /// Original ids supplied more than once (first occurrence kept)
    pub duplicates: Vec<String>,
    /// Originals that needed a salted hash
    pub salted: usize,
}

/// Abstract every discovered resource and record it with its lineage edge.
///
/// Pairs already in the layer are registered with the abstractor first, so
/// re-running over the same discovery output changes nothing.
pub fn build_dual_graph<G: GraphStore>(
    store: &mut LineageStore<G>,
    layer: &LayerId,
    abstractor: &mut IdentityAbstractor,
    originals: &[OriginalResource],
    tenant: Option<TenantContext>,
) -> Result<BuildReport, GraphBuildError> {
    store.ensure_layer(layer)?;

    for pair in store.export(layer)?.pairs {
        abstractor.register_existing(&pair.abstracted.id, &pair.original.id)?;
    }

    let mut report = BuildReport::default();
    let mut unique: BTreeMap<&str, &OriginalResource> = BTreeMap::new();
    for original in originals {
        match unique.entry(original.id.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(original);
            }
            Entry::Occupied(_) => {
                tracing::warn!(resource_id = %original.id, "duplicate resource in discovery output");
                report.duplicates.push(original.id.clone());
            }
        }
    }

    let mut issued: HashMap<&str, String> = HashMap::new();
    for (id, original) in &unique {
        if store.abstraction_of(layer, id).is_some() {
            report.reused += 1;
        }
        let abstracted_id = abstractor.abstract_resource(id, &original.resource_type)?;
        issued.insert(*id, abstracted_id);
    }

    for (id, original) in &unique {
        let Some(abstracted_id) = issued.get(id) else {
            continue;
        };

        let parent_id = original.parent_id.as_deref().and_then(|parent| {
            issued
                .get(parent)
                .cloned()
                .or_else(|| store.abstraction_of(layer, parent).map(String::from))
        });

        let abstracted = AbstractedResource {
            id: abstracted_id.clone(),
            resource_type: original.resource_type.clone(),
            properties: redact_properties(&original.properties),
            parent_id,
        };

        store.record_pair(
            layer,
            LineagePair {
                original: (*original).clone(),
                abstracted,
            },
        )?;
        report.recorded += 1;
    }

    let collisions = abstractor.collision_table().clone();
    report.salted = collisions.len();

    let mut metadata = store.metadata(layer).cloned().unwrap_or_default();
    metadata.collisions = collisions;
    if tenant.is_some() {
        metadata.tenant = tenant;
    }
    store.set_metadata(layer, metadata)?;

    tracing::info!(
        %layer,
        recorded = report.recorded,
        reused = report.reused,
        salted = report.salted,
        "built dual graph layer"
    );

    Ok(report)
}
