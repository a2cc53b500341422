//! Dual graph of original and abstracted resources.
//!
//! Each discovered resource is stored twice in a layer: the original node with
//! its real identifier, and the abstracted node that replaces it everywhere
//! downstream. A directed lineage edge leads from the abstracted node back to
//! its original. Layer-level operations (copy, archive, restore) only ever move
//! [`LineagePair`]s, so the edge always travels with the nodes it connects.

pub mod builder;
pub mod graph;
pub mod integrity;
pub mod pair;
pub mod snapshot;
pub mod store;

pub use builder::{BuildReport, build_dual_graph};
pub use graph::{GraphStore, InMemoryGraph};
pub use integrity::{IntegrityError, IntegrityReport, IntegrityWarning, check_bundle};
pub use pair::{LayerBundle, LayerId, LayerMetadata, LayerStats, LineagePair};
pub use snapshot::{GraphFiles, LayerSnapshot};
pub use store::LineageStore;
