use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::LineageError;
use crate::identity::CollisionTable;
use crate::source::{AbstractedResource, OriginalResource};
use crate::translation::TenantContext;

/// Name of a graph layer. Passed explicitly to every layer-scoped call.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LayerId(String);

impl LayerId {
    pub fn parse(name: &str) -> Result<Self, LineageError> {
        let valid = !name.is_empty()
            && name.len() <= 64
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid {
            Ok(Self(name.to_string()))
        } else {
            Err(LineageError::InvalidLayerName(name.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LayerId {
    type Error = LineageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        LayerId::parse(&value)
    }
}

impl From<LayerId> for String {
    fn from(layer: LayerId) -> Self {
        layer.0
    }
}

/// An original node, its abstracted node and the lineage edge between them.
///
/// The edge is the pairing itself: a pair cannot be moved without it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineagePair {
    pub original: OriginalResource,
    pub abstracted: AbstractedResource,
}

/// Layer-level facts that travel with the nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerMetadata {
    /// Tenant the originals were discovered in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantContext>,
    /// Salts used while abstracting this layer
    #[serde(default, skip_serializing_if = "CollisionTable::is_empty")]
    pub collisions: CollisionTable,
}

/// Unit of every bulk layer operation (copy, archive, restore).
///
/// Nodes without an edge only appear here when the layer is already damaged;
/// they are carried as-is so a copy reproduces the source exactly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerBundle {
    #[serde(default)]
    pub metadata: LayerMetadata,
    pub pairs: Vec<LineagePair>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detached_abstracted: Vec<AbstractedResource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub detached_originals: Vec<OriginalResource>,
}

impl LayerBundle {
    pub fn stats(&self) -> LayerStats {
        LayerStats {
            pairs: self.pairs.len(),
            detached_abstracted: self.detached_abstracted.len(),
            detached_originals: self.detached_originals.len(),
        }
    }
}

/// Counts reported after a layer operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerStats {
    pub pairs: usize,
    pub detached_abstracted: usize,
    pub detached_originals: usize,
}
