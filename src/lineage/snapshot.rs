//! Layer snapshots and their on-disk layout
//!
//! ```text
//! <graph_dir>/<layer>.json                        current state of a layer
//! <graph_dir>/archives/<layer>-<ts>-<id8>.json    archived snapshots
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use super::integrity::check_bundle;
use super::pair::{LayerBundle, LayerId};
use crate::error::LineageError;
use crate::traits::FileSystem;

pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A layer frozen at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSnapshot {
    pub snapshot_id: String,
    pub layer: LayerId,
    pub created_at: DateTime<Utc>,
    pub format_version: u32,
    pub pair_count: usize,
    /// SHA-256 over the serialized bundle
    pub checksum: String,
    pub bundle: LayerBundle,
}

/// Hex SHA-256 of the bundle's JSON form
pub fn bundle_checksum(bundle: &LayerBundle) -> Result<String, LineageError> {
    let bytes = serde_json::to_vec(bundle).map_err(|e| LineageError::Storage(e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

impl LayerSnapshot {
    pub fn capture(layer: LayerId, bundle: LayerBundle) -> Result<Self, LineageError> {
        Ok(Self {
            snapshot_id: Uuid::new_v4().to_string(),
            layer,
            created_at: Utc::now(),
            format_version: SNAPSHOT_FORMAT_VERSION,
            pair_count: bundle.pairs.len(),
            checksum: bundle_checksum(&bundle)?,
            bundle,
        })
    }

    /// Check format, checksum, pair count and the 1:1 pairing
    pub fn verify(&self) -> Result<(), LineageError> {
        let corrupt = |reason: String| LineageError::CorruptSnapshot {
            snapshot_id: self.snapshot_id.clone(),
            reason,
        };

        if self.format_version > SNAPSHOT_FORMAT_VERSION {
            return Err(corrupt(format!(
                "format version {} is newer than supported {}",
                self.format_version, SNAPSHOT_FORMAT_VERSION
            )));
        }

        let actual = bundle_checksum(&self.bundle)?;
        if actual != self.checksum {
            return Err(corrupt(format!(
                "checksum mismatch (recorded {}, computed {})",
                self.checksum, actual
            )));
        }

        if self.pair_count != self.bundle.pairs.len() {
            return Err(corrupt(format!(
                "recorded {} lineage pairs but found {}",
                self.pair_count,
                self.bundle.pairs.len()
            )));
        }

        let report = check_bundle(&self.bundle);
        if report.violates_pairing() {
            let details: Vec<String> = report.errors.iter().map(|e| e.to_string()).collect();
            return Err(corrupt(details.join("; ")));
        }

        Ok(())
    }
}

/// Reads and writes layer snapshots under a graph directory
pub struct GraphFiles {
    fs: Arc<dyn FileSystem>,
    graph_dir: PathBuf,
}

impl GraphFiles {
    pub fn new(fs: Arc<dyn FileSystem>, graph_dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            graph_dir: graph_dir.into(),
        }
    }

    pub fn layer_path(&self, layer: &LayerId) -> PathBuf {
        self.graph_dir.join(format!("{}.json", layer))
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.graph_dir.join("archives")
    }

    pub fn layer_exists(&self, layer: &LayerId) -> bool {
        self.fs.is_file(&self.layer_path(layer))
    }

    /// Persist the current state of a layer
    pub fn save_layer(&self, snapshot: &LayerSnapshot) -> Result<PathBuf> {
        let path = self.layer_path(&snapshot.layer);
        self.write_snapshot(&path, snapshot)?;
        Ok(path)
    }

    /// Read the persisted state of a layer
    pub fn load_layer(&self, layer: &LayerId) -> Result<LayerSnapshot> {
        let path = self.layer_path(layer);
        if !self.fs.is_file(&path) {
            anyhow::bail!(
                "Layer '{}' has no saved state at {}",
                layer,
                path.display()
            );
        }
        self.read_snapshot(&path)
    }

    /// Every persisted layer, sorted by name
    pub fn saved_layers(&self) -> Result<Vec<LayerId>> {
        if !self.fs.exists(&self.graph_dir) {
            return Ok(Vec::new());
        }

        let mut layers = Vec::new();
        for path in self.fs.read_dir(&self.graph_dir)? {
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(layer) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| LayerId::parse(s).ok())
            {
                layers.push(layer);
            }
        }
        layers.sort();
        Ok(layers)
    }

    /// Write an archive copy, named so archives never overwrite each other
    pub fn write_archive(&self, snapshot: &LayerSnapshot) -> Result<PathBuf> {
        let short_id: String = snapshot.snapshot_id.chars().take(8).collect();
        let file_name = format!(
            "{}-{}-{}.json",
            snapshot.layer,
            snapshot.created_at.format("%Y%m%dT%H%M%SZ"),
            short_id
        );
        let path = self.archive_dir().join(file_name);
        self.write_snapshot(&path, snapshot)?;
        Ok(path)
    }

    pub fn read_snapshot(&self, path: &Path) -> Result<LayerSnapshot> {
        let content = self.fs.read_to_string(path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse layer snapshot: {}", path.display()))
    }

    fn write_snapshot(&self, path: &Path, snapshot: &LayerSnapshot) -> Result<()> {
        let content =
            serde_json::to_string_pretty(snapshot).context("Failed to serialize layer snapshot")?;
        self.fs
            .write(path, &content)
            .with_context(|| format!("Failed to write layer snapshot: {}", path.display()))
    }
}
