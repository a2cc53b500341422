//! Error taxonomy for the reconciliation pipeline.
//!
//! Severity differs per type: `AbstractionError` aborts the run,
//! `TranslationError` only drops the resource it was raised for,
//! `LineageError::NotFound` is recovered by the comparator, and scan
//! validation failures never surface as errors at all (the candidate is
//! excluded instead).

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::scanner::ApiError;

/// Identity abstraction failures. Fatal to the run.
#[derive(Debug, Error)]
pub enum AbstractionError {
    #[error(
        "hash space exhausted for '{original_id}' (type prefix '{prefix}') after {attempts} salted attempts"
    )]
    HashSpaceExhausted {
        original_id: String,
        prefix: String,
        attempts: u32,
    },

    #[error("abstracted id '{abstracted_id}' is already issued to '{existing}', cannot register '{original_id}'")]
    ConflictingRegistration {
        abstracted_id: String,
        existing: String,
        original_id: String,
    },

    #[error("invalid HMAC key material: {0}")]
    InvalidKey(String),
}

/// Name translation failures. Fatal for the affected resource only.
#[derive(Debug, Error)]
pub enum TranslationError {
    #[error("name '{name}' for {resource_type} still collides after {attempts} disambiguation attempts")]
    UnresolvedCollision {
        resource_type: String,
        name: String,
        attempts: usize,
    },

    #[error("name '{name}' for {resource_type} has no characters allowed by its naming rule")]
    EmptyName { resource_type: String, name: String },

    #[error(transparent)]
    Hashing(#[from] AbstractionError),

    #[error("invalid rewrite pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Lineage store failures
#[derive(Debug, Error)]
pub enum LineageError {
    /// No lineage edge for the abstracted id. Callers recover from this.
    #[error("no lineage edge for '{abstracted_id}' in layer '{layer}'")]
    NotFound { layer: String, abstracted_id: String },

    #[error("abstracted id '{abstracted_id}' already links to '{existing}', refusing to link it to '{original_id}'")]
    AbstractedConflict {
        abstracted_id: String,
        existing: String,
        original_id: String,
    },

    #[error("original '{original_id}' already has abstracted node '{existing}', refusing to add '{abstracted_id}'")]
    OriginalConflict {
        original_id: String,
        existing: String,
        abstracted_id: String,
    },

    #[error("cannot link '{abstracted_id}' to '{original_id}': both nodes must exist in the layer")]
    DanglingEdge {
        abstracted_id: String,
        original_id: String,
    },

    #[error("layer '{0}' does not exist")]
    UnknownLayer(String),

    #[error("layer '{0}' already exists")]
    LayerExists(String),

    #[error("invalid layer name '{0}': use letters, digits, '-' or '_'")]
    InvalidLayerName(String),

    #[error("snapshot {snapshot_id} failed verification: {reason}")]
    CorruptSnapshot { snapshot_id: String, reason: String },

    #[error("snapshot storage failed: {0}")]
    Storage(String),
}

/// Failures while building the dual graph from discovered resources
#[derive(Debug, Error)]
pub enum GraphBuildError {
    #[error(transparent)]
    Abstraction(#[from] AbstractionError),

    #[error(transparent)]
    Lineage(#[from] LineageError),
}

/// Tenant seed storage failures. Systemic: the run cannot proceed.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("no seed stored for tenant '{tenant_id}' (expected at {path:?}); run `tmirror seed init` first")]
    Missing { tenant_id: String, path: PathBuf },

    #[error("seed file {path:?} is malformed: {reason}")]
    Malformed { path: PathBuf, reason: String },

    #[error("invalid tenant id '{0}' for seed storage")]
    InvalidTenantId(String),

    #[error("seed storage failed: {0}")]
    Storage(String),
}

/// Target scan failures. Only systemic problems reach the caller.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("target enumeration failed: {0}")]
    Enumeration(#[source] ApiError),

    #[error("target scan timed out after {0:?}")]
    TimedOut(Duration),

    #[error("target scan was cancelled")]
    Cancelled,

    #[error("target API unreachable: {unverified} of {checked} candidate lookups failed")]
    ValidationUnavailable { unverified: usize, checked: usize },
}
