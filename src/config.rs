use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::compare::{DEFAULT_SUSPICION_THRESHOLD, DiffOptions};
use crate::scanner::{RetryPolicy, ScanOptions};
use crate::traits::FileSystem;
use crate::translation::TenantContext;

pub const CONFIG_FILE: &str = "tenant-mirror.yaml";

/// Project configuration read from `tenant-mirror.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Tenant the resources are discovered in
    #[serde(default)]
    pub source: TenantContext,

    /// Tenant the resources are mirrored into
    #[serde(default)]
    pub target: TenantContext,

    /// Directory holding per-tenant seeds. Defaults to the user data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed_dir: Option<PathBuf>,

    /// Directory holding layer snapshots
    #[serde(default = "default_graph_dir")]
    pub graph_dir: PathBuf,

    #[serde(default)]
    pub scan: ScanConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Directory the relative paths above are resolved against
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_true")]
    pub validate_existence: bool,

    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Overall scan timeout; none when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Timeout of a single HTTP request against the target API
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Share of looked-up candidates allowed to stay unverified before the scan fails
    #[serde(default = "default_max_unverified_fraction")]
    pub max_unverified_fraction: f64,

    /// Point lookup API versions keyed by resource type or provider namespace
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub api_versions: BTreeMap<String, String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            validate_existence: true,
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            timeout_secs: None,
            request_timeout_secs: default_request_timeout_secs(),
            max_unverified_fraction: default_max_unverified_fraction(),
            api_versions: BTreeMap::new(),
        }
    }
}

impl ScanConfig {
    pub fn scan_options(&self) -> ScanOptions {
        ScanOptions {
            validate_existence: self.validate_existence,
            concurrency: self.concurrency.max(1),
            retry: RetryPolicy {
                max_retries: self.max_retries,
                initial_backoff: Duration::from_millis(self.initial_backoff_ms),
                ..RetryPolicy::default()
            },
            timeout: self.timeout_secs.map(Duration::from_secs),
            max_unverified_fraction: self.max_unverified_fraction.clamp(0.0, 1.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// NEW fraction above which the run is flagged as suspicious
    #[serde(default = "default_suspicion_threshold")]
    pub suspicion_threshold: f64,

    /// Extra property keys left out of the diff
    #[serde(default)]
    pub ignored_properties: Vec<String>,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            suspicion_threshold: default_suspicion_threshold(),
            ignored_properties: Vec::new(),
        }
    }
}

impl ReconcileConfig {
    pub fn diff_options(&self) -> DiffOptions {
        DiffOptions::default().with_ignored(&self.ignored_properties)
    }
}

fn default_true() -> bool {
    true
}

fn default_concurrency() -> usize {
    crate::scanner::scanner::DEFAULT_CONCURRENCY
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    250
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_unverified_fraction() -> f64 {
    crate::scanner::scanner::DEFAULT_MAX_UNVERIFIED_FRACTION
}

fn default_suspicion_threshold() -> f64 {
    DEFAULT_SUSPICION_THRESHOLD
}

fn default_graph_dir() -> PathBuf {
    PathBuf::from(".tenant-mirror").join("graph")
}

impl AppConfig {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Otherwise `tenant-mirror.yaml` is looked
    /// up from the current directory upwards, and defaults apply when none
    /// is found.
    pub fn load(fs: &dyn FileSystem, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(fs, path);
        }

        let current_dir = std::env::current_dir().context("Failed to read current directory")?;
        match Self::find_in_path(fs, &current_dir) {
            Some(path) => Self::from_file(fs, &path),
            None => {
                tracing::debug!("no {} found, using defaults", CONFIG_FILE);
                Ok(Self {
                    root: current_dir,
                    ..Self::default()
                })
            }
        }
    }

    /// Closest `tenant-mirror.yaml` at or above `start`
    pub fn find_in_path(fs: &dyn FileSystem, start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILE);
            if fs.is_file(&candidate) {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    pub fn from_file(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let content = fs.read_to_string(path)?;
        let mut config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    /// Seed directory: configured, else the user data directory, else a
    /// project-local fallback
    pub fn seed_dir(&self) -> PathBuf {
        match &self.seed_dir {
            Some(dir) => self.resolve(dir),
            None => dirs::data_dir()
                .map(|d| d.join("tenant-mirror").join("seeds"))
                .unwrap_or_else(|| self.resolve(&PathBuf::from(".tenant-mirror").join("seeds"))),
        }
    }

    pub fn graph_dir(&self) -> PathBuf {
        if self.graph_dir.as_os_str().is_empty() {
            self.resolve(&default_graph_dir())
        } else {
            self.resolve(&self.graph_dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockFileSystem;

    #[test]
    fn test_defaults_apply_to_missing_fields() {
        let fs = MockFileSystem::new();
        fs.write(
            Path::new("/work/tenant-mirror.yaml"),
            "source:\n  tenant_id: t-src\n  subscription_id: s-src\n",
        )
        .unwrap();

        let config = AppConfig::from_file(&fs, Path::new("/work/tenant-mirror.yaml")).unwrap();

        assert_eq!(config.source.subscription_id, "s-src");
        assert!(config.target.is_empty());
        assert!(config.scan.validate_existence);
        assert_eq!(config.scan.concurrency, 20);
        assert_eq!(config.scan.max_unverified_fraction, 0.5);
        assert!(config.scan.api_versions.is_empty());
        assert_eq!(config.reconcile.suspicion_threshold, 0.5);
        assert_eq!(config.graph_dir(), PathBuf::from("/work/.tenant-mirror/graph"));
    }

    #[test]
    fn test_scan_and_reconcile_sections() {
        let fs = MockFileSystem::new();
        fs.write(
            Path::new("/work/tenant-mirror.yaml"),
            r#"
seed_dir: seeds
graph_dir: /var/lib/graph
scan:
  validate_existence: false
  concurrency: 4
  max_retries: 1
  initial_backoff_ms: 10
  timeout_secs: 60
  max_unverified_fraction: 0.2
  api_versions:
    Microsoft.Storage/storageAccounts: "2023-01-01"
reconcile:
  suspicion_threshold: 0.8
  ignored_properties: [lastDeployed]
"#,
        )
        .unwrap();

        let config = AppConfig::from_file(&fs, Path::new("/work/tenant-mirror.yaml")).unwrap();
        let options = config.scan.scan_options();

        assert_eq!(config.seed_dir(), PathBuf::from("/work/seeds"));
        assert_eq!(config.graph_dir(), PathBuf::from("/var/lib/graph"));
        assert!(!options.validate_existence);
        assert_eq!(options.concurrency, 4);
        assert_eq!(options.retry.max_retries, 1);
        assert_eq!(options.retry.initial_backoff, Duration::from_millis(10));
        assert_eq!(options.timeout, Some(Duration::from_secs(60)));
        assert_eq!(options.max_unverified_fraction, 0.2);
        assert_eq!(
            config.scan.api_versions.get("Microsoft.Storage/storageAccounts").map(String::as_str),
            Some("2023-01-01")
        );
        assert_eq!(config.reconcile.ignored_properties, vec!["lastDeployed"]);
    }

    #[test]
    fn test_finds_config_in_parent_directory() {
        let fs = MockFileSystem::new();
        fs.write(Path::new("/work/tenant-mirror.yaml"), "{}").unwrap();

        let found = AppConfig::find_in_path(&fs, Path::new("/work/sub/dir"));

        assert_eq!(found, Some(PathBuf::from("/work/tenant-mirror.yaml")));
    }

    #[test]
    fn test_invalid_yaml_is_reported() {
        let fs = MockFileSystem::new();
        fs.write(Path::new("/work/tenant-mirror.yaml"), "scan: [not, a, map]").unwrap();

        let err = AppConfig::from_file(&fs, Path::new("/work/tenant-mirror.yaml")).unwrap_err();

        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
