//! Resource export documents
//!
//! Discovery output for the source tenant and offline snapshots of the target
//! tenant share one document format, read from JSON or YAML:
//!
//! ```yaml
//! schema_version: "1.0.0"
//! tenant:
//!   tenant_id: 00000000-0000-0000-0000-000000000001
//!   subscription_id: 11111111-1111-1111-1111-111111111111
//! resources:
//!   - id: /subscriptions/1111.../resourceGroups/rg-app
//!     type: Microsoft.Resources/resourceGroups
//!     properties: { location: westeurope }
//!     child_ids: [...]
//!   - id: ...
//!     deleted: true   # target snapshots only: soft-deleted entry
//! ```

use anyhow::{Context, Result};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::resource::{OriginalResource, PropertyBag, TargetInventoryEntry};
use crate::traits::FileSystem;
use crate::translation::TenantContext;

/// Schema versions this build was written against
pub const SUPPORTED_SCHEMA_VERSIONS: &[&str] = &["1.0.0", "1.1.0"];

/// Minimum schema version that carries parent/child references
pub const MINIMUM_SCHEMA_VERSION: (u64, u64, u64) = (1, 0, 0);

/// Root of an export document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    #[serde(default)]
    pub schema_version: Option<String>,
    /// Tenant the export was taken from
    #[serde(default)]
    pub tenant: Option<TenantContext>,
    pub resources: Vec<ExportedResource>,
}

/// One resource in an export document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedResource {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub properties: PropertyBag,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub child_ids: Vec<String>,
    /// Listed by the API but soft-deleted
    #[serde(default)]
    pub deleted: bool,
}

/// Result of schema version validation
#[derive(Debug, PartialEq, Eq)]
pub enum SchemaVersionStatus {
    Valid,
    /// Missing version: read anyway, with a warning
    Missing,
    /// Newer than this build knows: read anyway, with a warning
    Newer(String),
    TooOld(String),
    Invalid(String),
}

impl SchemaVersionStatus {
    /// Whether the document can be read
    pub fn is_readable(&self) -> bool {
        matches!(
            self,
            SchemaVersionStatus::Valid | SchemaVersionStatus::Missing | SchemaVersionStatus::Newer(_)
        )
    }
}

/// Parse `1`, `1.0` or `1.0.0` into a full semantic version
fn parse_schema_version(version: &str) -> Option<Version> {
    let parts = version.split('.').count();
    let padded = match parts {
        1 => format!("{}.0.0", version),
        2 => format!("{}.0", version),
        _ => version.to_string(),
    };
    Version::parse(&padded).ok()
}

/// Validate the schema version of an export document
pub fn validate_schema_version(version: Option<&str>) -> SchemaVersionStatus {
    let version = match version.map(str::trim) {
        None | Some("") => return SchemaVersionStatus::Missing,
        Some(v) => v,
    };

    let parsed = match parse_schema_version(version) {
        None => return SchemaVersionStatus::Invalid(version.to_string()),
        Some(v) => v,
    };

    let (major, minor, patch) = MINIMUM_SCHEMA_VERSION;
    if parsed < Version::new(major, minor, patch) {
        return SchemaVersionStatus::TooOld(version.to_string());
    }

    let known = SUPPORTED_SCHEMA_VERSIONS
        .iter()
        .filter_map(|v| Version::parse(v).ok())
        .any(|v| v == parsed);

    if known {
        SchemaVersionStatus::Valid
    } else {
        SchemaVersionStatus::Newer(version.to_string())
    }
}

impl ExportDocument {
    /// Load an export from JSON or YAML, picked by file extension
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let content = fs.read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let document: ExportDocument = if is_yaml {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML export: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON export: {}", path.display()))?
        };

        let status = validate_schema_version(document.schema_version.as_deref());
        match &status {
            SchemaVersionStatus::Valid => {}
            SchemaVersionStatus::Missing => {
                tracing::warn!(path = %path.display(), "export has no schema_version, assuming 1.0.0");
            }
            SchemaVersionStatus::Newer(v) => {
                tracing::warn!(path = %path.display(), version = %v, "export schema is newer than supported");
            }
            SchemaVersionStatus::TooOld(v) => {
                anyhow::bail!("Export schema version {} is older than the minimum 1.0.0", v)
            }
            SchemaVersionStatus::Invalid(v) => {
                anyhow::bail!("Export schema version '{}' is not a valid version", v)
            }
        }

        Ok(document)
    }

    /// Source-side view: every non-deleted entry as an original resource
    pub fn original_resources(&self) -> Vec<OriginalResource> {
        self.resources
            .iter()
            .filter(|r| !r.deleted)
            .map(|r| OriginalResource {
                id: r.id.clone(),
                resource_type: r.resource_type.clone(),
                properties: r.properties.clone(),
                parent_id: r.parent_id.clone(),
                child_ids: r.child_ids.clone(),
            })
            .collect()
    }

    /// Target-side view: every entry, deleted ones included, as the list API would return it
    pub fn inventory_entries(&self) -> Vec<TargetInventoryEntry> {
        self.resources
            .iter()
            .map(|r| TargetInventoryEntry {
                id: r.id.clone(),
                resource_type: r.resource_type.clone(),
                properties: r.properties.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockFileSystem;

    #[test]
    fn test_validate_schema_version() {
        assert_eq!(validate_schema_version(Some("1.0.0")), SchemaVersionStatus::Valid);
        assert_eq!(validate_schema_version(Some("1.0")), SchemaVersionStatus::Valid);
        assert_eq!(validate_schema_version(Some("1")), SchemaVersionStatus::Valid);
        assert_eq!(validate_schema_version(None), SchemaVersionStatus::Missing);
        assert_eq!(validate_schema_version(Some("  ")), SchemaVersionStatus::Missing);
        assert_eq!(
            validate_schema_version(Some("2.3.0")),
            SchemaVersionStatus::Newer("2.3.0".to_string())
        );
        assert_eq!(
            validate_schema_version(Some("0.9.0")),
            SchemaVersionStatus::TooOld("0.9.0".to_string())
        );
        assert_eq!(
            validate_schema_version(Some("abc")),
            SchemaVersionStatus::Invalid("abc".to_string())
        );
    }

    #[test]
    fn test_load_yaml_export() {
        let fs = MockFileSystem::new();
        let path = Path::new("/exports/source.yaml");
        fs.write(
            path,
            r#"
schema_version: "1.0.0"
tenant:
  tenant_id: t-1
  subscription_id: s-1
resources:
  - id: /subscriptions/s-1/resourceGroups/rg-app
    type: Microsoft.Resources/resourceGroups
    properties:
      location: westeurope
  - id: /subscriptions/s-1/resourceGroups/rg-app/providers/Microsoft.Compute/virtualMachines/vm1
    type: Microsoft.Compute/virtualMachines
    parent_id: /subscriptions/s-1/resourceGroups/rg-app
    deleted: true
"#,
        )
        .unwrap();

        let doc = ExportDocument::load(&fs, path).unwrap();

        assert_eq!(doc.tenant.as_ref().unwrap().subscription_id, "s-1");
        assert_eq!(doc.resources.len(), 2);
        assert_eq!(doc.original_resources().len(), 1);
        assert_eq!(doc.inventory_entries().len(), 2);
    }

    #[test]
    fn test_load_rejects_old_schema() {
        let fs = MockFileSystem::new();
        let path = Path::new("/exports/old.json");
        fs.write(path, r#"{"schema_version": "0.1", "resources": []}"#)
            .unwrap();

        let err = ExportDocument::load(&fs, path).unwrap_err();

        assert!(err.to_string().contains("older than the minimum"));
    }
}
