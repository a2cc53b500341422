//! Structured property diff between an expected and an observed resource.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::identity::is_redacted;
use crate::source::PropertyBag;

/// Fields the platform assigns or rewrites on its own, ignored at any depth
const SERVER_ASSIGNED: &[&str] = &[
    "etag",
    "provisioningState",
    "createdTime",
    "changedTime",
    "createdAt",
    "lastModifiedAt",
    "creationTime",
    "lastModifiedTime",
    "timeCreated",
    "systemData",
    "resourceGuid",
    "uniqueId",
    "principalId",
];

/// Identity fields that legitimately differ between tenants, ignored at the
/// top level only
const IDENTITY_FIELDS: &[&str] = &["id", "name", "type", "resourceGroup"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// Only present in the target
    Added,
    /// Only present in the source
    Removed,
    Modified,
}

impl ChangeKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            ChangeKind::Added => "+",
            ChangeKind::Removed => "-",
            ChangeKind::Modified => "~",
        }
    }
}

/// One changed field, addressed by dotted path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub path: String,
    pub change: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct DiffOptions {
    ignored: HashSet<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            ignored: SERVER_ASSIGNED.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

impl DiffOptions {
    /// Ignore additional keys (matched case-insensitively at any depth)
    pub fn with_ignored<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignored
            .extend(keys.into_iter().map(|k| k.as_ref().to_lowercase()));
        self
    }

    fn is_ignored(&self, key: &str, top_level: bool) -> bool {
        let lowered = key.to_lowercase();
        self.ignored.contains(&lowered)
            || (top_level && IDENTITY_FIELDS.iter().any(|f| f.eq_ignore_ascii_case(key)))
    }
}

fn flatten<'a>(
    prefix: &str,
    map: &'a serde_json::Map<String, Value>,
    options: &DiffOptions,
    out: &mut BTreeMap<String, &'a Value>,
) {
    for (key, value) in map {
        if options.is_ignored(key, prefix.is_empty()) {
            continue;
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(child) if !child.is_empty() => flatten(&path, child, options, out),
            _ => {
                out.insert(path, value);
            }
        }
    }
}

/// Compare two property bags. Empty when they are equal modulo ignored fields.
pub fn diff_properties(
    source: &PropertyBag,
    target: &PropertyBag,
    options: &DiffOptions,
) -> Vec<PropertyChange> {
    let mut left = BTreeMap::new();
    let mut right = BTreeMap::new();
    flatten("", source, options, &mut left);
    flatten("", target, options, &mut right);

    let mut paths: Vec<&String> = left.keys().chain(right.keys()).collect();
    paths.sort();
    paths.dedup();

    let mut changes = Vec::new();
    for path in paths {
        let change = match (left.get(path), right.get(path)) {
            (Some(s), Some(t)) => {
                if is_redacted(s) || is_redacted(t) || s == t {
                    continue;
                }
                PropertyChange {
                    path: path.clone(),
                    change: ChangeKind::Modified,
                    source: Some((*s).clone()),
                    target: Some((*t).clone()),
                }
            }
            (Some(s), None) => {
                if is_redacted(s) || s.is_null() {
                    continue;
                }
                PropertyChange {
                    path: path.clone(),
                    change: ChangeKind::Removed,
                    source: Some((*s).clone()),
                    target: None,
                }
            }
            (None, Some(t)) => {
                if is_redacted(t) || t.is_null() {
                    continue;
                }
                PropertyChange {
                    path: path.clone(),
                    change: ChangeKind::Added,
                    source: None,
                    target: Some((*t).clone()),
                }
            }
            (None, None) => continue,
        };
        changes.push(change);
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::REDACTED;
    use serde_json::json;

    fn bag(value: Value) -> PropertyBag {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_equal_modulo_server_assigned_fields() {
        let source = bag(json!({
            "location": "westeurope",
            "properties": { "sku": "Standard", "provisioningState": "Succeeded" },
            "etag": "W/\"1\""
        }));
        let target = bag(json!({
            "location": "westeurope",
            "properties": { "sku": "Standard", "provisioningState": "Updating" },
            "etag": "W/\"7\"",
            "systemData": { "createdBy": "someone" }
        }));

        assert!(diff_properties(&source, &target, &DiffOptions::default()).is_empty());
    }

    #[test]
    fn test_reports_nested_modified_added_removed() {
        let source = bag(json!({
            "properties": { "sku": "Standard", "minTls": "1.2" },
            "tags": { "env": "prod" }
        }));
        let target = bag(json!({
            "properties": { "sku": "Premium" },
            "tags": { "env": "prod", "owner": "ops" }
        }));

        let changes = diff_properties(&source, &target, &DiffOptions::default());

        let summary: Vec<(&str, ChangeKind)> =
            changes.iter().map(|c| (c.path.as_str(), c.change)).collect();
        assert_eq!(
            summary,
            vec![
                ("properties.minTls", ChangeKind::Removed),
                ("properties.sku", ChangeKind::Modified),
                ("tags.owner", ChangeKind::Added),
            ]
        );
        assert_eq!(changes[1].target, Some(json!("Premium")));
    }

    #[test]
    fn test_identity_fields_ignored_only_at_top_level() {
        let source = bag(json!({ "name": "stapp", "properties": { "name": "a" } }));
        let target = bag(json!({ "name": "stapp1a2b3c", "properties": { "name": "b" } }));

        let changes = diff_properties(&source, &target, &DiffOptions::default());

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path, "properties.name");
    }

    #[test]
    fn test_redacted_values_are_not_compared() {
        let source = bag(json!({ "properties": { "adminPassword": REDACTED } }));
        let target = bag(json!({ "properties": { "adminPassword": "hunter2" } }));

        assert!(diff_properties(&source, &target, &DiffOptions::default()).is_empty());
    }

    #[test]
    fn test_extra_ignored_keys() {
        let source = bag(json!({ "tags": { "lastDeployed": "monday" } }));
        let target = bag(json!({ "tags": { "lastDeployed": "friday" } }));
        let options = DiffOptions::default().with_ignored(["lastDeployed"]);

        assert!(diff_properties(&source, &target, &options).is_empty());
    }
}
