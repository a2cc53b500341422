use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form property bag as returned by the cloud API
pub type PropertyBag = serde_json::Map<String, Value>;

/// A resource as discovered in the source tenant, with its real identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalResource {
    /// Real identifier, unique within the source tenant
    pub id: String,
    /// Resource type tag (e.g. `Microsoft.Network/virtualNetworks`)
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Raw properties
    #[serde(default)]
    pub properties: PropertyBag,
    /// Containing resource, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Contained resources
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub child_ids: Vec<String>,
}

impl OriginalResource {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            properties: PropertyBag::new(),
            parent_id: None,
            child_ids: Vec::new(),
        }
    }

    /// Add a property
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Set the parent reference
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Add a child reference
    pub fn with_child(mut self, child_id: impl Into<String>) -> Self {
        self.child_ids.push(child_id.into());
        self
    }

    /// Resource name: the last segment of the identifier
    pub fn name(&self) -> &str {
        resource_name(&self.id)
    }
}

/// The anonymized counterpart of an [`OriginalResource`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbstractedResource {
    /// Derived identifier, `<type-prefix>-<hash8>`
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Properties with sensitive values redacted
    #[serde(default)]
    pub properties: PropertyBag,
    /// Abstracted id of the parent, when the parent is in the same graph
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl AbstractedResource {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            properties: PropertyBag::new(),
            parent_id: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// The `name` property, when discovery recorded one
    pub fn name_hint(&self) -> Option<&str> {
        self.properties.get("name").and_then(Value::as_str)
    }

    /// The `resourceGroup` property, when discovery recorded one
    pub fn resource_group_hint(&self) -> Option<&str> {
        self.properties.get("resourceGroup").and_then(Value::as_str)
    }
}

/// A resource seen in the target tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetInventoryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub properties: PropertyBag,
}

impl TargetInventoryEntry {
    pub fn new(id: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            resource_type: resource_type.into(),
            properties: PropertyBag::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        resource_name(&self.id)
    }

    /// Resource group segment of an ARM id, if present
    pub fn resource_group(&self) -> Option<&str> {
        resource_group(&self.id)
    }
}

/// Last non-empty `/`-separated segment of an identifier
pub fn resource_name(id: &str) -> &str {
    id.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(id)
}

/// Value following the `resourceGroups` segment of an ARM id
pub fn resource_group(id: &str) -> Option<&str> {
    let mut segments = id.split('/');
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("resourcegroups") {
            return segments.next().filter(|s| !s.is_empty());
        }
    }
    None
}

/// Case-insensitive resource type comparison, as ARM treats types
pub fn same_type(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}
