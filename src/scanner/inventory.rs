use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::source::{TargetInventoryEntry, same_type};
use crate::traits::FileSystem;
use crate::translation::TenantContext;

/// Target resources confirmed to exist, keyed case-insensitively by id.
///
/// Lives for one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidatedInventory {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<TenantContext>,
    /// Whether entries were existence-checked or trusted from the list call
    #[serde(default = "default_validated")]
    pub validated: bool,
    entries: BTreeMap<String, TargetInventoryEntry>,
}

fn default_validated() -> bool {
    true
}

impl ValidatedInventory {
    pub fn new() -> Self {
        Self {
            context: None,
            validated: true,
            entries: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, context: TenantContext) -> Self {
        self.context = Some(context);
        self
    }

    pub fn insert(&mut self, entry: TargetInventoryEntry) {
        self.entries.insert(entry.id.to_lowercase(), entry);
    }

    pub fn get(&self, id: &str) -> Option<&TargetInventoryEntry> {
        self.entries.get(&id.to_lowercase())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(&id.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by id
    pub fn entries(&self) -> impl Iterator<Item = &TargetInventoryEntry> {
        self.entries.values()
    }

    /// Entries of one resource type, sorted by id
    pub fn of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a TargetInventoryEntry> + 'a {
        self.entries
            .values()
            .filter(move |e| same_type(&e.resource_type, resource_type))
    }

    pub fn save(&self, fs: &dyn FileSystem, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize target inventory")?;
        fs.write(path, &content)
            .with_context(|| format!("Failed to write target inventory: {}", path.display()))
    }

    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let content = fs.read_to_string(path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse target inventory: {}", path.display()))
    }
}

impl FromIterator<TargetInventoryEntry> for ValidatedInventory {
    fn from_iter<I: IntoIterator<Item = TargetInventoryEntry>>(iter: I) -> Self {
        let mut inventory = ValidatedInventory::new();
        for entry in iter {
            inventory.insert(entry);
        }
        inventory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockFileSystem;

    #[test]
    fn test_lookup_ignores_case() {
        let inventory: ValidatedInventory = vec![TargetInventoryEntry::new(
            "/subscriptions/S/resourceGroups/RG",
            "Microsoft.Resources/resourceGroups",
        )]
        .into_iter()
        .collect();

        assert!(inventory.contains("/subscriptions/s/resourcegroups/rg"));
        assert_eq!(inventory.of_type("microsoft.resources/resourcegroups").count(), 1);
        assert_eq!(inventory.of_type("Microsoft.Compute/virtualMachines").count(), 0);
    }

    #[test]
    fn test_save_and_load() {
        let fs = MockFileSystem::new();
        let path = Path::new("/out/inventory.json");
        let mut inventory = ValidatedInventory::new().with_context(TenantContext::new("t", "s"));
        inventory.insert(TargetInventoryEntry::new("/a", "x/y"));

        inventory.save(&fs, path).unwrap();
        let loaded = ValidatedInventory::load(&fs, path).unwrap();

        assert_eq!(loaded, inventory);
    }
}
