//! Resource type to abstracted-id prefix mapping.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Longest prefix derived for a type without a table entry
pub const MAX_DERIVED_PREFIX_LEN: usize = 12;

fn build_prefix_map() -> HashMap<&'static str, &'static str> {
    let mut m = HashMap::new();

    // Containers
    m.insert("microsoft.resources/subscriptions", "sub");
    m.insert("microsoft.resources/resourcegroups", "rg");
    m.insert("microsoft.management/managementgroups", "mg");

    // Networking
    m.insert("microsoft.network/virtualnetworks", "vnet");
    m.insert("microsoft.network/virtualnetworks/subnets", "snet");
    m.insert("microsoft.network/networksecuritygroups", "nsg");
    m.insert("microsoft.network/networkinterfaces", "nic");
    m.insert("microsoft.network/publicipaddresses", "pip");
    m.insert("microsoft.network/loadbalancers", "lb");
    m.insert("microsoft.network/applicationgateways", "agw");
    m.insert("microsoft.network/routetables", "rt");
    m.insert("microsoft.network/privateendpoints", "pe");
    m.insert("microsoft.network/privatednszones", "pdns");
    m.insert("microsoft.network/dnszones", "dns");
    m.insert("microsoft.network/bastionhosts", "bas");
    m.insert("microsoft.network/azurefirewalls", "afw");

    // Identity
    m.insert("microsoft.managedidentity/userassignedidentities", "id");
    m.insert("microsoft.authorization/roleassignments", "ra");
    m.insert("microsoft.authorization/roledefinitions", "rd");

    // Shared services
    m.insert("microsoft.keyvault/vaults", "kv");
    m.insert("microsoft.storage/storageaccounts", "st");
    m.insert("microsoft.containerregistry/registries", "cr");
    m.insert("microsoft.operationalinsights/workspaces", "log");
    m.insert("microsoft.insights/components", "appi");
    m.insert("microsoft.web/serverfarms", "asp");

    // Compute and platform
    m.insert("microsoft.compute/virtualmachines", "vm");
    m.insert("microsoft.compute/virtualmachinescalesets", "vmss");
    m.insert("microsoft.compute/disks", "disk");
    m.insert("microsoft.containerservice/managedclusters", "aks");
    m.insert("microsoft.web/sites", "app");
    m.insert("microsoft.sql/servers", "sql");
    m.insert("microsoft.sql/servers/databases", "sqldb");
    m.insert("microsoft.documentdb/databaseaccounts", "cosmos");
    m.insert("microsoft.cache/redis", "redis");
    m.insert("microsoft.servicebus/namespaces", "sb");
    m.insert("microsoft.eventhub/namespaces", "evh");

    m
}

lazy_static! {
    static ref TYPE_PREFIXES: HashMap<&'static str, &'static str> = build_prefix_map();
}

/// Prefix used for abstracted ids of the given resource type.
///
/// Known types map through the table. A bare tag without `/` (such as `vm`)
/// is its own prefix. Anything else derives a prefix from its last type
/// segment.
pub fn type_prefix(resource_type: &str) -> String {
    let lowered = resource_type.to_ascii_lowercase();

    if let Some(prefix) = TYPE_PREFIXES.get(lowered.as_str()) {
        return (*prefix).to_string();
    }

    let segment = lowered.rsplit('/').next().unwrap_or(&lowered);
    let derived: String = segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_DERIVED_PREFIX_LEN)
        .collect();

    if derived.is_empty() {
        "res".to_string()
    } else {
        derived
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_types_use_table() {
        assert_eq!(type_prefix("Microsoft.Compute/virtualMachines"), "vm");
        assert_eq!(type_prefix("microsoft.keyvault/VAULTS"), "kv");
        assert_eq!(type_prefix("Microsoft.Resources/resourceGroups"), "rg");
    }

    #[test]
    fn test_bare_tag_is_its_own_prefix() {
        assert_eq!(type_prefix("vm"), "vm");
    }

    #[test]
    fn test_unknown_type_derives_from_last_segment() {
        assert_eq!(type_prefix("Microsoft.Foo/barBazQuuxCorge"), "barbazquuxco");
        assert_eq!(type_prefix("Contoso.Widgets/gadget-items"), "gadgetitems");
        assert_eq!(type_prefix("---"), "res");
    }
}
