use lazy_static::lazy_static;
use std::collections::HashMap;

/// Rank given to resource types missing from the table
pub const MAX_TIER: u8 = 3;

fn build_tier_map() -> HashMap<&'static str, u8> {
    let mut m = HashMap::new();

    // Containers and grouping
    m.insert("microsoft.resources/resourcegroups", 0);
    m.insert("microsoft.management/managementgroups", 0);
    m.insert("microsoft.resources/subscriptions", 0);

    // Networking and identity primitives
    m.insert("microsoft.network/virtualnetworks", 1);
    m.insert("microsoft.network/networksecuritygroups", 1);
    m.insert("microsoft.network/routetables", 1);
    m.insert("microsoft.network/publicipaddresses", 1);
    m.insert("microsoft.network/privatednszones", 1);
    m.insert("microsoft.network/dnszones", 1);
    m.insert("microsoft.managedidentity/userassignedidentities", 1);
    m.insert("microsoft.authorization/roledefinitions", 1);

    // Shared infrastructure services. Subnets sit one rank above the
    // network they belong to.
    m.insert("microsoft.network/virtualnetworks/subnets", 2);
    m.insert("microsoft.keyvault/vaults", 2);
    m.insert("microsoft.storage/storageaccounts", 2);
    m.insert("microsoft.operationalinsights/workspaces", 2);
    m.insert("microsoft.insights/components", 2);
    m.insert("microsoft.containerregistry/registries", 2);
    m.insert("microsoft.servicebus/namespaces", 2);
    m.insert("microsoft.eventhub/namespaces", 2);
    m.insert("microsoft.web/serverfarms", 2);
    m.insert("microsoft.sql/servers", 2);

    // Compute and platform, plus network resources attached to subnets
    m.insert("microsoft.network/networkinterfaces", 3);
    m.insert("microsoft.network/privateendpoints", 3);
    m.insert("microsoft.network/loadbalancers", 3);
    m.insert("microsoft.network/applicationgateways", 3);
    m.insert("microsoft.network/azurefirewalls", 3);
    m.insert("microsoft.compute/virtualmachines", 3);
    m.insert("microsoft.compute/virtualmachinescalesets", 3);
    m.insert("microsoft.containerservice/managedclusters", 3);
    m.insert("microsoft.web/sites", 3);
    m.insert("microsoft.sql/servers/databases", 3);
    m.insert("microsoft.documentdb/databaseaccounts", 3);
    m.insert("microsoft.cache/redis", 3);
    m.insert("microsoft.authorization/roleassignments", 3);

    m
}

lazy_static! {
    static ref TIERS: HashMap<&'static str, u8> = build_tier_map();
}

/// Emission rank of a resource type. Unknown types get [`MAX_TIER`].
pub fn assign_tier(resource_type: &str) -> u8 {
    TIERS
        .get(resource_type.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(MAX_TIER)
}
