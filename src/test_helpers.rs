//! Test helpers: a scripted target API and tenant fixtures

#![cfg(test)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::identity::TenantSeed;
use crate::scanner::{ApiError, TargetApi};
use crate::source::{ExportDocument, ExportedResource, TargetInventoryEntry, same_type};
use crate::translation::TenantContext;

pub const SOURCE_TENANT: &str = "00000000-0000-0000-0000-00000000000a";
pub const SOURCE_SUBSCRIPTION: &str = "11111111-1111-1111-1111-111111111111";
pub const TARGET_TENANT: &str = "00000000-0000-0000-0000-00000000000b";
pub const TARGET_SUBSCRIPTION: &str = "22222222-2222-2222-2222-222222222222";

pub fn test_seed() -> TenantSeed {
    TenantSeed::from_bytes(b"S".to_vec())
}

pub fn source_context() -> TenantContext {
    TenantContext::new(SOURCE_TENANT, SOURCE_SUBSCRIPTION)
}

pub fn target_context() -> TenantContext {
    TenantContext::new(TARGET_TENANT, TARGET_SUBSCRIPTION)
}

/// ARM id of a resource in the given subscription's `rg-app` group
pub fn arm_id(subscription: &str, provider_type: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/rg-app/providers/{}/{}",
        subscription, provider_type, name
    )
}

/// Small source export: a resource group, a network and a VM in it
pub fn sample_source_export() -> ExportDocument {
    let rg = format!("/subscriptions/{}/resourceGroups/rg-app", SOURCE_SUBSCRIPTION);
    let vnet = arm_id(SOURCE_SUBSCRIPTION, "Microsoft.Network/virtualNetworks", "vnet-hub");
    let vm = arm_id(SOURCE_SUBSCRIPTION, "Microsoft.Compute/virtualMachines", "vm-web");

    let resource = |id: &str, resource_type: &str, parent: Option<&str>| ExportedResource {
        id: id.to_string(),
        resource_type: resource_type.to_string(),
        properties: json!({ "location": "westeurope" })
            .as_object()
            .cloned()
            .unwrap_or_default(),
        parent_id: parent.map(String::from),
        child_ids: Vec::new(),
        deleted: false,
    };

    ExportDocument {
        schema_version: Some("1.0.0".to_string()),
        tenant: Some(source_context()),
        resources: vec![
            resource(&rg, "Microsoft.Resources/resourceGroups", None),
            resource(&vnet, "Microsoft.Network/virtualNetworks", Some(&rg)),
            resource(&vm, "Microsoft.Compute/virtualMachines", Some(&rg)),
        ],
    }
}

/// Target API scripted per resource id
pub struct MockTargetApi {
    listed: Vec<TargetInventoryEntry>,
    lookups: HashMap<String, Result<TargetInventoryEntry, ApiError>>,
    failures: Mutex<HashMap<String, VecDeque<ApiError>>>,
    list_error: Option<ApiError>,
    panics: HashSet<String>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTargetApi {
    pub fn new() -> Self {
        Self {
            listed: Vec::new(),
            lookups: HashMap::new(),
            failures: Mutex::new(HashMap::new()),
            list_error: None,
            panics: HashSet::new(),
            delay: None,
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Listed and found on lookup
    pub fn with_resource(self, id: &str, resource_type: &str) -> Self {
        self.with_entry(TargetInventoryEntry::new(id, resource_type))
    }

    pub fn with_entry(mut self, entry: TargetInventoryEntry) -> Self {
        self.lookups.insert(entry.id.clone(), Ok(entry.clone()));
        self.listed.push(entry);
        self
    }

    /// Listed, but every lookup fails with `error`
    pub fn with_listed_only(mut self, id: &str, resource_type: &str, error: ApiError) -> Self {
        self.listed.push(TargetInventoryEntry::new(id, resource_type));
        self.lookups.insert(id.to_string(), Err(error));
        self
    }

    /// The first lookups of `id` fail with these errors, in order
    pub fn failing_first(self, id: &str, errors: Vec<ApiError>) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(id.to_string(), errors.into());
        self
    }

    pub fn with_list_error(mut self, error: ApiError) -> Self {
        self.list_error = Some(error);
        self
    }

    /// Lookups of `id` panic
    pub fn panicking_on(mut self, id: &str) -> Self {
        self.panics.insert(id.to_string());
        self
    }

    /// Delay applied to every point lookup
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn get_calls(&self, id: &str) -> u32 {
        self.calls.lock().unwrap().get(id).copied().unwrap_or(0)
    }

    pub fn total_get_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TargetApi for MockTargetApi {
    async fn list(
        &self,
        _context: &TenantContext,
        type_filter: Option<&str>,
    ) -> Result<Vec<TargetInventoryEntry>, ApiError> {
        if let Some(err) = &self.list_error {
            return Err(err.clone());
        }
        Ok(self
            .listed
            .iter()
            .filter(|e| type_filter.is_none_or(|t| same_type(&e.resource_type, t)))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<TargetInventoryEntry, ApiError> {
        *self.calls.lock().unwrap().entry(id.to_string()).or_default() += 1;
        if self.panics.contains(id) {
            panic!("scripted lookup panic for {}", id);
        }

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self
            .failures
            .lock()
            .unwrap()
            .get_mut(id)
            .and_then(|queue| queue.pop_front());
        if let Some(err) = scripted {
            return Err(err);
        }

        self.lookups
            .get(id)
            .cloned()
            .unwrap_or(Err(ApiError::NotFound))
    }
}
