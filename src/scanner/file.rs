use async_trait::async_trait;
use std::collections::HashMap;

use super::api::{ApiError, TargetApi};
use crate::source::{ExportDocument, TargetInventoryEntry, same_type};
use crate::translation::TenantContext;

/// Target API served from an export of the target tenant.
///
/// Entries marked `deleted` are listed like any other but fail point lookup
/// with [`ApiError::Gone`], the way soft-deleted resources behave live.
pub struct FileTargetApi {
    entries: Vec<TargetInventoryEntry>,
    deleted: HashMap<String, bool>,
}

impl FileTargetApi {
    pub fn from_export(document: &ExportDocument) -> Self {
        let deleted = document
            .resources
            .iter()
            .map(|r| (r.id.to_lowercase(), r.deleted))
            .collect();

        Self {
            entries: document.inventory_entries(),
            deleted,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl TargetApi for FileTargetApi {
    async fn list(
        &self,
        _context: &TenantContext,
        type_filter: Option<&str>,
    ) -> Result<Vec<TargetInventoryEntry>, ApiError> {
        Ok(self
            .entries
            .iter()
            .filter(|e| type_filter.is_none_or(|t| same_type(&e.resource_type, t)))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<TargetInventoryEntry, ApiError> {
        let key = id.to_lowercase();
        match self.deleted.get(&key) {
            None => Err(ApiError::NotFound),
            Some(true) => Err(ApiError::Gone),
            Some(false) => self
                .entries
                .iter()
                .find(|e| e.id.to_lowercase() == key)
                .cloned()
                .ok_or(ApiError::NotFound),
        }
    }
}
