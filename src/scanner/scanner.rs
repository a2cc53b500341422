use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::api::{ApiError, TargetApi};
use super::inventory::ValidatedInventory;
use super::retry::RetryPolicy;
use crate::error::ScanError;
use crate::source::TargetInventoryEntry;
use crate::translation::TenantContext;

pub const DEFAULT_CONCURRENCY: usize = 20;

/// Share of checked candidates that may fail for reasons other than absence
/// before the scan is treated as a target outage
pub const DEFAULT_MAX_UNVERIFIED_FRACTION: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Point-lookup every listed candidate before trusting it
    pub validate_existence: bool,
    /// Lookups in flight at once
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Upper bound for the whole scan
    pub timeout: Option<Duration>,
    /// Above this share of unconfirmed candidates the scan fails
    pub max_unverified_fraction: f64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            validate_existence: true,
            concurrency: DEFAULT_CONCURRENCY,
            retry: RetryPolicy::default(),
            timeout: None,
            max_unverified_fraction: DEFAULT_MAX_UNVERIFIED_FRACTION,
        }
    }
}

/// A candidate dropped because its lookup failed for a reason other than
/// absence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludedCandidate {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub listed: usize,
    pub included: usize,
    /// Listed but confirmed absent (stale or soft-deleted)
    pub absent: Vec<String>,
    /// Listed but could not be confirmed
    pub unverified: Vec<ExcludedCandidate>,
    pub validation_skipped: bool,
}

#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub inventory: ValidatedInventory,
    pub report: ScanReport,
}

/// Enumerates the target and existence-validates every candidate.
///
/// A candidate whose lookup fails is excluded. The scan itself fails on a
/// failed enumeration, a timeout, a cancellation, or when so many lookups
/// fail that the target API is effectively unreachable.
pub struct TargetScanner {
    api: Arc<dyn TargetApi>,
    options: ScanOptions,
}

impl TargetScanner {
    pub fn new(api: Arc<dyn TargetApi>, options: ScanOptions) -> Self {
        Self { api, options }
    }

    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    pub async fn scan(
        &self,
        context: &TenantContext,
        type_filter: Option<&str>,
    ) -> Result<ScanOutcome, ScanError> {
        match self.options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.scan_inner(context, type_filter))
                .await
                .map_err(|_| ScanError::TimedOut(limit))?,
            None => self.scan_inner(context, type_filter).await,
        }
    }

    /// Scan until done or until `cancel` resolves. In-flight lookups are
    /// aborted on cancellation.
    pub async fn scan_until<C>(
        &self,
        context: &TenantContext,
        type_filter: Option<&str>,
        cancel: C,
    ) -> Result<ScanOutcome, ScanError>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            outcome = self.scan(context, type_filter) => outcome,
            _ = cancel => {
                tracing::warn!("target scan cancelled");
                Err(ScanError::Cancelled)
            }
        }
    }

    async fn scan_inner(
        &self,
        context: &TenantContext,
        type_filter: Option<&str>,
    ) -> Result<ScanOutcome, ScanError> {
        let api = &self.api;
        let candidates = self
            .options
            .retry
            .run("list", move || api.list(context, type_filter))
            .await
            .map_err(ScanError::Enumeration)?;

        let mut report = ScanReport {
            listed: candidates.len(),
            ..ScanReport::default()
        };
        let mut inventory = ValidatedInventory::new().with_context(context.clone());

        if !self.options.validate_existence {
            tracing::info!(listed = candidates.len(), "existence validation disabled, trusting list");
            report.validation_skipped = true;
            inventory.validated = false;
            for entry in candidates {
                inventory.insert(entry);
            }
            report.included = inventory.len();
            return Ok(ScanOutcome { inventory, report });
        }

        for (id, result) in self.validate(candidates).await {
            match result {
                Ok(entry) => inventory.insert(entry),
                Err(err) if err.is_not_found() => {
                    tracing::debug!(resource_id = %id, error = %err, "listed resource does not exist, excluded");
                    report.absent.push(id);
                }
                Err(err) => {
                    tracing::warn!(resource_id = %id, error = %err, "could not confirm target resource, excluded");
                    report.unverified.push(ExcludedCandidate {
                        id,
                        reason: err.to_string(),
                    });
                }
            }
        }

        report.absent.sort();
        report.unverified.sort_by(|a, b| a.id.cmp(&b.id));
        report.included = inventory.len();

        let checked = report.listed - report.absent.len();
        if checked > 0 {
            let unverified = report.unverified.len();
            let fraction = unverified as f64 / checked as f64;
            if fraction > self.options.max_unverified_fraction {
                tracing::warn!(
                    unverified,
                    checked,
                    threshold = self.options.max_unverified_fraction,
                    "too many unconfirmed candidates, target API considered unreachable"
                );
                return Err(ScanError::ValidationUnavailable { unverified, checked });
            }
        }

        tracing::info!(
            listed = report.listed,
            included = report.included,
            absent = report.absent.len(),
            unverified = report.unverified.len(),
            "target scan complete"
        );

        Ok(ScanOutcome { inventory, report })
    }

    async fn validate(
        &self,
        candidates: Vec<TargetInventoryEntry>,
    ) -> Vec<(String, Result<TargetInventoryEntry, ApiError>)> {
        let semaphore = Arc::new(Semaphore::new(self.options.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut pending: HashSet<String> = HashSet::new();

        for candidate in candidates {
            let semaphore = semaphore.clone();
            let api = self.api.clone();
            let retry = self.options.retry;
            pending.insert(candidate.id.clone());

            tasks.spawn(async move {
                let id = candidate.id;
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (id, Err(ApiError::Other("lookup pool closed".to_string())));
                };
                let result = retry.run(&id, || api.get(&id)).await;
                (id, result)
            });
        }

        let mut results = Vec::new();
        let mut task_failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, result)) => {
                    pending.remove(&id);
                    results.push((id, result));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "lookup task failed");
                    task_failures.push(err.to_string());
                }
            }
        }

        // Ids whose task never reported back
        let mut lost: Vec<String> = pending.into_iter().collect();
        lost.sort();
        for (index, id) in lost.into_iter().enumerate() {
            let reason = task_failures
                .get(index)
                .cloned()
                .unwrap_or_else(|| "lookup task failed".to_string());
            results.push((id, Err(ApiError::Other(format!("lookup task failed: {}", reason)))));
        }
        results
    }
}
