use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::source::TargetInventoryEntry;
use crate::translation::TenantContext;

/// Failure of a single call against the target API
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("resource not found")]
    NotFound,

    #[error("resource is gone (soft-deleted)")]
    Gone,

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("throttled by the target API")]
    Throttled { retry_after: Option<Duration> },

    #[error("request timed out")]
    Timeout,

    #[error("target API unavailable: {0}")]
    Unavailable(String),

    #[error("target API error: {0}")]
    Other(String),
}

impl ApiError {
    /// Worth retrying with backoff
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ApiError::Throttled { .. } | ApiError::Timeout | ApiError::Unavailable(_)
        )
    }

    /// The resource does not exist (any more)
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound | ApiError::Gone)
    }

    /// Map an HTTP status to an error
    pub fn from_status(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        match status {
            404 => ApiError::NotFound,
            410 => ApiError::Gone,
            401 | 403 => ApiError::PermissionDenied(truncate(body)),
            408 => ApiError::Timeout,
            429 => ApiError::Throttled { retry_after },
            500..=599 => ApiError::Unavailable(format!("HTTP {}: {}", status, truncate(body))),
            _ => ApiError::Other(format!("HTTP {}: {}", status, truncate(body))),
        }
    }
}

fn truncate(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX {
        trimmed.to_string()
    } else {
        let head: String = trimmed.chars().take(MAX).collect();
        format!("{}...", head)
    }
}

/// Live target environment
#[async_trait]
pub trait TargetApi: Send + Sync {
    /// Bulk list of candidates. Fast, but may include stale or soft-deleted
    /// entries.
    async fn list(
        &self,
        context: &TenantContext,
        type_filter: Option<&str>,
    ) -> Result<Vec<TargetInventoryEntry>, ApiError>;

    /// Point lookup of one resource
    async fn get(&self, id: &str) -> Result<TargetInventoryEntry, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::from_status(404, "", None), ApiError::NotFound);
        assert_eq!(ApiError::from_status(410, "", None), ApiError::Gone);
        assert!(matches!(
            ApiError::from_status(403, "AuthorizationFailed", None),
            ApiError::PermissionDenied(msg) if msg == "AuthorizationFailed"
        ));
        assert!(ApiError::from_status(429, "", Some(Duration::from_secs(2))).is_transient());
        assert!(ApiError::from_status(503, "busy", None).is_transient());
        assert!(!ApiError::from_status(400, "bad", None).is_transient());
    }

    #[test]
    fn test_classification() {
        assert!(ApiError::Gone.is_not_found());
        assert!(!ApiError::Gone.is_transient());
        assert!(!ApiError::PermissionDenied("x".into()).is_transient());
        assert!(ApiError::Timeout.is_transient());
    }

    #[test]
    fn test_long_bodies_are_truncated() {
        let body = "x".repeat(500);

        let err = ApiError::from_status(500, &body, None);

        assert!(err.to_string().len() < 300);
    }
}
