use serde::{Deserialize, Serialize};
use std::fmt;

/// Tenant and subscription a resource set lives in
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: String,
    #[serde(default)]
    pub subscription_id: String,
}

impl TenantContext {
    pub fn new(tenant_id: impl Into<String>, subscription_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            subscription_id: subscription_id.into(),
        }
    }

    /// Identifier used to key target-derived hashes: the subscription, or the
    /// tenant when no subscription is set
    pub fn identifier(&self) -> &str {
        if self.subscription_id.is_empty() {
            &self.tenant_id
        } else {
            &self.subscription_id
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tenant_id.is_empty() && self.subscription_id.is_empty()
    }
}

impl fmt::Display for TenantContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.subscription_id.is_empty() {
            write!(f, "tenant {}", self.tenant_id)
        } else {
            write!(
                f,
                "tenant {} / subscription {}",
                self.tenant_id, self.subscription_id
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_prefers_subscription() {
        assert_eq!(TenantContext::new("t", "s").identifier(), "s");
        assert_eq!(TenantContext::new("t", "").identifier(), "t");
    }
}
