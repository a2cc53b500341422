//! Azure Resource Manager client for the target tenant.

use async_trait::async_trait;
use lazy_static::lazy_static;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

use super::api::{ApiError, TargetApi};
use crate::source::{PropertyBag, TargetInventoryEntry};
use crate::translation::TenantContext;

pub const ARM_ENDPOINT: &str = "https://management.azure.com/";

/// API version of the generic resources list endpoint, also the lookup
/// fallback for providers missing from the table below
pub const RESOURCES_API_VERSION: &str = "2021-04-01";

/// Environment variable holding the bearer token
pub const ACCESS_TOKEN_ENV: &str = "ARM_ACCESS_TOKEN";

fn build_api_version_map() -> HashMap<&'static str, &'static str> {
    let mut m = HashMap::new();

    // Provider namespaces, used when the full type has no entry
    m.insert("microsoft.resources", "2021-04-01");
    m.insert("microsoft.compute", "2023-09-01");
    m.insert("microsoft.network", "2023-09-01");
    m.insert("microsoft.storage", "2023-05-01");
    m.insert("microsoft.keyvault", "2023-07-01");
    m.insert("microsoft.sql", "2021-11-01");
    m.insert("microsoft.web", "2023-12-01");
    m.insert("microsoft.managedidentity", "2023-01-31");
    m.insert("microsoft.containerservice", "2024-02-01");
    m.insert("microsoft.containerregistry", "2023-07-01");
    m.insert("microsoft.operationalinsights", "2022-10-01");
    m.insert("microsoft.insights", "2020-02-02");
    m.insert("microsoft.servicebus", "2021-11-01");
    m.insert("microsoft.eventhub", "2024-01-01");
    m.insert("microsoft.documentdb", "2024-05-15");
    m.insert("microsoft.cache", "2024-03-01");
    m.insert("microsoft.authorization", "2022-04-01");
    m.insert("microsoft.management", "2021-04-01");

    // Types that lag behind their namespace
    m.insert("microsoft.resources/subscriptions", "2022-12-01");
    m.insert("microsoft.network/privatednszones", "2020-06-01");
    m.insert("microsoft.network/dnszones", "2018-05-01");
    m.insert("microsoft.insights/components", "2020-02-02");
    m.insert("microsoft.insights/diagnosticsettings", "2021-05-01-preview");

    m
}

lazy_static! {
    static ref API_VERSIONS: HashMap<&'static str, &'static str> = build_api_version_map();
}

/// Known lookup API version of a resource type: the type itself first,
/// then its provider namespace
pub fn known_api_version(resource_type: &str) -> Option<&'static str> {
    let lowered = resource_type.to_ascii_lowercase();
    API_VERSIONS.get(lowered.as_str()).copied().or_else(|| {
        let namespace = lowered.split('/').next()?;
        API_VERSIONS.get(namespace).copied()
    })
}

#[derive(Debug, Deserialize)]
struct ResourcePage {
    #[serde(default)]
    value: Vec<Value>,
    #[serde(rename = "nextLink")]
    next_link: Option<String>,
}

pub struct ArmClient {
    client: Client,
    endpoint: Url,
    token: String,
    default_api_version: String,
    api_versions: HashMap<String, String>,
}

impl ArmClient {
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Other(format!("Failed to create HTTP client: {}", e)))?;
        let endpoint = Url::parse(ARM_ENDPOINT).map_err(|e| ApiError::Other(e.to_string()))?;

        Ok(Self {
            client,
            endpoint,
            token: token.into(),
            default_api_version: RESOURCES_API_VERSION.to_string(),
            api_versions: HashMap::new(),
        })
    }

    /// Point at another ARM endpoint (sovereign clouds, test servers)
    pub fn with_endpoint(mut self, endpoint: &str) -> Result<Self, ApiError> {
        self.endpoint = Url::parse(endpoint).map_err(|e| ApiError::Other(e.to_string()))?;
        Ok(self)
    }

    /// API version used for point lookups of a resource type or of a whole
    /// provider namespace. Takes precedence over the built-in table.
    pub fn with_api_version(mut self, resource_type: &str, version: impl Into<String>) -> Self {
        self.api_versions
            .insert(resource_type.to_ascii_lowercase(), version.into());
        self
    }

    fn api_version_for(&self, resource_type: Option<&str>) -> &str {
        let Some(resource_type) = resource_type else {
            return &self.default_api_version;
        };
        let lowered = resource_type.to_ascii_lowercase();
        let namespace = lowered.split('/').next().unwrap_or_default();

        self.api_versions
            .get(&lowered)
            .or_else(|| self.api_versions.get(namespace))
            .map(String::as_str)
            .or_else(|| known_api_version(&lowered))
            .unwrap_or(&self.default_api_version)
    }

    fn lookup_url(&self, id: &str) -> Result<Url, ApiError> {
        let resource_type = resource_type_of(id);
        self.url_for(id, self.api_version_for(resource_type.as_deref()))
    }

    fn url_for(&self, path: &str, api_version: &str) -> Result<Url, ApiError> {
        let mut url = self
            .endpoint
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Other(format!("Invalid resource path '{}': {}", path, e)))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }

    async fn fetch(&self, url: Url) -> Result<Value, ApiError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|e| ApiError::Other(format!("Failed to parse response: {}", e)));
        }

        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();

        Err(ApiError::from_status(status.as_u16(), &body, retry_after))
    }
}

fn map_transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else if err.is_connect() {
        ApiError::Unavailable(err.to_string())
    } else {
        ApiError::Other(err.to_string())
    }
}

/// Resource type encoded in an ARM id
pub fn resource_type_of(id: &str) -> Option<String> {
    let segments: Vec<&str> = id.split('/').filter(|s| !s.is_empty()).collect();

    if let Some(providers) = segments
        .iter()
        .rposition(|s| s.eq_ignore_ascii_case("providers"))
    {
        let namespace = segments.get(providers + 1)?;
        let types: Vec<&str> = segments[providers + 2..].iter().step_by(2).copied().collect();
        if types.is_empty() {
            return None;
        }
        return Some(format!("{}/{}", namespace, types.join("/")));
    }

    match segments.as_slice() {
        [sub, _, rg, _] if sub.eq_ignore_ascii_case("subscriptions") && rg.eq_ignore_ascii_case("resourcegroups") => {
            Some("Microsoft.Resources/resourceGroups".to_string())
        }
        [sub, _] if sub.eq_ignore_ascii_case("subscriptions") => {
            Some("Microsoft.Resources/subscriptions".to_string())
        }
        _ => None,
    }
}

/// Inventory entry from an ARM resource body
pub fn entry_from_body(body: Value, fallback_id: &str) -> Result<TargetInventoryEntry, ApiError> {
    let Value::Object(mut object) = body else {
        return Err(ApiError::Other("resource body is not an object".to_string()));
    };

    let id = match object.remove("id") {
        Some(Value::String(id)) => id,
        _ => fallback_id.to_string(),
    };
    let resource_type = match object.remove("type") {
        Some(Value::String(t)) => t,
        _ => resource_type_of(&id).unwrap_or_default(),
    };
    let properties: PropertyBag = object;

    Ok(TargetInventoryEntry {
        id,
        resource_type,
        properties,
    })
}

#[async_trait]
impl TargetApi for ArmClient {
    async fn list(
        &self,
        context: &TenantContext,
        type_filter: Option<&str>,
    ) -> Result<Vec<TargetInventoryEntry>, ApiError> {
        if context.subscription_id.is_empty() {
            return Err(ApiError::Other(
                "target subscription id is required to list resources".to_string(),
            ));
        }

        let mut url = self.url_for(
            &format!("/subscriptions/{}/resources", context.subscription_id),
            RESOURCES_API_VERSION,
        )?;
        if let Some(resource_type) = type_filter {
            url.query_pairs_mut()
                .append_pair("$filter", &format!("resourceType eq '{}'", resource_type));
        }

        let mut entries = Vec::new();
        let mut next = Some(url);
        while let Some(page_url) = next.take() {
            let body = self.fetch(page_url).await?;
            let page: ResourcePage = serde_json::from_value(body)
                .map_err(|e| ApiError::Other(format!("Unexpected list response: {}", e)))?;

            for item in page.value {
                entries.push(entry_from_body(item, "")?);
            }

            if let Some(link) = page.next_link {
                next = Some(
                    Url::parse(&link).map_err(|e| ApiError::Other(format!("Invalid nextLink: {}", e)))?,
                );
            }
        }

        tracing::debug!(count = entries.len(), "listed target resources");
        Ok(entries)
    }

    async fn get(&self, id: &str) -> Result<TargetInventoryEntry, ApiError> {
        let url = self.lookup_url(id)?;
        let body = self.fetch(url).await?;
        entry_from_body(body, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_type_of() {
        assert_eq!(
            resource_type_of("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Sql/servers/a/databases/b"),
            Some("Microsoft.Sql/servers/databases".to_string())
        );
        assert_eq!(
            resource_type_of("/subscriptions/s/resourceGroups/rg"),
            Some("Microsoft.Resources/resourceGroups".to_string())
        );
        assert_eq!(resource_type_of("vm-0001"), None);
    }

    #[test]
    fn test_entry_from_body_splits_id_and_type() {
        let entry = entry_from_body(
            json!({
                "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v",
                "type": "Microsoft.Network/virtualNetworks",
                "location": "westeurope",
                "properties": { "addressSpace": { "addressPrefixes": ["10.0.0.0/16"] } }
            }),
            "",
        )
        .unwrap();

        assert_eq!(entry.resource_type, "Microsoft.Network/virtualNetworks");
        assert_eq!(entry.properties["location"], json!("westeurope"));
        assert!(!entry.properties.contains_key("id"));
    }

    fn client() -> ArmClient {
        ArmClient::new("token", Duration::from_secs(5)).unwrap()
    }

    fn api_version_of(url: &Url) -> String {
        url.query_pairs()
            .find(|(key, _)| key == "api-version")
            .map(|(_, value)| value.into_owned())
            .unwrap_or_default()
    }

    #[test]
    fn test_lookup_urls_use_provider_api_versions() {
        let client = client();
        let cases = [
            ("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/virtualMachines/vm1", "2023-09-01"),
            ("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/v/subnets/default", "2023-09-01"),
            ("/subscriptions/s/resourceGroups/rg/providers/Microsoft.KeyVault/vaults/kv1", "2023-07-01"),
            ("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/st1", "2023-05-01"),
            ("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Sql/servers/sql1/databases/db", "2021-11-01"),
            ("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/privateDnsZones/zone", "2020-06-01"),
            ("/subscriptions/s/resourceGroups/rg", "2021-04-01"),
        ];

        for (id, expected) in cases {
            let url = client.lookup_url(id).unwrap();
            assert_eq!(api_version_of(&url), expected, "api-version for {}", id);
            assert_eq!(url.path(), id);
        }
    }

    #[test]
    fn test_unknown_provider_falls_back_to_resources_version() {
        let url = client()
            .lookup_url("/subscriptions/s/resourceGroups/rg/providers/Contoso.Widgets/gadgets/g1")
            .unwrap();

        assert_eq!(api_version_of(&url), RESOURCES_API_VERSION);
    }

    #[test]
    fn test_configured_version_overrides_table() {
        let client = client()
            .with_api_version("Microsoft.Storage/storageAccounts", "2023-01-01")
            .with_api_version("Microsoft.Web", "2022-09-01");
        let id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/st1";

        let url = client.lookup_url(id).unwrap();

        assert_eq!(
            url.as_str(),
            "https://management.azure.com/subscriptions/s/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/st1?api-version=2023-01-01"
        );
        let site = client
            .lookup_url("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Web/sites/app")
            .unwrap();
        assert_eq!(api_version_of(&site), "2022-09-01");
    }

    #[test]
    fn test_known_api_version_is_case_insensitive() {
        assert_eq!(known_api_version("MICROSOFT.KEYVAULT/VAULTS"), Some("2023-07-01"));
        assert_eq!(known_api_version("Microsoft.Insights/diagnosticSettings"), Some("2021-05-01-preview"));
        assert_eq!(known_api_version("Contoso.Widgets/gadgets"), None);
    }
}
