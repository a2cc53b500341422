use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

use super::context::TenantContext;
use super::naming::{NamingRule, global_rule};
use crate::error::TranslationError;
use crate::identity::keyed_hex;
use crate::source::PropertyBag;

/// Hex characters of the target-derived name suffix
pub const SUFFIX_LEN: usize = 6;

/// Extra hash characters tried before a name collision is unresolved
pub const DEFAULT_MAX_DISAMBIGUATION: usize = 8;

const SUFFIX_DOMAIN: &str = "tenant-mirror/name-suffix";

/// Rewrites source identifiers into the identifiers they will have in the
/// target environment.
///
/// Subscription and tenant segments are swapped for the target values. Names
/// of globally-unique types are cleaned to their character class, truncated
/// and suffixed with a hash of the target context, then checked against every
/// name already issued for that type.
pub struct NameTranslator {
    source: TenantContext,
    target: TenantContext,
    suffix: String,
    max_attempts: usize,
    ids: HashMap<String, String>,
    names: HashMap<(String, String), String>,
    issued: HashMap<String, HashMap<String, String>>,
    patterns: Vec<(Regex, String)>,
}

impl NameTranslator {
    pub fn new(source: TenantContext, target: TenantContext) -> Result<Self, TranslationError> {
        let suffix = keyed_hex(target.identifier().as_bytes(), SUFFIX_DOMAIN)?[..SUFFIX_LEN].to_string();

        let mut patterns = Vec::new();
        let rewrites = [
            ("subscriptions", &source.subscription_id, &target.subscription_id),
            ("tenants", &source.tenant_id, &target.tenant_id),
        ];
        for (segment, from, to) in rewrites {
            if from.is_empty() || to.is_empty() || from.eq_ignore_ascii_case(to) {
                continue;
            }
            let pattern = Regex::new(&format!("(?i)/{}/{}\\b", segment, regex::escape(from)))?;
            patterns.push((pattern, format!("/{}/{}", segment, to)));
        }

        Ok(Self {
            source,
            target,
            suffix,
            max_attempts: DEFAULT_MAX_DISAMBIGUATION,
            ids: HashMap::new(),
            names: HashMap::new(),
            issued: HashMap::new(),
            patterns,
        })
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn source(&self) -> &TenantContext {
        &self.source
    }

    pub fn target(&self) -> &TenantContext {
        &self.target
    }

    /// Target-derived suffix appended to globally-unique names
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Source and target are the same environment: nothing is rewritten
    pub fn is_passthrough(&self) -> bool {
        self.source == self.target
    }

    /// Translate a full identifier, recording the names it issues
    pub fn translate(&mut self, id: &str, resource_type: &str) -> Result<String, TranslationError> {
        if let Some(cached) = self.ids.get(id) {
            return Ok(cached.clone());
        }

        if self.is_passthrough() {
            return Ok(id.to_string());
        }

        let mut segments: Vec<String> = self
            .rewrite_segments(id)
            .split('/')
            .map(String::from)
            .collect();

        match segments
            .iter()
            .rposition(|s| s.eq_ignore_ascii_case("providers"))
        {
            Some(providers) if providers + 1 < segments.len() => {
                let mut typed = segments[providers + 1].clone();
                let mut index = providers + 2;
                while index + 1 < segments.len() {
                    typed = format!("{}/{}", typed, segments[index]);
                    let name = segments[index + 1].clone();
                    segments[index + 1] = self.translate_name(&name, &typed)?;
                    index += 2;
                }
            }
            _ => {
                if global_rule(resource_type).is_some()
                    && let Some(last) = segments.iter().rposition(|s| !s.is_empty())
                {
                    let name = segments[last].clone();
                    segments[last] = self.translate_name(&name, resource_type)?;
                }
            }
        }

        let translated = segments.join("/");
        tracing::debug!(resource_id = id, translated = %translated, "translated identifier");
        self.ids.insert(id.to_string(), translated.clone());
        Ok(translated)
    }

    /// Translate one resource name, disambiguating against names already
    /// issued for the same type
    pub fn translate_name(&mut self, name: &str, resource_type: &str) -> Result<String, TranslationError> {
        let rule = match global_rule(resource_type) {
            Some(rule) if !self.is_passthrough() => rule,
            _ => return Ok(name.to_string()),
        };

        let type_key = resource_type.to_lowercase();
        let cache_key = (type_key.clone(), name.to_string());
        if let Some(cached) = self.names.get(&cache_key) {
            return Ok(cached.clone());
        }

        let disambiguation = keyed_hex(
            self.target.identifier().as_bytes(),
            &format!("{}/{}", type_key, name),
        )?;

        for attempt in 0..=self.max_attempts {
            let extra = &disambiguation[..attempt.min(disambiguation.len())];
            let candidate = self.compose(&rule, name, resource_type, extra)?;

            let issued = self.issued.entry(type_key.clone()).or_default();
            match issued.get(&candidate) {
                Some(owner) if !owner.eq_ignore_ascii_case(name) => {
                    tracing::debug!(
                        resource_type,
                        name,
                        candidate = %candidate,
                        owner = %owner,
                        "translated name collision"
                    );
                    continue;
                }
                _ => {
                    issued.insert(candidate.clone(), name.to_string());
                    self.names.insert(cache_key, candidate.clone());
                    return Ok(candidate);
                }
            }
        }

        Err(TranslationError::UnresolvedCollision {
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            attempts: self.max_attempts,
        })
    }

    /// Name a resource would get without disambiguation. Records nothing.
    pub fn expected_name(&self, name: &str, resource_type: &str) -> Result<String, TranslationError> {
        if let Some(cached) = self
            .names
            .get(&(resource_type.to_lowercase(), name.to_string()))
        {
            return Ok(cached.clone());
        }

        match global_rule(resource_type) {
            Some(rule) if !self.is_passthrough() => self.compose(&rule, name, resource_type, ""),
            _ => Ok(name.to_string()),
        }
    }

    /// Rewrite references inside a property value.
    ///
    /// Strings holding a full resource id are translated like the resource
    /// itself, so references to globally-unique resources carry the target
    /// name. Other strings only get tenant and subscription segments swapped.
    pub fn rewrite_value(&mut self, value: &Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.rewrite_reference(s)),
            Value::Array(items) => Value::Array(items.iter().map(|v| self.rewrite_value(v)).collect()),
            Value::Object(map) => Value::Object(self.rewrite_properties(map)),
            other => other.clone(),
        }
    }

    pub fn rewrite_properties(&mut self, properties: &PropertyBag) -> PropertyBag {
        properties
            .iter()
            .map(|(k, v)| (k.clone(), self.rewrite_value(v)))
            .collect()
    }

    fn rewrite_reference(&mut self, text: &str) -> String {
        if !is_resource_id(text) {
            return self.rewrite_text(text);
        }
        match self.translate(text, "") {
            Ok(translated) => translated,
            Err(err) => {
                tracing::debug!(reference = text, error = %err, "reference kept with segment rewrite only");
                self.rewrite_text(text)
            }
        }
    }

    fn rewrite_text(&self, text: &str) -> String {
        let mut result = text.to_string();
        for (pattern, replacement) in &self.patterns {
            result = pattern
                .replace_all(&result, replacement.as_str())
                .into_owned();
        }
        result
    }

    fn rewrite_segments(&self, id: &str) -> String {
        let mut segments: Vec<&str> = id.split('/').collect();
        for i in 1..segments.len() {
            let previous = segments[i - 1];
            if previous.eq_ignore_ascii_case("subscriptions")
                && !self.target.subscription_id.is_empty()
                && segments[i].eq_ignore_ascii_case(&self.source.subscription_id)
            {
                segments[i] = &self.target.subscription_id;
            } else if previous.eq_ignore_ascii_case("tenants")
                && !self.target.tenant_id.is_empty()
                && segments[i].eq_ignore_ascii_case(&self.source.tenant_id)
            {
                segments[i] = &self.target.tenant_id;
            }
        }
        segments.join("/")
    }

    fn compose(
        &self,
        rule: &NamingRule,
        name: &str,
        resource_type: &str,
        extra: &str,
    ) -> Result<String, TranslationError> {
        let base = rule.clean(name);
        if base.is_empty() {
            return Err(TranslationError::EmptyName {
                resource_type: resource_type.to_string(),
                name: name.to_string(),
            });
        }

        let tail = format!("{}{}{}", rule.class.separator(), self.suffix, extra);
        let budget = rule.max_len.saturating_sub(tail.len()).max(1);
        let truncated: String = base.chars().take(budget).collect();
        let truncated = truncated.trim_end_matches('-');

        Ok(format!("{}{}", truncated, tail))
    }
}

/// `/subscriptions/.../providers/<namespace>/<type>/<name>...`
fn is_resource_id(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.starts_with("/subscriptions/")
        && lower
            .split_once("/providers/")
            .is_some_and(|(_, rest)| rest.split('/').filter(|s| !s.is_empty()).count() >= 3)
}
