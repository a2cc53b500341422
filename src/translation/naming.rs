//! Naming rules for resource types whose names are globally unique.
//!
//! These names become part of a public DNS name (`<name>.blob.core.windows.net`,
//! `<name>.vault.azure.net`, ...), so a resource recreated in another tenant
//! cannot reuse its source name.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Characters a name may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// `a-z0-9` only
    LowerAlphanumeric,
    /// `a-z0-9` and `-`, no leading, trailing or doubled hyphen
    LowerAlphanumericHyphen,
}

impl CharClass {
    pub fn allows(&self, c: char) -> bool {
        match self {
            CharClass::LowerAlphanumeric => c.is_ascii_lowercase() || c.is_ascii_digit(),
            CharClass::LowerAlphanumericHyphen => {
                c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
            }
        }
    }

    /// Separator placed between a base name and an appended suffix
    pub fn separator(&self) -> &'static str {
        match self {
            CharClass::LowerAlphanumeric => "",
            CharClass::LowerAlphanumericHyphen => "-",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamingRule {
    pub min_len: usize,
    pub max_len: usize,
    pub class: CharClass,
    pub must_start_with_letter: bool,
}

impl NamingRule {
    fn new(min_len: usize, max_len: usize, class: CharClass) -> Self {
        Self {
            min_len,
            max_len,
            class,
            must_start_with_letter: false,
        }
    }

    fn letter_first(mut self) -> Self {
        self.must_start_with_letter = true;
        self
    }

    /// Lowercase and drop every character the rule does not allow
    pub fn clean(&self, name: &str) -> String {
        let lowered: String = name
            .chars()
            .flat_map(char::to_lowercase)
            .filter(|c| self.class.allows(*c))
            .collect();

        let mut cleaned = match self.class {
            CharClass::LowerAlphanumeric => lowered,
            CharClass::LowerAlphanumericHyphen => collapse_hyphens(&lowered),
        };

        if self.must_start_with_letter {
            let start = cleaned
                .find(|c: char| c.is_ascii_lowercase())
                .unwrap_or(cleaned.len());
            cleaned = cleaned[start..].to_string();
        }

        cleaned
    }

    /// Whether a final name satisfies length and character rules
    pub fn is_valid(&self, name: &str) -> bool {
        let len = name.chars().count();
        if len < self.min_len || len > self.max_len {
            return false;
        }
        if !name.chars().all(|c| self.class.allows(c)) {
            return false;
        }
        if self.class == CharClass::LowerAlphanumericHyphen
            && (name.starts_with('-') || name.ends_with('-') || name.contains("--"))
        {
            return false;
        }
        if self.must_start_with_letter && !name.starts_with(|c: char| c.is_ascii_lowercase()) {
            return false;
        }
        true
    }
}

/// Collapse runs of `-` and trim them from both ends
pub fn collapse_hyphens(name: &str) -> String {
    name.split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

use CharClass::{LowerAlphanumeric as Alnum, LowerAlphanumericHyphen as Hyphen};

fn build_rules() -> HashMap<&'static str, NamingRule> {
    let mut m = HashMap::new();

    // Storage and data
    m.insert("microsoft.storage/storageaccounts", NamingRule::new(3, 24, Alnum));
    m.insert("microsoft.documentdb/databaseaccounts", NamingRule::new(3, 44, Hyphen));
    m.insert("microsoft.sql/servers", NamingRule::new(1, 63, Hyphen));
    m.insert("microsoft.dbforpostgresql/flexibleservers", NamingRule::new(3, 63, Hyphen));
    m.insert("microsoft.dbformysql/flexibleservers", NamingRule::new(3, 63, Hyphen));
    m.insert("microsoft.dbformariadb/servers", NamingRule::new(3, 63, Hyphen));
    m.insert("microsoft.cache/redis", NamingRule::new(1, 63, Hyphen));
    m.insert("microsoft.cache/redisenterprise", NamingRule::new(1, 60, Hyphen));
    m.insert("microsoft.search/searchservices", NamingRule::new(2, 60, Hyphen));
    m.insert("microsoft.synapse/workspaces", NamingRule::new(1, 50, Hyphen));
    m.insert("microsoft.datafactory/factories", NamingRule::new(3, 63, Hyphen).letter_first());
    m.insert("microsoft.analysisservices/servers", NamingRule::new(3, 63, Alnum).letter_first());
    m.insert("microsoft.powerbidedicated/capacities", NamingRule::new(3, 63, Alnum).letter_first());

    // Security and configuration
    m.insert("microsoft.keyvault/vaults", NamingRule::new(3, 24, Hyphen).letter_first());
    m.insert("microsoft.keyvault/managedhsms", NamingRule::new(3, 24, Hyphen).letter_first());
    m.insert("microsoft.appconfiguration/configurationstores", NamingRule::new(5, 50, Hyphen));

    // Containers and web
    m.insert("microsoft.containerregistry/registries", NamingRule::new(5, 50, Alnum));
    m.insert("microsoft.web/sites", NamingRule::new(2, 60, Hyphen));
    m.insert("microsoft.web/staticsites", NamingRule::new(1, 40, Hyphen));
    m.insert("microsoft.apimanagement/service", NamingRule::new(1, 50, Hyphen).letter_first());
    m.insert("microsoft.signalrservice/signalr", NamingRule::new(3, 63, Hyphen).letter_first());
    m.insert("microsoft.signalrservice/webpubsub", NamingRule::new(3, 63, Hyphen).letter_first());
    m.insert("microsoft.batch/batchaccounts", NamingRule::new(3, 24, Alnum));

    // Messaging
    m.insert("microsoft.servicebus/namespaces", NamingRule::new(6, 50, Hyphen).letter_first());
    m.insert("microsoft.eventhub/namespaces", NamingRule::new(6, 50, Hyphen).letter_first());
    m.insert("microsoft.relay/namespaces", NamingRule::new(6, 50, Hyphen).letter_first());
    m.insert("microsoft.notificationhubs/namespaces", NamingRule::new(6, 50, Hyphen).letter_first());
    m.insert("microsoft.eventgrid/topics", NamingRule::new(3, 50, Hyphen));
    m.insert("microsoft.eventgrid/domains", NamingRule::new(3, 50, Hyphen));

    // Networking edge
    m.insert("microsoft.network/frontdoors", NamingRule::new(5, 64, Hyphen));
    m.insert("microsoft.network/trafficmanagerprofiles", NamingRule::new(1, 63, Hyphen));
    m.insert("microsoft.cdn/profiles/endpoints", NamingRule::new(1, 50, Hyphen));

    // AI and IoT
    m.insert("microsoft.cognitiveservices/accounts", NamingRule::new(2, 64, Hyphen));
    m.insert("microsoft.devices/iothubs", NamingRule::new(3, 50, Hyphen));
    m.insert("microsoft.devices/provisioningservices", NamingRule::new(3, 64, Hyphen));
    m.insert("microsoft.healthcareapis/services", NamingRule::new(3, 24, Hyphen));

    m
}

lazy_static! {
    static ref GLOBAL_NAME_RULES: HashMap<&'static str, NamingRule> = build_rules();
}

/// Naming rule for a globally-unique type, `None` for every other type
pub fn global_rule(resource_type: &str) -> Option<NamingRule> {
    GLOBAL_NAME_RULES
        .get(resource_type.to_lowercase().as_str())
        .copied()
}

/// Every globally-unique type with its rule
pub fn global_types() -> impl Iterator<Item = (&'static str, NamingRule)> {
    GLOBAL_NAME_RULES.iter().map(|(t, r)| (*t, *r))
}
