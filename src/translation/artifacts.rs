//! Versioned table of identifier artifacts stripped before heuristic matching.
//!
//! Each rule undoes one transformation the pipeline may have left on an
//! abstracted resource's name. New translation behaviour gets a new rule
//! variant and a new table version; the comparator only calls [`ArtifactTable::strip`].

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const ARTIFACT_TABLE_VERSION: u32 = 1;

lazy_static! {
    static ref ABSTRACTED_ID: Regex =
        Regex::new(r"^[a-z0-9]{1,12}-[0-9a-f]{8}$").expect("Invalid abstracted id regex");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactRule {
    /// The whole candidate is an abstracted id: nothing of the original name
    /// survives, so no approximation is possible
    AbstractedIdPattern,
    /// Target suffix, optionally preceded by `separator` and followed by
    /// disambiguation characters
    TranslationSuffix {
        separator: String,
        max_disambiguation: usize,
    },
    /// Leading and trailing `-`, `_` and `.`
    TrimSeparators,
    /// Names compare case-insensitively
    CaseFold,
}

impl ArtifactRule {
    fn apply(&self, candidate: String, suffix: &str) -> Option<String> {
        match self {
            ArtifactRule::AbstractedIdPattern => {
                if ABSTRACTED_ID.is_match(&candidate) {
                    None
                } else {
                    Some(candidate)
                }
            }
            ArtifactRule::TranslationSuffix {
                separator,
                max_disambiguation,
            } => {
                if suffix.is_empty() {
                    return Some(candidate);
                }
                let lowered = candidate.to_lowercase();
                let marker = format!("{}{}", separator, suffix);
                let Some(position) = lowered.rfind(&marker) else {
                    return Some(candidate);
                };
                let tail = &lowered[position + marker.len()..];
                let is_disambiguation = tail.len() <= *max_disambiguation
                    && tail.chars().all(|c| c.is_ascii_hexdigit());
                if is_disambiguation && position > 0 && candidate.is_char_boundary(position) {
                    Some(candidate[..position].to_string())
                } else {
                    Some(candidate)
                }
            }
            ArtifactRule::TrimSeparators => {
                let trimmed = candidate.trim_matches(|c| matches!(c, '-' | '_' | '.'));
                Some(trimmed.to_string())
            }
            ArtifactRule::CaseFold => Some(candidate.to_lowercase()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactTable {
    pub version: u32,
    pub rules: Vec<ArtifactRule>,
}

impl Default for ArtifactTable {
    fn default() -> Self {
        Self::v1()
    }
}

impl ArtifactTable {
    pub fn v1() -> Self {
        Self {
            version: ARTIFACT_TABLE_VERSION,
            rules: vec![
                ArtifactRule::AbstractedIdPattern,
                ArtifactRule::TranslationSuffix {
                    separator: "-".to_string(),
                    max_disambiguation: 8,
                },
                ArtifactRule::TranslationSuffix {
                    separator: String::new(),
                    max_disambiguation: 8,
                },
                ArtifactRule::TrimSeparators,
                ArtifactRule::CaseFold,
            ],
        }
    }

    /// Approximate the original name behind a candidate.
    ///
    /// `None` when nothing usable is left.
    pub fn strip(&self, candidate: &str, suffix: &str) -> Option<String> {
        let mut current = candidate.to_string();
        for rule in &self.rules {
            current = rule.apply(current, suffix)?;
        }
        if current.is_empty() { None } else { Some(current) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_hyphenated_suffix_and_case() {
        let table = ArtifactTable::v1();

        assert_eq!(
            table.strip("KV-App-Prod-a1b2c3", "a1b2c3"),
            Some("kv-app-prod".to_string())
        );
    }

    #[test]
    fn test_strips_glued_suffix_with_disambiguation() {
        let table = ArtifactTable::v1();

        assert_eq!(
            table.strip("stappdataa1b2c3f", "a1b2c3"),
            Some("stappdata".to_string())
        );
    }

    #[test]
    fn test_leaves_unsuffixed_names_alone() {
        let table = ArtifactTable::v1();

        assert_eq!(table.strip("vnet-hub", "a1b2c3"), Some("vnet-hub".to_string()));
        assert_eq!(table.strip("_rg-app_", ""), Some("rg-app".to_string()));
    }

    #[test]
    fn test_abstracted_id_has_no_approximation() {
        let table = ArtifactTable::v1();

        assert_eq!(table.strip("vm-1a2b3c4d", "a1b2c3"), None);
    }

    #[test]
    fn test_table_serializes_with_tagged_rules() {
        let yaml = serde_yaml::to_string(&ArtifactTable::v1()).unwrap();

        assert!(yaml.contains("kind: translation_suffix"));
        let back: ArtifactTable = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, ArtifactTable::v1());
    }
}
