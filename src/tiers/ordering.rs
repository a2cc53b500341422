use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use super::table::assign_tier;
use crate::compare::ClassificationRecord;

/// A classification record with its emission rank
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TieredRecord {
    pub tier: u8,
    #[serde(flatten)]
    pub record: ClassificationRecord,
}

/// A resource placed before something it references
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierViolation {
    pub resource_id: String,
    pub tier: u8,
    pub dependency_id: String,
    pub dependency_tier: u8,
}

impl fmt::Display for TierViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (tier {}) references {} (tier {})",
            self.resource_id, self.tier, self.dependency_id, self.dependency_tier
        )
    }
}

/// Sort records by tier, then by identifier
pub fn order_for_emission(records: Vec<ClassificationRecord>) -> Vec<TieredRecord> {
    let mut tiered: Vec<TieredRecord> = records
        .into_iter()
        .map(|record| TieredRecord {
            tier: assign_tier(&record.resource_type),
            record,
        })
        .collect();

    tiered.sort_by(|a, b| {
        a.tier
            .cmp(&b.tier)
            .then_with(|| a.record.sort_key().cmp(b.record.sort_key()))
    });
    tiered
}

/// References that the emission order does not honour.
///
/// `dependencies` maps an abstracted id to the abstracted id it references.
/// A pair is reported when the referenced resource is emitted after the one
/// referencing it, whether the table ranks it higher or it sorts later within
/// the same tier. Only pairs where both ends are part of `ordered` are
/// checked. Nothing is reordered.
pub fn tier_violations(
    ordered: &[TieredRecord],
    dependencies: &BTreeMap<String, String>,
) -> Vec<TierViolation> {
    let positions: HashMap<&str, (usize, u8)> = ordered
        .iter()
        .enumerate()
        .filter_map(|(position, t)| {
            t.record
                .abstracted_id
                .as_deref()
                .map(|id| (id, (position, t.tier)))
        })
        .collect();

    let mut violations = Vec::new();
    for (resource_id, dependency_id) in dependencies {
        let (Some(&(position, tier)), Some(&(dependency_position, dependency_tier))) = (
            positions.get(resource_id.as_str()),
            positions.get(dependency_id.as_str()),
        ) else {
            continue;
        };

        if dependency_position > position {
            tracing::warn!(
                resource_id = %resource_id,
                dependency_id = %dependency_id,
                tier,
                dependency_tier,
                "dependency emitted after its dependent"
            );
            violations.push(TierViolation {
                resource_id: resource_id.clone(),
                tier,
                dependency_id: dependency_id.clone(),
                dependency_tier,
            });
        }
    }
    violations
}
