use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::compare::{ClassificationState, Confidence};
use crate::output::Tone;
use crate::tiers::TieredRecord;
use crate::traits::Output;
use crate::translation::TenantContext;

/// What the code emitter should do with a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportAction {
    /// Adopt the existing target resource as-is
    Import,
    /// Adopt the existing target resource, then converge its properties
    ImportAndUpdate,
    /// Create the resource in the target
    Create,
    /// Only report: the target resource has no source counterpart
    Report,
}

impl ImportAction {
    pub fn for_state(state: ClassificationState) -> Self {
        match state {
            ClassificationState::ExactMatch => ImportAction::Import,
            ClassificationState::Drifted => ImportAction::ImportAndUpdate,
            ClassificationState::New => ImportAction::Create,
            ClassificationState::Orphaned => ImportAction::Report,
        }
    }

    fn tone(self) -> Tone {
        match self {
            ImportAction::Import => Tone::Settled,
            ImportAction::ImportAndUpdate => Tone::Changed,
            ImportAction::Create => Tone::Added,
            ImportAction::Report => Tone::Neutral,
        }
    }
}

impl fmt::Display for ImportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ImportAction::Import => "import",
            ImportAction::ImportAndUpdate => "import+update",
            ImportAction::Create => "create",
            ImportAction::Report => "report",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    /// Position in emission order, starting at 0
    pub order: usize,
    pub tier: u8,
    pub action: ImportAction,
    pub state: ClassificationState,
    #[serde(rename = "type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstracted_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
    /// Paths of drifted properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_properties: Vec<String>,
}

/// Ordered instructions handed to a code emitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportPlan {
    pub generated_at: DateTime<Utc>,
    pub source: TenantContext,
    pub target: TenantContext,
    pub entries: Vec<PlanEntry>,
}

impl ImportPlan {
    pub fn count(&self, action: ImportAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    pub fn render(&self, output: &dyn Output) {
        output.section("Import plan");
        output.key_value("Source", self.source.identifier());
        output.key_value("Target", self.target.identifier());
        output.blank();

        let mut current_tier = None;
        for entry in &self.entries {
            if current_tier != Some(entry.tier) {
                output.subsection(&format!("Tier {}", entry.tier));
                current_tier = Some(entry.tier);
            }

            let subject = entry
                .target_id
                .as_deref()
                .or(entry.expected_target_id.as_deref())
                .unwrap_or("-");
            let source = entry.abstracted_id.as_deref().unwrap_or("(target only)");
            let mut line = format!("{:>3}. {} -> {}", entry.order, source, subject);
            if entry.confidence == Some(Confidence::Heuristic) {
                line.push_str(" [heuristic]");
            }
            output.labeled(&entry.action.to_string(), entry.action.tone(), &line);

            for path in &entry.changed_properties {
                output.dimmed(&format!("       ~ {}", path));
            }
        }

        output.blank();
        output.key_value(
            "Actions",
            &format!(
                "{} import, {} import+update, {} create, {} report",
                self.count(ImportAction::Import),
                self.count(ImportAction::ImportAndUpdate),
                self.count(ImportAction::Create),
                self.count(ImportAction::Report)
            ),
        );
    }
}

/// Turns ordered classifications into an [`ImportPlan`]
pub struct ImportPlanEmitter {
    source: TenantContext,
    target: TenantContext,
}

impl ImportPlanEmitter {
    pub fn new(source: TenantContext, target: TenantContext) -> Self {
        Self { source, target }
    }

    pub fn emit(&self, ordered: &[TieredRecord]) -> ImportPlan {
        let entries = ordered
            .iter()
            .enumerate()
            .map(|(order, tiered)| {
                let record = &tiered.record;
                PlanEntry {
                    order,
                    tier: tiered.tier,
                    action: ImportAction::for_state(record.state),
                    state: record.state,
                    resource_type: record.resource_type.clone(),
                    abstracted_id: record.abstracted_id.clone(),
                    target_id: record.target_id.clone(),
                    expected_target_id: record.expected_target_id.clone(),
                    confidence: record.confidence,
                    changed_properties: record.diff.iter().map(|c| c.path.clone()).collect(),
                }
            })
            .collect();

        ImportPlan {
            generated_at: Utc::now(),
            source: self.source.clone(),
            target: self.target.clone(),
            entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{ChangeKind, ClassificationRecord, PropertyChange};
    use crate::test_helpers::{source_context, target_context};
    use crate::tiers::order_for_emission;
    use crate::traits::MockOutput;
    use serde_json::json;

    fn record(id: Option<&str>, resource_type: &str, state: ClassificationState) -> ClassificationRecord {
        ClassificationRecord {
            abstracted_id: id.map(String::from),
            resource_type: resource_type.to_string(),
            state,
            target_id: (state != ClassificationState::New).then(|| format!("/t/{}", id.unwrap_or("orphan"))),
            expected_target_id: None,
            confidence: id.map(|_| Confidence::LineageVerified),
            diff: Vec::new(),
            note: None,
        }
    }

    #[test]
    fn test_states_map_to_actions_in_emission_order() {
        let mut drifted = record(Some("vm-00000002"), "Microsoft.Compute/virtualMachines", ClassificationState::Drifted);
        drifted.diff.push(PropertyChange {
            path: "properties.hardwareProfile.vmSize".to_string(),
            change: ChangeKind::Modified,
            source: Some(json!("B2s")),
            target: Some(json!("D4s")),
        });
        let ordered = order_for_emission(vec![
            drifted,
            record(Some("rg-00000001"), "Microsoft.Resources/resourceGroups", ClassificationState::ExactMatch),
            record(Some("kv-00000003"), "Microsoft.KeyVault/vaults", ClassificationState::New),
            record(None, "Microsoft.Compute/virtualMachines", ClassificationState::Orphaned),
        ]);

        let plan = ImportPlanEmitter::new(source_context(), target_context()).emit(&ordered);

        let actions: Vec<(usize, u8, ImportAction)> =
            plan.entries.iter().map(|e| (e.order, e.tier, e.action)).collect();
        assert_eq!(
            actions,
            vec![
                (0, 0, ImportAction::Import),
                (1, 2, ImportAction::Create),
                (2, 3, ImportAction::Report),
                (3, 3, ImportAction::ImportAndUpdate),
            ]
        );
        assert_eq!(plan.entries[3].changed_properties, vec!["properties.hardwareProfile.vmSize"]);
    }

    #[test]
    fn test_render_groups_by_tier() {
        let ordered = order_for_emission(vec![
            record(Some("rg-00000001"), "Microsoft.Resources/resourceGroups", ClassificationState::ExactMatch),
            record(Some("vm-00000002"), "Microsoft.Compute/virtualMachines", ClassificationState::New),
        ]);
        let plan = ImportPlanEmitter::new(source_context(), target_context()).emit(&ordered);
        let output = MockOutput::new();

        plan.render(&output);

        assert_eq!(
            output.value_for("Actions").as_deref(),
            Some("1 import, 0 import+update, 1 create, 0 report")
        );
        let lines = output.labeled_lines();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].0, "import");
        assert!(lines[0].1.contains("rg-00000001"));
        assert_eq!(lines[1].0, "create");
    }
}
