use anyhow::{Context as AnyhowContext, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

use super::scan::render_report;
use super::workspace::{GlobalOptions, ScanArgs, Workspace, run_scan};
use crate::compare::{CompareOptions, ReconciliationSummary, ResourceComparator};
use crate::context::Context;
use crate::lineage::{LayerId, LineageStore};
use crate::plan::{FilePlanSink, ImportPlanEmitter, PlanFormat, PlanSink};
use crate::scanner::ValidatedInventory;
use crate::tiers::{order_for_emission, tier_violations};
use crate::translation::{ArtifactTable, NameTranslator};

/// Arguments of `tmirror reconcile`
#[derive(Debug, Clone, Default)]
pub struct ReconcileArgs {
    pub layer: String,
    /// Previously saved inventory; scan the target when absent
    pub inventory: Option<PathBuf>,
    pub scan: ScanArgs,
    pub target_tenant: Option<String>,
    pub target_subscription: Option<String>,
    pub suspicion_threshold: Option<f64>,
    pub ignore: Vec<String>,
    pub plan: Option<PathBuf>,
    pub format: Option<PlanFormat>,
}

/// Classifies a layer against the target and emits the import plan
pub struct ReconcileCommand;

impl ReconcileCommand {
    pub fn execute(ctx: &Context, options: &GlobalOptions, args: &ReconcileArgs) -> Result<()> {
        let layer = LayerId::parse(&args.layer)?;
        let workspace = Workspace::open(ctx, options)?;
        let store = workspace.load_store(&[&layer])?;

        let source = workspace.source_context(&store, &layer);
        let target = workspace.target_context(
            &source,
            args.target_tenant.as_deref(),
            args.target_subscription.as_deref(),
        );

        ctx.output.section("Reconciling");
        ctx.output.key_value("Layer", layer.as_str());
        ctx.output.key_value("Source", source.identifier());
        ctx.output.key_value("Target", target.identifier());

        let inventory = Self::inventory(ctx, &workspace, args, &target)?;

        let translator = NameTranslator::new(source.clone(), target.clone())
            .context("Failed to set up name translation")?;
        if translator.is_passthrough() {
            tracing::info!("source and target match, names are not translated");
        }

        let compare_options = CompareOptions {
            diff: workspace
                .config
                .reconcile
                .diff_options()
                .with_ignored(&args.ignore),
            artifacts: ArtifactTable::v1(),
        };
        let classification = ResourceComparator::new(&store, layer.clone(), translator)
            .with_options(compare_options)
            .classify_all(&inventory);

        let threshold = args
            .suspicion_threshold
            .unwrap_or(workspace.config.reconcile.suspicion_threshold);
        let summary = ReconciliationSummary::from_classification(&classification, inventory.len(), threshold);
        summary.render(&*ctx.output);

        let ordered = order_for_emission(classification.records);
        for violation in tier_violations(&ordered, &Self::dependencies(&store, &layer)) {
            ctx.output
                .warning(&format!("Tier order gap: {}", violation));
        }

        let plan = ImportPlanEmitter::new(source, target).emit(&ordered);
        match &args.plan {
            Some(path) => {
                let sink = FilePlanSink::new(ctx.fs.clone(), path, args.format);
                sink.accept(&plan)?;
                ctx.output.blank();
                ctx.output
                    .success(&format!("Import plan written to {}", sink.path().display()));
            }
            None => {
                ctx.output.blank();
                plan.render(&*ctx.output);
            }
        }
        Ok(())
    }

    fn inventory(
        ctx: &Context,
        workspace: &Workspace,
        args: &ReconcileArgs,
        target: &crate::translation::TenantContext,
    ) -> Result<ValidatedInventory> {
        match &args.inventory {
            Some(path) => {
                let inventory = ValidatedInventory::load(&*ctx.fs, path)?;
                if !inventory.validated {
                    ctx.output
                        .warning("Inventory was saved without existence validation");
                }
                Ok(inventory)
            }
            None => {
                let outcome = run_scan(ctx, workspace, target, &args.scan)?;
                render_report(&*ctx.output, &outcome.report);
                Ok(outcome.inventory)
            }
        }
    }

    /// Parent references between abstracted nodes of the layer
    fn dependencies(store: &LineageStore, layer: &LayerId) -> BTreeMap<String, String> {
        store
            .abstracted_resources(layer)
            .into_iter()
            .filter_map(|r| r.parent_id.clone().map(|parent| (r.id.clone(), parent)))
            .collect()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityAbstractor;
    use crate::lineage::{GraphFiles, build_dual_graph};
    use crate::plan::{ImportAction, ImportPlan};
    use crate::source::{ExportDocument, ExportedResource};
    use crate::test_helpers::{
        TARGET_SUBSCRIPTION, TARGET_TENANT, arm_id, sample_source_export, source_context, target_context,
        test_seed,
    };
    use crate::traits::{FileSystem, MockFileSystem, MockOutput};
    use serde_json::json;
    use std::path::Path;
    use std::sync::Arc;

    fn exported(id: String, resource_type: &str, location: &str) -> ExportedResource {
        ExportedResource {
            id,
            resource_type: resource_type.to_string(),
            properties: json!({ "location": location }).as_object().cloned().unwrap(),
            parent_id: None,
            child_ids: Vec::new(),
            deleted: false,
        }
    }

    fn write_target(fs: &MockFileSystem, resources: Vec<ExportedResource>) {
        let document = ExportDocument {
            schema_version: Some("1.0.0".to_string()),
            tenant: Some(target_context()),
            resources,
        };
        fs.write(Path::new("/in/target.json"), &serde_json::to_string(&document).unwrap())
            .unwrap();
    }

    fn setup() -> (Context, Arc<MockFileSystem>, Arc<MockOutput>, GlobalOptions) {
        let fs = Arc::new(MockFileSystem::new());
        let output = Arc::new(MockOutput::new());
        let ctx = Context::test_with(fs.clone(), output.clone());

        let layer = LayerId::parse("source").unwrap();
        let mut store = LineageStore::in_memory();
        build_dual_graph(
            &mut store,
            &layer,
            &mut IdentityAbstractor::new(test_seed()),
            &sample_source_export().original_resources(),
            Some(source_context()),
        )
        .unwrap();
        GraphFiles::new(fs.clone(), "/graph")
            .save_layer(&store.archive(&layer).unwrap())
            .unwrap();

        fs.write(
            Path::new("/work/tenant-mirror.yaml"),
            &format!(
                "target:\n  tenant_id: {}\n  subscription_id: {}\ngraph_dir: /graph\nseed_dir: /seeds\n",
                TARGET_TENANT, TARGET_SUBSCRIPTION
            ),
        )
        .unwrap();

        let options = GlobalOptions {
            config: Some(PathBuf::from("/work/tenant-mirror.yaml")),
            ..GlobalOptions::default()
        };
        (ctx, fs, output, options)
    }

    fn args() -> ReconcileArgs {
        ReconcileArgs {
            layer: "source".to_string(),
            scan: ScanArgs {
                target_export: Some(PathBuf::from("/in/target.json")),
                ..ScanArgs::default()
            },
            plan: Some(PathBuf::from("/out/plan.json")),
            ..ReconcileArgs::default()
        }
    }

    #[test]
    fn test_reconcile_writes_ordered_plan() {
        let (ctx, fs, output, options) = setup();
        let rg = format!("/subscriptions/{}/resourceGroups/rg-app", TARGET_SUBSCRIPTION);
        write_target(
            &fs,
            vec![
                exported(rg, "Microsoft.Resources/resourceGroups", "westeurope"),
                exported(
                    arm_id(TARGET_SUBSCRIPTION, "Microsoft.Network/virtualNetworks", "vnet-hub"),
                    "Microsoft.Network/virtualNetworks",
                    "westeurope",
                ),
                exported(
                    arm_id(TARGET_SUBSCRIPTION, "Microsoft.Compute/virtualMachines", "vm-web"),
                    "Microsoft.Compute/virtualMachines",
                    "northeurope",
                ),
                exported(
                    arm_id(TARGET_SUBSCRIPTION, "Microsoft.Compute/virtualMachines", "vm-legacy"),
                    "Microsoft.Compute/virtualMachines",
                    "westeurope",
                ),
            ],
        );

        ReconcileCommand::execute(&ctx, &options, &args()).unwrap();

        let content = fs.get_file_contents(Path::new("/out/plan.json")).unwrap();
        let plan: ImportPlan = serde_json::from_str(&content).unwrap();
        let actions: Vec<(u8, ImportAction)> = plan.entries.iter().map(|e| (e.tier, e.action)).collect();
        assert_eq!(
            actions,
            vec![
                (0, ImportAction::Import),
                (1, ImportAction::Import),
                (3, ImportAction::Report),
                (3, ImportAction::ImportAndUpdate),
            ]
        );
        assert!(output.get_warnings().is_empty());
    }

    #[test]
    fn test_mostly_new_against_populated_target_warns_but_completes() {
        let (ctx, fs, output, options) = setup();
        write_target(
            &fs,
            vec![exported(
                arm_id(TARGET_SUBSCRIPTION, "Microsoft.Compute/virtualMachines", "vm-other"),
                "Microsoft.Compute/virtualMachines",
                "westeurope",
            )],
        );

        ReconcileCommand::execute(&ctx, &options, &args()).unwrap();

        assert_eq!(output.value_for("NEW").as_deref(), Some("3"));
        assert!(
            output
                .get_warnings()
                .iter()
                .any(|w| w.contains("lineage integrity"))
        );
        assert!(fs.exists(Path::new("/out/plan.json")));
    }

    #[test]
    fn test_missing_layer_fails() {
        let (ctx, _, _, options) = setup();
        let args = ReconcileArgs {
            layer: "unknown".to_string(),
            ..args()
        };

        assert!(ReconcileCommand::execute(&ctx, &options, &args).is_err());
    }
}
