use anyhow::{Context as AnyhowContext, Result};
use std::path::Path;

use super::workspace::{GlobalOptions, Workspace};
use crate::context::Context;
use crate::identity::IdentityAbstractor;
use crate::lineage::{LayerId, build_dual_graph};
use crate::source::ExportDocument;
use crate::translation::TenantContext;

/// Builds (or extends) a dual-graph layer from a discovery export
pub struct AbstractCommand;

impl AbstractCommand {
    pub fn execute(ctx: &Context, options: &GlobalOptions, input: &Path, layer: &str) -> Result<()> {
        let layer = LayerId::parse(layer)?;
        let workspace = Workspace::open(ctx, options)?;

        ctx.output.section("Abstracting discovered resources");

        let document = ExportDocument::load(&*ctx.fs, input)?;
        let originals = document.original_resources();
        let tenant = Self::source_tenant(&workspace, document.tenant.as_ref())?;

        let (seed, created) = workspace
            .seeds
            .load_or_create(&tenant.tenant_id)
            .with_context(|| format!("Tenant seed unavailable for {}", tenant.tenant_id))?;
        if created {
            ctx.output.warning(&format!(
                "Created a new seed for tenant {}. Keep it: abstracted ids depend on it.",
                tenant.tenant_id
            ));
        }

        let mut store = workspace.load_store_or_empty(&layer)?;
        let collisions = store
            .metadata(&layer)
            .map(|m| m.collisions.clone())
            .unwrap_or_default();
        let mut abstractor = IdentityAbstractor::new(seed).with_collision_table(collisions);

        let report = build_dual_graph(&mut store, &layer, &mut abstractor, &originals, Some(tenant.clone()))
            .with_context(|| format!("Failed to build layer '{}'", layer))?;
        let path = workspace.save_layer(&store, &layer)?;

        ctx.output.key_value("Layer", layer.as_str());
        ctx.output.key_value("Source", tenant.identifier());
        ctx.output.key_value("Resources", &originals.len().to_string());
        ctx.output.key_value("Recorded", &report.recorded.to_string());
        ctx.output.key_value("Already present", &report.reused.to_string());
        if report.salted > 0 {
            ctx.output
                .key_value("Salted (hash collisions)", &report.salted.to_string());
        }
        for duplicate in &report.duplicates {
            ctx.output
                .warning(&format!("Duplicate resource in export, first kept: {}", duplicate));
        }
        ctx.output.blank();
        ctx.output
            .success(&format!("Layer saved to {}", path.display()));
        Ok(())
    }

    fn source_tenant(workspace: &Workspace, exported: Option<&TenantContext>) -> Result<TenantContext> {
        let tenant = exported
            .filter(|t| !t.tenant_id.is_empty())
            .cloned()
            .unwrap_or_else(|| workspace.config.source.clone());
        if tenant.tenant_id.is_empty() {
            anyhow::bail!(
                "Source tenant unknown. Add `tenant` to the export or set source.tenant_id in the config file."
            );
        }
        Ok(tenant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lineage::GraphFiles;
    use crate::test_helpers::sample_source_export;
    use crate::traits::{FileSystem, MockFileSystem, MockOutput};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn setup() -> (Context, Arc<MockFileSystem>, Arc<MockOutput>, GlobalOptions) {
        let fs = Arc::new(MockFileSystem::new());
        let output = Arc::new(MockOutput::new());
        let ctx = Context::test_with(fs.clone(), output.clone());
        let export = serde_json::to_string(&sample_source_export()).unwrap();
        fs.write(Path::new("/in/source.json"), &export).unwrap();
        let options = GlobalOptions {
            seed_dir: Some(PathBuf::from("/seeds")),
            graph_dir: Some(PathBuf::from("/graph")),
            ..GlobalOptions::default()
        };
        (ctx, fs, output, options)
    }

    #[test]
    fn test_abstract_saves_layer_with_lineage() {
        let (ctx, fs, output, options) = setup();

        AbstractCommand::execute(&ctx, &options, Path::new("/in/source.json"), "source").unwrap();

        let files = GraphFiles::new(fs, "/graph");
        let snapshot = files.load_layer(&LayerId::parse("source").unwrap()).unwrap();
        assert_eq!(snapshot.pair_count, 3);
        assert!(snapshot.bundle.detached_abstracted.is_empty());
        assert_eq!(output.value_for("Recorded").as_deref(), Some("3"));
    }

    #[test]
    fn test_rerun_reuses_existing_ids() {
        let (ctx, fs, output, options) = setup();
        let layer = LayerId::parse("source").unwrap();

        AbstractCommand::execute(&ctx, &options, Path::new("/in/source.json"), "source").unwrap();
        let files = GraphFiles::new(fs, "/graph");
        let first = files.load_layer(&layer).unwrap();
        AbstractCommand::execute(&ctx, &options, Path::new("/in/source.json"), "source").unwrap();
        let second = files.load_layer(&layer).unwrap();

        assert_eq!(first.bundle.pairs, second.bundle.pairs);
        assert!(
            output
                .get_messages()
                .contains(&crate::traits::OutputMessage::KeyValue("Already present".into(), "3".into()))
        );
    }

    #[test]
    fn test_invalid_layer_name_is_rejected() {
        let (ctx, _, _, options) = setup();

        assert!(AbstractCommand::execute(&ctx, &options, Path::new("/in/source.json"), "bad/name").is_err());
    }
}
