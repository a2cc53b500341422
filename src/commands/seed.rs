use anyhow::{Context as AnyhowContext, Result};

use super::workspace::{GlobalOptions, Workspace};
use crate::context::Context;

/// Tenant seed management. Seed bytes are never printed, only a fingerprint.
pub struct SeedCommand;

impl SeedCommand {
    /// Create the seed for a tenant if it does not exist yet
    pub fn execute_init(ctx: &Context, options: &GlobalOptions, tenant: Option<&str>) -> Result<()> {
        let workspace = Workspace::open(ctx, options)?;
        let tenant_id = Self::tenant_id(&workspace, tenant)?;

        let (seed, created) = workspace
            .seeds
            .load_or_create(&tenant_id)
            .with_context(|| format!("Failed to initialise seed for tenant {}", tenant_id))?;

        if created {
            ctx.output
                .success(&format!("Created seed for tenant {}", tenant_id));
        } else {
            ctx.output
                .info(&format!("Seed for tenant {} already exists", tenant_id));
        }
        ctx.output.key_value("Fingerprint", &seed.fingerprint());
        ctx.output
            .key_value("Location", &workspace.seeds.path_for(&tenant_id)?.display().to_string());
        Ok(())
    }

    /// Show where a tenant's seed lives and its fingerprint
    pub fn execute_show(ctx: &Context, options: &GlobalOptions, tenant: Option<&str>) -> Result<()> {
        let workspace = Workspace::open(ctx, options)?;
        let tenant_id = Self::tenant_id(&workspace, tenant)?;

        let seed = workspace.seeds.load(&tenant_id)?;

        ctx.output.section("Tenant seed");
        ctx.output.key_value("Tenant", &tenant_id);
        ctx.output.key_value("Fingerprint", &seed.fingerprint());
        ctx.output
            .key_value("Location", &workspace.seeds.path_for(&tenant_id)?.display().to_string());
        Ok(())
    }

    fn tenant_id(workspace: &Workspace, tenant: Option<&str>) -> Result<String> {
        let tenant_id = tenant
            .map(String::from)
            .unwrap_or_else(|| workspace.config.source.tenant_id.clone());
        if tenant_id.is_empty() {
            anyhow::bail!("No tenant given. Pass --tenant or set source.tenant_id in the config file.");
        }
        Ok(tenant_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{MockFileSystem, MockOutput};
    use std::path::PathBuf;
    use std::sync::Arc;

    fn setup() -> (Context, Arc<MockOutput>, GlobalOptions) {
        let output = Arc::new(MockOutput::new());
        let ctx = Context::test_with(Arc::new(MockFileSystem::new()), output.clone());
        let options = GlobalOptions {
            seed_dir: Some(PathBuf::from("/seeds")),
            graph_dir: Some(PathBuf::from("/graph")),
            ..GlobalOptions::default()
        };
        (ctx, output, options)
    }

    #[test]
    fn test_init_is_idempotent() {
        let (ctx, output, options) = setup();

        SeedCommand::execute_init(&ctx, &options, Some("tenant-a")).unwrap();
        let first = output.value_for("Fingerprint").unwrap();
        SeedCommand::execute_init(&ctx, &options, Some("tenant-a")).unwrap();

        let fingerprints: Vec<String> = output
            .get_messages()
            .into_iter()
            .filter_map(|m| match m {
                crate::traits::OutputMessage::KeyValue(k, v) if k == "Fingerprint" => Some(v),
                _ => None,
            })
            .collect();
        assert_eq!(fingerprints, vec![first.clone(), first]);
        assert!(ctx.fs.exists(&PathBuf::from("/seeds/tenant-a.seed")));
    }

    #[test]
    fn test_show_without_seed_fails() {
        let (ctx, _, options) = setup();

        let err = SeedCommand::execute_show(&ctx, &options, Some("tenant-b")).unwrap_err();

        assert!(err.to_string().contains("tenant-b"));
    }

    #[test]
    fn test_tenant_is_required() {
        let (ctx, _, options) = setup();

        assert!(SeedCommand::execute_init(&ctx, &options, None).is_err());
    }
}
