use anyhow::{Context as AnyhowContext, Result};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::context::Context;
use crate::identity::SeedStore;
use crate::lineage::{GraphFiles, LayerId, LineageStore};
use crate::scanner::{
    ACCESS_TOKEN_ENV, ArmClient, FileTargetApi, ScanOptions, ScanOutcome, TargetApi, TargetScanner,
};
use crate::source::ExportDocument;
use crate::translation::TenantContext;

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub seed_dir: Option<PathBuf>,
    pub graph_dir: Option<PathBuf>,
}

/// Loaded configuration plus the stores it points at
pub struct Workspace {
    pub config: AppConfig,
    pub graph: GraphFiles,
    pub seeds: SeedStore,
}

impl Workspace {
    pub fn open(ctx: &Context, options: &GlobalOptions) -> Result<Self> {
        let mut config = AppConfig::load(&*ctx.fs, options.config.as_deref())?;
        if let Some(dir) = &options.seed_dir {
            config.seed_dir = Some(dir.clone());
        }
        if let Some(dir) = &options.graph_dir {
            config.graph_dir = dir.clone();
        }

        let graph = GraphFiles::new(ctx.fs.clone(), config.graph_dir());
        let seeds = SeedStore::new(ctx.fs.clone(), config.seed_dir());
        Ok(Self {
            config,
            graph,
            seeds,
        })
    }

    /// Materialise saved layers into a fresh in-memory store
    pub fn load_store(&self, layers: &[&LayerId]) -> Result<LineageStore> {
        let mut store = LineageStore::in_memory();
        for layer in layers {
            let snapshot = self.graph.load_layer(layer)?;
            store
                .restore_as(snapshot, layer)
                .with_context(|| format!("Failed to load layer '{}'", layer))?;
        }
        Ok(store)
    }

    /// Load a layer when it has been saved before, else start empty
    pub fn load_store_or_empty(&self, layer: &LayerId) -> Result<LineageStore> {
        if self.graph.layer_exists(layer) {
            self.load_store(&[layer])
        } else {
            Ok(LineageStore::in_memory())
        }
    }

    pub fn save_layer(&self, store: &LineageStore, layer: &LayerId) -> Result<PathBuf> {
        let snapshot = store.archive(layer)?;
        self.graph.save_layer(&snapshot)
    }

    /// Source context: layer metadata first, then configuration
    pub fn source_context(&self, store: &LineageStore, layer: &LayerId) -> TenantContext {
        store
            .metadata(layer)
            .and_then(|m| m.tenant.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.config.source.clone())
    }

    /// Target context from configuration with command-line overrides.
    /// Falls back to `source` when no target is configured at all.
    pub fn target_context(
        &self,
        source: &TenantContext,
        tenant: Option<&str>,
        subscription: Option<&str>,
    ) -> TenantContext {
        let mut target = self.config.target.clone();
        if let Some(tenant) = tenant {
            target.tenant_id = tenant.to_string();
        }
        if let Some(subscription) = subscription {
            target.subscription_id = subscription.to_string();
        }
        if target.is_empty() {
            source.clone()
        } else {
            target
        }
    }
}

/// Options of commands that scan the target
#[derive(Debug, Clone, Default)]
pub struct ScanArgs {
    /// Serve the target from an export file instead of the live API
    pub target_export: Option<PathBuf>,
    pub type_filter: Option<String>,
    pub no_validate: bool,
    pub concurrency: Option<usize>,
}

/// Scan the target through the configured API, cancelled on Ctrl+C
pub fn run_scan(
    ctx: &Context,
    workspace: &Workspace,
    target: &TenantContext,
    args: &ScanArgs,
) -> Result<ScanOutcome> {
    let api = target_api(ctx, workspace, args)?;

    let mut options: ScanOptions = workspace.config.scan.scan_options();
    if args.no_validate {
        options.validate_existence = false;
    }
    if let Some(concurrency) = args.concurrency {
        options.concurrency = concurrency.max(1);
    }

    let scanner = TargetScanner::new(api, options);
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let outcome = runtime.block_on(async {
        let cancel = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };
        scanner
            .scan_until(target, args.type_filter.as_deref(), cancel)
            .await
    })?;

    Ok(outcome)
}

fn target_api(ctx: &Context, workspace: &Workspace, args: &ScanArgs) -> Result<Arc<dyn TargetApi>> {
    if let Some(path) = &args.target_export {
        let document = ExportDocument::load(&*ctx.fs, path)?;
        let api = FileTargetApi::from_export(&document);
        tracing::debug!(path = %path.display(), entries = api.len(), "serving target from export");
        return Ok(Arc::new(api));
    }

    let token = std::env::var(ACCESS_TOKEN_ENV).with_context(|| {
        format!(
            "No target export given and {} is not set. Provide --target-export or a bearer token.",
            ACCESS_TOKEN_ENV
        )
    })?;
    let timeout = std::time::Duration::from_secs(workspace.config.scan.request_timeout_secs);
    let client = workspace
        .config
        .scan
        .api_versions
        .iter()
        .fold(ArmClient::new(token, timeout)?, |client, (resource_type, version)| {
            client.with_api_version(resource_type, version.as_str())
        });
    Ok(Arc::new(client))
}
