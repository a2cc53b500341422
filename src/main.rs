mod commands;
mod compare;
mod config;
mod context;
mod error;
mod identity;
mod lineage;
mod output;
mod plan;
mod scanner;
mod source;
mod tiers;
mod traits;
mod translation;

#[cfg(test)]
mod test_helpers;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{
    AbstractCommand, GlobalOptions, LayerCommand, ReconcileArgs, ReconcileCommand, ScanArgs,
    ScanCommand, SeedCommand,
};
use plan::PlanFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tmirror")]
#[command(
    about = "Tenant Mirror - abstract a cloud tenant into a lineage graph and reconcile it against a target tenant",
    long_about = None
)]
#[command(version)]
struct Cli {
    /// Path to tenant-mirror.yaml (searched upwards from the current directory by default)
    #[arg(long, global = true, env = "TMIRROR_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding tenant seeds
    #[arg(long, global = true, env = "TMIRROR_SEED_DIR")]
    seed_dir: Option<PathBuf>,

    /// Directory holding layer snapshots
    #[arg(long, global = true, env = "TMIRROR_GRAPH_DIR")]
    graph_dir: Option<PathBuf>,

    /// Verbose diagnostics (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage per-tenant abstraction seeds
    Seed {
        #[command(subcommand)]
        command: SeedSubcommand,
    },

    /// Abstract a discovery export into a dual-graph layer
    Abstract {
        /// Discovery export (JSON or YAML)
        #[arg(short, long)]
        input: PathBuf,

        /// Layer to build or extend
        #[arg(short, long, default_value = "source")]
        layer: String,
    },

    /// Layer operations on saved dual graphs
    Layer {
        #[command(subcommand)]
        command: LayerSubcommand,
    },

    /// Enumerate and validate the target tenant
    Scan {
        #[command(flatten)]
        target: TargetArgs,

        /// Write the validated inventory to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Classify a layer against the target and emit the import plan
    Reconcile {
        /// Layer to reconcile
        #[arg(short, long, default_value = "source")]
        layer: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Use a saved inventory instead of scanning
        #[arg(long, conflicts_with = "target_export")]
        inventory: Option<PathBuf>,

        /// NEW fraction above which the run is flagged as suspicious
        #[arg(long)]
        suspicion_threshold: Option<f64>,

        /// Property key to leave out of the diff (repeatable)
        #[arg(long = "ignore")]
        ignore: Vec<String>,

        /// Write the plan to this file instead of printing it
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Plan format (defaults to the plan file extension)
        #[arg(long, value_enum)]
        format: Option<PlanFormat>,
    },
}

#[derive(Subcommand)]
enum SeedSubcommand {
    /// Create the seed for a tenant if missing
    Init {
        /// Tenant id (defaults to source.tenant_id from the config)
        #[arg(short, long)]
        tenant: Option<String>,
    },

    /// Show a tenant's seed fingerprint and location
    Show {
        #[arg(short, long)]
        tenant: Option<String>,
    },
}

#[derive(Subcommand)]
enum LayerSubcommand {
    /// List saved layers
    List,

    /// Copy a layer, lineage edges included
    Copy { from: String, to: String },

    /// Write a checksummed snapshot of a layer to the archive directory
    Archive { layer: String },

    /// Restore a layer from an archive file
    Restore {
        archive: PathBuf,

        /// Restore under another layer name
        #[arg(long = "as")]
        as_layer: Option<String>,
    },

    /// Check that every abstracted node has exactly one lineage edge
    Verify { layer: String },
}

#[derive(clap::Args)]
struct TargetArgs {
    /// Serve the target from an export file instead of the live API
    #[arg(long)]
    target_export: Option<PathBuf>,

    #[arg(long, env = "TMIRROR_TARGET_TENANT")]
    target_tenant: Option<String>,

    #[arg(long, env = "TMIRROR_TARGET_SUBSCRIPTION")]
    target_subscription: Option<String>,

    /// Only scan this resource type
    #[arg(long = "type")]
    type_filter: Option<String>,

    /// Trust the list API without point lookups
    #[arg(long)]
    no_validate: bool,

    /// Point lookups in flight at once
    #[arg(long)]
    concurrency: Option<usize>,
}

impl TargetArgs {
    fn scan_args(&self) -> ScanArgs {
        ScanArgs {
            target_export: self.target_export.clone(),
            type_filter: self.type_filter.clone(),
            no_validate: self.no_validate,
            concurrency: self.concurrency,
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "tmirror=debug" } else { "tmirror=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = context::Context::new();
    let options = GlobalOptions {
        config: cli.config,
        seed_dir: cli.seed_dir,
        graph_dir: cli.graph_dir,
    };

    match cli.command {
        Commands::Seed { command } => match command {
            SeedSubcommand::Init { tenant } => {
                SeedCommand::execute_init(&ctx, &options, tenant.as_deref())?;
            }
            SeedSubcommand::Show { tenant } => {
                SeedCommand::execute_show(&ctx, &options, tenant.as_deref())?;
            }
        },
        Commands::Abstract { input, layer } => {
            AbstractCommand::execute(&ctx, &options, &input, &layer)?;
        }
        Commands::Layer { command } => match command {
            LayerSubcommand::List => LayerCommand::execute_list(&ctx, &options)?,
            LayerSubcommand::Copy { from, to } => {
                LayerCommand::execute_copy(&ctx, &options, &from, &to)?;
            }
            LayerSubcommand::Archive { layer } => {
                LayerCommand::execute_archive(&ctx, &options, &layer)?;
            }
            LayerSubcommand::Restore { archive, as_layer } => {
                LayerCommand::execute_restore(&ctx, &options, &archive, as_layer.as_deref())?;
            }
            LayerSubcommand::Verify { layer } => {
                LayerCommand::execute_verify(&ctx, &options, &layer)?;
            }
        },
        Commands::Scan { target, out } => {
            ScanCommand::execute(
                &ctx,
                &options,
                &target.scan_args(),
                target.target_tenant.as_deref(),
                target.target_subscription.as_deref(),
                out.as_deref(),
            )?;
        }
        Commands::Reconcile {
            layer,
            target,
            inventory,
            suspicion_threshold,
            ignore,
            plan,
            format,
        } => {
            let args = ReconcileArgs {
                layer,
                inventory,
                scan: target.scan_args(),
                target_tenant: target.target_tenant,
                target_subscription: target.target_subscription,
                suspicion_threshold,
                ignore,
                plan,
                format,
            };
            ReconcileCommand::execute(&ctx, &options, &args)?;
        }
    }

    Ok(())
}
