use anyhow::{Context as AnyhowContext, Result};
use std::path::Path;

use super::workspace::{GlobalOptions, Workspace};
use crate::context::Context;
use crate::lineage::{LayerId, LayerStats};

/// Layer-level operations on persisted dual graphs
pub struct LayerCommand;

impl LayerCommand {
    /// List saved layers
    pub fn execute_list(ctx: &Context, options: &GlobalOptions) -> Result<()> {
        let workspace = Workspace::open(ctx, options)?;
        let layers = workspace.graph.saved_layers()?;

        ctx.output.section("Layers");
        if layers.is_empty() {
            ctx.output.dimmed("No layers saved yet");
            return Ok(());
        }
        for layer in layers {
            let snapshot = workspace.graph.load_layer(&layer)?;
            ctx.output.key_value(
                layer.as_str(),
                &format!("{} pairs, saved {}", snapshot.pair_count, snapshot.created_at.to_rfc3339()),
            );
        }
        Ok(())
    }

    /// Copy a layer, lineage edges included
    pub fn execute_copy(ctx: &Context, options: &GlobalOptions, from: &str, to: &str) -> Result<()> {
        let from = LayerId::parse(from)?;
        let to = LayerId::parse(to)?;
        let workspace = Workspace::open(ctx, options)?;

        if workspace.graph.layer_exists(&to) {
            anyhow::bail!("Layer '{}' already exists", to);
        }

        let mut store = workspace.load_store(&[&from])?;
        let stats = store
            .copy(&from, &to)
            .with_context(|| format!("Failed to copy layer '{}' to '{}'", from, to))?;
        workspace.save_layer(&store, &to)?;

        Self::render_stats(ctx, &stats);
        ctx.output
            .success(&format!("Copied layer '{}' to '{}'", from, to));
        Ok(())
    }

    /// Write a timestamped, checksummed snapshot of a layer
    pub fn execute_archive(ctx: &Context, options: &GlobalOptions, layer: &str) -> Result<()> {
        let layer = LayerId::parse(layer)?;
        let workspace = Workspace::open(ctx, options)?;

        let store = workspace.load_store(&[&layer])?;
        let snapshot = store.archive(&layer)?;
        let path = workspace.graph.write_archive(&snapshot)?;

        ctx.output.key_value("Snapshot", &snapshot.snapshot_id);
        ctx.output.key_value("Pairs", &snapshot.pair_count.to_string());
        ctx.output.key_value("Checksum", &snapshot.checksum);
        ctx.output
            .success(&format!("Archived layer '{}' to {}", layer, path.display()));
        Ok(())
    }

    /// Materialise an archive, under its own layer name or `as_layer`
    pub fn execute_restore(
        ctx: &Context,
        options: &GlobalOptions,
        archive: &Path,
        as_layer: Option<&str>,
    ) -> Result<()> {
        let workspace = Workspace::open(ctx, options)?;
        let snapshot = workspace.graph.read_snapshot(archive)?;
        let layer = match as_layer {
            Some(name) => LayerId::parse(name)?,
            None => snapshot.layer.clone(),
        };

        if workspace.graph.layer_exists(&layer) {
            anyhow::bail!(
                "Layer '{}' already exists. Restore under another name with --as.",
                layer
            );
        }

        let mut store = crate::lineage::LineageStore::in_memory();
        let stats = store
            .restore_as(snapshot, &layer)
            .with_context(|| format!("Failed to restore {}", archive.display()))?;
        workspace.save_layer(&store, &layer)?;

        Self::render_stats(ctx, &stats);
        ctx.output
            .success(&format!("Restored layer '{}'", layer));
        Ok(())
    }

    /// Report lineage violations. Fails when the layer has errors.
    pub fn execute_verify(ctx: &Context, options: &GlobalOptions, layer: &str) -> Result<()> {
        let layer = LayerId::parse(layer)?;
        let workspace = Workspace::open(ctx, options)?;

        let store = workspace.load_store(&[&layer])?;
        let report = store.verify(&layer)?;

        ctx.output.section(&format!("Integrity of layer '{}'", layer));
        for error in &report.errors {
            ctx.output.error(&error.to_string());
        }
        for warning in &report.warnings {
            ctx.output.warning(&warning.to_string());
        }

        if report.is_valid() {
            ctx.output.success("Every abstracted node has exactly one lineage edge");
            Ok(())
        } else {
            anyhow::bail!(
                "Layer '{}' has {} lineage violation(s)",
                layer,
                report.errors.len()
            )
        }
    }

    fn render_stats(ctx: &Context, stats: &LayerStats) {
        ctx.output.key_value("Pairs", &stats.pairs.to_string());
        if stats.detached_abstracted > 0 || stats.detached_originals > 0 {
            ctx.output.warning(&format!(
                "Carried {} abstracted and {} original node(s) without lineage",
                stats.detached_abstracted, stats.detached_originals
            ));
        }
    }
}
