use anyhow::Result;
use std::path::Path;

use super::workspace::{GlobalOptions, ScanArgs, Workspace, run_scan};
use crate::context::Context;
use crate::scanner::ScanReport;
use crate::traits::Output;

/// Enumerates and validates the target tenant
pub struct ScanCommand;

impl ScanCommand {
    pub fn execute(
        ctx: &Context,
        options: &GlobalOptions,
        args: &ScanArgs,
        target_tenant: Option<&str>,
        target_subscription: Option<&str>,
        out: Option<&Path>,
    ) -> Result<()> {
        let workspace = Workspace::open(ctx, options)?;
        let target = workspace.target_context(&workspace.config.source, target_tenant, target_subscription);
        if target.is_empty() {
            anyhow::bail!("No target tenant given. Set target in the config file or pass --target-subscription.");
        }

        ctx.output.section("Scanning target");
        ctx.output.key_value("Target", target.identifier());

        let outcome = run_scan(ctx, &workspace, &target, args)?;
        render_report(&*ctx.output, &outcome.report);

        if let Some(path) = out {
            outcome.inventory.save(&*ctx.fs, path)?;
            ctx.output
                .success(&format!("Inventory written to {}", path.display()));
        }
        Ok(())
    }
}

pub fn render_report(output: &dyn Output, report: &ScanReport) {
    output.key_value("Listed", &report.listed.to_string());
    output.key_value("Included", &report.included.to_string());
    if report.validation_skipped {
        output.warning("Existence validation disabled: listed entries trusted as-is");
        return;
    }

    output.key_value("Absent (stale or deleted)", &report.absent.len().to_string());
    if !report.unverified.is_empty() {
        output.warning(&format!(
            "{} candidate(s) excluded because they could not be confirmed",
            report.unverified.len()
        ));
        for excluded in &report.unverified {
            output.dimmed(&format!("  {}: {}", excluded.id, excluded.reason));
        }
    }
}
