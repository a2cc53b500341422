use anyhow::{Context, Result};
use clap::ValueEnum;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::emitter::ImportPlan;
use crate::traits::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanFormat {
    Json,
    Yaml,
}

impl PlanFormat {
    /// Format implied by a file extension, JSON otherwise
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                PlanFormat::Yaml
            }
            _ => PlanFormat::Json,
        }
    }

    pub fn serialize(&self, plan: &ImportPlan) -> Result<String> {
        match self {
            PlanFormat::Json => {
                serde_json::to_string_pretty(plan).context("Failed to serialize plan as JSON")
            }
            PlanFormat::Yaml => serde_yaml::to_string(plan).context("Failed to serialize plan as YAML"),
        }
    }
}

/// Receiver of a finished plan
pub trait PlanSink {
    fn accept(&self, plan: &ImportPlan) -> Result<()>;
}

/// Writes the plan to a file
pub struct FilePlanSink {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    format: PlanFormat,
}

impl FilePlanSink {
    pub fn new(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>, format: Option<PlanFormat>) -> Self {
        let path = path.into();
        let format = format.unwrap_or_else(|| PlanFormat::from_path(&path));
        Self { fs, path, format }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlanSink for FilePlanSink {
    fn accept(&self, plan: &ImportPlan) -> Result<()> {
        let content = self.format.serialize(plan)?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            self.fs.create_dir_all(parent)?;
        }
        self.fs
            .write(&self.path, &content)
            .with_context(|| format!("Failed to write plan: {}", self.path.display()))?;
        tracing::info!(path = %self.path.display(), entries = plan.entries.len(), "plan written");
        Ok(())
    }
}
