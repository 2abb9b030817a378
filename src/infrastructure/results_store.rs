use crate::application::walkforward::orchestrator::WalkForwardReport;
use crate::application::walkforward::parallel_runner::BatchReport;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Writes walk-forward reports as pretty JSON under one output directory.
pub struct JsonResultsStore {
    out_dir: PathBuf,
}

impl JsonResultsStore {
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir)
            .with_context(|| format!("Failed to create results directory {:?}", out_dir))?;
        Ok(Self { out_dir })
    }

    /// `<out>/walkforward-<SYMBOL>-<YYYYmmdd-HHMMSS>.json`
    pub fn save_report(&self, report: &WalkForwardReport, at: DateTime<Utc>) -> Result<PathBuf> {
        let name = format!(
            "walkforward-{}-{}.json",
            report.symbol.to_uppercase(),
            at.format("%Y%m%d-%H%M%S")
        );
        self.write(&name, report)
    }

    pub fn save_batch(&self, batch: &BatchReport, at: DateTime<Utc>) -> Result<PathBuf> {
        let name = format!("walkforward-batch-{}.json", at.format("%Y%m%d-%H%M%S"));
        self.write(&name, batch)
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.out_dir.join(name);
        let content = serde_json::to_string_pretty(value).context("Failed to serialize results")?;

        // Atomic write: write to temp file then rename
        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content).context("Failed to write temp results file")?;
        fs::rename(&temp_path, &path).context("Failed to rename results file")?;

        info!("Saved results to {:?}", path);
        Ok(path)
    }

    pub fn load_report(path: &Path) -> Result<WalkForwardReport> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        serde_json::from_str(&content).context("Failed to parse walk-forward report JSON")
    }
}
