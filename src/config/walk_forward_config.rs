//! Walk-forward configuration parsing from environment variables.

use super::parse_or;
use crate::domain::ml::labels::TailLabelPolicy;
use crate::domain::optimization::settings::WalkForwardSettings;
use crate::domain::optimization::window_splitter::WindowOverlap;
use anyhow::Result;

/// Walk-forward environment configuration
#[derive(Debug, Clone)]
pub struct WalkForwardEnvConfig {
    pub settings: WalkForwardSettings,
}

impl WalkForwardEnvConfig {
    /// Unset keys keep the value already in `base`.
    pub fn overlay<F>(base: WalkForwardSettings, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = WalkForwardSettings {
            window_size: parse_or(&lookup, "WF_WINDOW_SIZE", base.window_size)?,
            step_size: parse_or(&lookup, "WF_STEP_SIZE", base.step_size)?,
            window_overlap: parse_or::<WindowOverlap, _>(
                &lookup,
                "WF_WINDOW_OVERLAP",
                base.window_overlap,
            )?,
            validation_fraction: parse_or(
                &lookup,
                "WF_VALIDATION_FRACTION",
                base.validation_fraction,
            )?,
            min_rows: parse_or(&lookup, "WF_MIN_ROWS", base.min_rows)?,
            min_trades: parse_or(&lookup, "WF_MIN_TRADES", base.min_trades)?,
            label_horizon: parse_or(&lookup, "WF_LABEL_HORIZON", base.label_horizon)?,
            label_return_threshold: parse_or(
                &lookup,
                "WF_LABEL_RETURN_THRESHOLD",
                base.label_return_threshold,
            )?,
            tail_label_policy: parse_or::<TailLabelPolicy, _>(
                &lookup,
                "WF_TAIL_LABEL_POLICY",
                base.tail_label_policy,
            )?,
            hpo_trials: parse_or(&lookup, "WF_HPO_TRIALS", base.hpo_trials)?,
            workers: parse_or(&lookup, "WF_WORKERS", base.workers)?,
            seed: parse_or(&lookup, "WF_SEED", base.seed)?,
        };
        Ok(Self { settings })
    }
}
