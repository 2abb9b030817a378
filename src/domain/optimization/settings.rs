use crate::domain::errors::EvaluationError;
use crate::domain::ml::labels::TailLabelPolicy;
use crate::domain::optimization::window_splitter::WindowOverlap;
use serde::{Deserialize, Serialize};

/// Parameters of one walk-forward run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkForwardSettings {
    pub window_size: usize,
    pub step_size: usize,
    pub window_overlap: WindowOverlap,
    /// Trailing share of each window's usable rows held out for validation
    pub validation_fraction: f64,
    /// Windows with fewer usable rows are skipped
    pub min_rows: usize,
    pub min_trades: usize,
    pub label_horizon: usize,
    pub label_return_threshold: f64,
    pub tail_label_policy: TailLabelPolicy,
    /// Trials per model per window; 0 trains on default hyperparameters
    pub hpo_trials: usize,
    /// Worker threads for parallel runs; 0 lets rayon decide
    pub workers: usize,
    pub seed: u64,
}

impl Default for WalkForwardSettings {
    fn default() -> Self {
        Self {
            window_size: 5000,
            step_size: 1000,
            window_overlap: WindowOverlap::Overlapping,
            validation_fraction: 0.2,
            min_rows: 100,
            min_trades: 10,
            label_horizon: 5,
            label_return_threshold: 0.003,
            tail_label_policy: TailLabelPolicy::ForceNegative,
            hpo_trials: 30,
            workers: 0,
            seed: 42,
        }
    }
}

impl WalkForwardSettings {
    pub fn validate(&self) -> Result<(), EvaluationError> {
        if self.window_size == 0 {
            return Err(EvaluationError::config("window_size must be > 0"));
        }
        if self.step_size == 0 {
            return Err(EvaluationError::config("step_size must be > 0"));
        }
        if !(self.validation_fraction > 0.0 && self.validation_fraction < 1.0) {
            return Err(EvaluationError::config(format!(
                "validation_fraction must be in (0, 1), got {}",
                self.validation_fraction
            )));
        }
        if self.min_rows < 2 {
            return Err(EvaluationError::config("min_rows must be at least 2"));
        }
        if self.min_trades == 0 {
            return Err(EvaluationError::config("min_trades must be > 0"));
        }
        if self.label_horizon == 0 || self.label_horizon >= self.window_size {
            return Err(EvaluationError::config(format!(
                "label_horizon must be in 1..{}, got {}",
                self.window_size, self.label_horizon
            )));
        }
        if !self.label_return_threshold.is_finite() {
            return Err(EvaluationError::config("label_return_threshold must be finite"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = WalkForwardSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.window_size, 5000);
        assert_eq!(settings.step_size, 1000);
        assert_eq!(settings.min_trades, 10);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let cases = [
            WalkForwardSettings {
                window_size: 0,
                ..Default::default()
            },
            WalkForwardSettings {
                step_size: 0,
                ..Default::default()
            },
            WalkForwardSettings {
                validation_fraction: 1.0,
                ..Default::default()
            },
            WalkForwardSettings {
                label_horizon: 5000,
                ..Default::default()
            },
        ];
        for settings in cases {
            assert!(matches!(
                settings.validate(),
                Err(EvaluationError::InvalidConfig { .. })
            ));
        }
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let settings: WalkForwardSettings = toml::from_str(
            r#"
            window_size = 800
            window_overlap = "disjoint"
            tail_label_policy = "exclude"
            "#,
        )
        .unwrap();

        assert_eq!(settings.window_size, 800);
        assert_eq!(settings.window_overlap, WindowOverlap::Disjoint);
        assert_eq!(settings.tail_label_policy, TailLabelPolicy::Exclude);
        assert_eq!(settings.step_size, 1000);
        assert_eq!(settings.seed, 42);
    }
}
