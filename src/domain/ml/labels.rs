use crate::domain::errors::EvaluationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What to do with the final `horizon` rows of a window, whose forward price
/// lies outside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TailLabelPolicy {
    /// Label the tail rows `0` and keep them.
    #[default]
    ForceNegative,
    /// Mark the tail rows incomplete so they are dropped before training.
    Exclude,
}

impl fmt::Display for TailLabelPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TailLabelPolicy::ForceNegative => write!(f, "force_negative"),
            TailLabelPolicy::Exclude => write!(f, "exclude"),
        }
    }
}

impl FromStr for TailLabelPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "force_negative" => Ok(TailLabelPolicy::ForceNegative),
            "exclude" => Ok(TailLabelPolicy::Exclude),
            _ => anyhow::bail!(
                "Invalid tail label policy: {}. Must be 'force_negative' or 'exclude'",
                s
            ),
        }
    }
}

/// Binary labels from forward returns:
/// `label[t] = 1` iff `(price[t+h] - price[t]) / price[t] > r`.
#[derive(Debug, Clone, Copy)]
pub struct LabelGenerator {
    horizon: usize,
    return_threshold: f64,
    tail_policy: TailLabelPolicy,
}

impl LabelGenerator {
    pub fn new(
        horizon: usize,
        return_threshold: f64,
        tail_policy: TailLabelPolicy,
    ) -> Result<Self, EvaluationError> {
        if horizon == 0 {
            return Err(EvaluationError::config("label horizon must be > 0"));
        }
        if !return_threshold.is_finite() {
            return Err(EvaluationError::config("label return threshold must be finite"));
        }
        Ok(Self {
            horizon,
            return_threshold,
            tail_policy,
        })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    /// One entry per price. `None` marks an incomplete label (excluded tail
    /// row or a non-positive base price).
    pub fn generate(&self, prices: &[f64]) -> Vec<Option<u8>> {
        let n = prices.len();
        (0..n)
            .map(|t| {
                let Some(&future) = prices.get(t + self.horizon) else {
                    return match self.tail_policy {
                        TailLabelPolicy::ForceNegative => Some(0),
                        TailLabelPolicy::Exclude => None,
                    };
                };
                let base = prices[t];
                if base <= 0.0 || !base.is_finite() || !future.is_finite() {
                    return None;
                }
                let forward_return = (future - base) / base;
                Some(u8::from(forward_return > self.return_threshold))
            })
            .collect()
    }
}
