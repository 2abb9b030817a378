use crate::domain::optimization::ensemble_weights::EnsembleWeights;
use crate::domain::optimization::window_splitter::WindowOverlap;
use crate::domain::ports::Hyperparameters;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable outcome of one evaluated window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowResult {
    /// 1-based window number within the run
    pub window_index: usize,
    pub start: usize,
    pub end: usize,
    pub train_rows: usize,
    pub validation_rows: usize,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub threshold: f64,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    /// Hyperparameters per model name
    pub hyperparameters: BTreeMap<String, Hyperparameters>,
    /// Mean best search score across models, when a search ran
    pub score: Option<f64>,
    pub ensemble_weights: Option<EnsembleWeights>,
}

/// A window that produced no result, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedWindow {
    pub window_index: usize,
    pub start: usize,
    pub end: usize,
    pub reason: String,
}

/// Read-only rollup over an ordered list of window results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub windows_completed: usize,
    pub windows_skipped: usize,
    pub total_trades: usize,
    pub total_wins: usize,
    pub total_losses: usize,
    pub overall_win_rate: f64,
    pub overlap: WindowOverlap,
    /// Whether any two aggregated windows share rows, in which case the
    /// windows are not independent samples
    pub windows_share_rows: bool,
}

impl AggregateResult {
    pub fn from_windows(
        windows: &[WindowResult],
        windows_skipped: usize,
        overlap: WindowOverlap,
    ) -> Self {
        let total_trades: usize = windows.iter().map(|w| w.trades).sum();
        let total_wins: usize = windows.iter().map(|w| w.wins).sum();

        let windows_share_rows = windows
            .iter()
            .enumerate()
            .any(|(i, a)| windows[i + 1..].iter().any(|b| a.start < b.end && b.start < a.end));

        Self {
            windows_completed: windows.len(),
            windows_skipped,
            total_trades,
            total_wins,
            total_losses: total_trades - total_wins,
            overall_win_rate: win_rate(total_wins, total_trades),
            overlap,
            windows_share_rows,
        }
    }

    /// Portfolio rollup across series. Windows of different series never
    /// share rows, so only the per-series flags carry over.
    pub fn combine<'a>(
        aggregates: impl IntoIterator<Item = &'a AggregateResult>,
        overlap: WindowOverlap,
    ) -> Self {
        let mut total = Self {
            windows_completed: 0,
            windows_skipped: 0,
            total_trades: 0,
            total_wins: 0,
            total_losses: 0,
            overall_win_rate: 0.0,
            overlap,
            windows_share_rows: false,
        };
        for aggregate in aggregates {
            total.windows_completed += aggregate.windows_completed;
            total.windows_skipped += aggregate.windows_skipped;
            total.total_trades += aggregate.total_trades;
            total.total_wins += aggregate.total_wins;
            total.total_losses += aggregate.total_losses;
            total.windows_share_rows |= aggregate.windows_share_rows;
        }
        total.overall_win_rate = win_rate(total.total_wins, total.total_trades);
        total
    }
}

fn win_rate(wins: usize, trades: usize) -> f64 {
    if trades == 0 {
        0.0
    } else {
        wins as f64 / trades as f64
    }
}
