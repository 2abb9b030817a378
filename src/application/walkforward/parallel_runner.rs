use crate::application::walkforward::orchestrator::{WalkForwardOrchestrator, WalkForwardReport};
use crate::domain::market::price_series::PriceSeries;
use crate::domain::performance::window_result::AggregateResult;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one series in a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesOutcome {
    pub symbol: String,
    pub result: Result<WalkForwardReport, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<SeriesOutcome>,
    /// Rollup over every series that completed
    pub portfolio: AggregateResult,
}

impl BatchReport {
    pub fn completed(&self) -> impl Iterator<Item = &WalkForwardReport> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.symbol.as_str(), e.as_str())))
    }
}

/// Runs walk-forward evaluations for several series concurrently.
///
/// Each series is evaluated independently on a bounded rayon pool; a series
/// that fails does not affect the others, and its error is kept in the
/// batch report next to the successful results.
pub struct ParallelWalkForwardRunner {
    orchestrator: Arc<WalkForwardOrchestrator>,
}

impl ParallelWalkForwardRunner {
    pub fn new(orchestrator: Arc<WalkForwardOrchestrator>) -> Self {
        Self { orchestrator }
    }

    /// Outcomes come back in the order the series were given.
    pub fn run_batch(&self, series: &[PriceSeries]) -> Result<BatchReport> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.orchestrator.settings().workers)
            .build()
            .context("Failed to build worker pool")?;

        info!(
            "Running walk-forward batch over {} series on {} threads",
            series.len(),
            pool.current_num_threads()
        );

        let outcomes: Vec<SeriesOutcome> = pool.install(|| {
            series
                .par_iter()
                .map(|s| {
                    let result = self.orchestrator.run(s).map_err(|e| e.to_string());
                    if let Err(e) = &result {
                        warn!("Walk-forward failed for {}: {}", s.symbol(), e);
                    }
                    SeriesOutcome {
                        symbol: s.symbol().to_string(),
                        result,
                    }
                })
                .collect()
        });

        let completed: Vec<&AggregateResult> = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|r| &r.aggregate))
            .collect();
        let portfolio =
            AggregateResult::combine(completed, self.orchestrator.settings().window_overlap);

        info!(
            "Batch done: {}/{} series completed, {} trades, win rate {:.2}%",
            outcomes.iter().filter(|o| o.result.is_ok()).count(),
            outcomes.len(),
            portfolio.total_trades,
            portfolio.overall_win_rate * 100.0
        );

        Ok(BatchReport {
            outcomes,
            portfolio,
        })
    }
}
