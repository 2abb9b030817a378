use crate::domain::errors::EvaluationError;
use crate::domain::market::price_series::{Candle, PriceSeries};
use crate::domain::ml::classification::ClassificationMetrics;
use crate::domain::ml::dataset::Dataset;
use crate::domain::ml::labels::LabelGenerator;
use crate::domain::optimization::ensemble_weights::{EnsembleWeightLearner, EnsembleWeights};
use crate::domain::optimization::settings::WalkForwardSettings;
use crate::domain::optimization::threshold_optimizer::ThresholdOptimizer;
use crate::domain::optimization::window_splitter::{Window, WindowSplitter};
use crate::domain::performance::window_result::{AggregateResult, SkippedWindow, WindowResult};
use crate::domain::ports::{FeatureProvider, HyperparameterSearch, Hyperparameters, ModelTrainer};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything one walk-forward run over a single series produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardReport {
    pub symbol: String,
    pub settings: WalkForwardSettings,
    /// Completed windows in window order
    pub windows: Vec<WindowResult>,
    pub skipped: Vec<SkippedWindow>,
    pub aggregate: AggregateResult,
}

/// Drives the window loop: features and labels per window, chronological
/// train/validation split, training (optionally after a hyperparameter
/// search), ensemble weighting when several models are trained, and the
/// threshold scan.
///
/// Windows are independent of each other and the input series is only ever
/// borrowed. A window that fails for any reason is recorded as skipped; the
/// run itself only fails when no window completes.
pub struct WalkForwardOrchestrator {
    settings: WalkForwardSettings,
    feature_provider: Arc<dyn FeatureProvider>,
    trainers: Vec<Arc<dyn ModelTrainer>>,
    search: Option<Arc<dyn HyperparameterSearch>>,
    labeler: LabelGenerator,
}

impl WalkForwardOrchestrator {
    pub fn new(
        settings: WalkForwardSettings,
        feature_provider: Arc<dyn FeatureProvider>,
    ) -> Result<Self, EvaluationError> {
        settings.validate()?;
        let labeler = LabelGenerator::new(
            settings.label_horizon,
            settings.label_return_threshold,
            settings.tail_label_policy,
        )?;

        Ok(Self {
            settings,
            feature_provider,
            trainers: Vec::new(),
            search: None,
            labeler,
        })
    }

    pub fn with_trainer(mut self, trainer: Arc<dyn ModelTrainer>) -> Self {
        self.trainers.push(trainer);
        self
    }

    pub fn with_search(mut self, search: Arc<dyn HyperparameterSearch>) -> Self {
        self.search = Some(search);
        self
    }

    pub fn settings(&self) -> &WalkForwardSettings {
        &self.settings
    }

    pub fn splitter(&self, series_len: usize) -> Result<WindowSplitter, EvaluationError> {
        WindowSplitter::new(
            series_len,
            self.settings.window_size,
            self.settings.step_size,
            self.settings.window_overlap,
        )
    }

    /// Evaluates the windows one after another on the calling thread.
    pub fn run(&self, series: &PriceSeries) -> Result<WalkForwardReport, EvaluationError> {
        let windows = self.plan(series)?;
        let outcomes = windows
            .iter()
            .map(|window| (*window, self.evaluate_window(series.bars(), window)))
            .collect();
        self.finish(series, outcomes)
    }

    /// Evaluates windows concurrently on a bounded rayon pool of
    /// `settings.workers` threads (rayon's default when 0). Results are
    /// re-sorted by window index before aggregation, so the report matches
    /// [`WalkForwardOrchestrator::run`].
    pub fn run_parallel(&self, series: &PriceSeries) -> Result<WalkForwardReport, EvaluationError> {
        let windows = self.plan(series)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.workers)
            .build()
            .map_err(|e| EvaluationError::config(format!("Failed to build worker pool: {}", e)))?;

        let outcomes = pool.install(|| {
            windows
                .par_iter()
                .map(|window| (*window, self.evaluate_window(series.bars(), window)))
                .collect::<Vec<_>>()
        });
        self.finish(series, outcomes)
    }

    fn plan(&self, series: &PriceSeries) -> Result<Vec<Window>, EvaluationError> {
        if self.trainers.is_empty() {
            return Err(EvaluationError::config("no model trainers registered"));
        }
        if series.len() < self.settings.window_size {
            return Err(EvaluationError::DataInsufficient {
                len: series.len(),
                required: self.settings.window_size,
            });
        }

        let windows: Vec<Window> = self.splitter(series.len())?.iter().collect();
        info!(
            "Walk-forward for {}: {} bars, {} windows (size {}, step {}, {})",
            series.symbol(),
            series.len(),
            windows.len(),
            self.settings.window_size,
            self.settings.step_size,
            self.settings.window_overlap
        );
        Ok(windows)
    }

    fn finish(
        &self,
        series: &PriceSeries,
        mut outcomes: Vec<(Window, Result<WindowResult, EvaluationError>)>,
    ) -> Result<WalkForwardReport, EvaluationError> {
        outcomes.sort_by_key(|(window, _)| window.index);

        let mut windows = Vec::new();
        let mut skipped = Vec::new();
        for (window, outcome) in outcomes {
            match outcome {
                Ok(result) => windows.push(result),
                Err(e) => {
                    warn!(
                        "Skipping window {} [{}..{}) for {}: {}",
                        window.index + 1,
                        window.start,
                        window.end,
                        series.symbol(),
                        e
                    );
                    skipped.push(SkippedWindow {
                        window_index: window.index + 1,
                        start: window.start,
                        end: window.end,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if windows.is_empty() {
            return Err(EvaluationError::AllWindowsSkipped {
                symbol: series.symbol().to_string(),
                skipped: skipped.len(),
            });
        }

        let aggregate =
            AggregateResult::from_windows(&windows, skipped.len(), self.settings.window_overlap);
        info!(
            "{}: {} windows completed, {} skipped, {} trades, win rate {:.2}%",
            series.symbol(),
            aggregate.windows_completed,
            aggregate.windows_skipped,
            aggregate.total_trades,
            aggregate.overall_win_rate * 100.0
        );

        Ok(WalkForwardReport {
            symbol: series.symbol().to_string(),
            settings: self.settings.clone(),
            windows,
            skipped,
            aggregate,
        })
    }

    /// Builds the usable dataset for one window from its bars only.
    fn window_dataset(&self, bars: &[Candle]) -> Result<Dataset, EvaluationError> {
        let matrix = self.feature_provider.compute(bars)?;
        let closes: Vec<f64> = bars.iter().map(Candle::close_f64).collect();
        let labels = self.labeler.generate(&closes);
        Dataset::from_complete_rows(matrix, &labels)
    }

    fn evaluate_window(
        &self,
        bars: &[Candle],
        window: &Window,
    ) -> Result<WindowResult, EvaluationError> {
        let dataset = self.window_dataset(&bars[window.start..window.end])?;
        if dataset.len() < self.settings.min_rows {
            return Err(EvaluationError::DataInsufficient {
                len: dataset.len(),
                required: self.settings.min_rows,
            });
        }

        let (train, validation) = dataset.chronological_split(self.settings.validation_fraction)?;
        debug!(
            "Window {}: {} train rows, {} validation rows",
            window.index + 1,
            train.len(),
            validation.len()
        );

        let mut hyperparameters: BTreeMap<String, Hyperparameters> = BTreeMap::new();
        let mut search_scores = Vec::new();
        let mut members = Vec::with_capacity(self.trainers.len());

        for trainer in &self.trainers {
            let params = match (&self.search, self.settings.hpo_trials) {
                (Some(search), trials) if trials > 0 => {
                    let outcome =
                        search.search(trainer.as_ref(), &train, &validation, trials)?;
                    search_scores.push(outcome.best_score);
                    outcome.best_params
                }
                _ => trainer.default_hyperparameters(),
            };

            let model = trainer.fit(&train, &params)?;
            let probabilities = model.predict_proba(validation.features())?;
            if probabilities.len() != validation.len() {
                return Err(EvaluationError::misaligned(
                    "validation rows vs predictions",
                    validation.len(),
                    probabilities.len(),
                ));
            }

            hyperparameters.insert(trainer.name().to_string(), params);
            members.push((trainer.name().to_string(), probabilities));
        }

        let (probabilities, ensemble_weights) = self.blend(validation.labels(), members)?;
        let metrics = ClassificationMetrics::evaluate(validation.labels(), &probabilities);
        let selection = ThresholdOptimizer::new(self.settings.min_trades)
            .optimize_sorted(validation.labels(), &probabilities)?;

        let score = (!search_scores.is_empty())
            .then(|| search_scores.iter().sum::<f64>() / search_scores.len() as f64);

        info!(
            "Window {} [{}..{}): threshold {:.2}, {} trades, win rate {:.2}%",
            window.index + 1,
            window.start,
            window.end,
            selection.threshold,
            selection.trades,
            selection.win_rate * 100.0
        );

        Ok(WindowResult {
            window_index: window.index + 1,
            start: window.start,
            end: window.end,
            train_rows: train.len(),
            validation_rows: validation.len(),
            accuracy: metrics.accuracy,
            precision: metrics.precision,
            recall: metrics.recall,
            threshold: selection.threshold,
            trades: selection.trades,
            wins: selection.wins,
            losses: selection.losses(),
            win_rate: selection.win_rate,
            hyperparameters,
            score,
            ensemble_weights,
        })
    }

    /// A single model is used as is; several are combined with weights
    /// learned on this window's validation slice.
    fn blend(
        &self,
        labels: &[u8],
        mut members: Vec<(String, Vec<f64>)>,
    ) -> Result<(Vec<f64>, Option<EnsembleWeights>), EvaluationError> {
        if members.len() == 1 {
            let (_, probabilities) = members.remove(0);
            return Ok((probabilities, None));
        }

        let weights = EnsembleWeightLearner::learn(labels, &members)?;
        let member_probabilities: Vec<Vec<f64>> = members.into_iter().map(|(_, p)| p).collect();
        let combined = weights.combine(&member_probabilities)?;
        Ok((combined, Some(weights)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ml::dataset::FeatureMatrix;
    use crate::domain::optimization::window_splitter::WindowOverlap;
    use crate::domain::ports::{ParameterRange, ProbabilityModel, SearchOutcome};
    use rust_decimal_macros::dec;

    /// One feature: 1 on even bars, 0 on odd bars. Uses nothing but the bar
    /// position, so it cannot leak future prices.
    struct EvenBar;

    impl FeatureProvider for EvenBar {
        fn feature_names(&self) -> Vec<String> {
            vec!["even_bar".to_string()]
        }

        fn compute(&self, bars: &[Candle]) -> Result<FeatureMatrix, EvaluationError> {
            let rows = (0..bars.len()).map(|i| vec![((i + 1) % 2) as f64]).collect();
            FeatureMatrix::new(self.feature_names(), rows)
        }
    }

    /// Probability equals the single feature scaled into [0.1, 0.9].
    struct EchoModel;

    impl ProbabilityModel for EchoModel {
        fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, EvaluationError> {
            Ok(features.iter().map(|r| 0.1 + 0.8 * r[0]).collect())
        }
    }

    struct EchoTrainer(&'static str);

    impl ModelTrainer for EchoTrainer {
        fn name(&self) -> &str {
            self.0
        }

        fn default_hyperparameters(&self) -> Hyperparameters {
            Hyperparameters::from([("depth".to_string(), 1.0)])
        }

        fn search_space(&self) -> Vec<ParameterRange> {
            vec![]
        }

        fn fit(
            &self,
            _train: &Dataset,
            _hyperparameters: &Hyperparameters,
        ) -> Result<Box<dyn ProbabilityModel>, EvaluationError> {
            Ok(Box::new(EchoModel))
        }
    }

    struct FixedSearch;

    impl HyperparameterSearch for FixedSearch {
        fn search(
            &self,
            _trainer: &dyn ModelTrainer,
            _train: &Dataset,
            _validation: &Dataset,
            trial_budget: usize,
        ) -> Result<SearchOutcome, EvaluationError> {
            Ok(SearchOutcome {
                best_params: Hyperparameters::from([("depth".to_string(), trial_budget as f64)]),
                best_score: 0.8,
            })
        }
    }

    /// Zig-zag closes: up 2% after even bars, down 1% after odd bars, so
    /// horizon-1 labels are 1 exactly on even bars.
    fn zigzag(n: usize) -> PriceSeries {
        let mut close = dec!(100);
        let bars = (0..n)
            .map(|i| {
                let bar = Candle {
                    symbol: "TEST".to_string(),
                    open: close,
                    high: close * dec!(1.03),
                    low: close * dec!(0.97),
                    close,
                    volume: dec!(10),
                    timestamp: i as i64,
                };
                close = if i % 2 == 0 {
                    (close * dec!(1.02)).round_dp(8)
                } else {
                    (close * dec!(0.99)).round_dp(8)
                };
                bar
            })
            .collect();
        PriceSeries::new("TEST", bars).unwrap()
    }

    fn settings() -> WalkForwardSettings {
        WalkForwardSettings {
            window_size: 200,
            step_size: 100,
            min_rows: 100,
            min_trades: 5,
            label_horizon: 1,
            label_return_threshold: 0.005,
            hpo_trials: 0,
            workers: 2,
            ..Default::default()
        }
    }

    fn orchestrator(settings: WalkForwardSettings) -> WalkForwardOrchestrator {
        WalkForwardOrchestrator::new(settings, Arc::new(EvenBar))
            .unwrap()
            .with_trainer(Arc::new(EchoTrainer("echo")))
    }

    #[test]
    fn test_windows_in_order_with_exact_aggregate() {
        let report = orchestrator(settings()).run(&zigzag(400)).unwrap();

        assert_eq!(report.windows.len(), 3);
        let indices: Vec<usize> = report.windows.iter().map(|w| w.window_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
        assert_eq!(report.windows[1].start, 100);
        assert_eq!(report.windows[1].end, 300);

        let summed: usize = report.windows.iter().map(|w| w.trades).sum();
        assert_eq!(report.aggregate.total_trades, summed);
        assert!(report.aggregate.windows_share_rows);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_perfect_feature_selects_clean_threshold() {
        let report = orchestrator(settings()).run(&zigzag(200)).unwrap();
        let window = &report.windows[0];

        // Validation is the last 40 rows: 20 even bars at p=0.9, 20 odd at p=0.1
        assert_eq!(window.validation_rows, 40);
        assert_eq!(window.threshold, 0.50);
        assert_eq!(window.trades, 20);
        assert_eq!(window.wins, 20);
        assert_eq!(window.win_rate, 1.0);
        assert_eq!(window.hyperparameters["echo"]["depth"], 1.0);
        assert!(window.ensemble_weights.is_none());
        assert!(window.score.is_none());
    }

    #[test]
    fn test_parallel_run_matches_sequential() {
        let series = zigzag(700);
        let orchestrator = orchestrator(settings());
        let sequential = orchestrator.run(&series).unwrap();
        let parallel = orchestrator.run_parallel(&series).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_short_series_is_insufficient() {
        let err = orchestrator(settings()).run(&zigzag(150)).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::DataInsufficient {
                len: 150,
                required: 200
            }
        );
    }

    #[test]
    fn test_windows_below_min_rows_are_skipped() {
        let settings = WalkForwardSettings {
            min_rows: 500,
            ..settings()
        };
        let err = orchestrator(settings).run(&zigzag(400)).unwrap_err();
        assert_eq!(
            err,
            EvaluationError::AllWindowsSkipped {
                symbol: "TEST".to_string(),
                skipped: 3
            }
        );
    }

    #[test]
    fn test_multiple_trainers_learn_ensemble_weights() {
        let settings = WalkForwardSettings {
            hpo_trials: 4,
            ..settings()
        };
        let orchestrator = WalkForwardOrchestrator::new(settings, Arc::new(EvenBar))
            .unwrap()
            .with_trainer(Arc::new(EchoTrainer("echo")))
            .with_trainer(Arc::new(EchoTrainer("echo_b")))
            .with_search(Arc::new(FixedSearch));

        let report = orchestrator.run(&zigzag(200)).unwrap();
        let window = &report.windows[0];
        let weights = window.ensemble_weights.as_ref().unwrap();

        assert_eq!(weights.members.len(), 2);
        assert!((weights.weights().iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert_eq!(window.score, Some(0.8));
        assert_eq!(window.hyperparameters["echo_b"]["depth"], 4.0);
    }

    #[test]
    fn test_disjoint_overlap_policy() {
        let settings = WalkForwardSettings {
            window_overlap: WindowOverlap::Disjoint,
            ..settings()
        };
        let report = orchestrator(settings).run(&zigzag(400)).unwrap();
        assert_eq!(report.windows.len(), 2);
        assert!(!report.aggregate.windows_share_rows);
        assert_eq!(report.aggregate.overlap, WindowOverlap::Disjoint);
    }

    #[test]
    fn test_no_trainers_is_a_config_error() {
        let orchestrator = WalkForwardOrchestrator::new(settings(), Arc::new(EvenBar)).unwrap();
        assert!(matches!(
            orchestrator.run(&zigzag(400)),
            Err(EvaluationError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let bad = WalkForwardSettings {
            step_size: 0,
            ..settings()
        };
        assert!(WalkForwardOrchestrator::new(bad, Arc::new(EvenBar)).is_err());
    }
}
