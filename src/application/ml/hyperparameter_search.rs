use crate::domain::errors::EvaluationError;
use crate::domain::ml::classification::ClassificationMetrics;
use crate::domain::ml::dataset::Dataset;
use crate::domain::ports::{
    Hyperparameters, HyperparameterSearch, ModelTrainer, ParameterRange, SearchOutcome,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, warn};

/// Seeded random search over a trainer's search space.
///
/// Each trial fits on the training slice and is scored on the validation
/// slice with `0.5 * precision + 0.5 * recall` at the 0.5 cutoff. The first
/// trial always uses the trainer's defaults. For a fixed seed and trainer the
/// sampled trials are identical on every call, whatever thread runs them.
#[derive(Debug, Clone)]
pub struct RandomSearch {
    seed: u64,
}

impl RandomSearch {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, trainer: &str) -> StdRng {
        // FNV-1a over the trainer name keeps streams distinct per model
        let salt = trainer
            .bytes()
            .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
            });
        StdRng::seed_from_u64(self.seed ^ salt)
    }

    fn sample(rng: &mut StdRng, space: &[ParameterRange], base: &Hyperparameters) -> Hyperparameters {
        let mut params = base.clone();
        for range in space {
            let value = if range.high <= range.low {
                range.low
            } else if range.integer {
                rng.random_range(range.low as i64..=range.high as i64) as f64
            } else {
                rng.random_range(range.low..range.high)
            };
            params.insert(range.name.clone(), value);
        }
        params
    }

    fn score(
        trainer: &dyn ModelTrainer,
        train: &Dataset,
        validation: &Dataset,
        params: &Hyperparameters,
    ) -> Result<f64, EvaluationError> {
        let model = trainer.fit(train, params)?;
        let probabilities = model.predict_proba(validation.features())?;
        Ok(ClassificationMetrics::evaluate(validation.labels(), &probabilities).balanced_score())
    }
}

impl HyperparameterSearch for RandomSearch {
    fn search(
        &self,
        trainer: &dyn ModelTrainer,
        train: &Dataset,
        validation: &Dataset,
        trial_budget: usize,
    ) -> Result<SearchOutcome, EvaluationError> {
        let defaults = trainer.default_hyperparameters();
        let space = trainer.search_space();
        let mut rng = self.rng_for(trainer.name());

        let mut best: Option<SearchOutcome> = None;
        let mut last_error = None;

        for trial in 0..trial_budget.max(1) {
            let params = if trial == 0 {
                defaults.clone()
            } else {
                Self::sample(&mut rng, &space, &defaults)
            };

            match Self::score(trainer, train, validation, &params) {
                Ok(score) => {
                    debug!("{} trial {}: score {:.4}", trainer.name(), trial, score);
                    if best.as_ref().is_none_or(|b| score > b.best_score) {
                        best = Some(SearchOutcome {
                            best_params: params,
                            best_score: score,
                        });
                    }
                }
                Err(e) => {
                    warn!("{} trial {} failed: {}", trainer.name(), trial, e);
                    last_error = Some(e);
                }
            }
        }

        best.ok_or_else(|| {
            last_error.unwrap_or_else(|| EvaluationError::training(trainer.name(), "no trials ran"))
        })
    }
}
