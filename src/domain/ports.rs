use crate::domain::errors::EvaluationError;
use crate::domain::market::price_series::{Candle, PriceSeries};
use crate::domain::ml::dataset::{Dataset, FeatureMatrix};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Named numeric hyperparameters; integer-valued ones are stored as whole f64s.
pub type Hyperparameters = BTreeMap<String, f64>;

pub trait PriceSeriesLoader: Send + Sync {
    fn load(&self, symbol: &str) -> Result<PriceSeries>;
}

/// Produces a feature table aligned 1:1 with the given bars.
///
/// Implementations may only look at `bars` themselves, never at rows after
/// the last bar.
pub trait FeatureProvider: Send + Sync {
    fn feature_names(&self) -> Vec<String>;
    fn compute(&self, bars: &[Candle]) -> Result<FeatureMatrix, EvaluationError>;
}

/// A fitted model returning up-probabilities in `[0, 1]`.
pub trait ProbabilityModel: Send + Sync {
    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, EvaluationError>;
}

/// Bounded range one hyperparameter is searched over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterRange {
    pub name: String,
    pub low: f64,
    pub high: f64,
    pub integer: bool,
}

impl ParameterRange {
    pub fn integer(name: &str, low: i64, high: i64) -> Self {
        Self {
            name: name.to_string(),
            low: low as f64,
            high: high as f64,
            integer: true,
        }
    }

    pub fn continuous(name: &str, low: f64, high: f64) -> Self {
        Self {
            name: name.to_string(),
            low,
            high,
            integer: false,
        }
    }
}

pub trait ModelTrainer: Send + Sync {
    fn name(&self) -> &str;
    fn default_hyperparameters(&self) -> Hyperparameters;
    fn search_space(&self) -> Vec<ParameterRange>;
    fn fit(
        &self,
        train: &Dataset,
        hyperparameters: &Hyperparameters,
    ) -> Result<Box<dyn ProbabilityModel>, EvaluationError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub best_params: Hyperparameters,
    pub best_score: f64,
}

pub trait HyperparameterSearch: Send + Sync {
    fn search(
        &self,
        trainer: &dyn ModelTrainer,
        train: &Dataset,
        validation: &Dataset,
        trial_budget: usize,
    ) -> Result<SearchOutcome, EvaluationError>;
}
