use crate::domain::errors::EvaluationError;
use crate::domain::ml::dataset::Dataset;
use crate::domain::ports::{Hyperparameters, ModelTrainer, ParameterRange, ProbabilityModel};
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use tracing::debug;

pub type ForestRegressor = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;
pub type TreeRegressor = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

pub const RANDOM_FOREST: &str = "random_forest";
pub const DECISION_TREE: &str = "decision_tree";

fn param(params: &Hyperparameters, key: &str, default: f64) -> f64 {
    params.get(key).copied().unwrap_or(default)
}

fn to_matrix(model: &str, features: &[Vec<f64>]) -> Result<DenseMatrix<f64>, EvaluationError> {
    DenseMatrix::from_2d_vec(&features.to_vec())
        .map_err(|e| EvaluationError::training(model, format!("Matrix error: {}", e)))
}

fn targets(train: &Dataset) -> Vec<f64> {
    train.labels().iter().map(|&y| f64::from(y)).collect()
}

fn check_trainable(model: &str, train: &Dataset) -> Result<(), EvaluationError> {
    if train.is_empty() {
        return Err(EvaluationError::training(model, "empty training set"));
    }
    Ok(())
}

/// A smartcore regressor fitted on 0/1 targets; its output, clamped to
/// `[0, 1]`, is the up-probability.
#[derive(Serialize, Deserialize)]
pub enum SmartcoreModel {
    Forest(ForestRegressor),
    Tree(TreeRegressor),
}

impl SmartcoreModel {
    fn name(&self) -> &'static str {
        match self {
            SmartcoreModel::Forest(_) => RANDOM_FOREST,
            SmartcoreModel::Tree(_) => DECISION_TREE,
        }
    }
}

impl ProbabilityModel for SmartcoreModel {
    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, EvaluationError> {
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let x = to_matrix(self.name(), features)?;
        let raw = match self {
            SmartcoreModel::Forest(model) => model.predict(&x),
            SmartcoreModel::Tree(model) => model.predict(&x),
        }
        .map_err(|e| EvaluationError::training(self.name(), format!("Predict error: {}", e)))?;

        Ok(raw.into_iter().map(|p| p.clamp(0.0, 1.0)).collect())
    }
}

/// Random forest regressor over `n_trees`, `max_depth`, `min_samples_split`.
#[derive(Debug, Clone, Default)]
pub struct RandomForestTrainer;

impl RandomForestTrainer {
    pub fn train(
        &self,
        train: &Dataset,
        hyperparameters: &Hyperparameters,
    ) -> Result<SmartcoreModel, EvaluationError> {
        check_trainable(RANDOM_FOREST, train)?;
        let n_trees = param(hyperparameters, "n_trees", 100.0).max(1.0) as usize;
        let max_depth = param(hyperparameters, "max_depth", 6.0).clamp(1.0, u16::MAX as f64) as u16;
        let min_split = param(hyperparameters, "min_samples_split", 5.0).max(2.0) as usize;

        debug!(
            "Training Random Forest Regressor (Trees: {}, Depth: {}, MinSplit: {}) on {} rows",
            n_trees,
            max_depth,
            min_split,
            train.len()
        );

        let x = to_matrix(RANDOM_FOREST, train.features())?;
        let params = RandomForestRegressorParameters::default()
            .with_n_trees(n_trees)
            .with_max_depth(max_depth)
            .with_min_samples_split(min_split);
        let model = RandomForestRegressor::fit(&x, &targets(train), params)
            .map_err(|e| EvaluationError::training(RANDOM_FOREST, format!("Training error: {}", e)))?;

        Ok(SmartcoreModel::Forest(model))
    }
}

impl ModelTrainer for RandomForestTrainer {
    fn name(&self) -> &str {
        RANDOM_FOREST
    }

    fn default_hyperparameters(&self) -> Hyperparameters {
        Hyperparameters::from([
            ("n_trees".to_string(), 100.0),
            ("max_depth".to_string(), 6.0),
            ("min_samples_split".to_string(), 5.0),
        ])
    }

    fn search_space(&self) -> Vec<ParameterRange> {
        vec![
            ParameterRange::integer("n_trees", 50, 300),
            ParameterRange::integer("max_depth", 3, 8),
            ParameterRange::integer("min_samples_split", 2, 20),
        ]
    }

    fn fit(
        &self,
        train: &Dataset,
        hyperparameters: &Hyperparameters,
    ) -> Result<Box<dyn ProbabilityModel>, EvaluationError> {
        Ok(Box::new(self.train(train, hyperparameters)?))
    }
}

/// Single regression tree over `max_depth`, `min_samples_split`.
#[derive(Debug, Clone, Default)]
pub struct DecisionTreeTrainer;

impl ModelTrainer for DecisionTreeTrainer {
    fn name(&self) -> &str {
        DECISION_TREE
    }

    fn default_hyperparameters(&self) -> Hyperparameters {
        Hyperparameters::from([
            ("max_depth".to_string(), 5.0),
            ("min_samples_split".to_string(), 10.0),
        ])
    }

    fn search_space(&self) -> Vec<ParameterRange> {
        vec![
            ParameterRange::integer("max_depth", 3, 8),
            ParameterRange::integer("min_samples_split", 2, 40),
        ]
    }

    fn fit(
        &self,
        train: &Dataset,
        hyperparameters: &Hyperparameters,
    ) -> Result<Box<dyn ProbabilityModel>, EvaluationError> {
        check_trainable(DECISION_TREE, train)?;
        let max_depth = param(hyperparameters, "max_depth", 5.0).clamp(1.0, u16::MAX as f64) as u16;
        let min_split = param(hyperparameters, "min_samples_split", 10.0).max(2.0) as usize;

        let x = to_matrix(DECISION_TREE, train.features())?;
        let params = DecisionTreeRegressorParameters::default()
            .with_max_depth(max_depth)
            .with_min_samples_split(min_split);
        let model = DecisionTreeRegressor::fit(&x, &targets(train), params)
            .map_err(|e| EvaluationError::training(DECISION_TREE, format!("Training error: {}", e)))?;

        Ok(Box::new(SmartcoreModel::Tree(model)))
    }
}
