pub mod feature_provider;
pub mod hyperparameter_search;
pub mod model_registry;
pub mod smartcore_trainer;
