// Walk-forward windowing, threshold search and ensemble weighting
pub mod adaptive_threshold;
pub mod ensemble_weights;
pub mod settings;
pub mod threshold_optimizer;
pub mod window_splitter;
