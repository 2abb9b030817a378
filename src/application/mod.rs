// Feature extraction, model training and the pair model registry
pub mod ml;

// Live regime-aware signal routing
pub mod signals;

// Walk-forward evaluation loop and batch runner
pub mod walkforward;
