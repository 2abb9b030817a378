use thiserror::Error;

/// Errors raised while validating a price series
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SeriesError {
    #[error("Price series for {symbol} is empty")]
    Empty { symbol: String },

    #[error("Timestamps for {symbol} not strictly increasing at row {index}: {previous} -> {current}")]
    NonMonotonicTimestamp {
        symbol: String,
        index: usize,
        previous: i64,
        current: i64,
    },

    #[error("Invalid bar for {symbol} at row {index}")]
    InvalidBar { symbol: String, index: usize },
}

/// Errors related to walk-forward evaluation and the decision engine
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvaluationError {
    #[error("Insufficient data: {len} rows available, {required} required")]
    DataInsufficient { len: usize, required: usize },

    #[error("All {skipped} windows skipped for {symbol}")]
    AllWindowsSkipped { symbol: String, skipped: usize },

    #[error("Model training failed for {model}: {reason}")]
    ModelTrainingFailure { model: String, reason: String },

    #[error("Misaligned {what}: {left} vs {right}")]
    MisalignedInputs {
        what: String,
        left: usize,
        right: usize,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl EvaluationError {
    pub fn training(model: &str, reason: impl ToString) -> Self {
        Self::ModelTrainingFailure {
            model: model.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn misaligned(what: &str, left: usize, right: usize) -> Self {
        Self::MisalignedInputs {
            what: what.to_string(),
            left,
            right,
        }
    }
}
