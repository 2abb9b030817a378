use crate::domain::errors::EvaluationError;
use serde::{Deserialize, Serialize};

/// Numeric feature table aligned 1:1 with the bars it was built from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, EvaluationError> {
        if let Some(row) = rows.iter().find(|r| r.len() != names.len()) {
            return Err(EvaluationError::misaligned(
                "feature row width vs feature names",
                row.len(),
                names.len(),
            ));
        }
        Ok(Self { names, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }
}

/// Aligned features and binary labels for one slice of a window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    features: Vec<Vec<f64>>,
    labels: Vec<u8>,
}

impl Dataset {
    pub fn new(features: Vec<Vec<f64>>, labels: Vec<u8>) -> Result<Self, EvaluationError> {
        if features.len() != labels.len() {
            return Err(EvaluationError::misaligned(
                "features vs labels",
                features.len(),
                labels.len(),
            ));
        }
        Ok(Self { features, labels })
    }

    /// Joins a feature matrix with per-row labels, dropping rows whose label is
    /// missing or whose features contain a non-finite value.
    pub fn from_complete_rows(
        matrix: FeatureMatrix,
        labels: &[Option<u8>],
    ) -> Result<Self, EvaluationError> {
        if matrix.len() != labels.len() {
            return Err(EvaluationError::misaligned(
                "feature rows vs labels",
                matrix.len(),
                labels.len(),
            ));
        }

        let (features, labels): (Vec<_>, Vec<_>) = matrix
            .rows
            .into_iter()
            .zip(labels.iter().copied())
            .filter_map(|(row, label)| {
                let label = label?;
                row.iter().all(|v| v.is_finite()).then_some((row, label))
            })
            .unzip();

        Ok(Self { features, labels })
    }

    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    pub fn labels(&self) -> &[u8] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn positive_count(&self) -> usize {
        self.labels.iter().filter(|&&y| y == 1).count()
    }

    /// Splits in time order: the first rows train, the last
    /// `ceil(len * validation_fraction)` rows validate. No shuffling.
    pub fn chronological_split(
        &self,
        validation_fraction: f64,
    ) -> Result<(Dataset, Dataset), EvaluationError> {
        if !(validation_fraction > 0.0 && validation_fraction < 1.0) {
            return Err(EvaluationError::config(format!(
                "validation fraction must be in (0, 1), got {}",
                validation_fraction
            )));
        }

        let n = self.len();
        let n_validation = (n as f64 * validation_fraction).ceil() as usize;
        let n_train = n.saturating_sub(n_validation);
        if n_train == 0 || n_validation == 0 {
            return Err(EvaluationError::DataInsufficient {
                len: n,
                required: 2,
            });
        }

        let train = Dataset {
            features: self.features[..n_train].to_vec(),
            labels: self.labels[..n_train].to_vec(),
        };
        let validation = Dataset {
            features: self.features[n_train..].to_vec(),
            labels: self.labels[n_train..].to_vec(),
        };
        Ok((train, validation))
    }
}
