use crate::domain::errors::EvaluationError;
use crate::domain::ml::classification::{ClassificationMetrics, roc_auc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which metric produced a member's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreKind {
    Auc,
    /// Accuracy at 0.5, used when the validation slice holds a single class.
    Accuracy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberWeight {
    pub name: String,
    pub score: f64,
    pub score_kind: ScoreKind,
    pub weight: f64,
}

/// Convex combination weights for one window's ensemble.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleWeights {
    pub members: Vec<MemberWeight>,
}

impl EnsembleWeights {
    pub fn weights(&self) -> Vec<f64> {
        self.members.iter().map(|m| m.weight).collect()
    }

    /// Row-wise weighted sum of member probabilities, members in the same
    /// order they were learned.
    pub fn combine(&self, member_probabilities: &[Vec<f64>]) -> Result<Vec<f64>, EvaluationError> {
        if member_probabilities.len() != self.members.len() {
            return Err(EvaluationError::misaligned(
                "ensemble members vs probability vectors",
                self.members.len(),
                member_probabilities.len(),
            ));
        }
        let rows = member_probabilities.first().map_or(0, Vec::len);
        if let Some(bad) = member_probabilities.iter().find(|p| p.len() != rows) {
            return Err(EvaluationError::misaligned("member probability rows", rows, bad.len()));
        }

        let mut combined = vec![0.0; rows];
        for (member, probabilities) in self.members.iter().zip(member_probabilities) {
            for (acc, p) in combined.iter_mut().zip(probabilities) {
                *acc += member.weight * p;
            }
        }
        Ok(combined)
    }
}

/// Learns per-model weights from validation discriminative power.
///
/// Each model is scored by ROC-AUC, or by accuracy at 0.5 when AUC is
/// undefined, and the scores go through a max-shifted softmax. Every call is
/// independent; nothing carries over between windows.
pub struct EnsembleWeightLearner;

impl EnsembleWeightLearner {
    pub fn learn(
        labels: &[u8],
        members: &[(String, Vec<f64>)],
    ) -> Result<EnsembleWeights, EvaluationError> {
        if members.len() < 2 {
            return Err(EvaluationError::config(format!(
                "ensemble needs at least 2 models, got {}",
                members.len()
            )));
        }

        let mut scored = Vec::with_capacity(members.len());
        for (name, probabilities) in members {
            if probabilities.len() != labels.len() {
                return Err(EvaluationError::misaligned(
                    "validation labels vs member probabilities",
                    labels.len(),
                    probabilities.len(),
                ));
            }
            let (score, score_kind) = match roc_auc(labels, probabilities) {
                Some(auc) => (auc, ScoreKind::Auc),
                None => {
                    debug!("AUC undefined for {} (single-class slice), using accuracy", name);
                    let accuracy = ClassificationMetrics::evaluate(labels, probabilities).accuracy;
                    (accuracy, ScoreKind::Accuracy)
                }
            };
            scored.push((name.clone(), score, score_kind));
        }

        let scores: Vec<f64> = scored.iter().map(|(_, score, _)| *score).collect();
        let weights = Self::weights_from_scores(&scores);

        Ok(EnsembleWeights {
            members: scored
                .into_iter()
                .zip(weights)
                .map(|((name, score, score_kind), weight)| MemberWeight {
                    name,
                    score,
                    score_kind,
                    weight,
                })
                .collect(),
        })
    }

    /// Softmax with the maximum subtracted first. Empty input gives empty output.
    pub fn weights_from_scores(scores: &[f64]) -> Vec<f64> {
        let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        exps.into_iter().map(|e| e / total).collect()
    }
}
