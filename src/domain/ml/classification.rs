use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Probability cutoff for the hard-label metrics.
pub const DECISION_CUTOFF: f64 = 0.5;

/// Hard-label metrics of a probability vector; a row is predicted positive
/// when its probability is strictly above [`DECISION_CUTOFF`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

impl ClassificationMetrics {
    /// Undefined ratios (no predicted or no actual positives) are reported as 0.
    pub fn evaluate(labels: &[u8], probabilities: &[f64]) -> Self {
        let (mut tp, mut fp, mut tn, mut fn_) = (0usize, 0usize, 0usize, 0usize);
        for (&y, &p) in labels.iter().zip(probabilities) {
            match (p > DECISION_CUTOFF, y == 1) {
                (true, true) => tp += 1,
                (true, false) => fp += 1,
                (false, false) => tn += 1,
                (false, true) => fn_ += 1,
            }
        }

        let total = tp + fp + tn + fn_;
        Self {
            accuracy: ratio(tp + tn, total),
            precision: ratio(tp, tp + fp),
            recall: ratio(tp, tp + fn_),
        }
    }

    /// Objective maximised by the hyperparameter search.
    pub fn balanced_score(&self) -> f64 {
        0.5 * self.precision + 0.5 * self.recall
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Area under the ROC curve via the Mann-Whitney U statistic, with tied
/// scores sharing their average rank.
///
/// Returns `None` when the labels hold a single class.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> Option<f64> {
    let n = labels.len().min(scores.len());
    let positives = labels[..n].iter().filter(|&&y| y == 1).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].partial_cmp(&scores[b]).unwrap_or(Ordering::Equal));

    let mut positive_rank_sum = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && scores[order[j]] == scores[order[i]] {
            j += 1;
        }
        // Ranks are 1-based: the tie group i..j shares the mean of i+1..=j
        let average_rank = (i + 1 + j) as f64 / 2.0;
        for &idx in &order[i..j] {
            if labels[idx] == 1 {
                positive_rank_sum += average_rank;
            }
        }
        i = j;
    }

    let pos = positives as f64;
    let u = positive_rank_sum - pos * (pos + 1.0) / 2.0;
    Some(u / (pos * negatives as f64))
}
