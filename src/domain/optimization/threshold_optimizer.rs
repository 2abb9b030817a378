use crate::domain::errors::EvaluationError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Number of thresholds scanned over `[0.50, 0.95]`.
pub const THRESHOLD_CANDIDATES: usize = 10;
/// Threshold reported when no candidate reaches the minimum trade count.
pub const FALLBACK_THRESHOLD: f64 = 0.60;
pub const DEFAULT_MIN_TRADES: usize = 10;

/// The ascending candidate grid `0.50, 0.55, ..., 0.95`.
pub fn threshold_candidates() -> [f64; THRESHOLD_CANDIDATES] {
    std::array::from_fn(|i| (50 + 5 * i) as f64 / 100.0)
}

/// Outcome of a threshold scan on one validation slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSelection {
    pub threshold: f64,
    pub win_rate: f64,
    pub trades: usize,
    pub wins: usize,
}

impl ThresholdSelection {
    pub fn fallback() -> Self {
        Self {
            threshold: FALLBACK_THRESHOLD,
            win_rate: 0.0,
            trades: 0,
            wins: 0,
        }
    }

    pub fn losses(&self) -> usize {
        self.trades - self.wins
    }
}

/// Picks the probability threshold with the highest validation win rate
/// among those that trigger at least `min_trades` trades.
///
/// A row trades when `p > threshold` (strict). Candidates are scanned in
/// ascending order and a later candidate only replaces the current best on a
/// strictly greater win rate, so ties keep the lowest threshold.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdOptimizer {
    min_trades: usize,
}

impl Default for ThresholdOptimizer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_TRADES)
    }
}

impl ThresholdOptimizer {
    pub fn new(min_trades: usize) -> Self {
        Self {
            min_trades: min_trades.max(1),
        }
    }

    /// Brute-force scan, `O(candidates * rows)`.
    pub fn optimize(
        &self,
        labels: &[u8],
        probabilities: &[f64],
    ) -> Result<ThresholdSelection, EvaluationError> {
        check_aligned(labels, probabilities)?;

        let counts = threshold_candidates().map(|t| {
            let (trades, wins) = labels
                .iter()
                .zip(probabilities)
                .filter(|&(_, &p)| p > t)
                .fold((0, 0), |(trades, wins), (&y, _)| {
                    (trades + 1, wins + usize::from(y == 1))
                });
            (t, trades, wins)
        });

        Ok(self.select(counts))
    }

    /// Sort plus prefix-sum scan, `O(rows log rows)`. Selects exactly what
    /// [`ThresholdOptimizer::optimize`] selects.
    pub fn optimize_sorted(
        &self,
        labels: &[u8],
        probabilities: &[f64],
    ) -> Result<ThresholdSelection, EvaluationError> {
        check_aligned(labels, probabilities)?;

        let mut rows: Vec<(f64, u8)> = probabilities
            .iter()
            .copied()
            .zip(labels.iter().copied())
            .collect();
        rows.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));

        // prefix_wins[k] = wins among the k highest probabilities
        let mut prefix_wins = Vec::with_capacity(rows.len() + 1);
        prefix_wins.push(0usize);
        for &(_, y) in &rows {
            let last = prefix_wins[prefix_wins.len() - 1];
            prefix_wins.push(last + usize::from(y == 1));
        }

        let counts = threshold_candidates().map(|t| {
            let trades = rows.partition_point(|&(p, _)| p > t);
            (t, trades, prefix_wins[trades])
        });

        Ok(self.select(counts))
    }

    /// Starts from the fallback, so a candidate must beat its 0.0 win rate
    /// to be selected. A slice where every qualifying threshold has zero
    /// wins reports the fallback with no trades.
    fn select(&self, counts: [(f64, usize, usize); THRESHOLD_CANDIDATES]) -> ThresholdSelection {
        let mut best = ThresholdSelection::fallback();
        for (threshold, trades, wins) in counts {
            if trades < self.min_trades {
                continue;
            }
            let win_rate = wins as f64 / trades as f64;
            if win_rate > best.win_rate {
                best = ThresholdSelection {
                    threshold,
                    win_rate,
                    trades,
                    wins,
                };
            }
        }

        if best.trades == 0 {
            debug!(
                "No threshold reached {} trades with a win, using fallback {}",
                self.min_trades, FALLBACK_THRESHOLD
            );
        }
        best
    }
}

fn check_aligned(labels: &[u8], probabilities: &[f64]) -> Result<(), EvaluationError> {
    if labels.len() != probabilities.len() {
        return Err(EvaluationError::misaligned(
            "validation labels vs probabilities",
            labels.len(),
            probabilities.len(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const LABELS: [u8; 10] = [1, 1, 0, 1, 0, 0, 1, 0, 0, 0];
    const PROBS: [f64; 10] = [0.97, 0.92, 0.87, 0.82, 0.77, 0.72, 0.67, 0.62, 0.57, 0.52];

    #[test]
    fn test_candidate_grid() {
        let grid = threshold_candidates();
        assert_eq!(grid[0], 0.50);
        assert_eq!(grid[6], 0.80);
        assert_eq!(grid[9], 0.95);
        assert!(grid.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_selects_highest_win_rate_with_min_trades() {
        let optimizer = ThresholdOptimizer::new(3);
        let selection = optimizer.optimize(&LABELS, &PROBS).unwrap();

        // 0.80 keeps the top four rows, three of them winners
        assert_eq!(selection.threshold, 0.80);
        assert_eq!(selection.trades, 4);
        assert_eq!(selection.wins, 3);
        assert_eq!(selection.losses(), 1);
        assert!((selection.win_rate - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_no_qualifying_threshold_returns_fallback() {
        let optimizer = ThresholdOptimizer::new(3);
        let selection = optimizer.optimize(&LABELS, &[0.3; 10]).unwrap();
        assert_eq!(selection, ThresholdSelection::fallback());
        assert_eq!(selection.threshold, 0.60);
        assert_eq!(selection.trades, 0);
    }

    #[test]
    fn test_zero_win_thresholds_do_not_displace_fallback() {
        let optimizer = ThresholdOptimizer::new(3);
        let labels = [0u8; 5];
        let probs = [0.99; 5];

        // Every candidate trades all five rows and wins none
        let selection = optimizer.optimize(&labels, &probs).unwrap();
        assert_eq!(selection, ThresholdSelection::fallback());
        assert_eq!(selection.losses(), 0);
        assert_eq!(optimizer.optimize_sorted(&labels, &probs).unwrap(), selection);
    }

    #[test]
    fn test_ties_keep_lowest_threshold() {
        // Every candidate sees the same single winning row pattern
        let labels = [1, 1, 1];
        let probs = [0.99, 0.99, 0.99];
        let selection = ThresholdOptimizer::new(1).optimize(&labels, &probs).unwrap();
        assert_eq!(selection.threshold, 0.50);
        assert_eq!(selection.win_rate, 1.0);
    }

    #[test]
    fn test_probability_equal_to_threshold_does_not_trade() {
        let selection = ThresholdOptimizer::new(1)
            .optimize(&[1, 0], &[0.95, 0.60])
            .unwrap();
        // 0.95 never clears any threshold from 0.95 up; 0.60 stops trading at 0.60
        assert_eq!(selection.threshold, 0.60);
        assert_eq!(selection.trades, 1);
        assert_eq!(selection.win_rate, 1.0);
    }

    #[test]
    fn test_misaligned_inputs_rejected() {
        let err = ThresholdOptimizer::default()
            .optimize(&[1, 0], &[0.5])
            .unwrap_err();
        assert!(matches!(err, EvaluationError::MisalignedInputs { .. }));
        assert!(ThresholdOptimizer::default().optimize_sorted(&[1], &[]).is_err());
    }

    #[test]
    fn test_sorted_scan_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        for min_trades in [1, 5, 20, 200] {
            let n = 300;
            let probs: Vec<f64> = (0..n).map(|_| rng.random_range(0.3..1.0)).collect();
            let labels: Vec<u8> = probs
                .iter()
                .map(|&p| u8::from(rng.random_bool(p.clamp(0.0, 1.0))))
                .collect();

            let optimizer = ThresholdOptimizer::new(min_trades);
            assert_eq!(
                optimizer.optimize(&labels, &probs).unwrap(),
                optimizer.optimize_sorted(&labels, &probs).unwrap()
            );
        }

        let optimizer = ThresholdOptimizer::new(3);
        assert_eq!(
            optimizer.optimize_sorted(&LABELS, &PROBS).unwrap(),
            optimizer.optimize(&LABELS, &PROBS).unwrap()
        );
    }
}
