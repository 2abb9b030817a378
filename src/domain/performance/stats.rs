use statrs::statistics::Statistics;

/// Shared statistics utilities for price and prediction series.
pub struct Stats;

/// Volatility reported when there are not enough prices to compute returns.
pub const DEFAULT_VOLATILITY: f64 = 0.01;

impl Stats {
    /// Simple returns `(p[i] - p[i-1]) / p[i-1]`, skipping non-positive bases.
    pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
        prices
            .windows(2)
            .filter(|w| w[0] > 0.0)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect()
    }

    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().mean()
    }

    /// Population standard deviation (divides by n).
    pub fn population_std_dev(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().population_std_dev()
    }

    /// Sample standard deviation (divides by n - 1). Zero below two points.
    pub fn sample_std_dev(values: &[f64]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        values.iter().std_dev()
    }

    /// Realized volatility: population std of simple returns over the last
    /// `lookback` prices.
    pub fn realized_volatility(prices: &[f64], lookback: usize) -> f64 {
        if prices.len() < 2 {
            return DEFAULT_VOLATILITY;
        }
        let start = prices.len().saturating_sub(lookback);
        let returns = Self::simple_returns(&prices[start..]);
        if returns.is_empty() {
            return DEFAULT_VOLATILITY;
        }
        Self::population_std_dev(&returns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_returns() {
        let returns = Stats::simple_returns(&[100.0, 110.0, 99.0]);
        assert_eq!(returns.len(), 2);
        assert!((returns[0] - 0.1).abs() < 1e-12);
        assert!((returns[1] + 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_std_devs() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((Stats::mean(&values) - 5.0).abs() < 1e-12);
        assert!((Stats::population_std_dev(&values) - 2.0).abs() < 1e-12);
        assert!(Stats::sample_std_dev(&values) > 2.0);
        assert_eq!(Stats::sample_std_dev(&[1.0]), 0.0);
    }

    #[test]
    fn test_realized_volatility_defaults_and_lookback() {
        assert_eq!(Stats::realized_volatility(&[100.0], 20), DEFAULT_VOLATILITY);

        let flat = vec![100.0; 30];
        assert_eq!(Stats::realized_volatility(&flat, 20), 0.0);

        // Only the trailing window matters.
        let mut prices = vec![100.0, 150.0, 90.0];
        prices.extend(std::iter::repeat_n(100.0, 20));
        assert_eq!(Stats::realized_volatility(&prices, 20), 0.0);
    }
}
