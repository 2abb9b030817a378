use crate::domain::performance::stats::Stats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum number of prices needed before a regime is inferred
pub const MIN_REGIME_POINTS: usize = 5;
/// Default trailing lookback for regime detection
pub const DEFAULT_REGIME_LOOKBACK: usize = 50;
/// Strength above which the market counts as trending
pub const TREND_STRENGTH_CUTOFF: f64 = 0.3;
const STD_EPSILON: f64 = 1e-10;

/// Represents the current market regime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegimeType {
    TrendingUp,
    TrendingDown,
    Ranging,
}

impl fmt::Display for MarketRegimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketRegimeType::TrendingUp => write!(f, "trending_up"),
            MarketRegimeType::TrendingDown => write!(f, "trending_down"),
            MarketRegimeType::Ranging => write!(f, "ranging"),
        }
    }
}

impl FromStr for MarketRegimeType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trending_up" => Ok(MarketRegimeType::TrendingUp),
            "trending_down" => Ok(MarketRegimeType::TrendingDown),
            "ranging" => Ok(MarketRegimeType::Ranging),
            _ => anyhow::bail!(
                "Invalid regime: {}. Must be 'trending_up', 'trending_down' or 'ranging'",
                s
            ),
        }
    }
}

/// Regime classification with its strength in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketRegime {
    pub regime_type: MarketRegimeType,
    pub strength: f64,
    /// Signed, clipped trend score in [-1, 1]
    pub trend_score: f64,
}

impl MarketRegime {
    pub fn new(regime_type: MarketRegimeType, strength: f64, trend_score: f64) -> Self {
        Self {
            regime_type,
            strength: strength.clamp(0.0, 1.0),
            trend_score: trend_score.clamp(-1.0, 1.0),
        }
    }

    /// Default returned when there is too little history to judge.
    pub fn insufficient_data() -> Self {
        Self::new(MarketRegimeType::Ranging, 0.5, 0.0)
    }
}

/// Classifies a trailing price slice into a trend regime.
///
/// Stateless: the same slice always yields the same regime, so a single
/// detector can be shared across threads.
#[derive(Debug, Clone, Copy)]
pub struct MarketRegimeDetector {
    lookback: usize,
}

impl Default for MarketRegimeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_REGIME_LOOKBACK)
    }
}

impl MarketRegimeDetector {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback: lookback.max(MIN_REGIME_POINTS),
        }
    }

    pub fn detect(&self, prices: &[f64]) -> MarketRegime {
        let recent = &prices[prices.len().saturating_sub(self.lookback)..];
        if recent.len() < MIN_REGIME_POINTS {
            return MarketRegime::insufficient_data();
        }

        let trend_score = self.calculate_trend_score(recent);
        let price_range = Self::calculate_price_range(recent);
        let strength = trend_score.abs().min(price_range).clamp(0.0, 1.0);

        let regime_type = if strength > TREND_STRENGTH_CUTOFF {
            if trend_score > 0.0 {
                MarketRegimeType::TrendingUp
            } else {
                MarketRegimeType::TrendingDown
            }
        } else {
            MarketRegimeType::Ranging
        };

        MarketRegime::new(regime_type, strength, trend_score)
    }

    /// Fitted OLS move across the lookback, in units of price std dev.
    /// This is the whole-lookback move (slope times n - 1), not the per-bar slope.
    fn calculate_trend_score(&self, prices: &[f64]) -> f64 {
        let n = prices.len();
        let slope = Self::ols_slope(prices);
        let std_dev = Stats::population_std_dev(prices);

        let fitted_move = slope * (n - 1) as f64;
        (fitted_move / (std_dev + STD_EPSILON)).clamp(-1.0, 1.0)
    }

    fn ols_slope(prices: &[f64]) -> f64 {
        let n = prices.len() as f64;
        let x_mean = (n - 1.0) / 2.0;
        let y_mean = Stats::mean(prices);

        let (mut num, mut den) = (0.0, 0.0);
        for (i, &y) in prices.iter().enumerate() {
            let dx = i as f64 - x_mean;
            num += dx * (y - y_mean);
            den += dx * dx;
        }

        if den == 0.0 { 0.0 } else { num / den }
    }

    fn calculate_price_range(prices: &[f64]) -> f64 {
        let mean = Stats::mean(prices);
        if mean <= 0.0 {
            return 0.0;
        }
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        (max - min) / mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_regime_detection_uptrend() {
        let detector = MarketRegimeDetector::default();
        let prices: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();

        let regime = detector.detect(&prices);
        assert_eq!(regime.regime_type, MarketRegimeType::TrendingUp);
        assert!(regime.strength > 0.3);
        assert!(regime.trend_score > 0.0);
    }

    #[test]
    fn test_regime_detection_downtrend() {
        let detector = MarketRegimeDetector::default();
        let prices: Vec<f64> = (0..50).map(|i| 200.0 - 1.5 * i as f64).collect();

        let regime = detector.detect(&prices);
        assert_eq!(regime.regime_type, MarketRegimeType::TrendingDown);
        assert!(regime.strength > 0.3);
    }

    #[test]
    fn test_constant_prices_are_ranging() {
        let detector = MarketRegimeDetector::default();
        let regime = detector.detect(&[100.0; 50]);
        assert_eq!(regime.regime_type, MarketRegimeType::Ranging);
        assert_eq!(regime.strength, 0.0);
    }

    #[test]
    fn test_small_oscillation_is_ranging() {
        let detector = MarketRegimeDetector::default();
        let prices: Vec<f64> = (0..50)
            .map(|i| 100.0 + if i % 2 == 0 { 0.5 } else { -0.5 })
            .collect();

        // Range is ~1% of price so strength stays below the cutoff
        let regime = detector.detect(&prices);
        assert_eq!(regime.regime_type, MarketRegimeType::Ranging);
        assert!(regime.strength <= 0.3);
    }

    #[test]
    fn test_short_history_returns_safe_default() {
        let detector = MarketRegimeDetector::default();
        let regime = detector.detect(&[100.0, 101.0, 102.0, 103.0]);
        assert_eq!(regime.regime_type, MarketRegimeType::Ranging);
        assert_eq!(regime.strength, 0.5);
    }

    #[test]
    fn test_lookback_trims_old_prices() {
        let detector = MarketRegimeDetector::new(10);
        // Long downtrend followed by 10 rising bars
        let mut prices: Vec<f64> = (0..100).map(|i| 300.0 - i as f64).collect();
        prices.extend((0..10).map(|i| 200.0 + 10.0 * i as f64));

        let regime = detector.detect(&prices);
        assert_eq!(regime.regime_type, MarketRegimeType::TrendingUp);
    }

    #[test]
    fn test_regime_type_parsing_and_display() {
        assert_eq!(
            MarketRegimeType::from_str("TRENDING_UP").unwrap(),
            MarketRegimeType::TrendingUp
        );
        assert!(MarketRegimeType::from_str("volatile").is_err());
        assert_eq!(MarketRegimeType::TrendingDown.to_string(), "trending_down");
        assert_eq!(
            serde_json::to_string(&MarketRegimeType::Ranging).unwrap(),
            "\"ranging\""
        );
    }
}
