use crate::domain::errors::EvaluationError;
use crate::domain::market::price_series::Candle;
use crate::domain::ml::dataset::FeatureMatrix;
use crate::domain::performance::stats::Stats;
use crate::domain::ports::FeatureProvider;
use ta::Next;
use ta::indicators::{BollingerBands, RelativeStrengthIndex, SimpleMovingAverage};

const FEATURE_CLIP: f64 = 10.0;
const VOLUME_LOOKBACK: usize = 50;
const RETURN_STD_LOOKBACK: usize = 5;

/// Price/volume features computed bar by bar over the given slice only.
///
/// Rows inside an indicator's warm-up period get `0` for that feature, and
/// every value is clipped to `[-10, 10]`, so the matrix is always finite.
#[derive(Debug, Clone)]
pub struct BasicFeatureProvider {
    rsi_period: usize,
    bb_period: usize,
    bb_std_dev: f64,
}

impl Default for BasicFeatureProvider {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            bb_period: 20,
            bb_std_dev: 2.0,
        }
    }
}

impl BasicFeatureProvider {
    pub fn new(rsi_period: usize, bb_period: usize, bb_std_dev: f64) -> Self {
        Self {
            rsi_period,
            bb_period,
            bb_std_dev,
        }
    }
}

fn indicator_error(e: ta::errors::TaError) -> EvaluationError {
    EvaluationError::config(format!("indicator setup failed: {}", e))
}

fn pct_change(closes: &[f64], t: usize, lag: usize) -> f64 {
    if t < lag || closes[t - lag] <= 0.0 {
        return 0.0;
    }
    closes[t] / closes[t - lag] - 1.0
}

fn ratio_or_zero(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}

impl FeatureProvider for BasicFeatureProvider {
    fn feature_names(&self) -> Vec<String> {
        [
            "return_1",
            "return_5",
            "return_10",
            "ma5_ratio",
            "ma10_ratio",
            "ma5_ma10_ratio",
            "volume_ratio",
            "return_std_5",
            "rsi",
            "bb_position",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn compute(&self, bars: &[Candle]) -> Result<FeatureMatrix, EvaluationError> {
        let mut sma_5 = SimpleMovingAverage::new(5).map_err(indicator_error)?;
        let mut sma_10 = SimpleMovingAverage::new(10).map_err(indicator_error)?;
        let mut volume_sma = SimpleMovingAverage::new(VOLUME_LOOKBACK).map_err(indicator_error)?;
        let mut rsi = RelativeStrengthIndex::new(self.rsi_period).map_err(indicator_error)?;
        let mut bb = BollingerBands::new(self.bb_period, self.bb_std_dev).map_err(indicator_error)?;

        let closes: Vec<f64> = bars.iter().map(Candle::close_f64).collect();
        let mut one_bar_returns = Vec::with_capacity(bars.len());
        let mut rows = Vec::with_capacity(bars.len());

        for (t, bar) in bars.iter().enumerate() {
            let close = closes[t];
            let ma5 = sma_5.next(close);
            let ma10 = sma_10.next(close);
            let mean_volume = volume_sma.next(bar.volume_f64());
            let rsi_value = rsi.next(close);
            let band = bb.next(close);

            let return_1 = pct_change(&closes, t, 1);
            one_bar_returns.push(return_1);

            let warm = |period: usize| t + 1 >= period;
            let ma5_ratio = if warm(5) { ratio_or_zero(ma5, close) } else { 0.0 };
            let ma10_ratio = if warm(10) { ratio_or_zero(ma10, close) } else { 0.0 };
            let ma5_ma10_ratio = if warm(10) { ratio_or_zero(ma5, ma10) } else { 0.0 };
            let volume_ratio = if warm(VOLUME_LOOKBACK) {
                ratio_or_zero(bar.volume_f64(), mean_volume)
            } else {
                0.0
            };
            let return_std = if t >= RETURN_STD_LOOKBACK {
                Stats::sample_std_dev(&one_bar_returns[t + 1 - RETURN_STD_LOOKBACK..=t])
            } else {
                0.0
            };
            let rsi_scaled = if t >= self.rsi_period { rsi_value / 100.0 } else { 0.0 };
            let bb_position = if warm(self.bb_period) {
                ratio_or_zero(close - band.lower, band.upper - band.lower)
            } else {
                0.0
            };

            let row: Vec<f64> = [
                return_1,
                pct_change(&closes, t, 5),
                pct_change(&closes, t, 10),
                ma5_ratio,
                ma10_ratio,
                ma5_ma10_ratio,
                volume_ratio,
                return_std,
                rsi_scaled,
                bb_position,
            ]
            .iter()
            .map(|&v| {
                if v.is_finite() {
                    v.clamp(-FEATURE_CLIP, FEATURE_CLIP)
                } else {
                    0.0
                }
            })
            .collect();
            rows.push(row);
        }

        FeatureMatrix::new(self.feature_names(), rows)
    }
}
