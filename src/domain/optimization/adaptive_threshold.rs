use crate::domain::market::market_regime::MarketRegimeType;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal_macros::dec;

pub const DEFAULT_BASE_THRESHOLD: f64 = 0.60;

const TREND_OFFSET: Decimal = dec!(0.05);
const VOLATILITY_REFERENCE: Decimal = dec!(0.05);
const VOLATILITY_WEIGHT: Decimal = dec!(0.02);
const MIN_THRESHOLD: Decimal = dec!(0.50);
const MAX_THRESHOLD: Decimal = dec!(0.75);
const INPUT_SCALE: u32 = 10;

/// Maps `(regime, base threshold, realized volatility)` to a decision threshold.
///
/// `clip(base + regime_offset + min(vol / 0.05, 1) * 0.02, 0.50, 0.75)`, with
/// the offset `-0.05` in an uptrend, `+0.05` in a downtrend and `0` when ranging.
/// Arithmetic is done in `Decimal` so that e.g. `0.60 - 0.05` is exactly `0.55`.
pub struct AdaptiveThresholdRouter;

impl AdaptiveThresholdRouter {
    pub fn threshold(regime: MarketRegimeType, base_threshold: f64, realized_volatility: f64) -> f64 {
        let base = to_decimal(base_threshold);
        let volatility = if realized_volatility.is_nan() {
            Decimal::ZERO
        } else {
            to_decimal(realized_volatility.max(0.0).min(1.0))
        };

        let offset = match regime {
            MarketRegimeType::TrendingUp => -TREND_OFFSET,
            MarketRegimeType::TrendingDown => TREND_OFFSET,
            MarketRegimeType::Ranging => Decimal::ZERO,
        };
        let volatility_term = (volatility / VOLATILITY_REFERENCE).min(Decimal::ONE) * VOLATILITY_WEIGHT;

        let threshold = (base + offset + volatility_term).clamp(MIN_THRESHOLD, MAX_THRESHOLD);
        threshold.normalize().to_f64().unwrap_or(DEFAULT_BASE_THRESHOLD)
    }
}

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| d.round_dp(INPUT_SCALE))
        .unwrap_or(Decimal::ZERO)
}
