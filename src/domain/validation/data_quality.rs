use crate::domain::market::price_series::Candle;
use rust_decimal::Decimal;
use tracing::warn;

/// Centralized validator for bar integrity.
///
/// Rejects bars that are physically impossible (non-positive prices, inverted ranges).
pub struct StrictBarValidator;

impl StrictBarValidator {
    /// Validates a Candle. Returns true if valid, false otherwise.
    pub fn validate_candle(candle: &Candle) -> bool {
        if candle.open <= Decimal::ZERO
            || candle.high <= Decimal::ZERO
            || candle.low <= Decimal::ZERO
            || candle.close <= Decimal::ZERO
        {
            warn!(
                "Validation FAILED: Candle for {} at {} has non-positive price component(s)",
                candle.symbol, candle.timestamp
            );
            return false;
        }

        if candle.low > candle.high {
            warn!(
                "Validation FAILED: Candle for {} has low {} > high {}",
                candle.symbol, candle.low, candle.high
            );
            return false;
        }

        if candle.volume < Decimal::ZERO {
            warn!(
                "Validation FAILED: Candle for {} has negative volume: {}",
                candle.symbol, candle.volume
            );
            return false;
        }

        true
    }
}
