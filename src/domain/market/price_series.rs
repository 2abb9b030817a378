use crate::domain::errors::SeriesError;
use crate::domain::validation::data_quality::StrictBarValidator;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub timestamp: i64,
}

impl Candle {
    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(0.0)
    }

    pub fn volume_f64(&self) -> f64 {
        self.volume.to_f64().unwrap_or(0.0)
    }
}

/// Ordered, validated sequence of bars for one instrument.
///
/// Timestamps are strictly increasing and unique. The series is read-only once
/// constructed; evaluation code only ever borrows slices of it.
#[derive(Debug, Clone, Serialize)]
pub struct PriceSeries {
    symbol: String,
    bars: Vec<Candle>,
}

impl PriceSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<Candle>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        if bars.is_empty() {
            return Err(SeriesError::Empty { symbol });
        }

        for (index, bar) in bars.iter().enumerate() {
            if !StrictBarValidator::validate_candle(bar) {
                return Err(SeriesError::InvalidBar { symbol, index });
            }
            if index > 0 {
                let previous = bars[index - 1].timestamp;
                if bar.timestamp <= previous {
                    return Err(SeriesError::NonMonotonicTimestamp {
                        symbol,
                        index,
                        previous,
                        current: bar.timestamp,
                    });
                }
            }
        }

        Ok(Self { symbol, bars })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[Candle] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(Candle::close_f64).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(ts: i64, close: Decimal) -> Candle {
        Candle {
            symbol: "BTCUSDT".to_string(),
            open: close,
            high: close + dec!(1),
            low: close - dec!(1),
            close,
            volume: dec!(10),
            timestamp: ts,
        }
    }

    #[test]
    fn test_price_series_accepts_increasing_timestamps() {
        let series = PriceSeries::new(
            "BTCUSDT",
            vec![bar(1, dec!(100)), bar(2, dec!(101)), bar(3, dec!(102))],
        )
        .unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.closes(), vec![100.0, 101.0, 102.0]);
        assert_eq!(series.symbol(), "BTCUSDT");
    }

    #[test]
    fn test_price_series_rejects_duplicate_timestamp() {
        let err = PriceSeries::new("BTCUSDT", vec![bar(1, dec!(100)), bar(1, dec!(101))])
            .unwrap_err();
        assert!(matches!(
            err,
            SeriesError::NonMonotonicTimestamp { index: 1, .. }
        ));
    }

    #[test]
    fn test_price_series_rejects_empty_and_invalid() {
        assert!(matches!(
            PriceSeries::new("X", vec![]),
            Err(SeriesError::Empty { .. })
        ));

        let mut broken = bar(2, dec!(100));
        broken.low = dec!(150);
        let err = PriceSeries::new("X", vec![bar(1, dec!(100)), broken]).unwrap_err();
        assert_eq!(
            err,
            SeriesError::InvalidBar {
                symbol: "X".to_string(),
                index: 1
            }
        );
    }
}
