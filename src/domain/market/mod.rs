// Market analysis domain
pub mod market_regime;
pub mod price_series;
