use crate::domain::market::price_series::{Candle, PriceSeries};
use crate::domain::ports::PriceSeriesLoader;
use anyhow::{Context, Result, bail};
use chrono::DateTime;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

#[derive(Debug, Deserialize)]
struct BarRecord {
    timestamp: String,
    open: String,
    high: String,
    low: String,
    close: String,
    volume: String,
}

/// Epoch milliseconds, or an RFC 3339 date-time converted to epoch millis.
fn parse_timestamp(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.timestamp_millis())
        .with_context(|| format!("Invalid timestamp: {}", raw))
}

fn parse_decimal(field: &str, raw: &str) -> Result<Decimal> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .with_context(|| format!("Invalid {}: {}", field, raw))
}

/// Loads `timestamp,open,high,low,close,volume` CSV files, one per symbol.
///
/// Rows are sorted by timestamp before validation, so files may be written
/// newest-first. Duplicate timestamps and impossible bars are rejected.
pub struct CsvPriceLoader {
    data_dir: PathBuf,
}

impl CsvPriceLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.data_dir.join(format!("{}.csv", symbol.to_uppercase()))
    }

    pub fn load_path(path: &Path, symbol: &str) -> Result<PriceSeries> {
        let file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));

        let mut bars = Vec::new();
        for (line, record) in rdr.deserialize::<BarRecord>().enumerate() {
            // +2: header row and 1-based numbering
            let record = record.with_context(|| format!("Malformed row {} in {:?}", line + 2, path))?;
            bars.push(Candle {
                symbol: symbol.to_uppercase(),
                open: parse_decimal("open", &record.open)?,
                high: parse_decimal("high", &record.high)?,
                low: parse_decimal("low", &record.low)?,
                close: parse_decimal("close", &record.close)?,
                volume: parse_decimal("volume", &record.volume)?,
                timestamp: parse_timestamp(&record.timestamp)?,
            });
        }

        if bars.is_empty() {
            bail!("No bars found in {:?}", path);
        }
        bars.sort_by_key(|b| b.timestamp);

        let series = PriceSeries::new(symbol.to_uppercase(), bars)
            .with_context(|| format!("Invalid price series in {:?}", path))?;
        info!("Loaded {} bars for {} from {:?}", series.len(), series.symbol(), path);
        Ok(series)
    }
}

impl PriceSeriesLoader for CsvPriceLoader {
    fn load(&self, symbol: &str) -> Result<PriceSeries> {
        Self::load_path(&self.path_for(symbol), symbol)
    }
}
