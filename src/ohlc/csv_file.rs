use std::path::Path;

use tracing::{error, info};

use crate::error::Result;
use crate::types::{CandleRow, DailyCandle};

/// Write candles with a `timestamp,open,high,low,close,marketCap,volume` header.
pub fn write_candles_csv(path: &Path, candles: &[DailyCandle]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for candle in candles {
        writer.serialize(candle)?;
    }
    writer.flush()?;
    Ok(())
}

/// Persist the export job's output. Nothing is written for an empty series,
/// and write failures are logged rather than returned.
pub fn save_candles(path: &Path, candles: &[DailyCandle]) {
    if candles.is_empty() {
        info!("No data to save.");
        return;
    }

    match write_candles_csv(path, candles) {
        Ok(()) => info!(
            candles = candles.len(),
            "OHLC market data saved to {}",
            path.display()
        ),
        Err(e) => error!("Error writing OHLC market data to CSV: {e}"),
    }
}

/// Read the served candle history. Extra columns are ignored; a row whose
/// price columns do not parse as floats fails the whole read.
pub fn read_candle_rows(path: &Path) -> Result<Vec<CandleRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}
