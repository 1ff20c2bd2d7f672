use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::{AppError, Result};

pub const ZORA_API_URL: &str = "https://api-sdk.zora.engineering";
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";
pub const SIMILARITY_URL: &str = "http://127.0.0.1:5000/predict";

/// Checked-in candle history served by `/api/v1/olhc`.
pub const OHLC_CSV_PATH: &str = "data/zora-ohlc-history-from-beginning.csv";

/// Cached similarity scores older than this are recomputed.
pub const SCORE_FRESHNESS_SECS: u64 = 3_600;

/// Coins requested per explore list by the prediction endpoint (first page only).
pub const COIN_FETCH_COUNT: u32 = 10;

/// Page size for the most-valuable scrape job.
pub const SCRAPE_PAGE_SIZE: u32 = 100;

/// Hard stop for the scrape job's cursor walk.
pub const SCRAPE_MAX_PAGES: usize = 1_000;

/// Prediction status thresholds on `total_similarity`.
pub mod status_thresholds {
    pub const ACTIVE_MIN: f64 = 60.0;
    pub const WATCHING_MIN: f64 = 50.0;
}

/// `timeToViral = BASE_HOURS - prediction * DECAY_PER_POINT`.
pub mod time_to_viral {
    pub const BASE_HOURS: f64 = 20.0;
    pub const DECAY_PER_POINT: f64 = 0.15;
}

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// CSV file served by the candle endpoint (OHLC_CSV_PATH)
    pub ohlc_csv_path: String,
    pub zora_api_url: String,
    /// Sent as the `api-key` header when set (ZORA_API_KEY)
    pub zora_api_key: Option<String>,
    pub coin_fetch_count: u32,
    pub scrape_page_size: u32,
    pub scrape_max_pages: usize,
    pub similarity_url: String,
    /// None disables the request timeout (SIMILARITY_TIMEOUT_SECS=0)
    pub similarity_timeout: Option<Duration>,
    pub score_freshness: Duration,
    pub coingecko_api_url: String,
    pub ohlc_asset_id: String,
    pub ohlc_from_date: NaiveDate,
    pub ohlc_output_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let similarity_timeout_secs: u64 = parse_var("SIMILARITY_TIMEOUT_SECS", 0)?;
        let from_date = var_or("OHLC_FROM_DATE", "2025-01-09");

        Ok(Self {
            log_level: var_or("LOG_LEVEL", "info"),
            db_path: var_or("DB_PATH", "virality.db"),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            ohlc_csv_path: var_or("OHLC_CSV_PATH", OHLC_CSV_PATH),
            zora_api_url: var_or("ZORA_API_URL", ZORA_API_URL),
            zora_api_key: std::env::var("ZORA_API_KEY").ok().filter(|k| !k.is_empty()),
            coin_fetch_count: parse_var("COIN_FETCH_COUNT", COIN_FETCH_COUNT)?,
            scrape_page_size: parse_var("SCRAPE_PAGE_SIZE", SCRAPE_PAGE_SIZE)?,
            scrape_max_pages: parse_var("SCRAPE_MAX_PAGES", SCRAPE_MAX_PAGES)?,
            similarity_url: var_or("SIMILARITY_URL", SIMILARITY_URL),
            similarity_timeout: (similarity_timeout_secs > 0)
                .then(|| Duration::from_secs(similarity_timeout_secs)),
            score_freshness: Duration::from_secs(parse_var(
                "SCORE_FRESHNESS_SECS",
                SCORE_FRESHNESS_SECS,
            )?),
            coingecko_api_url: var_or("COINGECKO_API_URL", COINGECKO_API_URL),
            ohlc_asset_id: var_or("OHLC_ASSET_ID", "zora-ai"),
            ohlc_from_date: NaiveDate::parse_from_str(&from_date, "%Y-%m-%d").map_err(|_| {
                AppError::Config(format!("OHLC_FROM_DATE must be YYYY-MM-DD, got {from_date:?}"))
            })?,
            ohlc_output_path: var_or("OHLC_OUTPUT_PATH", "zora-ohlc-market-data.csv"),
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw:?}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_var_falls_back_to_default_when_unset() {
        let v: u32 = parse_var("COIN_VIRALITY_TEST_UNSET_VAR", 7).unwrap();
        assert_eq!(v, 7);
    }

    #[test]
    fn parse_var_rejects_garbage() {
        std::env::set_var("COIN_VIRALITY_TEST_BAD_NUMBER", "ten");
        let err = parse_var::<u64>("COIN_VIRALITY_TEST_BAD_NUMBER", 1).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
