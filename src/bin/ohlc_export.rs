//! One-shot job: pull market-data history for the configured asset, bucket
//! it into daily candles and write them to CSV.

use std::path::Path;

use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use coin_virality::config::Config;
use coin_virality::fetcher::{fetch_daily_candles, CoinGeckoClient};
use coin_virality::ohlc::save_candles;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    let source = match CoinGeckoClient::new(&cfg.coingecko_api_url) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to build market-data client: {e}");
            std::process::exit(1);
        }
    };

    let from = cfg.ohlc_from_date.and_time(chrono::NaiveTime::MIN).and_utc();
    let to = Utc::now();
    info!(
        asset_id = %cfg.ohlc_asset_id,
        from = %from.date_naive(),
        "Fetching OHLC history"
    );

    let candles = fetch_daily_candles(&source, &cfg.ohlc_asset_id, from, to).await;
    save_candles(Path::new(&cfg.ohlc_output_path), &candles);
}
