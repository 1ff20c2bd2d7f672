//! One-shot job: walk the most-valuable explore list to its end and upsert
//! every coin and its creator profile.

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use coin_virality::config::Config;
use coin_virality::db::{self, CoinStore};
use coin_virality::error::Result;
use coin_virality::fetcher::ZoraExploreClient;
use coin_virality::scraper::scrape_most_valuable;

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

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    let pool = db::connect(&cfg.db_path).await?;
    let store = CoinStore::new(pool.clone());

    let source = ZoraExploreClient::new(
        &cfg.zora_api_url,
        cfg.zora_api_key.clone(),
        cfg.scrape_page_size,
    )?;
    if cfg.zora_api_key.is_none() {
        warn!("ZORA_API_KEY not set, explore requests are unauthenticated and may be rate limited");
    }

    info!(page_size = cfg.scrape_page_size, db = %cfg.db_path, "Scraping most valuable coins");
    let stats = scrape_most_valuable(&source, &store, cfg.scrape_max_pages).await;
    info!(
        pages = stats.pages,
        saved = stats.saved,
        failed = stats.failed,
        "Scrape complete"
    );

    pool.close().await;
    Ok(())
}
