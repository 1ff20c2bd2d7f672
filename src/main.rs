use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use coin_virality::api::{router, ApiState};
use coin_virality::config::Config;
use coin_virality::db::{self, CoinStore};
use coin_virality::error::Result;
use coin_virality::fetcher::{HttpSimilarityScorer, ZoraExploreClient};
use coin_virality::scorer::ScoringCache;

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
    // --- Database setup (one pool for the whole process) ---
    let pool = db::connect(&cfg.db_path).await?;
    info!("Database ready at {}", cfg.db_path);

    // --- Outbound collaborators ---
    let coins = ZoraExploreClient::new(
        &cfg.zora_api_url,
        cfg.zora_api_key.clone(),
        cfg.coin_fetch_count,
    )?;
    if cfg.zora_api_key.is_none() {
        warn!("ZORA_API_KEY not set, explore requests are unauthenticated and may be rate limited");
    }
    let scorer = HttpSimilarityScorer::new(&cfg.similarity_url, cfg.similarity_timeout)?;
    let scoring = ScoringCache::new(
        CoinStore::new(pool.clone()),
        Arc::new(scorer),
        cfg.score_freshness,
    );
    info!(
        similarity_url = %cfg.similarity_url,
        freshness_secs = cfg.score_freshness.as_secs(),
        "Scoring cache ready"
    );

    // --- HTTP API server ---
    let api_state = ApiState {
        pool: pool.clone(),
        ohlc_csv_path: Arc::new(PathBuf::from(&cfg.ohlc_csv_path)),
        coins: Arc::new(coins),
        scoring: Arc::new(scoring),
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Server is running on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Server closed");

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("SIGINT received. Shutting down gracefully..."),
        Err(e) => {
            warn!("Failed to listen for SIGINT: {e}");
            std::future::pending::<()>().await;
        }
    }
}
