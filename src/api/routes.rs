use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::api::health::get_health;
use crate::error::{AppError, Result};
use crate::fetcher::CoinSource;
use crate::ohlc::read_candle_rows;
use crate::scorer::ScoringCache;
use crate::types::{CandleRow, CoinOutcome, PredictionView, ReferenceCoin};

#[derive(Clone)]
pub struct ApiState {
    pub pool: sqlx::SqlitePool,
    pub ohlc_csv_path: Arc<PathBuf>,
    pub coins: Arc<dyn CoinSource>,
    pub scoring: Arc<ScoringCache>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(get_health))
        .route("/api/v1/olhc", get(get_olhc))
        .route("/api/v1/predict/get-total-similarity", get(get_total_similarity))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct FailedPrediction {
    pub address: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct PredictionsResponse {
    pub predictions: Vec<PredictionView>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<FailedPrediction>,
}

impl From<Vec<CoinOutcome>> for PredictionsResponse {
    fn from(outcomes: Vec<CoinOutcome>) -> Self {
        let mut predictions = Vec::new();
        let mut failures = Vec::new();
        for outcome in outcomes {
            match outcome {
                CoinOutcome::Scored(view) => predictions.push(view),
                CoinOutcome::Failed { address, error } => {
                    failures.push(FailedPrediction { address, error })
                }
            }
        }
        Self { predictions, failures }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Candle history from the checked-in CSV. Failures answer with a plain-text
/// 500.
async fn get_olhc(State(state): State<ApiState>) -> Response {
    match load_candles(Arc::clone(&state.ohlc_csv_path)).await {
        Ok(rows) => Json(rows).into_response(),
        Err(e) => {
            error!("Error reading CSV file {}: {e}", state.ohlc_csv_path.display());
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

async fn load_candles(path: Arc<PathBuf>) -> Result<Vec<CandleRow>> {
    tokio::task::spawn_blocking(move || read_candle_rows(&path)).await?
}

/// Score the newest coins against the most valuable ones.
async fn get_total_similarity(
    State(state): State<ApiState>,
) -> std::result::Result<Json<PredictionsResponse>, AppError> {
    let new_coins = state.coins.fetch_new_coins().await?;
    let most_valuable = state.coins.fetch_most_valuable().await?;
    let reference = ReferenceCoin::snapshot(&most_valuable, Utc::now());
    info!(
        candidates = new_coins.len(),
        reference = reference.len(),
        "Scoring new coins"
    );

    let outcomes = state.scoring.score_batch(&new_coins, &reference).await;
    Ok(Json(outcomes.into()))
}
