use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::db::CoinStore;
use crate::error::Result;
use crate::fetcher::{ScoreRequest, SimilarityScorer};
use crate::scorer::prediction::derive_view;
use crate::types::{CoinCandidate, CoinOutcome, PredictionView, ReferenceCoin};

/// Scores coins against the reference set, reusing cached similarities that
/// are younger than the freshness window.
///
/// Coins are processed one at a time; there is no fan-out and no locking, so
/// two concurrent batches can both miss on the same coin and both call the
/// model. The last upsert wins.
pub struct ScoringCache {
    store: CoinStore,
    scorer: Arc<dyn SimilarityScorer>,
    freshness: Duration,
}

impl ScoringCache {
    pub fn new(store: CoinStore, scorer: Arc<dyn SimilarityScorer>, freshness: Duration) -> Self {
        Self { store, scorer, freshness }
    }

    /// Score every candidate in order. A failing coin is reported as
    /// `CoinOutcome::Failed` and the batch continues.
    pub async fn score_batch(
        &self,
        candidates: &[CoinCandidate],
        coin_data: &[ReferenceCoin],
    ) -> Vec<CoinOutcome> {
        let mut outcomes = Vec::with_capacity(candidates.len());

        for coin in candidates {
            match self.score_coin(coin, coin_data).await {
                Ok(view) => outcomes.push(CoinOutcome::Scored(view)),
                Err(e) => {
                    warn!(address = %coin.address, "Scoring failed: {e}");
                    outcomes.push(CoinOutcome::Failed {
                        address: coin.address.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let scored = outcomes
            .iter()
            .filter(|o| matches!(o, CoinOutcome::Scored(_)))
            .count();
        info!(
            scored,
            failed = outcomes.len() - scored,
            "Scoring batch complete: {scored}/{} coins scored",
            outcomes.len(),
        );

        outcomes
    }

    pub async fn score_coin(
        &self,
        coin: &CoinCandidate,
        coin_data: &[ReferenceCoin],
    ) -> Result<PredictionView> {
        self.score_coin_at(coin, coin_data, Utc::now().timestamp_millis())
            .await
    }

    /// `score_coin` with the clock pinned to `now` (epoch ms). A record
    /// scraped exactly one window before `now` is still fresh.
    pub(crate) async fn score_coin_at(
        &self,
        coin: &CoinCandidate,
        coin_data: &[ReferenceCoin],
        now: i64,
    ) -> Result<PredictionView> {
        if !coin.creator_address.is_empty() {
            self.store
                .ensure_profile(&coin.creator_address, &coin.creator_handle, &coin.creator_avatar_url)
                .await?;
        }

        let window_ms = i64::try_from(self.freshness.as_millis()).unwrap_or(i64::MAX);
        let since = now.saturating_sub(window_ms);

        let scores = match self.store.find_fresh(&coin.address, since).await? {
            Some(record) => {
                debug!(address = %coin.address, scraped_at = record.scraped_at, "Cache hit");
                record.similarities()
            }
            None => {
                debug!(address = %coin.address, "Cache miss, calling similarity model");
                let request = ScoreRequest {
                    example_post: coin,
                    coin_data,
                };
                let fresh = self.scorer.score(&request).await?;
                self.store.upsert_scores(coin, &fresh, now).await?;
                fresh
            }
        };

        Ok(derive_view(&coin.address, &coin.mime_type, &scores))
    }
}
