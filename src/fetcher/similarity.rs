use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::types::{CoinCandidate, ReferenceCoin, Similarities};

/// Payload sent to the similarity model.
#[derive(Debug, Serialize)]
pub struct ScoreRequest<'a> {
    pub example_post: &'a CoinCandidate,
    pub coin_data: &'a [ReferenceCoin],
}

#[async_trait]
pub trait SimilarityScorer: Send + Sync {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<Similarities>;
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    weighted_sentiment_similarity: f64,
    weighted_embed_similarity: f64,
    weighted_financial_similarity: f64,
    weighted_total_similarity: f64,
}

/// The model answers 200 either way; a failed prediction carries only
/// `{"error": "..."}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScoreReply {
    Scores(ScoreResponse),
    Failed { error: String },
}

impl From<ScoreResponse> for Similarities {
    fn from(r: ScoreResponse) -> Self {
        Similarities {
            sentiment: r.weighted_sentiment_similarity,
            embed: r.weighted_embed_similarity,
            finance: r.weighted_financial_similarity,
            total: r.weighted_total_similarity,
        }
    }
}

impl ScoreReply {
    fn into_similarities(self, address: &str) -> Result<Similarities> {
        match self {
            ScoreReply::Scores(scores) => Ok(scores.into()),
            ScoreReply::Failed { error } => Err(AppError::Upstream(format!(
                "similarity model failed for {address}: {error}"
            ))),
        }
    }
}

/// POSTs to the model's `/predict` endpoint. One attempt per call.
pub struct HttpSimilarityScorer {
    client: reqwest::Client,
    url: String,
}

impl HttpSimilarityScorer {
    pub fn new(url: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(t) = timeout {
            builder = builder.timeout(t);
        }
        Ok(Self {
            client: builder.build()?,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl SimilarityScorer for HttpSimilarityScorer {
    async fn score(&self, request: &ScoreRequest<'_>) -> Result<Similarities> {
        let address = &request.example_post.address;
        let resp = self.client.post(&self.url).json(request).send().await?;
        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "similarity model returned {} for {address}",
                resp.status()
            )));
        }
        let body: ScoreReply = resp.json().await?;
        body.into_similarities(address)
    }
}
