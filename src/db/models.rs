use crate::types::Similarities;

/// Cached scores for one coin, as read back for a cache hit.
#[derive(Debug, sqlx::FromRow)]
pub struct CoinScoreRecord {
    pub address: String,
    pub sentiment_similarity: Option<f64>,
    pub embed_similarity: Option<f64>,
    pub finance_similarity: Option<f64>,
    pub total_similarity: Option<f64>,
    /// Millisecond UTC epoch.
    pub scraped_at: i64,
}

impl CoinScoreRecord {
    /// Null component scores read as 0.
    pub fn similarities(&self) -> Similarities {
        Similarities {
            sentiment: self.sentiment_similarity.unwrap_or(0.0),
            embed: self.embed_similarity.unwrap_or(0.0),
            finance: self.finance_similarity.unwrap_or(0.0),
            total: self.total_similarity.unwrap_or(0.0),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct ProfileRow {
    pub address: String,
    pub handle: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: i64,
}
