use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::status_thresholds::{ACTIVE_MIN, WATCHING_MIN};

// ---------------------------------------------------------------------------
// Market data
// ---------------------------------------------------------------------------

/// One market-data observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    /// Millisecond UTC epoch timestamp.
    pub timestamp_ms: i64,
    pub price: f64,
    pub market_cap: f64,
    pub volume: f64,
}

/// Aggregate of every PricePoint sharing a UTC calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCandle {
    /// RFC 3339 instant of the day's first sample.
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Market cap of the day's last sample.
    pub market_cap: f64,
    pub volume: f64,
}

/// Row shape served by `/api/v1/olhc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleRow {
    pub timestamp: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

// ---------------------------------------------------------------------------
// Coins
// ---------------------------------------------------------------------------

/// A coin from the explore API with every missing field already normalized:
/// absent strings are `""`, absent numbers are `0`.
///
/// Serialized camelCase; this is the `example_post` shape the similarity
/// model consumes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CoinCandidate {
    pub id: String,
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub total_supply: f64,
    pub total_volume: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub market_cap_delta_24h: f64,
    pub created_at: String,
    pub creator_address: String,
    pub creator_handle: String,
    pub creator_avatar_url: String,
    pub unique_holders: f64,
    pub transfer_count: i64,
    pub mime_type: String,
    pub preview_image_url: String,
    pub original_image_url: String,
}

/// A most-valuable coin as sent in the model's `coin_data` list. The model
/// reads this list with different column names than `example_post`
/// (`mediaPreviewUrl` rather than `previewImageUrl`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceCoin {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub created_at: String,
    pub creator_address: String,
    pub unique_holders: f64,
    pub media_mime_type: String,
    pub media_preview_url: String,
    pub media_original_uri: String,
    pub total_supply: f64,
    pub total_volume: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    pub market_cap_delta_24h: f64,
    pub address: String,
    pub transfer_count: i64,
    /// `YYYY-MM-DD HH:MM:SS.mmm` UTC, the time the list was fetched.
    pub scraped_at: String,
    pub updated_at: String,
}

impl ReferenceCoin {
    pub fn from_candidate(coin: &CoinCandidate, fetched_at: &str) -> Self {
        ReferenceCoin {
            id: coin.id.clone(),
            name: coin.name.clone(),
            symbol: coin.symbol.clone(),
            description: coin.description.clone(),
            created_at: coin.created_at.clone(),
            creator_address: coin.creator_address.clone(),
            unique_holders: coin.unique_holders,
            media_mime_type: coin.mime_type.clone(),
            media_preview_url: coin.preview_image_url.clone(),
            media_original_uri: coin.original_image_url.clone(),
            total_supply: coin.total_supply,
            total_volume: coin.total_volume,
            volume_24h: coin.volume_24h,
            market_cap: coin.market_cap,
            market_cap_delta_24h: coin.market_cap_delta_24h,
            address: coin.address.clone(),
            transfer_count: coin.transfer_count,
            scraped_at: fetched_at.to_string(),
            updated_at: fetched_at.to_string(),
        }
    }

    /// Snapshot a fetched list, stamping every row with `now`.
    pub fn snapshot(coins: &[CoinCandidate], now: DateTime<Utc>) -> Vec<ReferenceCoin> {
        let fetched_at = now.format("%Y-%m-%d %H:%M:%S%.3f").to_string();
        coins
            .iter()
            .map(|c| ReferenceCoin::from_candidate(c, &fetched_at))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Similarity scores
// ---------------------------------------------------------------------------

/// The four weighted similarities produced by the external model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarities {
    pub sentiment: f64,
    pub embed: f64,
    pub finance: f64,
    pub total: f64,
}

// ---------------------------------------------------------------------------
// Prediction view
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Image,
    Video,
    Other,
    Unknown,
}

impl MediaType {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.is_empty() {
            MediaType::Unknown
        } else if mime_type.starts_with("image/") {
            MediaType::Image
        } else if mime_type.starts_with("video/") {
            MediaType::Video
        } else {
            MediaType::Other
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MediaType::Image => "Image",
            MediaType::Video => "Video",
            MediaType::Other => "Other",
            MediaType::Unknown => "Unknown",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionStatus {
    /// prediction >= 60
    Active,
    /// prediction 50–60
    Watching,
    /// prediction < 50
    #[serde(rename = "Low Potential")]
    LowPotential,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Orange,
    Red,
}

impl PredictionStatus {
    pub fn from_score(score: f64) -> Self {
        if score >= ACTIVE_MIN {
            PredictionStatus::Active
        } else if score >= WATCHING_MIN {
            PredictionStatus::Watching
        } else {
            PredictionStatus::LowPotential
        }
    }

    pub fn color(self) -> StatusColor {
        match self {
            PredictionStatus::Active => StatusColor::Green,
            PredictionStatus::Watching => StatusColor::Orange,
            PredictionStatus::LowPotential => StatusColor::Red,
        }
    }
}

impl std::fmt::Display for PredictionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PredictionStatus::Active => "Active",
            PredictionStatus::Watching => "Watching",
            PredictionStatus::LowPotential => "Low Potential",
        };
        write!(f, "{s}")
    }
}

/// Presentation record returned by the prediction endpoint. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionView {
    /// Coin address.
    pub id: String,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    /// `total_similarity`, percentage-like.
    pub prediction: f64,
    pub confidence: f64,
    /// Heuristic, in hours.
    pub time_to_viral: f64,
    pub status: PredictionStatus,
    pub status_color: StatusColor,
}

/// Result of scoring a single coin within a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum CoinOutcome {
    Scored(PredictionView),
    Failed { address: String, error: String },
}
