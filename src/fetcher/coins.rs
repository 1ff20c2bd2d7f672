use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::types::CoinCandidate;

/// One page of an explore list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoinPage {
    pub coins: Vec<CoinCandidate>,
    /// Cursor for the next page; `None` on the last page.
    pub next_cursor: Option<String>,
}

/// Source of candidate coins for the prediction endpoint and the scrape job.
#[async_trait]
pub trait CoinSource: Send + Sync {
    /// Newest coins; these are the ones scored.
    async fn fetch_new_coins(&self) -> Result<Vec<CoinCandidate>>;

    /// One page of the most valuable list, starting after `after`.
    async fn most_valuable_page(&self, after: Option<String>) -> Result<CoinPage>;

    /// First page of the most valuable list; the reference set the model
    /// compares against.
    async fn fetch_most_valuable(&self) -> Result<Vec<CoinCandidate>> {
        Ok(self.most_valuable_page(None).await?.coins)
    }
}

/// Client for the coin explore REST API.
pub struct ZoraExploreClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    count: u32,
}

impl ZoraExploreClient {
    pub fn new(base_url: &str, api_key: Option<String>, count: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            count,
        })
    }

    async fn explore(&self, list_type: &str, after: Option<&str>) -> Result<CoinPage> {
        let url = format!("{}/explore", self.base_url);
        let count = self.count.to_string();

        let mut req = self
            .client
            .get(&url)
            .query(&[("listType", list_type), ("count", count.as_str())]);
        if let Some(cursor) = after {
            req = req.query(&[("after", cursor)]);
        }
        if let Some(key) = &self.api_key {
            req = req.header("api-key", key);
        }

        let resp = req.send().await?;
        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "explore {list_type} returned {}",
                resp.status()
            )));
        }

        let body: ExploreResponse = resp.json().await?;
        let page = page_from_response(body);
        debug!(
            list_type,
            coins = page.coins.len(),
            has_next = page.next_cursor.is_some(),
            "Fetched explore list"
        );
        Ok(page)
    }
}

#[async_trait]
impl CoinSource for ZoraExploreClient {
    async fn fetch_new_coins(&self) -> Result<Vec<CoinCandidate>> {
        Ok(self.explore("NEW", None).await?.coins)
    }

    async fn most_valuable_page(&self, after: Option<String>) -> Result<CoinPage> {
        self.explore("MOST_VALUABLE", after.as_deref()).await
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExploreResponse {
    explore_list: Option<ExploreList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExploreList {
    #[serde(default)]
    edges: Vec<CoinEdge>,
    page_info: Option<PageInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PageInfo {
    end_cursor: Option<String>,
    has_next_page: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct CoinEdge {
    node: Option<CoinNode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CoinNode {
    id: Option<String>,
    address: Option<String>,
    name: Option<String>,
    symbol: Option<String>,
    description: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    total_supply: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    total_volume: Option<f64>,
    #[serde(rename = "volume24h", deserialize_with = "lenient_f64")]
    volume_24h: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    market_cap: Option<f64>,
    #[serde(rename = "marketCapDelta24h", deserialize_with = "lenient_f64")]
    market_cap_delta_24h: Option<f64>,
    created_at: Option<String>,
    creator_address: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    unique_holders: Option<f64>,
    transfers: Option<Transfers>,
    media_content: Option<MediaContent>,
    creator_profile: Option<CreatorProfile>,
}

#[derive(Debug, Default, Deserialize)]
struct Transfers {
    count: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MediaContent {
    mime_type: Option<String>,
    original_uri: Option<String>,
    preview_image: Option<PreviewImage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PreviewImage {
    small: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreatorProfile {
    handle: Option<String>,
    avatar: Option<Avatar>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Avatar {
    preview_image: Option<PreviewImage>,
}

/// Numbers arrive either as JSON numbers or as decimal strings.
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(v.and_then(|v| v.as_f64().or_else(|| v.as_str().and_then(|s| s.parse().ok()))))
}

fn page_from_response(body: ExploreResponse) -> CoinPage {
    let Some(list) = body.explore_list else {
        return CoinPage::default();
    };
    let page_info = list.page_info.unwrap_or_default();
    let next_cursor = match page_info.has_next_page {
        Some(false) => None,
        _ => page_info.end_cursor.filter(|c| !c.is_empty()),
    };
    let coins = list
        .edges
        .into_iter()
        .filter_map(|edge| edge.node)
        .map(CoinCandidate::from)
        .filter(|coin| !coin.address.is_empty())
        .collect();

    CoinPage { coins, next_cursor }
}

impl From<CoinNode> for CoinCandidate {
    fn from(node: CoinNode) -> Self {
        let media = node.media_content.unwrap_or_default();
        let profile = node.creator_profile.unwrap_or_default();

        CoinCandidate {
            id: node.id.unwrap_or_default(),
            address: node.address.unwrap_or_default(),
            name: node.name.unwrap_or_default(),
            symbol: node.symbol.unwrap_or_default(),
            description: node.description.unwrap_or_default(),
            total_supply: node.total_supply.unwrap_or(0.0),
            total_volume: node.total_volume.unwrap_or(0.0),
            volume_24h: node.volume_24h.unwrap_or(0.0),
            market_cap: node.market_cap.unwrap_or(0.0),
            market_cap_delta_24h: node.market_cap_delta_24h.unwrap_or(0.0),
            created_at: node
                .created_at
                .map(|s| s.replace('T', " "))
                .unwrap_or_default(),
            creator_address: node.creator_address.unwrap_or_default(),
            creator_handle: profile.handle.unwrap_or_default(),
            creator_avatar_url: profile
                .avatar
                .and_then(|a| a.preview_image)
                .and_then(|p| p.small)
                .unwrap_or_default(),
            unique_holders: node.unique_holders.unwrap_or(0.0),
            transfer_count: node.transfers.and_then(|t| t.count).unwrap_or(0),
            mime_type: media.mime_type.unwrap_or_default(),
            preview_image_url: media
                .preview_image
                .and_then(|p| p.small)
                .unwrap_or_default(),
            original_image_url: media.original_uri.unwrap_or_default(),
        }
    }
}
