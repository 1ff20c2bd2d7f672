use std::collections::HashSet;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::db::CoinStore;
use crate::error::Result;
use crate::fetcher::CoinSource;
use crate::types::CoinCandidate;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeStats {
    pub pages: usize,
    pub saved: usize,
    pub failed: usize,
}

/// Walk the most-valuable list page by page, following each page's cursor,
/// and persist every coin with its creator profile.
///
/// A failing coin is logged and counted; the walk continues. A failing page
/// ends the walk and keeps what was saved so far. The walk also stops on a
/// repeated cursor or after `max_pages`.
pub async fn scrape_most_valuable(
    source: &dyn CoinSource,
    store: &CoinStore,
    max_pages: usize,
) -> ScrapeStats {
    let mut stats = ScrapeStats::default();
    let mut seen = HashSet::new();
    let mut cursor: Option<String> = None;

    while stats.pages < max_pages {
        let page = match source.most_valuable_page(cursor.clone()).await {
            Ok(p) => p,
            Err(e) => {
                error!(page = stats.pages + 1, "Error fetching most valuable coins: {e}");
                break;
            }
        };
        stats.pages += 1;

        for coin in &page.coins {
            match save_coin(store, coin).await {
                Ok(()) => stats.saved += 1,
                Err(e) => {
                    warn!(address = %coin.address, "Failed to save coin: {e}");
                    stats.failed += 1;
                }
            }
        }
        info!(
            page = stats.pages,
            coins = page.coins.len(),
            saved = stats.saved,
            "Saved most valuable page"
        );

        match page.next_cursor {
            Some(next) if seen.insert(next.clone()) => cursor = Some(next),
            Some(next) => {
                warn!(cursor = %next, "Explore API repeated a cursor, stopping");
                break;
            }
            None => break,
        }
    }

    if stats.pages == max_pages {
        warn!(max_pages, "Stopped at page limit");
    }

    stats
}

async fn save_coin(store: &CoinStore, coin: &CoinCandidate) -> Result<()> {
    if !coin.creator_address.is_empty() {
        store
            .upsert_profile(&coin.creator_address, &coin.creator_handle, &coin.creator_avatar_url)
            .await?;
    }
    store
        .upsert_details(coin, Utc::now().timestamp_millis())
        .await
}
