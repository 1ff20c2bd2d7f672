use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{error, info};

use crate::error::{AppError, Result};
use crate::ohlc::aggregate_daily;
use crate::types::{DailyCandle, PricePoint};

#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Price / market cap / volume samples for `asset_id` in `[from, to]`,
    /// ascending by time.
    async fn fetch_price_history(
        &self,
        asset_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>>;
}

pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGeckoClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(f64, f64)>,
    #[serde(default)]
    market_caps: Vec<(f64, f64)>,
    #[serde(default)]
    total_volumes: Vec<(f64, f64)>,
}

#[async_trait]
impl MarketDataSource for CoinGeckoClient {
    async fn fetch_price_history(
        &self,
        asset_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<PricePoint>> {
        let url = format!("{}/coins/{}/market_chart/range", self.base_url, asset_id);
        let from_secs = from.timestamp().to_string();
        let to_secs = to.timestamp().to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("vs_currency", "usd"),
                ("from", from_secs.as_str()),
                ("to", to_secs.as_str()),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(AppError::Upstream(format!(
                "market_chart/range for {asset_id} returned {}",
                resp.status()
            )));
        }

        let chart: MarketChartResponse = resp.json().await?;
        Ok(price_points(chart))
    }
}

/// Zip the three parallel series by index. Market cap and volume default to
/// zero where their series is shorter than `prices`.
fn price_points(chart: MarketChartResponse) -> Vec<PricePoint> {
    chart
        .prices
        .iter()
        .enumerate()
        .map(|(i, &(ts, price))| PricePoint {
            timestamp_ms: ts as i64,
            price,
            market_cap: chart.market_caps.get(i).map_or(0.0, |&(_, v)| v),
            volume: chart.total_volumes.get(i).map_or(0.0, |&(_, v)| v),
        })
        .collect()
}

/// Fetch history and aggregate it into daily candles.
///
/// A failed fetch is logged and yields an empty series; callers must read an
/// empty result as "no data".
pub async fn fetch_daily_candles(
    source: &dyn MarketDataSource,
    asset_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Vec<DailyCandle> {
    match source.fetch_price_history(asset_id, from, to).await {
        Ok(points) => {
            let candles = aggregate_daily(&points);
            info!(
                asset_id,
                points = points.len(),
                candles = candles.len(),
                "Aggregated daily OHLC"
            );
            candles
        }
        Err(e) => {
            error!(asset_id, "Error fetching market data: {e}");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Option<Vec<PricePoint>>);

    #[async_trait]
    impl MarketDataSource for FixedSource {
        async fn fetch_price_history(
            &self,
            _asset_id: &str,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Vec<PricePoint>> {
            self.0
                .clone()
                .ok_or_else(|| AppError::Upstream("unreachable".to_string()))
        }
    }

    #[test]
    fn zips_series_by_index() {
        let raw = r#"{
            "prices":[[1736384400000,0.021],[1736388000000,0.023]],
            "market_caps":[[1736384400000,2100000.0]],
            "total_volumes":[[1736384400000,500.0],[1736388000000,250.0]]
        }"#;
        let points = price_points(serde_json::from_str(raw).unwrap());
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].timestamp_ms, 1_736_384_400_000);
        assert_eq!(points[0].market_cap, 2_100_000.0);
        assert_eq!(points[1].market_cap, 0.0);
        assert_eq!(points[1].volume, 250.0);
    }

    #[tokio::test]
    async fn fetch_failure_yields_empty_series() {
        let candles =
            fetch_daily_candles(&FixedSource(None), "zora-ai", Utc::now(), Utc::now()).await;
        assert!(candles.is_empty());
    }

    #[tokio::test]
    async fn fetched_points_are_aggregated() {
        let points = vec![
            PricePoint { timestamp_ms: 1_736_384_400_000, price: 1.0, market_cap: 10.0, volume: 1.0 },
            PricePoint { timestamp_ms: 1_736_388_000_000, price: 2.0, market_cap: 20.0, volume: 1.0 },
        ];
        let candles =
            fetch_daily_candles(&FixedSource(Some(points)), "zora-ai", Utc::now(), Utc::now())
                .await;
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].close, 2.0);
        assert_eq!(candles[0].volume, 2.0);
    }
}
