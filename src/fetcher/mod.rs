pub mod coins;
pub mod market_data;
pub mod similarity;

pub use coins::{CoinPage, CoinSource, ZoraExploreClient};
pub use market_data::{fetch_daily_candles, CoinGeckoClient, MarketDataSource};
pub use similarity::{HttpSimilarityScorer, ScoreRequest, SimilarityScorer};
