pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod ohlc;
pub mod scorer;
pub mod scraper;
pub mod types;
