pub mod prediction;
pub mod scoring_cache;

pub use scoring_cache::ScoringCache;
