pub mod aggregator;
pub mod csv_file;

pub use aggregator::aggregate_daily;
pub use csv_file::{read_candle_rows, save_candles, write_candles_csv};
