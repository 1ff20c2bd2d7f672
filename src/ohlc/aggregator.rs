use chrono::{DateTime, SecondsFormat, Utc};
use tracing::warn;

use crate::types::{DailyCandle, PricePoint};

/// Bucket an ascending series of price points into one candle per UTC
/// calendar date.
///
/// Single pass: a day is closed when the next point falls on a different
/// date, or the series ends. Input order is trusted; unsorted input yields
/// split or merged days. Points whose timestamp chrono cannot represent are
/// logged and dropped.
pub fn aggregate_daily(points: &[PricePoint]) -> Vec<DailyCandle> {
    let dated: Vec<(DateTime<Utc>, &PricePoint)> = points
        .iter()
        .filter_map(|p| match DateTime::from_timestamp_millis(p.timestamp_ms) {
            Some(at) => Some((at, p)),
            None => {
                warn!(timestamp_ms = p.timestamp_ms, "Skipping price point with out-of-range timestamp");
                None
            }
        })
        .collect();

    let mut candles = Vec::new();
    let mut day: Vec<(DateTime<Utc>, &PricePoint)> = Vec::new();

    for (i, &(at, point)) in dated.iter().enumerate() {
        day.push((at, point));

        let day_ends = match dated.get(i + 1) {
            Some((next, _)) => next.date_naive() != at.date_naive(),
            None => true,
        };

        if day_ends {
            candles.push(close_day(&day));
            day.clear();
        }
    }

    candles
}

/// `day` is never empty: a point is pushed before every close.
fn close_day(day: &[(DateTime<Utc>, &PricePoint)]) -> DailyCandle {
    let (opened_at, first) = day[0];
    let (_, last) = day[day.len() - 1];

    DailyCandle {
        timestamp: opened_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        open: first.price,
        high: day.iter().map(|(_, p)| p.price).fold(f64::NEG_INFINITY, f64::max),
        low: day.iter().map(|(_, p)| p.price).fold(f64::INFINITY, f64::min),
        close: last.price,
        market_cap: last.market_cap,
        volume: day.iter().fold(0.0, |acc, (_, p)| acc + p.volume),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 86_400_000;
    const HOUR_MS: i64 = 3_600_000;
    // 2025-01-09T00:00:00Z
    const JAN_9: i64 = 1_736_380_800_000;

    fn pt(timestamp_ms: i64, price: f64, volume: f64) -> PricePoint {
        PricePoint {
            timestamp_ms,
            price,
            market_cap: price * 1_000.0,
            volume,
        }
    }

    #[test]
    fn empty_input_yields_no_candles() {
        assert!(aggregate_daily(&[]).is_empty());
    }

    #[test]
    fn single_point_day_is_flat() {
        let candles = aggregate_daily(&[pt(JAN_9 + HOUR_MS, 0.02, 5.0)]);
        assert_eq!(candles.len(), 1);
        let c = &candles[0];
        assert_eq!((c.open, c.high, c.low, c.close), (0.02, 0.02, 0.02, 0.02));
        assert_eq!(c.volume, 5.0);
        assert_eq!(c.market_cap, 20.0);
        assert_eq!(c.timestamp, "2025-01-09T01:00:00.000Z");
    }

    #[test]
    fn splits_on_utc_date_change() {
        let points = [
            pt(JAN_9 + HOUR_MS, 1.0, 10.0),
            pt(JAN_9 + 6 * HOUR_MS, 3.0, 20.0),
            pt(JAN_9 + 23 * HOUR_MS, 0.5, 30.0),
            pt(JAN_9 + DAY_MS, 2.0, 1.0),
            pt(JAN_9 + DAY_MS + 12 * HOUR_MS, 2.5, 2.0),
            pt(JAN_9 + 3 * DAY_MS, 4.0, 4.0),
        ];
        let candles = aggregate_daily(&points);
        assert_eq!(candles.len(), 3);

        let d1 = &candles[0];
        assert_eq!(d1.open, 1.0);
        assert_eq!(d1.close, 0.5);
        assert_eq!(d1.high, 3.0);
        assert_eq!(d1.low, 0.5);
        assert_eq!(d1.volume, 60.0);
        assert_eq!(d1.market_cap, 500.0);

        let d2 = &candles[1];
        assert_eq!(d2.timestamp, "2025-01-10T00:00:00.000Z");
        assert_eq!((d2.open, d2.close), (2.0, 2.5));
        assert_eq!(d2.volume, 3.0);

        // Gap day produces nothing; the next present day still gets its own candle.
        assert_eq!(candles[2].timestamp, "2025-01-12T00:00:00.000Z");
    }

    #[test]
    fn candles_respect_price_bounds() {
        let prices = [0.9, 1.4, 0.7, 1.1, 1.05, 0.3, 0.8, 1.9, 1.2];
        let points: Vec<_> = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| pt(JAN_9 + i as i64 * 7 * HOUR_MS, p, 1.0))
            .collect();

        for c in aggregate_daily(&points) {
            assert!(c.low <= c.open.min(c.close), "{c:?}");
            assert!(c.high >= c.open.max(c.close), "{c:?}");
        }
    }

    #[test]
    fn volume_is_summed_in_input_order() {
        let points = [
            pt(JAN_9, 1.0, 0.1),
            pt(JAN_9 + HOUR_MS, 1.0, 0.2),
            pt(JAN_9 + 2 * HOUR_MS, 1.0, 0.3),
        ];
        let candles = aggregate_daily(&points);
        assert_eq!(candles[0].volume, 0.1 + 0.2 + 0.3);
    }

    #[test]
    fn out_of_range_timestamp_is_skipped() {
        let points = [
            pt(JAN_9, 1.0, 1.0),
            pt(i64::MAX, 9.0, 100.0),
            pt(JAN_9 + HOUR_MS, 2.0, 1.0),
        ];
        let candles = aggregate_daily(&points);

        assert_eq!(candles.len(), 1);
        let c = &candles[0];
        assert_eq!(c.timestamp, "2025-01-09T00:00:00.000Z");
        assert_eq!((c.open, c.high, c.close), (1.0, 2.0, 2.0));
        assert_eq!(c.volume, 2.0);
        assert!(candles.iter().all(|c| !c.timestamp.is_empty()));
    }

    #[test]
    fn rerun_is_identical() {
        let points: Vec<_> = (0..50)
            .map(|i| pt(JAN_9 + i * 5 * HOUR_MS, 1.0 + (i % 7) as f64 * 0.1, i as f64))
            .collect();
        assert_eq!(aggregate_daily(&points), aggregate_daily(&points));
    }
}
