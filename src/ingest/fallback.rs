use chrono::{NaiveDateTime, Timelike};
use rand::RngExt;

use crate::declare::RawQuote;

/// Rough price anchors so synthetic data lands near each ticker's real
/// neighborhood. Unknown symbols fall back to 100.
const BASE_PRICES: [(&str, f64); 5] = [
    ("AAPL", 150.0),
    ("GOOGL", 2800.0),
    ("MSFT", 300.0),
    ("AMZN", 3000.0),
    ("TSLA", 200.0),
];

const DEFAULT_BASE_PRICE: f64 = 100.0;

/// Produces one synthetic, schema-valid observation timestamped at `now`
/// truncated to the hour. Always succeeds.
///
/// Prices are randomized but bounded: open within ±5% of the symbol's base
/// price, high/low within ±2% of open, close inside [low, high], volume in
/// [100_000, 1_000_000]. The strings are formatted exactly like the wire
/// (`{:.2}` prices, plain integer volume), so the batch flows through the
/// same normalization as live data.
pub fn generate(symbol: &str, now: NaiveDateTime) -> Vec<RawQuote> {
    let upper = symbol.to_uppercase();
    let base = BASE_PRICES
        .iter()
        .find(|(s, _)| *s == upper)
        .map(|(_, price)| *price)
        .unwrap_or(DEFAULT_BASE_PRICE);

    let mut rng = rand::rng();
    let open = base * (1.0 + rng.random_range(-0.05..=0.05));
    let high = open * (1.0 + rng.random_range(0.0..=0.02));
    let low = open * (1.0 - rng.random_range(0.0..=0.02));
    let close = rng.random_range(low..=high);
    let volume: i64 = rng.random_range(100_000..=1_000_000);

    let stamp = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);

    vec![RawQuote {
        timestamp: stamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        open: format!("{:.2}", open),
        high: format!("{:.2}", high),
        low: format!("{:.2}", low),
        close: format!("{:.2}", close),
        volume: volume.to_string(),
    }]
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::util::datetime;

    use super::*;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(12, 34, 56)
            .unwrap()
    }

    #[test]
    fn test_generate_one_bounded_point() {
        for _ in 0..200 {
            let batch = generate("AAPL", noon());
            assert_eq!(batch.len(), 1);

            let raw = &batch[0];
            let open: f64 = raw.open.parse().unwrap();
            let high: f64 = raw.high.parse().unwrap();
            let low: f64 = raw.low.parse().unwrap();
            let close: f64 = raw.close.parse().unwrap();
            let volume: i64 = raw.volume.parse().unwrap();

            assert!(low <= open && open <= high, "open outside [low, high]: {:?}", raw);
            assert!(low <= close && close <= high, "close outside [low, high]: {:?}", raw);
            assert!(open > 100.0, "AAPL synthetic price strayed from base: {}", open);
            assert!((100_000..=1_000_000).contains(&volume));
        }
    }

    #[test]
    fn test_generate_truncates_to_the_hour() {
        let batch = generate("MSFT", noon());
        assert_eq!(batch[0].timestamp, "2024-01-02 12:00:00");
        assert!(datetime::parse_quote_time(&batch[0].timestamp).is_some());
    }

    #[test]
    fn test_generate_unknown_symbol_uses_default_base() {
        let batch = generate("ZZZZ", noon());
        let open: f64 = batch[0].open.parse().unwrap();
        assert!((90.0..=110.0).contains(&open));
    }
}
