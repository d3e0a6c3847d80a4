use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use strum_macros::{Display, EnumString};

use crate::util::map::Keyable;

/// Sampling interval requested from the quote source.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Display, EnumString)]
pub enum Interval {
    #[strum(serialize = "daily")]
    Daily,
    #[strum(serialize = "1min")]
    Min1,
    #[strum(serialize = "5min")]
    Min5,
    #[strum(serialize = "15min")]
    Min15,
    #[strum(serialize = "30min")]
    Min30,
    #[default]
    #[strum(serialize = "60min")]
    Min60,
}

impl Interval {
    /// The source's `function` query parameter.
    pub fn function(&self) -> &'static str {
        match self {
            Interval::Daily => "TIME_SERIES_DAILY",
            _ => "TIME_SERIES_INTRADAY",
        }
    }

    /// The `interval` query parameter, present for intraday requests only.
    pub fn query_value(&self) -> Option<&'static str> {
        match self {
            Interval::Daily => None,
            Interval::Min1 => Some("1min"),
            Interval::Min5 => Some("5min"),
            Interval::Min15 => Some("15min"),
            Interval::Min30 => Some("30min"),
            Interval::Min60 => Some("60min"),
        }
    }

    /// Key of the series object inside the source's response body.
    pub fn series_key(&self) -> &'static str {
        match self {
            Interval::Daily => "Time Series (Daily)",
            Interval::Min1 => "Time Series (1min)",
            Interval::Min5 => "Time Series (5min)",
            Interval::Min15 => "Time Series (15min)",
            Interval::Min30 => "Time Series (30min)",
            Interval::Min60 => "Time Series (60min)",
        }
    }
}

/// One observation as the source hands it over: the timestamp plus the five
/// value fields, all still strings. The fallback generator produces the same
/// shape so the normalizer treats live and synthetic batches identically.
#[derive(Debug, Clone)]
pub struct RawQuote {
    pub timestamp: String,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

/// One canonical OHLCV observation, validated and ready for storage.
///
/// `(symbol, timestamp)` is the natural identity; a second write of the same
/// pair is a no-op, never a double count.
#[derive(Debug, Clone, PartialEq)]
pub struct QuotePoint {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: i64,
}

impl Keyable for QuotePoint {
    fn key(&self) -> String {
        format!("{}:{}", self.symbol, self.timestamp.format("%Y-%m-%d %H:%M:%S"))
    }

    fn key_with_prefix(&self) -> String {
        format!("QuotePoint:{}", self.key())
    }
}

/// Ticker symbols are short uppercase alphanumerics, 1 to 10 chars.
pub fn is_valid_symbol(symbol: &str) -> bool {
    !symbol.is_empty()
        && symbol.len() <= 10
        && symbol.chars().all(|c| c.is_ascii_alphanumeric())
}
