use std::str::FromStr;

use chrono::{Duration, NaiveDateTime};
use rust_decimal::Decimal;

use crate::{
    declare::{is_valid_symbol, QuotePoint, RawQuote},
    error::ValidationError,
    util::datetime,
};

/// A timestamp may run ahead of `now` by at most this much (exchange
/// timezones vs. local clock) before the point is considered bogus.
const FUTURE_GRACE_HOURS: i64 = 24;

/// Result of normalizing one batch: the surviving canonical points plus how
/// many inputs were dropped on the way.
#[derive(Debug, Clone)]
pub struct Normalized {
    pub points: Vec<QuotePoint>,
    pub dropped: usize,
}

/// Converts a raw batch (live or synthetic) into canonical points.
///
/// One bad point never discards the batch: it is dropped and counted.
/// The output is sorted ascending by timestamp regardless of source order,
/// and duplicate timestamps within the batch collapse to the first
/// occurrence. `Err(AllInvalid)` fires only when a non-empty input produced
/// nothing; an empty input is a valid empty batch.
pub fn normalize(
    symbol: &str,
    raws: Vec<RawQuote>,
    now: NaiveDateTime,
) -> Result<Normalized, ValidationError> {
    let symbol = symbol.trim().to_uppercase();
    if !is_valid_symbol(&symbol) {
        return Err(ValidationError::AllInvalid { dropped: raws.len() });
    }

    if raws.is_empty() {
        return Ok(Normalized {
            points: Vec::new(),
            dropped: 0,
        });
    }

    let total = raws.len();
    let mut points: Vec<QuotePoint> = raws
        .iter()
        .filter_map(|raw| canonical_point(&symbol, raw, now))
        .collect();

    points.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    points.dedup_by_key(|p| p.timestamp);

    let dropped = total - points.len();
    if points.is_empty() {
        return Err(ValidationError::AllInvalid { dropped });
    }

    Ok(Normalized { points, dropped })
}

fn canonical_point(symbol: &str, raw: &RawQuote, now: NaiveDateTime) -> Option<QuotePoint> {
    let timestamp = datetime::parse_quote_time(&raw.timestamp)?;
    if timestamp > now + Duration::hours(FUTURE_GRACE_HOURS) {
        return None;
    }

    let open = parse_price(&raw.open)?;
    let high = parse_price(&raw.high)?;
    let low = parse_price(&raw.low)?;
    let close = parse_price(&raw.close)?;
    if high < low {
        return None;
    }

    let volume = raw.volume.trim().parse::<i64>().ok().filter(|v| *v >= 0)?;

    Some(QuotePoint {
        symbol: symbol.to_string(),
        timestamp,
        open,
        high,
        low,
        close,
        volume,
    })
}

fn parse_price(value: &str) -> Option<Decimal> {
    Decimal::from_str(value.trim())
        .ok()
        .filter(|d| !d.is_sign_negative())
}
