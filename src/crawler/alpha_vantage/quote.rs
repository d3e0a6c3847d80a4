use std::collections::HashMap;

use reqwest::StatusCode;
use serde::Deserialize;

use crate::{
    crawler::alpha_vantage::QuoteSource,
    declare::{is_valid_symbol, Interval, RawQuote},
    error::FetchError,
    util,
};

/// The source's response envelope. A data series, a rate-limit note and an
/// error message are mutually exclusive shapes; the series arrives under an
/// interval-dependent key, hence the flattened map.
#[derive(Deserialize, Debug)]
struct TimeSeriesResponse {
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Meta Data")]
    meta_data: Option<HashMap<String, String>>,
    #[serde(flatten)]
    series: HashMap<String, HashMap<String, Entry>>,
}

#[derive(Deserialize, Debug)]
struct Entry {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

/// Fetches the time series for one symbol: exactly one outbound request,
/// bounded by `source.timeout`, no retries.
///
/// An empty series is a valid success (the symbol has no recent data).
pub async fn visit(
    symbol: &str,
    interval: Interval,
    source: &QuoteSource,
) -> Result<Vec<RawQuote>, FetchError> {
    if !is_valid_symbol(&symbol.to_uppercase()) {
        return Err(FetchError::MalformedResponse(format!(
            "invalid symbol {:?}",
            symbol
        )));
    }

    if source.api_key.is_empty() {
        return Err(FetchError::Unauthorized("api key is empty".to_string()));
    }

    let mut url = format!(
        "{}?function={}&symbol={}&outputsize=compact&apikey={}",
        source.base_url,
        interval.function(),
        symbol,
        source.api_key
    );
    if let Some(value) = interval.query_value() {
        url.push_str("&interval=");
        url.push_str(value);
    }

    let response = util::http::get(&url, source.timeout)
        .await
        .map_err(classify_transport_error)?;

    match response.status() {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            return Err(FetchError::Unauthorized(format!(
                "quote source answered {}",
                response.status()
            )));
        }
        StatusCode::TOO_MANY_REQUESTS => {
            return Err(FetchError::RateLimited(format!(
                "quote source answered {}",
                response.status()
            )));
        }
        _ => {}
    }

    let body = response
        .text()
        .await
        .map_err(|why| FetchError::Unreachable(format!("failed to read body: {:?}", why)))?;

    parse_body(symbol, interval, &body)
}

fn parse_body(symbol: &str, interval: Interval, body: &str) -> Result<Vec<RawQuote>, FetchError> {
    let parsed: TimeSeriesResponse = serde_json::from_str(body)
        .map_err(|why| FetchError::MalformedResponse(format!("undecodable body: {}", why)))?;

    // a note-shaped body instead of a series is the source's throttle signal
    if let Some(note) = parsed.note.or(parsed.information) {
        return Err(FetchError::RateLimited(note));
    }

    if let Some(message) = parsed.error_message {
        return Err(if message.to_lowercase().contains("apikey") {
            FetchError::Unauthorized(message)
        } else {
            FetchError::MalformedResponse(message)
        });
    }

    if let Some(meta) = &parsed.meta_data {
        if let Some(meta_symbol) = meta.get("2. Symbol") {
            if !meta_symbol.eq_ignore_ascii_case(symbol) {
                return Err(FetchError::MalformedResponse(format!(
                    "response is for {:?}, requested {:?}",
                    meta_symbol, symbol
                )));
            }
        }
    }

    let series = parsed.series.get(interval.series_key()).ok_or_else(|| {
        FetchError::MalformedResponse(format!("missing {:?} in response", interval.series_key()))
    })?;

    let raws = series
        .iter()
        .map(|(timestamp, entry)| RawQuote {
            timestamp: timestamp.clone(),
            open: entry.open.clone(),
            high: entry.high.clone(),
            low: entry.low.clone(),
            close: entry.close.clone(),
            volume: entry.volume.clone(),
        })
        .collect();

    Ok(raws)
}

fn classify_transport_error(why: reqwest::Error) -> FetchError {
    if why.is_timeout() {
        FetchError::Unreachable(format!("request timed out: {:?}", why))
    } else if why.is_connect() {
        FetchError::Unreachable(format!("connect failed: {:?}", why))
    } else {
        FetchError::Unreachable(format!("{:?}", why))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use axum::{routing::get as axum_get, Router};

    use super::*;

    const SERIES_BODY: &str = r#"{
        "Meta Data": {
            "1. Information": "Intraday (60min) open, high, low, close prices and volume",
            "2. Symbol": "AAPL",
            "3. Last Refreshed": "2024-01-02 19:00:00",
            "4. Interval": "60min",
            "5. Output Size": "Compact",
            "6. Time Zone": "US/Eastern"
        },
        "Time Series (60min)": {
            "2024-01-02 19:00:00": {
                "1. open": "185.5800", "2. high": "186.0000",
                "3. low": "185.2100", "4. close": "185.6400", "5. volume": "301405"
            },
            "2024-01-02 18:00:00": {
                "1. open": "185.3000", "2. high": "185.7100",
                "3. low": "185.1200", "4. close": "185.5800", "5. volume": "221164"
            },
            "2024-01-02 17:00:00": {
                "1. open": "185.8000", "2. high": "185.9500",
                "3. low": "185.1000", "4. close": "185.3100", "5. volume": "410645"
            }
        }
    }"#;

    async fn spawn_stub(body: &'static str) -> QuoteSource {
        let app = Router::new().route("/query", axum_get(move || async move { body }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        QuoteSource {
            api_key: "demo".to_string(),
            base_url: format!("http://{}/query", addr),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_visit_maps_every_series_entry() {
        let source = spawn_stub(SERIES_BODY).await;

        let raws = visit("AAPL", Interval::Min60, &source).await.unwrap();

        assert_eq!(raws.len(), 3);
        let seven_pm = raws
            .iter()
            .find(|r| r.timestamp == "2024-01-02 19:00:00")
            .unwrap();
        assert_eq!(seven_pm.open, "185.5800");
        assert_eq!(seven_pm.volume, "301405");
    }

    #[tokio::test]
    async fn test_visit_empty_series_is_success() {
        let source =
            spawn_stub(r#"{"Meta Data": {"2. Symbol": "AAPL"}, "Time Series (60min)": {}}"#).await;

        let raws = visit("AAPL", Interval::Min60, &source).await.unwrap();
        assert!(raws.is_empty());
    }

    #[tokio::test]
    async fn test_visit_note_means_rate_limited() {
        let source = spawn_stub(
            r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#,
        )
        .await;

        match visit("AAPL", Interval::Min60, &source).await {
            Err(FetchError::RateLimited(note)) => assert!(note.contains("5 calls per minute")),
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_visit_information_means_rate_limited() {
        let source = spawn_stub(r#"{"Information": "API rate limit reached."}"#).await;

        assert!(matches!(
            visit("AAPL", Interval::Min60, &source).await,
            Err(FetchError::RateLimited(_))
        ));
    }

    #[tokio::test]
    async fn test_visit_bad_key_is_unauthorized() {
        let source =
            spawn_stub(r#"{"Error Message": "the parameter apikey is invalid or missing."}"#).await;

        assert!(matches!(
            visit("AAPL", Interval::Min60, &source).await,
            Err(FetchError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_visit_error_message_is_malformed() {
        let source = spawn_stub(r#"{"Error Message": "Invalid API call."}"#).await;

        assert!(matches!(
            visit("AAPL", Interval::Min60, &source).await,
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_visit_undecodable_body_is_malformed() {
        let source = spawn_stub("<html>maintenance</html>").await;

        assert!(matches!(
            visit("AAPL", Interval::Min60, &source).await,
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_visit_missing_series_is_malformed() {
        let source = spawn_stub(r#"{"Meta Data": {"2. Symbol": "AAPL"}}"#).await;

        assert!(matches!(
            visit("AAPL", Interval::Min60, &source).await,
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_visit_symbol_mismatch_is_malformed() {
        let source = spawn_stub(SERIES_BODY).await;

        assert!(matches!(
            visit("MSFT", Interval::Min60, &source).await,
            Err(FetchError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_visit_rejects_bad_inputs_before_any_request() {
        let source = QuoteSource {
            api_key: "demo".to_string(),
            base_url: "http://127.0.0.1:1/query".to_string(),
            timeout: Duration::from_secs(1),
        };

        assert!(matches!(
            visit("BRK.B", Interval::Min60, &source).await,
            Err(FetchError::MalformedResponse(_))
        ));

        let keyless = QuoteSource {
            api_key: String::new(),
            ..source
        };
        assert!(matches!(
            visit("AAPL", Interval::Min60, &keyless).await,
            Err(FetchError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_visit_timeout_is_bounded() {
        let app = Router::new().route(
            "/query",
            axum_get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "too late"
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let source = QuoteSource {
            api_key: "demo".to_string(),
            base_url: format!("http://{}/query", addr),
            timeout: Duration::from_secs(1),
        };

        let start = Instant::now();
        let result = visit("AAPL", Interval::Min60, &source).await;

        assert!(matches!(result, Err(FetchError::Unreachable(_))));
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_visit_connection_refused_is_unreachable() {
        let source = QuoteSource {
            api_key: "demo".to_string(),
            base_url: "http://127.0.0.1:9/query".to_string(),
            timeout: Duration::from_secs(2),
        };

        assert!(matches!(
            visit("AAPL", Interval::Min60, &source).await,
            Err(FetchError::Unreachable(_))
        ));
    }
}
