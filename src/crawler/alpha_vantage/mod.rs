use std::time::Duration;

use crate::config;

pub mod quote;

pub const HOST: &str = "www.alphavantage.co";

pub fn default_base_url() -> String {
    format!("https://{}/query", HOST)
}

/// Connection settings for the quote source, carried explicitly so runs and
/// tests never depend on ambient state.
#[derive(Debug, Clone)]
pub struct QuoteSource {
    pub api_key: String,
    /// Query endpoint. Tests point this at a local stub server.
    pub base_url: String,
    /// Ceiling on one fetch. The coordinator may cut it shorter when the
    /// run deadline is closer.
    pub timeout: Duration,
}

impl QuoteSource {
    pub fn from_settings() -> Self {
        QuoteSource {
            api_key: config::SETTINGS.alpha_vantage.key.clone(),
            base_url: config::SETTINGS.alpha_vantage.base_url.clone(),
            timeout: Duration::from_secs(config::SETTINGS.alpha_vantage.timeout_seconds),
        }
    }
}
