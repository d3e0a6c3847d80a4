use std::{env, path::PathBuf};

use anyhow::{ensure, Result};
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

const CONFIG_PATH: &str = "app.json";

const API_KEY: &str = "API_KEY";
const SYMBOLS: &str = "SYMBOLS";
const INTERVAL: &str = "INTERVAL";
const DB_CONNECTION: &str = "DB_CONNECTION";
const QUOTE_BASE_URL: &str = "QUOTE_BASE_URL";
const FETCH_TIMEOUT_SECONDS: &str = "FETCH_TIMEOUT_SECONDS";
const RUN_DEADLINE_SECONDS: &str = "RUN_DEADLINE_SECONDS";
const HEALTH_PORT: &str = "HEALTH_PORT";

pub static SETTINGS: Lazy<App> = Lazy::new(|| App::get().expect("Config error"));

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub alpha_vantage: AlphaVantage,
    #[serde(default)]
    pub postgresql: PostgreSQL,
    #[serde(default)]
    pub ingest: Ingest,
    #[serde(default)]
    pub system: System,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AlphaVantage {
    /// Required. Missing key is a fatal startup condition.
    #[serde(default)]
    pub key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct PostgreSQL {
    /// Full connection URL. Required.
    #[serde(default)]
    pub connection: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Ingest {
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_run_deadline")]
    pub run_deadline_seconds: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct System {
    #[serde(default = "default_health_port")]
    pub health_port: u16,
}

impl Default for AlphaVantage {
    fn default() -> Self {
        AlphaVantage {
            key: String::new(),
            base_url: default_base_url(),
            timeout_seconds: default_fetch_timeout(),
        }
    }
}

impl Default for Ingest {
    fn default() -> Self {
        Ingest {
            symbols: default_symbols(),
            interval: default_interval(),
            run_deadline_seconds: default_run_deadline(),
        }
    }
}

impl Default for System {
    fn default() -> Self {
        System {
            health_port: default_health_port(),
        }
    }
}

impl App {
    fn get() -> Result<Self> {
        let config_path = config_path();
        let config = if config_path.exists() {
            let from_file: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            from_file.override_with_env()
        } else {
            App::default().override_with_env()
        };

        ensure!(!config.alpha_vantage.key.is_empty(), "{} is required", API_KEY);
        ensure!(
            !config.postgresql.connection.is_empty(),
            "{} is required",
            DB_CONNECTION
        );

        Ok(config)
    }

    /// env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(key) = env::var(API_KEY) {
            self.alpha_vantage.key = key;
        }

        if let Ok(base_url) = env::var(QUOTE_BASE_URL) {
            self.alpha_vantage.base_url = base_url;
        }

        if let Ok(timeout) = env::var(FETCH_TIMEOUT_SECONDS) {
            self.alpha_vantage.timeout_seconds =
                timeout.parse().unwrap_or_else(|_| default_fetch_timeout());
        }

        if let Ok(connection) = env::var(DB_CONNECTION) {
            self.postgresql.connection = connection;
        }

        if let Ok(symbols) = env::var(SYMBOLS) {
            let parsed = parse_symbols(&symbols);
            if !parsed.is_empty() {
                self.ingest.symbols = parsed;
            }
        }

        if let Ok(interval) = env::var(INTERVAL) {
            self.ingest.interval = interval;
        }

        if let Ok(deadline) = env::var(RUN_DEADLINE_SECONDS) {
            self.ingest.run_deadline_seconds =
                deadline.parse().unwrap_or_else(|_| default_run_deadline());
        }

        if let Ok(port) = env::var(HEALTH_PORT) {
            self.system.health_port = port.parse().unwrap_or_else(|_| default_health_port());
        }

        self
    }
}

/// Splits a comma-separated ticker list, trimming and uppercasing entries.
pub fn parse_symbols(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}

fn default_base_url() -> String {
    crate::crawler::alpha_vantage::default_base_url()
}

fn default_fetch_timeout() -> u64 {
    15
}

fn default_symbols() -> Vec<String> {
    ["AAPL", "GOOGL", "MSFT", "AMZN", "TSLA"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_interval() -> String {
    "60min".to_string()
}

fn default_run_deadline() -> u64 {
    120
}

fn default_health_port() -> u16 {
    8000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols() {
        assert_eq!(parse_symbols("AAPL,GOOGL"), vec!["AAPL", "GOOGL"]);
        assert_eq!(parse_symbols(" aapl , msft "), vec!["AAPL", "MSFT"]);
        assert_eq!(parse_symbols(",,"), Vec::<String>::new());
    }

    #[test]
    fn test_defaults() {
        let app = App::default();
        assert_eq!(app.ingest.symbols.len(), 5);
        assert_eq!(app.ingest.interval, "60min");
        assert_eq!(app.alpha_vantage.base_url, "https://www.alphavantage.co/query");
        assert!(app.alpha_vantage.key.is_empty());
    }
}
