use std::time::{Duration, Instant};

use once_cell::sync::{Lazy, OnceCell};
use reqwest::{Client, Response};
use tokio::sync::Semaphore;

use crate::logging::Logger;

pub mod user_agent;

/// Process-wide bound on concurrent outbound requests. The quote source is
/// rate-limited per api key, so the budget stays small.
static SEMAPHORE: Lazy<Semaphore> = Lazy::new(|| Semaphore::new(4));

/// A singleton instance of the reqwest client.
static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

/// Returns the reqwest client singleton instance or creates one if it
/// doesn't exist.
fn get_client() -> Result<&'static Client, reqwest::Error> {
    CLIENT.get_or_try_init(|| {
        // reqwest is built with `rustls-no-provider`, so the process-wide
        // crypto provider (ring, per Cargo.toml) must be installed before any
        // client can be constructed. Idempotent: a second call is a no-op.
        let _ = rustls::crypto::ring::default_provider().install_default();
        Client::builder()
            .brotli(true)
            .gzip(true)
            .zstd(true)
            .connect_timeout(Duration::from_secs(8))
            .timeout(Duration::from_secs(15))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(user_agent::gen_random_ua())
            .build()
    })
}

/// Performs a single HTTP GET bounded by `timeout`.
///
/// Exactly one attempt per call: retry policy belongs to the caller's own
/// schedule, not to this layer. The per-request `timeout` replaces the
/// client-wide default.
pub async fn get(url: &str, timeout: Duration) -> Result<Response, reqwest::Error> {
    // the api key rides in the query string, keep it out of the log
    let visit_log = url.split('?').next().unwrap_or(url).to_string();

    let permit = SEMAPHORE.acquire().await;
    let start = Instant::now();
    let result = get_client()?.get(url).timeout(timeout).send().await;
    let elapsed = start.elapsed().as_millis();
    drop(permit);

    match &result {
        Ok(response) => {
            LOGGER.info(format!("GET:{} {} {} ms", visit_log, response.status(), elapsed));
        }
        Err(why) => {
            LOGGER.error(format!("GET:{} failed because {:?}. {} ms", visit_log, why, elapsed));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use axum::{routing::get as axum_get, Router};

    use super::*;

    #[tokio::test]
    async fn test_get_local() {
        let app = Router::new().route("/ping", axum_get(|| async { "pong" }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let url = format!("http://{}/ping?secret=1", addr);
        let response = get(&url, Duration::from_secs(5)).await.unwrap();
        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), "pong");
    }
}
