pub mod cache;
pub mod config;
pub mod crawler;
pub mod database;
pub mod declare;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod scheduler;
pub mod util;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio_cron_scheduler::JobScheduler;

#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

async fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // configuration and database problems abort here, before any symbol
    // is processed
    database::ping()
        .await
        .context("PostgreSQL is unreachable at startup")?;

    let sched = JobScheduler::new().await?;
    scheduler::start(&sched).await?;

    let addr = format!("0.0.0.0:{}", config::SETTINGS.system.health_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    logging::info_console(format!("health endpoint listening on {}", addr));

    axum::serve(listener, Router::new().route("/health", get(health))).await?;

    Ok(())
}
