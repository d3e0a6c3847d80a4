use std::{
    fmt,
    str::FromStr,
    time::{Duration, Instant},
};

use anyhow::Result;
use chrono::{DateTime, Local};

use crate::{
    cache::TtlCache,
    config,
    crawler::alpha_vantage::{self, QuoteSource},
    database,
    database::table::stock_price,
    declare::{Interval, QuotePoint, RawQuote},
    error::FetchError,
    logging,
    util::map::Keyable,
};

use self::{
    normalize::Normalized,
    writer::{PgQuoteSink, QuoteSink},
};

pub mod fallback;
pub mod normalize;
pub mod writer;

/// Everything one run needs, carried explicitly so runs are independently
/// testable and safely re-invokable by the external schedule.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub symbols: Vec<String>,
    pub interval: Interval,
    pub source: QuoteSource,
    /// Wall-clock budget for the whole run. Expiry abandons in-flight
    /// fetches; completed symbols keep their results.
    pub run_deadline: Duration,
}

impl IngestConfig {
    pub fn from_settings() -> Self {
        let interval = Interval::from_str(&config::SETTINGS.ingest.interval).unwrap_or_else(|_| {
            logging::warn_file_async(format!(
                "Unrecognized INTERVAL {:?}, falling back to {}",
                config::SETTINGS.ingest.interval,
                Interval::default()
            ));
            Interval::default()
        });

        IngestConfig {
            symbols: config::SETTINGS.ingest.symbols.clone(),
            interval,
            source: QuoteSource::from_settings(),
            run_deadline: Duration::from_secs(config::SETTINGS.ingest.run_deadline_seconds),
        }
    }
}

/// Terminal state of one symbol's pipeline run.
#[derive(Debug, Clone)]
pub enum SymbolOutcome {
    /// Live data fetched, normalized and written.
    Success,
    /// Synthetic data substituted for unavailable live data; the triggering
    /// failure is preserved for telemetry.
    Degraded(FetchError),
    /// Nothing was written for this symbol.
    Failed(String),
}

impl fmt::Display for SymbolOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolOutcome::Success => write!(f, "success"),
            SymbolOutcome::Degraded(reason) => write!(f, "degraded ({})", reason),
            SymbolOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolReport {
    pub symbol: String,
    pub outcome: SymbolOutcome,
    pub rows_written: u64,
    /// Points discarded during normalization.
    pub dropped: usize,
}

/// Per-run account of what happened, one entry per requested symbol in
/// request order. Lives only as long as the caller's own logging.
#[derive(Debug)]
pub struct RunSummary {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub reports: Vec<SymbolReport>,
}

impl RunSummary {
    pub fn rows_written_total(&self) -> u64 {
        self.reports.iter().map(|r| r.rows_written).sum()
    }
}

/// Run Coordinator: drives fetch → fallback → normalize → write per symbol.
///
/// Symbols are processed sequentially; the source is rate-limited per key,
/// so fan-out buys nothing. One symbol's failure never touches another's,
/// and `run` never returns an error: every per-symbol problem lands in the
/// summary instead.
pub struct Ingestor<S: QuoteSink> {
    config: IngestConfig,
    sink: S,
    /// Keys already written by this ingestor; repeats skip the database.
    seen: TtlCache,
}

impl<S: QuoteSink> Ingestor<S> {
    pub fn new(config: IngestConfig, sink: S) -> Self {
        Ingestor {
            config,
            sink,
            seen: TtlCache::new(),
        }
    }

    pub async fn run(&self) -> RunSummary {
        let started_at = Local::now();
        let deadline = Instant::now() + self.config.run_deadline;
        let mut reports = Vec::with_capacity(self.config.symbols.len());

        for symbol in &self.config.symbols {
            reports.push(self.ingest_symbol(symbol, deadline).await);
        }

        RunSummary {
            started_at,
            finished_at: Local::now(),
            reports,
        }
    }

    async fn ingest_symbol(&self, symbol: &str, deadline: Instant) -> SymbolReport {
        let now = Local::now().naive_local();

        match self.fetch_live(symbol, deadline).await {
            Ok(raws) => match normalize::normalize(symbol, raws, now) {
                Ok(batch) => self.commit(symbol, batch, None).await,
                Err(why) => {
                    logging::warn_file_async(format!(
                        "Live batch for {} rejected ({}), substituting synthetic data",
                        symbol, why
                    ));
                    let reason = FetchError::MalformedResponse(why.to_string());
                    self.ingest_fallback(symbol, now, reason).await
                }
            },
            Err(reason) => self.ingest_fallback(symbol, now, reason).await,
        }
    }

    /// One bounded fetch attempt. The run deadline caps the per-request
    /// timeout; expiry counts as the source being unreachable.
    async fn fetch_live(&self, symbol: &str, deadline: Instant) -> Result<Vec<RawQuote>, FetchError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(FetchError::Unreachable(
                "run deadline exceeded before fetch".to_string(),
            ));
        }

        let fetch = alpha_vantage::quote::visit(symbol, self.config.interval, &self.config.source);
        match tokio::time::timeout(remaining, fetch).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Unreachable(
                "run deadline exceeded during fetch".to_string(),
            )),
        }
    }

    async fn ingest_fallback(
        &self,
        symbol: &str,
        now: chrono::NaiveDateTime,
        reason: FetchError,
    ) -> SymbolReport {
        let raws = fallback::generate(symbol, now);

        match normalize::normalize(symbol, raws, now) {
            Ok(batch) => self.commit(symbol, batch, Some(reason)).await,
            // the generator guarantees valid batches; reaching this branch
            // is a logic defect and is surfaced, not retried
            Err(why) => SymbolReport {
                symbol: symbol.to_string(),
                outcome: SymbolOutcome::Failed(format!("fallback batch rejected: {}", why)),
                rows_written: 0,
                dropped: 0,
            },
        }
    }

    async fn commit(
        &self,
        symbol: &str,
        batch: Normalized,
        degraded: Option<FetchError>,
    ) -> SymbolReport {
        let fresh: Vec<QuotePoint> = batch
            .points
            .into_iter()
            .filter(|p| !self.seen.contains_key(&p.key_with_prefix()))
            .collect();

        match self.sink.write(&fresh).await {
            Ok(rows_written) => {
                for point in &fresh {
                    self.seen.set(point.key_with_prefix());
                }

                let outcome = match degraded {
                    Some(reason) => SymbolOutcome::Degraded(reason),
                    None => SymbolOutcome::Success,
                };

                SymbolReport {
                    symbol: symbol.to_string(),
                    outcome,
                    rows_written,
                    dropped: batch.dropped,
                }
            }
            Err(why) => SymbolReport {
                symbol: symbol.to_string(),
                outcome: SymbolOutcome::Failed(format!("write failed: {}", why)),
                rows_written: 0,
                dropped: batch.dropped,
            },
        }
    }
}

/// Scheduler entry: one full ingestion pass over the configured symbols.
pub async fn execute() -> Result<()> {
    let config = IngestConfig::from_settings();
    let ingestor = Ingestor::new(config, PgQuoteSink::from_global());
    let summary = ingestor.run().await;

    for report in &summary.reports {
        logging::info_file_async(format!(
            "{}: {} ({} rows written, {} dropped)",
            report.symbol, report.outcome, report.rows_written, report.dropped
        ));
    }

    logging::info_file_async(format!(
        "Ingestion run finished: {} symbols, {} rows written, {} ms",
        summary.reports.len(),
        summary.rows_written_total(),
        (summary.finished_at - summary.started_at).num_milliseconds()
    ));

    match stock_price::fetch_symbol_summaries(database::get_connection()).await {
        Ok(summaries) => {
            for s in summaries {
                logging::debug_file_async(format!(
                    "{}: {} records, latest {:?}, avg close {:?}",
                    s.symbol, s.total_records, s.latest_timestamp, s.avg_close_price
                ));
            }
        }
        Err(why) => {
            logging::error_file_async(format!("Failed to fetch_symbol_summaries: {:?}", why));
        }
    }

    Ok(())
}
