use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::{declare::QuotePoint, error::WriteError};

/// One stored row of the `stock_prices` table.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct StockPrice {
    pub id: i64,
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open_price: Decimal,
    pub high_price: Decimal,
    pub low_price: Decimal,
    pub close_price: Decimal,
    pub volume: i64,
    pub created_at: DateTime<Local>,
}

/// Per-symbol storage statistics, used for the post-run monitoring log.
#[derive(sqlx::FromRow, Debug, Clone)]
pub struct SymbolSummary {
    pub symbol: String,
    pub total_records: i64,
    pub latest_timestamp: Option<NaiveDateTime>,
    pub avg_close_price: Option<Decimal>,
}

const INSERT: &str = r#"
INSERT INTO stock_prices (symbol, "timestamp", open_price, high_price, low_price, close_price, volume)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (symbol, "timestamp") DO NOTHING
"#;

/// Writes a batch inside one transaction, ignoring `(symbol, timestamp)`
/// collisions: the existing row wins, no update, no error.
///
/// Returns the number of newly inserted rows only; collisions contribute
/// zero, so a fully duplicate batch reports 0 and the caller can detect a
/// zero-effect run. An empty batch commits nothing and reports 0.
pub async fn upsert_all(pool: &PgPool, points: &[QuotePoint]) -> Result<u64, WriteError> {
    if points.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut written = 0_u64;

    for point in points {
        let done = sqlx::query(INSERT)
            .bind(&point.symbol)
            .bind(point.timestamp)
            .bind(point.open)
            .bind(point.high)
            .bind(point.low)
            .bind(point.close)
            .bind(point.volume)
            .execute(&mut *tx)
            .await?;

        written += done.rows_affected();
    }

    tx.commit().await?;

    Ok(written)
}

pub async fn fetch_by_symbol(pool: &PgPool, symbol: &str) -> Result<Vec<StockPrice>> {
    let sql = r#"
SELECT id, symbol, "timestamp", open_price, high_price, low_price, close_price, volume, created_at
FROM stock_prices
WHERE symbol = $1
ORDER BY "timestamp"
"#;

    sqlx::query_as::<_, StockPrice>(sql)
        .bind(symbol)
        .fetch_all(pool)
        .await
        .context(format!("Failed to fetch_by_symbol({}) from database", symbol))
}

/// Row count, latest timestamp and average close per symbol.
pub async fn fetch_symbol_summaries(pool: &PgPool) -> Result<Vec<SymbolSummary>> {
    let sql = r#"
SELECT
    symbol,
    COUNT(*) AS total_records,
    MAX("timestamp") AS latest_timestamp,
    AVG(close_price) AS avg_close_price
FROM stock_prices
GROUP BY symbol
ORDER BY symbol
"#;

    sqlx::query_as::<_, SymbolSummary>(sql)
        .fetch_all(pool)
        .await
        .context("Failed to fetch_symbol_summaries from database")
}
