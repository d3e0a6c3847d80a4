use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    database::{self, table::stock_price},
    declare::QuotePoint,
    error::WriteError,
};

/// Destination of normalized batches. The production implementation is
/// PostgreSQL; tests substitute in-memory doubles.
#[async_trait]
pub trait QuoteSink: Send + Sync {
    /// Persists one batch as a single logical unit and returns the number
    /// of newly inserted rows. `(symbol, timestamp)` collisions are
    /// silently ignored and contribute zero to the count.
    async fn write(&self, points: &[QuotePoint]) -> Result<u64, WriteError>;
}

pub struct PgQuoteSink {
    pool: PgPool,
}

impl PgQuoteSink {
    pub fn new(pool: PgPool) -> Self {
        PgQuoteSink { pool }
    }

    pub fn from_global() -> Self {
        Self::new(database::get_connection().clone())
    }
}

#[async_trait]
impl QuoteSink for PgQuoteSink {
    async fn write(&self, points: &[QuotePoint]) -> Result<u64, WriteError> {
        stock_price::upsert_all(&self.pool, points).await
    }
}
