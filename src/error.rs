use thiserror::Error;

/// Failure of a single fetch attempt against the quote source.
///
/// Every variant triggers the same fallback substitution downstream; the
/// variant itself is preserved on the degraded outcome so rate limiting
/// stays separable from auth and network failures in the run summary.
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    /// The source answered with a note instead of a data series, or with 429.
    #[error("rate limited by quote source: {0}")]
    RateLimited(String),

    /// Network-level failure: connect error, timeout, or run deadline expiry.
    #[error("quote source unreachable: {0}")]
    Unreachable(String),

    /// A response arrived but does not match the expected series shape.
    #[error("malformed quote response: {0}")]
    MalformedResponse(String),

    /// The source rejected the api key.
    #[error("unauthorized by quote source: {0}")]
    Unauthorized(String),
}

/// Batch-level normalization failure. Individual bad points are dropped and
/// counted, never fatal; this error only fires when nothing survived.
#[derive(Error, Debug, Clone)]
pub enum ValidationError {
    #[error("every point in the batch failed validation ({dropped} dropped)")]
    AllInvalid { dropped: usize },
}

/// Failure of a storage write. A `(symbol, timestamp)` conflict is NOT an
/// error: the insert no-ops and the existing row wins.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("database connection unavailable: {0}")]
    ConnectionUnavailable(String),

    /// Schema-level rejection, distinct from the expected conflict no-op.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("database write timed out: {0}")]
    Timeout(String),
}

impl From<sqlx::Error> for WriteError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db) => {
                // 57014 = query_canceled (statement_timeout)
                if db.code().as_deref() == Some("57014") {
                    WriteError::Timeout(db.to_string())
                } else {
                    WriteError::ConstraintViolation(db.to_string())
                }
            }
            sqlx::Error::PoolTimedOut => {
                WriteError::ConnectionUnavailable("connection pool timed out".to_string())
            }
            other => WriteError::ConnectionUnavailable(other.to_string()),
        }
    }
}
