use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config;

pub mod table;

static POSTGRES: Lazy<PostgresSQL> = Lazy::new(PostgresSQL::new);

/// PostgreSQL connection pool wrapper shared by `database::table::*`.
pub struct PostgresSQL {
    pub pool: PgPool,
}

impl PostgresSQL {
    /// Builds the pool from `config::SETTINGS.postgresql.connection`.
    ///
    /// The connection is lazy: a bad URL fails here, an unreachable server
    /// fails at first use (see [`ping`]).
    pub fn new() -> PostgresSQL {
        let database_url = &config::SETTINGS.postgresql.connection;
        let pool = PgPoolOptions::new()
            .max_lifetime(Some(Duration::from_secs(1800)))
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(600)))
            .connect_lazy(database_url)
            .unwrap_or_else(|_| panic!("wrong database URL {}", database_url));

        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Default for PostgresSQL {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the global PostgreSQL connection pool.
pub fn get_connection() -> &'static PgPool {
    POSTGRES.pool()
}

/// Round-trips a trivial statement to verify the database is reachable.
///
/// Called once at startup; an error here aborts the process before any
/// symbol is processed.
pub async fn ping() -> Result<()> {
    sqlx::query("SELECT 1")
        .execute(get_connection())
        .await
        .context("Failed to ping PostgreSQL")?;

    Ok(())
}
