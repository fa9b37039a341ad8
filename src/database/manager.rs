use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::database::value::ValueError;
use crate::types::Operation;

/// Errors from the data layer
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No record found in {table}")]
    NotFound { table: String },

    #[error("{operation} on {table} affected no rows")]
    NotModified { operation: Operation, table: String },

    #[error("Cannot scan column '{column}': {source}")]
    Scan {
        column: String,
        #[source]
        source: ValueError,
    },

    #[error("Record with provided conditions already exists in table {table}")]
    AlreadyExists { table: String },

    #[error("No record with provided conditions exists in table {table}")]
    NotFoundCondition { table: String },

    #[error("Failed to connect to database after {attempts} attempt(s): {reason}")]
    ConnectionFailure { attempts: u32, reason: String },

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Builds the process-wide connection pool
pub struct DatabaseManager;

impl DatabaseManager {
    /// Opens the pool with bounded retry: each attempt connects, applies the pool
    /// limits and pings under a deadline. Exhausting the attempts is fatal to startup.
    pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseError> {
        let options = config.connect_options()?;
        let attempts = config.connect_attempts.max(1);
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            match Self::try_connect(config, options.clone()).await {
                Ok(pool) => {
                    info!(attempt, "database connected");
                    return Ok(pool);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "database connection attempt failed");
                    last_error = e.to_string();
                }
            }

            if attempt < attempts {
                tokio::time::sleep(Duration::from_secs(config.retry_backoff_secs)).await;
            }
        }

        Err(DatabaseError::ConnectionFailure {
            attempts,
            reason: last_error,
        })
    }

    async fn try_connect(config: &DatabaseConfig, options: PgConnectOptions) -> Result<PgPool, DatabaseError> {
        let ping_timeout = Duration::from_secs(config.ping_timeout_secs);

        let pool = Self::pool_options(config)
            .acquire_timeout(ping_timeout)
            .connect_with(options)
            .await?;

        match tokio::time::timeout(ping_timeout, sqlx::query("SELECT 1").execute(&pool)).await {
            Ok(Ok(_)) => Ok(pool),
            Ok(Err(e)) => {
                pool.close().await;
                Err(e.into())
            }
            Err(_) => {
                pool.close().await;
                Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut))
            }
        }
    }

    fn pool_options(config: &DatabaseConfig) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections))
            .max_lifetime(Some(Duration::from_secs(config.max_lifetime_secs)))
            .idle_timeout(Some(Duration::from_secs(config.idle_timeout_secs)))
    }

    /// Close the pool on shutdown
    pub async fn close(pool: &PgPool) {
        pool.close().await;
        info!("database pool closed");
    }
}
