//! Database connection pool management

use std::time::Duration;

use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::Postgres;

use crate::persistence::error::QueryError;

/// Connection pool wrapper for the analysed PostgreSQL database
///
/// Connections are established lazily, so constructing the pool never touches
/// the network. Every caller acquires a connection for the duration of one
/// statement; the returned guard hands it back to the pool when dropped.
#[derive(Clone)]
pub struct ConnectionPool {
    pool: PgPool,
}

impl ConnectionPool {
    /// Create a new lazily-connecting pool
    ///
    /// # Arguments
    ///
    /// * `options` - PostgreSQL connection options
    /// * `max_connections` - Maximum number of connections in the pool
    /// * `connect_timeout` - Bound on acquiring a connection
    pub fn new(options: PgConnectOptions, max_connections: u32, connect_timeout: Duration) -> Self {
        tracing::info!(
            "Preparing PostgreSQL pool for {}:{} with max {} connections",
            options.get_host(),
            options.get_port(),
            max_connections
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(connect_timeout)
            .connect_lazy_with(options);

        Self { pool }
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Acquire a scoped connection
    pub async fn acquire(&self) -> Result<PoolConnection<Postgres>, QueryError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| QueryError::Connection(e.to_string()))
    }

    /// Check if the database connection is healthy
    pub async fn health_check(&self) -> Result<(), QueryError> {
        let mut conn = self.acquire().await?;
        sqlx::query("SELECT 1")
            .execute(&mut *conn)
            .await
            .map_err(|e| QueryError::Connection(format!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Close the connection pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
