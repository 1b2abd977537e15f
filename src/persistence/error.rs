//! Persistence layer error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while executing SQL against the relational store
#[derive(Debug, Error)]
pub enum QueryError {
    /// No connection could be obtained
    #[error("Database connection error: {0}")]
    Connection(String),

    /// The database rejected or failed the statement
    #[error("Query failed: {0}")]
    Execution(String),

    /// The statement did not finish within the configured bound
    #[error("Query timed out after {0:?}")]
    Timeout(Duration),
}

impl From<sqlx::Error> for QueryError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Configuration(_) => QueryError::Connection(err.to_string()),
            sqlx::Error::Database(db) => QueryError::Execution(db.message().to_string()),
            other => QueryError::Execution(other.to_string()),
        }
    }
}

/// Errors raised by schema introspection
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The requested table does not exist in the configured schema
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// The catalog query itself failed
    #[error(transparent)]
    Query(#[from] QueryError),
}
