//! Relational store access for the analysed PostgreSQL database
//!
//! # Architecture
//!
//! - `ConnectionPool`: lazily connecting pool, one scoped connection per statement
//! - `QueryExecutor`: runs SQL text and returns JSON-typed rows
//! - `SchemaIntrospector`: lists, describes and samples tables through an executor
//! - `format`: markdown and plain-text renderings handed to the reasoning service

pub mod error;
pub mod executor;
pub mod format;
pub mod introspect;
pub mod pool;
pub mod sql;

pub use error::{QueryError, SchemaError};
pub use executor::{PgQueryExecutor, QueryExecutor, QueryResult};
pub use introspect::{
    ColumnInfo, PgSchemaIntrospector, SchemaIntrospector, SchemaSnapshot, TableSnapshot,
};
pub use pool::ConnectionPool;
