//! SQL execution against PostgreSQL
//!
//! The executor runs whatever SQL text it is handed. It performs no validation,
//! rewriting or parameterization: statements produced by the reasoning service
//! cross a trust boundary here, and the database role configured for the
//! session is the only thing that limits what they can do.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::Value;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::postgres::types::{PgInterval, PgMoney};
use sqlx::postgres::{PgRow, PgTypeInfo, PgTypeKind};
use sqlx::{Column, Postgres, Row, TypeInfo, ValueRef};

use crate::persistence::error::QueryError;
use crate::persistence::pool::ConnectionPool;

/// Tabular result of one statement
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub row_count: usize,
    /// More rows were available than the configured cap
    pub truncated: bool,
}

impl QueryResult {
    /// Build a result from columns and rows
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            truncated: false,
        }
    }

    /// Value of the named column in every row
    pub fn column_values(&self, name: &str) -> Vec<&Value> {
        match self.columns.iter().position(|c| c == name) {
            Some(index) => self.rows.iter().filter_map(|r| r.get(index)).collect(),
            None => Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Executes SQL text against the relational store
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run a statement and collect its rows
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError>;
}

/// PostgreSQL executor with a scoped connection per call
pub struct PgQueryExecutor {
    pool: ConnectionPool,
    max_rows: usize,
    timeout: Duration,
}

impl PgQueryExecutor {
    pub fn new(pool: ConnectionPool, max_rows: usize, timeout: Duration) -> Self {
        Self {
            pool,
            max_rows,
            timeout,
        }
    }

    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    async fn run(&self, sql: &str) -> Result<QueryResult, QueryError> {
        // Dropping the guard returns the connection on every exit path,
        // including cancellation by the surrounding timeout.
        let mut conn = self.pool.acquire().await?;

        let mut columns: Vec<String> = Vec::new();
        let mut rows = Vec::new();
        let mut truncated = false;

        let mut stream = sqlx::query(sql).fetch(&mut *conn);
        while let Some(row) = stream.try_next().await? {
            if columns.is_empty() {
                columns = row
                    .columns()
                    .iter()
                    .map(|col| col.name().to_string())
                    .collect();
            }
            if rows.len() >= self.max_rows {
                truncated = true;
                break;
            }
            rows.push(row_to_values(&row));
        }

        let row_count = rows.len();
        Ok(QueryResult {
            columns,
            rows,
            row_count,
            truncated,
        })
    }
}

#[async_trait]
impl QueryExecutor for PgQueryExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        let start = Instant::now();
        tracing::debug!(sql = %sql, "Executing query");

        let result = tokio::time::timeout(self.timeout, self.run(sql))
            .await
            .map_err(|_| QueryError::Timeout(self.timeout))?;

        match &result {
            Ok(r) => tracing::debug!(
                rows = r.row_count,
                truncated = r.truncated,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Query finished"
            ),
            Err(e) => tracing::debug!(error = %e, "Query failed"),
        }

        result
    }
}

fn row_to_values(row: &PgRow) -> Vec<Value> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(i, col)| extract_value(row, i, col.type_info()))
        .collect()
}

/// Decode one cell into JSON based on its PostgreSQL type
fn extract_value(row: &PgRow, index: usize, type_info: &PgTypeInfo) -> Value {
    let type_name = type_info.name();
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(e) => return undecodable(type_name, &e),
    }

    match type_name {
        "BOOL" => decode(row, index, type_name, Value::Bool),
        "INT2" => decode(row, index, type_name, |v: i16| Value::from(v)),
        "INT4" => decode(row, index, type_name, |v: i32| Value::from(v)),
        "INT8" => decode(row, index, type_name, |v: i64| Value::from(v)),
        "FLOAT4" => decode(row, index, type_name, |v: f32| float_value(v as f64)),
        "FLOAT8" => decode(row, index, type_name, float_value),
        "NUMERIC" => decode(row, index, type_name, decimal_value),
        "MONEY" => decode(row, index, type_name, |v: PgMoney| {
            Value::String(money_text(v))
        }),
        "JSON" | "JSONB" => decode(row, index, type_name, |v: Value| v),
        "DATE" => decode(row, index, type_name, |v: NaiveDate| {
            Value::String(v.to_string())
        }),
        "TIME" => decode(row, index, type_name, |v: NaiveTime| {
            Value::String(v.to_string())
        }),
        "TIMESTAMP" => decode(row, index, type_name, |v: NaiveDateTime| {
            Value::String(v.to_string())
        }),
        "TIMESTAMPTZ" => decode(row, index, type_name, |v: DateTime<Utc>| {
            Value::String(v.to_rfc3339())
        }),
        "INTERVAL" => decode(row, index, type_name, |v: PgInterval| {
            Value::String(interval_text(&v))
        }),
        "UUID" => decode(row, index, type_name, |v: uuid::Uuid| {
            Value::String(v.to_string())
        }),
        "BYTEA" => decode(row, index, type_name, |v: Vec<u8>| {
            Value::String(bytea_text(&v))
        }),
        "TEXT[]" | "VARCHAR[]" | "BPCHAR[]" | "NAME[]" => {
            decode(row, index, type_name, |v: Vec<Option<String>>| {
                array_value(v, Value::String)
            })
        }
        "BOOL[]" => decode(row, index, type_name, |v: Vec<Option<bool>>| {
            array_value(v, Value::Bool)
        }),
        "INT2[]" => decode(row, index, type_name, |v: Vec<Option<i16>>| {
            array_value(v, Value::from)
        }),
        "INT4[]" => decode(row, index, type_name, |v: Vec<Option<i32>>| {
            array_value(v, Value::from)
        }),
        "INT8[]" => decode(row, index, type_name, |v: Vec<Option<i64>>| {
            array_value(v, Value::from)
        }),
        "FLOAT8[]" => decode(row, index, type_name, |v: Vec<Option<f64>>| {
            array_value(v, float_value)
        }),
        "NUMERIC[]" => decode(row, index, type_name, |v: Vec<Option<Decimal>>| {
            array_value(v, decimal_value)
        }),
        // Enum labels travel as UTF-8 in both wire formats
        _ if matches!(type_info.kind(), PgTypeKind::Enum(_)) => {
            match row.try_get_unchecked::<String, _>(index) {
                Ok(v) => Value::String(v),
                Err(e) => undecodable(type_name, &e),
            }
        }
        // TEXT, VARCHAR, BPCHAR, NAME and anything text-compatible
        _ => decode(row, index, type_name, Value::String),
    }
}

fn decode<'r, T>(
    row: &'r PgRow,
    index: usize,
    type_name: &str,
    map: impl FnOnce(T) -> Value,
) -> Value
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    match row.try_get::<T, _>(index) {
        Ok(v) => map(v),
        Err(e) => undecodable(type_name, &e),
    }
}

/// Placeholder for a non-null cell with no decoder
///
/// The marker tells the reader how to get the value instead of passing the
/// cell off as NULL.
fn undecodable(type_name: &str, error: &dyn std::fmt::Display) -> Value {
    tracing::warn!(type_name, error = %error, "Column value could not be decoded");
    Value::String(format!(
        "<undecoded {} value; cast it to text>",
        type_name.to_lowercase()
    ))
}

fn float_value(v: f64) -> Value {
    // NaN and the infinities have no JSON number form
    serde_json::Number::from_f64(v)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(v.to_string()))
}

/// Integral decimals become JSON integers, everything else keeps its exact
/// text so scale and precision survive
fn decimal_value(v: Decimal) -> Value {
    if v.scale() == 0 {
        if let Some(i) = v.to_i64() {
            return Value::from(i);
        }
    }
    Value::String(v.to_string())
}

/// Money is stored as an integer count of cents
fn money_text(v: PgMoney) -> String {
    let sign = if v.0 < 0 { "-" } else { "" };
    let cents = v.0.unsigned_abs();
    format!("{}{}.{:02}", sign, cents / 100, cents % 100)
}

/// Render an interval the way psql prints it by default
fn interval_text(v: &PgInterval) -> String {
    fn unit(count: i64, name: &str) -> String {
        if count.abs() == 1 {
            format!("{} {}", count, name)
        } else {
            format!("{} {}s", count, name)
        }
    }

    let mut parts = Vec::new();
    let years = i64::from(v.months / 12);
    let months = i64::from(v.months % 12);
    if years != 0 {
        parts.push(unit(years, "year"));
    }
    if months != 0 {
        parts.push(unit(months, "mon"));
    }
    if v.days != 0 {
        parts.push(unit(i64::from(v.days), "day"));
    }

    if v.microseconds != 0 || parts.is_empty() {
        let sign = if v.microseconds < 0 { "-" } else { "" };
        let total = v.microseconds.unsigned_abs();
        let seconds = total / 1_000_000;
        let micros = total % 1_000_000;
        let mut clock = format!(
            "{}{:02}:{:02}:{:02}",
            sign,
            seconds / 3600,
            (seconds / 60) % 60,
            seconds % 60
        );
        if micros != 0 {
            let fraction = format!("{:06}", micros);
            clock.push('.');
            clock.push_str(fraction.trim_end_matches('0'));
        }
        parts.push(clock);
    }

    parts.join(" ")
}

fn bytea_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("\\x");
    for b in bytes {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

fn array_value<T>(items: Vec<Option<T>>, map: impl Fn(T) -> Value) -> Value {
    Value::Array(
        items
            .into_iter()
            .map(|item| item.map(&map).unwrap_or(Value::Null))
            .collect(),
    )
}
