//! Read-only schema introspection
//!
//! Everything here is computed from fresh catalog queries on every call. The
//! reasoning service sees the schema as it is at the moment it asks.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::persistence::error::SchemaError;
use crate::persistence::executor::{QueryExecutor, QueryResult};
use crate::persistence::format;
use crate::persistence::sql::{qualified_table, quote_literal};

/// One column of a table, in ordinal order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    /// Column comment, if one is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ColumnInfo {
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        description: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            description,
        }
    }
}

/// Columns and a handful of rows for one table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSnapshot {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub sample_rows: QueryResult,
}

/// Point-in-time view of every table in a schema
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaSnapshot {
    pub schema: String,
    /// Tables in lexical order
    pub tables: Vec<TableSnapshot>,
}

impl SchemaSnapshot {
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn table(&self, name: &str) -> Option<&TableSnapshot> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Human-readable summary used as schema context
    pub fn render(&self) -> String {
        if self.tables.is_empty() {
            return format!("Schema \"{}\" contains no tables.", self.schema);
        }
        self.tables
            .iter()
            .map(|t| format::table_snapshot(&self.schema, t))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Lists, describes and samples tables of a single schema
#[async_trait]
pub trait SchemaIntrospector: Send + Sync {
    /// Schema the introspector is bound to
    fn schema(&self) -> &str;

    /// Base tables, de-duplicated and lexically ordered
    async fn list_tables(&self) -> Result<Vec<String>, SchemaError>;

    /// Columns of a table in ordinal order
    async fn describe(&self, table: &str) -> Result<Vec<ColumnInfo>, SchemaError>;

    /// Up to `limit` rows of a table
    async fn sample(&self, table: &str, limit: usize) -> Result<QueryResult, SchemaError>;

    /// Describe and sample every table
    async fn snapshot(&self, sample_rows: usize) -> Result<SchemaSnapshot, SchemaError> {
        let mut tables = Vec::new();
        for name in self.list_tables().await? {
            let columns = match self.describe(&name).await {
                Ok(columns) => columns,
                // Dropped between listing and describing
                Err(SchemaError::UnknownTable(_)) => continue,
                Err(e) => return Err(e),
            };
            let sample_rows = if sample_rows == 0 {
                QueryResult::default()
            } else {
                match self.sample(&name, sample_rows).await {
                    Ok(rows) => rows,
                    Err(SchemaError::UnknownTable(_)) => continue,
                    Err(e) => return Err(e),
                }
            };
            tables.push(TableSnapshot {
                name,
                columns,
                sample_rows,
            });
        }

        Ok(SchemaSnapshot {
            schema: self.schema().to_string(),
            tables,
        })
    }
}

/// Introspector backed by `information_schema` and `pg_catalog`
pub struct PgSchemaIntrospector {
    executor: Arc<dyn QueryExecutor>,
    schema: String,
}

impl PgSchemaIntrospector {
    pub fn new(executor: Arc<dyn QueryExecutor>, schema: impl Into<String>) -> Self {
        Self {
            executor,
            schema: schema.into(),
        }
    }

    fn list_tables_sql(&self) -> String {
        format!(
            "SELECT table_name::text AS table_name \
             FROM information_schema.tables \
             WHERE table_schema = {} AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            quote_literal(&self.schema)
        )
    }

    fn describe_sql(&self, table: &str) -> String {
        format!(
            "SELECT c.column_name::text AS column_name, \
                    c.data_type::text AS data_type, \
                    d.description::text AS description \
             FROM information_schema.columns c \
             LEFT JOIN pg_catalog.pg_namespace n ON n.nspname = c.table_schema \
             LEFT JOIN pg_catalog.pg_class cl ON cl.relname = c.table_name AND cl.relnamespace = n.oid \
             LEFT JOIN pg_catalog.pg_description d ON d.objoid = cl.oid AND d.objsubid = c.ordinal_position \
             WHERE c.table_schema = {} AND c.table_name = {} \
             ORDER BY c.ordinal_position",
            quote_literal(&self.schema),
            quote_literal(table)
        )
    }

    fn sample_sql(&self, table: &str, limit: usize) -> String {
        format!(
            "SELECT * FROM {} LIMIT {}",
            qualified_table(&self.schema, table),
            limit
        )
    }

    async fn ensure_exists(&self, table: &str) -> Result<(), SchemaError> {
        if self.list_tables().await?.iter().any(|t| t == table) {
            Ok(())
        } else {
            Err(SchemaError::UnknownTable(table.to_string()))
        }
    }
}

fn text_at(row: &[Value], index: usize) -> Option<String> {
    match row.get(index) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

#[async_trait]
impl SchemaIntrospector for PgSchemaIntrospector {
    fn schema(&self) -> &str {
        &self.schema
    }

    async fn list_tables(&self) -> Result<Vec<String>, SchemaError> {
        let result = self.executor.execute(&self.list_tables_sql()).await?;
        let tables: BTreeSet<String> = result
            .rows
            .iter()
            .filter_map(|row| text_at(row, 0))
            .collect();
        Ok(tables.into_iter().collect())
    }

    async fn describe(&self, table: &str) -> Result<Vec<ColumnInfo>, SchemaError> {
        let result = self.executor.execute(&self.describe_sql(table)).await?;
        if result.rows.is_empty() {
            // A table without columns is legal; a missing one is not.
            self.ensure_exists(table).await?;
            return Ok(Vec::new());
        }

        Ok(result
            .rows
            .iter()
            .filter_map(|row| {
                Some(ColumnInfo {
                    name: text_at(row, 0)?,
                    data_type: text_at(row, 1)?,
                    description: text_at(row, 2),
                })
            })
            .collect())
    }

    async fn sample(&self, table: &str, limit: usize) -> Result<QueryResult, SchemaError> {
        self.ensure_exists(table).await?;
        Ok(self.executor.execute(&self.sample_sql(table, limit)).await?)
    }

    async fn snapshot(&self, sample_rows: usize) -> Result<SchemaSnapshot, SchemaError> {
        let mut tables = Vec::new();
        for name in self.list_tables().await? {
            let columns = match self.describe(&name).await {
                Ok(columns) => columns,
                Err(SchemaError::UnknownTable(_)) => continue,
                Err(e) => return Err(e),
            };
            // Sampled without a per-table existence check; a failure is
            // only fatal if the table is still there.
            let sample_rows = if sample_rows == 0 {
                QueryResult::default()
            } else {
                match self
                    .executor
                    .execute(&self.sample_sql(&name, sample_rows))
                    .await
                {
                    Ok(rows) => rows,
                    Err(e) => match self.ensure_exists(&name).await {
                        Err(SchemaError::UnknownTable(_)) => {
                            tracing::debug!(table = %name, "Table dropped during snapshot");
                            continue;
                        }
                        _ => return Err(e.into()),
                    },
                }
            };
            tables.push(TableSnapshot {
                name,
                columns,
                sample_rows,
            });
        }

        tracing::debug!(schema = %self.schema, tables = tables.len(), "Built schema snapshot");

        Ok(SchemaSnapshot {
            schema: self.schema.clone(),
            tables,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::error::QueryError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Answers catalog queries from canned results and records every statement
    struct CatalogExecutor {
        tables: Vec<&'static str>,
        columns: Vec<(&'static str, &'static str, Option<&'static str>)>,
        /// Tables whose column query returns `columns`
        described: Vec<&'static str>,
        /// Listed once, then gone; sampling it fails
        dropped: Option<&'static str>,
        /// Sampling fails although the table stays listed
        broken: Option<&'static str>,
        listings: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl CatalogExecutor {
        fn new(tables: Vec<&'static str>) -> Self {
            Self {
                tables,
                columns: Vec::new(),
                described: vec!["orders"],
                dropped: None,
                broken: None,
                listings: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QueryExecutor for CatalogExecutor {
        async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
            self.seen.lock().unwrap().push(sql.to_string());
            if sql.contains("information_schema.tables") {
                let first = self.listings.fetch_add(1, Ordering::SeqCst) == 0;
                Ok(QueryResult::new(
                    vec!["table_name".to_string()],
                    self.tables
                        .iter()
                        .filter(|t| first || self.dropped != Some(**t))
                        .map(|t| vec![json!(t)])
                        .collect(),
                ))
            } else if sql.contains("information_schema.columns") {
                if !self
                    .described
                    .iter()
                    .any(|t| sql.contains(&format!("'{}'", t)))
                {
                    return Ok(QueryResult::default());
                }
                Ok(QueryResult::new(
                    vec![
                        "column_name".to_string(),
                        "data_type".to_string(),
                        "description".to_string(),
                    ],
                    self.columns
                        .iter()
                        .map(|(n, t, d)| {
                            vec![json!(n), json!(t), d.map(|d| json!(d)).unwrap_or(Value::Null)]
                        })
                        .collect(),
                ))
            } else if [self.dropped, self.broken]
                .iter()
                .flatten()
                .any(|t| sql.contains(&format!("\"{}\"", t)))
            {
                Err(QueryError::Execution("relation does not exist".to_string()))
            } else {
                Ok(QueryResult::new(vec!["id".to_string()], vec![vec![json!(1)]]))
            }
        }
    }

    #[tokio::test]
    async fn test_list_tables_is_sorted_and_distinct() {
        let exec = Arc::new(CatalogExecutor::new(vec!["orders", "customers", "orders"]));
        let introspector = PgSchemaIntrospector::new(exec, "public");
        let tables = introspector.list_tables().await.unwrap();
        assert_eq!(tables, vec!["customers", "orders"]);
    }

    #[tokio::test]
    async fn test_describe_returns_ordered_columns() {
        let mut exec = CatalogExecutor::new(vec!["orders"]);
        exec.columns = vec![
            ("id", "integer", None),
            ("total", "numeric", Some("Order total")),
        ];
        let introspector = PgSchemaIntrospector::new(Arc::new(exec), "public");
        let columns = introspector.describe("orders").await.unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0], ColumnInfo::new("id", "integer", None));
        assert_eq!(columns[1].description.as_deref(), Some("Order total"));
    }

    #[tokio::test]
    async fn test_describe_unknown_table() {
        let exec = Arc::new(CatalogExecutor::new(vec!["orders"]));
        let introspector = PgSchemaIntrospector::new(exec, "public");
        let err = introspector.describe("nonexistent").await.unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTable(t) if t == "nonexistent"));
    }

    #[tokio::test]
    async fn test_sample_quotes_identifiers() {
        let exec = Arc::new(CatalogExecutor::new(vec!["orders"]));
        let introspector = PgSchemaIntrospector::new(exec.clone(), "public");
        let rows = introspector.sample("orders", 3).await.unwrap();
        assert_eq!(rows.row_count, 1);
        let seen = exec.seen.lock().unwrap();
        assert_eq!(
            seen.last().map(String::as_str),
            Some("SELECT * FROM \"public\".\"orders\" LIMIT 3")
        );
    }

    #[tokio::test]
    async fn test_sample_unknown_table() {
        let exec = Arc::new(CatalogExecutor::new(vec!["orders"]));
        let introspector = PgSchemaIntrospector::new(exec, "public");
        let err = introspector.sample("missing", 3).await.unwrap_err();
        assert!(matches!(err, SchemaError::UnknownTable(_)));
    }

    #[tokio::test]
    async fn test_literals_are_escaped() {
        let exec = Arc::new(CatalogExecutor::new(vec![]));
        let introspector = PgSchemaIntrospector::new(exec.clone(), "public");
        let _ = introspector.describe("o'brien").await;
        let seen = exec.seen.lock().unwrap();
        assert!(seen[0].contains("c.table_name = 'o''brien'"));
    }

    #[tokio::test]
    async fn test_snapshot_render() {
        let mut exec = CatalogExecutor::new(vec!["orders"]);
        exec.columns = vec![("id", "integer", None)];
        let introspector = PgSchemaIntrospector::new(Arc::new(exec), "public");
        let snapshot = introspector.snapshot(3).await.unwrap();
        assert_eq!(snapshot.table_names(), vec!["orders"]);
        let rendered = snapshot.render();
        assert!(rendered.contains("Table Name: \"public\".\"orders\""));
        assert!(rendered.contains("id: 1"));
    }

    #[tokio::test]
    async fn test_snapshot_skips_table_dropped_before_describe() {
        let mut exec = CatalogExecutor::new(vec!["ghost", "orders"]);
        exec.columns = vec![("id", "integer", None)];
        exec.dropped = Some("ghost");
        let introspector = PgSchemaIntrospector::new(Arc::new(exec), "public");

        let snapshot = introspector.snapshot(3).await.unwrap();

        assert_eq!(snapshot.table_names(), vec!["orders"]);
    }

    #[tokio::test]
    async fn test_snapshot_skips_table_dropped_before_sample() {
        let mut exec = CatalogExecutor::new(vec!["ghost", "orders"]);
        exec.columns = vec![("id", "integer", None)];
        exec.described = vec!["ghost", "orders"];
        exec.dropped = Some("ghost");
        let introspector = PgSchemaIntrospector::new(Arc::new(exec), "public");

        let snapshot = introspector.snapshot(3).await.unwrap();

        assert_eq!(snapshot.table_names(), vec!["orders"]);
    }

    #[tokio::test]
    async fn test_snapshot_sample_failure_on_listed_table() {
        let mut exec = CatalogExecutor::new(vec!["orders"]);
        exec.columns = vec![("id", "integer", None)];
        exec.broken = Some("orders");
        let introspector = PgSchemaIntrospector::new(Arc::new(exec), "public");

        let err = introspector.snapshot(3).await.unwrap_err();

        assert!(matches!(err, SchemaError::Query(_)));
    }
}
