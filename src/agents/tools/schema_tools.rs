//! Schema introspection tools

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use super::Tool;
use crate::agents::error::{ToolError, ToolResult};
use crate::persistence::format;
use crate::persistence::SchemaIntrospector;

/// Upper bound on rows returned by `sample_rows`
const MAX_SAMPLE_ROWS: usize = 50;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct NoArguments {}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct TableArguments {
    /// Name of the table, without schema prefix
    pub table_name: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SampleArguments {
    /// Name of the table, without schema prefix
    pub table_name: String,
    /// Maximum number of rows to return
    #[serde(default)]
    pub limit: Option<usize>,
}

/// `list_tables`: table names of the configured schema
pub struct ListTables {
    introspector: Arc<dyn SchemaIntrospector>,
}

impl ListTables {
    pub fn new(introspector: Arc<dyn SchemaIntrospector>) -> Self {
        Self { introspector }
    }
}

#[async_trait]
impl Tool for ListTables {
    type Args = NoArguments;
    const NAME: &'static str = "list_tables";

    fn description(&self) -> String {
        format!(
            "List the tables available in the \"{}\" schema of the PostgreSQL database.",
            self.introspector.schema()
        )
    }

    async fn run(&self, _args: NoArguments) -> ToolResult<String> {
        let tables = self.introspector.list_tables().await?;
        serde_json::to_string(&tables).map_err(|e| ToolError::Execution(e.to_string()))
    }
}

/// `describe_table`: ordered columns with types and comments
pub struct DescribeTable {
    introspector: Arc<dyn SchemaIntrospector>,
}

impl DescribeTable {
    pub fn new(introspector: Arc<dyn SchemaIntrospector>) -> Self {
        Self { introspector }
    }
}

#[async_trait]
impl Tool for DescribeTable {
    type Args = TableArguments;
    const NAME: &'static str = "describe_table";

    fn description(&self) -> String {
        "Describe the columns of a table: name, data type and description.".to_string()
    }

    async fn run(&self, args: TableArguments) -> ToolResult<String> {
        let columns = self.introspector.describe(&args.table_name).await?;
        Ok(format::table_info(
            self.introspector.schema(),
            &args.table_name,
            &columns,
        ))
    }
}

/// `sample_rows`: a few rows of a table as a markdown table
pub struct SampleRows {
    introspector: Arc<dyn SchemaIntrospector>,
    default_limit: usize,
}

impl SampleRows {
    pub fn new(introspector: Arc<dyn SchemaIntrospector>, default_limit: usize) -> Self {
        Self {
            introspector,
            default_limit: default_limit.clamp(1, MAX_SAMPLE_ROWS),
        }
    }
}

#[async_trait]
impl Tool for SampleRows {
    type Args = SampleArguments;
    const NAME: &'static str = "sample_rows";

    fn description(&self) -> String {
        format!(
            "Fetch up to `limit` rows (default {}, at most {}) from a table to see what its data looks like.",
            self.default_limit, MAX_SAMPLE_ROWS
        )
    }

    async fn run(&self, args: SampleArguments) -> ToolResult<String> {
        let limit = match args.limit {
            Some(0) => return Err(ToolError::argument(Self::NAME, "limit must be at least 1")),
            Some(n) => n.min(MAX_SAMPLE_ROWS),
            None => self.default_limit,
        };
        let rows = self.introspector.sample(&args.table_name, limit).await?;
        Ok(format::markdown_table(&rows))
    }
}

/// `describe_schema`: every table with columns and sample values
pub struct DescribeSchema {
    introspector: Arc<dyn SchemaIntrospector>,
    sample_rows: usize,
}

impl DescribeSchema {
    pub fn new(introspector: Arc<dyn SchemaIntrospector>, sample_rows: usize) -> Self {
        Self {
            introspector,
            sample_rows,
        }
    }
}

#[async_trait]
impl Tool for DescribeSchema {
    type Args = NoArguments;
    const NAME: &'static str = "describe_schema";

    fn description(&self) -> String {
        "Describe every table of the database: columns, data types, descriptions and sample values."
            .to_string()
    }

    async fn run(&self, _args: NoArguments) -> ToolResult<String> {
        let snapshot = self.introspector.snapshot(self.sample_rows).await?;
        Ok(snapshot.render())
    }
}
