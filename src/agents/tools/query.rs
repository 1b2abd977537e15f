//! `query_db`: run SQL produced by the reasoning service

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;

use super::Tool;
use crate::agents::error::{ToolError, ToolResult};
use crate::persistence::format;
use crate::persistence::QueryExecutor;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct QueryArguments {
    /// Complete and correct SQL query to fulfill the user request.
    pub sql_query: String,
}

/// Executes SQL and renders the rows as a markdown table
pub struct QueryDb {
    executor: Arc<dyn QueryExecutor>,
}

impl QueryDb {
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl Tool for QueryDb {
    type Args = QueryArguments;
    const NAME: &'static str = "query_db";

    fn description(&self) -> String {
        "Fetch data from the PostgreSQL database".to_string()
    }

    async fn run(&self, args: QueryArguments) -> ToolResult<String> {
        if args.sql_query.trim().is_empty() {
            return Err(ToolError::argument(Self::NAME, "sql_query must not be empty"));
        }
        let result = self.executor.execute(&args.sql_query).await?;
        Ok(format::markdown_table(&result))
    }
}
