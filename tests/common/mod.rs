//! Shared fakes for integration tests
#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use sqlsage::agents::config::AgentConfig;
use sqlsage::agents::core::OrchestrationLoop;
use sqlsage::agents::error::TransportResult;
use sqlsage::agents::llm::{ReasoningClient, ReasoningReply};
use sqlsage::agents::tools::{PlotlyJsonRenderer, ToolRegistry};
use sqlsage::agents::{Message, ToolCall, ToolDescriptor};
use sqlsage::persistence::{
    ColumnInfo, QueryError, QueryExecutor, QueryResult, SchemaError, SchemaIntrospector,
};

pub fn rows(columns: &[&str], rows: Vec<Vec<Value>>) -> QueryResult {
    QueryResult::new(columns.iter().map(|c| c.to_string()).collect(), rows)
}

/// Introspector over a fixed in-memory catalog
pub struct MemoryIntrospector {
    schema: String,
    tables: BTreeMap<String, (Vec<ColumnInfo>, QueryResult)>,
}

impl MemoryIntrospector {
    pub fn new() -> Self {
        Self {
            schema: "public".to_string(),
            tables: BTreeMap::new(),
        }
    }

    pub fn with_table(mut self, name: &str, columns: &[(&str, &str)], data: QueryResult) -> Self {
        let columns = columns
            .iter()
            .map(|(n, t)| ColumnInfo::new(*n, *t, None))
            .collect();
        self.tables.insert(name.to_string(), (columns, data));
        self
    }

    /// Catalog with `orders` and `customers`
    pub fn shop() -> Self {
        Self::new()
            .with_table(
                "orders",
                &[("id", "integer"), ("customer_id", "integer"), ("total", "numeric")],
                rows(
                    &["id", "customer_id", "total"],
                    vec![
                        vec![json!(1), json!(10), json!(99.5)],
                        vec![json!(2), json!(11), json!(12.0)],
                    ],
                ),
            )
            .with_table(
                "customers",
                &[("id", "integer"), ("name", "text")],
                rows(
                    &["id", "name"],
                    vec![vec![json!(10), json!("Ada")], vec![json!(11), json!("Grace")]],
                ),
            )
    }

    fn table(&self, name: &str) -> Result<&(Vec<ColumnInfo>, QueryResult), SchemaError> {
        self.tables
            .get(name)
            .ok_or_else(|| SchemaError::UnknownTable(name.to_string()))
    }
}

#[async_trait]
impl SchemaIntrospector for MemoryIntrospector {
    fn schema(&self) -> &str {
        &self.schema
    }

    async fn list_tables(&self) -> Result<Vec<String>, SchemaError> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn describe(&self, table: &str) -> Result<Vec<ColumnInfo>, SchemaError> {
        Ok(self.table(table)?.0.clone())
    }

    async fn sample(&self, table: &str, limit: usize) -> Result<QueryResult, SchemaError> {
        let data = &self.table(table)?.1;
        Ok(QueryResult::new(
            data.columns.clone(),
            data.rows.iter().take(limit).cloned().collect(),
        ))
    }
}

/// Executor answering known SQL text with canned results
pub struct FakeExecutor {
    results: HashMap<String, QueryResult>,
    pub seen: Mutex<Vec<String>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        Self {
            results: HashMap::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_result(mut self, sql: &str, result: QueryResult) -> Self {
        self.results.insert(sql.to_string(), result);
        self
    }
}

#[async_trait]
impl QueryExecutor for FakeExecutor {
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        self.seen.lock().unwrap().push(sql.to_string());
        self.results
            .get(sql)
            .cloned()
            .ok_or_else(|| QueryError::Execution(format!("syntax error at or near \"{}\"", sql)))
    }
}

/// Reasoning client replaying a script and recording every request
pub struct ScriptedReasoning {
    replies: Mutex<VecDeque<ReasoningReply>>,
    /// Reply used once the script is exhausted
    fallback: ReasoningReply,
    pub requests: Mutex<Vec<Vec<Message>>>,
    pub advertised: Mutex<Vec<Vec<String>>>,
}

impl ScriptedReasoning {
    pub fn new(replies: Vec<ReasoningReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback: ReasoningReply::text("script exhausted"),
            requests: Mutex::new(Vec::new()),
            advertised: Mutex::new(Vec::new()),
        })
    }

    /// Client that proposes the same reply forever
    pub fn always(reply: ReasoningReply) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: reply,
            requests: Mutex::new(Vec::new()),
            advertised: Mutex::new(Vec::new()),
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, index: usize) -> Vec<Message> {
        self.requests.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl ReasoningClient for ScriptedReasoning {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn send(
        &self,
        history: &[Message],
        tools: &[ToolDescriptor],
    ) -> TransportResult<ReasoningReply> {
        self.requests.lock().unwrap().push(history.to_vec());
        self.advertised
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.name.clone()).collect());
        let next = self.replies.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }
}

pub fn call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall::new(id, name, arguments)
}

/// Registry with every built-in tool over the given fakes
pub fn registry(
    config: &AgentConfig,
    introspector: Arc<MemoryIntrospector>,
    executor: Arc<FakeExecutor>,
    chart_dir: &Path,
) -> Arc<ToolRegistry> {
    let charts = Arc::new(PlotlyJsonRenderer::new(chart_dir));
    Arc::new(
        ToolRegistry::with_builtin_tools(config, introspector, executor, charts)
            .expect("built-in tools register"),
    )
}

/// Loop over the shop catalog with the given budget
pub fn shop_agent(
    reasoning: Arc<ScriptedReasoning>,
    max_iterations: u32,
    executor: FakeExecutor,
    chart_dir: &Path,
) -> OrchestrationLoop {
    let config = AgentConfig {
        max_iterations,
        ..Default::default()
    };
    let tools = registry(
        &config,
        Arc::new(MemoryIntrospector::shop()),
        Arc::new(executor),
        chart_dir,
    );
    OrchestrationLoop::new(config, reasoning, tools)
}
