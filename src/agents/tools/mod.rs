//! Tool registry and built-in tools
//!
//! Every tool declares a typed argument struct; its JSON Schema is derived
//! with `schemars` and advertised verbatim to the reasoning service. Dispatch
//! never fails: unknown names, malformed arguments, handler errors, timeouts
//! and panics all come back as tool-turn content describing the failure.

mod chart;
mod query;
mod schema_tools;

pub use chart::{ChartArtifact, ChartRenderer, ChartSpec, PlotChart, PlotType, PlotlyJsonRenderer};
pub use query::QueryDb;
pub use schema_tools::{DescribeSchema, DescribeTable, ListTables, SampleRows};

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use futures::FutureExt;
use schemars::gen::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::agents::config::AgentConfig;
use crate::agents::domain::{ToolCall, ToolCallResult, ToolDescriptor};
use crate::agents::error::{ToolError, ToolResult};
use crate::persistence::{QueryExecutor, SchemaIntrospector};

/// A tool the reasoning service may call
#[async_trait]
pub trait Tool: Send + Sync + 'static {
    /// Declared argument shape
    type Args: DeserializeOwned + JsonSchema + Send;

    /// Name advertised to the reasoning service
    const NAME: &'static str;

    /// Description advertised to the reasoning service
    fn description(&self) -> String;

    /// Run the tool, returning the content of the tool turn
    async fn run(&self, args: Self::Args) -> ToolResult<String>;
}

/// JSON Schema for a tool argument struct, fully inlined
pub fn parameters_schema<T: JsonSchema>() -> Value {
    let settings = SchemaSettings::draft07().with(|s| {
        s.inline_subschemas = true;
        s.meta_schema = None;
    });
    let schema = settings.into_generator().into_root_schema_for::<T>();
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| json!({ "type": "object" }));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("title");
        obj.remove("definitions");
    }
    value
}

#[async_trait]
trait DynTool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;
    async fn call(&self, arguments: Value) -> ToolResult<String>;
}

struct Registered<T>(T);

#[async_trait]
impl<T: Tool> DynTool for Registered<T> {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::new(T::NAME, self.0.description(), parameters_schema::<T::Args>())
    }

    async fn call(&self, arguments: Value) -> ToolResult<String> {
        let args: T::Args = serde_json::from_value(arguments)
            .map_err(|e| ToolError::argument(T::NAME, e.to_string()))?;
        self.0.run(args).await
    }
}

/// Name to handler dispatch table
pub struct ToolRegistry {
    tools: Vec<Arc<dyn DynTool>>,
    index: HashMap<String, usize>,
    timeout: Duration,
    parallel: bool,
}

impl ToolRegistry {
    /// Create an empty registry
    pub fn new(timeout: Duration) -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
            timeout,
            parallel: true,
        }
    }

    /// Dispatch the calls of a batch concurrently (default) or one at a time
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Registry holding every built-in tool
    pub fn with_builtin_tools(
        config: &AgentConfig,
        introspector: Arc<dyn SchemaIntrospector>,
        executor: Arc<dyn QueryExecutor>,
        charts: Arc<dyn ChartRenderer>,
    ) -> ToolResult<Self> {
        let mut registry =
            Self::new(config.tool_timeout()).with_parallel(config.parallel_tool_calls);
        registry.register(ListTables::new(introspector.clone()))?;
        registry.register(DescribeTable::new(introspector.clone()))?;
        registry.register(SampleRows::new(introspector.clone(), config.sample_rows))?;
        registry.register(DescribeSchema::new(introspector, config.sample_rows))?;
        registry.register(QueryDb::new(executor))?;
        registry.register(PlotChart::new(charts))?;
        Ok(registry)
    }

    /// Bind a tool to its name; names are unique
    pub fn register<T: Tool>(&mut self, tool: T) -> ToolResult<()> {
        if self.index.contains_key(T::NAME) {
            return Err(ToolError::DuplicateTool(T::NAME.to_string()));
        }
        self.index.insert(T::NAME.to_string(), self.tools.len());
        self.tools.push(Arc::new(Registered(tool)));
        tracing::debug!(tool = T::NAME, "Registered tool");
        Ok(())
    }

    /// Descriptors in registration order
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch one call; failures become error content
    pub async fn dispatch(&self, call: &ToolCall) -> ToolCallResult {
        let start = Instant::now();
        let outcome = self.invoke(call).await;
        let elapsed = start.elapsed().as_millis() as u64;

        match outcome {
            Ok(content) => {
                tracing::debug!(tool = %call.name, id = %call.id, elapsed_ms = elapsed, "Tool call succeeded");
                ToolCallResult::success(call, content, elapsed)
            }
            Err(e) => {
                tracing::warn!(tool = %call.name, id = %call.id, error = %e, "Tool call failed");
                ToolCallResult::failure(call, e.to_string(), elapsed)
            }
        }
    }

    /// Dispatch a batch; results are in proposal order
    pub async fn dispatch_all(&self, calls: &[ToolCall]) -> Vec<ToolCallResult> {
        if self.parallel {
            join_all(calls.iter().map(|call| self.dispatch(call))).await
        } else {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                results.push(self.dispatch(call).await);
            }
            results
        }
    }

    async fn invoke(&self, call: &ToolCall) -> ToolResult<String> {
        let tool = self
            .index
            .get(&call.name)
            .and_then(|&i| self.tools.get(i))
            .cloned()
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        let arguments = match &call.arguments {
            Value::Null => Value::Object(Default::default()),
            other => other.clone(),
        };

        let guarded = AssertUnwindSafe(tool.call(arguments)).catch_unwind();
        match tokio::time::timeout(self.timeout, guarded).await {
            Err(_) => Err(ToolError::Timeout {
                tool: call.name.clone(),
                elapsed: self.timeout,
            }),
            Ok(Err(panic)) => Err(ToolError::Panicked {
                tool: call.name.clone(),
                message: panic_message(panic.as_ref()),
            }),
            Ok(Ok(result)) => result,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
