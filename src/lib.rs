//! # sqlsage - natural-language analysis over PostgreSQL
//!
//! sqlsage answers questions about a PostgreSQL database by letting a
//! tool-calling reasoning service inspect the schema, run SQL and plot charts,
//! in a bounded loop that feeds every tool result (or failure) back to it.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use sqlsage::agents::core::OrchestrationLoop;
//! use sqlsage::agents::llm::OpenAiClient;
//! use sqlsage::agents::tools::{PlotlyJsonRenderer, ToolRegistry};
//! use sqlsage::config::Settings;
//! use sqlsage::persistence::{ConnectionPool, PgQueryExecutor, PgSchemaIntrospector};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_file("sqlsage.toml")?;
//!     let db = &settings.database;
//!
//!     let pool = ConnectionPool::new(db.connect_options(), db.max_connections, db.connect_timeout());
//!     let executor = Arc::new(PgQueryExecutor::new(pool, db.max_rows, db.query_timeout()));
//!     let introspector = Arc::new(PgSchemaIntrospector::new(executor.clone(), db.schema.clone()));
//!     let charts = Arc::new(PlotlyJsonRenderer::new("charts"));
//!
//!     let tools = ToolRegistry::with_builtin_tools(&settings.agent, introspector.clone(), executor, charts)?;
//!     let reasoning = Arc::new(OpenAiClient::new(&settings.reasoning)?);
//!     let agent = OrchestrationLoop::new(settings.agent.clone(), reasoning, Arc::new(tools))
//!         .with_schema_context(introspector);
//!
//!     let mut session = agent.start_session().await;
//!     let outcome = agent
//!         .run(&mut session, "Who are our top customers?", &CancellationToken::new())
//!         .await?;
//!     println!("{}", outcome.content);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **agents**: conversation model, reasoning client, tools, orchestration loop
//! - **persistence**: pooled PostgreSQL access, query execution, schema introspection
//! - **config**: layered, validated settings
//! - **cli** / **logging**: binary front end

pub mod agents;
pub mod cli;
pub mod config;
pub mod logging;
pub mod persistence;
