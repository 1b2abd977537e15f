use std::io::Write;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use sqlsage::agents::core::OrchestrationLoop;
use sqlsage::agents::llm::{OpenAiClient, ReasoningClient};
use sqlsage::agents::memory::create_session_log;
use sqlsage::agents::tools::{PlotlyJsonRenderer, ToolRegistry};
use sqlsage::agents::{AgentError, LoopOutcome};
use sqlsage::cli::{Cli, Command};
use sqlsage::config::Settings;
use sqlsage::logging::init_logging;
use sqlsage::persistence::{
    format, ConnectionPool, PgQueryExecutor, PgSchemaIntrospector, QueryExecutor,
    SchemaIntrospector,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration; invalid settings stop here, before any session
    let settings = Settings::new_with_cli(&cli)?;
    let _log_guard = init_logging(&settings.logging)?;

    let database = &settings.database;
    let pool = ConnectionPool::new(
        database.connect_options(),
        database.max_connections,
        database.connect_timeout(),
    );
    let executor: Arc<dyn QueryExecutor> = Arc::new(PgQueryExecutor::new(
        pool.clone(),
        database.max_rows,
        database.query_timeout(),
    ));
    let introspector: Arc<dyn SchemaIntrospector> = Arc::new(PgSchemaIntrospector::new(
        executor.clone(),
        database.schema.clone(),
    ));

    let result = match cli.command() {
        Command::Check => {
            pool.health_check().await?;
            println!(
                "Connected to {}:{}/{}",
                database.host, database.port, database.dbname
            );
            Ok(())
        }
        Command::Tables => {
            for table in introspector.list_tables().await? {
                println!("{}", table);
            }
            Ok(())
        }
        Command::Describe { table } => {
            let columns = introspector.describe(&table).await?;
            print!("{}", format::table_info(introspector.schema(), &table, &columns));
            Ok(())
        }
        Command::History { clear } => history(&settings, clear).await,
        Command::Ask { question } => {
            let agent = build_agent(&settings, introspector, executor)?;
            ask(&agent, &question.join(" ")).await
        }
        Command::Chat => {
            let agent = build_agent(&settings, introspector, executor)?;
            chat(&agent).await
        }
    };

    pool.close().await;
    result
}

fn build_agent(
    settings: &Settings,
    introspector: Arc<dyn SchemaIntrospector>,
    executor: Arc<dyn QueryExecutor>,
) -> anyhow::Result<OrchestrationLoop> {
    let reasoning: Arc<dyn ReasoningClient> = Arc::new(OpenAiClient::new(&settings.reasoning)?);
    let charts = Arc::new(PlotlyJsonRenderer::new(settings.chart.output_dir.clone()));
    let tools =
        ToolRegistry::with_builtin_tools(&settings.agent, introspector.clone(), executor, charts)?;

    info!(
        "Using model {} with {} tools, max {} iterations",
        reasoning.model(),
        tools.len(),
        settings.agent.max_iterations
    );

    let mut agent = OrchestrationLoop::new(settings.agent.clone(), reasoning, Arc::new(tools))
        .with_schema_context(introspector);
    if let Some(log) = create_session_log(&settings.history) {
        agent = agent.with_session_log(log);
    }
    Ok(agent)
}

async fn ask(agent: &OrchestrationLoop, question: &str) -> anyhow::Result<()> {
    let mut session = agent.start_session().await;
    let outcome = agent
        .run(&mut session, question, &CancellationToken::new())
        .await?;
    print_outcome(&outcome);
    Ok(())
}

async fn chat(agent: &OrchestrationLoop) -> anyhow::Result<()> {
    let mut session = agent.start_session().await;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Ask a question about your data. Type 'exit' to quit.");
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        // Ctrl-C while a request runs stops it after the current dispatch round
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };
        let result = agent.run(&mut session, question, &cancel).await;
        watcher.abort();

        match result {
            Ok(outcome) => print_outcome(&outcome),
            Err(e @ AgentError::StructuralViolation(_)) => return Err(e.into()),
            Err(e) => {
                error!("Request failed: {}", e);
                eprintln!("Error: {}", e);
                session = agent.start_session().await;
            }
        }
    }

    Ok(())
}

async fn history(settings: &Settings, clear: bool) -> anyhow::Result<()> {
    let Some(log) = create_session_log(&settings.history) else {
        println!("Session history is disabled");
        return Ok(());
    };

    if clear {
        log.clear().await?;
        println!("Cleared session history");
    } else {
        for entry in log.entries().await? {
            println!("[{}] {}", entry.role, entry.content);
        }
    }
    Ok(())
}

fn print_outcome(outcome: &LoopOutcome) {
    println!("{}", outcome.content);
    if !outcome.is_complete() {
        eprintln!(
            "(stopped: {} after {} tool rounds)",
            outcome.stop_reason, outcome.iterations
        );
    }
}
