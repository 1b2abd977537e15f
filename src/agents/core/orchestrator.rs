//! Bounded reasoning and tool dispatch loop

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use super::{render_system_prompt, DEFAULT_SYSTEM_PROMPT};
use crate::agents::config::AgentConfig;
use crate::agents::domain::{
    LoopOutcome, Message, Role, Session, StopReason, ToolCall, ToolCallResult,
};
use crate::agents::error::AgentResult;
use crate::agents::llm::ReasoningClient;
use crate::agents::memory::{LogEntry, SessionLog};
use crate::agents::tools::ToolRegistry;
use crate::persistence::SchemaIntrospector;

/// Where the loop is within one user request
#[derive(Debug, Clone, PartialEq)]
pub enum LoopState {
    /// Waiting for the next user turn
    AwaitUser,
    /// Sending the history to the reasoning service
    Reasoning,
    /// Dispatching the calls proposed by the last assistant turn
    ToolDispatch(Vec<ToolCall>),
    /// Calls were proposed but the dispatch budget is spent
    MaxIterReached,
    /// The request is finished
    Terminal(StopReason),
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopState::AwaitUser => write!(f, "await_user"),
            LoopState::Reasoning => write!(f, "reasoning"),
            LoopState::ToolDispatch(calls) => write!(f, "tool_dispatch({})", calls.len()),
            LoopState::MaxIterReached => write!(f, "max_iter_reached"),
            LoopState::Terminal(reason) => write!(f, "terminal({})", reason),
        }
    }
}

/// Drives user requests through reasoning and tool dispatch rounds
///
/// One loop may serve many sessions, but each [`Session`] is borrowed mutably
/// for the whole of a request, so the work of one session is serialized.
pub struct OrchestrationLoop {
    config: AgentConfig,
    reasoning: Arc<dyn ReasoningClient>,
    tools: Arc<ToolRegistry>,
    session_log: Option<Arc<dyn SessionLog>>,
    introspector: Option<Arc<dyn SchemaIntrospector>>,
}

impl OrchestrationLoop {
    pub fn new(
        config: AgentConfig,
        reasoning: Arc<dyn ReasoningClient>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            config,
            reasoning,
            tools,
            session_log: None,
            introspector: None,
        }
    }

    /// Record user requests and final answers in a shared log
    pub fn with_session_log(mut self, log: Arc<dyn SessionLog>) -> Self {
        self.session_log = Some(log);
        self
    }

    /// Source of the schema context placed in the system prompt
    pub fn with_schema_context(mut self, introspector: Arc<dyn SchemaIntrospector>) -> Self {
        self.introspector = Some(introspector);
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Render the system prompt, with a fresh schema snapshot when enabled
    pub async fn system_prompt(&self) -> String {
        let template = self
            .config
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);

        let schema = match (&self.introspector, self.config.include_schema_in_prompt) {
            (Some(introspector), true) => {
                match introspector.snapshot(self.config.sample_rows).await {
                    Ok(snapshot) => Some(snapshot.render()),
                    Err(e) => {
                        tracing::warn!("Failed to load schema context: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        render_system_prompt(template, schema.as_deref())
    }

    /// Create a session whose first turn is the system prompt
    pub async fn start_session(&self) -> Session {
        let session = Session::new(Some(self.system_prompt().await));
        tracing::info!(session_id = %session.id(), "Started session");
        session
    }

    /// Drive one user request to a final answer
    ///
    /// Fails only when the reasoning service cannot be reached or the history
    /// ordering rules are broken. Tool failures are fed back to the reasoning
    /// service; an exhausted budget or cancellation ends the request with the
    /// last assistant content. Cancellation is observed after each dispatch
    /// round, never while a call is in flight.
    pub async fn run(
        &self,
        session: &mut Session,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> AgentResult<LoopOutcome> {
        let start = Instant::now();
        let descriptors = self.tools.descriptors();
        let max_iterations = self.config.max_iterations;

        let mut state = LoopState::AwaitUser;
        let mut content = String::new();
        let mut reasoning_rounds = 0u32;
        let mut dispatched: Vec<ToolCallResult> = Vec::new();

        let stop_reason = loop {
            tracing::debug!(session_id = %session.id(), state = %state, "Loop state");

            state = match state {
                LoopState::AwaitUser => {
                    session.begin_request();
                    session.append(Message::user(user_text))?;
                    self.record(Role::User, user_text).await;
                    LoopState::Reasoning
                }

                LoopState::Reasoning => {
                    reasoning_rounds += 1;
                    let reply = self
                        .reasoning
                        .send(session.history().snapshot(), &descriptors)
                        .await?;
                    content = reply.content().to_string();
                    let calls = reply.tool_calls().to_vec();

                    if calls.is_empty() {
                        session.append(reply.message)?;
                        LoopState::Terminal(StopReason::Completed)
                    } else if session.iterations() >= max_iterations {
                        // Undispatched calls are dropped so the history stays resumable
                        session.append(Message::assistant(content.clone()))?;
                        LoopState::MaxIterReached
                    } else {
                        session.append(reply.message)?;
                        LoopState::ToolDispatch(calls)
                    }
                }

                LoopState::ToolDispatch(calls) => {
                    tracing::debug!(
                        session_id = %session.id(),
                        round = session.iterations() + 1,
                        calls = calls.len(),
                        "Dispatching tool calls"
                    );
                    let results = self.tools.dispatch_all(&calls).await;
                    for result in &results {
                        session.append(result.to_message())?;
                    }
                    dispatched.extend(results);
                    session.complete_round();

                    if cancel.is_cancelled() {
                        LoopState::Terminal(StopReason::Cancelled)
                    } else {
                        LoopState::Reasoning
                    }
                }

                LoopState::MaxIterReached => {
                    tracing::warn!(
                        session_id = %session.id(),
                        max_iterations,
                        "Iteration budget exhausted, returning last assistant content"
                    );
                    LoopState::Terminal(StopReason::IterationBudgetExhausted)
                }

                LoopState::Terminal(reason) => break reason,
            };
        };

        if !content.is_empty() {
            self.record(Role::Assistant, &content).await;
        }

        let outcome = LoopOutcome {
            session_id: session.id().to_string(),
            content,
            stop_reason,
            iterations: session.iterations(),
            reasoning_rounds,
            tool_calls: dispatched,
            execution_time_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            session_id = %outcome.session_id,
            stop_reason = %outcome.stop_reason,
            iterations = outcome.iterations,
            tool_calls = outcome.tool_calls.len(),
            elapsed_ms = outcome.execution_time_ms,
            "Request finished"
        );

        Ok(outcome)
    }

    async fn record(&self, role: Role, content: &str) {
        if let Some(log) = &self.session_log {
            if let Err(e) = log.append(LogEntry::new(role, content)).await {
                tracing::warn!("Failed to append to session log: {}", e);
            }
        }
    }
}
