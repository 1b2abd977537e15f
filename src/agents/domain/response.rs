//! Outcome of driving one user request through the loop

use serde::{Deserialize, Serialize};

use super::ToolCallResult;

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The reasoning service replied without proposing calls
    Completed,
    /// The dispatch budget ran out; content is the last assistant text
    IterationBudgetExhausted,
    /// Cancellation was observed between iterations
    Cancelled,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Completed => write!(f, "completed"),
            StopReason::IterationBudgetExhausted => write!(f, "iteration budget exhausted"),
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Final response for one user request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopOutcome {
    /// Session the request ran in
    pub session_id: String,
    /// Final (or best-effort) assistant content
    pub content: String,
    pub stop_reason: StopReason,
    /// Dispatch rounds performed
    pub iterations: u32,
    /// Requests sent to the reasoning service
    pub reasoning_rounds: u32,
    /// Every dispatched call, in dispatch order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallResult>,
    /// Execution time in milliseconds
    pub execution_time_ms: u64,
}

impl LoopOutcome {
    pub fn is_complete(&self) -> bool {
        self.stop_reason == StopReason::Completed
    }
}
