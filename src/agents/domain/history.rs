//! Append-only conversation log with structural checks
//!
//! Ordering rules enforced on every append:
//! - a system turn may only be the very first turn
//! - each tool turn answers a call proposed by the most recent assistant turn,
//!   and each call is answered at most once
//! - no user or assistant turn may follow an assistant turn until all of its
//!   calls have been answered

use std::collections::HashSet;

use super::{Message, Role};
use crate::agents::error::{AgentError, AgentResult};

/// Ordered log of conversation turns
#[derive(Debug, Clone, Default)]
pub struct MessageHistory {
    messages: Vec<Message>,
    /// Unanswered call ids of the most recent assistant turn
    pending: Vec<String>,
}

impl MessageHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a history with a system turn
    pub fn with_system(prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(prompt)],
            pending: Vec::new(),
        }
    }

    /// Rebuild a history by replaying turns through [`append`](Self::append)
    pub fn from_messages(messages: Vec<Message>) -> AgentResult<Self> {
        let mut history = Self::new();
        for message in messages {
            history.append(message)?;
        }
        Ok(history)
    }

    /// Append a turn, rejecting it if it breaks the ordering rules
    pub fn append(&mut self, message: Message) -> AgentResult<()> {
        match message.role {
            Role::System => {
                if !self.messages.is_empty() {
                    return Err(violation("a system turn may only be the first turn"));
                }
            }
            Role::Tool => {
                let id = message
                    .tool_call_id
                    .as_deref()
                    .ok_or_else(|| violation("tool turn without tool_call_id"))?;
                let index = self.pending.iter().position(|p| p == id).ok_or_else(|| {
                    violation(format!(
                        "tool turn answers '{}', which is not a pending call of the preceding assistant turn",
                        id
                    ))
                })?;
                self.pending.remove(index);
            }
            Role::User | Role::Assistant => {
                if !self.pending.is_empty() {
                    return Err(violation(format!(
                        "{} turn appended while calls are unanswered: {}",
                        message.role,
                        self.pending.join(", ")
                    )));
                }
                if message.role == Role::Assistant {
                    let mut seen = HashSet::new();
                    for call in message.tool_calls() {
                        if !seen.insert(call.id.as_str()) {
                            return Err(violation(format!("duplicate tool call id '{}'", call.id)));
                        }
                    }
                    self.pending = message.tool_calls().iter().map(|c| c.id.clone()).collect();
                }
            }
        }

        self.messages.push(message);
        Ok(())
    }

    /// Read-only ordered view
    pub fn snapshot(&self) -> &[Message] {
        &self.messages
    }

    /// Calls still waiting for a tool turn
    pub fn pending_calls(&self) -> &[String] {
        &self.pending
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

fn violation(reason: impl Into<String>) -> AgentError {
    AgentError::StructuralViolation(reason.into())
}
