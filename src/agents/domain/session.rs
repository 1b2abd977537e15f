//! Per-conversation state owned by one orchestration loop

use uuid::Uuid;

use super::{Message, MessageHistory};
use crate::agents::error::AgentResult;

/// One conversation: its history plus the dispatch counter of the current request
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    history: MessageHistory,
    iterations: u32,
}

impl Session {
    /// Create a session whose first turn is the given system prompt
    pub fn new(system_prompt: Option<String>) -> Self {
        let history = match system_prompt {
            Some(prompt) => MessageHistory::with_system(prompt),
            None => MessageHistory::new(),
        };
        Self {
            id: Uuid::new_v4().to_string(),
            history,
            iterations: 0,
        }
    }

    /// Resume a session from previously recorded turns
    pub fn resume(id: impl Into<String>, messages: Vec<Message>) -> AgentResult<Self> {
        Ok(Self {
            id: id.into(),
            history: MessageHistory::from_messages(messages)?,
            iterations: 0,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    /// Append a turn to the history
    pub fn append(&mut self, message: Message) -> AgentResult<()> {
        self.history.append(message)
    }

    /// Dispatch rounds completed for the current request
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    pub(crate) fn begin_request(&mut self) {
        self.iterations = 0;
    }

    pub(crate) fn complete_round(&mut self) {
        self.iterations += 1;
    }
}
