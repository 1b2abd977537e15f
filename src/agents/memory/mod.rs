//! Persisted session log
//!
//! A flat `{role, content}` log of user requests and final answers, shared
//! across sessions and bounded to the most recent entries:
//! - In-memory (tests, history disabled on disk)
//! - File-based (JSON array, rewritten wholesale on every mutation)

mod file;
mod in_memory;

pub use file::FileSessionLog;
pub use in_memory::InMemorySessionLog;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::agents::config::HistoryConfig;
use crate::agents::domain::Role;
use crate::agents::error::AgentResult;

/// One recorded turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub role: Role,
    pub content: String,
}

impl LogEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Trait for session log backends
#[async_trait]
pub trait SessionLog: Send + Sync {
    /// Append an entry, dropping the oldest entries past the bound
    async fn append(&self, entry: LogEntry) -> AgentResult<()>;

    /// All retained entries, oldest first
    async fn entries(&self) -> AgentResult<Vec<LogEntry>>;

    /// Remove every entry
    async fn clear(&self) -> AgentResult<()>;
}

/// Create a session log from configuration
pub fn create_session_log(config: &HistoryConfig) -> Option<Arc<dyn SessionLog>> {
    if !config.enabled {
        return None;
    }
    Some(Arc::new(FileSessionLog::new(&config.path, config.max_entries)))
}

/// Keep only the most recent `max` entries
pub(crate) fn trim_to(entries: &mut Vec<LogEntry>, max: usize) {
    if entries.len() > max {
        let remove_count = entries.len() - max;
        entries.drain(0..remove_count);
    }
}
