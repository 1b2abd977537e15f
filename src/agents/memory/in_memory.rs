//! In-memory session log

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{trim_to, LogEntry, SessionLog};
use crate::agents::error::AgentResult;

/// In-memory session log
pub struct InMemorySessionLog {
    entries: RwLock<Vec<LogEntry>>,
    max_entries: usize,
}

impl InMemorySessionLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            max_entries,
        }
    }
}

#[async_trait]
impl SessionLog for InMemorySessionLog {
    async fn append(&self, entry: LogEntry) -> AgentResult<()> {
        let mut entries = self.entries.write().await;
        entries.push(entry);
        trim_to(&mut entries, self.max_entries);
        Ok(())
    }

    async fn entries(&self) -> AgentResult<Vec<LogEntry>> {
        Ok(self.entries.read().await.clone())
    }

    async fn clear(&self) -> AgentResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}
