//! File-based session log

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{trim_to, LogEntry, SessionLog};
use crate::agents::error::{AgentError, AgentResult};

/// Session log persisted as a pretty-printed JSON array
///
/// Every mutation reads the file, applies the change, trims to the bound and
/// replaces the file through a temporary sibling, all under one lock. A
/// missing or unreadable file loads as an empty log.
pub struct FileSessionLog {
    path: PathBuf,
    max_entries: usize,
    lock: Mutex<()>,
}

impl FileSessionLog {
    pub fn new(path: impl Into<PathBuf>, max_entries: usize) -> Self {
        Self {
            path: path.into(),
            max_entries,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Vec<LogEntry> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read session log: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Session log is corrupt, starting empty: {}", e);
                Vec::new()
            }
        }
    }

    async fn store(&self, entries: &[LogEntry]) -> AgentResult<()> {
        let content = serde_json::to_string_pretty(entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                AgentError::Memory(format!("Failed to create directory: {}", e))
            })?;
        }

        let mut tmp_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "session_log".into());
        // Unique per write so processes sharing the log never share a sibling
        tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        let tmp_path = self.path.with_file_name(tmp_name);

        if let Err(e) = fs::write(&tmp_path, content).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(AgentError::Memory(format!("Failed to write session log: {}", e)));
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(AgentError::Memory(format!("Failed to replace session log: {}", e)));
        }

        Ok(())
    }
}

#[async_trait]
impl SessionLog for FileSessionLog {
    async fn append(&self, entry: LogEntry) -> AgentResult<()> {
        let _guard = self.lock.lock().await;
        let mut entries = self.load().await;
        entries.push(entry);
        trim_to(&mut entries, self.max_entries);
        self.store(&entries).await
    }

    async fn entries(&self) -> AgentResult<Vec<LogEntry>> {
        let _guard = self.lock.lock().await;
        Ok(self.load().await)
    }

    async fn clear(&self) -> AgentResult<()> {
        let _guard = self.lock.lock().await;
        self.store(&[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::domain::Role;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn leftover_temp_files(dir: &Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|name| name.ends_with(".tmp"))
            .collect()
    }

    #[tokio::test]
    async fn test_append_persists_and_trims() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        let log = FileSessionLog::new(&path, 3);

        for i in 0..5 {
            log.append(LogEntry::new(Role::User, format!("q{}", i)))
                .await
                .unwrap();
        }

        let reopened = FileSessionLog::new(&path, 3);
        let entries = reopened.entries().await.unwrap();
        let contents: Vec<_> = entries.iter().map(|e| e.content.as_str()).collect();
        assert_eq!(contents, vec!["q2", "q3", "q4"]);

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"role\": \"user\""));
        assert!(leftover_temp_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();

        let log = FileSessionLog::new(&path, 10);
        assert!(log.entries().await.unwrap().is_empty());

        log.append(LogEntry::new(Role::Assistant, "fresh")).await.unwrap();
        assert_eq!(log.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_parent_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("history.json");
        let log = FileSessionLog::new(&path, 10);
        log.append(LogEntry::new(Role::User, "hi")).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_clear() {
        let dir = TempDir::new().unwrap();
        let log = FileSessionLog::new(dir.path().join("history.json"), 10);
        log.append(LogEntry::new(Role::User, "hi")).await.unwrap();
        log.clear().await.unwrap();
        assert!(log.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_serialized() {
        let dir = TempDir::new().unwrap();
        let log = Arc::new(FileSessionLog::new(dir.path().join("history.json"), 100));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let log = log.clone();
                tokio::spawn(async move {
                    log.append(LogEntry::new(Role::User, format!("q{}", i))).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(log.entries().await.unwrap().len(), 20);
    }

    #[tokio::test]
    async fn test_independent_writers_on_one_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        // Separate instances hold separate locks, as two processes would
        let first = Arc::new(FileSessionLog::new(&path, 100));
        let second = Arc::new(FileSessionLog::new(&path, 100));

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let log = if i % 2 == 0 { first.clone() } else { second.clone() };
                tokio::spawn(async move {
                    log.append(LogEntry::new(Role::User, format!("q{}", i))).await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let raw = std::fs::read_to_string(&path).unwrap();
        let entries: Vec<LogEntry> = serde_json::from_str(&raw).unwrap();
        assert!(!entries.is_empty());
        assert!(leftover_temp_files(dir.path()).is_empty());
    }
}
