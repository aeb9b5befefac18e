//! Durable analytics counters and the append-only action log.
//!
//! Persistence format is deliberately plain: one JSON object per counter
//! file (`key -> integer`) and one JSON array for the action log, so the
//! reporting dashboard can consume the files independently. The store
//! itself only promises the increment/append/read contract.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::warn;

/// Counter file tracking per-user message totals
pub const MESSAGES_COUNTER: &str = "messages";
/// Counter file tracking warnings by reason
pub const WARNINGS_COUNTER: &str = "warnings";
/// Append-only log of scheduler- and escalator-triggered side effects
pub const ACTIONS_LOG: &str = "actions";

/// Errors that can occur during counter store operations
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for counter store operations
pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// A single entry in the append-only action log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLogEntry {
    pub action: String,
    pub time: DateTime<Utc>,
}

impl ActionLogEntry {
    #[must_use]
    pub fn now(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            time: Utc::now(),
        }
    }
}

/// Named integer counters with JSON file persistence.
///
/// The files are a process-wide shared resource touched by the message
/// pipeline, the escalator and the scheduler, so every update is a single
/// read-modify-write serialized behind one lock. Lost updates are not
/// acceptable here: N concurrent increments must add exactly N.
pub struct CounterStore {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl CounterStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            lock: Mutex::new(()),
        }
    }

    fn file(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Add `delta` to `key` in the named counter, returning the new value.
    ///
    /// A missing or malformed counter file is treated as empty rather
    /// than failing the caller.
    ///
    /// # Errors
    /// Returns an error if the counter file cannot be written.
    pub async fn increment(&self, counter: &str, key: &str, delta: i64) -> AnalyticsResult<i64> {
        let _guard = self.lock.lock().await;

        let path = self.file(counter);
        let mut data = read_json_or::<HashMap<String, i64>>(&path).await;
        let value = data.entry(key.to_string()).or_insert(0);
        *value += delta;
        let value = *value;

        self.write(&path, &data).await?;
        Ok(value)
    }

    /// Append a record to the named action log. Ordering is occurrence
    /// order: the write happens under the same lock as the counters.
    ///
    /// # Errors
    /// Returns an error if the log file cannot be written.
    pub async fn append(&self, log: &str, entry: ActionLogEntry) -> AnalyticsResult<()> {
        let _guard = self.lock.lock().await;

        let path = self.file(log);
        let mut entries = read_json_or::<Vec<ActionLogEntry>>(&path).await;
        entries.push(entry);

        self.write(&path, &entries).await
    }

    /// Read the full mapping of a named counter. Missing file reads as
    /// empty.
    pub async fn read_all(&self, counter: &str) -> AnalyticsResult<HashMap<String, i64>> {
        let _guard = self.lock.lock().await;
        Ok(read_json_or(&self.file(counter)).await)
    }

    /// Read every entry of the named action log, oldest first.
    pub async fn read_log(&self, log: &str) -> AnalyticsResult<Vec<ActionLogEntry>> {
        let _guard = self.lock.lock().await;
        Ok(read_json_or(&self.file(log)).await)
    }

    async fn write<T: Serialize>(&self, path: &Path, value: &T) -> AnalyticsResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(value)?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

/// Read and parse a JSON file, falling back to the default on a missing
/// or malformed file (first run, partial write).
async fn read_json_or<T: for<'de> Deserialize<'de> + Default>(path: &Path) -> T {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Malformed analytics file {}: {e}, starting empty", path.display());
            T::default()
        }),
        Err(_) => T::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn temp_store() -> CounterStore {
        CounterStore::new(std::env::temp_dir().join(format!("vigil-analytics-{}", uuid::Uuid::new_v4())))
    }

    #[tokio::test]
    async fn test_increment_and_read_back() {
        let store = temp_store();

        assert_eq!(store.increment("messages", "42", 1).await.unwrap(), 1);
        assert_eq!(store.increment("messages", "42", 1).await.unwrap(), 2);
        assert_eq!(store.increment("messages", "7", 5).await.unwrap(), 5);

        let all = store.read_all("messages").await.unwrap();
        assert_eq!(all.get("42"), Some(&2));
        assert_eq!(all.get("7"), Some(&5));
    }

    #[tokio::test]
    async fn test_missing_counter_reads_empty() {
        let store = temp_store();
        assert!(store.read_all("warnings").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_file_starts_empty() {
        let store = temp_store();
        tokio::fs::create_dir_all(&store.dir).await.unwrap();
        tokio::fs::write(store.file("warnings"), "{ not json").await.unwrap();

        assert_eq!(store.increment("warnings", "Flood spam", 1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = temp_store();
        for i in 0..4 {
            store
                .append("actions", ActionLogEntry::now(format!("action-{i}")))
                .await
                .unwrap();
        }

        let entries = store.read_log("actions").await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.action.as_str()).collect();
        assert_eq!(names, ["action-0", "action-1", "action-2", "action-3"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_increments_are_atomic() {
        let store = Arc::new(temp_store());
        let n = 32;

        let mut handles = Vec::new();
        for _ in 0..n {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.increment("messages", "busy", 1).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let all = store.read_all("messages").await.unwrap();
        assert_eq!(all.get("busy"), Some(&(n as i64)));
    }
}
