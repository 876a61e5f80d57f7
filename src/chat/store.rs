//! Conversation persistence
//!
//! Stores the rolling transcript as a single JSON file. The file grows
//! monotonically (no implicit truncation); only the outbound model context
//! is windowed, by the orchestrator. Writes go through a temp-file rename
//! so a crash never leaves a half-written log.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::chat::models::{ChatRole, StoredMessage};

/// Error types for conversation store operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// File I/O error
    IoError(String),
    /// JSON serialization/deserialization error
    JsonError(String),
    /// Invalid data format
    InvalidData(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::IoError(msg) => write!(f, "IO Error: {}", msg),
            StoreError::JsonError(msg) => write!(f, "JSON Error: {}", msg),
            StoreError::InvalidData(msg) => write!(f, "Invalid Data: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Serializable structure for the conversation log file
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConversationData {
    /// Version of the log format (for future migration support)
    version: u32,
    /// Messages in append order
    messages: Vec<StoredMessage>,
}

/// Append-only conversation store backed by a JSON file
pub struct ConversationStore {
    path: PathBuf,
    messages: Mutex<Vec<StoredMessage>>,
}

impl ConversationStore {
    /// Load the store from a file, starting empty if the file does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let messages = if path.exists() {
            let json =
                fs::read_to_string(&path).map_err(|e| StoreError::IoError(e.to_string()))?;
            let data: ConversationData =
                serde_json::from_str(&json).map_err(|e| StoreError::JsonError(e.to_string()))?;
            if data.version != 1 {
                return Err(StoreError::InvalidData(format!(
                    "Unsupported conversation log version: {}",
                    data.version
                )));
            }
            data.messages
        } else {
            Vec::new()
        };

        Ok(Self {
            path,
            messages: Mutex::new(messages),
        })
    }

    /// Append a message and persist the log
    pub async fn append(&self, role: ChatRole, content: &str) -> Result<StoredMessage, StoreError> {
        let message = StoredMessage::new(role, content.to_string());
        let mut messages = self.messages.lock().await;
        messages.push(message.clone());
        self.persist(&messages)?;
        debug!(role = role.as_str(), total = messages.len(), "Appended message");
        Ok(message)
    }

    /// Get the full persisted transcript
    pub async fn history(&self) -> Vec<StoredMessage> {
        self.messages.lock().await.clone()
    }

    /// Get the most recent `n` messages, oldest first
    pub async fn tail(&self, n: usize) -> Vec<StoredMessage> {
        let messages = self.messages.lock().await;
        let skip = messages.len().saturating_sub(n);
        messages[skip..].to_vec()
    }

    /// Clear the transcript and persist the empty log
    pub async fn clear(&self) -> Result<(), StoreError> {
        let mut messages = self.messages.lock().await;
        messages.clear();
        self.persist(&messages)?;
        debug!("Cleared conversation log");
        Ok(())
    }

    /// Write the log to disk atomically (temp file + rename)
    fn persist(&self, messages: &[StoredMessage]) -> Result<(), StoreError> {
        let data = ConversationData {
            version: 1,
            messages: messages.to_vec(),
        };
        let json = serde_json::to_string_pretty(&data)
            .map_err(|e| StoreError::JsonError(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::IoError(e.to_string()))?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json).map_err(|e| StoreError::IoError(e.to_string()))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::IoError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> ConversationStore {
        ConversationStore::load(dir.path().join("conversation.json")).unwrap()
    }

    #[tokio::test]
    async fn test_append_and_history() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store.append(ChatRole::User, "first").await.unwrap();
        store.append(ChatRole::Assistant, "second").await.unwrap();

        let history = store.history().await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, ChatRole::User);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_tail_returns_most_recent_oldest_first() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        for i in 0..5 {
            store
                .append(ChatRole::User, &format!("message {}", i))
                .await
                .unwrap();
        }

        let tail = store.tail(2).await;
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].content, "message 3");
        assert_eq!(tail[1].content, "message 4");

        // Asking for more than exists returns everything
        let tail = store.tail(50).await;
        assert_eq!(tail.len(), 5);
    }

    #[tokio::test]
    async fn test_persists_across_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conversation.json");

        {
            let store = ConversationStore::load(&path).unwrap();
            store.append(ChatRole::User, "survives").await.unwrap();
        }

        let reloaded = ConversationStore::load(&path).unwrap();
        let history = reloaded.history().await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].content, "survives");
    }

    #[tokio::test]
    async fn test_clear_empties_log_and_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conversation.json");

        let store = ConversationStore::load(&path).unwrap();
        store.append(ChatRole::User, "gone soon").await.unwrap();
        store.clear().await.unwrap();
        assert!(store.history().await.is_empty());

        let reloaded = ConversationStore::load(&path).unwrap();
        assert!(reloaded.history().await.is_empty());
    }

    #[test]
    fn test_load_from_nonexistent_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = ConversationStore::load(dir.path().join("missing.json")).unwrap();
        assert!(store.messages.try_lock().unwrap().is_empty());
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conversation.json");
        fs::write(&path, r#"{"version": 9, "messages": []}"#).unwrap();

        let result = ConversationStore::load(&path);
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
    }
}
