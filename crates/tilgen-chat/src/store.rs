use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use tilgen_types::{Checkpoint, Message};

/// Failure of the session store. Fatal to the request that hit it.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("session store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt session checkpoint: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only, per-session message log.
///
/// Sessions are created lazily: loading an unknown key yields an empty log.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append one message to the end of a session's log
    async fn append(&self, session_key: &str, message: Message) -> Result<(), StoreError>;

    /// Append several messages in order as one update
    async fn append_many(&self, session_key: &str, messages: Vec<Message>) -> Result<(), StoreError> {
        for message in messages {
            self.append(session_key, message).await?;
        }
        Ok(())
    }

    /// Full ordered log for a session
    async fn load(&self, session_key: &str) -> Result<Vec<Message>, StoreError>;

    /// Drop a session. Returns whether it existed.
    async fn clear(&self, session_key: &str) -> Result<bool, StoreError>;

    /// Keys of all known sessions
    async fn sessions(&self) -> Result<Vec<String>, StoreError>;
}

/// Process-lifetime store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    sessions: RwLock<HashMap<String, Checkpoint>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn append(&self, session_key: &str, message: Message) -> Result<(), StoreError> {
        self.append_many(session_key, vec![message]).await
    }

    async fn append_many(&self, session_key: &str, messages: Vec<Message>) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let checkpoint = sessions
            .entry(session_key.to_string())
            .or_insert_with(|| Checkpoint::new(session_key));
        for message in messages {
            checkpoint.push(message);
        }
        Ok(())
    }

    async fn load(&self, session_key: &str) -> Result<Vec<Message>, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_key)
            .map(|c| c.messages.clone())
            .unwrap_or_default())
    }

    async fn clear(&self, session_key: &str) -> Result<bool, StoreError> {
        Ok(self.sessions.write().await.remove(session_key).is_some())
    }

    async fn sessions(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.sessions.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}
