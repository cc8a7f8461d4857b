use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tilgen_llm_api::{LlmClient, LlmError};
use tilgen_types::Message;

use crate::history::HistoryTrimmer;
use crate::prompt::PromptAssembler;
use crate::store::{MessageStore, StoreError};

/// Why a `run` produced no document
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation failed: {0}")]
    Llm(#[from] LlmError),

    #[error("session store failed: {0}")]
    Store(#[from] StoreError),
}

impl GenerationError {
    /// The completion service has no credential configured
    pub fn is_missing_credential(&self) -> bool {
        matches!(self, GenerationError::Llm(LlmError::MissingApiKey))
    }
}

/// Steps of one `run`, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Trimmed,
    Assembled,
    Completed,
    Persisted,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Received => "received",
            PipelineStage::Trimmed => "trimmed",
            PipelineStage::Assembled => "assembled",
            PipelineStage::Completed => "completed",
            PipelineStage::Persisted => "persisted",
        };
        f.write_str(name)
    }
}

/// Rewrite every newline as a Markdown hard break (`"  \n"`).
///
/// Not idempotent: call exactly once per generated document.
pub fn normalize_markdown_newlines(text: &str) -> String {
    text.replace('\n', "  \n")
}

/// Runs the load → trim → assemble → complete → persist pipeline for a session
pub struct SessionRunner {
    store: Arc<dyn MessageStore>,
    client: Arc<dyn LlmClient>,
    trimmer: HistoryTrimmer,
    assembler: PromptAssembler,
    session_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SessionRunner {
    pub fn new(
        store: Arc<dyn MessageStore>,
        client: Arc<dyn LlmClient>,
        trimmer: HistoryTrimmer,
        assembler: PromptAssembler,
    ) -> Self {
        Self {
            store,
            client,
            trimmer,
            assembler,
            session_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn client(&self) -> &Arc<dyn LlmClient> {
        &self.client
    }

    pub fn store(&self) -> &Arc<dyn MessageStore> {
        &self.store
    }

    /// Lock serializing every mutation of one session
    fn session_lock(&self, session_key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .session_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(session_key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop the table entry once no caller holds or waits on it.
    /// New callers need the table lock to get a handle, so the count cannot grow meanwhile.
    fn release_lock(&self, session_key: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        drop(lock);
        let mut locks = self
            .session_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if locks
            .get(session_key)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            locks.remove(session_key);
        }
    }

    /// Sessions with a lock entry, i.e. with a `run` or `clear` in flight
    pub fn active_sessions(&self) -> usize {
        self.session_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Generate a reply to `user_text` within `session_key`'s conversation.
    ///
    /// On success the human message and the assistant reply are appended to
    /// the session, and the reply is returned with Markdown hard breaks. On
    /// failure the session is left untouched.
    pub async fn run(&self, session_key: &str, user_text: &str) -> Result<String, GenerationError> {
        let lock = self.session_lock(session_key);
        let result = {
            let _guard = lock.lock().await;
            self.run_locked(session_key, user_text).await
        };
        self.release_lock(session_key, lock);
        result
    }

    /// Like [`SessionRunner::run`], but the session is removed afterwards,
    /// whether or not generation succeeded.
    pub async fn run_ephemeral(&self, session_key: &str, user_text: &str) -> Result<String, GenerationError> {
        let lock = self.session_lock(session_key);
        let result = {
            let _guard = lock.lock().await;
            let result = self.run_locked(session_key, user_text).await;
            match self.store.clear(session_key).await {
                Ok(_) => result,
                Err(e) => {
                    tracing::warn!(session = session_key, error = %e, "failed to drop one-shot session");
                    result.and(Err(e.into()))
                }
            }
        };
        self.release_lock(session_key, lock);
        result
    }

    async fn run_locked(&self, session_key: &str, user_text: &str) -> Result<String, GenerationError> {
        let human = Message::human(user_text);
        let mut history = self.store.load(session_key).await?;
        tracing::debug!(
            session = session_key,
            stage = %PipelineStage::Received,
            history = history.len(),
            "session loaded"
        );
        history.push(human.clone());

        let trimmed = self.trimmer.trim(&history);
        tracing::debug!(
            session = session_key,
            stage = %PipelineStage::Trimmed,
            kept = trimmed.len(),
            dropped = history.len() - trimmed.len(),
            "history trimmed"
        );

        let prompt = self.assembler.assemble(&trimmed);
        tracing::debug!(
            session = session_key,
            stage = %PipelineStage::Assembled,
            prompt_messages = prompt.len(),
            "prompt assembled"
        );

        let response = self.client.chat_completion(&prompt).await?;
        tracing::debug!(
            session = session_key,
            stage = %PipelineStage::Completed,
            model = self.client.model(),
            reply_chars = response.message.content.chars().count(),
            "completion received"
        );

        let reply = response.message;
        let markdown = normalize_markdown_newlines(&reply.content);
        self.store.append_many(session_key, vec![human, reply]).await?;
        tracing::debug!(session = session_key, stage = %PipelineStage::Persisted, "session updated");

        Ok(markdown)
    }

    /// Stored messages of a session
    pub async fn history(&self, session_key: &str) -> Result<Vec<Message>, StoreError> {
        self.store.load(session_key).await
    }

    /// Forget a session. Waits for any in-flight `run` on it.
    pub async fn clear(&self, session_key: &str) -> Result<bool, StoreError> {
        let lock = self.session_lock(session_key);
        let result = {
            let _guard = lock.lock().await;
            self.store.clear(session_key).await
        };
        self.release_lock(session_key, lock);
        result
    }
}
