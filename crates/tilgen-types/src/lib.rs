//! Core types and structures for tilgen
//!
//! This crate provides the foundational types used across all tilgen crates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Session key shared by every caller that does not name its own session
pub const DEFAULT_SESSION_KEY: &str = "static_session";

/// Token budget for the history sent with each completion request
pub const DEFAULT_MAX_HISTORY_TOKENS: usize = 512;

/// Default completion model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default sampling temperature for TIL generation
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Default cap on generated tokens
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;

// ============================================================================
// Message Types
// ============================================================================

/// Author of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "user", alias = "human")]
    Human,
    #[serde(rename = "system")]
    System,
    #[serde(rename = "assistant", alias = "ai")]
    Assistant,
}

impl Role {
    /// Wire name used by OpenAI-compatible chat APIs
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "user",
            Role::System => "system",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Helper function to deserialize string or null values
pub fn deserialize_string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// A single role-tagged chat message.
///
/// Messages are never edited after creation; a message's position in a
/// session is its index in the session log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(deserialize_with = "deserialize_string_or_null", default)]
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self::new(Role::Human, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_system(&self) -> bool {
        self.role == Role::System
    }
}

// ============================================================================
// Session Checkpoints
// ============================================================================

/// Persisted snapshot of one session's message log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_key: String,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(session_key: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_key: session_key.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }
}
