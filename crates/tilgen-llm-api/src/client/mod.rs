use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use tilgen_types::{Message, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

pub mod openai;

/// Generation parameters sent with every completion request
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Upper bound for one request, connect through body
    pub timeout: Duration,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Why a completion request failed
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no API key configured for the completion service")]
    MissingApiKey,

    #[error("completion service rejected the credential (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("completion service rate limited the request")]
    RateLimited { retry_after: Option<u64> },

    #[error("completion service returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("completion request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("malformed completion response: {0}")]
    MalformedResponse(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

/// LLM response structure
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub message: Message,
    pub usage: Option<TokenUsage>,
}

/// Token usage information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// LLM client trait - the seam between the session pipeline and the network
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier sent with each request
    fn model(&self) -> &str;

    /// Whether a credential is available. Clients that need none return true.
    fn has_credentials(&self) -> bool {
        true
    }

    /// Send the full prompt and receive one assistant message
    async fn chat_completion(&self, messages: &[Message]) -> Result<LlmResponse, LlmError>;
}
