//! # tilgen-llm-api
//!
//! Chat completion clients for OpenAI-compatible services:
//! - OpenAI
//! - Groq
//! - llama.cpp (self-hosted)
//!
//! All three speak the same `/v1/chat/completions` wire format, so a single
//! [`OpenAiClient`](client::openai::OpenAiClient) serves them; the
//! [`ClientFactory`] picks URL and credential per backend.
//!
//! ## Example
//!
//! ```rust,no_run
//! use tilgen_llm_api::{BackendType, ChatSettings, ClientFactory};
//! use tilgen_types::Message;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ClientFactory::create(
//!         BackendType::OpenAI,
//!         Some("your-api-key".to_string()),
//!         None,
//!         ChatSettings::default(),
//!     )?;
//!
//!     let response = client.chat_completion(&[Message::human("Hello!")]).await?;
//!     println!("Response: {}", response.message.content);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;


// Re-export commonly used types
pub use client::{ChatSettings, LlmClient, LlmError, LlmResponse, TokenUsage};
pub use client::openai::OpenAiClient;

pub use config::{
    get_default_url_for_backend, normalize_api_url, BackendType, ClientFactory, GROQ_API_URL,
    OPENAI_API_URL,
};
