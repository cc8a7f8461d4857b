use clap::Parser;
use std::path::PathBuf;

use tilgen_types::{
    DEFAULT_MAX_HISTORY_TOKENS, DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MODEL, DEFAULT_SESSION_KEY,
    DEFAULT_TEMPERATURE,
};

/// CLI arguments for the TIL generator server
#[derive(Parser, Debug, Clone)]
#[command(name = "tilgen-server")]
#[command(about = "TIL Generator - turns learning notes into Markdown TIL documents")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Address to bind the HTTP server to
    #[arg(long, env = "TILGEN_BIND", default_value = "127.0.0.1")]
    pub bind: String,

    /// Port for the HTTP server
    #[arg(long, env = "TILGEN_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Completion backend: openai, groq or llama
    #[arg(long, env = "TILGEN_BACKEND", default_value = "openai")]
    pub backend: String,

    /// API key for the completion service.
    /// Falls back to OPENAI_API_KEY (or GROQ_API_KEY for the groq backend)
    #[arg(long, env = "TILGEN_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Custom completion endpoint (e.g., http://localhost:8080 for llama.cpp)
    #[arg(long, env = "TILGEN_API_URL", value_name = "URL")]
    pub api_url: Option<String>,

    /// Model name sent with every request
    #[arg(long, env = "TILGEN_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Sampling temperature
    #[arg(long, env = "TILGEN_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Cap on generated tokens per reply
    #[arg(long, env = "TILGEN_MAX_OUTPUT_TOKENS", default_value_t = DEFAULT_MAX_OUTPUT_TOKENS)]
    pub max_output_tokens: u32,

    /// Token budget for the conversation history sent with each request
    #[arg(long, env = "TILGEN_MAX_HISTORY_TOKENS", default_value_t = DEFAULT_MAX_HISTORY_TOKENS)]
    pub max_history_tokens: usize,

    /// Which end of the history survives trimming: last (most recent) or first (oldest).
    /// With `first` the history may start on an assistant message.
    #[arg(long, env = "TILGEN_TRIM_STRATEGY", default_value = "last")]
    pub trim_strategy: String,

    /// Timeout for one completion request, in seconds
    #[arg(long, env = "TILGEN_TIMEOUT_SECS", default_value_t = 60)]
    pub timeout_secs: u64,

    /// Session used when a request names none
    #[arg(long, env = "TILGEN_SESSION_KEY", default_value = DEFAULT_SESSION_KEY)]
    pub session_key: String,

    /// Persist sessions as JSON files in this directory (in-memory when unset)
    #[arg(long, env = "TILGEN_SESSIONS_DIR", value_name = "DIR")]
    pub sessions_dir: Option<PathBuf>,

    /// Write every completion request and response to this directory
    #[arg(long, env = "TILGEN_REQUEST_LOG_DIR", value_name = "DIR")]
    pub request_log_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
