use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tilgen_chat::{
    CharEstimateCounter, FileStore, HistoryTrimmer, InMemoryStore, MessageStore, PromptAssembler,
    SessionRunner, TiktokenCounter, TokenCounter, TrimConfig, TrimStrategy,
};
use tilgen_llm_api::{BackendType, ChatSettings, ClientFactory, LlmClient};
use tilgen_logging::{expand_tilde, RequestLogger};

use crate::cli::Cli;

/// Application configuration derived from CLI arguments and environment
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub default_session_key: String,
    pub runner: Arc<SessionRunner>,
}

/// Set up application configuration from CLI arguments
pub fn setup_from_cli(cli: &Cli) -> Result<AppConfig> {
    let bind_addr: SocketAddr = format!("{}:{}", cli.bind, cli.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", cli.bind, cli.port))?;

    Ok(AppConfig {
        bind_addr,
        default_session_key: cli.session_key.clone(),
        runner: build_runner(cli)?,
    })
}

/// Wire store, client, trimmer and assembler into a session runner
pub fn build_runner(cli: &Cli) -> Result<Arc<SessionRunner>> {
    let store = build_store(cli)?;
    let client = build_client(cli)?;

    let strategy = TrimStrategy::from_str(&cli.trim_strategy).with_context(|| {
        format!("Unknown trim strategy '{}' (expected last or first)", cli.trim_strategy)
    })?;
    let trim_config = TrimConfig {
        max_tokens: cli.max_history_tokens,
        strategy,
        ..TrimConfig::default()
    };
    let trimmer = HistoryTrimmer::new(trim_config, token_counter(&cli.model));

    Ok(Arc::new(SessionRunner::new(
        store,
        client,
        trimmer,
        PromptAssembler::default(),
    )))
}

fn build_store(cli: &Cli) -> Result<Arc<dyn MessageStore>> {
    match &cli.sessions_dir {
        Some(dir) => {
            let dir = expand_tilde(dir)?;
            let store = FileStore::new(&dir)
                .with_context(|| format!("Failed to open sessions directory {}", dir.display()))?;
            tracing::info!(dir = %dir.display(), "persisting sessions to disk");
            Ok(Arc::new(store))
        }
        None => Ok(Arc::new(InMemoryStore::new())),
    }
}

fn build_client(cli: &Cli) -> Result<Arc<dyn LlmClient>> {
    let backend = BackendType::from_str(&cli.backend)
        .with_context(|| format!("Unknown backend '{}' (expected openai, groq or llama)", cli.backend))?;

    let request_logger = match &cli.request_log_dir {
        Some(dir) => {
            let dir = expand_tilde(dir)?;
            Some(Arc::new(RequestLogger::new(&dir)?))
        }
        None => None,
    };

    let settings = ChatSettings {
        model: cli.model.clone(),
        temperature: cli.temperature,
        max_tokens: cli.max_output_tokens,
        timeout: Duration::from_secs(cli.timeout_secs),
    };

    let client = ClientFactory::create_with_logger(
        backend,
        cli.api_key.clone(),
        cli.api_url.clone(),
        settings,
        request_logger,
    )
    .context("Failed to create completion client")?;

    if !client.has_credentials() {
        tracing::warn!(
            backend = backend.as_str(),
            "no API key configured; generation requests will fail with missing_openai_key"
        );
    }

    Ok(client)
}

fn token_counter(model: &str) -> Arc<dyn TokenCounter> {
    match TiktokenCounter::for_model(model) {
        Ok(counter) => Arc::new(counter),
        Err(e) => {
            tracing::warn!(error = %e, "tokenizer unavailable, estimating tokens from length");
            Arc::new(CharEstimateCounter)
        }
    }
}
