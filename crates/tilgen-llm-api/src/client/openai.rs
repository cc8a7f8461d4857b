use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use tilgen_logging::{safe_truncate, RequestLogger};
use tilgen_types::{Message, Role};

use crate::client::{ChatSettings, LlmClient, LlmError, LlmResponse, TokenUsage};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

/// Client for OpenAI-compatible `/v1/chat/completions` endpoints
pub struct OpenAiClient {
    api_key: Option<String>,
    require_key: bool,
    api_url: String,
    settings: ChatSettings,
    client: reqwest::Client,
    request_logger: Option<Arc<RequestLogger>>,
}

impl OpenAiClient {
    /// Create a client. An empty `api_key` counts as absent.
    pub fn new(
        api_key: Option<String>,
        api_url: String,
        settings: ChatSettings,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(LlmError::Transport)?;

        Ok(Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            require_key: true,
            api_url,
            settings,
            client,
            request_logger: None,
        })
    }

    /// Self-hosted servers (llama.cpp) accept unauthenticated requests
    pub fn without_required_key(mut self) -> Self {
        self.require_key = false;
        self
    }

    /// Write every request/response pair to disk
    pub fn with_request_logger(mut self, logger: Arc<RequestLogger>) -> Self {
        self.request_logger = Some(logger);
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn map_send_error(&self, err: reqwest::Error) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout(self.settings.timeout)
        } else {
            LlmError::Transport(err)
        }
    }

    fn map_status(status: StatusCode, retry_after: Option<u64>, body: &str) -> LlmError {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Unauthorized {
                status: status.as_u16(),
            },
            StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited { retry_after },
            _ => LlmError::Api {
                status: status.as_u16(),
                body: safe_truncate(body, 500),
            },
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model(&self) -> &str {
        &self.settings.model
    }

    fn has_credentials(&self) -> bool {
        !self.require_key || self.api_key.is_some()
    }

    async fn chat_completion(&self, messages: &[Message]) -> Result<LlmResponse, LlmError> {
        if !self.has_credentials() {
            return Err(LlmError::MissingApiKey);
        }

        let request = ChatRequest {
            model: &self.settings.model,
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let log_stem = self.request_logger.as_ref().map(|logger| {
            let stem = logger.next_stem(&self.settings.model);
            let body = serde_json::to_value(&request).unwrap_or_default();
            let key = self.api_key.as_deref().unwrap_or_default();
            if let Err(e) = logger.log_request(&stem, &self.api_url, &body, key) {
                tracing::warn!(error = %e, "failed to write request log");
            }
            stem
        });

        let mut builder = self
            .client
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        tracing::debug!(
            model = %self.settings.model,
            messages = messages.len(),
            "sending chat completion request"
        );

        let response = builder.send().await.map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let response_text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if let (Some(logger), Some(stem)) = (&self.request_logger, &log_stem) {
            if let Err(e) = logger.log_response(stem, status, &response_text) {
                tracing::warn!(error = %e, "failed to write response log");
            }
        }

        if !status.is_success() {
            return Err(Self::map_status(status, retry_after, &response_text));
        }

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::MalformedResponse("response has no choices".to_string()))?;

        if choice.message.role != Role::Assistant {
            return Err(LlmError::MalformedResponse(format!(
                "expected an assistant message, got role '{}'",
                choice.message.role
            )));
        }

        if let Some(usage) = &chat_response.usage {
            tracing::debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion received"
            );
        }

        Ok(LlmResponse {
            message: choice.message,
            usage: chat_response.usage,
        })
    }
}
