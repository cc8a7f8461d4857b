use std::env;
use std::sync::Arc;

use tilgen_logging::RequestLogger;

use crate::client::{openai::OpenAiClient, ChatSettings, LlmClient, LlmError};
use crate::config::{get_default_url_for_backend, normalize_api_url, BackendType};

/// Client factory for creating LLM clients
pub struct ClientFactory;

impl ClientFactory {
    /// Create an LLM client for `backend`.
    ///
    /// # Arguments
    /// * `backend` - OpenAI, Groq or a llama.cpp server
    /// * `api_key` - Credential; falls back to the backend's env variable
    /// * `api_url` - Custom endpoint; bare base URLs get `/v1/chat/completions` appended
    /// * `settings` - Model, temperature, output cap, timeout
    ///
    /// A missing credential is not an error here: the client reports it via
    /// [`LlmClient::has_credentials`] and fails requests with
    /// [`LlmError::MissingApiKey`].
    pub fn create(
        backend: BackendType,
        api_key: Option<String>,
        api_url: Option<String>,
        settings: ChatSettings,
    ) -> Result<Arc<dyn LlmClient>, LlmError> {
        Self::create_with_logger(backend, api_key, api_url, settings, None)
    }

    /// Same as [`ClientFactory::create`], optionally logging requests to disk
    pub fn create_with_logger(
        backend: BackendType,
        api_key: Option<String>,
        api_url: Option<String>,
        settings: ChatSettings,
        request_logger: Option<Arc<RequestLogger>>,
    ) -> Result<Arc<dyn LlmClient>, LlmError> {
        let url = match api_url.or_else(|| get_default_url_for_backend(&backend)) {
            Some(url) => normalize_api_url(&url),
            None => {
                return Err(LlmError::Config(format!(
                    "{} backend requires an API URL",
                    backend.as_str()
                )))
            }
        };

        let key = resolve_api_key(api_key, || backend.api_key_env().and_then(|var| env::var(var).ok()));

        let mut client = OpenAiClient::new(key, url, settings)?;
        if backend == BackendType::Llama {
            client = client.without_required_key();
        }
        if let Some(logger) = request_logger {
            client = client.with_request_logger(logger);
        }

        tracing::debug!(backend = backend.as_str(), url = client.api_url(), "created completion client");
        Ok(Arc::new(client))
    }
}

/// Explicit key first, then the environment. Blank values count as unset at both steps.
pub(crate) fn resolve_api_key(
    explicit: Option<String>,
    from_env: impl FnOnce() -> Option<String>,
) -> Option<String> {
    let present = |key: &String| !key.trim().is_empty();
    explicit.filter(present).or_else(|| from_env().filter(present))
}
