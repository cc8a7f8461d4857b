use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use tilgen_types::Message;

/// Response `message` codes
pub const CONVERT_SUCCESS: &str = "convert_success";
pub const INVALID_REQUEST: &str = "invalid_request";
pub const MISSING_OPENAI_KEY: &str = "missing_openai_key";
pub const LLM_SERVER_ERROR: &str = "llm_server_error";
pub const SESSION_FOUND: &str = "session_found";
pub const SESSION_CLEARED: &str = "session_cleared";

/// Body of `POST /api/v1/convert` and `POST /api/v1/summation`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertRequest {
    /// The user's learning notes
    pub content: String,
    /// Base64-encoded image; accepted but not sent to the model
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl ConvertRequest {
    /// Reject an `image` that is not valid base64. A `data:` URL prefix is allowed.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(image) = &self.image {
            let encoded = match image.split_once(";base64,") {
                Some((prefix, rest)) if prefix.starts_with("data:") => rest,
                _ => image.as_str(),
            };
            STANDARD
                .decode(encoded.trim())
                .map_err(|e| format!("image is not valid base64: {}", e))?;
        }
        Ok(())
    }

    /// Explicit session id, ignoring blank values
    pub fn session_id(&self) -> Option<&str> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// `{ message, data }` envelope used by every `/api/v1` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(message: &str, data: T) -> Self {
        Self {
            message: message.to_string(),
            data: Some(data),
        }
    }

    pub fn failure(message: &str) -> Self {
        Self {
            message: message.to_string(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvertData {
    pub markdown: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub session_key: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearedData {
    pub cleared: bool,
}

/// Body of the legacy `POST /generate_til`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateTilRequest {
    pub user_notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateTilResponse {
    pub user_notes: String,
    pub til: String,
}
