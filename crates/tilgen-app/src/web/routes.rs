use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use uuid::Uuid;

use tilgen_chat::{GenerationError, SessionRunner, StoreError};

use crate::web::protocol::{
    ApiResponse, ClearedData, ConvertData, ConvertRequest, GenerateTilRequest,
    GenerateTilResponse, SessionData, CONVERT_SUCCESS, INVALID_REQUEST, LLM_SERVER_ERROR,
    MISSING_OPENAI_KEY, SESSION_CLEARED, SESSION_FOUND,
};

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<SessionRunner>,
    /// Session used by `/api/v1/convert` and `/generate_til` when none is named
    pub default_session_key: String,
}

/// Which session a convert-style request lands in when it names none
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionScope {
    Shared,
    PerCall,
}

/// Create router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/v1/convert", post(convert))
        .route("/api/v1/summation", post(summation))
        .route(
            "/api/v1/sessions/:key",
            get(get_session).delete(clear_session),
        )
        // Legacy route, kept for old clients
        .route("/generate_til", post(generate_til))
        .with_state(state)
}

/// GET / - Health check
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Welcome to the TIL Generator API" }))
}

/// POST /api/v1/convert - Generate a TIL within the shared session
async fn convert(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ConvertData>>, ApiError> {
    handle_convert(&state, &headers, payload, SessionScope::Shared).await
}

/// POST /api/v1/summation - Generate a TIL in a fresh session per call
async fn summation(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ConvertData>>, ApiError> {
    handle_convert(&state, &headers, payload, SessionScope::PerCall).await
}

async fn handle_convert(
    state: &AppState,
    headers: &HeaderMap,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
    scope: SessionScope,
) -> Result<Json<ApiResponse<ConvertData>>, ApiError> {
    require_bearer(headers)?;
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;
    request.validate().map_err(ApiError::InvalidRequest)?;

    if !state.runner.client().has_credentials() {
        return Err(ApiError::MissingApiKey);
    }

    // A per-call session is never handed back to the client, so it is dropped after the run
    let (session_key, ephemeral) = match (request.session_id(), scope) {
        (Some(id), _) => (id.to_string(), false),
        (None, SessionScope::Shared) => (state.default_session_key.clone(), false),
        (None, SessionScope::PerCall) => (Uuid::new_v4().to_string(), true),
    };

    tracing::info!(
        session = %session_key,
        ephemeral,
        content_chars = request.content.chars().count(),
        has_image = request.image.is_some(),
        "generating TIL"
    );

    let markdown = if ephemeral {
        state.runner.run_ephemeral(&session_key, &request.content).await?
    } else {
        state.runner.run(&session_key, &request.content).await?
    };
    Ok(Json(ApiResponse::success(CONVERT_SUCCESS, ConvertData { markdown })))
}

/// GET /api/v1/sessions/:key - Stored messages of a session
async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<SessionData>>, ApiError> {
    require_bearer(&headers)?;
    let messages = state.runner.history(&key).await?;
    Ok(Json(ApiResponse::success(
        SESSION_FOUND,
        SessionData {
            session_key: key,
            messages,
        },
    )))
}

/// DELETE /api/v1/sessions/:key - Forget a session
async fn clear_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> Result<Json<ApiResponse<ClearedData>>, ApiError> {
    require_bearer(&headers)?;
    let cleared = state.runner.clear(&key).await?;
    tracing::info!(session = %key, cleared, "session cleared");
    Ok(Json(ApiResponse::success(SESSION_CLEARED, ClearedData { cleared })))
}

/// POST /generate_til - Legacy route; failures yield an empty `til`
async fn generate_til(
    State(state): State<AppState>,
    payload: Result<Json<GenerateTilRequest>, JsonRejection>,
) -> Result<Json<GenerateTilResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidRequest(e.body_text()))?;

    let til = match state
        .runner
        .run(&state.default_session_key, &request.user_notes)
        .await
    {
        Ok(markdown) => markdown,
        Err(e) => {
            tracing::warn!(error = %e, "TIL generation failed, returning empty document");
            String::new()
        }
    };

    Ok(Json(GenerateTilResponse {
        user_notes: request.user_notes,
        til,
    }))
}

/// Only the `Bearer ` prefix is checked; the token itself is not validated
fn require_bearer(headers: &HeaderMap) -> Result<(), ApiError> {
    let authorized = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("Bearer "));

    if authorized {
        Ok(())
    } else {
        Err(ApiError::InvalidRequest(
            "missing or malformed Authorization header".to_string(),
        ))
    }
}

/// Error type for API handlers
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no API key configured for the completion service")]
    MissingApiKey,

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, INVALID_REQUEST),
            ApiError::MissingApiKey => (StatusCode::INTERNAL_SERVER_ERROR, MISSING_OPENAI_KEY),
            ApiError::Generation(e) if e.is_missing_credential() => {
                (StatusCode::INTERNAL_SERVER_ERROR, MISSING_OPENAI_KEY)
            }
            ApiError::Generation(_) | ApiError::Store(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, LLM_SERVER_ERROR)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Details stay in the server log; clients only see the code
        if status.is_client_error() {
            tracing::warn!(error = %self, code, "rejected request");
        } else {
            tracing::error!(error = %self, code, "request failed");
        }

        (status, Json(ApiResponse::<()>::failure(code))).into_response()
    }
}
