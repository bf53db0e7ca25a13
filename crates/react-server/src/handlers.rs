//! HTTP Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use react_core::{AgentError, ErrorRecord, Session, SessionId, SessionStore, Step, Turn};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub model: String,
    pub model_backend_connected: bool,
    pub tools: Vec<String>,
}

#[derive(Serialize)]
pub struct ModelsResponse {
    pub models: Vec<react_core::ModelInfo>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: SessionId,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    pub message: String,
    pub trace: Vec<Step>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    pub turns: Vec<Turn>,
    pub recent_errors: Vec<ErrorRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            turns: session.conversation.turns().to_vec(),
            recent_errors: session.errors.recent().cloned().collect(),
            created_at: session.created_at,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>, code: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            code: code.into(),
        }),
    )
}

fn agent_error(e: &AgentError) -> ApiError {
    let (status, code) = match e {
        AgentError::ToolNotFound(_) => (StatusCode::NOT_FOUND, "TOOL_NOT_FOUND"),
        AgentError::Session(_) => (StatusCode::NOT_FOUND, "SESSION_ERROR"),
        AgentError::Model(_) => (StatusCode::BAD_GATEWAY, "MODEL_UNAVAILABLE"),
        AgentError::Config(_) | AgentError::DuplicateTool(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR")
        }
        AgentError::Io(_) | AgentError::Json(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };
    api_error(status, e.user_message(), code)
}

fn session_not_found(id: &str) -> ApiError {
    agent_error(&AgentError::Session(format!("no session with id '{id}'")))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let connected = state.agent.provider().health_check().await.unwrap_or(false);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        model: state.agent.config().generation.model.clone(),
        model_backend_connected: connected,
        tools: state.agent.tools().names().into_iter().map(str::to_string).collect(),
    })
}

/// Models reported by the backend
pub async fn list_models(State(state): State<AppState>) -> Result<Json<ModelsResponse>, ApiError> {
    let models = state.agent.provider().list_models().await.map_err(|e| {
        tracing::error!("Model listing failed: {}", e);
        agent_error(&e)
    })?;
    Ok(Json(ModelsResponse { models }))
}

/// Run one instruction through the reasoning loop
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = payload.message.trim();
    if message.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Message must not be empty", "EMPTY_MESSAGE"));
    }

    let existing = match &payload.session_id {
        Some(id) => state.sessions.get(&SessionId::from_string(id.as_str())).await,
        None => None,
    };
    let session = match existing {
        Some(session) => session,
        None => {
            let limits = state.agent.config().limits.clone();
            let fresh = match payload.session_id {
                Some(id) => Session::with_id(SessionId::from_string(id), limits),
                None => Session::new(limits),
            };
            tracing::info!(session = %fresh.id, "Created session");
            state.sessions.insert(fresh).await
        }
    };

    // Requests on the same session run one at a time
    let mut session = session.lock().await;
    let outcome = state.agent.run(&mut session, message).await;

    if let react_core::Outcome::ModelUnavailable { error, .. } = &outcome {
        tracing::error!(session = %session.id, "Model unavailable: {}", error);
    }

    Ok(Json(ChatResponse {
        session_id: session.id.clone(),
        outcome: outcome.kind(),
        answer: outcome.answer().map(str::to_string),
        message: outcome.message(),
        trace: outcome.trace().to_vec(),
    }))
}

/// Conversation history and recent errors of one session
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let session = state
        .sessions
        .get(&SessionId::from_string(id.as_str()))
        .await
        .ok_or_else(|| session_not_found(&id))?;

    let session = session.lock().await;
    Ok(Json(SessionResponse::from(&*session)))
}

/// Forget the conversation and the error memory, keep the session
pub async fn clear_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let session = state
        .sessions
        .get(&SessionId::from_string(id.as_str()))
        .await
        .ok_or_else(|| session_not_found(&id))?;

    session.lock().await.clear_history();
    tracing::info!(session = %id, "Cleared session history");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(&SessionId::from_string(id.as_str())).await {
        tracing::info!(session = %id, "Deleted session");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(&id))
    }
}
