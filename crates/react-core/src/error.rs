//! Error Types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
///
/// These never cross the reasoning-loop boundary: tool and parse failures are
/// folded into the scratchpad, model failures become an [`crate::Outcome`].
/// What remains is construction and session plumbing.
#[derive(Error, Debug)]
pub enum AgentError {
    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A tool with the same name is already registered
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// Session error
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model collaborator failure surfaced outside the loop (health, model listing)
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AgentError {
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AgentError::ToolNotFound(name) => format!("The tool '{}' is not available.", name),
            AgentError::DuplicateTool(name) => format!("The tool '{}' is registered twice.", name),
            AgentError::Session(msg) => format!("Session problem: {}", msg),
            AgentError::Config(msg) => format!("The agent is misconfigured: {}", msg),
            AgentError::Model(_) => "The AI service is currently unavailable. Please try again.".into(),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

/// Classification of a failed model call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelErrorKind {
    TimedOut,
    ConnectionFailed,
    MalformedResponse,
}

impl std::fmt::Display for ModelErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelErrorKind::TimedOut => write!(f, "timed out"),
            ModelErrorKind::ConnectionFailed => write!(f, "connection failed"),
            ModelErrorKind::MalformedResponse => write!(f, "malformed response"),
        }
    }
}

/// Error returned by an [`crate::LlmProvider`].
#[derive(Error, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[error("Model {kind}: {message}")]
pub struct ModelError {
    pub kind: ModelErrorKind,
    pub message: String,
}

impl ModelError {
    pub fn new(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn timed_out(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::TimedOut, message)
    }

    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::ConnectionFailed, message)
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::new(ModelErrorKind::MalformedResponse, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_display() {
        let err = ModelError::timed_out("no reply after 120s");
        assert_eq!(err.to_string(), "Model timed out: no reply after 120s");
        assert_eq!(err.kind, ModelErrorKind::TimedOut);
    }

    #[test]
    fn test_user_message_hides_model_details() {
        let err = AgentError::from(ModelError::connection_failed("refused on 127.0.0.1:11434"));
        assert!(!err.user_message().contains("127.0.0.1"));
    }
}
