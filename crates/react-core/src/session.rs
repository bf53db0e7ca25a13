//! Session Management
//!
//! A session owns the conversation history, the error memory and the loop
//! limits for one continuous interaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::memory::ErrorMemory;
use crate::message::Conversation;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Budgets and windows applied to every instruction in a session
#[derive(Clone, Debug)]
pub struct LoopLimits {
    /// Model calls allowed per instruction
    pub max_iterations: usize,

    /// Error memory capacity
    pub error_memory_capacity: usize,

    /// User/agent pairs of history shown to the model
    pub history_window: usize,

    /// Scratchpad steps shown to the model
    pub scratchpad_window: usize,

    /// Timeout for one model call
    pub model_timeout: Duration,

    /// Timeout for one tool invocation
    pub tool_timeout: Duration,

    /// Optional wall-clock budget for a whole instruction
    pub max_duration: Option<Duration>,
}

impl Default for LoopLimits {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            error_memory_capacity: 3,
            history_window: 3,
            scratchpad_window: 10,
            model_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(30),
            max_duration: None,
        }
    }
}

/// A complete agent session
#[derive(Clone, Debug)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Condensed instruction/answer history
    pub conversation: Conversation,

    /// Failures carried across instructions
    pub errors: ErrorMemory,

    pub limits: LoopLimits,

    /// Loop iterations run over the session's lifetime; error records are
    /// stamped with it so they order across instructions
    pub iterations: usize,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session
    pub fn new(limits: LoopLimits) -> Self {
        Self::with_id(SessionId::new(), limits)
    }

    /// Create with specific ID
    pub fn with_id(id: SessionId, limits: LoopLimits) -> Self {
        let now = Utc::now();
        Self {
            id,
            conversation: Conversation::new(),
            errors: ErrorMemory::new(limits.error_memory_capacity),
            limits,
            iterations: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Forget history and recorded errors; limits are kept.
    pub fn clear_history(&mut self) {
        self.conversation.clear();
        self.errors.clear();
        self.touch();
    }

    /// Turn count
    pub fn turn_count(&self) -> usize {
        self.conversation.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(LoopLimits::default())
    }
}

/// A session guarded for exclusive use by one instruction at a time
pub type SharedSession = Arc<Mutex<Session>>;

/// Session store trait
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Get a session handle
    async fn get(&self, id: &SessionId) -> Option<SharedSession>;

    /// Insert a session, replacing any with the same id
    async fn insert(&self, session: Session) -> SharedSession;

    /// Delete a session; returns whether it existed
    async fn remove(&self, id: &SessionId) -> bool;
}

/// In-memory session store
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, id: &SessionId) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    async fn insert(&self, session: Session) -> SharedSession {
        let id = session.id.clone();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, shared.clone());
        shared
    }

    async fn remove(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{ErrorKind, ErrorRecord};

    #[test]
    fn test_session_creation() {
        let session = Session::default();
        assert_eq!(session.turn_count(), 0);
        assert_eq!(session.errors.capacity(), 3);
        assert_eq!(session.limits.max_iterations, 15);
    }

    #[test]
    fn test_clear_history_resets_errors() {
        let mut session = Session::default();
        session.conversation.push_exchange("q", "a");
        session.errors.record(ErrorRecord::new(ErrorKind::ToolNotFound, "X[]", "nope", 1));

        session.clear_history();
        assert!(session.conversation.is_empty());
        assert!(session.errors.is_empty());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySessionStore::new();
        let session = Session::default();
        let id = session.id.clone();

        store.insert(session).await;
        let loaded = store.get(&id).await.expect("session stored");
        assert_eq!(loaded.lock().await.id, id);

        assert!(store.remove(&id).await);
        assert!(store.get(&id).await.is_none());
        assert!(!store.remove(&id).await);
    }
}
