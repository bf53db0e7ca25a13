//! Application State

use std::sync::Arc;

use react_core::{Agent, MemorySessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Reasoning agent: provider, tool registry and loop configuration
    pub agent: Arc<Agent>,

    /// Conversation sessions, one lock per session
    pub sessions: Arc<MemorySessionStore>,
}

impl AppState {
    pub fn new(agent: Agent) -> Self {
        Self {
            agent: Arc::new(agent),
            sessions: Arc::new(MemorySessionStore::new()),
        }
    }
}
