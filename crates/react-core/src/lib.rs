//! # react-core
//!
//! Reasoning-loop controller for a Thought / Action / Observation agent.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                              Agent                               │
//! │  ┌─────────────┐  ┌──────────────┐  ┌─────────────┐  ┌─────────┐ │
//! │  │  Reasoning  │──│ Action       │  │   Tool      │  │  Error  │ │
//! │  │    Loop     │  │ Parser       │  │   Registry  │  │  Memory │ │
//! │  └─────────────┘  └──────────────┘  └─────────────┘  └─────────┘ │
//! │         │                                                        │
//! │  ┌─────────────────────┐                                         │
//! │  │ LlmProvider         │  (model collaborator, Strategy)         │
//! │  └─────────────────────┘                                         │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The loop only ever sees text: the model's raw output is parsed into an
//! [`Action`], tools return a [`ToolResult`], and both are rendered back
//! into the next prompt.

pub mod error;
pub mod memory;
pub mod message;
pub mod parser;
pub mod prompt;
pub mod provider;
pub mod reasoning;
pub mod scratchpad;
pub mod session;
pub mod tool;

#[cfg(test)]
mod test_helpers;

pub use error::{AgentError, ModelError, ModelErrorKind, Result};
pub use memory::{ErrorKind, ErrorMemory, ErrorRecord};
pub use message::{Conversation, Role, Turn};
pub use parser::{parse_action, parse_step, Action, ParsedStep};
pub use prompt::PromptTemplate;
pub use provider::{Completion, GenerationOptions, LlmProvider, ModelInfo};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, CancelToken, Outcome};
pub use scratchpad::{Scratchpad, Step};
pub use session::{LoopLimits, MemorySessionStore, Session, SessionId, SessionStore, SharedSession};
pub use tool::{Tool, ToolRegistry, ToolResult};
