//! # react-runtime
//!
//! Model providers for the reasoning loop.
//!
//! ## Providers
//!
//! - **Ollama** (default): local inference via the `/api/generate` endpoint
//!
//! ## Usage
//!
//! ```rust,ignore
//! use react_runtime::OllamaProvider;
//!
//! let provider = OllamaProvider::from_env()?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .build()?;
//! ```

#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaProvider};

// Re-export core types for convenience
pub use react_core::{
    Agent, AgentBuilder, AgentError, GenerationOptions, LlmProvider, ModelError, Result, Session,
    Tool, ToolRegistry,
};
