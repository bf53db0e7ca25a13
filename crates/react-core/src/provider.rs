//! LLM Provider Strategy Pattern
//!
//! The model collaborator seen by the reasoning loop. A provider turns one
//! rendered prompt into raw completion text; everything else (history,
//! scratchpad, parsing) is the loop's business.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use react_core::provider::{GenerationOptions, LlmProvider};
//!
//! let provider = OllamaProvider::from_config(config);
//! let completion = provider.complete(&prompt, &GenerationOptions::default()).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "mistral", "llama3.2")
    pub model: String,

    /// Temperature for sampling. Kept low: the loop wants consistent markers.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate per step
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Stop sequences
    #[serde(default = "default_stop_sequences")]
    pub stop_sequences: Vec<String>,
}

fn default_temperature() -> f32 { 0.05 }
fn default_max_tokens() -> u32 { 400 }

/// Stop before the model starts writing its own observation or next thought.
fn default_stop_sequences() -> Vec<String> {
    vec!["Observation:".into(), "\nObservation:".into(), "\nThought:".into()]
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: "mistral".into(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            stop_sequences: default_stop_sequences(),
        }
    }
}

/// Response from an LLM completion
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Completion {
    /// The generated text
    pub content: String,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,
}

impl Completion {
    pub fn new(content: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: model.into(),
            usage: None,
        }
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Information about a model
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
}

/// Strategy trait for LLM providers
///
/// Implement this trait to add support for new LLM backends.
/// The agent works exclusively through this interface.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for a single prompt
    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<Completion, ModelError>;

    /// Check if the provider is available and configured correctly
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    /// List available models
    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_options_defaults() {
        let opts = GenerationOptions::default();
        assert_eq!(opts.model, "mistral");
        assert_eq!(opts.max_tokens, 400);
        assert!(opts.stop_sequences.iter().any(|s| s == "Observation:"));
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: GenerationOptions = serde_json::from_str(r#"{"model": "llama3.2"}"#).unwrap();
        assert_eq!(opts.model, "llama3.2");
        assert_eq!(opts.temperature, 0.05);
        assert_eq!(opts.stop_sequences.len(), 3);
    }
}
