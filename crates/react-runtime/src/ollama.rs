//! Ollama LLM Provider
//!
//! Implementation of `LlmProvider` for local Ollama inference. Completions go
//! through the raw `/api/generate` endpoint so the reasoning prompt is sent
//! verbatim with its stop sequences, and transport failures can be told
//! apart; health and model listing use the `ollama-rs` client.

use std::time::Duration;

use async_trait::async_trait;
use ollama_rs::Ollama;
use react_core::{
    error::{AgentError, ModelError, Result},
    provider::{Completion, GenerationOptions, LlmProvider, ModelInfo, TokenUsage},
};
use serde::{Deserialize, Serialize};

/// Ollama provider configuration
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST")
            .unwrap_or_else(|_| "http://localhost".into());
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(11434);
        let timeout_secs = std::env::var("OLLAMA_TIMEOUT_SECS")
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(120);

        Self {
            host,
            port,
            timeout_secs,
        }
    }

    /// Base URL, e.g. `http://localhost:11434`
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.host.trim_end_matches('/'), self.port)
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    temperature: f32,
    num_predict: u32,
    stop: &'a [String],
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama LLM provider
pub struct OllamaProvider {
    client: Ollama,
    http: reqwest::Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create from configuration
    pub fn from_config(config: OllamaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client: Ollama::new(config.host.as_str(), config.port),
            http,
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OllamaConfig::from_env())
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn classify(&self, err: &reqwest::Error, model: &str) -> ModelError {
        if err.is_timeout() {
            ModelError::timed_out(format!(
                "Ollama request ({model}) timed out after {} seconds",
                self.config.timeout_secs
            ))
        } else if err.is_decode() {
            ModelError::malformed_response(format!("Error decoding JSON from Ollama ({model}): {err}"))
        } else {
            ModelError::connection_failed(format!("Error connecting to Ollama ({model}): {err}"))
        }
    }
}

/// Pull the generated text out of a raw `/api/generate` body.
fn parse_generate_body(body: &str, model: &str) -> std::result::Result<Completion, ModelError> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| {
        ModelError::malformed_response(format!("Error decoding JSON from Ollama ({model}): {e}"))
    })?;

    let content = parsed
        .response
        .ok_or_else(|| ModelError::malformed_response("Ollama reply has no `response` field"))?;

    let usage = match (parsed.prompt_eval_count, parsed.eval_count) {
        (None, None) => None,
        (prompt, completion) => {
            let prompt_tokens = prompt.unwrap_or(0);
            let completion_tokens = completion.unwrap_or(0);
            Some(TokenUsage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens + completion_tokens,
            })
        }
    };

    Ok(Completion {
        content: content.trim().to_string(),
        model: model.to_string(),
        usage,
    })
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> std::result::Result<Completion, ModelError> {
        let request = GenerateRequest {
            model: &options.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: options.temperature,
                num_predict: options.max_tokens,
                stop: &options.stop_sequences,
            },
        };

        let url = format!("{}/api/generate", self.config.base_url());
        tracing::trace!(%url, model = %options.model, chars = prompt.len(), "Sending prompt to Ollama");

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.classify(&e, &options.model))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::connection_failed(format!(
                "Ollama ({}) returned {}: {}",
                options.model,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| self.classify(&e, &options.model))?;

        parse_generate_body(&body, &options.model)
    }

    async fn health_check(&self) -> Result<bool> {
        match self.client.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let models = self
            .client
            .list_local_models()
            .await
            .map_err(|e| ModelError::connection_failed(e.to_string()))?;

        Ok(models
            .into_iter()
            .map(|m| ModelInfo {
                id: m.name.clone(),
                name: m.name,
            })
            .collect())
    }
}
