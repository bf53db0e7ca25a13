//! Server configuration from the environment

use std::path::PathBuf;

use react_runtime::OllamaConfig;

/// Everything the bootstrap reads from env vars (and `.env`)
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub model: String,
    pub max_iterations: Option<usize>,
    /// Text document for the DocumentQA tool; the tool is skipped when unset
    pub document_path: Option<PathBuf>,
    /// Root directory for the FileReader tool
    pub data_dir: PathBuf,
    pub ollama: OllamaConfig,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let max_iterations = get("REACT_MAX_ITERATIONS").and_then(|v| match v.parse() {
            Ok(n) => Some(n),
            Err(_) => {
                tracing::warn!("Ignoring invalid REACT_MAX_ITERATIONS={}", v);
                None
            }
        });

        Self {
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            model: get("REACT_MODEL").unwrap_or_else(|| "mistral".into()),
            max_iterations,
            document_path: get("REACT_DOCUMENT_PATH").filter(|p| !p.is_empty()).map(PathBuf::from),
            data_dir: get("REACT_DATA_DIR").map_or_else(|| PathBuf::from("."), PathBuf::from),
            ollama: OllamaConfig::from_env(),
        }
    }
}
