//! react-server
//!
//! Axum server exposing the reasoning agent over a small REST API, with
//! in-memory sessions so follow-up questions see earlier answers.

mod config;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use react_core::{AgentBuilder, GenerationOptions, LlmProvider, LoopLimits};
use react_runtime::OllamaProvider;
use react_tools::{CalculatorTool, DocumentQaTool, FileReaderTool};

use crate::config::ServerConfig;
use crate::handlers::{
    chat_handler, clear_history, delete_session, get_session, health_check, list_models,
};
use crate::state::AppState;

pub(crate) fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/models", get(list_models))

        // Agent API
        .route("/api/chat", post(chat_handler))
        .route("/api/sessions/{id}", get(get_session).delete(delete_session))
        .route("/api/sessions/{id}/history", delete(clear_history))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment first so RUST_LOG may come from .env
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    // Initialize LLM provider
    let provider: Arc<dyn LlmProvider> = Arc::new(OllamaProvider::from_config(config.ollama.clone())?);

    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to Ollama at {}", config.ollama.base_url());
            if let Ok(models) = provider.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model.id);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Ollama not available - chat requests will report model_unavailable");
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    let generation = GenerationOptions {
        model: config.model.clone(),
        ..Default::default()
    };
    let mut limits = LoopLimits::default();
    if let Some(max) = config.max_iterations {
        limits.max_iterations = max;
    }

    let mut builder = AgentBuilder::new()
        .provider(provider.clone())
        .model(config.model.clone())
        .limits(limits)
        .tool(CalculatorTool::new())
        .tool(FileReaderTool::new(&config.data_dir));

    if let Some(path) = &config.document_path {
        match DocumentQaTool::load(path, provider.clone(), generation).await {
            Ok(tool) => {
                tracing::info!("✓ Loaded {} for DocumentQA ({} chunks)", path.display(), tool.chunks().len());
                builder = builder.tool(tool);
            }
            Err(e) => tracing::warn!("⚠ DocumentQA disabled: could not load {}: {}", path.display(), e),
        }
    }

    let agent = builder.build()?;

    tracing::info!("Registered {} tools:", agent.tools().len());
    for name in agent.tools().names() {
        tracing::info!("  • {}", name);
    }

    let app = build_router(AppState::new(agent));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("react-server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health                     - Health check");
    tracing::info!("  GET    /api/models                 - List available models");
    tracing::info!("  POST   /api/chat                   - Send message");
    tracing::info!("  GET    /api/sessions/{{id}}          - Session history");
    tracing::info!("  DELETE /api/sessions/{{id}}/history  - Clear history");
    tracing::info!("  DELETE /api/sessions/{{id}}          - Delete session");

    axum::serve(listener, app).await?;

    Ok(())
}
