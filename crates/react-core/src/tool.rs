//! Tool System
//!
//! Tools are registered once at startup and looked up by the reasoning loop.
//! A tool takes plain text in and returns a [`ToolResult`]; it never returns
//! an error across the loop boundary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AgentError, Result};

/// Result from tool execution
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "text", rename_all = "snake_case")]
pub enum ToolResult {
    Success(String),
    Failure(String),
}

impl ToolResult {
    pub fn success(output: impl Into<String>) -> Self {
        ToolResult::Success(output.into())
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        ToolResult::Failure(reason.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ToolResult::Success(_))
    }

    /// The text the loop reasons over.
    pub fn text(&self) -> &str {
        match self {
            ToolResult::Success(text) | ToolResult::Failure(text) => text,
        }
    }

    /// Render as an observation line body.
    pub fn into_observation(self) -> String {
        match self {
            ToolResult::Success(text) => text,
            ToolResult::Failure(reason) if reason.starts_with("Error:") => reason,
            ToolResult::Failure(reason) => format!("Error: {}", reason),
        }
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool identifier, as the model must write it after `Action:`
    fn name(&self) -> &str;

    /// Human-readable description (shown to the model)
    fn description(&self) -> &str;

    /// Run the tool. Internal errors must come back as `ToolResult::Failure`.
    async fn invoke(&self, input: &str) -> ToolResult;
}

/// Registry for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        self.order.push(name.clone());
        self.tools.insert(name, tool);
        Ok(())
    }

    /// Get a tool by name
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Tool>> {
        self.tools
            .get(name)
            .cloned()
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))
    }

    /// Look up and invoke a tool, bounded by `timeout`.
    ///
    /// Unknown names and timeouts come back as `Failure` so the loop can tell
    /// the model instead of aborting.
    pub async fn dispatch(&self, name: &str, input: &str, timeout: Duration) -> ToolResult {
        let tool = match self.lookup(name) {
            Ok(tool) => tool,
            Err(_) => {
                return ToolResult::failure(format!(
                    "Error: Unknown tool '{}'. Valid tools are: {}.",
                    name,
                    self.names().join(", ")
                ));
            }
        };

        tracing::debug!(tool = %name, input = %truncate(input, 100), "Executing tool");

        match tokio::time::timeout(timeout, tool.invoke(input)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(tool = %name, ?timeout, "Tool timed out");
                ToolResult::failure(format!(
                    "Error: Tool '{}' did not finish within {} ms.",
                    name,
                    timeout.as_millis()
                ))
            }
        }
    }

    /// Tool names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render the `{tool_names_and_descriptions}` placeholder
    pub fn describe(&self) -> String {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| format!("- {}: {}", tool.name(), tool.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
