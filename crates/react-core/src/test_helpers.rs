//! Shared test doubles for the model and tool collaborators.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ModelError;
use crate::provider::{Completion, GenerationOptions, LlmProvider};
use crate::reasoning::CancelToken;
use crate::tool::{Tool, ToolResult};

/// A provider that replays a script of responses.
///
/// Each call returns the next entry; once the script runs out the last entry
/// repeats. Every prompt it receives is kept for inspection.
pub struct ScriptedProvider {
    script: Vec<Result<String, ModelError>>,
    prompts: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<&str, ModelError>>) -> Self {
        Self {
            script: script.into_iter().map(|r| r.map(str::to_string)).collect(),
            prompts: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Sleep this long before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Completion, ModelError> {
        let index = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let entry = self
            .script
            .get(index)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or_else(|| Err(ModelError::malformed_response("script is empty")));
        entry.map(|text| Completion::new(text, options.model.clone()))
    }
}

/// Returns its input unchanged.
pub struct EchoTool {
    name: String,
}

impl EchoTool {
    pub fn new(name: &str) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Repeats its input back."
    }

    async fn invoke(&self, input: &str) -> ToolResult {
        ToolResult::success(input)
    }
}

/// Always returns the same observation.
pub struct StaticTool {
    name: String,
    output: String,
}

impl StaticTool {
    pub fn new(name: &str, output: &str) -> Self {
        Self { name: name.into(), output: output.into() }
    }
}

#[async_trait]
impl Tool for StaticTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Returns a fixed value."
    }

    async fn invoke(&self, _input: &str) -> ToolResult {
        ToolResult::success(self.output.clone())
    }
}

/// Always fails with the same reason.
pub struct FailingTool {
    name: String,
    reason: String,
}

impl FailingTool {
    pub fn new(name: &str, reason: &str) -> Self {
        Self { name: name.into(), reason: reason.into() }
    }
}

#[async_trait]
impl Tool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Always fails."
    }

    async fn invoke(&self, _input: &str) -> ToolResult {
        ToolResult::failure(self.reason.clone())
    }
}

/// Sleeps before succeeding.
pub struct SlowTool {
    name: String,
    delay: Duration,
}

impl SlowTool {
    pub fn new(name: &str, delay: Duration) -> Self {
        Self { name: name.into(), delay }
    }
}

#[async_trait]
impl Tool for SlowTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Takes a while."
    }

    async fn invoke(&self, _input: &str) -> ToolResult {
        tokio::time::sleep(self.delay).await;
        ToolResult::success("finally")
    }
}

/// Cancels the given token when invoked, as a caller would mid-instruction.
pub struct CancellingTool {
    name: String,
    token: CancelToken,
    failure: Option<String>,
}

impl CancellingTool {
    pub fn new(name: &str, token: CancelToken) -> Self {
        Self { name: name.into(), token, failure: None }
    }

    /// Cancels and then reports `reason` as a failure
    pub fn failing(name: &str, token: CancelToken, reason: &str) -> Self {
        Self { failure: Some(reason.into()), ..Self::new(name, token) }
    }
}

#[async_trait]
impl Tool for CancellingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Requests cancellation."
    }

    async fn invoke(&self, _input: &str) -> ToolResult {
        self.token.cancel();
        match &self.failure {
            Some(reason) => ToolResult::failure(reason.clone()),
            None => ToolResult::success("cancellation requested"),
        }
    }
}
