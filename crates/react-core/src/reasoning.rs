//! Reasoning Loop
//!
//! Implements the ReAct (Reason + Act) pattern as an explicit state machine:
//!
//! ```text
//! Start -> Prompting -> AwaitingModel -> Parsing -> Dispatching -> Observing -+
//!              ^                            |                                 |
//!              |                            +-- Malformed ------> Observing --+
//!              +-----------------------------------------------------------+
//! Terminated(FinalAnswer | BudgetExceeded | ModelUnavailable | Cancelled)
//! ```
//!
//! Tool failures and malformed model output are recoverable: they become an
//! observation plus an error-memory record and the loop continues. A failed
//! model call ends the instruction but leaves the session usable. The
//! iteration cap is checked before every model call, so the loop always
//! terminates.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::{AgentError, ModelError, Result};
use crate::memory::{ErrorKind, ErrorRecord};
use crate::parser::{self, Action};
use crate::prompt::{PromptContext, PromptTemplate};
use crate::provider::{GenerationOptions, LlmProvider};
use crate::scratchpad::{Scratchpad, Step};
use crate::session::{LoopLimits, Session};
use crate::tool::{Tool, ToolRegistry};

/// Rendered prompts longer than this are logged as nearing the context limit
const PROMPT_WARN_CHARS: usize = 7500;

const PLACEHOLDER_OBSERVATION: &str = "Error: Final Answer seems to contain placeholders (e.g., '[details]'). \
     Provide specific values from the observations, or state plainly that the information was not found.";

/// Phrases that make a bracketed span in an answer acceptable
const NOT_FOUND_PHRASES: &[&str] = &["not found", "not contain", "unable to find", "does not state"];

const MALFORMED_OBSERVATION: &str = "Error: Your output contained neither a `Final Answer:` nor a valid \
     `Action:` line with a tool name from the tool list. One of them is required.";

/// Agent configuration
#[derive(Clone, Debug, Default)]
pub struct AgentConfig {
    /// Model name and sampling options
    pub generation: GenerationOptions,

    /// Limits copied into every new session
    pub limits: LoopLimits,

    pub template: PromptTemplate,
}

/// Cooperative cancellation, checked between iterations
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// How one instruction ended. Exactly one per call to [`Agent::run`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    FinalAnswer { answer: String, trace: Vec<Step> },
    BudgetExceeded { message: String, trace: Vec<Step> },
    ModelUnavailable { error: ModelError, trace: Vec<Step> },
    Cancelled { trace: Vec<Step> },
}

impl Outcome {
    pub fn answer(&self) -> Option<&str> {
        match self {
            Outcome::FinalAnswer { answer, .. } => Some(answer),
            _ => None,
        }
    }

    pub fn trace(&self) -> &[Step] {
        match self {
            Outcome::FinalAnswer { trace, .. }
            | Outcome::BudgetExceeded { trace, .. }
            | Outcome::ModelUnavailable { trace, .. }
            | Outcome::Cancelled { trace } => trace,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::FinalAnswer { .. } => "final_answer",
            Outcome::BudgetExceeded { .. } => "budget_exceeded",
            Outcome::ModelUnavailable { .. } => "model_unavailable",
            Outcome::Cancelled { .. } => "cancelled",
        }
    }

    /// Text to show the user
    pub fn message(&self) -> String {
        match self {
            Outcome::FinalAnswer { answer, .. } => answer.clone(),
            Outcome::BudgetExceeded { message, .. } => message.clone(),
            Outcome::ModelUnavailable { error, .. } => format!(
                "Agent Error: the language model is unavailable ({}). Please try again.",
                error.kind
            ),
            Outcome::Cancelled { .. } => "The request was cancelled.".into(),
        }
    }
}

enum LoopState {
    Prompting,
    AwaitingModel(String),
    Parsing(String),
    Dispatching {
        thought: String,
        name: String,
        input: String,
    },
    Observing {
        thought: String,
        action: Action,
        observation: String,
        failure: Option<ErrorKind>,
    },
    Terminated(Outcome),
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, config: AgentConfig) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// A fresh session using this agent's limits
    pub fn new_session(&self) -> Session {
        Session::new(self.config.limits.clone())
    }

    /// Run one instruction to a terminal outcome
    pub async fn run(&self, session: &mut Session, instruction: &str) -> Outcome {
        self.run_with_cancel(session, instruction, &CancelToken::new()).await
    }

    /// Run with a simple string input (creates temporary session)
    pub async fn ask(&self, question: &str) -> Outcome {
        let mut session = self.new_session();
        self.run(&mut session, question).await
    }

    /// Run one instruction, checking `cancel` between iterations.
    ///
    /// Session history changes only on a final answer. Error memory keeps the
    /// failures recorded along the way unless the instruction is cancelled,
    /// in which case it is restored to its state before the call.
    pub async fn run_with_cancel(
        &self,
        session: &mut Session,
        instruction: &str,
        cancel: &CancelToken,
    ) -> Outcome {
        let limits = session.limits.clone();
        let started = Instant::now();
        let tool_descriptions = self.tools.describe();
        let history = session.conversation.render_recent(limits.history_window);

        let errors_before = session.errors.clone();
        let iterations_before = session.iterations;

        let mut scratchpad = Scratchpad::new();
        let mut iteration = 0usize;
        let mut state = LoopState::Prompting;

        tracing::debug!(session = %session.id, instruction = %truncate(instruction, 80), "Starting reasoning loop");

        loop {
            state = match state {
                LoopState::Prompting => {
                    if cancel.is_cancelled() {
                        tracing::info!(session = %session.id, iteration, "Instruction cancelled");
                        session.errors = errors_before.clone();
                        session.iterations = iterations_before;
                        LoopState::Terminated(Outcome::Cancelled { trace: std::mem::take(&mut scratchpad).into_steps() })
                    } else if iteration >= limits.max_iterations {
                        tracing::warn!(
                            session = %session.id,
                            max_iterations = limits.max_iterations,
                            "Max iterations reached"
                        );
                        LoopState::Terminated(Outcome::BudgetExceeded {
                            message: format!(
                                "Agent Error: Max iterations ({}) reached. Unable to complete the request. \
                                 Please review the reasoning trace, or try rephrasing the question or \
                                 breaking it into smaller parts.",
                                limits.max_iterations
                            ),
                            trace: std::mem::take(&mut scratchpad).into_steps(),
                        })
                    } else if let Some(budget) = limits.max_duration.filter(|b| started.elapsed() >= *b) {
                        tracing::warn!(session = %session.id, ?budget, iteration, "Time budget exhausted");
                        LoopState::Terminated(Outcome::BudgetExceeded {
                            message: format!(
                                "Agent Error: Time budget of {} ms exhausted after {} iteration(s) \
                                 without a final answer.",
                                budget.as_millis(),
                                iteration
                            ),
                            trace: std::mem::take(&mut scratchpad).into_steps(),
                        })
                    } else {
                        let scratch = scratchpad.render(limits.scratchpad_window);
                        let errors = session.errors.render();
                        let prompt = self.config.template.render(&PromptContext {
                            instruction,
                            conversation_history: &history,
                            scratchpad: &scratch,
                            recent_errors: &errors,
                            tool_names_and_descriptions: &tool_descriptions,
                        });
                        if prompt.len() > PROMPT_WARN_CHARS {
                            tracing::warn!(
                                chars = prompt.len(),
                                iteration,
                                "Prompt is approaching the context limit"
                            );
                        }
                        tracing::debug!(
                            iteration = iteration + 1,
                            max = limits.max_iterations,
                            "ReAct iteration"
                        );
                        LoopState::AwaitingModel(prompt)
                    }
                }

                LoopState::AwaitingModel(prompt) => {
                    let call = self.provider.complete(&prompt, &self.config.generation);
                    let result = match tokio::time::timeout(limits.model_timeout, call).await {
                        Ok(result) => result,
                        Err(_) => Err(ModelError::timed_out(format!(
                            "no response within {} ms",
                            limits.model_timeout.as_millis()
                        ))),
                    };
                    match result {
                        Ok(completion) => LoopState::Parsing(completion.content),
                        Err(error) => {
                            tracing::error!(session = %session.id, %error, "Model call failed");
                            LoopState::Terminated(Outcome::ModelUnavailable {
                                error,
                                trace: std::mem::take(&mut scratchpad).into_steps(),
                            })
                        }
                    }
                }

                LoopState::Parsing(raw) => {
                    let step = parser::parse_step(&raw);
                    match step.action {
                        Action::FinalAnswer { text } if has_unfilled_placeholder(&text) => {
                            tracing::debug!(answer = %truncate(&text, 120), "Final answer rejected: placeholders");
                            LoopState::Observing {
                                thought: step.thought,
                                action: Action::FinalAnswer { text },
                                observation: PLACEHOLDER_OBSERVATION.into(),
                                failure: Some(ErrorKind::MalformedModelOutput),
                            }
                        }
                        Action::FinalAnswer { text } => {
                            tracing::info!(session = %session.id, answer = %truncate(&text, 120), "Final answer");
                            session.conversation.push_exchange(instruction, text.clone());
                            session.touch();
                            LoopState::Terminated(Outcome::FinalAnswer {
                                answer: text,
                                trace: std::mem::take(&mut scratchpad).into_steps(),
                            })
                        }
                        Action::ToolInvocation { name, input } => LoopState::Dispatching {
                            thought: step.thought,
                            name,
                            input,
                        },
                        Action::Malformed { .. } => {
                            tracing::debug!(raw = %truncate(&raw, 200), "Malformed model output");
                            LoopState::Observing {
                                thought: step.thought,
                                action: step.action,
                                observation: MALFORMED_OBSERVATION.into(),
                                failure: Some(ErrorKind::MalformedModelOutput),
                            }
                        }
                    }
                }

                LoopState::Dispatching { thought, name, input } => {
                    let failure_kind = match self.tools.lookup(&name) {
                        Ok(_) => ErrorKind::ToolExecutionFailure,
                        Err(_) => ErrorKind::ToolNotFound,
                    };
                    let result = self.tools.dispatch(&name, &input, limits.tool_timeout).await;
                    let failure = (!result.is_success()).then_some(failure_kind);
                    if failure.is_some() {
                        tracing::warn!(tool = %name, reason = %truncate(result.text(), 200), "Tool failed");
                    }
                    LoopState::Observing {
                        thought,
                        action: Action::ToolInvocation { name, input },
                        observation: result.into_observation(),
                        failure,
                    }
                }

                LoopState::Observing { thought, action, observation, failure } => {
                    iteration += 1;
                    session.iterations += 1;
                    if let Some(kind) = failure {
                        session.errors.record(ErrorRecord::new(
                            kind,
                            action.to_string(),
                            &observation,
                            session.iterations,
                        ));
                    }
                    scratchpad.push(Step { iteration, thought, action, observation });
                    LoopState::Prompting
                }

                LoopState::Terminated(outcome) => return outcome,
            };
        }
    }

    /// Get the tool registry
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Get the model collaborator
    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Get configuration
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// A `[...]` or `<...>` span left in an answer, unless the answer says the
/// information could not be found.
fn has_unfilled_placeholder(answer: &str) -> bool {
    let bytes = answer.as_bytes();
    let bracketed = bytes.iter().enumerate().any(|(i, &b)| {
        (b == b'[' || b == b'<')
            && bytes[i + 1..]
                .iter()
                .position(|&c| c == b']' || c == b'>')
                .is_some_and(|len| len > 0)
    });
    if !bracketed {
        return false;
    }
    let lower = answer.to_lowercase();
    !NOT_FOUND_PHRASES.iter().any(|p| lower.contains(p))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Builder for Agent configuration
#[derive(Default)]
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Vec<Arc<dyn Tool>>,
    registry: Option<ToolRegistry>,
    template: Option<String>,
    config: AgentConfig,
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn tool<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn shared_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    /// Start from an existing registry; tools added with [`Self::tool`] join it.
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.registry = Some(tools);
        self
    }

    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    pub fn max_iterations(mut self, max: usize) -> Self {
        self.config.limits.max_iterations = max;
        self
    }

    pub fn limits(mut self, limits: LoopLimits) -> Self {
        self.config.limits = limits;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        if self.config.limits.max_iterations == 0 {
            return Err(AgentError::Config("max_iterations must be at least 1".into()));
        }

        let mut config = self.config;
        if let Some(template) = self.template {
            config.template = PromptTemplate::new(template)?;
        }

        let mut registry = self.registry.unwrap_or_default();
        for tool in self.tools {
            registry.register_arc(tool)?;
        }

        Ok(Agent::new(provider, Arc::new(registry), config))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::error::ModelErrorKind;
    use crate::test_helpers::{
        CancellingTool, EchoTool, FailingTool, ScriptedProvider, SlowTool, StaticTool,
    };

    fn agent(provider: Arc<ScriptedProvider>, tools: Vec<Arc<dyn Tool>>, limits: LoopLimits) -> Agent {
        tools
            .into_iter()
            .fold(AgentBuilder::new().provider(provider).limits(limits), |b, t| b.shared_tool(t))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_calculator_scenario() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok("Thought: I need to add.\nAction: Calculator\nAction Input: 12+30"),
            Ok("Thought: The tool said 42.\nFinal Answer: 42"),
        ]));
        let agent = agent(
            provider.clone(),
            vec![Arc::new(StaticTool::new("Calculator", "42"))],
            LoopLimits::default(),
        );
        let mut session = agent.new_session();

        let outcome = agent.run(&mut session, "What is 12 plus 30?").await;

        assert_eq!(outcome.answer(), Some("42"));
        assert_eq!(outcome.trace().len(), 1);
        assert_eq!(outcome.trace()[0].observation, "42");
        assert_eq!(session.conversation.len(), 2);
        assert_eq!(session.conversation.turns()[0].content, "What is 12 plus 30?");
        assert!(provider.prompts()[1].contains("Observation: 42"));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_recorded_and_loop_continues() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok("Action: Unknown\nAction Input: x"),
            Ok("Final Answer: could not look that up"),
        ]));
        let agent = agent(provider.clone(), vec![Arc::new(EchoTool::new("Echo"))], LoopLimits::default());
        let mut session = agent.new_session();

        let outcome = agent.run(&mut session, "look up x").await;

        assert_eq!(outcome.answer(), Some("could not look that up"));
        let records: Vec<_> = session.errors.recent().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ErrorKind::ToolNotFound);
        assert_eq!(records[0].turn_index, 1);
        assert!(outcome.trace()[0].observation.contains("Unknown tool 'Unknown'"));
        assert!(provider.prompts()[1].contains("Unknown[x]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_timeout_is_model_unavailable() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("Final Answer: too late")]).with_delay(Duration::from_secs(300)));
        let limits = LoopLimits { model_timeout: Duration::from_secs(5), ..LoopLimits::default() };
        let agent = agent(provider, vec![], limits);
        let mut session = agent.new_session();

        let outcome = agent.run(&mut session, "hello").await;

        match outcome {
            Outcome::ModelUnavailable { error, trace } => {
                assert_eq!(error.kind, ModelErrorKind::TimedOut);
                assert!(trace.is_empty());
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(session.conversation.is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_leaves_session_usable() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Err(ModelError::connection_failed("refused")),
            Ok("Final Answer: back online"),
        ]));
        let agent = agent(provider, vec![], LoopLimits::default());
        let mut session = agent.new_session();

        let first = agent.run(&mut session, "one").await;
        assert_eq!(first.kind(), "model_unavailable");
        assert!(session.conversation.is_empty());

        let second = agent.run(&mut session, "two").await;
        assert_eq!(second.answer(), Some("back online"));
        assert_eq!(session.conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_budget_exceeded_after_exactly_cap_iterations() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("Action: Echo\nAction Input: again")]));
        let limits = LoopLimits { max_iterations: 4, ..LoopLimits::default() };
        let agent = agent(provider.clone(), vec![Arc::new(EchoTool::new("Echo"))], limits);
        let mut session = agent.new_session();

        let outcome = agent.run(&mut session, "loop forever").await;

        assert_eq!(outcome.kind(), "budget_exceeded");
        assert_eq!(provider.calls(), 4);
        assert_eq!(outcome.trace().len(), 4);
        assert!(outcome.message().contains("Max iterations (4)"));
        assert!(session.conversation.is_empty());
        // repeated identical actions are not blocked
        assert!(outcome.trace().iter().all(|s| s.observation == "again"));
    }

    #[tokio::test]
    async fn test_consecutive_tool_failures_are_recoverable() {
        let mut script = vec![Ok("Action: Broken\nAction Input: x"); 4];
        script.push(Ok("Final Answer: gave up on the tool"));
        let provider = Arc::new(ScriptedProvider::new(script));
        let limits = LoopLimits { max_iterations: 10, error_memory_capacity: 10, ..LoopLimits::default() };
        let agent = agent(provider, vec![Arc::new(FailingTool::new("Broken", "disk on fire"))], limits);
        let mut session = agent.new_session();

        let outcome = agent.run(&mut session, "use the broken tool").await;

        assert_eq!(outcome.answer(), Some("gave up on the tool"));
        assert_eq!(session.errors.len(), 4);
        assert!(session.errors.recent().all(|r| r.kind == ErrorKind::ToolExecutionFailure));
        let turns: Vec<_> = session.errors.recent().map(|r| r.turn_index).collect();
        assert_eq!(turns, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_error_memory_stays_capped() {
        let mut script = vec![Ok("Action: Broken\nAction Input: x"); 6];
        script.push(Ok("Final Answer: done"));
        let provider = Arc::new(ScriptedProvider::new(script));
        let agent = agent(
            provider,
            vec![Arc::new(FailingTool::new("Broken", "nope"))],
            LoopLimits::default(),
        );
        let mut session = agent.new_session();

        agent.run(&mut session, "go").await;

        assert_eq!(session.errors.len(), 3);
        let turns: Vec<_> = session.errors.recent().map(|r| r.turn_index).collect();
        assert_eq!(turns, vec![4, 5, 6]);
    }

    #[tokio::test]
    async fn test_malformed_output_is_recoverable() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok("I am not sure what to do."),
            Ok("Final Answer: fine"),
        ]));
        let agent = agent(provider.clone(), vec![], LoopLimits::default());
        let mut session = agent.new_session();

        let outcome = agent.run(&mut session, "something").await;

        assert_eq!(outcome.answer(), Some("fine"));
        let record = session.errors.recent().next().unwrap();
        assert_eq!(record.kind, ErrorKind::MalformedModelOutput);
        assert!(provider.prompts()[1].contains("neither a `Final Answer:`"));
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("Final Answer: unused")]));
        let agent = agent(provider.clone(), vec![], LoopLimits::default());
        let mut session = agent.new_session();
        let cancel = CancelToken::new();
        cancel.cancel();

        let outcome = agent.run_with_cancel(&mut session, "hi", &cancel).await;

        assert_eq!(outcome, Outcome::Cancelled { trace: vec![] });
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_between_iterations_keeps_history() {
        let cancel = CancelToken::new();
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok("Action: Stop\nAction Input: now"),
            Ok("Final Answer: should not be reached"),
        ]));
        let agent = agent(
            provider.clone(),
            vec![Arc::new(CancellingTool::new("Stop", cancel.clone()))],
            LoopLimits::default(),
        );
        let mut session = agent.new_session();
        session.conversation.push_exchange("earlier", "answer");

        let outcome = agent.run_with_cancel(&mut session, "hi", &cancel).await;

        assert_eq!(outcome.kind(), "cancelled");
        assert_eq!(outcome.trace().len(), 1);
        assert_eq!(provider.calls(), 1);
        assert_eq!(session.conversation.len(), 2);
    }

    #[tokio::test]
    async fn test_cancel_discards_errors_from_the_cancelled_instruction() {
        let cancel = CancelToken::new();
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok("Action: Missing\nAction Input: x"),
            Ok("Final Answer: done"),
            Ok("Action: Stop\nAction Input: now"),
        ]));
        let agent = agent(
            provider,
            vec![Arc::new(CancellingTool::failing("Stop", cancel.clone(), "backend went away"))],
            LoopLimits::default(),
        );
        let mut session = agent.new_session();
        agent.run(&mut session, "first").await;
        let before: Vec<_> = session.errors.recent().cloned().collect();
        assert_eq!(before.len(), 1);

        let outcome = agent.run_with_cancel(&mut session, "second", &cancel).await;

        assert_eq!(outcome.kind(), "cancelled");
        assert_eq!(outcome.trace()[0].observation, "backend went away");
        let after: Vec<_> = session.errors.recent().cloned().collect();
        assert_eq!(after, before);
        assert_eq!(session.iterations, 1);
    }

    #[tokio::test]
    async fn test_turn_index_spans_instructions() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok("Action: Missing\nAction Input: a"),
            Ok("Final Answer: first done"),
            Ok("Action: Missing\nAction Input: b"),
            Ok("Final Answer: second done"),
        ]));
        let agent = agent(provider, vec![], LoopLimits::default());
        let mut session = agent.new_session();

        agent.run(&mut session, "one").await;
        agent.run(&mut session, "two").await;

        let turns: Vec<_> = session.errors.recent().map(|r| r.turn_index).collect();
        assert_eq!(turns, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_placeholder_final_answer_is_rejected() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok("Final Answer: Your balance is [amount]."),
            Ok("Final Answer: Your balance is 42."),
        ]));
        let agent = agent(provider.clone(), vec![], LoopLimits::default());
        let mut session = agent.new_session();

        let outcome = agent.run(&mut session, "What is my balance?").await;

        assert_eq!(outcome.answer(), Some("Your balance is 42."));
        assert_eq!(outcome.trace().len(), 1);
        let records: Vec<_> = session.errors.recent().collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ErrorKind::MalformedModelOutput);
        assert!(provider.prompts()[1].contains("seems to contain placeholders"));
        assert_eq!(session.conversation.turns()[1].content, "Your balance is 42.");
    }

    #[tokio::test]
    async fn test_bracketed_answer_that_reports_not_found_is_accepted() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(
            "Final Answer: The value [X] was not found in the report.",
        )]));
        let agent = agent(provider, vec![], LoopLimits::default());
        let mut session = agent.new_session();

        let outcome = agent.run(&mut session, "find X").await;

        assert_eq!(outcome.answer(), Some("The value [X] was not found in the report."));
        assert!(session.errors.is_empty());
    }

    #[test]
    fn test_placeholder_detection() {
        assert!(has_unfilled_placeholder("Revenue was [number] dollars"));
        assert!(has_unfilled_placeholder("Contact <name> today"));
        assert!(!has_unfilled_placeholder("Revenue was 1200 dollars"));
        assert!(!has_unfilled_placeholder("An empty pair [] is fine"));
        assert!(!has_unfilled_placeholder("The document does not state the [owner]."));
        assert!(!has_unfilled_placeholder("Unable to find <anything> matching"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_budget() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("Action: Slow\nAction Input: x")]));
        let limits = LoopLimits {
            max_duration: Some(Duration::from_secs(3)),
            tool_timeout: Duration::from_secs(10),
            ..LoopLimits::default()
        };
        let agent = agent(
            provider.clone(),
            vec![Arc::new(SlowTool::new("Slow", Duration::from_secs(5)))],
            limits,
        );

        let outcome = agent.ask("take your time").await;

        assert_eq!(outcome.kind(), "budget_exceeded");
        assert!(outcome.message().contains("Time budget"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_replay_is_deterministic() {
        let script = || {
            vec![
                Ok("Action: Echo\nAction Input: a"),
                Ok("Action: Missing[b]"),
                Ok("Final Answer: a"),
            ]
        };

        let mut outcomes = Vec::new();
        for _ in 0..2 {
            let provider = Arc::new(ScriptedProvider::new(script()));
            let agent = agent(provider, vec![Arc::new(EchoTool::new("Echo"))], LoopLimits::default());
            let mut session = agent.new_session();
            outcomes.push(agent.run(&mut session, "repeat").await);
        }

        assert_eq!(outcomes[0], outcomes[1]);
        let actions: Vec<_> = outcomes[0].trace().iter().map(|s| s.action.to_string()).collect();
        assert_eq!(actions, vec!["Echo[a]", "Missing[b]"]);
    }

    #[tokio::test]
    async fn test_history_window_reaches_prompt() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok("Final Answer: yes")]));
        let limits = LoopLimits { history_window: 1, ..LoopLimits::default() };
        let agent = agent(provider.clone(), vec![], limits);
        let mut session = agent.new_session();
        session.conversation.push_exchange("old question", "old answer");
        session.conversation.push_exchange("recent question", "recent answer");

        agent.run(&mut session, "and now?").await;

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("User: recent question"));
        assert!(!prompt.contains("old question"));
    }

    #[test]
    fn test_builder_validation() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));

        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let dup = AgentBuilder::new()
            .provider(provider.clone())
            .tool(EchoTool::new("Echo"))
            .tool(EchoTool::new("Echo"))
            .build();
        assert!(matches!(dup, Err(AgentError::DuplicateTool(_))));

        let bad_template = AgentBuilder::new().provider(provider.clone()).template("nothing").build();
        assert!(matches!(bad_template, Err(AgentError::Config(_))));

        let zero = AgentBuilder::new().provider(provider).max_iterations(0).build();
        assert!(matches!(zero, Err(AgentError::Config(_))));
    }
}
