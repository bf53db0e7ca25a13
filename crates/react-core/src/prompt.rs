//! Prompt Template
//!
//! The loop fills five placeholders: `{instruction}`,
//! `{conversation_history}`, `{scratchpad}`, `{recent_errors}` and
//! `{tool_names_and_descriptions}`. Substitution is a single pass over the
//! template, so placeholder-looking text inside user input is left alone.

use crate::error::{AgentError, Result};

pub const PLACEHOLDERS: &[&str] = &[
    "instruction",
    "conversation_history",
    "scratchpad",
    "recent_errors",
    "tool_names_and_descriptions",
];

const REQUIRED: &[&str] = &["instruction", "scratchpad"];

pub const DEFAULT_TEMPLATE: &str = r#"You are a precise, self-critical assistant working in Thought / Action / Observation steps. Answer the user's question accurately with as few steps as possible.

Rules:
1. Thought: analyse the question, the conversation history and any earlier observations. Decide on the single most direct next step.
2. Action: to use a tool, write exactly one action:
   Action: <tool name>
   Action Input: <input for the tool>
   The short form `Action: <tool name>[<input>]` is also accepted.
3. Observation: written by the system with the tool's output. Never write it yourself.
4. Final Answer: once the observations answer the question, write
   Final Answer: <concise answer based directly on the observations>
   If a tool reported that the information was not found, say so.

Available tools:
{tool_names_and_descriptions}

Conversation history:
{conversation_history}

Recent errors (do not repeat these; explain in your Thought how you avoid them):
{recent_errors}

Question: {instruction}

{scratchpad}
Thought:"#;

/// Values for one rendering
#[derive(Clone, Copy, Debug)]
pub struct PromptContext<'a> {
    pub instruction: &'a str,
    pub conversation_history: &'a str,
    pub scratchpad: &'a str,
    pub recent_errors: &'a str,
    pub tool_names_and_descriptions: &'a str,
}

impl PromptContext<'_> {
    fn value(&self, placeholder: &str) -> Option<&str> {
        match placeholder {
            "instruction" => Some(self.instruction),
            "conversation_history" => Some(self.conversation_history),
            "scratchpad" => Some(self.scratchpad),
            "recent_errors" => Some(self.recent_errors),
            "tool_names_and_descriptions" => Some(self.tool_names_and_descriptions),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Validate and wrap a custom template.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        for required in REQUIRED {
            if !template.contains(&format!("{{{}}}", required)) {
                return Err(AgentError::Config(format!(
                    "prompt template is missing the {{{}}} placeholder",
                    required
                )));
            }
        }
        Ok(Self { template })
    }

    pub fn as_str(&self) -> &str {
        &self.template
    }

    pub fn render(&self, ctx: &PromptContext<'_>) -> String {
        let mut out = String::with_capacity(self.template.len() + ctx.scratchpad.len() + 256);
        let mut rest = self.template.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let substituted = after.find('}').and_then(|close| {
                ctx.value(&after[..close]).map(|value| (value, close))
            });
            match substituted {
                Some((value, close)) => {
                    out.push_str(value);
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self { template: DEFAULT_TEMPLATE.into() }
    }
}
