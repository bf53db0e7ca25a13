//! Per-instruction reasoning record.

use serde::{Deserialize, Serialize};

use crate::parser::Action;

/// One Thought / Action / Observation cycle
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based loop iteration
    pub iteration: usize,
    pub thought: String,
    pub action: Action,
    pub observation: String,
}

impl Step {
    fn render(&self) -> String {
        let mut out = String::new();
        if !self.thought.is_empty() {
            out.push_str(&format!("Thought: {}\n", self.thought));
        }
        match &self.action {
            Action::ToolInvocation { name, input } => {
                out.push_str(&format!("Action: {}\nAction Input: {}\n", name, input));
            }
            Action::FinalAnswer { text } => {
                out.push_str(&format!("Final Answer: {}\n", text));
            }
            Action::Malformed { .. } => {
                out.push_str("Action: (none - output could not be parsed)\n");
            }
        }
        out.push_str(&format!("Observation: {}", self.observation));
        out
    }
}

/// Ordered steps for the instruction in flight. Never persisted.
#[derive(Clone, Debug, Default)]
pub struct Scratchpad {
    steps: Vec<Step>,
}

impl Scratchpad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step) {
        debug_assert!(self.steps.last().is_none_or(|last| last.iteration < step.iteration));
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Render the last `max_steps` steps for the `{scratchpad}` placeholder.
    pub fn render(&self, max_steps: usize) -> String {
        let start = self.steps.len().saturating_sub(max_steps);
        self.steps[start..]
            .iter()
            .map(Step::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(iteration: usize, observation: &str) -> Step {
        Step {
            iteration,
            thought: format!("thinking {iteration}"),
            action: Action::ToolInvocation { name: "Calculator".into(), input: "1+1".into() },
            observation: observation.into(),
        }
    }

    #[test]
    fn test_render_step() {
        let mut pad = Scratchpad::new();
        pad.push(step(1, "Result: 2"));
        assert_eq!(
            pad.render(5),
            "Thought: thinking 1\nAction: Calculator\nAction Input: 1+1\nObservation: Result: 2"
        );
    }

    #[test]
    fn test_render_keeps_most_recent() {
        let mut pad = Scratchpad::new();
        for i in 1..=4 {
            pad.push(step(i, &format!("obs {i}")));
        }
        let rendered = pad.render(2);
        assert!(!rendered.contains("obs 2"));
        assert!(rendered.contains("obs 3"));
        assert!(rendered.ends_with("obs 4"));
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(Scratchpad::new().render(5), "");
    }
}
