//! Error Memory
//!
//! A bounded, session-scoped log of failed actions. Rendered into the next
//! prompt so the model can steer away from repeating them; it never blocks
//! an action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Longest failure reason kept, in characters
pub const MAX_REASON_CHARS: usize = 200;

/// Which recoverable failure produced a record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ToolNotFound,
    ToolExecutionFailure,
    MalformedModelOutput,
}

/// One failed attempt
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub attempted_action: String,
    pub failure_reason: String,
    /// Session-wide loop iteration (1-based) that produced the failure
    pub turn_index: usize,
    pub recorded_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(
        kind: ErrorKind,
        attempted_action: impl Into<String>,
        failure_reason: &str,
        turn_index: usize,
    ) -> Self {
        Self {
            kind,
            attempted_action: attempted_action.into(),
            failure_reason: sanitize_reason(failure_reason),
            turn_index,
            recorded_at: Utc::now(),
        }
    }
}

/// Collapse line breaks and cap length so one record stays one prompt line.
pub fn sanitize_reason(reason: &str) -> String {
    let single_line = reason.split_whitespace().collect::<Vec<_>>().join(" ");
    single_line.chars().take(MAX_REASON_CHARS).collect()
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorMemory {
    records: VecDeque<ErrorRecord>,
    capacity: usize,
}

impl ErrorMemory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, evicting the oldest record when full.
    pub fn record(&mut self, record: ErrorRecord) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Records, most recent last.
    pub fn recent(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.records.iter()
    }

    /// Render the `{recent_errors}` placeholder.
    pub fn render(&self) -> String {
        if self.records.is_empty() {
            return "None".into();
        }
        self.records
            .iter()
            .map(|r| format!("- {} -> {}", r.attempted_action, r.failure_reason))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ErrorMemory {
    fn default() -> Self {
        Self::new(3)
    }
}
