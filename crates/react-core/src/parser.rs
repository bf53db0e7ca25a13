//! Action Parser
//!
//! Turns one block of model text into exactly one [`Action`]. Parsing is a
//! single tokenizing pass over fixed marker literals followed by a selection
//! step; it is pure and total.
//!
//! Policy encoded here:
//! - a `Final Answer:` marker beats any `Action:` marker in the same text,
//!   wherever they appear;
//! - markers only count at the start of a line;
//! - answer and input text stop at the next line opening with a control
//!   marker, so a fabricated `Observation:` (or `Thought:`) after the real
//!   answer is dropped.

use serde::{Deserialize, Serialize};

/// Structured decision extracted from model output
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    ToolInvocation { name: String, input: String },
    FinalAnswer { text: String },
    Malformed { raw_text: String },
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::ToolInvocation { name, input } => write!(f, "{}[{}]", name, input),
            Action::FinalAnswer { text } => write!(f, "Final Answer: {}", text),
            Action::Malformed { .. } => write!(f, "<malformed output>"),
        }
    }
}

/// Parser output: the decision plus the free-text reasoning before it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedStep {
    pub thought: String,
    pub action: Action,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Marker {
    Thought,
    Action,
    ActionInput,
    Observation,
    FinalAnswer,
}

// "action input" must be tried before "action".
const MARKERS: &[(&str, Marker)] = &[
    ("final answer", Marker::FinalAnswer),
    ("action input", Marker::ActionInput),
    ("action", Marker::Action),
    ("observation", Marker::Observation),
    ("thought", Marker::Thought),
];

/// Names models copy verbatim from the prompt's format instructions.
const PLACEHOLDER_NAMES: &[&str] = &["toolname", "tool", "tool_name", "input", "actiontool"];

#[derive(Clone, Copy, Debug)]
struct Token {
    marker: Marker,
    /// Byte offset of the marker word
    start: usize,
    /// Byte offset just past the colon
    body: usize,
}

/// Find every marker occurrence, in order. A marker only counts at the
/// start of a line (after optional indentation), so words like "action:"
/// inside a sentence stay part of the text.
fn tokenize(text: &str) -> Vec<Token> {
    let lower = text.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut tokens = Vec::new();
    let mut line_start = true;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\n' => {
                line_start = true;
                i += 1;
                continue;
            }
            b' ' | b'\t' | b'\r' => {
                i += 1;
                continue;
            }
            _ if !line_start => {
                i += 1;
                continue;
            }
            _ => {}
        }

        line_start = false;
        if let Some(token) = marker_at(bytes, i) {
            tokens.push(token);
            i = token.body;
        } else {
            i += 1;
        }
    }

    tokens
}

fn marker_at(bytes: &[u8], i: usize) -> Option<Token> {
    MARKERS.iter().find_map(|(word, marker)| {
        if !bytes[i..].starts_with(word.as_bytes()) {
            return None;
        }
        let mut j = i + word.len();
        while j < bytes.len() && (bytes[j] == b' ' || bytes[j] == b'\t') {
            j += 1;
        }
        (j < bytes.len() && bytes[j] == b':').then_some(Token { marker: *marker, start: i, body: j + 1 })
    })
}

/// Split `Name Action Input: value` written on one line.
fn split_inline_input(line: &str) -> (&str, Option<&str>) {
    const WORD: &str = "action input";
    let lower = line.to_ascii_lowercase();
    let mut from = 0;

    while let Some(pos) = lower[from..].find(WORD) {
        let at = from + pos;
        let after = &lower[at + WORD.len()..];
        let rest = after.trim_start_matches([' ', '\t']);
        let bounded = at == 0 || !lower.as_bytes()[at - 1].is_ascii_alphanumeric();
        if bounded && rest.starts_with(':') {
            let colon = lower.len() - rest.len();
            return (&line[..at], Some(&line[colon + 1..]));
        }
        from = at + 1;
    }
    (line, None)
}

/// Text of the segment opened by `tokens[idx]`, up to the next marker.
fn segment<'a>(text: &'a str, tokens: &[Token], idx: usize) -> &'a str {
    let end = tokens.get(idx + 1).map_or(text.len(), |next| next.start);
    &text[tokens[idx].body..end]
}

/// Reasoning text before the chosen marker, without its `Thought:` label.
fn thought_before(text: &str, tokens: &[Token], chosen: usize) -> String {
    let end = tokens[chosen].start;
    let start = tokens[..chosen]
        .iter()
        .rev()
        .find(|t| t.marker == Marker::Thought)
        .map_or(0, |t| t.body);
    let start = start.min(end);
    text[start..end].trim().to_string()
}

fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\'', '`'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].trim();
        }
    }
    value
}

fn is_valid_tool_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        && !PLACEHOLDER_NAMES.contains(&name.to_ascii_lowercase().as_str())
}

/// Parse the `Action:` segment at `idx` into a tool name and input.
fn parse_invocation(text: &str, tokens: &[Token], idx: usize) -> Option<(String, String)> {
    let body = segment(text, tokens, idx);
    let line = body.trim_start_matches([' ', '\t']).lines().next().unwrap_or("").trim();
    let (name_part, inline_input) = split_inline_input(line);

    // Bracket form: `Action: Name[input]`
    if let (Some(open), None) = (line.find('['), inline_input) {
        let name = strip_quotes(&line[..open]).trim_matches('*');
        let rest = &line[open + 1..];
        let input = match rest.rfind(']') {
            Some(close) => &rest[..close],
            None => rest,
        };
        return is_valid_tool_name(name).then(|| (name.to_string(), strip_quotes(input).to_string()));
    }

    // Marker form: `Action: Name` + `Action Input: input`
    let name = strip_quotes(name_part).trim_matches('*');
    if !is_valid_tool_name(name) {
        return None;
    }

    let input = inline_input.map(strip_quotes).unwrap_or_else(|| {
        tokens
            .get(idx + 1)
            .filter(|next| next.marker == Marker::ActionInput)
            .map_or("", |_| strip_quotes(segment(text, tokens, idx + 1)))
    });

    Some((name.to_string(), input.to_string()))
}

/// Extract one decision (plus its thought) from raw model text.
pub fn parse_step(text: &str) -> ParsedStep {
    let tokens = tokenize(text);
    let malformed = || ParsedStep {
        thought: String::new(),
        action: Action::Malformed { raw_text: text.to_string() },
    };

    if let Some(idx) = tokens.iter().position(|t| t.marker == Marker::FinalAnswer) {
        let answer = segment(text, &tokens, idx).trim();
        if answer.is_empty() {
            return malformed();
        }
        return ParsedStep {
            thought: thought_before(text, &tokens, idx),
            action: Action::FinalAnswer { text: answer.to_string() },
        };
    }

    if let Some(idx) = tokens.iter().position(|t| t.marker == Marker::Action) {
        return match parse_invocation(text, &tokens, idx) {
            Some((name, input)) => ParsedStep {
                thought: thought_before(text, &tokens, idx),
                action: Action::ToolInvocation { name, input },
            },
            None => malformed(),
        };
    }

    malformed()
}

/// Extract one [`Action`] from raw model text.
pub fn parse_action(text: &str) -> Action {
    parse_step(text).action
}
