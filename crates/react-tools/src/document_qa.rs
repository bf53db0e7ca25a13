//! Document Q&A Tool
//!
//! Answers questions about one text document. The document is split into
//! overlapping chunks once at load time; each question ranks the chunks by
//! term overlap and the best few go to the model as context.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use react_core::{GenerationOptions, LlmProvider, Tool, ToolResult};

use crate::error::{Result, ToolError};

pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 200;
pub const TOP_K: usize = 3;

const NO_ANSWER: &str = "Could not find a specific answer in the document for this query.";

const STOPWORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "her", "was", "one",
    "our", "out", "has", "have", "how", "what", "when", "where", "which", "who", "why", "does",
    "with", "this", "that", "from", "they", "will", "would", "there", "their", "about", "into",
];

/// Retrieval-backed question answering over a single document
pub struct DocumentQaTool {
    source: String,
    description: String,
    chunks: Vec<String>,
    provider: Arc<dyn LlmProvider>,
    options: GenerationOptions,
}

impl DocumentQaTool {
    /// Build from already-loaded text.
    pub fn from_text(
        source: impl Into<String>,
        text: &str,
        provider: Arc<dyn LlmProvider>,
        options: GenerationOptions,
    ) -> Result<Self> {
        let source = source.into();
        if text.trim().is_empty() {
            return Err(ToolError::EmptyDocument(source));
        }
        let chunks = chunk_text(text, CHUNK_SIZE, CHUNK_OVERLAP);
        tracing::info!(%source, chunks = chunks.len(), "Document split for Q&A");

        // Answers are free text; the loop's stop markers do not apply here
        let options = GenerationOptions { stop_sequences: Vec::new(), ..options };

        Ok(Self {
            description: format!(
                "Answers questions specifically about the '{source}' document. \
                 Input should be the user's question about the document."
            ),
            source,
            chunks,
            provider,
            options,
        })
    }

    /// Load a UTF-8 text document from disk.
    pub async fn load(
        path: impl AsRef<Path>,
        provider: Arc<dyn LlmProvider>,
        options: GenerationOptions,
    ) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await?;
        let source = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Self::from_text(source, &text, provider, options)
    }

    pub fn chunks(&self) -> &[String] {
        &self.chunks
    }

    /// The `k` chunks sharing the most distinct terms with the question,
    /// in document order on ties. Chunks with no shared terms are dropped.
    pub fn retrieve(&self, question: &str, k: usize) -> Vec<&str> {
        let wanted = terms(question);
        let mut scored: Vec<(usize, usize)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, wanted.intersection(&terms(chunk)).count()))
            .filter(|(_, score)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        scored
            .into_iter()
            .take(k)
            .map(|(i, _)| self.chunks[i].as_str())
            .collect()
    }

    pub async fn answer(&self, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ToolError::EmptyInput("question"));
        }

        let context = self.retrieve(question, TOP_K);
        if context.is_empty() {
            return Ok(format!("Answer from '{}': {NO_ANSWER}", self.source));
        }
        tracing::debug!(question, chunks = context.len(), "DocumentQA retrieved context");

        let prompt = format!(
            "Use the following pieces of context to answer the question at the end. \
             If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
             {}\n\nQuestion: {question}\nHelpful Answer:",
            context.join("\n\n")
        );
        let completion = self.provider.complete(&prompt, &self.options).await?;
        let answer = completion.content.trim();
        let answer = if answer.is_empty() { NO_ANSWER } else { answer };

        Ok(format!("Answer from '{}': {answer}", self.source))
    }
}

#[async_trait]
impl Tool for DocumentQaTool {
    fn name(&self) -> &str {
        "DocumentQA"
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, input: &str) -> ToolResult {
        match self.answer(input).await {
            Ok(text) => ToolResult::success(text),
            Err(e) => {
                tracing::warn!(error = %e, "DocumentQA failed");
                ToolResult::failure(format!("Error during DocumentQA execution: {e}"))
            }
        }
    }
}

/// Fixed-size character windows, each sharing `overlap` characters with the
/// previous one.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let end = (start + size).min(chars.len());
        chunks.push(chars[start..end].iter().collect());
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}
