//! File Reader Tool
//!
//! Reads `.csv` and `.txt` files from a fixed data directory. CSV files are
//! summarized (columns, a short preview and any numeric `Revenue` column) so
//! the model can hand the numbers to the calculator.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use react_core::{Tool, ToolResult};

use crate::error::{Result, ToolError};
use crate::format_number;

const TXT_SNIPPET_CHARS: usize = 500;
const CSV_PREVIEW_ROWS: usize = 3;

/// Tool for reading data files under a root directory
#[derive(Clone, Debug)]
pub struct FileReaderTool {
    root: PathBuf,
}

impl FileReaderTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a user-supplied name to a file inside the root.
    async fn resolve(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ToolError::PathEscape(name.to_string()));
        }

        let candidate = self.root.join(relative);
        let resolved = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| ToolError::FileNotFound(name.to_string()))?;
        let root = tokio::fs::canonicalize(&self.root).await?;

        // Symlinks can still point outside the root
        if !resolved.starts_with(&root) {
            return Err(ToolError::PathEscape(name.to_string()));
        }
        if !tokio::fs::metadata(&resolved).await?.is_file() {
            return Err(ToolError::FileNotFound(name.to_string()));
        }
        Ok(resolved)
    }

    pub async fn read(&self, input: &str) -> Result<String> {
        let name = input.trim().replace(['\'', '"', '`'], "");
        if name.is_empty() {
            return Err(ToolError::EmptyInput("filename"));
        }

        let lower = name.to_ascii_lowercase();
        let is_csv = lower.ends_with(".csv");
        if !is_csv && !lower.ends_with(".txt") {
            return Err(ToolError::UnsupportedFile(name));
        }

        let path = self.resolve(&name).await?;
        let content = tokio::fs::read_to_string(&path).await?;
        tracing::debug!(file = %path.display(), bytes = content.len(), "FileReader loaded file");

        if is_csv {
            summarize_csv(&name, &content)
        } else {
            let snippet: String = content.chars().take(TXT_SNIPPET_CHARS).collect();
            let ellipsis = if content.chars().nth(TXT_SNIPPET_CHARS).is_some() { "..." } else { "" };
            Ok(format!("Successfully read snippet from '{name}' (TXT):\n{snippet}{ellipsis}"))
        }
    }
}

#[async_trait]
impl Tool for FileReaderTool {
    fn name(&self) -> &str {
        "FileReader"
    }

    fn description(&self) -> &str {
        "Reads 'report.csv' for sales data analysis or simple .txt files. \
         Input: filename (e.g., 'report.csv'). For policy questions, use DocumentQA."
    }

    async fn invoke(&self, input: &str) -> ToolResult {
        match self.read(input).await {
            Ok(text) => ToolResult::success(text),
            Err(e) => {
                tracing::warn!(input, error = %e, "FileReader failed");
                e.into()
            }
        }
    }
}

/// Split one CSV record, honoring double-quoted fields.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn summarize_csv(name: &str, content: &str) -> Result<String> {
    let mut lines = content.lines().filter(|l| !l.trim().is_empty());
    let Some(header) = lines.next() else {
        return Ok(format!("File '{name}' (CSV) is empty."));
    };
    let columns = split_record(header);
    let rows: Vec<Vec<String>> = lines.map(split_record).collect();

    if rows.is_empty() {
        return Ok(format!("File '{name}' (CSV) is empty."));
    }
    if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
        return Err(ToolError::Csv {
            file: name.to_string(),
            reason: format!("row {} has {} fields, expected {}", i + 1, row.len(), columns.len()),
        });
    }

    let preview = std::iter::once(columns.join("  "))
        .chain(rows.iter().take(CSV_PREVIEW_ROWS).map(|r| r.join("  ")))
        .collect::<Vec<_>>()
        .join("\n");
    let columns_info = columns.join(", ");

    let revenue = columns
        .iter()
        .position(|c| c == "Revenue")
        .and_then(|idx| {
            rows.iter()
                .map(|r| r[idx].as_str())
                .filter(|cell| !cell.is_empty())
                .map(|cell| cell.parse::<f64>().ok())
                .collect::<Option<Vec<f64>>>()
        });

    Ok(match revenue {
        Some(values) => {
            let listed = values.iter().map(|v| format_number(*v)).collect::<Vec<_>>().join(", ");
            format!(
                "Successfully read '{name}' (CSV). Columns: {columns_info}. \
                 Extracted 'Revenue' values: [{listed}]. \
                 Use Calculator with these values if calculation is needed. Data preview:\n{preview}"
            )
        }
        None => format!(
            "Successfully read '{name}' (CSV). Columns: {columns_info}. Data preview:\n{preview}"
        ),
    })
}
