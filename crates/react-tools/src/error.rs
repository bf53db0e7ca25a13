//! Error Types for the built-in tools

use react_core::{ModelError, ToolResult};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ToolError>;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("No {0} provided.")]
    EmptyInput(&'static str),

    #[error("Division by zero.")]
    DivisionByZero,

    #[error("Invalid characters/structure. Use numbers, operators (+,-,*,/,^), parentheses, or a list like '[1,2,3]'.")]
    InvalidCharacters,

    #[error("Invalid syntax in '{0}'.")]
    InvalidSyntax(String),

    #[error("Expression is too long (limit {0} characters).")]
    TooLong(usize),

    #[error("Invalid list format or non-numerical content in list.")]
    InvalidList,

    #[error("Result of '{0}' is not a finite number.")]
    NotFinite(String),

    #[error("FileReader only reads .csv or .txt files, got '{0}'.")]
    UnsupportedFile(String),

    #[error("Path '{0}' is outside the data directory.")]
    PathEscape(String),

    #[error("File '{0}' not found or is not a file.")]
    FileNotFound(String),

    #[error("Could not parse '{file}' as CSV: {reason}")]
    Csv { file: String, reason: String },

    #[error("Document '{0}' is empty.")]
    EmptyDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Model(#[from] ModelError),
}

impl From<ToolError> for ToolResult {
    fn from(err: ToolError) -> Self {
        ToolResult::failure(err.to_string())
    }
}
