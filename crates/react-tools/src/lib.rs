//! # react-tools
//!
//! Built-in tools for the reasoning loop. Each implements `react_core::Tool`
//! and reports every internal error as a `ToolResult::Failure`.
//!
//! | Tool         | Input                               |
//! |--------------|-------------------------------------|
//! | `Calculator` | `2 + 2 * 4` or `[10000, 12000]`     |
//! | `FileReader` | `report.csv`, `notes.txt`           |
//! | `DocumentQA` | a question about the loaded document |

mod calculator;
mod document_qa;
mod error;
mod file_reader;

pub use calculator::CalculatorTool;
pub use document_qa::DocumentQaTool;
pub use error::{Result, ToolError};
pub use file_reader::FileReaderTool;

/// Print integral values without a fractional part.
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
