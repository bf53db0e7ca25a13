//! Calculator Tool
//!
//! Evaluates arithmetic over `+ - * / ^` and parentheses, or sums a list of
//! numbers written as `[a, b, c]`.

use async_trait::async_trait;
use react_core::{Tool, ToolResult};

use crate::error::{Result, ToolError};
use crate::format_number;

/// Longest expression evaluated; bounds the evaluator's recursion depth
pub const MAX_EXPRESSION_CHARS: usize = 500;

/// Calculator tool - evaluates mathematical expressions and list sums
#[derive(Clone, Copy, Debug, Default)]
pub struct CalculatorTool;

impl CalculatorTool {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate the raw tool input.
    pub fn calculate(input: &str) -> Result<f64> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ToolError::EmptyInput("expression"));
        }

        if input.starts_with('[') && input.ends_with(']') {
            return sum_list(&input[1..input.len() - 1]);
        }

        if input.len() > MAX_EXPRESSION_CHARS {
            return Err(ToolError::TooLong(MAX_EXPRESSION_CHARS));
        }

        let allowed = |c: char| c.is_ascii_digit() || "+-*/^(). \t".contains(c);
        if !input.chars().all(allowed) || !input.chars().any(|c| c.is_ascii_digit()) {
            return Err(ToolError::InvalidCharacters);
        }
        check_structure(input)?;

        let value = evaluate_expression(input).map_err(|e| match e {
            ToolError::InvalidSyntax(_) => ToolError::InvalidSyntax(input.to_string()),
            other => other,
        })?;

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ToolError::NotFinite(input.to_string()))
        }
    }
}

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "Calculator"
    }

    fn description(&self) -> &str {
        "Evaluates mathematical expressions (e.g., '2+2*4') or sums lists of numbers \
         provided as a string (e.g., '[10000, 12000]')."
    }

    async fn invoke(&self, input: &str) -> ToolResult {
        match Self::calculate(input) {
            Ok(value) => ToolResult::success(format!("Result: {}", format_number(value))),
            Err(e) => {
                tracing::debug!(input, error = %e, "Calculator rejected input");
                e.into()
            }
        }
    }
}

fn sum_list(body: &str) -> Result<f64> {
    if body.trim().is_empty() {
        return Ok(0.0);
    }
    body.split(',')
        .map(|item| item.trim().parse::<f64>().map_err(|_| ToolError::InvalidList))
        .sum()
}

/// Reject unbalanced parentheses and implicit multiplication like `2(3)`.
fn check_structure(expr: &str) -> Result<()> {
    let compact: Vec<u8> = expr.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    let mut depth = 0i32;
    for (i, &b) in compact.iter().enumerate() {
        match b {
            b'(' => {
                depth += 1;
                if i > 0 && (compact[i - 1].is_ascii_digit() || compact[i - 1] == b')') {
                    return Err(ToolError::InvalidSyntax(expr.to_string()));
                }
            }
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return Err(ToolError::InvalidSyntax(expr.to_string()));
                }
                if compact.get(i + 1).is_some_and(|n| n.is_ascii_digit() || *n == b'.') {
                    return Err(ToolError::InvalidSyntax(expr.to_string()));
                }
            }
            _ => {}
        }
    }
    if depth == 0 {
        Ok(())
    } else {
        Err(ToolError::InvalidSyntax(expr.to_string()))
    }
}

/// Recursive evaluator: innermost parentheses first, then the lowest
/// precedence operator furthest right, so `-` and `/` stay left-associative.
fn evaluate_expression(expr: &str) -> Result<f64> {
    let expr = expr.replace([' ', '\t'], "");
    let bytes = expr.as_bytes();

    if let Some(start) = expr.rfind('(') {
        if let Some(end) = expr[start..].find(')') {
            let inner = evaluate_expression(&expr[start + 1..start + end])?;
            let rewritten = format!("{}{}{}", &expr[..start], inner, &expr[start + end + 1..]);
            return evaluate_expression(&rewritten);
        }
    }

    // Addition/subtraction; a sign after another operator is unary
    for i in (1..bytes.len()).rev() {
        let c = bytes[i];
        if (c == b'+' || c == b'-') && (bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.') {
            let left = evaluate_expression(&expr[..i])?;
            let right = evaluate_expression(&expr[i + 1..])?;
            return Ok(if c == b'+' { left + right } else { left - right });
        }
    }

    for i in (0..bytes.len()).rev() {
        let c = bytes[i];
        if c == b'*' || c == b'/' {
            let left = evaluate_expression(&expr[..i])?;
            let right = evaluate_expression(&expr[i + 1..])?;
            if c == b'/' && right == 0.0 {
                return Err(ToolError::DivisionByZero);
            }
            return Ok(if c == b'*' { left * right } else { left / right });
        }
    }

    if let Some(i) = expr.find('^') {
        let left = evaluate_expression(&expr[..i])?;
        let right = evaluate_expression(&expr[i + 1..])?;
        return Ok(left.powf(right));
    }

    expr.parse::<f64>()
        .map_err(|_| ToolError::InvalidSyntax(expr.clone()))
}
