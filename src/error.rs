// Engine error type
//
// Every failure surfaces as a `JzError` carrying the best-effort source
// position the failing stage knew about. The finalizer variant keeps the
// intermediate JSONish text for diagnostics instead of a position.

use thiserror::Error;

/// Errors raised by the JZ engine.
#[derive(Error, Debug)]
pub enum JzError {
    #[error("unterminated block comment (line {line}, column {column})")]
    UnterminatedBlockComment { line: usize, column: usize },

    #[error("unterminated string literal (line {line}, column {column})")]
    UnterminatedString { line: usize, column: usize },

    #[error("unterminated $(...) placeholder (line {line}, column {column})")]
    UnterminatedPlaceholder { line: usize, column: usize },

    #[error("unterminated template string (line {line}, column {column})")]
    UnterminatedTemplate { line: usize, column: usize },

    #[error("unexpected character '{ch}' in expression (line {line}, column {column})")]
    UnexpectedChar { ch: char, line: usize, column: usize },

    #[error("unexpected token, expected {expected} (line {line}, column {column})")]
    UnexpectedToken {
        expected: String,
        line: usize,
        column: usize,
    },

    #[error("invalid path: {message} (line {line}, column {column})")]
    InvalidPath {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("unknown tool '{name}' (line {line}, column {column})")]
    UnknownTool {
        name: String,
        line: usize,
        column: usize,
    },

    #[error("tool '{name}' failed: {message} (line {line}, column {column})")]
    Tool {
        name: String,
        message: String,
        line: usize,
        column: usize,
    },

    #[error("recursion limit of {limit} exceeded while expanding nested templates")]
    RecursionLimit { limit: usize },

    #[error("invalid JSON after transform: {message}")]
    InvalidJsonAfterTransform {
        message: String,
        intermediate: String,
    },
}

impl JzError {
    /// 1-based source line of the failure, when one was tracked.
    pub fn line(&self) -> Option<usize> {
        match self {
            JzError::UnterminatedBlockComment { line, .. }
            | JzError::UnterminatedString { line, .. }
            | JzError::UnterminatedPlaceholder { line, .. }
            | JzError::UnterminatedTemplate { line, .. }
            | JzError::UnexpectedChar { line, .. }
            | JzError::UnexpectedToken { line, .. }
            | JzError::InvalidPath { line, .. }
            | JzError::UnknownTool { line, .. }
            | JzError::Tool { line, .. } => Some(*line),
            JzError::RecursionLimit { .. } | JzError::InvalidJsonAfterTransform { .. } => None,
        }
    }

    /// 1-based source column of the failure, when one was tracked.
    pub fn column(&self) -> Option<usize> {
        match self {
            JzError::UnterminatedBlockComment { column, .. }
            | JzError::UnterminatedString { column, .. }
            | JzError::UnterminatedPlaceholder { column, .. }
            | JzError::UnterminatedTemplate { column, .. }
            | JzError::UnexpectedChar { column, .. }
            | JzError::UnexpectedToken { column, .. }
            | JzError::InvalidPath { column, .. }
            | JzError::UnknownTool { column, .. }
            | JzError::Tool { column, .. } => Some(*column),
            JzError::RecursionLimit { .. } | JzError::InvalidJsonAfterTransform { .. } => None,
        }
    }

    /// The rewritten JSONish text the finalizer failed to parse.
    pub fn intermediate_json(&self) -> Option<&str> {
        match self {
            JzError::InvalidJsonAfterTransform { intermediate, .. } => Some(intermediate),
            _ => None,
        }
    }
}
