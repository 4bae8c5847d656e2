//! SQL front-end error types

use thiserror::Error;

/// Errors raised while parsing and lowering query text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SqlError {
    /// Parse error from sqlparser, or a statement count other than one
    #[error("Parse error: {0}")]
    Parse(String),

    /// Syntax that parses but has no planner-facing counterpart.
    /// Carries the name of the offending node kind.
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl SqlError {
    pub fn unsupported(kind: impl Into<String>) -> Self {
        SqlError::Unsupported(kind.into())
    }
}

impl From<sqlparser::parser::ParserError> for SqlError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        SqlError::Parse(err.to_string())
    }
}

/// Result type for SQL operations
pub type SqlResult<T> = Result<T, SqlError>;
