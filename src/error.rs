//! Error types for recql.
//!
//! Only structural failures surface here: syntax errors and source loading
//! failures abort a query. Value-level problems (type mismatches, missing
//! columns, division by zero, unknown functions) evaluate to null instead.

use thiserror::Error;

use crate::source::SourceKind;

#[derive(Error, Debug)]
pub enum QueryError {
    /// Every diagnostic the parser collected, in source order
    #[error("syntax error: {}", .0.join("; "))]
    Syntax(Vec<String>),

    #[error("{kind} source not found: {name}")]
    SourceNotFound { kind: SourceKind, name: String },

    #[error("failed to load {kind} source '{name}': {message}")]
    Load {
        kind: SourceKind,
        name: String,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("operation not supported: {0}")]
    Unsupported(String),
}

impl QueryError {
    pub fn load(kind: SourceKind, name: impl Into<String>, message: impl Into<String>) -> Self {
        QueryError::Load {
            kind,
            name: name.into(),
            message: message.into(),
        }
    }

    /// Syntax diagnostics, if this is a syntax error
    pub fn diagnostics(&self) -> &[String] {
        match self {
            QueryError::Syntax(errors) => errors,
            _ => &[],
        }
    }
}

/// Result type for recql operations
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = QueryError::Syntax(vec![
            "expected FROM, found end of input at position 9".to_string(),
            "unexpected character '#' at position 3".to_string(),
        ]);
        assert_eq!(
            err.to_string(),
            "syntax error: expected FROM, found end of input at position 9; unexpected character '#' at position 3"
        );
        assert_eq!(err.diagnostics().len(), 2);

        let err = QueryError::SourceNotFound {
            kind: SourceKind::File,
            name: "users".to_string(),
        };
        assert_eq!(err.to_string(), "file source not found: users");

        let err = QueryError::load(SourceKind::Api, "items", "HTTP 500");
        assert_eq!(err.to_string(), "failed to load api source 'items': HTTP 500");
        assert!(err.diagnostics().is_empty());
    }
}
