//! Validate query syntax without loading any data

use crate::{QueryError, parse};

/// Options for the check command
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The SQL query to validate
    pub query: String,
}

/// Result of a check operation
#[derive(Debug, PartialEq, Eq)]
pub enum CheckResult {
    /// The query parsed cleanly
    Valid,
    /// Every diagnostic the parser reported
    Invalid(Vec<String>),
}

/// Parse the query and report its diagnostics
pub fn execute_check(options: &CheckOptions) -> CheckResult {
    match parse(&options.query) {
        Ok(_) => CheckResult::Valid,
        Err(QueryError::Syntax(errors)) => CheckResult::Invalid(errors),
        Err(other) => CheckResult::Invalid(vec![other.to_string()]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_diagnostic() {
        let valid = CheckOptions {
            query: "SELECT a FROM t WHERE a = 1".to_string(),
        };
        assert_eq!(execute_check(&valid), CheckResult::Valid);

        let invalid = CheckOptions {
            query: "SELECT a FROM t WHERE a = 1 OR a = 2".to_string(),
        };
        match execute_check(&invalid) {
            CheckResult::Invalid(errors) => assert!(errors.iter().any(|e| e.contains("OR"))),
            CheckResult::Valid => panic!("OR should be rejected"),
        }
    }
}
