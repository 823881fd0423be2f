//! CLI support for recql
//!
//! Provides programmatic access to the `recql` subcommands so they can be
//! embedded in other tools without going through argument parsing.

mod check;
mod query;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use query::{QueryOptions, QueryOutput, describe, execute_query, format_fields};

use std::{io, path::PathBuf};

use crate::{
    ApiSource, CompositeSource, CompoundMode, Engine, EngineOptions, FileSource, QueryError,
    SourceKind,
};

/// Errors that can occur during CLI operations
#[derive(Debug)]
pub enum CliError {
    /// Parsing, loading or executing the query failed
    Query(QueryError),
    /// IO error
    Io(io::Error),
    /// No query given on the command line or stdin
    NoQuery,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Query(QueryError::Syntax(errors)) => {
                writeln!(f, "Syntax error:")?;
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    write!(f, "  {}", e)?;
                }
                Ok(())
            }
            CliError::Query(e) => write!(f, "Query failed: {}", e),
            CliError::Io(e) => write!(f, "IO error: {}", e),
            CliError::NoQuery => write!(f, "No query provided. Pass one as an argument or pipe it to stdin."),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Query(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::NoQuery => None,
        }
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        CliError::Query(e)
    }
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

/// Where tables are read from and how statements run
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Directory file tables resolve under
    pub data_dir: PathBuf,
    /// Base URL for API tables given as paths
    pub api_base: Option<String>,
    /// Kind used when a table reference names none
    pub default_source: SourceKind,
    pub compound_mode: CompoundMode,
}

impl Default for SourceOptions {
    fn default() -> Self {
        SourceOptions {
            data_dir: PathBuf::from("."),
            api_base: None,
            default_source: SourceKind::File,
            compound_mode: CompoundMode::default(),
        }
    }
}

impl SourceOptions {
    /// An engine reading files and APIs. No database adapter is registered,
    /// so `DATABASE` tables fail to load.
    pub fn build_engine(&self) -> Engine {
        let api = match &self.api_base {
            Some(base) => ApiSource::new(base.clone()),
            None => ApiSource::default(),
        };
        let loader = CompositeSource::new()
            .with(SourceKind::File, FileSource::new(self.data_dir.clone()))
            .with(SourceKind::Api, api);

        Engine::new(loader).with_options(
            EngineOptions::default()
                .with_compound_mode(self.compound_mode)
                .with_default_source(self.default_source),
        )
    }
}
