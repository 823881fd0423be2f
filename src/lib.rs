pub mod ast;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod join;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod record;
pub mod source;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{BinOp, Expr, Query, Statement, Token};
pub use config::{CompoundMode, EngineOptions};
pub use engine::Engine;
pub use error::{QueryError, QueryResult};
pub use evaluator::EvalContext;
pub use lexer::Lexer;
pub use output::{JsonPrinter, records_to_json, records_to_json_pretty};
pub use parser::{Parser, parse};
pub use record::Record;
pub use source::{
    ApiSource, CompositeSource, Field, FileSource, InMemorySource, SourceKind, SourceLoader,
};
pub use value::{Value, compare_values};
