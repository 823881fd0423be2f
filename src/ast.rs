//! # recql - Abstract Syntax Tree
//!
//! This module defines the syntax tree the parser produces for one SQL query
//! string. The tree is immutable once built and can be cached and executed any
//! number of times.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens and the keyword table
//! - **[expressions]** - The closed set of expression variants
//! - **[operators]** - Binary operators (arithmetic, comparison, null tests, AND)
//! - **[clauses]** - SELECT, FROM/JOIN, GROUP BY, ORDER BY, LIMIT, WITH
//! - **[statements]** - Queries, set operations and the top-level statement
//!
//! ## Quick Start
//!
//! ```text
//! SELECT dept, COUNT(*) AS staff
//! FROM employees e
//! WHERE e.active = 1
//! GROUP BY dept
//! HAVING staff > 2
//! ORDER BY staff DESC
//! LIMIT 5
//! ```
//!
//! ## Known Grammar Limits
//!
//! - There is no `OR`; use `IN`, `CASE`, or a `UNION` of two queries.
//! - `GROUP BY a, b` parses, but rows are grouped on `a` alone.
//! - One set operation per statement (`A UNION B`, not `A UNION B UNION C`).
//! - Keywords are reserved, including `LEFT`, `RIGHT` and `FULL`. A table
//!   named like one must be quoted: `LEFT JOIN 'right' r ON l.id = r.id`.
pub mod clauses;
pub mod expressions;
pub mod operators;
pub mod statements;
pub mod tokens;

pub use clauses::{
    Cte, Direction, GroupBy, Join, JoinKind, Limit, OrderBy, Select, TableReference, With,
};
pub use expressions::{AGGREGATE_FUNCTIONS, Expr};
pub use operators::BinOp;
pub use statements::{CompoundQuery, Query, SetOperator, Statement};
pub use tokens::{Token, TokenKind};
