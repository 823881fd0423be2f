use std::fmt;

use crate::{
    ast::{Expr, Statement},
    source::SourceKind,
};

/// `SELECT [DISTINCT] ...` projection list
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub fields: Vec<Expr>,
}

/// A table in FROM or JOIN position.
///
/// # Examples
/// ```text
/// users
/// users u
/// FILE 'data/orders.csv' AS o
/// API 'https://example.com/items'
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableReference {
    /// Where to load from; `None` means the engine's default kind
    pub source_kind: Option<SourceKind>,
    pub name: String,
    pub alias: Option<String>,
}

impl TableReference {
    /// Namespace used for this table's columns once joined
    pub fn qualifier(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `JOIN` or `INNER JOIN`
    Inner,
    /// `LEFT [OUTER] JOIN`
    Left,
    /// `RIGHT [OUTER] JOIN`
    Right,
    /// `FULL [OUTER] JOIN` or `OUTER JOIN`
    Full,
    /// `CROSS JOIN`; any ON predicate is ignored
    Cross,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub table: TableReference,
    pub on: Option<Expr>,
}

/// `GROUP BY` expressions. Only the first one keys the grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupBy {
    pub fields: Vec<Expr>,
}

impl GroupBy {
    /// The expression rows are partitioned on
    pub fn key(&self) -> Option<&Expr> {
        self.fields.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// `ORDER BY` keys with one direction per key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub fields: Vec<Expr>,
    pub directions: Vec<Direction>,
}

impl OrderBy {
    pub fn keys(&self) -> impl Iterator<Item = (&Expr, Direction)> {
        self.fields
            .iter()
            .zip(self.directions.iter().copied())
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ORDER BY ")?;
        for (i, (expr, dir)) in self.keys().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match dir {
                Direction::Asc => write!(f, "{}", expr)?,
                Direction::Desc => write!(f, "{} DESC", expr)?,
            }
        }
        Ok(())
    }
}

/// `LIMIT count [OFFSET offset]` or bare `OFFSET offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Limit {
    pub count: Option<usize>,
    pub offset: usize,
}

/// One common table expression: `name AS (statement)`
#[derive(Debug, Clone, PartialEq)]
pub struct Cte {
    pub name: String,
    pub query: Statement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct With {
    pub ctes: Vec<Cte>,
}
