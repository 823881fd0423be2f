use crate::ast::{Expr, GroupBy, Join, Limit, OrderBy, Select, TableReference, With};

/// A single SELECT query.
///
/// Clauses run in the order join → filter → group/aggregate → having →
/// distinct → order → limit, regardless of how they were written.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub distinct: bool,
    pub select: Select,
    pub from: TableReference,
    pub joins: Vec<Join>,
    pub where_clause: Option<Expr>,
    pub group_by: Option<GroupBy>,
    pub having: Option<Expr>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<Limit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    /// `UNION` (deduplicated) or `UNION ALL`
    Union { all: bool },
    /// `INTERSECT`
    Intersect,
    /// `EXCEPT`
    Except,
}

/// Two queries combined with a set operator
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundQuery {
    pub left: Box<Query>,
    pub operator: SetOperator,
    pub right: Box<Query>,
}

/// The full parsed form of one query string.
///
/// # Example
/// ```text
/// WITH big AS (SELECT * FROM orders WHERE total > 100)
/// SELECT id FROM big
/// UNION
/// SELECT id FROM refunds
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub with: Option<With>,
    pub primary: Query,
    pub compound: Option<CompoundQuery>,
}
