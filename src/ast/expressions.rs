use std::fmt;

use crate::{
    ast::{BinOp, OrderBy, Statement},
    value::Value,
};

/// Function names reduced over a group rather than evaluated per row.
pub const AGGREGATE_FUNCTIONS: [&str; 6] = ["COUNT", "AVG", "SUM", "MIN", "MAX", "DIFF"];

/// Abstract Syntax Tree node representing a parsed expression.
///
/// The set of variants is closed; the evaluator matches on it exhaustively.
/// Nodes are never mutated once the parser has built them.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference, possibly qualified
    ///
    /// Resolves against the current row first, then against enclosing rows
    /// of correlated subqueries.
    ///
    /// # Examples
    /// ```text
    /// name
    /// u.id
    /// ```
    Identifier(String),

    /// Literal value
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 1.5
    /// 'hello'
    /// NULL
    /// ```
    Literal(Value),

    /// Projection name attached to an expression
    ///
    /// # Example
    /// ```text
    /// price * 2 AS doubled
    /// ```
    Alias { expr: Box<Expr>, name: String },

    /// Binary operation (arithmetic, comparison, null test, AND)
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },

    /// Membership test
    ///
    /// # Examples
    /// ```text
    /// status IN ('open', 'held')
    /// id NOT IN (SELECT user_id FROM banned)
    /// ```
    In {
        left: Box<Expr>,
        candidates: Vec<Expr>,
        negated: bool,
    },

    /// Substring containment test (not full SQL wildcard matching)
    ///
    /// # Example
    /// ```text
    /// name NOT LIKE '%test%'
    /// ```
    Like {
        left: Box<Expr>,
        pattern: Box<Expr>,
        negated: bool,
    },

    /// Scalar or aggregate function call; `name` is stored upper-case
    ///
    /// # Examples
    /// ```text
    /// UPPER(name)
    /// COUNT(*)
    /// ```
    FunctionCall { name: String, args: Vec<Expr> },

    /// Function evaluated over a partition of the current result set
    ///
    /// # Example
    /// ```text
    /// ROW_NUMBER() OVER (PARTITION BY dept ORDER BY salary DESC)
    /// ```
    Window {
        function: Box<Expr>,
        partition_by: Vec<Expr>,
        order_by: Option<OrderBy>,
    },

    /// Searched CASE expression
    ///
    /// # Example
    /// ```text
    /// CASE WHEN qty > 10 THEN 'bulk' ELSE 'single' END
    /// ```
    Case {
        when_clauses: Vec<(Expr, Expr)>,
        else_expr: Option<Box<Expr>>,
    },

    /// Wildcard projection marker (`*`)
    Star,

    /// Parenthesised nested query
    Subquery(Box<Statement>),
}

impl Expr {
    pub fn binary(left: Expr, op: BinOp, right: Expr) -> Self {
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Strip any projection aliases
    pub fn unaliased(&self) -> &Expr {
        match self {
            Expr::Alias { expr, .. } => expr.unaliased(),
            other => other,
        }
    }

    /// Whether this is a call to COUNT/AVG/SUM/MIN/MAX/DIFF (aliases ignored)
    pub fn is_aggregate_call(&self) -> bool {
        match self.unaliased() {
            Expr::FunctionCall { name, .. } => AGGREGATE_FUNCTIONS.contains(&name.as_str()),
            _ => false,
        }
    }

    /// Whether an aggregate call appears anywhere in this expression.
    ///
    /// Window functions and subqueries are boundaries: aggregates inside them
    /// belong to their own evaluation.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            Expr::FunctionCall { args, .. } => {
                self.is_aggregate_call() || args.iter().any(Expr::contains_aggregate)
            }
            Expr::Alias { expr, .. } => expr.contains_aggregate(),
            Expr::Binary { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            Expr::In {
                left, candidates, ..
            } => left.contains_aggregate() || candidates.iter().any(Expr::contains_aggregate),
            Expr::Like { left, pattern, .. } => {
                left.contains_aggregate() || pattern.contains_aggregate()
            }
            Expr::Case {
                when_clauses,
                else_expr,
            } => {
                when_clauses
                    .iter()
                    .any(|(w, t)| w.contains_aggregate() || t.contains_aggregate())
                    || else_expr.as_ref().is_some_and(|e| e.contains_aggregate())
            }
            Expr::Identifier(_)
            | Expr::Literal(_)
            | Expr::Window { .. }
            | Expr::Star
            | Expr::Subquery(_) => false,
        }
    }

    /// Output column name used when the expression is projected.
    ///
    /// Aliases win; identifiers keep their spelling; function calls use the
    /// lower-case function name (`COUNT(*)` projects as `count`); anything
    /// else uses its rendered SQL text.
    pub fn column_name(&self) -> String {
        match self {
            Expr::Alias { name, .. } => name.clone(),
            Expr::Identifier(name) => name.clone(),
            Expr::FunctionCall { name, .. } => name.to_ascii_lowercase(),
            Expr::Window { function, .. } => function.column_name(),
            other => other.to_string(),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Identifier(name) => write!(f, "{}", name),
            Expr::Literal(Value::String(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            Expr::Literal(Value::Null) => write!(f, "NULL"),
            Expr::Literal(v) => write!(f, "{}", v.as_string()),
            Expr::Alias { expr, name } => write!(f, "{} AS {}", expr, name),
            Expr::Binary {
                left,
                op: op @ (BinOp::IsNull | BinOp::IsNotNull),
                ..
            } => write!(f, "{} {}", left, op),
            Expr::Binary { left, op, right } => write!(f, "{} {} {}", left, op, right),
            Expr::In {
                left,
                candidates,
                negated,
            } => {
                write!(f, "{} {}IN (", left, if *negated { "NOT " } else { "" })?;
                write_list(f, candidates)?;
                write!(f, ")")
            }
            Expr::Like {
                left,
                pattern,
                negated,
            } => write!(
                f,
                "{} {}LIKE {}",
                left,
                if *negated { "NOT " } else { "" },
                pattern
            ),
            Expr::FunctionCall { name, args } => {
                write!(f, "{}(", name)?;
                write_list(f, args)?;
                write!(f, ")")
            }
            Expr::Window {
                function,
                partition_by,
                order_by,
            } => {
                write!(f, "{} OVER (", function)?;
                if !partition_by.is_empty() {
                    write!(f, "PARTITION BY ")?;
                    write_list(f, partition_by)?;
                }
                if let Some(order_by) = order_by {
                    if !partition_by.is_empty() {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", order_by)?;
                }
                write!(f, ")")
            }
            Expr::Case {
                when_clauses,
                else_expr,
            } => {
                write!(f, "CASE")?;
                for (when, then) in when_clauses {
                    write!(f, " WHEN {} THEN {}", when, then)?;
                }
                if let Some(else_expr) = else_expr {
                    write!(f, " ELSE {}", else_expr)?;
                }
                write!(f, " END")
            }
            Expr::Star => write!(f, "*"),
            Expr::Subquery(_) => write!(f, "(subquery)"),
        }
    }
}
