use std::fmt;

/// Binary operators.
///
/// The grammar has no disjunction, so there is no `Or`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    /// Addition (`+`)
    Add,
    /// Subtraction (`-`)
    Subtract,
    /// Multiplication (`*`)
    Multiply,
    /// Division (`/`); division by zero yields null
    Divide,

    // Comparison
    /// Equal (`=`)
    Equal,
    /// Not equal (`!=` or `<>`)
    NotEqual,
    /// Less than (`<`)
    LessThan,
    /// Greater than (`>`)
    GreaterThan,
    /// Less than or equal (`<=`)
    LessEqual,
    /// Greater than or equal (`>=`)
    GreaterEqual,

    // Null tests; the right operand is always a null literal
    /// `IS NULL`
    IsNull,
    /// `IS NOT NULL`
    IsNotNull,

    // Logical
    /// Logical AND (`AND`)
    And,
}

impl BinOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Subtract => "-",
            BinOp::Multiply => "*",
            BinOp::Divide => "/",
            BinOp::Equal => "=",
            BinOp::NotEqual => "!=",
            BinOp::LessThan => "<",
            BinOp::GreaterThan => ">",
            BinOp::LessEqual => "<=",
            BinOp::GreaterEqual => ">=",
            BinOp::IsNull => "IS NULL",
            BinOp::IsNotNull => "IS NOT NULL",
            BinOp::And => "AND",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
