use std::{collections::HashMap, fmt, sync::LazyLock};

/// Token category produced by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Character the lexer does not recognise, or an unterminated string
    Illegal,
    /// End of input
    Eof,

    // Literals and names
    /// Identifier, possibly dotted
    ///
    /// # Examples
    /// ```text
    /// name
    /// u.id
    /// users.csv
    /// ```
    Ident,
    /// Integer literal
    Int,
    /// Decimal literal such as `1.5`
    Float,
    /// Single-quoted string literal, quotes stripped
    Str,

    // Operators
    /// `=`
    Eq,
    /// `!=` or `<>`
    NotEq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`, both multiplication and the wildcard
    Asterisk,
    /// `/`
    Slash,

    // Delimiters
    Comma,
    Semicolon,
    LParen,
    RParen,

    // Keywords
    Select,
    Distinct,
    From,
    Where,
    As,
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    Cross,
    On,
    Group,
    By,
    Having,
    Order,
    Asc,
    Desc,
    Limit,
    Offset,
    Union,
    Intersect,
    Except,
    All,
    With,
    Over,
    Partition,
    Case,
    When,
    Then,
    Else,
    End,
    In,
    Like,
    Not,
    Is,
    Null,
    And,
    True,
    False,
}

/// Keyword table, keyed by upper-case spelling. Built once, read-only.
static KEYWORDS: LazyLock<HashMap<&'static str, TokenKind>> = LazyLock::new(|| {
    use TokenKind::*;
    HashMap::from([
        ("SELECT", Select),
        ("DISTINCT", Distinct),
        ("FROM", From),
        ("WHERE", Where),
        ("AS", As),
        ("JOIN", Join),
        ("INNER", Inner),
        ("LEFT", Left),
        ("RIGHT", Right),
        ("FULL", Full),
        ("OUTER", Outer),
        ("CROSS", Cross),
        ("ON", On),
        ("GROUP", Group),
        ("BY", By),
        ("HAVING", Having),
        ("ORDER", Order),
        ("ASC", Asc),
        ("DESC", Desc),
        ("LIMIT", Limit),
        ("OFFSET", Offset),
        ("UNION", Union),
        ("INTERSECT", Intersect),
        ("EXCEPT", Except),
        ("ALL", All),
        ("WITH", With),
        ("OVER", Over),
        ("PARTITION", Partition),
        ("CASE", Case),
        ("WHEN", When),
        ("THEN", Then),
        ("ELSE", Else),
        ("END", End),
        ("IN", In),
        ("LIKE", Like),
        ("NOT", Not),
        ("IS", Is),
        ("NULL", Null),
        ("AND", And),
        ("TRUE", True),
        ("FALSE", False),
    ])
});

/// Look up an identifier in the keyword table (case-insensitive)
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    KEYWORDS.get(ident.to_ascii_uppercase().as_str()).copied()
}

/// A lexical token: its kind, the literal source text and the character
/// offset where it starts. Tokens are transient; the parser drops them once the
/// AST is built.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, literal: impl Into<String>, position: usize) -> Self {
        Token {
            kind,
            literal: literal.into(),
            position,
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end of input"),
            TokenKind::Str => write!(f, "string '{}'", self.literal),
            _ => write!(f, "'{}'", self.literal),
        }
    }
}
