use std::mem;

use crate::{
    ast::{
        BinOp, CompoundQuery, Cte, Direction, Expr, GroupBy, Join, JoinKind, Limit, OrderBy,
        Query, Select, SetOperator, Statement, TableReference, Token, TokenKind, With,
    },
    error::{QueryError, QueryResult},
    lexer::Lexer,
    source::SourceKind,
    value::Value,
};

/// Recursive-descent parser for the SQL subset.
///
/// Parsing never stops at the first problem: every diagnostic is collected
/// (see [`Parser::errors`]) and a best-effort [`Statement`] is still returned,
/// so callers decide whether to proceed. [`parse`] wraps this into a
/// `Result` that fails when any diagnostic was recorded.
pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    peek_token: Token,
    errors: Vec<String>,
}

/// Parse a query string, failing with every syntax error found.
///
/// # Examples
///
/// ```
/// let statement = recql::parser::parse("SELECT name FROM users WHERE id = 1").unwrap();
/// assert_eq!(statement.primary.from.name, "users");
///
/// let err = recql::parser::parse("SELECT FROM").unwrap_err();
/// assert!(err.to_string().contains("syntax error"));
/// ```
pub fn parse(input: &str) -> QueryResult<Statement> {
    let mut parser = Parser::new(Lexer::new(input));
    let statement = parser.parse_statement();
    if parser.errors.is_empty() {
        Ok(statement)
    } else {
        Err(QueryError::Syntax(parser.errors))
    }
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Self {
        let current_token = lexer.next_token();
        let peek_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
            peek_token,
            errors: Vec::new(),
        }
    }

    /// Diagnostics collected so far
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    fn advance(&mut self) -> Token {
        let next = mem::replace(&mut self.peek_token, self.lexer.next_token());
        mem::replace(&mut self.current_token, next)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current_token.is(kind)
    }

    /// Consume the current token if it has the given kind
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error(format!("expected {}, found {}", what, self.current_token));
            false
        }
    }

    fn error(&mut self, message: String) {
        let message = format!("{} at position {}", message, self.current_token.position);
        self.errors.push(message);
    }

    fn is_or_word(&self) -> bool {
        self.check(TokenKind::Ident) && self.current_token.literal.eq_ignore_ascii_case("or")
    }
}

// Statements and clauses
impl Parser {
    /// Parse a complete statement and require the input to end afterwards
    pub fn parse_statement(&mut self) -> Statement {
        let statement = self.parse_statement_body();

        while self.eat(TokenKind::Semicolon) {}
        if !self.check(TokenKind::Eof) {
            self.error(format!(
                "unexpected {} after end of statement",
                self.current_token
            ));
        }
        statement
    }

    fn parse_statement_body(&mut self) -> Statement {
        let with = if self.check(TokenKind::With) {
            Some(self.parse_with())
        } else {
            None
        };

        let primary = self.parse_query();

        let compound = match self.parse_set_operator() {
            Some(operator) => {
                let right = self.parse_query();
                if self.parse_set_operator().is_some() {
                    self.error("only one set operation per statement is supported".to_string());
                    self.parse_query();
                }
                Some(CompoundQuery {
                    left: Box::new(primary.clone()),
                    operator,
                    right: Box::new(right),
                })
            }
            None => None,
        };

        Statement {
            with,
            primary,
            compound,
        }
    }

    fn parse_with(&mut self) -> With {
        self.advance(); // consume WITH
        let mut ctes = vec![];

        loop {
            let name = match self.current_token.kind {
                TokenKind::Ident => self.advance().literal,
                _ => {
                    self.error(format!(
                        "expected common table expression name, found {}",
                        self.current_token
                    ));
                    String::new()
                }
            };

            self.expect(TokenKind::As, "AS");
            self.expect(TokenKind::LParen, "'('");
            let query = self.parse_statement_body();
            self.expect(TokenKind::RParen, "')'");
            ctes.push(Cte { name, query });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        With { ctes }
    }

    fn parse_set_operator(&mut self) -> Option<SetOperator> {
        let operator = match self.current_token.kind {
            TokenKind::Union => {
                self.advance();
                SetOperator::Union {
                    all: self.eat(TokenKind::All),
                }
            }
            TokenKind::Intersect => {
                self.advance();
                SetOperator::Intersect
            }
            TokenKind::Except => {
                self.advance();
                SetOperator::Except
            }
            _ => return None,
        };
        Some(operator)
    }

    /// Parse one `SELECT ... FROM ...` query with its trailing clauses
    pub fn parse_query(&mut self) -> Query {
        self.expect(TokenKind::Select, "SELECT");
        let distinct = self.eat(TokenKind::Distinct);
        let fields = self.parse_select_list();

        let from = if self.expect(TokenKind::From, "FROM") {
            self.parse_table_reference()
        } else {
            TableReference {
                source_kind: None,
                name: String::new(),
                alias: None,
            }
        };

        let mut joins = vec![];
        while let Some(kind) = self.parse_join_kind() {
            let table = self.parse_table_reference();
            let on = if self.eat(TokenKind::On) {
                Some(self.parse_expression())
            } else {
                if kind != JoinKind::Cross {
                    self.error(format!("JOIN {} requires an ON condition", table.name));
                }
                None
            };
            joins.push(Join { kind, table, on });
        }

        let where_clause = if self.eat(TokenKind::Where) {
            Some(self.parse_expression())
        } else {
            None
        };

        let group_by = if self.eat(TokenKind::Group) {
            self.expect(TokenKind::By, "BY after GROUP");
            Some(GroupBy {
                fields: self.parse_expression_list(),
            })
        } else {
            None
        };

        let having = if self.eat(TokenKind::Having) {
            Some(self.parse_expression())
        } else {
            None
        };

        let order_by = if self.eat(TokenKind::Order) {
            self.expect(TokenKind::By, "BY after ORDER");
            Some(self.parse_order_by())
        } else {
            None
        };

        let limit = self.parse_limit();

        Query {
            distinct,
            select: Select { fields },
            from,
            joins,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
        }
    }

    fn parse_select_list(&mut self) -> Vec<Expr> {
        let mut fields = vec![];
        loop {
            if self.eat(TokenKind::Asterisk) {
                fields.push(Expr::Star);
            } else {
                let expr = self.parse_expression();
                fields.push(self.parse_optional_alias(expr));
            }

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        fields
    }

    fn parse_optional_alias(&mut self, expr: Expr) -> Expr {
        let name = if self.eat(TokenKind::As) {
            match self.current_token.kind {
                TokenKind::Ident | TokenKind::Str => Some(self.advance().literal),
                _ => {
                    self.error(format!("expected alias after AS, found {}", self.current_token));
                    None
                }
            }
        } else if self.check(TokenKind::Ident) && !self.is_or_word() {
            Some(self.advance().literal)
        } else {
            None
        };

        match name {
            Some(name) => Expr::Alias {
                expr: Box::new(expr),
                name,
            },
            None => expr,
        }
    }

    fn parse_table_reference(&mut self) -> TableReference {
        // FILE/DATABASE/API only act as a kind when a table name follows
        let mut source_kind = None;
        if self.check(TokenKind::Ident)
            && matches!(self.peek_token.kind, TokenKind::Ident | TokenKind::Str)
            && let Ok(kind) = self.current_token.literal.parse::<SourceKind>()
        {
            source_kind = Some(kind);
            self.advance();
        }

        let name = match self.current_token.kind {
            TokenKind::Ident | TokenKind::Str => self.advance().literal,
            _ => {
                self.error(format!("expected table name, found {}", self.current_token));
                String::new()
            }
        };

        let alias = if self.eat(TokenKind::As) {
            match self.current_token.kind {
                TokenKind::Ident => Some(self.advance().literal),
                _ => {
                    self.error(format!(
                        "expected table alias after AS, found {}",
                        self.current_token
                    ));
                    None
                }
            }
        } else if self.check(TokenKind::Ident) && !self.is_or_word() {
            Some(self.advance().literal)
        } else {
            None
        };

        TableReference {
            source_kind,
            name,
            alias,
        }
    }

    fn parse_join_kind(&mut self) -> Option<JoinKind> {
        let kind = match self.current_token.kind {
            TokenKind::Join => {
                self.advance();
                return Some(JoinKind::Inner);
            }
            TokenKind::Inner => JoinKind::Inner,
            TokenKind::Left => JoinKind::Left,
            TokenKind::Right => JoinKind::Right,
            TokenKind::Full | TokenKind::Outer => JoinKind::Full,
            TokenKind::Cross => JoinKind::Cross,
            _ => return None,
        };

        let word = self.advance();
        if matches!(word.kind, TokenKind::Left | TokenKind::Right | TokenKind::Full) {
            self.eat(TokenKind::Outer);
        }
        self.expect(TokenKind::Join, "JOIN");
        Some(kind)
    }

    fn parse_order_by(&mut self) -> OrderBy {
        let mut fields = vec![];
        let mut directions = vec![];

        loop {
            fields.push(self.parse_expression());
            let direction = if self.eat(TokenKind::Desc) {
                Direction::Desc
            } else {
                self.eat(TokenKind::Asc);
                Direction::Asc
            };
            directions.push(direction);

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }

        OrderBy { fields, directions }
    }

    fn parse_limit(&mut self) -> Option<Limit> {
        if self.eat(TokenKind::Limit) {
            let count = self.parse_row_count();
            let offset = if self.eat(TokenKind::Offset) {
                self.parse_row_count()
            } else {
                0
            };
            Some(Limit {
                count: Some(count),
                offset,
            })
        } else if self.eat(TokenKind::Offset) {
            Some(Limit {
                count: None,
                offset: self.parse_row_count(),
            })
        } else {
            None
        }
    }

    fn parse_row_count(&mut self) -> usize {
        if self.check(TokenKind::Int)
            && let Ok(n) = self.current_token.literal.parse::<usize>()
        {
            self.advance();
            return n;
        }
        self.error(format!("expected a row count, found {}", self.current_token));
        if !self.check(TokenKind::Eof) {
            self.advance();
        }
        0
    }

    fn parse_expression_list(&mut self) -> Vec<Expr> {
        let mut exprs = vec![self.parse_expression()];
        while self.eat(TokenKind::Comma) {
            exprs.push(self.parse_expression());
        }
        exprs
    }
}

// Expressions, loosest binding first
impl Parser {
    pub fn parse_expression(&mut self) -> Expr {
        let expr = self.parse_and();

        if self.is_or_word() {
            self.error(
                "OR is not supported; combine conditions with IN, CASE or UNION".to_string(),
            );
            self.advance();
            self.parse_and();
        }
        expr
    }

    fn parse_and(&mut self) -> Expr {
        let mut left = self.parse_comparison();

        while self.eat(TokenKind::And) {
            let right = self.parse_comparison();
            left = Expr::binary(left, BinOp::And, right);
        }
        left
    }

    fn parse_comparison(&mut self) -> Expr {
        let left = self.parse_additive();

        let op = match self.current_token.kind {
            TokenKind::Eq => Some(BinOp::Equal),
            TokenKind::NotEq => Some(BinOp::NotEqual),
            TokenKind::Lt => Some(BinOp::LessThan),
            TokenKind::Gt => Some(BinOp::GreaterThan),
            TokenKind::LtEq => Some(BinOp::LessEqual),
            TokenKind::GtEq => Some(BinOp::GreaterEqual),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            let right = self.parse_additive();
            return Expr::binary(left, op, right);
        }

        match self.current_token.kind {
            TokenKind::Is => {
                self.advance();
                let op = if self.eat(TokenKind::Not) {
                    BinOp::IsNotNull
                } else {
                    BinOp::IsNull
                };
                self.expect(TokenKind::Null, "NULL after IS");
                Expr::binary(left, op, Expr::Literal(Value::Null))
            }
            TokenKind::Not => {
                self.advance();
                match self.current_token.kind {
                    TokenKind::In => self.parse_in(left, true),
                    TokenKind::Like => self.parse_like(left, true),
                    _ => {
                        self.error(format!(
                            "expected IN or LIKE after NOT, found {}",
                            self.current_token
                        ));
                        left
                    }
                }
            }
            TokenKind::In => self.parse_in(left, false),
            TokenKind::Like => self.parse_like(left, false),
            _ => left,
        }
    }

    fn parse_in(&mut self, left: Expr, negated: bool) -> Expr {
        self.advance(); // consume IN
        self.expect(TokenKind::LParen, "'(' after IN");

        let candidates = if self.check(TokenKind::Select) || self.check(TokenKind::With) {
            vec![Expr::Subquery(Box::new(self.parse_statement_body()))]
        } else {
            self.parse_expression_list()
        };

        self.expect(TokenKind::RParen, "')' to close IN list");
        Expr::In {
            left: Box::new(left),
            candidates,
            negated,
        }
    }

    fn parse_like(&mut self, left: Expr, negated: bool) -> Expr {
        self.advance(); // consume LIKE
        let pattern = self.parse_additive();
        Expr::Like {
            left: Box::new(left),
            pattern: Box::new(pattern),
            negated,
        }
    }

    fn parse_additive(&mut self) -> Expr {
        let mut left = self.parse_multiplicative();

        loop {
            let op = match self.current_token.kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Subtract,
                _ => break,
            };

            self.advance();
            let right = self.parse_multiplicative();
            left = Expr::binary(left, op, right);
        }
        left
    }

    fn parse_multiplicative(&mut self) -> Expr {
        let mut left = self.parse_unary();

        loop {
            let op = match self.current_token.kind {
                TokenKind::Asterisk => BinOp::Multiply,
                TokenKind::Slash => BinOp::Divide,
                _ => break,
            };

            self.advance();
            let right = self.parse_unary();
            left = Expr::binary(left, op, right);
        }
        left
    }

    fn parse_unary(&mut self) -> Expr {
        if !self.eat(TokenKind::Minus) {
            return self.parse_primary();
        }

        match self.parse_unary() {
            Expr::Literal(Value::Integer(n)) => Expr::Literal(Value::Integer(-n)),
            Expr::Literal(Value::Float(n)) => Expr::Literal(Value::Float(-n)),
            // Represent as 0 - operand
            operand => Expr::binary(Expr::Literal(Value::Integer(0)), BinOp::Subtract, operand),
        }
    }

    /// Parse primary expressions (atoms): literals, names, calls, CASE,
    /// parenthesised expressions and subqueries
    fn parse_primary(&mut self) -> Expr {
        match self.current_token.kind {
            TokenKind::Int => {
                let token = self.advance();
                match token.literal.parse::<i64>() {
                    Ok(n) => Expr::Literal(Value::Integer(n)),
                    Err(_) => match token.literal.parse::<f64>() {
                        Ok(f) => Expr::Literal(Value::Float(f)),
                        Err(_) => {
                            self.error(format!("invalid number '{}'", token.literal));
                            Expr::Literal(Value::Null)
                        }
                    },
                }
            }
            TokenKind::Float => {
                let token = self.advance();
                match token.literal.parse::<f64>() {
                    Ok(f) => Expr::Literal(Value::Float(f)),
                    Err(_) => {
                        self.error(format!("invalid number '{}'", token.literal));
                        Expr::Literal(Value::Null)
                    }
                }
            }
            TokenKind::Str => Expr::Literal(Value::String(self.advance().literal)),
            TokenKind::True => {
                self.advance();
                Expr::Literal(Value::Boolean(true))
            }
            TokenKind::False => {
                self.advance();
                Expr::Literal(Value::Boolean(false))
            }
            TokenKind::Null => {
                self.advance();
                Expr::Literal(Value::Null)
            }
            TokenKind::Asterisk => {
                self.advance();
                Expr::Star
            }
            TokenKind::LParen => {
                self.advance();
                let expr = if self.check(TokenKind::Select) || self.check(TokenKind::With) {
                    Expr::Subquery(Box::new(self.parse_statement_body()))
                } else {
                    self.parse_expression()
                };
                self.expect(TokenKind::RParen, "')'");
                expr
            }
            TokenKind::Case => self.parse_case(),
            TokenKind::Ident => {
                let name = self.advance().literal;
                if self.check(TokenKind::LParen) {
                    self.parse_function_call(name)
                } else {
                    Expr::Identifier(name)
                }
            }
            TokenKind::Illegal => {
                let token = self.advance();
                let message = if token.literal.starts_with('\'') {
                    "unterminated string literal".to_string()
                } else {
                    format!("unexpected character '{}'", token.literal)
                };
                self.errors
                    .push(format!("{} at position {}", message, token.position));
                Expr::Literal(Value::Null)
            }
            TokenKind::Eof => {
                self.error("unexpected end of input".to_string());
                Expr::Literal(Value::Null)
            }
            _ => {
                self.error(format!("unexpected {} in expression", self.current_token));
                self.advance();
                Expr::Literal(Value::Null)
            }
        }
    }

    fn parse_function_call(&mut self, name: String) -> Expr {
        self.advance(); // consume '('
        let name = name.to_ascii_uppercase();

        let args = if self.check(TokenKind::RParen) {
            vec![]
        } else {
            self.parse_expression_list()
        };
        self.expect(TokenKind::RParen, "')' to close function call");

        let call = Expr::FunctionCall { name, args };
        if self.check(TokenKind::Over) {
            self.parse_window(call)
        } else {
            call
        }
    }

    fn parse_window(&mut self, function: Expr) -> Expr {
        self.advance(); // consume OVER
        self.expect(TokenKind::LParen, "'(' after OVER");

        let partition_by = if self.eat(TokenKind::Partition) {
            self.expect(TokenKind::By, "BY after PARTITION");
            self.parse_expression_list()
        } else {
            vec![]
        };

        let order_by = if self.eat(TokenKind::Order) {
            self.expect(TokenKind::By, "BY after ORDER");
            Some(self.parse_order_by())
        } else {
            None
        };

        self.expect(TokenKind::RParen, "')' to close window");
        Expr::Window {
            function: Box::new(function),
            partition_by,
            order_by,
        }
    }

    fn parse_case(&mut self) -> Expr {
        self.advance(); // consume CASE
        let mut when_clauses = vec![];

        while self.eat(TokenKind::When) {
            let condition = self.parse_expression();
            self.expect(TokenKind::Then, "THEN");
            let result = self.parse_expression();
            when_clauses.push((condition, result));
        }
        if when_clauses.is_empty() {
            self.error(format!("expected WHEN after CASE, found {}", self.current_token));
        }

        let else_expr = if self.eat(TokenKind::Else) {
            Some(Box::new(self.parse_expression()))
        } else {
            None
        };

        self.expect(TokenKind::End, "END to close CASE");
        Expr::Case {
            when_clauses,
            else_expr,
        }
    }
}
