use crate::ast::{Token, TokenKind, tokens::lookup_keyword};

/// Converts query text into tokens, one character of lookahead at a time.
///
/// The lexer never fails: unknown characters and unterminated strings come
/// back as [`TokenKind::Illegal`] and the parser reports them. Once the
/// input is exhausted every call returns [`TokenKind::Eof`].
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '-' && self.peek_char() == Some('-') {
                while let Some(c) = self.current_char() {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '.' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Reads a single-quoted string; `''` inside stands for one quote.
    /// Returns `None` when the closing quote is missing.
    fn read_string(&mut self) -> Option<String> {
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == '\'' {
                if self.current_char() == Some('\'') {
                    result.push('\'');
                    self.advance();
                } else {
                    return Some(result);
                }
            } else {
                result.push(ch);
            }
        }
        None
    }

    fn read_number(&mut self) -> (TokenKind, String) {
        let mut number = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_float
                && self.peek_char().is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let kind = if is_float {
            TokenKind::Float
        } else {
            TokenKind::Int
        };
        (kind, number)
    }

    fn single(&mut self, kind: TokenKind, ch: char, start: usize) -> Token {
        self.advance();
        Token::new(kind, ch.to_string(), start)
    }

    fn double(&mut self, kind: TokenKind, text: &str, start: usize) -> Token {
        self.advance();
        self.advance();
        Token::new(kind, text, start)
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        let start = self.position;

        match self.current_char() {
            None => Token::new(TokenKind::Eof, "", start),
            Some(c @ '=') => self.single(TokenKind::Eq, c, start),
            Some('!') => {
                if self.peek_char() == Some('=') {
                    self.double(TokenKind::NotEq, "!=", start)
                } else {
                    self.single(TokenKind::Illegal, '!', start)
                }
            }
            Some(c @ '<') => match self.peek_char() {
                Some('=') => self.double(TokenKind::LtEq, "<=", start),
                Some('>') => self.double(TokenKind::NotEq, "<>", start),
                _ => self.single(TokenKind::Lt, c, start),
            },
            Some(c @ '>') => {
                if self.peek_char() == Some('=') {
                    self.double(TokenKind::GtEq, ">=", start)
                } else {
                    self.single(TokenKind::Gt, c, start)
                }
            }
            Some(c @ '+') => self.single(TokenKind::Plus, c, start),
            Some(c @ '-') => self.single(TokenKind::Minus, c, start),
            Some(c @ '*') => self.single(TokenKind::Asterisk, c, start),
            Some(c @ '/') => self.single(TokenKind::Slash, c, start),
            Some(c @ ',') => self.single(TokenKind::Comma, c, start),
            Some(c @ ';') => self.single(TokenKind::Semicolon, c, start),
            Some(c @ '(') => self.single(TokenKind::LParen, c, start),
            Some(c @ ')') => self.single(TokenKind::RParen, c, start),
            Some('\'') => match self.read_string() {
                Some(s) => Token::new(TokenKind::Str, s, start),
                None => Token::new(
                    TokenKind::Illegal,
                    self.input[start..].iter().collect::<String>(),
                    start,
                ),
            },
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();
                let kind = lookup_keyword(&ident).unwrap_or(TokenKind::Ident);
                Token::new(kind, ident, start)
            }
            Some(ch) if ch.is_ascii_digit() => {
                let (kind, number) = self.read_number();
                Token::new(kind, number, start)
            }
            Some(ch) => self.single(TokenKind::Illegal, ch, start),
        }
    }

    /// Drain the whole input, including the trailing `Eof`
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token.is(TokenKind::Eof);
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }
}

#[test]
fn test_keywords_are_case_insensitive() {
    let mut lexer = Lexer::new("select Distinct FROM");
    assert_eq!(lexer.next_token().kind, TokenKind::Select);
    assert_eq!(lexer.next_token().kind, TokenKind::Distinct);
    assert_eq!(lexer.next_token().kind, TokenKind::From);
    assert_eq!(lexer.next_token().kind, TokenKind::Eof);
}

#[test]
fn test_dotted_identifier_is_one_token() {
    let mut lexer = Lexer::new("u.id >= 10");
    let ident = lexer.next_token();
    assert_eq!(ident.kind, TokenKind::Ident);
    assert_eq!(ident.literal, "u.id");
    assert_eq!(lexer.next_token().kind, TokenKind::GtEq);
    let number = lexer.next_token();
    assert_eq!((number.kind, number.literal.as_str()), (TokenKind::Int, "10"));
}
