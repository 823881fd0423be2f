// tests/lexer_tests.rs

use recql::ast::TokenKind;
use recql::lexer::Lexer;

fn kinds(input: &str) -> Vec<TokenKind> {
    Lexer::new(input).tokenize().into_iter().map(|t| t.kind).collect()
}

fn literals(input: &str) -> Vec<String> {
    Lexer::new(input)
        .tokenize()
        .into_iter()
        .map(|t| t.literal)
        .collect()
}

#[test]
fn test_operators() {
    assert_eq!(
        kinds("= != <> < > <= >= + - * / , ; ( )"),
        vec![
            TokenKind::Eq,
            TokenKind::NotEq,
            TokenKind::NotEq,
            TokenKind::Lt,
            TokenKind::Gt,
            TokenKind::LtEq,
            TokenKind::GtEq,
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Asterisk,
            TokenKind::Slash,
            TokenKind::Comma,
            TokenKind::Semicolon,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_simple_select() {
    assert_eq!(
        kinds("SELECT name FROM users WHERE id = 1"),
        vec![
            TokenKind::Select,
            TokenKind::Ident,
            TokenKind::From,
            TokenKind::Ident,
            TokenKind::Where,
            TokenKind::Ident,
            TokenKind::Eq,
            TokenKind::Int,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_keywords_ignore_case() {
    assert_eq!(
        kinds("select Select sElEcT"),
        vec![
            TokenKind::Select,
            TokenKind::Select,
            TokenKind::Select,
            TokenKind::Eof
        ]
    );
    // The original spelling is kept in the literal
    assert_eq!(literals("gRoUp")[0], "gRoUp");
}

#[test]
fn test_identifiers() {
    assert_eq!(
        literals("user_id u.id orders_2024 _tmp"),
        vec!["user_id", "u.id", "orders_2024", "_tmp", ""]
    );
    assert!(
        kinds("user_id u.id orders_2024 _tmp")[..4]
            .iter()
            .all(|k| *k == TokenKind::Ident)
    );
}

#[test]
fn test_keyword_prefix_is_identifier() {
    // Keywords match whole words only
    assert_eq!(
        kinds("orders selected left.id"),
        vec![
            TokenKind::Ident,
            TokenKind::Ident,
            TokenKind::Ident,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_numbers() {
    let tokens = Lexer::new("42 3.14 7.").tokenize();
    assert_eq!((tokens[0].kind, tokens[0].literal.as_str()), (TokenKind::Int, "42"));
    assert_eq!(
        (tokens[1].kind, tokens[1].literal.as_str()),
        (TokenKind::Float, "3.14")
    );
    // A trailing dot without digits is not part of the number
    assert_eq!((tokens[2].kind, tokens[2].literal.as_str()), (TokenKind::Int, "7"));
    assert_eq!(tokens[3].kind, TokenKind::Illegal);
}

#[test]
fn test_strings() {
    let tokens = Lexer::new("'hello world' 'it''s' ''").tokenize();
    assert_eq!(tokens[0].kind, TokenKind::Str);
    assert_eq!(tokens[0].literal, "hello world");
    assert_eq!(tokens[1].literal, "it's");
    assert_eq!(tokens[2].kind, TokenKind::Str);
    assert_eq!(tokens[2].literal, "");
}

#[test]
fn test_unterminated_string_is_illegal() {
    let tokens = Lexer::new("SELECT 'oops").tokenize();
    assert_eq!(tokens[1].kind, TokenKind::Illegal);
    assert_eq!(tokens[1].literal, "'oops");
    assert_eq!(tokens[1].position, 7);
    assert_eq!(tokens[2].kind, TokenKind::Eof);
}

#[test]
fn test_unknown_characters_are_illegal() {
    assert_eq!(
        kinds("a # b ! c"),
        vec![
            TokenKind::Ident,
            TokenKind::Illegal,
            TokenKind::Ident,
            TokenKind::Illegal,
            TokenKind::Ident,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_line_comments_are_skipped() {
    assert_eq!(
        kinds("SELECT a -- the first column\nFROM t -- trailing"),
        vec![
            TokenKind::Select,
            TokenKind::Ident,
            TokenKind::From,
            TokenKind::Ident,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn test_positions() {
    let tokens = Lexer::new("SELECT  a,b").tokenize();
    let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
    assert_eq!(positions, vec![0, 8, 9, 10, 11]);
}

#[test]
fn test_eof_repeats() {
    let mut lexer = Lexer::new("");
    assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    assert_eq!(lexer.next_token().kind, TokenKind::Eof);
}

#[test]
fn test_window_and_case_keywords() {
    assert_eq!(
        kinds("ROW_NUMBER() OVER (PARTITION BY dept) CASE WHEN x THEN 1 ELSE 0 END"),
        vec![
            TokenKind::Ident,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Over,
            TokenKind::LParen,
            TokenKind::Partition,
            TokenKind::By,
            TokenKind::Ident,
            TokenKind::RParen,
            TokenKind::Case,
            TokenKind::When,
            TokenKind::Ident,
            TokenKind::Then,
            TokenKind::Int,
            TokenKind::Else,
            TokenKind::Int,
            TokenKind::End,
            TokenKind::Eof,
        ]
    );
}
