//! Automatic semicolon insertion behavior.

use gosling_lexer::{tokenize, Interner, TokenKind};

fn kinds(src: &str) -> Vec<TokenKind> {
    let interner = Interner::new();
    let (tokens, _errors) = tokenize(src, &interner);
    tokens.iter().map(|t| t.kind).collect()
}

#[test]
fn semicolon_inserted_after_each_statement_line() {
    let got = kinds("x := 1\ny := 2\n");
    assert_eq!(
        got,
        vec![
            TokenKind::Ident,
            TokenKind::Define,
            TokenKind::Int,
            TokenKind::Semicolon,
            TokenKind::Ident,
            TokenKind::Define,
            TokenKind::Int,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn no_semicolon_after_trailing_binary_operator() {
    let got = kinds("x := 1 +\n  2\n");
    assert_eq!(
        got,
        vec![
            TokenKind::Ident,
            TokenKind::Define,
            TokenKind::Int,
            TokenKind::Add,
            TokenKind::Int,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn inserted_semicolons_have_zero_length() {
    let interner = Interner::new();
    let (tokens, _) = tokenize("x\n", &interner);
    let semi = tokens
        .iter()
        .find(|t| t.kind == TokenKind::Semicolon)
        .expect("semicolon inserted");
    assert_eq!(semi.byte_len, 0);
    assert_eq!(semi.length, 0);
}

#[test]
fn semicolon_inserted_at_eof_without_newline() {
    let got = kinds("return");
    assert_eq!(
        got,
        vec![TokenKind::Return, TokenKind::Semicolon, TokenKind::Eof]
    );
}

#[test]
fn semicolon_inserted_after_closing_brackets() {
    let got = kinds("f()\n");
    assert_eq!(
        got,
        vec![
            TokenKind::Ident,
            TokenKind::LParen,
            TokenKind::RParen,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn line_comment_stands_in_for_the_newline() {
    // The semicolon must be emitted before the comment token.
    let got = kinds("x // trailing\ny");
    assert_eq!(
        got,
        vec![
            TokenKind::Ident,
            TokenKind::Semicolon,
            TokenKind::Comment,
            TokenKind::Ident,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn single_line_block_comment_preserves_the_pending_semicolon() {
    // `x /* c */ y` — no line end inside or after the comment before `y`,
    // so no semicolon may be inserted between x and y.
    let got = kinds("x /* c */ y\n");
    assert_eq!(
        got,
        vec![
            TokenKind::Ident,
            TokenKind::Comment,
            TokenKind::Ident,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn multiline_block_comment_triggers_insertion_before_it() {
    let got = kinds("x /* a\nb */ y\n");
    assert_eq!(
        got,
        vec![
            TokenKind::Ident,
            TokenKind::Semicolon,
            TokenKind::Comment,
            TokenKind::Ident,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}

#[test]
fn no_semicolon_after_keywords_that_cannot_end_statements() {
    let got = kinds("if\nx");
    assert_eq!(
        got,
        vec![
            TokenKind::If,
            TokenKind::Ident,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ]
    );
}
