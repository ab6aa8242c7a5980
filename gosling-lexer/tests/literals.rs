//! Literal scanning: numeric forms, strings, runes, and their error kinds.

use gosling_lexer::{tokenize, Interner, LexErrorKind, Token, TokenKind};

fn first_token(src: &str) -> (TokenKind, Option<LexErrorKind>) {
    let interner = Interner::new();
    let (tokens, errors) = tokenize(src, &interner);
    (tokens[0].kind, errors.first().map(|e| e.kind))
}

#[test]
fn numeric_literal_kinds() {
    assert_eq!(first_token("42"), (TokenKind::Int, None));
    assert_eq!(first_token("0x2A"), (TokenKind::Int, None));
    assert_eq!(first_token("0o755"), (TokenKind::Int, None));
    assert_eq!(first_token("0755"), (TokenKind::Int, None));
    assert_eq!(first_token("0b1010"), (TokenKind::Int, None));
    assert_eq!(first_token("1_000_000"), (TokenKind::Int, None));
    assert_eq!(first_token("3.14"), (TokenKind::Float, None));
    assert_eq!(first_token(".5"), (TokenKind::Float, None));
    assert_eq!(first_token("1e9"), (TokenKind::Float, None));
    assert_eq!(first_token("1.5e-3"), (TokenKind::Float, None));
    assert_eq!(first_token("0x1.8p3"), (TokenKind::Float, None));
    assert_eq!(first_token("2i"), (TokenKind::Imag, None));
    assert_eq!(first_token("1.5i"), (TokenKind::Imag, None));
}

#[test]
fn numeric_literal_errors() {
    assert_eq!(
        first_token("0x"),
        (TokenKind::Int, Some(LexErrorKind::MissingHexDigits))
    );
    assert_eq!(
        first_token("0b102"),
        (TokenKind::Int, Some(LexErrorKind::IllegalBinaryDigit))
    );
    assert_eq!(
        first_token("0o78"),
        (TokenKind::Int, Some(LexErrorKind::IllegalOctalDigit))
    );
    assert_eq!(
        first_token("0778"),
        (TokenKind::Int, Some(LexErrorKind::IllegalOctalDigit))
    );
    assert_eq!(
        first_token("1e"),
        (TokenKind::Float, Some(LexErrorKind::MissingExponentDigits))
    );
    assert_eq!(
        first_token("0x1.8"),
        (TokenKind::Float, Some(LexErrorKind::HexFloatNoExponent))
    );
}

#[test]
fn tokens_round_trip_through_json() {
    let interner = Interner::new();
    let (tokens, errors) = tokenize("x := \"héllo\"\n", &interner);
    assert!(errors.is_empty());
    let json = serde_json::to_string(&tokens).unwrap();
    let back: Vec<Token> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tokens);
}

#[test]
fn legacy_octal_with_float_continuation_is_decimal() {
    // `0778.5` is a valid float even though `0778` alone is not an octal.
    assert_eq!(first_token("0778.5"), (TokenKind::Float, None));
}

#[test]
fn string_literals() {
    assert_eq!(first_token(r#""hello""#), (TokenKind::Str, None));
    assert_eq!(first_token(r#""a\tbé""#), (TokenKind::Str, None));
    assert_eq!(first_token("`raw\nstring`"), (TokenKind::Str, None));
    assert_eq!(
        first_token("\"unterminated\n"),
        (TokenKind::Str, Some(LexErrorKind::UnterminatedString))
    );
    assert_eq!(
        first_token("`unterminated"),
        (TokenKind::Str, Some(LexErrorKind::UnterminatedRawString))
    );
    assert_eq!(
        first_token(r#""bad \q escape""#),
        (TokenKind::Str, Some(LexErrorKind::UnknownEscape))
    );
    assert_eq!(
        first_token(r#""\UFFFFFFFF""#),
        (TokenKind::Str, Some(LexErrorKind::InvalidCodePoint))
    );
}

#[test]
fn string_payload_is_interned_content_without_quotes() {
    let interner = Interner::new();
    let (tokens, errors) = tokenize(r#""fmt""#, &interner);
    assert!(errors.is_empty());
    let name = tokens[0].name.expect("payload");
    assert_eq!(&*interner.resolve(name), "fmt");
}

#[test]
fn rune_literals() {
    assert_eq!(first_token("'a'"), (TokenKind::Rune, None));
    assert_eq!(first_token(r"'\n'"), (TokenKind::Rune, None));
    assert_eq!(first_token(r"'é'"), (TokenKind::Rune, None));
    assert_eq!(
        first_token("'ab'"),
        (TokenKind::Rune, Some(LexErrorKind::InvalidRuneLength))
    );
    assert_eq!(
        first_token("''"),
        (TokenKind::Rune, Some(LexErrorKind::InvalidRuneLength))
    );
    assert_eq!(
        first_token("'a"),
        (TokenKind::Rune, Some(LexErrorKind::UnterminatedRune))
    );
}

#[test]
fn unterminated_block_comment() {
    assert_eq!(
        first_token("/* never closed"),
        (TokenKind::Comment, Some(LexErrorKind::UnterminatedComment))
    );
}

#[test]
fn utf16_columns_count_surrogate_pairs_twice() {
    let interner = Interner::new();
    // U+1F600 is one code point, two UTF-16 units.
    let (tokens, _) = tokenize("s := \"\u{1F600}\"\nx", &interner);
    let x = tokens
        .iter()
        .find(|t| {
            t.kind == TokenKind::Ident && interner.resolve(t.name.unwrap()).as_ref() == "x"
        })
        .expect("x token");
    assert_eq!(x.line, 2);
    assert_eq!(x.column, 0);
    let lit = tokens.iter().find(|t| t.kind == TokenKind::Str).unwrap();
    // Opening quote + surrogate pair + closing quote.
    assert_eq!(lit.length, 4);
}

#[test]
fn token_spans_reconstruct_source() {
    let interner = Interner::new();
    let src = "package main\n\nfunc add(a, b int) int { return a + b }\n";
    let (tokens, errors) = tokenize(src, &interner);
    assert!(errors.is_empty());
    let mut rebuilt = String::new();
    for t in &tokens {
        rebuilt.push_str(&src[t.offset as usize..t.end_offset() as usize]);
        rebuilt.push(' ');
    }
    // Every non-whitespace byte of the source appears in some token span.
    let stripped: String = src.split_whitespace().collect();
    let rebuilt_stripped: String = rebuilt.split_whitespace().collect();
    assert_eq!(stripped, rebuilt_stripped);
}

#[test]
fn unicode_identifiers() {
    let interner = Interner::new();
    let (tokens, errors) = tokenize("où := 1", &interner);
    assert!(errors.is_empty());
    assert_eq!(tokens[0].kind, TokenKind::Ident);
    assert_eq!(&*interner.resolve(tokens[0].name.unwrap()), "où");
}
