//! Hand-written UTF-8 scanner with Go's automatic semicolon insertion.
//!
//! The scanner never fails hard: malformed input produces a best-effort
//! token plus a [`LexError`] describing what was wrong, and scanning
//! continues. Column positions are tracked in UTF-16 code units so that
//! surrogate pairs (code points ≥ U+10000) count as two columns.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::intern::Interner;
use crate::token::{Token, TokenKind};

/// What went wrong while scanning a single token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum LexErrorKind {
    #[error("illegal character")]
    IllegalCharacter,
    #[error("illegal hexadecimal digit")]
    IllegalHexDigit,
    #[error("illegal octal digit")]
    IllegalOctalDigit,
    #[error("illegal binary digit")]
    IllegalBinaryDigit,
    #[error("exponent has no digits")]
    MissingExponentDigits,
    #[error("hexadecimal literal has no digits")]
    MissingHexDigits,
    #[error("hexadecimal float requires an exponent")]
    HexFloatNoExponent,
    #[error("string literal not terminated")]
    UnterminatedString,
    #[error("raw string literal not terminated")]
    UnterminatedRawString,
    #[error("rune literal not terminated")]
    UnterminatedRune,
    #[error("comment not terminated")]
    UnterminatedComment,
    #[error("unknown escape sequence")]
    UnknownEscape,
    #[error("escape is not a valid Unicode code point")]
    InvalidCodePoint,
    #[error("rune literal must contain exactly one character")]
    InvalidRuneLength,
}

/// A lexical error bound to a source position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{line}:{column}: {kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub offset: u32,
    pub line: u32,
    pub column: u32,
    pub length: u32,
}

/// Cursor position snapshot, taken at token start.
#[derive(Debug, Clone, Copy)]
struct Pos {
    offset: usize,
    line: u32,
    column: u32,
}

/// Pull-based scanner over one translation unit's source.
#[derive(Debug)]
pub struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    interner: &'a Interner,
    offset: usize,
    line: u32,
    column: u32,
    insert_semi: bool,
}

impl<'a> Scanner<'a> {
    #[must_use]
    pub fn new(src: &'a str, interner: &'a Interner) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            interner,
            offset: 0,
            line: 1,
            column: 0,
            insert_semi: false,
        }
    }

    // ── Cursor primitives ────────────────────────────────────────────

    fn pos(&self) -> Pos {
        Pos {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.offset).copied()
    }

    fn byte_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(offset).copied()
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.offset..].chars().next()
    }

    /// Advance past one character, updating line and UTF-16 column.
    fn bump(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += ch.len_utf16() as u32;
        }
        Some(ch)
    }

    /// Advance iff the next byte equals `b`.
    fn accept(&mut self, b: u8) -> bool {
        if self.peek_byte() == Some(b) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn utf16_len(&self, start: usize, end: usize) -> u32 {
        self.src[start..end].chars().map(|c| c.len_utf16() as u32).sum()
    }

    fn token_at(&self, kind: TokenKind, start: Pos, name: Option<crate::Name>) -> Token {
        Token {
            kind,
            offset: start.offset as u32,
            byte_len: (self.offset - start.offset) as u32,
            length: self.utf16_len(start.offset, self.offset),
            line: start.line,
            column: start.column,
            name,
        }
    }

    /// Zero-length synthesized semicolon at the current position.
    fn inserted_semi(&mut self) -> Token {
        self.insert_semi = false;
        Token {
            kind: TokenKind::Semicolon,
            offset: self.offset as u32,
            byte_len: 0,
            length: 0,
            line: self.line,
            column: self.column,
            name: None,
        }
    }

    fn error_at(&self, kind: LexErrorKind, start: Pos) -> LexError {
        LexError {
            kind,
            offset: start.offset as u32,
            line: start.line,
            column: start.column,
            length: self.utf16_len(start.offset, self.offset).max(1),
        }
    }

    // ── Main entry ───────────────────────────────────────────────────

    /// Scan the next token. Lexical trouble is reported alongside a
    /// best-effort token; the scanner always makes progress.
    pub fn scan(&mut self) -> (Token, Option<LexError>) {
        loop {
            match self.peek_byte() {
                Some(b' ' | b'\t' | b'\r') => {
                    self.bump();
                }
                Some(b'\n') => {
                    if self.insert_semi {
                        let tok = self.inserted_semi();
                        self.bump();
                        return (tok, None);
                    }
                    self.bump();
                }
                None => {
                    if self.insert_semi {
                        return (self.inserted_semi(), None);
                    }
                    let start = self.pos();
                    return (self.token_at(TokenKind::Eof, start, None), None);
                }
                Some(_) => break,
            }
        }

        let start = self.pos();
        let ch = match self.peek_char() {
            Some(c) => c,
            None => return (self.token_at(TokenKind::Eof, start, None), None),
        };

        if is_letter(ch) {
            return (self.scan_ident_or_keyword(start), None);
        }
        if ch.is_ascii_digit() {
            let (kind, err) = self.scan_number(false);
            let tok = self.token_at(kind, start, None);
            self.update_insert_semi(kind);
            return (tok, err);
        }

        self.bump();
        let mut err = None;
        let mut payload = None;
        let kind = match ch {
            '"' => {
                let (k, n, e) = self.scan_string(start);
                payload = n;
                err = e;
                k
            }
            '`' => {
                let (k, n, e) = self.scan_raw_string(start);
                payload = n;
                err = e;
                k
            }
            '\'' => {
                let (k, n, e) = self.scan_rune(start);
                payload = n;
                err = e;
                k
            }
            '.' => {
                if self.peek_byte().is_some_and(|b| b.is_ascii_digit()) {
                    let (k, e) = self.scan_number(true);
                    err = e;
                    k
                } else if self.peek_byte() == Some(b'.') && self.byte_at(self.offset + 1) == Some(b'.') {
                    self.bump();
                    self.bump();
                    TokenKind::Ellipsis
                } else {
                    TokenKind::Period
                }
            }
            '/' => {
                if self.peek_byte() == Some(b'/') || self.peek_byte() == Some(b'*') {
                    // A comment reaching a line end stands in for the
                    // newline as far as semicolon insertion is concerned.
                    if self.insert_semi && self.find_line_end(start.offset) {
                        self.rewind(start);
                        let tok = self.inserted_semi();
                        return (tok, None);
                    }
                    let (k, e) = self.scan_comment(start);
                    err = e;
                    k
                } else if self.accept(b'=') {
                    TokenKind::QuoAssign
                } else {
                    TokenKind::Quo
                }
            }
            '+' => {
                if self.accept(b'=') {
                    TokenKind::AddAssign
                } else if self.accept(b'+') {
                    TokenKind::Inc
                } else {
                    TokenKind::Add
                }
            }
            '-' => {
                if self.accept(b'=') {
                    TokenKind::SubAssign
                } else if self.accept(b'-') {
                    TokenKind::Dec
                } else {
                    TokenKind::Sub
                }
            }
            '*' => {
                if self.accept(b'=') {
                    TokenKind::MulAssign
                } else {
                    TokenKind::Mul
                }
            }
            '%' => {
                if self.accept(b'=') {
                    TokenKind::RemAssign
                } else {
                    TokenKind::Rem
                }
            }
            '^' => {
                if self.accept(b'=') {
                    TokenKind::XorAssign
                } else {
                    TokenKind::Xor
                }
            }
            '&' => {
                if self.accept(b'&') {
                    TokenKind::LAnd
                } else if self.accept(b'^') {
                    if self.accept(b'=') {
                        TokenKind::AndNotAssign
                    } else {
                        TokenKind::AndNot
                    }
                } else if self.accept(b'=') {
                    TokenKind::AndAssign
                } else {
                    TokenKind::And
                }
            }
            '|' => {
                if self.accept(b'|') {
                    TokenKind::LOr
                } else if self.accept(b'=') {
                    TokenKind::OrAssign
                } else {
                    TokenKind::Or
                }
            }
            '<' => {
                if self.accept(b'-') {
                    TokenKind::Arrow
                } else if self.accept(b'<') {
                    if self.accept(b'=') {
                        TokenKind::ShlAssign
                    } else {
                        TokenKind::Shl
                    }
                } else if self.accept(b'=') {
                    TokenKind::Leq
                } else {
                    TokenKind::Lss
                }
            }
            '>' => {
                if self.accept(b'>') {
                    if self.accept(b'=') {
                        TokenKind::ShrAssign
                    } else {
                        TokenKind::Shr
                    }
                } else if self.accept(b'=') {
                    TokenKind::Geq
                } else {
                    TokenKind::Gtr
                }
            }
            '=' => {
                if self.accept(b'=') {
                    TokenKind::Eql
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                if self.accept(b'=') {
                    TokenKind::Neq
                } else {
                    TokenKind::Not
                }
            }
            ':' => {
                if self.accept(b'=') {
                    TokenKind::Define
                } else {
                    TokenKind::Colon
                }
            }
            '(' => TokenKind::LParen,
            '[' => TokenKind::LBracket,
            '{' => TokenKind::LBrace,
            ')' => TokenKind::RParen,
            ']' => TokenKind::RBracket,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            _ => {
                err = Some(self.error_at(LexErrorKind::IllegalCharacter, start));
                TokenKind::Illegal
            }
        };

        let name = match kind {
            TokenKind::Comment => Some(self.interner.intern(&self.src[start.offset..self.offset])),
            _ => payload,
        };
        let tok = self.token_at(kind, start, name);
        self.update_insert_semi(kind);
        (tok, err)
    }

    fn update_insert_semi(&mut self, kind: TokenKind) {
        match kind {
            // Comments are transparent to semicolon insertion.
            TokenKind::Comment => {}
            _ => self.insert_semi = kind.can_end_statement(),
        }
    }

    /// Reset the cursor to a previously captured position. Only used to
    /// back out of a comment when a semicolon must be emitted first.
    fn rewind(&mut self, pos: Pos) {
        self.offset = pos.offset;
        self.line = pos.line;
        self.column = pos.column;
    }

    // ── Identifiers and keywords ─────────────────────────────────────

    fn scan_ident_or_keyword(&mut self, start: Pos) -> Token {
        // ASCII fast path; bail to the full UTF-8 loop on the first
        // non-ASCII byte.
        while let Some(b) = self.peek_byte() {
            if b.is_ascii_alphanumeric() || b == b'_' {
                self.bump();
            } else if b >= 0x80 {
                while let Some(c) = self.peek_char() {
                    if is_letter(c) || c.is_numeric() {
                        self.bump();
                    } else {
                        break;
                    }
                }
                break;
            } else {
                break;
            }
        }
        let text = &self.src[start.offset..self.offset];
        if let Some(kw) = lookup_keyword(text) {
            let tok = self.token_at(kw, start, None);
            self.update_insert_semi(kw);
            return tok;
        }
        let name = self.interner.intern(text);
        let tok = self.token_at(TokenKind::Ident, start, Some(name));
        self.insert_semi = true;
        tok
    }

    // ── Numeric literals ─────────────────────────────────────────────

    /// Consume a run of digits valid in `base` (underscore separators
    /// allowed), flagging digits that are only valid in a larger base.
    fn digits(&mut self, base: u32, invalid: &mut Option<LexErrorKind>) -> usize {
        let mut count = 0;
        while let Some(b) = self.peek_byte() {
            let ch = b as char;
            if b == b'_' {
                self.bump();
                continue;
            }
            if ch.is_digit(16) || ch.is_ascii_digit() {
                if ch.is_digit(base) {
                    count += 1;
                    self.bump();
                } else if ch.is_ascii_digit() {
                    // Decimal digit out of range for the base, e.g. `0b102`
                    // or `0o78`. Consume it so the literal stays one token.
                    if invalid.is_none() {
                        *invalid = Some(match base {
                            2 => LexErrorKind::IllegalBinaryDigit,
                            8 => LexErrorKind::IllegalOctalDigit,
                            _ => LexErrorKind::IllegalHexDigit,
                        });
                    }
                    count += 1;
                    self.bump();
                } else {
                    break;
                }
            } else {
                break;
            }
        }
        count
    }

    fn scan_number(&mut self, seen_dot: bool) -> (TokenKind, Option<LexError>) {
        let start = Pos {
            offset: self.offset - usize::from(seen_dot),
            line: self.line,
            column: self.column.saturating_sub(u32::from(seen_dot)),
        };
        let mut invalid = None;
        let mut kind = TokenKind::Int;
        let mut base = 10u32;

        if !seen_dot {
            if self.peek_byte() == Some(b'0') {
                self.bump();
                match self.peek_byte() {
                    Some(b'x' | b'X') => {
                        self.bump();
                        base = 16;
                        if self.digits(16, &mut invalid) == 0 {
                            invalid = Some(LexErrorKind::MissingHexDigits);
                        }
                    }
                    Some(b'o' | b'O') => {
                        self.bump();
                        base = 8;
                        self.digits(8, &mut invalid);
                    }
                    Some(b'b' | b'B') => {
                        self.bump();
                        base = 2;
                        self.digits(2, &mut invalid);
                    }
                    _ => {
                        // Legacy octal: `0755`. Digits 8/9 are illegal
                        // unless a decimal point or exponent follows.
                        base = 8;
                        self.digits(10, &mut invalid);
                        if matches!(self.peek_byte(), Some(b'.' | b'e' | b'E' | b'i')) {
                            base = 10;
                            invalid = None;
                        } else if self.src[start.offset..self.offset]
                            .bytes()
                            .any(|b| b == b'8' || b == b'9')
                        {
                            invalid = Some(LexErrorKind::IllegalOctalDigit);
                        }
                    }
                }
            } else {
                self.digits(10, &mut invalid);
            }
        } else {
            kind = TokenKind::Float;
            self.digits(10, &mut invalid);
        }

        // Fractional part.
        if !seen_dot && self.peek_byte() == Some(b'.') && base != 2 && base != 8 {
            kind = TokenKind::Float;
            self.bump();
            self.digits(if base == 16 { 16 } else { 10 }, &mut invalid);
        }

        // Exponent.
        let mut has_exponent = false;
        match (base, self.peek_byte()) {
            (10 | 8, Some(b'e' | b'E')) | (16, Some(b'p' | b'P')) => {
                has_exponent = true;
                kind = TokenKind::Float;
                self.bump();
                if matches!(self.peek_byte(), Some(b'+' | b'-')) {
                    self.bump();
                }
                if self.digits(10, &mut invalid) == 0 && invalid.is_none() {
                    invalid = Some(LexErrorKind::MissingExponentDigits);
                }
            }
            _ => {}
        }
        if base == 16 && kind == TokenKind::Float && !has_exponent && invalid.is_none() {
            invalid = Some(LexErrorKind::HexFloatNoExponent);
        }

        // Imaginary suffix.
        if self.peek_byte() == Some(b'i') {
            self.bump();
            kind = TokenKind::Imag;
        }

        let err = invalid.map(|k| self.error_at(k, start));
        (kind, err)
    }

    // ── String, raw string, and rune literals ────────────────────────

    /// Scan one escape sequence after a consumed backslash. `quote` is the
    /// closing delimiter of the enclosing literal.
    fn scan_escape(&mut self, quote: char) -> Option<LexErrorKind> {
        let (digit_count, base, max) = match self.peek_char() {
            Some(c) if c == quote => {
                self.bump();
                return None;
            }
            Some('a' | 'b' | 'f' | 'n' | 'r' | 't' | 'v' | '\\') => {
                self.bump();
                return None;
            }
            Some('x') => {
                self.bump();
                (2, 16, 0xFF)
            }
            Some('u') => {
                self.bump();
                (4, 16, 0x0010_FFFF)
            }
            Some('U') => {
                self.bump();
                (8, 16, 0x0010_FFFF)
            }
            Some('0'..='7') => (3, 8, 0xFF),
            _ => {
                // Leave the offending character for the caller's loop.
                return Some(LexErrorKind::UnknownEscape);
            }
        };
        let mut value: u32 = 0;
        for _ in 0..digit_count {
            match self.peek_char().and_then(|c| c.to_digit(base)) {
                Some(d) => {
                    value = value * base + d;
                    self.bump();
                }
                None => return Some(LexErrorKind::UnknownEscape),
            }
        }
        if value > max || (0xD800..=0xDFFF).contains(&value) {
            return Some(LexErrorKind::InvalidCodePoint);
        }
        None
    }

    /// Interned payloads for string/raw-string/rune literals cover the
    /// content between the delimiters, with escapes left unprocessed.
    fn scan_string(&mut self, start: Pos) -> (TokenKind, Option<crate::Name>, Option<LexError>) {
        let content_start = self.offset;
        let mut err = None;
        let content_end;
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    if err.is_none() {
                        err = Some(self.error_at(LexErrorKind::UnterminatedString, start));
                    }
                    content_end = self.offset;
                    break;
                }
                Some('"') => {
                    content_end = self.offset;
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    if let Some(kind) = self.scan_escape('"') {
                        if err.is_none() {
                            err = Some(self.error_at(kind, start));
                        }
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let name = self.interner.intern(&self.src[content_start..content_end]);
        (TokenKind::Str, Some(name), err)
    }

    fn scan_raw_string(&mut self, start: Pos) -> (TokenKind, Option<crate::Name>, Option<LexError>) {
        let content_start = self.offset;
        let mut err = None;
        let content_end;
        loop {
            match self.peek_char() {
                None => {
                    err = Some(self.error_at(LexErrorKind::UnterminatedRawString, start));
                    content_end = self.offset;
                    break;
                }
                Some('`') => {
                    content_end = self.offset;
                    self.bump();
                    break;
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
        let name = self.interner.intern(&self.src[content_start..content_end]);
        (TokenKind::Str, Some(name), err)
    }

    fn scan_rune(&mut self, start: Pos) -> (TokenKind, Option<crate::Name>, Option<LexError>) {
        let content_start = self.offset;
        let mut err = None;
        let mut count = 0usize;
        let content_end;
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    err = Some(self.error_at(LexErrorKind::UnterminatedRune, start));
                    content_end = self.offset;
                    break;
                }
                Some('\'') => {
                    content_end = self.offset;
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    count += 1;
                    if let Some(kind) = self.scan_escape('\'') {
                        if err.is_none() {
                            err = Some(self.error_at(kind, start));
                        }
                    }
                }
                Some(_) => {
                    self.bump();
                    count += 1;
                }
            }
        }
        if err.is_none() && count != 1 {
            err = Some(self.error_at(LexErrorKind::InvalidRuneLength, start));
        }
        let name = self.interner.intern(&self.src[content_start..content_end]);
        (TokenKind::Rune, Some(name), err)
    }

    // ── Comments ─────────────────────────────────────────────────────

    fn scan_comment(&mut self, start: Pos) -> (TokenKind, Option<LexError>) {
        if self.accept(b'/') {
            while let Some(b) = self.peek_byte() {
                if b == b'\n' {
                    break;
                }
                self.bump();
            }
            return (TokenKind::Comment, None);
        }
        // Block comment: the opening `*` is next.
        self.bump();
        loop {
            match self.peek_char() {
                None => {
                    return (
                        TokenKind::Comment,
                        Some(self.error_at(LexErrorKind::UnterminatedComment, start)),
                    );
                }
                Some('*') => {
                    self.bump();
                    if self.accept(b'/') {
                        return (TokenKind::Comment, None);
                    }
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    /// Non-consuming look-ahead from a comment's opening `/`: does a line
    /// terminator occur before the next non-comment token? Decides whether
    /// a pending semicolon must be emitted before the comment.
    fn find_line_end(&self, mut offset: usize) -> bool {
        loop {
            if self.byte_at(offset) != Some(b'/') {
                return false;
            }
            match self.byte_at(offset + 1) {
                Some(b'/') => return true, // line comment runs to line end
                Some(b'*') => {
                    offset += 2;
                    loop {
                        match self.byte_at(offset) {
                            None => return true, // unterminated: treat as line end
                            Some(b'\n') => return true,
                            Some(b'*') if self.byte_at(offset + 1) == Some(b'/') => {
                                offset += 2;
                                break;
                            }
                            Some(_) => offset += 1,
                        }
                    }
                }
                _ => return false,
            }
            // Skip blanks between successive comments.
            while matches!(self.byte_at(offset), Some(b' ' | b'\t' | b'\r')) {
                offset += 1;
            }
            match self.byte_at(offset) {
                None | Some(b'\n') => return true,
                Some(b'/') => {}
                Some(_) => return false,
            }
        }
    }
}

// ── Character classes and keywords ───────────────────────────────────

/// Letters per the Go spec: Unicode letters plus underscore.
fn is_letter(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic() || (!c.is_ascii() && c.is_alphabetic())
}

/// Classify the 25 Go keywords by length first, then spelling, avoiding a
/// table lookup in the identifier hot path.
fn lookup_keyword(text: &str) -> Option<TokenKind> {
    let kind = match text.len() {
        2 => match text {
            "if" => TokenKind::If,
            "go" => TokenKind::Go,
            _ => return None,
        },
        3 => match text {
            "for" => TokenKind::For,
            "map" => TokenKind::Map,
            "var" => TokenKind::Var,
            _ => return None,
        },
        4 => match text {
            "case" => TokenKind::Case,
            "chan" => TokenKind::Chan,
            "else" => TokenKind::Else,
            "func" => TokenKind::Func,
            "goto" => TokenKind::Goto,
            "type" => TokenKind::Type,
            _ => return None,
        },
        5 => match text {
            "break" => TokenKind::Break,
            "const" => TokenKind::Const,
            "defer" => TokenKind::Defer,
            "range" => TokenKind::Range,
            _ => return None,
        },
        6 => match text {
            "import" => TokenKind::Import,
            "return" => TokenKind::Return,
            "select" => TokenKind::Select,
            "struct" => TokenKind::Struct,
            "switch" => TokenKind::Switch,
            _ => return None,
        },
        7 => match text {
            "default" => TokenKind::Default,
            "package" => TokenKind::Package,
            _ => return None,
        },
        8 => match text {
            "continue" => TokenKind::Continue,
            _ => return None,
        },
        9 => match text {
            "interface" => TokenKind::Interface,
            _ => return None,
        },
        11 => match text {
            "fallthrough" => TokenKind::Fallthrough,
            _ => return None,
        },
        _ => return None,
    };
    Some(kind)
}

/// Scan a whole translation unit, appending a final `Eof` token.
pub fn tokenize(src: &str, interner: &Interner) -> (Vec<Token>, Vec<LexError>) {
    let mut scanner = Scanner::new(src, interner);
    let mut tokens = Vec::new();
    let mut errors = Vec::new();
    loop {
        let (tok, err) = scanner.scan();
        if let Some(e) = err {
            errors.push(e);
        }
        let done = tok.kind == TokenKind::Eof;
        tokens.push(tok);
        if done {
            break;
        }
    }
    (tokens, errors)
}
