//! Token model.
//!
//! Tokens are stored in an append-only sequence per translation unit;
//! [`TokenId`] (an index into that sequence) is the universal position
//! reference used throughout the front end. Positions count lines from 1
//! and columns/lengths in UTF-16 code units from 0, matching editor
//! conventions.

use serde::{Deserialize, Serialize};

use crate::intern::Name;

/// Index of a token within its translation unit's token sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TokenId(pub u32);

impl TokenId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The closed set of Go token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Illegal,
    Eof,
    Comment,

    // ── Literals ─────────────────────────────────────────────────────
    Ident,
    Int,
    Float,
    Imag,
    Rune,
    Str,

    // ── Operators and delimiters ─────────────────────────────────────
    Add,      // +
    Sub,      // -
    Mul,      // *
    Quo,      // /
    Rem,      // %
    And,      // &
    Or,       // |
    Xor,      // ^
    Shl,      // <<
    Shr,      // >>
    AndNot,   // &^
    AddAssign,
    SubAssign,
    MulAssign,
    QuoAssign,
    RemAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    ShlAssign,
    ShrAssign,
    AndNotAssign,
    LAnd,     // &&
    LOr,      // ||
    Arrow,    // <-
    Inc,      // ++
    Dec,      // --
    Eql,      // ==
    Lss,      // <
    Gtr,      // >
    Assign,   // =
    Not,      // !
    Neq,      // !=
    Leq,      // <=
    Geq,      // >=
    Define,   // :=
    Ellipsis, // ...
    LParen,
    LBracket,
    LBrace,
    Comma,
    Period,
    RParen,
    RBracket,
    RBrace,
    Semicolon,
    Colon,

    // ── Keywords ─────────────────────────────────────────────────────
    Break,
    Case,
    Chan,
    Const,
    Continue,
    Default,
    Defer,
    Else,
    Fallthrough,
    For,
    Func,
    Go,
    Goto,
    If,
    Import,
    Interface,
    Map,
    Package,
    Range,
    Return,
    Select,
    Struct,
    Switch,
    Type,
    Var,
}

impl TokenKind {
    /// True for the keyword family.
    #[must_use]
    pub fn is_keyword(self) -> bool {
        (self as u32) >= (TokenKind::Break as u32)
    }

    /// True for literal tokens (including identifiers).
    #[must_use]
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Ident
                | TokenKind::Int
                | TokenKind::Float
                | TokenKind::Imag
                | TokenKind::Rune
                | TokenKind::Str
        )
    }

    /// True if a newline directly after this token triggers automatic
    /// semicolon insertion.
    #[must_use]
    pub fn can_end_statement(self) -> bool {
        self.is_literal()
            || matches!(
                self,
                TokenKind::Break
                    | TokenKind::Continue
                    | TokenKind::Fallthrough
                    | TokenKind::Return
                    | TokenKind::Inc
                    | TokenKind::Dec
                    | TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::RBrace
            )
    }

    /// True for assignment operators (`=`, `+=`, ... `&^=`).
    #[must_use]
    pub fn is_assign_op(self) -> bool {
        matches!(
            self,
            TokenKind::Assign
                | TokenKind::AddAssign
                | TokenKind::SubAssign
                | TokenKind::MulAssign
                | TokenKind::QuoAssign
                | TokenKind::RemAssign
                | TokenKind::AndAssign
                | TokenKind::OrAssign
                | TokenKind::XorAssign
                | TokenKind::ShlAssign
                | TokenKind::ShrAssign
                | TokenKind::AndNotAssign
        )
    }

    /// Binary-operator precedence, 0 for non-operators. Level 5 binds
    /// tightest (`*` family), level 1 loosest (`||`).
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            TokenKind::LOr => 1,
            TokenKind::LAnd => 2,
            TokenKind::Eql
            | TokenKind::Neq
            | TokenKind::Lss
            | TokenKind::Leq
            | TokenKind::Gtr
            | TokenKind::Geq => 3,
            TokenKind::Add | TokenKind::Sub | TokenKind::Or | TokenKind::Xor => 4,
            TokenKind::Mul
            | TokenKind::Quo
            | TokenKind::Rem
            | TokenKind::Shl
            | TokenKind::Shr
            | TokenKind::And
            | TokenKind::AndNot => 5,
            _ => 0,
        }
    }

    /// Compound assignment operator → the underlying binary operator.
    #[must_use]
    pub fn assign_base_op(self) -> Option<TokenKind> {
        Some(match self {
            TokenKind::AddAssign => TokenKind::Add,
            TokenKind::SubAssign => TokenKind::Sub,
            TokenKind::MulAssign => TokenKind::Mul,
            TokenKind::QuoAssign => TokenKind::Quo,
            TokenKind::RemAssign => TokenKind::Rem,
            TokenKind::AndAssign => TokenKind::And,
            TokenKind::OrAssign => TokenKind::Or,
            TokenKind::XorAssign => TokenKind::Xor,
            TokenKind::ShlAssign => TokenKind::Shl,
            TokenKind::ShrAssign => TokenKind::Shr,
            TokenKind::AndNotAssign => TokenKind::AndNot,
            _ => return None,
        })
    }

    /// Source spelling for fixed tokens, a family description otherwise.
    #[must_use]
    pub fn text(self) -> &'static str {
        match self {
            TokenKind::Illegal => "illegal token",
            TokenKind::Eof => "end of file",
            TokenKind::Comment => "comment",
            TokenKind::Ident => "identifier",
            TokenKind::Int => "integer literal",
            TokenKind::Float => "float literal",
            TokenKind::Imag => "imaginary literal",
            TokenKind::Rune => "rune literal",
            TokenKind::Str => "string literal",
            TokenKind::Add => "+",
            TokenKind::Sub => "-",
            TokenKind::Mul => "*",
            TokenKind::Quo => "/",
            TokenKind::Rem => "%",
            TokenKind::And => "&",
            TokenKind::Or => "|",
            TokenKind::Xor => "^",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::AndNot => "&^",
            TokenKind::AddAssign => "+=",
            TokenKind::SubAssign => "-=",
            TokenKind::MulAssign => "*=",
            TokenKind::QuoAssign => "/=",
            TokenKind::RemAssign => "%=",
            TokenKind::AndAssign => "&=",
            TokenKind::OrAssign => "|=",
            TokenKind::XorAssign => "^=",
            TokenKind::ShlAssign => "<<=",
            TokenKind::ShrAssign => ">>=",
            TokenKind::AndNotAssign => "&^=",
            TokenKind::LAnd => "&&",
            TokenKind::LOr => "||",
            TokenKind::Arrow => "<-",
            TokenKind::Inc => "++",
            TokenKind::Dec => "--",
            TokenKind::Eql => "==",
            TokenKind::Lss => "<",
            TokenKind::Gtr => ">",
            TokenKind::Assign => "=",
            TokenKind::Not => "!",
            TokenKind::Neq => "!=",
            TokenKind::Leq => "<=",
            TokenKind::Geq => ">=",
            TokenKind::Define => ":=",
            TokenKind::Ellipsis => "...",
            TokenKind::LParen => "(",
            TokenKind::LBracket => "[",
            TokenKind::LBrace => "{",
            TokenKind::Comma => ",",
            TokenKind::Period => ".",
            TokenKind::RParen => ")",
            TokenKind::RBracket => "]",
            TokenKind::RBrace => "}",
            TokenKind::Semicolon => ";",
            TokenKind::Colon => ":",
            TokenKind::Break => "break",
            TokenKind::Case => "case",
            TokenKind::Chan => "chan",
            TokenKind::Const => "const",
            TokenKind::Continue => "continue",
            TokenKind::Default => "default",
            TokenKind::Defer => "defer",
            TokenKind::Else => "else",
            TokenKind::Fallthrough => "fallthrough",
            TokenKind::For => "for",
            TokenKind::Func => "func",
            TokenKind::Go => "go",
            TokenKind::Goto => "goto",
            TokenKind::If => "if",
            TokenKind::Import => "import",
            TokenKind::Interface => "interface",
            TokenKind::Map => "map",
            TokenKind::Package => "package",
            TokenKind::Range => "range",
            TokenKind::Return => "return",
            TokenKind::Select => "select",
            TokenKind::Struct => "struct",
            TokenKind::Switch => "switch",
            TokenKind::Type => "type",
            TokenKind::Var => "var",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.text())
    }
}

/// One scanned token. An inserted semicolon has zero length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first byte in the source.
    pub offset: u32,
    /// Length in bytes.
    pub byte_len: u32,
    /// Length in UTF-16 code units (editor convention).
    pub length: u32,
    /// 1-based source line.
    pub line: u32,
    /// 0-based column in UTF-16 code units.
    pub column: u32,
    /// Interned payload for identifiers, string/rune literals, and comments.
    pub name: Option<Name>,
}

impl Token {
    /// End byte offset, exclusive.
    #[must_use]
    pub fn end_offset(self) -> u32 {
        self.offset + self.byte_len
    }

    /// Whether `byte_offset` falls within this token's source span.
    #[must_use]
    pub fn contains_offset(self, byte_offset: u32) -> bool {
        byte_offset >= self.offset && byte_offset < self.end_offset()
    }
}
