//! Go tokenizer for interactive tooling.
//!
//! Converts raw UTF-8 source into a token stream with Go's automatic
//! semicolon insertion, tracking editor-style (UTF-16 code unit) columns.
//! Identifiers, string literals, and comments are interned into a
//! session-wide [`Interner`] and referenced from tokens by [`Name`] handle.

pub mod intern;
pub mod scanner;
pub mod token;

pub use intern::{known, Interner, Name};
pub use scanner::{tokenize, LexError, LexErrorKind, Scanner};
pub use token::{Token, TokenId, TokenKind};
