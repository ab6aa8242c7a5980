//! Recursive-descent Go parser with integrated scope binding.
//!
//! [`parse_file`] turns source text into a [`ParsedFile`]: token sequence,
//! arena-allocated syntax tree, scope/symbol tables, and diagnostics in one
//! immutable unit. Parsing never fails; malformed input produces `Bad*`
//! placeholder nodes and diagnostics instead.

pub mod ast;
pub mod diag;
pub mod parser;
pub mod scope;

pub use ast::{Arena, FileAst, ParseMode, ParsedFile};
pub use diag::{Diagnostic, Severity};
pub use parser::{parse_file, parse_package_file};
pub use scope::{ScopeId, ScopeKind, ScopeTree, Symbol, SymbolId, SymbolKind, SymbolNode};
