//! Go-to-definition.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gosling_lexer::{Interner, TokenId, TokenKind};
use gosling_parser::ast::{ExprId, ExprKind};
use gosling_parser::ParsedFile;
use gosling_types::{
    lookup_in_package, lookup_use, member_site, ExprTypeResolver, Snapshot, TyContext,
};

/// Where a symbol is declared; line 1-based, column 0-based UTF-16.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkTarget {
    pub file: Arc<str>,
    pub line: u32,
    pub column: u32,
}

fn target(file: &ParsedFile, tok: TokenId) -> LinkTarget {
    let t = file.token(tok);
    LinkTarget {
        file: Arc::clone(&file.path),
        line: t.line,
        column: t.column,
    }
}

/// Declaration site of the identifier at `offset`, or `None` when the
/// token is not an identifier or does not resolve.
#[must_use]
pub fn definition_at(
    snapshot: &Snapshot,
    interner: &Interner,
    file: &Arc<ParsedFile>,
    offset: u32,
) -> Option<LinkTarget> {
    let tok_id = file.token_at_offset(offset)?;
    let tok = file.token(tok_id);
    if tok.kind != TokenKind::Ident {
        return None;
    }
    let name = tok.name?;

    // A selector's member lives on the base's type, possibly in another
    // file or package.
    if let Some(base) = selector_base_of(file, tok_id) {
        let mut resolver = ExprTypeResolver::new(snapshot, interner, file);
        let resolved = resolver.resolve(base);
        if resolved.ref_level != 0 && resolved.ref_level != -1 {
            return None;
        }
        let cx = TyContext { snapshot, interner };
        let member = resolved.ty.lookup_member(&cx, name)?;
        let (def_file, def_tok) = member_site(&member);
        return Some(target(&def_file, def_tok));
    }

    if let Some(sym) = lookup_use(file, name, tok_id) {
        return Some(target(file, file.scopes.symbol(sym).decl_tok));
    }
    let cx = TyContext { snapshot, interner };
    let (def_file, sym) = lookup_in_package(&cx, file, name)?;
    let decl_tok = def_file.scopes.symbol(sym).decl_tok;
    Some(target(&def_file, decl_tok))
}

/// Base expression of the selector whose member identifier is `tok`.
fn selector_base_of(file: &ParsedFile, tok: TokenId) -> Option<ExprId> {
    for expr in &file.arena.exprs {
        if let ExprKind::Selector { base, sel_tok, .. } = expr.kind {
            if sel_tok == tok {
                return Some(base);
            }
        }
    }
    None
}
