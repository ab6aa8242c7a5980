//! Completion proposals.
//!
//! Two shapes of request: member completion after a `.`, which resolves
//! the receiver chain and enumerates its members, and global completion,
//! which enumerates everything visible at the cursor plus builtins and
//! keywords. Both return plain display records; ranking is the editor's
//! business.

use std::collections::HashSet;
use std::sync::Arc;

use gosling_lexer::{known, Interner, Name, TokenId, TokenKind};
use gosling_parser::{ParsedFile, SymbolKind};
use gosling_types::{proposal_kind, ExprTypeResolver, Proposal, ProposalKind, Snapshot, TyContext};

const KEYWORDS: &[&str] = &[
    "break",
    "case",
    "chan",
    "const",
    "continue",
    "default",
    "defer",
    "else",
    "fallthrough",
    "for",
    "func",
    "go",
    "goto",
    "if",
    "import",
    "interface",
    "map",
    "package",
    "range",
    "return",
    "select",
    "struct",
    "switch",
    "type",
    "var",
];

/// Proposals at a byte offset. `global` distinguishes a fresh-identifier
/// position from an expression-local (member) position.
#[must_use]
pub fn complete_at(
    snapshot: &Snapshot,
    interner: &Interner,
    file: &Arc<ParsedFile>,
    offset: u32,
    global: bool,
) -> Vec<Proposal> {
    let mut out = if global {
        global_proposals(snapshot, interner, file, offset)
    } else {
        member_proposals(snapshot, interner, file, offset)
    };
    dedup_by_text(&mut out);
    out
}

fn dedup_by_text(proposals: &mut Vec<Proposal>) {
    let mut seen = HashSet::new();
    proposals.retain(|p| seen.insert(p.text.clone()));
}

fn prev_non_comment(file: &ParsedFile, from: TokenId) -> Option<TokenId> {
    let mut idx = from.index();
    while idx > 0 {
        idx -= 1;
        if file.tokens[idx].kind != TokenKind::Comment {
            return Some(TokenId(idx as u32));
        }
    }
    None
}

fn member_proposals(
    snapshot: &Snapshot,
    interner: &Interner,
    file: &Arc<ParsedFile>,
    offset: u32,
) -> Vec<Proposal> {
    let Some(at) = file.token_at_offset(offset.saturating_sub(1)) else {
        return Vec::new();
    };
    // Cursor right after `x.` or inside the partial identifier of `x.fo`.
    let base_tok = match file.token(at).kind {
        TokenKind::Period => prev_non_comment(file, at),
        TokenKind::Ident => match prev_non_comment(file, at) {
            Some(dot) if file.token(dot).kind == TokenKind::Period => prev_non_comment(file, dot),
            _ => None,
        },
        _ => None,
    };
    let Some(base_tok) = base_tok else {
        return Vec::new();
    };
    let Some(base) = file.expr_ending_at(base_tok) else {
        return Vec::new();
    };
    let mut resolver = ExprTypeResolver::new(snapshot, interner, file);
    let resolved = resolver.resolve(base);
    if resolved.ref_level != 0 && resolved.ref_level != -1 {
        return Vec::new();
    }
    let cx = TyContext { snapshot, interner };
    let mut out = Vec::new();
    resolved.ty.fill_completions(&cx, &mut out);
    out
}

fn global_proposals(
    snapshot: &Snapshot,
    interner: &Interner,
    file: &Arc<ParsedFile>,
    offset: u32,
) -> Vec<Proposal> {
    let mut out = Vec::new();
    let use_tok = file
        .token_at_offset(offset)
        .unwrap_or(TokenId(0));

    // Scope chain, innermost first so shadowing wins after dedup.
    let mut scope = Some(file.scope_at_offset(offset));
    while let Some(id) = scope {
        let s = file.scopes.scope(id);
        for sym_id in file.scopes.symbols_in(id) {
            let sym = file.scopes.symbol(sym_id);
            if sym.name == known::BLANK {
                continue;
            }
            // Locals declared after the cursor are not candidates.
            if s.kind != gosling_parser::ScopeKind::File && sym.decl_end > use_tok {
                continue;
            }
            out.push(Proposal {
                text: interner.resolve(sym.name).to_string(),
                kind: proposal_kind(sym.kind),
            });
        }
        scope = s.outer;
    }

    // Package-level declarations from sibling files.
    if let Some(pkg) = snapshot.package_of(&file.path) {
        for sibling in &pkg.files {
            if Arc::ptr_eq(sibling, file) {
                continue;
            }
            for sym_id in sibling.scopes.symbols_in(sibling.file_scope) {
                let sym = sibling.scopes.symbol(sym_id);
                if sym.name == known::BLANK || sym.kind == SymbolKind::Package {
                    continue;
                }
                out.push(Proposal {
                    text: interner.resolve(sym.name).to_string(),
                    kind: proposal_kind(sym.kind),
                });
            }
        }
    }

    // Predeclared identifiers; the interner is seeded with all of them.
    for raw in 0..=known::BLANK.0 {
        let name = Name(raw);
        if name == known::BLANK {
            continue;
        }
        let kind = if known::is_builtin_type(name) {
            ProposalKind::Type
        } else if known::is_builtin_func(name) {
            ProposalKind::Builtin
        } else {
            ProposalKind::Const
        };
        out.push(Proposal {
            text: interner.resolve(name).to_string(),
            kind,
        });
    }

    for kw in KEYWORDS {
        out.push(Proposal {
            text: (*kw).to_string(),
            kind: ProposalKind::Keyword,
        });
    }
    out
}
