//! On-demand expression type resolution.
//!
//! Nothing here is precomputed: [`ExprTypeResolver::resolve`] walks one
//! expression recursively, looking symbols up through the scope chain and
//! the snapshot as it goes. Every rule returns a [`ResolvedTy`]; failures
//! yield `Ty::Unresolved` rather than errors, since most resolutions run
//! over code the user is still typing.
//!
//! Pointer indirection is carried entirely in `ref_level`: `&x` shifts by
//! -1, `*x` by +1, and member access is legal at levels 0 and -1 (Go's
//! single implicit dereference). Declared pointer types fold into the
//! level when the type expression is resolved, so `var p **T` makes `p`
//! resolve to `T` at level -2.

use std::sync::Arc;

use gosling_lexer::{known, Interner, Name, TokenId, TokenKind};
use gosling_parser::ast::{
    ArrayLen, ChanDir, ExprId, ExprKind, InterfaceElem, SpecKind, StmtKind, TypeExprId,
    TypeExprKind,
};
use gosling_parser::{ParsedFile, SymbolId, SymbolKind, SymbolNode};

use crate::snapshot::Snapshot;
use crate::ty::{
    type_base_name, Member, Proposal, ProposalKind, ResolvedTy, Ty, TyContext, MAX_MEMBER_DEPTH,
};

/// Recursion bound for symbol-type chains (`var a = b; var b = a` at
/// package level would otherwise never terminate).
const MAX_SYMBOL_DEPTH: u32 = 32;

/// First character uppercase, Go's export rule.
#[must_use]
pub fn is_exported(interner: &Interner, name: Name) -> bool {
    interner
        .resolve(name)
        .chars()
        .next()
        .map_or(false, char::is_uppercase)
}

/// Completion icon for a symbol kind.
#[must_use]
pub fn proposal_kind(kind: SymbolKind) -> ProposalKind {
    match kind {
        SymbolKind::Package => ProposalKind::Package,
        SymbolKind::Const => ProposalKind::Const,
        SymbolKind::Type => ProposalKind::Type,
        SymbolKind::Var => ProposalKind::Var,
        SymbolKind::Func | SymbolKind::Method => ProposalKind::Func,
        SymbolKind::Field => ProposalKind::Field,
        SymbolKind::Arg => ProposalKind::Arg,
        SymbolKind::Label => ProposalKind::Label,
    }
}

// ── Type expressions ─────────────────────────────────────────────────

/// Resolve a type expression into a [`ResolvedTy`], folding pointer and
/// paren wrappers into the indirection level.
#[must_use]
pub fn resolve_type_expr(cx: &TyContext<'_>, file: &Arc<ParsedFile>, id: TypeExprId) -> ResolvedTy {
    type_expr_ty(cx, file, id, MAX_SYMBOL_DEPTH)
}

pub(crate) fn type_expr_ty(
    cx: &TyContext<'_>,
    file: &Arc<ParsedFile>,
    id: TypeExprId,
    depth: u32,
) -> ResolvedTy {
    if depth == 0 {
        return ResolvedTy::unresolved();
    }
    match &file.arena.type_expr(id).kind {
        TypeExprKind::Bad => ResolvedTy::unresolved(),
        TypeExprKind::Paren { inner } => type_expr_ty(cx, file, *inner, depth - 1),
        TypeExprKind::Pointer { elem } => type_expr_ty(cx, file, *elem, depth - 1).shifted(-1),
        TypeExprKind::Name { package, ident } => {
            let ident = *ident;
            if let Some(pkg) = package {
                return qualified_type(cx, file, pkg.name, ident.name);
            }
            // A local declaration may shadow a builtin type name.
            if let Some(sym) = lookup_use(file, ident.name, ident.tok) {
                return named_from_symbol(file, sym);
            }
            if let Some((tfile, sym)) = lookup_in_package(cx, file, ident.name) {
                return named_from_symbol(&tfile, sym);
            }
            if known::is_builtin_type(ident.name) {
                return ResolvedTy::value(Ty::Builtin(ident.name));
            }
            ResolvedTy::unresolved()
        }
        _ => ResolvedTy::value(Ty::Node {
            file: Arc::clone(file),
            id,
        }),
    }
}

fn qualified_type(
    cx: &TyContext<'_>,
    file: &Arc<ParsedFile>,
    alias: Name,
    type_name: Name,
) -> ResolvedTy {
    let Some(key) = cx.snapshot.package_for_alias(file, alias) else {
        return ResolvedTy::unresolved();
    };
    match cx.snapshot.find_package_symbol(&key, type_name) {
        Some((tfile, sym)) if is_exported(cx.interner, type_name) => named_from_symbol(&tfile, sym),
        _ => ResolvedTy::unresolved(),
    }
}

fn named_from_symbol(file: &Arc<ParsedFile>, sym: SymbolId) -> ResolvedTy {
    let symbol = file.scopes.symbol(sym);
    if symbol.kind != SymbolKind::Type {
        return ResolvedTy::unresolved();
    }
    match symbol.node {
        SymbolNode::Spec { spec, .. } => ResolvedTy::value(Ty::Named {
            file: Arc::clone(file),
            spec,
        }),
        _ => ResolvedTy::unresolved(),
    }
}

/// Ordered, visibility-aware symbol lookup for an identifier use.
#[must_use]
pub fn lookup_use(file: &ParsedFile, name: Name, tok: TokenId) -> Option<SymbolId> {
    let offset = file.token(tok).offset;
    let scope = file.scope_at_offset(offset);
    file.scopes.find_visible(scope, name, tok)
}

/// Package-level symbol declared in a sibling file of the same package.
/// Declaration order is irrelevant at package level, so this is a plain
/// table lookup across file scopes.
#[must_use]
pub fn lookup_in_package(
    cx: &TyContext<'_>,
    file: &Arc<ParsedFile>,
    name: Name,
) -> Option<(Arc<ParsedFile>, SymbolId)> {
    let pkg = cx.snapshot.package_of(&file.path)?;
    for sibling in &pkg.files {
        if Arc::ptr_eq(sibling, file) {
            continue;
        }
        if let Some(sym) = sibling.scopes.find(sibling.file_scope, name) {
            return Some((Arc::clone(sibling), sym));
        }
    }
    None
}

/// Unwrap named types down to a structural type while the indirection
/// level stays 0. Stops after `depth` unwraps.
pub(crate) fn underlying_of(cx: &TyContext<'_>, ty: &Ty, depth: u32) -> ResolvedTy {
    let mut current = ResolvedTy::value(ty.clone());
    for _ in 0..depth {
        match &current.ty {
            Ty::Named { .. } if current.ref_level == 0 => {
                current = current.ty.underlying(cx);
            }
            _ => break,
        }
    }
    current
}

// ── Capability queries ───────────────────────────────────────────────

pub(crate) fn index_ty(cx: &TyContext<'_>, ty: &Ty, depth: u32) -> ResolvedTy {
    let base = underlying_of(cx, ty, depth);
    if base.ref_level != 0 {
        return ResolvedTy::unresolved();
    }
    match &base.ty {
        Ty::Builtin(name) if *name == known::STRING => ResolvedTy::value(Ty::Builtin(known::BYTE)),
        Ty::Node { file, id } => match &file.arena.type_expr(*id).kind {
            TypeExprKind::Array { elem, .. } | TypeExprKind::Variadic { elem } => {
                type_expr_ty(cx, file, *elem, MAX_SYMBOL_DEPTH).addressable(true)
            }
            // Map values are not addressable.
            TypeExprKind::Map { value, .. } => type_expr_ty(cx, file, *value, MAX_SYMBOL_DEPTH),
            _ => ResolvedTy::unresolved(),
        },
        _ => ResolvedTy::unresolved(),
    }
}

pub(crate) fn elements_ty(cx: &TyContext<'_>, ty: &Ty, depth: u32) -> ResolvedTy {
    let base = underlying_of(cx, ty, depth);
    if base.ref_level != 0 {
        return ResolvedTy::unresolved();
    }
    match &base.ty {
        Ty::Node { file, id } => match &file.arena.type_expr(*id).kind {
            TypeExprKind::Array { elem, .. }
            | TypeExprKind::Variadic { elem }
            | TypeExprKind::Chan { elem, .. } => type_expr_ty(cx, file, *elem, MAX_SYMBOL_DEPTH),
            TypeExprKind::Map { value, .. } => type_expr_ty(cx, file, *value, MAX_SYMBOL_DEPTH),
            _ => ResolvedTy::unresolved(),
        },
        _ => ResolvedTy::unresolved(),
    }
}

pub(crate) fn call_ty(cx: &TyContext<'_>, ty: &Ty, depth: u32) -> ResolvedTy {
    let Some((file, sig)) = func_sig_of(cx, ty, depth) else {
        return ResolvedTy::unresolved();
    };
    let TypeExprKind::Func(fsig) = &file.arena.type_expr(sig).kind else {
        return ResolvedTy::unresolved();
    };
    let mut results = Vec::new();
    for field in &fsig.results {
        let count = field.names.len().max(1);
        for _ in 0..count {
            results.push(type_expr_ty(cx, &file, field.ty, MAX_SYMBOL_DEPTH));
        }
    }
    match results.len() {
        0 => ResolvedTy::value(Ty::Void),
        1 => results.pop().unwrap_or_else(ResolvedTy::unresolved),
        _ => ResolvedTy::value(Ty::Tuple(results.into())),
    }
}

pub(crate) fn chan_value_ty(cx: &TyContext<'_>, ty: &Ty, depth: u32) -> ResolvedTy {
    let base = underlying_of(cx, ty, depth);
    if base.ref_level != 0 {
        return ResolvedTy::unresolved();
    }
    match &base.ty {
        Ty::Node { file, id } => match &file.arena.type_expr(*id).kind {
            TypeExprKind::Chan { elem, dir } if *dir != ChanDir::Send => {
                type_expr_ty(cx, file, *elem, MAX_SYMBOL_DEPTH)
            }
            _ => ResolvedTy::unresolved(),
        },
        _ => ResolvedTy::unresolved(),
    }
}

/// Function signature behind a type, unwrapping named types.
#[must_use]
pub fn func_sig_of(
    cx: &TyContext<'_>,
    ty: &Ty,
    depth: u32,
) -> Option<(Arc<ParsedFile>, TypeExprId)> {
    let base = underlying_of(cx, ty, depth);
    if base.ref_level != 0 {
        return None;
    }
    match &base.ty {
        Ty::Node { file, id } => match &file.arena.type_expr(*id).kind {
            TypeExprKind::Func(_) => Some((Arc::clone(file), *id)),
            _ => None,
        },
        _ => None,
    }
}

// ── Member lookup ────────────────────────────────────────────────────

pub(crate) fn lookup_member(
    cx: &TyContext<'_>,
    ty: &Ty,
    name: Name,
    depth: u32,
) -> Option<Member> {
    if depth == 0 {
        return None;
    }
    match ty {
        Ty::Package(key) => {
            if !is_exported(cx.interner, name) {
                return None;
            }
            let (file, symbol) = cx.snapshot.find_package_symbol(key, name)?;
            Some(Member::PackageSym { file, symbol })
        }
        Ty::Named { file, spec } => {
            let SpecKind::Type(ts) = &file.arena.spec(*spec).kind else {
                return None;
            };
            let type_name = ts.name.name;
            if let Some(found) = find_method_of(cx, file, type_name, name) {
                return Some(found);
            }
            let under = ty.underlying(cx);
            if under.ref_level == 0 || under.ref_level == -1 {
                return lookup_member(cx, &under.ty, name, depth - 1);
            }
            None
        }
        Ty::Node { file, id } => match &file.arena.type_expr(*id).kind {
            TypeExprKind::Struct { fields } => {
                for field in fields {
                    for n in &field.names {
                        if n.name == name {
                            return Some(Member::Field {
                                file: Arc::clone(file),
                                name_tok: n.tok,
                                ty: field.ty,
                            });
                        }
                    }
                    if field.embedded {
                        if let Some((base, tok)) = type_base_name(file, field.ty) {
                            if base == name {
                                return Some(Member::Field {
                                    file: Arc::clone(file),
                                    name_tok: tok,
                                    ty: field.ty,
                                });
                            }
                        }
                    }
                }
                // Promoted members of embedded fields.
                for field in fields {
                    if !field.embedded {
                        continue;
                    }
                    let et = type_expr_ty(cx, file, field.ty, MAX_SYMBOL_DEPTH);
                    if et.ref_level == 0 || et.ref_level == -1 {
                        if let Some(found) = lookup_member(cx, &et.ty, name, depth - 1) {
                            return Some(found);
                        }
                    }
                }
                None
            }
            TypeExprKind::Interface { elems } => {
                for elem in elems {
                    match elem {
                        InterfaceElem::Method { name: m, sig } if m.name == name => {
                            return Some(Member::IfaceMethod {
                                file: Arc::clone(file),
                                name_tok: m.tok,
                                sig: *sig,
                            });
                        }
                        InterfaceElem::Method { .. } => {}
                        InterfaceElem::Embedded(te) => {
                            let et = type_expr_ty(cx, file, *te, MAX_SYMBOL_DEPTH);
                            if et.ref_level == 0 {
                                if let Some(found) = lookup_member(cx, &et.ty, name, depth - 1) {
                                    return Some(found);
                                }
                            }
                        }
                    }
                }
                None
            }
            _ => None,
        },
        _ => None,
    }
}

/// Method of a named type, searched across all files of its package.
fn find_method_of(
    cx: &TyContext<'_>,
    file: &Arc<ParsedFile>,
    type_name: Name,
    method: Name,
) -> Option<Member> {
    if let Some(pkg) = cx.snapshot.package_of(&file.path) {
        let (mfile, decl) = cx.snapshot.find_method(&pkg.key, type_name, method)?;
        return Some(Member::Method { file: mfile, decl });
    }
    // File not registered in any snapshot: its own map still applies.
    let decl = *file.methods.get(&(type_name, method))?;
    Some(Member::Method {
        file: Arc::clone(file),
        decl,
    })
}

/// Does the method declaration take a pointer receiver?
#[must_use]
pub fn method_has_pointer_receiver(file: &ParsedFile, decl: gosling_parser::ast::DeclId) -> bool {
    let gosling_parser::ast::DeclKind::Func(fd) = &file.arena.decl(decl).kind else {
        return false;
    };
    let Some(recv) = &fd.recv else {
        return false;
    };
    let mut id = recv.ty;
    loop {
        match &file.arena.type_expr(id).kind {
            TypeExprKind::Paren { inner } => id = *inner,
            TypeExprKind::Pointer { .. } => return true,
            _ => return false,
        }
    }
}

/// Declaring file and identifier token of a member, for navigation.
#[must_use]
pub fn member_site(member: &Member) -> (Arc<ParsedFile>, TokenId) {
    match member {
        Member::Field { file, name_tok, .. } | Member::IfaceMethod { file, name_tok, .. } => {
            (Arc::clone(file), *name_tok)
        }
        Member::Method { file, decl } => {
            let tok = match &file.arena.decl(*decl).kind {
                gosling_parser::ast::DeclKind::Func(fd) => fd.name.tok,
                _ => file.arena.decl(*decl).range.first,
            };
            (Arc::clone(file), tok)
        }
        Member::PackageSym { file, symbol } => {
            (Arc::clone(file), file.scopes.symbol(*symbol).decl_tok)
        }
    }
}

// ── Completion ───────────────────────────────────────────────────────

pub(crate) fn fill_completions(
    cx: &TyContext<'_>,
    ty: &Ty,
    out: &mut Vec<Proposal>,
    depth: u32,
) {
    if depth == 0 {
        return;
    }
    match ty {
        Ty::Package(key) => {
            let Some(pkg) = cx.snapshot.package(key) else {
                return;
            };
            for file in &pkg.files {
                for sym_id in file.scopes.symbols_in(file.file_scope) {
                    let sym = file.scopes.symbol(sym_id);
                    if sym.kind == SymbolKind::Package || !is_exported(cx.interner, sym.name) {
                        continue;
                    }
                    out.push(Proposal {
                        text: cx.interner.resolve(sym.name).to_string(),
                        kind: proposal_kind(sym.kind),
                    });
                }
            }
        }
        Ty::Named { file, spec } => {
            if let SpecKind::Type(ts) = &file.arena.spec(*spec).kind {
                let type_name = ts.name.name;
                let files: Vec<Arc<ParsedFile>> = match cx.snapshot.package_of(&file.path) {
                    Some(pkg) => pkg.files.clone(),
                    None => vec![Arc::clone(file)],
                };
                for f in files {
                    for (&(recv, method), _) in &f.methods {
                        if recv == type_name {
                            out.push(Proposal {
                                text: cx.interner.resolve(method).to_string(),
                                kind: ProposalKind::Func,
                            });
                        }
                    }
                }
            }
            let under = ty.underlying(cx);
            if under.ref_level == 0 || under.ref_level == -1 {
                fill_completions(cx, &under.ty, out, depth - 1);
            }
        }
        Ty::Node { file, id } => match &file.arena.type_expr(*id).kind {
            TypeExprKind::Struct { fields } => {
                for field in fields {
                    for n in &field.names {
                        out.push(Proposal {
                            text: cx.interner.resolve(n.name).to_string(),
                            kind: ProposalKind::Field,
                        });
                    }
                    if field.embedded {
                        if let Some((base, _)) = type_base_name(file, field.ty) {
                            out.push(Proposal {
                                text: cx.interner.resolve(base).to_string(),
                                kind: ProposalKind::Field,
                            });
                        }
                        let et = type_expr_ty(cx, file, field.ty, MAX_SYMBOL_DEPTH);
                        if et.ref_level == 0 || et.ref_level == -1 {
                            fill_completions(cx, &et.ty, out, depth - 1);
                        }
                    }
                }
            }
            TypeExprKind::Interface { elems } => {
                for elem in elems {
                    match elem {
                        InterfaceElem::Method { name, .. } => out.push(Proposal {
                            text: cx.interner.resolve(name.name).to_string(),
                            kind: ProposalKind::Func,
                        }),
                        InterfaceElem::Embedded(te) => {
                            let et = type_expr_ty(cx, file, *te, MAX_SYMBOL_DEPTH);
                            if et.ref_level == 0 {
                                fill_completions(cx, &et.ty, out, depth - 1);
                            }
                        }
                    }
                }
            }
            _ => {}
        },
        _ => {}
    }
}

// ── Formatting ───────────────────────────────────────────────────────

pub(crate) fn describe_type_expr(
    cx: &TyContext<'_>,
    file: &ParsedFile,
    id: TypeExprId,
    depth: u32,
) -> String {
    if depth == 0 {
        return "...".into();
    }
    match &file.arena.type_expr(id).kind {
        TypeExprKind::Bad => "?".into(),
        TypeExprKind::Name { package, ident } => match package {
            Some(p) => format!(
                "{}.{}",
                cx.interner.resolve(p.name),
                cx.interner.resolve(ident.name)
            ),
            None => cx.interner.resolve(ident.name).to_string(),
        },
        TypeExprKind::Pointer { elem } => {
            format!("*{}", describe_type_expr(cx, file, *elem, depth - 1))
        }
        TypeExprKind::Array { len, elem } => {
            let elem = describe_type_expr(cx, file, *elem, depth - 1);
            match len {
                ArrayLen::Slice => format!("[]{elem}"),
                ArrayLen::Ellipsis => format!("[...]{elem}"),
                ArrayLen::Fixed(n) => {
                    let (lo, hi) = file.byte_span(file.arena.expr(*n).range);
                    format!("[{}]{elem}", &file.source[lo as usize..hi as usize])
                }
            }
        }
        TypeExprKind::Struct { .. } => "struct{...}".into(),
        TypeExprKind::Interface { elems } if elems.is_empty() => "interface{}".into(),
        TypeExprKind::Interface { .. } => "interface{...}".into(),
        TypeExprKind::Map { key, value } => format!(
            "map[{}]{}",
            describe_type_expr(cx, file, *key, depth - 1),
            describe_type_expr(cx, file, *value, depth - 1)
        ),
        TypeExprKind::Chan { dir, elem } => {
            let elem = describe_type_expr(cx, file, *elem, depth - 1);
            match dir {
                ChanDir::Both => format!("chan {elem}"),
                ChanDir::Send => format!("chan<- {elem}"),
                ChanDir::Recv => format!("<-chan {elem}"),
            }
        }
        TypeExprKind::Func(sig) => {
            let mut s = String::from("func(");
            let mut first = true;
            for field in &sig.params {
                let count = field.names.len().max(1);
                for _ in 0..count {
                    if !first {
                        s.push_str(", ");
                    }
                    first = false;
                    s.push_str(&describe_type_expr(cx, file, field.ty, depth - 1));
                }
            }
            s.push(')');
            let mut results = Vec::new();
            for field in &sig.results {
                let count = field.names.len().max(1);
                for _ in 0..count {
                    results.push(describe_type_expr(cx, file, field.ty, depth - 1));
                }
            }
            match results.len() {
                0 => {}
                1 => {
                    s.push(' ');
                    s.push_str(&results[0]);
                }
                _ => {
                    s.push_str(" (");
                    s.push_str(&results.join(", "));
                    s.push(')');
                }
            }
            s
        }
        TypeExprKind::Paren { inner } => {
            format!("({})", describe_type_expr(cx, file, *inner, depth - 1))
        }
        TypeExprKind::Variadic { elem } => {
            format!("...{}", describe_type_expr(cx, file, *elem, depth - 1))
        }
    }
}

// ── Expression resolver ──────────────────────────────────────────────

/// Lazy per-expression type computation over one file, consulting the
/// snapshot for anything that crosses a file or package boundary.
pub struct ExprTypeResolver<'a> {
    snapshot: &'a Snapshot,
    interner: &'a Interner,
    file: &'a Arc<ParsedFile>,
    /// Types of enclosing composite literals, innermost last; drives
    /// inference for nested untyped `{...}` literals.
    lit_stack: Vec<Ty>,
    fuel: u32,
}

impl<'a> ExprTypeResolver<'a> {
    #[must_use]
    pub fn new(snapshot: &'a Snapshot, interner: &'a Interner, file: &'a Arc<ParsedFile>) -> Self {
        Self {
            snapshot,
            interner,
            file,
            lit_stack: Vec::new(),
            fuel: MAX_SYMBOL_DEPTH,
        }
    }

    #[must_use]
    pub fn cx(&self) -> TyContext<'a> {
        TyContext {
            snapshot: self.snapshot,
            interner: self.interner,
        }
    }

    /// Walk support: record the element type of a composite literal being
    /// entered, so nested untyped literals can infer their type.
    pub fn push_literal_ty(&mut self, ty: Ty) {
        self.lit_stack.push(ty);
    }

    pub fn pop_literal_ty(&mut self) {
        self.lit_stack.pop();
    }

    /// Type of an expression in this resolver's file.
    #[must_use]
    pub fn resolve(&mut self, expr: ExprId) -> ResolvedTy {
        let kind = self.file.arena.expr(expr).kind.clone();
        match kind {
            ExprKind::Bad => ResolvedTy::unresolved(),
            ExprKind::Ident(b) => self.resolve_ident(b.name, b.tok, b.symbol),
            ExprKind::BasicLit { kind, .. } => ResolvedTy::value(match kind {
                TokenKind::Int | TokenKind::Rune => Ty::Integral,
                TokenKind::Float => Ty::Builtin(known::FLOAT64),
                TokenKind::Imag => Ty::Builtin(known::COMPLEX128),
                TokenKind::Str => Ty::Builtin(known::STRING),
                _ => Ty::Unresolved,
            }),
            ExprKind::FuncLit { sig, .. } => ResolvedTy::value(Ty::Node {
                file: Arc::clone(self.file),
                id: sig,
            }),
            ExprKind::CompositeLit { ty, .. } => match ty {
                Some(te) => {
                    let t = type_expr_ty(&self.cx(), self.file, te, MAX_SYMBOL_DEPTH);
                    ResolvedTy::with_level(t.ty, t.ref_level)
                }
                // Untyped nested literal: element type of the enclosing one.
                None => match self.lit_stack.last().cloned() {
                    Some(outer) => outer.elements_ty(&self.cx()),
                    None => ResolvedTy::unresolved(),
                },
            },
            ExprKind::KeyValue { value, .. } => self.resolve(value),
            ExprKind::Paren { inner } => self.resolve(inner),
            ExprKind::Selector { base, sel, .. } => self.resolve_selector(base, sel),
            ExprKind::Index { base, .. } => {
                let base = self.resolve(base);
                let base = self.auto_deref(base);
                if base.ref_level != 0 {
                    return ResolvedTy::unresolved();
                }
                base.ty.index_ty(&self.cx())
            }
            ExprKind::Slice { base, .. } => {
                let base = self.resolve(base);
                let base = self.auto_deref(base);
                if base.ref_level != 0 {
                    return ResolvedTy::unresolved();
                }
                ResolvedTy::value(base.ty)
            }
            ExprKind::TypeAssert { base, ty } => match ty {
                Some(te) => type_expr_ty(&self.cx(), self.file, te, MAX_SYMBOL_DEPTH),
                None => self.resolve(base),
            },
            ExprKind::Call {
                callee, ref args, ..
            } => self.resolve_call(callee, args),
            ExprKind::Star { operand } => {
                if let Some(t) = self.type_operand(operand) {
                    // Pointer type in expression position.
                    return t.shifted(-1);
                }
                let v = self.resolve(operand);
                if v.is_resolved() && v.ref_level < 0 {
                    v.shifted(1).addressable(true)
                } else {
                    ResolvedTy::unresolved()
                }
            }
            ExprKind::Unary { op, operand } => match op {
                TokenKind::And => self.resolve(operand).shifted(-1).addressable(false),
                TokenKind::Arrow => {
                    let v = self.resolve(operand);
                    let v = self.auto_deref(v);
                    if v.ref_level == 0 {
                        v.ty.chan_value_ty(&self.cx())
                    } else {
                        ResolvedTy::unresolved()
                    }
                }
                TokenKind::Not => ResolvedTy::value(Ty::Builtin(known::BOOL)),
                _ => {
                    let v = self.resolve(operand);
                    ResolvedTy::with_level(v.ty, v.ref_level)
                }
            },
            ExprKind::Binary { op, left, right } => match op {
                TokenKind::Eql
                | TokenKind::Neq
                | TokenKind::Lss
                | TokenKind::Leq
                | TokenKind::Gtr
                | TokenKind::Geq
                | TokenKind::LAnd
                | TokenKind::LOr => ResolvedTy::value(Ty::Builtin(known::BOOL)),
                _ => {
                    let l = self.resolve(left);
                    if l.is_resolved() {
                        ResolvedTy::with_level(l.ty, l.ref_level)
                    } else {
                        let r = self.resolve(right);
                        ResolvedTy::with_level(r.ty, r.ref_level)
                    }
                }
            },
            ExprKind::Type { ty } => type_expr_ty(&self.cx(), self.file, ty, MAX_SYMBOL_DEPTH),
        }
    }

    /// Apply Go's single implicit dereference: a -1 value is usable as a
    /// value and the result is addressable (it lives behind the pointer).
    fn auto_deref(&self, v: ResolvedTy) -> ResolvedTy {
        if v.ref_level == -1 {
            v.shifted(1).addressable(true)
        } else {
            v
        }
    }

    fn resolve_ident(&mut self, name: Name, tok: TokenId, bound: Option<SymbolId>) -> ResolvedTy {
        if let Some(sym) = bound.or_else(|| lookup_use(self.file, name, tok)) {
            let file = Arc::clone(self.file);
            return self.symbol_ty(&file, sym);
        }
        if let Some((tfile, sym)) = lookup_in_package(&self.cx(), self.file, name) {
            return self.symbol_ty(&tfile, sym);
        }
        match name {
            known::TRUE | known::FALSE => ResolvedTy::value(Ty::Builtin(known::BOOL)),
            known::IOTA => ResolvedTy::value(Ty::Integral),
            _ if known::is_builtin_type(name) => ResolvedTy::value(Ty::Builtin(name)),
            _ => ResolvedTy::unresolved(),
        }
    }

    fn resolve_selector(&mut self, base: ExprId, sel: Name) -> ResolvedTy {
        let base_ty = self.resolve(base);
        if base_ty.ref_level != 0 && base_ty.ref_level != -1 {
            return ResolvedTy::unresolved();
        }
        let Some(member) = base_ty.ty.lookup_member(&self.cx(), sel) else {
            return ResolvedTy::unresolved();
        };
        self.member_ty(&member, &base_ty)
    }

    /// Type of a found member, given the base it was selected from.
    pub fn member_ty(&mut self, member: &Member, base: &ResolvedTy) -> ResolvedTy {
        match member {
            Member::Field { file, ty, .. } => {
                let t = type_expr_ty(&self.cx(), file, *ty, MAX_SYMBOL_DEPTH);
                // Field of a pointer or addressable base is addressable.
                let addr = base.addressable || base.ref_level == -1;
                t.addressable(addr)
            }
            Member::Method { file, decl } => {
                // Pointer-receiver methods need a pointer or something the
                // compiler can take the address of.
                if method_has_pointer_receiver(file, *decl)
                    && base.ref_level != -1
                    && !base.addressable
                {
                    return ResolvedTy::unresolved();
                }
                match &file.arena.decl(*decl).kind {
                    gosling_parser::ast::DeclKind::Func(fd) => ResolvedTy::value(Ty::Node {
                        file: Arc::clone(file),
                        id: fd.sig,
                    }),
                    _ => ResolvedTy::unresolved(),
                }
            }
            Member::IfaceMethod { file, sig, .. } => ResolvedTy::value(Ty::Node {
                file: Arc::clone(file),
                id: *sig,
            }),
            Member::PackageSym { file, symbol } => {
                let file = Arc::clone(file);
                self.symbol_ty(&file, *symbol)
            }
        }
    }

    fn resolve_call(&mut self, callee: ExprId, args: &[ExprId]) -> ResolvedTy {
        // Builtin pseudo-functions, unless shadowed by a declaration.
        if let ExprKind::Ident(b) = self.file.arena.expr(callee).kind {
            let unbound = b.symbol.is_none() && lookup_use(self.file, b.name, b.tok).is_none();
            if unbound && known::is_builtin_func(b.name) {
                return self.resolve_builtin_call(b.name, args);
            }
        }
        // Conversion: the callee denotes a type, `T(x)` or `(*T)(x)`.
        if let Some(t) = self.type_operand(callee) {
            return ResolvedTy::with_level(t.ty, t.ref_level);
        }
        let f = self.resolve(callee);
        if f.ref_level != 0 {
            return ResolvedTy::unresolved();
        }
        f.ty.call_ty(&self.cx())
    }

    fn resolve_builtin_call(&mut self, name: Name, args: &[ExprId]) -> ResolvedTy {
        match name {
            // new(T) yields a pointer to T.
            known::NEW => match args.first().and_then(|&a| self.type_operand(a)) {
                Some(t) => t.shifted(-1),
                None => ResolvedTy::unresolved(),
            },
            // make(T, ...) yields T itself.
            known::MAKE => args
                .first()
                .and_then(|&a| self.type_operand(a))
                .unwrap_or_else(ResolvedTy::unresolved),
            known::LEN | known::CAP | known::COPY => ResolvedTy::value(Ty::Builtin(known::INT)),
            known::APPEND => args
                .first()
                .map(|&a| self.resolve(a))
                .map(|v| ResolvedTy::with_level(v.ty, v.ref_level))
                .unwrap_or_else(ResolvedTy::unresolved),
            known::COMPLEX => ResolvedTy::value(Ty::Builtin(known::COMPLEX128)),
            known::REAL | known::IMAG => ResolvedTy::value(Ty::Builtin(known::FLOAT64)),
            known::CLOSE | known::DELETE | known::PANIC | known::PRINT | known::PRINTLN => {
                ResolvedTy::value(Ty::Void)
            }
            _ => ResolvedTy::unresolved(),
        }
    }

    /// If `expr` denotes a type, resolve it as one: a type name, `pkg.T`,
    /// `*T`, a parenthesized form, or an inline type expression.
    pub fn type_operand(&mut self, expr: ExprId) -> Option<ResolvedTy> {
        match self.file.arena.expr(expr).kind.clone() {
            ExprKind::Type { ty } => {
                Some(type_expr_ty(&self.cx(), self.file, ty, MAX_SYMBOL_DEPTH))
            }
            ExprKind::Paren { inner } => self.type_operand(inner),
            ExprKind::Star { operand } => Some(self.type_operand(operand)?.shifted(-1)),
            ExprKind::Ident(b) => {
                if let Some(sym) = b.symbol.or_else(|| lookup_use(self.file, b.name, b.tok)) {
                    let symbol = self.file.scopes.symbol(sym);
                    if symbol.kind == SymbolKind::Type {
                        let out = named_from_symbol(self.file, sym);
                        return out.is_resolved().then_some(out);
                    }
                    return None;
                }
                if let Some((tfile, sym)) = lookup_in_package(&self.cx(), self.file, b.name) {
                    if tfile.scopes.symbol(sym).kind == SymbolKind::Type {
                        let out = named_from_symbol(&tfile, sym);
                        return out.is_resolved().then_some(out);
                    }
                    return None;
                }
                known::is_builtin_type(b.name).then(|| ResolvedTy::value(Ty::Builtin(b.name)))
            }
            ExprKind::Selector { base, sel, .. } => {
                let ExprKind::Ident(pb) = self.file.arena.expr(base).kind else {
                    return None;
                };
                let sym = pb.symbol.or_else(|| lookup_use(self.file, pb.name, pb.tok))?;
                if self.file.scopes.symbol(sym).kind != SymbolKind::Package {
                    return None;
                }
                let out = qualified_type(&self.cx(), self.file, pb.name, sel);
                out.is_resolved().then_some(out)
            }
            _ => None,
        }
    }

    /// Declared type of a symbol, computed lazily from its declaration
    /// site. Variables, parameters, and receivers are addressable.
    pub fn symbol_ty(&mut self, file: &Arc<ParsedFile>, sym: SymbolId) -> ResolvedTy {
        if !Arc::ptr_eq(file, self.file) {
            let owned = Arc::clone(file);
            let mut sub = ExprTypeResolver::new(self.snapshot, self.interner, &owned);
            sub.fuel = self.fuel.saturating_sub(1);
            return sub.symbol_ty(&owned, sym);
        }
        if self.fuel == 0 {
            return ResolvedTy::unresolved();
        }
        self.fuel -= 1;
        let out = self.symbol_ty_inner(sym);
        self.fuel += 1;
        out
    }

    fn symbol_ty_inner(&mut self, sym: SymbolId) -> ResolvedTy {
        let symbol = self.file.scopes.symbol(sym);
        let kind = symbol.kind;
        let node = symbol.node;
        let cx = self.cx();
        match node {
            SymbolNode::Func(decl) => match &self.file.arena.decl(decl).kind {
                gosling_parser::ast::DeclKind::Func(fd) => ResolvedTy::value(Ty::Node {
                    file: Arc::clone(self.file),
                    id: fd.sig,
                }),
                _ => ResolvedTy::unresolved(),
            },
            SymbolNode::Receiver(decl) => match &self.file.arena.decl(decl).kind {
                gosling_parser::ast::DeclKind::Func(fd) => match &fd.recv {
                    Some(recv) => {
                        type_expr_ty(&cx, self.file, recv.ty, MAX_SYMBOL_DEPTH).addressable(true)
                    }
                    None => ResolvedTy::unresolved(),
                },
                _ => ResolvedTy::unresolved(),
            },
            SymbolNode::Spec { spec, index } => match &self.file.arena.spec(spec).kind {
                SpecKind::Type(_) => ResolvedTy::value(Ty::Named {
                    file: Arc::clone(self.file),
                    spec,
                }),
                SpecKind::Value(vs) => {
                    let addressable = kind == SymbolKind::Var;
                    if let Some(ty) = vs.ty {
                        return type_expr_ty(&cx, self.file, ty, MAX_SYMBOL_DEPTH)
                            .addressable(addressable);
                    }
                    if !vs.values.is_empty() {
                        let values = vs.values.clone();
                        let count = vs.names.len();
                        return self
                            .project(&values, count, index as usize)
                            .addressable(addressable);
                    }
                    if kind == SymbolKind::Const {
                        // iota continuation with no explicit value.
                        return ResolvedTy::value(Ty::Integral);
                    }
                    ResolvedTy::unresolved()
                }
                SpecKind::Import(_) => ResolvedTy::unresolved(),
            },
            SymbolNode::Import(spec) => {
                let alias = self
                    .file
                    .imports
                    .iter()
                    .find(|i| i.spec == spec)
                    .map(|i| i.alias);
                match alias.and_then(|a| self.snapshot.package_for_alias(self.file, a)) {
                    Some(key) => ResolvedTy::value(Ty::Package(key)),
                    None => ResolvedTy::unresolved(),
                }
            }
            SymbolNode::ShortVar { stmt, index } => {
                match self.file.arena.stmt(stmt).kind.clone() {
                    StmtKind::ShortVarDecl { names, values } => self
                        .project(&values, names.len(), index as usize)
                        .addressable(true),
                    _ => ResolvedTy::unresolved(),
                }
            }
            SymbolNode::Arg { sig, param, result, .. } => {
                match &self.file.arena.type_expr(sig).kind {
                    TypeExprKind::Func(fsig) => {
                        let fields = if result { &fsig.results } else { &fsig.params };
                        match fields.get(param as usize) {
                            Some(field) => type_expr_ty(&cx, self.file, field.ty, MAX_SYMBOL_DEPTH)
                                .addressable(true),
                            None => ResolvedTy::unresolved(),
                        }
                    }
                    _ => ResolvedTy::unresolved(),
                }
            }
            SymbolNode::RangeVar { stmt, index } => match self.file.arena.stmt(stmt).kind.clone() {
                StmtKind::Range { subject, .. } => {
                    self.range_component(subject, index).addressable(true)
                }
                _ => ResolvedTy::unresolved(),
            },
            SymbolNode::TypeSwitchVar { stmt, case } => {
                match self.file.arena.stmt(stmt).kind.clone() {
                    StmtKind::TypeSwitch { subject, cases, .. } => {
                        let clause = match cases.get(case as usize) {
                            Some(c) => c,
                            None => return ResolvedTy::unresolved(),
                        };
                        if clause.exprs.len() == 1 {
                            let e = clause.exprs[0];
                            if let Some(t) = self.type_operand(e) {
                                return t.addressable(true);
                            }
                        }
                        // Default/multi-type case keeps the subject's type.
                        let base = match self.file.arena.expr(subject).kind {
                            ExprKind::TypeAssert { base, .. } => base,
                            _ => subject,
                        };
                        self.resolve(base).addressable(true)
                    }
                    _ => ResolvedTy::unresolved(),
                }
            }
            SymbolNode::Label(_) => ResolvedTy::value(Ty::Void),
            SymbolNode::None => ResolvedTy::unresolved(),
        }
    }

    /// Project the `index`-th component of a right-hand side onto its
    /// left-hand name: element-wise lists, tuple-returning calls, and the
    /// two-value comma-ok forms.
    fn project(&mut self, values: &[ExprId], names: usize, index: usize) -> ResolvedTy {
        if values.len() == names {
            return match values.get(index) {
                Some(&v) => self.resolve(v),
                None => ResolvedTy::unresolved(),
            };
        }
        if values.len() != 1 {
            return ResolvedTy::unresolved();
        }
        let single = values[0];
        let v = self.resolve(single);
        if let Ty::Tuple(parts) = &v.ty {
            return parts.get(index).cloned().unwrap_or_else(ResolvedTy::unresolved);
        }
        if index == 0 {
            return v;
        }
        // v, ok := m[k] / x.(T) / <-ch
        let comma_ok = matches!(
            self.file.arena.expr(single).kind,
            ExprKind::Index { .. }
                | ExprKind::TypeAssert { .. }
                | ExprKind::Unary {
                    op: TokenKind::Arrow,
                    ..
                }
        );
        if index == 1 && comma_ok {
            ResolvedTy::value(Ty::Builtin(known::BOOL))
        } else {
            ResolvedTy::unresolved()
        }
    }

    /// Key (0) or value (1) type of a range subject.
    fn range_component(&mut self, subject: ExprId, index: u32) -> ResolvedTy {
        let base = self.resolve(subject);
        let base = self.auto_deref(base);
        if base.ref_level != 0 {
            return ResolvedTy::unresolved();
        }
        let cx = self.cx();
        let under = underlying_of(&cx, &base.ty, MAX_MEMBER_DEPTH);
        if under.ref_level != 0 {
            return ResolvedTy::unresolved();
        }
        match &under.ty {
            Ty::Builtin(name) if *name == known::STRING => match index {
                0 => ResolvedTy::value(Ty::Builtin(known::INT)),
                _ => ResolvedTy::value(Ty::Builtin(known::RUNE)),
            },
            Ty::Node { file, id } => match &file.arena.type_expr(*id).kind {
                TypeExprKind::Array { elem, .. } | TypeExprKind::Variadic { elem } => match index {
                    0 => ResolvedTy::value(Ty::Builtin(known::INT)),
                    _ => type_expr_ty(&cx, file, *elem, MAX_SYMBOL_DEPTH),
                },
                TypeExprKind::Map { key, value } => {
                    let id = if index == 0 { *key } else { *value };
                    type_expr_ty(&cx, file, id, MAX_SYMBOL_DEPTH)
                }
                TypeExprKind::Chan { elem, .. } => match index {
                    0 => type_expr_ty(&cx, file, *elem, MAX_SYMBOL_DEPTH),
                    _ => ResolvedTy::unresolved(),
                },
                _ => ResolvedTy::unresolved(),
            },
            _ => ResolvedTy::unresolved(),
        }
    }
}
