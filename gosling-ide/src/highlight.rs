//! Whole-file semantic highlighting.
//!
//! One background pass walks every node of a parsed file, resolves every
//! identifier it meets, and emits one span per classified token. The
//! cancellation token is polled at each node visit; a cancelled run
//! returns `None` and flushes nothing, so the editor keeps showing the
//! previous highlight set instead of a half-updated one.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gosling_lexer::{known, Interner, TokenId};
use gosling_parser::ast::{
    DeclKind, ExprId, ExprKind, Field, InterfaceElem, SpecKind, StmtId, StmtKind, TypeExprId,
    TypeExprKind,
};
use gosling_parser::{ParsedFile, SymbolKind};

use gosling_types::{
    lookup_in_package, lookup_use, ExprTypeResolver, Member, ResolvedTy, Snapshot, TyContext,
};

use crate::cancel::CancelToken;

/// Above this size, semantic analysis is skipped for latency's sake and
/// only declaration sites are highlighted.
pub const MAX_SEMANTIC_FILE_BYTES: usize = 200 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HighlightKind {
    Package,
    Const,
    Type,
    Var,
    Field,
    Func,
    FuncDecl,
    TypeDecl,
    ConstDecl,
    VarDecl,
    Label,
    Arg,
}

/// One highlight record; positions in editor terms (1-based line,
/// 0-based UTF-16 column).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightSpan {
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub kind: HighlightKind,
}

/// Highlight a whole file. Returns `None` if the token was cancelled
/// mid-walk; spans come back ordered by (line, column).
#[must_use]
pub fn highlight_file(
    snapshot: &Snapshot,
    interner: &Interner,
    file: &Arc<ParsedFile>,
    cancel: &CancelToken,
) -> Option<Vec<HighlightSpan>> {
    let semantic = file.source.len() <= MAX_SEMANTIC_FILE_BYTES;
    if !semantic {
        tracing::debug!(path = %file.path, "file too large, syntax-only highlighting");
    }
    let mut walker = Walker {
        file,
        interner,
        snapshot,
        resolver: ExprTypeResolver::new(snapshot, interner, file),
        cancel,
        semantic,
        out: Vec::new(),
    };
    let decls = file.ast.decls.clone();
    for decl in decls {
        walker.walk_decl(decl);
        if cancel.is_cancelled() {
            return None;
        }
    }
    if cancel.is_cancelled() {
        return None;
    }
    let mut out = walker.out;
    out.sort_by_key(|s| (s.line, s.column));
    Some(out)
}

fn use_kind(kind: SymbolKind) -> HighlightKind {
    match kind {
        SymbolKind::Package => HighlightKind::Package,
        SymbolKind::Const => HighlightKind::Const,
        SymbolKind::Type => HighlightKind::Type,
        SymbolKind::Var => HighlightKind::Var,
        SymbolKind::Func | SymbolKind::Method => HighlightKind::Func,
        SymbolKind::Field => HighlightKind::Field,
        SymbolKind::Arg => HighlightKind::Arg,
        SymbolKind::Label => HighlightKind::Label,
    }
}

struct Walker<'a> {
    file: &'a Arc<ParsedFile>,
    interner: &'a Interner,
    snapshot: &'a Snapshot,
    resolver: ExprTypeResolver<'a>,
    cancel: &'a CancelToken,
    semantic: bool,
    out: Vec<HighlightSpan>,
}

impl<'a> Walker<'a> {
    fn stop(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn cx(&self) -> TyContext<'a> {
        TyContext {
            snapshot: self.snapshot,
            interner: self.interner,
        }
    }

    fn emit(&mut self, tok: TokenId, kind: HighlightKind) {
        let t = self.file.token(tok);
        self.out.push(HighlightSpan {
            line: t.line,
            column: t.column,
            length: t.length,
            kind,
        });
    }

    // ── Declarations ─────────────────────────────────────────────────

    fn walk_decl(&mut self, id: gosling_parser::ast::DeclId) {
        if self.stop() {
            return;
        }
        match self.file.arena.decl(id).kind.clone() {
            DeclKind::Bad => {}
            DeclKind::Gen(gen) => {
                for spec in gen.specs {
                    self.walk_spec(spec);
                }
            }
            DeclKind::Func(func) => {
                self.emit(func.name.tok, HighlightKind::FuncDecl);
                if let Some(recv) = &func.recv {
                    self.walk_param_field(recv);
                }
                self.walk_type(func.sig);
                if let Some(body) = func.body {
                    self.walk_stmt(body);
                }
            }
        }
    }

    fn walk_spec(&mut self, id: gosling_parser::ast::SpecId) {
        match self.file.arena.spec(id).kind.clone() {
            SpecKind::Import(import) => {
                if let Some(alias) = import.alias {
                    self.emit(alias.tok, HighlightKind::Package);
                }
            }
            SpecKind::Value(value) => {
                let kind = if value.keyword == gosling_lexer::TokenKind::Const {
                    HighlightKind::ConstDecl
                } else {
                    HighlightKind::VarDecl
                };
                for name in &value.names {
                    self.emit(name.tok, kind);
                }
                if let Some(ty) = value.ty {
                    self.walk_type(ty);
                }
                for expr in value.values {
                    self.walk_expr(expr);
                }
            }
            SpecKind::Type(spec) => {
                self.emit(spec.name.tok, HighlightKind::TypeDecl);
                self.walk_type(spec.ty);
            }
        }
    }

    // ── Types ────────────────────────────────────────────────────────

    fn walk_type(&mut self, id: TypeExprId) {
        if self.stop() {
            return;
        }
        match self.file.arena.type_expr(id).kind.clone() {
            TypeExprKind::Bad => {}
            TypeExprKind::Name { package, ident } => {
                if let Some(pkg) = package {
                    self.walk_ident_use(pkg.tok, pkg.name, pkg.symbol);
                }
                self.walk_type_name(ident.tok, ident.name);
            }
            TypeExprKind::Pointer { elem } | TypeExprKind::Paren { inner: elem } => {
                self.walk_type(elem);
            }
            TypeExprKind::Array { len, elem } => {
                if let gosling_parser::ast::ArrayLen::Fixed(n) = len {
                    self.walk_expr(n);
                }
                self.walk_type(elem);
            }
            TypeExprKind::Struct { fields } => {
                for field in &fields {
                    for name in &field.names {
                        self.emit(name.tok, HighlightKind::Field);
                    }
                    self.walk_type(field.ty);
                }
            }
            TypeExprKind::Interface { elems } => {
                for elem in elems {
                    match elem {
                        InterfaceElem::Method { name, sig } => {
                            self.emit(name.tok, HighlightKind::FuncDecl);
                            self.walk_type(sig);
                        }
                        InterfaceElem::Embedded(te) => self.walk_type(te),
                    }
                }
            }
            TypeExprKind::Map { key, value } => {
                self.walk_type(key);
                self.walk_type(value);
            }
            TypeExprKind::Chan { elem, .. } | TypeExprKind::Variadic { elem } => {
                self.walk_type(elem);
            }
            TypeExprKind::Func(sig) => {
                for field in sig.params.iter().chain(sig.results.iter()) {
                    self.walk_param_field(field);
                }
            }
        }
    }

    fn walk_param_field(&mut self, field: &Field) {
        for name in &field.names {
            self.emit(name.tok, HighlightKind::Arg);
        }
        self.walk_type(field.ty);
    }

    fn walk_type_name(&mut self, tok: TokenId, name: gosling_lexer::Name) {
        if !self.semantic {
            return;
        }
        if lookup_use(self.file, name, tok).is_some()
            || lookup_in_package(&self.cx(), self.file, name).is_some()
            || known::is_builtin_type(name)
        {
            self.emit(tok, HighlightKind::Type);
        }
    }

    // ── Statements ───────────────────────────────────────────────────

    fn walk_stmt(&mut self, id: StmtId) {
        if self.stop() {
            return;
        }
        match self.file.arena.stmt(id).kind.clone() {
            StmtKind::Bad | StmtKind::Empty => {}
            StmtKind::Expr { expr } => self.walk_expr(expr),
            StmtKind::Send { chan, value } => {
                self.walk_expr(chan);
                self.walk_expr(value);
            }
            StmtKind::IncDec { expr, .. } => self.walk_expr(expr),
            StmtKind::Assign { lhs, rhs, .. } => {
                for e in lhs {
                    self.walk_expr(e);
                }
                for e in rhs {
                    self.walk_expr(e);
                }
            }
            StmtKind::ShortVarDecl { names, values } => {
                for name in &names {
                    if name.name != known::BLANK {
                        self.emit(name.tok, HighlightKind::VarDecl);
                    }
                }
                for e in values {
                    self.walk_expr(e);
                }
            }
            StmtKind::Decl { decl } => self.walk_decl(decl),
            StmtKind::Labeled { label, stmt } => {
                self.emit(label.tok, HighlightKind::Label);
                if let Some(stmt) = stmt {
                    self.walk_stmt(stmt);
                }
            }
            StmtKind::Block(block) => {
                for s in block.stmts {
                    self.walk_stmt(s);
                }
            }
            StmtKind::If {
                init,
                cond,
                then,
                els,
                ..
            } => {
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                if let Some(cond) = cond {
                    self.walk_expr(cond);
                }
                self.walk_stmt(then);
                if let Some(els) = els {
                    self.walk_stmt(els);
                }
            }
            StmtKind::Switch {
                init, tag, cases, ..
            } => {
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                if let Some(tag) = tag {
                    self.walk_expr(tag);
                }
                for case in &cases {
                    for e in &case.exprs {
                        self.walk_expr(*e);
                    }
                    for s in &case.body {
                        self.walk_stmt(*s);
                    }
                }
            }
            StmtKind::TypeSwitch {
                init,
                binding,
                subject,
                cases,
                ..
            } => {
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                if let Some(binding) = binding {
                    self.emit(binding.tok, HighlightKind::VarDecl);
                }
                self.walk_expr(subject);
                for case in &cases {
                    for e in &case.exprs {
                        self.walk_expr(*e);
                    }
                    for s in &case.body {
                        self.walk_stmt(*s);
                    }
                }
            }
            StmtKind::Select { cases } => {
                for case in &cases {
                    if let Some(comm) = case.comm {
                        self.walk_stmt(comm);
                    }
                    for s in &case.body {
                        self.walk_stmt(*s);
                    }
                }
            }
            StmtKind::For {
                init,
                cond,
                post,
                body,
                ..
            } => {
                if let Some(init) = init {
                    self.walk_stmt(init);
                }
                if let Some(cond) = cond {
                    self.walk_expr(cond);
                }
                if let Some(post) = post {
                    self.walk_stmt(post);
                }
                self.walk_stmt(body);
            }
            StmtKind::Range {
                key,
                value,
                define,
                subject,
                body,
                ..
            } => {
                match (define, key) {
                    (true, Some(key)) => self.walk_range_var(key),
                    (false, Some(key)) => self.walk_expr(key),
                    _ => {}
                }
                match (define, value) {
                    (true, Some(value)) => self.walk_range_var(value),
                    (false, Some(value)) => self.walk_expr(value),
                    _ => {}
                }
                self.walk_expr(subject);
                self.walk_stmt(body);
            }
            StmtKind::Go { call } | StmtKind::Defer { call } => self.walk_expr(call),
            StmtKind::Return { results } => {
                for e in results {
                    self.walk_expr(e);
                }
            }
            StmtKind::Branch { label, .. } => {
                if let Some(label) = label {
                    self.walk_ident_use(label.tok, label.name, label.symbol);
                }
            }
        }
    }

    fn walk_range_var(&mut self, expr: ExprId) {
        if let ExprKind::Ident(b) = self.file.arena.expr(expr).kind {
            if b.name != known::BLANK {
                self.emit(b.tok, HighlightKind::VarDecl);
            }
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn walk_expr(&mut self, id: ExprId) {
        if self.stop() {
            return;
        }
        match self.file.arena.expr(id).kind.clone() {
            ExprKind::Bad | ExprKind::BasicLit { .. } => {}
            ExprKind::Ident(b) => self.walk_ident_use(b.tok, b.name, b.symbol),
            ExprKind::FuncLit { sig, body } => {
                self.walk_type(sig);
                self.walk_stmt(body);
            }
            ExprKind::CompositeLit { ty, elems } => {
                let lit_ty = match ty {
                    Some(te) => {
                        self.walk_type(te);
                        self.semantic.then(|| {
                            gosling_types::resolve_type_expr(&self.cx(), self.file, te)
                        })
                    }
                    None => None,
                };
                self.walk_literal_elems(lit_ty, &elems);
            }
            ExprKind::KeyValue { key, value } => {
                self.walk_expr(key);
                self.walk_expr(value);
            }
            ExprKind::Paren { inner } => self.walk_expr(inner),
            ExprKind::Selector { base, sel_tok, sel } => {
                self.walk_expr(base);
                if self.semantic {
                    self.walk_selector_member(base, sel_tok, sel);
                }
            }
            ExprKind::Index { base, index } => {
                self.walk_expr(base);
                self.walk_expr(index);
            }
            ExprKind::Slice {
                base,
                low,
                high,
                max,
            } => {
                self.walk_expr(base);
                for e in [low, high, max].into_iter().flatten() {
                    self.walk_expr(e);
                }
            }
            ExprKind::TypeAssert { base, ty } => {
                self.walk_expr(base);
                if let Some(ty) = ty {
                    self.walk_type(ty);
                }
            }
            ExprKind::Call { callee, args, .. } => {
                self.walk_expr(callee);
                for e in args {
                    self.walk_expr(e);
                }
            }
            ExprKind::Star { operand } | ExprKind::Unary { operand, .. } => {
                self.walk_expr(operand);
            }
            ExprKind::Binary { left, right, .. } => {
                self.walk_expr(left);
                self.walk_expr(right);
            }
            ExprKind::Type { ty } => self.walk_type(ty),
        }
    }

    /// Elements of a composite literal, with the literal's own type pushed
    /// so nested untyped literals and keyed struct fields classify.
    fn walk_literal_elems(&mut self, lit_ty: Option<ResolvedTy>, elems: &[ExprId]) {
        let pushed = match lit_ty {
            Some(t) if t.is_resolved() => {
                self.resolver.push_literal_ty(t.ty.clone());
                Some(t.ty)
            }
            _ => None,
        };
        for &elem in elems {
            if let ExprKind::KeyValue { key, value } = self.file.arena.expr(elem).kind.clone() {
                let mut keyed = false;
                if let (Some(lit), ExprKind::Ident(kb)) =
                    (pushed.as_ref(), self.file.arena.expr(key).kind.clone())
                {
                    if let Some(Member::Field { .. }) = lit.lookup_member(&self.cx(), kb.name) {
                        self.emit(kb.tok, HighlightKind::Field);
                        keyed = true;
                    }
                }
                if !keyed {
                    self.walk_expr(key);
                }
                self.walk_expr(value);
            } else {
                self.walk_expr(elem);
            }
        }
        if pushed.is_some() {
            self.resolver.pop_literal_ty();
        }
    }

    fn walk_ident_use(
        &mut self,
        tok: TokenId,
        name: gosling_lexer::Name,
        bound: Option<gosling_parser::SymbolId>,
    ) {
        if !self.semantic || name == known::BLANK {
            return;
        }
        if let Some(sym) = bound.or_else(|| lookup_use(self.file, name, tok)) {
            let kind = use_kind(self.file.scopes.symbol(sym).kind);
            self.emit(tok, kind);
            return;
        }
        if let Some((tfile, sym)) = lookup_in_package(&self.cx(), self.file, name) {
            let kind = use_kind(tfile.scopes.symbol(sym).kind);
            self.emit(tok, kind);
            return;
        }
        if known::is_builtin_type(name) {
            self.emit(tok, HighlightKind::Type);
        } else if matches!(name, known::TRUE | known::FALSE | known::NIL | known::IOTA) {
            self.emit(tok, HighlightKind::Const);
        }
    }

    fn walk_selector_member(
        &mut self,
        base: ExprId,
        sel_tok: TokenId,
        sel: gosling_lexer::Name,
    ) {
        let base_ty = self.resolver.resolve(base);
        if base_ty.ref_level != 0 && base_ty.ref_level != -1 {
            return;
        }
        let Some(member) = base_ty.ty.lookup_member(&self.cx(), sel) else {
            return;
        };
        let kind = match &member {
            Member::Field { .. } => HighlightKind::Field,
            Member::Method { .. } | Member::IfaceMethod { .. } => HighlightKind::Func,
            Member::PackageSym { file, symbol } => use_kind(file.scopes.symbol(*symbol).kind),
        };
        self.emit(sel_tok, kind);
    }
}
