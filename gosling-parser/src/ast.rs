//! Arena-allocated abstract syntax tree.
//!
//! All nodes of one translation unit live in a per-file [`Arena`] of flat
//! vectors indexed by typed handles; dropping the [`ParsedFile`] frees the
//! whole tree at once. Nodes are grouped into five families (declarations,
//! specs, expressions, type expressions, statements), each a tagged enum.
//! Every node records its first and last token, which drives all
//! position-based queries ("what covers offset P").

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gosling_lexer::{Name, Token, TokenId, TokenKind};

use crate::diag::Diagnostic;
use crate::scope::{ScopeId, ScopeTree, SymbolId};

macro_rules! node_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            #[must_use]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

node_id!(
    /// Handle to a declaration node.
    DeclId
);
node_id!(
    /// Handle to a spec node (one entry of a const/var/type/import decl).
    SpecId
);
node_id!(
    /// Handle to an expression node.
    ExprId
);
node_id!(
    /// Handle to a type-expression node.
    TypeExprId
);
node_id!(
    /// Handle to a statement node.
    StmtId
);

/// Inclusive first/last token bounds of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRange {
    pub first: TokenId,
    pub last: TokenId,
}

impl TokenRange {
    #[must_use]
    pub fn new(first: TokenId, last: TokenId) -> Self {
        Self { first, last }
    }
}

/// An identifier occurrence that can carry a symbol back-reference once the
/// parser has declared it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentBinding {
    pub tok: TokenId,
    pub name: Name,
    /// Set at declaration sites only; uses are resolved lazily.
    pub symbol: Option<SymbolId>,
}

impl IdentBinding {
    #[must_use]
    pub fn new(tok: TokenId, name: Name) -> Self {
        Self {
            tok,
            name,
            symbol: None,
        }
    }
}

// ── Declarations ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decl {
    pub kind: DeclKind,
    pub range: TokenRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DeclKind {
    /// Placeholder covering tokens skipped during error recovery.
    Bad,
    /// `const`/`var`/`type`/`import` declaration, possibly parenthesized.
    Gen(GenDecl),
    Func(FuncDecl),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenDecl {
    /// `Const`, `Var`, `Type`, or `Import`.
    pub keyword: TokenKind,
    pub specs: Vec<SpecId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDecl {
    /// Method receiver, if any.
    pub recv: Option<Field>,
    pub name: IdentBinding,
    /// Always a `TypeExprKind::Func` node.
    pub sig: TypeExprId,
    /// Absent for forward declarations and in fast parse mode.
    pub body: Option<StmtId>,
    /// Scope holding receiver and parameters.
    pub scope: ScopeId,
}

// ── Specs ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spec {
    pub kind: SpecKind,
    pub range: TokenRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpecKind {
    Import(ImportSpec),
    Value(ValueSpec),
    Type(TypeSpec),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSpec {
    /// Explicit alias identifier, if present.
    pub alias: Option<IdentBinding>,
    /// `import . "path"` form.
    pub dot: bool,
    /// The string token holding the import path.
    pub path_tok: TokenId,
    /// Interned path content.
    pub path: Option<Name>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSpec {
    /// `Const` or `Var`.
    pub keyword: TokenKind,
    pub names: Vec<IdentBinding>,
    pub ty: Option<TypeExprId>,
    pub values: Vec<ExprId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSpec {
    pub name: IdentBinding,
    /// `type T = U` alias form.
    pub alias: bool,
    pub ty: TypeExprId,
}

// ── Type expressions ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub range: TokenRange,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArrayLen {
    /// `[]T`
    Slice,
    /// `[n]T`
    Fixed(ExprId),
    /// `[...]T`
    Ellipsis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeExprKind {
    Bad,
    /// Possibly package-qualified type name.
    Name {
        package: Option<IdentBinding>,
        ident: IdentBinding,
    },
    Pointer {
        elem: TypeExprId,
    },
    Array {
        len: ArrayLen,
        elem: TypeExprId,
    },
    Struct {
        fields: Vec<Field>,
    },
    Interface {
        elems: Vec<InterfaceElem>,
    },
    Map {
        key: TypeExprId,
        value: TypeExprId,
    },
    Chan {
        dir: ChanDir,
        elem: TypeExprId,
    },
    Func(FuncSig),
    Paren {
        inner: TypeExprId,
    },
    /// `...T` in a final parameter.
    Variadic {
        elem: TypeExprId,
    },
}

/// One field group of a struct, parameter list, or result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Empty for unnamed parameters/results and embedded struct fields.
    pub names: Vec<IdentBinding>,
    pub ty: TypeExprId,
    /// Struct field tag string token.
    pub tag: Option<TokenId>,
    /// Embedded (anonymous) struct field.
    pub embedded: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InterfaceElem {
    Method { name: IdentBinding, sig: TypeExprId },
    Embedded(TypeExprId),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncSig {
    pub params: Vec<Field>,
    pub results: Vec<Field>,
}

// ── Expressions ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    pub range: TokenRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Bad,
    Ident(IdentBinding),
    BasicLit {
        tok: TokenId,
        kind: TokenKind,
    },
    FuncLit {
        sig: TypeExprId,
        body: StmtId,
    },
    CompositeLit {
        /// Absent for nested untyped literals (`{...}` inside another
        /// composite literal); the element type is inferred from context.
        ty: Option<TypeExprId>,
        elems: Vec<ExprId>,
    },
    KeyValue {
        key: ExprId,
        value: ExprId,
    },
    Paren {
        inner: ExprId,
    },
    Selector {
        base: ExprId,
        sel_tok: TokenId,
        sel: Name,
    },
    Index {
        base: ExprId,
        index: ExprId,
    },
    Slice {
        base: ExprId,
        low: Option<ExprId>,
        high: Option<ExprId>,
        max: Option<ExprId>,
    },
    /// `x.(T)`; `ty == None` is the `x.(type)` form of a type switch.
    TypeAssert {
        base: ExprId,
        ty: Option<TypeExprId>,
    },
    Call {
        callee: ExprId,
        args: Vec<ExprId>,
        ellipsis: bool,
    },
    /// `*x` — pointer dereference or pointer type, disambiguated by the
    /// resolver.
    Star {
        operand: ExprId,
    },
    Unary {
        op: TokenKind,
        operand: ExprId,
    },
    Binary {
        op: TokenKind,
        left: ExprId,
        right: ExprId,
    },
    /// A type in expression position (conversions, composite literals).
    Type {
        ty: TypeExprId,
    },
}

// ── Statements ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: TokenRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<StmtId>,
    pub scope: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseClause {
    /// Case expressions (or types, in a type switch); empty for `default`.
    pub exprs: Vec<ExprId>,
    pub body: Vec<StmtId>,
    pub range: TokenRange,
    pub scope: ScopeId,
    /// Per-case binding symbol of a `v := x.(type)` switch.
    pub binding: Option<SymbolId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommClause {
    /// Send or receive statement; `None` for `default`.
    pub comm: Option<StmtId>,
    pub body: Vec<StmtId>,
    pub range: TokenRange,
    pub scope: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    Bad,
    Empty,
    Expr {
        expr: ExprId,
    },
    Send {
        chan: ExprId,
        value: ExprId,
    },
    IncDec {
        expr: ExprId,
        op: TokenKind,
    },
    Assign {
        lhs: Vec<ExprId>,
        op: TokenKind,
        rhs: Vec<ExprId>,
    },
    ShortVarDecl {
        names: Vec<IdentBinding>,
        values: Vec<ExprId>,
    },
    Decl {
        decl: DeclId,
    },
    Labeled {
        label: IdentBinding,
        stmt: Option<StmtId>,
    },
    Block(Block),
    If {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        then: StmtId,
        els: Option<StmtId>,
        scope: ScopeId,
    },
    Switch {
        init: Option<StmtId>,
        tag: Option<ExprId>,
        cases: Vec<CaseClause>,
        scope: ScopeId,
    },
    TypeSwitch {
        init: Option<StmtId>,
        /// The `v` of `v := x.(type)`, if present.
        binding: Option<IdentBinding>,
        subject: ExprId,
        cases: Vec<CaseClause>,
        scope: ScopeId,
    },
    Select {
        cases: Vec<CommClause>,
    },
    For {
        init: Option<StmtId>,
        cond: Option<ExprId>,
        post: Option<StmtId>,
        body: StmtId,
        scope: ScopeId,
    },
    Range {
        key: Option<ExprId>,
        value: Option<ExprId>,
        /// `:=` form declaring the iteration variables.
        define: bool,
        /// Key/value binding symbols for the `:=` form.
        key_binding: Option<SymbolId>,
        value_binding: Option<SymbolId>,
        subject: ExprId,
        body: StmtId,
        scope: ScopeId,
    },
    Go {
        call: ExprId,
    },
    Defer {
        call: ExprId,
    },
    Return {
        results: Vec<ExprId>,
    },
    Branch {
        keyword: TokenKind,
        label: Option<IdentBinding>,
    },
}

// ── Arena ────────────────────────────────────────────────────────────

/// Flat node storage for one translation unit.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub decls: Vec<Decl>,
    pub specs: Vec<Spec>,
    pub exprs: Vec<Expr>,
    pub types: Vec<TypeExpr>,
    pub stmts: Vec<Stmt>,
}

impl Arena {
    pub fn alloc_decl(&mut self, node: Decl) -> DeclId {
        self.decls.push(node);
        DeclId((self.decls.len() - 1) as u32)
    }

    pub fn alloc_spec(&mut self, node: Spec) -> SpecId {
        self.specs.push(node);
        SpecId((self.specs.len() - 1) as u32)
    }

    pub fn alloc_expr(&mut self, node: Expr) -> ExprId {
        self.exprs.push(node);
        ExprId((self.exprs.len() - 1) as u32)
    }

    pub fn alloc_type(&mut self, node: TypeExpr) -> TypeExprId {
        self.types.push(node);
        TypeExprId((self.types.len() - 1) as u32)
    }

    pub fn alloc_stmt(&mut self, node: Stmt) -> StmtId {
        self.stmts.push(node);
        StmtId((self.stmts.len() - 1) as u32)
    }

    #[must_use]
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.index()]
    }

    #[must_use]
    pub fn spec(&self, id: SpecId) -> &Spec {
        &self.specs[id.index()]
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    #[must_use]
    pub fn type_expr(&self, id: TypeExprId) -> &TypeExpr {
        &self.types[id.index()]
    }

    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.index()]
    }

    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.index()]
    }

    pub fn spec_mut(&mut self, id: SpecId) -> &mut Spec {
        &mut self.specs[id.index()]
    }

    pub fn expr_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.index()]
    }

    pub fn type_expr_mut(&mut self, id: TypeExprId) -> &mut TypeExpr {
        &mut self.types[id.index()]
    }

    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.index()]
    }
}

// ── File ─────────────────────────────────────────────────────────────

/// How much of the file to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseMode {
    /// Everything, including function bodies.
    Full,
    /// Skip function bodies — quick package-name and import scans.
    Fast,
}

/// The root production of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAst {
    pub package_tok: Option<TokenId>,
    pub package_name: Option<Name>,
    /// Top-level declarations in source order, imports included.
    pub decls: Vec<DeclId>,
    pub range: TokenRange,
}

/// One resolved `import` binding of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportBinding {
    /// Effective alias: the explicit alias, or the last path segment.
    pub alias: Name,
    pub path: String,
    pub spec: SpecId,
}

/// A completed translation unit: tokens, tree, scopes, and diagnostics,
/// all dropped together on reparse.
#[derive(Debug)]
pub struct ParsedFile {
    pub path: Arc<str>,
    pub source: Arc<str>,
    pub mode: ParseMode,
    pub tokens: Vec<Token>,
    pub arena: Arena,
    pub scopes: ScopeTree,
    pub file_scope: ScopeId,
    pub ast: FileAst,
    /// (receiver type name, method name) → method declaration.
    pub methods: HashMap<(Name, Name), DeclId>,
    pub imports: Vec<ImportBinding>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedFile {
    #[must_use]
    pub fn token(&self, id: TokenId) -> Token {
        self.tokens[id.index()]
    }

    /// Source text of a token.
    #[must_use]
    pub fn token_text(&self, id: TokenId) -> &str {
        let t = self.tokens[id.index()];
        &self.source[t.offset as usize..t.end_offset() as usize]
    }

    /// Token whose span contains `byte_offset`, or the nearest token
    /// starting before it.
    #[must_use]
    pub fn token_at_offset(&self, byte_offset: u32) -> Option<TokenId> {
        if self.tokens.is_empty() {
            return None;
        }
        let idx = self
            .tokens
            .partition_point(|t| t.offset <= byte_offset)
            .checked_sub(1)?;
        Some(TokenId(idx as u32))
    }

    /// Byte span covered by a token range.
    #[must_use]
    pub fn byte_span(&self, range: TokenRange) -> (u32, u32) {
        (
            self.token(range.first).offset,
            self.token(range.last).end_offset(),
        )
    }

    fn range_contains(&self, range: TokenRange, byte_offset: u32) -> bool {
        let (lo, hi) = self.byte_span(range);
        byte_offset >= lo && byte_offset <= hi
    }

    /// Smallest expression node covering `byte_offset`.
    #[must_use]
    pub fn expr_at_offset(&self, byte_offset: u32) -> Option<ExprId> {
        let mut best: Option<(u32, ExprId)> = None;
        for (i, expr) in self.arena.exprs.iter().enumerate() {
            if self.range_contains(expr.range, byte_offset) {
                let (lo, hi) = self.byte_span(expr.range);
                let width = hi - lo;
                if best.map_or(true, |(w, _)| width < w) {
                    best = Some((width, ExprId(i as u32)));
                }
            }
        }
        best.map(|(_, id)| id)
    }

    /// Expression whose last token is exactly `tok`. Used for member
    /// completion after a `.`.
    #[must_use]
    pub fn expr_ending_at(&self, tok: TokenId) -> Option<ExprId> {
        let mut best: Option<(u32, ExprId)> = None;
        for (i, expr) in self.arena.exprs.iter().enumerate() {
            if expr.range.last == tok {
                let (lo, hi) = self.byte_span(expr.range);
                let width = hi - lo;
                // Prefer the widest, i.e. the whole selector chain.
                if best.map_or(true, |(w, _)| width > w) {
                    best = Some((width, ExprId(i as u32)));
                }
            }
        }
        best.map(|(_, id)| id)
    }

    /// Innermost scope whose token range covers `byte_offset`.
    #[must_use]
    pub fn scope_at_offset(&self, byte_offset: u32) -> ScopeId {
        let mut best = self.file_scope;
        let mut best_width = u32::MAX;
        for (i, scope) in self.scopes.iter_scopes() {
            let range = TokenRange::new(scope.first, scope.last);
            if self.range_contains(range, byte_offset) {
                let (lo, hi) = self.byte_span(range);
                if hi - lo < best_width {
                    best_width = hi - lo;
                    best = i;
                }
            }
        }
        best
    }

    /// Innermost call expression whose argument list covers `byte_offset`.
    #[must_use]
    pub fn call_at_offset(&self, byte_offset: u32) -> Option<ExprId> {
        let mut best: Option<(u32, ExprId)> = None;
        for (i, expr) in self.arena.exprs.iter().enumerate() {
            if let ExprKind::Call { callee, .. } = &expr.kind {
                // Cursor must sit after the callee, inside the parens.
                let callee_end = self.byte_span(self.arena.expr(*callee).range).1;
                let (lo, hi) = self.byte_span(expr.range);
                if byte_offset > callee_end && byte_offset >= lo && byte_offset <= hi {
                    let width = hi - lo;
                    if best.map_or(true, |(w, _)| width < w) {
                        best = Some((width, ExprId(i as u32)));
                    }
                }
            }
        }
        best.map(|(_, id)| id)
    }
}
