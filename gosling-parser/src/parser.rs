//! Hand-written recursive-descent parser with one token of lookahead.
//!
//! Parsing and declaration are interleaved: every production that
//! introduces a binding declares it into the current scope as it is
//! parsed, so a completed [`ParsedFile`] already carries its full symbol
//! table. Syntax errors never abort: the parser reports a diagnostic,
//! resynchronizes at the next statement or declaration boundary, and
//! substitutes a `Bad*` placeholder node covering the skipped tokens.

use std::collections::HashMap;
use std::sync::Arc;

use gosling_lexer::{known, tokenize, Interner, Name, Token, TokenId, TokenKind};

use crate::ast::{
    Arena, ArrayLen, Block, CaseClause, ChanDir, CommClause, Decl, DeclId, DeclKind, Expr, ExprId,
    ExprKind, Field, FileAst, FuncDecl, FuncSig, GenDecl, IdentBinding, ImportBinding, ImportSpec,
    InterfaceElem, ParseMode, ParsedFile, Spec, SpecId, SpecKind, Stmt, StmtId, StmtKind,
    TokenRange, TypeExpr, TypeExprId, TypeExprKind, TypeSpec, ValueSpec,
};
use crate::diag::{Diagnostic, Severity};
use crate::scope::{ScopeId, ScopeKind, ScopeTree, Symbol, SymbolId, SymbolKind, SymbolNode};

/// Give up resynchronizing at one position after this many attempts and
/// force the cursor forward instead.
const MAX_SYNC_RETRIES: u32 = 10;

/// Parse one file. Never fails: the result always carries a best-effort
/// tree plus whatever diagnostics accumulated.
pub fn parse_file(interner: &Interner, path: &str, source: &str, mode: ParseMode) -> ParsedFile {
    tracing::debug!(path, ?mode, "parsing");
    let parser = Parser::new(interner, path, source, mode);
    parser.parse()
}

/// Package-name-gated fast parse: bails out without building a tree if the
/// package clause does not name `wanted`. Used for quick scans over many
/// candidate files.
pub fn parse_package_file(
    interner: &Interner,
    path: &str,
    source: &str,
    wanted: &str,
) -> Option<ParsedFile> {
    let parser = Parser::new(interner, path, source, ParseMode::Fast);
    let mut i = 0;
    while parser.tokens.get(i).map(|t| t.kind) == Some(TokenKind::Comment) {
        i += 1;
    }
    if parser.tokens.get(i).map(|t| t.kind) != Some(TokenKind::Package) {
        return None;
    }
    let name_tok = parser.tokens.get(i + 1)?;
    if name_tok.kind != TokenKind::Ident {
        return None;
    }
    let name = name_tok.name?;
    if &*interner.resolve(name) != wanted {
        return None;
    }
    Some(parser.parse())
}

/// Outcome of a simple statement inside a `for` header.
enum SimpleOut {
    Stmt(StmtId),
    Range {
        key: Option<ExprId>,
        value: Option<ExprId>,
        define: bool,
        subject: ExprId,
    },
}

struct Parser<'a> {
    interner: &'a Interner,
    path: Arc<str>,
    source: Arc<str>,
    tokens: Vec<Token>,
    mode: ParseMode,
    /// Cursor over the token sequence; always on a non-comment token.
    pos: usize,
    /// Position of the last consumed token, for node end bounds.
    prev: usize,
    arena: Arena,
    scopes: ScopeTree,
    file_scope: ScopeId,
    scope: ScopeId,
    methods: HashMap<(Name, Name), DeclId>,
    imports: Vec<ImportBinding>,
    diagnostics: Vec<Diagnostic>,
    /// Expression nesting depth; forced negative inside if/for/switch
    /// headers to suppress composite literals there.
    expr_lev: i32,
    /// Inside a right-hand side: `=` is tolerated as `==`.
    in_rhs: bool,
    sync_pos: usize,
    sync_cnt: u32,
}

impl<'a> Parser<'a> {
    fn new(interner: &'a Interner, path: &str, source: &str, mode: ParseMode) -> Self {
        let (tokens, lex_errors) = tokenize(source, interner);
        let path: Arc<str> = Arc::from(path);
        let mut diagnostics = Vec::new();
        for e in lex_errors {
            diagnostics.push(Diagnostic {
                severity: Severity::Error,
                file: Arc::clone(&path),
                line: e.line,
                column: e.column,
                length: e.length,
                message: e.kind.to_string(),
            });
        }
        let mut scopes = ScopeTree::new();
        let file_scope = scopes.push_scope(ScopeKind::File, None, TokenId(0));
        let mut parser = Self {
            interner,
            path,
            source: Arc::from(source),
            tokens,
            mode,
            pos: 0,
            prev: 0,
            arena: Arena::default(),
            scopes,
            file_scope,
            scope: file_scope,
            methods: HashMap::new(),
            imports: Vec::new(),
            diagnostics,
            expr_lev: 0,
            in_rhs: false,
            sync_pos: 0,
            sync_cnt: 0,
        };
        parser.skip_comments();
        parser
    }

    // ── Cursor ───────────────────────────────────────────────────────

    fn tok(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn tid(&self) -> TokenId {
        TokenId(self.pos as u32)
    }

    fn prev_tid(&self) -> TokenId {
        TokenId(self.prev as u32)
    }

    fn token(&self) -> Token {
        self.tokens[self.pos]
    }

    fn skip_comments(&mut self) {
        while self.tokens[self.pos].kind == TokenKind::Comment {
            self.pos += 1;
        }
    }

    fn next(&mut self) {
        if self.tok() != TokenKind::Eof {
            self.prev = self.pos;
            self.pos += 1;
            self.skip_comments();
        }
    }

    /// Kind of the token after the current one (comments skipped).
    fn peek_kind(&self) -> TokenKind {
        let mut i = self.pos + 1;
        while self
            .tokens
            .get(i)
            .map(|t| t.kind == TokenKind::Comment)
            .unwrap_or(false)
        {
            i += 1;
        }
        self.tokens.get(i).map_or(TokenKind::Eof, |t| t.kind)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.tok() == kind
    }

    fn accept(&mut self, kind: TokenKind) -> Option<TokenId> {
        if self.at(kind) {
            let t = self.tid();
            self.next();
            Some(t)
        } else {
            None
        }
    }

    /// Consume `kind` or report "expected ...". Always makes progress, in
    /// the style of a panic-free parser: the current token is consumed
    /// either way.
    fn expect(&mut self, kind: TokenKind) -> TokenId {
        let t = self.tid();
        if !self.at(kind) {
            self.error_here(format!("expected '{}', found '{}'", kind, self.tok()));
        }
        self.next();
        t
    }

    /// Statement terminator: an explicit or inserted semicolon, or an
    /// upcoming `)` / `}` which licenses omission.
    fn expect_semi(&mut self) {
        match self.tok() {
            TokenKind::Semicolon => {
                self.next();
            }
            TokenKind::RParen | TokenKind::RBrace | TokenKind::Eof => {}
            _ => {
                self.error_here(format!("expected ';', found '{}'", self.tok()));
                self.sync_stmt();
                if self.at(TokenKind::Semicolon) {
                    self.next();
                }
            }
        }
    }

    // ── Diagnostics ──────────────────────────────────────────────────

    fn report(&mut self, severity: Severity, tok: TokenId, message: String) {
        let t = self.tokens[tok.index()];
        self.diagnostics.push(Diagnostic {
            severity,
            file: Arc::clone(&self.path),
            line: t.line,
            column: t.column,
            length: t.length.max(1),
            message,
        });
    }

    fn error_tok(&mut self, tok: TokenId, message: String) {
        self.report(Severity::Error, tok, message);
    }

    fn error_here(&mut self, message: String) {
        let t = self.tid();
        self.error_tok(t, message);
    }

    // ── Resynchronization ────────────────────────────────────────────

    /// Skip tokens until `stop` matches, with the repeated-sync counter
    /// capping stalls at one position.
    fn sync(&mut self, stop: fn(TokenKind) -> bool) {
        if self.pos == self.sync_pos {
            self.sync_cnt += 1;
            if self.sync_cnt >= MAX_SYNC_RETRIES {
                // Stuck: force one token of progress.
                self.next();
                self.sync_pos = self.pos;
                self.sync_cnt = 0;
                return;
            }
        } else {
            self.sync_pos = self.pos;
            self.sync_cnt = 0;
        }
        while self.tok() != TokenKind::Eof && !stop(self.tok()) {
            self.next();
        }
    }

    fn sync_decl(&mut self) {
        self.sync(|k| {
            matches!(
                k,
                TokenKind::Const
                    | TokenKind::Var
                    | TokenKind::Type
                    | TokenKind::Func
                    | TokenKind::Import
            )
        });
    }

    fn sync_stmt(&mut self) {
        self.sync(|k| {
            matches!(
                k,
                TokenKind::If
                    | TokenKind::For
                    | TokenKind::Switch
                    | TokenKind::Select
                    | TokenKind::Go
                    | TokenKind::Defer
                    | TokenKind::Return
                    | TokenKind::Break
                    | TokenKind::Continue
                    | TokenKind::Goto
                    | TokenKind::Fallthrough
                    | TokenKind::Const
                    | TokenKind::Var
                    | TokenKind::Type
                    | TokenKind::Semicolon
                    | TokenKind::LBrace
                    | TokenKind::RBrace
                    | TokenKind::Case
                    | TokenKind::Default
            )
        });
    }

    // ── Scopes and declarations ──────────────────────────────────────

    fn open_scope(&mut self, kind: ScopeKind) -> ScopeId {
        let id = self.scopes.push_scope(kind, Some(self.scope), self.tid());
        self.scope = id;
        id
    }

    fn close_scope(&mut self) {
        let id = self.scope;
        self.scopes.close_scope(id, self.prev_tid());
        self.scope = self
            .scopes
            .scope(id)
            .outer
            .unwrap_or(self.file_scope);
    }

    /// Declare `binding` in `scope`. Redeclaration in the same scope is a
    /// reported error and the existing symbol wins; the blank identifier
    /// is never declared.
    fn declare_in(
        &mut self,
        binding: &mut IdentBinding,
        kind: SymbolKind,
        node: SymbolNode,
        scope: ScopeId,
    ) {
        if binding.name == known::BLANK {
            return;
        }
        if self.scopes.find(scope, binding.name).is_some() {
            let text = self.interner.resolve(binding.name);
            self.error_tok(binding.tok, format!("'{text}' redeclared in this block"));
            return;
        }
        let id = self.scopes.declare(
            scope,
            Symbol {
                name: binding.name,
                kind,
                decl_tok: binding.tok,
                decl_end: binding.tok,
                scope,
                node,
            },
        );
        binding.symbol = Some(id);
    }

    fn declare(&mut self, binding: &mut IdentBinding, kind: SymbolKind, node: SymbolNode) {
        let scope = self.scope;
        self.declare_in(binding, kind, node, scope);
    }

    /// Stamp the end-of-declaration token onto freshly declared symbols;
    /// ordered scopes gate visibility on it.
    fn seal(&mut self, bindings: &[IdentBinding]) {
        let end = self.prev_tid();
        for b in bindings {
            if let Some(sym) = b.symbol {
                self.scopes.symbol_mut(sym).decl_end = end;
            }
        }
    }

    // ── Entry ────────────────────────────────────────────────────────

    fn parse(mut self) -> ParsedFile {
        let first = self.tid();
        let mut package_tok = None;
        let mut package_name = None;
        if self.at(TokenKind::Package) {
            package_tok = Some(self.tid());
            self.next();
            if self.at(TokenKind::Ident) {
                package_name = self.token().name;
                self.next();
            } else {
                self.error_here("expected package name".to_string());
            }
            self.expect_semi();
        } else {
            self.error_here("expected 'package'".to_string());
        }

        let mut decls = Vec::new();
        while self.tok() != TokenKind::Eof {
            decls.push(self.parse_top_decl());
        }

        let last = self.prev_tid();
        self.scopes
            .close_scope(self.file_scope, TokenId(self.tokens.len() as u32 - 1));
        let ast = FileAst {
            package_tok,
            package_name,
            decls,
            range: TokenRange::new(first, last),
        };
        tracing::debug!(
            path = &*self.path,
            symbols = self.scopes.symbol_count(),
            diagnostics = self.diagnostics.len(),
            "parsed"
        );
        ParsedFile {
            path: self.path,
            source: self.source,
            mode: self.mode,
            tokens: self.tokens,
            arena: self.arena,
            scopes: self.scopes,
            file_scope: self.file_scope,
            ast,
            methods: self.methods,
            imports: self.imports,
            diagnostics: self.diagnostics,
        }
    }

    fn parse_top_decl(&mut self) -> DeclId {
        match self.tok() {
            TokenKind::Import | TokenKind::Const | TokenKind::Var | TokenKind::Type => {
                self.parse_gen_decl()
            }
            TokenKind::Func => self.parse_func_decl(),
            _ => {
                let start = self.tid();
                self.error_here(format!("expected declaration, found '{}'", self.tok()));
                self.sync_decl();
                self.arena.alloc_decl(Decl {
                    kind: DeclKind::Bad,
                    range: TokenRange::new(start, self.prev_tid().max(start)),
                })
            }
        }
    }

    // ── General declarations ─────────────────────────────────────────

    fn parse_gen_decl(&mut self) -> DeclId {
        let keyword = self.tok();
        let first = self.tid();
        self.next();
        let mut specs = Vec::new();
        if self.accept(TokenKind::LParen).is_some() {
            while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                specs.push(self.parse_spec(keyword));
            }
            self.expect(TokenKind::RParen);
            self.expect_semi();
        } else {
            specs.push(self.parse_spec(keyword));
        }
        self.arena.alloc_decl(Decl {
            kind: DeclKind::Gen(GenDecl { keyword, specs }),
            range: TokenRange::new(first, self.prev_tid()),
        })
    }

    fn parse_spec(&mut self, keyword: TokenKind) -> SpecId {
        match keyword {
            TokenKind::Import => self.parse_import_spec(),
            TokenKind::Type => self.parse_type_spec(),
            _ => self.parse_value_spec(keyword),
        }
    }

    fn parse_import_spec(&mut self) -> SpecId {
        let first = self.tid();
        // Pre-allocate so the alias symbol can reference the spec.
        let spec_id = self.arena.alloc_spec(Spec {
            kind: SpecKind::Import(ImportSpec {
                alias: None,
                dot: false,
                path_tok: first,
                path: None,
            }),
            range: TokenRange::new(first, first),
        });

        let mut dot = false;
        let mut alias = None;
        if self.accept(TokenKind::Period).is_some() {
            dot = true;
        } else if self.at(TokenKind::Ident) {
            alias = Some(IdentBinding::new(self.tid(), self.token().name.unwrap_or(known::BLANK)));
            self.next();
        }

        let mut path = None;
        let path_tok = if self.at(TokenKind::Str) {
            path = self.token().name;
            let t = self.tid();
            self.next();
            t
        } else {
            self.error_here("expected import path string".to_string());
            self.tid()
        };
        self.expect_semi();

        if let Some(path_name) = path {
            let path_text = self.interner.resolve(path_name).to_string();
            let effective = match &alias {
                Some(a) => a.name,
                None => {
                    let segment = path_text.rsplit('/').next().unwrap_or(&path_text);
                    self.interner.intern(segment)
                }
            };
            if !dot && effective != known::BLANK {
                let mut binding = alias
                    .unwrap_or_else(|| IdentBinding::new(path_tok, effective));
                self.declare_in(
                    &mut binding,
                    SymbolKind::Package,
                    SymbolNode::Import(spec_id),
                    self.file_scope,
                );
                alias = alias.map(|_| binding);
            }
            self.imports.push(ImportBinding {
                alias: effective,
                path: path_text,
                spec: spec_id,
            });
        }

        let range = TokenRange::new(first, self.prev_tid());
        *self.arena.spec_mut(spec_id) = Spec {
            kind: SpecKind::Import(ImportSpec {
                alias,
                dot,
                path_tok,
                path,
            }),
            range,
        };
        spec_id
    }

    fn parse_value_spec(&mut self, keyword: TokenKind) -> SpecId {
        let first = self.tid();
        let spec_id = self.arena.alloc_spec(Spec {
            kind: SpecKind::Value(ValueSpec {
                keyword,
                names: Vec::new(),
                ty: None,
                values: Vec::new(),
            }),
            range: TokenRange::new(first, first),
        });

        let mut names = self.parse_ident_list();
        let ty = self.try_type();
        let mut values = Vec::new();
        if self.accept(TokenKind::Assign).is_some() {
            values = self.parse_rhs_list();
        }
        self.expect_semi();

        if keyword == TokenKind::Var && ty.is_none() && values.is_empty() {
            self.error_tok(first, "missing variable type or initializer".to_string());
        }

        let kind = if keyword == TokenKind::Const {
            SymbolKind::Const
        } else {
            SymbolKind::Var
        };
        for (i, name) in names.iter_mut().enumerate() {
            self.declare(
                name,
                kind,
                SymbolNode::Spec {
                    spec: spec_id,
                    index: i as u32,
                },
            );
        }
        self.seal(&names);

        let range = TokenRange::new(first, self.prev_tid());
        *self.arena.spec_mut(spec_id) = Spec {
            kind: SpecKind::Value(ValueSpec {
                keyword,
                names,
                ty,
                values,
            }),
            range,
        };
        spec_id
    }

    fn parse_type_spec(&mut self) -> SpecId {
        let first = self.tid();
        let spec_id = self.arena.alloc_spec(Spec {
            kind: SpecKind::Type(TypeSpec {
                name: IdentBinding::new(first, known::BLANK),
                alias: false,
                ty: TypeExprId(0),
            }),
            range: TokenRange::new(first, first),
        });

        let mut name = self.parse_ident();
        // Declare before the definition so the type can refer to itself.
        self.declare(
            &mut name,
            SymbolKind::Type,
            SymbolNode::Spec {
                spec: spec_id,
                index: 0,
            },
        );
        let alias = self.accept(TokenKind::Assign).is_some();
        let ty = self.parse_type();
        self.expect_semi();
        self.seal(std::slice::from_ref(&name));

        let range = TokenRange::new(first, self.prev_tid());
        *self.arena.spec_mut(spec_id) = Spec {
            kind: SpecKind::Type(TypeSpec { name, alias, ty }),
            range,
        };
        spec_id
    }

    // ── Function declarations ────────────────────────────────────────

    fn parse_func_decl(&mut self) -> DeclId {
        let first = self.expect(TokenKind::Func);
        let decl_id = self.arena.alloc_decl(Decl {
            kind: DeclKind::Bad,
            range: TokenRange::new(first, first),
        });

        let func_scope = self.open_scope(ScopeKind::Func);

        let mut recv = None;
        if self.at(TokenKind::LParen) {
            let mut fields = self.parse_parameter_list();
            if fields.is_empty() {
                self.error_tok(first, "method has no receiver".to_string());
            } else if fields.len() > 1 || fields[0].names.len() > 1 {
                self.error_tok(first, "method has multiple receivers".to_string());
            }
            if !fields.is_empty() {
                let mut field = fields.remove(0);
                for name in &mut field.names {
                    self.declare(name, SymbolKind::Arg, SymbolNode::Receiver(decl_id));
                }
                self.seal(&field.names);
                recv = Some(field);
            }
        }

        let mut name = self.parse_ident();
        let sig = self.parse_signature(true);

        let body = if self.at(TokenKind::LBrace) {
            match self.mode {
                ParseMode::Fast => {
                    self.skip_balanced_braces();
                    None
                }
                ParseMode::Full => Some(self.parse_block()),
            }
        } else {
            None
        };
        self.expect_semi();
        self.close_scope();

        match &recv {
            None => {
                self.declare_in(
                    &mut name,
                    SymbolKind::Func,
                    SymbolNode::Func(decl_id),
                    self.file_scope,
                );
            }
            Some(field) => {
                // A method whose receiver base type is a plain type name is
                // registered in the file's methods table; that table is the
                // only route by which method sets resolve later.
                if let Some(recv_name) = self.receiver_base_name(field.ty) {
                    self.methods.insert((recv_name, name.name), decl_id);
                }
            }
        }

        let range = TokenRange::new(first, self.prev_tid());
        *self.arena.decl_mut(decl_id) = Decl {
            kind: DeclKind::Func(FuncDecl {
                recv,
                name,
                sig,
                body,
                scope: func_scope,
            }),
            range,
        };
        decl_id
    }

    /// Strip pointers and parens off a receiver type down to a plain
    /// (unqualified) type name.
    fn receiver_base_name(&self, mut ty: TypeExprId) -> Option<Name> {
        loop {
            match &self.arena.type_expr(ty).kind {
                TypeExprKind::Pointer { elem } | TypeExprKind::Paren { inner: elem } => ty = *elem,
                TypeExprKind::Name {
                    package: None,
                    ident,
                } => return Some(ident.name),
                _ => return None,
            }
        }
    }

    fn skip_balanced_braces(&mut self) {
        let mut depth = 0u32;
        loop {
            match self.tok() {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        self.next();
                        return;
                    }
                }
                TokenKind::Eof => return,
                _ => {}
            }
            self.next();
        }
    }

    // ── Signatures, parameters, fields ───────────────────────────────

    /// Parse `(params) results` into a `Func` type node. With `declare`
    /// set, parameters and named results are declared into the current
    /// (function) scope.
    fn parse_signature(&mut self, declare: bool) -> TypeExprId {
        let first = self.tid();
        let sig_id = self.arena.alloc_type(TypeExpr {
            kind: TypeExprKind::Bad,
            range: TokenRange::new(first, first),
        });

        let mut params = self.parse_parameter_list();
        let mut results = Vec::new();
        if self.at(TokenKind::LParen) {
            results = self.parse_parameter_list();
        } else if self.starts_type() {
            let ty = self.parse_type();
            results.push(Field {
                names: Vec::new(),
                ty,
                tag: None,
                embedded: false,
            });
        }

        if declare {
            for (set, fields) in [(false, &mut params), (true, &mut results)] {
                for (pi, field) in fields.iter_mut().enumerate() {
                    for (ni, name) in field.names.iter_mut().enumerate() {
                        self.declare(
                            name,
                            SymbolKind::Arg,
                            SymbolNode::Arg {
                                sig: sig_id,
                                param: pi as u32,
                                name: ni as u32,
                                result: set,
                            },
                        );
                    }
                    self.seal(&field.names);
                }
            }
        }

        let range = TokenRange::new(first, self.prev_tid());
        *self.arena.type_expr_mut(sig_id) = TypeExpr {
            kind: TypeExprKind::Func(FuncSig { params, results }),
            range,
        };
        sig_id
    }

    fn parse_parameter_list(&mut self) -> Vec<Field> {
        let mut fields = Vec::new();
        self.expect(TokenKind::LParen);
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            fields.push(self.parse_param_entry());
            if self.accept(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expect(TokenKind::RParen);
        fields
    }

    /// One comma-separated parameter entry: either `a, b T` or a bare
    /// type. Resolved by collecting identifiers speculatively and backing
    /// out if no type follows.
    fn parse_param_entry(&mut self) -> Field {
        if self.at(TokenKind::Ident) {
            let save = (self.pos, self.prev);
            let mut names = vec![self.parse_ident()];
            while self.at(TokenKind::Comma) && self.peek_kind() == TokenKind::Ident {
                self.next();
                names.push(self.parse_ident());
            }
            let named = !self.at(TokenKind::Period)
                && !self.at(TokenKind::Comma)
                && (self.starts_type() || self.at(TokenKind::Ellipsis));
            if named {
                let ty = self.parse_param_type();
                return Field {
                    names,
                    ty,
                    tag: None,
                    embedded: false,
                };
            }
            // Just types after all.
            (self.pos, self.prev) = save;
        }
        let ty = self.parse_param_type();
        Field {
            names: Vec::new(),
            ty,
            tag: None,
            embedded: false,
        }
    }

    fn parse_param_type(&mut self) -> TypeExprId {
        if let Some(ellipsis) = self.accept(TokenKind::Ellipsis) {
            let elem = self.parse_type();
            let last = self.prev_tid();
            return self.arena.alloc_type(TypeExpr {
                kind: TypeExprKind::Variadic { elem },
                range: TokenRange::new(ellipsis, last),
            });
        }
        self.parse_type()
    }

    // ── Types ────────────────────────────────────────────────────────

    fn starts_type(&self) -> bool {
        matches!(
            self.tok(),
            TokenKind::Ident
                | TokenKind::LBracket
                | TokenKind::Struct
                | TokenKind::Mul
                | TokenKind::Func
                | TokenKind::Interface
                | TokenKind::Map
                | TokenKind::Chan
                | TokenKind::Arrow
                | TokenKind::LParen
        )
    }

    fn try_type(&mut self) -> Option<TypeExprId> {
        if self.starts_type() {
            Some(self.parse_type())
        } else {
            None
        }
    }

    fn parse_type(&mut self) -> TypeExprId {
        let first = self.tid();
        match self.tok() {
            TokenKind::Ident => self.parse_type_name(),
            TokenKind::Mul => {
                self.next();
                let elem = self.parse_type();
                self.alloc_type(TypeExprKind::Pointer { elem }, first)
            }
            TokenKind::LBracket => {
                self.next();
                let len = if self.at(TokenKind::RBracket) {
                    ArrayLen::Slice
                } else if self.accept(TokenKind::Ellipsis).is_some() {
                    ArrayLen::Ellipsis
                } else {
                    self.expr_lev += 1;
                    let len = self.parse_expr();
                    self.expr_lev -= 1;
                    ArrayLen::Fixed(len)
                };
                self.expect(TokenKind::RBracket);
                let elem = self.parse_type();
                self.alloc_type(TypeExprKind::Array { len, elem }, first)
            }
            TokenKind::Struct => self.parse_struct_type(),
            TokenKind::Interface => self.parse_interface_type(),
            TokenKind::Map => {
                self.next();
                self.expect(TokenKind::LBracket);
                let key = self.parse_type();
                self.expect(TokenKind::RBracket);
                let value = self.parse_type();
                self.alloc_type(TypeExprKind::Map { key, value }, first)
            }
            TokenKind::Chan => {
                self.next();
                let dir = if self.accept(TokenKind::Arrow).is_some() {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                let elem = self.parse_type();
                self.alloc_type(TypeExprKind::Chan { dir, elem }, first)
            }
            TokenKind::Arrow => {
                self.next();
                self.expect(TokenKind::Chan);
                let elem = self.parse_type();
                self.alloc_type(
                    TypeExprKind::Chan {
                        dir: ChanDir::Recv,
                        elem,
                    },
                    first,
                )
            }
            TokenKind::Func => {
                self.next();
                self.parse_signature(false)
            }
            TokenKind::LParen => {
                self.next();
                let inner = self.parse_type();
                self.expect(TokenKind::RParen);
                self.alloc_type(TypeExprKind::Paren { inner }, first)
            }
            _ => {
                self.error_here(format!("expected type, found '{}'", self.tok()));
                // Make progress unless the token closes an enclosing
                // construct.
                if !matches!(
                    self.tok(),
                    TokenKind::Semicolon
                        | TokenKind::RParen
                        | TokenKind::RBrace
                        | TokenKind::RBracket
                        | TokenKind::Comma
                        | TokenKind::Eof
                ) {
                    self.next();
                }
                self.alloc_type(TypeExprKind::Bad, first)
            }
        }
    }

    fn alloc_type(&mut self, kind: TypeExprKind, first: TokenId) -> TypeExprId {
        let range = TokenRange::new(first, self.prev_tid());
        self.arena.alloc_type(TypeExpr { kind, range })
    }

    fn parse_type_name(&mut self) -> TypeExprId {
        let first = self.tid();
        let ident = self.parse_ident();
        if self.at(TokenKind::Period) && self.peek_kind() == TokenKind::Ident {
            self.next();
            let qualified = self.parse_ident();
            return self.alloc_type(
                TypeExprKind::Name {
                    package: Some(ident),
                    ident: qualified,
                },
                first,
            );
        }
        self.alloc_type(
            TypeExprKind::Name {
                package: None,
                ident,
            },
            first,
        )
    }

    fn parse_struct_type(&mut self) -> TypeExprId {
        let first = self.expect(TokenKind::Struct);
        self.expect(TokenKind::LBrace);
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            fields.push(self.parse_field_decl());
            self.expect_semi();
        }
        self.expect(TokenKind::RBrace);
        self.alloc_type(TypeExprKind::Struct { fields }, first)
    }

    fn parse_field_decl(&mut self) -> Field {
        let mut embedded = false;
        let mut names = Vec::new();
        let ty;

        if self.at(TokenKind::Mul) {
            // Embedded pointer field.
            embedded = true;
            ty = self.parse_type();
        } else if self.at(TokenKind::Ident) {
            let save = (self.pos, self.prev);
            names.push(self.parse_ident());
            while self.at(TokenKind::Comma) && self.peek_kind() == TokenKind::Ident {
                self.next();
                names.push(self.parse_ident());
            }
            if !self.at(TokenKind::Period) && self.starts_type() {
                ty = self.parse_type();
            } else {
                // Embedded (possibly qualified) type name.
                (self.pos, self.prev) = save;
                names.clear();
                embedded = true;
                ty = self.parse_type_name();
            }
        } else {
            self.error_here(format!("expected field declaration, found '{}'", self.tok()));
            let first = self.tid();
            if !matches!(self.tok(), TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof) {
                self.next();
            }
            ty = self.alloc_type(TypeExprKind::Bad, first);
        }

        let tag = if self.at(TokenKind::Str) {
            let t = self.tid();
            self.next();
            Some(t)
        } else {
            None
        };
        Field {
            names,
            ty,
            tag,
            embedded,
        }
    }

    fn parse_interface_type(&mut self) -> TypeExprId {
        let first = self.expect(TokenKind::Interface);
        self.expect(TokenKind::LBrace);
        let mut elems = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if self.at(TokenKind::Ident) && self.peek_kind() == TokenKind::LParen {
                let name = self.parse_ident();
                let sig = self.parse_signature(false);
                elems.push(InterfaceElem::Method { name, sig });
            } else {
                elems.push(InterfaceElem::Embedded(self.parse_type()));
            }
            self.expect_semi();
        }
        self.expect(TokenKind::RBrace);
        self.alloc_type(TypeExprKind::Interface { elems }, first)
    }

    // ── Identifiers ──────────────────────────────────────────────────

    fn parse_ident(&mut self) -> IdentBinding {
        if self.at(TokenKind::Ident) {
            let binding = IdentBinding::new(self.tid(), self.token().name.unwrap_or(known::BLANK));
            self.next();
            binding
        } else {
            self.error_here(format!("expected identifier, found '{}'", self.tok()));
            IdentBinding::new(self.tid(), known::BLANK)
        }
    }

    fn parse_ident_list(&mut self) -> Vec<IdentBinding> {
        let mut names = vec![self.parse_ident()];
        while self.accept(TokenKind::Comma).is_some() {
            names.push(self.parse_ident());
        }
        names
    }

    // ── Statements ───────────────────────────────────────────────────

    fn parse_block(&mut self) -> StmtId {
        let scope = self.open_scope(ScopeKind::Block);
        let first = self.expect(TokenKind::LBrace);
        let stmts = self.parse_stmt_list();
        self.expect(TokenKind::RBrace);
        self.close_scope();
        self.arena.alloc_stmt(Stmt {
            kind: StmtKind::Block(Block { stmts, scope }),
            range: TokenRange::new(first, self.prev_tid()),
        })
    }

    fn parse_stmt_list(&mut self) -> Vec<StmtId> {
        let mut stmts = Vec::new();
        while !matches!(
            self.tok(),
            TokenKind::RBrace | TokenKind::Case | TokenKind::Default | TokenKind::Eof
        ) {
            stmts.push(self.parse_stmt());
        }
        stmts
    }

    fn parse_stmt(&mut self) -> StmtId {
        let first = self.tid();
        match self.tok() {
            TokenKind::Const | TokenKind::Var | TokenKind::Type => {
                let decl = self.parse_gen_decl();
                self.arena.alloc_stmt(Stmt {
                    kind: StmtKind::Decl { decl },
                    range: TokenRange::new(first, self.prev_tid()),
                })
            }
            TokenKind::Go | TokenKind::Defer => {
                let keyword = self.tok();
                self.next();
                let call = self.parse_rhs();
                if !matches!(self.arena.expr(call).kind, ExprKind::Call { .. }) {
                    self.error_tok(first, format!("expression in '{keyword}' must be a function call"));
                }
                self.expect_semi();
                let kind = if keyword == TokenKind::Go {
                    StmtKind::Go { call }
                } else {
                    StmtKind::Defer { call }
                };
                self.alloc_stmt(kind, first)
            }
            TokenKind::Return => {
                self.next();
                let mut results = Vec::new();
                if !matches!(
                    self.tok(),
                    TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
                ) {
                    results = self.parse_rhs_list();
                }
                self.expect_semi();
                self.alloc_stmt(StmtKind::Return { results }, first)
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Goto | TokenKind::Fallthrough => {
                let keyword = self.tok();
                self.next();
                let mut label = None;
                if keyword != TokenKind::Fallthrough && self.at(TokenKind::Ident) {
                    label = Some(self.parse_ident());
                }
                self.expect_semi();
                self.alloc_stmt(StmtKind::Branch { keyword, label }, first)
            }
            TokenKind::LBrace => {
                let block = self.parse_block();
                self.expect_semi();
                block
            }
            TokenKind::If => self.parse_if_stmt(),
            TokenKind::Switch => self.parse_switch_stmt(),
            TokenKind::Select => self.parse_select_stmt(),
            TokenKind::For => self.parse_for_stmt(),
            TokenKind::Semicolon => {
                self.next();
                self.alloc_stmt(StmtKind::Empty, first)
            }
            TokenKind::Ident if self.peek_kind() == TokenKind::Colon => {
                // Labeled statement.
                let stmt_id = self.arena.alloc_stmt(Stmt {
                    kind: StmtKind::Bad,
                    range: TokenRange::new(first, first),
                });
                let mut label = self.parse_ident();
                self.expect(TokenKind::Colon);
                self.declare(&mut label, SymbolKind::Label, SymbolNode::Label(stmt_id));
                self.seal(std::slice::from_ref(&label));
                let inner = if matches!(self.tok(), TokenKind::RBrace | TokenKind::Eof) {
                    None
                } else {
                    Some(self.parse_stmt())
                };
                *self.arena.stmt_mut(stmt_id) = Stmt {
                    kind: StmtKind::Labeled { label, stmt: inner },
                    range: TokenRange::new(first, self.prev_tid()),
                };
                stmt_id
            }
            TokenKind::Eof => self.alloc_stmt(StmtKind::Bad, first),
            _ => {
                let out = self.parse_simple_stmt(false);
                self.expect_semi();
                match out {
                    SimpleOut::Stmt(s) => s,
                    SimpleOut::Range { .. } => {
                        // `range` outside a for header.
                        self.error_tok(first, "range is only valid in a for statement".to_string());
                        self.alloc_stmt(StmtKind::Bad, first)
                    }
                }
            }
        }
    }

    fn alloc_stmt(&mut self, kind: StmtKind, first: TokenId) -> StmtId {
        let range = TokenRange::new(first, self.prev_tid());
        self.arena.alloc_stmt(Stmt { kind, range })
    }

    fn parse_simple_stmt(&mut self, allow_range: bool) -> SimpleOut {
        let first = self.tid();
        let lhs = self.parse_expr_list();

        match self.tok() {
            TokenKind::Define => {
                self.next();
                if allow_range && self.at(TokenKind::Range) {
                    self.next();
                    let subject = self.parse_rhs();
                    return SimpleOut::Range {
                        key: lhs.first().copied(),
                        value: lhs.get(1).copied(),
                        define: true,
                        subject,
                    };
                }
                let values = self.parse_rhs_list();
                return SimpleOut::Stmt(self.build_short_var_decl(first, &lhs, values));
            }
            kind if kind.is_assign_op() => {
                let op = kind;
                self.next();
                if allow_range && op == TokenKind::Assign && self.at(TokenKind::Range) {
                    self.next();
                    let subject = self.parse_rhs();
                    return SimpleOut::Range {
                        key: lhs.first().copied(),
                        value: lhs.get(1).copied(),
                        define: false,
                        subject,
                    };
                }
                let rhs = self.parse_rhs_list();
                return SimpleOut::Stmt(self.alloc_stmt(StmtKind::Assign { lhs, op, rhs }, first));
            }
            TokenKind::Arrow => {
                self.next();
                let value = self.parse_rhs();
                let chan = lhs.first().copied().unwrap_or_else(|| self.bad_expr(first));
                if lhs.len() != 1 {
                    self.error_tok(first, "expected one expression before '<-'".to_string());
                }
                return SimpleOut::Stmt(self.alloc_stmt(StmtKind::Send { chan, value }, first));
            }
            TokenKind::Inc | TokenKind::Dec => {
                let op = self.tok();
                self.next();
                let expr = lhs.first().copied().unwrap_or_else(|| self.bad_expr(first));
                return SimpleOut::Stmt(self.alloc_stmt(StmtKind::IncDec { expr, op }, first));
            }
            _ => {}
        }

        if lhs.len() > 1 {
            self.error_tok(first, "expected one expression".to_string());
        }
        let expr = lhs.first().copied().unwrap_or_else(|| self.bad_expr(first));
        SimpleOut::Stmt(self.alloc_stmt(StmtKind::Expr { expr }, first))
    }

    /// Build `a, b := rhs`, declaring each non-blank new name with its
    /// tuple index. Left-hand expressions that are not identifiers are
    /// reported. A name already declared in the current scope is reused
    /// silently (Go permits mixed `:=` as long as one name is new; for
    /// tooling purposes redeclaration here is never an error).
    fn build_short_var_decl(&mut self, first: TokenId, lhs: &[ExprId], values: Vec<ExprId>) -> StmtId {
        let stmt_id = self.arena.alloc_stmt(Stmt {
            kind: StmtKind::Bad,
            range: TokenRange::new(first, first),
        });
        let mut names = Vec::with_capacity(lhs.len());
        let mut new_syms = Vec::new();
        for (i, &expr) in lhs.iter().enumerate() {
            match self.arena.expr(expr).kind {
                ExprKind::Ident(binding) => {
                    let mut binding = binding;
                    if binding.name != known::BLANK {
                        match self.scopes.find(self.scope, binding.name) {
                            // `a, err := f()` with `err` already declared
                            // in this scope reuses the existing variable.
                            Some(existing) => binding.symbol = Some(existing),
                            None => {
                                self.declare(
                                    &mut binding,
                                    SymbolKind::Var,
                                    SymbolNode::ShortVar {
                                        stmt: stmt_id,
                                        index: i as u32,
                                    },
                                );
                                new_syms.extend(binding.symbol);
                            }
                        }
                    }
                    names.push(binding);
                }
                _ => {
                    let tok = self.arena.expr(expr).range.first;
                    self.error_tok(tok, "non-name on left side of ':='".to_string());
                }
            }
        }
        let end = self.prev_tid();
        for sym in new_syms {
            self.scopes.symbol_mut(sym).decl_end = end;
        }
        *self.arena.stmt_mut(stmt_id) = Stmt {
            kind: StmtKind::ShortVarDecl { names, values },
            range: TokenRange::new(first, self.prev_tid()),
        };
        stmt_id
    }

    fn bad_expr(&mut self, first: TokenId) -> ExprId {
        self.arena.alloc_expr(Expr {
            kind: ExprKind::Bad,
            range: TokenRange::new(first, first),
        })
    }

    /// Parse `[init ;] cond`-style headers shared by `if` and `switch`.
    /// Composite literals are suppressed by the negative expression level.
    fn parse_header(&mut self) -> (Option<StmtId>, Option<StmtId>) {
        let saved_lev = self.expr_lev;
        self.expr_lev = -1;
        let mut init = None;
        let mut cond = None;
        if !self.at(TokenKind::LBrace) {
            if !self.at(TokenKind::Semicolon) {
                match self.parse_simple_stmt(false) {
                    SimpleOut::Stmt(s) => cond = Some(s),
                    SimpleOut::Range { .. } => {}
                }
            }
            if self.at(TokenKind::Semicolon) {
                self.next();
                init = cond.take();
                if !self.at(TokenKind::LBrace) && !self.at(TokenKind::Semicolon) {
                    match self.parse_simple_stmt(false) {
                        SimpleOut::Stmt(s) => cond = Some(s),
                        SimpleOut::Range { .. } => {}
                    }
                }
            }
        }
        self.expr_lev = saved_lev;
        (init, cond)
    }

    /// Pull the expression out of a condition statement.
    fn cond_expr(&mut self, stmt: Option<StmtId>, keyword_tok: TokenId) -> Option<ExprId> {
        let stmt = stmt?;
        match self.arena.stmt(stmt).kind {
            StmtKind::Expr { expr } => Some(expr),
            _ => {
                self.error_tok(keyword_tok, "expected expression".to_string());
                None
            }
        }
    }

    fn parse_if_stmt(&mut self) -> StmtId {
        let first = self.expect(TokenKind::If);
        let scope = self.open_scope(ScopeKind::Block);
        let (init, cond_stmt) = self.parse_header();
        let cond = self.cond_expr(cond_stmt, first);
        if cond.is_none() && init.is_none() {
            self.error_tok(first, "missing condition in if statement".to_string());
        }
        let then = self.parse_block();
        let els = if self.accept(TokenKind::Else).is_some() {
            if self.at(TokenKind::If) {
                Some(self.parse_if_stmt())
            } else if self.at(TokenKind::LBrace) {
                let b = self.parse_block();
                self.expect_semi();
                Some(b)
            } else {
                self.error_here("expected 'if' or block after 'else'".to_string());
                None
            }
        } else {
            self.expect_semi();
            None
        };
        self.close_scope();
        self.alloc_stmt(
            StmtKind::If {
                init,
                cond,
                then,
                els,
                scope,
            },
            first,
        )
    }

    /// Does this statement make the enclosing switch a type switch? If so,
    /// return the `x.(type)` expression and the optional binding name.
    fn type_switch_subject(&self, stmt: StmtId) -> Option<(ExprId, Option<IdentBinding>)> {
        let is_type_assert = |expr: ExprId| -> Option<ExprId> {
            let mut e = expr;
            loop {
                match self.arena.expr(e).kind {
                    ExprKind::Paren { inner } => e = inner,
                    ExprKind::TypeAssert { ty: None, .. } => return Some(e),
                    _ => return None,
                }
            }
        };
        match &self.arena.stmt(stmt).kind {
            StmtKind::Expr { expr } => is_type_assert(*expr).map(|e| (e, None)),
            StmtKind::ShortVarDecl { names, values } if values.len() == 1 && names.len() == 1 => {
                is_type_assert(values[0]).map(|e| (e, Some(names[0])))
            }
            _ => None,
        }
    }

    fn parse_switch_stmt(&mut self) -> StmtId {
        let first = self.expect(TokenKind::Switch);
        let stmt_id = self.arena.alloc_stmt(Stmt {
            kind: StmtKind::Bad,
            range: TokenRange::new(first, first),
        });
        let scope = self.open_scope(ScopeKind::Block);
        let (init, tag_stmt) = self.parse_header();

        let type_switch = tag_stmt.and_then(|s| self.type_switch_subject(s));
        let cases = self.parse_case_clauses(stmt_id, type_switch.as_ref().and_then(|(_, b)| *b));
        self.expect_semi();
        self.close_scope();

        let kind = match type_switch {
            Some((subject, binding)) => StmtKind::TypeSwitch {
                init,
                binding,
                subject,
                cases,
                scope,
            },
            None => {
                let tag = tag_stmt.and_then(|s| match self.arena.stmt(s).kind {
                    StmtKind::Expr { expr } => Some(expr),
                    _ => None,
                });
                StmtKind::Switch {
                    init,
                    tag,
                    cases,
                    scope,
                }
            }
        };
        *self.arena.stmt_mut(stmt_id) = Stmt {
            kind,
            range: TokenRange::new(first, self.prev_tid()),
        };
        stmt_id
    }

    fn parse_case_clauses(
        &mut self,
        switch_stmt: StmtId,
        binding: Option<IdentBinding>,
    ) -> Vec<CaseClause> {
        let mut cases = Vec::new();
        self.expect(TokenKind::LBrace);
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let case_first = self.tid();
            let mut exprs = Vec::new();
            match self.tok() {
                TokenKind::Case => {
                    self.next();
                    exprs = self.parse_rhs_list();
                }
                TokenKind::Default => {
                    self.next();
                }
                _ => {
                    self.error_here(format!("expected 'case' or 'default', found '{}'", self.tok()));
                    self.sync_stmt();
                    continue;
                }
            }
            self.expect(TokenKind::Colon);
            let scope = self.open_scope(ScopeKind::Block);
            // Each case of `v := x.(type)` gets its own `v`, typed by that
            // case's type list.
            let mut case_binding = None;
            if let Some(b) = binding {
                let mut b = b;
                b.symbol = None;
                self.declare(
                    &mut b,
                    SymbolKind::Var,
                    SymbolNode::TypeSwitchVar {
                        stmt: switch_stmt,
                        case: cases.len() as u32,
                    },
                );
                case_binding = b.symbol;
            }
            let body = self.parse_stmt_list();
            self.close_scope();
            cases.push(CaseClause {
                exprs,
                body,
                range: TokenRange::new(case_first, self.prev_tid()),
                scope,
                binding: case_binding,
            });
        }
        self.expect(TokenKind::RBrace);
        cases
    }

    fn parse_select_stmt(&mut self) -> StmtId {
        let first = self.expect(TokenKind::Select);
        let mut cases = Vec::new();
        self.expect(TokenKind::LBrace);
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let case_first = self.tid();
            let mut comm = None;
            match self.tok() {
                TokenKind::Case => {
                    self.next();
                    let scope = self.open_scope(ScopeKind::Block);
                    match self.parse_simple_stmt(false) {
                        SimpleOut::Stmt(s) => comm = Some(s),
                        SimpleOut::Range { .. } => {}
                    }
                    self.expect(TokenKind::Colon);
                    let body = self.parse_stmt_list();
                    self.close_scope();
                    cases.push(CommClause {
                        comm,
                        body,
                        range: TokenRange::new(case_first, self.prev_tid()),
                        scope,
                    });
                    continue;
                }
                TokenKind::Default => {
                    self.next();
                    self.expect(TokenKind::Colon);
                    let scope = self.open_scope(ScopeKind::Block);
                    let body = self.parse_stmt_list();
                    self.close_scope();
                    cases.push(CommClause {
                        comm,
                        body,
                        range: TokenRange::new(case_first, self.prev_tid()),
                        scope,
                    });
                    continue;
                }
                _ => {
                    self.error_here(format!("expected 'case' or 'default', found '{}'", self.tok()));
                    self.sync_stmt();
                }
            }
        }
        self.expect(TokenKind::RBrace);
        self.expect_semi();
        self.alloc_stmt(StmtKind::Select { cases }, first)
    }

    fn parse_for_stmt(&mut self) -> StmtId {
        let first = self.expect(TokenKind::For);
        let stmt_id = self.arena.alloc_stmt(Stmt {
            kind: StmtKind::Bad,
            range: TokenRange::new(first, first),
        });
        let scope = self.open_scope(ScopeKind::Block);

        let saved_lev = self.expr_lev;
        self.expr_lev = -1;

        let mut init = None;
        let mut cond_stmt = None;
        let mut post = None;
        let mut range_parts = None;

        if !self.at(TokenKind::LBrace) {
            if self.at(TokenKind::Range) {
                // `for range ch {}`
                self.next();
                let subject = self.parse_rhs();
                range_parts = Some((None, None, false, subject));
            } else {
                if !self.at(TokenKind::Semicolon) {
                    match self.parse_simple_stmt(true) {
                        SimpleOut::Stmt(s) => cond_stmt = Some(s),
                        SimpleOut::Range {
                            key,
                            value,
                            define,
                            subject,
                        } => range_parts = Some((key, value, define, subject)),
                    }
                }
                if range_parts.is_none() && self.at(TokenKind::Semicolon) {
                    self.next();
                    init = cond_stmt.take();
                    if !self.at(TokenKind::Semicolon) && !self.at(TokenKind::LBrace) {
                        match self.parse_simple_stmt(false) {
                            SimpleOut::Stmt(s) => cond_stmt = Some(s),
                            SimpleOut::Range { .. } => {}
                        }
                    }
                    if self.at(TokenKind::Semicolon) {
                        self.next();
                    }
                    if !self.at(TokenKind::LBrace) {
                        match self.parse_simple_stmt(false) {
                            SimpleOut::Stmt(s) => post = Some(s),
                            SimpleOut::Range { .. } => {}
                        }
                    }
                }
            }
        }
        self.expr_lev = saved_lev;

        let kind = if let Some((key, value, define, subject)) = range_parts {
            let (key_binding, value_binding) = if define {
                let kb = key.and_then(|e| self.declare_range_var(e, stmt_id, 0));
                let vb = value.and_then(|e| self.declare_range_var(e, stmt_id, 1));
                (kb, vb)
            } else {
                (None, None)
            };
            let body = self.parse_block();
            self.expect_semi();
            StmtKind::Range {
                key,
                value,
                define,
                key_binding,
                value_binding,
                subject,
                body,
                scope,
            }
        } else {
            let cond = cond_stmt.and_then(|s| match self.arena.stmt(s).kind {
                StmtKind::Expr { expr } => Some(expr),
                _ => {
                    // Keep the statement as init if it wasn't a plain
                    // condition, e.g. `for i := 0 {`.
                    init.get_or_insert(s);
                    None
                }
            });
            let body = self.parse_block();
            self.expect_semi();
            StmtKind::For {
                init,
                cond,
                post,
                body,
                scope,
            }
        };
        self.close_scope();
        *self.arena.stmt_mut(stmt_id) = Stmt {
            kind,
            range: TokenRange::new(first, self.prev_tid()),
        };
        stmt_id
    }

    fn declare_range_var(&mut self, expr: ExprId, stmt: StmtId, index: u32) -> Option<SymbolId> {
        match self.arena.expr(expr).kind {
            ExprKind::Ident(binding) => {
                let mut binding = binding;
                binding.symbol = None;
                self.declare(
                    &mut binding,
                    SymbolKind::Var,
                    SymbolNode::RangeVar { stmt, index },
                );
                self.seal(std::slice::from_ref(&binding));
                binding.symbol
            }
            _ => {
                let tok = self.arena.expr(expr).range.first;
                self.error_tok(tok, "non-name on left side of ':='".to_string());
                None
            }
        }
    }

    // ── Expressions ──────────────────────────────────────────────────

    fn parse_expr_list(&mut self) -> Vec<ExprId> {
        let mut list = vec![self.parse_expr()];
        while self.accept(TokenKind::Comma).is_some() {
            list.push(self.parse_expr());
        }
        list
    }

    fn parse_rhs(&mut self) -> ExprId {
        let saved = self.in_rhs;
        self.in_rhs = true;
        let e = self.parse_expr();
        self.in_rhs = saved;
        e
    }

    fn parse_rhs_list(&mut self) -> Vec<ExprId> {
        let saved = self.in_rhs;
        self.in_rhs = true;
        let list = self.parse_expr_list();
        self.in_rhs = saved;
        list
    }

    fn parse_expr(&mut self) -> ExprId {
        self.parse_binary_expr(1)
    }

    /// Current binary operator and its precedence. Inside a right-hand
    /// side `=` is tolerated as a mistyped `==`, which keeps if/for/switch
    /// headers parseable mid-edit.
    fn current_op(&self) -> (TokenKind, u8) {
        let mut kind = self.tok();
        if self.in_rhs && kind == TokenKind::Assign {
            kind = TokenKind::Eql;
        }
        (kind, kind.precedence())
    }

    /// Precedence climbing: parse operators binding at least as tightly
    /// as `min_prec`.
    fn parse_binary_expr(&mut self, min_prec: u8) -> ExprId {
        let first = self.tid();
        let mut x = self.parse_unary_expr();
        loop {
            let (op, prec) = self.current_op();
            if prec < min_prec {
                return x;
            }
            self.next();
            let y = self.parse_binary_expr(prec + 1);
            x = self.arena.alloc_expr(Expr {
                kind: ExprKind::Binary { op, left: x, right: y },
                range: TokenRange::new(first, self.prev_tid()),
            });
        }
    }

    fn parse_unary_expr(&mut self) -> ExprId {
        let first = self.tid();
        match self.tok() {
            TokenKind::Add | TokenKind::Sub | TokenKind::Not | TokenKind::Xor | TokenKind::And => {
                let op = self.tok();
                self.next();
                let operand = self.parse_unary_expr();
                self.arena.alloc_expr(Expr {
                    kind: ExprKind::Unary { op, operand },
                    range: TokenRange::new(first, self.prev_tid()),
                })
            }
            TokenKind::Mul => {
                self.next();
                let operand = self.parse_unary_expr();
                self.arena.alloc_expr(Expr {
                    kind: ExprKind::Star { operand },
                    range: TokenRange::new(first, self.prev_tid()),
                })
            }
            TokenKind::Arrow => {
                let arrow_tok = self.tid();
                self.next();
                let operand = self.parse_unary_expr();
                // `<-` before a channel type is a receive-only channel
                // type, not a receive operation; repair the direction on
                // the innermost undirected chan of the chain.
                if let ExprKind::Type { ty } = self.arena.expr(operand).kind {
                    if matches!(self.arena.type_expr(ty).kind, TypeExprKind::Chan { .. }) {
                        self.reassociate_chan_arrow(ty, arrow_tok);
                        return self.arena.alloc_expr(Expr {
                            kind: ExprKind::Type { ty },
                            range: TokenRange::new(first, self.prev_tid()),
                        });
                    }
                }
                self.arena.alloc_expr(Expr {
                    kind: ExprKind::Unary {
                        op: TokenKind::Arrow,
                        operand,
                    },
                    range: TokenRange::new(first, self.prev_tid()),
                })
            }
            _ => self.parse_primary_expr(),
        }
    }

    fn reassociate_chan_arrow(&mut self, ty: TypeExprId, arrow_tok: TokenId) {
        let mut cur = ty;
        loop {
            match self.arena.type_expr(cur).kind {
                TypeExprKind::Chan {
                    dir: ChanDir::Both, ..
                } => {
                    if let TypeExprKind::Chan { dir, .. } = &mut self.arena.type_expr_mut(cur).kind
                    {
                        *dir = ChanDir::Recv;
                    }
                    return;
                }
                TypeExprKind::Chan {
                    dir: ChanDir::Send,
                    elem,
                } => cur = elem,
                _ => {
                    self.error_tok(arrow_tok, "expected channel type".to_string());
                    return;
                }
            }
        }
    }

    fn parse_primary_expr(&mut self) -> ExprId {
        let first = self.tid();
        let mut x = self.parse_operand();
        loop {
            match self.tok() {
                TokenKind::Period => {
                    self.next();
                    if self.accept(TokenKind::LParen).is_some() {
                        // x.(T) or x.(type)
                        let ty = if self.at(TokenKind::Type) {
                            self.next();
                            None
                        } else {
                            Some(self.parse_type())
                        };
                        self.expect(TokenKind::RParen);
                        x = self.arena.alloc_expr(Expr {
                            kind: ExprKind::TypeAssert { base: x, ty },
                            range: TokenRange::new(first, self.prev_tid()),
                        });
                    } else if self.at(TokenKind::Ident) {
                        let sel_tok = self.tid();
                        let sel = self.token().name.unwrap_or(known::BLANK);
                        self.next();
                        x = self.arena.alloc_expr(Expr {
                            kind: ExprKind::Selector {
                                base: x,
                                sel_tok,
                                sel,
                            },
                            range: TokenRange::new(first, self.prev_tid()),
                        });
                    } else {
                        self.error_here(format!("expected selector, found '{}'", self.tok()));
                        x = self.arena.alloc_expr(Expr {
                            kind: ExprKind::Bad,
                            range: TokenRange::new(first, self.prev_tid()),
                        });
                    }
                }
                TokenKind::LBracket => {
                    self.next();
                    self.expr_lev += 1;
                    let mut low = None;
                    if !self.at(TokenKind::Colon) {
                        low = Some(self.parse_rhs());
                    }
                    if self.accept(TokenKind::Colon).is_some() {
                        let mut high = None;
                        let mut max = None;
                        if !matches!(self.tok(), TokenKind::RBracket | TokenKind::Colon) {
                            high = Some(self.parse_rhs());
                        }
                        if self.accept(TokenKind::Colon).is_some()
                            && !self.at(TokenKind::RBracket)
                        {
                            max = Some(self.parse_rhs());
                        }
                        self.expr_lev -= 1;
                        self.expect(TokenKind::RBracket);
                        x = self.arena.alloc_expr(Expr {
                            kind: ExprKind::Slice {
                                base: x,
                                low,
                                high,
                                max,
                            },
                            range: TokenRange::new(first, self.prev_tid()),
                        });
                    } else {
                        self.expr_lev -= 1;
                        self.expect(TokenKind::RBracket);
                        let index = low.unwrap_or_else(|| self.bad_expr(first));
                        x = self.arena.alloc_expr(Expr {
                            kind: ExprKind::Index { base: x, index },
                            range: TokenRange::new(first, self.prev_tid()),
                        });
                    }
                }
                TokenKind::LParen => {
                    self.next();
                    self.expr_lev += 1;
                    let mut args = Vec::new();
                    let mut ellipsis = false;
                    while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                        args.push(self.parse_rhs());
                        if self.accept(TokenKind::Ellipsis).is_some() {
                            ellipsis = true;
                        }
                        if self.accept(TokenKind::Comma).is_none() {
                            break;
                        }
                    }
                    self.expr_lev -= 1;
                    self.expect(TokenKind::RParen);
                    x = self.arena.alloc_expr(Expr {
                        kind: ExprKind::Call {
                            callee: x,
                            args,
                            ellipsis,
                        },
                        range: TokenRange::new(first, self.prev_tid()),
                    });
                }
                TokenKind::LBrace => {
                    // Inside an if/for/switch header a bare `T{` is the
                    // block, not a composite literal; composite types like
                    // `[]int{` stay unambiguous and are allowed anywhere.
                    let type_name = matches!(
                        self.arena.expr(x).kind,
                        ExprKind::Ident(_) | ExprKind::Selector { .. }
                    );
                    if self.is_literal_type(x) && (self.expr_lev >= 0 || !type_name) {
                        x = self.parse_literal_value_with_type(first, Some(x));
                    } else {
                        return x;
                    }
                }
                _ => return x,
            }
        }
    }

    /// Can `x` be the type operand of a composite literal?
    fn is_literal_type(&self, x: ExprId) -> bool {
        match &self.arena.expr(x).kind {
            ExprKind::Ident(_) => true,
            ExprKind::Selector { base, .. } => {
                matches!(self.arena.expr(*base).kind, ExprKind::Ident(_))
            }
            ExprKind::Type { ty } => matches!(
                self.arena.type_expr(*ty).kind,
                TypeExprKind::Array { .. }
                    | TypeExprKind::Struct { .. }
                    | TypeExprKind::Map { .. }
                    | TypeExprKind::Name { .. }
            ),
            _ => false,
        }
    }

    /// `{elem, key: value, {nested}}` body of a composite literal. The
    /// type operand is an expression (identifier, qualified name, or type)
    /// when present, or absent for nested untyped literals.
    fn parse_literal_value_with_type(&mut self, first: TokenId, ty_expr: Option<ExprId>) -> ExprId {
        let ty = ty_expr.map(|e| self.type_operand(e));
        self.expect(TokenKind::LBrace);
        let mut elems = Vec::new();
        self.expr_lev += 1;
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let elem = self.parse_literal_element();
            elems.push(elem);
            if self.accept(TokenKind::Comma).is_none() {
                break;
            }
        }
        self.expr_lev -= 1;
        self.expect(TokenKind::RBrace);
        self.arena.alloc_expr(Expr {
            kind: ExprKind::CompositeLit { ty, elems },
            range: TokenRange::new(first, self.prev_tid()),
        })
    }

    fn parse_literal_element(&mut self) -> ExprId {
        let first = self.tid();
        let value = if self.at(TokenKind::LBrace) {
            self.parse_literal_value_with_type(first, None)
        } else {
            self.parse_rhs()
        };
        if self.accept(TokenKind::Colon).is_some() {
            let second = if self.at(TokenKind::LBrace) {
                let f = self.tid();
                self.parse_literal_value_with_type(f, None)
            } else {
                self.parse_rhs()
            };
            return self.arena.alloc_expr(Expr {
                kind: ExprKind::KeyValue {
                    key: value,
                    value: second,
                },
                range: TokenRange::new(first, self.prev_tid()),
            });
        }
        value
    }

    /// Convert an expression used as a composite literal type into a type
    /// node reference where it already is one.
    fn type_operand(&mut self, e: ExprId) -> TypeExprId {
        match self.arena.expr(e).kind {
            ExprKind::Type { ty } => ty,
            ExprKind::Ident(ident) => {
                let range = self.arena.expr(e).range;
                self.arena.alloc_type(TypeExpr {
                    kind: TypeExprKind::Name {
                        package: None,
                        ident,
                    },
                    range,
                })
            }
            ExprKind::Selector { base, sel_tok, sel } => {
                let range = self.arena.expr(e).range;
                if let ExprKind::Ident(pkg) = self.arena.expr(base).kind {
                    self.arena.alloc_type(TypeExpr {
                        kind: TypeExprKind::Name {
                            package: Some(pkg),
                            ident: IdentBinding::new(sel_tok, sel),
                        },
                        range,
                    })
                } else {
                    self.arena.alloc_type(TypeExpr {
                        kind: TypeExprKind::Bad,
                        range,
                    })
                }
            }
            _ => {
                let range = self.arena.expr(e).range;
                self.arena.alloc_type(TypeExpr {
                    kind: TypeExprKind::Bad,
                    range,
                })
            }
        }
    }

    fn parse_operand(&mut self) -> ExprId {
        let first = self.tid();
        match self.tok() {
            TokenKind::Ident => {
                let binding = IdentBinding::new(self.tid(), self.token().name.unwrap_or(known::BLANK));
                self.next();
                self.arena.alloc_expr(Expr {
                    kind: ExprKind::Ident(binding),
                    range: TokenRange::new(first, first),
                })
            }
            TokenKind::Int
            | TokenKind::Float
            | TokenKind::Imag
            | TokenKind::Rune
            | TokenKind::Str => {
                let kind = self.tok();
                self.next();
                self.arena.alloc_expr(Expr {
                    kind: ExprKind::BasicLit { tok: first, kind },
                    range: TokenRange::new(first, first),
                })
            }
            TokenKind::LParen => {
                self.next();
                self.expr_lev += 1;
                let inner = self.parse_rhs();
                self.expr_lev -= 1;
                self.expect(TokenKind::RParen);
                self.arena.alloc_expr(Expr {
                    kind: ExprKind::Paren { inner },
                    range: TokenRange::new(first, self.prev_tid()),
                })
            }
            TokenKind::Func => {
                self.next();
                self.open_scope(ScopeKind::Func);
                let sig = self.parse_signature(true);
                let kind = if self.at(TokenKind::LBrace) {
                    let body = self.parse_block();
                    ExprKind::FuncLit { sig, body }
                } else {
                    // Just a function type in expression position.
                    ExprKind::Type { ty: sig }
                };
                self.close_scope();
                self.arena.alloc_expr(Expr {
                    kind,
                    range: TokenRange::new(first, self.prev_tid()),
                })
            }
            TokenKind::LBracket
            | TokenKind::Struct
            | TokenKind::Interface
            | TokenKind::Map
            | TokenKind::Chan => {
                let ty = self.parse_type();
                self.arena.alloc_expr(Expr {
                    kind: ExprKind::Type { ty },
                    range: TokenRange::new(first, self.prev_tid()),
                })
            }
            _ => {
                self.error_here(format!("expected operand, found '{}'", self.tok()));
                if !matches!(
                    self.tok(),
                    TokenKind::Semicolon
                        | TokenKind::RParen
                        | TokenKind::RBrace
                        | TokenKind::RBracket
                        | TokenKind::Comma
                        | TokenKind::Colon
                        | TokenKind::Eof
                ) {
                    self.next();
                }
                self.bad_expr(first)
            }
        }
    }
}
