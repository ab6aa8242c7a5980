//! Lexical scopes and symbols.
//!
//! Scopes form a chain through `outer` links: file scope → function scope →
//! nested blocks. [`ScopeTree::find`] searches a single scope's table only;
//! chained, declaration-order-aware lookup is the resolver's job, via
//! [`ScopeTree::find_visible`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use gosling_lexer::{Name, TokenId};

use crate::ast::{DeclId, SpecId, StmtId, TypeExprId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl ScopeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl SymbolId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeKind {
    /// Top-level per-file scope; lookup in it ignores declaration order.
    File,
    /// Function scope holding receiver and parameters.
    Func,
    /// Any nested block, including case and comm clauses.
    Block,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub kind: ScopeKind,
    pub outer: Option<ScopeId>,
    /// Token bounds, for position → scope queries.
    pub first: TokenId,
    pub last: TokenId,
    table: HashMap<Name, SymbolId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    /// Import alias.
    Package,
    Const,
    Type,
    Var,
    Func,
    Method,
    Field,
    Arg,
    Label,
}

/// Where a symbol was declared; drives lazy type computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolNode {
    None,
    /// Function or method declaration.
    Func(DeclId),
    /// Receiver of a method declaration.
    Receiver(DeclId),
    /// The `index`-th name of a value spec, or the name of a type spec.
    Spec { spec: SpecId, index: u32 },
    /// Import spec (Package symbols).
    Import(SpecId),
    /// The `index`-th left-hand name of `a, b := f()`; its type is the
    /// `index`-th component of the right-hand tuple, computed on demand.
    ShortVar { stmt: StmtId, index: u32 },
    /// A parameter or named result of a function signature.
    Arg {
        sig: TypeExprId,
        param: u32,
        name: u32,
        result: bool,
    },
    /// Key (`index` 0) or value (`index` 1) variable of a range loop.
    RangeVar { stmt: StmtId, index: u32 },
    /// The per-case binding of `v := x.(type)`.
    TypeSwitchVar { stmt: StmtId, case: u32 },
    Label(StmtId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub name: Name,
    pub kind: SymbolKind,
    /// Token of the declaring identifier.
    pub decl_tok: TokenId,
    /// Last token of the declaring construct; gates visibility in ordered
    /// scopes (declared-before-use).
    pub decl_end: TokenId,
    pub scope: ScopeId,
    pub node: SymbolNode,
}

/// All scopes and symbols of one translation unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl ScopeTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self, kind: ScopeKind, outer: Option<ScopeId>, first: TokenId) -> ScopeId {
        self.scopes.push(Scope {
            kind,
            outer,
            first,
            last: first,
            table: HashMap::new(),
        });
        ScopeId((self.scopes.len() - 1) as u32)
    }

    /// Record the closing token of a scope.
    pub fn close_scope(&mut self, id: ScopeId, last: TokenId) {
        self.scopes[id.index()].last = last;
    }

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    /// Search one scope's own table. No outer chaining.
    #[must_use]
    pub fn find(&self, scope: ScopeId, name: Name) -> Option<SymbolId> {
        self.scopes[scope.index()].table.get(&name).copied()
    }

    /// Insert a new symbol. The caller has already checked for
    /// redeclaration via [`Self::find`].
    pub fn declare(&mut self, scope: ScopeId, symbol: Symbol) -> SymbolId {
        let name = symbol.name;
        self.symbols.push(symbol);
        let id = SymbolId((self.symbols.len() - 1) as u32);
        self.scopes[scope.index()].table.insert(name, id);
        id
    }

    /// Chained lookup honoring declaration order: in ordered (non-file)
    /// scopes a symbol is visible only if its declaration ends at or before
    /// the use; file-scope symbols are visible throughout the file. Misses
    /// and the blank identifier yield `None`, never an error.
    #[must_use]
    pub fn find_visible(&self, from: ScopeId, name: Name, use_tok: TokenId) -> Option<SymbolId> {
        if name == gosling_lexer::known::BLANK {
            return None;
        }
        let mut scope = Some(from);
        while let Some(id) = scope {
            let s = &self.scopes[id.index()];
            if let Some(&sym) = s.table.get(&name) {
                let ordered = s.kind != ScopeKind::File;
                if !ordered || self.symbols[sym.index()].decl_end <= use_tok {
                    return Some(sym);
                }
            }
            scope = s.outer;
        }
        None
    }

    /// All symbols declared directly in `scope`, in arbitrary order.
    pub fn symbols_in(&self, scope: ScopeId) -> impl Iterator<Item = SymbolId> + '_ {
        self.scopes[scope.index()].table.values().copied()
    }

    /// Scope ids with their scopes, for range queries.
    pub fn iter_scopes(&self) -> impl Iterator<Item = (ScopeId, &Scope)> {
        self.scopes
            .iter()
            .enumerate()
            .map(|(i, s)| (ScopeId(i as u32), s))
    }

    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid(n: u32) -> TokenId {
        TokenId(n)
    }

    #[test]
    fn find_searches_only_the_given_scope() {
        let mut tree = ScopeTree::new();
        let file = tree.push_scope(ScopeKind::File, None, tid(0));
        let block = tree.push_scope(ScopeKind::Block, Some(file), tid(5));
        let name = Name(100);
        tree.declare(
            file,
            Symbol {
                name,
                kind: SymbolKind::Var,
                decl_tok: tid(1),
                decl_end: tid(3),
                scope: file,
                node: SymbolNode::None,
            },
        );
        assert!(tree.find(block, name).is_none());
        assert!(tree.find(file, name).is_some());
    }

    #[test]
    fn ordered_scope_rejects_use_before_declaration() {
        let mut tree = ScopeTree::new();
        let file = tree.push_scope(ScopeKind::File, None, tid(0));
        let block = tree.push_scope(ScopeKind::Block, Some(file), tid(1));
        let name = Name(100);
        tree.declare(
            block,
            Symbol {
                name,
                kind: SymbolKind::Var,
                decl_tok: tid(10),
                decl_end: tid(12),
                scope: block,
                node: SymbolNode::None,
            },
        );
        assert!(tree.find_visible(block, name, tid(5)).is_none());
        assert!(tree.find_visible(block, name, tid(12)).is_some());
    }

    #[test]
    fn file_scope_ignores_declaration_order() {
        let mut tree = ScopeTree::new();
        let file = tree.push_scope(ScopeKind::File, None, tid(0));
        let name = Name(100);
        tree.declare(
            file,
            Symbol {
                name,
                kind: SymbolKind::Func,
                decl_tok: tid(50),
                decl_end: tid(90),
                scope: file,
                node: SymbolNode::None,
            },
        );
        assert!(tree.find_visible(file, name, tid(5)).is_some());
    }

    #[test]
    fn blank_identifier_never_resolves() {
        let mut tree = ScopeTree::new();
        let file = tree.push_scope(ScopeKind::File, None, tid(0));
        let blank = gosling_lexer::known::BLANK;
        tree.declare(
            file,
            Symbol {
                name: blank,
                kind: SymbolKind::Var,
                decl_tok: tid(1),
                decl_end: tid(2),
                scope: file,
                node: SymbolNode::None,
            },
        );
        assert!(tree.find_visible(file, blank, tid(10)).is_none());
    }
}
