//! The type lattice.
//!
//! Types are not materialized into a separate graph: a [`Ty`] points back
//! into the syntax of the file that declared it, and everything about it
//! (members, element types, callability) is computed on demand. The one
//! genuinely structural piece is [`ResolvedTy`]: a type paired with a
//! pointer-indirection level. Pointer type expressions never appear as a
//! `Ty` variant; `**T` resolves to `T` at `ref_level` -2, so all of Go's
//! implicit-indirection rules reduce to small-integer arithmetic.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gosling_lexer::{known, Interner, Name, TokenId};
use gosling_parser::ast::{DeclId, SpecId, TypeExprId, TypeExprKind};
use gosling_parser::{ParsedFile, SymbolId};

use crate::resolve;
use crate::snapshot::{PackageKey, Snapshot};

/// Everything a capability query needs besides the type itself.
pub struct TyContext<'a> {
    pub snapshot: &'a Snapshot,
    pub interner: &'a Interner,
}

/// Coarse classification of scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuiltinKind {
    Bool,
    Int,
    Uint,
    Float,
    Complex,
    String,
    Uintptr,
    Error,
    /// No value at all (result of a void call).
    Void,
    /// Untyped numeric constant.
    Integral,
    Unresolved,
    /// Not a scalar builtin.
    Other,
}

/// A type, lazily backed by the syntax that declared it.
#[derive(Debug, Clone)]
pub enum Ty {
    /// Resolution failed; degrades gracefully everywhere.
    Unresolved,
    /// The "type" of an expression with no value.
    Void,
    /// Untyped numeric constant (literals, `iota`).
    Integral,
    /// One of the predeclared scalar type identifiers.
    Builtin(Name),
    /// A structural type expression: struct, interface, array/slice, map,
    /// chan, func, variadic. Never a pointer or paren node.
    Node {
        file: Arc<ParsedFile>,
        id: TypeExprId,
    },
    /// A declared named type (`type T ...`).
    Named {
        file: Arc<ParsedFile>,
        spec: SpecId,
    },
    /// An imported package used as a namespace.
    Package(PackageKey),
    /// Multi-value result, indexable by position.
    Tuple(Arc<[ResolvedTy]>),
}

/// A type with its pointer-indirection level. Level 0 is a direct value;
/// negative means that many dereferences are needed to reach the value;
/// positive means a dereference of a non-pointer was attempted.
/// `addressable` tracks whether the originating expression denotes a
/// memory location, which gates pointer-receiver method selection.
#[derive(Debug, Clone)]
pub struct ResolvedTy {
    pub ty: Ty,
    pub ref_level: i32,
    pub addressable: bool,
}

impl ResolvedTy {
    #[must_use]
    pub fn unresolved() -> Self {
        Self {
            ty: Ty::Unresolved,
            ref_level: 0,
            addressable: false,
        }
    }

    /// A non-addressable direct value.
    #[must_use]
    pub fn value(ty: Ty) -> Self {
        Self {
            ty,
            ref_level: 0,
            addressable: false,
        }
    }

    #[must_use]
    pub fn with_level(ty: Ty, ref_level: i32) -> Self {
        Self {
            ty,
            ref_level,
            addressable: false,
        }
    }

    #[must_use]
    pub fn addressable(mut self, yes: bool) -> Self {
        self.addressable = yes;
        self
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !matches!(self.ty, Ty::Unresolved)
    }

    /// Shift the indirection level, as `&x` (-1) and `*x` (+1) do.
    #[must_use]
    pub fn shifted(mut self, by: i32) -> Self {
        self.ref_level += by;
        self
    }

    /// Go-syntax rendering including the pointer depth.
    #[must_use]
    pub fn describe(&self, cx: &TyContext<'_>) -> String {
        let mut s = String::new();
        for _ in 0..(-self.ref_level).max(0) {
            s.push('*');
        }
        s.push_str(&self.ty.describe(cx));
        s
    }
}

/// What a member lookup found. The member's type and location are computed
/// by the resolver from this record.
#[derive(Debug, Clone)]
pub enum Member {
    /// Struct field (an embedded field counts as a field of its own name).
    Field {
        file: Arc<ParsedFile>,
        name_tok: TokenId,
        ty: TypeExprId,
    },
    /// Declared method, found through the package's methods maps.
    Method { file: Arc<ParsedFile>, decl: DeclId },
    /// Interface method.
    IfaceMethod {
        file: Arc<ParsedFile>,
        name_tok: TokenId,
        sig: TypeExprId,
    },
    /// Package-level symbol reached through a package qualifier.
    PackageSym { file: Arc<ParsedFile>, symbol: SymbolId },
}

/// Completion icon category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalKind {
    Keyword,
    Builtin,
    Package,
    Const,
    Type,
    Var,
    Field,
    Func,
    Arg,
    Label,
}

/// One completion proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub text: String,
    pub kind: ProposalKind,
}

/// Member recursion cap: embedded-field chains and named-type unwrapping
/// both stop here, which also breaks `type A B; type B A` cycles.
pub(crate) const MAX_MEMBER_DEPTH: u32 = 8;

impl Ty {
    #[must_use]
    pub fn builtin_kind(&self) -> BuiltinKind {
        match self {
            Ty::Unresolved => BuiltinKind::Unresolved,
            Ty::Void => BuiltinKind::Void,
            Ty::Integral => BuiltinKind::Integral,
            Ty::Builtin(name) => match *name {
                known::BOOL => BuiltinKind::Bool,
                known::BYTE
                | known::INT
                | known::INT8
                | known::INT16
                | known::INT32
                | known::INT64
                | known::RUNE => BuiltinKind::Int,
                known::UINT | known::UINT8 | known::UINT16 | known::UINT32 | known::UINT64 => {
                    BuiltinKind::Uint
                }
                known::UINTPTR => BuiltinKind::Uintptr,
                known::FLOAT32 | known::FLOAT64 => BuiltinKind::Float,
                known::COMPLEX64 | known::COMPLEX128 => BuiltinKind::Complex,
                known::STRING => BuiltinKind::String,
                known::ERROR => BuiltinKind::Error,
                _ => BuiltinKind::Other,
            },
            _ => BuiltinKind::Other,
        }
    }

    /// Type of `base[i]`: array/slice element, map value, string byte.
    /// Map values and string bytes are not addressable; element of an
    /// array or slice is.
    #[must_use]
    pub fn index_ty(&self, cx: &TyContext<'_>) -> ResolvedTy {
        resolve::index_ty(cx, self, MAX_MEMBER_DEPTH)
    }

    /// Element type for nested composite-literal inference: array/slice
    /// element or map value.
    #[must_use]
    pub fn elements_ty(&self, cx: &TyContext<'_>) -> ResolvedTy {
        resolve::elements_ty(cx, self, MAX_MEMBER_DEPTH)
    }

    /// Result type of calling a value of this type: `Void` for no results,
    /// the single result type, or a tuple.
    #[must_use]
    pub fn call_ty(&self, cx: &TyContext<'_>) -> ResolvedTy {
        resolve::call_ty(cx, self, MAX_MEMBER_DEPTH)
    }

    /// Value type received from a channel of this type.
    #[must_use]
    pub fn chan_value_ty(&self, cx: &TyContext<'_>) -> ResolvedTy {
        resolve::chan_value_ty(cx, self, MAX_MEMBER_DEPTH)
    }

    /// Find `name` among this type's members: struct fields (embedded
    /// fields included, then their promoted members), interface methods,
    /// declared methods of named types, exported package symbols.
    #[must_use]
    pub fn lookup_member(&self, cx: &TyContext<'_>, name: Name) -> Option<Member> {
        resolve::lookup_member(cx, self, name, MAX_MEMBER_DEPTH)
    }

    /// Append one proposal per member to `out`.
    pub fn fill_completions(&self, cx: &TyContext<'_>, out: &mut Vec<Proposal>) {
        resolve::fill_completions(cx, self, out, MAX_MEMBER_DEPTH);
    }

    /// Go-syntax rendering; composite bodies are elided.
    #[must_use]
    pub fn describe(&self, cx: &TyContext<'_>) -> String {
        match self {
            Ty::Unresolved => "?".into(),
            Ty::Void => "()".into(),
            Ty::Integral => "int".into(),
            Ty::Builtin(name) => cx.interner.resolve(*name).to_string(),
            Ty::Node { file, id } => resolve::describe_type_expr(cx, file, *id, 3),
            Ty::Named { file, spec } => match &file.arena.spec(*spec).kind {
                gosling_parser::ast::SpecKind::Type(ts) => {
                    cx.interner.resolve(ts.name.name).to_string()
                }
                _ => "?".into(),
            },
            Ty::Package(key) => cx.interner.resolve(key.name).to_string(),
            Ty::Tuple(parts) => {
                let mut s = String::from("(");
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        s.push_str(", ");
                    }
                    s.push_str(&part.describe(cx));
                }
                s.push(')');
                s
            }
        }
    }

    /// Underlying type of a named type, unwrapped one level.
    #[must_use]
    pub fn underlying(&self, cx: &TyContext<'_>) -> ResolvedTy {
        match self {
            Ty::Named { file, spec } => match &file.arena.spec(*spec).kind {
                gosling_parser::ast::SpecKind::Type(ts) => {
                    resolve::resolve_type_expr(cx, file, ts.ty)
                }
                _ => ResolvedTy::unresolved(),
            },
            other => ResolvedTy::value(other.clone()),
        }
    }
}

/// Unqualified base name of a type expression, peeling pointers and
/// parens: the implicit name of an embedded struct field.
#[must_use]
pub fn type_base_name(file: &ParsedFile, mut id: TypeExprId) -> Option<(Name, TokenId)> {
    loop {
        match &file.arena.type_expr(id).kind {
            TypeExprKind::Pointer { elem } | TypeExprKind::Paren { inner: elem } => id = *elem,
            TypeExprKind::Name { ident, .. } => return Some((ident.name, ident.tok)),
            _ => return None,
        }
    }
}
