//! Lazy type resolution over parsed Go files.
//!
//! No type-check pass runs up front: [`ExprTypeResolver`] computes the
//! type of any single expression on demand, tracking pointer indirection
//! as an integer level, and the [`Snapshot`] supplies whatever crosses a
//! file or package boundary. Everything degrades to `Unresolved` on code
//! that does not (yet) make sense.

pub mod resolve;
pub mod session;
pub mod snapshot;
pub mod ty;

pub use resolve::{
    func_sig_of, is_exported, lookup_in_package, lookup_use, member_site,
    method_has_pointer_receiver, proposal_kind, resolve_type_expr, ExprTypeResolver,
};
pub use session::{ImportResolver, NoImports, Session, TableImports};
pub use snapshot::{dir_of, Package, PackageKey, Snapshot};
pub use ty::{BuiltinKind, Member, Proposal, ProposalKind, ResolvedTy, Ty, TyContext};
