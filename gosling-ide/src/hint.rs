//! Function-signature hints.
//!
//! Finds the call expression enclosing the cursor and formats its
//! callee's parameter list, one `"name Type"` string per parameter.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use gosling_lexer::Interner;
use gosling_parser::ast::{ExprKind, TypeExprKind};
use gosling_parser::ParsedFile;
use gosling_types::{func_sig_of, resolve_type_expr, ExprTypeResolver, Snapshot, TyContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionHint {
    /// Callee name as written at the call site.
    pub name: String,
    /// One formatted entry per parameter, `"name Type"` or just the type
    /// for unnamed parameters.
    pub args: Vec<String>,
}

#[must_use]
pub fn function_hint_at(
    snapshot: &Snapshot,
    interner: &Interner,
    file: &Arc<ParsedFile>,
    offset: u32,
) -> Option<FunctionHint> {
    let call = file.call_at_offset(offset)?;
    let ExprKind::Call { callee, .. } = file.arena.expr(call).kind else {
        return None;
    };
    let name = match &file.arena.expr(callee).kind {
        ExprKind::Ident(b) => interner.resolve(b.name).to_string(),
        ExprKind::Selector { sel, .. } => interner.resolve(*sel).to_string(),
        _ => "func".to_string(),
    };

    let mut resolver = ExprTypeResolver::new(snapshot, interner, file);
    let callee_ty = resolver.resolve(callee);
    let cx = TyContext { snapshot, interner };
    let (sig_file, sig_id) = func_sig_of(&cx, &callee_ty.ty, 8)?;
    let TypeExprKind::Func(sig) = &sig_file.arena.type_expr(sig_id).kind else {
        return None;
    };

    let mut args = Vec::new();
    for field in &sig.params {
        let ty_text = resolve_type_expr(&cx, &sig_file, field.ty).describe(&cx);
        if field.names.is_empty() {
            args.push(ty_text);
        } else {
            for n in &field.names {
                args.push(format!("{} {ty_text}", interner.resolve(n.name)));
            }
        }
    }
    Some(FunctionHint { name, args })
}
