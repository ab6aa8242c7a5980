use gosling_lexer::{Interner, TokenKind};
use gosling_parser::ast::{
    ArrayLen, ChanDir, DeclKind, ExprKind, ParseMode, ParsedFile, SpecKind, StmtKind, TypeExprKind,
};
use gosling_parser::{parse_file, parse_package_file, Diagnostic, Severity, SymbolKind};

fn parse(src: &str) -> (Interner, ParsedFile) {
    let interner = Interner::new();
    let file = parse_file(&interner, "test.go", src, ParseMode::Full);
    (interner, file)
}

fn errors(file: &ParsedFile) -> Vec<String> {
    file.diagnostics
        .iter()
        .filter(|d| d.severity >= Severity::Error)
        .map(|d| d.message.clone())
        .collect()
}

#[test]
fn clean_file_parses_without_diagnostics() {
    let src = r#"package main

import (
	"fmt"
	str "strings"
)

type Point struct {
	X, Y int
	tag  string
}

func (p *Point) Norm() int {
	return p.X*p.X + p.Y*p.Y
}

func main() {
	p := Point{X: 1, Y: 2}
	xs := []int{1, 2, 3}
	m := map[string]int{"a": 1}
	for i, v := range xs {
		if v > 1 {
			fmt.Println(i, v)
		}
	}
	switch n := p.Norm(); {
	case n > 4:
		delete(m, str.ToUpper("a"))
	default:
	}
}
"#;
    let (_, file) = parse(src);
    assert_eq!(errors(&file), Vec::<String>::new());
    assert_eq!(file.imports.len(), 2);
    assert_eq!(file.ast.decls.len(), 4);
}

#[test]
fn file_scope_redeclaration_reports_once_and_keeps_first_symbol() {
    let (interner, file) = parse("package p\nvar x int\nvar x int\n");
    let errs = errors(&file);
    assert_eq!(errs.len(), 1, "{errs:?}");
    assert!(errs[0].contains("redeclared"), "{errs:?}");

    // Both specs survive in the tree; the symbol table holds one `x`.
    let x = interner.intern("x");
    let count = file
        .scopes
        .symbols_in(file.file_scope)
        .filter(|&s| file.scopes.symbol(s).name == x)
        .count();
    assert_eq!(count, 1);
    assert_eq!(file.arena.specs.len(), 2);
}

#[test]
fn diagnostics_round_trip_through_json() {
    let (_, file) = parse("package p\nvar x int\nvar x int\n");
    assert!(!file.diagnostics.is_empty());
    let json = serde_json::to_string(&file.diagnostics).unwrap();
    assert!(json.contains("redeclared"), "{json}");
    let back: Vec<Diagnostic> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, file.diagnostics);
}

#[test]
fn garbage_input_terminates_with_bounded_recovery() {
    let mut src = String::from("package p\n");
    for _ in 0..1000 {
        src.push('@');
    }
    src.push('\n');
    let (_, file) = parse(&src);
    assert!(!file.diagnostics.is_empty());
    // All the garbage collapses into bad declarations, not a hang, and
    // recovery consumes the input to the end: some bad declaration's
    // range covers the very last garbage token.
    let last_garbage = src.rfind('@').unwrap() as u32;
    let reached_end = file.ast.decls.iter().any(|&d| {
        let decl = file.arena.decl(d);
        matches!(decl.kind, DeclKind::Bad) && file.byte_span(decl.range).1 > last_garbage
    });
    assert!(reached_end, "recovery stopped before the end of the input");
}

#[test]
fn stalled_recovery_forces_progress_past_sync_points() {
    // `var` is a resynchronization stop token, but an import spec cannot
    // consume it, so every retry resynchronizes at the same position.
    // Only the forced-advance cap moves the cursor past each one; without
    // it this input would never terminate.
    let mut src = String::from("package p\nimport (\n");
    for _ in 0..20 {
        src.push_str("var ");
    }
    src.push_str("\n)\n");
    let (_, file) = parse(&src);
    // Each stuck token is re-probed up to the cap before the cursor is
    // forced forward, so the diagnostics far outnumber the stop tokens.
    assert!(
        file.diagnostics.len() > 2 * 20,
        "expected repeated resync diagnostics, got {}",
        file.diagnostics.len()
    );
}

#[test]
fn short_var_redeclare_in_same_scope_reuses_symbol() {
    let src = "package p\nfunc f() {\n\tx := 1\n\tx, y := 2, 3\n\t_ = x\n\t_ = y\n}\n";
    let (interner, file) = parse(src);
    assert_eq!(errors(&file), Vec::<String>::new());

    let x = interner.intern("x");
    let mut x_symbols = Vec::new();
    for (id, _) in file.scopes.iter_scopes() {
        for sym in file.scopes.symbols_in(id) {
            if file.scopes.symbol(sym).name == x {
                x_symbols.push(sym);
            }
        }
    }
    assert_eq!(x_symbols.len(), 1);

    // The second statement's `x` binding points back at the same symbol.
    let mut bindings = Vec::new();
    for stmt in &file.arena.stmts {
        if let StmtKind::ShortVarDecl { names, .. } = &stmt.kind {
            for n in names {
                if n.name == x {
                    bindings.push(n.symbol);
                }
            }
        }
    }
    assert_eq!(bindings, vec![Some(x_symbols[0]), Some(x_symbols[0])]);
}

#[test]
fn methods_register_under_receiver_base_type() {
    let src = "package p\ntype T struct{}\nfunc (t *T) M() {}\nfunc (t T) N() {}\n";
    let (interner, file) = parse(src);
    assert_eq!(errors(&file), Vec::<String>::new());
    let t = interner.intern("T");
    assert!(file.methods.contains_key(&(t, interner.intern("M"))));
    assert!(file.methods.contains_key(&(t, interner.intern("N"))));
    // Methods do not enter the file scope.
    assert!(file
        .scopes
        .find(file.file_scope, interner.intern("M"))
        .is_none());
}

#[test]
fn type_switch_binds_fresh_variable_per_case() {
    let src = "package p\nfunc f(x interface{}) {\n\tswitch v := x.(type) {\n\tcase int:\n\t\t_ = v\n\tcase string:\n\t\t_ = v\n\tdefault:\n\t\t_ = v\n\t}\n}\n";
    let (_, file) = parse(src);
    assert_eq!(errors(&file), Vec::<String>::new());

    let cases = file
        .arena
        .stmts
        .iter()
        .find_map(|s| match &s.kind {
            StmtKind::TypeSwitch { cases, binding, .. } => {
                assert!(binding.is_some());
                Some(cases)
            }
            _ => None,
        })
        .expect("type switch not found");
    assert_eq!(cases.len(), 3);
    let syms: Vec<_> = cases.iter().map(|c| c.binding.expect("case binding")).collect();
    assert_ne!(syms[0], syms[1]);
    assert_ne!(syms[1], syms[2]);
}

#[test]
fn block_scope_gates_use_before_declaration() {
    let src = "package p\nvar z = f()\nfunc f() int {\n\ty := 1\n\treturn y\n}\n";
    let (interner, file) = parse(src);
    assert_eq!(errors(&file), Vec::<String>::new());

    let y = interner.intern("y");
    let f = interner.intern("f");

    // Find the `y` declaration and its use tokens.
    let y_tokens: Vec<u32> = file
        .tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.kind == TokenKind::Ident && t.name == Some(y))
        .map(|(i, _)| i as u32)
        .collect();
    assert_eq!(y_tokens.len(), 2);

    let use_tok = gosling_lexer::TokenId(y_tokens[1]);
    let use_offset = file.token(use_tok).offset;
    let scope = file.scope_at_offset(use_offset);
    assert!(file.scopes.find_visible(scope, y, use_tok).is_some());
    // Before its declaration the block-scoped `y` is invisible.
    let before = gosling_lexer::TokenId(y_tokens[0].saturating_sub(1));
    assert!(file.scopes.find_visible(scope, y, before).is_none());
    // File-scope `f` is visible everywhere, including before its body.
    assert!(file
        .scopes
        .find_visible(scope, f, gosling_lexer::TokenId(0))
        .is_some());
}

#[test]
fn composite_literals_are_suppressed_in_headers() {
    // `T{...}` directly in an if header would swallow the block; wrapping
    // in parentheses re-enables it.
    let src = "package p\ntype T struct{ N int }\nfunc f(x T) {\n\tif x == (T{N: 1}) {\n\t\treturn\n\t}\n\tfor i := range []int{1, 2} {\n\t\t_ = i\n\t}\n}\n";
    let (_, file) = parse(src);
    assert_eq!(errors(&file), Vec::<String>::new());
    let lits = file
        .arena
        .exprs
        .iter()
        .filter(|e| matches!(e.kind, ExprKind::CompositeLit { .. }))
        .count();
    assert_eq!(lits, 2);
}

#[test]
fn equals_in_rhs_parses_as_comparison() {
    // A mistyped `=` in value position is read as `==` so the tree keeps
    // its shape mid-edit.
    let src = "package p\nfunc f(x int) bool {\n\treturn x = 1\n}\n";
    let (_, file) = parse(src);
    assert!(file
        .arena
        .exprs
        .iter()
        .any(|e| matches!(e.kind, ExprKind::Binary { op: TokenKind::Eql, .. })));
    assert!(file
        .arena
        .stmts
        .iter()
        .any(|s| matches!(&s.kind, StmtKind::Return { results } if results.len() == 1)));
}

#[test]
fn receive_only_chan_type_reassociates_in_expression_position() {
    let src = "package p\nfunc f() {\n\tc := make(<-chan int, 1)\n\t_ = c\n}\n";
    let (_, file) = parse(src);
    assert_eq!(errors(&file), Vec::<String>::new());
    assert!(file
        .arena
        .types
        .iter()
        .any(|t| matches!(t.kind, TypeExprKind::Chan { dir: ChanDir::Recv, .. })));
}

#[test]
fn fast_mode_skips_function_bodies() {
    let src = "package p\nvar V = 1\nfunc f() {\n\tx := V\n\t_ = x\n}\n";
    let interner = Interner::new();
    let file = parse_file(&interner, "test.go", src, ParseMode::Fast);
    assert_eq!(errors(&file), Vec::<String>::new());
    let func = file
        .ast
        .decls
        .iter()
        .find_map(|&d| match &file.arena.decl(d).kind {
            DeclKind::Func(f) => Some(f),
            _ => None,
        })
        .expect("func decl");
    assert!(func.body.is_none());
    // The var spec still parses fully.
    assert!(file
        .arena
        .specs
        .iter()
        .any(|s| matches!(&s.kind, SpecKind::Value(v) if !v.values.is_empty())));
}

#[test]
fn package_gate_rejects_other_packages() {
    let interner = Interner::new();
    let src = "package alpha\nfunc f() {}\n";
    assert!(parse_package_file(&interner, "a.go", src, "beta").is_none());
    let file = parse_package_file(&interner, "a.go", src, "alpha").expect("matching package");
    assert_eq!(file.mode, ParseMode::Fast);
}

#[test]
fn array_and_slice_types_distinguish_length_forms() {
    let src = "package p\nvar a [4]int\nvar s []int\nvar e = [...]int{1, 2}\n";
    let (_, file) = parse(src);
    assert_eq!(errors(&file), Vec::<String>::new());
    let mut fixed = 0;
    let mut slice = 0;
    let mut ellipsis = 0;
    for t in &file.arena.types {
        if let TypeExprKind::Array { len, .. } = &t.kind {
            match len {
                ArrayLen::Fixed(_) => fixed += 1,
                ArrayLen::Slice => slice += 1,
                ArrayLen::Ellipsis => ellipsis += 1,
            }
        }
    }
    assert_eq!((fixed, slice, ellipsis), (1, 1, 1));
}

#[test]
fn labels_and_branches_parse() {
    let src = "package p\nfunc f() {\nloop:\n\tfor {\n\t\tbreak loop\n\t}\n\tgoto loop\n}\n";
    let (interner, file) = parse(src);
    assert_eq!(errors(&file), Vec::<String>::new());
    let label = interner.intern("loop");
    let declared = file.scopes.iter_scopes().any(|(id, _)| {
        file.scopes
            .symbols_in(id)
            .any(|s| file.scopes.symbol(s).name == label && file.scopes.symbol(s).kind == SymbolKind::Label)
    });
    assert!(declared);
}

#[test]
fn parameters_disambiguate_names_from_types() {
    // `(a, b int)` names two parameters; `(int, string)` names none.
    let src = "package p\nfunc f(a, b int) {}\nfunc g(int, string) {}\nfunc h(xs ...int) {}\n";
    let (interner, file) = parse(src);
    assert_eq!(errors(&file), Vec::<String>::new());

    let mut named = Vec::new();
    for decl in &file.arena.decls {
        if let DeclKind::Func(f) = &decl.kind {
            if let TypeExprKind::Func(sig) = &file.arena.type_expr(f.sig).kind {
                named.push(
                    sig.params
                        .iter()
                        .map(|p| p.names.len())
                        .sum::<usize>(),
                );
            }
        }
    }
    assert_eq!(named, vec![2, 0, 1]);
    // Variadic parameter type is recorded as such.
    assert!(file
        .arena
        .types
        .iter()
        .any(|t| matches!(t.kind, TypeExprKind::Variadic { .. })));
    let _ = interner;
}

#[test]
fn unclosed_body_recovers_and_terminates() {
    let src = "package p\nfunc f() {\n\tx := 1\n\ty := []int{\n";
    let (interner, file) = parse(src);
    assert!(!errors(&file).is_empty());
    // `f` survives in the file scope and the short variables were still
    // bound before the recovery point.
    assert!(file
        .scopes
        .find(file.file_scope, interner.intern("f"))
        .is_some());
    let x = interner.intern("x");
    let bound = file.scopes.iter_scopes().any(|(id, _)| {
        file.scopes
            .symbols_in(id)
            .any(|s| file.scopes.symbol(s).name == x)
    });
    assert!(bound);
}
