//! Editor-output behavior over real parsed sessions.

use std::sync::Arc;

use gosling_ide::{
    complete_at, definition_at, function_hint_at, highlight_file, CancelToken, HighlightKind,
    HighlightSpan, LinkTarget,
};
use gosling_parser::{ParseMode, ParsedFile};
use gosling_types::{NoImports, ProposalKind, Session};

fn single(src: &str) -> (Session, Arc<ParsedFile>) {
    let session = Session::new(Box::new(NoImports));
    let file = session.update_file("main/main.go", src, ParseMode::Full);
    assert!(
        file.diagnostics.is_empty(),
        "unexpected diagnostics: {:?}",
        file.diagnostics
    );
    (session, file)
}

fn offset_of(file: &ParsedFile, needle: &str, delta: usize) -> u32 {
    (file.source.find(needle).expect("marker not found") + delta) as u32
}

#[test]
fn highlight_classifies_and_orders_spans() {
    let src = "package main\n\n\
               type T struct {\n\tF int\n}\n\n\
               func add(n int) int {\n\
               \tv := n\n\
               \treturn v + T{F: n}.F\n\
               }\n";
    let (session, file) = single(src);
    let snapshot = session.snapshot();
    let spans = highlight_file(&snapshot, session.interner(), &file, &CancelToken::new())
        .expect("not cancelled");

    assert!(spans.windows(2).all(|w| (w[0].line, w[0].column) <= (w[1].line, w[1].column)));

    let count = |kind: HighlightKind| spans.iter().filter(|s| s.kind == kind).count();
    assert_eq!(count(HighlightKind::FuncDecl), 1);
    assert_eq!(count(HighlightKind::TypeDecl), 1);
    assert_eq!(count(HighlightKind::VarDecl), 1);
    // Declaration of n plus its two uses.
    assert_eq!(count(HighlightKind::Arg), 3);
    // Field declaration, keyed literal element, and selector use.
    assert_eq!(count(HighlightKind::Field), 3);
    assert_eq!(count(HighlightKind::Var), 1);
    // The type use inside the composite literal, plus builtin ints.
    assert!(count(HighlightKind::Type) >= 1);
}

#[test]
fn cancelled_highlight_emits_nothing() {
    let (session, file) = single("package main\n\nfunc f() {}\n");
    let snapshot = session.snapshot();
    let cancel = CancelToken::new();
    cancel.cancel();
    assert!(highlight_file(&snapshot, session.interner(), &file, &cancel).is_none());
}

#[test]
fn oversized_files_get_syntax_only_highlighting() {
    let padding = "x".repeat(210 * 1024);
    let src = format!(
        "package main\n\nfunc f(n int) int {{\n\treturn n\n}}\n\n// {padding}\n"
    );
    let session = Session::new(Box::new(NoImports));
    let file = session.update_file("main/main.go", &src, ParseMode::Full);
    let snapshot = session.snapshot();
    let spans = highlight_file(&snapshot, session.interner(), &file, &CancelToken::new())
        .expect("not cancelled");
    let args = spans
        .iter()
        .filter(|s| s.kind == HighlightKind::Arg)
        .count();
    // Only the parameter declaration; the use in the body is skipped.
    assert_eq!(args, 1);
}

#[test]
fn member_completion_lists_fields_and_methods() {
    let src = "package main\n\n\
               type T struct {\n\tF int\n\tg string\n}\n\n\
               func (t *T) M() {}\n\n\
               func use(v T) {\n\
               \t_ = v.F\n\
               }\n";
    let (session, file) = single(src);
    let snapshot = session.snapshot();
    let offset = offset_of(&file, "= v.F", 5);
    let proposals = complete_at(&snapshot, session.interner(), &file, offset, false);
    let find = |text: &str| proposals.iter().find(|p| p.text == text);
    assert_eq!(find("F").map(|p| p.kind), Some(ProposalKind::Field));
    assert_eq!(find("g").map(|p| p.kind), Some(ProposalKind::Field));
    assert_eq!(find("M").map(|p| p.kind), Some(ProposalKind::Func));
    assert!(find("use").is_none());
}

#[test]
fn global_completion_spans_scopes_builtins_and_keywords() {
    let src = "package main\n\n\
               var Global int\n\n\
               func use() {\n\
               \tlocal := 1\n\
               \t_ = local\n\
               }\n";
    let (session, file) = single(src);
    let snapshot = session.snapshot();
    let offset = offset_of(&file, "_ = local", 4);
    let proposals = complete_at(&snapshot, session.interner(), &file, offset, true);
    let find = |text: &str| proposals.iter().find(|p| p.text == text);
    assert_eq!(find("local").map(|p| p.kind), Some(ProposalKind::Var));
    assert_eq!(find("Global").map(|p| p.kind), Some(ProposalKind::Var));
    assert_eq!(find("use").map(|p| p.kind), Some(ProposalKind::Func));
    assert_eq!(find("int").map(|p| p.kind), Some(ProposalKind::Type));
    assert_eq!(find("make").map(|p| p.kind), Some(ProposalKind::Builtin));
    assert_eq!(find("for").map(|p| p.kind), Some(ProposalKind::Keyword));
    assert!(find("_").is_none());
}

#[test]
fn function_hint_formats_parameters() {
    let src = "package main\n\n\
               func add(a int, b string) int {\n\
               \treturn a\n\
               }\n\n\
               func use() {\n\
               \tadd(1, \"x\")\n\
               }\n";
    let (session, file) = single(src);
    let snapshot = session.snapshot();
    let offset = offset_of(&file, "add(1", 4);
    let hint = function_hint_at(&snapshot, session.interner(), &file, offset)
        .expect("hint available");
    assert_eq!(hint.name, "add");
    assert_eq!(hint.args, vec!["a int".to_string(), "b string".to_string()]);
}

#[test]
fn editor_records_round_trip_through_json() {
    let (session, file) = single(
        "package main\n\n\
         var Global int\n\n\
         func f(n int) int {\n\treturn n + Global\n}\n",
    );
    let snapshot = session.snapshot();

    let spans = highlight_file(&snapshot, session.interner(), &file, &CancelToken::new())
        .expect("not cancelled");
    let json = serde_json::to_string(&spans).unwrap();
    let back: Vec<HighlightSpan> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, spans);

    let target = definition_at(
        &snapshot,
        session.interner(),
        &file,
        offset_of(&file, "n + Global", 0),
    )
    .expect("parameter resolves");
    let json = serde_json::to_string(&target).unwrap();
    let back: LinkTarget = serde_json::from_str(&json).unwrap();
    assert_eq!(back, target);
}

#[test]
fn definition_navigates_within_and_across_files() {
    let session = Session::new(Box::new(NoImports));
    session.update_file(
        "a/types.go",
        "package a\n\ntype T struct {\n\tF int\n}\n",
        ParseMode::Full,
    );
    let user = session.update_file(
        "a/use.go",
        "package a\n\nfunc use() {\n\tv := T{}\n\t_ = v.F\n}\n",
        ParseMode::Full,
    );
    let snapshot = session.snapshot();

    // Field access lands on the field's declaration in the sibling file.
    let field = definition_at(
        &snapshot,
        session.interner(),
        &user,
        offset_of(&user, "= v.F", 4),
    )
    .expect("field resolves");
    assert_eq!(&*field.file, "a/types.go");
    assert_eq!(field.line, 4);
    assert_eq!(field.column, 1);

    // Type use in the composite literal lands on the type declaration.
    let ty = definition_at(
        &snapshot,
        session.interner(),
        &user,
        offset_of(&user, "T{}", 0),
    )
    .expect("type resolves");
    assert_eq!(&*ty.file, "a/types.go");
    assert_eq!(ty.line, 3);
    assert_eq!(ty.column, 5);

    // Local variable stays in this file.
    let local = definition_at(
        &snapshot,
        session.interner(),
        &user,
        offset_of(&user, "= v.F", 2),
    )
    .expect("local resolves");
    assert_eq!(&*local.file, "a/use.go");
    assert_eq!(local.line, 4);
}
