// tests/pipeline.rs
use spindle_frontend::{AstBuilder, BinaryOp, PrimitiveType, Program};
use spindle_sema::{CompilationContext, FileOutcome, Pipeline, PipelineOptions, SemanticError};

fn options() -> PipelineOptions {
    PipelineOptions::default().with_warn_unused(false).with_worker_threads(4)
}

/// `struct Pair<T,U>` plus a `main` that builds a `Pair<int,string>`.
fn pair_user(file: &str) -> Program {
    let b = AstBuilder::new(file);
    let pair = b.struct_decl(
        "Pair",
        vec![b.type_param("T", vec![]), b.type_param("U", vec![])],
        vec![("first", b.ty_named("T", vec![])), ("second", b.ty_named("U", vec![]))],
        vec![],
        vec![],
    );
    let literal = b.struct_lit("Pair", vec![], vec![("first", b.int(1)), ("second", b.string("one"))]);
    let main = b.func(
        "main",
        vec![],
        vec![],
        None,
        vec![
            b.let_("p", None, Some(literal)),
            b.let_("n", None, Some(b.binary(BinaryOp::Add, b.field(b.ident("p"), "first"), b.int(1)))),
        ],
    );
    b.finish(vec![pair, main])
}

fn clean(file: &str) -> Program {
    let b = AstBuilder::new(file);
    let main = b.func("main", vec![], vec![], None, vec![b.let_("x", None, Some(b.int(1)))]);
    b.finish(vec![main])
}

/// One soft error: a non-bool condition.
fn soft_failure(file: &str) -> Program {
    let b = AstBuilder::new(file);
    let main = b.func("main", vec![], vec![], None, vec![b.if_(b.int(1), vec![], None)]);
    b.finish(vec![main])
}

/// A hard error: reading an undeclared name.
fn hard_failure(file: &str) -> Program {
    let b = AstBuilder::new(file);
    let main = b.func(
        "main",
        vec![],
        vec![],
        None,
        vec![b.let_("y", Some(b.ty(PrimitiveType::Int)), Some(b.ident("missing")))],
    );
    b.finish(vec![main])
}

#[test]
fn test_reports_follow_input_order() {
    let programs: Vec<Program> = (0..8).map(|i| clean(&format!("file{i}.sp"))).collect();
    let pipeline = Pipeline::new(CompilationContext::new(options()));
    let reports = pipeline.check_files(&programs);
    assert_eq!(reports.len(), 8);
    for (i, report) in reports.iter().enumerate() {
        assert_eq!(report.file, format!("file{i}.sp"));
        assert!(report.is_completed());
    }
}

#[test]
fn test_manifestations_are_shared_across_files() {
    let programs = vec![pair_user("a.sp"), pair_user("b.sp"), pair_user("c.sp")];
    let pipeline = Pipeline::new(CompilationContext::new(options()));
    let reports = pipeline.check_files(&programs);
    assert!(reports.iter().all(|r| r.is_completed()));

    let registry = pipeline.context().manifestations();
    let signatures = registry.signatures();
    assert_eq!(signatures.iter().filter(|s| *s == "Pair<int,string>").count(), 1);
    let layout = registry.get("Pair<int,string>").unwrap();
    assert!(["a.sp", "b.sp", "c.sp"].contains(&layout.first_file.as_str()));
    assert_eq!(layout.fields[1], ("second".to_string(), "string".to_string()));

    // Each file still owns its manifestation scope
    for report in &reports {
        let FileOutcome::Completed(output) = &report.outcome else {
            panic!("{} did not complete", report.file);
        };
        assert!(output.structs.lookup_manifestation("Pair<int,string>").is_some());
    }
}

#[test]
fn test_soft_errors_fail_only_their_file() {
    let programs = vec![clean("ok.sp"), soft_failure("bad.sp"), clean("also_ok.sp")];
    let pipeline = Pipeline::new(CompilationContext::new(options()));
    let reports = pipeline.check_files(&programs);

    assert!(reports[0].is_completed());
    assert!(reports[2].is_completed());
    let errors = reports[1].errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(errors[0].error, SemanticError::ConditionNotBool { .. }));
    assert_eq!(
        reports[1].render()[0],
        format!("[Error|TypeChecker] bad.sp:{}: Condition must be bool: condition must be bool, found int", errors[0].span)
    );
}

#[test]
fn test_hard_error_without_fail_fast_keeps_going() {
    let programs = vec![hard_failure("bad.sp"), clean("ok.sp")];
    let pipeline = Pipeline::new(CompilationContext::new(options()));
    let reports = pipeline.check_files(&programs);
    assert!(matches!(
        reports[0].errors().last().map(|e| &e.error),
        Some(SemanticError::UndeclaredSymbol { .. })
    ));
    assert!(reports[1].is_completed());
    assert!(!pipeline.context().is_aborted());
}

#[test]
fn test_fail_fast_cancels_later_files() {
    let ctx = CompilationContext::new(options().with_fail_fast(true));
    let pipeline = Pipeline::new(ctx);

    let failed = pipeline.check_file(&hard_failure("bad.sp"));
    assert!(matches!(failed.outcome, FileOutcome::Failed { .. }));
    assert!(pipeline.context().is_aborted());

    let next = pipeline.check_file(&clean("ok.sp"));
    assert!(next.is_cancelled());
    assert!(next.render().is_empty());
}

#[test]
fn test_soft_errors_do_not_raise_abort() {
    let ctx = CompilationContext::new(options().with_fail_fast(true));
    let pipeline = Pipeline::new(ctx);
    let reports = pipeline.check_files(&[soft_failure("bad.sp"), clean("ok.sp")]);
    assert!(!reports[0].is_completed());
    assert!(reports[1].is_completed());
    assert!(!pipeline.context().is_aborted());
}

#[test]
fn test_aborted_context_cancels_everything() {
    let ctx = CompilationContext::new(options());
    ctx.abort();
    let pipeline = Pipeline::new(ctx);
    let reports = pipeline.check_files(&[clean("a.sp"), pair_user("b.sp")]);
    assert!(reports.iter().all(|r| r.is_cancelled()));
    assert!(pipeline.context().manifestations().is_empty());
}
