// scope/tests.rs
use super::*;
use crate::types::NominalType;

fn node(i: u32) -> NodeId {
    NodeId::new(i)
}

fn at(line: u32) -> Span {
    Span::new(line as usize * 100, line as usize * 100 + 1, line, 1)
}

fn declare_var(tree: &mut ScopeTree, scope: ScopeId, name: &str, ty: QualType) -> SymbolId {
    tree.insert(scope, name, SymbolKind::Variable, ty, node(0), Span::default())
        .unwrap()
}

fn initialize(tree: &mut ScopeTree, id: SymbolId) {
    tree.entry_mut(id)
        .unwrap()
        .update_state(LifecycleState::Initialized, node(1), at(2))
        .unwrap();
}

#[test]
fn test_lookup_walks_parents() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let body = tree.get_or_create_child(global, "main", ScopeKind::FunctionBody, Span::default());
    let inner = tree.get_or_create_child(body, "block", ScopeKind::Block, Span::default());
    let x = declare_var(&mut tree, body, "x", QualType::int());

    assert_eq!(tree.lookup(inner, "x"), Some(x));
    assert_eq!(tree.lookup_strict(inner, "x"), None);
    assert_eq!(tree.lookup(global, "x"), None);
    // Same name, same parent: same scope
    assert_eq!(
        tree.get_or_create_child(body, "block", ScopeKind::Block, Span::default()),
        inner
    );
}

#[test]
fn test_duplicate_in_same_scope_only() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let body = tree.get_or_create_child(global, "main", ScopeKind::FunctionBody, Span::default());
    declare_var(&mut tree, global, "x", QualType::int());
    declare_var(&mut tree, body, "x", QualType::string());
    let err = tree
        .insert(body, "x", SymbolKind::Variable, QualType::int(), node(0), Span::default())
        .unwrap_err();
    assert!(matches!(err, ScopeError::DuplicateSymbol(ref name) if name == "x"));
}

#[test]
fn test_lookup_through_closure_records_capture() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let body = tree.get_or_create_child(global, "main", ScopeKind::FunctionBody, Span::default());
    let count = declare_var(&mut tree, body, "count", QualType::int());
    let closure = tree.get_or_create_child(body, "lambda#1", ScopeKind::Closure, Span::default());
    tree.set_capturing(closure, LambdaKind::Closure);
    let inner = tree.get_or_create_child(closure, "block", ScopeKind::Block, Span::default());

    assert_eq!(tree.lookup(inner, "count"), Some(count));
    assert_eq!(tree.lookup(inner, "count"), Some(count));
    let captures = tree.captures(closure);
    assert_eq!(captures.len(), 1);
    assert_eq!(captures[0].symbol, count);
    assert_eq!(captures[0].access, CaptureAccess::ReadOnly);
    assert_eq!(captures[0].mode, CaptureMode::ByValue);
}

#[test]
fn test_functions_and_type_names_are_not_captured() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    tree.insert(
        global,
        "helper",
        SymbolKind::Function,
        QualType::function(vec![], None),
        node(0),
        Span::default(),
    )
    .unwrap();
    let closure = tree.get_or_create_child(global, "lambda#1", ScopeKind::Closure, Span::default());
    tree.set_capturing(closure, LambdaKind::Closure);
    assert!(tree.lookup(closure, "helper").is_some());
    assert!(tree.captures(closure).is_empty());
}

#[test]
fn test_function_typed_variables_are_not_captured() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let body = tree.get_or_create_child(global, "main", ScopeKind::FunctionBody, Span::default());
    let callback = QualType::function(vec![QualType::int()], Some(QualType::int()));
    declare_var(&mut tree, body, "callback", callback);
    declare_var(&mut tree, body, "notify", QualType::function(vec![], None));
    declare_var(&mut tree, body, "n", QualType::int());
    let closure = tree.get_or_create_child(body, "lambda#1", ScopeKind::Closure, Span::default());
    tree.set_capturing(closure, LambdaKind::Closure);

    assert!(tree.lookup(closure, "callback").is_some());
    assert!(tree.lookup(closure, "notify").is_some());
    assert!(tree.captures(closure).is_empty());
    tree.lookup(closure, "n");
    assert_eq!(tree.captures(closure).len(), 1);
    assert_eq!(tree.captures(closure)[0].name, "n");
}

#[test]
fn test_capture_mode_follows_inferred_type() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let body = tree.get_or_create_child(global, "main", ScopeKind::FunctionBody, Span::default());
    let shape = declare_var(&mut tree, body, "shape", QualType::dyn_type());
    let closure = tree.get_or_create_child(body, "lambda#1", ScopeKind::Closure, Span::default());
    tree.set_capturing(closure, LambdaKind::Closure);

    tree.lookup(closure, "shape");
    assert_eq!(tree.captures(closure)[0].mode, CaptureMode::ByValue);
    assert!(!tree.refresh_capture_modes(closure));

    let point = QualType::structure(NominalType::new("Point", vec![]).in_scope(global));
    tree.entry_mut(shape).unwrap().update_type(point, false);
    assert!(tree.refresh_capture_modes(closure));
    let capture = &tree.captures(closure)[0];
    assert_eq!(capture.mode, CaptureMode::ByReference);
    assert!(!capture.is_mutated());
    assert!(!tree.refresh_capture_modes(closure));
}

#[test]
fn test_write_promotes_capture_in_every_enclosing_lambda() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let body = tree.get_or_create_child(global, "main", ScopeKind::FunctionBody, Span::default());
    declare_var(&mut tree, body, "total", QualType::int());
    let outer = tree.get_or_create_child(body, "lambda#1", ScopeKind::Closure, Span::default());
    tree.set_capturing(outer, LambdaKind::Closure);
    let inner = tree.get_or_create_child(outer, "lambda#2", ScopeKind::Thread, Span::default());
    tree.set_capturing(inner, LambdaKind::Thread);

    assert!(tree.lookup(inner, "total").is_some());
    assert_eq!(tree.captures(outer).len(), 1);
    assert_eq!(tree.captures(inner).len(), 1);

    assert!(tree.mark_capture_written(inner, "total"));
    for scope in [outer, inner] {
        let capture = &tree.captures(scope)[0];
        assert!(capture.is_mutated());
        assert_eq!(capture.mode, CaptureMode::ByReference);
    }
    // Promotion happens once
    assert!(!tree.mark_capture_written(inner, "total"));
}

#[test]
fn test_struct_values_are_captured_by_reference() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let point = QualType::structure(NominalType::new("Point", vec![]).in_scope(global));
    declare_var(&mut tree, global, "origin", point);
    let closure = tree.get_or_create_child(global, "lambda#1", ScopeKind::Closure, Span::default());
    tree.set_capturing(closure, LambdaKind::Closure);
    tree.lookup(closure, "origin");
    assert_eq!(tree.captures(closure)[0].mode, CaptureMode::ByReference);
    assert!(!tree.captures(closure)[0].is_mutated());
}

#[test]
fn test_resolve_type_name_prefers_mapping() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let template = tree.get_or_create_child(global, "Box", ScopeKind::Struct, Span::default());
    tree.insert_generic_type(template, GenericType::new("T"));
    tree.register_struct(global, "Box", crate::ids::StructId::new(0));
    let manifestation = tree.get_or_create_child(global, "Box<int>", ScopeKind::Struct, Span::default());
    let mut mapping = TypeMapping::default();
    mapping.insert("T".to_string(), QualType::int());
    tree.set_type_mapping(manifestation, mapping);
    tree.insert_generic_type(manifestation, GenericType::new("T"));

    assert!(matches!(tree.resolve_type_name(template, "T"), Some(TypeName::Generic(g)) if g.name == "T"));
    assert!(matches!(tree.resolve_type_name(manifestation, "T"), Some(TypeName::Mapped(ty)) if ty.is_numeric()));
    assert!(matches!(
        tree.resolve_type_name(manifestation, "Box"),
        Some(TypeName::Struct { declared_in, .. }) if declared_in == global
    ));
    assert!(tree.resolve_type_name(manifestation, "Missing").is_none());
}

#[test]
fn test_overloads_come_from_innermost_declaring_scope() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let body = tree.get_or_create_child(global, "main", ScopeKind::FunctionBody, Span::default());
    tree.register_function(global, "print", FunctionId::new(0));
    tree.register_function(global, "print", FunctionId::new(1));
    assert_eq!(tree.lookup_functions(body, "print").len(), 2);
    assert!(tree.lookup_functions(body, "missing").is_empty());
}

#[test]
fn test_vars_going_out_of_scope_skips_params_and_uninitialized() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let body = tree.get_or_create_child(global, "main", ScopeKind::FunctionBody, Span::default());
    let param = declare_var(&mut tree, body, "arg", QualType::int());
    tree.entry_mut(param).unwrap().is_param = true;
    initialize(&mut tree, param);
    let live = declare_var(&mut tree, body, "live", QualType::int());
    initialize(&mut tree, live);
    declare_var(&mut tree, body, "pending", QualType::int());

    assert_eq!(tree.vars_going_out_of_scope(body), vec![live]);
}

#[test]
fn test_field_state_skips_implicit_fields() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let fields = tree.get_or_create_child(global, "fields:p#1", ScopeKind::StructInstance, Span::default());
    let vtable = tree
        .insert(fields, "__vtable", SymbolKind::Field, QualType::byte().to_ptr(), node(0), Span::default())
        .unwrap();
    tree.entry_mut(vtable).unwrap().implicit = true;
    let x = tree
        .insert(fields, "x", SymbolKind::Field, QualType::int(), node(0), Span::default())
        .unwrap();
    let y = tree
        .insert(fields, "y", SymbolKind::Field, QualType::int(), node(0), Span::default())
        .unwrap();

    assert_eq!(tree.field_count(fields), 2);
    assert_eq!(tree.are_all_fields_in_state(fields, LifecycleState::Initialized), Some(x));
    initialize(&mut tree, x);
    assert_eq!(tree.are_all_fields_in_state(fields, LifecycleState::Initialized), Some(y));
    initialize(&mut tree, y);
    assert_eq!(tree.are_all_fields_in_state(fields, LifecycleState::Initialized), None);
}

#[test]
fn test_loop_depth_stops_at_function_boundary() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let body = tree.get_or_create_child(global, "main", ScopeKind::FunctionBody, Span::default());
    let outer = tree.get_or_create_child(body, "while#1", ScopeKind::WhileBody, Span::default());
    let inner = tree.get_or_create_child(outer, "while#2", ScopeKind::WhileBody, Span::default());
    let branch = tree.get_or_create_child(inner, "if#3", ScopeKind::IfBody, Span::default());
    let lambda = tree.get_or_create_child(branch, "lambda#4", ScopeKind::Closure, Span::default());
    let lambda_loop = tree.get_or_create_child(lambda, "while#5", ScopeKind::WhileBody, Span::default());

    assert_eq!(tree.loop_nesting_depth(body), 0);
    assert_eq!(tree.loop_nesting_depth(branch), 2);
    assert_eq!(tree.loop_nesting_depth(lambda_loop), 1);
}

#[test]
fn test_untyped_and_unused_ignore_generic_templates() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let body = tree.get_or_create_child(global, "main", ScopeKind::FunctionBody, Span::default());
    let template = tree.get_or_create_child(global, "fn:id", ScopeKind::FunctionBody, Span::default());
    tree.mark_generic_template(template);
    let nested = tree.get_or_create_child(template, "block", ScopeKind::Block, Span::default());

    let untyped = declare_var(&mut tree, body, "mystery", QualType::dyn_type());
    tree.entry_mut(untyped).unwrap().used = true;
    let unused = declare_var(&mut tree, body, "spare", QualType::int());
    declare_var(&mut tree, body, "_ignored", QualType::int());
    declare_var(&mut tree, nested, "value", QualType::generic("T"));
    declare_var(&mut tree, global, "config", QualType::int());

    assert!(tree.scope(nested).generic_template);
    assert_eq!(tree.find_untyped_symbols(), vec![untyped]);
    assert_eq!(tree.collect_unused(), vec![unused]);
}

#[test]
fn test_ancestors_end_at_global() {
    let mut tree = ScopeTree::new();
    let global = tree.global();
    let a = tree.get_or_create_child(global, "a", ScopeKind::Block, Span::default());
    let b = tree.get_or_create_child(a, "b", ScopeKind::Block, Span::default());
    assert_eq!(tree.ancestors(b).collect::<Vec<_>>(), vec![b, a, global]);
    assert_eq!(tree.parent(global), None);
}
