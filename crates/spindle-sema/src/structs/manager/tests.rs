// structs/manager/tests.rs
use super::*;
use crate::registry::ManifestationRegistry;
use crate::scope::LifecycleState;

fn field(name: &str, ty: QualType) -> FieldDef {
    FieldDef {
        name: name.to_string(),
        ty,
        span: Span::default(),
        implicit: false,
    }
}

fn declare(
    tree: &mut ScopeTree,
    structs: &mut StructManager,
    name: &str,
    template_types: Vec<GenericType>,
    fields: Vec<FieldDef>,
) -> StructId {
    let global = tree.global();
    let body = tree.get_or_create_child(global, name, ScopeKind::Struct, Span::default());
    if !template_types.is_empty() {
        tree.mark_generic_template(body);
    }
    let id = structs.declare(StructTemplate {
        name: name.to_string(),
        kind: StructKind::Struct,
        template_types,
        declared_in: global,
        body,
        decl_node: NodeId::new(0),
        decl_span: Span::default(),
        decl_index: 0,
    });
    tree.register_struct(global, name, id);
    structs.get_mut(id).fields = fields;
    structs.seal(tree, id).unwrap();
    id
}

fn declare_pair(tree: &mut ScopeTree, structs: &mut StructManager) -> StructId {
    declare(
        tree,
        structs,
        "Pair",
        vec![GenericType::new("K"), GenericType::new("V")],
        vec![
            field("first", QualType::generic("K")),
            field("second", QualType::generic("V")),
        ],
    )
}

fn field_type(tree: &ScopeTree, body: ScopeId, name: &str) -> QualType {
    let id = tree.lookup_strict(body, name).unwrap();
    tree.entry(id).unwrap().ty.clone()
}

#[test]
fn test_manifestation_is_idempotent() {
    let mut tree = ScopeTree::new();
    let mut structs = StructManager::new();
    let pair = declare_pair(&mut tree, &mut structs);

    let args = [QualType::int(), QualType::string()];
    let first = structs.request_manifestation(&mut tree, pair, &args).unwrap();
    let scopes = tree.len();
    let second = structs.request_manifestation(&mut tree, pair, &args).unwrap();
    assert_eq!(first, second);
    assert_eq!(tree.len(), scopes);
    assert_eq!(structs.manifestations_of(pair).count(), 1);

    assert_eq!(field_type(&tree, first, "first"), QualType::int());
    assert_eq!(field_type(&tree, first, "second"), QualType::string());
    assert_eq!(structs.lookup_manifestation("Pair<int,string>"), Some(first));
    assert_eq!(tree.scope(first).type_mapping().get("K"), Some(&QualType::int()));
}

#[test]
fn test_distinct_arguments_get_distinct_bodies() {
    let mut tree = ScopeTree::new();
    let mut structs = StructManager::new();
    let pair = declare_pair(&mut tree, &mut structs);

    let a = structs
        .request_manifestation(&mut tree, pair, &[QualType::int(), QualType::string()])
        .unwrap();
    let b = structs
        .request_manifestation(&mut tree, pair, &[QualType::string(), QualType::int()])
        .unwrap();
    assert_ne!(a, b);
    let fresh = structs.take_fresh();
    assert_eq!(fresh.len(), 2);
    assert_eq!(structs.get(fresh[1]).manifestation_index, 1);
    assert!(structs.take_fresh().is_empty());
}

#[test]
fn test_wrong_argument_count() {
    let mut tree = ScopeTree::new();
    let mut structs = StructManager::new();
    let pair = declare_pair(&mut tree, &mut structs);
    let err = structs
        .request_manifestation(&mut tree, pair, &[QualType::int()])
        .unwrap_err();
    assert!(matches!(
        err,
        ManifestError::WrongTypeArgCount {
            expected: 2,
            found: 1,
            ..
        }
    ));
}

#[test]
fn test_condition_violation() {
    let mut tree = ScopeTree::new();
    let mut structs = StructManager::new();
    let numeric = GenericType::with_conditions("N", vec![QualType::int(), QualType::double()]);
    let id = declare(
        &mut tree,
        &mut structs,
        "Num",
        vec![numeric],
        vec![field("value", QualType::generic("N"))],
    );
    let err = structs
        .request_manifestation(&mut tree, id, &[QualType::string()])
        .unwrap_err();
    assert!(matches!(err, ManifestError::ConditionViolated { ref generic, .. } if generic == "N"));
    assert!(structs.request_manifestation(&mut tree, id, &[QualType::double()]).is_ok());
}

#[test]
fn test_generic_arguments_are_not_manifested() {
    let mut tree = ScopeTree::new();
    let mut structs = StructManager::new();
    let pair = declare_pair(&mut tree, &mut structs);
    let err = structs
        .request_manifestation(&mut tree, pair, &[QualType::int(), QualType::generic("X")])
        .unwrap_err();
    assert!(matches!(err, ManifestError::NotSubstantiated(ref sig) if sig == "Pair<int,X>"));
    assert_eq!(structs.manifestations_of(pair).count(), 0);
    assert!(structs.take_fresh().is_empty());
}

#[test]
fn test_self_reference_is_patched() {
    let mut tree = ScopeTree::new();
    let mut structs = StructManager::new();
    let global = tree.global();
    let next = QualType::structure(NominalType::new("Node", vec![QualType::generic("T")]).in_scope(global)).to_ptr();
    let node = declare(
        &mut tree,
        &mut structs,
        "Node",
        vec![GenericType::new("T")],
        vec![field("value", QualType::generic("T")), field("next", next)],
    );

    let body = structs
        .request_manifestation(&mut tree, node, &[QualType::int()])
        .unwrap();
    let next = field_type(&tree, body, "next");
    let target = next.contained().and_then(QualType::nominal).unwrap();
    assert_eq!(target.signature(), "Node<int>");
    assert_eq!(target.body, Some(body));
}

#[test]
fn test_unreachable_self_reference_is_reported() {
    let mut tree = ScopeTree::new();
    let mut structs = StructManager::new();
    let global = tree.global();
    // Grow<T> refers to Grow<T[]>, which keeps growing
    let grow = QualType::structure(
        NominalType::new("Grow", vec![QualType::generic("T").to_array(None)]).in_scope(global),
    )
    .to_ptr();
    let id = declare(
        &mut tree,
        &mut structs,
        "Grow",
        vec![GenericType::new("T")],
        vec![field("next", grow)],
    );
    let err = structs
        .request_manifestation(&mut tree, id, &[QualType::int()])
        .unwrap_err();
    let expected = format!("Grow<int{}>", "[]".repeat(MAX_NESTED_MANIFESTATIONS));
    assert!(matches!(err, ManifestError::UnresolvedSelfReference(ref sig) if *sig == expected));
}

#[test]
fn test_self_reference_with_swapped_arguments() {
    let mut tree = ScopeTree::new();
    let mut structs = StructManager::new();
    let global = tree.global();
    let inverse = QualType::structure(
        NominalType::new("Map", vec![QualType::generic("V"), QualType::generic("K")]).in_scope(global),
    )
    .to_ptr();
    let map = declare(
        &mut tree,
        &mut structs,
        "Map",
        vec![GenericType::new("K"), GenericType::new("V")],
        vec![field("key", QualType::generic("K")), field("inverse", inverse)],
    );

    let forward = structs
        .request_manifestation(&mut tree, map, &[QualType::int(), QualType::string()])
        .unwrap();
    let backward = structs.lookup_manifestation("Map<string,int>").unwrap();
    assert_ne!(forward, backward);
    assert_eq!(structs.manifestations_of(map).count(), 2);

    let target = |body| {
        let ty = field_type(&tree, body, "inverse");
        ty.contained().and_then(QualType::nominal).and_then(|n| n.body)
    };
    assert_eq!(target(forward), Some(backward));
    // Patched after the outer manifestation was cached
    assert_eq!(target(backward), Some(forward));
    assert_eq!(field_type(&tree, backward, "key"), QualType::string());

    // A later request is a plain cache hit
    let again = structs
        .request_manifestation(&mut tree, map, &[QualType::string(), QualType::int()])
        .unwrap();
    assert_eq!(again, backward);
}

#[test]
fn test_nested_template_is_manifested_through_fields() {
    let mut tree = ScopeTree::new();
    let mut structs = StructManager::new();
    let global = tree.global();
    declare_pair(&mut tree, &mut structs);
    let inner = QualType::structure(
        NominalType::new("Pair", vec![QualType::generic("T"), QualType::generic("T")]).in_scope(global),
    );
    let wrapper = declare(
        &mut tree,
        &mut structs,
        "Wrapper",
        vec![GenericType::new("T")],
        vec![field("pair", inner)],
    );
    let body = structs
        .request_manifestation(&mut tree, wrapper, &[QualType::bool()])
        .unwrap();
    let pair = field_type(&tree, body, "pair");
    let nominal = pair.nominal().unwrap();
    assert_eq!(nominal.signature(), "Pair<bool,bool>");
    assert_eq!(nominal.body, structs.lookup_manifestation("Pair<bool,bool>"));
}

#[test]
fn test_non_generic_struct_is_its_own_manifestation() {
    let mut tree = ScopeTree::new();
    let mut structs = StructManager::new();
    let id = declare(&mut tree, &mut structs, "Point", vec![], vec![field("x", QualType::int())]);
    let body = structs.get(id).body;
    assert_eq!(structs.lookup_manifestation("Point"), Some(body));
    assert_eq!(structs.request_manifestation(&mut tree, id, &[]).unwrap(), body);
    let x = tree.lookup_strict(body, "x").and_then(|s| tree.entry(s)).unwrap();
    assert_eq!(x.kind, SymbolKind::Field);
    assert_eq!(x.state(), LifecycleState::Declared);
}

#[test]
fn test_manifestations_are_published() {
    let registry = ManifestationRegistry::new();
    let mut tree = ScopeTree::new();
    let mut structs = StructManager::with_registry(registry.clone(), "a.sp");
    let pair = declare_pair(&mut tree, &mut structs);
    structs
        .request_manifestation(&mut tree, pair, &[QualType::int(), QualType::string()])
        .unwrap();

    let layout = registry.get("Pair<int,string>").unwrap();
    assert_eq!(layout.first_file, "a.sp");
    assert_eq!(
        layout.fields,
        vec![
            ("first".to_string(), "int".to_string()),
            ("second".to_string(), "string".to_string()),
        ]
    );
    // Generic templates themselves are never published
    assert!(registry.get("Pair").is_none());
}

#[test]
fn test_struct_implements_uses_declared_interfaces() {
    let mut tree = ScopeTree::new();
    let mut structs = StructManager::new();
    let global = tree.global();
    let shape = NominalType::new("Shape", vec![]).in_scope(global);
    let circle = declare(&mut tree, &mut structs, "Circle", vec![], vec![]);
    structs.get_mut(circle).interfaces = vec![QualType::interface(shape.clone())];
    let circle_ty = structs.get(circle).as_type();
    let circle_nominal = circle_ty.nominal().unwrap();
    assert!(structs.struct_implements(circle_nominal, &shape));
    let other = NominalType::new("Drawable", vec![]).in_scope(global);
    assert!(!structs.struct_implements(circle_nominal, &other));
}
