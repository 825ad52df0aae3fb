// type_matcher/tests.rs
use super::*;
use crate::types::{GenericType, NominalType, QualType, TypeMapping};

fn generics(names: &[&str]) -> Vec<GenericType> {
    names.iter().map(|n| GenericType::new(*n)).collect()
}

/// Declares that `Circle` implements `Shape` and nothing else.
struct ShapesResolver {
    generics: Vec<GenericType>,
}

impl GenericResolver for ShapesResolver {
    fn lookup(&self, name: &str) -> Option<&GenericType> {
        self.generics.iter().find(|g| g.name == name)
    }

    fn struct_implements(&self, structure: &NominalType, interface: &NominalType) -> bool {
        structure.name == "Circle" && interface.name == "Shape"
    }
}

#[test]
fn test_binds_generic_to_requested() {
    let decls = generics(&["T"]);
    let mut mapping = TypeMapping::default();
    assert!(match_one(&QualType::generic("T"), &QualType::int(), &mut mapping, decls.as_slice(), false));
    assert_eq!(mapping.get("T"), Some(&QualType::int()));
}

#[test]
fn test_peels_shared_wrappers() {
    let decls = generics(&["T"]);
    let mut mapping = TypeMapping::default();
    let candidate = QualType::generic("T").to_ptr();
    let requested = QualType::string().to_ptr();
    assert!(match_one(&candidate, &requested, &mut mapping, decls.as_slice(), true));
    assert_eq!(mapping.get("T"), Some(&QualType::string()));
}

#[test]
fn test_failed_match_leaves_mapping_untouched() {
    let decls = generics(&["T"]);
    let mut mapping = TypeMapping::default();
    let candidates = [QualType::generic("T"), QualType::generic("T")];
    let requested = [QualType::int(), QualType::string()];
    assert!(!match_many(&candidates, &requested, &mut mapping, decls.as_slice(), false));
    assert!(mapping.is_empty());
}

#[test]
fn test_existing_binding_must_agree() {
    let decls = generics(&["T"]);
    let mut mapping = TypeMapping::default();
    mapping.insert("T".to_string(), QualType::long());
    assert!(!match_one(&QualType::generic("T"), &QualType::int(), &mut mapping, decls.as_slice(), false));
    assert!(match_one(&QualType::generic("T"), &QualType::long(), &mut mapping, decls.as_slice(), false));
    assert_eq!(mapping.len(), 1);
}

#[test]
fn test_constify_only_when_not_strict() {
    let decls = generics(&[]);
    let mut mapping = TypeMapping::default();
    let candidate = QualType::int().to_const();
    assert!(match_one(&candidate, &QualType::int(), &mut mapping, decls.as_slice(), false));
    assert!(!match_one(&candidate, &QualType::int(), &mut mapping, decls.as_slice(), true));
    // The relaxation is one-directional
    assert!(!match_one(&QualType::int(), &candidate, &mut mapping, decls.as_slice(), false));
}

#[test]
fn test_const_generic_binds_unqualified_type() {
    let decls = generics(&["T"]);
    let mut mapping = TypeMapping::default();
    let candidate = QualType::generic("T").to_const();
    assert!(match_one(&candidate, &QualType::int().to_const(), &mut mapping, decls.as_slice(), true));
    let bound = &mapping["T"];
    assert!(!bound.qualifiers.is_const());
    assert!(bound.is_primitive(spindle_frontend::PrimitiveType::Int));
}

#[test]
fn test_conditions_restrict_bindings() {
    let decls = vec![GenericType::with_conditions("N", vec![QualType::int(), QualType::long()])];
    let mut mapping = TypeMapping::default();
    assert!(!match_one(&QualType::generic("N"), &QualType::string(), &mut mapping, decls.as_slice(), false));
    assert!(match_one(&QualType::generic("N"), &QualType::long(), &mut mapping, decls.as_slice(), false));
}

#[test]
fn test_undeclared_generic_never_matches() {
    let decls = generics(&["T"]);
    let mut mapping = TypeMapping::default();
    assert!(!match_one(&QualType::generic("U"), &QualType::int(), &mut mapping, decls.as_slice(), false));
}

#[test]
fn test_generic_request_binds_placeholder() {
    let decls = generics(&["T"]);
    let mut mapping = TypeMapping::default();
    assert!(match_one(&QualType::generic("T"), &QualType::generic("U"), &mut mapping, decls.as_slice(), false));
    assert_eq!(mapping.get("T"), Some(&QualType::generic("T")));
}

#[test]
fn test_interface_accepts_implementing_struct() {
    let resolver = ShapesResolver { generics: vec![] };
    let mut mapping = TypeMapping::default();
    let shape = QualType::interface(NominalType::new("Shape", vec![]));
    let circle = QualType::structure(NominalType::new("Circle", vec![]));
    let square = QualType::structure(NominalType::new("Square", vec![]));
    assert!(match_one(&shape, &circle, &mut mapping, &resolver, false));
    assert!(!match_one(&shape, &square, &mut mapping, &resolver, false));
}

#[test]
fn test_nominal_template_args_are_matched() {
    let decls = generics(&["K", "V"]);
    let mut mapping = TypeMapping::default();
    let candidate = QualType::structure(NominalType::new(
        "Pair",
        vec![QualType::generic("K"), QualType::generic("V")],
    ));
    let requested = QualType::structure(NominalType::new("Pair", vec![QualType::int(), QualType::string()]));
    assert!(match_one(&candidate, &requested, &mut mapping, decls.as_slice(), false));
    assert_eq!(mapping.get("K"), Some(&QualType::int()));
    assert_eq!(mapping.get("V"), Some(&QualType::string()));

    let other = QualType::structure(NominalType::new("Other", vec![QualType::int(), QualType::string()]));
    let mut fresh = TypeMapping::default();
    assert!(!match_one(&candidate, &other, &mut fresh, decls.as_slice(), false));
}

#[test]
fn test_first_unbound_reports_in_template_order() {
    let decls = generics(&["T", "U"]);
    let mut mapping = TypeMapping::default();
    mapping.insert("T".to_string(), QualType::int());
    assert_eq!(first_unbound(&decls, &mapping).map(|g| g.name.as_str()), Some("U"));
    mapping.insert("U".to_string(), QualType::int());
    assert!(first_unbound(&decls, &mapping).is_none());
}

#[test]
fn test_substantiate_replaces_generic_leaves() {
    let mut mapping = TypeMapping::default();
    mapping.insert("T".to_string(), QualType::int());
    let boxed = QualType::structure(NominalType::new("Box", vec![QualType::generic("T")])).to_ptr();
    let out = substantiate(&boxed, &mapping, &mut NoManifestations).unwrap();
    assert_eq!(out.name(), "Box<int>*");
    assert!(!out.has_any_generic_parts());

    let func = QualType::function(vec![QualType::generic("T")], Some(QualType::generic("T").to_array(None)));
    let out = substantiate(&func, &mapping, &mut NoManifestations).unwrap();
    assert_eq!(out.name(), "(int) -> int[]");
}

#[test]
fn test_substantiate_unbound_generic_fails() {
    let mapping = TypeMapping::default();
    let err = substantiate(&QualType::generic("T"), &mapping, &mut NoManifestations).unwrap_err();
    assert!(matches!(err, ManifestError::UnboundGeneric(name) if name == "T"));
}

#[test]
fn test_substantiate_keeps_outer_qualifiers() {
    let mut mapping = TypeMapping::default();
    mapping.insert("T".to_string(), QualType::int());
    let out = substantiate(&QualType::generic("T").to_const(), &mapping, &mut NoManifestations).unwrap();
    assert!(out.qualifiers.is_const());
    assert!(out.qualifiers.is_signed());
}
