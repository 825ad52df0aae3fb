// functions.rs
//! Declared functions and the manifestations of generic ones.

use rustc_hash::FxHashMap;
use spindle_frontend::Span;

use crate::ids::FunctionId;
use crate::scope::{ScopeId, ScopeKind, ScopeTree};
use crate::types::{FunctionSig, GenericType, QualType, TypeMapping};

#[derive(Debug, Clone)]
pub struct FunctionTemplate {
    pub id: FunctionId,
    pub name: String,
    pub template_types: Vec<GenericType>,
    pub params: Vec<(String, QualType)>,
    /// `None` for procedures.
    pub ret: Option<QualType>,
    /// Scope holding the overload set.
    pub declared_in: ScopeId,
    /// Scope holding the generic declarations; the body scope of a non-generic function.
    pub template_scope: ScopeId,
    /// Position of the declaration in its program.
    pub decl_index: usize,
    pub span: Span,
}

impl FunctionTemplate {
    pub fn is_generic(&self) -> bool {
        !self.template_types.is_empty()
    }

    pub fn param_types(&self) -> Vec<QualType> {
        self.params.iter().map(|(_, ty)| ty.clone()).collect()
    }

    pub fn sig(&self) -> FunctionSig {
        FunctionSig::new(self.param_types(), self.ret.clone())
    }

    pub fn as_type(&self) -> QualType {
        QualType::new(crate::types::Type::Function(self.sig()))
    }
}

/// One concrete copy of a generic function.
#[derive(Debug, Clone)]
pub struct FunctionManifestation {
    pub function: FunctionId,
    /// `name<A,B>` in template order.
    pub signature: String,
    pub mapping: TypeMapping,
    pub sig: FunctionSig,
    pub body: ScopeId,
    pub manifestation_index: usize,
}

#[derive(Debug, Default)]
pub struct FunctionManager {
    functions: Vec<FunctionTemplate>,
    manifestations: Vec<FunctionManifestation>,
    /// Keyed by the bound template arguments, qualifiers included.
    cache: FxHashMap<(FunctionId, Vec<QualType>), usize>,
}

impl FunctionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, mut template: FunctionTemplate) -> FunctionId {
        let id = FunctionId::new(self.functions.len() as u32);
        template.id = id;
        self.functions.push(template);
        id
    }

    pub fn get(&self, id: FunctionId) -> &FunctionTemplate {
        &self.functions[id.slot()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionTemplate> {
        self.functions.iter()
    }

    pub fn manifestation(&self, index: usize) -> &FunctionManifestation {
        &self.manifestations[index]
    }

    pub fn manifestations(&self) -> &[FunctionManifestation] {
        &self.manifestations
    }

    /// Manifestation of `function` for `mapping`, created on first request.
    /// Returns its index and whether it was just created.
    pub fn request_manifestation(
        &mut self,
        tree: &mut ScopeTree,
        function: FunctionId,
        mapping: TypeMapping,
        sig: FunctionSig,
    ) -> (usize, bool) {
        let template = self.get(function);
        let args: Vec<QualType> = template
            .template_types
            .iter()
            .filter_map(|g| mapping.get(&g.name).cloned())
            .collect();
        let signature = qualified_signature(&template.name, &args);
        let key = (function, args);
        if let Some(&index) = self.cache.get(&key) {
            tracing::trace!(%signature, "function manifestation cache hit");
            return (index, false);
        }

        let index = self.manifestations.len();
        let manifestation_index = self
            .manifestations
            .iter()
            .filter(|m| m.function == function)
            .count();
        let scope_name = format!("{signature}#{}.{manifestation_index}", function.index());
        let body = tree.get_or_create_child(template.declared_in, &scope_name, ScopeKind::FunctionBody, template.span);
        tree.set_type_mapping(body, mapping.clone());
        self.manifestations.push(FunctionManifestation {
            function,
            signature: signature.clone(),
            mapping,
            sig,
            body,
            manifestation_index,
        });
        self.cache.insert(key, index);
        tracing::debug!(%signature, %body, "function manifested");
        (index, true)
    }
}

/// `name<A,B>` with each argument rendered with its qualifiers.
fn qualified_signature(name: &str, args: &[QualType]) -> String {
    if args.is_empty() {
        return name.to_string();
    }
    let args: Vec<String> = args.iter().map(ToString::to_string).collect();
    format!("{name}<{}>", args.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(tree: &mut ScopeTree) -> FunctionTemplate {
        let global = tree.global();
        let template_scope = tree.get_or_create_child(global, "fn:identity", ScopeKind::FunctionBody, Span::default());
        FunctionTemplate {
            id: FunctionId::new(0),
            name: "identity".into(),
            template_types: vec![GenericType::new("T")],
            params: vec![("x".into(), QualType::generic("T"))],
            ret: Some(QualType::generic("T")),
            declared_in: global,
            template_scope,
            decl_index: 0,
            span: Span::default(),
        }
    }

    #[test]
    fn test_manifestation_is_idempotent_per_binding() {
        let mut tree = ScopeTree::new();
        let mut functions = FunctionManager::new();
        let id = functions.declare(identity(&mut tree));
        let mapping: TypeMapping = [("T".to_string(), QualType::int())].into_iter().collect();
        let sig = FunctionSig::new(vec![QualType::int()], Some(QualType::int()));

        let (first, created) = functions.request_manifestation(&mut tree, id, mapping.clone(), sig.clone());
        assert!(created);
        let (again, created) = functions.request_manifestation(&mut tree, id, mapping, sig);
        assert!(!created);
        assert_eq!(first, again);

        let m = functions.manifestation(first);
        assert_eq!(m.signature, "identity<int>");
        assert_eq!(m.sig.to_string(), "(int) -> int");
        assert_eq!(tree.scope(m.body).type_mapping().get("T"), Some(&QualType::int()));
    }

    #[test]
    fn test_distinct_bindings_get_distinct_bodies() {
        let mut tree = ScopeTree::new();
        let mut functions = FunctionManager::new();
        let id = functions.declare(identity(&mut tree));
        let int_map: TypeMapping = [("T".to_string(), QualType::int())].into_iter().collect();
        let str_map: TypeMapping = [("T".to_string(), QualType::string())].into_iter().collect();
        let (a, _) = functions.request_manifestation(&mut tree, id, int_map, FunctionSig::new(vec![], None));
        let (b, _) = functions.request_manifestation(&mut tree, id, str_map, FunctionSig::new(vec![], None));
        assert_ne!(functions.manifestation(a).body, functions.manifestation(b).body);
        assert_eq!(functions.manifestation(b).manifestation_index, 1);
    }

    #[test]
    fn test_qualifiers_distinguish_bindings() {
        let mut tree = ScopeTree::new();
        let mut functions = FunctionManager::new();
        let id = functions.declare(identity(&mut tree));
        let plain: TypeMapping = [("T".to_string(), QualType::int())].into_iter().collect();
        let constant: TypeMapping = [("T".to_string(), QualType::int().to_const())].into_iter().collect();

        let (a, _) = functions.request_manifestation(&mut tree, id, plain.clone(), FunctionSig::new(vec![], None));
        let (b, created) = functions.request_manifestation(&mut tree, id, constant.clone(), FunctionSig::new(vec![], None));
        assert!(created);
        assert_ne!(a, b);
        assert_ne!(functions.manifestation(a).body, functions.manifestation(b).body);
        assert_eq!(functions.manifestation(a).signature, "identity<int>");
        assert_eq!(functions.manifestation(b).signature, "identity<const int>");

        let (again, created) = functions.request_manifestation(&mut tree, id, constant, FunctionSig::new(vec![], None));
        assert!(!created);
        assert_eq!(again, b);
    }
}
