// structs/manager.rs
//! Struct/interface registry and manifestation cache for one compilation unit.
//!
//! A manifestation is a concrete copy of a generic template, keyed by its
//! signature (`Pair<int,string>`). Requests are idempotent: the first request
//! builds the body scope, later ones return the cached scope.

use rustc_hash::FxHashMap;
use spindle_frontend::{NodeId, Span};
use thiserror::Error;

use super::{FieldDef, MethodDef, StructBase, StructKind};
use crate::ids::StructId;
use crate::registry::{ManifestationRegistry, ManifestedLayout};
use crate::scope::{ScopeError, ScopeId, ScopeKind, ScopeTree, SymbolKind};
use crate::type_matcher::{ManifestationResolver, substantiate, substantiate_all};
use crate::types::{
    FunctionSig, GenericResolver, GenericType, NominalType, QualType, Type, TypeMapping, signature_of,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManifestError {
    #[error("generic type '{0}' is not bound")]
    UnboundGeneric(String),
    #[error("no manifestation could be found for '{0}'")]
    Unresolved(String),
    #[error("self-referential type '{0}' was never manifested")]
    UnresolvedSelfReference(String),
    #[error("'{name}' expects {expected} template types, found {found}")]
    WrongTypeArgCount {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("{found} does not satisfy the conditions of '{generic}'")]
    ConditionViolated { generic: String, found: String },
    #[error("generic arguments of '{0}' could not be inferred")]
    NotSubstantiated(String),
    #[error(transparent)]
    Scope(#[from] ScopeError),
}

/// Everything known about a struct or interface when it is declared.
#[derive(Debug, Clone)]
pub struct StructTemplate {
    pub name: String,
    pub kind: StructKind,
    pub template_types: Vec<GenericType>,
    pub declared_in: ScopeId,
    pub body: ScopeId,
    pub decl_node: NodeId,
    pub decl_span: Span,
    pub decl_index: usize,
}

/// Manifestations of one template that may be under construction at once.
/// A template whose fields keep growing its own arguments (`Grow<T[]>`)
/// hits this bound and is reported as an unresolved self-reference.
const MAX_NESTED_MANIFESTATIONS: usize = 8;

/// Field whose type refers to a manifestation that was still being built.
#[derive(Debug, Clone)]
struct DeferredField {
    owner: StructId,
    field: usize,
    signature: String,
}

#[derive(Debug, Default)]
pub struct StructManager {
    structs: Vec<StructBase>,
    /// Manifestation signature -> body scope.
    cache: FxHashMap<String, ScopeId>,
    by_body: FxHashMap<ScopeId, StructId>,
    /// Manifestations currently being built, outermost first.
    in_progress: Vec<(StructId, String)>,
    /// Signatures left unresolved while `in_progress` was non-empty.
    deferring: Vec<String>,
    deferred: Vec<DeferredField>,
    fresh: Vec<StructId>,
    shared: Option<(ManifestationRegistry, String)>,
}

impl StructManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish every manifestation to a registry shared between files.
    pub fn with_registry(registry: ManifestationRegistry, file: impl Into<String>) -> Self {
        Self {
            shared: Some((registry, file.into())),
            ..Self::default()
        }
    }

    pub fn get(&self, id: StructId) -> &StructBase {
        &self.structs[id.slot()]
    }

    pub fn get_mut(&mut self, id: StructId) -> &mut StructBase {
        &mut self.structs[id.slot()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &StructBase> {
        self.structs.iter()
    }

    pub fn by_body_scope(&self, scope: ScopeId) -> Option<&StructBase> {
        self.by_body.get(&scope).map(|&id| self.get(id))
    }

    /// Struct or interface for a resolved nominal type.
    pub fn for_nominal(&self, nominal: &NominalType) -> Option<&StructBase> {
        let body = nominal.body.or_else(|| self.cache.get(&nominal.signature()).copied())?;
        self.by_body_scope(body)
    }

    pub fn lookup_manifestation(&self, signature: &str) -> Option<ScopeId> {
        self.cache.get(signature).copied()
    }

    pub fn manifestations_of(&self, template: StructId) -> impl Iterator<Item = &StructBase> {
        self.structs
            .iter()
            .filter(move |s| s.generic_origin == Some(template))
    }

    /// Manifestations created since the last call, in creation order.
    pub fn take_fresh(&mut self) -> Vec<StructId> {
        std::mem::take(&mut self.fresh)
    }

    /// Register a declared struct or interface. Fields, methods and
    /// interfaces are filled in afterwards through [`get_mut`](Self::get_mut).
    pub fn declare(&mut self, template: StructTemplate) -> StructId {
        let id = StructId::new(self.structs.len() as u32);
        self.structs.push(StructBase {
            id,
            name: template.name,
            kind: template.kind,
            template_types: template.template_types,
            template_args: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            interfaces: Vec::new(),
            declared_in: template.declared_in,
            body: template.body,
            decl_node: template.decl_node,
            decl_span: template.decl_span,
            decl_index: template.decl_index,
            generic_origin: None,
            manifestation_index: 0,
            mapping: TypeMapping::default(),
        });
        self.by_body.insert(template.body, id);
        id
    }

    /// Insert the declared fields and methods into the body scope. A
    /// non-generic struct is its own manifestation and is cached by name.
    pub fn seal(&mut self, tree: &mut ScopeTree, id: StructId) -> Result<(), ManifestError> {
        let base = self.get(id).clone();
        populate_body(tree, &base)?;
        if base.template_types.is_empty() {
            let signature = base.signature();
            self.cache.insert(signature.clone(), base.body);
            self.publish(&signature, &base.fields);
        }
        Ok(())
    }

    /// Whether the struct behind `structure` declares it implements `interface`.
    pub fn struct_implements(&self, structure: &NominalType, interface: &NominalType) -> bool {
        self.for_nominal(structure)
            .is_some_and(|s| s.kind == StructKind::Struct && s.implements(interface))
    }

    /// Body scope of `template` manifested with `args`, created on first request.
    pub fn request_manifestation(
        &mut self,
        tree: &mut ScopeTree,
        template: StructId,
        args: &[QualType],
    ) -> Result<ScopeId, ManifestError> {
        let base = self.get(template);
        if base.generic_origin.is_some() {
            // Already a manifestation
            return Ok(base.body);
        }
        if base.template_types.len() != args.len() {
            return Err(ManifestError::WrongTypeArgCount {
                name: base.name.clone(),
                expected: base.template_types.len(),
                found: args.len(),
            });
        }
        if args.is_empty() {
            return Ok(base.body);
        }

        let signature = signature_of(&base.name, args);
        if let Some(&scope) = self.cache.get(&signature) {
            tracing::trace!(%signature, "manifestation cache hit");
            return Ok(scope);
        }
        if args.iter().any(QualType::has_any_generic_parts) {
            return Err(ManifestError::NotSubstantiated(signature));
        }
        let generics = base.template_types.clone();
        let resolver = TemplateResolver {
            structs: self,
            generics: &generics,
        };
        for (generic, arg) in generics.iter().zip(args) {
            if !generic.check_conditions_of(arg, false, &resolver) {
                return Err(ManifestError::ConditionViolated {
                    generic: generic.name.clone(),
                    found: arg.to_string(),
                });
            }
        }

        self.in_progress.push((template, signature.clone()));
        let built = self.build_manifestation(tree, template, args, &signature);
        self.in_progress.pop();
        if !self.in_progress.is_empty() {
            return built;
        }
        match built {
            Ok(scope) => {
                self.resolve_deferred(tree)?;
                Ok(scope)
            }
            Err(err) => {
                self.deferred.clear();
                self.deferring.clear();
                Err(err)
            }
        }
    }

    fn build_manifestation(
        &mut self,
        tree: &mut ScopeTree,
        template: StructId,
        args: &[QualType],
        signature: &str,
    ) -> Result<ScopeId, ManifestError> {
        let base = self.get(template).clone();
        let mapping: TypeMapping = base
            .template_types
            .iter()
            .map(|g| g.name.clone())
            .zip(args.iter().cloned())
            .collect();

        let mut fields = Vec::with_capacity(base.fields.len());
        let mut deferred = Vec::new();
        for (index, field) in base.fields.iter().enumerate() {
            let ty = substantiate(&field.ty, &mapping, &mut Manifester { structs: self, tree })?;
            for pending in self.pending_signatures(&ty) {
                deferred.push((index, pending));
            }
            fields.push(FieldDef { ty, ..field.clone() });
        }
        let mut methods = Vec::with_capacity(base.methods.len());
        for method in &base.methods {
            let mut manifests = Manifester { structs: self, tree };
            let sig = FunctionSig {
                params: substantiate_all(&method.sig.params, &mapping, &mut manifests)?,
                ret: match &method.sig.ret {
                    Some(ret) => Some(Box::new(substantiate(ret, &mapping, &mut manifests)?)),
                    None => None,
                },
            };
            methods.push(MethodDef { sig, ..method.clone() });
        }
        let interfaces = substantiate_all(&base.interfaces, &mapping, &mut Manifester { structs: self, tree })?;

        let kind = match base.kind {
            StructKind::Struct => ScopeKind::Struct,
            StructKind::Interface => ScopeKind::Interface,
        };
        let body = tree.get_or_create_child(base.declared_in, signature, kind, base.decl_span);
        tree.set_type_mapping(body, mapping.clone());

        let id = StructId::new(self.structs.len() as u32);
        let manifestation = StructBase {
            id,
            template_args: args.to_vec(),
            fields,
            methods,
            interfaces,
            body,
            generic_origin: Some(template),
            manifestation_index: self.manifestations_of(template).count(),
            mapping,
            ..base
        };
        populate_body(tree, &manifestation)?;
        self.publish(signature, &manifestation.fields);
        self.structs.push(manifestation);
        self.by_body.insert(body, id);
        self.cache.insert(signature.to_string(), body);
        self.fresh.push(id);
        self.deferred.extend(deferred.into_iter().map(|(field, signature)| DeferredField {
            owner: id,
            field,
            signature,
        }));
        tracing::debug!(%signature, %body, "struct manifested");
        Ok(body)
    }

    /// Whether a request for `signature` must wait for the outermost
    /// manifestation to finish instead of being built now.
    fn must_defer(&self, template: StructId, signature: &str) -> bool {
        let mut nested = 0;
        for (building, building_sig) in &self.in_progress {
            if building_sig == signature {
                return true;
            }
            if *building == template {
                nested += 1;
            }
        }
        nested >= MAX_NESTED_MANIFESTATIONS
    }

    fn defer(&mut self, signature: String) {
        if !self.deferring.contains(&signature) {
            self.deferring.push(signature);
        }
    }

    /// Signatures of nominal types in `ty` left unresolved by a deferral.
    fn pending_signatures(&self, ty: &QualType) -> Vec<String> {
        let mut out = Vec::new();
        collect_unresolved(ty, &mut |nominal| {
            let signature = nominal.signature();
            if self.deferring.contains(&signature) && !out.contains(&signature) {
                out.push(signature);
            }
        });
        out
    }

    /// Patch deferred self-references now that the outermost manifestation is cached.
    fn resolve_deferred(&mut self, tree: &mut ScopeTree) -> Result<(), ManifestError> {
        self.deferring.clear();
        for pending in std::mem::take(&mut self.deferred) {
            let Some(&target) = self.cache.get(&pending.signature) else {
                return Err(ManifestError::UnresolvedSelfReference(pending.signature));
            };
            let owner = &mut self.structs[pending.owner.slot()];
            let field = &mut owner.fields[pending.field];
            patch_body(&mut field.ty, &pending.signature, target);
            let (name, ty, body) = (field.name.clone(), field.ty.clone(), owner.body);
            if let Some(entry) = tree
                .lookup_strict(body, &name)
                .and_then(|id| tree.entry_mut(id))
            {
                entry.update_type(ty, true);
            }
        }
        Ok(())
    }

    fn publish(&self, signature: &str, fields: &[FieldDef]) {
        let Some((registry, file)) = &self.shared else {
            return;
        };
        let (_, created) = registry.get_or_create(signature, || {
            ManifestedLayout::new(
                signature,
                fields
                    .iter()
                    .map(|f| (f.name.clone(), f.ty.name()))
                    .collect(),
                file,
            )
        });
        if created {
            tracing::debug!(signature, file = %file, "manifestation published");
        }
    }
}

/// Field and method entries of a struct body, in declaration order.
fn populate_body(tree: &mut ScopeTree, base: &StructBase) -> Result<(), ScopeError> {
    for field in &base.fields {
        let id = tree.insert(base.body, &field.name, SymbolKind::Field, field.ty.clone(), base.decl_node, field.span)?;
        if let Some(entry) = tree.entry_mut(id) {
            entry.implicit = field.implicit;
        }
    }
    for method in &base.methods {
        let ty = QualType::new(Type::Function(method.sig.clone()));
        tree.insert(base.body, &method.name, SymbolKind::Function, ty, base.decl_node, method.span)?;
    }
    Ok(())
}

fn collect_unresolved(ty: &QualType, visit: &mut impl FnMut(&NominalType)) {
    match &ty.ty {
        Type::Struct(n) | Type::Interface(n) => {
            if n.body.is_none() {
                visit(n);
            }
            for arg in &n.template_args {
                collect_unresolved(arg, visit);
            }
        }
        Type::Ptr(inner) | Type::Ref(inner) | Type::Array(inner, _) => collect_unresolved(inner, visit),
        Type::Function(sig) => {
            for slot in sig.slots() {
                collect_unresolved(slot, visit);
            }
        }
        Type::Primitive(_) | Type::Dyn | Type::Invalid | Type::Generic(_) => {}
    }
}

fn patch_body(ty: &mut QualType, signature: &str, body: ScopeId) {
    match &mut ty.ty {
        Type::Struct(n) | Type::Interface(n) => {
            if n.body.is_none() && n.signature() == signature {
                n.body = Some(body);
            }
            for arg in &mut n.template_args {
                patch_body(arg, signature, body);
            }
        }
        Type::Ptr(inner) | Type::Ref(inner) | Type::Array(inner, _) => patch_body(inner, signature, body),
        Type::Function(sig) => {
            for param in &mut sig.params {
                patch_body(param, signature, body);
            }
            if let Some(ret) = &mut sig.ret {
                patch_body(ret, signature, body);
            }
        }
        Type::Primitive(_) | Type::Dyn | Type::Invalid | Type::Generic(_) => {}
    }
}

/// Manifests nominal types met during substitution.
pub struct Manifester<'a> {
    pub structs: &'a mut StructManager,
    pub tree: &'a mut ScopeTree,
}

impl ManifestationResolver for Manifester<'_> {
    fn resolve_manifestation(&mut self, ty: &QualType) -> Result<Option<ScopeId>, ManifestError> {
        let Some(nominal) = ty.nominal() else {
            return Ok(None);
        };
        let signature = nominal.signature();
        if let Some(scope) = self.structs.lookup_manifestation(&signature) {
            return Ok(Some(scope));
        }
        let template = nominal
            .scope
            .and_then(|scope| self.tree.struct_in(scope, &nominal.name))
            .ok_or_else(|| ManifestError::Unresolved(signature.clone()))?;
        if self.structs.must_defer(template, &signature) {
            tracing::trace!(%signature, "self-referential manifestation deferred");
            self.structs.defer(signature);
            return Ok(None);
        }
        self.structs
            .request_manifestation(self.tree, template, &nominal.template_args)
            .map(Some)
    }
}

/// Generic declarations of one template plus struct/interface knowledge.
struct TemplateResolver<'a> {
    structs: &'a StructManager,
    generics: &'a [GenericType],
}

impl GenericResolver for TemplateResolver<'_> {
    fn lookup(&self, name: &str) -> Option<&GenericType> {
        self.generics.lookup(name)
    }

    fn struct_implements(&self, structure: &NominalType, interface: &NominalType) -> bool {
        self.structs.struct_implements(structure, interface)
    }
}

#[cfg(test)]
mod tests;
