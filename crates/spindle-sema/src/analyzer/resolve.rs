// analyzer/resolve.rs
//! Type expressions to qualified types, and the assignability rule.

use spindle_frontend::{Span, TypeExpr, TypeExprKind, TypeParam};

use super::{Analyzer, TypeError};
use crate::errors::SemanticError;
use crate::ids::StructId;
use crate::scope::{ScopeId, ScopeTree, TypeName};
use crate::structs::{Manifester, StructKind, StructManager};
use crate::type_matcher::substantiate;
use crate::types::{GenericResolver, GenericType, NominalType, QualType, Type, TypeMapping};

/// Generic declarations visible from one scope, plus struct/interface knowledge.
pub(super) struct ScopeResolver<'t> {
    tree: &'t ScopeTree,
    structs: &'t StructManager,
    scope: ScopeId,
}

impl GenericResolver for ScopeResolver<'_> {
    fn lookup(&self, name: &str) -> Option<&GenericType> {
        self.tree.lookup_generic_type(self.scope, name)
    }

    fn struct_implements(&self, structure: &NominalType, interface: &NominalType) -> bool {
        self.structs.struct_implements(structure, interface)
    }
}

impl Analyzer<'_> {
    pub(super) fn resolver(&self, scope: ScopeId) -> ScopeResolver<'_> {
        ScopeResolver {
            tree: &self.tree,
            structs: &self.structs,
            scope,
        }
    }

    /// Resolve a written type from `scope`. Specifiers are applied last.
    pub(super) fn resolve_type_expr(&mut self, scope: ScopeId, texpr: &TypeExpr) -> Result<QualType, TypeError> {
        let mut ty = match &texpr.kind {
            TypeExprKind::Primitive(p) => QualType::primitive(*p),
            TypeExprKind::Dyn => QualType::dyn_type(),
            TypeExprKind::Ptr(inner) => self.resolve_type_expr(scope, inner)?.to_ptr(),
            TypeExprKind::Ref(inner) => self.resolve_type_expr(scope, inner)?.to_ref(),
            TypeExprKind::Array { element, size } => self.resolve_type_expr(scope, element)?.to_array(*size),
            TypeExprKind::Function { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| self.resolve_type_expr(scope, p))
                    .collect::<Result<Vec<_>, _>>()?;
                let ret = ret
                    .as_deref()
                    .map(|r| self.resolve_type_expr(scope, r))
                    .transpose()?;
                QualType::function(params, ret)
            }
            TypeExprKind::Named { name, type_args } => self.resolve_named(scope, name, type_args, texpr.span)?,
        };
        for specifier in &texpr.specifiers {
            ty.qualifiers.apply(*specifier);
        }
        Ok(ty)
    }

    fn resolve_named(
        &mut self,
        scope: ScopeId,
        name: &str,
        type_args: &[TypeExpr],
        span: Span,
    ) -> Result<QualType, TypeError> {
        let (id, declared_in) = match self.tree.resolve_type_name(scope, name) {
            Some(TypeName::Mapped(ty)) => return Ok(ty.clone()),
            Some(TypeName::Generic(_)) => return Ok(QualType::generic(name)),
            Some(TypeName::Struct { id, declared_in }) => (id, declared_in),
            None => {
                return Err(self.fail(
                    SemanticError::UnknownType {
                        name: name.to_string(),
                        span: span.into(),
                    },
                    span,
                ));
            }
        };
        let args = type_args
            .iter()
            .map(|a| self.resolve_type_expr(scope, a))
            .collect::<Result<Vec<_>, _>>()?;
        self.nominal_type(id, declared_in, args, span)
    }

    /// Type of template `id` applied to `args`, manifested when concrete.
    pub(super) fn nominal_type(
        &mut self,
        id: StructId,
        declared_in: ScopeId,
        args: Vec<QualType>,
        span: Span,
    ) -> Result<QualType, TypeError> {
        let base = self.structs.get(id);
        let expected = base.template_types.len();
        if expected != args.len() {
            let error = SemanticError::WrongTypeArgCount {
                name: base.name.clone(),
                expected,
                found: args.len(),
                span: span.into(),
            };
            self.add_error(error, span);
            return Ok(QualType::invalid());
        }
        if expected == 0 {
            return Ok(base.as_type());
        }

        let nominal = NominalType {
            name: base.name.clone(),
            template_args: args,
            scope: Some(declared_in),
            body: None,
        };
        let mut ty = match base.kind {
            StructKind::Struct => QualType::structure(nominal),
            StructKind::Interface => QualType::interface(nominal),
        };
        if self.defer_manifestation || ty.has_any_generic_parts() {
            return Ok(ty);
        }
        let args = ty.nominal().map(|n| n.template_args.clone()).unwrap_or_default();
        match self.structs.request_manifestation(&mut self.tree, id, &args) {
            Ok(body) => {
                if let Some(nominal) = ty.nominal_mut() {
                    nominal.body = Some(body);
                }
                Ok(ty)
            }
            Err(err) => {
                self.report_manifest_error(err, span)?;
                Ok(QualType::invalid())
            }
        }
    }

    /// Resolve the body scopes of concrete struct types inside `ty`.
    /// Types that still mention a generic are left for their manifestations.
    pub(super) fn manifest_concrete(&mut self, ty: &QualType, span: Span) -> Result<QualType, TypeError> {
        if ty.has_any_generic_parts() {
            return Ok(ty.clone());
        }
        let mut manifests = Manifester {
            structs: &mut self.structs,
            tree: &mut self.tree,
        };
        match substantiate(ty, &TypeMapping::default(), &mut manifests) {
            Ok(resolved) => Ok(resolved),
            Err(err) => {
                self.report_manifest_error(err, span)?;
                Ok(QualType::invalid())
            }
        }
    }

    /// Generic declarations of a template. Conditions resolve from
    /// `condition_scope`; the generics are declared in `body`.
    pub(super) fn declare_type_params(
        &mut self,
        condition_scope: ScopeId,
        body: ScopeId,
        params: &[TypeParam],
    ) -> Result<Vec<GenericType>, TypeError> {
        let mut generics = Vec::with_capacity(params.len());
        for param in params {
            let conditions = param
                .conditions
                .iter()
                .map(|c| self.resolve_type_expr(condition_scope, c))
                .collect::<Result<Vec<_>, _>>()?;
            let generic = if conditions.is_empty() {
                GenericType::new(param.name.as_str())
            } else {
                GenericType::with_conditions(param.name.as_str(), conditions)
            };
            self.tree.insert_generic_type(body, generic.clone());
            generics.push(generic);
        }
        Ok(generics)
    }

    /// Whether a value of type `value` may be stored where `target` is expected.
    /// Constness of the stored copy is irrelevant; references bind to values.
    pub(super) fn is_assignable(&self, target: &QualType, value: &QualType) -> bool {
        if target.is_invalid() || value.is_invalid() || target.is_dyn() || value.is_dyn() {
            return true;
        }
        let target = match &target.ty {
            Type::Ref(inner) if !value.is_ref() => inner.as_ref(),
            _ => target,
        };
        let mut value = value.clone();
        value.qualifiers.set_const(target.qualifiers.is_const());
        if target.matches(&value, true, false) {
            return true;
        }
        matches!(
            (&target.ty, &value.ty),
            (Type::Interface(iface), Type::Struct(st)) if self.structs.struct_implements(st, iface)
        )
    }
}
