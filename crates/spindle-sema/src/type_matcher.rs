// type_matcher.rs
//! Generic-aware matching of candidate types against requested types, and
//! substitution of inferred bindings back into types.
//!
//! Matching is transactional: the caller's [`TypeMapping`] is only updated
//! when the whole match succeeds.

use crate::scope::ScopeId;
use crate::structs::ManifestError;
use crate::types::{FunctionSig, GenericResolver, GenericType, NominalType, QualType, Type, TypeMapping};

/// Finds (or creates) the manifestation body for a concrete struct or
/// interface type produced by substitution.
pub trait ManifestationResolver {
    /// `Ok(None)` defers resolution, for types referring to a manifestation
    /// that is still being built.
    fn resolve_manifestation(&mut self, ty: &QualType) -> Result<Option<ScopeId>, ManifestError>;
}

/// Pure substitution: nominal bodies are left unresolved.
pub struct NoManifestations;

impl ManifestationResolver for NoManifestations {
    fn resolve_manifestation(&mut self, _ty: &QualType) -> Result<Option<ScopeId>, ManifestError> {
        Ok(None)
    }
}

/// Match a single candidate against a requested type, extending `mapping`
/// with any new generic bindings on success.
pub fn match_one<R: GenericResolver + ?Sized>(
    candidate: &QualType,
    requested: &QualType,
    mapping: &mut TypeMapping,
    resolver: &R,
    strict: bool,
) -> bool {
    let mut scratch = mapping.clone();
    let matched = match_type(candidate, requested, &mut scratch, resolver, strict);
    if matched {
        *mapping = scratch;
    }
    matched
}

/// Pairwise match of two equally long lists. No binding is committed unless
/// every pair matches.
pub fn match_many<R: GenericResolver + ?Sized>(
    candidates: &[QualType],
    requested: &[QualType],
    mapping: &mut TypeMapping,
    resolver: &R,
    strict: bool,
) -> bool {
    let mut scratch = mapping.clone();
    let matched = match_list(candidates, requested, &mut scratch, resolver, strict);
    if matched {
        *mapping = scratch;
    }
    matched
}

fn match_list<R: GenericResolver + ?Sized>(
    candidates: &[QualType],
    requested: &[QualType],
    mapping: &mut TypeMapping,
    resolver: &R,
    strict: bool,
) -> bool {
    candidates.len() == requested.len()
        && candidates
            .iter()
            .zip(requested)
            .all(|(c, r)| match_type(c, r, mapping, resolver, strict))
}

fn match_type<R: GenericResolver + ?Sized>(
    candidate: &QualType,
    requested: &QualType,
    mapping: &mut TypeMapping,
    resolver: &R,
    strict: bool,
) -> bool {
    let (mut c, mut r) = (candidate, requested);

    // Peel wrappers both sides share
    while c.is_same_container_type_as(r) {
        match (c.contained(), r.contained()) {
            (Some(ci), Some(ri)) => {
                c = ci;
                r = ri;
            }
            _ => break,
        }
    }
    if let Type::Ref(inner) = &c.ty
        && !r.is_ref()
    {
        c = inner;
    }
    if let Type::Ref(inner) = &r.ty
        && !c.is_ref()
        && !c.is_generic()
    {
        r = inner;
    }

    if let Type::Generic(name) = &c.ty {
        return match_generic(name, c, r, mapping, resolver, strict);
    }

    if !c.has_any_generic_parts() {
        return c.matches(r, true, !strict) || implemented_by(c, r, resolver);
    }

    if c.super_type() != r.super_type() {
        return false;
    }
    match (&c.ty, &r.ty) {
        (Type::Struct(cn), Type::Struct(rn)) | (Type::Interface(cn), Type::Interface(rn)) => {
            cn.name == rn.name
                && cn.scope == rn.scope
                && match_list(&cn.template_args, &rn.template_args, mapping, resolver, strict)
        }
        (Type::Function(cs), Type::Function(rs)) => match_signatures(cs, rs, mapping, resolver, strict),
        _ => false,
    }
}

fn match_signatures<R: GenericResolver + ?Sized>(
    candidate: &FunctionSig,
    requested: &FunctionSig,
    mapping: &mut TypeMapping,
    resolver: &R,
    strict: bool,
) -> bool {
    candidate.params.len() == requested.params.len()
        && candidate
            .slots()
            .zip(requested.slots())
            .all(|(c, r)| match_type(c, r, mapping, resolver, strict))
}

fn match_generic<R: GenericResolver + ?Sized>(
    name: &str,
    candidate: &QualType,
    requested: &QualType,
    mapping: &mut TypeMapping,
    resolver: &R,
    strict: bool,
) -> bool {
    if let Some(known) = mapping.get(name) {
        let mut known = known.clone();
        known.qualifiers = known.qualifiers.merge(candidate.qualifiers);
        let mut requested = requested.clone();
        if !requested.is_ref() {
            known = known.remove_reference_wrapper();
        }
        if requested.is_ref() && !known.is_ref() {
            requested = requested.remove_reference_wrapper();
        }
        return known.matches(&requested, false, !strict);
    }

    let Some(generic) = resolver.lookup(name) else {
        tracing::trace!(name, "generic type not declared at match site");
        return false;
    };
    if !generic.check_conditions_of(requested, strict, resolver) {
        return false;
    }

    let binding = if requested.has_any_generic_parts() {
        candidate.clone()
    } else {
        let mut bound = requested.clone();
        bound.qualifiers.erase_with_mask(candidate.qualifiers);
        bound
    };
    tracing::trace!(name, binding = %binding, "generic bound");
    mapping.insert(name.to_string(), binding);
    true
}

/// Interface candidate satisfied by a struct declaring it implements it.
fn implemented_by<R: GenericResolver + ?Sized>(candidate: &QualType, requested: &QualType, resolver: &R) -> bool {
    matches!(
        (&candidate.ty, &requested.ty),
        (Type::Interface(iface), Type::Struct(st)) if resolver.struct_implements(st, iface)
    )
}

/// First template type that has no binding in `mapping`.
pub fn first_unbound<'a>(templates: &'a [GenericType], mapping: &TypeMapping) -> Option<&'a GenericType> {
    templates.iter().find(|g| !mapping.contains_key(&g.name))
}

/// Replace every generic leaf of `ty` by its binding. Struct and interface
/// types that are concrete but have no body yet are resolved through
/// `manifests`.
pub fn substantiate<M: ManifestationResolver + ?Sized>(
    ty: &QualType,
    mapping: &TypeMapping,
    manifests: &mut M,
) -> Result<QualType, ManifestError> {
    if !ty.has_any_generic_parts() && !has_unresolved_nominal(ty) {
        return Ok(ty.clone());
    }
    let substituted = match &ty.ty {
        Type::Generic(name) => {
            let replacement = mapping
                .get(name)
                .ok_or_else(|| ManifestError::UnboundGeneric(name.clone()))?;
            return Ok(ty.replace_base(replacement));
        }
        Type::Ptr(inner) => Type::Ptr(Box::new(substantiate(inner, mapping, manifests)?)),
        Type::Ref(inner) => Type::Ref(Box::new(substantiate(inner, mapping, manifests)?)),
        Type::Array(inner, size) => Type::Array(Box::new(substantiate(inner, mapping, manifests)?), *size),
        Type::Function(sig) => Type::Function(FunctionSig {
            params: substantiate_all(&sig.params, mapping, manifests)?,
            ret: match &sig.ret {
                Some(ret) => Some(Box::new(substantiate(ret, mapping, manifests)?)),
                None => None,
            },
        }),
        Type::Struct(nominal) => Type::Struct(substantiate_nominal(nominal, mapping, manifests)?),
        Type::Interface(nominal) => Type::Interface(substantiate_nominal(nominal, mapping, manifests)?),
        Type::Primitive(_) | Type::Dyn | Type::Invalid => ty.ty.clone(),
    };
    let mut out = QualType::with_qualifiers(substituted, ty.qualifiers);
    if out.nominal().is_some() && !out.has_any_generic_parts() {
        let body = manifests.resolve_manifestation(&out)?;
        if let Some(nominal) = out.nominal_mut() {
            nominal.body = body;
        }
    }
    Ok(out)
}

/// A struct or interface somewhere in `ty` has no body scope yet.
fn has_unresolved_nominal(ty: &QualType) -> bool {
    match &ty.ty {
        Type::Struct(n) | Type::Interface(n) => {
            n.body.is_none() || n.template_args.iter().any(has_unresolved_nominal)
        }
        Type::Ptr(inner) | Type::Ref(inner) | Type::Array(inner, _) => has_unresolved_nominal(inner),
        Type::Function(sig) => sig.slots().any(has_unresolved_nominal),
        Type::Primitive(_) | Type::Dyn | Type::Invalid | Type::Generic(_) => false,
    }
}

pub fn substantiate_all<M: ManifestationResolver + ?Sized>(
    types: &[QualType],
    mapping: &TypeMapping,
    manifests: &mut M,
) -> Result<Vec<QualType>, ManifestError> {
    types.iter().map(|t| substantiate(t, mapping, manifests)).collect()
}

fn substantiate_nominal<M: ManifestationResolver + ?Sized>(
    nominal: &NominalType,
    mapping: &TypeMapping,
    manifests: &mut M,
) -> Result<NominalType, ManifestError> {
    Ok(NominalType {
        name: nominal.name.clone(),
        template_args: substantiate_all(&nominal.template_args, mapping, manifests)?,
        scope: nominal.scope,
        body: None,
    })
}

#[cfg(test)]
mod tests;
