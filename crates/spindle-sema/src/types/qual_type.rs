// types/qual_type.rs
//! Qualified types: a structural [`Type`] plus its [`TypeQualifiers`].

use std::fmt;
use std::hash::{Hash, Hasher};

use spindle_frontend::PrimitiveType;

use super::TypeQualifiers;
use crate::scope::ScopeId;

/// Coarse classification of a type, used for structural comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuperType {
    Double,
    Int,
    Short,
    Long,
    Byte,
    Char,
    String,
    Bool,
    Struct,
    Interface,
    Generic,
    Dyn,
    Invalid,
    Ptr,
    Ref,
    Array,
    Function,
    Procedure,
}

/// A struct or interface type, possibly with template arguments.
#[derive(Debug, Clone)]
pub struct NominalType {
    pub name: String,
    pub template_args: Vec<QualType>,
    /// Scope the template was declared in.
    pub scope: Option<ScopeId>,
    /// Body scope of the manifestation, once resolved. Not part of equality.
    pub body: Option<ScopeId>,
}

impl NominalType {
    pub fn new(name: impl Into<String>, template_args: Vec<QualType>) -> Self {
        Self {
            name: name.into(),
            template_args,
            scope: None,
            body: None,
        }
    }

    pub fn in_scope(mut self, scope: ScopeId) -> Self {
        self.scope = Some(scope);
        self
    }

    /// `Name<A,B>`, or just `Name` without template arguments.
    pub fn signature(&self) -> String {
        signature_of(&self.name, &self.template_args)
    }
}

impl PartialEq for NominalType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.scope == other.scope && self.template_args == other.template_args
    }
}

impl Eq for NominalType {}

impl Hash for NominalType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.scope.hash(state);
        self.template_args.hash(state);
    }
}

/// Parameter and return types of a callable. `ret == None` is a procedure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSig {
    pub params: Vec<QualType>,
    pub ret: Option<Box<QualType>>,
}

impl FunctionSig {
    pub fn new(params: Vec<QualType>, ret: Option<QualType>) -> Self {
        Self {
            params,
            ret: ret.map(Box::new),
        }
    }

    pub fn is_procedure(&self) -> bool {
        self.ret.is_none()
    }

    /// Parameters followed by the return type, if any.
    pub fn slots(&self) -> impl Iterator<Item = &QualType> {
        self.params.iter().chain(self.ret.as_deref())
    }
}

impl fmt::Display for FunctionSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", join_names(&self.params))?;
        if let Some(ret) = &self.ret {
            write!(f, " -> {}", ret.name())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Primitive(PrimitiveType),
    /// Unconstrained: matches any type as a generic condition, or awaits inference.
    Dyn,
    /// Result of an erroneous expression. Suppresses follow-up diagnostics.
    Invalid,
    Generic(String),
    Struct(NominalType),
    Interface(NominalType),
    Ptr(Box<QualType>),
    Ref(Box<QualType>),
    Array(Box<QualType>, Option<u32>),
    Function(FunctionSig),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualType {
    pub ty: Type,
    pub qualifiers: TypeQualifiers,
}

/// `Name<A,B>` for a list of concrete template arguments.
pub fn signature_of(name: &str, args: &[QualType]) -> String {
    if args.is_empty() {
        name.to_string()
    } else {
        format!("{name}<{}>", join_names(args))
    }
}

fn join_names(types: &[QualType]) -> String {
    types.iter().map(QualType::name).collect::<Vec<_>>().join(",")
}

impl QualType {
    /// Wrap a type with the default qualifiers for its super type.
    pub fn new(ty: Type) -> Self {
        let qualifiers = default_qualifiers(&ty);
        Self { ty, qualifiers }
    }

    pub fn with_qualifiers(ty: Type, qualifiers: TypeQualifiers) -> Self {
        Self { ty, qualifiers }
    }

    pub fn primitive(primitive: PrimitiveType) -> Self {
        Self::new(Type::Primitive(primitive))
    }

    pub fn int() -> Self {
        Self::primitive(PrimitiveType::Int)
    }

    pub fn long() -> Self {
        Self::primitive(PrimitiveType::Long)
    }

    pub fn double() -> Self {
        Self::primitive(PrimitiveType::Double)
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveType::String)
    }

    pub fn bool() -> Self {
        Self::primitive(PrimitiveType::Bool)
    }

    pub fn byte() -> Self {
        Self::primitive(PrimitiveType::Byte)
    }

    pub fn char() -> Self {
        Self::primitive(PrimitiveType::Char)
    }

    pub fn dyn_type() -> Self {
        Self::new(Type::Dyn)
    }

    pub fn invalid() -> Self {
        Self::new(Type::Invalid)
    }

    pub fn generic(name: impl Into<String>) -> Self {
        Self::new(Type::Generic(name.into()))
    }

    pub fn structure(nominal: NominalType) -> Self {
        Self::new(Type::Struct(nominal))
    }

    pub fn interface(nominal: NominalType) -> Self {
        Self::new(Type::Interface(nominal))
    }

    pub fn function(params: Vec<QualType>, ret: Option<QualType>) -> Self {
        Self::new(Type::Function(FunctionSig::new(params, ret)))
    }

    pub fn to_ptr(&self) -> Self {
        Self::new(Type::Ptr(Box::new(self.clone())))
    }

    pub fn to_ref(&self) -> Self {
        Self::new(Type::Ref(Box::new(self.clone())))
    }

    pub fn to_array(&self, size: Option<u32>) -> Self {
        Self::new(Type::Array(Box::new(self.clone()), size))
    }

    pub fn to_const(&self) -> Self {
        let mut out = self.clone();
        out.qualifiers.set_const(true);
        out
    }

    pub fn super_type(&self) -> SuperType {
        match &self.ty {
            Type::Primitive(p) => match p {
                PrimitiveType::Double => SuperType::Double,
                PrimitiveType::Int => SuperType::Int,
                PrimitiveType::Short => SuperType::Short,
                PrimitiveType::Long => SuperType::Long,
                PrimitiveType::Byte => SuperType::Byte,
                PrimitiveType::Char => SuperType::Char,
                PrimitiveType::String => SuperType::String,
                PrimitiveType::Bool => SuperType::Bool,
            },
            Type::Dyn => SuperType::Dyn,
            Type::Invalid => SuperType::Invalid,
            Type::Generic(_) => SuperType::Generic,
            Type::Struct(_) => SuperType::Struct,
            Type::Interface(_) => SuperType::Interface,
            Type::Ptr(_) => SuperType::Ptr,
            Type::Ref(_) => SuperType::Ref,
            Type::Array(..) => SuperType::Array,
            Type::Function(sig) if sig.is_procedure() => SuperType::Procedure,
            Type::Function(_) => SuperType::Function,
        }
    }

    pub fn is(&self, super_type: SuperType) -> bool {
        self.super_type() == super_type
    }

    pub fn is_primitive(&self, primitive: PrimitiveType) -> bool {
        matches!(self.ty, Type::Primitive(p) if p == primitive)
    }

    pub fn is_bool(&self) -> bool {
        self.is_primitive(PrimitiveType::Bool)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.ty, Type::Primitive(p) if p.is_numeric())
    }

    pub fn is_generic(&self) -> bool {
        matches!(self.ty, Type::Generic(_))
    }

    pub fn is_dyn(&self) -> bool {
        matches!(self.ty, Type::Dyn)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.ty, Type::Invalid)
    }

    pub fn is_ref(&self) -> bool {
        matches!(self.ty, Type::Ref(_))
    }

    pub fn is_ptr(&self) -> bool {
        matches!(self.ty, Type::Ptr(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self.ty, Type::Struct(_))
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.ty, Type::Interface(_))
    }

    /// Struct or interface.
    pub fn nominal(&self) -> Option<&NominalType> {
        match &self.ty {
            Type::Struct(n) | Type::Interface(n) => Some(n),
            _ => None,
        }
    }

    pub fn nominal_mut(&mut self) -> Option<&mut NominalType> {
        match &mut self.ty {
            Type::Struct(n) | Type::Interface(n) => Some(n),
            _ => None,
        }
    }

    pub fn function_sig(&self) -> Option<&FunctionSig> {
        match &self.ty {
            Type::Function(sig) => Some(sig),
            _ => None,
        }
    }

    /// Element of a pointer, reference or array.
    pub fn contained(&self) -> Option<&QualType> {
        match &self.ty {
            Type::Ptr(inner) | Type::Ref(inner) | Type::Array(inner, _) => Some(inner),
            _ => None,
        }
    }

    /// Innermost type below all pointer, reference and array wrappers.
    pub fn base(&self) -> &QualType {
        let mut current = self;
        while let Some(inner) = current.contained() {
            current = inner;
        }
        current
    }

    /// Both are pointers, both references, or both arrays.
    pub fn is_same_container_type_as(&self, other: &QualType) -> bool {
        matches!(
            (&self.ty, &other.ty),
            (Type::Ptr(_), Type::Ptr(_)) | (Type::Ref(_), Type::Ref(_)) | (Type::Array(..), Type::Array(..))
        )
    }

    pub fn remove_reference_wrapper(self) -> QualType {
        match self.ty {
            Type::Ref(inner) => *inner,
            _ => self,
        }
    }

    /// Any generic placeholder anywhere in the type tree.
    pub fn has_any_generic_parts(&self) -> bool {
        match &self.ty {
            Type::Generic(_) => true,
            Type::Ptr(inner) | Type::Ref(inner) | Type::Array(inner, _) => inner.has_any_generic_parts(),
            Type::Struct(n) | Type::Interface(n) => n.template_args.iter().any(QualType::has_any_generic_parts),
            Type::Function(sig) => sig.slots().any(QualType::has_any_generic_parts),
            Type::Primitive(_) | Type::Dyn | Type::Invalid => false,
        }
    }

    /// Replace this (generic leaf) type by `replacement`, keeping this level's
    /// qualifiers merged with those of the replacement.
    pub fn replace_base(&self, replacement: &QualType) -> QualType {
        QualType {
            ty: replacement.ty.clone(),
            qualifiers: self.qualifiers.merge(replacement.qualifiers),
        }
    }

    /// Structural comparison followed by a qualifier comparison.
    ///
    /// Array sizes along the wrapper chain are skipped with `ignore_array_size`;
    /// `allow_constify` lets a const `self` accept a non-const `other`.
    pub fn matches(&self, other: &QualType, ignore_array_size: bool, allow_constify: bool) -> bool {
        shape_matches(&self.ty, &other.ty, ignore_array_size)
            && self.qualifiers.matches(other.qualifiers, allow_constify)
    }

    /// Type name without qualifiers, as used in signatures.
    pub fn name(&self) -> String {
        match &self.ty {
            Type::Primitive(p) => p.name().to_string(),
            Type::Dyn => "dyn".to_string(),
            Type::Invalid => "invalid".to_string(),
            Type::Generic(name) => name.clone(),
            Type::Struct(n) | Type::Interface(n) => n.signature(),
            Type::Ptr(inner) => format!("{}*", inner.name()),
            Type::Ref(inner) => format!("{}&", inner.name()),
            Type::Array(inner, Some(size)) => format!("{}[{size}]", inner.name()),
            Type::Array(inner, None) => format!("{}[]", inner.name()),
            Type::Function(sig) => sig.to_string(),
        }
    }
}

fn shape_matches(a: &Type, b: &Type, ignore_array_size: bool) -> bool {
    match (a, b) {
        (Type::Ptr(x), Type::Ptr(y)) | (Type::Ref(x), Type::Ref(y)) => {
            shape_matches(&x.ty, &y.ty, ignore_array_size) && x.qualifiers == y.qualifiers
        }
        (Type::Array(x, size_x), Type::Array(y, size_y)) => {
            (ignore_array_size || size_x == size_y)
                && shape_matches(&x.ty, &y.ty, ignore_array_size)
                && x.qualifiers == y.qualifiers
        }
        _ => a == b,
    }
}

/// Qualifiers a type gets when nothing is specified.
fn default_qualifiers(ty: &Type) -> TypeQualifiers {
    match ty {
        Type::Primitive(p) if p.is_signed_by_default() => TypeQualifiers::SIGNED,
        Type::Generic(_) | Type::Dyn | Type::Invalid => TypeQualifiers::NONE,
        _ => TypeQualifiers::UNSIGNED,
    }
}

impl fmt::Display for QualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.qualifiers.is_const() {
            f.write_str("const ")?;
        }
        if self.qualifiers.is_heap() {
            f.write_str("heap ")?;
        }
        f.write_str(&self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: QualType, b: QualType) -> QualType {
        QualType::structure(NominalType::new("Pair", vec![a, b]))
    }

    #[test]
    fn test_default_signedness_by_super_type() {
        assert!(QualType::int().qualifiers.is_signed());
        assert!(QualType::double().qualifiers.is_signed());
        assert!(QualType::string().qualifiers.is_unsigned());
        assert!(QualType::int().to_ptr().qualifiers.is_unsigned());
        assert!(QualType::generic("T").qualifiers.is_signless());
    }

    #[test]
    fn test_generic_parts_found_through_wrappers_and_args() {
        assert!(QualType::generic("T").to_ptr().has_any_generic_parts());
        assert!(pair(QualType::int(), QualType::generic("U")).has_any_generic_parts());
        assert!(QualType::function(vec![QualType::int()], Some(QualType::generic("R"))).has_any_generic_parts());
        assert!(!pair(QualType::int(), QualType::string()).has_any_generic_parts());
    }

    #[test]
    fn test_names_and_signatures() {
        assert_eq!(pair(QualType::int(), QualType::string()).name(), "Pair<int,string>");
        assert_eq!(QualType::int().to_array(Some(4)).name(), "int[4]");
        assert_eq!(QualType::char().to_ptr().to_ref().name(), "char*&");
        assert_eq!(
            QualType::function(vec![QualType::int()], Some(QualType::int())).name(),
            "(int) -> int"
        );
        assert_eq!(QualType::int().to_const().to_string(), "const int");
    }

    #[test]
    fn test_array_size_ignored_on_request() {
        let a = QualType::int().to_array(Some(3));
        let b = QualType::int().to_array(Some(5));
        assert!(!a.matches(&b, false, false));
        assert!(a.matches(&b, true, false));
    }

    #[test]
    fn test_nominal_equality_ignores_body() {
        let mut a = NominalType::new("Node", vec![]);
        let b = NominalType::new("Node", vec![]);
        a.body = Some(ScopeId::new(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_procedures_and_functions_differ() {
        let f = QualType::function(vec![], Some(QualType::int()));
        let p = QualType::function(vec![], None);
        assert_eq!(f.super_type(), SuperType::Function);
        assert_eq!(p.super_type(), SuperType::Procedure);
    }

    #[test]
    fn test_replace_base_takes_signedness_of_binding() {
        let placeholder = QualType::generic("T").to_const();
        let replaced = placeholder.replace_base(&QualType::long());
        assert!(replaced.qualifiers.is_const());
        assert!(replaced.qualifiers.is_signed());
        assert!(replaced.is_primitive(PrimitiveType::Long));
    }
}
