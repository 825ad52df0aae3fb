// types/generic.rs
//! Generic type placeholders and their conditions.

use rustc_hash::FxHashMap;

use super::{NominalType, QualType, Type};

/// Binding of generic placeholder names to concrete types.
pub type TypeMapping = FxHashMap<String, QualType>;

/// A declared template type such as `T` or `T: int | long`.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericType {
    pub name: String,
    /// Accepted types. Never empty; `[dyn]` accepts everything.
    pub conditions: Vec<QualType>,
}

impl GenericType {
    /// Unconstrained generic type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            conditions: vec![QualType::dyn_type()],
        }
    }

    /// Generic type restricted to `conditions`. An empty list means unconstrained.
    pub fn with_conditions(name: impl Into<String>, conditions: Vec<QualType>) -> Self {
        if conditions.is_empty() {
            return Self::new(name);
        }
        Self {
            name: name.into(),
            conditions,
        }
    }

    /// The placeholder type standing for this generic.
    pub fn placeholder(&self) -> QualType {
        QualType::generic(self.name.clone())
    }

    pub fn is_unconstrained(&self) -> bool {
        self.conditions.iter().any(QualType::is_dyn)
    }

    /// Does `ty` satisfy at least one condition?
    ///
    /// Qualifiers are only compared when `strict` is set. Interface conditions
    /// also accept structs implementing them.
    pub fn check_conditions_of<R: GenericResolver + ?Sized>(
        &self,
        ty: &QualType,
        strict: bool,
        resolver: &R,
    ) -> bool {
        if self.is_unconstrained() {
            return true;
        }
        self.conditions.iter().any(|condition| {
            let shape_ok = if strict {
                condition.matches(ty, true, true)
            } else {
                let mut relaxed = ty.clone();
                relaxed.qualifiers = condition.qualifiers;
                condition.matches(&relaxed, true, false)
            };
            shape_ok
                || matches!(
                    (&condition.ty, &ty.ty),
                    (Type::Interface(iface), Type::Struct(st)) if resolver.struct_implements(st, iface)
                )
        })
    }
}

/// Supplies generic type declarations visible at a match site.
pub trait GenericResolver {
    /// Declaration of the generic type named `name`.
    fn lookup(&self, name: &str) -> Option<&GenericType>;

    /// Whether the struct `structure` declares it implements `interface`.
    fn struct_implements(&self, _structure: &NominalType, _interface: &NominalType) -> bool {
        false
    }
}

impl GenericResolver for [GenericType] {
    fn lookup(&self, name: &str) -> Option<&GenericType> {
        self.iter().find(|g| g.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_conditions_mean_any() {
        let t = GenericType::with_conditions("T", vec![]);
        assert!(t.is_unconstrained());
        let resolver: &[GenericType] = &[];
        assert!(t.check_conditions_of(&QualType::string().to_ptr(), true, resolver));
    }

    #[test]
    fn test_listed_conditions_restrict() {
        let t = GenericType::with_conditions("T", vec![QualType::int(), QualType::long()]);
        let resolver: &[GenericType] = &[];
        assert!(t.check_conditions_of(&QualType::long(), true, resolver));
        assert!(!t.check_conditions_of(&QualType::string(), false, resolver));
    }

    #[test]
    fn test_non_strict_conditions_ignore_constness() {
        let t = GenericType::with_conditions("T", vec![QualType::int()]);
        let resolver: &[GenericType] = &[];
        assert!(t.check_conditions_of(&QualType::int().to_const(), false, resolver));
        assert!(!t.check_conditions_of(&QualType::int().to_const(), true, resolver));
    }

    #[test]
    fn test_slice_resolver_finds_by_name() {
        let decls = vec![GenericType::new("K"), GenericType::new("V")];
        assert_eq!(decls.as_slice().lookup("V").map(|g| g.name.as_str()), Some("V"));
        assert!(decls.as_slice().lookup("X").is_none());
    }
}
