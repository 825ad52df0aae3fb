// types/qualifiers.rs
//! Qualifier bit set attached to every [`QualType`](super::QualType).

use std::hash::{Hash, Hasher};

use spindle_frontend::Specifier;

const CONST: u8 = 1 << 0;
const SIGNED: u8 = 1 << 1;
const UNSIGNED: u8 = 1 << 2;
const HEAP: u8 = 1 << 3;
const PUBLIC: u8 = 1 << 4;
const INLINE: u8 = 1 << 5;
const COMPOSITION: u8 = 1 << 6;

/// Bits that take part in type equality.
const COMPARED: u8 = CONST | SIGNED | UNSIGNED | HEAP;

/// Set of type qualifiers.
///
/// `signed` and `unsigned` are mutually exclusive. A generic placeholder has
/// neither; once it is substituted it takes the signedness of its binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeQualifiers {
    bits: u8,
}

impl TypeQualifiers {
    pub const NONE: TypeQualifiers = TypeQualifiers { bits: 0 };
    pub const SIGNED: TypeQualifiers = TypeQualifiers { bits: SIGNED };
    pub const UNSIGNED: TypeQualifiers = TypeQualifiers { bits: UNSIGNED };
    pub const CONST: TypeQualifiers = TypeQualifiers { bits: CONST };

    pub fn is_const(self) -> bool {
        self.bits & CONST != 0
    }

    pub fn is_signed(self) -> bool {
        self.bits & SIGNED != 0
    }

    pub fn is_unsigned(self) -> bool {
        self.bits & UNSIGNED != 0
    }

    pub fn is_heap(self) -> bool {
        self.bits & HEAP != 0
    }

    pub fn is_public(self) -> bool {
        self.bits & PUBLIC != 0
    }

    pub fn is_inline(self) -> bool {
        self.bits & INLINE != 0
    }

    pub fn is_composition(self) -> bool {
        self.bits & COMPOSITION != 0
    }

    /// Neither signed nor unsigned: the generic placeholder state.
    pub fn is_signless(self) -> bool {
        self.bits & (SIGNED | UNSIGNED) == 0
    }

    fn set(&mut self, bit: u8, on: bool) {
        if on {
            self.bits |= bit;
        } else {
            self.bits &= !bit;
        }
    }

    pub fn set_const(&mut self, on: bool) {
        self.set(CONST, on);
    }

    pub fn set_signed(&mut self, on: bool) {
        self.set(SIGNED, on);
        if on {
            self.bits &= !UNSIGNED;
        }
    }

    pub fn set_unsigned(&mut self, on: bool) {
        self.set(UNSIGNED, on);
        if on {
            self.bits &= !SIGNED;
        }
    }

    pub fn set_heap(&mut self, on: bool) {
        self.set(HEAP, on);
    }

    pub fn with_const(mut self) -> Self {
        self.set_const(true);
        self
    }

    /// Apply a declaration-site specifier.
    pub fn apply(&mut self, specifier: Specifier) {
        match specifier {
            Specifier::Const => self.set_const(true),
            Specifier::Signed => self.set_signed(true),
            Specifier::Unsigned => self.set_unsigned(true),
            Specifier::Heap => self.set_heap(true),
            Specifier::Public => self.set(PUBLIC, true),
            Specifier::Inline => self.set(INLINE, true),
            Specifier::Compose => self.set(COMPOSITION, true),
        }
    }

    /// Union of both sets. Signedness comes from `other` only if `self` is signless.
    pub fn merge(self, other: TypeQualifiers) -> TypeQualifiers {
        let sign_source = if self.is_signless() { other } else { self };
        let others = (self.bits | other.bits) & !(SIGNED | UNSIGNED);
        TypeQualifiers {
            bits: others | (sign_source.bits & (SIGNED | UNSIGNED)),
        }
    }

    /// Clear every bit set in `mask`. Clearing `signed` sets `unsigned` and vice versa.
    pub fn erase_with_mask(&mut self, mask: TypeQualifiers) {
        self.bits &= !mask.bits;
        if mask.is_signed() {
            self.bits |= UNSIGNED;
        }
        if mask.is_unsigned() {
            self.bits |= SIGNED;
        }
    }

    /// Equality, except that a const `self` also accepts a non-const `other`
    /// when `allow_constify` is set.
    pub fn matches(self, other: TypeQualifiers, allow_constify: bool) -> bool {
        let mut other = other;
        if allow_constify && self.is_const() {
            other.set_const(true);
        }
        self == other
    }
}

impl PartialEq for TypeQualifiers {
    fn eq(&self, other: &Self) -> bool {
        self.bits & COMPARED == other.bits & COMPARED
    }
}

impl Eq for TypeQualifiers {}

impl Hash for TypeQualifiers {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.bits & COMPARED).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_and_unsigned_are_exclusive() {
        let mut q = TypeQualifiers::SIGNED;
        q.set_unsigned(true);
        assert!(q.is_unsigned());
        assert!(!q.is_signed());
    }

    #[test]
    fn test_merge_keeps_known_signedness() {
        let known = TypeQualifiers::SIGNED;
        let merged = known.merge(TypeQualifiers::UNSIGNED.with_const());
        assert!(merged.is_signed());
        assert!(merged.is_const());
    }

    #[test]
    fn test_merge_into_signless_takes_other_signedness() {
        let placeholder = TypeQualifiers::CONST;
        let merged = placeholder.merge(TypeQualifiers::UNSIGNED);
        assert!(merged.is_unsigned());
        assert!(merged.is_const());
    }

    #[test]
    fn test_erase_with_mask_flips_signedness() {
        let mut q = TypeQualifiers::SIGNED.with_const();
        q.erase_with_mask(TypeQualifiers::CONST);
        assert!(!q.is_const());
        assert!(q.is_signed());

        let mut q = TypeQualifiers::SIGNED;
        q.erase_with_mask(TypeQualifiers::SIGNED);
        assert!(q.is_unsigned());
    }

    #[test]
    fn test_constify_only_relaxes_towards_const() {
        let c = TypeQualifiers::SIGNED.with_const();
        let m = TypeQualifiers::SIGNED;
        assert!(c.matches(m, true));
        assert!(!c.matches(m, false));
        assert!(!m.matches(c, true));
    }

    #[test]
    fn test_equality_ignores_visibility_bits() {
        let mut a = TypeQualifiers::SIGNED;
        a.apply(Specifier::Public);
        a.apply(Specifier::Inline);
        assert_eq!(a, TypeQualifiers::SIGNED);
    }
}
