// scope/capture.rs
//! Outer-scope symbols captured by closure and thread bodies.

use super::SymbolId;
use crate::types::QualType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureAccess {
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureMode {
    ByValue,
    ByReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    pub name: String,
    /// Captured entry in its declaring scope.
    pub symbol: SymbolId,
    pub access: CaptureAccess,
    pub mode: CaptureMode,
}

impl Capture {
    /// First read of an outer symbol. Struct and interface values are
    /// captured by reference, everything else by value.
    pub fn new(name: impl Into<String>, symbol: SymbolId, ty: &QualType) -> Self {
        Self {
            name: name.into(),
            symbol,
            access: CaptureAccess::ReadOnly,
            mode: mode_for(ty),
        }
    }

    /// Re-derive the mode from the symbol's current type. A by-reference
    /// capture never goes back to by-value.
    pub fn refresh_mode(&mut self, ty: &QualType) -> bool {
        if self.mode == CaptureMode::ByValue && mode_for(ty) == CaptureMode::ByReference {
            self.mode = CaptureMode::ByReference;
            return true;
        }
        false
    }

    /// Record a write. Promotion is one-way; returns whether anything changed.
    pub fn mark_written(&mut self) -> bool {
        let changed = self.access != CaptureAccess::ReadWrite || self.mode != CaptureMode::ByReference;
        self.access = CaptureAccess::ReadWrite;
        self.mode = CaptureMode::ByReference;
        changed
    }

    pub fn is_mutated(&self) -> bool {
        self.access == CaptureAccess::ReadWrite
    }
}

fn mode_for(ty: &QualType) -> CaptureMode {
    if ty.is_struct() || ty.is_interface() {
        CaptureMode::ByReference
    } else {
        CaptureMode::ByValue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeId;
    use crate::types::NominalType;

    fn symbol() -> SymbolId {
        SymbolId::new(ScopeId::new(0), 0)
    }

    #[test]
    fn test_scalars_default_to_by_value() {
        let c = Capture::new("n", symbol(), &QualType::int());
        assert_eq!(c.mode, CaptureMode::ByValue);
        assert_eq!(c.access, CaptureAccess::ReadOnly);
    }

    #[test]
    fn test_structs_default_to_by_reference() {
        let ty = QualType::structure(NominalType::new("Vec3", vec![]));
        let c = Capture::new("v", symbol(), &ty);
        assert_eq!(c.mode, CaptureMode::ByReference);
        assert!(!c.is_mutated());
    }

    #[test]
    fn test_write_promotes_once() {
        let mut c = Capture::new("n", symbol(), &QualType::int());
        assert!(c.mark_written());
        assert!(!c.mark_written());
        assert_eq!(c.access, CaptureAccess::ReadWrite);
        assert_eq!(c.mode, CaptureMode::ByReference);
    }

    #[test]
    fn test_refresh_follows_resolved_type_one_way() {
        let mut c = Capture::new("v", symbol(), &QualType::dyn_type());
        assert_eq!(c.mode, CaptureMode::ByValue);
        assert!(!c.refresh_mode(&QualType::int()));
        let ty = QualType::structure(NominalType::new("Vec3", vec![]));
        assert!(c.refresh_mode(&ty));
        assert_eq!(c.mode, CaptureMode::ByReference);
        assert!(!c.refresh_mode(&QualType::int()));
        assert_eq!(c.mode, CaptureMode::ByReference);
    }
}
