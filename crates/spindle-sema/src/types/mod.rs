// types/mod.rs
//! Qualified types, qualifiers and generic placeholders.

mod generic;
mod qual_type;
mod qualifiers;

pub use generic::{GenericResolver, GenericType, TypeMapping};
pub use qual_type::{FunctionSig, NominalType, QualType, SuperType, Type, signature_of};
pub use qualifiers::TypeQualifiers;
pub use spindle_frontend::PrimitiveType;
