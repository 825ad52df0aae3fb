// structs/mod.rs
//! Struct and interface templates and their manifestations.

mod manager;

pub use manager::{ManifestError, Manifester, StructManager, StructTemplate};

use spindle_frontend::{NodeId, Span};

use crate::ids::StructId;
use crate::scope::ScopeId;
use crate::types::{FunctionSig, GenericType, NominalType, QualType, Type, TypeMapping, signature_of};

/// Name of the compiler-inserted dispatch table field.
pub const VTABLE_FIELD: &str = "__vtable";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructKind {
    Struct,
    Interface,
}

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: QualType,
    pub span: Span,
    /// Inserted by the compiler, not declared in source.
    pub implicit: bool,
}

#[derive(Debug, Clone)]
pub struct MethodDef {
    pub name: String,
    pub sig: FunctionSig,
    pub span: Span,
    /// Position of the method in the struct declaration, if it has a body.
    pub decl_index: Option<usize>,
}

/// Either a template (possibly generic) or one concrete manifestation of it.
#[derive(Debug, Clone)]
pub struct StructBase {
    pub id: StructId,
    pub name: String,
    pub kind: StructKind,
    pub template_types: Vec<GenericType>,
    /// Concrete template arguments of a manifestation; empty for templates.
    pub template_args: Vec<QualType>,
    pub fields: Vec<FieldDef>,
    pub methods: Vec<MethodDef>,
    /// Interfaces a struct declares it implements.
    pub interfaces: Vec<QualType>,
    pub declared_in: ScopeId,
    pub body: ScopeId,
    pub decl_node: NodeId,
    pub decl_span: Span,
    /// Position of the declaration in its program.
    pub decl_index: usize,
    /// Template this manifestation was produced from.
    pub generic_origin: Option<StructId>,
    /// Creation order among the manifestations of one template.
    pub manifestation_index: usize,
    pub mapping: TypeMapping,
}

impl StructBase {
    /// `Name<A,B>` for manifestations, `Name` otherwise.
    pub fn signature(&self) -> String {
        signature_of(&self.name, &self.template_args)
    }

    /// Generic template that is never used directly.
    pub fn is_generic_template(&self) -> bool {
        !self.template_types.is_empty() && self.generic_origin.is_none()
    }

    /// The type of values of this struct or interface.
    pub fn as_type(&self) -> QualType {
        let args = if self.is_generic_template() {
            self.template_types.iter().map(GenericType::placeholder).collect()
        } else {
            self.template_args.clone()
        };
        let nominal = NominalType {
            name: self.name.clone(),
            template_args: args,
            scope: Some(self.declared_in),
            body: Some(self.body),
        };
        match self.kind {
            StructKind::Struct => QualType::new(Type::Struct(nominal)),
            StructKind::Interface => QualType::new(Type::Interface(nominal)),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn method(&self, name: &str) -> Option<&MethodDef> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Whether this struct declares it implements `interface`.
    pub fn implements(&self, interface: &NominalType) -> bool {
        self.interfaces.iter().any(|i| i.nominal() == Some(interface))
    }
}
