// scope/symbol_table.rs
//! Per-scope symbol storage with stable declaration order.

use rustc_hash::FxHashMap;
use spindle_frontend::{NodeId, Span};
use thiserror::Error;

use super::{Lifecycle, LifecycleError, LifecycleState, ScopeId};
use crate::types::QualType;

/// Handle to an entry: owning scope plus order index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId {
    pub scope: ScopeId,
    pub index: u32,
}

impl SymbolId {
    pub fn new(scope: ScopeId, index: usize) -> Self {
        Self {
            scope,
            index: index as u32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Variable,
    Field,
    Function,
    /// Name of a struct or interface.
    TypeName,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScopeError {
    #[error("'{0}' is already declared in this scope")]
    DuplicateSymbol(String),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("constant is already initialized")]
    ReassignConst,
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: QualType,
    pub scope: ScopeId,
    /// Position in declaration order within the owning scope.
    pub order_index: usize,
    pub is_global: bool,
    pub is_param: bool,
    /// Inserted by the compiler rather than declared in source.
    pub implicit: bool,
    pub used: bool,
    pub decl_node: NodeId,
    pub decl_span: Span,
    pub lifecycle: Lifecycle,
    /// Per-variable field tracking for struct-typed locals.
    pub field_scope: Option<ScopeId>,
}

impl SymbolEntry {
    pub fn id(&self) -> SymbolId {
        SymbolId::new(self.scope, self.order_index)
    }

    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Replace the type. Without `overwrite` only placeholder types (dyn,
    /// invalid) are replaced.
    pub fn update_type(&mut self, ty: QualType, overwrite: bool) {
        if overwrite || self.ty.is_dyn() || self.ty.is_invalid() {
            self.ty = ty;
        }
    }

    /// Move the lifecycle to `state`, recording the causing node.
    pub fn update_state(&mut self, state: LifecycleState, node: NodeId, span: Span) -> Result<(), ScopeError> {
        if state == LifecycleState::Initialized
            && self.lifecycle.is_initialized()
            && self.ty.qualifiers.is_const()
        {
            return Err(ScopeError::ReassignConst);
        }
        self.lifecycle.transition(state, node, span)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    by_name: FxHashMap<String, usize>,
}

impl SymbolTable {
    /// Insert a fresh entry in DECLARED state. Names are unique per table.
    pub fn insert(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: SymbolKind,
        ty: QualType,
        node: NodeId,
        span: Span,
    ) -> Result<SymbolId, ScopeError> {
        if self.by_name.contains_key(name) {
            return Err(ScopeError::DuplicateSymbol(name.to_string()));
        }
        let order_index = self.entries.len();
        let mut lifecycle = Lifecycle::new();
        lifecycle.declare(node, span)?;
        self.entries.push(SymbolEntry {
            name: name.to_string(),
            kind,
            ty,
            scope,
            order_index,
            is_global: false,
            is_param: false,
            implicit: false,
            used: false,
            decl_node: node,
            decl_span: span,
            lifecycle,
            field_scope: None,
        });
        self.by_name.insert(name.to_string(), order_index);
        Ok(SymbolId::new(scope, order_index))
    }

    pub fn lookup(&self, name: &str) -> Option<&SymbolEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut SymbolEntry> {
        let index = *self.by_name.get(name)?;
        self.entries.get_mut(index)
    }

    pub fn get(&self, index: usize) -> Option<&SymbolEntry> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut SymbolEntry> {
        self.entries.get_mut(index)
    }

    /// Entries in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut SymbolEntry> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
