// scope/mod.rs
//! Scope tree for one compilation unit.
//!
//! Scopes live in an arena owned by [`ScopeTree`] and refer to each other by
//! [`ScopeId`]. A child keeps a handle to its parent; the parent owns the
//! named child handles. Symbol entries stay in the scope that declared them.

mod capture;
mod lifecycle;
mod symbol_table;

pub use capture::{Capture, CaptureAccess, CaptureMode};
pub use lifecycle::{Lifecycle, LifecycleError, LifecycleEvent, LifecycleState};
pub use symbol_table::{ScopeError, SymbolEntry, SymbolId, SymbolKind, SymbolTable};

pub use crate::ids::ScopeId;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use spindle_frontend::{LambdaKind, NodeId, Span};

use crate::ids::{FunctionId, StructId};
use crate::types::{GenericType, QualType, TypeMapping};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    FunctionBody,
    Struct,
    Interface,
    IfBody,
    ElseBody,
    WhileBody,
    Block,
    Closure,
    Thread,
    /// Field entries of one struct-typed local.
    StructInstance,
}

/// What a type name resolves to from some scope.
#[derive(Debug, Clone)]
pub enum TypeName<'a> {
    /// Generic name bound by an enclosing manifestation.
    Mapped(&'a QualType),
    Generic(&'a GenericType),
    Struct {
        id: StructId,
        declared_in: ScopeId,
    },
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub name: String,
    pub parent: Option<ScopeId>,
    pub span: Span,
    pub symbols: SymbolTable,
    /// Generic declarations (templates) and the bodies nested in them are
    /// never fully concrete.
    pub generic_template: bool,
    children: FxHashMap<String, ScopeId>,
    generic_types: FxHashMap<String, GenericType>,
    type_mapping: TypeMapping,
    structs: FxHashMap<String, StructId>,
    functions: FxHashMap<String, Vec<FunctionId>>,
    capture_kind: Option<LambdaKind>,
    captures: Vec<Capture>,
}

impl Scope {
    fn new(kind: ScopeKind, name: String, parent: Option<ScopeId>, span: Span) -> Self {
        Self {
            kind,
            name,
            parent,
            span,
            symbols: SymbolTable::default(),
            generic_template: false,
            children: FxHashMap::default(),
            generic_types: FxHashMap::default(),
            type_mapping: TypeMapping::default(),
            structs: FxHashMap::default(),
            functions: FxHashMap::default(),
            capture_kind: None,
            captures: Vec::new(),
        }
    }

    pub fn captures(&self) -> &[Capture] {
        &self.captures
    }

    pub fn capture_kind(&self) -> Option<LambdaKind> {
        self.capture_kind
    }

    pub fn type_mapping(&self) -> &TypeMapping {
        &self.type_mapping
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, ScopeId)> {
        self.children.iter().map(|(name, &id)| (name.as_str(), id))
    }
}

#[derive(Debug, Clone)]
pub struct ScopeTree {
    scopes: Vec<Scope>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// A tree holding only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::new(ScopeKind::Global, "global".to_string(), None, Span::default())],
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId::new(0)
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.slot()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.slot()]
    }

    pub fn parent(&self, id: ScopeId) -> Option<ScopeId> {
        self.scope(id).parent
    }

    /// `id` followed by each enclosing scope up to the root.
    pub fn ancestors(&self, id: ScopeId) -> impl Iterator<Item = ScopeId> + '_ {
        std::iter::successors(Some(id), move |&s| self.parent(s))
    }

    pub fn child(&self, parent: ScopeId, name: &str) -> Option<ScopeId> {
        self.scope(parent).children.get(name).copied()
    }

    /// Child scope named `name`, created on first request.
    pub fn get_or_create_child(&mut self, parent: ScopeId, name: &str, kind: ScopeKind, span: Span) -> ScopeId {
        if let Some(existing) = self.child(parent, name) {
            return existing;
        }
        let id = ScopeId::new(self.scopes.len() as u32);
        let mut scope = Scope::new(kind, name.to_string(), Some(parent), span);
        scope.generic_template = self.scope(parent).generic_template;
        self.scopes.push(scope);
        self.scope_mut(parent).children.insert(name.to_string(), id);
        tracing::trace!(%parent, child = %id, name, ?kind, "scope created");
        id
    }

    /// Mark a scope (and everything created below it later) as generic.
    pub fn mark_generic_template(&mut self, id: ScopeId) {
        self.scope_mut(id).generic_template = true;
    }

    /// Lambda bodies record captures of outer symbols.
    pub fn set_capturing(&mut self, id: ScopeId, kind: LambdaKind) {
        self.scope_mut(id).capture_kind = Some(kind);
    }

    // ===== symbols =====

    /// Declare `name` in `scope`. Fails if `scope` already has an entry with that name.
    pub fn insert(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: SymbolKind,
        ty: QualType,
        node: NodeId,
        span: Span,
    ) -> Result<SymbolId, ScopeError> {
        let is_global = scope == self.global();
        let id = self.scope_mut(scope).symbols.insert(scope, name, kind, ty, node, span)?;
        if let Some(entry) = self.entry_mut(id) {
            entry.is_global = is_global;
        }
        Ok(id)
    }

    pub fn entry(&self, id: SymbolId) -> Option<&SymbolEntry> {
        self.scopes.get(id.scope.slot())?.symbols.get(id.index as usize)
    }

    pub fn entry_mut(&mut self, id: SymbolId) -> Option<&mut SymbolEntry> {
        self.scopes.get_mut(id.scope.slot())?.symbols.get_mut(id.index as usize)
    }

    /// Find `name` in `scope` or any enclosing scope.
    ///
    /// Every capturing scope passed on the way to the declaration records a
    /// read-only capture, unless the entry is a function, a type name or a
    /// variable of function type.
    pub fn lookup(&mut self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut crossed: SmallVec<[ScopeId; 4]> = SmallVec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope(id);
            if let Some(entry) = s.symbols.lookup(name) {
                let symbol = entry.id();
                let capturable = !matches!(entry.kind, SymbolKind::Function | SymbolKind::TypeName)
                    && entry.ty.function_sig().is_none();
                if capturable && !crossed.is_empty() {
                    let ty = entry.ty.clone();
                    for closure in crossed {
                        let captures = &mut self.scope_mut(closure).captures;
                        match captures.iter_mut().find(|c| c.name == name) {
                            Some(capture) => {
                                capture.refresh_mode(&ty);
                            }
                            None => {
                                tracing::trace!(name, scope = %closure, "capture recorded");
                                captures.push(Capture::new(name, symbol, &ty));
                            }
                        }
                    }
                }
                return Some(symbol);
            }
            if s.capture_kind.is_some() {
                crossed.push(id);
            }
            current = s.parent;
        }
        None
    }

    /// Like [`lookup`](Self::lookup) but without recording captures.
    pub fn peek(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.ancestors(scope)
            .find_map(|id| self.scope(id).symbols.lookup(name).map(SymbolEntry::id))
    }

    /// Find `name` in `scope` only.
    pub fn lookup_strict(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scope(scope).symbols.lookup(name).map(SymbolEntry::id)
    }

    /// Promote the capture of `name` in every capturing scope between `scope`
    /// and the declaration. Returns whether any capture changed.
    pub fn mark_capture_written(&mut self, scope: ScopeId, name: &str) -> bool {
        let mut changed = false;
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.scope_mut(id);
            if s.symbols.lookup(name).is_some() {
                break;
            }
            if let Some(capture) = s.captures.iter_mut().find(|c| c.name == name)
                && capture.mark_written()
            {
                tracing::debug!(name, scope = %id, "capture promoted to read-write");
                changed = true;
            }
            current = s.parent;
        }
        changed
    }

    pub fn captures(&self, scope: ScopeId) -> &[Capture] {
        &self.scope(scope).captures
    }

    /// Re-derive capture modes of `scope` from the current types of the
    /// captured entries. Returns whether any capture changed.
    pub fn refresh_capture_modes(&mut self, scope: ScopeId) -> bool {
        let types: Vec<Option<QualType>> = self
            .scope(scope)
            .captures
            .iter()
            .map(|c| self.entry(c.symbol).map(|e| e.ty.clone()))
            .collect();
        let mut changed = false;
        for (capture, ty) in self.scope_mut(scope).captures.iter_mut().zip(types) {
            if let Some(ty) = ty
                && capture.refresh_mode(&ty)
            {
                tracing::trace!(name = %capture.name, %scope, "capture mode refreshed");
                changed = true;
            }
        }
        changed
    }

    // ===== generic types and templates =====

    pub fn insert_generic_type(&mut self, scope: ScopeId, generic: GenericType) {
        self.scope_mut(scope).generic_types.insert(generic.name.clone(), generic);
    }

    pub fn lookup_generic_type(&self, scope: ScopeId, name: &str) -> Option<&GenericType> {
        self.ancestors(scope)
            .find_map(|id| self.scope(id).generic_types.get(name))
    }

    /// Bind generic names to concrete types for everything resolved inside `scope`.
    pub fn set_type_mapping(&mut self, scope: ScopeId, mapping: TypeMapping) {
        self.scope_mut(scope).type_mapping = mapping;
    }

    pub fn register_struct(&mut self, scope: ScopeId, name: &str, id: StructId) {
        self.scope_mut(scope).structs.insert(name.to_string(), id);
    }

    /// Template registered under `name` directly in `scope`.
    pub fn struct_in(&self, scope: ScopeId, name: &str) -> Option<StructId> {
        self.scope(scope).structs.get(name).copied()
    }

    pub fn register_function(&mut self, scope: ScopeId, name: &str, id: FunctionId) {
        self.scope_mut(scope)
            .functions
            .entry(name.to_string())
            .or_default()
            .push(id);
    }

    /// Overload set from the innermost scope declaring `name`.
    pub fn lookup_functions(&self, scope: ScopeId, name: &str) -> &[FunctionId] {
        self.ancestors(scope)
            .find_map(|id| self.scope(id).functions.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Resolve a type name from `scope`. In each scope a manifestation binding
    /// wins over a generic declaration, which wins over a struct template.
    pub fn resolve_type_name(&self, scope: ScopeId, name: &str) -> Option<TypeName<'_>> {
        self.ancestors(scope).find_map(|id| {
            let s = self.scope(id);
            if let Some(mapped) = s.type_mapping.get(name) {
                Some(TypeName::Mapped(mapped))
            } else if let Some(generic) = s.generic_types.get(name) {
                Some(TypeName::Generic(generic))
            } else {
                s.structs.get(name).map(|&struct_id| TypeName::Struct {
                    id: struct_id,
                    declared_in: id,
                })
            }
        })
    }

    // ===== queries over entries =====

    /// Initialized locals of `scope` that are destroyed when it ends.
    pub fn vars_going_out_of_scope(&self, scope: ScopeId) -> Vec<SymbolId> {
        self.scope(scope)
            .symbols
            .iter()
            .filter(|e| e.kind == SymbolKind::Variable && !e.is_param && e.lifecycle.is_initialized())
            .map(SymbolEntry::id)
            .collect()
    }

    /// Number of loops enclosing `scope` within its function or lambda.
    pub fn loop_nesting_depth(&self, scope: ScopeId) -> usize {
        self.ancestors(scope)
            .map(|id| self.scope(id).kind)
            .take_while(|kind| {
                !matches!(
                    kind,
                    ScopeKind::FunctionBody | ScopeKind::Closure | ScopeKind::Thread | ScopeKind::Global
                )
            })
            .filter(|kind| *kind == ScopeKind::WhileBody)
            .count()
    }

    /// Source-declared fields in `scope`.
    pub fn field_count(&self, scope: ScopeId) -> usize {
        self.scope(scope)
            .symbols
            .iter()
            .filter(|e| e.kind == SymbolKind::Field && !e.implicit)
            .count()
    }

    /// First field (by order index) of `scope` not in `state`. Compiler-implicit
    /// fields are skipped.
    pub fn are_all_fields_in_state(&self, scope: ScopeId, state: LifecycleState) -> Option<SymbolId> {
        self.scope(scope)
            .symbols
            .iter()
            .filter(|e| e.kind == SymbolKind::Field && !e.implicit)
            .find(|e| e.state() != state)
            .map(SymbolEntry::id)
    }

    fn concrete_scopes(&self) -> impl Iterator<Item = &Scope> {
        self.scopes.iter().filter(|s| !s.generic_template)
    }

    /// Variables and fields outside generic templates whose type is still
    /// `dyn` or generic.
    pub fn find_untyped_symbols(&self) -> Vec<SymbolId> {
        self.concrete_scopes()
            .flat_map(|s| s.symbols.iter())
            .filter(|e| matches!(e.kind, SymbolKind::Variable | SymbolKind::Field))
            .filter(|e| !e.implicit && (e.ty.is_dyn() || e.ty.has_any_generic_parts()))
            .map(SymbolEntry::id)
            .collect()
    }

    /// Local variables that were never read. Parameters and names starting
    /// with `_` are exempt.
    pub fn collect_unused(&self) -> Vec<SymbolId> {
        self.concrete_scopes()
            .flat_map(|s| s.symbols.iter())
            .filter(|e| {
                e.kind == SymbolKind::Variable
                    && !e.used
                    && !e.is_global
                    && !e.is_param
                    && !e.implicit
                    && !e.name.starts_with('_')
            })
            .map(SymbolEntry::id)
            .collect()
    }
}

#[cfg(test)]
mod tests;
