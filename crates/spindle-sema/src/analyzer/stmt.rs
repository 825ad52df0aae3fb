// analyzer/stmt.rs
//! Statement checking and lifecycle tracking.

use spindle_frontend::{
    AssignStmt, AssignTarget, Block, Decl, DropStmt, FuncDecl, LetStmt, NodeId, ReturnStmt, Span, Stmt,
};

use super::{Analyzer, FunctionContext, PendingBody, TypeError};
use crate::errors::SemanticError;
use crate::ids::{FunctionId, StructId};
use crate::scope::{LifecycleState, ScopeId, ScopeKind, SymbolEntry, SymbolId, SymbolKind};
use crate::structs::{StructBase, StructKind};
use crate::types::{QualType, Type};

impl Analyzer<'_> {
    pub(super) fn check_declarations(&mut self) -> Result<(), TypeError> {
        let program = self.program;
        for decl in &program.declarations {
            if let Decl::Global(global) = decl {
                self.check_global(global)?;
            }
        }

        let structs: Vec<StructId> = self
            .structs
            .iter()
            .filter(|s| s.template_types.is_empty())
            .map(|s| s.id)
            .collect();
        for id in structs {
            self.check_struct_members(id)?;
        }

        let functions: Vec<FunctionId> = self
            .functions
            .iter()
            .filter(|f| !f.is_generic())
            .map(|f| f.id)
            .collect();
        for id in functions {
            let template = self.functions.get(id).clone();
            let Decl::Function(decl) = &program.declarations[template.decl_index] else {
                continue;
            };
            self.check_function(decl, template.template_scope, &template.param_types(), template.ret, None)?;
        }
        Ok(())
    }

    fn check_global(&mut self, decl: &LetStmt) -> Result<(), TypeError> {
        let Some(init) = &decl.init else {
            return Ok(());
        };
        let value = self.check_expr(init)?;
        let global = self.tree.global();
        let Some(id) = self.tree.lookup_strict(global, &decl.name) else {
            return Ok(());
        };
        self.store_value(id, &value, init.span);
        self.initialize_whole(id, decl.id, decl.span)
    }

    pub(super) fn check_function_manifestation(&mut self, function: FunctionId, index: usize) -> Result<(), TypeError> {
        let program = self.program;
        let template = self.functions.get(function);
        let Decl::Function(decl) = &program.declarations[template.decl_index] else {
            return Ok(());
        };
        let manifestation = self.functions.manifestation(index).clone();
        tracing::debug!(signature = %manifestation.signature, "checking function manifestation");
        let ret = manifestation.sig.ret.as_deref().cloned();
        self.check_function(decl, manifestation.body, &manifestation.sig.params, ret, None)
    }

    /// Interface conformance and method bodies of one concrete struct.
    pub(super) fn check_struct_members(&mut self, id: StructId) -> Result<(), TypeError> {
        let base = self.structs.get(id).clone();
        if base.kind == StructKind::Interface {
            return Ok(());
        }
        self.check_conformance(&base);

        let program = self.program;
        let Some(Decl::Struct(decl)) = program.declarations.get(base.decl_index) else {
            return Ok(());
        };
        let this = base.as_type().to_ref();
        for method in &base.methods {
            let Some(func) = method.decl_index.and_then(|i| decl.methods.get(i)) else {
                continue;
            };
            let name = format!("method:{}", method.name);
            let scope = self
                .tree
                .get_or_create_child(base.body, &name, ScopeKind::FunctionBody, func.span);
            let ret = method.sig.ret.as_deref().cloned();
            self.check_function(func, scope, &method.sig.params, ret, Some(this.clone()))?;
        }
        Ok(())
    }

    fn check_conformance(&mut self, base: &StructBase) {
        for interface in &base.interfaces {
            let Some(required) = interface.nominal().and_then(|n| self.structs.for_nominal(n)) else {
                continue;
            };
            let missing: Vec<String> = required
                .methods
                .iter()
                .filter(|m| !base.method(&m.name).is_some_and(|own| own.sig == m.sig))
                .map(|m| m.name.clone())
                .collect();
            for method in missing {
                self.add_error(
                    SemanticError::MissingInterfaceMethod {
                        struct_name: base.signature(),
                        interface: interface.name(),
                        method,
                        span: base.decl_span.into(),
                    },
                    base.decl_span,
                );
            }
        }
    }

    /// Check a function or method body in `body`, which becomes the scope of
    /// its parameters.
    fn check_function(
        &mut self,
        decl: &FuncDecl,
        body: ScopeId,
        params: &[QualType],
        ret: Option<QualType>,
        this: Option<QualType>,
    ) -> Result<(), TypeError> {
        let saved = std::mem::replace(&mut self.scope, body);
        if let Some(this) = this {
            let id = self.declare_symbol(body, "this", SymbolKind::Variable, this, decl.id, decl.span)?;
            self.bind_param(id, decl.id, decl.span, true)?;
        }
        for (param, ty) in decl.params.iter().zip(params) {
            let id = self.declare_symbol(body, &param.name, SymbolKind::Variable, ty.clone(), param.id, param.span)?;
            self.bind_param(id, param.id, param.span, false)?;
        }
        self.function_stack.push(FunctionContext { ret });
        let checked = self.check_stmts(&decl.body.stmts);
        self.function_stack.pop();
        checked?;
        self.end_scope(body, decl.body.id, decl.body.span)?;
        self.scope = saved;
        Ok(())
    }

    pub(super) fn bind_param(&mut self, id: SymbolId, node: NodeId, span: Span, implicit: bool) -> Result<(), TypeError> {
        if let Some(entry) = self.tree.entry_mut(id) {
            entry.is_param = true;
            entry.implicit = implicit;
        }
        self.transition(id, LifecycleState::Initialized, node, span)
    }

    pub(super) fn check_stmts(&mut self, stmts: &[Stmt]) -> Result<(), TypeError> {
        stmts.iter().try_for_each(|stmt| self.check_stmt(stmt))
    }

    fn check_stmt(&mut self, stmt: &Stmt) -> Result<(), TypeError> {
        match stmt {
            Stmt::Let(decl) => self.check_let(decl),
            Stmt::Assign(assign) => self.check_assign(assign),
            Stmt::Expr(expr) => self.check_expr(expr).map(|_| ()),
            Stmt::Return(ret) => self.check_return(ret),
            Stmt::If(stmt) => {
                let condition = self.check_expr(&stmt.condition)?;
                self.expect_condition(&condition, stmt.condition.span);
                self.check_block(&stmt.then_block, ScopeKind::IfBody)?;
                match &stmt.else_block {
                    Some(block) => self.check_block(block, ScopeKind::ElseBody),
                    None => Ok(()),
                }
            }
            Stmt::While(stmt) => {
                let condition = self.check_expr(&stmt.condition)?;
                self.expect_condition(&condition, stmt.condition.span);
                self.check_block(&stmt.body, ScopeKind::WhileBody)
            }
            Stmt::Block(block) => self.check_block(block, ScopeKind::Block),
            Stmt::Drop(drop) => self.check_drop(drop),
        }
    }

    fn expect_condition(&mut self, condition: &QualType, span: Span) {
        if !condition.is_bool() && !condition.is_invalid() && !condition.is_dyn() {
            self.add_error(
                SemanticError::ConditionNotBool {
                    found: condition.to_string(),
                    span: span.into(),
                },
                span,
            );
        }
    }

    fn check_block(&mut self, block: &Block, kind: ScopeKind) -> Result<(), TypeError> {
        let name = format!("{kind:?}#{}", block.id.index());
        let scope = self.tree.get_or_create_child(self.scope, &name, kind, block.span);
        if kind == ScopeKind::WhileBody {
            tracing::trace!(depth = self.tree.loop_nesting_depth(scope), "entering loop body");
        }
        let saved = std::mem::replace(&mut self.scope, scope);
        self.check_stmts(&block.stmts)?;
        self.end_scope(scope, block.id, block.span)?;
        self.scope = saved;
        Ok(())
    }

    /// Destroy the locals of `scope` that still hold a value.
    pub(super) fn end_scope(&mut self, scope: ScopeId, node: NodeId, span: Span) -> Result<(), TypeError> {
        for id in self.tree.vars_going_out_of_scope(scope) {
            self.destroy_fields(id, node, span)?;
            self.transition(id, LifecycleState::Dead, node, span)?;
        }
        Ok(())
    }

    fn check_let(&mut self, decl: &LetStmt) -> Result<(), TypeError> {
        let declared = match &decl.ty {
            Some(texpr) => Some(self.resolve_type_expr(self.scope, texpr)?),
            None => None,
        };
        let value = match &decl.init {
            Some(init) => Some((self.check_expr(init)?, init.span)),
            None => None,
        };
        let ty = match (declared, &value) {
            (Some(declared), Some((value, span))) => {
                if !self.is_assignable(&declared, value) {
                    self.type_mismatch(&declared, value, *span);
                }
                if declared.is_dyn() { copy_of(value) } else { declared }
            }
            (Some(declared), None) => declared,
            (None, Some((value, _))) => copy_of(value),
            (None, None) => QualType::dyn_type(),
        };
        let id = self.declare_symbol(self.scope, &decl.name, SymbolKind::Variable, ty.clone(), decl.id, decl.span)?;
        self.track_fields(id, &ty, decl.id, decl.span)?;
        if value.is_some() {
            self.initialize_whole(id, decl.id, decl.span)?;
        }
        Ok(())
    }

    /// Give a struct-typed local its own field entries, so fields can be
    /// initialized and moved one by one.
    fn track_fields(&mut self, id: SymbolId, ty: &QualType, node: NodeId, span: Span) -> Result<(), TypeError> {
        let Type::Struct(nominal) = &ty.ty else {
            return Ok(());
        };
        let Some(body) = nominal.body else {
            return Ok(());
        };
        let Some(name) = self.tree.entry(id).map(|e| format!("fields:{}#{}", e.name, node.index())) else {
            return Ok(());
        };
        let fields: Vec<(String, QualType, bool)> = self
            .tree
            .scope(body)
            .symbols
            .iter()
            .filter(|e| e.kind == SymbolKind::Field)
            .map(|e| (e.name.clone(), e.ty.clone(), e.implicit))
            .collect();
        let field_scope = self
            .tree
            .get_or_create_child(self.scope, &name, ScopeKind::StructInstance, span);
        for (field, field_ty, implicit) in fields {
            let field_id = self.declare_symbol(field_scope, &field, SymbolKind::Field, field_ty, node, span)?;
            if implicit {
                if let Some(entry) = self.tree.entry_mut(field_id) {
                    entry.implicit = true;
                }
                self.transition(field_id, LifecycleState::Initialized, node, span)?;
            }
        }
        if let Some(entry) = self.tree.entry_mut(id) {
            entry.field_scope = Some(field_scope);
        }
        Ok(())
    }

    fn check_assign(&mut self, assign: &AssignStmt) -> Result<(), TypeError> {
        let value = self.check_expr(&assign.value)?;
        match &assign.target {
            AssignTarget::Variable(name) => {
                let id = self.lookup_symbol(name, assign.span)?;
                let Some(kind) = self.tree.entry(id).map(|e| e.kind) else {
                    return Ok(());
                };
                if kind != SymbolKind::Variable {
                    self.add_error(
                        SemanticError::TypeMismatch {
                            expected: "variable".to_string(),
                            found: value.to_string(),
                            span: assign.span.into(),
                        },
                        assign.span,
                    );
                    return Ok(());
                }
                self.store_value(id, &value, assign.value.span);
                self.tree.mark_capture_written(self.scope, name);
                self.initialize_whole(id, assign.id, assign.span)
            }
            AssignTarget::Field { object, field } => {
                let id = self.lookup_symbol(object, assign.span)?;
                let Some(entry) = self.tree.entry(id) else {
                    return Ok(());
                };
                let (object_ty, state, field_scope) = (entry.ty.clone(), entry.state(), entry.field_scope);
                let Some(field_ty) = self.field_type(&object_ty, field, assign.span) else {
                    return Ok(());
                };
                if !self.is_assignable(&field_ty, &value) {
                    self.type_mismatch(&field_ty, &value, assign.value.span);
                }
                self.tree.mark_capture_written(self.scope, object);
                if state == LifecycleState::Dead {
                    self.add_error(
                        SemanticError::AssignToDead {
                            name: object.clone(),
                            span: assign.span.into(),
                        },
                        assign.span,
                    );
                    return Ok(());
                }
                let Some(field_scope) = field_scope else {
                    return Ok(());
                };
                if let Some(field_id) = self.tree.lookup_strict(field_scope, field) {
                    self.reinitialize(field_id, assign.id, assign.span)?;
                }
                if state == LifecycleState::Declared
                    && self
                        .tree
                        .are_all_fields_in_state(field_scope, LifecycleState::Initialized)
                        .is_none()
                {
                    self.transition(id, LifecycleState::Initialized, assign.id, assign.span)?;
                }
                Ok(())
            }
        }
    }

    /// Type check a store into `id`; a still untyped variable takes the value's type.
    fn store_value(&mut self, id: SymbolId, value: &QualType, span: Span) {
        let Some(target) = self.tree.entry(id).map(|e| e.ty.clone()) else {
            return;
        };
        if target.is_dyn() {
            if let Some(entry) = self.tree.entry_mut(id) {
                entry.update_type(copy_of(value), false);
            }
        } else if !self.is_assignable(&target, value) {
            self.type_mismatch(&target, value, span);
        }
    }

    /// Initialize a variable as a whole, including every tracked field.
    fn initialize_whole(&mut self, id: SymbolId, node: NodeId, span: Span) -> Result<(), TypeError> {
        if let Some(field_scope) = self.tree.entry(id).and_then(|e| e.field_scope) {
            let fields: Vec<SymbolId> = self.field_ids(field_scope);
            for field in fields {
                self.reinitialize(field, node, span)?;
            }
        }
        self.transition(id, LifecycleState::Initialized, node, span)
    }

    /// Initialize an entry; a moved-out field is declared afresh first.
    fn reinitialize(&mut self, id: SymbolId, node: NodeId, span: Span) -> Result<(), TypeError> {
        if self.tree.entry(id).is_some_and(|e| e.lifecycle.is_dead()) {
            self.transition(id, LifecycleState::Declared, node, span)?;
        }
        self.transition(id, LifecycleState::Initialized, node, span)
    }

    fn field_ids(&self, field_scope: ScopeId) -> Vec<SymbolId> {
        self.tree
            .scope(field_scope)
            .symbols
            .iter()
            .filter(|e| e.kind == SymbolKind::Field && !e.implicit)
            .map(SymbolEntry::id)
            .collect()
    }

    /// Destroy the initialized tracked fields of `id`.
    pub(super) fn destroy_fields(&mut self, id: SymbolId, node: NodeId, span: Span) -> Result<(), TypeError> {
        let Some(field_scope) = self.tree.entry(id).and_then(|e| e.field_scope) else {
            return Ok(());
        };
        for field in self.field_ids(field_scope) {
            if self.tree.entry(field).is_some_and(|e| e.lifecycle.is_initialized()) {
                self.transition(field, LifecycleState::Dead, node, span)?;
            }
        }
        Ok(())
    }

    /// Apply a lifecycle transition, reporting a violation against the entry's name.
    pub(super) fn transition(
        &mut self,
        id: SymbolId,
        state: LifecycleState,
        node: NodeId,
        span: Span,
    ) -> Result<(), TypeError> {
        let Some(entry) = self.tree.entry_mut(id) else {
            return Ok(());
        };
        let name = entry.name.clone();
        match entry.update_state(state, node, span) {
            Ok(()) => Ok(()),
            Err(err) => self.report_scope_error(err, &name, span),
        }
    }

    fn check_return(&mut self, ret: &ReturnStmt) -> Result<(), TypeError> {
        let found = match &ret.value {
            Some(value) => Some(self.check_expr(value)?),
            None => None,
        };
        let expected = self.function_stack.last().and_then(|f| f.ret.clone());
        let mismatch = match (&expected, &found) {
            (None, None) => None,
            (Some(expected), Some(found)) => {
                (!self.is_assignable(expected, found)).then(|| (expected.to_string(), found.to_string()))
            }
            (Some(expected), None) => Some((expected.to_string(), "void".to_string())),
            (None, Some(found)) => (!found.is_invalid()).then(|| ("void".to_string(), found.to_string())),
        };
        if let Some((expected, found)) = mismatch {
            self.add_error(
                SemanticError::ReturnTypeMismatch {
                    expected,
                    found,
                    span: ret.span.into(),
                },
                ret.span,
            );
        }
        Ok(())
    }

    fn check_drop(&mut self, drop: &DropStmt) -> Result<(), TypeError> {
        let id = self.lookup_symbol(&drop.name, drop.span)?;
        self.tree.mark_capture_written(self.scope, &drop.name);
        self.destroy_fields(id, drop.id, drop.span)?;
        self.transition(id, LifecycleState::Dead, drop.id, drop.span)
    }

    /// Find `name` from the current scope, recording captures on the way.
    pub(super) fn lookup_symbol(&mut self, name: &str, span: Span) -> Result<SymbolId, TypeError> {
        self.tree.lookup(self.scope, name).ok_or_else(|| {
            self.fail(
                SemanticError::UndeclaredSymbol {
                    name: name.to_string(),
                    span: span.into(),
                },
                span,
            )
        })
    }

    pub(super) fn queue_function(&mut self, function: FunctionId, manifestation: usize) {
        self.pending.push_back(PendingBody::Function {
            function,
            manifestation,
        });
    }
}

/// A stored copy never inherits constness from its source.
fn copy_of(value: &QualType) -> QualType {
    let mut copy = value.clone();
    copy.qualifiers.set_const(false);
    copy
}
