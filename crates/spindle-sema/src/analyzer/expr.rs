// analyzer/expr.rs
//! Expression checking.

use spindle_frontend::{BinaryExpr, BinaryOp, Expr, ExprKind, FieldAccessExpr, NodeId, PrimitiveType, Span};

use super::{Analyzer, TypeError};
use crate::errors::SemanticError;
use crate::scope::{LifecycleState, SymbolId, SymbolKind};
use crate::types::{QualType, Type};

impl Analyzer<'_> {
    /// Type of `expr`. Every checked expression is recorded by node.
    pub(super) fn check_expr(&mut self, expr: &Expr) -> Result<QualType, TypeError> {
        let ty = match &expr.kind {
            ExprKind::IntLiteral(_) => QualType::int(),
            ExprKind::DoubleLiteral(_) => QualType::double(),
            ExprKind::StringLiteral(_) => QualType::string(),
            ExprKind::BoolLiteral(_) => QualType::bool(),
            ExprKind::CharLiteral(_) => QualType::char(),
            ExprKind::Ident(name) => self.check_ident(name, expr.span)?,
            ExprKind::Binary(binary) => self.check_binary(binary, expr.span)?,
            ExprKind::Call(call) => self.check_call(call, expr.span)?,
            ExprKind::StructLiteral(literal) => self.check_struct_literal(literal, expr.span)?,
            ExprKind::FieldAccess(access) => self.check_field_access(access, expr.span)?,
            ExprKind::Lambda(lambda) => self.check_lambda(expr.id, lambda, expr.span)?,
            ExprKind::Move(source) => self.check_move(source, expr.id, expr.span)?,
        };
        self.expr_types.insert(expr.id, ty.clone());
        Ok(ty)
    }

    fn check_ident(&mut self, name: &str, span: Span) -> Result<QualType, TypeError> {
        let id = self.lookup_symbol(name, span)?;
        self.check_readable(id, span);
        Ok(self.tree.entry(id).map_or_else(QualType::invalid, |e| e.ty.clone()))
    }

    /// Mark `id` as used and report reading it in a state without a value.
    pub(super) fn check_readable(&mut self, id: SymbolId, span: Span) {
        let Some(entry) = self.tree.entry_mut(id) else {
            return;
        };
        entry.used = true;
        if !matches!(entry.kind, SymbolKind::Variable | SymbolKind::Field) {
            return;
        }
        let name = entry.name.clone();
        let state = entry.state();
        let field_scope = entry.field_scope;
        let destroyed_at = entry.lifecycle.last_event_of(LifecycleState::Dead).map(|e| e.span);

        let error = match (state, field_scope) {
            (LifecycleState::Initialized, None) => return,
            (LifecycleState::Initialized, Some(fields)) => {
                let Some(field) = self.tree.are_all_fields_in_state(fields, LifecycleState::Initialized) else {
                    return;
                };
                let Some(field) = self.tree.entry(field) else {
                    return;
                };
                if field.lifecycle.is_dead() {
                    SemanticError::PartiallyMoved {
                        name,
                        field: field.name.clone(),
                        span: span.into(),
                    }
                } else {
                    SemanticError::StructNotConstructed {
                        name,
                        field: field.name.clone(),
                        span: span.into(),
                    }
                }
            }
            (LifecycleState::Declared, Some(fields))
                if self.tree.are_all_fields_in_state(fields, LifecycleState::Declared).is_some() =>
            {
                // Some fields were assigned, others not
                let missing = self
                    .tree
                    .are_all_fields_in_state(fields, LifecycleState::Initialized)
                    .and_then(|f| self.tree.entry(f))
                    .map(|f| f.name.clone())
                    .unwrap_or_default();
                SemanticError::StructNotConstructed {
                    name,
                    field: missing,
                    span: span.into(),
                }
            }
            (LifecycleState::Declared, _) => SemanticError::UninitializedRead {
                name,
                span: span.into(),
            },
            (LifecycleState::Dead, _) => SemanticError::UseAfterDestroy {
                name,
                span: span.into(),
                destroyed_at: destroyed_at.unwrap_or(span).into(),
            },
        };
        self.add_error(error, span);
    }

    fn check_binary(&mut self, binary: &BinaryExpr, span: Span) -> Result<QualType, TypeError> {
        let left = self.check_expr(&binary.left)?;
        let right = self.check_expr(&binary.right)?;
        if left.is_invalid() || right.is_invalid() {
            return Ok(QualType::invalid());
        }
        if left.is_dyn() || right.is_dyn() {
            return Ok(if binary.op.is_comparison() || binary.op.is_logical() {
                QualType::bool()
            } else {
                QualType::dyn_type()
            });
        }

        let same_shape = left.ty == right.ty;
        let result = match binary.op {
            BinaryOp::And | BinaryOp::Or => (left.is_bool() && right.is_bool()).then(QualType::bool),
            BinaryOp::Eq | BinaryOp::Ne => same_shape.then(QualType::bool),
            BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
                (same_shape && left.is_numeric()).then(QualType::bool)
            }
            BinaryOp::Add if same_shape && left.is_primitive(PrimitiveType::String) => Some(QualType::string()),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                (same_shape && left.is_numeric()).then(|| {
                    let mut ty = left.clone();
                    ty.qualifiers.set_const(false);
                    ty
                })
            }
        };
        Ok(result.unwrap_or_else(|| {
            self.add_error(
                SemanticError::InvalidOperands {
                    op: binary.op.symbol().to_string(),
                    left: left.to_string(),
                    right: right.to_string(),
                    span: span.into(),
                },
                span,
            );
            QualType::invalid()
        }))
    }

    fn check_field_access(&mut self, access: &FieldAccessExpr, span: Span) -> Result<QualType, TypeError> {
        // A tracked local is checked field by field
        if let ExprKind::Ident(name) = &access.object.kind {
            let id = self.lookup_symbol(name, access.object.span)?;
            let tracked = self.tree.entry(id).and_then(|e| {
                let fields = e.field_scope?;
                Some((e.ty.clone(), e.state(), fields))
            });
            if let Some((object_ty, state, fields)) = tracked {
                self.expr_types.insert(access.object.id, object_ty.clone());
                if state == LifecycleState::Dead {
                    self.check_readable(id, access.object.span);
                    return Ok(QualType::invalid());
                }
                if let Some(entry) = self.tree.entry_mut(id) {
                    entry.used = true;
                }
                let Some(ty) = self.field_type(&object_ty, &access.field, span) else {
                    return Ok(QualType::invalid());
                };
                if let Some(field) = self.tree.lookup_strict(fields, &access.field) {
                    self.check_field_readable(name, field, span);
                }
                return Ok(ty);
            }
        }
        let object = self.check_expr(&access.object)?;
        if object.is_invalid() || object.is_dyn() {
            return Ok(QualType::invalid());
        }
        Ok(self
            .field_type(&object, &access.field, span)
            .unwrap_or_else(QualType::invalid))
    }

    fn check_field_readable(&mut self, object: &str, field: SymbolId, span: Span) {
        let Some(entry) = self.tree.entry(field) else {
            return;
        };
        let name = format!("{object}.{}", entry.name);
        let error = match entry.state() {
            LifecycleState::Initialized => return,
            LifecycleState::Declared => SemanticError::UninitializedRead {
                name,
                span: span.into(),
            },
            LifecycleState::Dead => SemanticError::UseAfterDestroy {
                name,
                span: span.into(),
                destroyed_at: entry
                    .lifecycle
                    .last_event_of(LifecycleState::Dead)
                    .map_or(span, |e| e.span)
                    .into(),
            },
        };
        self.add_error(error, span);
    }

    /// Type of `field` on a struct value, through one reference or pointer.
    /// `None` once an error has been reported.
    pub(super) fn field_type(&mut self, object: &QualType, field: &str, span: Span) -> Option<QualType> {
        if object.is_invalid() || object.is_dyn() {
            return None;
        }
        let target = match &object.ty {
            Type::Ref(inner) | Type::Ptr(inner) => inner.as_ref(),
            _ => object,
        };
        let Type::Struct(nominal) = &target.ty else {
            self.add_error(
                SemanticError::NotAStruct {
                    found: object.to_string(),
                    span: span.into(),
                },
                span,
            );
            return None;
        };
        let body = nominal
            .body
            .or_else(|| self.structs.lookup_manifestation(&nominal.signature()))?;
        let found = self
            .tree
            .lookup_strict(body, field)
            .and_then(|id| self.tree.entry(id))
            .filter(|e| e.kind == SymbolKind::Field && !e.implicit)
            .map(|e| e.ty.clone());
        if found.is_none() {
            self.add_error(
                SemanticError::UnknownField {
                    struct_name: nominal.signature(),
                    field: field.to_string(),
                    span: span.into(),
                },
                span,
            );
        }
        found
    }

    /// `move x` ends `x`; `move x.f` ends only the tracked field.
    fn check_move(&mut self, source: &Expr, node: NodeId, span: Span) -> Result<QualType, TypeError> {
        let ty = self.check_expr(source)?;
        match &source.kind {
            ExprKind::Ident(name) => {
                let id = self.lookup_symbol(name, source.span)?;
                let movable = self
                    .tree
                    .entry(id)
                    .is_some_and(|e| e.kind == SymbolKind::Variable && e.lifecycle.is_initialized());
                if movable {
                    self.tree.mark_capture_written(self.scope, name);
                    self.destroy_fields(id, node, span)?;
                    self.transition(id, LifecycleState::Dead, node, span)?;
                }
            }
            ExprKind::FieldAccess(access) => {
                if let ExprKind::Ident(name) = &access.object.kind {
                    let id = self.lookup_symbol(name, access.object.span)?;
                    let field = self
                        .tree
                        .entry(id)
                        .and_then(|e| e.field_scope)
                        .and_then(|fields| self.tree.lookup_strict(fields, &access.field));
                    if let Some(field) = field
                        && self.tree.entry(field).is_some_and(|e| e.lifecycle.is_initialized())
                    {
                        self.tree.mark_capture_written(self.scope, name);
                        self.transition(field, LifecycleState::Dead, node, span)?;
                    }
                }
            }
            _ => {}
        }
        Ok(ty)
    }
}
