// ast_builder.rs
//! Programmatic construction of syntax trees.
//!
//! The builder hands out fresh [`NodeId`]s and synthetic spans. Every node is
//! placed at the current cursor, which advances one column per node; use
//! [`AstBuilder::at`] to pin the next node to a specific line and column.

use std::cell::Cell;

use crate::ast::*;
use crate::Span;

/// Offset stride per line when fabricating byte offsets.
const LINE_STRIDE: usize = 1024;

pub struct AstBuilder {
    file: String,
    next_id: Cell<u32>,
    line: Cell<u32>,
    column: Cell<u32>,
}

impl AstBuilder {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            next_id: Cell::new(0),
            line: Cell::new(1),
            column: Cell::new(1),
        }
    }

    /// Move the cursor. The next node created is located at `line:column`.
    pub fn at(&self, line: u32, column: u32) -> &Self {
        self.line.set(line);
        self.column.set(column);
        self
    }

    fn id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        NodeId::new(id)
    }

    fn span(&self) -> Span {
        let line = self.line.get();
        let column = self.column.get();
        self.column.set(column + 1);
        let start = line as usize * LINE_STRIDE + column as usize;
        Span::new(start, start + 1, line, column)
    }

    /// Finish the tree for this file.
    pub fn finish(self, declarations: Vec<Decl>) -> Program {
        Program {
            file: self.file,
            declarations,
            next_node_id: self.next_id.get(),
        }
    }

    // ===== types =====

    fn type_expr(&self, kind: TypeExprKind) -> TypeExpr {
        TypeExpr {
            kind,
            specifiers: Vec::new(),
            span: self.span(),
        }
    }

    pub fn ty(&self, primitive: PrimitiveType) -> TypeExpr {
        self.type_expr(TypeExprKind::Primitive(primitive))
    }

    pub fn ty_named(&self, name: &str, type_args: Vec<TypeExpr>) -> TypeExpr {
        self.type_expr(TypeExprKind::Named {
            name: name.to_string(),
            type_args,
        })
    }

    pub fn ty_ptr(&self, inner: TypeExpr) -> TypeExpr {
        self.type_expr(TypeExprKind::Ptr(Box::new(inner)))
    }

    pub fn ty_ref(&self, inner: TypeExpr) -> TypeExpr {
        self.type_expr(TypeExprKind::Ref(Box::new(inner)))
    }

    pub fn ty_array(&self, element: TypeExpr, size: Option<u32>) -> TypeExpr {
        self.type_expr(TypeExprKind::Array {
            element: Box::new(element),
            size,
        })
    }

    pub fn ty_fn(&self, params: Vec<TypeExpr>, ret: Option<TypeExpr>) -> TypeExpr {
        self.type_expr(TypeExprKind::Function {
            params,
            ret: ret.map(Box::new),
        })
    }

    pub fn ty_dyn(&self) -> TypeExpr {
        self.type_expr(TypeExprKind::Dyn)
    }

    /// Attach a specifier (`const`, `heap`, ...) to a type expression.
    pub fn with(&self, specifier: Specifier, mut ty: TypeExpr) -> TypeExpr {
        ty.specifiers.push(specifier);
        ty
    }

    pub fn type_param(&self, name: &str, conditions: Vec<TypeExpr>) -> TypeParam {
        TypeParam {
            name: name.to_string(),
            conditions,
            span: self.span(),
        }
    }

    // ===== expressions =====

    fn expr(&self, kind: ExprKind) -> Expr {
        Expr {
            id: self.id(),
            kind,
            span: self.span(),
        }
    }

    pub fn int(&self, value: i64) -> Expr {
        self.expr(ExprKind::IntLiteral(value))
    }

    pub fn double(&self, value: f64) -> Expr {
        self.expr(ExprKind::DoubleLiteral(value))
    }

    pub fn string(&self, value: &str) -> Expr {
        self.expr(ExprKind::StringLiteral(value.to_string()))
    }

    pub fn bool(&self, value: bool) -> Expr {
        self.expr(ExprKind::BoolLiteral(value))
    }

    pub fn char(&self, value: char) -> Expr {
        self.expr(ExprKind::CharLiteral(value))
    }

    pub fn ident(&self, name: &str) -> Expr {
        self.expr(ExprKind::Ident(name.to_string()))
    }

    pub fn binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        self.expr(ExprKind::Binary(Box::new(BinaryExpr { op, left, right })))
    }

    pub fn call(&self, callee: &str, args: Vec<Expr>) -> Expr {
        self.call_with(callee, Vec::new(), args)
    }

    /// Call with explicit type arguments: `callee<A, B>(args)`.
    pub fn call_with(&self, callee: &str, type_args: Vec<TypeExpr>, args: Vec<Expr>) -> Expr {
        self.expr(ExprKind::Call(Box::new(CallExpr {
            callee: callee.to_string(),
            type_args,
            args,
        })))
    }

    pub fn struct_lit(
        &self,
        name: &str,
        type_args: Vec<TypeExpr>,
        fields: Vec<(&str, Expr)>,
    ) -> Expr {
        let fields = fields
            .into_iter()
            .map(|(field, value)| FieldInit {
                name: field.to_string(),
                span: value.span,
                value,
            })
            .collect();
        self.expr(ExprKind::StructLiteral(Box::new(StructLiteralExpr {
            name: name.to_string(),
            type_args,
            fields,
        })))
    }

    pub fn field(&self, object: Expr, field: &str) -> Expr {
        self.expr(ExprKind::FieldAccess(Box::new(FieldAccessExpr {
            object,
            field: field.to_string(),
        })))
    }

    pub fn lambda(
        &self,
        kind: LambdaKind,
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        stmts: Vec<Stmt>,
    ) -> Expr {
        let body = self.block(stmts);
        self.expr(ExprKind::Lambda(Box::new(LambdaExpr {
            kind,
            params,
            return_type,
            body,
        })))
    }

    pub fn move_(&self, source: Expr) -> Expr {
        self.expr(ExprKind::Move(Box::new(source)))
    }

    // ===== statements =====

    pub fn block(&self, stmts: Vec<Stmt>) -> Block {
        Block {
            id: self.id(),
            stmts,
            span: self.span(),
        }
    }

    pub fn let_stmt(&self, name: &str, ty: Option<TypeExpr>, init: Option<Expr>) -> LetStmt {
        LetStmt {
            id: self.id(),
            name: name.to_string(),
            ty,
            init,
            span: self.span(),
        }
    }

    pub fn let_(&self, name: &str, ty: Option<TypeExpr>, init: Option<Expr>) -> Stmt {
        Stmt::Let(self.let_stmt(name, ty, init))
    }

    pub fn assign(&self, name: &str, value: Expr) -> Stmt {
        Stmt::Assign(AssignStmt {
            id: self.id(),
            target: AssignTarget::Variable(name.to_string()),
            value,
            span: self.span(),
        })
    }

    pub fn assign_field(&self, object: &str, field: &str, value: Expr) -> Stmt {
        Stmt::Assign(AssignStmt {
            id: self.id(),
            target: AssignTarget::Field {
                object: object.to_string(),
                field: field.to_string(),
            },
            value,
            span: self.span(),
        })
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        Stmt::Expr(expr)
    }

    pub fn ret(&self, value: Option<Expr>) -> Stmt {
        Stmt::Return(ReturnStmt {
            id: self.id(),
            value,
            span: self.span(),
        })
    }

    pub fn if_(&self, condition: Expr, then_stmts: Vec<Stmt>, else_stmts: Option<Vec<Stmt>>) -> Stmt {
        let then_block = self.block(then_stmts);
        let else_block = else_stmts.map(|stmts| self.block(stmts));
        Stmt::If(IfStmt {
            id: self.id(),
            condition,
            then_block,
            else_block,
            span: self.span(),
        })
    }

    pub fn while_(&self, condition: Expr, body: Vec<Stmt>) -> Stmt {
        let body = self.block(body);
        Stmt::While(WhileStmt {
            id: self.id(),
            condition,
            body,
            span: self.span(),
        })
    }

    pub fn block_stmt(&self, stmts: Vec<Stmt>) -> Stmt {
        Stmt::Block(self.block(stmts))
    }

    pub fn drop_(&self, name: &str) -> Stmt {
        Stmt::Drop(DropStmt {
            id: self.id(),
            name: name.to_string(),
            span: self.span(),
        })
    }

    // ===== declarations =====

    pub fn param(&self, name: &str, ty: TypeExpr) -> Param {
        Param {
            id: self.id(),
            name: name.to_string(),
            ty,
            span: self.span(),
        }
    }

    pub fn func_decl(
        &self,
        name: &str,
        type_params: Vec<TypeParam>,
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        stmts: Vec<Stmt>,
    ) -> FuncDecl {
        let body = self.block(stmts);
        FuncDecl {
            id: self.id(),
            name: name.to_string(),
            type_params,
            params,
            return_type,
            body,
            span: self.span(),
        }
    }

    pub fn func(
        &self,
        name: &str,
        type_params: Vec<TypeParam>,
        params: Vec<Param>,
        return_type: Option<TypeExpr>,
        stmts: Vec<Stmt>,
    ) -> Decl {
        Decl::Function(self.func_decl(name, type_params, params, return_type, stmts))
    }

    pub fn struct_decl(
        &self,
        name: &str,
        type_params: Vec<TypeParam>,
        fields: Vec<(&str, TypeExpr)>,
        implements: Vec<TypeExpr>,
        methods: Vec<FuncDecl>,
    ) -> Decl {
        let fields = fields
            .into_iter()
            .map(|(field, ty)| FieldDecl {
                id: self.id(),
                name: field.to_string(),
                span: ty.span,
                ty,
            })
            .collect();
        Decl::Struct(StructDecl {
            id: self.id(),
            name: name.to_string(),
            type_params,
            fields,
            implements,
            methods,
            span: self.span(),
        })
    }

    pub fn method_sig(&self, name: &str, params: Vec<Param>, return_type: Option<TypeExpr>) -> MethodSig {
        MethodSig {
            id: self.id(),
            name: name.to_string(),
            params,
            return_type,
            span: self.span(),
        }
    }

    pub fn interface(&self, name: &str, type_params: Vec<TypeParam>, methods: Vec<MethodSig>) -> Decl {
        Decl::Interface(InterfaceDecl {
            id: self.id(),
            name: name.to_string(),
            type_params,
            methods,
            span: self.span(),
        })
    }

    pub fn global(&self, name: &str, ty: Option<TypeExpr>, init: Option<Expr>) -> Decl {
        Decl::Global(self.let_stmt(name, ty, init))
    }
}
