// ast.rs
//! Syntax tree consumed by semantic analysis.
//!
//! Node kinds are plain sum types. Every node carries a [`NodeId`] and the
//! [`Span`] of its declaration site; child enumeration goes through
//! [`Expr::children`] and [`Stmt::child_exprs`].

use crate::Span;
use smallvec::{SmallVec, smallvec};

/// Unique identifier for an AST node within a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Create a NodeId from a raw index. Only the parser and the tree builder should use this.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Return the underlying index.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Anything in the tree that has an identity and a source location.
pub trait AstNode {
    fn id(&self) -> NodeId;
    fn span(&self) -> Span;
}

/// Built-in scalar types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Double,
    Int,
    Short,
    Long,
    Byte,
    Char,
    String,
    Bool,
}

impl PrimitiveType {
    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Double => "double",
            PrimitiveType::Int => "int",
            PrimitiveType::Short => "short",
            PrimitiveType::Long => "long",
            PrimitiveType::Byte => "byte",
            PrimitiveType::Char => "char",
            PrimitiveType::String => "string",
            PrimitiveType::Bool => "bool",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "double" => PrimitiveType::Double,
            "int" => PrimitiveType::Int,
            "short" => PrimitiveType::Short,
            "long" => PrimitiveType::Long,
            "byte" => PrimitiveType::Byte,
            "char" => PrimitiveType::Char,
            "string" => PrimitiveType::String,
            "bool" => PrimitiveType::Bool,
            _ => return None,
        })
    }

    /// Numeric types that are signed unless declared otherwise.
    pub fn is_signed_by_default(self) -> bool {
        matches!(
            self,
            PrimitiveType::Double | PrimitiveType::Int | PrimitiveType::Short | PrimitiveType::Long
        )
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            PrimitiveType::Double
                | PrimitiveType::Int
                | PrimitiveType::Short
                | PrimitiveType::Long
                | PrimitiveType::Byte
        )
    }
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A compilation unit: one source file.
#[derive(Debug, Clone)]
pub struct Program {
    pub file: String,
    pub declarations: Vec<Decl>,
    /// One past the highest NodeId handed out for this file.
    pub next_node_id: u32,
}

#[derive(Debug, Clone)]
pub enum Decl {
    Function(FuncDecl),
    Struct(StructDecl),
    Interface(InterfaceDecl),
    Global(LetStmt),
}

impl AstNode for Decl {
    fn id(&self) -> NodeId {
        match self {
            Decl::Function(f) => f.id,
            Decl::Struct(s) => s.id,
            Decl::Interface(i) => i.id,
            Decl::Global(l) => l.id,
        }
    }

    fn span(&self) -> Span {
        match self {
            Decl::Function(f) => f.span,
            Decl::Struct(s) => s.span,
            Decl::Interface(i) => i.span,
            Decl::Global(l) => l.span,
        }
    }
}

/// Declaration-site modifiers on a type or a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Specifier {
    Const,
    Signed,
    Unsigned,
    Heap,
    Public,
    Inline,
    Compose,
}

/// Type parameter declaration: `T` or `T: int | long`.
#[derive(Debug, Clone)]
pub struct TypeParam {
    pub name: String,
    /// Accepted types. Empty means any type.
    pub conditions: Vec<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub specifiers: Vec<Specifier>,
    pub span: Span,
}

impl TypeExpr {
    pub fn has_specifier(&self, specifier: Specifier) -> bool {
        self.specifiers.contains(&specifier)
    }
}

#[derive(Debug, Clone)]
pub enum TypeExprKind {
    Primitive(PrimitiveType),
    /// Struct, interface or type parameter, optionally with type arguments.
    Named {
        name: String,
        type_args: Vec<TypeExpr>,
    },
    Ptr(Box<TypeExpr>),
    Ref(Box<TypeExpr>),
    Array {
        element: Box<TypeExpr>,
        size: Option<u32>,
    },
    Function {
        params: Vec<TypeExpr>,
        ret: Option<Box<TypeExpr>>,
    },
    /// Type left for inference.
    Dyn,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub id: NodeId,
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FuncDecl {
    pub id: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<Param>,
    /// `None` declares a procedure.
    pub return_type: Option<TypeExpr>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub id: NodeId,
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub id: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub fields: Vec<FieldDecl>,
    pub implements: Vec<TypeExpr>,
    pub methods: Vec<FuncDecl>,
    pub span: Span,
}

/// Method signature inside an interface.
#[derive(Debug, Clone)]
pub struct MethodSig {
    pub id: NodeId,
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub id: NodeId,
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub methods: Vec<MethodSig>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Block {
    pub id: NodeId,
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Let(LetStmt),
    Assign(AssignStmt),
    Expr(Expr),
    Return(ReturnStmt),
    If(IfStmt),
    While(WhileStmt),
    Block(Block),
    Drop(DropStmt),
}

impl Stmt {
    /// Expressions directly owned by this statement, in evaluation order.
    pub fn child_exprs(&self) -> SmallVec<[&Expr; 2]> {
        match self {
            Stmt::Let(s) => s.init.iter().collect(),
            Stmt::Assign(s) => smallvec![&s.value],
            Stmt::Expr(e) => smallvec![e],
            Stmt::Return(s) => s.value.iter().collect(),
            Stmt::If(s) => smallvec![&s.condition],
            Stmt::While(s) => smallvec![&s.condition],
            Stmt::Block(_) | Stmt::Drop(_) => SmallVec::new(),
        }
    }

    /// Nested blocks directly owned by this statement.
    pub fn child_blocks(&self) -> SmallVec<[&Block; 2]> {
        match self {
            Stmt::If(s) => {
                let mut blocks: SmallVec<[&Block; 2]> = smallvec![&s.then_block];
                blocks.extend(s.else_block.as_ref());
                blocks
            }
            Stmt::While(s) => smallvec![&s.body],
            Stmt::Block(b) => smallvec![b],
            _ => SmallVec::new(),
        }
    }
}

impl AstNode for Stmt {
    fn id(&self) -> NodeId {
        match self {
            Stmt::Let(s) => s.id,
            Stmt::Assign(s) => s.id,
            Stmt::Expr(e) => e.id,
            Stmt::Return(s) => s.id,
            Stmt::If(s) => s.id,
            Stmt::While(s) => s.id,
            Stmt::Block(b) => b.id,
            Stmt::Drop(s) => s.id,
        }
    }

    fn span(&self) -> Span {
        match self {
            Stmt::Let(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Expr(e) => e.span,
            Stmt::Return(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::Block(b) => b.span,
            Stmt::Drop(s) => s.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LetStmt {
    pub id: NodeId,
    pub name: String,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum AssignTarget {
    Variable(String),
    Field { object: String, field: String },
}

#[derive(Debug, Clone)]
pub struct AssignStmt {
    pub id: NodeId,
    pub target: AssignTarget,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub id: NodeId,
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub id: NodeId,
    pub condition: Expr,
    pub then_block: Block,
    pub else_block: Option<Block>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub id: NodeId,
    pub condition: Expr,
    pub body: Block,
    pub span: Span,
}

/// Explicit destruction of a local.
#[derive(Debug, Clone)]
pub struct DropStmt {
    pub id: NodeId,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

impl AstNode for Expr {
    fn id(&self) -> NodeId {
        self.id
    }

    fn span(&self) -> Span {
        self.span
    }
}

impl Expr {
    /// Returns true if this expression is a literal value
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::IntLiteral(_)
                | ExprKind::DoubleLiteral(_)
                | ExprKind::StringLiteral(_)
                | ExprKind::BoolLiteral(_)
                | ExprKind::CharLiteral(_)
        )
    }

    /// Direct subexpressions, in evaluation order. Lambda bodies are not
    /// included; they open their own scope.
    pub fn children(&self) -> SmallVec<[&Expr; 2]> {
        match &self.kind {
            ExprKind::Binary(b) => smallvec![&b.left, &b.right],
            ExprKind::Call(c) => c.args.iter().collect(),
            ExprKind::StructLiteral(s) => s.fields.iter().map(|f| &f.value).collect(),
            ExprKind::FieldAccess(f) => smallvec![&f.object],
            ExprKind::Move(inner) => smallvec![inner.as_ref()],
            ExprKind::IntLiteral(_)
            | ExprKind::DoubleLiteral(_)
            | ExprKind::StringLiteral(_)
            | ExprKind::BoolLiteral(_)
            | ExprKind::CharLiteral(_)
            | ExprKind::Ident(_)
            | ExprKind::Lambda(_) => SmallVec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLiteral(i64),
    DoubleLiteral(f64),
    StringLiteral(String),
    BoolLiteral(bool),
    CharLiteral(char),
    Ident(String),
    Binary(Box<BinaryExpr>),
    Call(Box<CallExpr>),
    StructLiteral(Box<StructLiteralExpr>),
    FieldAccess(Box<FieldAccessExpr>),
    Lambda(Box<LambdaExpr>),
    /// Transfer ownership out of a variable or a field.
    Move(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub left: Expr,
    pub right: Expr,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: String,
    pub type_args: Vec<TypeExpr>,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct FieldInit {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructLiteralExpr {
    pub name: String,
    pub type_args: Vec<TypeExpr>,
    pub fields: Vec<FieldInit>,
}

#[derive(Debug, Clone)]
pub struct FieldAccessExpr {
    pub object: Expr,
    pub field: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LambdaKind {
    Closure,
    /// Body runs on a spawned thread.
    Thread,
}

#[derive(Debug, Clone)]
pub struct LambdaExpr {
    pub kind: LambdaKind,
    pub params: Vec<Param>,
    pub return_type: Option<TypeExpr>,
    pub body: Block,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(id: u32, kind: ExprKind) -> Expr {
        Expr {
            id: NodeId::new(id),
            kind,
            span: Span::default(),
        }
    }

    #[test]
    fn test_binary_children_in_evaluation_order() {
        let e = expr(
            3,
            ExprKind::Binary(Box::new(BinaryExpr {
                op: BinaryOp::Add,
                left: expr(1, ExprKind::IntLiteral(1)),
                right: expr(2, ExprKind::Ident("x".into())),
            })),
        );
        let ids: Vec<u32> = e.children().iter().map(|c| c.id.index()).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_lambda_has_no_direct_children() {
        let e = expr(
            5,
            ExprKind::Lambda(Box::new(LambdaExpr {
                kind: LambdaKind::Closure,
                params: vec![],
                return_type: None,
                body: Block {
                    id: NodeId::new(4),
                    stmts: vec![Stmt::Expr(expr(6, ExprKind::Ident("y".into())))],
                    span: Span::default(),
                },
            })),
        );
        assert!(e.children().is_empty());
    }

    #[test]
    fn test_primitive_names_round_through_from_name() {
        for p in [PrimitiveType::Int, PrimitiveType::String, PrimitiveType::Bool] {
            assert_eq!(PrimitiveType::from_name(p.name()), Some(p));
        }
        assert_eq!(PrimitiveType::from_name("Pair"), None);
        assert!(PrimitiveType::Long.is_signed_by_default());
        assert!(!PrimitiveType::Byte.is_signed_by_default());
    }
}
