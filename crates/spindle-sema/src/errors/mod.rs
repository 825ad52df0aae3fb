// errors/mod.rs
//! Semantic analysis errors (E3xxx) and warnings (W3xxx).

#![allow(unused_assignments)] // False positives from thiserror derive

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Whether a diagnostic stops the current file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Aborts the remaining stages of the file.
    Hard,
    /// Recorded; analysis continues.
    Soft,
}

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Collector,
    TypeChecker,
    Manifestation,
    Finalizer,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Phase::Collector => "Collector",
            Phase::TypeChecker => "TypeChecker",
            Phase::Manifestation => "Manifestation",
            Phase::Finalizer => "Finalizer",
        })
    }
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticError {
    // ===== hard =====
    #[error("'{name}' is already declared in this scope")]
    #[diagnostic(code(E3001))]
    DuplicateSymbol {
        name: String,
        #[label("redeclared here")]
        span: SourceSpan,
    },

    #[error("'{name}' is not declared")]
    #[diagnostic(code(E3002))]
    UndeclaredSymbol {
        name: String,
        #[label("not found in scope")]
        span: SourceSpan,
    },

    #[error("unknown type '{name}'")]
    #[diagnostic(code(E3003))]
    UnknownType {
        name: String,
        #[label("not a known type")]
        span: SourceSpan,
    },

    #[error("'{name}' is destroyed before it was initialized")]
    #[diagnostic(code(E3004))]
    DestroyUninitialized {
        name: String,
        #[label("destroyed here")]
        span: SourceSpan,
    },

    #[error("'{name}' is destroyed twice")]
    #[diagnostic(code(E3005))]
    DoubleDestroy {
        name: String,
        #[label("destroyed again here")]
        span: SourceSpan,
        #[label("first destroyed here")]
        previous: SourceSpan,
    },

    #[error("no manifestation could be found for '{signature}'")]
    #[diagnostic(code(E3006))]
    UnresolvedManifestation {
        signature: String,
        #[label("required here")]
        span: SourceSpan,
    },

    #[error("self-referential type '{signature}' was never manifested")]
    #[diagnostic(code(E3007))]
    UnresolvedSelfReference {
        signature: String,
        #[label("referenced here")]
        span: SourceSpan,
    },

    // ===== soft =====
    #[error("variable '{name}' is declared but not initialized")]
    #[diagnostic(code(E3101))]
    UninitializedRead {
        name: String,
        #[label("read here")]
        span: SourceSpan,
    },

    #[error("'{name}' is used after it was moved or destroyed")]
    #[diagnostic(code(E3102))]
    UseAfterDestroy {
        name: String,
        #[label("used here")]
        span: SourceSpan,
        #[label("moved or destroyed here")]
        destroyed_at: SourceSpan,
    },

    #[error("'{name}' is used after its field '{field}' was moved")]
    #[diagnostic(code(E3103))]
    PartiallyMoved {
        name: String,
        field: String,
        #[label("used here")]
        span: SourceSpan,
    },

    #[error("'{name}' is read before field '{field}' is initialized")]
    #[diagnostic(code(E3104))]
    StructNotConstructed {
        name: String,
        field: String,
        #[label("read here")]
        span: SourceSpan,
    },

    #[error("'{name}' cannot be assigned after it was moved or destroyed")]
    #[diagnostic(code(E3105), help("declare a new variable instead"))]
    AssignToDead {
        name: String,
        #[label("assigned here")]
        span: SourceSpan,
    },

    #[error("'{name}' cannot be redeclared while it holds a value")]
    #[diagnostic(code(E3106))]
    RedeclareLive {
        name: String,
        #[label("redeclared here")]
        span: SourceSpan,
    },

    #[error("constant '{name}' is already initialized")]
    #[diagnostic(code(E3107))]
    ReassignConst {
        name: String,
        #[label("assigned here")]
        span: SourceSpan,
    },

    #[error("expected {expected}, found {found}")]
    #[diagnostic(code(E3108))]
    TypeMismatch {
        expected: String,
        found: String,
        #[label("type mismatch")]
        span: SourceSpan,
    },

    #[error("condition must be bool, found {found}")]
    #[diagnostic(code(E3109))]
    ConditionNotBool {
        found: String,
        #[label("not a bool")]
        span: SourceSpan,
    },

    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    #[diagnostic(code(E3110))]
    InvalidOperands {
        op: String,
        left: String,
        right: String,
        #[label("invalid operands")]
        span: SourceSpan,
    },

    #[error("no function '{name}' accepts ({args})")]
    #[diagnostic(code(E3111))]
    UndefinedFunction {
        name: String,
        args: String,
        #[label("no matching candidate")]
        span: SourceSpan,
    },

    #[error("call to '{name}' matches {count} candidates")]
    #[diagnostic(code(E3112))]
    FunctionAmbiguity {
        name: String,
        count: usize,
        #[label("ambiguous call")]
        span: SourceSpan,
    },

    #[error("generic arguments could not be inferred for '{name}'")]
    #[diagnostic(code(E3113), help("pass the type arguments explicitly"))]
    GenericsNotInferred {
        name: String,
        #[label("cannot infer")]
        span: SourceSpan,
    },

    #[error("{found} does not satisfy the conditions of generic type '{generic}'")]
    #[diagnostic(code(E3114))]
    GenericConditionViolated {
        generic: String,
        found: String,
        #[label("condition not met")]
        span: SourceSpan,
    },

    #[error("'{name}' expects {expected} template types, found {found}")]
    #[diagnostic(code(E3115))]
    WrongTypeArgCount {
        name: String,
        expected: usize,
        found: usize,
        #[label("wrong number of template types")]
        span: SourceSpan,
    },

    #[error("expected {expected} arguments, found {found}")]
    #[diagnostic(code(E3116))]
    WrongArgumentCount {
        expected: usize,
        found: usize,
        #[label("wrong number of arguments")]
        span: SourceSpan,
    },

    #[error("'{struct_name}' has no field '{field}'")]
    #[diagnostic(code(E3117))]
    UnknownField {
        struct_name: String,
        field: String,
        #[label("unknown field")]
        span: SourceSpan,
    },

    #[error("field '{field}' of '{struct_name}' is not initialized")]
    #[diagnostic(code(E3118))]
    MissingField {
        struct_name: String,
        field: String,
        #[label("missing field")]
        span: SourceSpan,
    },

    #[error("{found} has no fields")]
    #[diagnostic(code(E3119))]
    NotAStruct {
        found: String,
        #[label("field access on non-struct")]
        span: SourceSpan,
    },

    #[error("'{struct_name}' does not implement '{method}' from '{interface}'")]
    #[diagnostic(code(E3120))]
    MissingInterfaceMethod {
        struct_name: String,
        interface: String,
        method: String,
        #[label("missing method")]
        span: SourceSpan,
    },

    #[error("'{name}' is not an interface")]
    #[diagnostic(code(E3121))]
    NotAnInterface {
        name: String,
        #[label("expected an interface")]
        span: SourceSpan,
    },

    #[error("expected return type {expected}, found {found}")]
    #[diagnostic(code(E3122))]
    ReturnTypeMismatch {
        expected: String,
        found: String,
        #[label("wrong return type")]
        span: SourceSpan,
    },

    #[error("'{name}' of type {found} is not callable")]
    #[diagnostic(code(E3123))]
    NotCallable {
        name: String,
        found: String,
        #[label("not a function")]
        span: SourceSpan,
    },

    #[error("no type could be inferred for '{name}'")]
    #[diagnostic(code(E3124))]
    UntypedSymbol {
        name: String,
        #[label("type unknown")]
        span: SourceSpan,
    },
}

impl SemanticError {
    /// Hard errors stop the file; everything else is collected.
    pub fn severity(&self) -> Severity {
        match self {
            SemanticError::DuplicateSymbol { .. }
            | SemanticError::UndeclaredSymbol { .. }
            | SemanticError::UnknownType { .. }
            | SemanticError::DestroyUninitialized { .. }
            | SemanticError::DoubleDestroy { .. }
            | SemanticError::UnresolvedManifestation { .. }
            | SemanticError::UnresolvedSelfReference { .. } => Severity::Hard,
            _ => Severity::Soft,
        }
    }

    pub fn is_hard(&self) -> bool {
        self.severity() == Severity::Hard
    }

    /// Human-readable category used in the structured text form.
    pub fn category(&self) -> &'static str {
        match self {
            SemanticError::DuplicateSymbol { .. } => "Multiple declarations of the same name",
            SemanticError::UndeclaredSymbol { .. } => "Referenced undeclared symbol",
            SemanticError::UnknownType { .. } => "Unknown datatype",
            SemanticError::DestroyUninitialized { .. } => "Destroy of uninitialized variable",
            SemanticError::DoubleDestroy { .. } => "Double destroy",
            SemanticError::UnresolvedManifestation { .. } => "Unresolved manifestation",
            SemanticError::UnresolvedSelfReference { .. } => {
                "Unresolved self-referential manifestation"
            }
            SemanticError::UninitializedRead { .. } => "Referenced undefined variable",
            SemanticError::UseAfterDestroy { .. } => "Use of moved or destroyed variable",
            SemanticError::PartiallyMoved { .. } => "Use of partially moved variable",
            SemanticError::StructNotConstructed { .. } => "Struct not fully constructed",
            SemanticError::AssignToDead { .. } => "Assignment to destroyed variable",
            SemanticError::RedeclareLive { .. } => "Invalid lifecycle transition",
            SemanticError::ReassignConst { .. } => "Cannot re-assign constant variable",
            SemanticError::TypeMismatch { .. } => "Wrong data type",
            SemanticError::ConditionNotBool { .. } => "Condition must be bool",
            SemanticError::InvalidOperands { .. } => "Operator applied to wrong data type",
            SemanticError::UndefinedFunction { .. } => "Referenced undefined function",
            SemanticError::FunctionAmbiguity { .. } => "Function ambiguity",
            SemanticError::GenericsNotInferred { .. } => "Generic arguments not inferred",
            SemanticError::GenericConditionViolated { .. } => "Generic type condition not met",
            SemanticError::WrongTypeArgCount { .. } => "Wrong number of template types",
            SemanticError::WrongArgumentCount { .. } => "Wrong number of arguments",
            SemanticError::UnknownField { .. } => "Referenced undefined struct field",
            SemanticError::MissingField { .. } => "Struct field not initialized",
            SemanticError::NotAStruct { .. } => "Member access on non-struct",
            SemanticError::MissingInterfaceMethod { .. } => "Missing interface method",
            SemanticError::NotAnInterface { .. } => "Expected interface",
            SemanticError::ReturnTypeMismatch { .. } => "Wrong return type",
            SemanticError::NotCallable { .. } => "Expression is not callable",
            SemanticError::UntypedSymbol { .. } => "No type could be inferred",
        }
    }
}

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum SemanticWarning {
    #[error("variable '{name}' is never used")]
    #[diagnostic(code(W3001), help("prefix the name with '_' to silence this warning"))]
    UnusedVariable {
        name: String,
        #[label("declared here")]
        span: SourceSpan,
    },
}

impl SemanticWarning {
    pub fn category(&self) -> &'static str {
        match self {
            SemanticWarning::UnusedVariable { .. } => "Unused variable",
        }
    }
}
