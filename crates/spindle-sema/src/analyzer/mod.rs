// analyzer/mod.rs
//! Per-file semantic analysis.
//!
//! Analysis runs in three stages. [`Analyzer::collect`] registers every
//! struct, interface, function and global; [`Analyzer::check`] walks the
//! bodies, tracks lifecycles and manifests generic types and functions on
//! demand; [`Analyzer::finalize`] reports what could never be typed and the
//! variables that were never read.
//!
//! Soft errors are recorded and analysis continues. A hard error ends the
//! current stage and no later stage runs for the file.

mod call;
mod collect;
mod errors;
mod expr;
mod lambda;
mod resolve;
mod stmt;

use std::collections::VecDeque;

use rustc_hash::{FxHashMap, FxHashSet};
use spindle_frontend::{LambdaKind, NodeId, Program, Span};

use crate::context::CompilationContext;
use crate::errors::{Phase, SemanticError, SemanticWarning};
use crate::functions::FunctionManager;
use crate::ids::{FunctionId, StructId};
use crate::scope::{Capture, ScopeId, ScopeTree};
use crate::structs::StructManager;
use crate::types::QualType;

/// A semantic error located in a source file.
#[derive(Debug, Clone)]
pub struct TypeError {
    pub error: SemanticError,
    pub span: Span,
    pub phase: Phase,
}

impl TypeError {
    pub fn new(error: SemanticError, span: Span, phase: Phase) -> Self {
        Self { error, span, phase }
    }

    pub fn is_hard(&self) -> bool {
        self.error.is_hard()
    }

    /// `[Error|Phase] file:line:column: Category: message`
    pub fn render(&self, file: &str) -> String {
        format!(
            "[Error|{}] {file}:{}: {}: {}",
            self.phase,
            self.span,
            self.error.category(),
            self.error
        )
    }
}

#[derive(Debug, Clone)]
pub struct TypeWarning {
    pub warning: SemanticWarning,
    pub span: Span,
}

impl TypeWarning {
    pub fn new(warning: SemanticWarning, span: Span) -> Self {
        Self { warning, span }
    }

    pub fn render(&self, file: &str) -> String {
        format!(
            "[Warning|{}] {file}:{}: {}: {}",
            Phase::Finalizer,
            self.span,
            self.warning.category(),
            self.warning
        )
    }
}

/// What the checker learned about one lambda expression.
#[derive(Debug, Clone)]
pub struct LambdaAnalysis {
    pub kind: LambdaKind,
    pub scope: ScopeId,
    pub captures: Vec<Capture>,
    pub ty: QualType,
}

/// Everything a later stage needs from a successfully analyzed file.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub file: String,
    pub tree: ScopeTree,
    pub structs: StructManager,
    pub functions: FunctionManager,
    pub expr_types: FxHashMap<NodeId, QualType>,
    pub lambdas: FxHashMap<NodeId, LambdaAnalysis>,
    pub warnings: Vec<TypeWarning>,
}

/// Bodies whose checking was requested by a manifestation.
#[derive(Debug, Clone, Copy)]
enum PendingBody {
    Function { function: FunctionId, manifestation: usize },
    StructMembers(StructId),
}

/// Innermost function or lambda being checked.
#[derive(Debug, Clone)]
struct FunctionContext {
    /// `None` for procedures.
    ret: Option<QualType>,
}

pub struct Analyzer<'a> {
    program: &'a Program,
    ctx: &'a CompilationContext,
    tree: ScopeTree,
    structs: StructManager,
    functions: FunctionManager,
    errors: Vec<TypeError>,
    /// Locations already reported, so one node yields one error.
    reported: FxHashSet<(usize, usize)>,
    warnings: Vec<TypeWarning>,
    expr_types: FxHashMap<NodeId, QualType>,
    lambdas: FxHashMap<NodeId, LambdaAnalysis>,
    pending: VecDeque<PendingBody>,
    phase: Phase,
    scope: ScopeId,
    function_stack: Vec<FunctionContext>,
    /// Struct members resolve without manifesting until every template is known.
    defer_manifestation: bool,
}

impl<'a> Analyzer<'a> {
    pub fn new(program: &'a Program, ctx: &'a CompilationContext) -> Self {
        let tree = ScopeTree::new();
        let scope = tree.global();
        Self {
            program,
            ctx,
            tree,
            structs: StructManager::with_registry(ctx.manifestations().clone(), program.file.clone()),
            functions: FunctionManager::new(),
            errors: Vec::new(),
            reported: FxHashSet::default(),
            warnings: Vec::new(),
            expr_types: FxHashMap::default(),
            lambdas: FxHashMap::default(),
            pending: VecDeque::new(),
            phase: Phase::Collector,
            scope,
            function_stack: Vec::new(),
            defer_manifestation: false,
        }
    }

    pub fn file(&self) -> &str {
        &self.program.file
    }

    /// Register every declaration of the file.
    #[tracing::instrument(skip(self), fields(file = %self.program.file))]
    pub fn collect(&mut self) -> Result<(), TypeError> {
        self.phase = Phase::Collector;
        self.collect_declarations()?;
        tracing::debug!(
            structs = self.structs.iter().count(),
            functions = self.functions.iter().count(),
            "collected"
        );
        Ok(())
    }

    /// Check every body, including those of manifestations requested on the way.
    #[tracing::instrument(skip(self), fields(file = %self.program.file))]
    pub fn check(&mut self) -> Result<(), TypeError> {
        self.phase = Phase::TypeChecker;
        self.check_declarations()?;
        self.drain_pending()?;
        tracing::debug!(errors = self.errors.len(), scopes = self.tree.len(), "checked");
        Ok(())
    }

    /// Report untyped symbols and unused variables.
    #[tracing::instrument(skip(self), fields(file = %self.program.file))]
    pub fn finalize(&mut self) -> Result<(), TypeError> {
        self.phase = Phase::Finalizer;
        self.drain_pending()?;
        // Captured types may have been inferred after their lambda was checked
        for lambda in self.lambdas.values_mut() {
            if self.tree.refresh_capture_modes(lambda.scope) {
                lambda.captures = self.tree.captures(lambda.scope).to_vec();
            }
        }
        for id in self.tree.find_untyped_symbols() {
            if let Some(entry) = self.tree.entry(id) {
                let (name, span) = (entry.name.clone(), entry.decl_span);
                self.add_error(
                    SemanticError::UntypedSymbol {
                        name,
                        span: span.into(),
                    },
                    span,
                );
            }
        }
        if self.ctx.options.warn_unused {
            for id in self.tree.collect_unused() {
                if let Some(entry) = self.tree.entry(id) {
                    let warning = SemanticWarning::UnusedVariable {
                        name: entry.name.clone(),
                        span: entry.decl_span.into(),
                    };
                    let span = entry.decl_span;
                    self.add_warning(warning, span);
                }
            }
        }
        Ok(())
    }

    /// Run all stages. The error list holds soft errors, plus the hard error
    /// that stopped analysis if there was one.
    pub fn analyze(&mut self) -> Result<(), Vec<TypeError>> {
        let stages: [fn(&mut Self) -> Result<(), TypeError>; 3] = [Self::collect, Self::check, Self::finalize];
        for stage in stages {
            if let Err(hard) = stage(self) {
                tracing::debug!(file = %self.program.file, error = %hard.error, "analysis stopped");
                self.errors.push(hard);
                return Err(std::mem::take(&mut self.errors));
            }
        }
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    pub fn errors(&self) -> &[TypeError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<TypeError> {
        std::mem::take(&mut self.errors)
    }

    pub fn warnings(&self) -> &[TypeWarning] {
        &self.warnings
    }

    pub fn tree(&self) -> &ScopeTree {
        &self.tree
    }

    pub fn structs(&self) -> &StructManager {
        &self.structs
    }

    pub fn functions(&self) -> &FunctionManager {
        &self.functions
    }

    pub fn into_output(self) -> AnalysisOutput {
        AnalysisOutput {
            file: self.program.file.clone(),
            tree: self.tree,
            structs: self.structs,
            functions: self.functions,
            expr_types: self.expr_types,
            lambdas: self.lambdas,
            warnings: self.warnings,
        }
    }

    fn drain_pending(&mut self) -> Result<(), TypeError> {
        loop {
            for id in self.structs.take_fresh() {
                self.pending.push_back(PendingBody::StructMembers(id));
            }
            let Some(next) = self.pending.pop_front() else {
                return Ok(());
            };
            match next {
                PendingBody::Function {
                    function,
                    manifestation,
                } => self.check_function_manifestation(function, manifestation)?,
                PendingBody::StructMembers(id) => self.check_struct_members(id)?,
            }
        }
    }
}
