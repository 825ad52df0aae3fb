// analyzer/errors.rs
//! Error and warning reporting helpers for the analyzer.

use spindle_frontend::Span;

use super::{Analyzer, TypeError, TypeWarning};
use crate::errors::{Phase, SemanticError, SemanticWarning};
use crate::scope::{LifecycleError, ScopeError};
use crate::structs::ManifestError;
use crate::types::QualType;

impl Analyzer<'_> {
    /// Record a soft error. A second error at the same location is dropped.
    pub(super) fn add_error(&mut self, error: SemanticError, span: Span) {
        self.add_error_in(error, span, self.phase);
    }

    fn add_error_in(&mut self, error: SemanticError, span: Span, phase: Phase) {
        if !self.reported.insert(span.location()) {
            return;
        }
        if let Some(max) = self.ctx.options.max_soft_errors
            && self.errors.len() >= max
        {
            return;
        }
        tracing::debug!(file = %self.program.file, %span, %error, "soft error");
        self.errors.push(TypeError::new(error, span, phase));
    }

    pub(super) fn add_warning(&mut self, warning: SemanticWarning, span: Span) {
        self.warnings.push(TypeWarning::new(warning, span));
    }

    /// Build a hard error for the current stage.
    pub(super) fn fail(&self, error: SemanticError, span: Span) -> TypeError {
        TypeError::new(error, span, self.phase)
    }

    pub(super) fn type_mismatch(&mut self, expected: &QualType, found: &QualType, span: Span) {
        self.add_error(
            SemanticError::TypeMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
                span: span.into(),
            },
            span,
        );
    }

    /// Translate a scope-level failure on `name`. Duplicates and invalid
    /// destroys are hard; the other lifecycle violations are recorded.
    pub(super) fn report_scope_error(&mut self, err: ScopeError, name: &str, span: Span) -> Result<(), TypeError> {
        let name = name.to_string();
        let error = match err {
            ScopeError::DuplicateSymbol(_) => {
                return Err(self.fail(
                    SemanticError::DuplicateSymbol {
                        name,
                        span: span.into(),
                    },
                    span,
                ));
            }
            ScopeError::Lifecycle(LifecycleError::DestroyUninitialized) => {
                return Err(self.fail(
                    SemanticError::DestroyUninitialized {
                        name,
                        span: span.into(),
                    },
                    span,
                ));
            }
            ScopeError::Lifecycle(LifecycleError::DoubleDestroy { previous }) => {
                return Err(self.fail(
                    SemanticError::DoubleDestroy {
                        name,
                        span: span.into(),
                        previous: previous.into(),
                    },
                    span,
                ));
            }
            ScopeError::Lifecycle(LifecycleError::Revive { .. }) => SemanticError::AssignToDead {
                name,
                span: span.into(),
            },
            ScopeError::Lifecycle(LifecycleError::RedeclareLive) => SemanticError::RedeclareLive {
                name,
                span: span.into(),
            },
            ScopeError::ReassignConst => SemanticError::ReassignConst {
                name,
                span: span.into(),
            },
        };
        self.add_error(error, span);
        Ok(())
    }

    /// Translate a failed manifestation request made at `span`.
    pub(super) fn report_manifest_error(&mut self, err: ManifestError, span: Span) -> Result<(), TypeError> {
        let error = match err {
            ManifestError::Unresolved(signature) => {
                return Err(TypeError::new(
                    SemanticError::UnresolvedManifestation {
                        signature,
                        span: span.into(),
                    },
                    span,
                    Phase::Manifestation,
                ));
            }
            ManifestError::UnresolvedSelfReference(signature) => {
                return Err(TypeError::new(
                    SemanticError::UnresolvedSelfReference {
                        signature,
                        span: span.into(),
                    },
                    span,
                    Phase::Manifestation,
                ));
            }
            ManifestError::Scope(err) => return self.report_scope_error(err, "manifestation", span),
            ManifestError::WrongTypeArgCount { name, expected, found } => SemanticError::WrongTypeArgCount {
                name,
                expected,
                found,
                span: span.into(),
            },
            ManifestError::ConditionViolated { generic, found } => SemanticError::GenericConditionViolated {
                generic,
                found,
                span: span.into(),
            },
            ManifestError::UnboundGeneric(name) | ManifestError::NotSubstantiated(name) => {
                SemanticError::GenericsNotInferred {
                    name,
                    span: span.into(),
                }
            }
        };
        self.add_error_in(error, span, Phase::Manifestation);
        Ok(())
    }
}
