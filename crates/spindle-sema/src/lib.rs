// lib.rs
//! Semantic analysis for spindle.
//!
//! Qualified types and generic matching live in [`types`] and
//! [`type_matcher`]; scopes, symbols, lifecycles and captures in [`scope`];
//! struct and interface manifestation in [`structs`]. The [`Analyzer`] runs
//! the passes over one file and the [`Pipeline`] runs many files at once.

pub mod analyzer;
pub mod context;
pub mod errors;
pub mod functions;
pub mod ids;
pub mod pipeline;
pub mod registry;
pub mod scope;
pub mod structs;
pub mod type_matcher;
pub mod types;

pub use analyzer::{AnalysisOutput, Analyzer, LambdaAnalysis, TypeError, TypeWarning};
pub use context::{CompilationContext, PipelineOptions};
pub use errors::{Phase, SemanticError, SemanticWarning, Severity};
pub use functions::{FunctionManager, FunctionManifestation, FunctionTemplate};
pub use ids::{FunctionId, ScopeId, StructId};
pub use pipeline::{FileOutcome, FileReport, Pipeline};
pub use registry::{ManifestationRegistry, ManifestedLayout};
pub use scope::{ScopeKind, ScopeTree};
pub use structs::{StructKind, StructManager};
pub use types::{GenericResolver, GenericType, QualType, TypeMapping, TypeQualifiers};
