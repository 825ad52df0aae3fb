// lib.rs
//! Spindle frontend: the syntax tree shape consumed by semantic analysis.
//!
//! There is no lexer or parser here. Trees arrive from an external parser or
//! are assembled with [`AstBuilder`].

pub mod ast;
pub mod ast_builder;
mod span;

pub use ast::*;
pub use ast_builder::AstBuilder;
pub use span::Span;
