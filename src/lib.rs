//! Type checker for the Verdin programming language.
//!
//! Verdin is a small strongly-typed functional language with prenex
//! polymorphism, nominal type declarations, modules, and implicit arguments
//! resolved by instance lookup. This crate is the middle of the pipeline: it
//! consumes the parsed surface tree ([`ast`]), verifies type correctness,
//! infers the most general type for every unannotated binding, resolves
//! implicit arguments, and returns a fully type-annotated tree together with
//! the enriched environment.
//!
//! Lexing and parsing live upstream; serialization of the elaborated tree
//! and the compilation back end live downstream.

pub mod ast;
pub mod interner;
pub mod typechecker;

// Re-export main types
pub use ast::{Expr, Pattern, Statement};
pub use typechecker::error::TypeError;
pub use typechecker::{check_statements, infer_expr, Checked};
