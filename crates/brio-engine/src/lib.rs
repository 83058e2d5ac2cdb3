//! Brio Language Backend - AST to IR Lowering
//!
//! This crate lowers the typed AST of a Brio program into a basic-block
//! intermediate representation ready for an external code generator.
//!
//! The pipeline runs six passes over the top-level declarations:
//! imports, class predeclaration, field layout, method signatures,
//! method bodies, and the entry function. Lowering is value-oriented:
//! every expression produces a typed value backed by a stack slot, all
//! implicit numeric casts are range-guarded with runtime traps, and
//! arrays carry their shape for bounds-checked indexing.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod ast;
pub mod builtins;
pub mod context;
pub mod error;
pub mod ir;
pub mod lower;
pub mod pipeline;
pub mod scope;
pub mod type_registry;

pub use error::{CompileError, CompileResult};
pub use ir::IrModule;
pub use pipeline::{compile, Pipeline};
