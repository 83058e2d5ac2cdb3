//! Compilation errors

use crate::ast::Span;
use thiserror::Error;

/// Result alias used throughout the crate
pub type CompileResult<T> = Result<T, CompileError>;

/// Fatal compilation errors
///
/// Lowering is fail-fast: the first error aborts the compilation and no
/// module is produced. Runtime traps (overflow, bounds) are not errors;
/// they are compiled into the IR as guarded branches.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Name does not resolve to any visible binding
    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String, span: Span },

    /// Type name does not resolve to a declared class
    #[error("Undefined class: {name}")]
    UndefinedClass { name: String, span: Span },

    /// Method lookup failed on the receiver's class
    #[error("Undefined method {method} on class {class}")]
    UndefinedMethod {
        class: String,
        method: String,
        span: Span,
    },

    /// Field lookup failed on the receiver's class
    #[error("Undefined field {field} on class {class}")]
    UndefinedField {
        class: String,
        field: String,
        span: Span,
    },

    /// Import names a module the builtin registry does not provide
    #[error("Undefined module: {name}")]
    UndefinedModule { name: String, span: Span },

    /// Name already bound in the innermost scope frame
    #[error("Duplicate variable: {name}")]
    DuplicateVariable { name: String, span: Span },

    /// Field name repeats within one class body
    #[error("Duplicate field {field} on class {class}")]
    DuplicateField {
        class: String,
        field: String,
        span: Span,
    },

    /// No implicit conversion between the two types
    #[error("Invalid cast from {from} to {to}")]
    InvalidCast {
        from: String,
        to: String,
        span: Span,
    },

    /// Operand types outside the operator's category
    #[error("Invalid operands for {op}: {left} and {right}")]
    InvalidOperands {
        op: String,
        left: String,
        right: String,
        span: Span,
    },

    /// Parent chain revisits a class
    #[error("Cyclic inheritance involving class {name}")]
    CyclicInheritance { name: String, span: Span },

    /// Variable declared at the top level
    #[error("Invalid global variable {name} (locals only)")]
    GlobalVariable { name: String, span: Span },

    /// Top-level function other than main
    #[error("Invalid top-level function {name} (only main)")]
    TopLevelFunction { name: String, span: Span },

    /// Break statement outside any loop body
    #[error("Invalid break statement (not in loop)")]
    BreakOutsideLoop { span: Span },

    /// Call argument count differs from the declared parameter count
    #[error("{name} expects {expected} arguments, got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    /// Program declares no main function
    #[error("No main function defined")]
    MissingEntry,

    /// main declares parameters
    #[error("main must not declare parameters")]
    EntryParams { span: Span },

    /// main declares a return type
    #[error("main must not declare a return type")]
    EntryReturnType { span: Span },

    /// Broken compiler invariant, not a user mistake
    #[error("Internal compiler error: {message}")]
    InternalError { message: String },
}
