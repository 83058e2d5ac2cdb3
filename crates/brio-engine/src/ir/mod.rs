//! Intermediate Representation (IR) for Brio
//!
//! The IR is the backend's output: register-based instructions grouped into
//! basic blocks, one function per method plus the entry function, and one
//! struct per user class.
//!
//! # Structure
//!
//! - `IrModule` - Top-level container for a compiled program
//! - `IrFunction` - A function with typed parameters and basic blocks
//! - `BasicBlock` - Instructions plus exactly one terminator once closed
//! - `IrInstr` - The instruction set
//! - `Register` - Virtual registers with physical type information

pub mod block;
pub mod function;
pub mod instr;
pub mod module;
pub mod pretty;
pub mod value;

pub use block::{BasicBlock, BasicBlockId, Terminator};
pub use function::IrFunction;
pub use instr::{
    CastKind, FloatBinaryOp, FloatPredicate, FunctionId, IntBinaryOp, IntPredicate, IrInstr,
    RuntimeFn,
};
pub use module::{IrModule, IrStruct};
pub use pretty::PrettyPrint;
pub use value::{IrConstant, IrType, IrValue, Register, RegisterId, StructId};
