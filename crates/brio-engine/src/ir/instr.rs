//! IR Instructions
//!
//! The non-terminator instruction set: memory, arithmetic, comparisons,
//! casts, address computation, and calls. Every instruction that produces a
//! value writes it into a typed destination register.

use serde::Serialize;

use super::value::{IrValue, Register, StructId};
use crate::ir::IrType;

/// Identifier of a function within the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct FunctionId(pub u32);

impl FunctionId {
    /// Wraps a raw id
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw id value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for FunctionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// Integer binary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntBinaryOp {
    /// Integer addition
    Add,
    /// Integer subtraction
    Sub,
    /// Integer multiplication
    Mul,
    /// Bitwise and
    And,
    /// Bitwise or
    Or,
    /// Bitwise exclusive or
    Xor,
}

impl std::fmt::Display for IntBinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IntBinaryOp::Add => "add",
            IntBinaryOp::Sub => "sub",
            IntBinaryOp::Mul => "mul",
            IntBinaryOp::And => "and",
            IntBinaryOp::Or => "or",
            IntBinaryOp::Xor => "xor",
        };
        write!(f, "{}", s)
    }
}

/// Float binary operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FloatBinaryOp {
    /// Float addition
    Add,
    /// Float subtraction
    Sub,
    /// Float multiplication
    Mul,
    /// Float division
    Div,
    /// Float remainder
    Rem,
}

impl std::fmt::Display for FloatBinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FloatBinaryOp::Add => "fadd",
            FloatBinaryOp::Sub => "fsub",
            FloatBinaryOp::Mul => "fmul",
            FloatBinaryOp::Div => "fdiv",
            FloatBinaryOp::Rem => "frem",
        };
        write!(f, "{}", s)
    }
}

/// Signed integer comparison predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IntPredicate {
    /// Equal
    Eq,
    /// Not equal
    Ne,
    /// Signed less than
    Slt,
    /// Signed less than or equal
    Sle,
    /// Signed greater than
    Sgt,
    /// Signed greater than or equal
    Sge,
}

impl std::fmt::Display for IntPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
        };
        write!(f, "{}", s)
    }
}

/// Float comparison predicates. The ordered forms are false when either
/// operand is NaN; `Uno` is true only for NaN operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FloatPredicate {
    /// Ordered equal
    Oeq,
    /// Ordered not equal
    One,
    /// Ordered less than
    Olt,
    /// Ordered less than or equal
    Ole,
    /// Ordered greater than
    Ogt,
    /// Ordered greater than or equal
    Oge,
    /// Unordered: true when either operand is NaN
    Uno,
}

impl std::fmt::Display for FloatPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FloatPredicate::Oeq => "oeq",
            FloatPredicate::One => "one",
            FloatPredicate::Olt => "olt",
            FloatPredicate::Ole => "ole",
            FloatPredicate::Ogt => "ogt",
            FloatPredicate::Oge => "oge",
            FloatPredicate::Uno => "uno",
        };
        write!(f, "{}", s)
    }
}

/// Conversion instructions between representations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CastKind {
    /// Sign-extend an integer
    Sext,
    /// Zero-extend an integer
    Zext,
    /// Truncate an integer
    Trunc,
    /// Widen a float
    FpExt,
    /// Narrow a float
    FpTrunc,
    /// Signed integer to float
    SiToFp,
    /// Float to signed integer
    FpToSi,
    /// Reinterpret a pointer as another pointer type
    PtrCast,
}

impl std::fmt::Display for CastKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CastKind::Sext => "sext",
            CastKind::Zext => "zext",
            CastKind::Trunc => "trunc",
            CastKind::FpExt => "fpext",
            CastKind::FpTrunc => "fptrunc",
            CastKind::SiToFp => "sitofp",
            CastKind::FpToSi => "fptosi",
            CastKind::PtrCast => "ptrcast",
        };
        write!(f, "{}", s)
    }
}

/// Hooks into the language runtime, called like ordinary functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RuntimeFn {
    /// One-time runtime initialization, called on entry to `main`
    Init,
    /// Heap allocation: `rt_alloc(size) -> *i8`
    Alloc,
    /// Array allocation: `rt_array_alloc(length, elem_size, rank) -> header`
    ArrayAlloc,
    /// Variadic formatted print, returns `i32`
    Print,
    /// Report a fatal runtime error and abort; never returns
    Error,
}

impl RuntimeFn {
    /// Symbol name of the runtime hook
    pub fn name(&self) -> &'static str {
        match self {
            RuntimeFn::Init => "rt_init",
            RuntimeFn::Alloc => "rt_alloc",
            RuntimeFn::ArrayAlloc => "rt_array_alloc",
            RuntimeFn::Print => "rt_print",
            RuntimeFn::Error => "rt_error",
        }
    }
}

impl std::fmt::Display for RuntimeFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A single IR instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IrInstr {
    /// Copy a value into a register
    Assign { dest: Register, value: IrValue },

    /// Allocate a stack slot for one value of `ty`; `dest` holds the address
    Alloca { dest: Register, ty: IrType },

    /// Load the pointee of `addr`
    Load { dest: Register, addr: Register },

    /// Store `value` through `addr`
    Store { addr: Register, value: IrValue },

    /// Integer arithmetic / bitwise operation
    IntBinary {
        dest: Register,
        op: IntBinaryOp,
        lhs: IrValue,
        rhs: IrValue,
    },

    /// Float arithmetic operation
    FloatBinary {
        dest: Register,
        op: FloatBinaryOp,
        lhs: IrValue,
        rhs: IrValue,
    },

    /// Signed integer comparison, producing `i1`
    IntCmp {
        dest: Register,
        pred: IntPredicate,
        lhs: IrValue,
        rhs: IrValue,
    },

    /// Float comparison, producing `i1`
    FloatCmp {
        dest: Register,
        pred: FloatPredicate,
        lhs: IrValue,
        rhs: IrValue,
    },

    /// Float negation
    FNeg { dest: Register, operand: IrValue },

    /// Representation conversion
    Cast {
        dest: Register,
        kind: CastKind,
        value: IrValue,
    },

    /// Address of field `index` of the struct `base` points at
    FieldAddr {
        dest: Register,
        base: Register,
        struct_id: StructId,
        index: u16,
    },

    /// Address of the element at `offset` from `base` (element-typed pointer)
    ElemAddr {
        dest: Register,
        base: Register,
        offset: IrValue,
    },

    /// Direct call to a function in this module
    Call {
        dest: Option<Register>,
        func: FunctionId,
        args: Vec<IrValue>,
    },

    /// Call into the language runtime
    RuntimeCall {
        dest: Option<Register>,
        func: RuntimeFn,
        args: Vec<IrValue>,
    },
}

impl IrInstr {
    /// The register this instruction writes, if any
    pub fn dest(&self) -> Option<&Register> {
        match self {
            IrInstr::Assign { dest, .. }
            | IrInstr::Alloca { dest, .. }
            | IrInstr::Load { dest, .. }
            | IrInstr::IntBinary { dest, .. }
            | IrInstr::FloatBinary { dest, .. }
            | IrInstr::IntCmp { dest, .. }
            | IrInstr::FloatCmp { dest, .. }
            | IrInstr::FNeg { dest, .. }
            | IrInstr::Cast { dest, .. }
            | IrInstr::FieldAddr { dest, .. }
            | IrInstr::ElemAddr { dest, .. } => Some(dest),
            IrInstr::Store { .. } => None,
            IrInstr::Call { dest, .. } | IrInstr::RuntimeCall { dest, .. } => dest.as_ref(),
        }
    }
}

fn fmt_args(f: &mut std::fmt::Formatter<'_>, args: &[IrValue]) -> std::fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", arg)?;
    }
    Ok(())
}

impl std::fmt::Display for IrInstr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IrInstr::Assign { dest, value } => write!(f, "{} = {}", dest, value),
            IrInstr::Alloca { dest, ty } => write!(f, "{} = alloca {}", dest, ty),
            IrInstr::Load { dest, addr } => write!(f, "{} = load {}", dest, addr),
            IrInstr::Store { addr, value } => write!(f, "store {}, {}", value, addr),
            IrInstr::IntBinary { dest, op, lhs, rhs } => {
                write!(f, "{} = {} {}, {}", dest, op, lhs, rhs)
            }
            IrInstr::FloatBinary { dest, op, lhs, rhs } => {
                write!(f, "{} = {} {}, {}", dest, op, lhs, rhs)
            }
            IrInstr::IntCmp { dest, pred, lhs, rhs } => {
                write!(f, "{} = icmp {} {}, {}", dest, pred, lhs, rhs)
            }
            IrInstr::FloatCmp { dest, pred, lhs, rhs } => {
                write!(f, "{} = fcmp {} {}, {}", dest, pred, lhs, rhs)
            }
            IrInstr::FNeg { dest, operand } => write!(f, "{} = fneg {}", dest, operand),
            IrInstr::Cast { dest, kind, value } => {
                write!(f, "{} = {} {}", dest, kind, value)
            }
            IrInstr::FieldAddr {
                dest,
                base,
                struct_id,
                index,
            } => write!(f, "{} = field_addr {}, {}, {}", dest, base, struct_id, index),
            IrInstr::ElemAddr { dest, base, offset } => {
                write!(f, "{} = elem_addr {}, {}", dest, base, offset)
            }
            IrInstr::Call { dest, func, args } => {
                if let Some(dest) = dest {
                    write!(f, "{} = call {}(", dest, func)?;
                } else {
                    write!(f, "call {}(", func)?;
                }
                fmt_args(f, args)?;
                write!(f, ")")
            }
            IrInstr::RuntimeCall { dest, func, args } => {
                if let Some(dest) = dest {
                    write!(f, "{} = call {}(", dest, func)?;
                } else {
                    write!(f, "call {}(", func)?;
                }
                fmt_args(f, args)?;
                write!(f, ")")
            }
        }
    }
}
