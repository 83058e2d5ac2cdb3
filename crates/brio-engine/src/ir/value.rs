//! IR Values and Registers
//!
//! Virtual registers carry their physical type. Constants are typed so that
//! every operand of every instruction has a known representation.

use serde::Serialize;

/// Identifier of a struct type registered in the module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StructId(pub u32);

impl StructId {
    /// Wraps a raw id
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw id value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for StructId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Physical type of a register, constant, or memory slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IrType {
    /// 1-bit integer (booleans, comparison results)
    I1,
    /// 8-bit signed integer
    I8,
    /// 16-bit signed integer
    I16,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 16-bit float
    F16,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Pointer to another type
    Ptr(Box<IrType>),
    /// A struct registered in the module
    Struct(StructId),
}

impl IrType {
    /// Pointer to `inner`
    pub fn ptr(inner: IrType) -> Self {
        IrType::Ptr(Box::new(inner))
    }

    /// True for the integer family (including `I1`)
    pub fn is_int(&self) -> bool {
        matches!(
            self,
            IrType::I1 | IrType::I8 | IrType::I16 | IrType::I32 | IrType::I64
        )
    }

    /// True for the float family
    pub fn is_float(&self) -> bool {
        matches!(self, IrType::F16 | IrType::F32 | IrType::F64)
    }

    /// True for pointers
    pub fn is_ptr(&self) -> bool {
        matches!(self, IrType::Ptr(_))
    }

    /// Bit width of an integer type
    pub fn int_bits(&self) -> Option<u32> {
        match self {
            IrType::I1 => Some(1),
            IrType::I8 => Some(8),
            IrType::I16 => Some(16),
            IrType::I32 => Some(32),
            IrType::I64 => Some(64),
            _ => None,
        }
    }

    /// Bit width of a float type
    pub fn float_bits(&self) -> Option<u32> {
        match self {
            IrType::F16 => Some(16),
            IrType::F32 => Some(32),
            IrType::F64 => Some(64),
            _ => None,
        }
    }

    /// The pointee type, for pointers
    pub fn pointee(&self) -> Option<&IrType> {
        match self {
            IrType::Ptr(inner) => Some(inner),
            _ => None,
        }
    }
}

impl std::fmt::Display for IrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IrType::I1 => write!(f, "i1"),
            IrType::I8 => write!(f, "i8"),
            IrType::I16 => write!(f, "i16"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::F16 => write!(f, "f16"),
            IrType::F32 => write!(f, "f32"),
            IrType::F64 => write!(f, "f64"),
            IrType::Ptr(inner) => write!(f, "*{}", inner),
            IrType::Struct(id) => write!(f, "{}", id),
        }
    }
}

/// Virtual register identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct RegisterId(pub u32);

impl RegisterId {
    /// Wraps a raw id
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw id value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for RegisterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A typed virtual register
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Register {
    /// Unique id within the function
    pub id: RegisterId,
    /// Physical type of the value the register holds
    pub ty: IrType,
}

impl Register {
    /// Create a new register
    pub fn new(id: RegisterId, ty: IrType) -> Self {
        Self { id, ty }
    }
}

impl std::fmt::Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.id, self.ty)
    }
}

/// A typed constant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IrConstant {
    /// Boolean constant (`i1`)
    Bool(bool),
    /// Integer constant of the given width
    Int { value: i64, ty: IrType },
    /// Float constant of the given width
    Float { value: f64, ty: IrType },
    /// String constant (pointer to interned bytes)
    Str(String),
    /// Null pointer of the given pointer type
    Null(IrType),
}

impl IrConstant {
    /// Physical type of the constant
    pub fn ty(&self) -> IrType {
        match self {
            IrConstant::Bool(_) => IrType::I1,
            IrConstant::Int { ty, .. } => ty.clone(),
            IrConstant::Float { ty, .. } => ty.clone(),
            IrConstant::Str(_) => IrType::ptr(IrType::I8),
            IrConstant::Null(ty) => ty.clone(),
        }
    }
}

impl std::fmt::Display for IrConstant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IrConstant::Bool(v) => write!(f, "{}", v),
            IrConstant::Int { value, .. } => write!(f, "{}", value),
            IrConstant::Float { value, .. } => write!(f, "{}", value),
            IrConstant::Str(s) => write!(f, "{:?}", s),
            IrConstant::Null(_) => write!(f, "null"),
        }
    }
}

/// An operand: either a register or a constant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum IrValue {
    /// Value held in a register
    Register(Register),
    /// Immediate constant
    Constant(IrConstant),
}

impl IrValue {
    /// Integer constant operand
    pub fn int(value: i64, ty: IrType) -> Self {
        IrValue::Constant(IrConstant::Int { value, ty })
    }

    /// Float constant operand
    pub fn float(value: f64, ty: IrType) -> Self {
        IrValue::Constant(IrConstant::Float { value, ty })
    }

    /// Boolean constant operand
    pub fn bool(value: bool) -> Self {
        IrValue::Constant(IrConstant::Bool(value))
    }

    /// Null pointer constant operand
    pub fn null(ty: IrType) -> Self {
        IrValue::Constant(IrConstant::Null(ty))
    }

    /// String constant operand
    pub fn str(value: impl Into<String>) -> Self {
        IrValue::Constant(IrConstant::Str(value.into()))
    }

    /// Physical type of the operand
    pub fn ty(&self) -> IrType {
        match self {
            IrValue::Register(r) => r.ty.clone(),
            IrValue::Constant(c) => c.ty(),
        }
    }
}

impl From<Register> for IrValue {
    fn from(r: Register) -> Self {
        IrValue::Register(r)
    }
}

impl std::fmt::Display for IrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IrValue::Register(r) => write!(f, "{}", r),
            IrValue::Constant(c) => write!(f, "{}", c),
        }
    }
}
