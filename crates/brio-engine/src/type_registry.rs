//! Brio value types and their IR mapping
//!
//! `ValueType` is the source-level type a lowered expression carries;
//! `Value` pairs it with the stack slot holding the current value. All
//! emission goes through the lowerer, this module is the pure data side.

use std::fmt;

use crate::ast::{Span, TypeName};
use crate::context::CompilationContext;
use crate::error::{CompileError, CompileResult};
use crate::ir::{IrType, Register};

/// A source-level type as the lowering passes see it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueType {
    /// 1-bit boolean
    Boolean,
    /// 8-bit signed integer
    Int8,
    /// 16-bit signed integer
    Int16,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 16-bit float
    Float16,
    /// 32-bit float
    Float32,
    /// 64-bit float
    Float64,
    /// Immutable string, a pointer at the IR level
    Str,
    /// Array with the given element type, a pointer to the runtime header
    Array(Box<ValueType>),
    /// Instance of a user-declared class, a pointer to its struct
    Class(String),
    /// The absent value; produced by void calls, unreadable
    Null,
}

impl ValueType {
    /// Map a declared type annotation to its value type
    pub fn from_decl(decl: &TypeName) -> ValueType {
        match decl {
            TypeName::Boolean => ValueType::Boolean,
            TypeName::Int8 => ValueType::Int8,
            TypeName::Int16 => ValueType::Int16,
            TypeName::Int32 => ValueType::Int32,
            TypeName::Int64 => ValueType::Int64,
            TypeName::Float16 => ValueType::Float16,
            TypeName::Float32 => ValueType::Float32,
            TypeName::Float64 => ValueType::Float64,
            TypeName::Str => ValueType::Str,
            TypeName::Array(elem) => ValueType::Array(Box::new(ValueType::from_decl(elem))),
            TypeName::Class(name) => ValueType::Class(name.clone()),
        }
    }

    /// Resolve a bare name used in type position (`int`, `float32`, a class
    /// name). `int` and `float` alias their 64-bit forms.
    pub fn resolve(name: &str, ctx: &CompilationContext) -> Option<ValueType> {
        let ty = match name {
            "boolean" => ValueType::Boolean,
            "int8" => ValueType::Int8,
            "int16" => ValueType::Int16,
            "int32" => ValueType::Int32,
            "int64" | "int" => ValueType::Int64,
            "float16" => ValueType::Float16,
            "float32" => ValueType::Float32,
            "float64" | "float" => ValueType::Float64,
            "string" => ValueType::Str,
            _ => {
                if ctx.has_class(name) {
                    ValueType::Class(name.to_string())
                } else {
                    return None;
                }
            }
        };
        Some(ty)
    }

    /// Check that every class named inside this type is declared
    pub fn validate(&self, ctx: &CompilationContext, span: Span) -> CompileResult<()> {
        match self {
            ValueType::Array(elem) => elem.validate(ctx, span),
            ValueType::Class(name) => {
                if ctx.has_class(name) {
                    Ok(())
                } else {
                    Err(CompileError::UndefinedClass {
                        name: name.clone(),
                        span,
                    })
                }
            }
            _ => Ok(()),
        }
    }

    /// True for the signed integer types (boolean included, it is i1)
    pub fn is_int(&self) -> bool {
        matches!(
            self,
            ValueType::Boolean
                | ValueType::Int8
                | ValueType::Int16
                | ValueType::Int32
                | ValueType::Int64
        )
    }

    /// True for the float types
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            ValueType::Float16 | ValueType::Float32 | ValueType::Float64
        )
    }

    /// True for types represented as a pointer at the IR level
    pub fn is_pointer_shaped(&self) -> bool {
        matches!(
            self,
            ValueType::Str | ValueType::Array(_) | ValueType::Class(_)
        )
    }

    /// The IR type values of this type occupy. Classes must be predeclared
    /// before any repr query; an unknown class degrades to `*i8`.
    pub fn repr(&self, ctx: &CompilationContext) -> IrType {
        match self {
            ValueType::Boolean => IrType::I1,
            ValueType::Int8 => IrType::I8,
            ValueType::Int16 => IrType::I16,
            ValueType::Int32 => IrType::I32,
            ValueType::Int64 => IrType::I64,
            ValueType::Float16 => IrType::F16,
            ValueType::Float32 => IrType::F32,
            ValueType::Float64 => IrType::F64,
            ValueType::Str => IrType::ptr(IrType::I8),
            ValueType::Null => IrType::ptr(IrType::I8),
            ValueType::Array(_) => IrType::ptr(IrType::Struct(ctx.array_struct())),
            ValueType::Class(name) => match ctx.class_struct_id(name) {
                Some(id) => IrType::ptr(IrType::Struct(id)),
                None => IrType::ptr(IrType::I8),
            },
        }
    }

    /// Byte size of one element of this type in array storage. Booleans
    /// pack to one byte, pointer-shaped types to eight.
    pub fn elem_size(&self) -> i64 {
        match self {
            ValueType::Boolean | ValueType::Int8 => 1,
            ValueType::Int16 | ValueType::Float16 => 2,
            ValueType::Int32 | ValueType::Float32 => 4,
            ValueType::Int64
            | ValueType::Float64
            | ValueType::Str
            | ValueType::Array(_)
            | ValueType::Class(_)
            | ValueType::Null => 8,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Boolean => write!(f, "boolean"),
            ValueType::Int8 => write!(f, "int8"),
            ValueType::Int16 => write!(f, "int16"),
            ValueType::Int32 => write!(f, "int32"),
            ValueType::Int64 => write!(f, "int64"),
            ValueType::Float16 => write!(f, "float16"),
            ValueType::Float32 => write!(f, "float32"),
            ValueType::Float64 => write!(f, "float64"),
            ValueType::Str => write!(f, "string"),
            ValueType::Array(elem) => write!(f, "[]{}", elem),
            ValueType::Class(name) => write!(f, "{}", name),
            ValueType::Null => write!(f, "null"),
        }
    }
}

/// A lowered value: its source type and the stack slot holding it.
/// The slot register has pointer type; reads load from it, writes store
/// through it. `Null` values carry no slot and fail on any read.
#[derive(Debug, Clone)]
pub struct Value {
    /// Source-level type
    pub ty: ValueType,
    /// The alloca backing this value, `None` only for null
    pub slot: Option<Register>,
}

impl Value {
    /// A value backed by the given slot
    pub fn new(ty: ValueType, slot: Register) -> Self {
        Self {
            ty,
            slot: Some(slot),
        }
    }

    /// The absent value
    pub fn null() -> Self {
        Self {
            ty: ValueType::Null,
            slot: None,
        }
    }

    /// True if this is the absent value
    pub fn is_null(&self) -> bool {
        matches!(self.ty, ValueType::Null)
    }
}
