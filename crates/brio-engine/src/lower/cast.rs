//! Implicit casts
//!
//! Values adopt the type of the position they flow into: initializers,
//! assignments, arguments, return values, array elements. Widening
//! conversions are free; every narrowing conversion is range-checked at
//! runtime and traps instead of wrapping. Pointer-shaped types never
//! convert, they only match exactly.

use crate::ast::Span;
use crate::error::{CompileError, CompileResult};
use crate::ir::{CastKind, FloatPredicate, IntPredicate, IrInstr, IrType, IrValue, Register};
use crate::type_registry::{Value, ValueType};

use super::Lowerer;

/// Largest value an integer type holds
fn int_max(ty: &ValueType) -> i64 {
    match ty {
        ValueType::Boolean => 1,
        ValueType::Int8 => i64::from(i8::MAX),
        ValueType::Int16 => i64::from(i16::MAX),
        ValueType::Int32 => i64::from(i32::MAX),
        _ => i64::MAX,
    }
}

/// Smallest value an integer type holds
fn int_min(ty: &ValueType) -> i64 {
    match ty {
        ValueType::Boolean => 0,
        ValueType::Int8 => i64::from(i8::MIN),
        ValueType::Int16 => i64::from(i16::MIN),
        ValueType::Int32 => i64::from(i32::MIN),
        _ => i64::MIN,
    }
}

/// Largest finite value a float type holds
fn float_max(ty: &ValueType) -> f64 {
    match ty {
        ValueType::Float16 => 65504.0,
        ValueType::Float32 => f64::from(f32::MAX),
        _ => f64::MAX,
    }
}

/// Bit width of an integer value type
fn int_bits(ty: &ValueType) -> u32 {
    match ty {
        ValueType::Boolean => 1,
        ValueType::Int8 => 8,
        ValueType::Int16 => 16,
        ValueType::Int32 => 32,
        _ => 64,
    }
}

/// Bit width of a float value type
fn float_bits(ty: &ValueType) -> u32 {
    match ty {
        ValueType::Float16 => 16,
        ValueType::Float32 => 32,
        _ => 64,
    }
}

impl Lowerer<'_> {
    /// Cast `value` to `target`, returning a value of the target type.
    /// A cast to the value's own type is a no-op returning the same slot.
    pub(crate) fn cast_value(
        &mut self,
        value: &Value,
        target: &ValueType,
        span: Span,
    ) -> CompileResult<Value> {
        if value.ty == *target {
            return Ok(value.clone());
        }
        if value.is_null() {
            return Err(CompileError::InternalError {
                message: "read from a null value".to_string(),
            });
        }
        match target {
            ValueType::Boolean => self.cast_to_boolean(value, span),
            ValueType::Int8 | ValueType::Int16 | ValueType::Int32 | ValueType::Int64 => {
                self.cast_to_int(value, target, span)
            }
            ValueType::Float16 | ValueType::Float32 | ValueType::Float64 => {
                self.cast_to_float(value, target, span)
            }
            ValueType::Str | ValueType::Array(_) | ValueType::Class(_) | ValueType::Null => {
                Err(invalid_cast(value, target, span))
            }
        }
    }

    /// Numeric to boolean: true exactly when the value is non-zero
    fn cast_to_boolean(&mut self, value: &Value, span: Span) -> CompileResult<Value> {
        let src = value.load(self)?;
        let cmp = if value.ty.is_int() {
            let zero = IrValue::int(0, src.ty.clone());
            self.icmp(IntPredicate::Ne, src.into(), zero)
        } else if value.ty.is_float() {
            let zero = IrValue::float(0.0, src.ty.clone());
            self.fcmp(FloatPredicate::One, src.into(), zero)
        } else {
            return Err(invalid_cast(value, &ValueType::Boolean, span));
        };
        Ok(self.value_from_register(&ValueType::Boolean, cmp))
    }

    fn cast_to_int(
        &mut self,
        value: &Value,
        target: &ValueType,
        span: Span,
    ) -> CompileResult<Value> {
        if value.ty.is_int() {
            let src = value.load(self)?;
            let src_bits = int_bits(&value.ty);
            let dst_bits = int_bits(target);
            let dest = self.alloc_register(target.repr(self.ctx));
            if src_bits < dst_bits {
                // booleans zero-extend so true widens to 1
                let kind = if value.ty == ValueType::Boolean {
                    CastKind::Zext
                } else {
                    CastKind::Sext
                };
                self.emit(IrInstr::Cast {
                    dest: dest.clone(),
                    kind,
                    value: src.into(),
                });
            } else {
                self.guard_int_range(&src, target);
                self.emit(IrInstr::Cast {
                    dest: dest.clone(),
                    kind: CastKind::Trunc,
                    value: src.into(),
                });
            }
            return Ok(self.value_from_register(target, dest));
        }

        if value.ty.is_float() {
            let src = value.load(self)?;
            let wide = self.promote_to_f64(src.clone());
            let lo = self.fcmp(
                FloatPredicate::Olt,
                wide.clone().into(),
                IrValue::float(int_min(target) as f64, IrType::F64),
            );
            let hi = self.fcmp(
                FloatPredicate::Ogt,
                wide.clone().into(),
                IrValue::float(int_max(target) as f64, IrType::F64),
            );
            let range = self.or_i1(lo, hi);
            let nan = self.fcmp(FloatPredicate::Uno, wide.clone().into(), wide.into());
            let out = self.or_i1(range, nan);
            self.trap_if(out, "runtime overflow in float to int cast", "fptosi");
            let dest = self.alloc_register(target.repr(self.ctx));
            self.emit(IrInstr::Cast {
                dest: dest.clone(),
                kind: CastKind::FpToSi,
                value: src.into(),
            });
            return Ok(self.value_from_register(target, dest));
        }

        Err(invalid_cast(value, target, span))
    }

    fn cast_to_float(
        &mut self,
        value: &Value,
        target: &ValueType,
        span: Span,
    ) -> CompileResult<Value> {
        if value.ty.is_float() {
            let src = value.load(self)?;
            let dest = self.alloc_register(target.repr(self.ctx));
            if float_bits(&value.ty) < float_bits(target) {
                self.emit(IrInstr::Cast {
                    dest: dest.clone(),
                    kind: CastKind::FpExt,
                    value: src.into(),
                });
            } else {
                let wide = self.promote_to_f64(src.clone());
                self.guard_float_range(&wide, target, "fdowncast", "runtime overflow in float downcast");
                self.emit(IrInstr::Cast {
                    dest: dest.clone(),
                    kind: CastKind::FpTrunc,
                    value: src.into(),
                });
            }
            return Ok(self.value_from_register(target, dest));
        }

        if value.ty.is_int() {
            let mut src = value.load(self)?;
            if value.ty == ValueType::Boolean {
                let byte = self.alloc_register(IrType::I8);
                self.emit(IrInstr::Cast {
                    dest: byte.clone(),
                    kind: CastKind::Zext,
                    value: src.into(),
                });
                src = byte;
            }
            let wide = self.alloc_register(IrType::F64);
            self.emit(IrInstr::Cast {
                dest: wide.clone(),
                kind: CastKind::SiToFp,
                value: src.clone().into(),
            });
            self.guard_float_range(&wide, target, "sitofp", "runtime overflow in int to float cast");
            let dest = self.alloc_register(target.repr(self.ctx));
            self.emit(IrInstr::Cast {
                dest: dest.clone(),
                kind: CastKind::SiToFp,
                value: src.into(),
            });
            return Ok(self.value_from_register(target, dest));
        }

        Err(invalid_cast(value, target, span))
    }

    /// Trap unless `src` fits the integer range of `target`, comparing
    /// in the source width
    fn guard_int_range(&mut self, src: &Register, target: &ValueType) {
        let min = IrValue::int(int_min(target), src.ty.clone());
        let max = IrValue::int(int_max(target), src.ty.clone());
        let lo = self.icmp(IntPredicate::Slt, src.clone().into(), min);
        let hi = self.icmp(IntPredicate::Sgt, src.clone().into(), max);
        let out = self.or_i1(lo, hi);
        self.trap_if(out, "runtime overflow in int downcast", "downcast");
    }

    /// Trap unless the f64 register `wide` fits the finite range of the
    /// float type `target`
    fn guard_float_range(&mut self, wide: &Register, target: &ValueType, stem: &str, message: &str) {
        let max = float_max(target);
        let lo = self.fcmp(
            FloatPredicate::Olt,
            wide.clone().into(),
            IrValue::float(-max, IrType::F64),
        );
        let hi = self.fcmp(
            FloatPredicate::Ogt,
            wide.clone().into(),
            IrValue::float(max, IrType::F64),
        );
        let out = self.or_i1(lo, hi);
        self.trap_if(out, message, stem);
    }

    /// Widen a float register to f64, a no-op when it already is one
    pub(crate) fn promote_to_f64(&mut self, reg: Register) -> Register {
        if reg.ty == IrType::F64 {
            return reg;
        }
        let dest = self.alloc_register(IrType::F64);
        self.emit(IrInstr::Cast {
            dest: dest.clone(),
            kind: CastKind::FpExt,
            value: reg.into(),
        });
        dest
    }
}

fn invalid_cast(value: &Value, target: &ValueType, span: Span) -> CompileError {
    CompileError::InvalidCast {
        from: value.ty.to_string(),
        to: target.to_string(),
        span,
    }
}
