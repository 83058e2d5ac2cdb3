//! Array lowering
//!
//! Arrays are runtime-managed blocks behind a header struct:
//! `{ length: i64, rank: i64, shape: *i64, data: *i8 }`. Creation calls
//! `rt_array_alloc` with the flattened length, element size, and rank,
//! then fills the shape buffer. Every indexed access casts its indices
//! to i64, checks them against the shape, and traps on violation; the
//! element offset folds row-major over the shape at each access.

use crate::ast::Span;
use crate::error::{CompileError, CompileResult};
use crate::ir::{
    CastKind, IntBinaryOp, IntPredicate, IrInstr, IrType, IrValue, Register, RuntimeFn,
};
use crate::type_registry::{Value, ValueType};

use super::Lowerer;

/// Slot index of the shape buffer pointer in the array header
pub(crate) const SHAPE_FIELD: u16 = 2;
/// Slot index of the data pointer in the array header
pub(crate) const DATA_FIELD: u16 = 3;

/// Field representations of the array header struct, in slot order:
/// flattened length, rank, shape buffer, data pointer
pub(crate) fn array_header_fields() -> Vec<IrType> {
    vec![
        IrType::I64,
        IrType::I64,
        IrType::ptr(IrType::I64),
        IrType::ptr(IrType::I8),
    ]
}

impl Lowerer<'_> {
    /// Allocate an array of `elem` with the given dimensions and return
    /// the header pointer as a value of type `[]elem`
    pub(crate) fn array_create(
        &mut self,
        elem: &ValueType,
        dims: &[Value],
        span: Span,
    ) -> CompileResult<Value> {
        if dims.is_empty() {
            return Err(CompileError::InternalError {
                message: "array creation with no dimensions".to_string(),
            });
        }

        let mut dim_regs = Vec::with_capacity(dims.len());
        for dim in dims {
            let cast = self.cast_value(dim, &ValueType::Int64, span)?;
            dim_regs.push(cast.load(self)?);
        }

        // flattened length is the product of all dimensions
        let mut length: IrValue = dim_regs[0].clone().into();
        for dim in &dim_regs[1..] {
            let dest = self.alloc_register(IrType::I64);
            self.emit(IrInstr::IntBinary {
                dest: dest.clone(),
                op: IntBinaryOp::Mul,
                lhs: length,
                rhs: dim.clone().into(),
            });
            length = dest.into();
        }

        let struct_id = self.ctx.array_struct();
        let header = self.alloc_register(IrType::ptr(IrType::Struct(struct_id)));
        self.emit(IrInstr::RuntimeCall {
            dest: Some(header.clone()),
            func: RuntimeFn::ArrayAlloc,
            args: vec![
                length,
                IrValue::int(elem.elem_size(), IrType::I64),
                IrValue::int(dims.len() as i64, IrType::I64),
            ],
        });

        let shape = self.load_header_field(&header, SHAPE_FIELD, IrType::ptr(IrType::I64));
        for (k, dim) in dim_regs.iter().enumerate() {
            let slot = self.alloc_register(IrType::ptr(IrType::I64));
            self.emit(IrInstr::ElemAddr {
                dest: slot.clone(),
                base: shape.clone(),
                offset: IrValue::int(k as i64, IrType::I64),
            });
            self.emit(IrInstr::Store {
                addr: slot,
                value: dim.clone().into(),
            });
        }

        let ty = ValueType::Array(Box::new(elem.clone()));
        Ok(self.value_from_register(&ty, header))
    }

    /// Load the element at `indices`
    pub(crate) fn array_load_index(
        &mut self,
        array: &Value,
        indices: &[Value],
        span: Span,
    ) -> CompileResult<Value> {
        let (addr, elem) = self.array_elem_addr(array, indices, span)?;
        let dest = self.alloc_register(elem.repr(self.ctx));
        self.emit(IrInstr::Load {
            dest: dest.clone(),
            addr,
        });
        Ok(self.value_from_register(&elem, dest))
    }

    /// Store `value` into the element at `indices`, casting it to the
    /// element type
    pub(crate) fn array_store_index(
        &mut self,
        array: &Value,
        indices: &[Value],
        value: &Value,
        span: Span,
    ) -> CompileResult<()> {
        let (addr, elem) = self.array_elem_addr(array, indices, span)?;
        let cast = self.cast_value(value, &elem, span)?;
        let reg = cast.load(self)?;
        self.emit(IrInstr::Store {
            addr,
            value: reg.into(),
        });
        Ok(())
    }

    /// Compute the checked address of the element at `indices`. Each
    /// index is cast to i64, trapped when negative or past its shape
    /// dimension, and folded row-major into the flat offset.
    fn array_elem_addr(
        &mut self,
        array: &Value,
        indices: &[Value],
        span: Span,
    ) -> CompileResult<(Register, ValueType)> {
        let elem = match &array.ty {
            ValueType::Array(elem) => (**elem).clone(),
            other => {
                return Err(CompileError::InvalidOperands {
                    op: "[]".to_string(),
                    left: other.to_string(),
                    right: format!("{} indices", indices.len()),
                    span,
                })
            }
        };
        if indices.is_empty() {
            return Err(CompileError::InternalError {
                message: "indexed access with no indices".to_string(),
            });
        }

        let header = array.load(self)?;
        let shape = self.load_header_field(&header, SHAPE_FIELD, IrType::ptr(IrType::I64));

        let mut acc: Option<IrValue> = None;
        for (k, index) in indices.iter().enumerate() {
            let cast = self.cast_value(index, &ValueType::Int64, span)?;
            let idx = cast.load(self)?;

            let neg = self.icmp(
                IntPredicate::Slt,
                idx.clone().into(),
                IrValue::int(0, IrType::I64),
            );
            self.trap_if(neg, "array index < 0", "idx");

            let dim_slot = self.alloc_register(IrType::ptr(IrType::I64));
            self.emit(IrInstr::ElemAddr {
                dest: dim_slot.clone(),
                base: shape.clone(),
                offset: IrValue::int(k as i64, IrType::I64),
            });
            let dim = self.alloc_register(IrType::I64);
            self.emit(IrInstr::Load {
                dest: dim.clone(),
                addr: dim_slot,
            });
            let oob = self.icmp(IntPredicate::Sge, idx.clone().into(), dim.clone().into());
            self.trap_if(oob, "array index out of bounds", "idx");

            acc = Some(match acc {
                None => idx.into(),
                Some(prev) => {
                    let scaled = self.alloc_register(IrType::I64);
                    self.emit(IrInstr::IntBinary {
                        dest: scaled.clone(),
                        op: IntBinaryOp::Mul,
                        lhs: prev,
                        rhs: dim.into(),
                    });
                    let sum = self.alloc_register(IrType::I64);
                    self.emit(IrInstr::IntBinary {
                        dest: sum.clone(),
                        op: IntBinaryOp::Add,
                        lhs: scaled.into(),
                        rhs: idx.into(),
                    });
                    sum.into()
                }
            });
        }
        let offset = match acc {
            Some(offset) => offset,
            None => IrValue::int(0, IrType::I64),
        };

        let data = self.load_header_field(&header, DATA_FIELD, IrType::ptr(IrType::I8));
        let elem_repr = elem.repr(self.ctx);
        let typed = self.alloc_register(IrType::ptr(elem_repr.clone()));
        self.emit(IrInstr::Cast {
            dest: typed.clone(),
            kind: CastKind::PtrCast,
            value: data.into(),
        });
        let addr = self.alloc_register(IrType::ptr(elem_repr));
        self.emit(IrInstr::ElemAddr {
            dest: addr.clone(),
            base: typed,
            offset,
        });
        Ok((addr, elem))
    }

    /// Load one header field of an array
    fn load_header_field(&mut self, header: &Register, index: u16, ty: IrType) -> Register {
        let addr = self.alloc_register(IrType::ptr(ty.clone()));
        self.emit(IrInstr::FieldAddr {
            dest: addr.clone(),
            base: header.clone(),
            struct_id: self.ctx.array_struct(),
            index,
        });
        let dest = self.alloc_register(ty);
        self.emit(IrInstr::Load {
            dest: dest.clone(),
            addr,
        });
        dest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CompilationContext;
    use crate::ir::IrFunction;

    fn make_lowerer(ctx: &CompilationContext) -> Lowerer<'_> {
        Lowerer::new(ctx, IrFunction::new("t", vec![], None))
    }

    fn all_instrs(lowerer: &Lowerer<'_>) -> Vec<IrInstr> {
        lowerer
            .func
            .blocks()
            .flat_map(|b| b.instructions.iter().cloned())
            .collect()
    }

    #[test]
    fn test_create_rank_two() {
        let ctx = CompilationContext::new();
        let mut lowerer = make_lowerer(&ctx);
        let rows = lowerer.build(&ValueType::Int64);
        let cols = lowerer.build(&ValueType::Int64);
        let arr = lowerer
            .array_create(&ValueType::Int32, &[rows, cols], Span::default())
            .unwrap();
        assert_eq!(arr.ty, ValueType::Array(Box::new(ValueType::Int32)));

        let instrs = all_instrs(&lowerer);
        let alloc_args = instrs
            .iter()
            .find_map(|i| match i {
                IrInstr::RuntimeCall {
                    func: RuntimeFn::ArrayAlloc,
                    args,
                    ..
                } => Some(args.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(alloc_args.len(), 3);
        assert_eq!(alloc_args[1], IrValue::int(4, IrType::I64));
        assert_eq!(alloc_args[2], IrValue::int(2, IrType::I64));

        // two dimensions written into the shape buffer
        let shape_stores = instrs
            .iter()
            .filter(|i| matches!(i, IrInstr::ElemAddr { .. }))
            .count();
        assert_eq!(shape_stores, 2);
    }

    #[test]
    fn test_load_checks_both_bounds() {
        let ctx = CompilationContext::new();
        let mut lowerer = make_lowerer(&ctx);
        let size = lowerer.build(&ValueType::Int64);
        let arr = lowerer
            .array_create(&ValueType::Float64, &[size], Span::default())
            .unwrap();
        let idx = lowerer.build(&ValueType::Int64);
        let elem = lowerer
            .array_load_index(&arr, &[idx], Span::default())
            .unwrap();
        assert_eq!(elem.ty, ValueType::Float64);

        // one trap pair per check: negative index and out of bounds
        assert_eq!(lowerer.func.block_count(), 5);
        let messages: Vec<String> = all_instrs(&lowerer)
            .into_iter()
            .filter_map(|i| match i {
                IrInstr::RuntimeCall {
                    func: RuntimeFn::Error,
                    args,
                    ..
                } => match args.first() {
                    Some(IrValue::Constant(crate::ir::IrConstant::Str(s))) => Some(s.clone()),
                    _ => None,
                },
                _ => None,
            })
            .collect();
        assert_eq!(messages, vec!["array index < 0", "array index out of bounds"]);
    }

    #[test]
    fn test_store_casts_to_element_type() {
        let ctx = CompilationContext::new();
        let mut lowerer = make_lowerer(&ctx);
        let size = lowerer.build(&ValueType::Int64);
        let arr = lowerer
            .array_create(&ValueType::Int16, &[size], Span::default())
            .unwrap();
        let idx = lowerer.build(&ValueType::Int64);
        let value = lowerer.build(&ValueType::Int64);
        lowerer
            .array_store_index(&arr, &[idx], &value, Span::default())
            .unwrap();

        // the stored i64 narrows to i16, adding a range trap beyond the
        // two index checks
        let truncs = all_instrs(&lowerer)
            .iter()
            .filter(|i| matches!(
                i,
                IrInstr::Cast {
                    kind: CastKind::Trunc,
                    ..
                }
            ))
            .count();
        assert_eq!(truncs, 1);
        assert_eq!(lowerer.func.block_count(), 7);
    }

    #[test]
    fn test_index_of_non_array() {
        let ctx = CompilationContext::new();
        let mut lowerer = make_lowerer(&ctx);
        let not_array = lowerer.build(&ValueType::Int64);
        let idx = lowerer.build(&ValueType::Int64);
        let err = lowerer
            .array_load_index(&not_array, &[idx], Span::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::InvalidOperands { .. }));
    }

    #[test]
    fn test_nested_element_type() {
        let ctx = CompilationContext::new();
        let mut lowerer = make_lowerer(&ctx);
        let size = lowerer.build(&ValueType::Int64);
        let inner = ValueType::Array(Box::new(ValueType::Int64));
        let arr = lowerer
            .array_create(&inner, &[size], Span::default())
            .unwrap();
        let idx = lowerer.build(&ValueType::Int64);
        let elem = lowerer
            .array_load_index(&arr, &[idx], Span::default())
            .unwrap();
        // indexing [][]int64 once yields []int64, an eight-byte pointer
        assert_eq!(elem.ty, inner);
        assert_eq!(inner.elem_size(), 8);
    }

    #[test]
    fn test_header_layout() {
        let fields = array_header_fields();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0], IrType::I64);
        assert_eq!(fields[1], IrType::I64);
        assert_eq!(fields[SHAPE_FIELD as usize], IrType::ptr(IrType::I64));
        assert_eq!(fields[DATA_FIELD as usize], IrType::ptr(IrType::I8));
    }
}
