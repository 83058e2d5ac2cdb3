//! Expression Lowering
//!
//! Every expression lowers to a slot-backed `Value`. Numeric literals
//! are always f64 and adopt narrower types through implicit casts at
//! the position they flow into. Arithmetic and comparisons coerce both
//! operands to f64, except comparisons of two pointer-shaped values,
//! which compare addresses directly.

use crate::ast::{self, BinaryCategory, BinaryOp, Expression, PrefixOp};
use crate::context::MethodInfo;
use crate::error::{CompileError, CompileResult};
use crate::ir::{
    CastKind, FloatBinaryOp, FloatPredicate, IntBinaryOp, IntPredicate, IrConstant, IrInstr,
    IrType, IrValue, Register,
};
use crate::type_registry::{Value, ValueType};

use super::Lowerer;

impl Lowerer<'_> {
    /// Lower an expression to a value
    pub(crate) fn lower_expr(&mut self, expr: &Expression) -> CompileResult<Value> {
        match expr {
            Expression::Symbol(sym) => self.lower_symbol(sym),
            Expression::Number(num) => Ok(self.const_value(
                ValueType::Float64,
                IrConstant::Float {
                    value: num.value,
                    ty: IrType::F64,
                },
            )),
            Expression::Str(lit) => {
                Ok(self.const_value(ValueType::Str, IrConstant::Str(lit.value.clone())))
            }
            Expression::Prefix(prefix) => self.lower_prefix(prefix),
            Expression::Binary(binary) => self.lower_binary(binary),
            Expression::Member(member) => self.lower_member(member),
            Expression::Indexed(indexed) => self.lower_indexed(indexed),
            Expression::Call(call) => self.lower_call(call),
            Expression::New(new) => self.lower_new(new),
            Expression::Assignment(assign) => self.lower_assignment(assign),
            Expression::Range(_) => Err(CompileError::InternalError {
                message: "range expression outside a foreach loop".to_string(),
            }),
        }
    }

    fn lower_symbol(&mut self, sym: &ast::SymbolExpr) -> CompileResult<Value> {
        if let Some(value) = self.scope.lookup(&sym.name) {
            return Ok(value.clone());
        }
        // a bare type name in value position builds a zero placeholder,
        // which is how array.create receives its element type
        if let Some(ty) = ValueType::resolve(&sym.name, self.ctx) {
            return Ok(self.build(&ty));
        }
        Err(CompileError::UndefinedVariable {
            name: sym.name.clone(),
            span: sym.span,
        })
    }

    fn lower_prefix(&mut self, prefix: &ast::PrefixExpr) -> CompileResult<Value> {
        let operand = self.lower_expr(&prefix.operand)?;
        match prefix.op {
            PrefixOp::Neg => {
                let float = self.cast_value(&operand, &ValueType::Float64, prefix.span)?;
                let reg = float.load(self)?;
                let dest = self.alloc_register(IrType::F64);
                self.emit(IrInstr::FNeg {
                    dest: dest.clone(),
                    operand: reg.into(),
                });
                Ok(self.value_from_register(&ValueType::Float64, dest))
            }
            PrefixOp::Not => {
                let boolean = self.cast_value(&operand, &ValueType::Boolean, prefix.span)?;
                let reg = boolean.load(self)?;
                let dest = self.alloc_register(IrType::I1);
                self.emit(IrInstr::IntBinary {
                    dest: dest.clone(),
                    op: IntBinaryOp::Xor,
                    lhs: reg.into(),
                    rhs: IrValue::bool(true),
                });
                Ok(self.value_from_register(&ValueType::Boolean, dest))
            }
        }
    }

    fn lower_binary(&mut self, binary: &ast::BinaryExpr) -> CompileResult<Value> {
        let left = self.lower_expr(&binary.left)?;
        let right = self.lower_expr(&binary.right)?;
        match binary.op.category() {
            BinaryCategory::Arithmetic => {
                self.lower_arithmetic(binary.op, &left, &right, binary.span)
            }
            BinaryCategory::Comparison => {
                self.lower_comparison(binary.op, &left, &right, binary.span)
            }
            BinaryCategory::Logical => self.lower_logical(binary.op, &left, &right, binary.span),
        }
    }

    fn lower_arithmetic(
        &mut self,
        op: BinaryOp,
        left: &Value,
        right: &Value,
        span: ast::Span,
    ) -> CompileResult<Value> {
        let lhs = {
            let cast = self.cast_value(left, &ValueType::Float64, span)?;
            cast.load(self)?
        };
        let rhs = {
            let cast = self.cast_value(right, &ValueType::Float64, span)?;
            cast.load(self)?
        };

        if op == BinaryOp::Rem {
            // remainder is normalized to be non-negative:
            // ((a frem b) fadd b) frem b
            let rem = self.float_binary(FloatBinaryOp::Rem, lhs.into(), rhs.clone().into());
            let shifted = self.float_binary(FloatBinaryOp::Add, rem.into(), rhs.clone().into());
            let result = self.float_binary(FloatBinaryOp::Rem, shifted.into(), rhs.into());
            return Ok(self.value_from_register(&ValueType::Float64, result));
        }

        let float_op = match op {
            BinaryOp::Add => FloatBinaryOp::Add,
            BinaryOp::Sub => FloatBinaryOp::Sub,
            BinaryOp::Mul => FloatBinaryOp::Mul,
            BinaryOp::Div => FloatBinaryOp::Div,
            _ => {
                return Err(CompileError::InternalError {
                    message: format!("{} is not an arithmetic operator", op),
                })
            }
        };
        let dest = self.float_binary(float_op, lhs.into(), rhs.into());
        Ok(self.value_from_register(&ValueType::Float64, dest))
    }

    fn lower_comparison(
        &mut self,
        op: BinaryOp,
        left: &Value,
        right: &Value,
        span: ast::Span,
    ) -> CompileResult<Value> {
        // two pointer-shaped operands compare by address
        if left.ty.is_pointer_shaped() && right.ty.is_pointer_shaped() {
            let lhs = left.load(self)?;
            let rhs = right.load(self)?;
            let pred = match op {
                BinaryOp::Lt => IntPredicate::Slt,
                BinaryOp::Le => IntPredicate::Sle,
                BinaryOp::Gt => IntPredicate::Sgt,
                BinaryOp::Ge => IntPredicate::Sge,
                BinaryOp::Eq => IntPredicate::Eq,
                BinaryOp::Ne => IntPredicate::Ne,
                _ => {
                    return Err(CompileError::InternalError {
                        message: format!("{} is not a comparison operator", op),
                    })
                }
            };
            let cmp = self.icmp(pred, lhs.into(), rhs.into());
            return Ok(self.value_from_register(&ValueType::Boolean, cmp));
        }

        let lhs = {
            let cast = self.cast_value(left, &ValueType::Float64, span)?;
            cast.load(self)?
        };
        let rhs = {
            let cast = self.cast_value(right, &ValueType::Float64, span)?;
            cast.load(self)?
        };
        let pred = match op {
            BinaryOp::Lt => FloatPredicate::Olt,
            BinaryOp::Le => FloatPredicate::Ole,
            BinaryOp::Gt => FloatPredicate::Ogt,
            BinaryOp::Ge => FloatPredicate::Oge,
            BinaryOp::Eq => FloatPredicate::Oeq,
            BinaryOp::Ne => FloatPredicate::One,
            _ => {
                return Err(CompileError::InternalError {
                    message: format!("{} is not a comparison operator", op),
                })
            }
        };
        let cmp = self.fcmp(pred, lhs.into(), rhs.into());
        Ok(self.value_from_register(&ValueType::Boolean, cmp))
    }

    fn lower_logical(
        &mut self,
        op: BinaryOp,
        left: &Value,
        right: &Value,
        span: ast::Span,
    ) -> CompileResult<Value> {
        let lhs = {
            let cast = self.cast_value(left, &ValueType::Boolean, span)?;
            cast.load(self)?
        };
        let rhs = {
            let cast = self.cast_value(right, &ValueType::Boolean, span)?;
            cast.load(self)?
        };
        let int_op = match op {
            BinaryOp::And => IntBinaryOp::And,
            BinaryOp::Or => IntBinaryOp::Or,
            _ => {
                return Err(CompileError::InternalError {
                    message: format!("{} is not a logical operator", op),
                })
            }
        };
        let dest = self.alloc_register(IrType::I1);
        self.emit(IrInstr::IntBinary {
            dest: dest.clone(),
            op: int_op,
            lhs: lhs.into(),
            rhs: rhs.into(),
        });
        Ok(self.value_from_register(&ValueType::Boolean, dest))
    }

    fn lower_member(&mut self, member: &ast::MemberExpr) -> CompileResult<Value> {
        let object = self.lower_expr(&member.object)?;
        let (addr, field_ty) = self.field_addr(&object, &member.property, member.span)?;
        let dest = self.alloc_register(field_ty.repr(self.ctx));
        self.emit(IrInstr::Load {
            dest: dest.clone(),
            addr,
        });
        Ok(self.value_from_register(&field_ty, dest))
    }

    fn lower_indexed(&mut self, indexed: &ast::IndexedExpr) -> CompileResult<Value> {
        let target = self.lower_expr(&indexed.target)?;
        let indices = self.lower_index_list(&indexed.indices)?;
        self.array_load_index(&target, &indices, indexed.span)
    }

    fn lower_index_list(&mut self, indices: &[Expression]) -> CompileResult<Vec<Value>> {
        let mut out = Vec::with_capacity(indices.len());
        for index in indices {
            out.push(self.lower_expr(index)?);
        }
        Ok(out)
    }

    fn lower_call(&mut self, call: &ast::CallExpr) -> CompileResult<Value> {
        match call.callee.as_ref() {
            Expression::Member(member) => {
                // an unbound symbol before the dot names a builtin module
                if let Expression::Symbol(sym) = member.object.as_ref() {
                    if self.scope.lookup(&sym.name).is_none() {
                        let key = format!("{}.{}", sym.name, member.property);
                        if let Some(builtin) = self.ctx.builtin(&key) {
                            let mut args = Vec::with_capacity(call.args.len());
                            for arg in &call.args {
                                args.push(self.lower_expr(arg)?);
                            }
                            let result = builtin(self, &args, call.span)?;
                            return Ok(result.unwrap_or_else(Value::null));
                        }
                    }
                }
                let object = self.lower_expr(&member.object)?;
                self.lower_method_call(&object, &member.property, &call.args, call.span)
            }
            Expression::Symbol(sym) => match self.scope.lookup(&sym.name) {
                Some(value) => Err(CompileError::InvalidOperands {
                    op: "call".to_string(),
                    left: value.ty.to_string(),
                    right: format!("{} arguments", call.args.len()),
                    span: call.span,
                }),
                None => Err(CompileError::UndefinedVariable {
                    name: sym.name.clone(),
                    span: sym.span,
                }),
            },
            _ => Err(CompileError::InvalidOperands {
                op: "call".to_string(),
                left: "expression".to_string(),
                right: format!("{} arguments", call.args.len()),
                span: call.span,
            }),
        }
    }

    /// Lower a method call on a class instance. The receiver pointer is
    /// appended after the declared arguments.
    pub(crate) fn lower_method_call(
        &mut self,
        object: &Value,
        method: &str,
        args: &[Expression],
        span: ast::Span,
    ) -> CompileResult<Value> {
        let class_name = match &object.ty {
            ValueType::Class(name) => name.clone(),
            other => {
                return Err(CompileError::UndefinedMethod {
                    class: other.to_string(),
                    method: method.to_string(),
                    span,
                })
            }
        };
        let layout = match self.ctx.class_by_name(&class_name) {
            Some(layout) => layout,
            None => {
                return Err(CompileError::UndefinedClass {
                    name: class_name,
                    span,
                })
            }
        };
        let info = match layout.method(method) {
            Some(info) => info.clone(),
            None => {
                return Err(CompileError::UndefinedMethod {
                    class: class_name,
                    method: method.to_string(),
                    span,
                })
            }
        };

        let full_name = format!("{}.{}", class_name, method);
        let mut call_args = self.lower_call_args(&info.params, args, &full_name, span)?;
        let receiver = self.receiver_arg(object, &info)?;
        call_args.push(receiver);
        self.emit_call(&info, call_args)
    }

    /// Lower and cast call arguments to the declared parameter types
    pub(crate) fn lower_call_args(
        &mut self,
        params: &[ValueType],
        args: &[Expression],
        name: &str,
        span: ast::Span,
    ) -> CompileResult<Vec<IrValue>> {
        if args.len() != params.len() {
            return Err(CompileError::ArityMismatch {
                name: name.to_string(),
                expected: params.len(),
                found: args.len(),
                span,
            });
        }
        let mut out = Vec::with_capacity(args.len());
        for (arg, param_ty) in args.iter().zip(params) {
            let value = self.lower_expr(arg)?;
            let cast = self.cast_value(&value, param_ty, arg.span())?;
            out.push(cast.load(self)?.into());
        }
        Ok(out)
    }

    /// Load the receiver, casting to the declaring class's pointer type
    /// when the method is inherited
    pub(crate) fn receiver_arg(
        &mut self,
        object: &Value,
        info: &MethodInfo,
    ) -> CompileResult<IrValue> {
        let reg = object.load(self)?;
        let owner_repr = IrType::ptr(IrType::Struct(self.ctx.class(info.owner).struct_id));
        if reg.ty == owner_repr {
            return Ok(reg.into());
        }
        let dest = self.alloc_register(owner_repr);
        self.emit(IrInstr::Cast {
            dest: dest.clone(),
            kind: CastKind::PtrCast,
            value: reg.into(),
        });
        Ok(dest.into())
    }

    /// Emit the call instruction and wrap the result
    pub(crate) fn emit_call(
        &mut self,
        info: &MethodInfo,
        args: Vec<IrValue>,
    ) -> CompileResult<Value> {
        match &info.ret {
            Some(ret_ty) => {
                let ret_ty = ret_ty.clone();
                let dest = self.alloc_register(ret_ty.repr(self.ctx));
                self.emit(IrInstr::Call {
                    dest: Some(dest.clone()),
                    func: info.func,
                    args,
                });
                Ok(self.value_from_register(&ret_ty, dest))
            }
            None => {
                self.emit(IrInstr::Call {
                    dest: None,
                    func: info.func,
                    args,
                });
                Ok(Value::null())
            }
        }
    }

    fn lower_assignment(&mut self, assign: &ast::AssignExpr) -> CompileResult<Value> {
        let value = self.lower_expr(&assign.value)?;
        match assign.target.as_ref() {
            Expression::Symbol(sym) => {
                let target = match self.scope.lookup(&sym.name) {
                    Some(target) => target.clone(),
                    None => {
                        return Err(CompileError::UndefinedVariable {
                            name: sym.name.clone(),
                            span: sym.span,
                        })
                    }
                };
                let cast = self.cast_value(&value, &target.ty, assign.span)?;
                let reg = cast.load(self)?;
                target.store(self, reg.into())?;
                Ok(target)
            }
            Expression::Member(member) => {
                let object = self.lower_expr(&member.object)?;
                let (addr, field_ty) = self.field_addr(&object, &member.property, member.span)?;
                let cast = self.cast_value(&value, &field_ty, assign.span)?;
                let reg = cast.load(self)?;
                self.emit(IrInstr::Store {
                    addr,
                    value: reg.into(),
                });
                Ok(cast)
            }
            Expression::Indexed(indexed) => {
                let target = self.lower_expr(&indexed.target)?;
                let indices = self.lower_index_list(&indexed.indices)?;
                self.array_store_index(&target, &indices, &value, indexed.span)?;
                Ok(value)
            }
            _ => Err(CompileError::InvalidOperands {
                op: "=".to_string(),
                left: "expression".to_string(),
                right: value.ty.to_string(),
                span: assign.span,
            }),
        }
    }

    /// Address and type of a named field of a class instance
    pub(crate) fn field_addr(
        &mut self,
        object: &Value,
        field: &str,
        span: ast::Span,
    ) -> CompileResult<(Register, ValueType)> {
        let class_name = match &object.ty {
            ValueType::Class(name) => name.clone(),
            other => {
                return Err(CompileError::UndefinedField {
                    class: other.to_string(),
                    field: field.to_string(),
                    span,
                })
            }
        };
        let layout = match self.ctx.class_by_name(&class_name) {
            Some(layout) => layout,
            None => {
                return Err(CompileError::UndefinedClass {
                    name: class_name,
                    span,
                })
            }
        };
        let slot = match layout.field(field) {
            Some(slot) => slot.clone(),
            None => {
                return Err(CompileError::UndefinedField {
                    class: class_name,
                    field: field.to_string(),
                    span,
                })
            }
        };
        let struct_id = layout.struct_id;

        let base = object.load(self)?;
        let addr = self.alloc_register(IrType::ptr(slot.ty.repr(self.ctx)));
        self.emit(IrInstr::FieldAddr {
            dest: addr.clone(),
            base,
            struct_id,
            index: slot.index,
        });
        Ok((addr, slot.ty))
    }

    fn float_binary(&mut self, op: FloatBinaryOp, lhs: IrValue, rhs: IrValue) -> Register {
        let dest = self.alloc_register(IrType::F64);
        self.emit(IrInstr::FloatBinary {
            dest: dest.clone(),
            op,
            lhs,
            rhs,
        });
        dest
    }
}
