//! Builtin Modules
//!
//! Builtins are not IR functions; each one lowers its call site
//! directly into the caller, usually ending in a runtime call. They
//! become visible through `import` and are addressed as
//! `module.function`.

use crate::ast::Span;
use crate::error::{CompileError, CompileResult};
use crate::ir::{IrConstant, IrInstr, IrType, IrValue, RuntimeFn};
use crate::lower::Lowerer;
use crate::type_registry::{Value, ValueType};

/// A builtin lowers its own call site; `None` means the call produced
/// no value
pub type BuiltinFn = fn(&mut Lowerer<'_>, &[Value], Span) -> CompileResult<Option<Value>>;

/// The functions a builtin module exports, or `None` for an unknown
/// module name
pub fn module_functions(module: &str) -> Option<Vec<(&'static str, BuiltinFn)>> {
    match module {
        "io" => Some(vec![("print", io_print as BuiltinFn)]),
        "array" => Some(vec![("create", array_create as BuiltinFn)]),
        "types" => Some(vec![
            ("size", types_size as BuiltinFn),
            ("name", types_name as BuiltinFn),
        ]),
        _ => None,
    }
}

/// `io.print(format, ...)`: the first argument is the format string,
/// the rest pass through variadically. Narrow floats are promoted to
/// f64 on the way in. Returns the character count as `int32`.
fn io_print(
    lowerer: &mut Lowerer<'_>,
    args: &[Value],
    span: Span,
) -> CompileResult<Option<Value>> {
    if args.is_empty() {
        return Err(CompileError::ArityMismatch {
            name: "io.print".to_string(),
            expected: 1,
            found: 0,
            span,
        });
    }
    let format = lowerer.cast_value(&args[0], &ValueType::Str, span)?;
    let mut call_args = vec![IrValue::from(format.load(lowerer)?)];
    for arg in &args[1..] {
        let reg = arg.load(lowerer)?;
        let reg = if arg.ty.is_float() {
            lowerer.promote_to_f64(reg)
        } else {
            reg
        };
        call_args.push(reg.into());
    }
    let dest = lowerer.alloc_register(IrType::I32);
    lowerer.emit(IrInstr::RuntimeCall {
        dest: Some(dest.clone()),
        func: RuntimeFn::Print,
        args: call_args,
    });
    Ok(Some(lowerer.value_from_register(&ValueType::Int32, dest)))
}

/// `array.create(elemType, dim, ...)`: the first argument names the
/// element type, the rest are the dimension extents
fn array_create(
    lowerer: &mut Lowerer<'_>,
    args: &[Value],
    span: Span,
) -> CompileResult<Option<Value>> {
    if args.len() < 2 {
        return Err(CompileError::ArityMismatch {
            name: "array.create".to_string(),
            expected: 2,
            found: args.len(),
            span,
        });
    }
    let elem = args[0].ty.clone();
    lowerer.array_create(&elem, &args[1..], span).map(Some)
}

/// `types.size(value)`: the element byte size of the argument's type,
/// folded to an `int64` constant
fn types_size(
    lowerer: &mut Lowerer<'_>,
    args: &[Value],
    span: Span,
) -> CompileResult<Option<Value>> {
    if args.len() != 1 {
        return Err(CompileError::ArityMismatch {
            name: "types.size".to_string(),
            expected: 1,
            found: args.len(),
            span,
        });
    }
    let size = args[0].ty.elem_size();
    Ok(Some(lowerer.const_value(
        ValueType::Int64,
        IrConstant::Int {
            value: size,
            ty: IrType::I64,
        },
    )))
}

/// `types.name(value)`: the argument's type name as a string constant
fn types_name(
    lowerer: &mut Lowerer<'_>,
    args: &[Value],
    span: Span,
) -> CompileResult<Option<Value>> {
    if args.len() != 1 {
        return Err(CompileError::ArityMismatch {
            name: "types.name".to_string(),
            expected: 1,
            found: args.len(),
            span,
        });
    }
    let name = args[0].ty.to_string();
    Ok(Some(
        lowerer.const_value(ValueType::Str, IrConstant::Str(name)),
    ))
}
