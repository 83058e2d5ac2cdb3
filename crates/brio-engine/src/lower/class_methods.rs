//! Method Declaration, Bodies, and Construction
//!
//! Methods compile to plain IR functions named `Class.method` whose
//! last parameter is the receiver pointer. Dispatch is static: the
//! call target is fixed by the receiver's declared class, and a child
//! class holds a flat copy of its parent's method table, overwritten
//! by its own declarations. Construction allocates the struct, runs
//! field initializers in slot order, then calls the method named after
//! the class if one exists.

use crate::ast::{self, ClassDecl, FunctionDecl, Span};
use crate::context::{CompilationContext, FieldSlot, MethodInfo};
use crate::error::{CompileError, CompileResult};
use crate::ir::{
    CastKind, IrFunction, IrInstr, IrModule, IrType, IrValue, Register, RegisterId, RuntimeFn,
    StructId, Terminator,
};
use crate::scope::ScopeKind;
use crate::type_registry::{Value, ValueType};

use super::Lowerer;

/// Declare the IR shells and signatures for every method of a class.
/// The parent's methods (already declared, parent-first order) are
/// copied in first so the child's own declarations replace them.
pub(crate) fn declare_class_methods(
    ctx: &mut CompilationContext,
    module: &mut IrModule,
    decl: &ClassDecl,
) -> CompileResult<()> {
    let id = match ctx.class_id(&decl.name) {
        Some(id) => id,
        None => {
            return Err(CompileError::InternalError {
                message: format!("methods declared for unknown class {}", decl.name),
            })
        }
    };

    if let Some(parent_name) = &decl.parent {
        let parent = match ctx.class_id(parent_name) {
            Some(parent) => parent,
            None => {
                return Err(CompileError::UndefinedClass {
                    name: parent_name.clone(),
                    span: decl.span,
                })
            }
        };
        let inherited = ctx.class(parent).methods.clone();
        ctx.class_mut(id).methods = inherited;
    }

    let receiver_ty = IrType::ptr(IrType::Struct(ctx.class(id).struct_id));
    for method in &decl.methods {
        let mut param_tys = Vec::with_capacity(method.params.len());
        for param in &method.params {
            let ty = ValueType::from_decl(&param.ty);
            ty.validate(ctx, param.span)?;
            param_tys.push(ty);
        }
        let ret = match &method.return_type {
            Some(ret_decl) => {
                let ty = ValueType::from_decl(ret_decl);
                ty.validate(ctx, method.span)?;
                Some(ty)
            }
            None => None,
        };

        let shell = method_shell(ctx, &decl.name, &method.name, &param_tys, &ret, &receiver_ty);
        let func = module.add_function(shell);
        ctx.class_mut(id).methods.insert(
            method.name.clone(),
            MethodInfo {
                func,
                owner: id,
                params: param_tys,
                ret,
            },
        );
    }
    Ok(())
}

/// Lower the bodies of every method a class declares itself. Inherited
/// entries point at the parent's functions and are not lowered again.
pub(crate) fn define_class_bodies(
    ctx: &CompilationContext,
    module: &mut IrModule,
    decl: &ClassDecl,
) -> CompileResult<()> {
    for method in &decl.methods {
        let info = match ctx
            .class_by_name(&decl.name)
            .and_then(|layout| layout.method(&method.name))
        {
            Some(info) => info.clone(),
            None => {
                return Err(CompileError::InternalError {
                    message: format!("missing declaration for {}.{}", decl.name, method.name),
                })
            }
        };
        define_method_body(ctx, module, decl, method, &info)?;
    }
    Ok(())
}

/// Lower the entry function. It takes nothing, returns `i32` zero, and
/// initializes the runtime before any user statement runs.
pub(crate) fn define_entry(
    ctx: &CompilationContext,
    module: &mut IrModule,
    decl: &FunctionDecl,
) -> CompileResult<()> {
    if !decl.params.is_empty() {
        return Err(CompileError::EntryParams { span: decl.span });
    }
    if decl.return_type.is_some() {
        return Err(CompileError::EntryReturnType { span: decl.span });
    }

    let mut lowerer = Lowerer::new(ctx, IrFunction::new("main", vec![], Some(IrType::I32)));
    lowerer.return_type = Some(ValueType::Int32);
    lowerer.emit(IrInstr::RuntimeCall {
        dest: None,
        func: RuntimeFn::Init,
        args: vec![],
    });
    lowerer.lower_statements(&decl.body.statements)?;
    seal(&mut lowerer);
    module.add_function(lowerer.finish());
    Ok(())
}

fn define_method_body(
    ctx: &CompilationContext,
    module: &mut IrModule,
    class_decl: &ClassDecl,
    method: &FunctionDecl,
    info: &MethodInfo,
) -> CompileResult<()> {
    let receiver_ty = IrType::ptr(IrType::Struct(ctx.class(info.owner).struct_id));
    let shell = method_shell(
        ctx,
        &class_decl.name,
        &method.name,
        &info.params,
        &info.ret,
        &receiver_ty,
    );
    let mut lowerer = Lowerer::new(ctx, shell);
    lowerer.return_type = info.ret.clone();

    // the receiver's fields bind by bare name in the root scope, so
    // method bodies can say `x = x + 1` without `this.`
    let receiver = lowerer.func.params[method.params.len()].clone();
    let layout = match ctx.class_by_name(&class_decl.name) {
        Some(layout) => layout,
        None => {
            return Err(CompileError::InternalError {
                message: format!("bodies defined for unknown class {}", class_decl.name),
            })
        }
    };
    let struct_id = layout.struct_id;
    for slot in layout.fields.clone() {
        let addr = lowerer.alloc_register(IrType::ptr(slot.ty.repr(ctx)));
        lowerer.emit(IrInstr::FieldAddr {
            dest: addr.clone(),
            base: receiver.clone(),
            struct_id,
            index: slot.index,
        });
        lowerer
            .scope
            .define(&slot.name, Value::new(slot.ty, addr), method.span)?;
    }
    let this = lowerer.value_from_register(
        &ValueType::Class(class_decl.name.clone()),
        receiver,
    );
    lowerer.scope.define("this", this, method.span)?;

    // parameters land in fresh stack slots in a nested frame, so a
    // parameter named like a field shadows it
    lowerer.scope.push_scope(ScopeKind::Function);
    for (i, (param, ty)) in method.params.iter().zip(&info.params).enumerate() {
        let reg = lowerer.func.params[i].clone();
        let value = lowerer.value_from_register(ty, reg);
        lowerer.scope.define(&param.name, value, param.span)?;
    }

    lowerer.lower_statements(&method.body.statements)?;
    seal(&mut lowerer);

    let finished = lowerer.finish();
    match module.get_function_mut(info.func) {
        Some(slot) => {
            *slot = finished;
            Ok(())
        }
        None => Err(CompileError::InternalError {
            message: format!("no shell function for {}.{}", class_decl.name, method.name),
        }),
    }
}

/// Build the IR function shell for a method: declared parameters in
/// order, then the implicit receiver pointer
fn method_shell(
    ctx: &CompilationContext,
    class: &str,
    method: &str,
    param_tys: &[ValueType],
    ret: &Option<ValueType>,
    receiver_ty: &IrType,
) -> IrFunction {
    let mut params = Vec::with_capacity(param_tys.len() + 1);
    for (i, ty) in param_tys.iter().enumerate() {
        params.push(Register::new(RegisterId::new(i as u32), ty.repr(ctx)));
    }
    params.push(Register::new(
        RegisterId::new(param_tys.len() as u32),
        receiver_ty.clone(),
    ));
    IrFunction::new(
        format!("{}.{}", class, method),
        params,
        ret.as_ref().map(|ty| ty.repr(ctx)),
    )
}

/// Close the function if control falls off the end: void functions
/// return nothing, valued functions return the zero value
fn seal(lowerer: &mut Lowerer<'_>) {
    if !lowerer.current_block_is_open() {
        return;
    }
    match lowerer.return_type.clone() {
        Some(ret_ty) => {
            let reg = lowerer.zero_return(&ret_ty);
            lowerer.terminate(Terminator::Return(Some(reg)));
        }
        None => lowerer.terminate(Terminator::Return(None)),
    }
}

impl Lowerer<'_> {
    /// Lower `new Class(args)`: allocate, initialize fields in slot
    /// order, then call the constructor if the class declares one
    pub(crate) fn lower_new(&mut self, new: &ast::NewExpr) -> CompileResult<Value> {
        let layout = match self.ctx.class_by_name(&new.class) {
            Some(layout) => layout,
            None => {
                return Err(CompileError::UndefinedClass {
                    name: new.class.clone(),
                    span: new.span,
                })
            }
        };
        let struct_id = layout.struct_id;
        let byte_size = layout.byte_size();
        let fields = layout.fields.clone();
        let ctor = layout.method(&new.class).cloned();

        let raw = self.alloc_register(IrType::ptr(IrType::I8));
        self.emit(IrInstr::RuntimeCall {
            dest: Some(raw.clone()),
            func: RuntimeFn::Alloc,
            args: vec![IrValue::int(byte_size, IrType::I64)],
        });
        let obj = self.alloc_register(IrType::ptr(IrType::Struct(struct_id)));
        self.emit(IrInstr::Cast {
            dest: obj.clone(),
            kind: CastKind::PtrCast,
            value: raw.into(),
        });
        let object = self.value_from_register(&ValueType::Class(new.class.clone()), obj.clone());

        // initializer temporaries and the field bindings themselves live
        // in a transient scope that ends before the constructor call
        self.scope.push_scope(ScopeKind::Function);
        let initialized = self.init_fields(&fields, struct_id, obj, new.span);
        self.scope.pop_scope();
        initialized?;

        if let Some(ctor) = ctor {
            let name = format!("{}.{}", new.class, new.class);
            let mut args = self.lower_call_args(&ctor.params, &new.args, &name, new.span)?;
            let receiver = self.receiver_arg(&object, &ctor)?;
            args.push(receiver);
            self.emit_call(&ctor, args)?;
        } else if !new.args.is_empty() {
            return Err(CompileError::ArityMismatch {
                name: new.class.clone(),
                expected: 0,
                found: new.args.len(),
                span: new.span,
            });
        }

        Ok(object)
    }

    /// Store each field's initializer (or zero) through its address,
    /// binding the field by name so later initializers can read it
    fn init_fields(
        &mut self,
        fields: &[FieldSlot],
        struct_id: StructId,
        base: Register,
        span: Span,
    ) -> CompileResult<()> {
        for slot in fields {
            let addr = self.alloc_register(IrType::ptr(slot.ty.repr(self.ctx)));
            self.emit(IrInstr::FieldAddr {
                dest: addr.clone(),
                base: base.clone(),
                struct_id,
                index: slot.index,
            });
            let value = match &slot.initializer {
                Some(init) => {
                    let lowered = self.lower_expr(init)?;
                    let cast = self.cast_value(&lowered, &slot.ty, span)?;
                    IrValue::from(cast.load(self)?)
                }
                None => self.zero_value(&slot.ty),
            };
            self.emit(IrInstr::Store {
                addr: addr.clone(),
                value,
            });
            self.scope
                .define(&slot.name, Value::new(slot.ty.clone(), addr), span)?;
        }
        Ok(())
    }
}
