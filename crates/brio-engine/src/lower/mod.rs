//! AST to IR Lowering
//!
//! Converts method bodies and the entry function into basic-block IR.
//! One `Lowerer` is created per function; it owns the function under
//! construction and walks the body, emitting into a cursor block that
//! moves as control flow splits.
//!
//! Every lowered expression is a `Value`: a source-level type plus the
//! stack slot holding it. Reads load from the slot at the use site,
//! writes store through it, so aliased slots (array headers, objects)
//! observe each other's updates.

mod array;
mod cast;
mod class_methods;
mod control_flow;
mod expr;
mod stmt;

pub(crate) use array::array_header_fields;
pub(crate) use class_methods::{declare_class_methods, define_class_bodies, define_entry};

use crate::context::CompilationContext;
use crate::error::{CompileError, CompileResult};
use crate::ir::{
    BasicBlock, BasicBlockId, FloatPredicate, IntBinaryOp, IntPredicate, IrConstant, IrFunction,
    IrInstr, IrType, IrValue, Register, RegisterId, RuntimeFn, Terminator,
};
use crate::scope::SymbolScope;
use crate::type_registry::{Value, ValueType};

/// AST to IR lowerer for one function body
pub struct Lowerer<'a> {
    /// Shared declaration state: class layouts, imported builtins
    pub(crate) ctx: &'a CompilationContext,
    /// The function under construction
    pub(crate) func: IrFunction,
    /// Block currently receiving emissions
    current_block: BasicBlockId,
    /// Next register ID
    next_register: u32,
    /// Next block ID
    next_block: u32,
    /// Lexical scopes of the body
    pub(crate) scope: SymbolScope,
    /// Exit blocks of the enclosing loops, innermost last
    pub(crate) loop_exits: Vec<BasicBlockId>,
    /// Declared source-level return type, `None` for void
    pub(crate) return_type: Option<ValueType>,
}

impl<'a> Lowerer<'a> {
    /// Create a lowerer around a function shell (name, parameter
    /// registers, and return type already set). Opens the entry block.
    pub(crate) fn new(ctx: &'a CompilationContext, func: IrFunction) -> Self {
        let next_register = func.params.len() as u32;
        let mut lowerer = Self {
            ctx,
            func,
            current_block: BasicBlockId(0),
            next_register,
            next_block: 0,
            scope: SymbolScope::new(),
            loop_exits: Vec::new(),
            return_type: None,
        };
        let entry = lowerer.alloc_block("entry");
        lowerer.current_block = entry;
        lowerer
    }

    /// Take the finished function out
    pub(crate) fn finish(self) -> IrFunction {
        self.func
    }

    /// Allocate a new register
    pub(crate) fn alloc_register(&mut self, ty: IrType) -> Register {
        let id = RegisterId::new(self.next_register);
        self.next_register += 1;
        Register::new(id, ty)
    }

    /// Allocate a new labeled block and add it to the function
    pub(crate) fn alloc_block(&mut self, label: &str) -> BasicBlockId {
        let id = BasicBlockId::new(self.next_block);
        self.next_block += 1;
        self.func.add_block(BasicBlock::with_label(id, label));
        id
    }

    /// Get the current block mutably
    fn current_block_mut(&mut self) -> &mut BasicBlock {
        let block_id = self.current_block;
        self.func
            .get_block_mut(block_id)
            .expect("current block not found")
    }

    /// Add an instruction to the current block
    pub(crate) fn emit(&mut self, instr: IrInstr) {
        self.current_block_mut().add_instr(instr);
    }

    /// Set the terminator of the current block
    pub(crate) fn terminate(&mut self, term: Terminator) {
        self.current_block_mut().set_terminator(term);
    }

    /// Move the cursor to another block
    pub(crate) fn seek(&mut self, block: BasicBlockId) {
        self.current_block = block;
    }

    /// The block currently receiving emissions
    pub(crate) fn cursor(&self) -> BasicBlockId {
        self.current_block
    }

    /// Whether the current block is still open
    pub(crate) fn current_block_is_open(&self) -> bool {
        self.func
            .get_block(self.current_block)
            .map(|b| !b.is_terminated())
            .unwrap_or(false)
    }

    /// IR zero of a value type, used for default initialization
    pub(crate) fn zero_value(&self, ty: &ValueType) -> IrValue {
        match ty {
            ValueType::Boolean => IrValue::bool(false),
            ValueType::Int8 | ValueType::Int16 | ValueType::Int32 | ValueType::Int64 => {
                IrValue::int(0, ty.repr(self.ctx))
            }
            ValueType::Float16 | ValueType::Float32 | ValueType::Float64 => {
                IrValue::float(0.0, ty.repr(self.ctx))
            }
            ValueType::Str | ValueType::Array(_) | ValueType::Class(_) | ValueType::Null => {
                IrValue::null(ty.repr(self.ctx))
            }
        }
    }

    /// Allocate a zero-initialized stack slot holding one value of `ty`
    pub(crate) fn build(&mut self, ty: &ValueType) -> Value {
        let repr = ty.repr(self.ctx);
        let slot = self.alloc_register(IrType::ptr(repr.clone()));
        self.emit(IrInstr::Alloca {
            dest: slot.clone(),
            ty: repr,
        });
        let zero = self.zero_value(ty);
        self.emit(IrInstr::Store {
            addr: slot.clone(),
            value: zero,
        });
        Value::new(ty.clone(), slot)
    }

    /// Allocate a slot holding the given constant
    pub(crate) fn const_value(&mut self, ty: ValueType, constant: IrConstant) -> Value {
        let repr = ty.repr(self.ctx);
        let slot = self.alloc_register(IrType::ptr(repr.clone()));
        self.emit(IrInstr::Alloca {
            dest: slot.clone(),
            ty: repr,
        });
        self.emit(IrInstr::Store {
            addr: slot.clone(),
            value: IrValue::Constant(constant),
        });
        Value::new(ty, slot)
    }

    /// Allocate a slot and store an already computed register into it
    pub(crate) fn value_from_register(&mut self, ty: &ValueType, reg: Register) -> Value {
        let repr = ty.repr(self.ctx);
        let slot = self.alloc_register(IrType::ptr(repr.clone()));
        self.emit(IrInstr::Alloca {
            dest: slot.clone(),
            ty: repr,
        });
        self.emit(IrInstr::Store {
            addr: slot.clone(),
            value: reg.into(),
        });
        Value::new(ty.clone(), slot)
    }

    /// Emit an integer comparison
    pub(crate) fn icmp(&mut self, pred: IntPredicate, lhs: IrValue, rhs: IrValue) -> Register {
        let dest = self.alloc_register(IrType::I1);
        self.emit(IrInstr::IntCmp {
            dest: dest.clone(),
            pred,
            lhs,
            rhs,
        });
        dest
    }

    /// Emit a float comparison
    pub(crate) fn fcmp(&mut self, pred: FloatPredicate, lhs: IrValue, rhs: IrValue) -> Register {
        let dest = self.alloc_register(IrType::I1);
        self.emit(IrInstr::FloatCmp {
            dest: dest.clone(),
            pred,
            lhs,
            rhs,
        });
        dest
    }

    /// Combine two `i1` conditions with a bitwise or
    pub(crate) fn or_i1(&mut self, lhs: Register, rhs: Register) -> Register {
        let dest = self.alloc_register(IrType::I1);
        self.emit(IrInstr::IntBinary {
            dest: dest.clone(),
            op: IntBinaryOp::Or,
            lhs: lhs.into(),
            rhs: rhs.into(),
        });
        dest
    }

    /// Branch to a trap that reports `message` and never returns when
    /// `cond` is true. Emission continues in the fall-through block.
    pub(crate) fn trap_if(&mut self, cond: Register, message: &str, stem: &str) {
        let trap_block = self.alloc_block(&format!("{}.trap", stem));
        let cont_block = self.alloc_block(&format!("{}.cont", stem));
        self.terminate(Terminator::Branch {
            cond,
            then_block: trap_block,
            else_block: cont_block,
        });
        self.current_block = trap_block;
        self.emit(IrInstr::RuntimeCall {
            dest: None,
            func: RuntimeFn::Error,
            args: vec![IrValue::str(message)],
        });
        self.terminate(Terminator::Unreachable);
        self.current_block = cont_block;
    }
}

impl Value {
    /// Load the current value out of the slot
    pub(crate) fn load(&self, lowerer: &mut Lowerer<'_>) -> CompileResult<Register> {
        let slot = match &self.slot {
            Some(slot) => slot.clone(),
            None => {
                return Err(CompileError::InternalError {
                    message: "read from a null value".to_string(),
                })
            }
        };
        let ty = match slot.ty.pointee() {
            Some(ty) => ty.clone(),
            None => {
                return Err(CompileError::InternalError {
                    message: format!("slot {} is not a pointer", slot),
                })
            }
        };
        let dest = lowerer.alloc_register(ty);
        lowerer.emit(IrInstr::Load {
            dest: dest.clone(),
            addr: slot,
        });
        Ok(dest)
    }

    /// Store a new value into the slot
    pub(crate) fn store(&self, lowerer: &mut Lowerer<'_>, value: IrValue) -> CompileResult<()> {
        let slot = match &self.slot {
            Some(slot) => slot.clone(),
            None => {
                return Err(CompileError::InternalError {
                    message: "write to a null value".to_string(),
                })
            }
        };
        lowerer.emit(IrInstr::Store { addr: slot, value });
        Ok(())
    }
}
