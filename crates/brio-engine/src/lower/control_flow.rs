//! Control Flow Lowering
//!
//! Each construct splits the function into labeled blocks and moves the
//! cursor through them. Arms jump to the join block only when their own
//! block is still open; a returned or broken arm keeps its terminator.

use crate::ast::{self, Expression};
use crate::error::{CompileError, CompileResult};
use crate::ir::{IntBinaryOp, IntPredicate, IrInstr, IrType, IrValue, Register, Terminator};
use crate::scope::ScopeKind;
use crate::type_registry::ValueType;

use super::Lowerer;

impl Lowerer<'_> {
    pub(crate) fn lower_if(&mut self, stmt: &ast::IfStmt) -> CompileResult<()> {
        let cond = self.lower_condition(&stmt.condition)?;
        let then_block = self.alloc_block("if.then");
        let else_block = stmt.else_branch.as_ref().map(|_| self.alloc_block("if.else"));
        let end_block = self.alloc_block("if.end");
        self.terminate(Terminator::Branch {
            cond,
            then_block,
            else_block: else_block.unwrap_or(end_block),
        });

        self.seek(then_block);
        self.lower_block(&stmt.then_branch, ScopeKind::Block)?;
        if self.current_block_is_open() {
            self.terminate(Terminator::Jump(end_block));
        }

        if let (Some(else_id), Some(else_branch)) = (else_block, &stmt.else_branch) {
            self.seek(else_id);
            self.lower_block(else_branch, ScopeKind::Block)?;
            if self.current_block_is_open() {
                self.terminate(Terminator::Jump(end_block));
            }
        }

        self.seek(end_block);
        Ok(())
    }

    pub(crate) fn lower_while(&mut self, stmt: &ast::WhileStmt) -> CompileResult<()> {
        let cond_block = self.alloc_block("while.cond");
        let body_block = self.alloc_block("while.body");
        let exit_block = self.alloc_block("while.exit");

        self.terminate(Terminator::Jump(cond_block));
        self.seek(cond_block);
        let cond = self.lower_condition(&stmt.condition)?;
        self.terminate(Terminator::Branch {
            cond,
            then_block: body_block,
            else_block: exit_block,
        });

        self.loop_exits.push(exit_block);
        self.seek(body_block);
        self.lower_block(&stmt.body, ScopeKind::Loop)?;
        if self.current_block_is_open() {
            self.terminate(Terminator::Jump(cond_block));
        }
        self.loop_exits.pop();

        self.seek(exit_block);
        Ok(())
    }

    /// Lower `for name in lower..upper`. The bounds are evaluated once,
    /// before the loop; the induction variable counts up by one and is
    /// scoped to the loop.
    pub(crate) fn lower_foreach(&mut self, stmt: &ast::ForeachStmt) -> CompileResult<()> {
        let range = match &stmt.iterable {
            Expression::Range(range) => range,
            other => {
                let value = self.lower_expr(other)?;
                return Err(CompileError::InvalidOperands {
                    op: "foreach".to_string(),
                    left: value.ty.to_string(),
                    right: "range".to_string(),
                    span: stmt.span,
                });
            }
        };

        let start = self.lower_bound(&range.lower, range.span)?;
        let end = self.lower_bound(&range.upper, range.span)?;

        self.scope.push_scope(ScopeKind::Loop);
        let binding = self.value_from_register(&ValueType::Int64, start);
        self.scope.define(&stmt.binding, binding.clone(), stmt.span)?;

        let cond_block = self.alloc_block("for.cond");
        let body_block = self.alloc_block("for.body");
        let inc_block = self.alloc_block("for.inc");
        let exit_block = self.alloc_block("for.exit");

        self.terminate(Terminator::Jump(cond_block));
        self.seek(cond_block);
        let current = binding.load(self)?;
        let cond = self.icmp(IntPredicate::Slt, current.into(), end.into());
        self.terminate(Terminator::Branch {
            cond,
            then_block: body_block,
            else_block: exit_block,
        });

        self.loop_exits.push(exit_block);
        self.seek(body_block);
        self.lower_block(&stmt.body, ScopeKind::Block)?;
        if self.current_block_is_open() {
            self.terminate(Terminator::Jump(inc_block));
        }
        self.loop_exits.pop();

        self.seek(inc_block);
        let current = binding.load(self)?;
        let next = self.alloc_register(IrType::I64);
        self.emit(IrInstr::IntBinary {
            dest: next.clone(),
            op: IntBinaryOp::Add,
            lhs: current.into(),
            rhs: IrValue::int(1, IrType::I64),
        });
        binding.store(self, next.into())?;
        self.terminate(Terminator::Jump(cond_block));

        self.seek(exit_block);
        self.scope.pop_scope();
        Ok(())
    }

    /// Lower a condition expression and coerce it to an `i1` register
    fn lower_condition(&mut self, condition: &Expression) -> CompileResult<Register> {
        let value = self.lower_expr(condition)?;
        let boolean = self.cast_value(&value, &ValueType::Boolean, condition.span())?;
        boolean.load(self)
    }

    /// Lower one range bound to an `i64` register
    fn lower_bound(&mut self, bound: &Expression, span: ast::Span) -> CompileResult<Register> {
        let value = self.lower_expr(bound)?;
        let int = self.cast_value(&value, &ValueType::Int64, span)?;
        int.load(self)
    }
}
