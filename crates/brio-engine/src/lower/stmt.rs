//! Statement Lowering

use crate::ast::{self, Block, Statement};
use crate::error::{CompileError, CompileResult};
use crate::ir::{IrInstr, Register, Terminator};
use crate::scope::ScopeKind;
use crate::type_registry::ValueType;

use super::Lowerer;

impl Lowerer<'_> {
    /// Lower a block in a fresh lexical scope
    pub(crate) fn lower_block(&mut self, block: &Block, kind: ScopeKind) -> CompileResult<()> {
        self.scope.push_scope(kind);
        let result = self.lower_statements(&block.statements);
        self.scope.pop_scope();
        result
    }

    /// Lower a statement list into the current block. Once a return or
    /// break terminates the block, the rest of the list is unreachable
    /// and skipped.
    pub(crate) fn lower_statements(&mut self, statements: &[Statement]) -> CompileResult<()> {
        for stmt in statements {
            if !self.current_block_is_open() {
                break;
            }
            self.lower_stmt(stmt)?;
        }
        Ok(())
    }

    /// Lower one statement
    pub(crate) fn lower_stmt(&mut self, stmt: &Statement) -> CompileResult<()> {
        if !self.current_block_is_open() {
            return Ok(());
        }
        match stmt {
            Statement::VariableDecl(decl) => self.lower_variable_decl(decl),
            Statement::Expression(stmt) => {
                self.lower_expr(&stmt.expression)?;
                Ok(())
            }
            Statement::If(stmt) => self.lower_if(stmt),
            Statement::While(stmt) => self.lower_while(stmt),
            Statement::Foreach(stmt) => self.lower_foreach(stmt),
            Statement::Break(stmt) => self.lower_break(stmt),
            Statement::Return(stmt) => self.lower_return(stmt),
            Statement::Import(_) => Err(CompileError::InternalError {
                message: "import inside a function body".to_string(),
            }),
            Statement::ClassDecl(_) => Err(CompileError::InternalError {
                message: "class declaration inside a function body".to_string(),
            }),
            Statement::FunctionDecl(_) => Err(CompileError::InternalError {
                message: "function declaration inside a function body".to_string(),
            }),
        }
    }

    fn lower_variable_decl(&mut self, decl: &ast::VariableDecl) -> CompileResult<()> {
        let ty = ValueType::from_decl(&decl.ty);
        ty.validate(self.ctx, decl.span)?;
        let value = self.build(&ty);
        if let Some(init) = &decl.initializer {
            let init_value = self.lower_expr(init)?;
            let cast = self.cast_value(&init_value, &ty, decl.span)?;
            let reg = cast.load(self)?;
            value.store(self, reg.into())?;
        }
        self.scope.define(&decl.name, value, decl.span)
    }

    fn lower_break(&mut self, stmt: &ast::BreakStmt) -> CompileResult<()> {
        let exit = match self.loop_exits.last() {
            Some(&exit) => exit,
            None => return Err(CompileError::BreakOutsideLoop { span: stmt.span }),
        };
        self.terminate(Terminator::Jump(exit));
        Ok(())
    }

    /// Lower a return. A bare `return` in a valued function returns the
    /// zero value; a value returned from a void function is evaluated
    /// for its effects and dropped.
    fn lower_return(&mut self, stmt: &ast::ReturnStmt) -> CompileResult<()> {
        let ret_ty = self.return_type.clone();
        match (&stmt.value, ret_ty) {
            (Some(expr), Some(ret_ty)) => {
                let value = self.lower_expr(expr)?;
                let cast = self.cast_value(&value, &ret_ty, stmt.span)?;
                let reg = cast.load(self)?;
                self.terminate(Terminator::Return(Some(reg)));
            }
            (None, Some(ret_ty)) => {
                let reg = self.zero_return(&ret_ty);
                self.terminate(Terminator::Return(Some(reg)));
            }
            (Some(expr), None) => {
                self.lower_expr(expr)?;
                self.terminate(Terminator::Return(None));
            }
            (None, None) => {
                self.terminate(Terminator::Return(None));
            }
        }
        Ok(())
    }

    /// Materialize the zero value of the return type in a register
    pub(crate) fn zero_return(&mut self, ret_ty: &ValueType) -> Register {
        let zero = self.zero_value(ret_ty);
        let dest = self.alloc_register(ret_ty.repr(self.ctx));
        self.emit(IrInstr::Assign {
            dest: dest.clone(),
            value: zero,
        });
        dest
    }
}
