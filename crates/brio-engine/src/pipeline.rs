//! Compilation Pipeline
//!
//! Six ordered passes over the top-level declaration list. Each pass
//! may assume everything the earlier passes produced is complete:
//! imports land in the builtin table, classes are predeclared opaque so
//! any class can reference any other (or itself), fields are laid out,
//! method signatures are declared parent-first, bodies are lowered, and
//! the entry function comes last. Compilation aborts on the first
//! error.

use rustc_hash::FxHashMap;

use crate::ast::{ClassDecl, Program, Statement};
use crate::context::CompilationContext;
use crate::error::{CompileError, CompileResult};
use crate::ir::{IrModule, IrType};
use crate::lower::{array_header_fields, declare_class_methods, define_class_bodies};
use crate::type_registry::ValueType;

/// Lower a whole program to an IR module
pub fn compile(program: &Program) -> CompileResult<IrModule> {
    Pipeline::new().run(program)
}

/// The pass driver. One pipeline compiles one program.
pub struct Pipeline {
    ctx: CompilationContext,
}

#[derive(Clone, Copy)]
enum VisitState {
    Visiting,
    Done,
}

impl Pipeline {
    /// Create a pipeline with a fresh compilation context
    pub fn new() -> Self {
        Self {
            ctx: CompilationContext::new(),
        }
    }

    /// Run all passes and produce the module
    pub fn run(mut self, program: &Program) -> CompileResult<IrModule> {
        let mut module = IrModule::new("main");
        let array_struct = module.add_struct("array");
        module.define_struct(array_struct, array_header_fields());
        self.ctx.set_array_struct(array_struct);

        self.import_modules(program)?;
        self.predeclare_classes(program, &mut module);
        self.define_fields(program, &mut module)?;
        self.declare_methods(program, &mut module)?;
        self.define_bodies(program, &mut module)?;
        self.define_entry(program, &mut module)?;
        Ok(module)
    }

    fn import_modules(&mut self, program: &Program) -> CompileResult<()> {
        for stmt in &program.statements {
            if let Statement::Import(import) = stmt {
                self.ctx.import_module(&import.module, import.span)?;
            }
        }
        Ok(())
    }

    /// Create an opaque struct for every class so forward and recursive
    /// references resolve; re-predeclaring a known name is a no-op
    fn predeclare_classes(&mut self, program: &Program, module: &mut IrModule) {
        for stmt in &program.statements {
            if let Statement::ClassDecl(decl) = stmt {
                if self.ctx.has_class(&decl.name) {
                    continue;
                }
                let struct_id = module.add_struct(&decl.name);
                let id = self.ctx.declare_class(&decl.name, struct_id);
                self.ctx.class_mut(id).parent = decl.parent.clone();
            }
        }
    }

    /// Lay out fields and finalize each class struct. Top-level
    /// variables and functions other than `main` are rejected here.
    fn define_fields(&mut self, program: &Program, module: &mut IrModule) -> CompileResult<()> {
        for stmt in &program.statements {
            match stmt {
                Statement::VariableDecl(decl) => {
                    return Err(CompileError::GlobalVariable {
                        name: decl.name.clone(),
                        span: decl.span,
                    })
                }
                Statement::FunctionDecl(decl) if decl.name != "main" => {
                    return Err(CompileError::TopLevelFunction {
                        name: decl.name.clone(),
                        span: decl.span,
                    })
                }
                Statement::ClassDecl(decl) => self.define_class_fields(decl, module)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn define_class_fields(&mut self, decl: &ClassDecl, module: &mut IrModule) -> CompileResult<()> {
        let id = match self.ctx.class_id(&decl.name) {
            Some(id) => id,
            None => {
                return Err(CompileError::InternalError {
                    message: format!("fields defined for unknown class {}", decl.name),
                })
            }
        };
        for field in &decl.fields {
            let ty = ValueType::from_decl(&field.ty);
            ty.validate(&self.ctx, field.span)?;
            self.ctx
                .class_mut(id)
                .add_field(&field.name, ty, field.initializer.clone(), field.span)?;
        }
        let field_tys: Vec<IrType> = self
            .ctx
            .class(id)
            .fields
            .iter()
            .map(|f| f.ty.repr(&self.ctx))
            .collect();
        let struct_id = self.ctx.class(id).struct_id;
        module.define_struct(struct_id, field_tys);
        self.ctx.class_mut(id).defined = true;
        Ok(())
    }

    /// Declare method signatures, visiting parents before children so
    /// inherited tables are complete when copied
    fn declare_methods(&mut self, program: &Program, module: &mut IrModule) -> CompileResult<()> {
        let classes: Vec<&ClassDecl> = program
            .statements
            .iter()
            .filter_map(|stmt| match stmt {
                Statement::ClassDecl(decl) => Some(decl),
                _ => None,
            })
            .collect();
        let mut visited: FxHashMap<String, VisitState> = FxHashMap::default();
        for decl in &classes {
            self.declare_methods_for(decl, &classes, &mut visited, module)?;
        }
        Ok(())
    }

    fn declare_methods_for(
        &mut self,
        decl: &ClassDecl,
        classes: &[&ClassDecl],
        visited: &mut FxHashMap<String, VisitState>,
        module: &mut IrModule,
    ) -> CompileResult<()> {
        match visited.get(&decl.name) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::Visiting) => {
                return Err(CompileError::CyclicInheritance {
                    name: decl.name.clone(),
                    span: decl.span,
                })
            }
            None => {}
        }
        visited.insert(decl.name.clone(), VisitState::Visiting);
        if let Some(parent) = &decl.parent {
            match classes.iter().find(|c| c.name == *parent) {
                Some(parent_decl) => {
                    self.declare_methods_for(parent_decl, classes, visited, module)?
                }
                None => {
                    return Err(CompileError::UndefinedClass {
                        name: parent.clone(),
                        span: decl.span,
                    })
                }
            }
        }
        declare_class_methods(&mut self.ctx, module, decl)?;
        visited.insert(decl.name.clone(), VisitState::Done);
        Ok(())
    }

    fn define_bodies(&mut self, program: &Program, module: &mut IrModule) -> CompileResult<()> {
        for stmt in &program.statements {
            if let Statement::ClassDecl(decl) = stmt {
                define_class_bodies(&self.ctx, module, decl)?;
            }
        }
        Ok(())
    }

    fn define_entry(&mut self, program: &Program, module: &mut IrModule) -> CompileResult<()> {
        let main_decl = program.statements.iter().find_map(|stmt| match stmt {
            Statement::FunctionDecl(decl) if decl.name == "main" => Some(decl),
            _ => None,
        });
        match main_decl {
            Some(decl) => crate::lower::define_entry(&self.ctx, module, decl),
            None => Err(CompileError::MissingEntry),
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{
        Block, BreakStmt, ClassDecl, FunctionDecl, ImportStmt, Span, TypeName, VariableDecl,
    };

    fn empty_body() -> Block {
        Block {
            statements: vec![],
            span: Span::default(),
        }
    }

    fn main_fn(statements: Vec<Statement>) -> Statement {
        Statement::FunctionDecl(FunctionDecl {
            name: "main".to_string(),
            params: vec![],
            return_type: None,
            body: Block {
                statements,
                span: Span::default(),
            },
            span: Span::default(),
        })
    }

    fn class_stmt(name: &str, parent: Option<&str>) -> Statement {
        Statement::ClassDecl(ClassDecl {
            name: name.to_string(),
            parent: parent.map(|p| p.to_string()),
            fields: vec![],
            methods: vec![],
            span: Span::default(),
        })
    }

    fn program(statements: Vec<Statement>) -> Program {
        Program { statements }
    }

    #[test]
    fn test_minimal_program() {
        let module = compile(&program(vec![main_fn(vec![])])).unwrap();
        module.validate().unwrap();
        assert!(module.get_function_by_name("main").is_some());
        assert!(module.get_struct_id("array").is_some());
    }

    #[test]
    fn test_missing_entry() {
        let err = compile(&program(vec![])).unwrap_err();
        assert!(matches!(err, CompileError::MissingEntry));
    }

    #[test]
    fn test_global_variable_rejected() {
        let err = compile(&program(vec![
            Statement::VariableDecl(VariableDecl {
                name: "g".to_string(),
                ty: TypeName::Int64,
                initializer: None,
                span: Span::default(),
            }),
            main_fn(vec![]),
        ]))
        .unwrap_err();
        assert!(matches!(err, CompileError::GlobalVariable { .. }));
    }

    #[test]
    fn test_top_level_function_rejected() {
        let err = compile(&program(vec![
            Statement::FunctionDecl(FunctionDecl {
                name: "helper".to_string(),
                params: vec![],
                return_type: None,
                body: empty_body(),
                span: Span::default(),
            }),
            main_fn(vec![]),
        ]))
        .unwrap_err();
        assert!(matches!(err, CompileError::TopLevelFunction { .. }));
    }

    #[test]
    fn test_unknown_import() {
        let err = compile(&program(vec![
            Statement::Import(ImportStmt {
                module: "net".to_string(),
                span: Span::default(),
            }),
            main_fn(vec![]),
        ]))
        .unwrap_err();
        assert!(matches!(err, CompileError::UndefinedModule { .. }));
    }

    #[test]
    fn test_cyclic_inheritance() {
        let err = compile(&program(vec![
            class_stmt("A", Some("B")),
            class_stmt("B", Some("A")),
            main_fn(vec![]),
        ]))
        .unwrap_err();
        assert!(matches!(err, CompileError::CyclicInheritance { .. }));

        let err = compile(&program(vec![class_stmt("Ouro", Some("Ouro")), main_fn(vec![])]))
            .unwrap_err();
        assert!(matches!(err, CompileError::CyclicInheritance { .. }));
    }

    #[test]
    fn test_child_before_parent_in_source() {
        // declaration order in the source does not matter; the DFS
        // declares Base before Child
        let module = compile(&program(vec![
            class_stmt("Child", Some("Base")),
            class_stmt("Base", None),
            main_fn(vec![]),
        ]))
        .unwrap();
        module.validate().unwrap();
    }

    #[test]
    fn test_break_at_top_of_main() {
        let err = compile(&program(vec![main_fn(vec![Statement::Break(BreakStmt {
            span: Span::default(),
        })])]))
        .unwrap_err();
        assert!(matches!(err, CompileError::BreakOutsideLoop { .. }));
    }
}
