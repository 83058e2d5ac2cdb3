//! Lexical scopes for function-body lowering
//!
//! One `SymbolScope` lives per lowered function. Blocks and loops push
//! nested scopes; lookups walk innermost to outermost. Globals do not
//! exist, so nothing escapes the root function scope.

use rustc_hash::FxHashMap;

use crate::ast::Span;
use crate::error::{CompileError, CompileResult};
use crate::type_registry::Value;

/// What introduced a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Function body root (parameters and `this` live here)
    Function,
    /// Plain lexical block
    Block,
    /// Loop body
    Loop,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    bindings: FxHashMap<String, Value>,
}

/// Stack of lexical scopes for one function body
#[derive(Debug)]
pub struct SymbolScope {
    scopes: Vec<Scope>,
}

impl SymbolScope {
    /// Create a scope stack with the function root scope in place
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                kind: ScopeKind::Function,
                bindings: FxHashMap::default(),
            }],
        }
    }

    /// Enter a nested scope
    pub fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope {
            kind,
            bindings: FxHashMap::default(),
        });
    }

    /// Leave the innermost scope, dropping its bindings
    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Bind a name in the innermost scope. Redeclaring a name already
    /// bound in that same scope is an error; shadowing an outer scope is
    /// allowed.
    pub fn define(&mut self, name: &str, value: Value, span: Span) -> CompileResult<()> {
        let scope = match self.scopes.last_mut() {
            Some(scope) => scope,
            None => {
                return Err(CompileError::InternalError {
                    message: format!("define of {} with no open scope", name),
                })
            }
        };
        if scope.bindings.contains_key(name) {
            return Err(CompileError::DuplicateVariable {
                name: name.to_string(),
                span,
            });
        }
        scope.bindings.insert(name.to_string(), value);
        Ok(())
    }

    /// Resolve a name, innermost scope first
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(name))
    }

    /// Kind of the innermost scope
    pub fn current_kind(&self) -> Option<ScopeKind> {
        self.scopes.last().map(|s| s.kind)
    }

    /// Number of open scopes
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for SymbolScope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrType, Register, RegisterId};
    use crate::type_registry::ValueType;

    fn slot(id: u32) -> Register {
        Register {
            id: RegisterId(id),
            ty: IrType::ptr(IrType::I64),
        }
    }

    #[test]
    fn test_define_and_lookup() {
        let mut scope = SymbolScope::new();
        scope
            .define("x", Value::new(ValueType::Int64, slot(0)), Span::default())
            .unwrap();
        let v = scope.lookup("x").unwrap();
        assert_eq!(v.ty, ValueType::Int64);
        assert!(scope.lookup("y").is_none());
    }

    #[test]
    fn test_shadowing_and_pop() {
        let mut scope = SymbolScope::new();
        scope
            .define("x", Value::new(ValueType::Int64, slot(0)), Span::default())
            .unwrap();
        scope.push_scope(ScopeKind::Block);
        scope
            .define("x", Value::new(ValueType::Float64, slot(1)), Span::default())
            .unwrap();
        assert_eq!(scope.lookup("x").unwrap().ty, ValueType::Float64);
        scope.pop_scope();
        assert_eq!(scope.lookup("x").unwrap().ty, ValueType::Int64);
    }

    #[test]
    fn test_duplicate_in_same_scope() {
        let mut scope = SymbolScope::new();
        scope
            .define("x", Value::new(ValueType::Int64, slot(0)), Span::default())
            .unwrap();
        let err = scope
            .define("x", Value::new(ValueType::Int64, slot(1)), Span::default())
            .unwrap_err();
        assert!(matches!(err, CompileError::DuplicateVariable { .. }));
    }

    #[test]
    fn test_loop_scope_kind() {
        let mut scope = SymbolScope::new();
        assert_eq!(scope.current_kind(), Some(ScopeKind::Function));
        scope.push_scope(ScopeKind::Loop);
        assert_eq!(scope.current_kind(), Some(ScopeKind::Loop));
        assert_eq!(scope.depth(), 2);
    }
}
