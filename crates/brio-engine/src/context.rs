//! Shared compilation state
//!
//! `CompilationContext` owns everything the passes accumulate about a
//! program: class layouts with their field slots and method tables, and
//! the builtin functions brought in by imports. Declaration passes fill
//! it in; body lowering reads it immutably. There are no global
//! registries, all state flows through the context.

use rustc_hash::FxHashMap;

use crate::ast::{Expression, Span};
use crate::builtins::{module_functions, BuiltinFn};
use crate::error::{CompileError, CompileResult};
use crate::ir::{FunctionId, StructId};
use crate::type_registry::ValueType;

/// Index of a class in the context's class table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub u32);

/// One declared field: its type and dense slot index within the struct
#[derive(Debug, Clone)]
pub struct FieldSlot {
    /// Field name
    pub name: String,
    /// Declared type
    pub ty: ValueType,
    /// Slot index in the class struct
    pub index: u16,
    /// Declared initializer, evaluated at construction time in slot order
    pub initializer: Option<Expression>,
}

/// A callable method as a call site sees it
#[derive(Debug, Clone)]
pub struct MethodInfo {
    /// The IR function carrying the body
    pub func: FunctionId,
    /// Class that declared the body. Differs from the receiver's class
    /// when the method is inherited; the receiver is then cast to the
    /// owner's struct pointer at the call site.
    pub owner: ClassId,
    /// Declared parameter types, receiver excluded
    pub params: Vec<ValueType>,
    /// Declared return type, `None` for void
    pub ret: Option<ValueType>,
}

/// Layout and method table of one class
#[derive(Debug)]
pub struct ClassLayout {
    /// Class name
    pub name: String,
    /// The IR struct backing instances
    pub struct_id: StructId,
    /// Parent class name, if any
    pub parent: Option<String>,
    /// Fields in slot order
    pub fields: Vec<FieldSlot>,
    field_map: FxHashMap<String, u16>,
    /// Method table: inherited entries first, own declarations override
    pub methods: FxHashMap<String, MethodInfo>,
    /// True once the field pass has finalized the layout
    pub defined: bool,
}

impl ClassLayout {
    fn new(name: &str, struct_id: StructId) -> Self {
        Self {
            name: name.to_string(),
            struct_id,
            parent: None,
            fields: Vec::new(),
            field_map: FxHashMap::default(),
            methods: FxHashMap::default(),
            defined: false,
        }
    }

    /// Append a field at the next slot index
    pub fn add_field(
        &mut self,
        name: &str,
        ty: ValueType,
        initializer: Option<Expression>,
        span: Span,
    ) -> CompileResult<u16> {
        if self.field_map.contains_key(name) {
            return Err(CompileError::DuplicateField {
                class: self.name.clone(),
                field: name.to_string(),
                span,
            });
        }
        let index = self.fields.len() as u16;
        self.fields.push(FieldSlot {
            name: name.to_string(),
            ty,
            index,
            initializer,
        });
        self.field_map.insert(name.to_string(), index);
        Ok(index)
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldSlot> {
        self.field_map.get(name).map(|&i| &self.fields[i as usize])
    }

    /// Look up a method by name
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods.get(name)
    }

    /// Number of declared fields
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Bytes an instance occupies, the sum of the field element sizes
    pub fn byte_size(&self) -> i64 {
        self.fields.iter().map(|f| f.ty.elem_size()).sum()
    }
}

/// Compilation-wide state shared across the passes
#[derive(Debug)]
pub struct CompilationContext {
    classes: Vec<ClassLayout>,
    class_map: FxHashMap<String, ClassId>,
    builtins: FxHashMap<String, BuiltinFn>,
    array_struct: StructId,
}

impl CompilationContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self {
            classes: Vec::new(),
            class_map: FxHashMap::default(),
            builtins: FxHashMap::default(),
            array_struct: StructId(0),
        }
    }

    /// Record the IR struct backing the runtime array header
    pub fn set_array_struct(&mut self, id: StructId) {
        self.array_struct = id;
    }

    /// The IR struct backing the runtime array header
    pub fn array_struct(&self) -> StructId {
        self.array_struct
    }

    /// Declare a class, returning its id. Declaring an already known
    /// name returns the existing id unchanged.
    pub fn declare_class(&mut self, name: &str, struct_id: StructId) -> ClassId {
        if let Some(&id) = self.class_map.get(name) {
            return id;
        }
        let id = ClassId(self.classes.len() as u32);
        self.classes.push(ClassLayout::new(name, struct_id));
        self.class_map.insert(name.to_string(), id);
        id
    }

    /// True if the name is a declared class
    pub fn has_class(&self, name: &str) -> bool {
        self.class_map.contains_key(name)
    }

    /// Resolve a class name to its id
    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.class_map.get(name).copied()
    }

    /// The IR struct of a class, if declared
    pub fn class_struct_id(&self, name: &str) -> Option<StructId> {
        self.class_id(name).map(|id| self.class(id).struct_id)
    }

    /// Layout of a class by id
    pub fn class(&self, id: ClassId) -> &ClassLayout {
        &self.classes[id.0 as usize]
    }

    /// Mutable layout of a class by id
    pub fn class_mut(&mut self, id: ClassId) -> &mut ClassLayout {
        &mut self.classes[id.0 as usize]
    }

    /// Layout of a class by name
    pub fn class_by_name(&self, name: &str) -> Option<&ClassLayout> {
        self.class_id(name).map(|id| self.class(id))
    }

    /// Number of declared classes
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Ids of all declared classes in declaration order
    pub fn class_ids(&self) -> impl Iterator<Item = ClassId> {
        (0..self.classes.len() as u32).map(ClassId)
    }

    /// Import a builtin module, merging its functions into the call
    /// table under `module.function` keys
    pub fn import_module(&mut self, module: &str, span: Span) -> CompileResult<()> {
        let functions = match module_functions(module) {
            Some(functions) => functions,
            None => {
                return Err(CompileError::UndefinedModule {
                    name: module.to_string(),
                    span,
                })
            }
        };
        for (name, func) in functions {
            self.builtins.insert(format!("{}.{}", module, name), func);
        }
        Ok(())
    }

    /// Look up an imported builtin by its `module.function` key
    pub fn builtin(&self, key: &str) -> Option<BuiltinFn> {
        self.builtins.get(key).copied()
    }
}

impl Default for CompilationContext {
    fn default() -> Self {
        Self::new()
    }
}
