//! IR Module
//!
//! Top-level container for a compiled program: one function per method plus
//! the entry function, and one struct per user class. The module is the
//! hand-off artifact for the downstream code generator, exportable as JSON.

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::function::IrFunction;
use super::instr::FunctionId;
use super::value::{IrType, StructId};

/// A struct type registered in the module. Classes are predeclared as
/// opaque structs (no field list) and defined later, so self- and
/// mutually-referential field types resolve without recursion.
#[derive(Debug, Clone, Serialize)]
pub struct IrStruct {
    /// Struct name (the class name)
    pub name: String,
    /// Field representations in slot order; empty while opaque
    pub fields: Vec<IrType>,
    /// Whether the field list has been populated
    pub defined: bool,
}

impl IrStruct {
    /// Create a new opaque struct
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            defined: false,
        }
    }
}

/// An IR module (compilation unit)
#[derive(Debug, Clone, Serialize)]
pub struct IrModule {
    /// Module name
    pub name: String,
    /// Functions in this module
    pub functions: Vec<IrFunction>,
    /// Struct types in this module
    pub structs: Vec<IrStruct>,
    /// Function lookup by name
    #[serde(skip)]
    function_map: FxHashMap<String, FunctionId>,
    /// Struct lookup by name
    #[serde(skip)]
    struct_map: FxHashMap<String, StructId>,
}

impl IrModule {
    /// Create a new empty module
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            structs: Vec::new(),
            function_map: FxHashMap::default(),
            struct_map: FxHashMap::default(),
        }
    }

    /// Add a function to the module
    pub fn add_function(&mut self, func: IrFunction) -> FunctionId {
        let id = FunctionId(self.functions.len() as u32);
        self.function_map.insert(func.name.clone(), id);
        self.functions.push(func);
        id
    }

    /// Register a new opaque struct
    pub fn add_struct(&mut self, name: impl Into<String>) -> StructId {
        let name = name.into();
        let id = StructId(self.structs.len() as u32);
        self.struct_map.insert(name.clone(), id);
        self.structs.push(IrStruct::new(name));
        id
    }

    /// Populate the field list of a previously added struct
    pub fn define_struct(&mut self, id: StructId, fields: Vec<IrType>) {
        if let Some(s) = self.structs.get_mut(id.0 as usize) {
            s.fields = fields;
            s.defined = true;
        }
    }

    /// Get a function by ID
    pub fn get_function(&self, id: FunctionId) -> Option<&IrFunction> {
        self.functions.get(id.0 as usize)
    }

    /// Get a function by ID mutably
    pub fn get_function_mut(&mut self, id: FunctionId) -> Option<&mut IrFunction> {
        self.functions.get_mut(id.0 as usize)
    }

    /// Get a function by name
    pub fn get_function_by_name(&self, name: &str) -> Option<&IrFunction> {
        self.function_map
            .get(name)
            .and_then(|&id| self.get_function(id))
    }

    /// Get a function ID by name
    pub fn get_function_id(&self, name: &str) -> Option<FunctionId> {
        self.function_map.get(name).copied()
    }

    /// Get a struct by ID
    pub fn get_struct(&self, id: StructId) -> Option<&IrStruct> {
        self.structs.get(id.0 as usize)
    }

    /// Get a struct ID by name
    pub fn get_struct_id(&self, name: &str) -> Option<StructId> {
        self.struct_map.get(name).copied()
    }

    /// Number of functions
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    /// Number of structs
    pub fn struct_count(&self) -> usize {
        self.structs.len()
    }

    /// Iterate over all functions
    pub fn functions(&self) -> impl Iterator<Item = &IrFunction> {
        self.functions.iter()
    }

    /// Validate the entire module
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (i, func) in self.functions.iter().enumerate() {
            if let Err(e) = func.validate() {
                errors.push(format!("function '{}' ({}): {}", func.name, i, e));
            }
        }

        for s in &self.structs {
            if !s.defined {
                errors.push(format!("struct '{}' was declared but never defined", s.name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Total instruction count across all functions
    pub fn total_instruction_count(&self) -> usize {
        self.functions.iter().map(|f| f.instruction_count()).sum()
    }

    /// Serialize the module to pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
