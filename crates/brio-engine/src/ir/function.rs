//! IR Functions
//!
//! Functions contain typed parameter registers and basic blocks. Methods are
//! plain functions named `Class.method` whose final parameter is the
//! receiver pointer.

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::block::{BasicBlock, BasicBlockId, Terminator};
use super::value::{IrType, Register};

/// An IR function
#[derive(Debug, Clone, Serialize)]
pub struct IrFunction {
    /// Function name (`main` or `Class.method`)
    pub name: String,
    /// Parameter registers, in call order
    pub params: Vec<Register>,
    /// Return type; `None` for void
    pub return_ty: Option<IrType>,
    /// Basic blocks (in creation order)
    pub blocks: Vec<BasicBlock>,
    /// Entry block ID
    pub entry_block: BasicBlockId,
    /// Block lookup map for fast access
    #[serde(skip)]
    block_map: FxHashMap<BasicBlockId, usize>,
}

impl IrFunction {
    /// Create a new function with no blocks
    pub fn new(name: impl Into<String>, params: Vec<Register>, return_ty: Option<IrType>) -> Self {
        Self {
            name: name.into(),
            params,
            return_ty,
            blocks: Vec::new(),
            entry_block: BasicBlockId(0),
            block_map: FxHashMap::default(),
        }
    }

    /// Add a basic block and return its ID
    pub fn add_block(&mut self, block: BasicBlock) -> BasicBlockId {
        let id = block.id;
        let index = self.blocks.len();
        self.block_map.insert(id, index);
        self.blocks.push(block);
        id
    }

    /// Get a block by ID
    pub fn get_block(&self, id: BasicBlockId) -> Option<&BasicBlock> {
        self.block_map.get(&id).map(|&idx| &self.blocks[idx])
    }

    /// Get a mutable block by ID
    pub fn get_block_mut(&mut self, id: BasicBlockId) -> Option<&mut BasicBlock> {
        self.block_map
            .get(&id)
            .copied()
            .map(|idx| &mut self.blocks[idx])
    }

    /// Get the entry block
    pub fn entry(&self) -> Option<&BasicBlock> {
        self.get_block(self.entry_block)
    }

    /// Number of blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of parameters
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Iterate over all blocks
    pub fn blocks(&self) -> impl Iterator<Item = &BasicBlock> {
        self.blocks.iter()
    }

    /// Total number of instructions across all blocks
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|b| b.len()).sum()
    }

    /// Validate the function structure
    pub fn validate(&self) -> Result<(), String> {
        if self.blocks.is_empty() {
            return Err("function has no blocks".to_string());
        }

        if self.get_block(self.entry_block).is_none() {
            return Err(format!("entry block {} does not exist", self.entry_block));
        }

        for block in &self.blocks {
            let term = match &block.terminator {
                Some(term) => term,
                None => return Err(format!("block {} is not terminated", block.id)),
            };

            if let Terminator::Return(value) = term {
                match (value, &self.return_ty) {
                    (Some(_), None) => {
                        return Err(format!("block {} returns a value from a void function", block.id));
                    }
                    (None, Some(_)) => {
                        return Err(format!("block {} returns no value from a valued function", block.id));
                    }
                    _ => {}
                }
            }

            for succ in block.successors() {
                if self.get_block(succ).is_none() {
                    return Err(format!(
                        "block {} references non-existent successor {}",
                        block.id, succ
                    ));
                }
            }
        }

        Ok(())
    }
}
