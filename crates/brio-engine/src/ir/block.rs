//! Basic Blocks and Control Flow
//!
//! A block is OPEN while its terminator is `None` and TERMINATED once it is
//! set. Appending instructions or a second terminator to a TERMINATED block
//! is a no-op, so lowering code that has already branched away (after a
//! `return` or `break`) never has to guard its emissions.

use serde::Serialize;

use super::instr::IrInstr;
use super::value::Register;

/// Basic block identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BasicBlockId(pub u32);

impl BasicBlockId {
    /// Wraps a raw id
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw id value
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for BasicBlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A basic block: sequence of instructions with a single entry and exit
#[derive(Debug, Clone, Serialize)]
pub struct BasicBlock {
    /// Unique identifier for this block
    pub id: BasicBlockId,
    /// Optional label for debugging
    pub label: Option<String>,
    /// Instructions in this block (excluding the terminator)
    pub instructions: Vec<IrInstr>,
    /// `None` while the block is OPEN; exactly one terminator once set
    pub terminator: Option<Terminator>,
}

impl BasicBlock {
    /// Create a new empty (OPEN) basic block
    pub fn new(id: BasicBlockId) -> Self {
        Self {
            id,
            label: None,
            instructions: Vec::new(),
            terminator: None,
        }
    }

    /// Create a new basic block with a label
    pub fn with_label(id: BasicBlockId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: Some(label.into()),
            instructions: Vec::new(),
            terminator: None,
        }
    }

    /// Append an instruction. No-op if the block is already terminated.
    pub fn add_instr(&mut self, instr: IrInstr) {
        if self.terminator.is_none() {
            self.instructions.push(instr);
        }
    }

    /// Set the terminator. No-op if one is already set.
    pub fn set_terminator(&mut self, term: Terminator) {
        if self.terminator.is_none() {
            self.terminator = Some(term);
        }
    }

    /// Whether this block has a terminator
    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }

    /// Successor blocks of the terminator, if set
    pub fn successors(&self) -> Vec<BasicBlockId> {
        self.terminator
            .as_ref()
            .map(|t| t.successors())
            .unwrap_or_default()
    }

    /// Number of instructions (excluding the terminator)
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the block has no instructions
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// Control flow terminator (ends a basic block)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Terminator {
    /// Unconditional jump to target block
    Jump(BasicBlockId),

    /// Conditional branch on an `i1` register
    Branch {
        cond: Register,
        then_block: BasicBlockId,
        else_block: BasicBlockId,
    },

    /// Return from the function with an optional value
    Return(Option<Register>),

    /// Control never leaves this block (trap continuations)
    Unreachable,
}

impl Terminator {
    /// All successor blocks
    pub fn successors(&self) -> Vec<BasicBlockId> {
        match self {
            Terminator::Jump(target) => vec![*target],
            Terminator::Branch {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            Terminator::Return(_) => vec![],
            Terminator::Unreachable => vec![],
        }
    }
}

impl std::fmt::Display for Terminator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Terminator::Jump(target) => write!(f, "jump {}", target),
            Terminator::Branch {
                cond,
                then_block,
                else_block,
            } => write!(f, "branch {} ? {} : {}", cond, then_block, else_block),
            Terminator::Return(None) => write!(f, "return"),
            Terminator::Return(Some(reg)) => write!(f, "return {}", reg),
            Terminator::Unreachable => write!(f, "unreachable"),
        }
    }
}
