//! Function Definitions
//!
//! Defines IR functions with their parameters, blocks, and metadata.

use forge_common::BlockId;
use serde::{Deserialize, Serialize};
use std::cell::Cell;

use crate::{BasicBlock, IrType};

/// Function in IR
///
/// `stack_size` is the one field a backend may mutate: the frame size it
/// computes during code generation is written back here so ABI-sensitive
/// callers can observe it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub return_type: IrType,
    pub params: Vec<IrType>,
    pub blocks: Vec<BasicBlock>,
    pub is_external: bool,
    pub stack_size: Cell<u32>,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<IrType>, return_type: IrType) -> Self {
        Self {
            name: name.into(),
            return_type,
            params,
            blocks: Vec::new(),
            is_external: false,
            stack_size: Cell::new(0),
        }
    }

    /// An external declaration: no body, no code emitted for it
    pub fn external(name: impl Into<String>, params: Vec<IrType>, return_type: IrType) -> Self {
        let mut f = Self::new(name, params, return_type);
        f.is_external = true;
        f
    }

    pub fn add_block(&mut self, block: BasicBlock) {
        self.blocks.push(block);
    }

    pub fn get_block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn get_block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    pub fn entry_block(&self) -> Option<&BasicBlock> {
        self.blocks.first()
    }
}
