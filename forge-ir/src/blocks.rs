//! Basic Blocks
//!
//! A block is a straight-line instruction sequence with one entry and one
//! terminating branch; its name seeds the assembly label the backend
//! derives for it.

use forge_common::BlockId;
use serde::{Deserialize, Serialize};

use crate::Instruction;

/// Basic block in IR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub id: BlockId,
    pub name: String,
    pub instructions: Vec<Instruction>,
}

impl BasicBlock {
    pub fn new(id: BlockId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            instructions: Vec::new(),
        }
    }

    pub fn add_instruction(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn has_terminator(&self) -> bool {
        self.instructions
            .last()
            .is_some_and(|i| i.is_terminator())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn test_terminator_detection() {
        let mut block = BasicBlock::new(0, "entry");
        assert!(!block.has_terminator());

        block.add_instruction(Instruction::Ret {
            value: Some(Value::Constant(0)),
        });
        assert!(block.has_terminator());
    }
}
