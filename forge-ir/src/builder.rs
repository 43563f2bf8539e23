//! IR Builder
//!
//! Provides utilities for constructing IR programmatically. The builder is
//! used by the driver's demo programs and by backend tests; backends
//! themselves never construct IR.

use forge_common::{BlockId, TempId};
use thiserror::Error;

use crate::{BasicBlock, CastKind, Function, Instruction, IrBinaryOp, IrCmpOp, IrType, Value};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("no current function")]
    NoCurrentFunction,

    #[error("no current block")]
    NoCurrentBlock,

    #[error("unknown block id {0}")]
    UnknownBlock(BlockId),
}

/// Builder for constructing IR
pub struct IrBuilder {
    current_function: Option<Function>,
    current_block: Option<BlockId>,
    next_temp_id: TempId,
    next_block_id: BlockId,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self {
            current_function: None,
            current_block: None,
            next_temp_id: 0,
            next_block_id: 0,
        }
    }

    pub fn new_temp(&mut self) -> TempId {
        let temp = self.next_temp_id;
        self.next_temp_id += 1;
        temp
    }

    /// Start a new function; temp and block counters reset
    pub fn create_function(&mut self, name: &str, params: Vec<IrType>, return_type: IrType) {
        self.current_function = Some(Function::new(name, params, return_type));
        self.current_block = None;
        self.next_temp_id = 0;
        self.next_block_id = 0;
    }

    /// Create a block and make it current
    pub fn create_block(&mut self, name: &str) -> Result<BlockId, BuildError> {
        let function = self
            .current_function
            .as_mut()
            .ok_or(BuildError::NoCurrentFunction)?;
        let id = self.next_block_id;
        self.next_block_id += 1;
        function.add_block(BasicBlock::new(id, name));
        self.current_block = Some(id);
        Ok(id)
    }

    /// Switch instruction insertion to an existing block
    pub fn switch_to_block(&mut self, id: BlockId) -> Result<(), BuildError> {
        let function = self
            .current_function
            .as_ref()
            .ok_or(BuildError::NoCurrentFunction)?;
        if function.get_block(id).is_none() {
            return Err(BuildError::UnknownBlock(id));
        }
        self.current_block = Some(id);
        Ok(())
    }

    pub fn build_binary(
        &mut self,
        op: IrBinaryOp,
        lhs: Value,
        rhs: Value,
        ty: IrType,
    ) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Binary { result, op, lhs, rhs, ty })?;
        Ok(result)
    }

    pub fn build_cmp(
        &mut self,
        op: IrCmpOp,
        lhs: Value,
        rhs: Value,
    ) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Cmp { result, op, lhs, rhs })?;
        Ok(result)
    }

    pub fn build_alloca(&mut self, ty: IrType) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Alloca { result, ty })?;
        Ok(result)
    }

    pub fn build_load(&mut self, ptr: Value, ty: IrType) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Load { result, ptr, ty })?;
        Ok(result)
    }

    pub fn build_store(&mut self, value: Value, ptr: Value, ty: IrType) -> Result<(), BuildError> {
        self.add_instruction(Instruction::Store { value, ptr, ty })
    }

    pub fn build_gep(
        &mut self,
        ptr: Value,
        index: Value,
        elem_ty: IrType,
    ) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Gep { result, ptr, index, elem_ty })?;
        Ok(result)
    }

    pub fn build_struct_gep(
        &mut self,
        ptr: Value,
        field: usize,
        struct_ty: IrType,
    ) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::StructGep { result, ptr, field, struct_ty })?;
        Ok(result)
    }

    pub fn build_call(
        &mut self,
        callee: Value,
        args: Vec<Value>,
        has_result: bool,
    ) -> Result<Option<TempId>, BuildError> {
        let result = has_result.then(|| self.new_temp());
        self.add_instruction(Instruction::Call { result, callee, args })?;
        Ok(result)
    }

    pub fn build_ret(&mut self, value: Option<Value>) -> Result<(), BuildError> {
        self.add_instruction(Instruction::Ret { value })
    }

    pub fn build_br(&mut self, target: BlockId) -> Result<(), BuildError> {
        self.add_instruction(Instruction::Br { target })
    }

    pub fn build_br_cond(
        &mut self,
        cond: Value,
        then_target: BlockId,
        else_target: BlockId,
    ) -> Result<(), BuildError> {
        self.add_instruction(Instruction::BrCond { cond, then_target, else_target })
    }

    pub fn build_phi(
        &mut self,
        incoming: Vec<(Value, BlockId)>,
        ty: IrType,
    ) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Phi { result, incoming, ty })?;
        Ok(result)
    }

    pub fn build_select(
        &mut self,
        cond: Value,
        on_true: Value,
        on_false: Value,
    ) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Select { result, cond, on_true, on_false })?;
        Ok(result)
    }

    pub fn build_cast(
        &mut self,
        kind: CastKind,
        value: Value,
        from: IrType,
        to: IrType,
    ) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Cast { result, kind, value, from, to })?;
        Ok(result)
    }

    pub fn build_popcnt(&mut self, value: Value) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Popcnt { result, value })?;
        Ok(result)
    }

    pub fn build_bswap(&mut self, value: Value, width: u8) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::Bswap { result, value, width })?;
        Ok(result)
    }

    pub fn build_bytecmp(&mut self, lhs: Value, rhs: Value) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::ByteCmp { result, lhs, rhs })?;
        Ok(result)
    }

    pub fn build_copysign(&mut self, magnitude: Value, sign: Value) -> Result<TempId, BuildError> {
        let result = self.new_temp();
        self.add_instruction(Instruction::CopySign { result, magnitude, sign })?;
        Ok(result)
    }

    fn add_instruction(&mut self, instruction: Instruction) -> Result<(), BuildError> {
        let function = self
            .current_function
            .as_mut()
            .ok_or(BuildError::NoCurrentFunction)?;
        let block_id = self.current_block.ok_or(BuildError::NoCurrentBlock)?;
        let block = function
            .get_block_mut(block_id)
            .ok_or(BuildError::UnknownBlock(block_id))?;
        block.add_instruction(instruction);
        Ok(())
    }

    /// Take the finished function out of the builder
    pub fn finish_function(&mut self) -> Option<Function> {
        self.current_block = None;
        self.current_function.take()
    }
}

impl Default for IrBuilder {
    fn default() -> Self {
        Self::new()
    }
}
