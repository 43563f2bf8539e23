//! Forge Retargetable Backend - Intermediate Representation
//!
//! This crate defines the architecture-neutral IR the backends consume:
//! modules, functions, basic blocks, instructions and values, plus a
//! builder for constructing IR programmatically.
//!
//! The IR is read-only to backends with one documented exception: a
//! backend writes the computed frame size back into `Function::stack_size`
//! during code generation.

pub mod blocks;
pub mod builder;
pub mod function;
pub mod instructions;
pub mod module;
pub mod types;
pub mod values;

pub use blocks::BasicBlock;
pub use builder::{BuildError, IrBuilder};
pub use function::Function;
pub use instructions::{CastKind, Instruction, IrBinaryOp, IrCmpOp};
pub use module::{GlobalInit, GlobalVariable, Module};
pub use types::IrType;
pub use values::Value;
