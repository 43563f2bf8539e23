//! IR Instructions
//!
//! The closed instruction set every backend must lower in full. Backends
//! match exhaustively over this enum; adding a variant is a compile error
//! in every backend until it is handled.

use forge_common::{BlockId, TempId};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{IrType, Value};

/// Two-operand integer and float operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrBinaryOp {
    Add,
    Sub,
    Mul,
    Sdiv,
    Udiv,
    Srem,
    Urem,
    And,
    Or,
    Xor,
    Shl,
    Lshr,
    Ashr,
    FAdd,
    FSub,
    FMul,
    FDiv,
}

impl IrBinaryOp {
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            IrBinaryOp::FAdd | IrBinaryOp::FSub | IrBinaryOp::FMul | IrBinaryOp::FDiv
        )
    }
}

/// Integer comparison predicates; result is 0 or 1 in the result temp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrCmpOp {
    Eq,
    Ne,
    Slt,
    Sle,
    Sgt,
    Sge,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl IrCmpOp {
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            IrCmpOp::Slt | IrCmpOp::Sle | IrCmpOp::Sgt | IrCmpOp::Sge
        )
    }
}

/// Conversion kinds carried by `Instruction::Cast`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastKind {
    Trunc,
    Zext,
    Sext,
    Bitcast,
    PtrToInt,
    IntToPtr,
    SiToFp,
    FpToSi,
}

/// IR Instruction
///
/// Instructions belong to exactly one block and are never mutated by a
/// backend. Branch variants carry their target block ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// result = op lhs, rhs
    Binary {
        result: TempId,
        op: IrBinaryOp,
        lhs: Value,
        rhs: Value,
        ty: IrType,
    },

    /// result = (lhs op rhs) ? 1 : 0
    Cmp {
        result: TempId,
        op: IrCmpOp,
        lhs: Value,
        rhs: Value,
    },

    /// result = address of a fresh stack slot of the given type
    Alloca { result: TempId, ty: IrType },

    /// result = load ty, ptr
    Load {
        result: TempId,
        ptr: Value,
        ty: IrType,
    },

    /// store ty value, ptr
    Store {
        value: Value,
        ptr: Value,
        ty: IrType,
    },

    /// result = ptr + index * sizeof(elem_ty)
    Gep {
        result: TempId,
        ptr: Value,
        index: Value,
        elem_ty: IrType,
    },

    /// result = ptr + offsetof(struct_ty, field)
    StructGep {
        result: TempId,
        ptr: Value,
        field: usize,
        struct_ty: IrType,
    },

    /// result = call callee(args...)
    Call {
        result: Option<TempId>,
        callee: Value,
        args: Vec<Value>,
    },

    /// ret value / ret void
    Ret { value: Option<Value> },

    /// br target
    Br { target: BlockId },

    /// br cond, then_target, else_target
    BrCond {
        cond: Value,
        then_target: BlockId,
        else_target: BlockId,
    },

    /// result = phi [value, pred], ...
    Phi {
        result: TempId,
        incoming: Vec<(Value, BlockId)>,
        ty: IrType,
    },

    /// result = cond != 0 ? on_true : on_false
    Select {
        result: TempId,
        cond: Value,
        on_true: Value,
        on_false: Value,
    },

    /// result = convert value between from and to
    Cast {
        result: TempId,
        kind: CastKind,
        value: Value,
        from: IrType,
        to: IrType,
    },

    /// result = number of set bits in value
    Popcnt { result: TempId, value: Value },

    /// result = value with byte order reversed; width is 32 or 64
    Bswap {
        result: TempId,
        value: Value,
        width: u8,
    },

    /// result = per-byte equality mask of lhs and rhs (0xFF where equal)
    ByteCmp {
        result: TempId,
        lhs: Value,
        rhs: Value,
    },

    /// result = |magnitude| carrying the sign of sign (f64)
    CopySign {
        result: TempId,
        magnitude: Value,
        sign: Value,
    },
}

impl Instruction {
    /// The temp this instruction defines, if any
    pub fn result(&self) -> Option<TempId> {
        match self {
            Instruction::Binary { result, .. }
            | Instruction::Cmp { result, .. }
            | Instruction::Alloca { result, .. }
            | Instruction::Load { result, .. }
            | Instruction::Gep { result, .. }
            | Instruction::StructGep { result, .. }
            | Instruction::Phi { result, .. }
            | Instruction::Select { result, .. }
            | Instruction::Cast { result, .. }
            | Instruction::Popcnt { result, .. }
            | Instruction::Bswap { result, .. }
            | Instruction::ByteCmp { result, .. }
            | Instruction::CopySign { result, .. } => Some(*result),
            Instruction::Call { result, .. } => *result,
            Instruction::Store { .. }
            | Instruction::Ret { .. }
            | Instruction::Br { .. }
            | Instruction::BrCond { .. } => None,
        }
    }

    /// Whether this instruction ends a basic block
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Ret { .. } | Instruction::Br { .. } | Instruction::BrCond { .. }
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Binary { result, op, lhs, rhs, ty } => {
                write!(f, "%{result} = {op:?} {ty} {lhs}, {rhs}")
            }
            Instruction::Cmp { result, op, lhs, rhs } => {
                write!(f, "%{result} = cmp {op:?} {lhs}, {rhs}")
            }
            Instruction::Alloca { result, ty } => write!(f, "%{result} = alloca {ty}"),
            Instruction::Load { result, ptr, ty } => {
                write!(f, "%{result} = load {ty}, {ptr}")
            }
            Instruction::Store { value, ptr, ty } => write!(f, "store {ty} {value}, {ptr}"),
            Instruction::Gep { result, ptr, index, elem_ty } => {
                write!(f, "%{result} = gep {elem_ty}, {ptr}, {index}")
            }
            Instruction::StructGep { result, ptr, field, struct_ty } => {
                write!(f, "%{result} = structgep {struct_ty}, {ptr}, {field}")
            }
            Instruction::Call { result, callee, args } => {
                if let Some(result) = result {
                    write!(f, "%{result} = ")?;
                }
                write!(f, "call {callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Instruction::Ret { value: Some(value) } => write!(f, "ret {value}"),
            Instruction::Ret { value: None } => write!(f, "ret void"),
            Instruction::Br { target } => write!(f, "br block{target}"),
            Instruction::BrCond { cond, then_target, else_target } => {
                write!(f, "br {cond}, block{then_target}, block{else_target}")
            }
            Instruction::Phi { result, incoming, ty } => {
                write!(f, "%{result} = phi {ty} ")?;
                for (i, (value, pred)) in incoming.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "[{value}, block{pred}]")?;
                }
                Ok(())
            }
            Instruction::Select { result, cond, on_true, on_false } => {
                write!(f, "%{result} = select {cond}, {on_true}, {on_false}")
            }
            Instruction::Cast { result, kind, value, from, to } => {
                write!(f, "%{result} = {kind:?} {from} {value} to {to}")
            }
            Instruction::Popcnt { result, value } => write!(f, "%{result} = popcnt {value}"),
            Instruction::Bswap { result, value, width } => {
                write!(f, "%{result} = bswap{width} {value}")
            }
            Instruction::ByteCmp { result, lhs, rhs } => {
                write!(f, "%{result} = bytecmp {lhs}, {rhs}")
            }
            Instruction::CopySign { result, magnitude, sign } => {
                write!(f, "%{result} = copysign {magnitude}, {sign}")
            }
        }
    }
}
