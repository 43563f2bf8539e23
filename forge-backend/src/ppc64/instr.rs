//! Instruction Lowering
//!
//! Lowers one IR instruction to PowerPC-64 assembly. The match is
//! exhaustive over the instruction set: an unhandled opcode is a compile
//! error here, never silence at run time. Anything the target cannot
//! express is a reported `Unsupported` error.
//!
//! Register discipline: operands stage through r11 and r12, helpers may
//! clobber r0, and every value-producing instruction leaves its result in
//! r3 (the accumulator).

use forge_common::BackendError;
use forge_ir::{CastKind, Instruction, IrBinaryOp, IrCmpOp, IrType, Value};
use log::trace;

use crate::features::{Feature, FeatureGate};
use crate::ppc64::emulate;
use crate::ppc64::frame::{PARAM_SAVE_BASE, SCRATCH_DOUBLEWORD, TOC_SAVE_OFFSET};
use crate::ppc64::regs::{CrBit, ARG_REGS, R0, RET, SCRATCH_A, SCRATCH_B};
use crate::ppc64::values::{load_imm, load_toc_symbol, load_value};
use crate::ppc64::{block_label, epilogue_label, fresh_label, EmitCtx, SlotKind};

/// Lower one instruction into the context's code buffer
pub(crate) fn emit_instruction(
    ctx: &mut EmitCtx<'_>,
    instruction: &Instruction,
) -> Result<(), BackendError> {
    trace!("lowering {instruction}");
    match instruction {
        Instruction::Binary { op, lhs, rhs, ty, .. } => emit_binary(ctx, *op, lhs, rhs, ty),
        Instruction::Cmp { op, lhs, rhs, .. } => emit_cmp(ctx, *op, lhs, rhs),
        Instruction::Alloca { result, .. } => {
            let offset = ctx
                .layout
                .slot_of_kind(*result, SlotKind::Alloca)
                .ok_or_else(|| {
                    BackendError::Internal(format!("alloca %{result} has no frame slot"))
                })?;
            ctx.buf.ins(format!("addi 3,31,{offset}"));
            Ok(())
        }
        Instruction::Load { ptr, ty, .. } => emit_load(ctx, ptr, ty),
        Instruction::Store { value, ptr, ty } => emit_store(ctx, value, ptr, ty),
        Instruction::Gep { ptr, index, elem_ty, .. } => emit_gep(ctx, ptr, index, elem_ty),
        Instruction::StructGep { ptr, field, struct_ty, .. } => {
            let offset = struct_ty.field_offset(*field).ok_or_else(|| {
                BackendError::Unsupported(format!(
                    "field {field} access into non-struct or out of range: {struct_ty}"
                ))
            })?;
            load_value(ctx, ptr, SCRATCH_A)?;
            ctx.buf.ins(format!("addi 3,11,{offset}"));
            Ok(())
        }
        Instruction::Call { callee, args, .. } => emit_call(ctx, callee, args),
        Instruction::Ret { value } => {
            if let Some(value) = value {
                load_value(ctx, value, RET)?;
            }
            let label = epilogue_label(&ctx.func.name);
            ctx.buf.ins(format!("b {label}"));
            Ok(())
        }
        Instruction::Br { target } => {
            emit_phi_moves(ctx, *target)?;
            let label = block_label(&ctx.func.name, *target);
            ctx.buf.ins(format!("b {label}"));
            Ok(())
        }
        Instruction::BrCond { cond, then_target, else_target } => {
            // Phi slot stores go first: they stage through r11 and must
            // not disturb the condition compare that follows.
            emit_phi_moves(ctx, *then_target)?;
            emit_phi_moves(ctx, *else_target)?;
            load_value(ctx, cond, SCRATCH_A)?;
            ctx.buf.ins("cmpdi 0,11,0");
            let then_label = block_label(&ctx.func.name, *then_target);
            let else_label = block_label(&ctx.func.name, *else_target);
            ctx.buf.ins(format!("bne 0,{then_label}"));
            ctx.buf.ins(format!("b {else_label}"));
            Ok(())
        }
        Instruction::Phi { result, .. } => {
            let offset = ctx
                .layout
                .slot_of_kind(*result, SlotKind::Phi)
                .ok_or_else(|| {
                    BackendError::Internal(format!("phi %{result} has no frame slot"))
                })?;
            ctx.buf.ins(format!("ld 3,{offset}(31)"));
            Ok(())
        }
        Instruction::Select { cond, on_true, on_false, .. } => {
            // Condition goes to r0 via r12 so TOC idioms stay usable
            load_value(ctx, cond, SCRATCH_B)?;
            ctx.buf.ins("mr 0,12");
            load_value(ctx, on_true, SCRATCH_A)?;
            load_value(ctx, on_false, SCRATCH_B)?;
            emulate::emit_select(ctx.buf, &ctx.features, ctx.labels);
            Ok(())
        }
        Instruction::Cast { kind, value, from, to, .. } => emit_cast(ctx, *kind, value, from, to),
        Instruction::Popcnt { value, .. } => {
            load_value(ctx, value, SCRATCH_A)?;
            emulate::emit_popcnt(ctx.buf, &ctx.features);
            Ok(())
        }
        Instruction::Bswap { value, width, .. } => {
            load_value(ctx, value, SCRATCH_A)?;
            emulate::emit_bswap(ctx.buf, &ctx.features, *width)
        }
        Instruction::ByteCmp { lhs, rhs, .. } => {
            load_value(ctx, lhs, SCRATCH_A)?;
            load_value(ctx, rhs, SCRATCH_B)?;
            emulate::emit_bytecmp(ctx.buf, &ctx.features, ctx.labels);
            Ok(())
        }
        Instruction::CopySign { magnitude, sign, .. } => {
            load_value(ctx, magnitude, SCRATCH_A)?;
            load_value(ctx, sign, SCRATCH_B)?;
            emulate::emit_copysign(ctx.buf, &ctx.features, ctx.labels);
            Ok(())
        }
    }
}

fn emit_binary(
    ctx: &mut EmitCtx<'_>,
    op: IrBinaryOp,
    lhs: &Value,
    rhs: &Value,
    ty: &IrType,
) -> Result<(), BackendError> {
    load_value(ctx, lhs, SCRATCH_A)?;
    load_value(ctx, rhs, SCRATCH_B)?;

    if op.is_float() {
        if !ty.is_float() {
            return Err(BackendError::Unsupported(format!(
                "float operation {op:?} on {ty}"
            )));
        }
        return emit_float_binary(ctx, op);
    }

    match op {
        IrBinaryOp::Add => ctx.buf.ins("add 3,11,12"),
        IrBinaryOp::Sub => ctx.buf.ins("subf 3,12,11"),
        IrBinaryOp::Mul => ctx.buf.ins("mulld 3,11,12"),
        IrBinaryOp::Sdiv => ctx.buf.ins("divd 3,11,12"),
        IrBinaryOp::Udiv => ctx.buf.ins("divdu 3,11,12"),
        IrBinaryOp::Srem => {
            // No hardware remainder: r = a - (a / b) * b
            ctx.buf.ins("divd 0,11,12");
            ctx.buf.ins("mulld 0,0,12");
            ctx.buf.ins("subf 3,0,11");
        }
        IrBinaryOp::Urem => {
            ctx.buf.ins("divdu 0,11,12");
            ctx.buf.ins("mulld 0,0,12");
            ctx.buf.ins("subf 3,0,11");
        }
        IrBinaryOp::And => ctx.buf.ins("and 3,11,12"),
        IrBinaryOp::Or => ctx.buf.ins("or 3,11,12"),
        IrBinaryOp::Xor => ctx.buf.ins("xor 3,11,12"),
        IrBinaryOp::Shl => ctx.buf.ins("sld 3,11,12"),
        IrBinaryOp::Lshr => ctx.buf.ins("srd 3,11,12"),
        IrBinaryOp::Ashr => ctx.buf.ins("srad 3,11,12"),
        IrBinaryOp::FAdd | IrBinaryOp::FSub | IrBinaryOp::FMul | IrBinaryOp::FDiv => {
            unreachable!("float ops handled above")
        }
    }
    Ok(())
}

/// f64 arithmetic: operand bit patterns ride in GPRs and stage into the
/// FPRs through the frame scratch doubleword.
fn emit_float_binary(ctx: &mut EmitCtx<'_>, op: IrBinaryOp) -> Result<(), BackendError> {
    let scratch = SCRATCH_DOUBLEWORD;
    ctx.buf.ins(format!("std 11,{scratch}(31)"));
    ctx.buf.ins(format!("lfd 1,{scratch}(31)"));
    ctx.buf.ins(format!("std 12,{scratch}(31)"));
    ctx.buf.ins(format!("lfd 2,{scratch}(31)"));
    let mnemonic = match op {
        IrBinaryOp::FAdd => "fadd",
        IrBinaryOp::FSub => "fsub",
        IrBinaryOp::FMul => "fmul",
        IrBinaryOp::FDiv => "fdiv",
        _ => unreachable!("caller filters to float ops"),
    };
    ctx.buf.ins(format!("{mnemonic} 1,1,2"));
    ctx.buf.ins(format!("stfd 1,{scratch}(31)"));
    ctx.buf.ins(format!("ld 3,{scratch}(31)"));
    Ok(())
}

fn emit_cmp(
    ctx: &mut EmitCtx<'_>,
    op: IrCmpOp,
    lhs: &Value,
    rhs: &Value,
) -> Result<(), BackendError> {
    load_value(ctx, lhs, SCRATCH_A)?;
    load_value(ctx, rhs, SCRATCH_B)?;
    if op.is_signed() || matches!(op, IrCmpOp::Eq | IrCmpOp::Ne) {
        ctx.buf.ins("cmpd 0,11,12");
    } else {
        ctx.buf.ins("cmpld 0,11,12");
    }

    let (bit, negate) = match op {
        IrCmpOp::Eq => (CrBit::Eq, false),
        IrCmpOp::Ne => (CrBit::Eq, true),
        IrCmpOp::Slt | IrCmpOp::Ult => (CrBit::Lt, false),
        IrCmpOp::Sge | IrCmpOp::Uge => (CrBit::Lt, true),
        IrCmpOp::Sgt | IrCmpOp::Ugt => (CrBit::Gt, false),
        IrCmpOp::Sle | IrCmpOp::Ule => (CrBit::Gt, true),
    };

    if ctx.features.has(Feature::PredicatedSelect) {
        ctx.buf.ins("li 12,1");
        ctx.buf.ins("li 3,0");
        if negate {
            ctx.buf.ins(format!("isel 3,3,12,{}", bit.index()));
        } else {
            ctx.buf.ins(format!("isel 3,12,3,{}", bit.index()));
        }
    } else {
        let fail = match (bit, negate) {
            (CrBit::Eq, false) => "bne",
            (CrBit::Eq, true) => "beq",
            (CrBit::Lt, false) => "bge",
            (CrBit::Lt, true) => "blt",
            (CrBit::Gt, false) => "ble",
            (CrBit::Gt, true) => "bgt",
            (CrBit::So, _) => unreachable!("comparisons never test SO"),
        };
        let skip = fresh_label(ctx.labels);
        ctx.buf.ins("li 3,0");
        ctx.buf.ins(format!("{fail} 0,{skip}"));
        ctx.buf.ins("li 3,1");
        ctx.buf.label(&skip);
    }
    Ok(())
}

/// Load mnemonic for a scalar type; aggregates cannot be loaded whole
fn load_op(ty: &IrType) -> Result<&'static str, BackendError> {
    match ty {
        IrType::I8 => Ok("lbz"),
        IrType::I16 => Ok("lhz"),
        IrType::I32 => Ok("lwz"),
        IrType::I64 | IrType::Ptr | IrType::F64 => Ok("ld"),
        IrType::Void | IrType::Array { .. } | IrType::Struct(_) => Err(
            BackendError::Unsupported(format!("load of non-scalar type {ty}")),
        ),
    }
}

fn store_op(ty: &IrType) -> Result<&'static str, BackendError> {
    match ty {
        IrType::I8 => Ok("stb"),
        IrType::I16 => Ok("sth"),
        IrType::I32 => Ok("stw"),
        IrType::I64 | IrType::Ptr | IrType::F64 => Ok("std"),
        IrType::Void | IrType::Array { .. } | IrType::Struct(_) => Err(
            BackendError::Unsupported(format!("store of non-scalar type {ty}")),
        ),
    }
}

/// Frame slot backing a pointer value, when it has one
fn alloca_slot(ctx: &EmitCtx<'_>, ptr: &Value) -> Option<u32> {
    match ptr {
        Value::Temp(temp) => ctx.layout.slot_of_kind(*temp, SlotKind::Alloca),
        _ => None,
    }
}

/// Memory access forms, in priority order: a frame slot is addressed
/// directly off r31, a global directly through its TOC entry, and only a
/// computed pointer pays for materialization into a register.
fn emit_load(ctx: &mut EmitCtx<'_>, ptr: &Value, ty: &IrType) -> Result<(), BackendError> {
    let op = load_op(ty)?;
    if let Some(offset) = alloca_slot(ctx, ptr) {
        ctx.buf.ins(format!("{op} 3,{offset}(31)"));
    } else if let Value::Global(name) = ptr {
        load_toc_symbol(ctx.buf, SCRATCH_A, name);
        ctx.buf.ins(format!("{op} 3,0(11)"));
    } else {
        load_value(ctx, ptr, SCRATCH_A)?;
        ctx.buf.ins(format!("{op} 3,0(11)"));
    }
    Ok(())
}

fn emit_store(
    ctx: &mut EmitCtx<'_>,
    value: &Value,
    ptr: &Value,
    ty: &IrType,
) -> Result<(), BackendError> {
    let op = store_op(ty)?;
    load_value(ctx, value, SCRATCH_B)?;
    if let Some(offset) = alloca_slot(ctx, ptr) {
        ctx.buf.ins(format!("{op} 12,{offset}(31)"));
    } else if let Value::Global(name) = ptr {
        load_toc_symbol(ctx.buf, SCRATCH_A, name);
        ctx.buf.ins(format!("{op} 12,0(11)"));
    } else {
        load_value(ctx, ptr, SCRATCH_A)?;
        ctx.buf.ins(format!("{op} 12,0(11)"));
    }
    Ok(())
}

fn emit_gep(
    ctx: &mut EmitCtx<'_>,
    ptr: &Value,
    index: &Value,
    elem_ty: &IrType,
) -> Result<(), BackendError> {
    let size = elem_ty.size_in_bytes();
    if size == 0 {
        return Err(BackendError::Unsupported(format!(
            "element arithmetic on zero-sized type {elem_ty}"
        )));
    }
    load_value(ctx, ptr, SCRATCH_A)?;

    if let Value::Constant(index) = index {
        let offset = index * size as i64;
        if let Ok(offset) = i16::try_from(offset) {
            ctx.buf.ins(format!("addi 3,11,{offset}"));
        } else {
            load_imm(ctx.buf, SCRATCH_B, offset);
            ctx.buf.ins("add 3,11,12");
        }
        return Ok(());
    }

    load_value(ctx, index, SCRATCH_B)?;
    if size > 1 {
        if size.is_power_of_two() {
            ctx.buf.ins(format!("sldi 12,12,{}", size.trailing_zeros()));
        } else if let Ok(size) = i16::try_from(size) {
            ctx.buf.ins(format!("mulli 12,12,{size}"));
        } else {
            load_imm(ctx.buf, R0, size as i64);
            ctx.buf.ins("mulld 12,12,0");
        }
    }
    ctx.buf.ins("add 3,11,12");
    Ok(())
}

fn emit_call(ctx: &mut EmitCtx<'_>, callee: &Value, args: &[Value]) -> Result<(), BackendError> {
    // An indirect callee is resolved first and parked in the scratch
    // doubleword, before argument staging claims the scratch registers.
    let direct = match callee {
        Value::Global(name) | Value::Function(name) => Some(name.clone()),
        _ => None,
    };
    if direct.is_none() {
        load_value(ctx, callee, SCRATCH_A)?;
        ctx.buf
            .ins(format!("std 11,{SCRATCH_DOUBLEWORD}(31)"));
    }

    // Stacked arguments (9+) go out before the register arguments so that
    // staging through r11 cannot clobber an already-placed r3..r10.
    for (i, arg) in args.iter().enumerate().skip(ARG_REGS.len()) {
        load_value(ctx, arg, SCRATCH_A)?;
        let offset = PARAM_SAVE_BASE + 8 * i as u32;
        ctx.buf.ins(format!("std 11,{offset}(1)"));
    }
    for (i, arg) in args.iter().enumerate().take(ARG_REGS.len()) {
        load_value(ctx, arg, ARG_REGS[i])?;
    }

    ctx.buf.ins(format!("std 2,{TOC_SAVE_OFFSET}(1)"));
    match direct {
        Some(name) => {
            ctx.buf.ins(format!("bl {name}"));
            ctx.buf.ins("nop");
        }
        None => {
            // Function descriptor: entry point at +0, callee TOC at +8
            ctx.buf
                .ins(format!("ld 11,{SCRATCH_DOUBLEWORD}(31)"));
            ctx.buf.ins("ld 12,0(11)");
            ctx.buf.ins("ld 2,8(11)");
            ctx.buf.ins("mtctr 12");
            ctx.buf.ins("bctrl");
        }
    }
    ctx.buf.ins(format!("ld 2,{TOC_SAVE_OFFSET}(1)"));
    Ok(())
}

/// Store the values a target block's phis expect from this edge into
/// their frame slots. Runs in the predecessor, before its branch.
fn emit_phi_moves(ctx: &mut EmitCtx<'_>, target: forge_common::BlockId) -> Result<(), BackendError> {
    let Some(block) = ctx.func.get_block(target) else {
        return Err(BackendError::Internal(format!(
            "branch to unknown block {target}"
        )));
    };
    let moves: Vec<(forge_common::TempId, Value)> = block
        .instructions
        .iter()
        .filter_map(|instruction| {
            let Instruction::Phi { result, incoming, .. } = instruction else {
                return None;
            };
            incoming
                .iter()
                .find(|(_, pred)| *pred == ctx.current_block)
                .map(|(value, _)| (*result, value.clone()))
        })
        .collect();
    for (result, value) in moves {
        let offset = ctx
            .layout
            .slot_of_kind(result, SlotKind::Phi)
            .ok_or_else(|| BackendError::Internal(format!("phi %{result} has no frame slot")))?;
        load_value(ctx, &value, SCRATCH_A)?;
        ctx.buf.ins(format!("std 11,{offset}(31)"));
    }
    Ok(())
}

fn emit_cast(
    ctx: &mut EmitCtx<'_>,
    kind: CastKind,
    value: &Value,
    from: &IrType,
    to: &IrType,
) -> Result<(), BackendError> {
    load_value(ctx, value, SCRATCH_A)?;
    match kind {
        CastKind::Trunc => {
            let bits = to.size_in_bytes() * 8;
            if bits == 0 {
                return Err(BackendError::Unsupported(format!(
                    "truncation to zero-width type {to}"
                )));
            }
            if bits >= 64 {
                ctx.buf.ins("mr 3,11");
            } else {
                ctx.buf.ins(format!("rldicl 3,11,0,{}", 64 - bits));
            }
        }
        CastKind::Zext => {
            let bits = from.size_in_bytes() * 8;
            if bits == 0 {
                return Err(BackendError::Unsupported(format!(
                    "zero extension from zero-width type {from}"
                )));
            }
            if bits >= 64 {
                ctx.buf.ins("mr 3,11");
            } else {
                ctx.buf.ins(format!("rldicl 3,11,0,{}", 64 - bits));
            }
        }
        CastKind::Sext => match from {
            IrType::I8 => ctx.buf.ins("extsb 3,11"),
            IrType::I16 => ctx.buf.ins("extsh 3,11"),
            IrType::I32 => ctx.buf.ins("extsw 3,11"),
            _ => ctx.buf.ins("mr 3,11"),
        },
        CastKind::Bitcast | CastKind::PtrToInt | CastKind::IntToPtr => {
            ctx.buf.ins("mr 3,11");
        }
        CastKind::SiToFp => {
            match from {
                IrType::I8 => ctx.buf.ins("extsb 11,11"),
                IrType::I16 => ctx.buf.ins("extsh 11,11"),
                IrType::I32 => ctx.buf.ins("extsw 11,11"),
                _ => {}
            }
            let scratch = SCRATCH_DOUBLEWORD;
            ctx.buf.ins(format!("std 11,{scratch}(31)"));
            ctx.buf.ins(format!("lfd 1,{scratch}(31)"));
            ctx.buf.ins("fcfid 1,1");
            ctx.buf.ins(format!("stfd 1,{scratch}(31)"));
            ctx.buf.ins(format!("ld 3,{scratch}(31)"));
        }
        CastKind::FpToSi => {
            let scratch = SCRATCH_DOUBLEWORD;
            ctx.buf.ins(format!("std 11,{scratch}(31)"));
            ctx.buf.ins(format!("lfd 1,{scratch}(31)"));
            match to {
                IrType::I64 | IrType::Ptr => {
                    ctx.buf.ins("fctidz 1,1");
                    ctx.buf.ins(format!("stfd 1,{scratch}(31)"));
                    ctx.buf.ins(format!("ld 3,{scratch}(31)"));
                }
                IrType::I32 | IrType::I16 | IrType::I8 => {
                    // fctiwz leaves the word in the low half; big-endian
                    // puts it at scratch+4
                    ctx.buf.ins("fctiwz 1,1");
                    ctx.buf.ins(format!("stfd 1,{scratch}(31)"));
                    ctx.buf.ins(format!("lwa 3,{}(31)", scratch + 4));
                    match to {
                        IrType::I8 => ctx.buf.ins("extsb 3,3"),
                        IrType::I16 => ctx.buf.ins("extsh 3,3"),
                        _ => {}
                    }
                }
                other => {
                    return Err(BackendError::Unsupported(format!(
                        "float to integer conversion targeting {other}"
                    )));
                }
            }
        }
    }
    Ok(())
}
