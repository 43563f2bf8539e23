//! Value Materialization
//!
//! Brings any IR `Value` into a target GPR. Constants are built with the
//! shortest immediate sequence for their range, addresses go through the
//! TOC, and temps resolve against the frame layout (alloca slots yield
//! addresses, phi slots yield loads, anything else is the accumulator).

use forge_common::BackendError;
use forge_ir::Value;

use crate::buffer::AsmBuffer;
use crate::ppc64::frame::PARAM_SAVE_BASE;
use crate::ppc64::regs::{Gpr, RET};
use crate::ppc64::{EmitCtx, SlotKind};

/// Instruction-count tier `load_imm` will use for a constant (zero
/// halfwords inside a tier may shave emitted instructions off this)
pub fn imm_instruction_count(value: i64) -> u32 {
    if i16::try_from(value).is_ok() {
        1
    } else if i32::try_from(value).is_ok() {
        2
    } else {
        5
    }
}

/// Materialize an integer constant into a register
///
/// Three tiers: `li` for 16-bit, `lis`+`ori` for 32-bit, and the full
/// five-instruction build (high half, shift, low half) for 64-bit.
pub fn load_imm(buf: &mut AsmBuffer, target: Gpr, value: i64) {
    if i16::try_from(value).is_ok() {
        buf.ins(format!("li {target},{value}"));
    } else if i32::try_from(value).is_ok() {
        let high = (value >> 16) as i16;
        let low = value as u16;
        buf.ins(format!("lis {target},{high}"));
        if low != 0 {
            buf.ins(format!("ori {target},{target},{low}"));
        }
    } else {
        let bits = value as u64;
        let hh = (bits >> 48) as i16;
        let hl = (bits >> 32) as u16;
        let lh = (bits >> 16) as u16;
        let ll = bits as u16;
        buf.ins(format!("lis {target},{hh}"));
        if hl != 0 {
            buf.ins(format!("ori {target},{target},{hl}"));
        }
        buf.ins(format!("sldi {target},{target},32"));
        if lh != 0 {
            buf.ins(format!("oris {target},{target},{lh}"));
        }
        if ll != 0 {
            buf.ins(format!("ori {target},{target},{ll}"));
        }
    }
}

/// Load the address of a TOC-resident symbol (global or function descriptor)
pub fn load_toc_symbol(buf: &mut AsmBuffer, target: Gpr, symbol: &str) {
    buf.ins(format!("addis {target},2,{symbol}@toc@ha"));
    buf.ins(format!("ld {target},{symbol}@toc@l({target})"));
}

/// Load the address of a local data label (rodata strings)
fn load_toc_label(buf: &mut AsmBuffer, target: Gpr, label: &str) {
    buf.ins(format!("addis {target},2,{label}@toc@ha"));
    buf.ins(format!("addi {target},{target},{label}@toc@l"));
}

/// Bring `value` into `target`
pub(crate) fn load_value(
    ctx: &mut EmitCtx<'_>,
    value: &Value,
    target: Gpr,
) -> Result<(), BackendError> {
    match value {
        Value::Constant(c) => load_imm(ctx.buf, target, *c),
        Value::ConstantFloat(f) => load_imm(ctx.buf, target, f.to_bits() as i64),
        Value::ConstantString(s) => {
            let label = ctx.strings.intern(s);
            load_toc_label(ctx.buf, target, &label);
        }
        Value::Null => ctx.buf.ins(format!("li {target},0")),
        Value::Param(index) => {
            // Every parameter lives in the caller's parameter save area:
            // register params are home-spilled there by the prologue,
            // stacked params were placed there by the caller.
            let offset = ctx.layout.stack_size + PARAM_SAVE_BASE + 8 * (*index as u32);
            ctx.buf.ins(format!("ld {target},{offset}(31)"));
        }
        Value::Temp(temp) => {
            if let Some(offset) = ctx.layout.slot_of_kind(*temp, SlotKind::Alloca) {
                ctx.buf.ins(format!("addi {target},31,{offset}"));
            } else if let Some(offset) = ctx.layout.slot_of_kind(*temp, SlotKind::Phi) {
                ctx.buf.ins(format!("ld {target},{offset}(31)"));
            } else if target != RET {
                // Non-slot temps live in the accumulator after their def
                ctx.buf.ins(format!("mr {target},3"));
            }
        }
        Value::Global(name) | Value::Function(name) => {
            load_toc_symbol(ctx.buf, target, name);
        }
    }
    Ok(())
}
