//! Native-or-Emulated Lowering
//!
//! Each routine here has two renditions: a single native instruction when
//! the selected CPU model provides it, and a baseline sequence built from
//! instructions every 64-bit PowerPC has. Operands are staged by the
//! caller before entry: condition in r0, first operand in r11, second in
//! r12. The result always lands in r3.

use forge_common::BackendError;

use crate::buffer::AsmBuffer;
use crate::features::{Feature, FeatureGate, Ppc64Features};
use crate::ppc64::fresh_label;
use crate::ppc64::frame::SCRATCH_DOUBLEWORD;
use crate::ppc64::values::load_imm;
use crate::ppc64::regs::{SCRATCH_B, RET};

/// Select between r11 (condition true) and r12 (condition false) on the
/// condition staged in r0.
pub fn emit_select(buf: &mut AsmBuffer, gate: &Ppc64Features, labels: &mut u32) {
    buf.ins("cmpdi 0,0,0");
    if gate.has(Feature::PredicatedSelect) {
        // EQ set means the condition was zero, so pick the false value
        buf.ins("isel 3,12,11,2");
    } else {
        let skip = fresh_label(labels);
        buf.ins("mr 3,11");
        buf.ins(format!("bne 0,{skip}"));
        buf.ins("mr 3,12");
        buf.label(&skip);
    }
}

/// Population count of r11
pub fn emit_popcnt(buf: &mut AsmBuffer, gate: &Ppc64Features) {
    if gate.has(Feature::PopulationCount) {
        buf.ins("popcntd 3,11");
        return;
    }
    // Parallel bit-count: fold pairs, nibbles, then sum bytes by multiply
    buf.ins("srdi 0,11,1");
    load_imm(buf, SCRATCH_B, 0x5555_5555_5555_5555);
    buf.ins("and 0,0,12");
    buf.ins("subf 11,0,11");
    load_imm(buf, SCRATCH_B, 0x3333_3333_3333_3333);
    buf.ins("and 0,11,12");
    buf.ins("srdi 11,11,2");
    buf.ins("and 11,11,12");
    buf.ins("add 11,0,11");
    buf.ins("srdi 0,11,4");
    buf.ins("add 11,11,0");
    load_imm(buf, SCRATCH_B, 0x0f0f_0f0f_0f0f_0f0f);
    buf.ins("and 11,11,12");
    load_imm(buf, SCRATCH_B, 0x0101_0101_0101_0101);
    buf.ins("mulld 11,11,12");
    buf.ins("srdi 3,11,56");
}

/// Byte-reverse r11; `width` is 32 or 64
pub fn emit_bswap(
    buf: &mut AsmBuffer,
    gate: &Ppc64Features,
    width: u8,
) -> Result<(), BackendError> {
    match width {
        64 => {
            if gate.has(Feature::ByteSwap) {
                buf.ins("brd 3,11");
            } else {
                // Swap adjacent bytes, then halfwords, then word halves
                load_imm(buf, SCRATCH_B, 0x00ff_00ff_00ff_00ff);
                buf.ins("and 0,11,12");
                buf.ins("sldi 0,0,8");
                buf.ins("srdi 11,11,8");
                buf.ins("and 11,11,12");
                buf.ins("or 11,0,11");
                load_imm(buf, SCRATCH_B, 0x0000_ffff_0000_ffff);
                buf.ins("and 0,11,12");
                buf.ins("sldi 0,0,16");
                buf.ins("srdi 11,11,16");
                buf.ins("and 11,11,12");
                buf.ins("or 11,0,11");
                buf.ins("rotldi 3,11,32");
            }
            Ok(())
        }
        32 => {
            if gate.has(Feature::ByteSwap) {
                buf.ins("brw 3,11");
                buf.ins("rldicl 3,3,0,32");
            } else {
                load_imm(buf, SCRATCH_B, 0x00ff_00ff);
                buf.ins("and 0,11,12");
                buf.ins("slwi 0,0,8");
                buf.ins("srwi 11,11,8");
                buf.ins("and 11,11,12");
                buf.ins("or 11,0,11");
                buf.ins("rotlwi 3,11,16");
            }
            Ok(())
        }
        other => Err(BackendError::Unsupported(format!(
            "byte swap width {other} (must be 32 or 64)"
        ))),
    }
}

/// Per-byte equality mask of r11 and r12: result byte is 0xff where the
/// operand bytes are equal, 0x00 where they differ.
pub fn emit_bytecmp(buf: &mut AsmBuffer, gate: &Ppc64Features, labels: &mut u32) {
    if gate.has(Feature::ByteCompare) {
        buf.ins("cmpb 3,11,12");
        return;
    }
    // Equal bytes xor to zero; test each of the eight bytes in turn
    buf.ins("xor 12,11,12");
    buf.ins("li 3,0");
    for i in (0..8).rev() {
        let skip = fresh_label(labels);
        buf.ins("sldi 3,3,8");
        buf.ins(format!("rldicl 0,12,{},56", (64 - 8 * i) % 64));
        buf.ins("cmpdi 0,0,0");
        buf.ins(format!("bne 0,{skip}"));
        buf.ins("ori 3,3,255");
        buf.label(&skip);
    }
}

/// f64 copy-sign: magnitude bits in r11, sign bits in r12, result bits in
/// r3. Values are staged through the frame scratch doubleword to reach
/// the FPRs.
pub fn emit_copysign(buf: &mut AsmBuffer, gate: &Ppc64Features, labels: &mut u32) {
    let scratch = SCRATCH_DOUBLEWORD;
    if gate.has(Feature::FloatCopySign) {
        buf.ins(format!("std 12,{scratch}(31)"));
        buf.ins(format!("lfd 1,{scratch}(31)"));
        buf.ins(format!("std 11,{scratch}(31)"));
        buf.ins(format!("lfd 2,{scratch}(31)"));
        buf.ins("fcpsgn 1,1,2");
    } else {
        buf.ins(format!("std 11,{scratch}(31)"));
        buf.ins(format!("lfd 1,{scratch}(31)"));
        let skip = fresh_label(labels);
        buf.ins("fabs 1,1");
        buf.ins("cmpdi 0,12,0");
        buf.ins(format!("bge 0,{skip}"));
        buf.ins("fneg 1,1");
        buf.label(&skip);
    }
    buf.ins(format!("stfd 1,{scratch}(31)"));
    buf.ins(format!("ld {RET},{scratch}(31)"));
}
