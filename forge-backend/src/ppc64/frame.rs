//! Stack Frame Layout
//!
//! ELFv1 frame construction. The frame is laid out in one pass before any
//! code is emitted: every `alloca` and every `phi` in the function gets a
//! doubleword-aligned slot above the ABI-mandated minimum frame, and the
//! total is rounded to the 16-byte alignment the ABI requires.
//!
//! Frame picture, offsets relative to the post-prologue r1/r31:
//!
//! ```text
//!   stack_size + 48 .. : caller's parameter save area (spilled args 9+)
//!   stack_size         : caller's frame (back chain points here)
//!   base .. base+slots : alloca and phi slots
//!   48 .. base         : our outgoing parameter save area
//!   40                 : TOC save doubleword
//!   24                 : scratch doubleword (GPR<->FPR staging)
//!   16                 : LR save doubleword
//!   0                  : back chain
//! ```
//!
//! `base` is 112 unless some call in the function passes more than eight
//! arguments; stacked outgoing arguments are stored at 48+8*i(r1), so the
//! slots start past the highest such store.

use forge_common::TempId;
use forge_ir::{Function, Instruction};
use log::trace;

use crate::buffer::AsmBuffer;

/// Minimum ELFv1 frame: 48-byte header plus 64-byte parameter save area
pub const ABI_MIN_FRAME: u32 = 112;
/// Extra room kept past the last slot for emulation scratch
pub const SCRATCH_MARGIN: u32 = 64;
/// ABI stack alignment
pub const FRAME_ALIGN: u32 = 16;

/// Link register save slot in the caller's frame
pub const LR_SAVE_OFFSET: i32 = 16;
/// TOC pointer save doubleword
pub const TOC_SAVE_OFFSET: i32 = 40;
/// Frame pointer (r31) spill, just below the caller's frame
pub const FP_SAVE_OFFSET: i32 = -8;
/// Compiler scratch doubleword, used to move bits between GPRs and FPRs
pub const SCRATCH_DOUBLEWORD: i32 = 24;
/// First outgoing stacked argument goes at 48(r1)
pub const PARAM_SAVE_BASE: u32 = 48;
/// Where local slots start when no call needs stacked arguments
pub const LOCALS_BASE: u32 = ABI_MIN_FRAME;

/// What a frame slot was allocated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Backing storage for an `alloca`; the temp holds the slot address
    Alloca,
    /// Hidden slot carrying a `phi` value across block edges
    Phi,
}

/// Computed frame layout for one function
#[derive(Debug)]
pub struct FrameLayout {
    slots: Vec<(TempId, u32, SlotKind)>,
    locals_base: u32,
    pub stack_size: u32,
}

impl FrameLayout {
    /// Walk the function once: assign a slot to every alloca and phi, and
    /// find the widest call so the slots land past its stacked arguments.
    pub fn analyze(func: &Function) -> Self {
        let mut slots = Vec::new();
        let mut offset = 0u32;
        let mut max_call_args = 0usize;
        for block in &func.blocks {
            for instruction in &block.instructions {
                match instruction {
                    Instruction::Alloca { result, ty } => {
                        let size = round_up(ty.size_in_bytes() as u32, 8);
                        slots.push((*result, offset, SlotKind::Alloca));
                        trace!("alloca %{result}: {size} bytes at local offset {offset}");
                        offset += size;
                    }
                    Instruction::Phi { result, .. } => {
                        slots.push((*result, offset, SlotKind::Phi));
                        trace!("phi %{result}: slot at local offset {offset}");
                        offset += 8;
                    }
                    Instruction::Call { args, .. } => {
                        max_call_args = max_call_args.max(args.len());
                    }
                    _ => {}
                }
            }
        }
        // Outgoing stacked arguments (9+) are stored at 48+8*i(r1); local
        // slots must sit above the highest such store.
        let locals_base =
            (PARAM_SAVE_BASE + 8 * max_call_args as u32).max(LOCALS_BASE);
        let stack_size = round_up(locals_base + offset + SCRATCH_MARGIN, FRAME_ALIGN);
        Self { slots, locals_base, stack_size }
    }

    /// Frame-pointer-relative offset of a slot, any kind
    pub fn slot_offset(&self, temp: TempId) -> Option<u32> {
        self.slots
            .iter()
            .find(|(t, _, _)| *t == temp)
            .map(|(_, off, _)| self.locals_base + off)
    }

    /// Frame-pointer-relative offset, restricted to one slot kind
    pub fn slot_of_kind(&self, temp: TempId, kind: SlotKind) -> Option<u32> {
        self.slots
            .iter()
            .find(|(t, _, k)| *t == temp && *k == kind)
            .map(|(_, off, _)| self.locals_base + off)
    }

    /// Emit the function prologue: save LR, TOC, and r31, grow the frame
    /// atomically with `stdu`, then establish r31 as the frame pointer.
    pub fn emit_prologue(&self, buf: &mut AsmBuffer) {
        buf.ins("mflr 0");
        buf.ins(format!("std 0,{LR_SAVE_OFFSET}(1)"));
        buf.ins(format!("std 2,{TOC_SAVE_OFFSET}(1)"));
        buf.ins(format!("std 31,{FP_SAVE_OFFSET}(1)"));
        buf.ins(format!("stdu 1,-{}(1)", self.stack_size));
        buf.ins("mr 31,1");
    }

    /// Emit the shared epilogue; every `ret` branches here
    pub fn emit_epilogue(&self, buf: &mut AsmBuffer) {
        buf.ins(format!("addi 1,1,{}", self.stack_size));
        buf.ins(format!("ld 31,{FP_SAVE_OFFSET}(1)"));
        buf.ins(format!("ld 2,{TOC_SAVE_OFFSET}(1)"));
        buf.ins(format!("ld 0,{LR_SAVE_OFFSET}(1)"));
        buf.ins("mtlr 0");
        buf.ins("blr");
    }
}

pub fn round_up(value: u32, align: u32) -> u32 {
    (value + align - 1) / align * align
}

#[cfg(test)]
mod tests {
    use super::*;
    use forge_ir::{IrBuilder, IrType, Value};
    use pretty_assertions::assert_eq;

    fn func_with_allocas(types: &[IrType]) -> Function {
        let mut b = IrBuilder::new();
        b.create_function("f", vec![], IrType::Void);
        b.create_block("entry").unwrap();
        for ty in types {
            b.build_alloca(ty.clone()).unwrap();
        }
        b.build_ret(None).unwrap();
        b.finish_function().unwrap()
    }

    #[test]
    fn test_empty_function_uses_minimum_frame() {
        let func = func_with_allocas(&[]);
        let layout = FrameLayout::analyze(&func);
        assert_eq!(layout.stack_size, ABI_MIN_FRAME + SCRATCH_MARGIN);
        assert_eq!(layout.stack_size % FRAME_ALIGN, 0);
    }

    #[test]
    fn test_slots_are_doubleword_aligned() {
        let func = func_with_allocas(&[IrType::I8, IrType::I64, IrType::I32]);
        let layout = FrameLayout::analyze(&func);
        assert_eq!(layout.slot_offset(0), Some(LOCALS_BASE));
        assert_eq!(layout.slot_offset(1), Some(LOCALS_BASE + 8));
        assert_eq!(layout.slot_offset(2), Some(LOCALS_BASE + 16));
        assert_eq!(layout.stack_size % FRAME_ALIGN, 0);
    }

    #[test]
    fn test_array_alloca_reserves_full_size() {
        let func = func_with_allocas(&[
            IrType::Array {
                elem: Box::new(IrType::I32),
                len: 10,
            },
            IrType::I64,
        ]);
        let layout = FrameLayout::analyze(&func);
        assert_eq!(layout.slot_offset(1), Some(LOCALS_BASE + 40));
    }

    #[test]
    fn test_stacked_call_arguments_push_locals_up() {
        let mut b = IrBuilder::new();
        b.create_function("caller", vec![], IrType::I64);
        b.create_block("entry").unwrap();
        let slot = b.build_alloca(IrType::I64).unwrap();
        let args: Vec<Value> = (0..10).map(Value::Constant).collect();
        b.build_call(Value::Function("wide".into()), args, true)
            .unwrap();
        b.build_ret(Some(Value::Constant(0))).unwrap();
        let func = b.finish_function().unwrap();

        // Ten outgoing arguments occupy 48..128(r1); the slot starts after
        let layout = FrameLayout::analyze(&func);
        assert_eq!(layout.slot_offset(slot), Some(128));
        assert_eq!(layout.stack_size % FRAME_ALIGN, 0);
    }

    #[test]
    fn test_phi_gets_a_slot() {
        let mut b = IrBuilder::new();
        b.create_function("f", vec![], IrType::I64);
        let entry = b.create_block("entry").unwrap();
        let join = b.create_block("join").unwrap();
        b.switch_to_block(entry).unwrap();
        b.build_br(join).unwrap();
        b.switch_to_block(join).unwrap();
        let phi = b
            .build_phi(vec![(Value::Constant(1), entry)], IrType::I64)
            .unwrap();
        b.build_ret(Some(Value::Temp(phi))).unwrap();
        let func = b.finish_function().unwrap();

        let layout = FrameLayout::analyze(&func);
        assert_eq!(layout.slot_of_kind(phi, SlotKind::Phi), Some(LOCALS_BASE));
        assert_eq!(layout.slot_of_kind(phi, SlotKind::Alloca), None);
    }

    #[test]
    fn test_prologue_epilogue_shape() {
        let func = func_with_allocas(&[IrType::I64]);
        let layout = FrameLayout::analyze(&func);
        let mut buf = AsmBuffer::new();
        layout.emit_prologue(&mut buf);
        let expected = format!(
            "\tmflr 0\n\tstd 0,16(1)\n\tstd 2,40(1)\n\tstd 31,-8(1)\n\tstdu 1,-{}(1)\n\tmr 31,1\n",
            layout.stack_size
        );
        assert_eq!(buf.as_str(), expected);

        let mut buf = AsmBuffer::new();
        layout.emit_epilogue(&mut buf);
        let expected = format!(
            "\taddi 1,1,{}\n\tld 31,-8(1)\n\tld 2,40(1)\n\tld 0,16(1)\n\tmtlr 0\n\tblr\n",
            layout.stack_size
        );
        assert_eq!(buf.as_str(), expected);
    }
}
