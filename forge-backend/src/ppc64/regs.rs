//! PowerPC-64 Register Conventions
//!
//! Register assignments for the ELFv1 ABI. Assembly uses the GCC numeric
//! syntax, so a register displays as its bare number.

use std::fmt;

/// General-purpose register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gpr(pub u8);

impl fmt::Display for Gpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// r0: volatile, reads as zero in some addressing forms
pub const R0: Gpr = Gpr(0);
/// r1: stack pointer
pub const SP: Gpr = Gpr(1);
/// r2: TOC pointer
pub const TOC: Gpr = Gpr(2);
/// r3: first argument and function result
pub const RET: Gpr = Gpr(3);
/// r11, r12: intra-procedure scratch, never carry values across calls
pub const SCRATCH_A: Gpr = Gpr(11);
pub const SCRATCH_B: Gpr = Gpr(12);
/// r31: frame pointer, non-volatile
pub const FP: Gpr = Gpr(31);

/// r3 through r10 carry the first eight integer arguments
pub const ARG_REGS: [Gpr; 8] = [
    Gpr(3),
    Gpr(4),
    Gpr(5),
    Gpr(6),
    Gpr(7),
    Gpr(8),
    Gpr(9),
    Gpr(10),
];

/// Bit positions within condition register field 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrBit {
    Lt = 0,
    Gt = 1,
    Eq = 2,
    So = 3,
}

impl CrBit {
    pub fn index(self) -> u8 {
        self as u8
    }
}
