//! Architecture Info Table
//!
//! Static per-architecture facts consulted by callers making ABI-sensitive
//! IR construction choices. Pure data, never mutated at runtime.

use forge_common::{Arch, Endianness, StackGrowth};

/// Static description of one target architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchInfo {
    pub arch: Arch,
    /// Pointer size in bytes
    pub pointer_size: u8,
    /// Usable address width in bits
    pub address_bits: u8,
    pub endianness: Endianness,
    pub stack_growth: StackGrowth,
    pub gpr_count: u8,
    pub fpr_count: u8,
    pub has_condition_codes: bool,
    pub has_delay_slots: bool,
}

/// One row per supported architecture
pub static ARCH_INFO: [ArchInfo; 5] = [
    ArchInfo {
        arch: Arch::X86,
        pointer_size: 4,
        address_bits: 32,
        endianness: Endianness::Little,
        stack_growth: StackGrowth::Down,
        gpr_count: 8,
        fpr_count: 8,
        has_condition_codes: true,
        has_delay_slots: false,
    },
    ArchInfo {
        arch: Arch::X86_64,
        pointer_size: 8,
        address_bits: 64,
        endianness: Endianness::Little,
        stack_growth: StackGrowth::Down,
        gpr_count: 16,
        fpr_count: 16,
        has_condition_codes: true,
        has_delay_slots: false,
    },
    ArchInfo {
        arch: Arch::S370,
        pointer_size: 4,
        address_bits: 31,
        endianness: Endianness::Big,
        stack_growth: StackGrowth::Down,
        gpr_count: 16,
        fpr_count: 4,
        has_condition_codes: true,
        has_delay_slots: false,
    },
    ArchInfo {
        arch: Arch::Arm64,
        pointer_size: 8,
        address_bits: 64,
        endianness: Endianness::Little,
        stack_growth: StackGrowth::Down,
        gpr_count: 31,
        fpr_count: 32,
        has_condition_codes: true,
        has_delay_slots: false,
    },
    ArchInfo {
        arch: Arch::Ppc64,
        pointer_size: 8,
        address_bits: 64,
        endianness: Endianness::Big,
        stack_growth: StackGrowth::Down,
        gpr_count: 32,
        fpr_count: 32,
        has_condition_codes: true,
        has_delay_slots: false,
    },
];

/// Look up the table row for an architecture
pub fn arch_info(arch: Arch) -> &'static ArchInfo {
    ARCH_INFO
        .iter()
        .find(|info| info.arch == arch)
        .expect("every Arch variant has a table row")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_arch_has_a_row() {
        for arch in [Arch::X86, Arch::X86_64, Arch::S370, Arch::Arm64, Arch::Ppc64] {
            assert_eq!(arch_info(arch).arch, arch);
        }
    }

    #[test]
    fn test_ppc64_row() {
        let info = arch_info(Arch::Ppc64);
        assert_eq!(info.pointer_size, 8);
        assert_eq!(info.address_bits, 64);
        assert_eq!(info.endianness, Endianness::Big);
        assert_eq!(info.stack_growth, StackGrowth::Down);
        assert_eq!(info.gpr_count, 32);
        assert_eq!(info.fpr_count, 32);
        assert!(info.has_condition_codes);
        assert!(!info.has_delay_slots);
    }

    #[test]
    fn test_s370_addressing() {
        let info = arch_info(Arch::S370);
        assert_eq!(info.address_bits, 31);
        assert_eq!(info.endianness, Endianness::Big);
    }
}
