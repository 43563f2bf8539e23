//! Common types shared between the IR and the backends
//!
//! This module defines identifiers and small enums that are consumed by
//! both the IR crate and every architecture backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Temporary value identifier (an instruction result in the IR)
pub type TempId = u32;

/// Basic block identifier within a function
pub type BlockId = u32;

/// Byte order of a target architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Endianness {
    Little,
    Big,
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Little => write!(f, "little"),
            Endianness::Big => write!(f, "big"),
        }
    }
}

/// Direction the hardware stack grows in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StackGrowth {
    Down,
    Up,
}

/// Supported target architectures
///
/// Every row of the arch info table corresponds to one variant; only some
/// variants have a registered code-generation backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    X86,
    X86_64,
    S370,
    Arm64,
    Ppc64,
}

impl Arch {
    /// Stable lowercase name, used for CLI selection and error messages
    pub fn name(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::S370 => "s370",
            Arch::Arm64 => "arm64",
            Arch::Ppc64 => "ppc64",
        }
    }

    /// Parse an architecture name as written on a command line
    pub fn from_name(name: &str) -> Option<Arch> {
        match name {
            "x86" | "i386" => Some(Arch::X86),
            "x86_64" | "amd64" => Some(Arch::X86_64),
            "s370" | "s390" => Some(Arch::S370),
            "arm64" | "aarch64" => Some(Arch::Arm64),
            "ppc64" | "powerpc64" => Some(Arch::Ppc64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_name_round_trip() {
        for arch in [Arch::X86, Arch::X86_64, Arch::S370, Arch::Arm64, Arch::Ppc64] {
            assert_eq!(Arch::from_name(arch.name()), Some(arch));
        }
    }

    #[test]
    fn test_arch_aliases() {
        assert_eq!(Arch::from_name("aarch64"), Some(Arch::Arm64));
        assert_eq!(Arch::from_name("powerpc64"), Some(Arch::Ppc64));
        assert_eq!(Arch::from_name("vax"), None);
    }
}
