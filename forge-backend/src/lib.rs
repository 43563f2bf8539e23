//! Forge Backend Library
//!
//! Retargetable assembly generation. A backend consumes an IR module and
//! produces complete assembler source text for one architecture. The
//! `ArchBackend` trait is the seam between architecture-independent
//! callers and per-target lowering; `create_backend` is the registry
//! mapping an architecture choice to its implementation.

pub mod arch;
pub mod buffer;
pub mod features;
pub mod ppc64;

#[cfg(test)]
mod tests;

use forge_common::{Arch, BackendError};
use forge_ir::{Function, Module};

pub use arch::{arch_info, ArchInfo, ARCH_INFO};
pub use buffer::AsmBuffer;
pub use features::{CpuModel, Feature, FeatureGate, Ppc64Features};
pub use ppc64::Ppc64Backend;

/// One target architecture's code generator
pub trait ArchBackend {
    /// Static facts about the target
    fn arch_info(&self) -> &'static ArchInfo;

    /// Generate complete assembler source for a module
    fn codegen_module(&mut self, module: &Module) -> Result<String, BackendError>;

    /// Generate assembler source for a single function definition
    fn codegen_func(&mut self, func: &Function) -> Result<String, BackendError>;
}

/// Instantiate the backend for an architecture
///
/// Architectures present in the info table but without a code generator
/// yet report `NoBackend` rather than producing partial output.
pub fn create_backend(
    arch: Arch,
    cpu: CpuModel,
) -> Result<Box<dyn ArchBackend>, BackendError> {
    match arch {
        Arch::Ppc64 => Ok(Box::new(Ppc64Backend::new(cpu))),
        Arch::X86 | Arch::X86_64 | Arch::S370 | Arch::Arm64 => {
            Err(BackendError::NoBackend(arch.name()))
        }
    }
}
