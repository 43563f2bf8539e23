//! PowerPC-64 Backend
//!
//! Generates ELFv1 big-endian assembly in the GCC numeric register
//! syntax. Functions get `.opd` descriptors, data and code go to separate
//! streams, and the streams are joined when a module is finished.

pub mod emulate;
pub mod frame;
pub mod globals;
pub mod instr;
pub mod regs;
pub mod strings;
pub mod values;

use forge_common::{Arch, BackendError, BlockId};
use forge_ir::{Function, Module};
use log::{debug, info};

use crate::arch::{arch_info, ArchInfo};
use crate::buffer::AsmBuffer;
use crate::features::{CpuModel, Ppc64Features};
use crate::ArchBackend;

pub use frame::{FrameLayout, SlotKind};
pub use strings::StringPool;

/// Shared state threaded through per-instruction lowering
pub(crate) struct EmitCtx<'a> {
    pub func: &'a Function,
    pub layout: &'a FrameLayout,
    pub features: Ppc64Features,
    pub current_block: BlockId,
    pub buf: &'a mut AsmBuffer,
    pub strings: &'a mut StringPool,
    pub labels: &'a mut u32,
}

/// Label of a basic block within a function
pub(crate) fn block_label(func_name: &str, block: BlockId) -> String {
    format!(".L_{func_name}_{block}")
}

/// Label of the shared function epilogue
pub(crate) fn epilogue_label(func_name: &str) -> String {
    format!(".Lepilogue_{func_name}")
}

/// Fresh module-unique local label for short forward branches
pub(crate) fn fresh_label(counter: &mut u32) -> String {
    let label = format!(".Lskip{counter}");
    *counter += 1;
    label
}

/// PowerPC-64 ELFv1 code generator
pub struct Ppc64Backend {
    features: Ppc64Features,
    code: AsmBuffer,
    data: AsmBuffer,
    strings: StringPool,
    next_label: u32,
}

impl Ppc64Backend {
    pub fn new(model: CpuModel) -> Self {
        Self::with_features(Ppc64Features::for_model(model))
    }

    /// Construct with an explicit feature set; used by tests to force
    /// native or emulated lowering regardless of CPU model.
    pub fn with_features(features: Ppc64Features) -> Self {
        Self {
            features,
            code: AsmBuffer::new(),
            data: AsmBuffer::new(),
            strings: StringPool::new(),
            next_label: 0,
        }
    }

    /// Drop all per-module state so repeated calls produce identical output
    fn reset(&mut self) {
        self.code.clear();
        self.data.clear();
        self.strings.reset();
        self.next_label = 0;
    }

    fn emit_prelude(&mut self) {
        self.code.ins(".abiversion 1");
        self.code.ins(".section \".text\"");
        self.code.ins(".align 2");
    }

    fn emit_function(&mut self, func: &Function) -> Result<(), BackendError> {
        let layout = FrameLayout::analyze(func);
        func.stack_size.set(layout.stack_size);
        debug!(
            "function {}: {} blocks, frame {} bytes",
            func.name,
            func.blocks.len(),
            layout.stack_size
        );

        let name = &func.name;
        self.code.blank();
        self.code.ins(format!(".globl {name}"));
        // ELFv1 calls go through a three-doubleword function descriptor
        self.code.ins(".section \".opd\",\"aw\"");
        self.code.ins(".align 3");
        self.code.label(name);
        self.code
            .ins(format!(".quad .L.{name},.TOC.@tocbase,0"));
        self.code.ins(".previous");
        self.code.ins(format!(".type {name},@function"));
        self.code.label(format!(".L.{name}"));
        layout.emit_prologue(&mut self.code);

        // Home-spill register parameters into the caller's parameter save
        // area so every parameter reads from one stable location.
        let spill_base = layout.stack_size + frame::PARAM_SAVE_BASE;
        for (i, reg) in regs::ARG_REGS.iter().enumerate().take(func.params.len()) {
            self.code
                .ins(format!("std {},{}(31)", reg, spill_base + 8 * i as u32));
        }

        for block in &func.blocks {
            self.code.label(block_label(name, block.id));
            let mut ctx = EmitCtx {
                func,
                layout: &layout,
                features: self.features,
                current_block: block.id,
                buf: &mut self.code,
                strings: &mut self.strings,
                labels: &mut self.next_label,
            };
            for instruction in &block.instructions {
                instr::emit_instruction(&mut ctx, instruction)?;
            }
        }

        self.code.label(epilogue_label(name));
        layout.emit_epilogue(&mut self.code);
        self.code.ins(format!(".size {name},.-.L.{name}"));
        Ok(())
    }
}

impl ArchBackend for Ppc64Backend {
    fn arch_info(&self) -> &'static ArchInfo {
        arch_info(Arch::Ppc64)
    }

    fn codegen_module(&mut self, module: &Module) -> Result<String, BackendError> {
        self.reset();
        info!(
            "generating ppc64 assembly for module {} ({} functions, {} globals)",
            module.name,
            module.functions.len(),
            module.globals.len()
        );
        self.emit_prelude();
        for func in &module.functions {
            if func.is_external {
                debug!("skipping external function {}", func.name);
                continue;
            }
            self.emit_function(func)?;
        }
        globals::emit_globals(&mut self.data, &module.globals)?;
        self.strings.emit(&mut self.data);

        let mut out = self.code.take();
        out.push_str(&self.data.take());
        Ok(out)
    }

    fn codegen_func(&mut self, func: &Function) -> Result<String, BackendError> {
        if func.is_external {
            return Err(BackendError::InvalidArgument(
                "cannot generate code for an external function",
            ));
        }
        self.reset();
        self.emit_function(func)?;
        self.strings.emit(&mut self.data);
        let mut out = self.code.take();
        out.push_str(&self.data.take());
        Ok(out)
    }
}
