//! Global Variable Emission
//!
//! Writes module globals into the data stream. Zero-initialized globals
//! become `.comm` storage; everything else gets an initialized `.data`
//! definition with element directives sized to the type.

use forge_common::BackendError;
use forge_ir::{GlobalInit, GlobalVariable, IrType};
use log::debug;

use crate::buffer::AsmBuffer;

/// Data directive for one element of the given scalar width
fn data_directive(size: u64) -> &'static str {
    match size {
        1 => ".byte",
        2 => ".short",
        4 => ".long",
        _ => ".quad",
    }
}

/// Element type a scalar or array global stores
fn element_type(ty: &IrType) -> &IrType {
    match ty {
        IrType::Array { elem, .. } => elem,
        other => other,
    }
}

pub fn emit_globals(buf: &mut AsmBuffer, globals: &[GlobalVariable]) -> Result<(), BackendError> {
    for global in globals {
        emit_global(buf, global)?;
    }
    Ok(())
}

fn emit_global(buf: &mut AsmBuffer, global: &GlobalVariable) -> Result<(), BackendError> {
    let size = global.ty.size_in_bytes();
    let align = global.ty.alignment();
    debug!("global {}: {} bytes, align {}", global.name, size, align);
    if size == 0 {
        return Err(BackendError::Unsupported(format!(
            "zero-sized global {}",
            global.name
        )));
    }

    match &global.init {
        GlobalInit::Zeroed => {
            buf.ins(format!(".comm {},{},{}", global.name, size, align));
        }
        GlobalInit::Scalar(value) => {
            let directive = data_directive(size);
            buf.ins(".data");
            buf.ins(format!(".globl {}", global.name));
            buf.ins(format!(".align {}", align.trailing_zeros()));
            buf.label(&global.name);
            buf.ins(format!("{directive} {value}"));
        }
        GlobalInit::Array(values) => {
            let elem = element_type(&global.ty);
            let directive = data_directive(elem.size_in_bytes());
            buf.ins(".data");
            buf.ins(format!(".globl {}", global.name));
            buf.ins(format!(".align {}", align.trailing_zeros()));
            buf.label(&global.name);
            for value in values {
                buf.ins(format!("{directive} {value}"));
            }
        }
    }
    Ok(())
}
