//! Module Definitions
//!
//! The top-level IR container: functions plus global variables. Read-only
//! to backends except the `Function::stack_size` write-back.

use serde::{Deserialize, Serialize};

use crate::{Function, IrType};

/// Initializer for a global variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GlobalInit {
    /// Single scalar initializer
    Scalar(i64),
    /// Element-wise array initializer
    Array(Vec<i64>),
    /// Zero-initialized (emitted as common/BSS storage)
    Zeroed,
}

/// Global variable in IR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalVariable {
    pub name: String,
    pub ty: IrType,
    pub init: GlobalInit,
}

/// Top-level IR module
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub name: String,
    pub globals: Vec<GlobalVariable>,
    pub functions: Vec<Function>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            globals: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn add_global(&mut self, global: GlobalVariable) {
        self.globals.push(global);
    }

    pub fn get_function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}
