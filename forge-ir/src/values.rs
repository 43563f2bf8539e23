//! IR Value Representations
//!
//! Defines values usable as operands in IR instructions. Values are
//! immutable once created; the module owns them and backends only borrow
//! them for the duration of code generation.

use forge_common::TempId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IR Value - represents operands in IR instructions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Constant integer (also carries i1/i8/i16/i32 constants, sign-extended)
    Constant(i64),

    /// Constant double, materialized by backends as its bit pattern
    ConstantFloat(f64),

    /// Constant string literal, interned into the read-only data pool
    ConstantString(String),

    /// Null pointer constant
    Null,

    /// Function parameter by zero-based index
    Param(usize),

    /// Result of another instruction
    Temp(TempId),

    /// Global variable reference by symbol name
    Global(String),

    /// Function reference by symbol name
    Function(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Constant(v) => write!(f, "{v}"),
            Value::ConstantFloat(v) => write!(f, "{v:?}"),
            Value::ConstantString(s) => write!(f, "{s:?}"),
            Value::Null => write!(f, "null"),
            Value::Param(i) => write!(f, "%arg{i}"),
            Value::Temp(id) => write!(f, "%{id}"),
            Value::Global(name) => write!(f, "@{name}"),
            Value::Function(name) => write!(f, "@{name}"),
        }
    }
}
