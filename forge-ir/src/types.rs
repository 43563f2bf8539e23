//! IR Types
//!
//! Defines the type tags values and instructions may carry. Aggregate
//! layout (array strides, struct field offsets) lives here so that every
//! backend computes the same byte offsets for `Gep`/`StructGep`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// IR value type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IrType {
    Void,
    I8,
    I16,
    I32,
    I64,
    /// Target pointer, 8 bytes on every 64-bit backend
    Ptr,
    F64,
    /// Fixed-length array of a single element type
    Array { elem: Box<IrType>, len: u64 },
    /// Ordered field list; fields laid out at naturally aligned offsets
    Struct(Vec<IrType>),
}

impl IrType {
    /// Size of a value of this type in bytes
    pub fn size_in_bytes(&self) -> u64 {
        match self {
            IrType::Void => 0,
            IrType::I8 => 1,
            IrType::I16 => 2,
            IrType::I32 => 4,
            IrType::I64 | IrType::Ptr | IrType::F64 => 8,
            IrType::Array { elem, len } => elem.size_in_bytes() * len,
            IrType::Struct(fields) => {
                let mut offset = 0u64;
                let mut max_align = 1u64;
                for field in fields {
                    let align = field.alignment();
                    max_align = max_align.max(align);
                    offset = round_up(offset, align) + field.size_in_bytes();
                }
                round_up(offset, max_align)
            }
        }
    }

    /// Natural alignment of this type in bytes
    pub fn alignment(&self) -> u64 {
        match self {
            IrType::Void => 1,
            IrType::I8 => 1,
            IrType::I16 => 2,
            IrType::I32 => 4,
            IrType::I64 | IrType::Ptr | IrType::F64 => 8,
            IrType::Array { elem, .. } => elem.alignment(),
            IrType::Struct(fields) => fields.iter().map(|f| f.alignment()).max().unwrap_or(1),
        }
    }

    /// Byte offset of struct field `index`, or None for non-structs and
    /// out-of-range indices
    pub fn field_offset(&self, index: usize) -> Option<u64> {
        let IrType::Struct(fields) = self else {
            return None;
        };
        if index >= fields.len() {
            return None;
        }
        let mut offset = 0u64;
        for (i, field) in fields.iter().enumerate() {
            offset = round_up(offset, field.alignment());
            if i == index {
                return Some(offset);
            }
            offset += field.size_in_bytes();
        }
        None
    }

    pub fn is_float(&self) -> bool {
        matches!(self, IrType::F64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, IrType::I8 | IrType::I16 | IrType::I32 | IrType::I64)
    }
}

fn round_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::I8 => write!(f, "i8"),
            IrType::I16 => write!(f, "i16"),
            IrType::I32 => write!(f, "i32"),
            IrType::I64 => write!(f, "i64"),
            IrType::Ptr => write!(f, "ptr"),
            IrType::F64 => write!(f, "f64"),
            IrType::Array { elem, len } => write!(f, "[{len} x {elem}]"),
            IrType::Struct(fields) => {
                write!(f, "{{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{field}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_sizes() {
        assert_eq!(IrType::I8.size_in_bytes(), 1);
        assert_eq!(IrType::I32.size_in_bytes(), 4);
        assert_eq!(IrType::I64.size_in_bytes(), 8);
        assert_eq!(IrType::Ptr.size_in_bytes(), 8);
        assert_eq!(IrType::F64.size_in_bytes(), 8);
    }

    #[test]
    fn test_array_size() {
        let arr = IrType::Array { elem: Box::new(IrType::I32), len: 10 };
        assert_eq!(arr.size_in_bytes(), 40);
        assert_eq!(arr.alignment(), 4);
    }

    #[test]
    fn test_struct_layout_with_padding() {
        // { i8, i64, i32 } -> offsets 0, 8, 16; size rounded to 24
        let st = IrType::Struct(vec![IrType::I8, IrType::I64, IrType::I32]);
        assert_eq!(st.field_offset(0), Some(0));
        assert_eq!(st.field_offset(1), Some(8));
        assert_eq!(st.field_offset(2), Some(16));
        assert_eq!(st.field_offset(3), None);
        assert_eq!(st.size_in_bytes(), 24);
        assert_eq!(st.alignment(), 8);
    }

    #[test]
    fn test_field_offset_on_non_struct() {
        assert_eq!(IrType::I64.field_offset(0), None);
    }
}
