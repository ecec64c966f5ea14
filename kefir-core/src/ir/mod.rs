//! The typed, stack-oriented linear IR the translator emits from analyzed
//! AST (spec §3 "IR layer entities", §4.3).

pub mod entities;
pub mod instr;
pub mod module;
pub mod typeconv;

pub use entities::{BlockId, FuncId, GlobalId, InlineAsmId, LocalVarId};
pub use instr::{IrInstr, IrOpcode, MemoryOrder};
pub use module::{IrBlock, IrFunction, IrModule};
pub use typeconv::translate_typeconv;

use crate::pool::Symbol;
use std::fmt;

/// One entry of an `IrType`'s flattened, preorder-nested layout
/// (spec §3 "IrType").
#[derive(Debug, Clone, PartialEq)]
pub enum IrTypeEntry {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    LongDouble,
    ComplexFloat32,
    ComplexFloat64,
    ComplexLongDouble,
    Pointer,
    /// Head of an aggregate; `fields` is the number of direct member
    /// entries that follow (nested aggregates count as one entry each, with
    /// their own members following them in turn).
    StructStart { fields: usize },
    UnionStart { fields: usize },
    /// Head of an array; `len` is `None` for a flexible/incomplete array.
    ArrayStart { len: Option<u64> },
    /// `_BitInt(width)`.
    Bits { width: u32, signed: bool },
    Builtin(Symbol),
}

/// An ordered, flattened sequence of [`IrTypeEntry`] (spec §3 "IrType").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IrType(Vec<IrTypeEntry>);

impl IrType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: IrTypeEntry) -> &mut Self {
        self.0.push(entry);
        self
    }

    pub fn entries(&self) -> &[IrTypeEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Size in bytes of a scalar leading entry; aggregates must be walked
    /// by the caller (ABI classification does this explicitly, §4.5).
    pub fn scalar_size(&self) -> Option<u32> {
        match self.0.first()? {
            IrTypeEntry::Bool | IrTypeEntry::Int8 => Some(1),
            IrTypeEntry::Int16 => Some(2),
            IrTypeEntry::Int32 | IrTypeEntry::Float32 => Some(4),
            IrTypeEntry::Int64 | IrTypeEntry::Float64 | IrTypeEntry::Pointer => Some(8),
            IrTypeEntry::ComplexFloat32 => Some(8),
            IrTypeEntry::ComplexFloat64 => Some(16),
            IrTypeEntry::LongDouble => Some(16),
            IrTypeEntry::ComplexLongDouble => Some(32),
            IrTypeEntry::Bits { width, .. } => Some((*width as u32 + 7) / 8),
            _ => None,
        }
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_size_matches_amd64_widths() {
        let mut ty = IrType::new();
        ty.push(IrTypeEntry::Int64);
        assert_eq!(ty.scalar_size(), Some(8));
    }

    #[test]
    fn struct_head_counts_field_entries() {
        let mut ty = IrType::new();
        ty.push(IrTypeEntry::StructStart { fields: 2 });
        ty.push(IrTypeEntry::Int32);
        ty.push(IrTypeEntry::Float64);
        assert_eq!(ty.len(), 3);
    }
}
