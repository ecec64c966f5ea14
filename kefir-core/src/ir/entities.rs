//! IR-layer entity references (spec §3 "IrModule"/"IrFunction").

use kefir_entity::entity_impl;

/// A reference to a function (declaration or definition) in an `IrModule`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FuncId(u32);
entity_impl!(FuncId, "func");

/// A reference to a global variable in an `IrModule`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GlobalId(u32);
entity_impl!(GlobalId, "global");

/// A reference to one of an `IrFunction`'s linear blocks.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u32);
entity_impl!(BlockId, "blk");

/// A reference to a local-variable slot within an `IrFunction`'s layout.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocalVarId(u32);
entity_impl!(LocalVarId, "local");

/// A reference to an inline-assembly fragment owned by the `IrModule`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InlineAsmId(u32);
entity_impl!(InlineAsmId, "ia");
