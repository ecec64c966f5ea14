//! Optimizer IR entity references.

use kefir_entity::entity_impl;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptBlockId(u32);
entity_impl!(OptBlockId, "optblk");

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptInstrId(u32);
entity_impl!(OptInstrId, "optinst");

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptPhiId(u32);
entity_impl!(OptPhiId, "phi");

/// Shared by call and inline-assembly side-nodes; each side-node table has
/// its own `PrimaryMap`, so collisions between the two id spaces are
/// harmless (never compared across tables).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OptSideNodeId(u32);
entity_impl!(OptSideNodeId, "side");
