//! Optimizer IR construction (spec §4.4): an SSA-like graph with explicit
//! blocks, phi nodes, call/inline-assembly side-nodes and atomic
//! memory-ordering opcodes.

pub mod builder;
pub mod entities;
pub mod instruction;

pub use builder::OptCodeBuilder;
pub use entities::{OptBlockId, OptInstrId, OptPhiId, OptSideNodeId};
pub use instruction::{OptInstruction, OptOpcode, OptParam};

use crate::ir::MemoryOrder;
use crate::pool::{Symbol, TypeId};
use kefir_entity::PrimaryMap;

/// A phi node: one value per predecessor block, merged at `block`.
#[derive(Debug, Clone)]
pub struct PhiNode {
    pub block: OptBlockId,
    pub incoming: Vec<(OptBlockId, OptInstrId)>,
}

/// A call side-node: callee (direct symbol or indirect value ref) plus args.
#[derive(Debug, Clone)]
pub struct CallNode {
    pub callee: Option<Symbol>,
    pub indirect_target: Option<OptInstrId>,
    pub args: Vec<OptInstrId>,
    pub return_type: Option<TypeId>,
}

/// An inline-assembly side-node.
#[derive(Debug, Clone)]
pub struct InlineAsmNode {
    pub template: Symbol,
    pub inputs: Vec<OptInstrId>,
    pub jump_targets: Vec<OptBlockId>,
}

/// One basic block: an ordered instruction list plus the "control
/// subsequence" — only the control-affecting instructions, tracked
/// separately so a pass can walk just the control-flow skeleton
/// (spec §3 "OptBlock").
#[derive(Debug, Clone, Default)]
pub struct OptBlock {
    pub instrs: Vec<OptInstrId>,
    pub control: Vec<OptInstrId>,
    finalized: bool,
}

impl OptBlock {
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

/// Per-function Opt-IR container: blocks, instructions, phi nodes, call and
/// inline-assembly side-nodes (spec §3 "OptFunction owns an
/// OptCodeContainer").
#[derive(Debug, Default)]
pub struct OptCodeContainer {
    pub blocks: PrimaryMap<OptBlockId, OptBlock>,
    pub instructions: PrimaryMap<OptInstrId, OptInstruction>,
    pub phis: PrimaryMap<OptPhiId, PhiNode>,
    pub calls: PrimaryMap<OptSideNodeId, CallNode>,
    pub inline_asm: PrimaryMap<OptSideNodeId, InlineAsmNode>,
}

impl OptCodeContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_block(&mut self) -> OptBlockId {
        self.blocks.push(OptBlock::default())
    }
}

/// An `OptModule` mirrors `IrModule` with a richer per-function structure
/// (spec §3).
#[derive(Debug, Default)]
pub struct OptModule {
    pub functions: PrimaryMap<crate::ir::FuncId, OptFunction>,
}

/// One optimized function: its code container plus the memory-order policy
/// every atomic opcode must honor (spec §4.4: "only `SeqCst` is supported").
#[derive(Debug)]
pub struct OptFunction {
    pub code: OptCodeContainer,
}

impl OptFunction {
    pub fn new() -> Self {
        OptFunction { code: OptCodeContainer::new() }
    }
}

impl Default for OptFunction {
    fn default() -> Self {
        Self::new()
    }
}

/// The only atomic memory ordering the optimizer accepts (spec §4.4).
pub const SUPPORTED_MEMORY_ORDER: MemoryOrder = MemoryOrder::SeqCst;
