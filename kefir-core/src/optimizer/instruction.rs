//! `OptInstruction`: (opcode, block-id, operation parameters), the Opt-IR
//! analogue of `IrInstr` (spec §3).

use super::entities::{OptBlockId, OptInstrId, OptPhiId, OptSideNodeId};
use crate::ir::{BranchTriple, MemoryOrder, Signedness};
use crate::pool::{Symbol, TypeId};

/// The control-affecting (block-terminating) opcodes (spec §3 "Block
/// finalization"). Any of these, or `INLINE_ASSEMBLY` with at least one
/// jump target, finalize their block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptOpcode {
    Jump,
    IJump,
    Branch,
    Return,
    InlineAssembly,
    Phi,
    Call,
    InvokeVirtual,

    ImmU64,
    ImmF32,
    ImmF64,

    IntAdd,
    IntSub,
    IntMul,
    IntDiv,
    FloatAdd,
    FloatSub,

    /// Overflow-checked arithmetic, tagged by operand signedness.
    OverflowAdd,
    OverflowSub,
    OverflowMul,

    Load,
    Store,
    AtomicLoad,
    AtomicStore,
    AtomicCompareExchange,
    AtomicFetchAdd,

    StackAlloc,
    GlobalRef,
    BitfieldExtract,
    BitfieldInsert,
}

impl OptOpcode {
    /// Whether this opcode, on its own, finalizes the block it's appended
    /// to (spec §3 "Block finalization").
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            OptOpcode::Jump | OptOpcode::IJump | OptOpcode::Branch | OptOpcode::Return
        )
    }
}

/// The tagged operand-parameter union for an `OptInstruction` (spec §3
/// "OptInstruction ... Parameters are a tagged union").
#[derive(Debug, Clone)]
pub enum OptParam {
    None,
    ImmU64(u64),
    ImmF32(f32),
    ImmF64(f64),
    /// Up to three operand references (most arithmetic/memory opcodes need
    /// at most this many: e.g. a compare-exchange's expected/desired/addr).
    Refs([Option<OptInstrId>; 3]),
    TypeIndex { type_id: TypeId, index: u32 },
    Bitfield { offset: u32, length: u32 },
    Branch { cond: OptInstrId, targets: BranchTriple },
    Jump { target: OptBlockId },
    Memorder(MemoryOrder),
    OverflowArith { signedness: Signedness, lhs: OptInstrId, rhs: OptInstrId },
    /// A stack allocation scoped to a lexical block (for VLAs); `scope`
    /// names the enclosing block so the frame builder can bound its
    /// lifetime.
    StackAlloc { size: OptInstrId, align: u32, scope: OptBlockId },
    GlobalRef { global: Symbol, offset: i64 },
    Phi(OptPhiId),
    Call(OptSideNodeId),
    IndirectCall { side_node: OptSideNodeId, target: OptInstrId },
    InlineAsm(OptSideNodeId),
}

/// One instruction in the optimizer's block-and-instruction graph
/// (spec §3 "OptInstruction").
#[derive(Debug, Clone)]
pub struct OptInstruction {
    pub opcode: OptOpcode,
    pub block: OptBlockId,
    pub param: OptParam,
}

impl OptInstruction {
    pub fn new(opcode: OptOpcode, block: OptBlockId, param: OptParam) -> Self {
        OptInstruction { opcode, block, param }
    }
}
