//! `IrInstr`: a (opcode, operand) pair. The operand is a tagged union
//! (spec §3 "IrInstr", §9 "tagged union for instruction operands") — ported
//! here as a Rust sum type with one variant per operand family named in the
//! spec, pattern-matched on by the opcode's family.

use super::entities::{BlockId, InlineAsmId, LocalVarId};
use crate::pool::TypeId;

/// Atomic memory ordering. Only `SeqCst` is implemented; every other order
/// is rejected at the optimizer-builder boundary (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOrder {
    SeqCst,
}

/// Signedness tag carried by overflow-detecting arithmetic opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// Integer/float comparison kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareKind {
    Equal,
    NotEqual,
    LessSigned,
    LessUnsigned,
    LessEqSigned,
    LessEqUnsigned,
    GreaterSigned,
    GreaterUnsigned,
    GreaterEqSigned,
    GreaterEqUnsigned,
}

/// A bitfield member's storage-unit offset and width in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitfieldSpec {
    pub offset: u32,
    pub length: u32,
}

/// A three-way branch target: condition-true target, fallthrough/else
/// target, and a back-reference to the originating block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BranchTriple {
    pub then_block: BlockId,
    pub else_block: BlockId,
}

/// The opcode-specific operand, tagged by the opcode's family
/// (spec §3 "IrInstr").
#[derive(Debug, Clone, PartialEq)]
pub enum IrOperand {
    None,
    Index(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    /// IEEE-754 binary128 long-double payload, stored as raw bits.
    LongDouble(u128),
    TypeRef(TypeId),
    /// A reference plus a byte offset (e.g. member access).
    RefOffset { base: u32, offset: i64 },
    TypedRef { reference: u32, type_id: TypeId },
    Branch(BranchTriple),
    MemFlags { volatile: bool, atomic: Option<MemoryOrder> },
    Bitfield(BitfieldSpec),
    Memorder(MemoryOrder),
    OverflowArith(Signedness),
    Compare(CompareKind),
    LocalVar(LocalVarId),
    CallRef(u32),
    InlineAsmRef(InlineAsmId),
}

/// The IR opcode. Covers the scalar arithmetic/memory/control family plus
/// every opcode `translate_typeconv` (spec §4.3) and bit-precise constant
/// materialization (spec §3, §4.3) need to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrOpcode {
    Nop,
    /// Discard the top-of-stack value (emitted when converting to `void`).
    Pop,
    PushIntConst,
    PushUIntConst,
    PushF32Const,
    PushF64Const,
    PushLongDoubleConst,
    /// Materialize a `_BitInt(N)` constant wider than 64 bits into a spill
    /// region, 32 bits at a time (spec §4.3).
    BitIntConstWide,

    IntTruncate,
    SignExtend,
    ZeroExtendMask,

    IntToBoolCompareZero,
    FloatToBoolCompareNeZero,
    ComplexTruncate1Bit,
    LongDoubleEqualsZero,
    BoolNot,

    ComplexRealPart,
    LongDoubleComplexRealLoad,

    IntToFloat32Signed,
    IntToFloat32Unsigned,
    IntToFloat64Signed,
    IntToFloat64Unsigned,
    IntToLongDoubleSigned,
    IntToLongDoubleUnsigned,
    FloatToIntSigned,
    FloatToIntUnsigned,
    FloatWiden,
    FloatNarrow,

    ComplexFromReal,
    ComplexSplit,
    ComplexRecombine,

    PtrFromInt,
    PtrToInt,

    Load,
    Store,
    AllocLocal,
    RefLocal,

    IAdd,
    ISub,
    IMul,
    IDiv,
    FAdd,
    FSub,
    FMul,
    FDiv,

    Branch,
    Jump,
    IJump,
    Return,

    Call,
    InlineAssembly,
}

/// One instruction in the linear IR (spec §3 "IrInstr").
#[derive(Debug, Clone, PartialEq)]
pub struct IrInstr {
    pub opcode: IrOpcode,
    pub operand: IrOperand,
}

impl IrInstr {
    pub fn new(opcode: IrOpcode, operand: IrOperand) -> Self {
        IrInstr { opcode, operand }
    }

    pub fn simple(opcode: IrOpcode) -> Self {
        IrInstr { opcode, operand: IrOperand::None }
    }
}
