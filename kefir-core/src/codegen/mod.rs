//! Codegen (Opt-IR -> AsmCmp -> text): instruction selection, ABI
//! classification, register allocation and stack-frame layout
//! (spec §4.5).

pub mod abi;
pub mod asmcmp;
pub mod frame;
pub mod regalloc;

pub use abi::{classify_return, classify_type, ArgLocation, Eightbyte, RegisterClass, SystemVClassifier};
pub use asmcmp::{
    AsmCmpContext, AsmInstr, AsmInstrId, InstructionHandle, Label, LabelId, PhysicalRegister,
    VRegId, VirtualRegister, VirtualRegisterClass,
};
pub use frame::{FramePointerPolicy, StackFrame};
pub use regalloc::{Assignment, LinearScanAllocator, LiveInterval, StashHandle};
