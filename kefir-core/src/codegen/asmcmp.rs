//! `AsmCmpContext`: the target-near, virtual-register AMD64 asm IR
//! (spec §3 "AsmCmp IR").
//!
//! Labels may be "floating" — attached to no instruction yet. A floating
//! label is hoisted onto the next instruction appended to the context
//! (spec §3, §5 "floating label mechanism", testable property #7).

use kefir_entity::{entity_impl, PrimaryMap};
use std::collections::HashMap;

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AsmInstrId(u32);
entity_impl!(AsmInstrId, "ainst");

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(u32);
entity_impl!(LabelId, "lbl");

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VRegId(u32);
entity_impl!(VRegId, "vreg");

/// A virtual-register class; `SpillSpace`/`IndirectSpill` vregs are never
/// assigned a physical register and instead realize to a stack slot once
/// the frame is finalized (spec §3 "VirtualRegister").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VirtualRegisterClass {
    GeneralPurpose,
    FloatingPoint,
    SpillSpace,
    IndirectSpill,
}

/// A virtual register: its class, and an optional physical-register pin
/// from a register-allocation requirement.
#[derive(Debug, Clone, Copy)]
pub struct VirtualRegister {
    pub class: VirtualRegisterClass,
    pub pinned: Option<PhysicalRegister>,
}

/// An x86-64 physical register, named generically (GPR index 0..=15 for
/// integer, SSE index 0..=15 for `xmm0..xmm15`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalRegister {
    Gpr(u8),
    Xmm(u8),
}

/// A minimal AMD64 instruction shape: enough to drive register-allocation
/// and the textual emitter (spec §3 "AsmCmp instructions are opaque to the
/// register allocator aside from their operand list").
#[derive(Debug, Clone)]
pub enum AsmInstr {
    Nop,
    Mov { dst: VRegId, src: VRegId },
    MovImm { dst: VRegId, imm: u64 },
    Load { dst: VRegId, base: VRegId, offset: i32 },
    Store { base: VRegId, offset: i32, src: VRegId },
    Add { dst: VRegId, lhs: VRegId, rhs: VRegId },
    Sub { dst: VRegId, lhs: VRegId, rhs: VRegId },
    And { dst: VRegId, lhs: VRegId, rhs: VRegId },
    Or { dst: VRegId, lhs: VRegId, rhs: VRegId },
    Xor { dst: VRegId, lhs: VRegId, rhs: VRegId },
    /// `shr dst, src, #imm` (logical right shift by an immediate count).
    ShrImm { dst: VRegId, src: VRegId, imm: u8 },
    /// `imul dst, src, #imm` (signed multiply by an immediate; the
    /// popcount template's final byte-lane horizontal sum).
    MulImm { dst: VRegId, src: VRegId, imm: u32 },
    /// `setnp dst_byte` then zero-extend: the parity-flag builtin template.
    SetNp { dst: VRegId },
    MovzxByte { dst: VRegId, src: VRegId },
    Call { target: crate::pool::Symbol, args: Vec<VRegId>, result: Option<VRegId> },
    Ret { value: Option<VRegId> },
    Jmp { label: LabelId },
    Jcc { cond: &'static str, label: LabelId },
}

/// One instruction node in the doubly-linked AsmCmp instruction stream
/// (spec §3 "InstructionHandle{index, instr, prev, next}").
#[derive(Debug, Clone)]
pub struct InstructionHandle {
    pub instr: AsmInstr,
    pub prev: Option<AsmInstrId>,
    pub next: Option<AsmInstrId>,
}

/// A label: either floating (`attached = None`) or bound to an instruction.
/// `next` chains multiple labels attached to the same instruction
/// (spec §3 "Label{attached, position, prev, next}").
#[derive(Debug, Clone)]
pub struct Label {
    pub attached: Option<AsmInstrId>,
    pub position: Option<u32>,
    pub next: Option<LabelId>,
}

/// The AsmCmp container (spec §3 "AsmCmpContext").
#[derive(Debug, Default)]
pub struct AsmCmpContext {
    instrs: PrimaryMap<AsmInstrId, InstructionHandle>,
    labels: PrimaryMap<LabelId, Label>,
    vregs: PrimaryMap<VRegId, VirtualRegister>,
    head: Option<AsmInstrId>,
    tail: Option<AsmInstrId>,
    /// index -> head of that instruction's label list.
    labels_at: HashMap<AsmInstrId, LabelId>,
    floating: Vec<LabelId>,
}

impl AsmCmpContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction, draining any pending floating labels onto it.
    pub fn append(&mut self, instr: AsmInstr) -> AsmInstrId {
        let id = self.instrs.push(InstructionHandle { instr, prev: self.tail, next: None });
        if let Some(t) = self.tail {
            self.instrs.get_mut(t).expect("tail exists").next = Some(id);
        } else {
            self.head = Some(id);
        }
        self.tail = Some(id);

        if !self.floating.is_empty() {
            let mut chain_head: Option<LabelId> = None;
            for lbl in self.floating.drain(..) {
                let label = self.labels.get_mut(lbl).expect("just created");
                label.attached = Some(id);
                label.next = chain_head;
                chain_head = Some(lbl);
            }
            self.labels_at.insert(id, chain_head.expect("non-empty drain"));
        }
        id
    }

    /// Create a new floating label, queued to hoist onto the next append.
    pub fn create_label(&mut self) -> LabelId {
        let id = self.labels.push(Label { attached: None, position: None, next: None });
        self.floating.push(id);
        id
    }

    pub fn label(&self, id: LabelId) -> &Label {
        &self.labels[id]
    }

    /// The head of the label chain attached to `instr`, if any.
    pub fn labels_attached_to(&self, instr: AsmInstrId) -> Vec<LabelId> {
        let mut out = Vec::new();
        let mut cursor = self.labels_at.get(&instr).copied();
        while let Some(lbl) = cursor {
            out.push(lbl);
            cursor = self.labels[lbl].next;
        }
        out
    }

    pub fn head(&self) -> Option<AsmInstrId> {
        self.head
    }

    pub fn tail(&self) -> Option<AsmInstrId> {
        self.tail
    }

    pub fn instr(&self, id: AsmInstrId) -> &InstructionHandle {
        &self.instrs[id]
    }

    /// Mint a fresh virtual register of `class`.
    pub fn new_vreg(&mut self, class: VirtualRegisterClass) -> VRegId {
        self.vregs.push(VirtualRegister { class, pinned: None })
    }

    /// Pin `vreg` to a physical register (a register-allocation requirement).
    pub fn pin_vreg(&mut self, vreg: VRegId, phys: PhysicalRegister) {
        self.vregs.get_mut(vreg).expect("minted by this context").pinned = Some(phys);
    }

    pub fn vreg(&self, id: VRegId) -> &VirtualRegister {
        &self.vregs[id]
    }

    pub fn instr_count(&self) -> usize {
        self.instrs.len()
    }

    /// Iterate instructions in list order (verifies head/tail/prev/next
    /// stay consistent, spec §5 "insertion helpers preserve the invariant").
    pub fn iter_in_order(&self) -> Vec<AsmInstrId> {
        let mut out = Vec::new();
        let mut cursor = self.head;
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.instrs[id].next;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nop() -> AsmInstr {
        AsmInstr::Nop
    }

    /// Testable property #7: a floating label attaches to the next
    /// appended instruction; with none appended, it stays unattached.
    #[test]
    fn floating_label_hoists_onto_next_instruction() {
        let mut ctx = AsmCmpContext::new();
        let lbl = ctx.create_label();
        assert!(ctx.label(lbl).attached.is_none());
        let id = ctx.append(nop());
        assert_eq!(ctx.label(lbl).attached, Some(id));
    }

    #[test]
    fn floating_label_stays_unattached_with_no_further_instructions() {
        let mut ctx = AsmCmpContext::new();
        let lbl = ctx.create_label();
        assert!(ctx.label(lbl).attached.is_none());
        // No append() call follows; the label must still be unattached.
        assert!(ctx.label(lbl).attached.is_none());
    }

    #[test]
    fn multiple_floating_labels_hoist_onto_the_same_instruction() {
        let mut ctx = AsmCmpContext::new();
        let l1 = ctx.create_label();
        let l2 = ctx.create_label();
        let id = ctx.append(nop());
        let attached = ctx.labels_attached_to(id);
        assert_eq!(attached.len(), 2);
        assert!(attached.contains(&l1));
        assert!(attached.contains(&l2));
    }

    #[test]
    fn instruction_list_preserves_insertion_order() {
        let mut ctx = AsmCmpContext::new();
        let a = ctx.append(nop());
        let b = ctx.append(nop());
        let c = ctx.append(nop());
        assert_eq!(ctx.iter_in_order(), vec![a, b, c]);
        assert_eq!(ctx.head(), Some(a));
        assert_eq!(ctx.tail(), Some(c));
    }
}
