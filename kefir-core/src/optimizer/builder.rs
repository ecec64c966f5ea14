//! `opt_code_builder`: the instruction-builder contract of spec §4.4.
//!
//! Every append goes through [`OptCodeBuilder::add_instruction`], which
//! enforces the block-finalization invariant (spec §3, testable property
//! #6): once a block's last control instruction is one of
//! `{JUMP, IJUMP, BRANCH, RETURN}`, or an `INLINE_ASSEMBLY` with at least
//! one jump target, the block is finalized and rejects any further
//! control-affecting append.

use super::entities::{OptBlockId, OptInstrId, OptPhiId, OptSideNodeId};
use super::instruction::{OptInstruction, OptOpcode, OptParam};
use super::{CallNode, InlineAsmNode, OptCodeContainer, PhiNode, SUPPORTED_MEMORY_ORDER};
use crate::error::{KefirError, KefirResult};
use crate::ir::{BranchTriple, MemoryOrder, Signedness};
use crate::pool::{Symbol, TypeId};

/// A thin wrapper around `&mut OptCodeContainer` providing the builder
/// contract; a fresh one is created per function being translated.
pub struct OptCodeBuilder<'c> {
    container: &'c mut OptCodeContainer,
}

impl<'c> OptCodeBuilder<'c> {
    pub fn new(container: &'c mut OptCodeContainer) -> Self {
        OptCodeBuilder { container }
    }

    fn check_refs_exist(&self, refs: &[OptInstrId]) -> KefirResult<()> {
        for r in refs {
            if self.container.instructions.get(*r).is_none() {
                return Err(KefirError::InvalidParameter(format!(
                    "instruction reference {r} does not exist"
                )));
            }
        }
        Ok(())
    }

    /// Append `op` to `block`; if `control` is set, also link it into the
    /// block's control subsequence. Errors if the block is already
    /// finalized and `op` is control-affecting.
    pub fn add_instruction(
        &mut self,
        block: OptBlockId,
        op: OptOpcode,
        control: bool,
        param: OptParam,
    ) -> KefirResult<OptInstrId> {
        let is_control_affecting = control || op.is_terminator();
        {
            let block_data = self
                .container
                .blocks
                .get(block)
                .ok_or_else(|| KefirError::InvalidParameter("unknown block".into()))?;
            if block_data.is_finalized() && is_control_affecting {
                return Err(KefirError::InvalidRequest(
                    "cannot append a control instruction to a finalized block".into(),
                ));
            }
        }
        let instr = OptInstruction::new(op, block, param);
        let id = self.container.instructions.push(instr);
        log::trace!("optimizer: appended {op:?} as {id} to block {block}");
        let block_data = self.container.blocks.get_mut(block).unwrap();
        block_data.instrs.push(id);
        if is_control_affecting {
            block_data.control.push(id);
        }
        Ok(id)
    }

    fn finalize(&mut self, block: OptBlockId) {
        if let Some(b) = self.container.blocks.get_mut(block) {
            b.finalized = true;
            log::debug!("optimizer: block {block} finalized");
        }
    }

    /// `finalize_jump`: append-and-close.
    pub fn finalize_jump(&mut self, block: OptBlockId, target: OptBlockId) -> KefirResult<OptInstrId> {
        let id = self.add_instruction(block, OptOpcode::Jump, true, OptParam::Jump { target })?;
        self.finalize(block);
        Ok(id)
    }

    /// `finalize_branch`: append-and-close with a condition and two targets.
    pub fn finalize_branch(
        &mut self,
        block: OptBlockId,
        cond_ref: OptInstrId,
        target: OptBlockId,
        else_target: OptBlockId,
    ) -> KefirResult<OptInstrId> {
        self.check_refs_exist(&[cond_ref])?;
        let id = self.add_instruction(
            block,
            OptOpcode::Branch,
            true,
            OptParam::Branch {
                cond: cond_ref,
                targets: BranchTriple { then_block: target, else_block: else_target },
            },
        )?;
        self.finalize(block);
        Ok(id)
    }

    /// `finalize_indirect_jump`.
    pub fn finalize_indirect_jump(
        &mut self,
        block: OptBlockId,
        addr: OptInstrId,
    ) -> KefirResult<OptInstrId> {
        self.check_refs_exist(&[addr])?;
        let id = self.add_instruction(
            block,
            OptOpcode::IJump,
            true,
            OptParam::Refs([Some(addr), None, None]),
        )?;
        self.finalize(block);
        Ok(id)
    }

    /// `finalize_return`.
    pub fn finalize_return(
        &mut self,
        block: OptBlockId,
        value: Option<OptInstrId>,
    ) -> KefirResult<OptInstrId> {
        if let Some(v) = value {
            self.check_refs_exist(&[v])?;
        }
        let id = self.add_instruction(
            block,
            OptOpcode::Return,
            true,
            OptParam::Refs([value, None, None]),
        )?;
        self.finalize(block);
        Ok(id)
    }

    /// `phi`: create a phi instruction and bind the phi node's output ref to it.
    pub fn phi(&mut self, block: OptBlockId, incoming: Vec<(OptBlockId, OptInstrId)>) -> KefirResult<OptInstrId> {
        for (_, v) in &incoming {
            self.check_refs_exist(&[*v])?;
        }
        let phi_id: OptPhiId = self.container.phis.push(PhiNode { block, incoming });
        self.add_instruction(block, OptOpcode::Phi, false, OptParam::Phi(phi_id))
    }

    /// `invoke`: a direct call.
    pub fn invoke(
        &mut self,
        block: OptBlockId,
        callee: Symbol,
        args: Vec<OptInstrId>,
        return_type: Option<TypeId>,
    ) -> KefirResult<OptInstrId> {
        self.check_refs_exist(&args)?;
        let side = self.container.calls.push(CallNode {
            callee: Some(callee),
            indirect_target: None,
            args,
            return_type,
        });
        self.add_instruction(block, OptOpcode::Call, false, OptParam::Call(side))
    }

    /// `invoke_virtual`: an indirect call through a function-pointer value.
    pub fn invoke_virtual(
        &mut self,
        block: OptBlockId,
        target_ref: OptInstrId,
        args: Vec<OptInstrId>,
        return_type: Option<TypeId>,
    ) -> KefirResult<OptInstrId> {
        self.check_refs_exist(&args)?;
        self.check_refs_exist(&[target_ref])?;
        let side = self.container.calls.push(CallNode {
            callee: None,
            indirect_target: Some(target_ref),
            args,
            return_type,
        });
        self.add_instruction(
            block,
            OptOpcode::InvokeVirtual,
            false,
            OptParam::IndirectCall { side_node: side, target: target_ref },
        )
    }

    /// `inline_assembly`: emit an inline-assembly node; finalizes the block
    /// iff at least one jump target is supplied (spec §3).
    pub fn inline_assembly(
        &mut self,
        block: OptBlockId,
        template: Symbol,
        inputs: Vec<OptInstrId>,
        jump_targets: Vec<OptBlockId>,
    ) -> KefirResult<OptInstrId> {
        self.check_refs_exist(&inputs)?;
        let has_targets = !jump_targets.is_empty();
        let side = self.container.inline_asm.push(InlineAsmNode {
            template,
            inputs,
            jump_targets,
        });
        let id = self.add_instruction(
            block,
            OptOpcode::InlineAssembly,
            has_targets,
            OptParam::InlineAsm(side),
        )?;
        if has_targets {
            self.finalize(block);
        }
        Ok(id)
    }

    /// Atomic opcodes only support `SeqCst` (spec §4.4). Every atomic
    /// builder helper routes its memory-order argument through this check.
    pub fn require_seqcst(&self, order: MemoryOrder) -> KefirResult<()> {
        if order != SUPPORTED_MEMORY_ORDER {
            return Err(KefirError::InvalidParameter(
                "only sequentially-consistent atomics are supported".into(),
            ));
        }
        Ok(())
    }

    pub fn atomic_load(
        &mut self,
        block: OptBlockId,
        addr: OptInstrId,
        order: MemoryOrder,
    ) -> KefirResult<OptInstrId> {
        self.require_seqcst(order)?;
        self.check_refs_exist(&[addr])?;
        self.add_instruction(
            block,
            OptOpcode::AtomicLoad,
            false,
            OptParam::Refs([Some(addr), None, None]),
        )
    }

    pub fn stack_alloc(
        &mut self,
        block: OptBlockId,
        size: OptInstrId,
        align: u32,
        scope: OptBlockId,
    ) -> KefirResult<OptInstrId> {
        self.check_refs_exist(&[size])?;
        self.add_instruction(
            block,
            OptOpcode::StackAlloc,
            false,
            OptParam::StackAlloc { size, align, scope },
        )
    }

    pub fn overflow_add(
        &mut self,
        block: OptBlockId,
        lhs: OptInstrId,
        rhs: OptInstrId,
        signedness: Signedness,
    ) -> KefirResult<OptInstrId> {
        self.check_refs_exist(&[lhs, rhs])?;
        self.add_instruction(
            block,
            OptOpcode::OverflowAdd,
            false,
            OptParam::OverflowArith { signedness, lhs, rhs },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::OptCodeContainer;

    fn imm(builder: &mut OptCodeBuilder, block: OptBlockId, v: u64) -> OptInstrId {
        builder
            .add_instruction(block, OptOpcode::ImmU64, false, OptParam::ImmU64(v))
            .unwrap()
    }

    /// Testable property #6: appending a second terminator to a finalized
    /// block fails; appending a non-terminator succeeds.
    #[test]
    fn second_terminator_is_rejected() {
        let mut container = OptCodeContainer::new();
        let b0 = container.push_block();
        let mut builder = OptCodeBuilder::new(&mut container);
        builder.finalize_jump(b0, b0).unwrap();
        let err = builder.finalize_jump(b0, b0);
        assert!(matches!(err, Err(KefirError::InvalidRequest(_))));
    }

    #[test]
    fn non_terminator_after_finalize_is_accepted() {
        let mut container = OptCodeContainer::new();
        let b0 = container.push_block();
        let mut builder = OptCodeBuilder::new(&mut container);
        builder.finalize_jump(b0, b0).unwrap();
        let v = imm(&mut builder, b0, 1);
        // `v` is still an append to `b0`'s instruction stream (not control),
        // which spec §3 explicitly permits even after finalization.
        assert!(container.instructions.get(v).is_some());
    }

    #[test]
    fn inline_asm_without_targets_does_not_finalize() {
        let mut container = OptCodeContainer::new();
        let b0 = container.push_block();
        let mut builder = OptCodeBuilder::new(&mut container);
        let template = Symbol::new(0);
        builder.inline_assembly(b0, template, vec![], vec![]).unwrap();
        assert!(!container.blocks.get(b0).unwrap().is_finalized());
    }

    #[test]
    fn inline_asm_with_targets_finalizes() {
        let mut container = OptCodeContainer::new();
        let b0 = container.push_block();
        let b1 = container.push_block();
        let mut builder = OptCodeBuilder::new(&mut container);
        let template = Symbol::new(0);
        builder
            .inline_assembly(b0, template, vec![], vec![b1])
            .unwrap();
        assert!(container.blocks.get(b0).unwrap().is_finalized());
    }

    #[test]
    fn atomics_reject_non_seqcst() {
        // There is only one `MemoryOrder` variant implemented; this test
        // exercises the guard function directly to document the rejection
        // path spec §4.4 calls for once more orders are modeled.
        let mut container = OptCodeContainer::new();
        let b0 = container.push_block();
        let builder = OptCodeBuilder::new(&mut container);
        assert!(builder.require_seqcst(MemoryOrder::SeqCst).is_ok());
        let _ = b0;
    }

    #[test]
    fn unresolved_reference_is_rejected() {
        let mut container = OptCodeContainer::new();
        let b0 = container.push_block();
        let mut builder = OptCodeBuilder::new(&mut container);
        let bogus = OptInstrId::new(99);
        assert!(builder.finalize_return(b0, Some(bogus)).is_err());
    }
}
