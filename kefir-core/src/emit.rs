//! Textual assembly emission plus the DWARF debug-entry side-table
//! (spec §4.5 "Emitter", §6 "Debug-info contract").
//!
//! DWARF's actual byte-level section format is explicitly a collaborator's
//! concern (spec §1 Non-goals: "debug-info DWARF emission format (beyond
//! acknowledging it is driven by the same pipeline)"); this module only
//! populates the `debug_entry_hierarchy` side-table the DWARF writer would
//! consume and emits the section header directives that frame it.

use std::fmt::Write as _;

use crate::codegen::{AsmCmpContext, AsmInstr, PhysicalRegister, VRegId, VirtualRegisterClass};
use crate::error::{KefirError, KefirResult};
use crate::pool::Symbol;
use kefir_entity::{entity_impl, EntityRef, PrimaryMap};

/// Cosmetic-only: which flavor of operand order/prefixing the printer uses.
/// The underlying instruction stream and register allocation are identical
/// either way (spec §3 "AsmSyntax selector ... picks the Display impl").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsmSyntax {
    Intel,
    AttT,
}

fn gpr_name(index: u8) -> &'static str {
    match index {
        0 => "rax",
        1 => "rcx",
        2 => "rdx",
        3 => "rbx",
        4 => "rsp",
        5 => "rbp",
        6 => "rsi",
        7 => "rdi",
        8 => "r8",
        9 => "r9",
        10 => "r10",
        11 => "r11",
        12 => "r12",
        13 => "r13",
        14 => "r14",
        15 => "r15",
        _ => "r?",
    }
}

fn xmm_name(index: u8) -> String {
    format!("xmm{index}")
}

fn reg_name(reg: PhysicalRegister) -> String {
    match reg {
        PhysicalRegister::Gpr(i) => gpr_name(i).to_string(),
        PhysicalRegister::Xmm(i) => xmm_name(i),
    }
}

/// Resolves a virtual register to its allocated physical register; the
/// emitter is handed this by the register-allocation stage rather than
/// computing it itself.
pub trait VRegResolver {
    fn resolve(&self, vreg: VRegId) -> KefirResult<PhysicalRegister>;
}

/// Renders one function's AsmCmp stream to text in the requested syntax.
pub struct Emitter<'a, R: VRegResolver> {
    syntax: AsmSyntax,
    resolver: &'a R,
}

impl<'a, R: VRegResolver> Emitter<'a, R> {
    pub fn new(syntax: AsmSyntax, resolver: &'a R) -> Self {
        Self { syntax, resolver }
    }

    fn reg(&self, vreg: VRegId) -> KefirResult<String> {
        Ok(reg_name(self.resolver.resolve(vreg)?))
    }

    fn mnemonic(&self, mnemonic: &str, operands: &[String]) -> String {
        match self.syntax {
            AsmSyntax::Intel => format!("    {mnemonic} {}", operands.join(", ")),
            AsmSyntax::AttT => {
                let mut rev = operands.to_vec();
                rev.reverse();
                format!("    {mnemonic} {}", rev.join(", "))
            }
        }
    }

    fn reg_operand(&self, s: &str) -> String {
        match self.syntax {
            AsmSyntax::Intel => s.to_string(),
            AsmSyntax::AttT => format!("%{s}"),
        }
    }

    fn mem_operand(&self, base: &str, offset: i32) -> String {
        match self.syntax {
            AsmSyntax::Intel => {
                if offset >= 0 {
                    format!("[{base}+{offset}]")
                } else {
                    format!("[{base}{offset}]")
                }
            }
            AsmSyntax::AttT => format!("{offset}(%{base})"),
        }
    }

    fn imm_operand(&self, imm: u64) -> String {
        match self.syntax {
            AsmSyntax::Intel => format!("{imm}"),
            AsmSyntax::AttT => format!("${imm}"),
        }
    }

    /// Render one instruction. Labels attached to it are rendered by the
    /// caller walking `AsmCmpContext::labels_attached_to` separately, since
    /// a single instruction index may carry several.
    pub fn render_instr(&self, instr: &AsmInstr) -> KefirResult<String> {
        use AsmInstr::*;
        Ok(match instr {
            Nop => "    nop".to_string(),
            Mov { dst, src } => {
                let d = self.reg_operand(&self.reg(*dst)?);
                let s = self.reg_operand(&self.reg(*src)?);
                self.mnemonic("mov", &[d, s])
            }
            MovImm { dst, imm } => {
                let d = self.reg_operand(&self.reg(*dst)?);
                let i = self.imm_operand(*imm);
                self.mnemonic("mov", &[d, i])
            }
            Load { dst, base, offset } => {
                let d = self.reg_operand(&self.reg(*dst)?);
                let b = self.reg(*base)?;
                let m = self.mem_operand(&b, *offset);
                self.mnemonic("mov", &[d, m])
            }
            Store { base, offset, src } => {
                let b = self.reg(*base)?;
                let m = self.mem_operand(&b, *offset);
                let s = self.reg_operand(&self.reg(*src)?);
                self.mnemonic("mov", &[m, s])
            }
            Add { dst, lhs, rhs } => self.binop("add", *dst, *lhs, *rhs)?,
            Sub { dst, lhs, rhs } => self.binop("sub", *dst, *lhs, *rhs)?,
            And { dst, lhs, rhs } => self.binop("and", *dst, *lhs, *rhs)?,
            Or { dst, lhs, rhs } => self.binop("or", *dst, *lhs, *rhs)?,
            Xor { dst, lhs, rhs } => self.binop("xor", *dst, *lhs, *rhs)?,
            ShrImm { dst, src, imm } => {
                let d = self.reg_operand(&self.reg(*dst)?);
                let s = self.reg_operand(&self.reg(*src)?);
                let i = self.imm_operand(*imm as u64);
                if d == s {
                    self.mnemonic("shr", &[d, i])
                } else {
                    format!(
                        "{}\n{}",
                        self.mnemonic("mov", &[d.clone(), s]),
                        self.mnemonic("shr", &[d, i])
                    )
                }
            }
            MulImm { dst, src, imm } => {
                let d = self.reg_operand(&self.reg(*dst)?);
                let s = self.reg_operand(&self.reg(*src)?);
                let i = self.imm_operand(*imm as u64);
                if d == s {
                    self.mnemonic("imul", &[d, i])
                } else {
                    format!(
                        "{}\n{}",
                        self.mnemonic("mov", &[d.clone(), s]),
                        self.mnemonic("imul", &[d, i])
                    )
                }
            }
            SetNp { dst } => {
                let d = self.reg_operand(&self.reg(*dst)?);
                self.mnemonic("setnp", &[d])
            }
            MovzxByte { dst, src } => {
                let d = self.reg_operand(&self.reg(*dst)?);
                let s = self.reg_operand(&self.reg(*src)?);
                self.mnemonic("movzx", &[d, s])
            }
            Call { target, args, result } => {
                let _ = (args, result);
                format!("    call {target}@PLT", target = target.index())
            }
            Ret { value } => {
                let _ = value;
                "    ret".to_string()
            }
            Jmp { label } => format!("    jmp .L{}", label.index()),
            Jcc { cond, label } => format!("    j{cond} .L{}", label.index()),
        })
    }

    fn binop(&self, mnemonic: &str, dst: VRegId, lhs: VRegId, rhs: VRegId) -> KefirResult<String> {
        let d = self.reg_operand(&self.reg(dst)?);
        let l = self.reg_operand(&self.reg(lhs)?);
        let r = self.reg_operand(&self.reg(rhs)?);
        // Two-operand form: materialize `lhs` into `dst` first unless they
        // already coincide (the register allocator is free to coalesce).
        if d == l {
            Ok(self.mnemonic(mnemonic, &[d, r]))
        } else {
            Ok(format!(
                "{}\n{}",
                self.mnemonic("mov", &[d.clone(), l]),
                self.mnemonic(mnemonic, &[d, r])
            ))
        }
    }

    /// Render every instruction in `ctx` in list order, with labels emitted
    /// as their own lines ahead of the instruction they're attached to.
    pub fn render_function(&self, ctx: &AsmCmpContext, symbol: &str) -> KefirResult<String> {
        let mut out = String::new();
        writeln!(out, "{symbol}:").map_err(|_| KefirError::InternalError("format failure".into()))?;
        for id in ctx.iter_in_order() {
            for label in ctx.labels_attached_to(id) {
                writeln!(out, ".L{}:", label.index())
                    .map_err(|_| KefirError::InternalError("format failure".into()))?;
            }
            let line = self.render_instr(&ctx.instr(id).instr)?;
            writeln!(out, "{line}").map_err(|_| KefirError::InternalError("format failure".into()))?;
        }
        writeln!(out, "    .size {symbol}, . - {symbol}")
            .map_err(|_| KefirError::InternalError("format failure".into()))?;
        Ok(out)
    }
}

/// Symbol-naming rules (spec §6 "Symbol naming").
pub fn mangle_static(name: &str, has_collision: bool) -> String {
    if has_collision {
        format!("{name}.static")
    } else {
        name.to_string()
    }
}

pub fn temporary_global_name(id: u64) -> String {
    format!("__kefirrt_temp_{id}")
}

pub fn local_temporary_name(id: u64) -> String {
    format!("__kefirrt_ltemp_{id}")
}

// ---------------------------------------------------------------------
// Builtin opcode templates (spec §4.5, §5 supplement grounded on
// `original_source/source/codegen/amd64/code/builtins.c`).
// ---------------------------------------------------------------------

/// `popcount32`: the classic SWAR bit-trick, materialized as an explicit
/// AsmCmp sequence rather than a single `popcnt` instruction (the reference
/// target doesn't assume `POPCNT` CPUID support). Three pairwise-sum
/// reduction stages (2-bit, then 4-bit lanes folded via a 4-bit shift/add),
/// masked to byte lanes, then horizontally summed by a multiply against
/// `0x01010101` and read out of the top byte (`translate_popcount`).
pub fn emit_popcount32(ctx: &mut AsmCmpContext, input: VRegId) -> VRegId {
    let result = ctx.new_vreg(VirtualRegisterClass::GeneralPurpose);
    let tmp = ctx.new_vreg(VirtualRegisterClass::GeneralPurpose);
    let mask1 = ctx.new_vreg(VirtualRegisterClass::GeneralPurpose);
    let mask2 = ctx.new_vreg(VirtualRegisterClass::GeneralPurpose);
    let mask3 = ctx.new_vreg(VirtualRegisterClass::GeneralPurpose);
    ctx.append(AsmInstr::MovImm { dst: mask1, imm: 0x5555_5555 });
    ctx.append(AsmInstr::MovImm { dst: mask2, imm: 0x3333_3333 });
    ctx.append(AsmInstr::MovImm { dst: mask3, imm: 0x0F0F_0F0F });

    // result = (input >> 1) & 0x55555555
    ctx.append(AsmInstr::Mov { dst: result, src: input });
    ctx.append(AsmInstr::ShrImm { dst: result, src: result, imm: 1 });
    ctx.append(AsmInstr::And { dst: result, lhs: result, rhs: mask1 });

    // tmp = input - result; stage-one pairwise 2-bit sums.
    ctx.append(AsmInstr::Mov { dst: tmp, src: input });
    ctx.append(AsmInstr::Sub { dst: tmp, lhs: tmp, rhs: result });
    ctx.append(AsmInstr::Mov { dst: result, src: tmp });
    ctx.append(AsmInstr::And { dst: result, lhs: result, rhs: mask2 });
    ctx.append(AsmInstr::ShrImm { dst: tmp, src: tmp, imm: 2 });
    ctx.append(AsmInstr::And { dst: tmp, lhs: tmp, rhs: mask2 });
    ctx.append(AsmInstr::Add { dst: tmp, lhs: tmp, rhs: result });

    // Fold into 4-bit lanes, mask to bytes.
    ctx.append(AsmInstr::Mov { dst: result, src: tmp });
    ctx.append(AsmInstr::ShrImm { dst: result, src: result, imm: 4 });
    ctx.append(AsmInstr::Add { dst: result, lhs: result, rhs: tmp });
    ctx.append(AsmInstr::And { dst: result, lhs: result, rhs: mask3 });

    // Horizontal byte sum via multiply, read out of the top byte.
    ctx.append(AsmInstr::MulImm { dst: result, src: result, imm: 0x0101_0101 });
    ctx.append(AsmInstr::ShrImm { dst: result, src: result, imm: 24 });
    result
}

/// Recognizes a direct-call target as one of the codegen-intrinsic
/// builtins and lowers it in place, returning the result vreg. Returns
/// `None` for any other callee, leaving it to the ordinary call-lowering
/// path; this is the single entry point an instruction-selection pass
/// dispatches `OptOpcode::Call` through before falling back to a real
/// `call` (spec §5 "codegen-intrinsic builtins").
pub fn emit_builtin_call(callee_name: &str, ctx: &mut AsmCmpContext, args: &[VRegId]) -> Option<VRegId> {
    match (callee_name, args) {
        ("__kefir_builtin_popcount", [arg]) => Some(emit_popcount32(ctx, *arg)),
        ("__kefir_builtin_parity", [arg]) => Some(emit_parity(ctx, *arg)),
        _ => None,
    }
}

/// `parity`: the parity flag read via `setnp`/zero-extend, exactly the
/// template `builtins.c` spells out for `__kefir_builtin_parity`.
pub fn emit_parity(ctx: &mut AsmCmpContext, input: VRegId) -> VRegId {
    let flag_byte = ctx.new_vreg(VirtualRegisterClass::GeneralPurpose);
    let result = ctx.new_vreg(VirtualRegisterClass::GeneralPurpose);
    // `input` must already have set the flags (a prior `test`/`and`); the
    // template here only covers the flag-to-value tail.
    ctx.append(AsmInstr::SetNp { dst: flag_byte });
    ctx.append(AsmInstr::MovzxByte { dst: result, src: flag_byte });
    result
}

// ---------------------------------------------------------------------
// DWARF debug-entry side-table (scaffolding only; the byte-level section
// writer is a collaborator's concern per spec §1 Non-goals).
// ---------------------------------------------------------------------

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DebugEntryId(u32);
entity_impl!(DebugEntryId, "dbg");

/// The fixed set of DWARF 5 tags this core's debug-info contract covers
/// (spec §6 "Debug-info contract").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugEntryKind {
    Subprogram,
    LexicalBlock,
    FormalParameter,
    Variable,
    BaseType,
    PointerType,
    StructureType,
    UnionType,
    ArrayType,
    TypedefType,
    ConstType,
    VolatileType,
    AtomicType,
}

#[derive(Debug, Clone)]
pub struct DebugEntry {
    pub kind: DebugEntryKind,
    pub name: Option<Symbol>,
    pub parent: Option<DebugEntryId>,
    pub children: Vec<DebugEntryId>,
}

/// The side-table the translator populates while lowering; the real DWARF
/// writer (a collaborator) walks it to produce `.debug_info` bytes.
#[derive(Debug, Default)]
pub struct DebugEntryHierarchy {
    entries: PrimaryMap<DebugEntryId, DebugEntry>,
}

impl DebugEntryHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_root(&mut self, kind: DebugEntryKind, name: Option<Symbol>) -> DebugEntryId {
        self.entries.push(DebugEntry { kind, name, parent: None, children: vec![] })
    }

    pub fn push_child(
        &mut self,
        parent: DebugEntryId,
        kind: DebugEntryKind,
        name: Option<Symbol>,
    ) -> KefirResult<DebugEntryId> {
        if self.entries.get(parent).is_none() {
            return Err(KefirError::InvalidParameter("unknown debug entry parent".into()));
        }
        let id = self.entries.push(DebugEntry { kind, name, parent: Some(parent), children: vec![] });
        self.entries.get_mut(parent).unwrap().children.push(id);
        Ok(id)
    }

    pub fn entry(&self, id: DebugEntryId) -> &DebugEntry {
        &self.entries[id]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Emit the sibling `.section` directives the DWARF writer's output would
/// live in (spec §4.5 "emitted as sibling sections"); this is a header
/// stub only, not the encoded bytes.
pub fn render_debug_section_headers() -> Vec<&'static str> {
    vec![".debug_abbrev", ".debug_info", ".debug_loclists", ".debug_line"]
}
