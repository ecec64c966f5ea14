//! `IrModule`/`IrFunction`/`IrBlock`: the unit-level and per-function
//! containers the translator builds (spec §3).

use super::entities::{BlockId, FuncId, GlobalId, InlineAsmId, LocalVarId};
use super::instr::IrInstr;
use super::IrType;
use crate::error::{KefirError, KefirResult};
use crate::pool::{BigIntPool, Symbol, TypeId};
use kefir_entity::PrimaryMap;

/// A linear sequence of instructions (spec §3 "IrBlock").
#[derive(Debug, Clone, Default)]
pub struct IrBlock {
    pub instrs: Vec<IrInstr>,
}

impl IrBlock {
    pub fn push(&mut self, instr: IrInstr) {
        self.instrs.push(instr);
    }
}

/// A local-variable slot: its type and whether it is addressed (`&x`
/// taken), which forces a stack home rather than a pure SSA temporary.
#[derive(Debug, Clone)]
pub struct LocalVarLayout {
    pub type_id: TypeId,
    pub addressable: bool,
}

/// A function's declaration shape: name, parameter types, return type.
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Symbol,
    pub params: Vec<TypeId>,
    pub vararg: bool,
    pub returns: Option<TypeId>,
}

/// A defined function: its declaration plus a linear block sequence and
/// local-variable layout (spec §3 "IrFunction").
#[derive(Debug, Clone)]
pub struct IrFunction {
    pub decl: FunctionDecl,
    blocks: PrimaryMap<BlockId, IrBlock>,
    pub locals: PrimaryMap<LocalVarId, LocalVarLayout>,
}

impl IrFunction {
    pub fn new(decl: FunctionDecl) -> Self {
        IrFunction {
            decl,
            blocks: PrimaryMap::new(),
            locals: PrimaryMap::new(),
        }
    }

    pub fn push_block(&mut self) -> BlockId {
        self.blocks.push(IrBlock::default())
    }

    pub fn block(&self, id: BlockId) -> &IrBlock {
        &self.blocks[id]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut IrBlock {
        &mut self.blocks[id]
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn alloc_local(&mut self, type_id: TypeId, addressable: bool) -> LocalVarId {
        self.locals.push(LocalVarLayout { type_id, addressable })
    }
}

/// A module-level global variable.
#[derive(Debug, Clone)]
pub struct IrGlobal {
    pub name: Symbol,
    pub type_id: TypeId,
    pub thread_local: bool,
    pub visible: bool,
}

/// The unit-level container the translator produces (spec §3 "IrModule").
#[derive(Debug, Default)]
pub struct IrModule {
    functions: PrimaryMap<FuncId, IrFunction>,
    declarations: PrimaryMap<FuncId, FunctionDecl>,
    globals: PrimaryMap<GlobalId, IrGlobal>,
    pub type_layouts: PrimaryMap<TypeId, IrType>,
    string_literals: Vec<Symbol>,
    inline_asm: PrimaryMap<InlineAsmId, String>,
    pub bigints: BigIntPool,
}

impl IrModule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare_function(&mut self, decl: FunctionDecl) -> FuncId {
        self.declarations.push(decl)
    }

    pub fn define_function(&mut self, func: IrFunction) -> FuncId {
        self.functions.push(func)
    }

    pub fn function(&self, id: FuncId) -> KefirResult<&IrFunction> {
        self.functions
            .get(id)
            .ok_or_else(|| KefirError::NotFound("function not defined in this module".into()))
    }

    pub fn function_mut(&mut self, id: FuncId) -> KefirResult<&mut IrFunction> {
        self.functions
            .get_mut(id)
            .ok_or_else(|| KefirError::NotFound("function not defined in this module".into()))
    }

    pub fn declare_global(&mut self, global: IrGlobal) -> GlobalId {
        self.globals.push(global)
    }

    pub fn global(&self, id: GlobalId) -> &IrGlobal {
        &self.globals[id]
    }

    pub fn push_string_literal(&mut self, sym: Symbol) -> u32 {
        self.string_literals.push(sym);
        (self.string_literals.len() - 1) as u32
    }

    pub fn push_inline_asm(&mut self, template: String) -> InlineAsmId {
        self.inline_asm.push(template)
    }

    pub fn inline_asm(&self, id: InlineAsmId) -> &str {
        &self.inline_asm[id]
    }

    pub fn record_type_layout(&mut self, id: TypeId, layout: IrType) {
        while self.type_layouts.len() <= id.index() {
            self.type_layouts.push(IrType::new());
        }
        *self.type_layouts.get_mut(id).expect("just ensured capacity") = layout;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instr::{IrInstr, IrOpcode};

    #[test]
    fn function_blocks_preserve_insertion_order() {
        let mut f = IrFunction::new(FunctionDecl {
            name: Symbol::new(0),
            params: vec![],
            vararg: false,
            returns: None,
        });
        let b0 = f.push_block();
        let b1 = f.push_block();
        f.block_mut(b0).push(IrInstr::simple(IrOpcode::Nop));
        f.block_mut(b1).push(IrInstr::simple(IrOpcode::Return));
        assert_eq!(f.block(b0).instrs.len(), 1);
        assert_eq!(f.block(b1).instrs[0].opcode, IrOpcode::Return);
    }

    #[test]
    fn module_rejects_lookup_of_undefined_function() {
        let module = IrModule::new();
        let bogus = FuncId::new(0);
        assert!(module.function(bogus).is_err());
    }
}
