//! System-V AMD64 ABI classification (spec §4.5 "ABI classification").
//!
//! Recursive over `IrType` layouts, producing one [`RegisterClass`] per
//! eightbyte of an argument or return slot, then allocating the System-V
//! integer/SSE argument register pools against that classification
//! (testable property #8, scenario S5).

use crate::error::{KefirError, KefirResult};
use crate::ir::{IrType, IrTypeEntry};
use crate::pool::Symbol;
use super::asmcmp::PhysicalRegister;

/// One eightbyte's classification (System-V AMD64 ABI, §3.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterClass {
    NoClass,
    Integer,
    Sse,
    SseUp,
    X87,
    X87Up,
    ComplexX87,
    Memory,
}

impl RegisterClass {
    /// The ABI's class-merge rule (§3.2.3 step 4): symmetric, with `Memory`
    /// and `Integer` dominant, floating classes yielding to anything else.
    fn merge(self, other: RegisterClass) -> RegisterClass {
        use RegisterClass::*;
        match (self, other) {
            (a, b) if a == b => a,
            (NoClass, x) | (x, NoClass) => x,
            (Memory, _) | (_, Memory) => Memory,
            (Integer, _) | (_, Integer) => Integer,
            (X87, _) | (_, X87) | (X87Up, _) | (_, X87Up) | (ComplexX87, _) | (_, ComplexX87) => Memory,
            _ => Sse,
        }
    }
}

/// A single eightbyte slot's classification plus its byte offset within the
/// aggregate, for callers that need to know where to load/store it from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eightbyte {
    pub class: RegisterClass,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy)]
enum Leaf {
    Integer,
    Sse,
    /// A long double occupies both of its eightbytes directly as
    /// `{X87, X87Up}`, never merged with a neighbor (§3.2.3, long double
    /// is always eightbyte-aligned and alone).
    LongDoublePair,
}

struct Layout {
    size: u64,
    align: u64,
    leaves: Vec<(u64, Leaf)>,
    forces_memory: bool,
}

fn round_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        value
    } else {
        (value + align - 1) / align * align
    }
}

/// Walk `entries` starting at `*idx`, returning the element's size/align and
/// flattened leaf list (leaf offsets relative to the element's own start).
fn layout_of(entries: &[IrTypeEntry], idx: &mut usize) -> KefirResult<Layout> {
    let entry = entries.get(*idx).ok_or_else(|| {
        KefirError::InvalidParameter("type entry index out of range".into())
    })?;
    *idx += 1;
    let scalar = |size: u64, align: u64, leaf: Leaf| Layout {
        size,
        align,
        leaves: vec![(0, leaf)],
        forces_memory: false,
    };
    Ok(match entry {
        IrTypeEntry::Bool | IrTypeEntry::Int8 => scalar(1, 1, Leaf::Integer),
        IrTypeEntry::Int16 => scalar(2, 2, Leaf::Integer),
        IrTypeEntry::Int32 => scalar(4, 4, Leaf::Integer),
        IrTypeEntry::Float32 => scalar(4, 4, Leaf::Sse),
        IrTypeEntry::Int64 | IrTypeEntry::Pointer => scalar(8, 8, Leaf::Integer),
        IrTypeEntry::Float64 => scalar(8, 8, Leaf::Sse),
        IrTypeEntry::ComplexFloat32 => Layout {
            size: 8,
            align: 4,
            leaves: vec![(0, Leaf::Sse), (4, Leaf::Sse)],
            forces_memory: false,
        },
        IrTypeEntry::ComplexFloat64 => Layout {
            size: 16,
            align: 8,
            leaves: vec![(0, Leaf::Sse), (8, Leaf::Sse)],
            forces_memory: false,
        },
        IrTypeEntry::LongDouble => Layout {
            size: 16,
            align: 16,
            leaves: vec![(0, Leaf::LongDoublePair)],
            forces_memory: false,
        },
        IrTypeEntry::ComplexLongDouble => {
            // `_Complex long double` is always classified MEMORY (§3.2.3
            // "If the class is COMPLEX_X87 ... passed in memory").
            Layout { size: 32, align: 16, leaves: vec![], forces_memory: true }
        }
        IrTypeEntry::Bits { width, .. } => {
            let bytes = ((*width as u64) + 7) / 8;
            let size = round_up(bytes, 8).max(1);
            let align = size.min(8);
            scalar(size, align, Leaf::Integer)
        }
        IrTypeEntry::Builtin(_) => scalar(8, 8, Leaf::Integer),
        IrTypeEntry::StructStart { fields } => {
            let mut offset = 0u64;
            let mut align = 1u64;
            let mut leaves = Vec::new();
            let mut forces_memory = false;
            for _ in 0..*fields {
                let field = layout_of(entries, idx)?;
                offset = round_up(offset, field.align.max(1));
                align = align.max(field.align);
                forces_memory |= field.forces_memory;
                for (off, leaf) in field.leaves {
                    leaves.push((offset + off, leaf));
                }
                offset += field.size;
            }
            let size = round_up(offset, align.max(1));
            Layout { size, align: align.max(1), leaves, forces_memory }
        }
        IrTypeEntry::UnionStart { fields } => {
            let mut size = 0u64;
            let mut align = 1u64;
            let mut leaves = Vec::new();
            let mut forces_memory = false;
            for _ in 0..*fields {
                let field = layout_of(entries, idx)?;
                align = align.max(field.align);
                forces_memory |= field.forces_memory;
                size = size.max(field.size);
                leaves.extend(field.leaves);
            }
            Layout { size: round_up(size, align.max(1)), align: align.max(1), leaves, forces_memory }
        }
        IrTypeEntry::ArrayStart { len } => {
            let elem_start = *idx;
            let elem = layout_of(entries, idx)?;
            let count = len.unwrap_or(0);
            let total = elem.size.saturating_mul(count);
            // Only the leading 16 bytes matter for classification; a larger
            // array is MEMORY regardless, so cap the replicated leaves.
            let reps = if elem.size == 0 { 0 } else { (16 / elem.size.max(1)).min(count).max(1) };
            let mut leaves = Vec::new();
            for rep in 0..reps {
                for (off, leaf) in &elem.leaves {
                    leaves.push((rep * elem.size + off, *leaf));
                }
            }
            let _ = elem_start;
            Layout {
                size: total,
                align: elem.align,
                leaves,
                forces_memory: elem.forces_memory,
            }
        }
    })
}

/// Classify an `IrType` into its eightbyte sequence (spec §4.5, testable
/// property #8). Returns `Memory` eightbytes (one per 8 bytes of size, at
/// least one) if the aggregate doesn't fit the register-passing rules.
pub fn classify_type(ty: &IrType) -> KefirResult<Vec<RegisterClass>> {
    let entries = ty.entries();
    if entries.is_empty() {
        return Ok(vec![]);
    }
    let mut idx = 0;
    let layout = layout_of(entries, &mut idx)?;
    let eightbytes = (round_up(layout.size.max(1), 8) / 8) as usize;

    if layout.forces_memory || eightbytes > 2 {
        return Ok(vec![RegisterClass::Memory; eightbytes.max(1)]);
    }

    let mut classes = vec![RegisterClass::NoClass; eightbytes.max(1)];
    for (offset, leaf) in &layout.leaves {
        let slot = (*offset / 8) as usize;
        match leaf {
            Leaf::LongDoublePair => {
                classes[slot] = RegisterClass::X87;
                if slot + 1 < classes.len() {
                    classes[slot + 1] = RegisterClass::X87Up;
                }
            }
            Leaf::Integer if slot < classes.len() => {
                classes[slot] = classes[slot].merge(RegisterClass::Integer)
            }
            Leaf::Sse if slot < classes.len() => {
                classes[slot] = classes[slot].merge(RegisterClass::Sse)
            }
            _ => {}
        }
    }
    if classes.iter().any(|c| *c == RegisterClass::Memory) {
        return Ok(vec![RegisterClass::Memory; classes.len()]);
    }
    for c in classes.iter_mut() {
        if *c == RegisterClass::NoClass {
            *c = RegisterClass::Sse;
        }
    }
    Ok(classes)
}

/// Classify a function's return type the same way as an argument (the
/// register pools are narrower: `{RAX, RDX}` / `{XMM0, XMM1}`, enforced by
/// [`SystemVClassifier::allocate_return`] rather than here).
pub fn classify_return(ty: &IrType) -> KefirResult<Vec<RegisterClass>> {
    classify_type(ty)
}

const ARG_GPRS: [PhysicalRegister; 6] = [
    PhysicalRegister::Gpr(7), // rdi
    PhysicalRegister::Gpr(6), // rsi
    PhysicalRegister::Gpr(2), // rdx
    PhysicalRegister::Gpr(1), // rcx
    PhysicalRegister::Gpr(8), // r8
    PhysicalRegister::Gpr(9), // r9
];
const ARG_SSES: [PhysicalRegister; 8] = [
    PhysicalRegister::Xmm(0),
    PhysicalRegister::Xmm(1),
    PhysicalRegister::Xmm(2),
    PhysicalRegister::Xmm(3),
    PhysicalRegister::Xmm(4),
    PhysicalRegister::Xmm(5),
    PhysicalRegister::Xmm(6),
    PhysicalRegister::Xmm(7),
];
const RETURN_GPRS: [PhysicalRegister; 2] = [PhysicalRegister::Gpr(0), PhysicalRegister::Gpr(2)];
const RETURN_SSES: [PhysicalRegister; 2] = [PhysicalRegister::Xmm(0), PhysicalRegister::Xmm(1)];

/// Where one argument (or the return value) ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgLocation {
    Registers(Vec<PhysicalRegister>),
    Memory,
}

/// Threads the GPR/SSE argument-register pools across a parameter list
/// (spec §4.5 "System-V AMD64 argument allocation").
#[derive(Debug, Default)]
pub struct SystemVClassifier {
    next_gpr: usize,
    next_sse: usize,
}

impl SystemVClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate registers for one argument's eightbyte classification.
    /// Per §3.2.3 "passing" rules: if either pool runs out for any of this
    /// argument's eightbytes, the *whole* argument goes to memory (no
    /// partial spill), and neither pool is consumed.
    pub fn allocate(&mut self, classes: &[RegisterClass]) -> ArgLocation {
        if classes.iter().any(|c| *c == RegisterClass::Memory) {
            return ArgLocation::Memory;
        }
        let gprs_needed = classes
            .iter()
            .filter(|c| matches!(c, RegisterClass::Integer))
            .count();
        let sses_needed = classes
            .iter()
            .filter(|c| matches!(c, RegisterClass::Sse | RegisterClass::SseUp))
            .count();
        let x87_needed = classes.iter().any(|c| matches!(c, RegisterClass::X87 | RegisterClass::X87Up));
        if x87_needed {
            // The x87/x87up pair (long double) is passed on the stack in
            // the System-V AMD64 calling convention, never in SSE/GPR.
            return ArgLocation::Memory;
        }
        if self.next_gpr + gprs_needed > ARG_GPRS.len() || self.next_sse + sses_needed > ARG_SSES.len() {
            return ArgLocation::Memory;
        }
        let mut regs = Vec::with_capacity(classes.len());
        for class in classes {
            match class {
                RegisterClass::Integer => {
                    regs.push(ARG_GPRS[self.next_gpr]);
                    self.next_gpr += 1;
                }
                RegisterClass::Sse | RegisterClass::SseUp => {
                    regs.push(ARG_SSES[self.next_sse]);
                    self.next_sse += 1;
                }
                _ => unreachable!("filtered above"),
            }
        }
        ArgLocation::Registers(regs)
    }

    /// Classify and allocate a return value; `None` means "void". A
    /// `Memory` classification means the callee writes through a hidden
    /// pointer (passed in `rdi` by the caller, returned again in `rax`).
    pub fn allocate_return(classes: &[RegisterClass]) -> ArgLocation {
        if classes.is_empty() {
            return ArgLocation::Registers(vec![]);
        }
        if classes.iter().any(|c| matches!(c, RegisterClass::Memory | RegisterClass::X87 | RegisterClass::X87Up)) {
            return ArgLocation::Memory;
        }
        let mut gpr_idx = 0;
        let mut sse_idx = 0;
        let mut regs = Vec::with_capacity(classes.len());
        for class in classes {
            match class {
                RegisterClass::Integer => {
                    regs.push(RETURN_GPRS[gpr_idx]);
                    gpr_idx += 1;
                }
                RegisterClass::Sse | RegisterClass::SseUp => {
                    regs.push(RETURN_SSES[sse_idx]);
                    sse_idx += 1;
                }
                _ => unreachable!("filtered above"),
            }
        }
        ArgLocation::Registers(regs)
    }
}

/// A function's name, retained alongside its signature for call-site
/// emission (spec §4.5's `FunctionDecl` analogue at the codegen boundary).
pub type FunctionName = Symbol;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrType, IrTypeEntry};

    /// Testable property #8 / scenario S5: `struct S { int a; double b; }`
    /// classifies as `{Integer, SSE}` and allocates to `{RDI, XMM0}`.
    #[test]
    fn scenario_s5_struct_int_double_classifies_and_allocates() {
        let mut ty = IrType::new();
        ty.push(IrTypeEntry::StructStart { fields: 2 });
        ty.push(IrTypeEntry::Int32);
        ty.push(IrTypeEntry::Float64);

        let classes = classify_type(&ty).unwrap();
        assert_eq!(classes, vec![RegisterClass::Integer, RegisterClass::Sse]);

        let mut classifier = SystemVClassifier::new();
        let loc = classifier.allocate(&classes);
        assert_eq!(
            loc,
            ArgLocation::Registers(vec![PhysicalRegister::Gpr(7), PhysicalRegister::Xmm(0)])
        );
    }

    #[test]
    fn oversized_aggregate_is_memory_classified() {
        let mut ty = IrType::new();
        ty.push(IrTypeEntry::StructStart { fields: 3 });
        ty.push(IrTypeEntry::Int64);
        ty.push(IrTypeEntry::Int64);
        ty.push(IrTypeEntry::Int64);
        let classes = classify_type(&ty).unwrap();
        assert!(classes.iter().all(|c| *c == RegisterClass::Memory));
    }

    #[test]
    fn scalar_double_classifies_sse() {
        let mut ty = IrType::new();
        ty.push(IrTypeEntry::Float64);
        assert_eq!(classify_type(&ty).unwrap(), vec![RegisterClass::Sse]);
    }

    #[test]
    fn long_double_is_x87_pair_and_passed_in_memory() {
        let mut ty = IrType::new();
        ty.push(IrTypeEntry::LongDouble);
        let classes = classify_type(&ty).unwrap();
        assert_eq!(classes, vec![RegisterClass::X87, RegisterClass::X87Up]);
        let mut classifier = SystemVClassifier::new();
        assert_eq!(classifier.allocate(&classes), ArgLocation::Memory);
    }

    #[test]
    fn register_pool_exhaustion_spills_whole_argument_to_memory() {
        let mut classifier = SystemVClassifier::new();
        for _ in 0..6 {
            let loc = classifier.allocate(&[RegisterClass::Integer]);
            assert!(matches!(loc, ArgLocation::Registers(_)));
        }
        // Two-eightbyte integer aggregate needs 2 GPRs; only 0 remain.
        let loc = classifier.allocate(&[RegisterClass::Integer, RegisterClass::Integer]);
        assert_eq!(loc, ArgLocation::Memory);
    }

    #[test]
    fn complex_long_double_is_memory_classified() {
        let mut ty = IrType::new();
        ty.push(IrTypeEntry::ComplexLongDouble);
        let classes = classify_type(&ty).unwrap();
        assert!(classes.iter().all(|c| *c == RegisterClass::Memory));
    }
}
