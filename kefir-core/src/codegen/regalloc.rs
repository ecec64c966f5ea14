//! Linear-scan register allocation over AsmCmp virtual registers, plus the
//! "stash" mechanism that preserves caller-saved registers whose virtual
//! register is still live across a `call` site (spec §4.5 "Register
//! allocation", scenario S6).

use std::collections::HashMap;

use super::asmcmp::{PhysicalRegister, VRegId, VirtualRegisterClass};
use crate::error::{KefirError, KefirResult};

/// A virtual register's live range, in instruction-index coordinates
/// (`[start, end)`, half-open as usual for linear scan).
#[derive(Debug, Clone, Copy)]
pub struct LiveInterval {
    pub vreg: VRegId,
    pub class: VirtualRegisterClass,
    pub start: u32,
    pub end: u32,
}

/// Where a virtual register ended up after allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    Register(PhysicalRegister),
    Spill(u32),
}

/// A caller-saved register save/restore pair around a call site (spec §4.5
/// "stash mechanism ... preserving caller-saved registers across calls").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StashHandle {
    pub vreg: VRegId,
    pub reg: PhysicalRegister,
    pub slot: u32,
}

/// A linear-scan allocator over two independent physical-register pools
/// (general-purpose and floating-point), mirroring how AsmCmp virtual
/// registers are already split by class.
pub struct LinearScanAllocator {
    gprs: Vec<PhysicalRegister>,
    sses: Vec<PhysicalRegister>,
    caller_saved: Vec<PhysicalRegister>,
}

struct Active {
    end: u32,
    reg: PhysicalRegister,
    from_gpr_pool: bool,
}

impl LinearScanAllocator {
    pub fn new(gprs: Vec<PhysicalRegister>, sses: Vec<PhysicalRegister>, caller_saved: Vec<PhysicalRegister>) -> Self {
        Self { gprs, sses, caller_saved }
    }

    /// Run linear scan over `intervals`, which must already be the full set
    /// of live ranges for one function. Spill-class vregs (`SpillSpace`,
    /// `IndirectSpill`) are never given a physical register.
    pub fn allocate(&self, mut intervals: Vec<LiveInterval>) -> KefirResult<HashMap<VRegId, Assignment>> {
        intervals.sort_by_key(|i| i.start);

        let mut free_gprs = self.gprs.clone();
        let mut free_sses = self.sses.clone();
        let mut active: Vec<Active> = Vec::new();
        let mut out = HashMap::new();
        let mut next_spill_slot = 0u32;

        for interval in &intervals {
            active.retain(|a| {
                let expired = a.end <= interval.start;
                if expired {
                    if a.from_gpr_pool {
                        free_gprs.push(a.reg);
                    } else {
                        free_sses.push(a.reg);
                    }
                }
                !expired
            });

            match interval.class {
                VirtualRegisterClass::SpillSpace | VirtualRegisterClass::IndirectSpill => {
                    out.insert(interval.vreg, Assignment::Spill(next_spill_slot));
                    next_spill_slot += 1;
                    continue;
                }
                VirtualRegisterClass::GeneralPurpose => {
                    if let Some(reg) = free_gprs.pop() {
                        active.push(Active { end: interval.end, reg, from_gpr_pool: true });
                        out.insert(interval.vreg, Assignment::Register(reg));
                    } else {
                        out.insert(interval.vreg, Assignment::Spill(next_spill_slot));
                        next_spill_slot += 1;
                    }
                }
                VirtualRegisterClass::FloatingPoint => {
                    if let Some(reg) = free_sses.pop() {
                        active.push(Active { end: interval.end, reg, from_gpr_pool: false });
                        out.insert(interval.vreg, Assignment::Register(reg));
                    } else {
                        out.insert(interval.vreg, Assignment::Spill(next_spill_slot));
                        next_spill_slot += 1;
                    }
                }
            }
        }

        if out.len() != intervals.len() {
            return Err(KefirError::InternalError(
                "register allocation produced a mismatched assignment count".into(),
            ));
        }
        Ok(out)
    }

    /// For a call at instruction index `call_site`, find every interval that
    /// spans across it (`start < call_site < end`) and is assigned a
    /// caller-saved register; each one needs a stash save before the call
    /// and a restore after (scenario S6: `RAX..R9` saved across
    /// `__atomic_load@PLT`).
    pub fn compute_stashes(
        &self,
        intervals: &[LiveInterval],
        assignments: &HashMap<VRegId, Assignment>,
        call_site: u32,
    ) -> Vec<StashHandle> {
        let mut stashes = Vec::new();
        let mut slot = 0u32;
        for interval in intervals {
            if !(interval.start < call_site && call_site < interval.end) {
                continue;
            }
            if let Some(Assignment::Register(reg)) = assignments.get(&interval.vreg) {
                if self.caller_saved.contains(reg) {
                    stashes.push(StashHandle { vreg: interval.vreg, reg: *reg, slot });
                    slot += 1;
                }
            }
        }
        stashes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kefir_entity::EntityRef;

    fn gprs() -> Vec<PhysicalRegister> {
        (0..16).map(PhysicalRegister::Gpr).collect()
    }

    #[test]
    fn disjoint_intervals_reuse_the_same_register() {
        let alloc = LinearScanAllocator::new(gprs(), vec![], vec![]);
        let v0 = VRegId::new(0);
        let v1 = VRegId::new(1);
        let intervals = vec![
            LiveInterval { vreg: v0, class: VirtualRegisterClass::GeneralPurpose, start: 0, end: 2 },
            LiveInterval { vreg: v1, class: VirtualRegisterClass::GeneralPurpose, start: 2, end: 4 },
        ];
        let assignments = alloc.allocate(intervals).unwrap();
        assert_eq!(assignments[&v0], assignments[&v1]);
    }

    #[test]
    fn overlapping_intervals_get_distinct_registers() {
        let alloc = LinearScanAllocator::new(gprs(), vec![], vec![]);
        let v0 = VRegId::new(0);
        let v1 = VRegId::new(1);
        let intervals = vec![
            LiveInterval { vreg: v0, class: VirtualRegisterClass::GeneralPurpose, start: 0, end: 5 },
            LiveInterval { vreg: v1, class: VirtualRegisterClass::GeneralPurpose, start: 1, end: 3 },
        ];
        let assignments = alloc.allocate(intervals).unwrap();
        assert_ne!(assignments[&v0], assignments[&v1]);
    }

    #[test]
    fn pool_exhaustion_spills() {
        let alloc = LinearScanAllocator::new(vec![PhysicalRegister::Gpr(7)], vec![], vec![]);
        let v0 = VRegId::new(0);
        let v1 = VRegId::new(1);
        let intervals = vec![
            LiveInterval { vreg: v0, class: VirtualRegisterClass::GeneralPurpose, start: 0, end: 5 },
            LiveInterval { vreg: v1, class: VirtualRegisterClass::GeneralPurpose, start: 1, end: 3 },
        ];
        let assignments = alloc.allocate(intervals).unwrap();
        assert!(matches!(assignments[&v0], Assignment::Register(_)));
        assert!(matches!(assignments[&v1], Assignment::Spill(_)));
    }

    /// Scenario S6: a virtual register live across a call, assigned to a
    /// caller-saved GPR, is stashed around the call site.
    #[test]
    fn scenario_s6_call_crossing_caller_saved_register_is_stashed() {
        // Restrict the pool to exactly the caller-saved set so whatever the
        // allocator hands out is guaranteed to land in `compute_stashes`.
        let caller_saved: Vec<PhysicalRegister> = (0..10).map(PhysicalRegister::Gpr).collect();
        let alloc = LinearScanAllocator::new(caller_saved.clone(), vec![], caller_saved);
        let v0 = VRegId::new(0);
        let intervals = vec![LiveInterval {
            vreg: v0,
            class: VirtualRegisterClass::GeneralPurpose,
            start: 0,
            end: 10,
        }];
        let assignments = alloc.allocate(intervals.clone()).unwrap();
        let stashes = alloc.compute_stashes(&intervals, &assignments, 5);
        assert_eq!(stashes.len(), 1);
        assert_eq!(stashes[0].vreg, v0);
    }

    #[test]
    fn interval_not_spanning_the_call_site_is_not_stashed() {
        let caller_saved: Vec<PhysicalRegister> = (0..10).map(PhysicalRegister::Gpr).collect();
        let alloc = LinearScanAllocator::new(gprs(), vec![], caller_saved);
        let v0 = VRegId::new(0);
        let intervals = vec![LiveInterval {
            vreg: v0,
            class: VirtualRegisterClass::GeneralPurpose,
            start: 0,
            end: 3,
        }];
        let assignments = alloc.allocate(intervals.clone()).unwrap();
        let stashes = alloc.compute_stashes(&intervals, &assignments, 5);
        assert!(stashes.is_empty());
    }
}
