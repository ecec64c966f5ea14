//! Stack-frame layout: callee-saved spill slots, the local-variable area,
//! VLA slots, the outgoing-argument area, and the frame-pointer policy
//! (spec §4.5 "Stack frame layout").

use super::asmcmp::PhysicalRegister;

/// Whether a function must set up `rbp` as a frame pointer. `Auto` follows
/// the same heuristic GCC/Clang use: keep the frame pointer only when
/// something in the function needs to walk it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramePointerPolicy {
    Always,
    Never,
    Auto,
}

/// Accumulates a function's stack layout as the codegen pass visits its
/// instructions; `total_size` is only meaningful after all locals, spills
/// and call sites have been registered.
#[derive(Debug, Default)]
pub struct StackFrame {
    locals_size: u64,
    locals_align: u64,
    spill_size: u64,
    vla_present: bool,
    outgoing_args_size: u64,
    callee_saved: Vec<PhysicalRegister>,
    return_address_requested: bool,
}

impl StackFrame {
    pub fn new() -> Self {
        Self { locals_align: 1, ..Default::default() }
    }

    /// Reserve `size` bytes aligned to `align` in the local-variable area;
    /// returns the slot's offset from the frame base.
    pub fn add_local(&mut self, size: u64, align: u64) -> u64 {
        self.locals_align = self.locals_align.max(align.max(1));
        let offset = round_up(self.locals_size, align.max(1));
        self.locals_size = offset + size;
        offset
    }

    /// Reserve a spill slot for a register-allocator spill (§4.5's linear
    /// scan hands these out when a virtual register has no free physical
    /// register at its definition point).
    pub fn reserve_spill_slot(&mut self, size: u64) -> u64 {
        let offset = round_up(self.spill_size, size.max(1).min(8));
        self.spill_size = offset + size;
        offset
    }

    /// A VLA's size isn't known until runtime; its slot lives past the
    /// fixed frame and forces a frame pointer (§4.5, §9 open question
    /// "alloca/VLA placement").
    pub fn mark_vla_present(&mut self) {
        self.vla_present = true;
    }

    /// `__builtin_return_address`/`__builtin_frame_address` need `rbp`
    /// to chain through caller frames.
    pub fn request_frame_pointer_for_builtin(&mut self) {
        self.return_address_requested = true;
    }

    pub fn add_callee_saved(&mut self, reg: PhysicalRegister) {
        if !self.callee_saved.contains(&reg) {
            self.callee_saved.push(reg);
        }
    }

    /// Grow the outgoing-argument area to fit the largest call site seen
    /// so far (arguments spilled past the six GPR / eight SSE slots).
    pub fn reserve_outgoing_args(&mut self, size: u64) {
        self.outgoing_args_size = self.outgoing_args_size.max(size);
    }

    /// Whether this frame needs `rbp` set up, combining auto-detected
    /// triggers with an explicit policy override.
    pub fn requires_frame_pointer(&self, policy: FramePointerPolicy) -> bool {
        match policy {
            FramePointerPolicy::Always => true,
            FramePointerPolicy::Never => false,
            FramePointerPolicy::Auto => self.vla_present || self.return_address_requested,
        }
    }

    /// Total frame size, rounded to the System-V AMD64 16-byte stack
    /// alignment required at `call` sites.
    pub fn total_size(&self) -> u64 {
        let raw = self.locals_size + self.spill_size + self.outgoing_args_size
            + 8 * self.callee_saved.len() as u64;
        round_up(raw, 16)
    }

    pub fn locals_size(&self) -> u64 {
        self.locals_size
    }

    pub fn spill_size(&self) -> u64 {
        self.spill_size
    }
}

fn round_up(value: u64, align: u64) -> u64 {
    if align == 0 {
        value
    } else {
        (value + align - 1) / align * align
    }
}
