//! The flow-control tree: lexically-nested control structures that anchor
//! case labels, break/continue targets and goto labels (spec §3, glossary).

use super::NodeId;
use crate::error::{KefirError, KefirResult};
use kefir_entity::entity_impl;
use std::collections::HashMap;

/// A forward-reference handle to a jump target, resolved to an assembly
/// label by codegen (glossary: "Flow-control point").
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowControlPointId(u32);
entity_impl!(FlowControlPointId, "fcp");

/// A node in the flow-control tree (glossary: "Flow-control tree").
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlowControlStructureId(u32);
entity_impl!(FlowControlStructureId, "fcs");

/// An opaque jump target. Resolved to a concrete assembly label only once
/// codegen runs; every earlier stage treats it as a handle.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowControlPoint;

/// A monotonically increasing id distinguishing one `case`/`default` entry
/// from another within the same `switch` (spec §4.1).
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseId(u32);
entity_impl!(CaseId, "case");

/// Per-`switch` bookkeeping: three parallel maps keyed by `CaseId`, plus an
/// at-most-one default (spec §4.1).
#[derive(Debug, Default, Clone)]
pub struct SwitchData {
    next_case: u32,
    /// case-id -> label point
    pub case_points: HashMap<CaseId, FlowControlPointId>,
    /// case-id -> the `case` expression node (begin, for ranges)
    pub case_begin_exprs: HashMap<CaseId, NodeId>,
    /// case-id -> range-end expression node, if this case is a range
    pub case_end_exprs: HashMap<CaseId, NodeId>,
    /// case-id -> the folded constant value used for duplicate detection
    pub case_begin_values: HashMap<CaseId, i128>,
    pub case_end_values: HashMap<CaseId, i128>,
    pub default_point: Option<FlowControlPointId>,
}

impl SwitchData {
    fn fresh_case_id(&mut self) -> CaseId {
        let id = CaseId::new(self.next_case as usize);
        self.next_case += 1;
        id
    }

    /// Register a single-value case label. O(cases) duplicate scan, per
    /// spec §4.1 ("acceptable for typical switch sizes").
    pub fn register_case(
        &mut self,
        value: i128,
        expr: NodeId,
        point: FlowControlPointId,
    ) -> KefirResult<CaseId> {
        for (&id, &existing) in &self.case_begin_values {
            if self.case_end_values.get(&id).is_none() && existing == value {
                return Err(KefirError::analysis(
                    Default::default(),
                    format!("duplicate case label value {value}"),
                ));
            }
        }
        let id = self.fresh_case_id();
        self.case_begin_values.insert(id, value);
        self.case_begin_exprs.insert(id, expr);
        self.case_points.insert(id, point);
        Ok(id)
    }

    /// Register a `case begin ... end` range, normalizing `end < begin` by
    /// swapping and rejecting an empty (`begin == end`) range (spec §4.1,
    /// §4.2 step 3, testable property #5).
    pub fn register_case_range(
        &mut self,
        mut begin: i128,
        mut begin_expr: NodeId,
        mut end: i128,
        mut end_expr: NodeId,
        point: FlowControlPointId,
    ) -> KefirResult<CaseId> {
        if begin == end {
            return Err(KefirError::analysis(
                Default::default(),
                "empty case range: begin == end".to_string(),
            ));
        }
        if end < begin {
            std::mem::swap(&mut begin, &mut end);
            std::mem::swap(&mut begin_expr, &mut end_expr);
        }
        let id = self.fresh_case_id();
        self.case_begin_values.insert(id, begin);
        self.case_end_values.insert(id, end);
        self.case_begin_exprs.insert(id, begin_expr);
        self.case_end_exprs.insert(id, end_expr);
        self.case_points.insert(id, point);
        Ok(id)
    }

    /// Register `default`; at most one is allowed per switch (spec §4.1, §4.2 step 5).
    pub fn register_default(&mut self, point: FlowControlPointId) -> KefirResult<()> {
        if self.default_point.is_some() {
            return Err(KefirError::analysis(
                Default::default(),
                "switch already has a default label".to_string(),
            ));
        }
        self.default_point = Some(point);
        Ok(())
    }

    /// Dispatch a scrutinee value to the case (or default) it matches,
    /// the way a compiled `switch` would after all labels are registered.
    /// Ranges are normalized at registration time, so this is a direct
    /// containment check rather than a re-normalizing one.
    pub fn resolve(&self, value: i128) -> Option<FlowControlPointId> {
        for (&id, &begin) in &self.case_begin_values {
            let matches = match self.case_end_values.get(&id) {
                Some(&end) => value >= begin && value <= end,
                None => value == begin,
            };
            if matches {
                return self.case_points.get(&id).copied();
            }
        }
        self.default_point
    }
}

/// The kind of lexically-nested control structure a `FlowControlStructure`
/// represents.
#[derive(Debug, Clone)]
pub enum FlowControlKind {
    Block,
    If,
    Switch(SwitchData),
    Loop,
}

/// One node of the flow-control tree.
#[derive(Debug, Clone)]
pub struct FlowControlStructure {
    pub kind: FlowControlKind,
    pub parent: Option<FlowControlStructureId>,
}

/// The tree of lexically-nested control structures for one function body.
#[derive(Debug, Default)]
pub struct FlowControlTree {
    structures: Vec<FlowControlStructure>,
    points: Vec<FlowControlPoint>,
    current: Option<FlowControlStructureId>,
}

impl FlowControlTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new structure as a child of the current one, making it current.
    pub fn push(&mut self, kind: FlowControlKind) -> FlowControlStructureId {
        let parent = self.current;
        let id = FlowControlStructureId::new(self.structures.len());
        self.structures.push(FlowControlStructure { kind, parent });
        self.current = Some(id);
        id
    }

    /// Pop back to the parent of the current structure.
    pub fn pop(&mut self) {
        if let Some(cur) = self.current {
            self.current = self.structures[cur.index()].parent;
        }
    }

    /// Mint a fresh, unresolved jump target.
    pub fn new_point(&mut self) -> FlowControlPointId {
        let id = FlowControlPointId::new(self.points.len());
        self.points.push(FlowControlPoint);
        id
    }

    pub fn get(&self, id: FlowControlStructureId) -> &FlowControlStructure {
        &self.structures[id.index()]
    }

    pub fn get_mut(&mut self, id: FlowControlStructureId) -> &mut FlowControlStructure {
        &mut self.structures[id.index()]
    }

    /// Walk up from `start` (defaulting to the current structure) to find
    /// the nearest enclosing `switch` (spec §4.2 step 1).
    pub fn nearest_switch(
        &self,
        start: Option<FlowControlStructureId>,
    ) -> Option<FlowControlStructureId> {
        let mut cursor = start.or(self.current);
        while let Some(id) = cursor {
            if matches!(self.structures[id.index()].kind, FlowControlKind::Switch(_)) {
                return Some(id);
            }
            cursor = self.structures[id.index()].parent;
        }
        None
    }

    /// The structure currently open (innermost lexical scope).
    pub fn current(&self) -> Option<FlowControlStructureId> {
        self.current
    }
}
