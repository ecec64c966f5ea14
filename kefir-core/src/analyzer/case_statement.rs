//! `case`/`default` analysis (spec §4.2), grounded on the original
//! `source/ast/analyzer/nodes/case_statement.c`.
//!
//! Steps, verbatim from spec §4.2:
//! 1. Locate the nearest enclosing `switch`; error if none.
//! 2. Require the case expression(s) to be integer constant expressions.
//! 3. If a range end is present, normalize `end < begin` by swapping,
//!    reject an empty range, register a fresh point + both expressions.
//! 4. Otherwise scan existing labels for a duplicate value and register one
//!    point + the expression.
//! 5. No expression at all means `default`; reject a second default.
//! 6. Analyze the sub-statement (a statement or inline-assembly node).

use super::require_integer_constant;
use crate::ast::flow::{FlowControlKind, FlowControlTree, SwitchData};
use crate::ast::{NodeArena, NodeCategory, NodeId};
use crate::error::{KefirError, KefirResult};

/// The three shapes a `case`/`default` clause can take.
pub enum CaseLabel {
    /// `case value:`
    Value(NodeId),
    /// `case begin ... end:` (GNU case ranges)
    Range(NodeId, NodeId),
    /// `default:`
    Default,
}

/// Analyze one `case`/`default` clause attached to `sub_statement`. Returns
/// the flow-control point the lowering stage should bind its label to.
pub fn analyze_case_statement(
    tree: &mut FlowControlTree,
    arena: &NodeArena,
    label: CaseLabel,
    sub_statement: NodeId,
) -> KefirResult<crate::ast::flow::FlowControlPointId> {
    log::debug!("analyzer: entering case/default clause for statement {sub_statement}");

    // Step 1.
    let switch_id = tree.nearest_switch(None).ok_or_else(|| {
        KefirError::analysis(
            arena.get(sub_statement).location,
            "case/default label outside of any switch statement",
        )
    })?;

    // Step 6 (checked up front: the label is only valid in front of a
    // statement or inline-assembly node).
    let sub_category = arena.get(sub_statement).category;
    if !matches!(
        sub_category,
        NodeCategory::Statement | NodeCategory::InlineAssembly
    ) {
        return Err(KefirError::analysis(
            arena.get(sub_statement).location,
            "case/default label must precede a statement",
        ));
    }

    let point = tree.new_point();
    let switch = tree.get_mut(switch_id);
    let data: &mut SwitchData = match &mut switch.kind {
        FlowControlKind::Switch(data) => data,
        _ => unreachable!("nearest_switch only returns Switch nodes"),
    };

    match label {
        CaseLabel::Value(expr) => {
            // Step 2 + step 4.
            let value = require_integer_constant(arena, expr)?;
            data.register_case(value, expr, point)?;
        }
        CaseLabel::Range(begin, end) => {
            // Step 2 + step 3.
            let begin_value = require_integer_constant(arena, begin)?;
            let end_value = require_integer_constant(arena, end)?;
            data.register_case_range(begin_value, begin, end_value, end, point)?;
        }
        CaseLabel::Default => {
            // Step 5.
            data.register_default(point)?;
        }
    }

    Ok(point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::fold_integer_literal;
    use crate::ast::{Node, NodeCategory};
    use crate::error::SourceLocation;
    use crate::pool::{TypeBundle, TypeShape};

    fn int_literal(arena: &mut NodeArena, bundle: &mut TypeBundle, v: i128) -> NodeId {
        let ty = bundle.intern(TypeShape::Int { width: 32, signed: true });
        let node = arena.push(Node::new(NodeCategory::Expression, SourceLocation::UNKNOWN));
        fold_integer_literal(arena, node, v, ty).unwrap();
        node
    }

    fn statement(arena: &mut NodeArena) -> NodeId {
        arena.push(Node::new(NodeCategory::Statement, SourceLocation::UNKNOWN))
    }

    #[test]
    fn rejects_case_outside_switch() {
        let mut arena = NodeArena::new();
        let mut bundle = TypeBundle::new();
        let mut tree = FlowControlTree::new();
        tree.push(FlowControlKind::Block);
        let v = int_literal(&mut arena, &mut bundle, 3);
        let stmt = statement(&mut arena);
        let err = analyze_case_statement(&mut tree, &arena, CaseLabel::Value(v), stmt);
        assert!(err.is_err());
    }

    /// Scenario S1 from spec §8: `case 3 ... 7:` inside a switch normalizes
    /// and registers correctly, with `default` also present.
    #[test]
    fn scenario_s1_case_range_and_default() {
        let mut arena = NodeArena::new();
        let mut bundle = TypeBundle::new();
        let mut tree = FlowControlTree::new();
        tree.push(FlowControlKind::Switch(SwitchData::default()));

        let begin = int_literal(&mut arena, &mut bundle, 3);
        let end = int_literal(&mut arena, &mut bundle, 7);
        let stmt1 = statement(&mut arena);
        analyze_case_statement(&mut tree, &arena, CaseLabel::Range(begin, end), stmt1).unwrap();

        let stmt2 = statement(&mut arena);
        analyze_case_statement(&mut tree, &arena, CaseLabel::Default, stmt2).unwrap();

        let switch_id = tree.nearest_switch(None).unwrap();
        if let FlowControlKind::Switch(data) = &tree.get(switch_id).kind {
            assert_eq!(data.case_begin_values.len(), 1);
            assert!(data.default_point.is_some());
        }
    }

    #[test]
    fn rejects_duplicate_default() {
        let mut arena = NodeArena::new();
        let mut tree = FlowControlTree::new();
        tree.push(FlowControlKind::Switch(SwitchData::default()));
        let stmt1 = statement(&mut arena);
        analyze_case_statement(&mut tree, &arena, CaseLabel::Default, stmt1).unwrap();
        let stmt2 = statement(&mut arena);
        assert!(analyze_case_statement(&mut tree, &arena, CaseLabel::Default, stmt2).is_err());
    }
}
