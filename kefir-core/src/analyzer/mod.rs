//! The AST analyzer (spec §4.2): a forward pass that decorates `Node`
//! `properties`, builds scope, verifies semantic rules and computes
//! constant-expression values. The analyzer never emits IR; it only
//! mutates `properties` fields and may intern new canonical types.

pub mod case_statement;

use crate::ast::{ConstExprValue, ExprProperties, Node, NodeArena, NodeCategory, NodeId};
use crate::error::{KefirError, KefirResult, SourceLocation};
use crate::pool::TypeId;

/// Require that a node is a constant expression and return its folded
/// value, used throughout the analyzer (case labels, array bounds,
/// `static_assert`, enum constants).
pub fn require_constant_expression(
    arena: &NodeArena,
    node: NodeId,
) -> KefirResult<ConstExprValue> {
    match &arena.get(node).properties {
        crate::ast::NodeProperties::Expression(ExprProperties {
            constant: Some(value),
            ..
        }) => Ok(value.clone()),
        _ => Err(KefirError::analysis(
            arena.get(node).location,
            "expected an integer constant expression",
        )),
    }
}

/// Require an already-folded constant expression to be an integer, for
/// contexts (case labels, array lengths) that reject floating constants.
pub fn require_integer_constant(arena: &NodeArena, node: NodeId) -> KefirResult<i128> {
    match require_constant_expression(arena, node)? {
        ConstExprValue::Integer(v) => Ok(v),
        ConstExprValue::UInteger(v) => Ok(v as i128),
        _ => Err(KefirError::analysis(
            arena.get(node).location,
            "expected an integer constant expression",
        )),
    }
}

/// Record the resolved type and lvalue-ness of an expression node; the
/// common tail of every per-kind expression analyzer (spec §4.2).
pub fn annotate_expression(
    arena: &mut NodeArena,
    node: NodeId,
    resolved_type: TypeId,
    lvalue: bool,
) -> KefirResult<()> {
    let props = arena
        .get_mut(node)
        .expr_props_mut()
        .ok_or_else(|| KefirError::InternalError("expected an expression node".into()))?;
    props.resolved_type = Some(resolved_type);
    props.lvalue = lvalue;
    Ok(())
}

/// Fold a constant integer literal node in place (the analyzer's leaf case:
/// every other constant-expression rule eventually bottoms out here or in a
/// BigInt materialization).
pub fn fold_integer_literal(
    arena: &mut NodeArena,
    node: NodeId,
    value: i128,
    ty: TypeId,
) -> KefirResult<()> {
    annotate_expression(arena, node, ty, false)?;
    if let Some(props) = arena.get_mut(node).expr_props_mut() {
        props.constant = Some(ConstExprValue::Integer(value));
    }
    Ok(())
}

/// Verify `static_assert(constant-expr, message)`: the expression must fold
/// to a constant and be non-zero, or the assertion is a diagnostic.
pub fn analyze_static_assert(
    arena: &NodeArena,
    expr: NodeId,
    message: &str,
) -> KefirResult<()> {
    match require_integer_constant(arena, expr)? {
        0 => Err(KefirError::analysis(
            arena.get(expr).location,
            format!("static assertion failed: {message}"),
        )),
        _ => Ok(()),
    }
}

fn _unused_node_category_exhaustive_check(c: NodeCategory) {
    match c {
        NodeCategory::Expression
        | NodeCategory::Statement
        | NodeCategory::Declaration
        | NodeCategory::Type
        | NodeCategory::InlineAssembly => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{TypeBundle, TypeShape};

    #[test]
    fn fold_integer_literal_sets_constant_and_type() {
        let mut arena = NodeArena::new();
        let int_ty = {
            let mut bundle = TypeBundle::new();
            bundle.intern(TypeShape::Int { width: 32, signed: true })
        };
        let node = arena.push(Node::new(NodeCategory::Expression, SourceLocation::UNKNOWN));
        fold_integer_literal(&mut arena, node, 42, int_ty).unwrap();
        assert_eq!(require_integer_constant(&arena, node).unwrap(), 42);
    }

    #[test]
    fn static_assert_rejects_zero() {
        let mut arena = NodeArena::new();
        let int_ty = {
            let mut bundle = TypeBundle::new();
            bundle.intern(TypeShape::Int { width: 32, signed: true })
        };
        let node = arena.push(Node::new(NodeCategory::Expression, SourceLocation::UNKNOWN));
        fold_integer_literal(&mut arena, node, 0, int_ty).unwrap();
        assert!(analyze_static_assert(&arena, node, "nope").is_err());
    }
}
