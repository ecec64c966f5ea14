//! AST-layer entities: `Node`, `ScopedIdentifier` and the flow-control tree
//! (spec §3 "AST layer entities").
//!
//! The original C implementation reference-counts `Node` and chains
//! `ScopedIdentifier` to its owning `Scope` by pointer. Ported to Rust, both
//! become arena-held values addressed by `(arena, id)` pairs (spec §9):
//! `NodeArena` owns every `Node`, `ScopedIdentifier` is owned by whichever
//! `Scope` first registers it, and cross-references elsewhere use the `Id`
//! newtypes in this module rather than back-pointers.

pub mod flow;

use crate::pool::{Symbol, TypeId};
use crate::error::SourceLocation;
use kefir_entity::entity_impl;
use smallvec::SmallVec;

pub use flow::{FlowControlPoint, FlowControlStructure, FlowControlTree, FlowControlKind};

/// A reference to a `Node` owned by a `NodeArena`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);
entity_impl!(NodeId, "node");

/// A reference to a `ScopedIdentifier` owned by whichever `Scope` first
/// defined it (spec §5 "shared-resource policy").
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopedIdentifierId(u32);
entity_impl!(ScopedIdentifierId, "sid");

/// The coarse category every `Node` belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    Expression,
    Statement,
    Declaration,
    Type,
    InlineAssembly,
}

/// A constant-expression value computed by the analyzer.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstExprValue {
    Integer(i128),
    UInteger(u128),
    Float(f64),
    /// A value materialized through the BigInt pool (`_BitInt(N)`, N > 64).
    BigInt(crate::pool::BigIntRef),
    /// A symbolic address (e.g. `&global_var + offset`), not foldable to a
    /// scalar but still usable in static initializers.
    Address { base: ScopedIdentifierId, offset: i64 },
}

/// A bitfield member's offset and width within its containing storage unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitfieldDescriptor {
    pub offset_bits: u32,
    pub width_bits: u32,
}

/// Properties an expression node accrues during analysis (spec §4.2).
#[derive(Debug, Clone, Default)]
pub struct ExprProperties {
    pub resolved_type: Option<TypeId>,
    pub lvalue: bool,
    pub constant: Option<ConstExprValue>,
    pub addressable: bool,
    pub atomic: bool,
    pub bitfield: Option<BitfieldDescriptor>,
    pub identifier: Option<ScopedIdentifierId>,
    pub string_literal: Option<Symbol>,
    pub scoped_id: Option<ScopedIdentifierId>,
    pub temp_id: Option<u32>,
    pub flow_control: Option<flow::FlowControlPointId>,
    pub alignment: Option<u32>,
    pub preserve_after_eval: bool,
}

/// Properties a statement node accrues during analysis.
#[derive(Debug, Clone, Default)]
pub struct StmtProperties {
    pub origin_point: Option<flow::FlowControlPointId>,
    pub target_point: Option<flow::FlowControlPointId>,
    pub flow_control_structure: Option<flow::FlowControlStructureId>,
    pub scoped_id: Option<ScopedIdentifierId>,
    pub return_type: Option<TypeId>,
    pub temp_id: Option<u32>,
}

/// Properties a declaration node accrues during analysis.
#[derive(Debug, Clone, Default)]
pub struct DeclProperties {
    pub storage: Option<StorageClass>,
    pub function_spec: Option<FunctionSpecifier>,
    pub identifier: Option<ScopedIdentifierId>,
    pub alignment: Option<u32>,
    pub static_assertion: bool,
    pub original_type: Option<TypeId>,
    pub scoped_id: Option<ScopedIdentifierId>,
    pub temp_id: Option<u32>,
}

/// The analyzer-populated `properties` bundle (spec §3), one variant per
/// node category that actually accrues properties.
#[derive(Debug, Clone)]
pub enum NodeProperties {
    Expression(ExprProperties),
    Statement(StmtProperties),
    Declaration(DeclProperties),
    /// Type and inline-assembly nodes carry no analyzer-populated bundle.
    None,
}

/// A polymorphic AST node. Reference-counted in the original C
/// implementation; here, owned by a `NodeArena` and addressed by `NodeId`
/// (spec §9).
#[derive(Debug, Clone)]
pub struct Node {
    pub category: NodeCategory,
    pub location: SourceLocation,
    pub children: SmallVec<[NodeId; 4]>,
    pub properties: NodeProperties,
}

impl Node {
    /// Create a freshly-unanalyzed node of `category` at `location`.
    pub fn new(category: NodeCategory, location: SourceLocation) -> Self {
        let properties = match category {
            NodeCategory::Expression => NodeProperties::Expression(ExprProperties::default()),
            NodeCategory::Statement => NodeProperties::Statement(StmtProperties::default()),
            NodeCategory::Declaration => NodeProperties::Declaration(DeclProperties::default()),
            NodeCategory::Type | NodeCategory::InlineAssembly => NodeProperties::None,
        };
        Node {
            category,
            location,
            children: SmallVec::new(),
            properties,
        }
    }

    /// Mutable access to this node's expression properties, if it has them.
    pub fn expr_props_mut(&mut self) -> Option<&mut ExprProperties> {
        match &mut self.properties {
            NodeProperties::Expression(p) => Some(p),
            _ => None,
        }
    }

    /// Mutable access to this node's statement properties, if it has them.
    pub fn stmt_props_mut(&mut self) -> Option<&mut StmtProperties> {
        match &mut self.properties {
            NodeProperties::Statement(p) => Some(p),
            _ => None,
        }
    }
}

/// The arena owning every `Node` in a translation unit. Freeing the root
/// cascades in the C implementation via refcounting; here, dropping the
/// arena drops every node at once (spec §3 "Lifecycles").
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// C storage-class specifiers, including the C23 `constexpr` addition (spec §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    None,
    Extern,
    Static,
    Auto,
    Register,
    Typedef,
    ConstExpr,
}

/// Function specifiers orthogonal to storage class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FunctionSpecifier {
    pub inline: bool,
    pub noreturn: bool,
}

/// Linkage of a `ScopedIdentifier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Linkage {
    External,
    Internal,
    None,
}

/// Symbol visibility (ELF visibility attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Default,
    Hidden,
    Protected,
    Internal,
}

/// Which namespace/kind a `ScopedIdentifier` occupies (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopedIdentifierKind {
    Object,
    Function,
    EnumConstant,
    TypeTag,
    TypeDefinition,
    Label,
}

/// Attribute set attached to an object/function identifier; merged across
/// redeclarations per the rules in spec §4.1.
#[derive(Debug, Clone, Default)]
pub struct IdentifierAttributes {
    pub deprecated: bool,
    pub weak: bool,
    pub visibility: Visibility,
    pub gnu_inline: bool,
    pub always_inline: bool,
    pub noinline: bool,
    pub constructor: bool,
    pub destructor: bool,
    /// Sticky once set: a later redeclaration may not change or clear it.
    pub alias: Option<Symbol>,
    /// Equal-or-one-side-null across redeclarations; disallowed alongside
    /// a function alias.
    pub asm_label: Option<Symbol>,
}

/// A fully-decorated name binding produced by the analyzer (spec §3, §4.1).
#[derive(Debug, Clone)]
pub struct ScopedIdentifier {
    pub kind: ScopedIdentifierKind,
    pub name: Symbol,
    pub type_id: TypeId,
    pub storage: StorageClass,
    pub linkage: Linkage,
    pub thread_local: bool,
    pub alignment: Option<u32>,
    pub initializer: Option<ConstExprValue>,
    pub attributes: IdentifierAttributes,
    pub definition_site: Option<SourceLocation>,
    pub constant_value: Option<ConstExprValue>,
    pub function_spec: Option<FunctionSpecifier>,
    /// Whether this binding has a completed definition (vs. just a
    /// declaration); used by the "defining over declaring" redeclaration rule.
    pub defined: bool,
}

impl ScopedIdentifier {
    /// Build a bare declaration (not yet defined) for `name` of `kind`.
    pub fn new_declaration(
        kind: ScopedIdentifierKind,
        name: Symbol,
        type_id: TypeId,
        storage: StorageClass,
        loc: SourceLocation,
    ) -> Self {
        ScopedIdentifier {
            kind,
            name,
            type_id,
            storage,
            linkage: Linkage::None,
            thread_local: false,
            alignment: None,
            initializer: None,
            attributes: IdentifierAttributes::default(),
            definition_site: None,
            constant_value: None,
            function_spec: None,
            defined: false,
        }
        .with_location(loc)
    }

    fn with_location(mut self, loc: SourceLocation) -> Self {
        // `definition_site` is only set once the identifier is *defined*;
        // a bare declaration just remembers where it was first seen via
        // the owning `Scope`'s own bookkeeping, not here.
        let _ = loc;
        self
    }
}
