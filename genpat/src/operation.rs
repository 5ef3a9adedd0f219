//! Typed edit operations between a before and an after syntax tree.
//!
//! Each [`DiffOperation`] wraps one action of the tree diff and points back
//! at the syntax nodes it touches. Node handles are tagged with the tree
//! they belong to through [`NodeRef`].

use core::fmt;

use genpat_diff::{DiffTree, EditOp};
use indextree::NodeId;
use serde::{Deserialize, Serialize};

use crate::ast::SyntaxTree;
use crate::diff::{DiffableTree, SyntaxTypes};
use crate::error::ModelError;
use crate::schema::RoleDef;

/// Which tree of a before/after pair a node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// The tree before the edit.
    Before,
    /// The tree after the edit.
    After,
}

/// A node handle together with the tree it indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    /// Which tree `node` indexes.
    pub side: Side,
    /// The node.
    pub node: NodeId,
}

impl NodeRef {
    /// A before-tree node.
    pub fn before(node: NodeId) -> Self {
        Self {
            side: Side::Before,
            node,
        }
    }

    /// An after-tree node.
    pub fn after(node: NodeId) -> Self {
        Self {
            side: Side::After,
            node,
        }
    }
}

/// The six operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// One node added.
    Insert,
    /// A whole subtree added.
    TreeInsert,
    /// A node re-parented or reordered.
    Move,
    /// One node removed.
    Delete,
    /// A whole subtree removed.
    TreeDelete,
    /// A node's value changed.
    Update,
}

impl OperationKind {
    /// Lowercase name, as used in messages.
    pub fn as_str(self) -> &'static str {
        match self {
            OperationKind::Insert => "insert",
            OperationKind::TreeInsert => "tree-insert",
            OperationKind::Move => "move",
            OperationKind::Delete => "delete",
            OperationKind::TreeDelete => "tree-delete",
            OperationKind::Update => "update",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node (or subtree) added to the after tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddOp {
    /// The new node, in the after tree.
    pub node: NodeId,
    /// Its parent, in the after tree.
    pub parent: NodeId,
    /// The slot it fills under `parent`.
    pub role: &'static RoleDef,
    /// Position among all of `parent`'s children, as reported by the diff.
    pub position: usize,
}

/// A node (or subtree) removed from the before tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOp {
    /// The removed node, in the before tree.
    pub node: NodeId,
    /// Its parent, in the before tree.
    pub parent: Option<NodeId>,
    /// The slot it filled.
    pub role: Option<&'static RoleDef>,
}

/// A node relocated to a new parent or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOp {
    /// The node, in the before tree.
    pub node: NodeId,
    /// Its counterpart, in the after tree.
    pub moved: NodeId,
    /// The new parent, in the after tree.
    pub parent: NodeId,
    /// The slot the counterpart fills under `parent`.
    pub role: &'static RoleDef,
    /// Position among all of `parent`'s children, as reported by the diff.
    pub position: usize,
}

/// A node whose value changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOp {
    /// The node, in the before tree.
    pub node: NodeId,
    /// Its counterpart, in the after tree.
    pub updated: NodeId,
    /// The new value.
    pub value: String,
}

/// One typed edit operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOperation {
    /// A single node inserted.
    Insert(AddOp),
    /// A subtree inserted as one unit.
    TreeInsert(AddOp),
    /// A node moved with its subtree.
    Move(MoveOp),
    /// A single node deleted.
    Delete(RemoveOp),
    /// A subtree deleted as one unit.
    TreeDelete(RemoveOp),
    /// A node's value changed.
    Update(UpdateOp),
}

/// Where an insert-like operation puts its node.
#[derive(Debug, Clone, Copy)]
pub struct InsertSite {
    /// The inserted or moved node, in the after tree.
    pub node: NodeId,
    /// Its parent, in the after tree.
    pub parent: NodeId,
    /// The list role it is inserted into.
    pub role: &'static RoleDef,
    /// Position reported by the diff.
    pub engine_position: usize,
}

/// Turns an [`InsertSite`] into an index.
pub trait IndexStrategy {
    /// Index under `site.role` at which `site.node` lands.
    fn insert_index(&self, after: &SyntaxTree, site: &InsertSite) -> Result<usize, ModelError>;
}

/// Trusts the position the diff reported. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnginePosition;

impl IndexStrategy for EnginePosition {
    fn insert_index(&self, _after: &SyntaxTree, site: &InsertSite) -> Result<usize, ModelError> {
        Ok(site.engine_position)
    }
}

/// Recomputes the index by scanning the role's list in the after tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListScan;

impl IndexStrategy for ListScan {
    fn insert_index(&self, after: &SyntaxTree, site: &InsertSite) -> Result<usize, ModelError> {
        after
            .children_in(site.parent, site.role.name)
            .position(|child| child == site.node)
            .ok_or(ModelError::Detached)
    }
}

impl DiffOperation {
    /// Wrap one diff action, recovering syntax nodes through each diff node's label.
    pub fn from_edit_op(
        op: &EditOp<SyntaxTypes>,
        diff_before: &DiffableTree,
        diff_after: &DiffableTree,
        before: &SyntaxTree,
        after: &SyntaxTree,
    ) -> Result<Self, ModelError> {
        let add = |node_b: NodeId, parent_b: NodeId, position: usize| -> Result<AddOp, ModelError> {
            let node = *diff_after.label(node_b);
            Ok(AddOp {
                node,
                parent: *diff_after.label(parent_b),
                role: after.role(node).ok_or(ModelError::Detached)?,
                position,
            })
        };
        let remove = |node_a: NodeId| {
            let node = *diff_before.label(node_a);
            RemoveOp {
                node,
                parent: before.parent(node),
                role: before.role(node),
            }
        };

        match op {
            EditOp::Insert {
                node_b,
                parent_b,
                position,
                ..
            } => Ok(DiffOperation::Insert(add(*node_b, *parent_b, *position)?)),
            EditOp::TreeInsert {
                node_b,
                parent_b,
                position,
                ..
            } => Ok(DiffOperation::TreeInsert(add(*node_b, *parent_b, *position)?)),
            EditOp::Delete { node_a } => Ok(DiffOperation::Delete(remove(*node_a))),
            EditOp::TreeDelete { node_a } => Ok(DiffOperation::TreeDelete(remove(*node_a))),
            EditOp::Update {
                node_a,
                node_b,
                value,
            } => Ok(DiffOperation::Update(UpdateOp {
                node: *diff_before.label(*node_a),
                updated: *diff_after.label(*node_b),
                value: value.clone(),
            })),
            EditOp::Move {
                node_a,
                node_b,
                new_parent_b,
                new_position,
            } => {
                let moved = *diff_after.label(*node_b);
                Ok(DiffOperation::Move(MoveOp {
                    node: *diff_before.label(*node_a),
                    moved,
                    parent: *diff_after.label(*new_parent_b),
                    role: after.role(moved).ok_or(ModelError::Detached)?,
                    position: *new_position,
                }))
            }
            other => Err(ModelError::UnsupportedAction(other.action().to_string())),
        }
    }

    /// The kind tag of this operation.
    pub fn kind(&self) -> OperationKind {
        match self {
            DiffOperation::Insert(_) => OperationKind::Insert,
            DiffOperation::TreeInsert(_) => OperationKind::TreeInsert,
            DiffOperation::Move(_) => OperationKind::Move,
            DiffOperation::Delete(_) => OperationKind::Delete,
            DiffOperation::TreeDelete(_) => OperationKind::TreeDelete,
            DiffOperation::Update(_) => OperationKind::Update,
        }
    }

    /// The nodes this operation acts on: before-side first, then after-side.
    pub fn affected_nodes(&self) -> Vec<NodeRef> {
        match self {
            DiffOperation::Insert(op) | DiffOperation::TreeInsert(op) => {
                vec![NodeRef::after(op.node)]
            }
            DiffOperation::Delete(op) | DiffOperation::TreeDelete(op) => {
                vec![NodeRef::before(op.node)]
            }
            DiffOperation::Move(op) => vec![NodeRef::before(op.node), NodeRef::after(op.moved)],
            DiffOperation::Update(op) => vec![NodeRef::before(op.node), NodeRef::after(op.updated)],
        }
    }

    /// The structural parent of the affected node: the destination parent for
    /// inserts and moves, the current parent otherwise.
    ///
    /// Updates need the before tree to find it.
    pub fn parent(&self, before: &SyntaxTree) -> Option<NodeRef> {
        match self {
            DiffOperation::Insert(op) | DiffOperation::TreeInsert(op) => {
                Some(NodeRef::after(op.parent))
            }
            DiffOperation::Move(op) => Some(NodeRef::after(op.parent)),
            DiffOperation::Delete(op) | DiffOperation::TreeDelete(op) => {
                op.parent.map(NodeRef::before)
            }
            DiffOperation::Update(op) => before.parent(op.node).map(NodeRef::before),
        }
    }

    /// The role of the affected node under [`DiffOperation::parent`].
    pub fn location(&self, before: &SyntaxTree) -> Option<&'static RoleDef> {
        match self {
            DiffOperation::Insert(op) | DiffOperation::TreeInsert(op) => Some(op.role),
            DiffOperation::Move(op) => Some(op.role),
            DiffOperation::Delete(op) | DiffOperation::TreeDelete(op) => op.role,
            DiffOperation::Update(op) => before.role(op.node),
        }
    }

    /// Position reported by the diff, for inserts and moves.
    pub fn engine_position(&self) -> Option<usize> {
        match self {
            DiffOperation::Insert(op) | DiffOperation::TreeInsert(op) => Some(op.position),
            DiffOperation::Move(op) => Some(op.position),
            _ => None,
        }
    }

    fn insert_site(&self) -> Option<InsertSite> {
        match self {
            DiffOperation::Insert(op) | DiffOperation::TreeInsert(op) => Some(InsertSite {
                node: op.node,
                parent: op.parent,
                role: op.role,
                engine_position: op.position,
            }),
            DiffOperation::Move(op) => Some(InsertSite {
                node: op.moved,
                parent: op.parent,
                role: op.role,
                engine_position: op.position,
            }),
            _ => None,
        }
    }

    /// Index at which an insert-like operation places its node in the
    /// destination list.
    ///
    /// Only defined for inserts and moves into list roles.
    pub fn compute_insert_index(
        &self,
        after: &SyntaxTree,
        strategy: &dyn IndexStrategy,
    ) -> Result<usize, ModelError> {
        let site = self
            .insert_site()
            .ok_or(ModelError::NotInsertLike(self.kind()))?;
        if !site.role.is_list() {
            return Err(ModelError::NotAListSlot(site.role.to_string()));
        }
        strategy.insert_index(after, &site)
    }
}

impl fmt::Display for DiffOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffOperation::Insert(op) | DiffOperation::TreeInsert(op) => write!(
                f,
                "{} after:{} into after:{} {} @{}",
                self.kind(),
                usize::from(op.node),
                usize::from(op.parent),
                op.role,
                op.position
            ),
            DiffOperation::Move(op) => write!(
                f,
                "move before:{} to after:{} {} @{}",
                usize::from(op.node),
                usize::from(op.parent),
                op.role,
                op.position
            ),
            DiffOperation::Delete(op) | DiffOperation::TreeDelete(op) => {
                write!(f, "{} before:{}", self.kind(), usize::from(op.node))
            }
            DiffOperation::Update(op) => write!(
                f,
                "update before:{} to {:?}",
                usize::from(op.node),
                op.value
            ),
        }
    }
}
