//! Durable JSON form of a [`Pattern`].
//!
//! Trees are flattened in pre-order; every other record refers to nodes by
//! their pre-order index. Roles are stored by name and resolved through the
//! schema on load, attributes by name and resolved through the registry.

use genpat_diff::{Matching, ScriptMode};
use indextree::NodeId;
use rapidhash::{RapidHashMap as HashMap, RapidHashSet as HashSet};
use serde::{Deserialize, Serialize};

use crate::ast::SyntaxTree;
use crate::attr::{AttrValue, Attribute, AttributeRegistry, AttributeTable};
use crate::error::{ModelError, PersistError};
use crate::operation::{AddOp, DiffOperation, MoveOp, OperationKind, RemoveOp, UpdateOp};
use crate::pattern::Pattern;
use crate::schema::NodeKind;
use crate::tracing_macros::debug;

/// A whole pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRecord {
    /// The before tree.
    pub before: TreeRecord,
    /// The after tree.
    pub after: TreeRecord,
    /// Operations in emission order.
    pub operations: Vec<OperationRecord>,
    /// (before index, after index) pairs.
    pub correspondence: Vec<(usize, usize)>,
    /// One row per before-tree node, in pre-order.
    pub attributes: Vec<Vec<AttributeRecord>>,
    /// Before-tree indices excluded from matching, ascending.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<usize>,
    /// Whether the operations were produced without moves.
    pub insert_delete: bool,
}

/// A tree flattened in pre-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeRecord {
    /// Nodes, root first.
    pub nodes: Vec<NodeRecord>,
}

/// One tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Structural kind.
    pub kind: NodeKind,
    /// Index of the parent; it must precede this node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    /// Name of the role under the parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// (role name, value) scalar pairs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scalars: Vec<(String, String)>,
    /// Resolved expression type, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr_type: Option<String>,
}

/// One operation. `node` indexes the before tree, except for inserts where
/// it indexes the after tree; `target` and `parent` always index the after
/// tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Which operation.
    pub kind: OperationKind,
    /// The node acted on.
    pub node: usize,
    /// Counterpart of `node` for moves and updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<usize>,
    /// Destination parent for inserts and moves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<usize>,
    /// Destination position for inserts and moves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    /// New value for updates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// One attribute of one before-tree node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeRecord {
    /// Registry name of the attribute kind.
    pub name: String,
    /// Whether matching looks at it.
    pub considered: bool,
    /// The computed value.
    pub value: AttrValue,
}

/// Pre-order positions of a tree's nodes.
struct Indexer {
    positions: HashMap<NodeId, usize>,
}

impl Indexer {
    fn new(tree: &SyntaxTree) -> Self {
        let positions = tree.preorder().enumerate().map(|(i, id)| (id, i)).collect();
        Self { positions }
    }

    fn index(&self, node: NodeId) -> Result<usize, PersistError> {
        self.positions
            .get(&node)
            .copied()
            .ok_or(PersistError::Model(ModelError::UnknownNode))
    }
}

fn tree_record(tree: &SyntaxTree, indexer: &Indexer) -> Result<TreeRecord, PersistError> {
    let nodes = tree
        .preorder()
        .map(|id| -> Result<NodeRecord, PersistError> {
            let node = tree.node(id);
            Ok(NodeRecord {
                kind: node.kind(),
                parent: tree.parent(id).map(|p| indexer.index(p)).transpose()?,
                role: node.role().map(|r| r.name.to_string()),
                scalars: node
                    .scalars()
                    .map(|(role, value)| (role.name.to_string(), value.to_string()))
                    .collect(),
                expr_type: node.expr_type().map(str::to_string),
            })
        })
        .collect::<Result<_, _>>()?;
    Ok(TreeRecord { nodes })
}

/// Rebuild a tree; returns it with its nodes in record order.
fn rebuild_tree(record: &TreeRecord) -> Result<(SyntaxTree, Vec<NodeId>), PersistError> {
    let (root, rest) = record.nodes.split_first().ok_or(PersistError::EmptyTree)?;
    if root.parent.is_some() {
        return Err(PersistError::DanglingIndex(0));
    }

    let mut tree = SyntaxTree::new(root.kind);
    let mut ids = vec![tree.root()];
    let tree_root = tree.root();
    fill_node(&mut tree, tree_root, root)?;

    for (offset, node) in rest.iter().enumerate() {
        let index = offset + 1;
        let parent = node
            .parent
            .filter(|&p| p < index)
            .ok_or(PersistError::DanglingIndex(index))?;
        let role = node.role.as_deref().unwrap_or_default();
        let id = tree.attach(ids[parent], role, node.kind)?;
        fill_node(&mut tree, id, node)?;
        ids.push(id);
    }
    Ok((tree, ids))
}

fn fill_node(tree: &mut SyntaxTree, id: NodeId, record: &NodeRecord) -> Result<(), PersistError> {
    for (role, value) in &record.scalars {
        tree.set_scalar(id, role, value.as_str())?;
    }
    if let Some(ty) = &record.expr_type {
        tree.set_expr_type(id, ty.as_str());
    }
    Ok(())
}

fn node_at(ids: &[NodeId], index: usize) -> Result<NodeId, PersistError> {
    ids.get(index).copied().ok_or(PersistError::DanglingIndex(index))
}

fn field(value: Option<usize>) -> Result<usize, PersistError> {
    value.ok_or(PersistError::Model(ModelError::Detached))
}

fn operation_record(
    op: &DiffOperation,
    before: &Indexer,
    after: &Indexer,
) -> Result<OperationRecord, PersistError> {
    let mut record = OperationRecord {
        kind: op.kind(),
        node: 0,
        target: None,
        parent: None,
        position: None,
        value: None,
    };
    match op {
        DiffOperation::Insert(add) | DiffOperation::TreeInsert(add) => {
            record.node = after.index(add.node)?;
            record.parent = Some(after.index(add.parent)?);
            record.position = Some(add.position);
        }
        DiffOperation::Delete(remove) | DiffOperation::TreeDelete(remove) => {
            record.node = before.index(remove.node)?;
        }
        DiffOperation::Move(mv) => {
            record.node = before.index(mv.node)?;
            record.target = Some(after.index(mv.moved)?);
            record.parent = Some(after.index(mv.parent)?);
            record.position = Some(mv.position);
        }
        DiffOperation::Update(update) => {
            record.node = before.index(update.node)?;
            record.target = Some(after.index(update.updated)?);
            record.value = Some(update.value.clone());
        }
    }
    Ok(record)
}

fn rebuild_operation(
    record: &OperationRecord,
    before: (&SyntaxTree, &[NodeId]),
    after: (&SyntaxTree, &[NodeId]),
) -> Result<DiffOperation, PersistError> {
    let (before_tree, before_ids) = before;
    let (after_tree, after_ids) = after;

    let add = || -> Result<AddOp, PersistError> {
        let node = node_at(after_ids, record.node)?;
        Ok(AddOp {
            node,
            parent: node_at(after_ids, field(record.parent)?)?,
            role: after_tree.role(node).ok_or(ModelError::Detached)?,
            position: field(record.position)?,
        })
    };
    let remove = || -> Result<RemoveOp, PersistError> {
        let node = node_at(before_ids, record.node)?;
        Ok(RemoveOp {
            node,
            parent: before_tree.parent(node),
            role: before_tree.role(node),
        })
    };

    Ok(match record.kind {
        OperationKind::Insert => DiffOperation::Insert(add()?),
        OperationKind::TreeInsert => DiffOperation::TreeInsert(add()?),
        OperationKind::Delete => DiffOperation::Delete(remove()?),
        OperationKind::TreeDelete => DiffOperation::TreeDelete(remove()?),
        OperationKind::Move => {
            let moved = node_at(after_ids, field(record.target)?)?;
            DiffOperation::Move(MoveOp {
                node: node_at(before_ids, record.node)?,
                moved,
                parent: node_at(after_ids, field(record.parent)?)?,
                role: after_tree.role(moved).ok_or(ModelError::Detached)?,
                position: field(record.position)?,
            })
        }
        OperationKind::Update => DiffOperation::Update(UpdateOp {
            node: node_at(before_ids, record.node)?,
            updated: node_at(after_ids, field(record.target)?)?,
            value: record.value.clone().unwrap_or_default(),
        }),
    })
}

impl Pattern {
    /// Flatten into records. `registry` names the attribute rows and must be
    /// the one the pattern was built with.
    pub fn to_record(&self, registry: &AttributeRegistry) -> Result<PatternRecord, PersistError> {
        let before = Indexer::new(self.before());
        let after = Indexer::new(self.after());

        let operations = self
            .operations()
            .iter()
            .map(|op| operation_record(op, &before, &after))
            .collect::<Result<_, _>>()?;
        let correspondence = self
            .correspondence()
            .pairs()
            .map(|(a, b)| -> Result<_, PersistError> { Ok((before.index(a)?, after.index(b)?)) })
            .collect::<Result<_, _>>()?;
        let ignored = self
            .before()
            .preorder()
            .enumerate()
            .filter(|&(_, node)| !self.is_node_considered(node))
            .map(|(index, _)| index)
            .collect();

        let mut attributes = Vec::with_capacity(self.attributes().len());
        for node in self.before().preorder() {
            let row = self
                .node_attributes(node)
                .ok_or(PersistError::Model(ModelError::UnknownNode))?;
            attributes.push(
                registry
                    .kinds()
                    .iter()
                    .zip(row)
                    .map(|(kind, attribute)| AttributeRecord {
                        name: kind.name.to_string(),
                        considered: attribute.considered,
                        value: attribute.value.clone(),
                    })
                    .collect(),
            );
        }
        Ok(PatternRecord {
            before: tree_record(self.before(), &before)?,
            after: tree_record(self.after(), &after)?,
            operations,
            correspondence,
            attributes,
            ignored,
            insert_delete: self.mode() == ScriptMode::InsertDelete,
        })
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self, registry: &AttributeRegistry) -> Result<String, PersistError> {
        Ok(serde_json::to_string(&self.to_record(registry)?)?)
    }

    /// Serialize to JSON bytes.
    pub fn to_bytes(&self, registry: &AttributeRegistry) -> Result<Vec<u8>, PersistError> {
        Ok(serde_json::to_vec(&self.to_record(registry)?)?)
    }

    /// Read a pattern back from JSON. Attribute kinds the record lacks are
    /// computed fresh; kinds the registry lacks are an error.
    pub fn from_json(bytes: &[u8], registry: &AttributeRegistry) -> Result<Self, PersistError> {
        let record: PatternRecord = serde_json::from_slice(bytes)?;
        Self::from_record(&record, registry)
    }

    /// Rebuild from records.
    pub fn from_record(
        record: &PatternRecord,
        registry: &AttributeRegistry,
    ) -> Result<Self, PersistError> {
        let (before, before_ids) = rebuild_tree(&record.before)?;
        let (after, after_ids) = rebuild_tree(&record.after)?;

        let before_side = (&before, before_ids.as_slice());
        let after_side = (&after, after_ids.as_slice());
        let operations = record
            .operations
            .iter()
            .map(|op| rebuild_operation(op, before_side, after_side))
            .collect::<Result<Vec<_>, _>>()?;

        let mut correspondence = Matching::new();
        for &(a, b) in &record.correspondence {
            correspondence.add(node_at(&before_ids, a)?, node_at(&after_ids, b)?);
        }

        let mut attributes = AttributeTable::default();
        for (index, &node) in before_ids.iter().enumerate() {
            let stored = record.attributes.get(index).map_or(&[][..], Vec::as_slice);
            if let Some(unknown) = stored.iter().find(|a| registry.get(&a.name).is_none()) {
                return Err(PersistError::UnknownAttribute(unknown.name.clone()));
            }
            let row = registry
                .kinds()
                .iter()
                .map(|kind| match stored.iter().find(|a| a.name == kind.name) {
                    Some(saved) => Attribute {
                        node,
                        considered: saved.considered,
                        value: saved.value.clone(),
                    },
                    None => Attribute {
                        node,
                        considered: true,
                        value: (kind.build)(&before, node),
                    },
                })
                .collect();
            attributes.push(node, row);
        }
        let ignored = record
            .ignored
            .iter()
            .map(|&index| node_at(&before_ids, index))
            .collect::<Result<HashSet<_>, _>>()?;

        let mode = if record.insert_delete {
            ScriptMode::InsertDelete
        } else {
            ScriptMode::WithMoves
        };
        debug!(
            nodes = before_ids.len(),
            operations = operations.len(),
            "pattern loaded"
        );
        Ok(Pattern::from_parts(
            before,
            after,
            operations,
            correspondence,
            attributes,
            ignored,
            mode,
        ))
    }
}
