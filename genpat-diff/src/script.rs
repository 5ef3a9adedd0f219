//! Chawathe edit script generation.
//!
//! Generates an edit script (UPDATE, INSERT, MOVE, DELETE) from a node matching.
//! Based on "Change Detection in Hierarchically Structured Information" (Chawathe et al., 1996).
//!
//! The script is produced in phase order:
//! 1. UPDATE: value changes on matched nodes
//! 2. INSERT: nodes that exist only in the destination tree
//! 3. MOVE: matched nodes with a new parent or out of order among their siblings
//! 4. DELETE: nodes that exist only in the source tree

use crate::tracing_macros::{debug, trace};
use core::fmt;

use crate::lcs::lcs_by;
use crate::matching::Matching;
use crate::tree::{DiffTree, TreeTypes};
use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;

/// An edit operation in the diff.
#[derive(Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum EditOp<T: TreeTypes> {
    /// Insert a single new node.
    Insert {
        /// The new node in tree B
        node_b: NodeId,
        /// Parent in tree B
        parent_b: NodeId,
        /// Position among the parent's children (0-indexed)
        position: usize,
        /// The node's kind
        kind: T::Kind,
    },

    /// Insert a whole new subtree rooted at `node_b`.
    TreeInsert {
        /// Root of the new subtree in tree B
        node_b: NodeId,
        /// Parent in tree B
        parent_b: NodeId,
        /// Position among the parent's children (0-indexed)
        position: usize,
        /// The subtree root's kind
        kind: T::Kind,
    },

    /// Delete a single node.
    Delete {
        /// The node in tree A being deleted
        node_a: NodeId,
    },

    /// Delete a whole subtree rooted at `node_a`.
    TreeDelete {
        /// Root of the deleted subtree in tree A
        node_a: NodeId,
    },

    /// Change the value of a matched node.
    Update {
        /// The node in tree A
        node_a: NodeId,
        /// The corresponding node in tree B
        node_b: NodeId,
        /// The new value
        value: T::Value,
    },

    /// Move a node to a new location.
    Move {
        /// The node in tree A
        node_a: NodeId,
        /// The corresponding node in tree B
        node_b: NodeId,
        /// New parent in tree B
        new_parent_b: NodeId,
        /// New position among siblings
        new_position: usize,
    },
}

impl<T: TreeTypes> EditOp<T> {
    /// Short name of the action.
    pub fn action(&self) -> &'static str {
        match self {
            EditOp::Insert { .. } => "insert",
            EditOp::TreeInsert { .. } => "tree-insert",
            EditOp::Delete { .. } => "delete",
            EditOp::TreeDelete { .. } => "tree-delete",
            EditOp::Update { .. } => "update",
            EditOp::Move { .. } => "move",
        }
    }
}

impl<T: TreeTypes> fmt::Display for EditOp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditOp::Insert {
                node_b,
                parent_b,
                position,
                kind,
            } => write!(
                f,
                "Insert(b:{} {} @{} under b:{})",
                usize::from(*node_b),
                kind,
                position,
                usize::from(*parent_b)
            ),
            EditOp::TreeInsert {
                node_b,
                parent_b,
                position,
                kind,
            } => write!(
                f,
                "TreeInsert(b:{} {} @{} under b:{})",
                usize::from(*node_b),
                kind,
                position,
                usize::from(*parent_b)
            ),
            EditOp::Delete { node_a } => write!(f, "Delete(a:{})", usize::from(*node_a)),
            EditOp::TreeDelete { node_a } => write!(f, "TreeDelete(a:{})", usize::from(*node_a)),
            EditOp::Update {
                node_a,
                node_b,
                value,
            } => write!(
                f,
                "Update(a:{} → b:{} value={})",
                usize::from(*node_a),
                usize::from(*node_b),
                value
            ),
            EditOp::Move {
                node_a,
                node_b,
                new_parent_b,
                new_position,
            } => write!(
                f,
                "Move(a:{} → b:{} @{} under b:{})",
                usize::from(*node_a),
                usize::from(*node_b),
                new_position,
                usize::from(*new_parent_b)
            ),
        }
    }
}

impl<T: TreeTypes> fmt::Debug for EditOp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Whether relocations are reported as moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptMode {
    /// Matched nodes that change place are reported as `Move`.
    #[default]
    WithMoves,
    /// Only insertions, deletions and updates. Nodes that would move are
    /// unmatched first, so a relocation shows up as a delete plus an insert.
    InsertDelete,
}

/// Wrapper for collecting edit operations with automatic tracing.
struct Ops<T: TreeTypes> {
    inner: Vec<EditOp<T>>,
}

impl<T: TreeTypes> Ops<T> {
    fn new() -> Self {
        Self { inner: Vec::new() }
    }

    fn push(&mut self, op: EditOp<T>) {
        debug!(%op, "emit");
        self.inner.push(op);
    }

    fn into_inner(self) -> Vec<EditOp<T>> {
        self.inner
    }
}

/// Matched nodes in A that must move: their parent is not the counterpart
/// of their new parent, or they fall outside the LCS alignment of their siblings.
fn misplaced_nodes<TA, TB>(tree_a: &TA, tree_b: &TB, matching: &Matching) -> HashSet<NodeId>
where
    TA: DiffTree,
    TB: DiffTree<Types = TA::Types>,
{
    let mut misplaced = HashSet::default();

    for (a_id, b_id) in matching.pairs() {
        let (Some(parent_a), Some(parent_b)) = (tree_a.parent(a_id), tree_b.parent(b_id)) else {
            continue;
        };
        if matching.get_b(parent_a) != Some(parent_b) {
            misplaced.insert(a_id);
        }
    }

    // Align the children of every matched pair of parents
    for (pa, pb) in matching.pairs() {
        let seq_a: Vec<NodeId> = tree_a
            .children(pa)
            .filter(|&c| matching.get_b(c).is_some_and(|b| tree_b.parent(b) == Some(pb)))
            .collect();
        let seq_b: Vec<NodeId> = tree_b
            .children(pb)
            .filter(|&c| matching.get_a(c).is_some_and(|a| tree_a.parent(a) == Some(pa)))
            .collect();
        if seq_a.is_empty() {
            continue;
        }

        let aligned = lcs_by(&seq_a, &seq_b, |&a, &b| matching.get_b(a) == Some(b));
        let mut in_lcs = vec![false; seq_a.len()];
        for (i, _) in aligned {
            in_lcs[i] = true;
        }
        for (a_id, keep) in seq_a.into_iter().zip(in_lcs) {
            if !keep {
                trace!(a = usize::from(a_id), "misaligned among siblings");
                misplaced.insert(a_id);
            }
        }
    }

    misplaced
}

/// Unmatch every pair that would produce a move, until none remain.
///
/// Roots are never unmatched.
pub fn prune_moves<TA, TB>(tree_a: &TA, tree_b: &TB, matching: &mut Matching)
where
    TA: DiffTree,
    TB: DiffTree<Types = TA::Types>,
{
    loop {
        let misplaced = misplaced_nodes(tree_a, tree_b, matching);
        if misplaced.is_empty() {
            break;
        }
        debug!(count = misplaced.len(), "prune_moves: unmatching");
        matching.retain(|a, _| !misplaced.contains(&a));
    }
}

/// Generate an edit script from a matching between two trees.
///
/// The edit script transforms tree A into tree B. Insert positions and move
/// positions are final positions among the destination parent's children.
pub fn generate_edit_script<TA, TB>(
    tree_a: &TA,
    tree_b: &TB,
    matching: &Matching,
) -> Vec<EditOp<TA::Types>>
where
    TA: DiffTree,
    TB: DiffTree<Types = TA::Types>,
{
    trace!(matched_pairs = matching.len(), "generate_edit_script start");
    let mut ops = Ops::new();

    // Phase 1: value changes for matched nodes, in B order
    for b_id in tree_b.iter() {
        let Some(a_id) = matching.get_a(b_id) else {
            continue;
        };
        let a_value = tree_a.value(a_id);
        let b_value = tree_b.value(b_id);
        if a_value == b_value {
            continue;
        }
        match b_value {
            Some(new_value) => ops.push(EditOp::Update {
                node_a: a_id,
                node_b: b_id,
                value: new_value.clone(),
            }),
            // An update cannot carry "no value"; trees that need it give such
            // nodes an empty value instead
            None => {
                trace!(
                    a = usize::from(a_id),
                    b = usize::from(b_id),
                    "value removed, no update emitted"
                );
            }
        }
    }

    // Phase 2: INSERT - nodes in B that are not matched, parents before children
    for b_id in tree_b.iter() {
        if matching.contains_b(b_id) {
            continue;
        }
        // An unmatched root cannot be inserted under anything
        if let Some(parent_b) = tree_b.parent(b_id) {
            ops.push(EditOp::Insert {
                node_b: b_id,
                parent_b,
                position: tree_b.position(b_id),
                kind: tree_b.kind(b_id).clone(),
            });
        }
    }

    // Phase 3: MOVE - matched nodes whose parent changed or that are out of order
    let misplaced = misplaced_nodes(tree_a, tree_b, matching);
    debug!(candidates = misplaced.len(), "move phase");
    for b_id in tree_b.iter() {
        let Some(a_id) = matching.get_a(b_id) else {
            continue;
        };
        if !misplaced.contains(&a_id) {
            continue;
        }
        let Some(parent_b) = tree_b.parent(b_id) else {
            continue;
        };
        ops.push(EditOp::Move {
            node_a: a_id,
            node_b: b_id,
            new_parent_b: parent_b,
            new_position: tree_b.position(b_id),
        });
    }

    // Phase 4: DELETE - nodes in A that are not matched, children before parents
    for a_id in tree_a.post_order() {
        if !matching.contains_a(a_id) {
            ops.push(EditOp::Delete { node_a: a_id });
        }
    }

    debug!(total_ops = ops.inner.len(), "generate_edit_script done");
    ops.into_inner()
}
