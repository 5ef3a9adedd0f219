//! Edit script simplification.
//!
//! Folds whole-subtree operations:
//! - When every node of a subtree is inserted, report one `TreeInsert` at its root
//! - When every node of a subtree is deleted, report one `TreeDelete` at its root
//!
//! Single-node insertions and deletions stay `Insert` / `Delete`.

use crate::script::EditOp;
use crate::tracing_macros::{debug, trace};
use crate::tree::DiffTree;
use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;

/// Simplify an edit script by consolidating subtree insertions and deletions.
///
/// The relative order of the surviving operations is preserved; a folded
/// subtree is reported where its root's operation was.
pub fn simplify_edit_script<TA, TB>(
    ops: Vec<EditOp<TA::Types>>,
    tree_a: &TA,
    tree_b: &TB,
) -> Vec<EditOp<TA::Types>>
where
    TA: DiffTree,
    TB: DiffTree<Types = TA::Types>,
{
    debug!(ops_count = ops.len(), "simplify_edit_script start");

    let mut inserted: HashSet<NodeId> = HashSet::default();
    let mut deleted: HashSet<NodeId> = HashSet::default();
    for op in &ops {
        match op {
            EditOp::Insert { node_b, .. } => {
                inserted.insert(*node_b);
            }
            EditOp::Delete { node_a } => {
                deleted.insert(*node_a);
            }
            _ => {}
        }
    }

    // Roots of fully inserted subtrees with at least one child
    let mut tree_inserts: HashSet<NodeId> = HashSet::default();
    let mut covered_b: HashSet<NodeId> = HashSet::default();
    for &node in &inserted {
        let parent_inserted = tree_b.parent(node).is_some_and(|p| inserted.contains(&p));
        if parent_inserted || tree_b.child_count(node) == 0 {
            continue;
        }
        if tree_b.descendants(node).all(|d| inserted.contains(&d)) {
            tree_inserts.insert(node);
            covered_b.extend(tree_b.descendants(node).skip(1));
        }
    }

    let mut tree_deletes: HashSet<NodeId> = HashSet::default();
    let mut covered_a: HashSet<NodeId> = HashSet::default();
    for &node in &deleted {
        let parent_deleted = tree_a.parent(node).is_some_and(|p| deleted.contains(&p));
        if parent_deleted || tree_a.child_count(node) == 0 {
            continue;
        }
        if tree_a.descendants(node).all(|d| deleted.contains(&d)) {
            tree_deletes.insert(node);
            covered_a.extend(tree_a.descendants(node).skip(1));
        }
    }

    debug!(
        tree_inserts = tree_inserts.len(),
        tree_deletes = tree_deletes.len(),
        "found subtree operations"
    );

    let result: Vec<_> = ops
        .into_iter()
        .filter_map(|op| match op {
            EditOp::Insert { node_b, .. } if covered_b.contains(&node_b) => {
                trace!(b = usize::from(node_b), "simplify: folded into subtree insert");
                None
            }
            EditOp::Insert {
                node_b,
                parent_b,
                position,
                kind,
            } if tree_inserts.contains(&node_b) => Some(EditOp::TreeInsert {
                node_b,
                parent_b,
                position,
                kind,
            }),
            EditOp::Delete { node_a } if covered_a.contains(&node_a) => {
                trace!(a = usize::from(node_a), "simplify: folded into subtree delete");
                None
            }
            EditOp::Delete { node_a } if tree_deletes.contains(&node_a) => {
                Some(EditOp::TreeDelete { node_a })
            }
            other => Some(other),
        })
        .collect();

    debug!(after = result.len(), "simplify_edit_script done");
    result
}
