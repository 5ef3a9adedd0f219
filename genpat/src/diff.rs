//! Adapts [`SyntaxTree`]s to the tree diff and lifts its output into
//! [`DiffOperation`]s.

use genpat_diff::{
    DiffTree, Matching, MatchingConfig, NodeData, ScriptMode, Tree, TreeTypes,
    diff_trees_with_matching,
};
use indextree::NodeId;

use crate::ast::SyntaxTree;
use crate::error::ModelError;
use crate::operation::DiffOperation;
use crate::schema::{NodeKind, SlotKind, roles_of};
use crate::tracing_macros::debug;

/// Diff-tree types for syntax trees: nodes are labelled with the syntax
/// [`NodeId`] they mirror, and valued by their scalar roles.
///
/// Every node of a kind with scalar roles carries a value, empty when none
/// is set, so clearing a scalar still shows up as an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyntaxTypes;

impl TreeTypes for SyntaxTypes {
    type Kind = NodeKind;
    type Label = NodeId;
    type Value = String;
}

/// A syntax tree mirrored for diffing.
pub type DiffableTree = Tree<SyntaxTypes>;

/// Build the diff-side mirror of `tree`, with hashes computed.
pub fn diffable(tree: &SyntaxTree) -> DiffableTree {
    let root = tree.root();
    let mut out = Tree::new(node_data(tree, root));
    let mut stack = vec![(root, out.root)];
    while let Some((src, dst)) = stack.pop() {
        for child in tree.children(src) {
            let id = out.add_child(dst, node_data(tree, child));
            stack.push((child, id));
        }
    }
    out.recompute_hashes();
    out
}

fn node_data(tree: &SyntaxTree, id: NodeId) -> NodeData<SyntaxTypes> {
    let node = tree.node(id);
    if !roles_of(node.kind()).any(|role| role.slot == SlotKind::Scalar) {
        return NodeData::new(node.kind(), id);
    }
    let value = node
        .scalars()
        .map(|(_, value)| value)
        .collect::<Vec<_>>()
        .join(" ");
    NodeData::with_value(node.kind(), id, value)
}

/// Outcome of diffing two syntax trees.
#[derive(Debug, Clone)]
pub struct SyntaxDiff {
    /// Operations in the order the diff emitted them.
    pub operations: Vec<DiffOperation>,
    /// Node correspondence, before tree on the A side, after tree on the B side.
    pub correspondence: Matching,
}

/// Diff `before` against `after` once and type every action.
pub fn diff(
    before: &SyntaxTree,
    after: &SyntaxTree,
    config: &MatchingConfig,
    mode: ScriptMode,
) -> Result<SyntaxDiff, ModelError> {
    let diff_before = diffable(before);
    let diff_after = diffable(after);
    let (ops, matching) = diff_trees_with_matching(&diff_before, &diff_after, config, mode);

    let mut correspondence = Matching::new();
    for (a, b) in matching.pairs() {
        correspondence.add(*diff_before.label(a), *diff_after.label(b));
    }

    let operations = ops
        .iter()
        .map(|op| DiffOperation::from_edit_op(op, &diff_before, &diff_after, before, after))
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        operations = operations.len(),
        matched = correspondence.len(),
        "syntax diff done"
    );
    Ok(SyntaxDiff {
        operations,
        correspondence,
    })
}
