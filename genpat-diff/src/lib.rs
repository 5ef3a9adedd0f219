//! # genpat-diff
//!
//! GumTree-style tree diffing with Chawathe edit script generation, over
//! trees whose nodes carry a label pointing back at the domain node they
//! were built from.
//!
//! ## Algorithm Overview
//!
//! - **GumTree** (Falleri et al., ASE 2014) for node matching
//! - **Chawathe algorithm** (1996) for edit script generation
//!
//! The algorithm works in phases:
//!
//! 1. **Top-down matching**: Match identical subtrees by hash (Merkle-tree style)
//! 2. **Bottom-up matching**: Match remaining nodes by structural similarity (Dice coefficient)
//! 3. **Edit script generation**: Produce UPDATE, INSERT, MOVE, DELETE operations
//! 4. **Simplification**: Fold whole-subtree inserts and deletes into TREE-INSERT / TREE-DELETE
//!
//! # Example
//!
//! ```
//! use genpat_diff::{EditOp, MatchingConfig, NodeData, ScriptMode, SimpleTypes, Tree, diff_trees};
//!
//! type Types = SimpleTypes<&'static str>;
//!
//! let mut before: Tree<Types> = Tree::new(NodeData::new("block", 0));
//! before.add_child(before.root, NodeData::with_value("call", 1, "foo".into()));
//! before.recompute_hashes();
//!
//! let mut after: Tree<Types> = Tree::new(NodeData::new("block", 0));
//! after.add_child(after.root, NodeData::with_value("call", 1, "bar".into()));
//! after.recompute_hashes();
//!
//! let ops = diff_trees(&before, &after, &MatchingConfig::default(), ScriptMode::WithMoves);
//! assert!(matches!(ops.as_slice(), [EditOp::Update { .. }]));
//! ```

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]

pub use indextree;

mod tracing_macros;

/// Longest common subsequence helpers
pub mod lcs;
/// GumTree matching algorithm
pub mod matching;
mod script;
mod simplify;
/// Tree representation
pub mod tree;

pub use matching::*;
pub use script::*;
pub use simplify::simplify_edit_script;
pub use tree::{DiffTree, NodeData, NodeHash, SimpleTypes, Tree, TreeTypes};

/// Compute a simplified edit script between two trees.
pub fn diff_trees<TA, TB>(
    tree_a: &TA,
    tree_b: &TB,
    config: &MatchingConfig,
    mode: ScriptMode,
) -> Vec<EditOp<TA::Types>>
where
    TA: DiffTree,
    TB: DiffTree<Types = TA::Types>,
{
    let (ops, _matching) = diff_trees_with_matching(tree_a, tree_b, config, mode);
    ops
}

/// Like [`diff_trees`], but also returns the node matching the script was
/// generated from.
///
/// In [`ScriptMode::InsertDelete`] the returned matching is the pruned one,
/// so it never relates a node to a counterpart in a different place.
pub fn diff_trees_with_matching<TA, TB>(
    tree_a: &TA,
    tree_b: &TB,
    config: &MatchingConfig,
    mode: ScriptMode,
) -> (Vec<EditOp<TA::Types>>, Matching)
where
    TA: DiffTree,
    TB: DiffTree<Types = TA::Types>,
{
    let mut matching = compute_matching(tree_a, tree_b, config);
    if mode == ScriptMode::InsertDelete {
        prune_moves(tree_a, tree_b, &mut matching);
    }
    let ops = generate_edit_script(tree_a, tree_b, &matching);
    let ops = simplify_edit_script(ops, tree_a, tree_b);
    (ops, matching)
}
