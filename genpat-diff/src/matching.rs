//! GumTree node matching algorithm.
//!
//! Implements two-phase matching:
//! 1. Top-down: Match identical subtrees by hash
//! 2. Bottom-up: Match remaining nodes by position under a matched parent,
//!    then by Dice coefficient over matched descendants

use crate::tracing_macros::{debug, trace};

use crate::tree::{DiffTree, NodeHash, TreeTypes};
use indextree::NodeId;
use rapidhash::{RapidHashMap as HashMap, RapidHashSet as HashSet};

/// A bidirectional mapping between nodes in two trees.
/// Uses Vec for O(1) lookups indexed by NodeId.
#[derive(Debug, Clone, Default)]
pub struct Matching {
    /// Map from tree A node to tree B node (indexed by A's NodeId)
    a_to_b: Vec<Option<NodeId>>,
    /// Map from tree B node to tree A node (indexed by B's NodeId)
    b_to_a: Vec<Option<NodeId>>,
    /// All matched pairs, in insertion order
    pairs: Vec<(NodeId, NodeId)>,
}

impl Matching {
    /// Create a new empty matching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a match between two nodes.
    ///
    /// Both nodes must be unmatched; re-adding a matched node is ignored.
    #[inline]
    pub fn add(&mut self, a: NodeId, b: NodeId) {
        if self.contains_a(a) || self.contains_b(b) {
            return;
        }

        let a_idx = usize::from(a);
        let b_idx = usize::from(b);

        if a_idx >= self.a_to_b.len() {
            self.a_to_b.resize(a_idx + 1, None);
        }
        if b_idx >= self.b_to_a.len() {
            self.b_to_a.resize(b_idx + 1, None);
        }

        self.a_to_b[a_idx] = Some(b);
        self.b_to_a[b_idx] = Some(a);
        self.pairs.push((a, b));
    }

    /// Check if a node from tree A is matched.
    #[inline(always)]
    pub fn contains_a(&self, a: NodeId) -> bool {
        self.get_b(a).is_some()
    }

    /// Check if a node from tree B is matched.
    #[inline(always)]
    pub fn contains_b(&self, b: NodeId) -> bool {
        self.get_a(b).is_some()
    }

    /// Get the match for a node from tree A.
    #[inline(always)]
    pub fn get_b(&self, a: NodeId) -> Option<NodeId> {
        self.a_to_b.get(usize::from(a)).copied().flatten()
    }

    /// Get the match for a node from tree B.
    #[inline(always)]
    pub fn get_a(&self, b: NodeId) -> Option<NodeId> {
        self.b_to_a.get(usize::from(b)).copied().flatten()
    }

    /// Get all matched pairs, in the order they were added.
    pub fn pairs(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.pairs.iter().copied()
    }

    /// Keep only the pairs for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(NodeId, NodeId) -> bool) {
        let pairs = core::mem::take(&mut self.pairs);
        for (a, b) in pairs {
            if keep(a, b) {
                self.pairs.push((a, b));
            } else {
                self.a_to_b[usize::from(a)] = None;
                self.b_to_a[usize::from(b)] = None;
            }
        }
    }

    /// Get the number of matched pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Check if there are no matches.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Configuration for the matching algorithm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingConfig {
    /// Minimum Dice coefficient for bottom-up matching.
    /// Nodes with similarity below this threshold won't be matched.
    pub similarity_threshold: f64,

    /// Minimum height for a node to be considered in top-down matching.
    /// Smaller subtrees are left for bottom-up matching.
    pub min_height: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            min_height: 1,
        }
    }
}

/// Compute the matching between two trees using the GumTree algorithm.
///
/// Every loop walks the trees in pre-order, so the result is a pure function
/// of the two trees and the config.
pub fn compute_matching<TA, TB>(tree_a: &TA, tree_b: &TB, config: &MatchingConfig) -> Matching
where
    TA: DiffTree,
    TB: DiffTree<Types = TA::Types>,
{
    debug!(
        nodes_a = tree_a.node_count(),
        nodes_b = tree_b.node_count(),
        "compute_matching start"
    );
    let mut matching = Matching::new();

    // Phase 1: Top-down matching (identical subtrees by hash)
    top_down_phase(tree_a, tree_b, &mut matching, config);
    debug!(matched = matching.len(), "after top_down_phase");

    // Roots of the same kind always correspond
    let (root_a, root_b) = (tree_a.root(), tree_b.root());
    if !matching.contains_a(root_a) && tree_a.kind(root_a) == tree_b.kind(root_b) {
        trace!("root kind match");
        matching.add(root_a, root_b);
    }

    // Phase 2: Bottom-up matching (similar nodes by Dice coefficient)
    bottom_up_phase(tree_a, tree_b, &mut matching, config);
    debug!(matched = matching.len(), "after bottom_up_phase");

    matching
}

/// Phase 1: Top-down matching.
///
/// Greedily matches nodes with identical subtree hashes, starting from the roots
/// and working down. When two nodes have the same hash, their entire subtrees
/// are identical and can be matched recursively.
fn top_down_phase<TA, TB>(
    tree_a: &TA,
    tree_b: &TB,
    matching: &mut Matching,
    config: &MatchingConfig,
) where
    TA: DiffTree,
    TB: DiffTree<Types = TA::Types>,
{
    trace!("top_down_phase start");

    let mut queue: Vec<(NodeId, NodeId)> = vec![(tree_a.root(), tree_b.root())];
    let mut cursor = 0;

    while cursor < queue.len() {
        let (a_id, b_id) = queue[cursor];
        cursor += 1;

        if matching.contains_a(a_id) || matching.contains_b(b_id) {
            continue;
        }

        // Skip small subtrees (leave for bottom-up)
        if tree_a.height(a_id) < config.min_height {
            continue;
        }

        let a_kind = tree_a.kind(a_id);
        if tree_a.hash(a_id) == tree_b.hash(b_id) && a_kind == tree_b.kind(b_id) {
            trace!(
                a = usize::from(a_id),
                a_kind = %a_kind,
                b = usize::from(b_id),
                "top_down: hash match"
            );
            match_subtrees(tree_a, tree_b, a_id, b_id, matching);
            continue;
        }

        // Hashes differ - pair up children of the two nodes only, never
        // arbitrary nodes elsewhere in tree B
        for a_child in tree_a.children(a_id) {
            let a_child_hash = tree_a.hash(a_child);
            for b_child in tree_b.children(b_id) {
                if !matching.contains_b(b_child) && tree_b.hash(b_child) == a_child_hash {
                    queue.push((a_child, b_child));
                }
            }
        }
        // Same-kind children are explored after exact hash candidates
        for a_child in tree_a.children(a_id) {
            let a_child_kind = tree_a.kind(a_child);
            for b_child in tree_b.children(b_id) {
                if !matching.contains_b(b_child)
                    && tree_b.kind(b_child) == a_child_kind
                    && tree_b.hash(b_child) != tree_a.hash(a_child)
                {
                    queue.push((a_child, b_child));
                }
            }
        }
    }

    // Remaining isomorphic subtrees anywhere in the trees, when unique on both sides
    let min_height = config.min_height.max(2);
    let mut by_hash_a: HashMap<NodeHash, Vec<NodeId>> = HashMap::default();
    for a_id in tree_a.iter() {
        if !matching.contains_a(a_id) && tree_a.height(a_id) >= min_height {
            by_hash_a.entry(tree_a.hash(a_id)).or_default().push(a_id);
        }
    }
    let mut by_hash_b: HashMap<NodeHash, Vec<NodeId>> = HashMap::default();
    for b_id in tree_b.iter() {
        if !matching.contains_b(b_id) && tree_b.height(b_id) >= min_height {
            by_hash_b.entry(tree_b.hash(b_id)).or_default().push(b_id);
        }
    }
    for a_id in tree_a.iter() {
        if matching.contains_a(a_id) {
            continue;
        }
        let hash = tree_a.hash(a_id);
        if let (Some([a_only]), Some([b_id])) = (
            by_hash_a.get(&hash).map(Vec::as_slice),
            by_hash_b.get(&hash).map(Vec::as_slice),
        ) && *a_only == a_id
            && !matching.contains_b(*b_id)
            && tree_a.kind(a_id) == tree_b.kind(*b_id)
        {
            trace!(
                a = usize::from(a_id),
                b = usize::from(*b_id),
                "top_down: unique isomorphic subtree"
            );
            match_subtrees(tree_a, tree_b, a_id, *b_id, matching);
        }
    }
}

/// Match two subtrees recursively (when their hashes match).
fn match_subtrees<TA, TB>(
    tree_a: &TA,
    tree_b: &TB,
    a_id: NodeId,
    b_id: NodeId,
    matching: &mut Matching,
) where
    TA: DiffTree,
    TB: DiffTree<Types = TA::Types>,
{
    // A descendant may already be matched through an earlier candidate
    if matching.contains_a(a_id) || matching.contains_b(b_id) {
        return;
    }

    matching.add(a_id, b_id);

    let a_children: Vec<_> = tree_a.children(a_id).collect();
    let b_children: Vec<_> = tree_b.children(b_id).collect();

    for (a_child, b_child) in a_children.into_iter().zip(b_children) {
        match_subtrees(tree_a, tree_b, a_child, b_child, matching);
    }
}

/// Lazily computed proper-descendant sets for nodes in a tree.
struct LazyDescendantMap<'a, T: DiffTree> {
    tree: &'a T,
    cache: HashMap<NodeId, HashSet<NodeId>>,
}

impl<'a, T: DiffTree> LazyDescendantMap<'a, T> {
    fn new(tree: &'a T) -> Self {
        Self {
            tree,
            cache: HashMap::default(),
        }
    }

    fn get_or_compute(&mut self, node_id: NodeId) -> &HashSet<NodeId> {
        let tree = self.tree;
        self.cache
            .entry(node_id)
            .or_insert_with(|| tree.descendants(node_id).skip(1).collect())
    }
}

/// Check if B is a valid match for A based on ancestry constraints.
///
/// If A's parent is matched to some node P_b, then B must be a descendant of P_b,
/// and symmetrically for B's parent.
fn ancestry_compatible<TA, TB>(
    a_id: NodeId,
    b_id: NodeId,
    tree_a: &TA,
    tree_b: &TB,
    matching: &Matching,
) -> bool
where
    TA: DiffTree,
    TB: DiffTree<Types = TA::Types>,
{
    if let Some(a_parent) = tree_a.parent(a_id)
        && let Some(matched_b_parent) = matching.get_b(a_parent)
        && !tree_b.descendants(matched_b_parent).any(|desc| desc == b_id)
    {
        trace!(
            a = usize::from(a_id),
            b = usize::from(b_id),
            "ancestry check failed: B not descendant of matched parent"
        );
        return false;
    }

    if let Some(b_parent) = tree_b.parent(b_id)
        && let Some(matched_a_parent) = matching.get_a(b_parent)
        && !tree_a.descendants(matched_a_parent).any(|desc| desc == a_id)
    {
        trace!(
            a = usize::from(a_id),
            b = usize::from(b_id),
            "ancestry check failed: A not descendant of matched parent"
        );
        return false;
    }

    true
}

/// Phase 2: Bottom-up matching.
///
/// 1. First pass: internal nodes. Prefer position+kind when the parent is
///    matched, fall back to the best Dice coefficient.
/// 2. Second pass: leaves, once ancestry constraints are established.
fn bottom_up_phase<TA, TB>(
    tree_a: &TA,
    tree_b: &TB,
    matching: &mut Matching,
    config: &MatchingConfig,
) where
    TA: DiffTree,
    TB: DiffTree<Types = TA::Types>,
{
    let mut desc_a = LazyDescendantMap::new(tree_a);
    let mut desc_b = LazyDescendantMap::new(tree_b);

    // Unmatched B nodes by kind, each list in pre-order
    let mut b_by_kind: HashMap<<TA::Types as TreeTypes>::Kind, Vec<NodeId>> = HashMap::default();
    for b_id in tree_b.iter() {
        if !matching.contains_b(b_id) {
            b_by_kind
                .entry(tree_b.kind(b_id).clone())
                .or_default()
                .push(b_id);
        }
    }

    // PASS 1: internal nodes, parents before children
    for a_id in tree_a.iter() {
        if matching.contains_a(a_id) || tree_a.child_count(a_id) == 0 {
            continue;
        }

        let a_kind = tree_a.kind(a_id);
        let a_pos = tree_a.position(a_id);
        let matched_parent_b = tree_a.parent(a_id).and_then(|p| matching.get_b(p));

        if let Some(parent_b) = matched_parent_b {
            let positional = tree_b.children(parent_b).find(|&b_id| {
                !matching.contains_b(b_id)
                    && tree_b.kind(b_id) == a_kind
                    && tree_b.position(b_id) == a_pos
            });
            if let Some(b_id) = positional {
                trace!(
                    a = usize::from(a_id),
                    a_kind = %a_kind,
                    b = usize::from(b_id),
                    pos = a_pos,
                    "bottom_up pass1: position+kind match"
                );
                matching.add(a_id, b_id);
                continue;
            }
        }

        let mut best: Option<(NodeId, f64)> = None;
        for &b_id in b_by_kind.get(a_kind).map(Vec::as_slice).unwrap_or_default() {
            if matching.contains_b(b_id) || tree_b.child_count(b_id) == 0 {
                continue;
            }
            if !ancestry_compatible(a_id, b_id, tree_a, tree_b, matching) {
                continue;
            }

            let score = dice_coefficient(a_id, b_id, matching, &mut desc_a, &mut desc_b);
            trace!(
                a = usize::from(a_id),
                b = usize::from(b_id),
                score,
                "bottom_up pass1: dice score"
            );
            if score >= config.similarity_threshold && best.is_none_or(|(_, s)| score > s) {
                best = Some((b_id, score));
            }
        }

        if let Some((b_id, score)) = best {
            trace!(
                a = usize::from(a_id),
                a_kind = %a_kind,
                b = usize::from(b_id),
                score,
                "bottom_up pass1: dice match"
            );
            matching.add(a_id, b_id);
        }
    }

    // PASS 2: leaves
    for a_id in tree_a.iter() {
        if matching.contains_a(a_id) || tree_a.child_count(a_id) != 0 {
            continue;
        }

        let a_kind = tree_a.kind(a_id);
        let a_hash = tree_a.hash(a_id);
        let a_value = tree_a.value(a_id);
        let a_pos = tree_a.position(a_id);
        let matched_parent_b = tree_a.parent(a_id).and_then(|p| matching.get_b(p));

        let best = if let Some(parent_b) = matched_parent_b {
            let candidates: Vec<NodeId> = tree_b
                .children(parent_b)
                .filter(|&b_id| !matching.contains_b(b_id) && tree_b.kind(b_id) == a_kind)
                .collect();

            // Same position and hash, then same hash, then same position
            candidates
                .iter()
                .find(|&&b_id| tree_b.position(b_id) == a_pos && tree_b.hash(b_id) == a_hash)
                .or_else(|| candidates.iter().find(|&&b_id| tree_b.hash(b_id) == a_hash))
                .or_else(|| candidates.iter().find(|&&b_id| tree_b.position(b_id) == a_pos))
                .copied()
        } else {
            // Parent unmatched (deleted): search globally so the leaf can move
            let mut best = None;
            for &b_id in b_by_kind.get(a_kind).map(Vec::as_slice).unwrap_or_default() {
                if matching.contains_b(b_id) || tree_b.child_count(b_id) != 0 {
                    continue;
                }
                if !ancestry_compatible(a_id, b_id, tree_a, tree_b, matching) {
                    continue;
                }
                if tree_b.hash(b_id) == a_hash {
                    best = Some(b_id);
                    break;
                }
                if best.is_none() && a_value.is_some() && tree_b.value(b_id) == a_value {
                    best = Some(b_id);
                }
            }
            best
        };

        if let Some(b_id) = best {
            trace!(
                a = usize::from(a_id),
                a_kind = %a_kind,
                b = usize::from(b_id),
                "bottom_up pass2: leaf match"
            );
            matching.add(a_id, b_id);
        }
    }
}

/// Compute the Dice coefficient between two nodes based on matched descendants.
///
/// dice(A, B) = 2 × |matched_descendants| / (|descendants_A| + |descendants_B|)
fn dice_coefficient<TA, TB>(
    a_id: NodeId,
    b_id: NodeId,
    matching: &Matching,
    desc_a_map: &mut LazyDescendantMap<TA>,
    desc_b_map: &mut LazyDescendantMap<TB>,
) -> f64
where
    TA: DiffTree,
    TB: DiffTree<Types = TA::Types>,
{
    let desc_a = desc_a_map.get_or_compute(a_id);
    let desc_b = desc_b_map.get_or_compute(b_id);

    if desc_a.is_empty() && desc_b.is_empty() {
        return 1.0;
    }

    let common = desc_a
        .iter()
        .filter(|&&a| matching.get_b(a).is_some_and(|b| desc_b.contains(&b)))
        .count();

    2.0 * common as f64 / (desc_a.len() + desc_b.len()) as f64
}
