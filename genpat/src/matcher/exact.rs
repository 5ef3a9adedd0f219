//! Exact phase: bounded backtracking over the rough candidate lists.

use indextree::NodeId;

use crate::ast::SyntaxTree;
use crate::matcher::MatchInstance;
use crate::matcher::rough::{RoughEntry, RoughMapping};
use crate::tracing_macros::{debug, trace};

/// Pattern-to-candidate bindings of the current branch, indexed by node id.
#[derive(Debug, Default)]
struct Bindings {
    forward: Vec<Option<NodeId>>,
    inverse: Vec<Option<NodeId>>,
    /// Bound pairs with their scores, most recent last.
    stack: Vec<(NodeId, NodeId, f64)>,
}

impl Bindings {
    fn forward(&self, pattern: NodeId) -> Option<NodeId> {
        self.forward.get(usize::from(pattern)).copied().flatten()
    }

    fn inverse(&self, candidate: NodeId) -> Option<NodeId> {
        self.inverse.get(usize::from(candidate)).copied().flatten()
    }

    fn bind(&mut self, pattern: NodeId, candidate: NodeId, score: f64) {
        let (p, c) = (usize::from(pattern), usize::from(candidate));
        if p >= self.forward.len() {
            self.forward.resize(p + 1, None);
        }
        if c >= self.inverse.len() {
            self.inverse.resize(c + 1, None);
        }
        self.forward[p] = Some(candidate);
        self.inverse[c] = Some(pattern);
        self.stack.push((pattern, candidate, score));
    }

    /// Undo the most recent [`Bindings::bind`].
    fn unbind(&mut self) {
        if let Some((pattern, candidate, _)) = self.stack.pop() {
            self.forward[usize::from(pattern)] = None;
            self.inverse[usize::from(candidate)] = None;
        }
    }

    fn score(&self) -> f64 {
        self.stack.iter().map(|&(_, _, score)| score).sum()
    }
}

struct Search<'a> {
    pattern: &'a SyntaxTree,
    candidate: &'a SyntaxTree,
    /// Pattern pre-order, for emitting pairs.
    preorder: &'a [RoughEntry],
    /// Enumeration order.
    order: Vec<&'a RoughEntry>,
    bindings: Bindings,
    max_instances: usize,
    found: Vec<MatchInstance>,
}

impl<'a> Search<'a> {
    fn full(&self) -> bool {
        self.found.len() >= self.max_instances
    }

    /// A pair is rejected only when both parents are bound and not to each
    /// other. An unbound parent on either side lets the pair through.
    fn parent_edge_ok(&self, pattern: NodeId, candidate: NodeId) -> bool {
        let (Some(pattern_parent), Some(candidate_parent)) =
            (self.pattern.parent(pattern), self.candidate.parent(candidate))
        else {
            return true;
        };
        match (
            self.bindings.forward(pattern_parent),
            self.bindings.inverse(candidate_parent),
        ) {
            (Some(bound_candidate), Some(bound_pattern)) => {
                bound_candidate == candidate_parent && bound_pattern == pattern_parent
            }
            _ => true,
        }
    }

    fn step(&mut self, depth: usize) {
        if self.full() {
            return;
        }
        let Some(&entry) = self.order.get(depth) else {
            self.emit();
            return;
        };

        for &(candidate, score) in &entry.candidates {
            if self.full() {
                return;
            }
            if self.bindings.inverse(candidate).is_some() {
                continue;
            }
            if !self.parent_edge_ok(entry.node, candidate) {
                trace!(
                    pattern = usize::from(entry.node),
                    candidate = usize::from(candidate),
                    "parent edge rejected"
                );
                continue;
            }
            trace!(
                pattern = usize::from(entry.node),
                candidate = usize::from(candidate),
                score,
                "bind"
            );
            self.bindings.bind(entry.node, candidate, score);
            self.step(depth + 1);
            self.bindings.unbind();
        }
    }

    fn emit(&mut self) {
        let pairs = self
            .preorder
            .iter()
            .filter_map(|entry| {
                self.bindings
                    .forward(entry.node)
                    .map(|candidate| (entry.node, candidate))
            })
            .collect();
        self.found
            .push(MatchInstance::new(pairs, self.bindings.score(), true));
    }
}

/// Enumerate up to `max_instances` injective, parent-consistent mappings.
pub(crate) fn exact_match(
    pattern: &SyntaxTree,
    candidate: &SyntaxTree,
    rough: &RoughMapping,
    max_instances: usize,
) -> Vec<MatchInstance> {
    let entries = rough.entries();
    if entries.is_empty() {
        debug!("no considered pattern nodes");
        return Vec::new();
    }
    if let Some(empty) = entries.iter().find(|e| e.candidates.is_empty()) {
        debug!(pattern = usize::from(empty.node), "pattern node has no candidates");
        return Vec::new();
    }

    // Most constrained first; the sort is stable so ties keep pre-order
    let mut order: Vec<&RoughEntry> = entries.iter().collect();
    order.sort_by_key(|entry| entry.candidates.len());

    let mut search = Search {
        pattern,
        candidate,
        preorder: entries,
        order,
        bindings: Bindings::default(),
        max_instances,
        found: Vec::new(),
    };
    search.step(0);

    debug!(
        instances = search.found.len(),
        capped = search.full(),
        "exact match done"
    );
    search.found
}
