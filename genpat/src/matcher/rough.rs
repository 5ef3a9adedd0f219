//! Rough phase: per-node candidate lists from attribute similarity alone.

use indextree::NodeId;
use rapidhash::RapidHashMap as HashMap;

use crate::attr::{AttributeRegistry, AttributeTable, INCOMPATIBLE};
use crate::tracing_macros::{debug, trace};

/// Candidates of one pattern node, best first.
#[derive(Debug, Clone, PartialEq)]
pub struct RoughEntry {
    /// The pattern node.
    pub node: NodeId,
    /// Candidate nodes and their composite scores, descending. Ties keep
    /// candidate pre-order.
    pub candidates: Vec<(NodeId, f64)>,
}

/// Candidate lists for every considered pattern node, in pattern pre-order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoughMapping {
    entries: Vec<RoughEntry>,
    index: HashMap<NodeId, usize>,
}

impl RoughMapping {
    /// Score every pattern row for which `considered` holds against every
    /// candidate row.
    pub(crate) fn compute(
        registry: &AttributeRegistry,
        pattern: &AttributeTable,
        candidate: &AttributeTable,
        threshold: f64,
        considered: impl Fn(NodeId) -> bool,
    ) -> Self {
        let mut mapping = Self::default();
        for (node, pattern_row) in pattern.iter() {
            if !considered(node) {
                trace!(pattern = usize::from(node), "pattern node not considered");
                continue;
            }
            let mut candidates = Vec::new();
            for (cand, cand_row) in candidate.iter() {
                let score = registry.composite_similarity(pattern_row, cand_row);
                if score <= INCOMPATIBLE || score < threshold {
                    continue;
                }
                candidates.push((cand, score));
            }
            candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
            trace!(
                pattern = usize::from(node),
                candidates = candidates.len(),
                "rough candidates"
            );
            mapping.index.insert(node, mapping.entries.len());
            mapping.entries.push(RoughEntry { node, candidates });
        }
        debug!(
            pattern_nodes = mapping.entries.len(),
            pairs = mapping.candidate_count(),
            threshold,
            "rough match done"
        );
        mapping
    }

    /// Candidates of one pattern node; empty for unknown nodes.
    pub fn candidates(&self, node: NodeId) -> &[(NodeId, f64)] {
        self.index
            .get(&node)
            .map_or(&[][..], |&i| &self.entries[i].candidates)
    }

    /// Entries in pattern pre-order.
    pub fn entries(&self) -> &[RoughEntry] {
        &self.entries
    }

    /// Number of considered pattern nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no pattern node is considered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of candidate pairs.
    pub fn candidate_count(&self) -> usize {
        self.entries.iter().map(|e| e.candidates.len()).sum()
    }
}
