//! Finding a pattern's before tree inside another syntax tree.
//!
//! Matching runs in two phases. The rough phase scores every
//! (pattern node, candidate node) pair with the registry's composite
//! similarity and keeps the ones above a threshold. The exact phase then
//! searches those lists depth-first for injective mappings whose parent
//! edges agree, stopping after [`MatcherConfig::max_instances`] results.
//!
//! Reaching the cap means at least that many matches exist, not that the
//! list is exhaustive.

mod exact;
mod rough;

pub use rough::{RoughEntry, RoughMapping};

use indextree::NodeId;
use rapidhash::RapidHashMap as HashMap;

use crate::ast::SyntaxTree;
use crate::attr::{AttributeRegistry, AttributeTable};
use crate::pattern::Pattern;

/// Matcher settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherConfig {
    /// Rough candidates scoring below this are dropped.
    pub threshold: f64,
    /// The exact phase stops after this many instances.
    pub max_instances: usize,
    /// How many instances [`Matcher::first_match`] looks at.
    pub inspect_limit: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            max_instances: 100,
            inspect_limit: 5,
        }
    }
}

/// One injective mapping of every considered pattern node to a distinct
/// candidate node.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchInstance {
    pairs: Vec<(NodeId, NodeId)>,
    forward: HashMap<NodeId, NodeId>,
    inverse: HashMap<NodeId, NodeId>,
    score: f64,
    legal: bool,
}

impl MatchInstance {
    pub(crate) fn new(pairs: Vec<(NodeId, NodeId)>, score: f64, legal: bool) -> Self {
        let forward = pairs.iter().copied().collect();
        let inverse = pairs.iter().map(|&(p, c)| (c, p)).collect();
        Self {
            pairs,
            forward,
            inverse,
            score,
            legal,
        }
    }

    /// Candidate node bound to a pattern node.
    pub fn candidate_for(&self, pattern: NodeId) -> Option<NodeId> {
        self.forward.get(&pattern).copied()
    }

    /// Pattern node bound to a candidate node.
    pub fn pattern_for(&self, candidate: NodeId) -> Option<NodeId> {
        self.inverse.get(&candidate).copied()
    }

    /// (pattern, candidate) pairs in pattern pre-order.
    pub fn pairs(&self) -> &[(NodeId, NodeId)] {
        &self.pairs
    }

    /// Number of bound pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Sum of the rough scores of every bound pair.
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Always true for instances the search produced.
    pub fn is_legal(&self) -> bool {
        self.legal
    }
}

/// Matches patterns against candidate trees.
#[derive(Debug, Clone)]
pub struct Matcher<'r> {
    registry: &'r AttributeRegistry,
    config: MatcherConfig,
}

impl<'r> Matcher<'r> {
    /// A matcher over the registry the patterns were built with.
    pub fn new(registry: &'r AttributeRegistry, config: MatcherConfig) -> Self {
        Self { registry, config }
    }

    /// Settings this matcher runs with.
    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Score every considered pattern node against every node of `candidate`.
    pub fn rough_match(&self, pattern: &Pattern, candidate: &SyntaxTree) -> RoughMapping {
        let candidate_attrs = AttributeTable::compute(self.registry, candidate);
        RoughMapping::compute(
            self.registry,
            pattern.attributes(),
            &candidate_attrs,
            self.config.threshold,
            |node| pattern.is_node_considered(node),
        )
    }

    /// Enumerate match instances from a rough mapping.
    pub fn exact_match(
        &self,
        pattern: &Pattern,
        candidate: &SyntaxTree,
        rough: &RoughMapping,
    ) -> Vec<MatchInstance> {
        exact::exact_match(
            pattern.before(),
            candidate,
            rough,
            self.config.max_instances,
        )
    }

    /// Rough then exact.
    pub fn match_pattern(&self, pattern: &Pattern, candidate: &SyntaxTree) -> Vec<MatchInstance> {
        let rough = self.rough_match(pattern, candidate);
        self.exact_match(pattern, candidate, &rough)
    }

    /// The first legal instance among the first
    /// [`inspect_limit`](MatcherConfig::inspect_limit) found.
    pub fn first_match(&self, pattern: &Pattern, candidate: &SyntaxTree) -> Option<MatchInstance> {
        self.match_pattern(pattern, candidate)
            .into_iter()
            .take(self.config.inspect_limit)
            .find(MatchInstance::is_legal)
    }
}
