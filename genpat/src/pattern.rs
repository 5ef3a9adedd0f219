//! Edit patterns: a before/after pair, the operations between them and the
//! attributes of every before-tree node.

use genpat_diff::{Matching, MatchingConfig, ScriptMode};
use indextree::NodeId;
use rapidhash::RapidHashSet as HashSet;

use crate::ast::SyntaxTree;
use crate::attr::{Attribute, AttributeKind, AttributeRegistry, AttributeTable, NodeAttributes};
use crate::diff::{SyntaxDiff, diff};
use crate::error::{ConfigError, ModelError, Result};
use crate::operation::DiffOperation;
use crate::tracing_macros::debug;

/// How a [`Pattern`] diffs its trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatternConfig {
    /// Node matching settings for the before/after diff.
    pub matching: MatchingConfig,
    /// Whether the operations may contain moves.
    pub mode: ScriptMode,
}

/// A reusable edit pattern.
///
/// The attribute table is filled at construction, with rows in registry
/// order; match the pattern with a [`Matcher`](crate::matcher::Matcher)
/// built over the same registry.
///
/// Every before-tree node starts out considered. Excluded nodes get no
/// candidates and are never bound, so a match only has to place the
/// considered ones.
#[derive(Debug, Clone)]
pub struct Pattern {
    before: SyntaxTree,
    after: SyntaxTree,
    operations: Vec<DiffOperation>,
    correspondence: Matching,
    attributes: AttributeTable,
    /// Before-tree nodes excluded from matching.
    ignored: HashSet<NodeId>,
    mode: ScriptMode,
}

impl Pattern {
    /// Diff `before` against `after` and attribute every before-tree node.
    pub fn new(
        before: SyntaxTree,
        after: SyntaxTree,
        registry: &AttributeRegistry,
        config: &PatternConfig,
    ) -> Result<Self, ModelError> {
        let SyntaxDiff {
            operations,
            correspondence,
        } = diff(&before, &after, &config.matching, config.mode)?;
        let attributes = AttributeTable::compute(registry, &before);
        debug!(
            nodes = attributes.len(),
            operations = operations.len(),
            "pattern built"
        );
        Ok(Self {
            before,
            after,
            operations,
            correspondence,
            attributes,
            ignored: HashSet::default(),
            mode: config.mode,
        })
    }

    /// A pattern over a single tree: the after side is a copy of `tree`, so
    /// there are no operations.
    pub fn extract(
        tree: SyntaxTree,
        registry: &AttributeRegistry,
        config: &PatternConfig,
    ) -> Result<Self, ModelError> {
        let after = tree.clone();
        Self::new(tree, after, registry, config)
    }

    pub(crate) fn from_parts(
        before: SyntaxTree,
        after: SyntaxTree,
        operations: Vec<DiffOperation>,
        correspondence: Matching,
        attributes: AttributeTable,
        ignored: HashSet<NodeId>,
        mode: ScriptMode,
    ) -> Self {
        Self {
            before,
            after,
            operations,
            correspondence,
            attributes,
            ignored,
            mode,
        }
    }

    /// The tree the pattern is matched by.
    pub fn before(&self) -> &SyntaxTree {
        &self.before
    }

    /// The tree after the edit.
    pub fn after(&self) -> &SyntaxTree {
        &self.after
    }

    /// Operations in the order the diff emitted them.
    pub fn operations(&self) -> &[DiffOperation] {
        &self.operations
    }

    /// Before-to-after node correspondence.
    pub fn correspondence(&self) -> &Matching {
        &self.correspondence
    }

    /// Script mode the operations were produced with.
    pub fn mode(&self) -> ScriptMode {
        self.mode
    }

    /// Counterpart of a before-tree node in the after tree.
    pub fn before_to_after(&self, node: NodeId) -> Option<NodeId> {
        self.correspondence.get_b(node)
    }

    /// Counterpart of an after-tree node in the before tree.
    pub fn after_to_before(&self, node: NodeId) -> Option<NodeId> {
        self.correspondence.get_a(node)
    }

    /// Attributes of every before-tree node, in pre-order.
    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    /// Attributes of one before-tree node.
    pub fn node_attributes(&self, node: NodeId) -> Option<&NodeAttributes> {
        self.attributes.get(node)
    }

    /// Before-tree nodes the operations touch, first occurrence order.
    ///
    /// Deleted, updated and moved nodes count directly. Insert and move
    /// destinations count through their parent's before-tree counterpart.
    pub fn action_related_nodes(&self) -> Vec<NodeId> {
        let mut seen = HashSet::default();
        let mut out = Vec::new();
        let mut push = |node: NodeId| {
            if seen.insert(node) {
                out.push(node);
            }
        };

        for op in &self.operations {
            match op {
                DiffOperation::Delete(op) | DiffOperation::TreeDelete(op) => push(op.node),
                DiffOperation::Update(op) => push(op.node),
                DiffOperation::Move(op) => {
                    push(op.node);
                    if let Some(parent) = self.after_to_before(op.parent) {
                        push(parent);
                    }
                }
                DiffOperation::Insert(op) | DiffOperation::TreeInsert(op) => {
                    if let Some(parent) = self.after_to_before(op.parent) {
                        push(parent);
                    }
                }
            }
        }
        out
    }

    /// Include or exclude one attribute of one node from matching.
    pub fn set_considered(
        &mut self,
        registry: &AttributeRegistry,
        node: NodeId,
        name: &str,
        considered: bool,
    ) -> Result<()> {
        let index = registry
            .index_of(name)
            .ok_or_else(|| ConfigError::UnknownAttribute(name.to_string()))?;
        let row = self.attributes.get_mut(node).ok_or(ModelError::UnknownNode)?;
        let attribute = row
            .get_mut(index)
            .ok_or_else(|| ConfigError::UnknownAttribute(name.to_string()))?;
        attribute.considered = considered;
        Ok(())
    }

    /// Run an abstraction policy over every attribute. `keep` decides whether
    /// each attribute stays considered; attributes already excluded stay so.
    ///
    /// Returns how many attributes were newly excluded.
    pub fn abstract_with<F>(&mut self, registry: &AttributeRegistry, mut keep: F) -> usize
    where
        F: FnMut(&SyntaxTree, NodeId, &AttributeKind, &Attribute) -> bool,
    {
        let mut cleared = 0;
        for (node, row) in self.attributes.iter_mut() {
            for (kind, attribute) in registry.kinds().iter().zip(row.iter_mut()) {
                if attribute.considered && !keep(&self.before, node, kind, attribute) {
                    attribute.considered = false;
                    cleared += 1;
                }
            }
        }
        debug!(cleared, "abstraction pass");
        cleared
    }

    /// Whether a before-tree node takes part in matching.
    pub fn is_node_considered(&self, node: NodeId) -> bool {
        self.attributes.contains(node) && !self.ignored.contains(&node)
    }

    /// Include or exclude a whole before-tree node from matching.
    pub fn set_node_considered(
        &mut self,
        node: NodeId,
        considered: bool,
    ) -> Result<(), ModelError> {
        if !self.attributes.contains(node) {
            return Err(ModelError::UnknownNode);
        }
        if considered {
            self.ignored.remove(&node);
        } else {
            self.ignored.insert(node);
        }
        Ok(())
    }

    /// Considered before-tree nodes in pre-order.
    pub fn considered_nodes(&self) -> Vec<NodeId> {
        self.attributes
            .nodes()
            .iter()
            .copied()
            .filter(|node| !self.ignored.contains(node))
            .collect()
    }

    /// Run a node-level abstraction policy. `keep` decides whether each
    /// still-considered node stays so.
    ///
    /// Returns how many nodes were newly excluded.
    pub fn abstract_nodes_with<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&SyntaxTree, NodeId) -> bool,
    {
        let mut cleared = 0;
        for &node in self.attributes.nodes() {
            if !self.ignored.contains(&node) && !keep(&self.before, node) {
                self.ignored.insert(node);
                cleared += 1;
            }
        }
        debug!(cleared, "node abstraction pass");
        cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::Constraint;
    use crate::schema::NodeKind;

    /// `{ a(); b(); }`
    fn block(names: &[&str]) -> SyntaxTree {
        let mut tree = SyntaxTree::new(NodeKind::Block);
        let root = tree.root();
        for name in names {
            let stmt = tree
                .attach(root, "statements", NodeKind::ExpressionStatement)
                .unwrap();
            let call = tree.attach(stmt, "expression", NodeKind::MethodCall).unwrap();
            tree.set_scalar(call, "name", *name).unwrap();
        }
        tree
    }

    #[test]
    fn extract_has_no_operations_and_full_table() {
        let registry = AttributeRegistry::default();
        let tree = block(&["a", "b"]);
        let pattern = Pattern::extract(tree, &registry, &PatternConfig::default()).unwrap();

        assert!(pattern.operations().is_empty());
        assert!(pattern.action_related_nodes().is_empty());
        assert_eq!(pattern.attributes().len(), pattern.before().len());
        for node in pattern.before().preorder() {
            assert_eq!(pattern.before_to_after(node), Some(node));
            assert!(pattern.node_attributes(node).is_some());
        }
    }

    #[test]
    fn inserted_statement_relates_to_its_block() {
        let registry = AttributeRegistry::default();
        let before = block(&["a"]);
        let after = block(&["a", "b"]);
        let pattern = Pattern::new(before, after, &registry, &PatternConfig::default()).unwrap();

        assert_eq!(pattern.operations().len(), 1);
        assert_eq!(pattern.action_related_nodes(), vec![pattern.before().root()]);
    }

    #[test]
    fn deleted_statement_relates_to_itself() {
        let registry = AttributeRegistry::default();
        let before = block(&["a", "b"]);
        let after = block(&["a"]);
        let pattern = Pattern::new(before, after, &registry, &PatternConfig::default()).unwrap();

        let second = pattern.before().children(pattern.before().root()).nth(1).unwrap();
        assert_eq!(pattern.action_related_nodes(), vec![second]);
    }

    #[test]
    fn considered_flags() {
        let registry = AttributeRegistry::default();
        let mut pattern =
            Pattern::extract(block(&["a"]), &registry, &PatternConfig::default()).unwrap();
        let root = pattern.before().root();

        pattern.set_considered(&registry, root, "tokens", false).unwrap();
        assert!(!pattern.node_attributes(root).unwrap()[4].considered);

        assert!(matches!(
            pattern.set_considered(&registry, root, "nope", false),
            Err(crate::Error::Config(ConfigError::UnknownAttribute(_)))
        ));

        // A node id past the end of the pattern's arena
        let bigger = block(&["a", "b", "c"]);
        let stray = bigger.preorder().last().unwrap();
        assert!(matches!(
            pattern.set_considered(&registry, stray, "kind", false),
            Err(crate::Error::Model(ModelError::UnknownNode))
        ));

        let cleared = pattern.abstract_with(&registry, |_, _, kind, _| {
            kind.constraint == Constraint::Hard
        });
        // `tokens` on the root was already excluded
        assert_eq!(cleared, pattern.before().len() - 1);
    }

    #[test]
    fn node_considered_flags() {
        let registry = AttributeRegistry::default();
        let mut pattern =
            Pattern::extract(block(&["a", "b"]), &registry, &PatternConfig::default()).unwrap();
        let all: Vec<_> = pattern.before().preorder().collect();
        assert_eq!(pattern.considered_nodes(), all);

        let second = pattern.before().children(pattern.before().root()).nth(1).unwrap();
        let dropped: Vec<_> = pattern.before().subtree(second).collect();
        for &node in &dropped {
            pattern.set_node_considered(node, false).unwrap();
        }
        assert!(!pattern.is_node_considered(second));
        assert_eq!(pattern.considered_nodes(), all[..3].to_vec());

        pattern.set_node_considered(second, true).unwrap();
        assert!(pattern.is_node_considered(second));
        assert_eq!(pattern.considered_nodes().len(), 4);

        let stray = block(&["a", "b", "c"]).preorder().last().unwrap();
        assert_eq!(
            pattern.set_node_considered(stray, false),
            Err(ModelError::UnknownNode)
        );
        assert!(!pattern.is_node_considered(stray));

        // Only the two call nodes are left to clear
        let cleared =
            pattern.abstract_nodes_with(|tree, node| tree.kind(node) != NodeKind::MethodCall);
        assert_eq!(cleared, 1);
        assert_eq!(pattern.considered_nodes().len(), 3);
    }
}
