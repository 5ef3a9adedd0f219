//! Per-node attributes and the similarity metric built on them.
//!
//! An [`AttributeRegistry`] lists the attribute kinds; computing them over a
//! tree yields an [`AttributeTable`] with one [`NodeAttributes`] row per node.

mod registry;
mod value;

pub use genpat_diff::lcs::{lcs_len, lcs_pairs};
pub use registry::{
    Attribute, AttributeKind, AttributeRegistry, Constraint, Constructor, NodeAttributes,
    RegistryBuilder, build_expr_type, build_identifier, build_kind, build_role, build_tokens,
};
pub use value::{AttrValue, INCOMPATIBLE, Symbol, token_similarity};

use indextree::NodeId;
use rapidhash::RapidHashMap as HashMap;

use crate::ast::SyntaxTree;

/// Attributes of every node of a tree, in pre-order.
#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    nodes: Vec<NodeId>,
    rows: Vec<NodeAttributes>,
    index: HashMap<NodeId, usize>,
}

impl AttributeTable {
    /// Compute every registered attribute for every node of `tree`.
    pub fn compute(registry: &AttributeRegistry, tree: &SyntaxTree) -> Self {
        let mut table = Self::default();
        for node in tree.preorder() {
            table.push(node, registry.compute_attributes(tree, node));
        }
        table
    }

    pub(crate) fn push(&mut self, node: NodeId, row: NodeAttributes) {
        self.index.insert(node, self.nodes.len());
        self.nodes.push(node);
        self.rows.push(row);
    }

    /// Attributes of one node.
    pub fn get(&self, node: NodeId) -> Option<&NodeAttributes> {
        self.index.get(&node).map(|&i| &self.rows[i])
    }

    /// Mutable attributes of one node.
    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut NodeAttributes> {
        self.index.get(&node).map(|&i| &mut self.rows[i])
    }

    /// Whether `node` has a row.
    pub fn contains(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    /// Rows in pre-order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &NodeAttributes)> + '_ {
        self.nodes.iter().copied().zip(&self.rows)
    }

    /// Rows in pre-order, mutable.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeId, &mut NodeAttributes)> + '_ {
        self.nodes.iter().copied().zip(&mut self.rows)
    }

    /// Nodes in pre-order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::NodeKind;

    #[test]
    fn one_row_per_node_in_preorder() {
        let mut tree = SyntaxTree::new(NodeKind::Block);
        let stmt = tree
            .attach(tree.root(), "statements", NodeKind::ReturnStatement)
            .unwrap();
        let name = tree.attach_name(stmt, "expression", "x").unwrap();

        let registry = AttributeRegistry::default();
        let table = AttributeTable::compute(&registry, &tree);

        assert_eq!(table.len(), 3);
        assert_eq!(table.nodes(), &[tree.root(), stmt, name]);
        for (node, row) in table.iter() {
            assert_eq!(row.len(), registry.len());
            assert!(row.iter().all(|a| a.node == node && a.considered));
        }
        assert_eq!(
            table.get(name).map(|row| row[2].value.clone()),
            Some(AttrValue::Symbol(Symbol::Known("x".into())))
        );
    }
}
