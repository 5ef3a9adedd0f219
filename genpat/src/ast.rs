//! Arena-based syntax tree.
//!
//! Nodes live in an [`indextree::Arena`] and refer to each other by [`NodeId`].
//! Every non-root node records the [`RoleDef`] it fills under its parent, and
//! scalar roles (identifiers, operators, literal text) are stored inline.

use indextree::{Arena, NodeId};
use smallvec::SmallVec;

use crate::error::TreeError;
use crate::schema::{NodeKind, RoleDef, SlotKind, role_of, roles_of};

/// One node of a [`SyntaxTree`].
#[derive(Debug, Clone)]
pub struct SyntaxNode {
    kind: NodeKind,
    role: Option<&'static RoleDef>,
    scalars: SmallVec<[(&'static RoleDef, String); 1]>,
    expr_type: Option<String>,
}

impl SyntaxNode {
    fn new(kind: NodeKind, role: Option<&'static RoleDef>) -> Self {
        Self {
            kind,
            role,
            scalars: SmallVec::new(),
            expr_type: None,
        }
    }

    /// Structural kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The slot this node fills under its parent; `None` for the root.
    pub fn role(&self) -> Option<&'static RoleDef> {
        self.role
    }

    /// Value of a scalar role.
    pub fn scalar(&self, name: &str) -> Option<&str> {
        self.scalars
            .iter()
            .find(|(role, _)| role.name == name)
            .map(|(_, value)| value.as_str())
    }

    /// All scalar values in role order.
    pub fn scalars(&self) -> impl Iterator<Item = (&'static RoleDef, &str)> + '_ {
        roles_of(self.kind)
            .filter_map(|role| self.scalar(role.name).map(|value| (role, value)))
    }

    /// Static type attached by the front end, if any.
    pub fn expr_type(&self) -> Option<&str> {
        self.expr_type.as_deref()
    }
}

/// A rooted syntax tree.
///
/// Nodes never change parent once attached; cloning a tree keeps every
/// [`NodeId`] valid in the clone.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    arena: Arena<SyntaxNode>,
    root: NodeId,
}

impl SyntaxTree {
    /// A tree holding only a root of `kind`.
    pub fn new(kind: NodeKind) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(SyntaxNode::new(kind, None));
        Self { arena, root }
    }

    /// Append a child of `kind` to `parent`'s `role`.
    pub fn attach(
        &mut self,
        parent: NodeId,
        role: &str,
        kind: NodeKind,
    ) -> Result<NodeId, TreeError> {
        let parent_kind = self.kind(parent);
        let def = role_of(parent_kind, role).ok_or_else(|| TreeError::UnknownRole {
            kind: parent_kind,
            role: role.to_string(),
        })?;

        match def.slot {
            SlotKind::Scalar => {
                return Err(TreeError::ScalarRole {
                    kind: parent_kind,
                    role: def.name,
                });
            }
            SlotKind::Single if self.children_in(parent, def.name).next().is_some() => {
                return Err(TreeError::SlotOccupied {
                    kind: parent_kind,
                    role: def.name,
                });
            }
            SlotKind::Single | SlotKind::List => {}
        }
        if !def.accepts.admits(kind) {
            return Err(TreeError::Inadmissible {
                kind: parent_kind,
                role: def.name,
                child: kind,
            });
        }

        let id = self.arena.new_node(SyntaxNode::new(kind, Some(def)));
        parent.append(id, &mut self.arena);
        Ok(id)
    }

    /// Set (or replace) a scalar role's value.
    pub fn set_scalar(
        &mut self,
        node: NodeId,
        role: &str,
        value: impl Into<String>,
    ) -> Result<(), TreeError> {
        let kind = self.kind(node);
        let def = role_of(kind, role).ok_or_else(|| TreeError::UnknownRole {
            kind,
            role: role.to_string(),
        })?;
        if def.slot != SlotKind::Scalar {
            return Err(TreeError::ChildRole {
                kind,
                role: def.name,
            });
        }

        let value = value.into();
        let scalars = &mut self.arena[node].get_mut().scalars;
        match scalars.iter_mut().find(|(r, _)| r.name == def.name) {
            Some(slot) => slot.1 = value,
            None => scalars.push((def, value)),
        }
        Ok(())
    }

    /// Attach a node of `kind` and fill its first scalar role with `value`.
    pub fn attach_leaf(
        &mut self,
        parent: NodeId,
        role: &str,
        kind: NodeKind,
        value: impl Into<String>,
    ) -> Result<NodeId, TreeError> {
        let id = self.attach(parent, role, kind)?;
        if let Some(scalar) = roles_of(kind).find(|r| r.slot == SlotKind::Scalar) {
            self.set_scalar(id, scalar.name, value)?;
        }
        Ok(id)
    }

    /// Attach a `SimpleName` with the given identifier.
    pub fn attach_name(
        &mut self,
        parent: NodeId,
        role: &str,
        identifier: &str,
    ) -> Result<NodeId, TreeError> {
        self.attach_leaf(parent, role, NodeKind::SimpleName, identifier)
    }

    /// Record the static type the front end inferred for an expression.
    pub fn set_expr_type(&mut self, node: NodeId, ty: impl Into<String>) {
        self.arena[node].get_mut().expr_type = Some(ty.into());
    }

    /// The root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.arena.count()
    }

    /// A tree always has its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Borrow a node.
    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        self.arena[id].get()
    }

    /// Structural kind of a node.
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind
    }

    /// Role a node fills under its parent.
    pub fn role(&self, id: NodeId) -> Option<&'static RoleDef> {
        self.node(id).role
    }

    /// Value of a scalar role.
    pub fn scalar(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id).scalar(name)
    }

    /// Static type of an expression, if known.
    pub fn expr_type(&self, id: NodeId) -> Option<&str> {
        self.node(id).expr_type()
    }

    /// Parent node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// All children, in insertion order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    /// Children filling `role`, in order.
    pub fn children_in<'a>(
        &'a self,
        id: NodeId,
        role: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        id.children(&self.arena)
            .filter(move |&child| self.role(child).is_some_and(|r| r.name == role))
    }

    /// Index of a node among the siblings that fill the same role.
    pub fn position_in_role(&self, id: NodeId) -> Option<usize> {
        let role = self.role(id)?;
        let parent = self.parent(id)?;
        self.children_in(parent, role.name).position(|c| c == id)
    }

    /// All nodes, pre-order.
    pub fn preorder(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root.descendants(&self.arena)
    }

    /// A node and its descendants, pre-order.
    pub fn subtree(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }

    /// Flattened token sequence of a subtree.
    ///
    /// A node contributes its keyword, then walks its roles in schema order:
    /// scalar roles emit their value, child roles recurse.
    pub fn tokens(&self, id: NodeId) -> Vec<String> {
        let mut out = Vec::new();
        self.push_tokens(id, &mut out);
        out
    }

    fn push_tokens(&self, id: NodeId, out: &mut Vec<String>) {
        let node = self.node(id);
        if let Some(keyword) = node.kind.keyword() {
            out.push(keyword.to_string());
        }
        for role in roles_of(node.kind) {
            if role.slot == SlotKind::Scalar {
                if let Some(value) = node.scalar(role.name) {
                    out.push(value.to_string());
                }
            } else {
                for child in self.children_in(id, role.name) {
                    self.push_tokens(child, out);
                }
            }
        }
    }

    /// The identifier a node is known by: a simple name's identifier, a
    /// qualified name's dotted text, or a call's or field access's member name.
    pub fn identifier(&self, id: NodeId) -> Option<String> {
        match self.kind(id) {
            NodeKind::SimpleName => self.scalar(id, "identifier").map(str::to_string),
            NodeKind::QualifiedName => Some(self.tokens(id).join(".")),
            NodeKind::MethodCall | NodeKind::FieldAccess => {
                self.scalar(id, "name").map(str::to_string)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `list.add(x);` inside a block
    fn call_statement() -> (SyntaxTree, NodeId) {
        let mut tree = SyntaxTree::new(NodeKind::Block);
        let stmt = tree
            .attach(tree.root(), "statements", NodeKind::ExpressionStatement)
            .unwrap();
        let call = tree.attach(stmt, "expression", NodeKind::MethodCall).unwrap();
        tree.set_scalar(call, "name", "add").unwrap();
        tree.attach_name(call, "target", "list").unwrap();
        tree.attach_name(call, "arguments", "x").unwrap();
        (tree, call)
    }

    #[test]
    fn tokens_follow_role_order() {
        let (tree, call) = call_statement();
        assert_eq!(tree.tokens(call), vec!["list", "add", "x"]);
        assert_eq!(tree.tokens(tree.root()), vec!["list", "add", "x"]);
    }

    #[test]
    fn keywords_lead_their_node() {
        let mut tree = SyntaxTree::new(NodeKind::ReturnStatement);
        tree.attach(tree.root(), "expression", NodeKind::NullLiteral)
            .unwrap();
        assert_eq!(tree.tokens(tree.root()), vec!["return", "null"]);
    }

    #[test]
    fn identifiers() {
        let (tree, call) = call_statement();
        assert_eq!(tree.identifier(call).as_deref(), Some("add"));
        assert_eq!(tree.identifier(tree.root()), None);

        let mut qualified = SyntaxTree::new(NodeKind::QualifiedName);
        let root = qualified.root();
        qualified.attach_name(root, "qualifier", "java").unwrap();
        qualified.attach_name(root, "name", "util").unwrap();
        assert_eq!(qualified.identifier(root).as_deref(), Some("java.util"));
    }

    #[test]
    fn schema_is_enforced() {
        let (mut tree, call) = call_statement();
        assert!(matches!(
            tree.attach(call, "target", NodeKind::SimpleName),
            Err(TreeError::SlotOccupied { .. })
        ));
        assert!(matches!(
            tree.attach(call, "name", NodeKind::SimpleName),
            Err(TreeError::ScalarRole { .. })
        ));
        assert!(matches!(
            tree.attach(call, "arguments", NodeKind::Block),
            Err(TreeError::Inadmissible { .. })
        ));
        assert!(matches!(
            tree.set_scalar(call, "target", "x"),
            Err(TreeError::ChildRole { .. })
        ));
        assert!(matches!(
            tree.attach(call, "nope", NodeKind::SimpleName),
            Err(TreeError::UnknownRole { .. })
        ));
    }

    #[test]
    fn positions_count_only_the_same_role() {
        let (mut tree, call) = call_statement();
        let second = tree.attach_name(call, "arguments", "y").unwrap();
        assert_eq!(tree.position_in_role(second), Some(1));
        assert_eq!(tree.position_in_role(tree.root()), None);
    }

    #[test]
    fn clone_keeps_ids() {
        let (tree, call) = call_statement();
        let copy = tree.clone();
        assert_eq!(copy.kind(call), NodeKind::MethodCall);
        assert_eq!(copy.preorder().collect::<Vec<_>>(), tree.preorder().collect::<Vec<_>>());
    }
}
