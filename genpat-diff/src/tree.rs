//! Arena-backed tree representation used as diff input.

use core::fmt;
use core::hash::{Hash, Hasher};

use indextree::{Arena, NodeEdge, NodeId};
use rapidhash::fast::RapidHasher;

/// The types a diff tree is parameterized over.
pub trait TreeTypes {
    /// Structural kind. Only nodes of equal kind are ever matched.
    type Kind: Clone + Eq + Hash + fmt::Display + fmt::Debug;
    /// Back-reference to the domain node a diff node was built from.
    type Label: Clone + fmt::Debug;
    /// Leaf payload compared to detect updates (identifier, literal text, operator).
    type Value: Clone + Eq + Hash + fmt::Display + fmt::Debug;
}

/// Merkle-style hash of a subtree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeHash(pub u64);

impl fmt::Display for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl fmt::Debug for NodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeHash({self})")
    }
}

/// Data stored on each diff node.
#[derive(Debug, Clone)]
pub struct NodeData<T: TreeTypes> {
    /// Subtree hash, valid after [`Tree::recompute_hashes`].
    pub hash: NodeHash,
    /// Structural kind.
    pub kind: T::Kind,
    /// Back-reference to the originating domain node.
    pub label: T::Label,
    /// Optional value compared on matched pairs.
    pub value: Option<T::Value>,
    /// Subtree height (leaves are 1), valid after [`Tree::recompute_hashes`].
    pub height: usize,
}

impl<T: TreeTypes> NodeData<T> {
    /// Node without a value.
    pub fn new(kind: T::Kind, label: T::Label) -> Self {
        Self {
            hash: NodeHash::default(),
            kind,
            label,
            value: None,
            height: 1,
        }
    }

    /// Node carrying a value.
    pub fn with_value(kind: T::Kind, label: T::Label, value: T::Value) -> Self {
        Self {
            value: Some(value),
            ..Self::new(kind, label)
        }
    }
}

/// A rooted tree stored in an [`indextree`] arena.
#[derive(Debug, Clone)]
pub struct Tree<T: TreeTypes> {
    /// Node storage.
    pub arena: Arena<NodeData<T>>,
    /// The root node.
    pub root: NodeId,
}

impl<T: TreeTypes> Tree<T> {
    /// Create a tree holding a single root node.
    pub fn new(root: NodeData<T>) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(root);
        Self { arena, root }
    }

    /// Append a child as the last child of `parent`.
    ///
    /// Hashes are stale until [`Tree::recompute_hashes`] is called.
    pub fn add_child(&mut self, parent: NodeId, data: NodeData<T>) -> NodeId {
        let id = self.arena.new_node(data);
        parent.append(id, &mut self.arena);
        id
    }

    /// Borrow a node's data.
    pub fn get(&self, id: NodeId) -> &NodeData<T> {
        self.arena[id].get()
    }

    /// Recompute subtree hashes and heights bottom-up.
    ///
    /// The hash covers kind, value and the ordered child hashes, never the label.
    pub fn recompute_hashes(&mut self) {
        let order: Vec<NodeId> = post_order_from(self.root, &self.arena).collect();
        for id in order {
            let mut hasher = RapidHasher::default();
            let mut height = 0;
            for child in id.children(&self.arena) {
                let data = self.arena[child].get();
                data.hash.0.hash(&mut hasher);
                height = height.max(data.height);
            }
            let data = self.arena[id].get_mut();
            data.kind.hash(&mut hasher);
            data.value.hash(&mut hasher);
            data.hash = NodeHash(hasher.finish());
            data.height = height + 1;
        }
    }
}

fn post_order_from<T>(root: NodeId, arena: &Arena<T>) -> impl Iterator<Item = NodeId> + '_ {
    root.traverse(arena).filter_map(|edge| match edge {
        NodeEdge::End(id) => Some(id),
        NodeEdge::Start(_) => None,
    })
}

/// Read access the matching and edit-script algorithms need from a tree.
pub trait DiffTree {
    /// Kind, label and value types.
    type Types: TreeTypes;

    /// The root node.
    fn root(&self) -> NodeId;
    /// Number of nodes.
    fn node_count(&self) -> usize;
    /// Subtree hash.
    fn hash(&self, id: NodeId) -> NodeHash;
    /// Structural kind.
    fn kind(&self, id: NodeId) -> &<Self::Types as TreeTypes>::Kind;
    /// Domain back-reference.
    fn label(&self, id: NodeId) -> &<Self::Types as TreeTypes>::Label;
    /// Node value, if any.
    fn value(&self, id: NodeId) -> Option<&<Self::Types as TreeTypes>::Value>;
    /// Parent node, `None` for the root.
    fn parent(&self, id: NodeId) -> Option<NodeId>;
    /// Children in order.
    fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_;
    /// Number of children.
    fn child_count(&self, id: NodeId) -> usize;
    /// Index among the parent's children, 0 for the root.
    fn position(&self, id: NodeId) -> usize;
    /// Subtree height.
    fn height(&self, id: NodeId) -> usize;
    /// All nodes in pre-order.
    fn iter(&self) -> impl Iterator<Item = NodeId> + '_;
    /// All nodes in post-order.
    fn post_order(&self) -> impl Iterator<Item = NodeId> + '_;
    /// `id` and its descendants in pre-order.
    fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_;
}

impl<T: TreeTypes> DiffTree for Tree<T> {
    type Types = T;

    fn root(&self) -> NodeId {
        self.root
    }

    fn node_count(&self) -> usize {
        self.arena.count()
    }

    fn hash(&self, id: NodeId) -> NodeHash {
        self.get(id).hash
    }

    fn kind(&self, id: NodeId) -> &T::Kind {
        &self.get(id).kind
    }

    fn label(&self, id: NodeId) -> &T::Label {
        &self.get(id).label
    }

    fn value(&self, id: NodeId) -> Option<&T::Value> {
        self.get(id).value.as_ref()
    }

    fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    fn child_count(&self, id: NodeId) -> usize {
        id.children(&self.arena).count()
    }

    fn position(&self, id: NodeId) -> usize {
        id.preceding_siblings(&self.arena).count() - 1
    }

    fn height(&self, id: NodeId) -> usize {
        self.get(id).height
    }

    fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.root.descendants(&self.arena)
    }

    fn post_order(&self) -> impl Iterator<Item = NodeId> + '_ {
        post_order_from(self.root, &self.arena)
    }

    fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.descendants(&self.arena)
    }
}

/// Minimal [`TreeTypes`] with `u32` labels and `String` values, handy for tests
/// and for callers without a domain tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleTypes<K>(core::marker::PhantomData<K>);

impl<K> TreeTypes for SimpleTypes<K>
where
    K: Clone + Eq + Hash + fmt::Display + fmt::Debug,
{
    type Kind = K;
    type Label = u32;
    type Value = String;
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestTypes = SimpleTypes<&'static str>;

    #[test]
    fn identical_shapes_hash_equal() {
        let mut a: Tree<TestTypes> = Tree::new(NodeData::new("block", 0));
        a.add_child(a.root, NodeData::with_value("name", 1, "x".into()));
        a.recompute_hashes();

        let mut b: Tree<TestTypes> = Tree::new(NodeData::new("block", 10));
        b.add_child(b.root, NodeData::with_value("name", 11, "x".into()));
        b.recompute_hashes();

        assert_eq!(a.hash(a.root), b.hash(b.root), "labels must not affect hashes");
        assert_eq!(a.height(a.root), 2);
    }

    #[test]
    fn value_changes_hash() {
        let mut a: Tree<TestTypes> = Tree::new(NodeData::with_value("name", 0, "x".into()));
        a.recompute_hashes();
        let mut b: Tree<TestTypes> = Tree::new(NodeData::with_value("name", 0, "y".into()));
        b.recompute_hashes();
        assert_ne!(a.hash(a.root), b.hash(b.root));
    }

    #[test]
    fn positions_and_orders() {
        let mut t: Tree<TestTypes> = Tree::new(NodeData::new("root", 0));
        let x = t.add_child(t.root, NodeData::new("x", 1));
        let y = t.add_child(t.root, NodeData::new("y", 2));
        let z = t.add_child(x, NodeData::new("z", 3));
        t.recompute_hashes();

        assert_eq!(t.position(t.root), 0);
        assert_eq!(t.position(x), 0);
        assert_eq!(t.position(y), 1);
        assert_eq!(t.iter().collect::<Vec<_>>(), vec![t.root, x, z, y]);
        assert_eq!(t.post_order().collect::<Vec<_>>(), vec![z, x, y, t.root]);
        assert_eq!(t.height(t.root), 3);
    }
}
