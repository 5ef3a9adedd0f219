//! The attribute registry: which attributes exist, how they are computed and
//! how much they weigh.

use indextree::NodeId;

use crate::ast::SyntaxTree;
use crate::attr::value::{AttrValue, INCOMPATIBLE, Symbol};
use crate::error::ConfigError;
use crate::schema::NodeKind;
use crate::tracing_macros::trace;

/// Computes one attribute value for one node.
pub type Constructor = fn(&SyntaxTree, NodeId) -> AttrValue;

/// Whether an attribute can veto a pairing or only contributes to its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// A mismatch makes the pair illegal.
    Hard,
    /// Contributes its similarity to the composite score, scaled by its
    /// weight relative to the other considered soft attributes.
    Soft,
}

/// One registered attribute kind.
#[derive(Debug, Clone)]
pub struct AttributeKind {
    /// Unique name, also used when persisting patterns.
    pub name: &'static str,
    /// Value constructor.
    pub build: Constructor,
    /// Weight in `[0, 1]`; only soft attributes use it, and only relative to
    /// each other.
    pub weight: f64,
    /// Hard or soft.
    pub constraint: Constraint,
}

impl AttributeKind {
    /// A hard attribute.
    pub const fn hard(name: &'static str, build: Constructor) -> Self {
        Self {
            name,
            build,
            weight: 0.0,
            constraint: Constraint::Hard,
        }
    }

    /// A soft attribute with the given weight.
    pub const fn soft(name: &'static str, build: Constructor, weight: f64) -> Self {
        Self {
            name,
            build,
            weight,
            constraint: Constraint::Soft,
        }
    }
}

/// One attribute value computed for one node.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    /// The node the value was computed for.
    pub node: NodeId,
    /// Whether matching takes this attribute into account (pattern side only).
    pub considered: bool,
    /// The value.
    pub value: AttrValue,
}

/// The attributes of one node, in registry order.
pub type NodeAttributes = Vec<Attribute>;

/// Immutable set of attribute kinds.
///
/// Built once with [`AttributeRegistry::builder`] (or [`Default`]) and shared
/// by reference with every pattern and matcher.
#[derive(Debug, Clone)]
pub struct AttributeRegistry {
    kinds: Vec<AttributeKind>,
}

impl Default for AttributeRegistry {
    /// `kind`, `role`, `identifier` and `expr_type` as hard constraints,
    /// `tokens` as a soft attribute of weight 0.5.
    fn default() -> Self {
        Self {
            kinds: vec![
                AttributeKind::hard("kind", build_kind),
                AttributeKind::hard("role", build_role),
                AttributeKind::hard("identifier", build_identifier),
                AttributeKind::hard("expr_type", build_expr_type),
                AttributeKind::soft("tokens", build_tokens, 0.5),
            ],
        }
    }
}

impl AttributeRegistry {
    /// Start an empty registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder { kinds: Vec::new() }
    }

    /// Start from the default attribute kinds.
    pub fn builder_with_defaults() -> RegistryBuilder {
        RegistryBuilder {
            kinds: Self::default().kinds,
        }
    }

    /// Registered kinds, in registration order.
    pub fn kinds(&self) -> &[AttributeKind] {
        &self.kinds
    }

    /// Position of a kind by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.kinds.iter().position(|k| k.name == name)
    }

    /// Look up a kind by name.
    pub fn get(&self, name: &str) -> Option<&AttributeKind> {
        self.kinds.iter().find(|k| k.name == name)
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Whether no kind is registered.
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// One value per registered kind for `node`, all considered.
    pub fn compute_attributes(&self, tree: &SyntaxTree, node: NodeId) -> NodeAttributes {
        self.kinds
            .iter()
            .map(|kind| Attribute {
                node,
                considered: true,
                value: (kind.build)(tree, node),
            })
            .collect()
    }

    /// Composite similarity of a pattern node to a candidate node.
    ///
    /// Attributes not considered on the pattern side are skipped. A hard
    /// mismatch returns `-1` at once. Otherwise the score is the weighted
    /// mean of the considered soft attributes, or `1` when none is considered.
    ///
    /// Weights are relative: scaling every soft weight by the same factor
    /// leaves the score unchanged, and a lone soft attribute scores its plain
    /// similarity whatever its weight. When the considered weights sum to 1
    /// the mean equals the plain `Σ similarity × weight`.
    pub fn composite_similarity(&self, pattern: &[Attribute], candidate: &[Attribute]) -> f64 {
        let mut weighted = 0.0;
        let mut total_weight = 0.0;

        for ((kind, p), c) in self.kinds.iter().zip(pattern).zip(candidate) {
            if !p.considered {
                continue;
            }
            let sim = p.value.similarity(&c.value);
            match kind.constraint {
                Constraint::Hard => {
                    if sim < 0.0 {
                        trace!(attribute = kind.name, "hard constraint violated");
                        return INCOMPATIBLE;
                    }
                }
                Constraint::Soft => {
                    weighted += sim.clamp(0.0, 1.0) * kind.weight;
                    total_weight += kind.weight;
                }
            }
        }

        if total_weight > 0.0 {
            weighted / total_weight
        } else {
            1.0
        }
    }
}

/// Collects attribute kinds and validates them into an [`AttributeRegistry`].
#[derive(Debug, Clone)]
pub struct RegistryBuilder {
    kinds: Vec<AttributeKind>,
}

impl RegistryBuilder {
    /// Add a kind.
    pub fn register(mut self, kind: AttributeKind) -> Self {
        self.kinds.push(kind);
        self
    }

    /// Drop a kind by name, if present.
    pub fn remove(mut self, name: &str) -> Self {
        self.kinds.retain(|k| k.name != name);
        self
    }

    /// Validate names and weights.
    pub fn build(self) -> Result<AttributeRegistry, ConfigError> {
        for (i, kind) in self.kinds.iter().enumerate() {
            if self.kinds[..i].iter().any(|k| k.name == kind.name) {
                return Err(ConfigError::DuplicateAttribute(kind.name.to_string()));
            }
            if !(0.0..=1.0).contains(&kind.weight) {
                return Err(ConfigError::WeightOutOfRange {
                    name: kind.name.to_string(),
                    weight: kind.weight,
                });
            }
        }
        Ok(AttributeRegistry { kinds: self.kinds })
    }
}

/// Structural kind.
pub fn build_kind(tree: &SyntaxTree, node: NodeId) -> AttrValue {
    AttrValue::Kind(tree.kind(node))
}

/// Declared type of the parent slot plus the node's kind.
pub fn build_role(tree: &SyntaxTree, node: NodeId) -> AttrValue {
    AttrValue::Slot {
        accepts: tree.role(node).map(|r| r.accepts),
        kind: tree.kind(node),
    }
}

/// Identifier of names, calls and field accesses.
pub fn build_identifier(tree: &SyntaxTree, node: NodeId) -> AttrValue {
    let symbol = match tree.kind(node) {
        NodeKind::SimpleName
        | NodeKind::QualifiedName
        | NodeKind::MethodCall
        | NodeKind::FieldAccess => tree
            .identifier(node)
            .map_or(Symbol::Unknown, Symbol::Known),
        _ => Symbol::NotApplicable,
    };
    AttrValue::Symbol(symbol)
}

/// Static type of expressions.
pub fn build_expr_type(tree: &SyntaxTree, node: NodeId) -> AttrValue {
    let symbol = if tree.kind(node).is_expression() {
        tree.expr_type(node)
            .map_or(Symbol::Unknown, |ty| Symbol::Known(ty.to_string()))
    } else {
        Symbol::NotApplicable
    };
    AttrValue::Symbol(symbol)
}

/// Flattened token sequence of the node's subtree.
pub fn build_tokens(tree: &SyntaxTree, node: NodeId) -> AttrValue {
    AttrValue::Tokens(tree.tokens(node))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_names_are_rejected() {
        let err = AttributeRegistry::builder_with_defaults()
            .register(AttributeKind::hard("kind", build_kind))
            .build()
            .unwrap_err();
        assert_eq!(err, ConfigError::DuplicateAttribute("kind".into()));
    }

    #[test]
    fn weights_must_be_in_unit_range() {
        let err = AttributeRegistry::builder()
            .register(AttributeKind::soft("tokens", build_tokens, 1.5))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::WeightOutOfRange { .. }));

        let err = AttributeRegistry::builder()
            .register(AttributeKind::soft("tokens", build_tokens, f64::NAN))
            .build()
            .unwrap_err();
        assert!(matches!(err, ConfigError::WeightOutOfRange { .. }));
    }

    #[test]
    fn default_kinds() {
        let registry = AttributeRegistry::default();
        let names: Vec<_> = registry.kinds().iter().map(|k| k.name).collect();
        assert_eq!(names, ["kind", "role", "identifier", "expr_type", "tokens"]);
        assert_eq!(registry.get("tokens").map(|k| k.weight), Some(0.5));
        assert_eq!(registry.index_of("identifier"), Some(2));
    }

    #[test]
    fn composite_scores() {
        let mut tree = SyntaxTree::new(NodeKind::Block);
        let root = tree.root();
        let stmt = tree
            .attach(root, "statements", NodeKind::ExpressionStatement)
            .unwrap();
        let foo = tree.attach(stmt, "expression", NodeKind::MethodCall).unwrap();
        tree.set_scalar(foo, "name", "foo").unwrap();
        let stmt2 = tree
            .attach(root, "statements", NodeKind::ExpressionStatement)
            .unwrap();
        let bar = tree.attach(stmt2, "expression", NodeKind::MethodCall).unwrap();
        tree.set_scalar(bar, "name", "bar").unwrap();

        let registry = AttributeRegistry::default();
        let foo_attrs = registry.compute_attributes(&tree, foo);
        let bar_attrs = registry.compute_attributes(&tree, bar);

        assert_eq!(registry.composite_similarity(&foo_attrs, &foo_attrs), 1.0);
        assert_eq!(registry.composite_similarity(&foo_attrs, &bar_attrs), -1.0);

        // Without the identifier, only token overlap separates them
        let mut relaxed = foo_attrs.clone();
        relaxed[2].considered = false;
        assert_eq!(registry.composite_similarity(&relaxed, &bar_attrs), 0.0);

        // Nothing considered: a wildcard
        for attr in &mut relaxed {
            attr.considered = false;
        }
        let block_attrs = registry.compute_attributes(&tree, root);
        assert_eq!(registry.composite_similarity(&relaxed, &block_attrs), 1.0);
    }

    #[test]
    fn soft_weights_are_relative() {
        let mut tree = SyntaxTree::new(NodeKind::Block);
        let root = tree.root();
        let stmt = tree
            .attach(root, "statements", NodeKind::ExpressionStatement)
            .unwrap();
        let bare = tree.attach(stmt, "expression", NodeKind::MethodCall).unwrap();
        tree.set_scalar(bare, "name", "foo").unwrap();
        let stmt2 = tree
            .attach(root, "statements", NodeKind::ExpressionStatement)
            .unwrap();
        let with_arg = tree.attach(stmt2, "expression", NodeKind::MethodCall).unwrap();
        tree.set_scalar(with_arg, "name", "foo").unwrap();
        tree.attach_name(with_arg, "arguments", "x").unwrap();

        // `foo` against `foo x`: identifiers agree, tokens score 2/3
        let score = |tokens: f64, identifier: f64| {
            let registry = AttributeRegistry::builder()
                .register(AttributeKind::soft("tokens", build_tokens, tokens))
                .register(AttributeKind::soft("identifier", build_identifier, identifier))
                .build()
                .unwrap();
            let pattern = registry.compute_attributes(&tree, bare);
            let candidate = registry.compute_attributes(&tree, with_arg);
            registry.composite_similarity(&pattern, &candidate)
        };

        let summed = 0.2 * (2.0 / 3.0) + 0.8;
        assert!((score(0.2, 0.8) - summed).abs() < 1e-9);
        assert!((score(0.1, 0.4) - summed).abs() < 1e-9);
        assert!((score(0.5, 0.5) - 5.0 / 6.0).abs() < 1e-9);

        let lone = AttributeRegistry::builder()
            .register(AttributeKind::soft("tokens", build_tokens, 0.1))
            .build()
            .unwrap();
        let pattern = lone.compute_attributes(&tree, bare);
        let candidate = lone.compute_attributes(&tree, with_arg);
        assert!((lone.composite_similarity(&pattern, &candidate) - 2.0 / 3.0).abs() < 1e-9);
    }
}
