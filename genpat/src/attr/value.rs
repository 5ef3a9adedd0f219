//! Attribute values and their pairwise similarity.

use serde::{Deserialize, Serialize};

use crate::schema::{ChildType, NodeKind};
use crate::tracing_macros::warn;
use genpat_diff::lcs::lcs_len;

/// Score for a categorically incompatible pair.
pub const INCOMPATIBLE: f64 = -1.0;

/// A symbolic property that may be missing or meaningless for a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// The node kind never carries this property.
    NotApplicable,
    /// The node could carry it, but the front end did not resolve it.
    Unknown,
    /// Resolved value.
    Known(String),
}

impl Symbol {
    fn similarity(&self, other: &Symbol) -> f64 {
        match (self, other) {
            (Symbol::Unknown, _) | (_, Symbol::Unknown) => 1.0,
            (Symbol::NotApplicable, Symbol::NotApplicable) => 1.0,
            (Symbol::Known(a), Symbol::Known(b)) if a == b => 1.0,
            _ => INCOMPATIBLE,
        }
    }
}

/// One computed property of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// Structural kind.
    Kind(NodeKind),
    /// The declared type of the slot a node sits in (`None` for a root),
    /// together with the node's own kind.
    Slot {
        /// Declared type of the parent slot.
        accepts: Option<ChildType>,
        /// The node's kind.
        kind: NodeKind,
    },
    /// Flattened token sequence.
    Tokens(Vec<String>),
    /// Identifier or static type.
    Symbol(Symbol),
}

impl AttrValue {
    fn shape(&self) -> &'static str {
        match self {
            AttrValue::Kind(_) => "kind",
            AttrValue::Slot { .. } => "slot",
            AttrValue::Tokens(_) => "tokens",
            AttrValue::Symbol(_) => "symbol",
        }
    }

    /// Similarity of a pattern-side value (`self`) to a candidate-side value.
    ///
    /// Comparing values of different shapes is logged and scores
    /// [`INCOMPATIBLE`].
    pub fn similarity(&self, candidate: &AttrValue) -> f64 {
        match (self, candidate) {
            (AttrValue::Kind(a), AttrValue::Kind(b)) => {
                if a == b {
                    1.0
                } else {
                    INCOMPATIBLE
                }
            }
            (AttrValue::Slot { accepts, .. }, AttrValue::Slot { kind, .. }) => match accepts {
                None => 1.0,
                Some(accepts) if accepts.admits(*kind) => 1.0,
                Some(_) => INCOMPATIBLE,
            },
            (AttrValue::Tokens(a), AttrValue::Tokens(b)) => token_similarity(a, b),
            (AttrValue::Symbol(a), AttrValue::Symbol(b)) => a.similarity(b),
            _ => {
                warn!(
                    pattern = self.shape(),
                    candidate = candidate.shape(),
                    "comparing attributes of different kinds"
                );
                INCOMPATIBLE
            }
        }
    }
}

/// `2 × |LCS(a, b)| / (|a| + |b|)`, and 1 for two empty sequences.
pub fn token_similarity(a: &[String], b: &[String]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    2.0 * lcs_len(a, b) as f64 / (a.len() + b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn token_similarity_is_dice_over_lcs() {
        let sim = token_similarity(&tokens(&["a", "b", "c"]), &tokens(&["a", "b", "d"]));
        assert!((sim - 2.0 / 3.0).abs() < 1e-9, "got {sim}");
        assert_eq!(token_similarity(&[], &[]), 1.0);
        assert_eq!(token_similarity(&tokens(&["a"]), &[]), 0.0);
    }

    #[test]
    fn unknown_symbols_are_always_compatible() {
        let known = AttrValue::Symbol(Symbol::Known("int".into()));
        let other = AttrValue::Symbol(Symbol::Known("long".into()));
        let unknown = AttrValue::Symbol(Symbol::Unknown);
        assert_eq!(known.similarity(&unknown), 1.0);
        assert_eq!(unknown.similarity(&other), 1.0);
        assert_eq!(known.similarity(&other), INCOMPATIBLE);
        assert_eq!(
            AttrValue::Symbol(Symbol::NotApplicable).similarity(&known),
            INCOMPATIBLE
        );
    }

    #[test]
    fn slot_checks_candidate_kind_against_pattern_slot() {
        let in_block = AttrValue::Slot {
            accepts: Some(ChildType::Statement),
            kind: NodeKind::ExpressionStatement,
        };
        let statement = AttrValue::Slot {
            accepts: Some(ChildType::Expression),
            kind: NodeKind::ReturnStatement,
        };
        let expression = AttrValue::Slot {
            accepts: Some(ChildType::Statement),
            kind: NodeKind::MethodCall,
        };
        assert_eq!(in_block.similarity(&statement), 1.0);
        assert_eq!(in_block.similarity(&expression), INCOMPATIBLE);

        let root = AttrValue::Slot {
            accepts: None,
            kind: NodeKind::Block,
        };
        assert_eq!(root.similarity(&expression), 1.0);
    }

    #[test]
    fn mismatched_shapes_are_incompatible() {
        let kind = AttrValue::Kind(NodeKind::Block);
        let tokens = AttrValue::Tokens(Vec::new());
        assert_eq!(kind.similarity(&tokens), INCOMPATIBLE);
    }
}
