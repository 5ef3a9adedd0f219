//! # genpat
//!
//! Edit patterns over syntax trees: extract a pattern from a before/after
//! pair, then find where its before side occurs in other code.
//!
//! - [`ast`] holds the arena syntax tree and [`schema`] its node kinds and roles.
//! - [`attr`] computes per-node attributes and scores node pairs.
//! - [`diff`] runs the tree diff once and types its actions as
//!   [`DiffOperation`]s.
//! - [`pattern`] ties a diff and the before tree's attributes together.
//! - [`matcher`] searches a candidate tree for a pattern.
//! - [`persist`] stores patterns as JSON.
//!
//! # Example
//!
//! ```
//! use genpat::{
//!     AttributeRegistry, Matcher, MatcherConfig, NodeKind, Pattern, PatternConfig, SyntaxTree,
//! };
//!
//! // `{ list.add(x); }`
//! let mut tree = SyntaxTree::new(NodeKind::Block);
//! let stmt = tree.attach(tree.root(), "statements", NodeKind::ExpressionStatement)?;
//! let call = tree.attach(stmt, "expression", NodeKind::MethodCall)?;
//! tree.set_scalar(call, "name", "add")?;
//! tree.attach_name(call, "target", "list")?;
//!
//! let registry = AttributeRegistry::default();
//! let pattern = Pattern::extract(tree.clone(), &registry, &PatternConfig::default())?;
//!
//! let matcher = Matcher::new(&registry, MatcherConfig::default());
//! let found = matcher.first_match(&pattern, &tree).expect("a tree matches itself");
//! assert_eq!(found.candidate_for(call), Some(call));
//! # Ok::<(), genpat::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]

mod tracing_macros;

pub mod ast;
pub mod attr;
pub mod diff;
pub mod error;
pub mod matcher;
pub mod operation;
pub mod pattern;
pub mod persist;
pub mod schema;

pub use ast::{SyntaxNode, SyntaxTree};
pub use attr::{
    AttrValue, Attribute, AttributeKind, AttributeRegistry, AttributeTable, Constraint,
    NodeAttributes, Symbol,
};
pub use diff::{SyntaxDiff, diff};
pub use error::{ConfigError, Error, ModelError, PersistError, Result, TreeError};
pub use genpat_diff::{Matching, MatchingConfig, ScriptMode};
pub use indextree::NodeId;
pub use matcher::{MatchInstance, Matcher, MatcherConfig, RoughMapping};
pub use operation::{
    DiffOperation, EnginePosition, IndexStrategy, ListScan, NodeRef, OperationKind, Side,
};
pub use pattern::{Pattern, PatternConfig};
pub use schema::{ChildType, NodeKind, RoleDef};
