//! Error types.

use thiserror::Error;

use crate::operation::OperationKind;
use crate::schema::NodeKind;

/// Building or editing a syntax tree went against the schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The parent kind declares no such role.
    #[error("{kind} has no role named `{role}`")]
    UnknownRole {
        /// Parent kind.
        kind: NodeKind,
        /// Requested role name.
        role: String,
    },

    /// A child was attached to a scalar role.
    #[error("role `{kind}.{role}` holds a scalar, not child nodes")]
    ScalarRole {
        /// Parent kind.
        kind: NodeKind,
        /// Role name.
        role: &'static str,
    },

    /// A scalar was set on a child role.
    #[error("role `{kind}.{role}` holds child nodes, not a scalar")]
    ChildRole {
        /// Parent kind.
        kind: NodeKind,
        /// Role name.
        role: &'static str,
    },

    /// A single-child role is already filled.
    #[error("role `{kind}.{role}` already holds a child")]
    SlotOccupied {
        /// Parent kind.
        kind: NodeKind,
        /// Role name.
        role: &'static str,
    },

    /// The role's declared type does not admit the child's kind.
    #[error("role `{kind}.{role}` does not accept {child}")]
    Inadmissible {
        /// Parent kind.
        kind: NodeKind,
        /// Role name.
        role: &'static str,
        /// Rejected child kind.
        child: NodeKind,
    },
}

/// The attribute registry was configured inconsistently.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Two kinds share a name.
    #[error("attribute `{0}` is registered twice")]
    DuplicateAttribute(String),

    /// A weight is outside `[0, 1]` or not a number.
    #[error("attribute `{name}` has weight {weight}, expected a value in [0, 1]")]
    WeightOutOfRange {
        /// Attribute name.
        name: String,
        /// The offending weight.
        weight: f64,
    },

    /// No kind with that name is registered.
    #[error("no attribute named `{0}` is registered")]
    UnknownAttribute(String),
}

/// A diff could not be expressed in the operation model, or an operation
/// was asked for something it does not have.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// The diff engine produced an action outside the six known kinds.
    #[error("unsupported edit action: {0}")]
    UnsupportedAction(String),

    /// Only inserts and moves have an insertion index.
    #[error("{0} operations have no insertion index")]
    NotInsertLike(OperationKind),

    /// The destination role holds a single child or a scalar.
    #[error("insertion index is only defined for list roles, not `{0}`")]
    NotAListSlot(String),

    /// An inserted or moved node is not attached under a role.
    #[error("inserted node has no role under its parent")]
    Detached,

    /// The node does not belong to the tree it was looked up in.
    #[error("node is not part of the pattern's before tree")]
    UnknownNode,
}

/// A persisted pattern could not be read back.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The bytes are not a pattern record.
    #[error("malformed pattern json: {0}")]
    Json(#[from] serde_json::Error),

    /// A tree record has no nodes.
    #[error("persisted tree is empty")]
    EmptyTree,

    /// An index points past the tree or forward to a later node.
    #[error("node index {0} refers to a node that does not precede it")]
    DanglingIndex(usize),

    /// The record names an attribute the registry lacks.
    #[error("persisted attribute `{0}` is not registered")]
    UnknownAttribute(String),

    /// A stored tree breaks the schema.
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// A stored operation is inconsistent with its trees.
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Any error this crate reports.
#[derive(Debug, Error)]
pub enum Error {
    /// See [`TreeError`].
    #[error(transparent)]
    Tree(#[from] TreeError),

    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// See [`ModelError`].
    #[error(transparent)]
    Model(#[from] ModelError),

    /// See [`PersistError`].
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Result alias using [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;
