//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent violations of the decision-tree model.
/// These are independent of infrastructure concerns.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("cannot allocate node: {0}")]
    NodeAlloc(String),

    #[error("node is not part of this tree")]
    UnknownNode,

    #[error("graph error at {node}: {reason}")]
    Graph { node: String, reason: String },

    #[error("lost nodes: tree records {expected} nodes but {found} are reachable")]
    LostNodes { expected: usize, found: usize },

    #[error("malformed knowledge base at byte {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("knowledge base contains no subjects")]
    EmptyKnowledgeBase,
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
