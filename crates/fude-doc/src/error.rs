//! Error types for document operations.

use fude_types::NodeId;
use thiserror::Error;

/// Errors raised by the schema and by host editor commands.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DocError {
    /// No node with this identity exists in the document.
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// Neither the selected node nor any ancestor of the selection has this type.
    #[error("no {0} node at the current selection")]
    NoMatchingNode(String),

    /// Position outside the document.
    #[error("position {pos} out of bounds for document of size {size}")]
    InvalidPosition { pos: usize, size: usize },

    /// Node type not registered in the schema.
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// Mark type not registered in the schema.
    #[error("unknown mark type: {0}")]
    UnknownMark(String),

    /// Content that violates the parent's content rule.
    #[error("invalid content: {0}")]
    InvalidContent(String),

    /// Document JSON could not be read or written.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DocError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
