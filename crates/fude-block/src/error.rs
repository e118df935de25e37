//! Error types for block operations.

use fude_doc::DocError;
use fude_types::{NodeId, Phase};
use thiserror::Error;

/// Controller and session misuse, plus failures from the host editor and the
/// credential store. Generation failures are not here: they become the
/// block's error message.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    /// The operation is not available in the current phase.
    #[error("cannot {action} while {phase}")]
    InvalidTransition { phase: Phase, action: &'static str },

    /// The block was discarded or inserted.
    #[error("block is no longer live")]
    Terminated,

    /// No live controller for this node.
    #[error("no block controller for {0}")]
    UnknownBlock(NodeId),

    #[error(transparent)]
    Document(#[from] DocError),

    #[error("credential store: {0}")]
    Credential(String),
}

impl BlockError {
    pub(crate) fn credential(err: impl std::fmt::Display) -> Self {
        Self::Credential(err.to_string())
    }
}
