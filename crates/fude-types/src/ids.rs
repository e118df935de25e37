//! Typed node identifiers.
//!
//! `NodeId` wraps a UUIDv7 (time-ordered). The host editor assigns one to every
//! node it holds; it lives only as long as the editor session and is never
//! written into the serialized document. The `short()` form is for logs and
//! human-facing UI, never for lookup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Runtime identity of a document node (UUIDv7).
#[derive(Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(uuid::Uuid);

impl NodeId {
    /// Create a new time-ordered ID.
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// First 8 hex characters, for display only.
    pub fn short(&self) -> String {
        self.0.as_simple().to_string()[..8].to_string()
    }

}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<uuid::Uuid> for NodeId {
    fn from(u: uuid::Uuid) -> Self {
        Self(u)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.short())
    }
}
