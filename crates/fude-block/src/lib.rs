//! The AI generation block.
//!
//! A block is a document node (`aiBlock`) whose only durable state is three
//! string attributes. Everything else lives in a [`BlockController`]: the
//! prompt being typed, the phase, the last error. Controllers talk to the host
//! editor through [`fude_doc::EditorCommands`] and never own the document.
//!
//! ```text
//!   toolbar ─▶ schema::toolbar_insert ─▶ aiBlock node
//!                                          │ NodeViewRegistry
//!                                          ▼
//!                                   BlockController ◀──▶ CredentialStore
//!                                          │ GenerationTicket
//!                                          ▼
//!                                   BlockSession ─▶ GenerationClient (task)
//! ```
//!
//! Hosts that run their own event loop can drive [`BlockController`] directly;
//! [`BlockSession`] is the batteries-included version with tokio tasks and
//! cancellation.

mod controller;
mod credential;
mod error;
pub mod schema;
mod session;
pub mod view;

pub use controller::{BlockController, Completion, ERROR_PREFIX, GenerationTicket, Outcome};
pub use credential::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use error::BlockError;
pub use schema::{DATA_TYPE, ai_block_spec, block_schema, insert_ai_block, toolbar_insert};
pub use session::{BlockSession, GenerationEvent, SessionConfig};
pub use view::{
    Action, ActionState, BlockView, ControllerFactory, NodeViewRegistry, ViewBody, ViewContext,
};

/// Result type for block operations.
pub type Result<T> = std::result::Result<T, BlockError>;
