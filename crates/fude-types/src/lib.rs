//! Shared types for fude, the AI generation block.
//!
//! This crate is the leaf of the workspace: no internal dependencies, just the
//! vocabulary the other crates speak.
//!
//! ```text
//! Document (host editor)
//!     └── Node (NodeId, runtime identity, never serialized)
//!           └── aiBlock attributes (BlockAttributes: prompt, response, selectedText)
//!
//! BlockController (ephemeral)
//!     └── Phase: Editing → Generating → Reviewing
//!     └── GenerationRequest (credential + prompt) → Result<String, GenerationError>
//! ```
//!
//! # Key Types
//!
//! |-----------------------|-------------------------------------------------|
//! | Type                  | Purpose                                         |
//! |-----------------------|-------------------------------------------------|
//! | [`NodeId`]            | Runtime identity of a document node             |
//! | [`BlockAttributes`]   | The only durable state of an AI block           |
//! | [`Phase`]             | Controller state                                |
//! | [`GenerationRequest`] | What is sent to the generation service          |
//! | [`GenerationError`]   | Typed generation failures                       |
//! |-----------------------|-------------------------------------------------|

pub mod block;
pub mod generation;
pub mod ids;

pub use block::{
    AI_BLOCK, ATTR_PROMPT, ATTR_RESPONSE, ATTR_SELECTED_TEXT, BlockAttributes, CREDENTIAL_KEY,
    Phase,
};
pub use generation::{GenerationError, GenerationRequest, GenerationResult};
pub use ids::NodeId;
