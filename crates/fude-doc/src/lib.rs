//! Document tree, schema and editor command facade.
//!
//! Content is a tree of typed [`Node`]s with integer positions. A [`Schema`]
//! of [`NodeSpec`]s says what each type may contain and how it maps to and
//! from HTML. Embedded blocks talk to the host editor only through
//! [`EditorCommands`]; [`MemoryEditor`] is the in-memory host used by the CLI
//! and the tests.
//!
//! # Positions
//!
//! Positions count the boundaries between tokens: each text character is one
//! token, leaf nodes are one token, and other nodes add an opening and a
//! closing token around their content. Position 0 is the start of the
//! document content.

pub mod dom;
pub mod editor;
mod error;
pub mod memory;
pub mod node;
pub mod schema;
pub mod starter;

pub use dom::{DomNode, Element, HtmlAttributes, merge_attributes};
pub use editor::{Content, EditorCommands, Selection};
pub use error::DocError;
pub use memory::{CommandRecord, MemoryEditor};
pub use node::{Attrs, Fragment, Mark, Node, TEXT};
pub use schema::{
    AttributeSpec, ContentRule, MarkSpec, NodeGroup, NodeSpec, ParseRule, RenderFn, Schema,
};
pub use starter::starter_schema;

/// Result type for document operations.
pub type Result<T> = std::result::Result<T, DocError>;
