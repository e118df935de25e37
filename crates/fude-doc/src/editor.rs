//! The command facade a host editor exposes to embedded blocks.
//!
//! Blocks never touch the document tree directly; they go through these
//! commands, the same way a node view goes through its editor's command
//! chain. Positions are integers in the usual rich-text position space
//! (see [`crate::schema`]).

use fude_types::NodeId;

use crate::Result;
use crate::node::{Attrs, Fragment, Node};

/// The editor selection.
///
/// `node` is set for node selections (a whole node selected, `from..to`
/// spanning it); text selections leave it `None`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub from: usize,
    pub to: usize,
    pub node: Option<NodeId>,
}

impl Selection {
    /// A collapsed cursor at `pos`.
    pub fn cursor(pos: usize) -> Self {
        Self {
            from: pos,
            to: pos,
            node: None,
        }
    }

    pub fn range(from: usize, to: usize) -> Self {
        Self {
            from: from.min(to),
            to: from.max(to),
            node: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

/// Content accepted by [`EditorCommands::insert_content`].
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    /// Ready-made nodes.
    Fragment(Fragment),
    /// A node to be created by the schema from its type and attributes.
    Node { kind: String, attrs: Attrs },
}

impl Content {
    pub fn node(kind: impl Into<String>, attrs: Attrs) -> Self {
        Self::Node {
            kind: kind.into(),
            attrs,
        }
    }
}

impl From<Fragment> for Content {
    fn from(nodes: Fragment) -> Self {
        Self::Fragment(nodes)
    }
}

impl From<Node> for Content {
    fn from(node: Node) -> Self {
        Self::Fragment(vec![node])
    }
}

/// Commands consumed from the host editor.
pub trait EditorCommands {
    /// Current selection.
    fn selection(&self) -> Selection;

    /// Collapse the selection to a cursor at `pos`.
    fn set_text_selection(&mut self, pos: usize) -> Result<()>;

    /// Select a whole node.
    fn select_node(&mut self, id: NodeId) -> Result<()>;

    /// Put back a selection previously read with [`selection`](Self::selection).
    fn set_selection(&mut self, selection: Selection) -> Result<()>;

    /// Text between two positions, with `block_separator` between text blocks.
    fn text_between(&self, from: usize, to: usize, block_separator: &str) -> String;

    /// Position directly before the node, if it is still in the document.
    fn node_position(&self, id: NodeId) -> Option<usize>;

    /// A copy of the node, if it is still in the document.
    fn node(&self, id: NodeId) -> Option<Node>;

    /// All nodes of a type, in document order.
    fn find_nodes(&self, node_type: &str) -> Vec<NodeId>;

    /// Merge `attrs` into the selected node of `node_type`, or the nearest
    /// ancestor of the selection with that type.
    fn update_attributes(&mut self, node_type: &str, attrs: &Attrs) -> Result<()>;

    /// Delete the selected node of `node_type`, or the nearest ancestor of the
    /// selection with that type.
    fn delete_node(&mut self, node_type: &str) -> Result<()>;

    /// Insert content at the selection, replacing a selected node. Returns the
    /// identities of the inserted top-level nodes.
    fn insert_content(&mut self, content: Content) -> Result<Vec<NodeId>>;
}
