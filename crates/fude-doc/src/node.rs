//! Document tree nodes.
//!
//! The JSON shape is the usual rich-text editor one:
//!
//! ```text
//! { "type": "paragraph",
//!   "attrs": { ... },                 # omitted when empty
//!   "content": [                      # omitted when empty
//!     { "type": "text", "text": "bold", "marks": [{ "type": "bold" }] }
//!   ] }
//! ```
//!
//! Every node also carries a [`NodeId`] that the host editor assigns. It is
//! skipped by serde and ignored by equality, so two trees with the same
//! content compare equal no matter where they came from.

use fude_types::NodeId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Node and mark attributes.
pub type Attrs = serde_json::Map<String, Value>;

/// A sequence of sibling nodes.
pub type Fragment = Vec<Node>;

/// Node type name of text leaves.
pub const TEXT: &str = "text";

/// An inline mark applied to a text node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attrs: Attrs::new(),
        }
    }

    /// A `link` mark pointing at `href`.
    pub fn link(href: impl Into<String>) -> Self {
        let mut mark = Self::new("link");
        mark.attrs.insert("href".into(), Value::String(href.into()));
        mark
    }
}

/// A node in the document tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node {
    /// Runtime identity; never serialized.
    #[serde(skip)]
    pub id: NodeId,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.attrs == other.attrs
            && self.content == other.content
            && self.text == other.text
            && self.marks == other.marks
    }
}

impl Node {
    /// A non-text node with no attributes or children.
    pub fn element(kind: impl Into<String>) -> Self {
        Self {
            id: NodeId::new(),
            kind: kind.into(),
            attrs: Attrs::new(),
            content: Vec::new(),
            text: None,
            marks: Vec::new(),
        }
    }

    /// A text leaf.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::element(TEXT)
        }
    }

    /// A text leaf carrying `marks`.
    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            marks,
            ..Self::text(text)
        }
    }

    /// Convenience for a paragraph holding plain text.
    pub fn paragraph(text: &str) -> Self {
        let node = Self::element("paragraph");
        if text.is_empty() {
            node
        } else {
            node.with_content(vec![Self::text(text)])
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_content(mut self, content: Vec<Node>) -> Self {
        self.content = content;
        self
    }

    pub fn is_text(&self) -> bool {
        self.kind == TEXT
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// String attribute, if present and a string.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    pub fn has_mark(&self, kind: &str) -> bool {
        self.marks.iter().any(|m| m.kind == kind)
    }

    /// Length of a text leaf in characters (0 for other nodes).
    pub fn text_len(&self) -> usize {
        self.text.as_deref().map_or(0, |t| t.chars().count())
    }

    /// Concatenated text of this node and its descendants, no separators.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.content {
            child.collect_text(out);
        }
    }

    /// Depth-first search by identity.
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.content.iter().find_map(|c| c.find(id))
    }

    /// Visit this node and all descendants, depth-first, parents first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        for child in &self.content {
            child.walk(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_shape_omits_empty_fields() {
        let node = Node::paragraph("hi");
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "paragraph",
                "content": [{ "type": "text", "text": "hi" }]
            })
        );
    }

    #[test]
    fn equality_ignores_identity() {
        let a = Node::paragraph("same");
        let b = Node::paragraph("same");
        assert_ne!(a.id, b.id);
        assert_eq!(a, b);
    }

    #[test]
    fn deserialized_nodes_get_fresh_ids() {
        let json = serde_json::json!({
            "type": "doc",
            "content": [{ "type": "paragraph" }, { "type": "paragraph" }]
        });
        let doc: Node = serde_json::from_value(json).unwrap();
        assert_ne!(doc.content[0].id, doc.content[1].id);
    }

    #[test]
    fn text_len_counts_chars_not_bytes() {
        assert_eq!(Node::text("héllo").text_len(), 5);
        assert_eq!(Node::element("paragraph").text_len(), 0);
    }

    #[test]
    fn plain_text_and_find() {
        let inner = Node::marked_text("bold", vec![Mark::new("bold")]);
        let inner_id = inner.id;
        let para = Node::element("paragraph").with_content(vec![Node::text("a "), inner]);
        assert_eq!(para.plain_text(), "a bold");
        assert!(para.find(inner_id).unwrap().has_mark("bold"));
    }
}
