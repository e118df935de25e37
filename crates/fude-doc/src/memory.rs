//! In-memory host editor.
//!
//! `MemoryEditor` implements [`EditorCommands`] over a `doc` tree with integer
//! positions, so blocks can be driven without a real editor. It records every
//! mutating command it executes; tests use the log to check what a block did
//! (and, just as often, what it did not do).
//!
//! ```text
//! doc
//! ├── paragraph "foo bar"     0..9     (open 0, text 1..8, close 8)
//! ├── aiBlock                 9..11
//! └── paragraph " baz"        11..17
//! ```

use std::sync::Arc;

use fude_types::NodeId;
use serde_json::Value;

use crate::editor::{Content, EditorCommands, Selection};
use crate::node::{Attrs, Node};
use crate::schema::{ContentRule, NodeGroup, Schema};
use crate::starter::{DOC, PARAGRAPH};
use crate::{DocError, Result};

/// A mutating command the editor executed.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandRecord {
    SetTextSelection(usize),
    SelectNode(NodeId),
    SetSelection(Selection),
    UpdateAttributes {
        node_type: String,
        node: NodeId,
        attrs: Attrs,
    },
    DeleteNode {
        node_type: String,
        node: NodeId,
    },
    InsertContent {
        at: usize,
        nodes: Vec<NodeId>,
    },
}

/// Where block content goes inside a container.
enum Slot {
    /// Before child `i` (or at the end when `i == len`).
    At(usize),
    /// Inside text block `i`, at inner offset.
    Split(usize, usize),
}

/// Reference host editor holding the document in memory.
#[derive(Debug)]
pub struct MemoryEditor {
    schema: Arc<Schema>,
    doc: Node,
    selection: Selection,
    log: Vec<CommandRecord>,
}

impl MemoryEditor {
    /// Empty document.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            doc: Node::element(DOC),
            selection: Selection::default(),
            log: Vec::new(),
        }
    }

    /// Document with the given top-level blocks.
    pub fn with_blocks(schema: Arc<Schema>, blocks: Vec<Node>) -> Result<Self> {
        let doc = Node::element(DOC).with_content(blocks);
        schema.validate(&doc)?;
        Ok(Self {
            doc,
            ..Self::new(schema)
        })
    }

    /// Load a document from its JSON form. The root must be a `doc` node.
    pub fn from_json(schema: Arc<Schema>, value: Value) -> Result<Self> {
        let doc: Node = serde_json::from_value(value)?;
        if doc.kind != DOC {
            return Err(DocError::InvalidContent(format!(
                "document root must be {DOC}, got {}",
                doc.kind
            )));
        }
        schema.validate(&doc)?;
        Ok(Self {
            doc,
            ..Self::new(schema)
        })
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(&self.doc)?)
    }

    /// Document content rendered through the schema.
    pub fn to_html(&self) -> Result<String> {
        self.schema.to_html(&self.doc.content)
    }

    pub fn doc(&self) -> &Node {
        &self.doc
    }

    /// Top-level blocks.
    pub fn blocks(&self) -> &[Node] {
        &self.doc.content
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Size of the document content (the largest valid position).
    pub fn size(&self) -> usize {
        self.schema.content_size(&self.doc)
    }

    /// Set a range selection, as a user dragging over text would.
    pub fn select_range(&mut self, from: usize, to: usize) -> Result<()> {
        let size = self.size();
        if from.max(to) > size {
            return Err(DocError::InvalidPosition {
                pos: from.max(to),
                size,
            });
        }
        self.selection = Selection::range(from, to);
        Ok(())
    }

    pub fn command_log(&self) -> &[CommandRecord] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Number of attribute updates executed so far.
    pub fn attribute_writes(&self) -> usize {
        self.log
            .iter()
            .filter(|r| matches!(r, CommandRecord::UpdateAttributes { .. }))
            .count()
    }

    // ── Tree navigation ─────────────────────────────────────────────────

    /// Path (child indices from the root) and start position of a node.
    fn locate(&self, id: NodeId) -> Option<(Vec<usize>, usize)> {
        let mut path = Vec::new();
        locate_in(&self.schema, &self.doc, 0, id, &mut path).map(|pos| (path, pos))
    }

    /// Non-text, non-leaf nodes strictly containing `pos`, outermost first.
    fn ancestors_at(&self, pos: usize) -> Vec<(Vec<usize>, usize)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        let mut parent = &self.doc;
        let mut content_start = 0;
        'descend: loop {
            let mut offset = content_start;
            for (i, child) in parent.content.iter().enumerate() {
                let end = offset + self.schema.node_size(child);
                if offset < pos && pos < end && !child.is_text() && !self.schema.is_leaf(child) {
                    path.push(i);
                    out.push((path.clone(), offset));
                    parent = child;
                    content_start = offset + 1;
                    continue 'descend;
                }
                offset = end;
            }
            break;
        }
        out
    }

    /// The node a type-scoped command applies to: the selected node if it has
    /// that type, otherwise the nearest ancestor of the selection.
    fn target(&self, node_type: &str) -> Result<(Vec<usize>, usize)> {
        if let Some(id) = self.selection.node {
            if let Some((path, pos)) = self.locate(id) {
                if node_at(&self.doc, &path).kind == node_type {
                    return Ok((path, pos));
                }
            }
        }
        self.ancestors_at(self.selection.from)
            .into_iter()
            .rev()
            .find(|(path, _)| node_at(&self.doc, path).kind == node_type)
            .ok_or_else(|| DocError::NoMatchingNode(node_type.to_string()))
    }

    fn remove_at(&mut self, path: &[usize]) -> Option<Node> {
        let (last, parent_path) = path.split_last()?;
        let parent = node_at_mut(&mut self.doc, parent_path);
        (*last < parent.content.len()).then(|| parent.content.remove(*last))
    }

    // ── Insertion ───────────────────────────────────────────────────────

    /// Insert inline nodes into the text block at `path`, `offset` chars/leaves in.
    fn insert_inline(&mut self, path: &[usize], offset: usize, nodes: Vec<Node>) {
        let schema = Arc::clone(&self.schema);
        let block = node_at_mut(&mut self.doc, path);
        let index = split_inline_at(&schema, &mut block.content, offset);
        block.content.splice(index..index, nodes);
    }

    /// Insert block nodes at `pos`, splitting a text block if `pos` is inside
    /// one. Returns the position after the inserted content.
    fn insert_blocks(&mut self, pos: usize, nodes: Vec<Node>) -> usize {
        let schema = Arc::clone(&self.schema);
        let mut path: Vec<usize> = Vec::new();
        let mut content_start = 0;

        let (slot, start) = 'descend: loop {
            let parent = node_at(&self.doc, &path);
            let mut offset = content_start;
            let mut found = None;
            for (i, child) in parent.content.iter().enumerate() {
                let size = schema.node_size(child);
                if pos <= offset {
                    found = Some((Slot::At(i), offset));
                    break;
                }
                if pos < offset + size {
                    if schema.is_textblock(child) {
                        found = Some((Slot::Split(i, pos - offset - 1), offset));
                    } else if schema.content_rule(child) == Some(ContentRule::Blocks) {
                        path.push(i);
                        content_start = offset + 1;
                        continue 'descend;
                    } else {
                        found = Some((Slot::At(i + 1), offset + size));
                    }
                    break;
                }
                offset += size;
            }
            break found.unwrap_or((Slot::At(parent.content.len()), offset));
        };

        let container = node_at_mut(&mut self.doc, &path);
        let (index, insert_pos) = match slot {
            Slot::At(i) => (i, start),
            Slot::Split(i, inner) => {
                let block = &mut container.content[i];
                if inner == 0 {
                    (i, start)
                } else if inner >= schema.content_size(block) {
                    (i + 1, start + schema.node_size(block))
                } else {
                    let split = split_inline_at(&schema, &mut block.content, inner);
                    let tail_content = block.content.split_off(split);
                    let tail = Node::element(block.kind.clone())
                        .with_attrs(block.attrs.clone())
                        .with_content(tail_content);
                    let head_size = schema.node_size(block);
                    container.content.insert(i + 1, tail);
                    (i + 1, start + head_size)
                }
            }
        };

        let size: usize = nodes.iter().map(|n| schema.node_size(n)).sum();
        container.content.splice(index..index, nodes);
        insert_pos + size
    }
}

impl EditorCommands for MemoryEditor {
    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_text_selection(&mut self, pos: usize) -> Result<()> {
        let size = self.size();
        if pos > size {
            return Err(DocError::InvalidPosition { pos, size });
        }
        self.selection = Selection::cursor(pos);
        self.log.push(CommandRecord::SetTextSelection(pos));
        Ok(())
    }

    fn select_node(&mut self, id: NodeId) -> Result<()> {
        let (path, pos) = self.locate(id).ok_or(DocError::NodeNotFound(id))?;
        let size = self.schema.node_size(node_at(&self.doc, &path));
        self.selection = Selection {
            from: pos,
            to: pos + size,
            node: Some(id),
        };
        self.log.push(CommandRecord::SelectNode(id));
        Ok(())
    }

    fn set_selection(&mut self, selection: Selection) -> Result<()> {
        let size = self.size();
        let end = selection.from.max(selection.to);
        if end > size {
            return Err(DocError::InvalidPosition { pos: end, size });
        }
        // A node that has since left the document degrades to a text range.
        let node = selection.node.filter(|id| self.locate(*id).is_some());
        self.selection = Selection { node, ..selection };
        self.log.push(CommandRecord::SetSelection(self.selection));
        Ok(())
    }

    fn text_between(&self, from: usize, to: usize, block_separator: &str) -> String {
        let mut out = String::new();
        let mut first = true;
        collect_text(
            &self.schema,
            &self.doc,
            0,
            (from, to),
            block_separator,
            &mut out,
            &mut first,
        );
        out
    }

    fn node_position(&self, id: NodeId) -> Option<usize> {
        self.locate(id).map(|(_, pos)| pos)
    }

    fn node(&self, id: NodeId) -> Option<Node> {
        self.doc.content.iter().find_map(|c| c.find(id)).cloned()
    }

    fn find_nodes(&self, node_type: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        for block in &self.doc.content {
            block.walk(&mut |n| {
                if n.kind == node_type {
                    found.push(n.id);
                }
            });
        }
        found
    }

    fn update_attributes(&mut self, node_type: &str, attrs: &Attrs) -> Result<()> {
        let schema = Arc::clone(&self.schema);
        let spec = schema
            .node_spec(node_type)
            .ok_or_else(|| DocError::UnknownNodeType(node_type.to_string()))?;
        let (path, _) = self.target(node_type)?;
        let node = node_at_mut(&mut self.doc, &path);

        let mut applied = Attrs::new();
        for (key, value) in attrs {
            if spec.attr_spec(key).is_some() {
                node.attrs.insert(key.clone(), value.clone());
                applied.insert(key.clone(), value.clone());
            } else {
                tracing::debug!("ignoring undeclared attribute {key} on {node_type}");
            }
        }
        let id = node.id;
        self.log.push(CommandRecord::UpdateAttributes {
            node_type: node_type.to_string(),
            node: id,
            attrs: applied,
        });
        Ok(())
    }

    fn delete_node(&mut self, node_type: &str) -> Result<()> {
        let (path, pos) = self.target(node_type)?;
        let removed = self
            .remove_at(&path)
            .ok_or_else(|| DocError::NoMatchingNode(node_type.to_string()))?;
        self.selection = Selection::cursor(pos.min(self.size()));
        self.log.push(CommandRecord::DeleteNode {
            node_type: node_type.to_string(),
            node: removed.id,
        });
        Ok(())
    }

    fn insert_content(&mut self, content: Content) -> Result<Vec<NodeId>> {
        let schema = Arc::clone(&self.schema);
        let nodes = match content {
            Content::Fragment(nodes) => nodes,
            Content::Node { kind, attrs } => vec![schema.create_node(&kind, &attrs)?],
        };
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        schema.validate_fragment(&nodes)?;

        let all_inline = nodes.iter().all(|n| schema.is_inline(n));
        if !all_inline {
            let misplaced = nodes.iter().find(|n| {
                schema
                    .node_spec(&n.kind)
                    .is_none_or(|spec| spec.group != Some(NodeGroup::Block))
            });
            if let Some(node) = misplaced {
                return Err(DocError::InvalidContent(format!(
                    "{} cannot be placed between blocks",
                    node.kind
                )));
            }
        }

        let mut pos = self.selection.to;
        if let Some(id) = self.selection.node {
            if let Some((path, start)) = self.locate(id) {
                self.remove_at(&path);
                pos = start;
            }
        }
        let size = self.size();
        if pos > size {
            return Err(DocError::InvalidPosition { pos, size });
        }

        let textblock = self
            .ancestors_at(pos)
            .pop()
            .filter(|(path, _)| {
                let block = node_at(&self.doc, path);
                match schema.content_rule(block) {
                    Some(ContentRule::Inline) => true,
                    Some(ContentRule::Text) => nodes.iter().all(|n| n.is_text() && n.marks.is_empty()),
                    _ => false,
                }
            });

        let (ids, end) = match textblock {
            Some((path, start)) if all_inline => {
                let ids = nodes.iter().map(|n| n.id).collect();
                let inserted: usize = nodes.iter().map(|n| schema.node_size(n)).sum();
                self.insert_inline(&path, pos - start - 1, nodes);
                (ids, pos + inserted)
            }
            _ if all_inline => {
                let para = Node::element(PARAGRAPH).with_content(nodes);
                let ids = vec![para.id];
                (ids, self.insert_blocks(pos, vec![para]))
            }
            _ => {
                let ids = nodes.iter().map(|n| n.id).collect();
                (ids, self.insert_blocks(pos, nodes))
            }
        };

        self.selection = Selection::cursor(end);
        self.log.push(CommandRecord::InsertContent {
            at: pos,
            nodes: ids.clone(),
        });
        Ok(ids)
    }
}

// ── Helpers ─────────────────────────────────────────────────────────────────

fn node_at<'a>(root: &'a Node, path: &[usize]) -> &'a Node {
    path.iter().fold(root, |node, &i| &node.content[i])
}

fn node_at_mut<'a>(root: &'a mut Node, path: &[usize]) -> &'a mut Node {
    let mut node = root;
    for &i in path {
        node = &mut node.content[i];
    }
    node
}

fn locate_in(
    schema: &Schema,
    parent: &Node,
    content_start: usize,
    id: NodeId,
    path: &mut Vec<usize>,
) -> Option<usize> {
    let mut pos = content_start;
    for (i, child) in parent.content.iter().enumerate() {
        path.push(i);
        if child.id == id {
            return Some(pos);
        }
        if !child.content.is_empty() {
            if let Some(found) = locate_in(schema, child, pos + 1, id, path) {
                return Some(found);
            }
        }
        path.pop();
        pos += schema.node_size(child);
    }
    None
}

/// Split inline content so that a boundary falls at `offset`; returns the
/// child index at that boundary.
fn split_inline_at(schema: &Schema, content: &mut Vec<Node>, offset: usize) -> usize {
    let mut acc = 0;
    for i in 0..content.len() {
        if acc == offset {
            return i;
        }
        let size = schema.node_size(&content[i]);
        if offset < acc + size {
            let node = &mut content[i];
            let cut = offset - acc;
            let text = node.text.take().unwrap_or_default();
            let byte = text
                .char_indices()
                .nth(cut)
                .map_or(text.len(), |(b, _)| b);
            let (head, tail) = text.split_at(byte);
            let tail = Node::marked_text(tail, node.marks.clone());
            node.text = Some(head.to_string());
            content.insert(i + 1, tail);
            return i + 1;
        }
        acc += size;
    }
    content.len()
}

fn collect_text(
    schema: &Schema,
    parent: &Node,
    content_start: usize,
    (from, to): (usize, usize),
    separator: &str,
    out: &mut String,
    first: &mut bool,
) {
    let mut offset = content_start;
    for child in &parent.content {
        if offset >= to {
            break;
        }
        let end = offset + schema.node_size(child);
        if end > from {
            if child.is_text() {
                let start = from.saturating_sub(offset);
                let stop = (to - offset).min(child.text_len());
                let text = child.text.as_deref().unwrap_or("");
                out.extend(text.chars().skip(start).take(stop.saturating_sub(start)));
            } else {
                if schema.is_textblock(child) {
                    if *first {
                        *first = false;
                    } else {
                        out.push_str(separator);
                    }
                }
                if !schema.is_leaf(child) {
                    collect_text(schema, child, offset + 1, (from, to), separator, out, first);
                }
            }
        }
        offset = end;
    }
}
