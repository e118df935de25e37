//! The `aiBlock` node type and its insertion command.
//!
//! ```text
//! <div prompt="" response="" selectedText="foo bar" data-type="ai-block"></div>
//! ```

use fude_doc::{
    AttributeSpec, Attrs, Content, ContentRule, DocError, EditorCommands, Element, HtmlAttributes,
    Node, NodeGroup, NodeSpec, ParseRule, Schema, merge_attributes, starter_schema,
};
use fude_types::{
    AI_BLOCK, ATTR_PROMPT, ATTR_RESPONSE, ATTR_SELECTED_TEXT, BlockAttributes, NodeId,
};

use crate::Result;

/// `data-type` value identifying the block in HTML.
pub const DATA_TYPE: &str = "ai-block";

/// Node spec for the AI block: a draggable block with inline content and
/// three string attributes.
pub fn ai_block_spec() -> NodeSpec {
    NodeSpec::new(AI_BLOCK, render_ai_block)
        .group(NodeGroup::Block)
        .content(ContentRule::Inline)
        .draggable()
        .attr(AttributeSpec::new(ATTR_PROMPT, ""))
        .attr(AttributeSpec::new(ATTR_RESPONSE, ""))
        .attr(AttributeSpec::new(ATTR_SELECTED_TEXT, ""))
        .parse_rule(ParseRule::tag("div").with_attr("data-type", DATA_TYPE))
}

/// Starter schema plus the AI block.
pub fn block_schema() -> Schema {
    starter_schema().with_node(ai_block_spec())
}

fn render_ai_block(_: &Node, attrs: HtmlAttributes) -> Element {
    let data_type: HtmlAttributes = [("data-type".to_string(), DATA_TYPE.to_string())]
        .into_iter()
        .collect();
    Element::new("div").with_attrs(merge_attributes(&[&attrs, &data_type]))
}

/// Durable attributes of a block node.
pub fn from_attrs(attrs: &Attrs) -> BlockAttributes {
    BlockAttributes::from_json_map(attrs)
}

pub fn to_attrs(attrs: &BlockAttributes) -> Attrs {
    attrs.to_json_map()
}

/// Insert a new block after the current selection.
///
/// The selection collapses to its end first, so the block lands after the
/// captured text instead of replacing it.
pub fn insert_ai_block(editor: &mut dyn EditorCommands, selected_text: Option<&str>) -> Result<NodeId> {
    let end = editor.selection().to;
    editor.set_text_selection(end)?;

    let attrs = to_attrs(&BlockAttributes::with_selected_text(
        selected_text.unwrap_or_default(),
    ));
    let inserted = editor.insert_content(Content::node(AI_BLOCK, attrs))?;
    let id = inserted
        .into_iter()
        .next()
        .ok_or_else(|| DocError::InvalidContent(format!("{AI_BLOCK} was not inserted")))?;
    tracing::debug!(node = %id, "inserted {AI_BLOCK} at {end}");
    Ok(id)
}

/// The toolbar button: capture the selected text and insert a block after it.
pub fn toolbar_insert(editor: &mut dyn EditorCommands) -> Result<NodeId> {
    let selection = editor.selection();
    let text = editor.text_between(selection.from, selection.to, " ");
    insert_ai_block(editor, Some(&text))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use fude_doc::{DomNode, MemoryEditor};

    fn editor_with(text: &str) -> MemoryEditor {
        MemoryEditor::with_blocks(Arc::new(block_schema()), vec![Node::paragraph(text)]).unwrap()
    }

    #[test]
    fn block_node_shape() {
        let spec = ai_block_spec();
        assert_eq!(spec.name, AI_BLOCK);
        assert_eq!(spec.group, Some(NodeGroup::Block));
        assert_eq!(spec.content, ContentRule::Inline);
        assert!(spec.draggable);
        let defaults = spec.default_attrs();
        assert_eq!(from_attrs(&defaults), BlockAttributes::default());
    }

    #[test]
    fn renders_div_with_attributes_and_data_type() {
        let schema = block_schema();
        let node = schema
            .create_node(AI_BLOCK, &to_attrs(&BlockAttributes::with_selected_text("foo bar")))
            .unwrap();
        assert_eq!(
            schema.to_html(&[node]).unwrap(),
            "<div prompt=\"\" response=\"\" selectedText=\"foo bar\" data-type=\"ai-block\"></div>"
        );
    }

    #[test]
    fn external_attributes_are_merged() {
        let schema = block_schema();
        let node = schema.create_node(AI_BLOCK, &Attrs::new()).unwrap();
        let extra: HtmlAttributes = [("class".to_string(), "draggable".to_string())]
            .into_iter()
            .collect();
        let DomNode::Element(el) = schema.render_with(&node, &extra).unwrap() else {
            panic!("expected element");
        };
        assert_eq!(el.attr("class"), Some("draggable"));
        assert_eq!(el.attr("data-type"), Some(DATA_TYPE));
    }

    #[test]
    fn parses_only_tagged_divs_with_defaults() {
        let schema = block_schema();
        let dom = vec![
            DomNode::Element(
                Element::new("div")
                    .with_attr("data-type", DATA_TYPE)
                    .with_attr("prompt", "Write a haiku"),
            ),
            DomNode::Element(Element::new("div").with_attr("data-type", "other")),
        ];
        let nodes = schema.parse_dom(&dom);
        let blocks: Vec<_> = nodes.iter().filter(|n| n.kind == AI_BLOCK).collect();
        assert_eq!(blocks.len(), 1);
        let attrs = from_attrs(&blocks[0].attrs);
        assert_eq!(attrs.prompt, "Write a haiku");
        assert_eq!(attrs.response, "");
        assert_eq!(attrs.selected_text, "");
    }

    #[test]
    fn toolbar_inserts_after_selection_with_captured_text() {
        let mut editor = editor_with("foo bar baz");
        editor.select_range(1, 8).unwrap();

        let id = toolbar_insert(&mut editor).unwrap();

        let node = editor.node(id).unwrap();
        assert_eq!(from_attrs(&node.attrs).selected_text, "foo bar");
        // "foo bar" stays in place; the block follows it.
        assert_eq!(editor.blocks()[0].plain_text(), "foo bar");
        assert_eq!(editor.blocks()[1].id, id);
        assert_eq!(editor.blocks()[2].plain_text(), " baz");
    }

    #[test]
    fn insert_without_selected_text() {
        let mut editor = editor_with("abc");
        editor.set_text_selection(5).unwrap();
        let id = insert_ai_block(&mut editor, None).unwrap();
        assert_eq!(from_attrs(&editor.node(id).unwrap().attrs), BlockAttributes::default());
    }
}
