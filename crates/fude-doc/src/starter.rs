//! The starter schema: paragraphs, headings, lists, code, quotes, rules and
//! the common marks.
//!
//! Extensions (like the AI block) register extra node specs on top of this.

use serde_json::Value;

use crate::dom::{Element, HtmlAttributes};
use crate::node::{Attrs, Mark, Node};
use crate::schema::{AttributeSpec, ContentRule, MarkSpec, NodeGroup, NodeSpec, ParseRule, Schema};

pub const DOC: &str = "doc";
pub const PARAGRAPH: &str = "paragraph";
pub const HEADING: &str = "heading";
pub const BLOCKQUOTE: &str = "blockquote";
pub const BULLET_LIST: &str = "bulletList";
pub const ORDERED_LIST: &str = "orderedList";
pub const LIST_ITEM: &str = "listItem";
pub const CODE_BLOCK: &str = "codeBlock";
pub const HORIZONTAL_RULE: &str = "horizontalRule";
pub const HARD_BREAK: &str = "hardBreak";

pub const BOLD: &str = "bold";
pub const ITALIC: &str = "italic";
pub const STRIKE: &str = "strike";
pub const CODE: &str = "code";
pub const LINK: &str = "link";

/// Schema with the starter node and mark set.
pub fn starter_schema() -> Schema {
    let mut schema = Schema::new();

    schema.register_node(NodeSpec::new(DOC, render_doc).content(ContentRule::Blocks));

    schema.register_node(
        NodeSpec::new(PARAGRAPH, |_, attrs| Element::new("p").with_attrs(attrs))
            .group(NodeGroup::Block)
            .content(ContentRule::Inline)
            .parse_rule(ParseRule::tag("p")),
    );

    let mut heading = NodeSpec::new(HEADING, render_heading)
        .group(NodeGroup::Block)
        .content(ContentRule::Inline)
        .attr(AttributeSpec::new("level", 1).internal());
    for (tag, f) in HEADING_TAGS {
        heading = heading.parse_rule(ParseRule::tag(*tag).with_attrs(*f));
    }
    schema.register_node(heading);

    schema.register_node(
        NodeSpec::new(BLOCKQUOTE, |_, attrs| Element::new("blockquote").with_attrs(attrs))
            .group(NodeGroup::Block)
            .content(ContentRule::Blocks)
            .parse_rule(ParseRule::tag("blockquote")),
    );

    schema.register_node(
        NodeSpec::new(BULLET_LIST, |_, attrs| Element::new("ul").with_attrs(attrs))
            .group(NodeGroup::Block)
            .content(ContentRule::ListItems)
            .parse_rule(ParseRule::tag("ul")),
    );

    schema.register_node(
        NodeSpec::new(ORDERED_LIST, render_ordered_list)
            .group(NodeGroup::Block)
            .content(ContentRule::ListItems)
            .attr(AttributeSpec::new("start", 1).internal())
            .parse_rule(ParseRule::tag("ol").with_attrs(ordered_list_attrs)),
    );

    schema.register_node(
        NodeSpec::new(LIST_ITEM, |_, attrs| Element::new("li").with_attrs(attrs))
            .content(ContentRule::Blocks)
            .parse_rule(ParseRule::tag("li")),
    );

    schema.register_node(
        NodeSpec::new(CODE_BLOCK, render_code_block)
            .group(NodeGroup::Block)
            .content(ContentRule::Text)
            .attr(AttributeSpec::new("language", Value::Null).internal())
            .parse_rule(ParseRule::tag("pre").with_attrs(code_block_attrs)),
    );

    schema.register_node(
        NodeSpec::new(HORIZONTAL_RULE, |_, attrs| Element::new("hr").with_attrs(attrs))
            .group(NodeGroup::Block)
            .parse_rule(ParseRule::tag("hr")),
    );

    schema.register_node(
        NodeSpec::new(HARD_BREAK, |_, attrs| Element::new("br").with_attrs(attrs))
            .group(NodeGroup::Inline)
            .parse_rule(ParseRule::tag("br")),
    );

    schema.register_mark(
        MarkSpec::new(BOLD, |_| Element::new("strong"))
            .parse_rule(ParseRule::tag("strong"))
            .parse_rule(ParseRule::tag("b")),
    );
    schema.register_mark(
        MarkSpec::new(ITALIC, |_| Element::new("em"))
            .parse_rule(ParseRule::tag("em"))
            .parse_rule(ParseRule::tag("i")),
    );
    schema.register_mark(
        MarkSpec::new(STRIKE, |_| Element::new("s"))
            .parse_rule(ParseRule::tag("s"))
            .parse_rule(ParseRule::tag("del")),
    );
    schema.register_mark(MarkSpec::new(CODE, |_| Element::new("code")).parse_rule(ParseRule::tag("code")));
    schema.register_mark(
        MarkSpec::new(LINK, render_link).parse_rule(ParseRule::tag("a").with_attrs(link_attrs)),
    );

    schema
}

fn render_doc(_: &Node, attrs: HtmlAttributes) -> Element {
    Element::new("div").with_attrs(attrs)
}

fn render_heading(node: &Node, attrs: HtmlAttributes) -> Element {
    let level = node
        .attr("level")
        .and_then(Value::as_u64)
        .unwrap_or(1)
        .clamp(1, 6);
    Element::new(format!("h{level}")).with_attrs(attrs)
}

fn render_ordered_list(node: &Node, attrs: HtmlAttributes) -> Element {
    let el = Element::new("ol").with_attrs(attrs);
    match node.attr("start").and_then(Value::as_u64) {
        Some(start) if start != 1 => el.with_attr("start", start.to_string()),
        _ => el,
    }
}

fn render_code_block(node: &Node, attrs: HtmlAttributes) -> Element {
    let mut code = Element::new("code");
    if let Some(lang) = node.attr_str("language") {
        code = code.with_attr("class", format!("language-{lang}"));
    }
    Element::new("pre").with_attrs(attrs).with_child(code)
}

fn render_link(mark: &Mark) -> Element {
    let href = mark.attrs.get("href").and_then(Value::as_str).unwrap_or("");
    Element::new("a").with_attr("href", href)
}

fn level_attrs(level: u64) -> Attrs {
    let mut attrs = Attrs::new();
    attrs.insert("level".into(), Value::from(level));
    attrs
}

const HEADING_TAGS: &[(&str, fn(&Element) -> Attrs)] = &[
    ("h1", |_| level_attrs(1)),
    ("h2", |_| level_attrs(2)),
    ("h3", |_| level_attrs(3)),
    ("h4", |_| level_attrs(4)),
    ("h5", |_| level_attrs(5)),
    ("h6", |_| level_attrs(6)),
];

fn ordered_list_attrs(el: &Element) -> Attrs {
    let mut attrs = Attrs::new();
    if let Some(start) = el.attr("start").and_then(|s| s.parse::<u64>().ok()) {
        attrs.insert("start".into(), Value::from(start));
    }
    attrs
}

fn code_block_attrs(el: &Element) -> Attrs {
    let mut attrs = Attrs::new();
    let class = el
        .children
        .iter()
        .find_map(|c| match c {
            crate::dom::DomNode::Element(code) if code.tag == "code" => code.attr("class"),
            _ => None,
        });
    if let Some(lang) = class.and_then(|c| c.strip_prefix("language-")) {
        attrs.insert("language".into(), Value::String(lang.to_string()));
    }
    attrs
}

fn link_attrs(el: &Element) -> Attrs {
    let mut attrs = Attrs::new();
    if let Some(href) = el.attr("href") {
        attrs.insert("href".into(), Value::String(href.to_string()));
    }
    attrs
}
