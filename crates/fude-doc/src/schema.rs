//! Node and mark specifications.
//!
//! A [`Schema`] is a registry of [`NodeSpec`]s keyed by type name. Each spec
//! declares placement (group), what it may contain, its attributes with
//! defaults, how it parses from DOM and how it renders to DOM. The host
//! editor uses the schema to size nodes (for integer positions), to validate
//! inserted content, and to serialize.
//!
//! # Positions
//!
//! ```text
//! text leaf          → its length in chars
//! leaf (hardBreak)   → 1
//! anything else      → 2 (open + close) + size of its content
//! ```

use indexmap::IndexMap;
use serde_json::Value;

use crate::dom::{DomNode, Element, HtmlAttributes, merge_attributes};
use crate::node::{Attrs, Mark, Node};
use crate::{DocError, Result};

/// Placement group of a node type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeGroup {
    Block,
    Inline,
}

/// What a node may contain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentRule {
    /// Leaf node.
    Empty,
    /// `inline*`
    Inline,
    /// `text*`, no marks.
    Text,
    /// `block*`
    Blocks,
    /// `listItem+`
    ListItems,
}

/// A declared attribute with its default.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeSpec {
    pub name: String,
    pub default: Value,
    /// Whether the default render rule emits this attribute as an HTML attribute.
    pub rendered: bool,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: default.into(),
            rendered: true,
        }
    }

    /// Keep the attribute out of the rendered HTML attributes.
    pub fn internal(mut self) -> Self {
        self.rendered = false;
        self
    }
}

/// Builds an element for a node from its HTML attributes.
///
/// The HTML attributes passed in are the node's rendered attributes merged
/// with any externally supplied ones. Child content goes into the returned
/// element's innermost element (the content hole).
pub type RenderFn = fn(&Node, HtmlAttributes) -> Element;

/// Reads node attributes from a matched element.
pub type AttrsFromDom = fn(&Element) -> Attrs;

/// Matches a DOM element by tag and required attribute values.
#[derive(Clone, Debug)]
pub struct ParseRule {
    pub tag: String,
    pub required: Vec<(String, String)>,
    pub get_attrs: Option<AttrsFromDom>,
}

impl ParseRule {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            required: Vec::new(),
            get_attrs: None,
        }
    }

    /// Require `key="value"` on the element, e.g. `div[data-type="ai-block"]`.
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.required.push((key.into(), value.into()));
        self
    }

    pub fn with_attrs(mut self, f: AttrsFromDom) -> Self {
        self.get_attrs = Some(f);
        self
    }

    pub fn matches(&self, el: &Element) -> bool {
        el.tag.eq_ignore_ascii_case(&self.tag)
            && self
                .required
                .iter()
                .all(|(k, v)| el.attr(k) == Some(v.as_str()))
    }
}

/// Specification of a node type.
#[derive(Clone, Debug)]
pub struct NodeSpec {
    pub name: String,
    pub group: Option<NodeGroup>,
    pub content: ContentRule,
    pub draggable: bool,
    pub attrs: Vec<AttributeSpec>,
    pub parse: Vec<ParseRule>,
    pub render: RenderFn,
}

impl NodeSpec {
    pub fn new(name: impl Into<String>, render: RenderFn) -> Self {
        Self {
            name: name.into(),
            group: None,
            content: ContentRule::Empty,
            draggable: false,
            attrs: Vec::new(),
            parse: Vec::new(),
            render,
        }
    }

    pub fn group(mut self, group: NodeGroup) -> Self {
        self.group = Some(group);
        self
    }

    pub fn content(mut self, content: ContentRule) -> Self {
        self.content = content;
        self
    }

    pub fn draggable(mut self) -> Self {
        self.draggable = true;
        self
    }

    pub fn attr(mut self, attr: AttributeSpec) -> Self {
        self.attrs.push(attr);
        self
    }

    pub fn parse_rule(mut self, rule: ParseRule) -> Self {
        self.parse.push(rule);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.content == ContentRule::Empty
    }

    pub fn is_textblock(&self) -> bool {
        matches!(self.content, ContentRule::Inline | ContentRule::Text)
    }

    pub fn is_inline(&self) -> bool {
        self.group == Some(NodeGroup::Inline)
    }

    pub fn attr_spec(&self, name: &str) -> Option<&AttributeSpec> {
        self.attrs.iter().find(|a| a.name == name)
    }

    pub fn default_attrs(&self) -> Attrs {
        self.attrs
            .iter()
            .map(|a| (a.name.clone(), a.default.clone()))
            .collect()
    }

    /// Defaults overlaid with `given`; undeclared keys are dropped.
    pub fn fill_attrs(&self, given: &Attrs) -> Attrs {
        self.attrs
            .iter()
            .map(|a| {
                let value = given.get(&a.name).cloned().unwrap_or_else(|| a.default.clone());
                (a.name.clone(), value)
            })
            .collect()
    }

    /// HTML attributes for the node's rendered attributes. Nulls are skipped.
    pub fn html_attributes(&self, node: &Node) -> HtmlAttributes {
        let mut out = HtmlAttributes::new();
        for spec in self.attrs.iter().filter(|a| a.rendered) {
            match node.attrs.get(&spec.name).unwrap_or(&spec.default) {
                Value::Null => {}
                Value::String(s) => {
                    out.insert(spec.name.clone(), s.clone());
                }
                other => {
                    out.insert(spec.name.clone(), other.to_string());
                }
            }
        }
        out
    }

    /// Attributes read from a matched element: the rule's hook if it has one,
    /// otherwise same-named DOM attributes, with defaults for the rest.
    fn attrs_from_dom(&self, rule: &ParseRule, el: &Element) -> Attrs {
        let given = match rule.get_attrs {
            Some(f) => f(el),
            None => self
                .attrs
                .iter()
                .filter_map(|a| {
                    el.attr(&a.name)
                        .map(|v| (a.name.clone(), Value::String(v.to_string())))
                })
                .collect(),
        };
        self.fill_attrs(&given)
    }
}

/// Builds the element wrapping a marked run.
pub type MarkRenderFn = fn(&Mark) -> Element;

/// Specification of a mark type.
#[derive(Clone, Debug)]
pub struct MarkSpec {
    pub name: String,
    pub parse: Vec<ParseRule>,
    pub render: MarkRenderFn,
}

impl MarkSpec {
    pub fn new(name: impl Into<String>, render: MarkRenderFn) -> Self {
        Self {
            name: name.into(),
            parse: Vec::new(),
            render,
        }
    }

    pub fn parse_rule(mut self, rule: ParseRule) -> Self {
        self.parse.push(rule);
        self
    }
}

/// Registry of node and mark specs keyed by type name.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    nodes: IndexMap<String, NodeSpec>,
    marks: IndexMap<String, MarkSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a node spec.
    pub fn register_node(&mut self, spec: NodeSpec) {
        self.nodes.insert(spec.name.clone(), spec);
    }

    pub fn register_mark(&mut self, spec: MarkSpec) {
        self.marks.insert(spec.name.clone(), spec);
    }

    pub fn with_node(mut self, spec: NodeSpec) -> Self {
        self.register_node(spec);
        self
    }

    pub fn node_spec(&self, name: &str) -> Option<&NodeSpec> {
        self.nodes.get(name)
    }

    pub fn mark_spec(&self, name: &str) -> Option<&MarkSpec> {
        self.marks.get(name)
    }

    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    fn spec(&self, name: &str) -> Result<&NodeSpec> {
        self.nodes
            .get(name)
            .ok_or_else(|| DocError::UnknownNodeType(name.to_string()))
    }

    /// Create a node of `kind` with defaults filled in.
    pub fn create_node(&self, kind: &str, attrs: &Attrs) -> Result<Node> {
        let spec = self.spec(kind)?;
        Ok(Node::element(kind).with_attrs(spec.fill_attrs(attrs)))
    }

    // ── Sizing ──────────────────────────────────────────────────────────

    /// Size of a node in the position space.
    pub fn node_size(&self, node: &Node) -> usize {
        if node.is_text() {
            return node.text_len();
        }
        match self.nodes.get(&node.kind) {
            Some(spec) if spec.is_leaf() => 1,
            _ => 2 + self.content_size(node),
        }
    }

    /// Sum of child sizes.
    pub fn content_size(&self, node: &Node) -> usize {
        node.content.iter().map(|c| self.node_size(c)).sum()
    }

    pub fn is_textblock(&self, node: &Node) -> bool {
        self.nodes.get(&node.kind).is_some_and(NodeSpec::is_textblock)
    }

    pub fn is_leaf(&self, node: &Node) -> bool {
        !node.is_text() && self.nodes.get(&node.kind).is_some_and(NodeSpec::is_leaf)
    }

    pub fn is_inline(&self, node: &Node) -> bool {
        node.is_text() || self.nodes.get(&node.kind).is_some_and(NodeSpec::is_inline)
    }

    pub fn content_rule(&self, node: &Node) -> Option<ContentRule> {
        self.nodes.get(&node.kind).map(|s| s.content)
    }

    // ── Validation ──────────────────────────────────────────────────────

    /// Check a node and its subtree against the schema.
    pub fn validate(&self, node: &Node) -> Result<()> {
        if node.is_text() {
            return self.validate_text(node);
        }
        let spec = self.spec(&node.kind)?;
        if spec.is_leaf() && !node.content.is_empty() {
            return Err(DocError::InvalidContent(format!(
                "{} is a leaf and cannot have content",
                node.kind
            )));
        }
        for child in &node.content {
            self.check_child(spec, child)?;
            self.validate(child)?;
        }
        if spec.content == ContentRule::ListItems && node.content.is_empty() {
            return Err(DocError::InvalidContent(format!(
                "{} needs at least one list item",
                node.kind
            )));
        }
        Ok(())
    }

    /// Validate a fragment as block-level content (e.g. for insertion between blocks).
    pub fn validate_fragment(&self, nodes: &[Node]) -> Result<()> {
        nodes.iter().try_for_each(|n| self.validate(n))
    }

    fn validate_text(&self, node: &Node) -> Result<()> {
        if node.text.as_deref().unwrap_or("").is_empty() {
            return Err(DocError::InvalidContent("empty text node".into()));
        }
        for mark in &node.marks {
            if !self.marks.contains_key(&mark.kind) {
                return Err(DocError::UnknownMark(mark.kind.clone()));
            }
        }
        Ok(())
    }

    fn check_child(&self, parent: &NodeSpec, child: &Node) -> Result<()> {
        let allowed = match parent.content {
            ContentRule::Empty => false,
            ContentRule::Inline => self.is_inline(child),
            ContentRule::Text => child.is_text() && child.marks.is_empty(),
            ContentRule::Blocks => self
                .nodes
                .get(&child.kind)
                .is_some_and(|s| s.group == Some(NodeGroup::Block)),
            ContentRule::ListItems => child.kind == crate::starter::LIST_ITEM,
        };
        if allowed {
            Ok(())
        } else {
            Err(DocError::InvalidContent(format!(
                "{} not allowed inside {}",
                child.kind, parent.name
            )))
        }
    }

    // ── Rendering ───────────────────────────────────────────────────────

    /// Render a node to DOM.
    pub fn render(&self, node: &Node) -> Result<DomNode> {
        self.render_with(node, &HtmlAttributes::new())
    }

    /// Render a node, merging `extra` into its HTML attributes.
    pub fn render_with(&self, node: &Node, extra: &HtmlAttributes) -> Result<DomNode> {
        if node.is_text() {
            return self.render_text(node);
        }
        let spec = self.spec(&node.kind)?;
        let attrs = merge_attributes(&[&spec.html_attributes(node), extra]);
        let mut el = (spec.render)(node, attrs);
        if !spec.is_leaf() {
            let children = node
                .content
                .iter()
                .map(|c| self.render(c))
                .collect::<Result<Vec<_>>>()?;
            fill_content_hole(&mut el, children);
        }
        Ok(DomNode::Element(el))
    }

    fn render_text(&self, node: &Node) -> Result<DomNode> {
        let mut dom = DomNode::Text(node.text.clone().unwrap_or_default());
        for mark in node.marks.iter().rev() {
            let spec = self
                .marks
                .get(&mark.kind)
                .ok_or_else(|| DocError::UnknownMark(mark.kind.clone()))?;
            dom = DomNode::Element((spec.render)(mark).with_child(dom));
        }
        Ok(dom)
    }

    /// Render a sequence of nodes to an HTML string.
    pub fn to_html(&self, nodes: &[Node]) -> Result<String> {
        let mut out = String::new();
        for node in nodes {
            out.push_str(&self.render(node)?.to_html());
        }
        Ok(out)
    }

    // ── Parsing ─────────────────────────────────────────────────────────

    /// Find the node spec whose parse rule matches `el`, with the attributes it reads.
    pub fn match_element(&self, el: &Element) -> Option<(&NodeSpec, Attrs)> {
        self.nodes.values().find_map(|spec| {
            spec.parse
                .iter()
                .find(|rule| rule.matches(el))
                .map(|rule| (spec, spec.attrs_from_dom(rule, el)))
        })
    }

    fn match_mark(&self, el: &Element) -> Option<Mark> {
        self.marks.values().find_map(|spec| {
            spec.parse.iter().find(|rule| rule.matches(el)).map(|rule| {
                let mut mark = Mark::new(spec.name.clone());
                if let Some(f) = rule.get_attrs {
                    mark.attrs = f(el);
                }
                mark
            })
        })
    }

    /// Parse DOM into document nodes.
    ///
    /// Unknown elements are transparent (their children are parsed in
    /// place); text outside any text block is dropped when it is only
    /// whitespace.
    pub fn parse_dom(&self, dom: &[DomNode]) -> Vec<Node> {
        let mut out = Vec::new();
        self.parse_into(dom, &[], &mut out);
        out
    }

    fn parse_into(&self, dom: &[DomNode], marks: &[Mark], out: &mut Vec<Node>) {
        for item in dom {
            match item {
                DomNode::Text(text) => {
                    if !text.is_empty() {
                        out.push(Node::marked_text(text.clone(), marks.to_vec()));
                    }
                }
                DomNode::Element(el) => {
                    if let Some((spec, attrs)) = self.match_element(el) {
                        let mut node = Node::element(spec.name.clone()).with_attrs(attrs);
                        if spec.content == ContentRule::Text {
                            let text = el.text_content();
                            if !text.is_empty() {
                                node.content.push(Node::text(text));
                            }
                        } else if !spec.is_leaf() {
                            let mut children = Vec::new();
                            self.parse_into(&el.children, &[], &mut children);
                            if !spec.is_textblock() {
                                children.retain(|c| {
                                    !c.is_text() || !c.text.as_deref().unwrap_or("").trim().is_empty()
                                });
                            }
                            node.content = children;
                        }
                        out.push(node);
                    } else if let Some(mark) = self.match_mark(el) {
                        let mut nested = marks.to_vec();
                        nested.push(mark);
                        self.parse_into(&el.children, &nested, out);
                    } else {
                        self.parse_into(&el.children, marks, out);
                    }
                }
            }
        }
    }
}

/// Put `children` into the innermost first-child chain of `el` (`<pre><code>` → `code`).
fn fill_content_hole(el: &mut Element, children: Vec<DomNode>) {
    if let [DomNode::Element(inner)] = el.children.as_mut_slice() {
        fill_content_hole(inner, children);
    } else {
        el.children.extend(children);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::starter;

    fn schema() -> Schema {
        starter::starter_schema()
    }

    #[test]
    fn sizes_follow_position_rules() {
        let s = schema();
        let para = Node::paragraph("abc");
        assert_eq!(s.node_size(&para), 5);
        assert_eq!(s.node_size(&Node::element("paragraph")), 2);
        assert_eq!(s.node_size(&Node::element(starter::HARD_BREAK)), 1);
        let list = Node::element(starter::BULLET_LIST).with_content(vec![
            Node::element(starter::LIST_ITEM).with_content(vec![Node::paragraph("x")]),
        ]);
        assert_eq!(s.node_size(&list), 2 + 2 + 3);
    }

    #[test]
    fn create_node_fills_defaults_and_drops_unknown() {
        let s = schema();
        let mut attrs = Attrs::new();
        attrs.insert("bogus".into(), Value::Bool(true));
        let heading = s.create_node(starter::HEADING, &attrs).unwrap();
        assert_eq!(heading.attr("level"), Some(&Value::from(1)));
        assert!(heading.attr("bogus").is_none());
        assert!(s.create_node("nope", &Attrs::new()).is_err());
    }

    #[test]
    fn validation_rejects_misplaced_content() {
        let s = schema();
        let bad = Node::element(starter::BULLET_LIST).with_content(vec![Node::paragraph("x")]);
        assert!(s.validate(&bad).is_err());

        let bad_mark = Node::element("paragraph")
            .with_content(vec![Node::marked_text("x", vec![Mark::new("glitter")])]);
        assert_eq!(s.validate(&bad_mark), Err(DocError::UnknownMark("glitter".into())));

        let empty_text = Node::element("paragraph").with_content(vec![Node::text("")]);
        assert!(s.validate(&empty_text).is_err());

        assert!(s.validate(&Node::paragraph("fine")).is_ok());
    }

    #[test]
    fn renders_marks_nested_in_order() {
        let s = schema();
        let para = Node::element("paragraph").with_content(vec![Node::marked_text(
            "hi",
            vec![Mark::new("bold"), Mark::new("italic")],
        )]);
        assert_eq!(s.to_html(&[para]).unwrap(), "<p><strong><em>hi</em></strong></p>");
    }

    #[test]
    fn renders_code_block_into_inner_hole() {
        let s = schema();
        let code = Node::element(starter::CODE_BLOCK)
            .with_attr("language", "rust")
            .with_content(vec![Node::text("fn main() {}")]);
        assert_eq!(
            s.to_html(&[code]).unwrap(),
            "<pre><code class=\"language-rust\">fn main() {}</code></pre>"
        );
    }

    #[test]
    fn parses_headings_and_marks() {
        let s = schema();
        let dom = vec![DomNode::Element(
            Element::new("h2")
                .with_text("Title ")
                .with_child(Element::new("em").with_text("here")),
        )];
        let nodes = s.parse_dom(&dom);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, starter::HEADING);
        assert_eq!(nodes[0].attr("level"), Some(&Value::from(2)));
        assert!(nodes[0].content[1].has_mark("italic"));
    }
}
