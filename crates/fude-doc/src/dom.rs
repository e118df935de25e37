//! Minimal DOM model for render and parse rules.
//!
//! Node specs render to [`Element`]s and parse from them; this is the shape
//! the host editor exchanges with the page. There is no HTML tokenizer here,
//! only serialization.

use indexmap::IndexMap;

/// HTML attributes, in insertion order.
pub type HtmlAttributes = IndexMap<String, String>;

/// A DOM node: element or text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DomNode {
    Element(Element),
    Text(String),
}

impl DomNode {
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        match self {
            DomNode::Element(el) => el.write_html(out),
            DomNode::Text(text) => out.push_str(&escape_text(text)),
        }
    }
}

impl From<Element> for DomNode {
    fn from(el: Element) -> Self {
        DomNode::Element(el)
    }
}

/// An element with ordered attributes and children.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: HtmlAttributes,
    pub children: Vec<DomNode>,
}

/// Elements that never have children or a closing tag.
const VOID_TAGS: &[&str] = &["br", "hr", "img"];

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn with_attrs(mut self, attrs: HtmlAttributes) -> Self {
        self.attrs = attrs;
        self
    }

    pub fn with_child(mut self, child: impl Into<DomNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_child(DomNode::Text(text.into()))
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    /// Concatenated descendant text.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                DomNode::Text(t) => out.push_str(t),
                DomNode::Element(el) => out.push_str(&el.text_content()),
            }
        }
        out
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_attr(value));
            out.push('"');
        }
        out.push('>');
        if VOID_TAGS.contains(&self.tag.as_str()) {
            return;
        }
        for child in &self.children {
            child.write_html(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

/// Merge attribute sets left to right.
///
/// Later values win, except `class` (space-joined) and `style` (`; `-joined),
/// which accumulate.
pub fn merge_attributes(sets: &[&HtmlAttributes]) -> HtmlAttributes {
    let mut merged = HtmlAttributes::new();
    for set in sets {
        for (key, value) in set.iter() {
            let joined = match (key.as_str(), merged.get(key)) {
                ("class", Some(existing)) if !existing.is_empty() => {
                    format!("{existing} {value}")
                }
                ("style", Some(existing)) if !existing.is_empty() => {
                    format!("{}; {value}", existing.trim_end_matches(';'))
                }
                _ => value.clone(),
            };
            merged.insert(key.clone(), joined);
        }
    }
    merged
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_attributes_in_order_and_escapes() {
        let el = Element::new("div")
            .with_attr("data-type", "ai-block")
            .with_attr("prompt", "say \"hi\" & <bye>")
            .with_text("1 < 2");
        assert_eq!(
            el.to_html(),
            "<div data-type=\"ai-block\" prompt=\"say &quot;hi&quot; &amp; &lt;bye&gt;\">1 &lt; 2</div>"
        );
    }

    #[test]
    fn void_tags_have_no_closing_tag() {
        assert_eq!(Element::new("br").to_html(), "<br>");
    }

    #[test]
    fn merge_joins_class_and_style() {
        let a: HtmlAttributes = [("class".to_string(), "a".to_string())].into_iter().collect();
        let b: HtmlAttributes = [
            ("class".to_string(), "b".to_string()),
            ("style".to_string(), "color: red".to_string()),
            ("id".to_string(), "x".to_string()),
        ]
        .into_iter()
        .collect();
        let c: HtmlAttributes = [("id".to_string(), "y".to_string())].into_iter().collect();
        let merged = merge_attributes(&[&a, &b, &c]);
        assert_eq!(merged["class"], "a b");
        assert_eq!(merged["style"], "color: red");
        assert_eq!(merged["id"], "y");
    }

    #[test]
    fn text_content_is_recursive() {
        let el = Element::new("p")
            .with_text("a ")
            .with_child(Element::new("strong").with_text("b"));
        assert_eq!(el.text_content(), "a b");
    }
}
