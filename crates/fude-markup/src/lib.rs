//! Markdown conversion for generated responses.
//!
//! Generated text is markdown. It is shown twice: as a lightweight preview
//! while the user reviews it, and as real document content once inserted.
//! Both renderers walk the same pulldown-cmark event stream built with the
//! same options, so emphasis, headings, lists and code mean the same thing
//! in either.
//!
//! ```text
//! "**bold** and *italic*"
//!     ↓ pulldown-cmark events
//!     ├── preview             → [RichSpan { bold, "bold" }, RichSpan { " and " }, ...]
//!     └── to_document_content → [paragraph [text("bold", [bold]), text(" and "), ...]]
//! ```

mod document;
mod preview;

use pulldown_cmark::{HeadingLevel, Options};
use serde::{Deserialize, Serialize};

use fude_doc::Fragment;

pub use preview::RichSpan;

/// Conversion knobs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterOptions {
    /// Drop raw HTML instead of keeping it as literal text.
    pub strip_html: bool,
}

/// Markdown → preview spans and markdown → document fragment.
#[derive(Clone, Debug, Default)]
pub struct MarkupConverter {
    options: ConverterOptions,
}

impl MarkupConverter {
    pub fn new(options: ConverterOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConverterOptions {
        &self.options
    }

    /// Styled spans for display; not authoritative.
    pub fn preview(&self, markdown: &str) -> Vec<RichSpan> {
        preview::render(markdown, &self.options)
    }

    /// Document content for insertion. Validates against the starter schema.
    pub fn to_document_content(&self, markdown: &str) -> Fragment {
        document::render(markdown, &self.options)
    }
}

/// Parser options shared by both renderers.
fn parser_options() -> Options {
    Options::ENABLE_STRIKETHROUGH
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fude_doc::{Node, starter};

    #[derive(Debug, PartialEq)]
    struct Styled {
        ch: char,
        bold: bool,
        italic: bool,
        strike: bool,
        code: bool,
        link: Option<String>,
        heading_level: Option<u8>,
        code_block: bool,
    }

    fn from_preview(spans: &[RichSpan]) -> Vec<Styled> {
        spans
            .iter()
            .filter(|s| !s.synthetic)
            .flat_map(|s| {
                s.text.chars().map(|ch| Styled {
                    ch,
                    bold: s.bold,
                    italic: s.italic,
                    strike: s.strike,
                    code: s.code,
                    link: s.link.clone(),
                    heading_level: s.heading_level,
                    code_block: s.code_block,
                })
            })
            .collect()
    }

    /// Block context a text node inherits from its ancestors.
    #[derive(Clone, Copy, Default)]
    struct Context {
        heading_level: Option<u8>,
        code_block: bool,
    }

    fn from_document(nodes: &[Node]) -> Vec<Styled> {
        let mut out = Vec::new();
        for node in nodes {
            collect_styled(node, Context::default(), &mut out);
        }
        out
    }

    fn collect_styled(node: &Node, mut ctx: Context, out: &mut Vec<Styled>) {
        if node.kind == starter::HEADING {
            ctx.heading_level = node
                .attr("level")
                .and_then(|v| v.as_u64())
                .map(|level| level as u8);
        }
        if node.kind == starter::CODE_BLOCK {
            ctx.code_block = true;
        }
        if let Some(text) = &node.text {
            let href = node
                .marks
                .iter()
                .find(|m| m.kind == starter::LINK)
                .and_then(|m| m.attrs.get("href"))
                .and_then(|v| v.as_str())
                .map(str::to_string);
            for ch in text.chars() {
                out.push(Styled {
                    ch,
                    bold: node.has_mark(starter::BOLD),
                    italic: node.has_mark(starter::ITALIC),
                    strike: node.has_mark(starter::STRIKE),
                    code: node.has_mark(starter::CODE),
                    link: href.clone(),
                    heading_level: ctx.heading_level,
                    code_block: ctx.code_block,
                });
            }
        }
        for child in &node.content {
            collect_styled(child, ctx, out);
        }
    }

    #[test]
    fn renderers_agree_on_styles_and_blocks() {
        let converter = MarkupConverter::default();
        let samples = [
            "plain **bold** *italic* ***both*** `code` ~~gone~~",
            "see [the **docs**](https://example.com/docs) now",
            "- one **b**\n- two *i*\n\n1. first\n2. `second`",
            "> quoted *text*",
            "para one\n\npara **two**",
            "# Title *em*\n\nbody\n\n### Small **b**",
            "```rust\nfn main() {}\nlet x = 1;\n```\n\nafter `code`",
            "    indented\n    block\n",
            "[![logo](https://img.example/a.png)](https://example.com)",
        ];
        for md in samples {
            assert_eq!(
                from_preview(&converter.preview(md)),
                from_document(&converter.to_document_content(md)),
                "styles differ for {md:?}"
            );
        }
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let opts: ConverterOptions = serde_json::from_str("{}").unwrap();
        assert!(!opts.strip_html);
        let opts: ConverterOptions = serde_json::from_str(r#"{"strip_html":true}"#).unwrap();
        assert!(opts.strip_html);
    }
}
