//! Markdown → document fragment.
//!
//! Blocks are built on a stack of open containers. Inline content arriving
//! directly in a block container (tight list items, raw HTML blocks) opens an
//! implicit paragraph, closed again by the next block boundary.

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};
use serde_json::Value;

use fude_doc::starter::{
    BLOCKQUOTE, BOLD, BULLET_LIST, CODE, CODE_BLOCK, DOC, HARD_BREAK, HEADING, HORIZONTAL_RULE,
    ITALIC, LINK, LIST_ITEM, ORDERED_LIST, PARAGRAPH, STRIKE,
};
use fude_doc::{Fragment, Mark, Node};

use crate::{ConverterOptions, heading_level_to_u8, parser_options};

struct Open {
    node: Node,
    implicit: bool,
}

struct FragmentBuilder {
    /// Open containers; the bottom one collects the result.
    stack: Vec<Open>,
    marks: Vec<Mark>,
}

impl FragmentBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Open {
                node: Node::element(DOC),
                implicit: false,
            }],
            marks: Vec::new(),
        }
    }

    fn top(&mut self) -> Option<&mut Node> {
        self.stack.last_mut().map(|open| &mut open.node)
    }

    fn in_textblock(&self) -> bool {
        self.stack
            .last()
            .is_some_and(|open| matches!(open.node.kind.as_str(), PARAGRAPH | HEADING | CODE_BLOCK))
    }

    fn open(&mut self, node: Node) {
        self.close_implicit();
        self.stack.push(Open {
            node,
            implicit: false,
        });
    }

    fn close(&mut self) {
        self.close_implicit();
        self.pop();
    }

    fn pop(&mut self) {
        if self.stack.len() <= 1 {
            return;
        }
        let Some(open) = self.stack.pop() else { return };
        if open.implicit && open.node.content.is_empty() {
            return;
        }
        if let Some(parent) = self.top() {
            parent.content.push(open.node);
        }
    }

    fn close_implicit(&mut self) {
        while self.stack.last().is_some_and(|open| open.implicit) {
            self.pop();
        }
    }

    /// A leaf block such as a horizontal rule.
    fn leaf_block(&mut self, node: Node) {
        self.close_implicit();
        if let Some(parent) = self.top() {
            parent.content.push(node);
        }
    }

    fn inline(&mut self, node: Node) {
        if !self.in_textblock() {
            self.stack.push(Open {
                node: Node::element(PARAGRAPH),
                implicit: true,
            });
        }
        let Some(parent) = self.top() else { return };
        if let (Some(last), Some(text)) = (parent.content.last_mut(), node.text.as_deref()) {
            if last.is_text() && last.marks == node.marks {
                if let Some(existing) = last.text.as_mut() {
                    existing.push_str(text);
                    return;
                }
            }
        }
        parent.content.push(node);
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let in_code = self
            .stack
            .last()
            .is_some_and(|open| open.node.kind == CODE_BLOCK);
        let marks = if in_code { Vec::new() } else { self.marks.clone() };
        self.inline(Node::marked_text(text, marks));
    }

    fn mark(&mut self, mark: Mark) {
        self.marks.push(mark);
    }

    fn unmark(&mut self, kind: &str) {
        if let Some(i) = self.marks.iter().rposition(|m| m.kind == kind) {
            self.marks.remove(i);
        }
    }

    /// Drop trailing newlines from the last text child of the open block.
    fn trim_trailing_newline(&mut self) {
        let Some(parent) = self.top() else { return };
        let Some(last) = parent.content.last_mut() else { return };
        if let Some(text) = last.text.as_mut() {
            let trimmed = text.trim_end_matches('\n').len();
            text.truncate(trimmed);
            if text.is_empty() {
                parent.content.pop();
            }
        }
    }

    fn finish(mut self) -> Fragment {
        while self.stack.len() > 1 {
            self.pop();
        }
        self.stack
            .pop()
            .map(|open| open.node.content)
            .unwrap_or_default()
    }
}

pub(crate) fn render(markdown: &str, options: &ConverterOptions) -> Fragment {
    let mut b = FragmentBuilder::new();

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            // ── Blocks ──
            Event::Start(Tag::Paragraph) => b.open(Node::element(PARAGRAPH)),
            Event::Start(Tag::Heading { level, .. }) => b.open(
                Node::element(HEADING).with_attr("level", heading_level_to_u8(level)),
            ),
            Event::Start(Tag::BlockQuote(_)) => b.open(Node::element(BLOCKQUOTE)),
            Event::Start(Tag::CodeBlock(kind)) => {
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map_or(Value::Null, |lang| Value::String(lang.to_string())),
                    CodeBlockKind::Indented => Value::Null,
                };
                b.open(Node::element(CODE_BLOCK).with_attr("language", language));
            }
            Event::Start(Tag::List(Some(start))) => {
                b.open(Node::element(ORDERED_LIST).with_attr("start", start))
            }
            Event::Start(Tag::List(None)) => b.open(Node::element(BULLET_LIST)),
            Event::Start(Tag::Item) => b.open(Node::element(LIST_ITEM)),

            Event::End(TagEnd::CodeBlock) => {
                b.trim_trailing_newline();
                b.close();
            }
            Event::End(TagEnd::Item) => {
                b.close_implicit();
                if let Some(item) = b.top() {
                    if item.content.is_empty() {
                        item.content.push(Node::element(PARAGRAPH));
                    }
                }
                b.pop();
            }
            Event::End(TagEnd::HtmlBlock) => {
                b.trim_trailing_newline();
                b.close_implicit();
            }
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::BlockQuote(_) | TagEnd::List(_),
            ) => b.close(),

            // ── Marks ──
            Event::Start(Tag::Strong) => b.mark(Mark::new(BOLD)),
            Event::End(TagEnd::Strong) => b.unmark(BOLD),
            Event::Start(Tag::Emphasis) => b.mark(Mark::new(ITALIC)),
            Event::End(TagEnd::Emphasis) => b.unmark(ITALIC),
            Event::Start(Tag::Strikethrough) => b.mark(Mark::new(STRIKE)),
            Event::End(TagEnd::Strikethrough) => b.unmark(STRIKE),
            // Images become their alt text.
            Event::Start(Tag::Link { dest_url, .. }) => b.mark(Mark::link(dest_url.to_string())),
            Event::End(TagEnd::Link) => b.unmark(LINK),

            // ── Content ──
            Event::Text(text) => b.text(&text),
            Event::Code(text) => {
                let mut marks = b.marks.clone();
                marks.push(Mark::new(CODE));
                if !text.is_empty() {
                    b.inline(Node::marked_text(text.to_string(), marks));
                }
            }
            Event::SoftBreak => b.text(" "),
            Event::HardBreak => b.inline(Node::element(HARD_BREAK)),
            Event::Rule => b.leaf_block(Node::element(HORIZONTAL_RULE)),
            Event::Html(html) | Event::InlineHtml(html) => {
                if !options.strip_html {
                    b.text(&html);
                }
            }

            _ => {}
        }
    }

    b.finish()
}
