//! Markdown → styled spans for the review preview.
//!
//! The preview is a flat run of spans with newlines, list bullets and quote
//! markers laid out as text. Those layout spans are flagged `synthetic` so
//! callers can tell them apart from the response's own text.

use pulldown_cmark::{Event, Parser, Tag, TagEnd};

use crate::{ConverterOptions, heading_level_to_u8, parser_options};

/// A styled text span parsed from markdown.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RichSpan {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    pub code: bool,
    /// Link target when the span is link text.
    pub link: Option<String>,
    pub heading_level: Option<u8>,
    pub code_block: bool,
    /// Layout text (newlines, bullets, rules) that is not part of the content.
    pub synthetic: bool,
}

impl RichSpan {
    fn layout(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            synthetic: true,
            ..Self::default()
        }
    }
}

const RULE: &str = "────────────────────\n";

/// Style stack while walking events.
#[derive(Default)]
struct SpanWriter {
    spans: Vec<RichSpan>,
    bold: u32,
    italic: u32,
    strike: u32,
    links: Vec<String>,
    heading: Option<u8>,
    code_block: bool,
    quote_depth: usize,
    /// `None` = bullet list, `Some(n)` = ordered list at item `n`.
    lists: Vec<Option<u64>>,
    pending_bullet: bool,
}

impl SpanWriter {
    fn layout(&mut self, text: &str) {
        self.spans.push(RichSpan::layout(text));
    }

    fn content(&mut self, text: &str, code: bool) {
        if self.quote_depth > 0 && self.at_line_start() {
            self.layout(&"> ".repeat(self.quote_depth));
        }
        if self.pending_bullet {
            let indent = "  ".repeat(self.lists.len().saturating_sub(1));
            let prefix = match self.lists.last() {
                Some(Some(n)) => format!("{indent}{n}. "),
                _ => format!("{indent}• "),
            };
            self.layout(&prefix);
            self.pending_bullet = false;
        }
        self.spans.push(RichSpan {
            text: text.to_string(),
            bold: self.bold > 0,
            italic: self.italic > 0,
            strike: self.strike > 0,
            code,
            link: self.links.last().cloned(),
            heading_level: self.heading,
            code_block: self.code_block,
            synthetic: false,
        });
    }

    /// Blank line before a block, unless at the start or already separated.
    fn block_gap(&mut self) {
        if !self.spans.is_empty() && self.trailing_newlines() < 2 {
            self.layout("\n");
        }
    }

    /// The closing newline of a code block is layout, not code.
    fn trim_code_block(&mut self) {
        while let Some(last) = self.spans.last_mut() {
            if !last.code_block || last.synthetic {
                break;
            }
            let trimmed = last.text.trim_end_matches('\n').len();
            last.text.truncate(trimmed);
            if !last.text.is_empty() {
                break;
            }
            self.spans.pop();
        }
    }

    fn at_line_start(&self) -> bool {
        self.spans.is_empty() || self.trailing_newlines() > 0
    }

    fn trailing_newlines(&self) -> usize {
        let mut count = 0;
        for span in self.spans.iter().rev() {
            let n = span.text.chars().rev().take_while(|c| *c == '\n').count();
            count += n;
            if n < span.text.chars().count() {
                break;
            }
        }
        count
    }
}

pub(crate) fn render(markdown: &str, options: &ConverterOptions) -> Vec<RichSpan> {
    let mut w = SpanWriter::default();

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            // ── Blocks ──
            Event::Start(Tag::Heading { level, .. }) => {
                w.block_gap();
                w.heading = Some(heading_level_to_u8(level));
            }
            Event::End(TagEnd::Heading(_)) => {
                w.heading = None;
                w.layout("\n");
            }

            Event::Start(Tag::Paragraph) => {
                if w.lists.is_empty() {
                    w.block_gap();
                }
            }
            Event::End(TagEnd::Paragraph) => w.layout("\n"),

            Event::Start(Tag::CodeBlock(_)) => {
                w.block_gap();
                w.code_block = true;
            }
            Event::End(TagEnd::CodeBlock) => {
                w.trim_code_block();
                w.code_block = false;
                w.layout("\n");
            }

            Event::Start(Tag::List(first)) => w.lists.push(first),
            Event::End(TagEnd::List(_)) => {
                w.lists.pop();
            }

            Event::Start(Tag::Item) => w.pending_bullet = true,
            Event::End(TagEnd::Item) => {
                if !w.at_line_start() {
                    w.layout("\n");
                }
                if let Some(Some(n)) = w.lists.last_mut() {
                    *n += 1;
                }
            }

            Event::Start(Tag::BlockQuote(_)) => w.quote_depth += 1,
            Event::End(TagEnd::BlockQuote(_)) => w.quote_depth = w.quote_depth.saturating_sub(1),

            // ── Inline ──
            Event::Start(Tag::Strong) => w.bold += 1,
            Event::End(TagEnd::Strong) => w.bold = w.bold.saturating_sub(1),
            Event::Start(Tag::Emphasis) => w.italic += 1,
            Event::End(TagEnd::Emphasis) => w.italic = w.italic.saturating_sub(1),
            Event::Start(Tag::Strikethrough) => w.strike += 1,
            Event::End(TagEnd::Strikethrough) => w.strike = w.strike.saturating_sub(1),

            // Images show their alt text only.
            Event::Start(Tag::Link { dest_url, .. }) => w.links.push(dest_url.to_string()),
            Event::End(TagEnd::Link) => {
                w.links.pop();
            }

            // ── Content ──
            Event::Text(text) => w.content(&text, false),
            Event::Code(text) => w.content(&text, true),
            Event::SoftBreak | Event::HardBreak => w.layout("\n"),
            Event::Rule => {
                w.block_gap();
                w.layout(RULE);
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                if !options.strip_html {
                    w.content(&html, false);
                }
            }

            _ => {}
        }
    }

    w.spans
}

#[cfg(test)]
mod tests {
    use super::*;

    fn preview(md: &str) -> Vec<RichSpan> {
        render(md, &ConverterOptions::default())
    }

    fn visible(spans: &[RichSpan]) -> String {
        spans.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn plain_text_passthrough() {
        let spans = preview("hello world");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "hello world");
        assert!(!spans[0].bold && !spans[0].synthetic);
        assert!(spans[1].synthetic);
    }

    #[test]
    fn bold_italic_strike_code() {
        let spans = preview("**b** *i* ~~s~~ `c`");
        assert!(spans.iter().any(|s| s.text == "b" && s.bold));
        assert!(spans.iter().any(|s| s.text == "i" && s.italic));
        assert!(spans.iter().any(|s| s.text == "s" && s.strike));
        assert!(spans.iter().any(|s| s.text == "c" && s.code));
    }

    #[test]
    fn heading_carries_level_not_bold() {
        let spans = preview("## Title **b**");
        let title = spans.iter().find(|s| s.text == "Title ").unwrap();
        assert_eq!(title.heading_level, Some(2));
        assert!(!title.bold);
        let b = spans.iter().find(|s| s.text == "b").unwrap();
        assert!(b.bold);
    }

    #[test]
    fn list_prefixes_are_synthetic() {
        let spans = preview("- one\n- two\n\n3. three\n4. four");
        let text = visible(&spans);
        assert!(text.contains("• one\n• two\n"));
        assert!(text.contains("3. three\n4. four\n"));
        let bullet = spans.iter().find(|s| s.text == "• ").unwrap();
        assert!(bullet.synthetic);
    }

    #[test]
    fn paragraphs_are_separated_by_blank_line() {
        assert_eq!(visible(&preview("one\n\ntwo")), "one\n\ntwo\n");
    }

    #[test]
    fn link_text_carries_target() {
        let spans = preview("[home](https://example.com)");
        assert_eq!(spans[0].text, "home");
        assert_eq!(spans[0].link.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn code_block_spans() {
        let spans = preview("```\nfn main() {}\n```\n\nafter");
        assert!(spans.iter().any(|s| s.code_block && s.text.contains("fn main")));
        let code: String = spans
            .iter()
            .filter(|s| s.code_block)
            .map(|s| s.text.as_str())
            .collect();
        assert_eq!(code, "fn main() {}");
        assert_eq!(visible(&spans), "fn main() {}\n\nafter\n");
    }

    #[test]
    fn linked_image_shows_alt_text_with_link() {
        let spans = preview("[![logo](https://img.example/a.png)](https://example.com)");
        assert_eq!(spans[0].text, "logo");
        assert_eq!(spans[0].link.as_deref(), Some("https://example.com"));

        let bare = preview("![logo](https://img.example/a.png)");
        assert_eq!(bare[0].text, "logo");
        assert_eq!(bare[0].link, None);
    }

    #[test]
    fn block_quote_lines_are_marked() {
        assert_eq!(visible(&preview("> quoted")), "> quoted\n");
    }

    #[test]
    fn raw_html_kept_or_stripped() {
        let kept = preview("a <b>x</b>");
        assert!(visible(&kept).contains("<b>"));

        let stripped = render("a <b>x</b>", &ConverterOptions { strip_html: true });
        assert_eq!(visible(&stripped), "a x\n");
    }
}
