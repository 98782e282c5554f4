//! Body text rendering
//!
//! Stored bodies are author-entered text and are never exposed raw: every
//! body passes through a `TextRenderer` before it lands in a payload.

use pulldown_cmark::{html, Event, Parser};

/// Converts stored rich-text bodies into safe display markup
pub trait TextRenderer: Send + Sync {
    /// Render a body as block markup
    fn render(&self, raw: &str) -> String;

    /// Render a single-line value (subjects, names) with markup escaped
    fn render_inline(&self, raw: &str) -> String;
}

/// Markdown renderer with raw HTML escaped
pub struct MarkdownRenderer;

impl TextRenderer for MarkdownRenderer {
    fn render(&self, raw: &str) -> String {
        // Author-entered HTML is demoted to text; markdown is kept.
        let parser = Parser::new(raw).map(|event| match event {
            Event::Html(markup) => Event::Text(markup),
            Event::InlineHtml(markup) => Event::Text(markup),
            other => other,
        });

        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);
        html_output
    }

    fn render_inline(&self, raw: &str) -> String {
        escape(raw.split_whitespace().collect::<Vec<_>>().join(" ").as_str())
    }
}

/// Escaping-only renderer, used where markup is unwanted and in tests
pub struct PlainRenderer;

impl TextRenderer for PlainRenderer {
    fn render(&self, raw: &str) -> String {
        escape(raw)
    }

    fn render_inline(&self, raw: &str) -> String {
        escape(raw)
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
