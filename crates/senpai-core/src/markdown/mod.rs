//! Markdown for assistant replies
//!
//! Replies use a small markdown dialect: level 1-3 headings, bold, italic,
//! strikethrough, inline code, links, flat bullet and numbered lists,
//! single-line blockquotes, and hard line breaks. Text is parsed once into a
//! [`Document`] tree and then rendered, so one construct never re-matches the
//! output of another.
//!
//! Nested lists, emphasis that straddles other constructs, and backslash
//! escapes are not supported.

mod html;
mod parse;

pub use html::{escape_html, render_html, RenderContext};
pub use parse::parse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, content: Vec<Inline> },
    Quote(Vec<Inline>),
    List { kind: ListKind, items: Vec<Vec<Inline>> },
    Line(Vec<Inline>),
    Blank,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(Vec<Inline>),
    Emphasis(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Code(String),
    Link { text: Vec<Inline>, url: String },
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| matches!(b, Block::Blank))
    }

    /// Markup-free rendering for plain terminals.
    pub fn plain_text(&self) -> String {
        let mut lines = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Heading { content, .. } | Block::Line(content) => {
                    lines.push(inline_plain_text(content));
                }
                Block::Quote(content) => lines.push(format!("> {}", inline_plain_text(content))),
                Block::List { kind, items } => {
                    for (i, item) in items.iter().enumerate() {
                        let marker = match kind {
                            ListKind::Unordered => "•".to_string(),
                            ListKind::Ordered => format!("{}.", i + 1),
                        };
                        lines.push(format!("{} {}", marker, inline_plain_text(item)));
                    }
                }
                Block::Blank => lines.push(String::new()),
            }
        }
        lines.join("\n")
    }
}

pub fn inline_plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Strong(inner) | Inline::Emphasis(inner) | Inline::Strikethrough(inner) => {
                out.push_str(&inline_plain_text(inner));
            }
            Inline::Link { text, url } => {
                out.push_str(&inline_plain_text(text));
                out.push_str(" (");
                out.push_str(url);
                out.push(')');
            }
        }
    }
    out
}

/// Parse and render in one go.
pub fn to_html(text: &str, ctx: &RenderContext) -> String {
    render_html(&parse(text), ctx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_flattens_markup() {
        let doc = parse("# Title\n**bold** [site](http://x)\n- a\n- b\n1. one\n> said");
        assert_eq!(
            doc.plain_text(),
            "Title\nbold site (http://x)\n• a\n• b\n1. one\n> said"
        );
    }

    #[test]
    fn test_blank_document() {
        assert!(parse("\n\n").is_empty());
        assert!(!parse("x").is_empty());
    }
}
