use crate::theme::Theme;

use super::{Block, Document, Inline, ListKind};

/// Values that vary how markup is produced. Passed explicitly so rendering
/// stays a pure function of its inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub theme: Theme,
}

impl RenderContext {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    fn inline_code_class(&self) -> &'static str {
        match self.theme {
            Theme::Dark => "px-1 py-0.5 rounded text-sm font-mono bg-gray-700 text-blue-300",
            Theme::Light => "px-1 py-0.5 rounded text-sm font-mono bg-gray-100 text-red-600",
        }
    }

    fn quote_class(&self) -> &'static str {
        match self.theme {
            Theme::Dark => "border-l-4 border-gray-600 bg-gray-700 pl-4 py-2 my-2 italic",
            Theme::Light => "border-l-4 border-gray-300 bg-gray-50 pl-4 py-2 my-2 italic",
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render a document. Blocks are separated by `<br>`, so a blank line shows as
/// an extra break.
pub fn render_html(doc: &Document, ctx: &RenderContext) -> String {
    doc.blocks
        .iter()
        .map(|block| render_block(block, ctx))
        .collect::<Vec<_>>()
        .join("<br>")
}

fn render_block(block: &Block, ctx: &RenderContext) -> String {
    match block {
        Block::Heading { level, content } => {
            let class = match level {
                1 => "text-2xl font-bold mt-4 mb-2",
                2 => "text-xl font-bold mt-4 mb-2",
                _ => "text-lg font-bold mt-4 mb-2",
            };
            format!(
                "<h{level} class=\"{class}\">{}</h{level}>",
                render_inlines(content, ctx)
            )
        }
        Block::Quote(content) => format!(
            "<blockquote class=\"{}\">{}</blockquote>",
            ctx.quote_class(),
            render_inlines(content, ctx)
        ),
        Block::List { kind, items } => {
            let (tag, class) = match kind {
                ListKind::Unordered => ("ul", "list-disc list-inside ml-4 space-y-1"),
                ListKind::Ordered => ("ol", "list-decimal list-inside ml-4 space-y-1"),
            };
            let items: String = items
                .iter()
                .map(|item| format!("<li>{}</li>", render_inlines(item, ctx)))
                .collect();
            format!("<{tag} class=\"{class}\">{items}</{tag}>")
        }
        Block::Line(content) => render_inlines(content, ctx),
        Block::Blank => String::new(),
    }
}

fn render_inlines(inlines: &[Inline], ctx: &RenderContext) -> String {
    inlines.iter().map(|inline| render_inline(inline, ctx)).collect()
}

fn render_inline(inline: &Inline, ctx: &RenderContext) -> String {
    match inline {
        Inline::Text(text) => escape_html(text),
        Inline::Strong(inner) => format!(
            "<strong class=\"font-bold\">{}</strong>",
            render_inlines(inner, ctx)
        ),
        Inline::Emphasis(inner) => {
            format!("<em class=\"italic\">{}</em>", render_inlines(inner, ctx))
        }
        Inline::Strikethrough(inner) => format!(
            "<del class=\"line-through\">{}</del>",
            render_inlines(inner, ctx)
        ),
        Inline::Code(code) => format!(
            "<code class=\"{}\">{}</code>",
            ctx.inline_code_class(),
            escape_html(code)
        ),
        Inline::Link { text, url } => format!(
            "<a href=\"{}\" class=\"text-blue-500 hover:text-blue-600 underline\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
            escape_html(url),
            render_inlines(text, ctx)
        ),
    }
}
