//! Terminal rendering of chat messages
//!
//! Replies are parsed with the core markdown parser and turned into styled
//! ratatui lines. The colours come from a [`Palette`] chosen by the session
//! theme, so toggling the theme restyles the whole transcript.

use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use senpai_core::markdown::{Block, Inline, ListKind};
use senpai_core::{
    detect_language, is_code_bearing, parse, split_fenced, Attachment, ImageData, ImageSource,
    Message, Sender, Theme,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub background: Color,
    pub text: Color,
    pub muted: Color,
    pub border: Color,
    pub user: Color,
    pub assistant: Color,
    pub heading: Color,
    pub link: Color,
    pub quote: Color,
    pub code_fg: Color,
    pub code_bg: Color,
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        match theme {
            Theme::Dark => Self {
                background: Color::Black,
                text: Color::White,
                muted: Color::Gray,
                border: Color::DarkGray,
                user: Color::Cyan,
                assistant: Color::LightMagenta,
                heading: Color::LightYellow,
                link: Color::LightBlue,
                quote: Color::Gray,
                code_fg: Color::LightBlue,
                code_bg: Color::DarkGray,
            },
            Theme::Light => Self {
                background: Color::White,
                text: Color::Black,
                muted: Color::DarkGray,
                border: Color::Gray,
                user: Color::Blue,
                assistant: Color::Magenta,
                heading: Color::Black,
                link: Color::Blue,
                quote: Color::DarkGray,
                code_fg: Color::Red,
                code_bg: Color::Gray,
            },
        }
    }

    pub fn base(&self) -> Style {
        Style::default().fg(self.text).bg(self.background)
    }

    fn code(&self) -> Style {
        Style::default().fg(self.code_fg).bg(self.code_bg)
    }
}

/// All lines for one message, including the sender line and a trailing blank.
pub fn message_lines(message: &Message, palette: &Palette, animation_frame: u8) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    let sender_color = match message.sender {
        Sender::User => palette.user,
        Sender::Assistant => palette.assistant,
    };
    lines.push(Line::from(Span::styled(
        format!("{}:", message.sender.display_name()),
        Style::default().fg(sender_color).add_modifier(Modifier::BOLD),
    )));

    if message.is_loading() {
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize % 3) + 1);
        lines.push(Line::from(Span::styled(
            format!("AI sedang mengetik{}", dots),
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::default());
        return lines;
    }

    if let Some(image) = &message.image {
        lines.extend(image_lines(image, palette));
    }

    if message.is_typing() {
        let mut body = markdown_lines(message.visible_text(), palette);
        let cursor = Span::styled("▌", Style::default().fg(palette.link));
        match body.last_mut() {
            Some(last) => last.spans.push(cursor),
            None => body.push(Line::from(cursor)),
        }
        lines.extend(body);
        lines.push(Line::default());
        return lines;
    }

    lines.extend(message.attachments.iter().map(|a| attachment_line(a, palette)));

    if is_code_bearing(&message.text) {
        let segments = split_fenced(&message.text);
        if !segments.preamble.is_empty() {
            lines.extend(markdown_lines(segments.preamble, palette));
        }
        lines.extend(code_block_lines(&message.text, palette));
        if !segments.postamble.is_empty() {
            lines.extend(markdown_lines(segments.postamble, palette));
        }
    } else {
        lines.extend(markdown_lines(&message.text, palette));
    }

    lines.push(Line::default());
    lines
}

/// Boxed code block with the upper-cased language label.
pub fn code_block_lines(text: &str, palette: &Palette) -> Vec<Line<'static>> {
    let label = detect_language(text).to_uppercase();
    let frame = Style::default().fg(palette.muted);
    let code = split_fenced(text).code;

    let mut lines = vec![Line::from(vec![
        Span::styled("┌─ ", frame),
        Span::styled(label, frame.add_modifier(Modifier::BOLD)),
        Span::styled(" ─ Ctrl+Y copy", frame),
    ])];
    for code_line in code.lines() {
        lines.push(Line::from(vec![
            Span::styled("│ ", frame),
            Span::styled(code_line.to_string(), palette.code()),
        ]));
    }
    lines.push(Line::from(Span::styled("└─", frame)));
    lines
}

fn image_lines(image: &ImageData, palette: &Palette) -> Vec<Line<'static>> {
    // Payloads that fail to decode are hidden, like a broken image
    let Some(uri) = image.source_uri() else {
        return Vec::new();
    };

    let location = match &image.source {
        ImageSource::Embedded(_) => format!("{}, {} bytes", image.mime_type, uri.len()),
        ImageSource::Linked(url) => url.clone(),
    };
    let mut lines = vec![Line::from(vec![
        Span::styled("🖼  ", Style::default().fg(palette.muted)),
        Span::styled(image.alt_text(), Style::default().fg(palette.text)),
        Span::styled(format!(" ({})", location), Style::default().fg(palette.muted)),
    ])];

    if let Some(name) = &image.special_recipient {
        lines.push(Line::from(Span::styled(
            format!("✨ Special message for {}", name),
            Style::default().fg(palette.heading).add_modifier(Modifier::BOLD),
        )));
    }
    lines
}

pub fn attachment_line(attachment: &Attachment, palette: &Palette) -> Line<'static> {
    Line::from(vec![
        Span::styled("📎 ", Style::default().fg(palette.muted)),
        Span::styled(attachment.name.clone(), Style::default().fg(palette.text)),
        Span::styled(format!("  {}", attachment.summary()), Style::default().fg(palette.muted)),
    ])
}

pub fn markdown_lines(text: &str, palette: &Palette) -> Vec<Line<'static>> {
    let doc = parse(text);
    let base = Style::default().fg(palette.text);
    let mut lines = Vec::new();

    for block in &doc.blocks {
        match block {
            Block::Heading { level, content } => {
                let mut style = base.fg(palette.heading).add_modifier(Modifier::BOLD);
                if *level == 1 {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                lines.push(Line::from(inline_spans(content, style, palette)));
            }
            Block::Quote(content) => {
                let mut spans = vec![Span::styled("│ ", Style::default().fg(palette.quote))];
                spans.extend(inline_spans(content, base.fg(palette.quote).add_modifier(Modifier::ITALIC), palette));
                lines.push(Line::from(spans));
            }
            Block::List { kind, items } => {
                for (i, item) in items.iter().enumerate() {
                    let marker = match kind {
                        ListKind::Unordered => "  • ".to_string(),
                        ListKind::Ordered => format!("  {}. ", i + 1),
                    };
                    let mut spans = vec![Span::styled(marker, Style::default().fg(palette.muted))];
                    spans.extend(inline_spans(item, base, palette));
                    lines.push(Line::from(spans));
                }
            }
            Block::Line(content) => lines.push(Line::from(inline_spans(content, base, palette))),
            Block::Blank => lines.push(Line::default()),
        }
    }
    lines
}

fn inline_spans(inlines: &[Inline], style: Style, palette: &Palette) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    push_inline_spans(inlines, style, palette, &mut spans);
    spans
}

fn push_inline_spans(inlines: &[Inline], style: Style, palette: &Palette, out: &mut Vec<Span<'static>>) {
    for inline in inlines {
        match inline {
            Inline::Text(text) => out.push(Span::styled(text.clone(), style)),
            Inline::Strong(inner) => {
                push_inline_spans(inner, style.add_modifier(Modifier::BOLD), palette, out)
            }
            Inline::Emphasis(inner) => {
                push_inline_spans(inner, style.add_modifier(Modifier::ITALIC), palette, out)
            }
            Inline::Strikethrough(inner) => {
                push_inline_spans(inner, style.add_modifier(Modifier::CROSSED_OUT), palette, out)
            }
            Inline::Code(code) => out.push(Span::styled(code.clone(), palette.code())),
            Inline::Link { text, url } => {
                let link = style.fg(palette.link).add_modifier(Modifier::UNDERLINED);
                push_inline_spans(text, link, palette, out);
                out.push(Span::styled(format!(" ({})", url), Style::default().fg(palette.muted)));
            }
        }
    }
}

/// Rows the lines occupy once wrapped to `width` columns.
pub fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = width.max(1) as usize;
    let rows: usize = lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum();
    rows.min(u16::MAX as usize) as u16
}
