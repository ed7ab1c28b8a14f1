use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, InputMode, MAX_INPUT_CHARS};
use crate::chat_view::{attachment_line, message_lines, wrapped_height, Palette};

/// Rows the composer may grow to before it scrolls.
const MAX_INPUT_ROWS: u16 = 5;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = Palette::for_theme(app.session.theme());

    let staged_height = if app.session.staged().is_empty() { 0 } else { 3 };
    let input_rows = (app.session.input.split('\n').count() as u16).clamp(1, MAX_INPUT_ROWS);

    // Main layout: header, chat, staged files, composer, footer
    let [header_area, chat_area, staged_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(staged_height),
        Constraint::Length(input_rows + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area, &palette);
    if staged_height > 0 {
        render_staged(app, frame, staged_area, &palette);
    }
    render_input(app, frame, input_area, &palette);
    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    if let Some(alert) = app.alerts.first() {
        render_alert(alert, app.alerts.len() - 1, frame, area);
    } else if app.input_mode == InputMode::AttachPath {
        render_attach_prompt(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let theme = app.session.theme();
    let theme_icon = match theme {
        senpai_core::Theme::Light => "☀",
        senpai_core::Theme::Dark => "☾",
    };

    let title = Line::from(vec![
        Span::styled(" 🤖 Senpai AI ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("{} {} ", theme_icon, theme.display_name()),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect, palette: &Palette) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .title(" Chat ");

    let lines: Vec<Line> = if app.session.messages().is_empty() {
        vec![Line::from(Span::styled(
            "Mulai percakapan dengan Senpai AI...",
            Style::default().fg(palette.muted),
        ))]
    } else {
        app.session
            .messages()
            .iter()
            .flat_map(|message| message_lines(message, palette, app.animation_frame))
            .collect()
    };

    app.chat_total_lines = wrapped_height(&lines, app.chat_width);
    let max_scroll = app.chat_total_lines.saturating_sub(app.chat_height);
    if app.follow_bottom || app.chat_scroll > max_scroll {
        app.chat_scroll = max_scroll;
    }

    let chat = Paragraph::new(Text::from(lines))
        .style(palette.base())
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_staged(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .title(format!(" Lampiran ({}) ", app.session.staged().len()));

    let mut spans = Vec::new();
    for attachment in app.session.staged() {
        spans.extend(attachment_line(attachment, palette).spans);
        spans.push(Span::raw("   "));
    }

    let staged = Paragraph::new(Line::from(spans))
        .style(palette.base())
        .block(block);
    frame.render_widget(staged, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, palette: &Palette) {
    let composing = app.input_mode == InputMode::Compose && app.alerts.is_empty();
    let disabled = app.session.interaction_disabled();
    let border_color = if disabled {
        Color::DarkGray
    } else if composing {
        Color::Yellow
    } else {
        palette.border
    };

    let status = if app.session.is_loading() {
        "Menunggu balasan..."
    } else if app.session.is_typing() {
        "AI sedang mengetik..."
    } else {
        "Pesan"
    };
    let title = format!(
        " {} · {}/{} ",
        status,
        app.session.input.chars().count(),
        MAX_INPUT_CHARS
    );

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    if app.session.input.is_empty() {
        let placeholder = Paragraph::new(Span::styled(
            "Ketik pesan... (Ctrl+O untuk lampirkan file)",
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        ))
        .style(palette.base())
        .block(input_block);
        frame.render_widget(placeholder, area);
        if composing && !disabled {
            frame.set_cursor_position((area.x + 1, area.y + 1));
        }
        return;
    }

    // Cursor row and column, in chars
    let before_cursor: String = app.session.input.chars().take(app.cursor).collect();
    let cursor_row = before_cursor.matches('\n').count();
    let cursor_col = before_cursor
        .rsplit('\n')
        .next()
        .map(|line| line.chars().count())
        .unwrap_or(0);

    // Calculate scroll offsets to keep cursor visible
    let row_offset = if inner_height == 0 {
        0
    } else {
        (cursor_row + 1).saturating_sub(inner_height)
    };
    let col_offset = if inner_width == 0 {
        0
    } else if cursor_col >= inner_width {
        cursor_col - inner_width + 1
    } else {
        0
    };

    let visible: Vec<Line> = app
        .session
        .input
        .split('\n')
        .skip(row_offset)
        .take(inner_height)
        .map(|line| Line::from(line.chars().skip(col_offset).take(inner_width).collect::<String>()))
        .collect();

    let input = Paragraph::new(visible)
        .style(palette.base().fg(palette.user))
        .block(input_block);
    frame.render_widget(input, area);

    if composing {
        frame.set_cursor_position((
            area.x + 1 + (cursor_col - col_offset) as u16,
            area.y + 1 + (cursor_row - row_offset) as u16,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Compose => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::AttachPath => (" ATTACH ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut spans = vec![Span::styled(mode_text, mode_style)];

    if let Some(notice) = &app.notice {
        spans.push(Span::styled(
            format!(" {} ", notice),
            Style::default().bg(Color::Green).fg(Color::Black),
        ));
    }

    let hints = if !app.alerts.is_empty() {
        vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" dismiss ", label_style),
        ]
    } else {
        match app.input_mode {
            InputMode::Compose => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" S-Enter ", key_style),
                Span::styled(" newline ", label_style),
                Span::styled(" ^O ", key_style),
                Span::styled(" attach ", label_style),
                Span::styled(" ^X ", key_style),
                Span::styled(" clear files ", label_style),
                Span::styled(" ^T ", key_style),
                Span::styled(" theme ", label_style),
                Span::styled(" ^Y ", key_style),
                Span::styled(" copy code ", label_style),
                Span::styled(" PgUp/PgDn ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" ^C ", key_style),
                Span::styled(" quit ", label_style),
            ],
            InputMode::AttachPath => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" attach ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" cancel ", label_style),
            ],
        }
    };
    spans.extend(hints);

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width.saturating_sub(width)) / 2,
        area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    )
}

fn render_alert(message: &str, pending: usize, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 60, 7);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Peringatan ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    let body = Paragraph::new(message.to_string())
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: true });
    frame.render_widget(body, Rect::new(inner.x, inner.y, inner.width, inner.height.saturating_sub(1)));

    let status = if pending > 0 {
        format!("Enter to dismiss ({} more)", pending)
    } else {
        "Enter to dismiss".to_string()
    };
    let status = Paragraph::new(status).style(Style::default().fg(Color::DarkGray));
    let status_y = inner.y + inner.height.saturating_sub(1);
    frame.render_widget(status, Rect::new(inner.x, status_y, inner.width, 1));
}

fn render_attach_prompt(app: &App, frame: &mut Frame, area: Rect) {
    let popup_area = centered(area, 70, 7);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Lampirkan file ");

    let inner = block.inner(popup_area);
    frame.render_widget(block, popup_area);

    // Instructions
    let instructions = Paragraph::new("Path file (pisahkan dengan spasi). Enter untuk lampirkan, Esc untuk batal.")
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 2));

    // Input field, scrolled so the end stays visible
    let input_area = Rect::new(inner.x, inner.y + 3, inner.width, 1);
    let width = input_area.width.max(1) as usize;
    let len = app.attach_input.chars().count();
    let offset = (len + 1).saturating_sub(width);
    let visible: String = app.attach_input.chars().skip(offset).collect();

    let input = Paragraph::new(visible).style(Style::default().fg(Color::Cyan));
    frame.render_widget(input, input_area);

    let cursor_x = (len - offset).min(width.saturating_sub(1)) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use senpai_core::{AskResponse, Config, FileCandidate};
    use tokio::sync::mpsc;

    fn test_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(&Config::default(), tx)
    }

    fn draw(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[tokio::test]
    async fn test_renders_empty_chat() {
        let mut app = test_app();
        let screen = draw(&mut app);
        assert!(screen.contains("Senpai AI"));
        assert!(screen.contains("Mulai percakapan"));
        assert!(screen.contains("Ketik pesan"));
    }

    #[tokio::test]
    async fn test_follows_bottom_of_long_chat() {
        let mut app = test_app();
        for i in 0..30 {
            app.session.input = format!("pesan {}", i);
            app.session.begin_send().unwrap();
            app.session.complete_send(Ok(AskResponse {
                response: format!("balasan {}", i),
                ..AskResponse::default()
            }));
            let last = app.session.messages().len() - 1;
            app.session.finish_reveal(last);
        }

        let screen = draw(&mut app);
        assert!(app.chat_total_lines > app.chat_height);
        assert_eq!(app.chat_scroll, app.chat_total_lines - app.chat_height);
        assert!(screen.contains("balasan 29"));
        assert!(!screen.contains("pesan 0"));
    }

    #[tokio::test]
    async fn test_input_title_counts_characters() {
        let mut app = test_app();
        assert!(draw(&mut app).contains("Pesan · 0/2000"));

        app.session.input = "halo ✨".to_string();
        app.cursor = 6;
        assert!(draw(&mut app).contains("Pesan · 6/2000"));
    }

    #[tokio::test]
    async fn test_alert_popup_and_staged_strip() {
        let mut app = test_app();
        app.session
            .stage(FileCandidate::new("notes.txt", "text/plain", b"hi".to_vec()))
            .unwrap();
        app.alerts.push("File \"big.pdf\" terlalu besar. Maksimal ukuran file adalah 5MB.".to_string());

        let screen = draw(&mut app);
        assert!(screen.contains("Lampiran (1)"));
        assert!(screen.contains("notes.txt"));
        assert!(screen.contains("Peringatan"));
        assert!(screen.contains("terlalu besar"));
    }
}
