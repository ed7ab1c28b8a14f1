use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, InputMode, MAX_INPUT_CHARS};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key).await?,
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
        AppEvent::Reveal(index) => app.on_reveal_tick(index),
        AppEvent::Response(result) => app.handle_response(result),
    }
    Ok(())
}

async fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return Ok(());
    }

    // Alerts block everything until dismissed
    if !app.alerts.is_empty() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.dismiss_alert();
        }
        return Ok(());
    }

    match app.input_mode {
        InputMode::Compose => handle_compose(app, key),
        InputMode::AttachPath => handle_attach_prompt(app, key).await,
    }

    Ok(())
}

fn handle_compose(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Scrolling and read-only actions stay available while a reply is pending
    match key.code {
        KeyCode::PageUp => return app.scroll_up(app.half_page()),
        KeyCode::PageDown => return app.scroll_down(app.half_page()),
        KeyCode::Up if app.session.input.is_empty() => return app.scroll_up(1),
        KeyCode::Down if app.session.input.is_empty() => return app.scroll_down(1),
        KeyCode::Char('y') if ctrl => return app.copy_last_code(),
        KeyCode::Char('t') if ctrl => return app.toggle_theme(),
        _ => {}
    }

    if app.session.interaction_disabled() {
        return;
    }

    match key.code {
        KeyCode::Enter
            if key.modifiers.contains(KeyModifiers::SHIFT)
                || key.modifiers.contains(KeyModifiers::ALT) =>
        {
            insert_char(app, '\n');
        }
        KeyCode::Enter => app.send_message(),
        KeyCode::Char('o') if ctrl => {
            app.attach_input.clear();
            app.input_mode = InputMode::AttachPath;
        }
        KeyCode::Char('x') if ctrl => app.session.clear_attachments(),
        KeyCode::Char('d') if ctrl => app.remove_last_attachment(),
        KeyCode::Char('u') if ctrl => {
            app.session.input.clear();
            app.cursor = 0;
        }
        KeyCode::Char(c) if !ctrl => insert_char(app, c),
        KeyCode::Backspace => {
            if app.cursor > 0 {
                app.cursor -= 1;
                let byte_idx = char_to_byte_index(&app.session.input, app.cursor);
                app.session.input.remove(byte_idx);
            }
        }
        KeyCode::Delete => {
            if app.cursor < app.session.input.chars().count() {
                let byte_idx = char_to_byte_index(&app.session.input, app.cursor);
                app.session.input.remove(byte_idx);
            }
        }
        KeyCode::Left => app.cursor = app.cursor.saturating_sub(1),
        KeyCode::Right => {
            app.cursor = (app.cursor + 1).min(app.session.input.chars().count());
        }
        KeyCode::Home => app.cursor = 0,
        KeyCode::End => app.cursor = app.session.input.chars().count(),
        _ => {}
    }
}

fn insert_char(app: &mut App, c: char) {
    if app.session.input.chars().count() >= MAX_INPUT_CHARS {
        return;
    }
    let byte_idx = char_to_byte_index(&app.session.input, app.cursor);
    app.session.input.insert(byte_idx, c);
    app.cursor += 1;
}

async fn handle_attach_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.attach_input.clear();
            app.input_mode = InputMode::Compose;
        }
        KeyCode::Enter => {
            app.input_mode = InputMode::Compose;
            app.attach_from_input().await;
        }
        KeyCode::Backspace => {
            app.attach_input.pop();
        }
        KeyCode::Char(c) => app.attach_input.push(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use senpai_core::{AskResponse, Config};
    use tokio::sync::mpsc;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn test_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        App::new(&Config::default(), tx)
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key(app, key(KeyCode::Char(c))).await.unwrap();
        }
    }

    #[test]
    fn test_char_to_byte_index() {
        assert_eq!(char_to_byte_index("aé✨b", 0), 0);
        assert_eq!(char_to_byte_index("aé✨b", 2), 3);
        assert_eq!(char_to_byte_index("aé✨b", 3), 6);
        assert_eq!(char_to_byte_index("aé✨b", 10), 7);
    }

    #[tokio::test]
    async fn test_editing_is_utf8_safe() {
        let mut app = test_app();
        type_text(&mut app, "hé✨").await;
        handle_key(&mut app, key(KeyCode::Left)).await.unwrap();
        handle_key(&mut app, key(KeyCode::Backspace)).await.unwrap();
        assert_eq!(app.session.input, "h✨");
        assert_eq!(app.cursor, 1);

        handle_key(&mut app, key(KeyCode::Delete)).await.unwrap();
        assert_eq!(app.session.input, "h");
    }

    #[tokio::test]
    async fn test_shift_enter_inserts_newline() {
        let mut app = test_app();
        type_text(&mut app, "a").await;
        handle_key(&mut app, KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT)).await.unwrap();
        type_text(&mut app, "b").await;
        assert_eq!(app.session.input, "a\nb");
        assert!(app.session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_enter_on_empty_input_sends_nothing() {
        let mut app = test_app();
        type_text(&mut app, "   ").await;
        handle_key(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert!(app.session.messages().is_empty());
    }

    #[tokio::test]
    async fn test_typing_is_ignored_while_loading() {
        let mut app = test_app();
        type_text(&mut app, "hi").await;
        handle_key(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert!(app.session.is_loading());

        type_text(&mut app, "more").await;
        assert!(app.session.input.is_empty());

        handle_key(&mut app, ctrl('o')).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Compose);
    }

    #[tokio::test]
    async fn test_attach_prompt_escape_cancels() {
        let mut app = test_app();
        handle_key(&mut app, ctrl('o')).await.unwrap();
        assert_eq!(app.input_mode, InputMode::AttachPath);
        type_text(&mut app, "/tmp/x").await;
        assert_eq!(app.attach_input, "/tmp/x");

        handle_key(&mut app, key(KeyCode::Esc)).await.unwrap();
        assert_eq!(app.input_mode, InputMode::Compose);
        assert!(app.attach_input.is_empty());
    }

    #[tokio::test]
    async fn test_alert_blocks_input_until_dismissed() {
        let mut app = test_app();
        app.alerts.push("Format file \"x\" tidak didukung.".to_string());
        type_text(&mut app, "a").await;
        assert!(app.session.input.is_empty());

        handle_key(&mut app, key(KeyCode::Enter)).await.unwrap();
        assert!(app.alerts.is_empty());
        type_text(&mut app, "a").await;
        assert_eq!(app.session.input, "a");
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_from_attach_prompt() {
        let mut app = test_app();
        handle_key(&mut app, ctrl('o')).await.unwrap();
        handle_key(&mut app, ctrl('c')).await.unwrap();
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_composer_stops_at_char_limit() {
        let mut app = test_app();
        app.session.input = "é".repeat(MAX_INPUT_CHARS - 1);
        app.cursor = MAX_INPUT_CHARS - 1;

        type_text(&mut app, "ab").await;
        assert_eq!(app.session.input.chars().count(), MAX_INPUT_CHARS);
        assert!(app.session.input.ends_with("éa"));
        assert_eq!(app.cursor, MAX_INPUT_CHARS);
    }

    #[tokio::test]
    async fn test_response_event_replaces_placeholder() {
        let mut app = test_app();
        app.session.input = "hi".to_string();
        app.session.begin_send().unwrap();

        let response = AskResponse {
            response: "ok".to_string(),
            ..AskResponse::default()
        };
        handle_event(&mut app, AppEvent::Response(Ok(response))).await.unwrap();
        assert!(!app.session.is_loading());
        assert!(app.session.is_typing());
    }
}
