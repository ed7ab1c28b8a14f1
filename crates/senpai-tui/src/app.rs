use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use senpai_core::{
    AskClient, AskResponse, ChatSession, Config, FileCandidate, RevealProgress, RevealTimer,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::tui::AppEvent;

/// Ticks (300ms each) a transient notice stays on screen.
const NOTICE_TICKS: u8 = 7;

/// Longest message the composer accepts, in characters.
pub const MAX_INPUT_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Compose,
    AttachPath,
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub session: ChatSession,
    pub client: AskClient,

    // Composer
    pub cursor: usize, // cursor position in session.input, in chars

    // Attach prompt
    pub attach_input: String,

    // Blocking alerts, shown one at a time
    pub alerts: Vec<String>,

    // Transient status line message
    pub notice: Option<String>,
    notice_ticks: u8,

    // Chat scrolling (updated during render)
    pub chat_scroll: u16,
    pub follow_bottom: bool,
    pub chat_height: u16,
    pub chat_width: u16,
    pub chat_total_lines: u16,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    reveal_interval: Duration,
    reveal_timers: HashMap<usize, RevealTimer>,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: &Config, events: UnboundedSender<AppEvent>) -> Self {
        let base_url = config.backend_base();
        if base_url.is_empty() {
            warn!("no backend URL configured; set SENPAI_BACKEND_URL or backend_url in the config file");
        }

        Self {
            should_quit: false,
            input_mode: InputMode::Compose,
            session: ChatSession::new(config.initial_theme()),
            client: AskClient::new(&base_url),
            cursor: 0,
            attach_input: String::new(),
            alerts: Vec::new(),
            notice: None,
            notice_ticks: 0,
            chat_scroll: 0,
            follow_bottom: true,
            chat_height: 0,
            chat_width: 0,
            chat_total_lines: 0,
            animation_frame: 0,
            reveal_interval: config.reveal_interval(),
            reveal_timers: HashMap::new(),
            events,
        }
    }

    /// Submit the composer. The request runs in the background and reports
    /// back through `AppEvent::Response`.
    pub fn send_message(&mut self) {
        let Some(outbound) = self.session.begin_send() else {
            return;
        };
        self.cursor = 0;
        self.follow_bottom = true;

        let client = self.client.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = client.ask(&outbound).await;
            let _ = tx.send(AppEvent::Response(result));
        });
    }

    pub fn handle_response(&mut self, result: anyhow::Result<AskResponse>) {
        if let Some(index) = self.session.complete_send(result) {
            self.start_reveal(index);
        }
        self.follow_bottom = true;
    }

    fn start_reveal(&mut self, index: usize) {
        let tx = self.events.clone();
        let timer = RevealTimer::spawn(self.reveal_interval, move || {
            tx.send(AppEvent::Reveal(index)).is_ok()
        });
        self.reveal_timers.insert(index, timer);
    }

    pub fn on_reveal_tick(&mut self, index: usize) {
        match self.session.advance_reveal(index) {
            RevealProgress::Advanced => {}
            RevealProgress::Completed | RevealProgress::Idle => {
                // Dropping the timer stops it
                self.reveal_timers.remove(&index);
            }
        }
    }

    #[cfg(test)]
    pub fn active_reveals(&self) -> usize {
        self.reveal_timers.len()
    }

    /// Stage one or more files typed into the attach prompt. Anything that
    /// can't be read or fails validation becomes an alert.
    pub async fn attach_from_input(&mut self) {
        let raw = std::mem::take(&mut self.attach_input);
        let paths = split_paths(&raw);
        if paths.is_empty() {
            return;
        }

        let mut candidates = Vec::new();
        for path in paths {
            match FileCandidate::from_path(&path).await {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "could not read attachment");
                    self.alerts.push(e.to_string());
                }
            }
        }

        let report = self.session.stage_all(candidates);
        for rejection in report.rejected {
            self.alerts.push(rejection.to_string());
        }
        if !report.accepted.is_empty() {
            self.set_notice(format!("{} file(s) attached", report.accepted.len()));
        }
    }

    /// Drop the most recently staged file.
    pub fn remove_last_attachment(&mut self) {
        let Some(last) = self.session.staged().last().map(|a| a.id.clone()) else {
            return;
        };
        self.session.remove_attachment(&last);
    }

    pub fn dismiss_alert(&mut self) {
        if !self.alerts.is_empty() {
            self.alerts.remove(0);
        }
    }

    pub fn toggle_theme(&mut self) {
        if self.session.toggle_theme() {
            info!(theme = self.session.theme().as_str(), "theme changed");
        } else {
            self.set_notice("Theme is locked while the reply is typing");
        }
    }

    pub fn copy_last_code(&mut self) {
        match self.session.last_code_block() {
            Some(code) => {
                if copy_to_clipboard(&code) {
                    self.set_notice("Copied!");
                } else {
                    warn!("no clipboard command available");
                    self.set_notice("Gagal copy ke clipboard");
                }
            }
            None => self.set_notice("No code block to copy"),
        }
    }

    pub fn set_notice(&mut self, text: impl Into<String>) {
        self.notice = Some(text.into());
        self.notice_ticks = NOTICE_TICKS;
    }

    pub fn tick(&mut self) {
        self.animation_frame = (self.animation_frame + 1) % 3;
        if self.notice_ticks > 0 {
            self.notice_ticks -= 1;
            if self.notice_ticks == 0 {
                self.notice = None;
            }
        }
    }

    fn max_scroll(&self) -> u16 {
        self.chat_total_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_bottom = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.max_scroll();
        self.chat_scroll = (self.chat_scroll + lines).min(max);
        self.follow_bottom = self.chat_scroll >= max;
    }

    pub fn half_page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }
}

/// The whole input if it names an existing file, otherwise one path per
/// whitespace-separated word. A leading `~/` expands to the home directory.
fn split_paths(raw: &str) -> Vec<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    let whole = expand_home(trimmed);
    if whole.exists() {
        return vec![whole];
    }
    trimmed.split_whitespace().map(expand_home).collect()
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

/// Hand `text` to the first clipboard tool that takes it.
fn copy_to_clipboard(text: &str) -> bool {
    const COMMANDS: [(&str, &[&str]); 4] = [
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
    ];

    COMMANDS.iter().any(|(program, args)| pipe_to(program, args, text))
}

/// Run `program` with `text` on stdin. True only if the whole text was
/// written and the program exited successfully.
fn pipe_to(program: &str, args: &[&str], text: &str) -> bool {
    use std::io::Write;
    use std::process::{Command, Stdio};

    let Ok(mut child) = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    else {
        return false;
    };

    // stdin is dropped before waiting so the tool sees EOF
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(text.as_bytes()).is_ok(),
        None => false,
    };
    if !written {
        let _ = child.kill();
        let _ = child.wait();
        warn!(program, "clipboard write failed");
        return false;
    }

    match child.wait() {
        Ok(status) if status.success() => true,
        Ok(status) => {
            warn!(program, %status, "clipboard tool failed");
            false
        }
        Err(e) => {
            warn!(program, error = %e, "clipboard tool failed");
            false
        }
    }
}
