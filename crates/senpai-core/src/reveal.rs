use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Delay between revealed characters.
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(30);

/// Typewriter cursor over a message text, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reveal {
    cursor: usize,
    total: usize,
}

impl Reveal {
    pub fn new(text: &str) -> Self {
        Self {
            cursor: 0,
            total: text.chars().count(),
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.total
    }

    /// Show one more character. Returns true once everything is visible.
    pub fn step(&mut self) -> bool {
        if self.cursor < self.total {
            self.cursor += 1;
        }
        self.is_complete()
    }

    /// Revealed prefix of `text`, which must be the text this cursor was made for.
    pub fn visible<'a>(&self, text: &'a str) -> &'a str {
        match text.char_indices().nth(self.cursor) {
            Some((byte_idx, _)) => &text[..byte_idx],
            None => text,
        }
    }
}

/// Recurring tick driving a reveal. The task stops when the callback returns
/// false and is aborted when the timer is dropped.
#[derive(Debug)]
pub struct RevealTimer {
    handle: JoinHandle<()>,
}

impl RevealTimer {
    pub fn spawn<F>(period: Duration, mut on_tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !on_tick() {
                    break;
                }
            }
        });

        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for RevealTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
