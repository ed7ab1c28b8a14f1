//! Conversation state: messages, the composer, staged files and theme.

use anyhow::Result;
use tracing::{debug, error};

use crate::attachment::{
    AttachmentId, AttachmentRejection, AttachmentStager, FileCandidate, StageReport,
};
use crate::backend::{AskResponse, OutboundMessage};
use crate::code::{clean_code, is_code_bearing};
use crate::markdown::RenderContext;
use crate::message::{Message, MessageState, Sender};
use crate::theme::Theme;

/// Shown in place of a reply when the backend cannot be reached.
pub const SEND_FAILURE_TEXT: &str = "Gagal menghubungi server. Silakan coba lagi.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealProgress {
    /// One more character is visible.
    Advanced,
    /// The last character was revealed; the message is settled.
    Completed,
    /// The message is not being revealed.
    Idle,
}

#[derive(Debug, Default)]
pub struct ChatSession {
    pub input: String,
    messages: Vec<Message>,
    attachments: AttachmentStager,
    theme: Theme,
}

impl ChatSession {
    pub fn new(theme: Theme) -> Self {
        Self {
            theme,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn staged(&self) -> &[crate::attachment::Attachment] {
        self.attachments.staged()
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn render_context(&self) -> RenderContext {
        RenderContext::new(self.theme)
    }

    pub fn is_loading(&self) -> bool {
        self.messages.iter().any(Message::is_loading)
    }

    pub fn is_typing(&self) -> bool {
        self.messages.iter().any(Message::is_typing)
    }

    pub fn interaction_disabled(&self) -> bool {
        self.is_loading() || self.is_typing()
    }

    pub fn stage(&mut self, candidate: FileCandidate) -> Result<AttachmentId, AttachmentRejection> {
        self.attachments.stage(candidate)
    }

    pub fn stage_all<I>(&mut self, candidates: I) -> StageReport
    where
        I: IntoIterator<Item = FileCandidate>,
    {
        self.attachments.stage_all(candidates)
    }

    pub fn remove_attachment(&mut self, id: &AttachmentId) -> bool {
        self.attachments.remove(id)
    }

    pub fn clear_attachments(&mut self) {
        self.attachments.clear();
    }

    /// Start a send. Returns `None` without touching any state when there is
    /// nothing to send or a previous reply is still loading or revealing.
    pub fn begin_send(&mut self) -> Option<OutboundMessage> {
        if (self.input.trim().is_empty() && self.attachments.is_empty())
            || self.interaction_disabled()
        {
            return None;
        }

        let text = std::mem::take(&mut self.input);
        let files = self.attachments.take();
        debug!(chars = text.chars().count(), files = files.len(), "queued user message");

        self.messages.push(Message::user(text.clone(), files.clone()));
        self.messages.push(Message::loading());

        Some(OutboundMessage { text, files })
    }

    /// Replace the loading placeholder with the outcome of the request.
    /// Returns the index of the message to reveal on success.
    pub fn complete_send(&mut self, result: Result<AskResponse>) -> Option<usize> {
        self.messages.retain(|m| !m.is_loading());

        match result {
            Ok(response) => {
                self.messages.push(response.into_message());
                Some(self.messages.len() - 1)
            }
            Err(e) => {
                error!(error = %e, "failed to reach backend");
                self.messages.push(Message::assistant(SEND_FAILURE_TEXT));
                None
            }
        }
    }

    pub fn advance_reveal(&mut self, index: usize) -> RevealProgress {
        let Some(message) = self.messages.get_mut(index) else {
            return RevealProgress::Idle;
        };
        let MessageState::Revealing(reveal) = &mut message.state else {
            return RevealProgress::Idle;
        };

        if reveal.step() {
            message.state = MessageState::Done;
            RevealProgress::Completed
        } else {
            RevealProgress::Advanced
        }
    }

    /// Jump straight to the end of a reveal.
    pub fn finish_reveal(&mut self, index: usize) {
        if let Some(message) = self.messages.get_mut(index) {
            if message.is_typing() {
                message.state = MessageState::Done;
            }
        }
    }

    /// Flip light/dark. Refused while a reply is being revealed.
    pub fn toggle_theme(&mut self) -> bool {
        if self.is_typing() {
            return false;
        }
        self.theme = self.theme.toggled();
        true
    }

    /// Copy payload of the most recent settled code-bearing assistant reply.
    pub fn last_code_block(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .filter(|m| m.sender == Sender::Assistant && m.state == MessageState::Done)
            .find(|m| is_code_bearing(&m.text))
            .map(|m| clean_code(&m.text))
    }
}
