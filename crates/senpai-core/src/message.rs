//! UI-agnostic chat state types
//!
//! These structures are shared between the terminal UI and the markup
//! renderer and don't depend on any specific UI framework.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::reveal::Reveal;

/// Text shown in the loading placeholder.
pub const LOADING_TEXT: &str = "typing...";

/// Who sent a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    pub fn display_name(&self) -> &'static str {
        match self {
            Sender::User => "Kamu",
            Sender::Assistant => "AI Assistant",
        }
    }
}

/// Lifecycle of a message: loading placeholder, typewriter reveal, settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageState {
    Pending,
    Revealing(Reveal),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Base64 payload without the `data:` prefix
    Embedded(String),
    Linked(String),
}

/// Image sent back alongside an assistant reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub source: ImageSource,
    pub mime_type: String,
    pub special_recipient: Option<String>,
}

impl ImageData {
    /// Embedded payloads win over links; `None` when neither is present.
    pub fn from_parts(
        base64: Option<String>,
        url: Option<String>,
        mime_type: Option<String>,
        special_recipient: Option<String>,
    ) -> Option<Self> {
        let source = match (base64.filter(|b| !b.is_empty()), url.filter(|u| !u.is_empty())) {
            (Some(payload), _) => ImageSource::Embedded(payload),
            (None, Some(url)) => ImageSource::Linked(url),
            (None, None) => return None,
        };

        Some(Self {
            source,
            mime_type: mime_type.unwrap_or_else(|| "image/webp".to_string()),
            special_recipient: special_recipient.filter(|s| !s.is_empty()),
        })
    }

    /// Value for an `src` attribute. Embedded payloads that do not decode are
    /// treated as a failed load and yield `None`.
    pub fn source_uri(&self) -> Option<String> {
        match &self.source {
            ImageSource::Embedded(payload) => {
                if let Err(e) = STANDARD.decode(payload.trim()) {
                    tracing::warn!(error = %e, "failed to load image");
                    return None;
                }
                Some(format!("data:{};base64,{}", self.mime_type, payload.trim()))
            }
            ImageSource::Linked(url) => Some(url.clone()),
        }
    }

    pub fn alt_text(&self) -> String {
        match &self.special_recipient {
            Some(name) => format!("Special image for {}", name),
            None => "Message image".to_string(),
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    pub attachments: Vec<Attachment>,
    pub image: Option<ImageData>,
    pub state: MessageState,
}

impl Message {
    pub fn user(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            attachments,
            image: None,
            state: MessageState::Done,
        }
    }

    /// Assistant reply that settles immediately (errors, notices).
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Assistant,
            text: text.into(),
            attachments: Vec::new(),
            image: None,
            state: MessageState::Done,
        }
    }

    /// Assistant reply that will be revealed character by character.
    pub fn revealing(text: impl Into<String>, image: Option<ImageData>) -> Self {
        let text = text.into();
        let reveal = Reveal::new(&text);
        Self {
            sender: Sender::Assistant,
            text,
            attachments: Vec::new(),
            image,
            state: MessageState::Revealing(reveal),
        }
    }

    pub fn loading() -> Self {
        Self {
            sender: Sender::Assistant,
            text: LOADING_TEXT.to_string(),
            attachments: Vec::new(),
            image: None,
            state: MessageState::Pending,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.state == MessageState::Pending
    }

    pub fn is_typing(&self) -> bool {
        matches!(self.state, MessageState::Revealing(_))
    }

    /// Text currently on screen: the revealed prefix while typing.
    pub fn visible_text(&self) -> &str {
        match &self.state {
            MessageState::Revealing(reveal) => reveal.visible(&self.text),
            _ => &self.text,
        }
    }
}
