pub mod attachment;
pub mod backend;
pub mod code;
pub mod config;
pub mod markdown;
pub mod message;
pub mod reveal;
pub mod session;
pub mod theme;

// Re-export main types for convenience
pub use attachment::{
    format_file_size, Attachment, AttachmentId, AttachmentRejection, AttachmentStager,
    FileCandidate, FileKind, StageReport, MAX_ATTACHMENT_BYTES,
};
pub use backend::{AskClient, AskResponse, OutboundMessage};
pub use code::{clean_code, detect_language, is_code_bearing, split_fenced, CodeSegments};
pub use config::Config;
pub use markdown::{parse, render_html, Document, RenderContext};
pub use message::{ImageData, ImageSource, Message, MessageState, Sender};
pub use reveal::{Reveal, RevealTimer, DEFAULT_REVEAL_INTERVAL};
pub use session::{ChatSession, RevealProgress, SEND_FAILURE_TEXT};
pub use theme::Theme;
