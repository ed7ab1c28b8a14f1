//! Attachment validation and staging
//!
//! Files picked by the user are checked against the size limit and the
//! supported media types before they are staged for the next message.
//! Rejections come back as values so callers can report exactly which file
//! failed and why.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

/// Largest accepted file, in bytes (5 MB).
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    Word,
    Excel,
    Text,
    Csv,
    Other,
}

impl FileKind {
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            return FileKind::Image;
        }
        match mime_type {
            "application/pdf" => FileKind::Pdf,
            "application/msword"
            | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
                FileKind::Word
            }
            "application/vnd.ms-excel"
            | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                FileKind::Excel
            }
            "text/plain" => FileKind::Text,
            "text/csv" => FileKind::Csv,
            _ => FileKind::Other,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, FileKind::Other)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Image => "Image",
            FileKind::Pdf => "PDF",
            FileKind::Word => "Word",
            FileKind::Excel => "Excel",
            FileKind::Text => "Text",
            FileKind::Csv => "CSV",
            FileKind::Other => "File",
        }
    }
}

/// Declared media type for a file name, by extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "apng" => "image/apng",
        "jpg" | "jpeg" | "jpe" | "jfif" | "pjpeg" | "pjp" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "heic" => "image/heic",
        "heif" => "image/heif",
        "jxl" => "image/jxl",
        "bmp" | "dib" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "ico" | "cur" => "image/x-icon",
        "svg" | "svgz" => "image/svg+xml",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "md" => "text/markdown",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// Human readable size: "0 Bytes", "512 Bytes", "1.5 KB", "5 MB".
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttachmentId(String);

impl AttachmentId {
    /// Timestamp plus a random component. Collisions are possible but unlikely.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let nonce: u32 = rand::thread_rng().gen();
        Self(format!("{}-{:08x}", millis, nonce))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttachmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file the user picked, not yet validated.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub mime_type: String,
    pub size: u64,
    /// Empty when the file was too large to be worth reading.
    pub data: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            size: data.len() as u64,
            data,
        }
    }

    /// Read a file from disk. Oversized files are sized from metadata and not read.
    pub async fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| anyhow!("Invalid file name: {}", path.display()))?
            .to_string();
        let mime_type = mime_for_path(path).to_string();

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
        if !metadata.is_file() {
            return Err(anyhow!("{} is not a file", path.display()));
        }

        let size = metadata.len();
        let data = if size > MAX_ATTACHMENT_BYTES {
            Vec::new()
        } else {
            tokio::fs::read(path)
                .await
                .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?
        };

        Ok(Self { name, mime_type, size, data })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachmentRejection {
    #[error("File \"{name}\" terlalu besar. Maksimal ukuran file adalah 5MB.")]
    TooLarge { name: String, size: u64 },
    #[error("Format file \"{name}\" tidak didukung.")]
    UnsupportedType { name: String, mime_type: String },
}

impl AttachmentRejection {
    pub fn file_name(&self) -> &str {
        match self {
            AttachmentRejection::TooLarge { name, .. }
            | AttachmentRejection::UnsupportedType { name, .. } => name,
        }
    }
}

/// A validated file, staged for or sent with a message.
#[derive(Clone)]
pub struct Attachment {
    pub id: AttachmentId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub kind: FileKind,
    /// `data:` URI, images only.
    pub preview: Option<String>,
    pub data: Arc<[u8]>,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("mime_type", &self.mime_type)
            .field("kind", &self.kind)
            .field("has_preview", &self.preview.is_some())
            .finish()
    }
}

impl Attachment {
    pub fn validate(candidate: FileCandidate) -> std::result::Result<Self, AttachmentRejection> {
        if candidate.size > MAX_ATTACHMENT_BYTES {
            return Err(AttachmentRejection::TooLarge {
                name: candidate.name,
                size: candidate.size,
            });
        }

        let kind = FileKind::from_mime(&candidate.mime_type);
        if !kind.is_supported() {
            return Err(AttachmentRejection::UnsupportedType {
                name: candidate.name,
                mime_type: candidate.mime_type,
            });
        }

        let preview = (kind == FileKind::Image).then(|| {
            format!(
                "data:{};base64,{}",
                candidate.mime_type,
                STANDARD.encode(&candidate.data)
            )
        });

        Ok(Self {
            id: AttachmentId::generate(),
            name: candidate.name,
            size: candidate.size,
            mime_type: candidate.mime_type,
            kind,
            preview,
            data: Arc::from(candidate.data),
        })
    }

    /// "PDF • 1.5 KB"
    pub fn summary(&self) -> String {
        format!("{} • {}", self.kind.label(), format_file_size(self.size))
    }
}

/// Outcome of staging a batch of files.
#[derive(Debug, Default)]
pub struct StageReport {
    pub accepted: Vec<AttachmentId>,
    pub rejected: Vec<AttachmentRejection>,
}

impl StageReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// Files waiting to go out with the next message, in selection order.
#[derive(Debug, Default)]
pub struct AttachmentStager {
    staged: Vec<Attachment>,
}

impl AttachmentStager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(
        &mut self,
        candidate: FileCandidate,
    ) -> std::result::Result<AttachmentId, AttachmentRejection> {
        match Attachment::validate(candidate) {
            Ok(attachment) => {
                debug!(name = %attachment.name, size = attachment.size, kind = ?attachment.kind, "staged attachment");
                let id = attachment.id.clone();
                self.staged.push(attachment);
                Ok(id)
            }
            Err(rejection) => {
                warn!(file = rejection.file_name(), reason = %rejection, "rejected attachment");
                Err(rejection)
            }
        }
    }

    pub fn stage_all<I>(&mut self, candidates: I) -> StageReport
    where
        I: IntoIterator<Item = FileCandidate>,
    {
        let mut report = StageReport::default();
        for candidate in candidates {
            match self.stage(candidate) {
                Ok(id) => report.accepted.push(id),
                Err(rejection) => report.rejected.push(rejection),
            }
        }
        report
    }

    pub fn remove(&mut self, id: &AttachmentId) -> bool {
        let before = self.staged.len();
        self.staged.retain(|a| &a.id != id);
        self.staged.len() != before
    }

    pub fn clear(&mut self) {
        self.staged.clear();
    }

    /// Drain the staged list, leaving it empty.
    pub fn take(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.staged)
    }

    pub fn staged(&self) -> &[Attachment] {
        &self.staged
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }
}
