//! Domain models for the estimate refinement workflow.
//!
//! These types describe what flows between the user, the workflow state and
//! the remote estimation service.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// Magic bytes at the start of every PDF file.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// Document formats accepted by the estimation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Portable Document Format.
    Pdf,
}

impl MediaType {
    /// MIME type sent with the upload.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
        }
    }

    /// Detect the media type from content, falling back to the file extension.
    #[must_use]
    pub fn detect(file_name: &str, bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(PDF_MAGIC) {
            return Some(Self::Pdf);
        }

        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("pdf") => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// A document selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// File name reported to the service.
    pub file_name: String,
    /// Declared media type.
    pub media_type: MediaType,
    /// Raw document bytes.
    pub bytes: Vec<u8>,
}

impl SourceDocument {
    /// Build a document, rejecting empty or unsupported payloads.
    ///
    /// # Errors
    /// Returns a validation error if the payload is empty or not a PDF.
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ValidationError> {
        let file_name = file_name.into();

        if bytes.is_empty() {
            return Err(ValidationError::EmptyDocument { file_name });
        }

        let media_type = MediaType::detect(&file_name, &bytes)
            .ok_or_else(|| ValidationError::UnsupportedDocument {
                file_name: file_name.clone(),
            })?;

        Ok(Self {
            file_name,
            media_type,
            bytes,
        })
    }

    /// Size of the payload in bytes.
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// The current estimate, in Markdown.
///
/// Only ever built from a successful service response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EstimateText(String);

impl EstimateText {
    /// Wrap the body of a successful ingest or refine response.
    #[must_use]
    pub const fn from_response(text: String) -> Self {
        Self(text)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for EstimateText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Requested export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    Pdf,
    Docx,
}

impl OutputKind {
    /// File extension of the exported document.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    /// Name the download is saved under.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("estimation.{}", self.extension())
    }

    /// Content type the service answers with.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl std::str::FromStr for OutputKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" | "word" => Ok(Self::Docx),
            _ => Err(format!("Unknown export kind: {s}. Use: pdf, docx")),
        }
    }
}

impl std::fmt::Display for OutputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pdf => write!(f, "PDF"),
            Self::Docx => write!(f, "DOCX"),
        }
    }
}

/// An estimate snapshot paired with the format to export it to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub estimate: EstimateText,
    pub kind: OutputKind,
}

/// The three user actions that talk to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Action {
    Ingest,
    Regenerate,
    Export,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ingest => write!(f, "Generate"),
            Self::Regenerate => write!(f, "Regenerate"),
            Self::Export => write!(f, "Download"),
        }
    }
}

/// Per-action busy flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub enum FlagState {
    #[default]
    Idle,
    InFlight,
    /// Last attempt failed with this message.
    Failed(String),
}

impl FlagState {
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::InFlight)
    }
}

/// Where the workflow is, ignoring the orthogonal export flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    /// No estimate yet.
    Idle,
    Ingesting,
    /// An estimate is present.
    Ready,
    Regenerating,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Ingesting => write!(f, "Processing..."),
            Self::Ready => write!(f, "Ready"),
            Self::Regenerating => write!(f, "Regenerating..."),
        }
    }
}

/// Which actions the user may trigger right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Availability {
    pub generate: bool,
    pub regenerate: bool,
    pub export: bool,
}

/// Point-in-time copy of the workflow state, for display.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowSnapshot {
    /// Name of the selected document, if any.
    pub document: Option<String>,
    pub estimate: EstimateText,
    pub feedback: String,
    pub ingesting: FlagState,
    pub regenerating: FlagState,
    pub exporting: FlagState,
    /// When the estimate was last replaced.
    pub updated_at: Option<DateTime<Utc>>,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
}

impl WorkflowSnapshot {
    /// Current phase of the state machine.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.ingesting.is_busy() {
            Phase::Ingesting
        } else if self.regenerating.is_busy() {
            Phase::Regenerating
        } else if self.estimate.is_empty() {
            Phase::Idle
        } else {
            Phase::Ready
        }
    }

    /// Whether an export is running alongside the current phase.
    #[must_use]
    pub const fn is_exporting(&self) -> bool {
        self.exporting.is_busy()
    }

    /// Enabled state of each user-facing action.
    #[must_use]
    pub fn availability(&self) -> Availability {
        Availability {
            generate: self.document.is_some() && !self.ingesting.is_busy(),
            regenerate: !self.feedback.trim().is_empty() && !self.regenerating.is_busy(),
            export: !self.estimate.is_empty() && !self.exporting.is_busy(),
        }
    }
}
