//! Configuration models.
//!
//! Describes where the estimation service lives and where exports are saved.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::models::OutputKind;

/// Estimation service endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the service, without a trailing slash.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Multipart document upload.
    #[serde(default = "default_upload_path")]
    pub upload_path: String,

    /// Feedback-driven regeneration.
    #[serde(default = "default_feedback_path")]
    pub feedback_path: String,

    /// PDF export.
    #[serde(default = "default_pdf_path")]
    pub pdf_path: String,

    /// DOCX export.
    #[serde(default = "default_docx_path")]
    pub docx_path: String,

    /// Optional per-request timeout in seconds. Unset means wait forever.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            upload_path: default_upload_path(),
            feedback_path: default_feedback_path(),
            pdf_path: default_pdf_path(),
            docx_path: default_docx_path(),
            request_timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".into()
}

fn default_upload_path() -> String {
    "/api/estimate/upload".into()
}

fn default_feedback_path() -> String {
    "/api/estimate/feedback".into()
}

fn default_pdf_path() -> String {
    "/api/download/pdf".into()
}

fn default_docx_path() -> String {
    "/api/download/docx".into()
}

impl ServiceConfig {
    /// Join the base URL with an endpoint path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    #[must_use]
    pub fn upload_url(&self) -> String {
        self.url(&self.upload_path)
    }

    #[must_use]
    pub fn feedback_url(&self) -> String {
        self.url(&self.feedback_path)
    }

    /// Endpoint serving the given export format.
    #[must_use]
    pub fn export_url(&self, kind: OutputKind) -> String {
        match kind {
            OutputKind::Pdf => self.url(&self.pdf_path),
            OutputKind::Docx => self.url(&self.docx_path),
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Where exported documents are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Target directory; defaults to the OS download directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl DownloadConfig {
    /// Resolved download directory.
    #[must_use]
    pub fn dir(&self) -> PathBuf {
        self.dir
            .clone()
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub download: DownloadConfig,
}

impl AppConfig {
    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".scope-estimate")
    }

    /// Get the default config file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }
}
