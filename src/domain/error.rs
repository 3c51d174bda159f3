//! Domain-level error types for scope-estimate.
//!
//! All errors are typed with `thiserror`. Transport and service failures carry
//! a human-readable message that is surfaced to the user verbatim.

use thiserror::Error;

use super::models::Action;

/// Local precondition failures, raised before any network call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Generate was requested without a selected document.
    #[error("Please select a PDF file first!")]
    NoDocumentSelected,

    /// The selected file is not a document the service accepts.
    #[error("Unsupported document type: {file_name} (expected a PDF)")]
    UnsupportedDocument { file_name: String },

    /// The selected file has no content.
    #[error("Document is empty: {file_name}")]
    EmptyDocument { file_name: String },

    /// Feedback is empty or whitespace-only.
    #[error("Feedback is empty")]
    EmptyFeedback,

    /// Export was requested before any estimate exists.
    #[error("No estimation available to download!")]
    NoEstimate,

    /// The same action is already waiting on the service.
    #[error("{0} is already in progress")]
    AlreadyInFlight(Action),
}

/// Application-level errors.
#[derive(Error, Debug)]
pub enum AppError {
    /// Network or connection failure talking to the estimation service.
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The estimation service answered with a failure outcome.
    #[error("Service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// A local precondition was violated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// JSON encoding or decoding failed.
    #[error("JSON parse error: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Configuration or environment error.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// IO operation failed.
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl AppError {
    /// Create a transport error from a reqwest error.
    pub fn transport(err: reqwest::Error) -> Self {
        Self::Transport {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Create a transport error from a bare message.
    #[cfg(test)]
    pub fn transport_message(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Create a JSON parse error.
    pub fn json_parse(err: serde_json::Error) -> Self {
        Self::JsonParse {
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create an IO error with context.
    pub fn io(message: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source: Some(err),
        }
    }

    /// Whether this error was raised locally, before any request was issued.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Result type alias using `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_match_ui_wording() {
        assert_eq!(
            AppError::from(ValidationError::NoEstimate).to_string(),
            "No estimation available to download!"
        );
        assert_eq!(
            ValidationError::AlreadyInFlight(Action::Ingest).to_string(),
            "Generate is already in progress"
        );
    }

    #[test]
    fn test_transport_message_is_surfaced() {
        let err = AppError::transport_message("timeout");
        assert_eq!(err.to_string(), "Transport error: timeout");
        assert!(!err.is_validation());
    }
}
