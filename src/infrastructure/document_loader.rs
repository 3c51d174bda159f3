//! Reads source documents from disk.

use std::path::Path;

use crate::domain::{AppError, Result, SourceDocument};

/// Load a document for upload, validating that it is a non-empty PDF.
///
/// # Errors
/// Returns error if the file cannot be read or is not an accepted document.
pub fn load_document(path: &Path) -> Result<SourceDocument> {
    let bytes = std::fs::read(path)
        .map_err(|e| AppError::io(format!("Failed to read {}", path.display()), e))?;

    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("document.pdf")
        .to_string();

    let document = SourceDocument::new(file_name, bytes)?;

    tracing::debug!(
        file = %document.file_name,
        bytes = document.size_bytes(),
        "Loaded document"
    );

    Ok(document)
}
