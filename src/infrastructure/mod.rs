//! Infrastructure layer - external adapters (HTTP, filesystem).
//!
//! This layer handles all I/O operations and external dependencies.

pub mod config;
pub mod document_loader;
pub mod download_sink;
pub mod estimation_client;
#[cfg(test)]
pub mod mock_service;

pub use config::{ensure_config_exists, load_config, render_config};
pub use document_loader::load_document;
pub use download_sink::{DownloadSink, FileDownloadSink};
pub use estimation_client::{EstimationService, HttpEstimationClient};
