//! Application layer - use cases and orchestration.
//!
//! This layer contains the estimation workflow, export dispatch, and the
//! rendering and formatting of estimates.

pub mod export;
pub mod formatter;
pub mod highlight;
pub mod render;
pub mod workflow;

pub use export::SavedExport;
pub use formatter::{format_estimate, format_status, OutputFormat};
pub use workflow::Workflow;
