//! Domain layer - core workflow types.
//!
//! This layer contains pure domain models, configuration and error types
//! without any external I/O (network, filesystem).

pub mod config;
pub mod error;
pub mod models;

pub use config::{AppConfig, ServiceConfig};
pub use error::{AppError, Result, ValidationError};
pub use models::{
    Action, EstimateText, ExportRequest, FlagState, OutputKind, Phase, SourceDocument,
    WorkflowSnapshot,
};
