//! Export dispatcher.
//!
//! Fetches the binary rendering of an estimate and hands it to the download
//! sink under `estimation.<ext>`.

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::{ExportRequest, OutputKind, Result};
use crate::infrastructure::{DownloadSink, EstimationService};

/// A completed export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedExport {
    pub kind: OutputKind,
    pub path: PathBuf,
    pub size_bytes: usize,
}

/// Routes export requests to the service and the sink.
#[derive(Clone)]
pub struct ExportDispatcher {
    service: Arc<dyn EstimationService>,
    sink: Arc<dyn DownloadSink>,
}

impl ExportDispatcher {
    #[must_use]
    pub fn new(service: Arc<dyn EstimationService>, sink: Arc<dyn DownloadSink>) -> Self {
        Self { service, sink }
    }

    /// Export `request` and save the payload.
    ///
    /// # Errors
    /// Returns error if the service call or the save fails.
    pub async fn dispatch(&self, request: &ExportRequest) -> Result<SavedExport> {
        let payload = self.service.export(request).await?;
        let path = self.sink.save(&request.kind.file_name(), &payload)?;

        Ok(SavedExport {
            kind: request.kind,
            path,
            size_bytes: payload.len(),
        })
    }
}
