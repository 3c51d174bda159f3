//! Mock estimation service for tests.
//!
//! Returns scripted outcomes without network access, records every request,
//! and can hold calls open until released to exercise in-flight behaviour.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::download_sink::DownloadSink;
use super::estimation_client::EstimationService;
use crate::domain::{AppError, ExportRequest, OutputKind, Result, SourceDocument};

/// Scripted answer for one call.
#[derive(Debug, Clone)]
pub enum Outcome {
    Text(String),
    Bytes(Vec<u8>),
    Transport(String),
    Service(u16, String),
}

impl Outcome {
    fn into_text(self) -> Result<String> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Bytes(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            Self::Transport(message) => Err(AppError::transport_message(message)),
            Self::Service(status, message) => Err(AppError::Service { status, message }),
        }
    }

    fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::Text(text) => Ok(text.into_bytes()),
            Self::Transport(message) => Err(AppError::transport_message(message)),
            Self::Service(status, message) => Err(AppError::Service { status, message }),
        }
    }
}

/// A request seen by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Ingest { file_name: String },
    Refine { scope_text: String, feedback: String },
    Export { scope_text: String, kind: OutputKind },
}

/// Mock service answering from a FIFO queue.
#[derive(Default)]
pub struct MockEstimationService {
    outcomes: Mutex<VecDeque<Outcome>>,
    requests: Mutex<Vec<Recorded>>,
    started: AtomicUsize,
    held: AtomicBool,
    release: Notify,
}

impl MockEstimationService {
    /// Create with a queue of outcomes.
    pub fn with_outcomes(outcomes: Vec<Outcome>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            ..Self::default()
        })
    }

    /// Make every call wait for [`Self::release_one`] before answering.
    pub fn hold_calls(&self) {
        self.held.store(true, Ordering::SeqCst);
    }

    /// Let one held call answer.
    pub fn release_one(&self) {
        self.release.notify_one();
    }

    /// Wait until `n` calls have reached the mock.
    pub async fn wait_for_calls(&self, n: usize) {
        while self.started.load(Ordering::SeqCst) < n {
            tokio::task::yield_now().await;
        }
    }

    /// All requests made so far.
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    async fn answer(&self, request: Recorded) -> Outcome {
        self.requests.lock().unwrap().push(request);
        // Outcomes are bound in call order, independent of release order.
        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Outcome::Text("Mock response".into()));
        self.started.fetch_add(1, Ordering::SeqCst);

        if self.held.load(Ordering::SeqCst) {
            self.release.notified().await;
        }

        outcome
    }
}

#[async_trait]
impl EstimationService for MockEstimationService {
    async fn ingest(&self, document: &SourceDocument) -> Result<String> {
        self.answer(Recorded::Ingest {
            file_name: document.file_name.clone(),
        })
        .await
        .into_text()
    }

    async fn refine(&self, scope_text: &str, feedback: &str) -> Result<String> {
        self.answer(Recorded::Refine {
            scope_text: scope_text.to_string(),
            feedback: feedback.to_string(),
        })
        .await
        .into_text()
    }

    async fn export(&self, request: &ExportRequest) -> Result<Vec<u8>> {
        self.answer(Recorded::Export {
            scope_text: request.estimate.as_str().to_string(),
            kind: request.kind,
        })
        .await
        .into_bytes()
    }
}

/// Sink keeping saved payloads in memory.
#[derive(Default)]
pub struct MemorySink {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemorySink {
    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().unwrap().clone()
    }
}

impl DownloadSink for MemorySink {
    fn save(&self, file_name: &str, payload: &[u8]) -> Result<std::path::PathBuf> {
        self.saved
            .lock()
            .unwrap()
            .push((file_name.to_string(), payload.to_vec()));
        Ok(std::path::PathBuf::from(file_name))
    }
}
