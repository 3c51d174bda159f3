//! Estimate refinement workflow.
//!
//! `Workflow` owns the single source of truth (selected document, current
//! estimate, pending feedback, per-action busy flags) and is the only writer
//! of it. Each action is an async call that:
//!
//! 1. checks its preconditions and claims its busy flag under one lock,
//! 2. awaits the service without holding the lock,
//! 3. replaces the estimate wholesale on success.
//!
//! The busy flag is released by [`InFlight`] on drop, so it is cleared on
//! success, on failure and if the future is dropped mid-call.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};

use super::export::{ExportDispatcher, SavedExport};
use crate::domain::{
    Action, AppError, EstimateText, ExportRequest, FlagState, OutputKind, Result, SourceDocument,
    ValidationError, WorkflowSnapshot,
};
use crate::infrastructure::{DownloadSink, EstimationService};

#[derive(Debug, Default)]
struct WorkflowState {
    document: Option<Arc<SourceDocument>>,
    estimate: EstimateText,
    feedback: String,
    ingesting: FlagState,
    regenerating: FlagState,
    exporting: FlagState,
    updated_at: Option<DateTime<Utc>>,
    /// Most recent failure and the action it belongs to.
    last_error: Option<(Action, String)>,
}

impl WorkflowState {
    fn flag_mut(&mut self, action: Action) -> &mut FlagState {
        match action {
            Action::Ingest => &mut self.ingesting,
            Action::Regenerate => &mut self.regenerating,
            Action::Export => &mut self.exporting,
        }
    }

    fn replace_estimate(&mut self, estimate: EstimateText) {
        self.estimate = estimate;
        self.updated_at = Some(Utc::now());
    }
}

fn lock(state: &Mutex<WorkflowState>) -> MutexGuard<'_, WorkflowState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Claim on one action's busy flag, released on drop.
///
/// `None` outcome means the call was dropped before it finished.
struct InFlight<'a> {
    state: &'a Mutex<WorkflowState>,
    action: Action,
    outcome: Option<std::result::Result<(), String>>,
}

impl<'a> InFlight<'a> {
    /// Mark `action` busy, rejecting reentry.
    ///
    /// `guard` must be the lock on `state`; it is released before returning.
    fn begin(
        state: &'a Mutex<WorkflowState>,
        mut guard: MutexGuard<'_, WorkflowState>,
        action: Action,
    ) -> Result<Self> {
        let flag = guard.flag_mut(action);
        if flag.is_busy() {
            return Err(ValidationError::AlreadyInFlight(action).into());
        }
        *flag = FlagState::InFlight;
        drop(guard);

        Ok(Self {
            state,
            action,
            outcome: None,
        })
    }

    fn succeed(&mut self) {
        self.outcome = Some(Ok(()));
    }

    fn fail(&mut self, err: &AppError) {
        self.outcome = Some(Err(err.to_string()));
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut state = lock(self.state);
        let flag = match self.outcome.take() {
            Some(Err(message)) => {
                state.last_error = Some((self.action, message.clone()));
                FlagState::Failed(message)
            }
            Some(Ok(())) => {
                // Another action's failure stays visible.
                if state.last_error.as_ref().is_some_and(|(a, _)| *a == self.action) {
                    state.last_error = None;
                }
                FlagState::Idle
            }
            None => FlagState::Idle,
        };
        *state.flag_mut(self.action) = flag;
    }
}

/// Controller for the upload → refine → export workflow.
pub struct Workflow {
    state: Mutex<WorkflowState>,
    service: Arc<dyn EstimationService>,
    exporter: ExportDispatcher,
}

impl Workflow {
    /// Create an idle workflow.
    #[must_use]
    pub fn new(service: Arc<dyn EstimationService>, sink: Arc<dyn DownloadSink>) -> Self {
        let exporter = ExportDispatcher::new(Arc::clone(&service), sink);
        Self {
            state: Mutex::new(WorkflowState::default()),
            service,
            exporter,
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> WorkflowSnapshot {
        let state = lock(&self.state);
        WorkflowSnapshot {
            document: state.document.as_ref().map(|d| d.file_name.clone()),
            estimate: state.estimate.clone(),
            feedback: state.feedback.clone(),
            ingesting: state.ingesting.clone(),
            regenerating: state.regenerating.clone(),
            exporting: state.exporting.clone(),
            updated_at: state.updated_at,
            last_error: state.last_error.as_ref().map(|(_, message)| message.clone()),
        }
    }

    /// Current estimate.
    #[must_use]
    pub fn estimate(&self) -> EstimateText {
        lock(&self.state).estimate.clone()
    }

    /// Select the document the next generate uploads.
    pub fn select_document(&self, document: SourceDocument) {
        tracing::debug!(file = %document.file_name, "Document selected");
        lock(&self.state).document = Some(Arc::new(document));
    }

    /// Replace the pending feedback text.
    pub fn set_feedback(&self, text: impl Into<String>) {
        lock(&self.state).feedback = text.into();
    }

    /// Upload the selected document and replace the estimate with the result.
    ///
    /// # Errors
    /// Validation error if no document is selected or an upload is already
    /// running; transport or service error if the call fails. The estimate is
    /// left untouched on error.
    pub async fn submit_document(&self) -> Result<EstimateText> {
        let (mut flight, document) = {
            let state = lock(&self.state);
            let document = state
                .document
                .clone()
                .ok_or(ValidationError::NoDocumentSelected)?;
            (InFlight::begin(&self.state, state, Action::Ingest)?, document)
        };

        tracing::info!(
            file = %document.file_name,
            bytes = document.size_bytes(),
            "Generating estimate"
        );

        match self.service.ingest(&document).await {
            Ok(text) => {
                let estimate = EstimateText::from_response(text);
                lock(&self.state).replace_estimate(estimate.clone());
                flight.succeed();
                tracing::info!(chars = estimate.as_str().len(), "Estimate generated");
                Ok(estimate)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Error uploading PDF");
                flight.fail(&err);
                Err(err)
            }
        }
    }

    /// Regenerate the estimate from the current text plus the pending feedback.
    ///
    /// On success the feedback is cleared unless it was edited while the call
    /// ran; on failure both the estimate and the feedback are kept so the user
    /// can retry.
    ///
    /// # Errors
    /// Validation error if the feedback is blank or a regenerate is already
    /// running (no request is issued); transport or service error otherwise.
    pub async fn submit_feedback(&self) -> Result<EstimateText> {
        self.regenerate(None).await
    }

    /// Set the feedback and regenerate in one step.
    ///
    /// A regenerate that is already running rejects the call before the
    /// feedback is stored, so the pending text is not overwritten.
    ///
    /// # Errors
    /// Same as [`Self::submit_feedback`].
    pub async fn refine(&self, feedback: impl Into<String>) -> Result<EstimateText> {
        self.regenerate(Some(feedback.into())).await
    }

    async fn regenerate(&self, replacement: Option<String>) -> Result<EstimateText> {
        let (mut flight, scope_text, feedback) = {
            let mut state = lock(&self.state);
            if let Some(text) = replacement {
                if state.regenerating.is_busy() {
                    return Err(ValidationError::AlreadyInFlight(Action::Regenerate).into());
                }
                state.feedback = text;
            }
            if state.feedback.trim().is_empty() {
                return Err(ValidationError::EmptyFeedback.into());
            }
            let scope_text = state.estimate.clone();
            let feedback = state.feedback.clone();
            (
                InFlight::begin(&self.state, state, Action::Regenerate)?,
                scope_text,
                feedback,
            )
        };

        tracing::info!(feedback_len = feedback.len(), "Regenerating estimate");

        match self.service.refine(scope_text.as_str(), &feedback).await {
            Ok(text) => {
                let estimate = EstimateText::from_response(text);
                let mut state = lock(&self.state);
                state.replace_estimate(estimate.clone());
                if state.feedback == feedback {
                    state.feedback.clear();
                }
                drop(state);
                flight.succeed();
                tracing::info!(chars = estimate.as_str().len(), "Estimate regenerated");
                Ok(estimate)
            }
            Err(err) => {
                tracing::warn!(error = %err, "Error sending feedback");
                flight.fail(&err);
                Err(err)
            }
        }
    }

    /// Export the estimate as it is at call time and save it.
    ///
    /// # Errors
    /// Validation error if there is no estimate or an export is already
    /// running; transport, service or IO error otherwise.
    pub async fn request_export(&self, kind: OutputKind) -> Result<SavedExport> {
        let (mut flight, request) = {
            let state = lock(&self.state);
            if state.estimate.is_empty() {
                return Err(ValidationError::NoEstimate.into());
            }
            let request = ExportRequest {
                estimate: state.estimate.clone(),
                kind,
            };
            (InFlight::begin(&self.state, state, Action::Export)?, request)
        };

        tracing::info!(kind = %kind, "Downloading estimate");

        match self.exporter.dispatch(&request).await {
            Ok(saved) => {
                flight.succeed();
                Ok(saved)
            }
            Err(err) => {
                tracing::warn!(error = %err, kind = %kind, "Error downloading file");
                flight.fail(&err);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Phase;
    use crate::infrastructure::mock_service::{MemorySink, MockEstimationService, Outcome, Recorded};
    use crate::infrastructure::FileDownloadSink;

    fn pdf(name: &str) -> SourceDocument {
        SourceDocument::new(name, b"%PDF-1.4 scope".to_vec()).unwrap()
    }

    fn workflow(outcomes: Vec<Outcome>) -> (Workflow, Arc<MockEstimationService>, Arc<MemorySink>) {
        let service = MockEstimationService::with_outcomes(outcomes);
        let sink = Arc::new(MemorySink::default());
        (Workflow::new(service.clone(), sink.clone()), service, sink)
    }

    /// Workflow whose estimate is already `text`.
    async fn ready_workflow(
        text: &str,
        mut outcomes: Vec<Outcome>,
    ) -> (Workflow, Arc<MockEstimationService>, Arc<MemorySink>) {
        outcomes.insert(0, Outcome::Text(text.to_string()));
        let (wf, service, sink) = workflow(outcomes);
        wf.select_document(pdf("spec.pdf"));
        wf.submit_document().await.unwrap();
        (wf, service, sink)
    }

    #[tokio::test]
    async fn test_ingest_replaces_estimate_with_exact_response() {
        let (wf, service, _) = workflow(vec![Outcome::Text("# Estimate\n| Task | Hours |".into())]);
        wf.select_document(pdf("spec.pdf"));

        let estimate = wf.submit_document().await.unwrap();

        let snapshot = wf.snapshot();
        assert_eq!(estimate.as_str(), "# Estimate\n| Task | Hours |");
        assert_eq!(snapshot.estimate, estimate);
        assert_eq!(snapshot.ingesting, FlagState::Idle);
        assert_eq!(snapshot.phase(), Phase::Ready);
        assert!(snapshot.updated_at.is_some());
        assert_eq!(
            service.requests(),
            vec![Recorded::Ingest {
                file_name: "spec.pdf".into()
            }]
        );
    }

    #[tokio::test]
    async fn test_ingest_without_document_is_rejected_locally() {
        let (wf, service, _) = workflow(vec![]);

        let err = wf.submit_document().await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Validation(ValidationError::NoDocumentSelected)
        ));
        assert_eq!(service.call_count(), 0);
        assert_eq!(wf.snapshot().ingesting, FlagState::Idle);
    }

    #[tokio::test]
    async fn test_ingest_transport_failure_keeps_empty_estimate() {
        let (wf, _, _) = workflow(vec![Outcome::Transport("timeout".into())]);
        wf.select_document(pdf("spec.pdf"));

        let err = wf.submit_document().await.unwrap_err();

        let snapshot = wf.snapshot();
        assert_eq!(err.to_string(), "Transport error: timeout");
        assert!(snapshot.estimate.is_empty());
        assert!(!snapshot.ingesting.is_busy());
        assert_eq!(
            snapshot.ingesting,
            FlagState::Failed("Transport error: timeout".into())
        );
        assert_eq!(snapshot.last_error.as_deref(), Some("Transport error: timeout"));
        assert_eq!(snapshot.phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn test_failed_reingest_keeps_previous_estimate() {
        let (wf, _, _) =
            ready_workflow("# Estimate", vec![Outcome::Service(500, "model down".into())]).await;

        assert!(wf.submit_document().await.is_err());

        assert_eq!(wf.estimate().as_str(), "# Estimate");
        assert_eq!(wf.snapshot().phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_reentrant_ingest_is_rejected_without_second_request() {
        let (wf, service, _) = workflow(vec![Outcome::Text("# Estimate".into())]);
        wf.select_document(pdf("spec.pdf"));
        service.hold_calls();

        let first = wf.submit_document();
        let second = async {
            service.wait_for_calls(1).await;
            assert_eq!(wf.snapshot().phase(), Phase::Ingesting);
            let rejected = wf.submit_document().await;
            service.release_one();
            rejected
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap().as_str(), "# Estimate");
        assert!(matches!(
            second,
            Err(AppError::Validation(ValidationError::AlreadyInFlight(
                Action::Ingest
            )))
        ));
        assert_eq!(service.call_count(), 1);
        assert_eq!(wf.snapshot().ingesting, FlagState::Idle);
    }

    #[tokio::test]
    async fn test_feedback_success_replaces_estimate_and_clears_feedback() {
        let (wf, service, _) =
            ready_workflow("# Estimate", vec![Outcome::Text("# Estimate\n## Risks".into())]).await;
        wf.set_feedback("add a risk section");

        let estimate = wf.submit_feedback().await.unwrap();

        let snapshot = wf.snapshot();
        assert_eq!(estimate.as_str(), "# Estimate\n## Risks");
        assert_eq!(snapshot.estimate.as_str(), "# Estimate\n## Risks");
        assert_eq!(snapshot.feedback, "");
        assert_eq!(snapshot.regenerating, FlagState::Idle);
        assert_eq!(
            service.requests().last(),
            Some(&Recorded::Refine {
                scope_text: "# Estimate".into(),
                feedback: "add a risk section".into()
            })
        );
    }

    #[tokio::test]
    async fn test_feedback_failure_preserves_estimate_and_feedback() {
        let (wf, _, _) =
            ready_workflow("# Estimate", vec![Outcome::Service(502, "bad gateway".into())]).await;
        wf.set_feedback("double the QA hours");

        let err = wf.submit_feedback().await.unwrap_err();

        let snapshot = wf.snapshot();
        assert!(matches!(err, AppError::Service { status: 502, .. }));
        assert_eq!(snapshot.estimate.as_str(), "# Estimate");
        assert_eq!(snapshot.feedback, "double the QA hours");
        assert!(!snapshot.regenerating.is_busy());
        assert_eq!(snapshot.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_blank_feedback_never_reaches_service() {
        let (wf, service, _) = ready_workflow("# Estimate", vec![]).await;
        let calls_before = service.call_count();

        for blank in ["", "   ", "\n\t "] {
            wf.set_feedback(blank);
            let err = wf.submit_feedback().await.unwrap_err();
            assert!(matches!(
                err,
                AppError::Validation(ValidationError::EmptyFeedback)
            ));
        }

        assert_eq!(service.call_count(), calls_before);
        assert_eq!(wf.snapshot().regenerating, FlagState::Idle);
        assert_eq!(wf.estimate().as_str(), "# Estimate");
    }

    #[tokio::test]
    async fn test_sequential_refinements_chain_estimates() {
        let (wf, service, _) = ready_workflow(
            "v1",
            vec![Outcome::Text("v2".into()), Outcome::Text("v3".into())],
        )
        .await;

        wf.refine("first").await.unwrap();
        wf.refine("second").await.unwrap();

        assert_eq!(wf.estimate().as_str(), "v3");
        let refines: Vec<Recorded> = service
            .requests()
            .into_iter()
            .filter(|r| matches!(r, Recorded::Refine { .. }))
            .collect();
        assert_eq!(
            refines,
            vec![
                Recorded::Refine {
                    scope_text: "v1".into(),
                    feedback: "first".into()
                },
                Recorded::Refine {
                    scope_text: "v2".into(),
                    feedback: "second".into()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_export_without_estimate_is_rejected_locally() {
        let (wf, service, sink) = workflow(vec![]);

        let err = wf.request_export(OutputKind::Pdf).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(ValidationError::NoEstimate)));
        assert_eq!(service.call_count(), 0);
        assert!(sink.saved().is_empty());
        assert_eq!(wf.snapshot().exporting, FlagState::Idle);
    }

    #[tokio::test]
    async fn test_export_pdf_saves_estimation_pdf() {
        let payload = b"%PDF-1.4\x00\xff binary".to_vec();
        let (wf, _, sink) = ready_workflow("# Estimate", vec![Outcome::Bytes(payload.clone())]).await;

        let saved = wf.request_export(OutputKind::Pdf).await.unwrap();

        assert_eq!(saved.kind, OutputKind::Pdf);
        assert_eq!(saved.size_bytes, payload.len());
        assert_eq!(sink.saved(), vec![("estimation.pdf".to_string(), payload)]);
        assert_eq!(wf.snapshot().exporting, FlagState::Idle);
    }

    #[tokio::test]
    async fn test_export_to_disk_releases_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let service = MockEstimationService::with_outcomes(vec![
            Outcome::Text("# Estimate".into()),
            Outcome::Bytes(b"%PDF-1.7".to_vec()),
        ]);
        let wf = Workflow::new(service, Arc::new(FileDownloadSink::new(dir.path())));
        wf.select_document(pdf("spec.pdf"));
        wf.submit_document().await.unwrap();

        let saved = wf.request_export(OutputKind::Pdf).await.unwrap();

        assert_eq!(saved.path, dir.path().join("estimation.pdf"));
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("estimation.pdf")]);
    }

    #[tokio::test]
    async fn test_export_failure_clears_flag_and_keeps_estimate() {
        let (wf, _, sink) =
            ready_workflow("# Estimate", vec![Outcome::Transport("connection reset".into())]).await;

        assert!(wf.request_export(OutputKind::Docx).await.is_err());

        let snapshot = wf.snapshot();
        assert!(!snapshot.exporting.is_busy());
        assert_eq!(snapshot.estimate.as_str(), "# Estimate");
        assert!(sink.saved().is_empty());
        assert!(snapshot.availability().export);
    }

    #[tokio::test]
    async fn test_export_uses_estimate_snapshot_taken_at_call_time() {
        let (wf, service, _) = ready_workflow(
            "old",
            vec![Outcome::Bytes(b"doc".to_vec()), Outcome::Text("new".into())],
        )
        .await;
        service.hold_calls();
        wf.set_feedback("tweak");

        let export = wf.request_export(OutputKind::Docx);
        let regenerate = async {
            service.wait_for_calls(2).await;
            let refreshed = async {
                service.wait_for_calls(3).await;
                service.release_one();
                service.release_one();
            };
            let (result, ()) = tokio::join!(wf.submit_feedback(), refreshed);
            result
        };
        let (exported, regenerated) = tokio::join!(export, regenerate);

        exported.unwrap();
        assert_eq!(regenerated.unwrap().as_str(), "new");
        assert_eq!(wf.estimate().as_str(), "new");
        assert!(service.requests().contains(&Recorded::Export {
            scope_text: "old".into(),
            kind: OutputKind::Docx
        }));
    }

    #[tokio::test]
    async fn test_export_does_not_block_regenerate() {
        let (wf, service, _) = ready_workflow(
            "# Estimate",
            vec![Outcome::Bytes(b"pdf".to_vec()), Outcome::Text("# Refined".into())],
        )
        .await;
        service.hold_calls();
        wf.set_feedback("more detail");

        let export = wf.request_export(OutputKind::Pdf);
        let regenerate = async {
            service.wait_for_calls(2).await;
            let snapshot = wf.snapshot();
            assert!(snapshot.is_exporting());
            assert!(snapshot.availability().regenerate);
            let result = async {
                service.wait_for_calls(3).await;
                service.release_one();
                service.release_one();
            };
            tokio::join!(wf.submit_feedback(), result).0
        };
        let (exported, regenerated) = tokio::join!(export, regenerate);

        assert!(exported.is_ok());
        assert_eq!(regenerated.unwrap().as_str(), "# Refined");
        let snapshot = wf.snapshot();
        assert!(!snapshot.is_exporting());
        assert!(!snapshot.regenerating.is_busy());
    }

    #[tokio::test]
    async fn test_workflow_stays_usable_after_failure() {
        let (wf, _, _) = workflow(vec![
            Outcome::Transport("refused".into()),
            Outcome::Text("# Estimate".into()),
        ]);
        wf.select_document(pdf("spec.pdf"));

        assert!(wf.submit_document().await.is_err());
        let estimate = wf.submit_document().await.unwrap();

        assert_eq!(estimate.as_str(), "# Estimate");
        let snapshot = wf.snapshot();
        assert_eq!(snapshot.ingesting, FlagState::Idle);
        assert!(snapshot.last_error.is_none());
    }
    #[tokio::test]
    async fn test_feedback_edited_during_regenerate_survives_success() {
        let (wf, service, _) = ready_workflow("v1", vec![Outcome::Text("v2".into())]).await;
        wf.set_feedback("first idea");
        service.hold_calls();

        let first = wf.submit_feedback();
        let edit = async {
            service.wait_for_calls(2).await;
            wf.set_feedback("second idea");
            service.release_one();
        };
        let (first, ()) = tokio::join!(first, edit);

        assert_eq!(first.unwrap().as_str(), "v2");
        let snapshot = wf.snapshot();
        assert_eq!(snapshot.estimate.as_str(), "v2");
        assert_eq!(snapshot.feedback, "second idea");
        assert_eq!(service.call_count(), 2);
    }

    #[tokio::test]
    async fn test_refine_during_regenerate_keeps_pending_feedback() {
        let (wf, service, _) = ready_workflow("v1", vec![Outcome::Text("v2".into())]).await;
        wf.set_feedback("first idea");
        service.hold_calls();

        let first = wf.submit_feedback();
        let second = async {
            service.wait_for_calls(2).await;
            wf.set_feedback("second idea");
            let rejected = wf.refine("third idea").await;
            assert_eq!(wf.snapshot().feedback, "second idea");
            service.release_one();
            rejected
        };
        let (first, second) = tokio::join!(first, second);

        assert!(first.is_ok());
        assert!(matches!(
            second,
            Err(AppError::Validation(ValidationError::AlreadyInFlight(
                Action::Regenerate
            )))
        ));
        assert_eq!(wf.snapshot().feedback, "second idea");
        assert_eq!(service.call_count(), 2);
    }

    #[tokio::test]
    async fn test_reentrant_feedback_is_rejected_without_second_request() {
        let (wf, service, _) = ready_workflow("v1", vec![Outcome::Text("v2".into())]).await;
        wf.set_feedback("tighten QA");
        service.hold_calls();

        let first = wf.submit_feedback();
        let second = async {
            service.wait_for_calls(2).await;
            let rejected = wf.submit_feedback().await;
            let snapshot = wf.snapshot();
            assert_eq!(service.call_count(), 2);
            assert_eq!(snapshot.estimate.as_str(), "v1");
            assert_eq!(snapshot.feedback, "tighten QA");
            assert_eq!(snapshot.regenerating, FlagState::InFlight);
            service.release_one();
            rejected
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap().as_str(), "v2");
        assert!(matches!(
            second,
            Err(AppError::Validation(ValidationError::AlreadyInFlight(
                Action::Regenerate
            )))
        ));
        assert_eq!(service.call_count(), 2);
        assert_eq!(wf.snapshot().regenerating, FlagState::Idle);
    }

    #[tokio::test]
    async fn test_reentrant_export_is_rejected_without_second_request() {
        let (wf, service, sink) =
            ready_workflow("# Estimate", vec![Outcome::Bytes(b"pdf".to_vec())]).await;
        wf.set_feedback("keep me");
        service.hold_calls();

        let first = wf.request_export(OutputKind::Pdf);
        let second = async {
            service.wait_for_calls(2).await;
            let rejected = wf.request_export(OutputKind::Docx).await;
            let snapshot = wf.snapshot();
            assert_eq!(service.call_count(), 2);
            assert_eq!(snapshot.estimate.as_str(), "# Estimate");
            assert_eq!(snapshot.feedback, "keep me");
            assert!(snapshot.is_exporting());
            service.release_one();
            rejected
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first.unwrap().kind, OutputKind::Pdf);
        assert!(matches!(
            second,
            Err(AppError::Validation(ValidationError::AlreadyInFlight(
                Action::Export
            )))
        ));
        assert_eq!(service.call_count(), 2);
        assert_eq!(sink.saved(), vec![("estimation.pdf".to_string(), b"pdf".to_vec())]);
        assert_eq!(wf.snapshot().feedback, "keep me");
    }

    #[tokio::test]
    async fn test_last_error_cleared_only_by_same_action() {
        let (wf, _, _) = ready_workflow(
            "# Estimate",
            vec![
                Outcome::Service(502, "bad gateway".into()),
                Outcome::Bytes(b"pdf".to_vec()),
                Outcome::Text("# Refined".into()),
            ],
        )
        .await;

        let err = wf.refine("add hosting").await.unwrap_err();
        wf.request_export(OutputKind::Pdf).await.unwrap();

        let snapshot = wf.snapshot();
        assert_eq!(snapshot.last_error, Some(err.to_string()));
        assert_eq!(snapshot.regenerating, FlagState::Failed(err.to_string()));
        assert_eq!(snapshot.exporting, FlagState::Idle);

        wf.submit_feedback().await.unwrap();
        assert!(wf.snapshot().last_error.is_none());
    }
}
