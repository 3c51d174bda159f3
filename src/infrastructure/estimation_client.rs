//! HTTP transport for the remote estimation service.
//!
//! Every call issues exactly one request and yields exactly one outcome.
//! Connection problems become `AppError::Transport`, non-2xx answers become
//! `AppError::Service`.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::domain::{AppError, ExportRequest, Result, ServiceConfig, SourceDocument};

/// Multipart field carrying the uploaded document.
const UPLOAD_FIELD: &str = "file";

/// Boundary contract with the estimation service.
#[async_trait]
pub trait EstimationService: Send + Sync {
    /// Upload a document and receive the first estimate.
    async fn ingest(&self, document: &SourceDocument) -> Result<String>;

    /// Regenerate an estimate from the current text plus user feedback.
    async fn refine(&self, scope_text: &str, feedback: &str) -> Result<String>;

    /// Render an estimate to a binary document, returned byte-for-byte.
    async fn export(&self, request: &ExportRequest) -> Result<Vec<u8>>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackBody<'a> {
    scope_text: &'a str,
    feedback: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportBody<'a> {
    scope_text: &'a str,
}

/// Error payload returned by the service framework on failures.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// `reqwest`-backed implementation of [`EstimationService`].
pub struct HttpEstimationClient {
    client: Client,
    service: ServiceConfig,
}

impl HttpEstimationClient {
    /// Build a client for the configured service.
    ///
    /// # Errors
    /// Returns error if the underlying HTTP client cannot be constructed.
    pub fn new(service: ServiceConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = service.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(AppError::transport)?;

        Ok(Self { client, service })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.service.base_url
    }
}

#[async_trait]
impl EstimationService for HttpEstimationClient {
    async fn ingest(&self, document: &SourceDocument) -> Result<String> {
        let url = self.service.upload_url();
        tracing::debug!(
            url = %url,
            file = %document.file_name,
            bytes = document.size_bytes(),
            "Uploading document"
        );

        let part = Part::bytes(document.bytes.clone())
            .file_name(document.file_name.clone())
            .mime_str(document.media_type.mime())
            .map_err(AppError::transport)?;
        let form = Form::new().part(UPLOAD_FIELD, part);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(AppError::transport)?;

        check_status(response)
            .await?
            .text()
            .await
            .map_err(AppError::transport)
    }

    async fn refine(&self, scope_text: &str, feedback: &str) -> Result<String> {
        let url = self.service.feedback_url();
        tracing::debug!(url = %url, feedback_len = feedback.len(), "Sending feedback");

        let response = self
            .client
            .post(&url)
            .json(&FeedbackBody {
                scope_text,
                feedback,
            })
            .send()
            .await
            .map_err(AppError::transport)?;

        check_status(response)
            .await?
            .text()
            .await
            .map_err(AppError::transport)
    }

    async fn export(&self, request: &ExportRequest) -> Result<Vec<u8>> {
        let url = self.service.export_url(request.kind);
        tracing::debug!(url = %url, kind = %request.kind, "Requesting export");

        let response = self
            .client
            .post(&url)
            .json(&ExportBody {
                scope_text: request.estimate.as_str(),
            })
            .send()
            .await
            .map_err(AppError::transport)?;

        let response = check_status(response).await?;
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with(request.kind.content_type()) {
            tracing::debug!(
                expected = request.kind.content_type(),
                received = %content_type,
                "Unexpected export content type"
            );
        }

        let bytes = response.bytes().await.map_err(AppError::transport)?;

        Ok(bytes.to_vec())
    }
}

/// Turn a non-success response into `AppError::Service`.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = service_message(&body)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| "request failed".to_string());

    tracing::warn!(status = status.as_u16(), message = %message, "Estimation service error");

    Err(AppError::Service {
        status: status.as_u16(),
        message,
    })
}

/// Pull a readable message out of an error body (JSON or plain text).
fn service_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message.or(parsed.error))
        .or_else(|| Some(body.to_string()))
}
