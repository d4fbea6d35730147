//! Stage persistence collaborator: the only outbound call the funnel makes.
//!
//! `PipelineStageStore` depends on the `StageBackend` trait alone; the host picks
//! `HttpStageBackend` when a backend URL is configured and `LocalStageBackend`
//! otherwise. Retries and backoff are the transport's concern, not ours.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::models::Stage;

#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend rejected the change (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("request timed out")]
    Timeout,
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            BackendError::Timeout
        } else {
            BackendError::Transport(e.to_string())
        }
    }
}

/// Persistence contract consumed by the stage store.
#[async_trait]
pub trait StageBackend: Send + Sync {
    async fn persist_stage_change(&self, entry_id: &str, to: Stage) -> Result<(), BackendError>;

    async fn persist_delete(&self, entry_id: &str) -> Result<(), BackendError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LocalStageBackend
// ────────────────────────────────────────────────────────────────────────────

/// Confirms every change. Used when the host runs without a persistence service.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStageBackend;

#[async_trait]
impl StageBackend for LocalStageBackend {
    async fn persist_stage_change(&self, entry_id: &str, to: Stage) -> Result<(), BackendError> {
        debug!("Local backend confirmed {entry_id} -> {to}");
        Ok(())
    }

    async fn persist_delete(&self, entry_id: &str) -> Result<(), BackendError> {
        debug!("Local backend confirmed delete of {entry_id}");
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// HttpStageBackend
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct StageChangeBody {
    stage: Stage,
}

/// REST client for the recruiter pipeline endpoints of the matching backend.
#[derive(Clone)]
pub struct HttpStageBackend {
    client: Client,
    base_url: String,
}

impl HttpStageBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to build HTTP client"),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn entry_url(&self, entry_id: &str) -> String {
        format!("{}/pipeline/{}", self.base_url, entry_id)
    }
}

#[async_trait]
impl StageBackend for HttpStageBackend {
    async fn persist_stage_change(&self, entry_id: &str, to: Stage) -> Result<(), BackendError> {
        let response = self
            .client
            .patch(self.entry_url(entry_id))
            .json(&StageChangeBody { stage: to })
            .send()
            .await?;
        check_status(response).await
    }

    async fn persist_delete(&self, entry_id: &str) -> Result<(), BackendError> {
        let response = self.client.delete(self.entry_url(entry_id)).send().await?;
        check_status(response).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<(), BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        return Err(BackendError::Timeout);
    }
    let message = response.text().await.unwrap_or_default();
    Err(BackendError::Rejected {
        status: status.as_u16(),
        message,
    })
}
