//! Best-effort completion relay to the recommendation service.
//!
//! After a completion commits locally, the event is forwarded over HTTP
//! with a bounded timeout. Delivery is at-most-once: a failed or timed-out
//! call is dropped, never queued or retried, and the local commit has
//! already succeeded by the time the relay runs. The system-of-record write
//! never fails or blocks because the downstream service is unavailable.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

const RELAY_TIMEOUT: Duration = Duration::from_secs(5);

/// The completion fact forwarded downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    pub user_id: String,
    pub lesson_id: String,
    pub course_id: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay target responded with status {0}")]
    Status(u16),
}

/// Forwarder for committed completion events.
#[async_trait]
pub trait CompletionRelay: Send + Sync {
    async fn lesson_completed(&self, event: &CompletionEvent) -> Result<(), RelayError>;
}

/// `reqwest`-backed relay posting to the recommendation service.
#[derive(Debug, Clone)]
pub struct HttpCompletionRelay {
    endpoint: String,
    http: reqwest::Client,
}

impl HttpCompletionRelay {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(RELAY_TIMEOUT)
            .timeout(RELAY_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            endpoint: format!("{}/api/events/lesson_completed", base_url.into()),
            http,
        }
    }

    /// Target from `RECO_SERVICE_URL` (default `http://reco:3000`).
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("RECO_SERVICE_URL").unwrap_or_else(|_| "http://reco:3000".to_string());
        Self::new(base_url)
    }
}

#[async_trait]
impl CompletionRelay for HttpCompletionRelay {
    async fn lesson_completed(&self, event: &CompletionEvent) -> Result<(), RelayError> {
        let body = serde_json::json!({
            "event": {
                "user_id": event.user_id,
                "lesson_id": event.lesson_id,
                "course_id": event.course_id,
                "completed_at": event.completed_at.to_rfc3339(),
            }
        });

        let response = self.http.post(&self.endpoint).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(RelayError::Status(response.status().as_u16()));
        }

        Ok(())
    }
}
