//! HTTP gateway to the upstream learning platform.
//!
//! Every call is bounded by short connect/read timeouts, and every failure
//! surfaces as [`UpstreamError`]. Callers treat those errors as degraded
//! functionality, never as their own failure.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Course list entry as returned by `GET /api/courses`.
///
/// Only `id` is required; the upstream payload may omit the rest.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CourseSummary {
    pub id: Option<String>,
    pub title: Option<String>,
}

/// Per-course completion entry from `GET /api/users/{id}/stats`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CourseStat {
    pub course_id: String,
    pub title: Option<String>,
    pub completion_percentage: Option<f64>,
}

/// Response shape of `GET /api/users/{id}/stats`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserStatsDto {
    pub user_id: String,
    #[serde(default)]
    pub total_lessons_completed: u64,
    #[serde(default)]
    pub total_courses_enrolled: u64,
    #[serde(default)]
    pub courses: Vec<CourseStat>,
}

/// Network/timeout/decoding failure talking to the learning platform.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to learning platform failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("learning platform responded with status {0}")]
    Status(u16),

    #[error("failed to decode learning platform response: {0}")]
    Decode(String),
}

/// Read-only gateway to the learning platform.
#[async_trait]
pub trait LmsGateway: Send + Sync {
    /// Fetch the full course list.
    async fn courses(&self) -> Result<Vec<CourseSummary>, UpstreamError>;

    /// Fetch per-course completion stats for one user.
    async fn user_stats(&self, user_id: &str) -> Result<UserStatsDto, UpstreamError>;
}

/// `reqwest`-backed gateway.
#[derive(Debug, Clone)]
pub struct HttpLmsClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpLmsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .connect_timeout(UPSTREAM_TIMEOUT)
            .timeout(UPSTREAM_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into(),
            http,
        }
    }

    /// Base URL from `LMS_SERVICE_URL` (default `http://lms:3000`).
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("LMS_SERVICE_URL").unwrap_or_else(|_| "http://lms:3000".to_string());
        Self::new(base_url)
    }
}

#[async_trait]
impl LmsGateway for HttpLmsClient {
    async fn courses(&self) -> Result<Vec<CourseSummary>, UpstreamError> {
        let url = format!("{}/api/courses", self.base_url);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status().as_u16()));
        }

        response
            .json::<Vec<CourseSummary>>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }

    async fn user_stats(&self, user_id: &str) -> Result<UserStatsDto, UpstreamError> {
        let url = format!("{}/api/users/{user_id}/stats", self.base_url);
        let response = self.http.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status(response.status().as_u16()));
        }

        response
            .json::<UserStatsDto>()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_summary_tolerates_missing_fields() {
        let parsed: Vec<CourseSummary> =
            serde_json::from_str(r#"[{"id":"c1"},{"title":"No id"}]"#).unwrap();
        assert_eq!(parsed[0].id.as_deref(), Some("c1"));
        assert!(parsed[0].title.is_none());
        assert!(parsed[1].id.is_none());
    }

    #[test]
    fn user_stats_defaults_missing_collections() {
        let parsed: UserStatsDto = serde_json::from_str(r#"{"user_id":"u1"}"#).unwrap();
        assert_eq!(parsed.user_id, "u1");
        assert_eq!(parsed.total_lessons_completed, 0);
        assert!(parsed.courses.is_empty());
    }

    #[test]
    fn course_stat_keeps_fractional_percentages() {
        let parsed: CourseStat = serde_json::from_str(
            r#"{"course_id":"c3","title":"T3","completion_percentage":45.5}"#,
        )
        .unwrap();
        assert_eq!(parsed.completion_percentage, Some(45.5));
    }
}
