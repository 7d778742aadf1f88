//! Request parsing and validation for the ingest endpoint.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use campus_reco::LearnerLessonCompleted;

/// Wire shape of `POST /api/events/lesson_completed`.
#[derive(Debug, Deserialize)]
pub struct LessonCompletedEnvelope {
    pub event: LessonCompletedBody,
}

#[derive(Debug, Default, Deserialize)]
pub struct LessonCompletedBody {
    pub user_id: Option<String>,
    pub lesson_id: Option<String>,
    pub course_id: Option<String>,
    /// ISO-8601 timestamp; absent means "received now".
    pub completed_at: Option<String>,
}

/// Validate the wire payload into a typed integration event.
///
/// Missing/blank ids and malformed timestamps are client errors; an absent
/// timestamp defaults to the receipt time.
pub fn parse_event(
    body: LessonCompletedBody,
    received_at: DateTime<Utc>,
) -> Result<LearnerLessonCompleted, String> {
    let user_id = require(body.user_id, "user_id")?;
    let lesson_id = require(body.lesson_id, "lesson_id")?;
    let course_id = require(body.course_id, "course_id")?;

    let completed_at = match body.completed_at {
        Some(raw) => DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| format!("completed_at is not a valid ISO-8601 timestamp: {raw}"))?,
        None => received_at,
    };

    Ok(LearnerLessonCompleted {
        user_id,
        lesson_id,
        course_id,
        completed_at,
    })
}

fn require(value: Option<String>, field: &str) -> Result<String, String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(format!("{field} is required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(user: &str, lesson: &str, course: &str) -> LessonCompletedBody {
        LessonCompletedBody {
            user_id: Some(user.to_string()),
            lesson_id: Some(lesson.to_string()),
            course_id: Some(course.to_string()),
            completed_at: None,
        }
    }

    #[test]
    fn valid_payload_parses() {
        let mut b = body("user-1", "l1", "c1");
        b.completed_at = Some("2024-06-01T10:00:00Z".to_string());

        let ev = parse_event(b, Utc::now()).unwrap();
        assert_eq!(ev.user_id, "user-1");
        assert_eq!(ev.completed_at.to_rfc3339(), "2024-06-01T10:00:00+00:00");
    }

    #[test]
    fn absent_timestamp_defaults_to_receipt_time() {
        let received = Utc::now();
        let ev = parse_event(body("user-1", "l1", "c1"), received).unwrap();
        assert_eq!(ev.completed_at, received);
    }

    #[test]
    fn malformed_timestamp_is_rejected() {
        let mut b = body("user-1", "l1", "c1");
        b.completed_at = Some("yesterday-ish".to_string());

        let err = parse_event(b, Utc::now()).unwrap_err();
        assert!(err.contains("completed_at"));
    }

    #[test]
    fn missing_ids_are_rejected() {
        for field in ["user_id", "lesson_id", "course_id"] {
            let mut b = body("user-1", "l1", "c1");
            match field {
                "user_id" => b.user_id = None,
                "lesson_id" => b.lesson_id = Some("  ".to_string()),
                _ => b.course_id = None,
            }
            let err = parse_event(b, Utc::now()).unwrap_err();
            assert!(err.contains(field), "expected error naming {field}: {err}");
        }
    }
}
