//! Next-course recommendation engine.
//!
//! State-free per request: reads the local learner history plus live
//! upstream queries, walking a fixed fallback chain until a tier yields a
//! recommendation. Upstream failures are logged and demoted to "try the
//! next tier" - this function is total and never propagates them.
//!
//! Tiers, in order:
//! 1. no history  → first course from the upstream list
//! 2. history     → first upstream course with completion below 100%
//! 3. history     → "related to" the most recently completed course
//! 4. configured popular-course fallback

use crate::config::RecommendationsConfig;
use crate::history::LearnerHistoryStore;
use crate::lms_client::LmsGateway;

/// A course recommendation with the reasoning behind it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub course_id: String,
    pub title: Option<String>,
    pub reason: String,
}

pub struct RecommendationEngine<G, S>
where
    G: LmsGateway,
    S: LearnerHistoryStore,
{
    gateway: G,
    history: S,
    config: RecommendationsConfig,
}

impl<G, S> RecommendationEngine<G, S>
where
    G: LmsGateway,
    S: LearnerHistoryStore,
{
    pub fn new(gateway: G, history: S, config: RecommendationsConfig) -> Self {
        Self {
            gateway,
            history,
            config,
        }
    }

    /// Recommend the next course for a user.
    ///
    /// Always yields a recommendation with the current tier set; `None` is
    /// reserved for future tiers that may decline, and callers map it to
    /// their own not-found response.
    pub async fn next_course(&self, user_id: &str) -> Option<Recommendation> {
        let history = self.history.for_user(user_id);

        if history.is_empty() {
            Some(self.recommend_for_new_learner().await)
        } else {
            // Rows arrive most recent first; ties cannot occur at the
            // timestamp resolution in use.
            let recent_course = history.first().map(|r| r.course_id.clone());
            Some(self.recommend_for_existing_learner(user_id, recent_course).await)
        }
    }

    async fn recommend_for_new_learner(&self) -> Recommendation {
        match self.gateway.courses().await {
            Ok(courses) if !courses.is_empty() => {
                // New users have no preferences yet; the first available
                // course is the entry point.
                let course = &courses[0];
                Recommendation {
                    course_id: course.id.clone().unwrap_or_default(),
                    title: course.title.clone(),
                    reason: "Recommended for new learners - first available course from LMS"
                        .to_string(),
                }
            }
            Ok(_) => self.new_learner_fallback(),
            Err(e) => {
                tracing::error!("error fetching courses from learning platform: {e}");
                self.new_learner_fallback()
            }
        }
    }

    async fn recommend_for_existing_learner(
        &self,
        user_id: &str,
        recent_course: Option<String>,
    ) -> Recommendation {
        if let Some(recommendation) = self.fetch_incomplete_course(user_id).await {
            return recommendation;
        }

        self.existing_learner_fallback(recent_course)
    }

    /// First upstream course the user hasn't finished, or `None` on any
    /// upstream failure or when everything is complete.
    async fn fetch_incomplete_course(&self, user_id: &str) -> Option<Recommendation> {
        let stats = match self.gateway.user_stats(user_id).await {
            Ok(stats) => stats,
            Err(e) => {
                tracing::error!("error fetching user stats from learning platform: {e}");
                return None;
            }
        };

        stats
            .courses
            .iter()
            .find_map(|course| {
                let pct = course.completion_percentage?;
                // Finishing started courses beats starting new ones.
                (pct < 100.0).then(|| Recommendation {
                    course_id: course.course_id.clone(),
                    title: course.title.clone(),
                    reason: format!("Continue your learning - {pct}% complete"),
                })
            })
    }

    fn existing_learner_fallback(&self, recent_course: Option<String>) -> Recommendation {
        match recent_course {
            Some(course_id) => Recommendation {
                course_id: format!("related-to-{course_id}"),
                title: Some("Advanced Course".to_string()),
                reason: format!("Based on your completion of course {course_id}"),
            },
            None => Recommendation {
                course_id: self.config.popular.course_id.clone(),
                title: Some(self.config.popular.title.clone()),
                reason: self.config.popular.reason.clone(),
            },
        }
    }

    fn new_learner_fallback(&self) -> Recommendation {
        Recommendation {
            course_id: self.config.new_learner.course_id.clone(),
            title: Some(self.config.new_learner.title.clone()),
            reason: self.config.new_learner.reason.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    use crate::history::{InMemoryLearnerHistoryStore, LearnerHistoryRecord};
    use crate::lms_client::{CourseStat, CourseSummary, UpstreamError, UserStatsDto};

    /// Scripted gateway: each call replays a canned response.
    struct MockGateway {
        courses: Result<Vec<CourseSummary>, UpstreamError>,
        stats: Result<UserStatsDto, UpstreamError>,
    }

    impl MockGateway {
        fn unreachable() -> Self {
            Self {
                courses: Err(UpstreamError::Status(503)),
                stats: Err(UpstreamError::Status(503)),
            }
        }

        fn with_courses(courses: Vec<CourseSummary>) -> Self {
            Self {
                courses: Ok(courses),
                ..Self::unreachable()
            }
        }

        fn with_stats(stats: UserStatsDto) -> Self {
            Self {
                stats: Ok(stats),
                ..Self::unreachable()
            }
        }
    }

    #[async_trait]
    impl LmsGateway for MockGateway {
        async fn courses(&self) -> Result<Vec<CourseSummary>, UpstreamError> {
            match &self.courses {
                Ok(v) => Ok(v.clone()),
                Err(_) => Err(UpstreamError::Status(503)),
            }
        }

        async fn user_stats(&self, _user_id: &str) -> Result<UserStatsDto, UpstreamError> {
            match &self.stats {
                Ok(v) => Ok(v.clone()),
                Err(_) => Err(UpstreamError::Status(503)),
            }
        }
    }

    fn summary(id: &str, title: &str) -> CourseSummary {
        CourseSummary {
            id: Some(id.to_string()),
            title: Some(title.to_string()),
        }
    }

    fn stat(course_id: &str, title: &str, pct: f64) -> CourseStat {
        CourseStat {
            course_id: course_id.to_string(),
            title: Some(title.to_string()),
            completion_percentage: Some(pct),
        }
    }

    fn history_with(rows: &[(&str, &str, i64)]) -> Arc<InMemoryLearnerHistoryStore> {
        let store = Arc::new(InMemoryLearnerHistoryStore::new());
        for (user_id, course_id, day) in rows {
            store.append(LearnerHistoryRecord {
                user_id: user_id.to_string(),
                lesson_id: format!("lesson-{course_id}"),
                course_id: course_id.to_string(),
                completed_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + chrono::Duration::days(*day),
            });
        }
        store
    }

    fn engine<G: LmsGateway>(
        gateway: G,
        history: Arc<InMemoryLearnerHistoryStore>,
    ) -> RecommendationEngine<G, Arc<InMemoryLearnerHistoryStore>> {
        RecommendationEngine::new(gateway, history, RecommendationsConfig::default())
    }

    #[tokio::test]
    async fn new_learner_gets_first_upstream_course() {
        let e = engine(
            MockGateway::with_courses(vec![summary("c1", "T1"), summary("c2", "T2")]),
            history_with(&[]),
        );

        let rec = e.next_course("user-123").await.unwrap();
        assert_eq!(rec.course_id, "c1");
        assert_eq!(rec.title.as_deref(), Some("T1"));
        assert!(rec.reason.contains("new learners"));
        assert!(rec.reason.contains("first available course from LMS"));
    }

    #[tokio::test]
    async fn new_learner_falls_back_on_empty_course_list() {
        let e = engine(MockGateway::with_courses(vec![]), history_with(&[]));

        let rec = e.next_course("user-123").await.unwrap();
        assert_eq!(rec.course_id, "beginner-course-001");
        assert_eq!(rec.title.as_deref(), Some("Introduction to Learning"));
        assert!(rec.reason.contains("fallback"));
    }

    #[tokio::test]
    async fn new_learner_falls_back_when_upstream_unreachable() {
        let e = engine(MockGateway::unreachable(), history_with(&[]));

        let rec = e.next_course("user-123").await.unwrap();
        assert_eq!(rec.course_id, "beginner-course-001");
    }

    #[tokio::test]
    async fn existing_learner_gets_first_incomplete_course() {
        let e = engine(
            MockGateway::with_stats(UserStatsDto {
                user_id: "user-123".to_string(),
                total_lessons_completed: 3,
                total_courses_enrolled: 2,
                courses: vec![stat("c1", "T1", 100.0), stat("c3", "T3", 45.5)],
            }),
            history_with(&[("user-123", "c1", 0)]),
        );

        let rec = e.next_course("user-123").await.unwrap();
        assert_eq!(rec.course_id, "c3");
        assert!(rec.reason.contains("45.5% complete"));
    }

    #[tokio::test]
    async fn fully_complete_history_falls_back_to_related_course() {
        let e = engine(
            MockGateway::with_stats(UserStatsDto {
                user_id: "user-123".to_string(),
                total_lessons_completed: 5,
                total_courses_enrolled: 1,
                courses: vec![stat("c1", "T1", 100.0)],
            }),
            history_with(&[("user-123", "c1", 0)]),
        );

        let rec = e.next_course("user-123").await.unwrap();
        assert_eq!(rec.course_id, "related-to-c1");
        assert_eq!(rec.title.as_deref(), Some("Advanced Course"));
        assert!(rec.reason.contains("completion of course c1"));
    }

    #[tokio::test]
    async fn related_fallback_uses_most_recent_completion() {
        let e = engine(
            MockGateway::unreachable(),
            history_with(&[("user-123", "c1", 0), ("user-123", "c2", 7)]),
        );

        let rec = e.next_course("user-123").await.unwrap();
        assert_eq!(rec.course_id, "related-to-c2");
    }

    #[tokio::test]
    async fn upstream_failure_never_escapes_the_engine() {
        let e = engine(
            MockGateway::unreachable(),
            history_with(&[("user-123", "c1", 0)]),
        );

        // Degrades to the related-course tier instead of erroring.
        let rec = e.next_course("user-123").await.unwrap();
        assert_eq!(rec.course_id, "related-to-c1");
    }

    #[tokio::test]
    async fn stats_without_percentages_fall_through() {
        let e = engine(
            MockGateway::with_stats(UserStatsDto {
                user_id: "user-123".to_string(),
                total_lessons_completed: 1,
                total_courses_enrolled: 1,
                courses: vec![CourseStat {
                    course_id: "c1".to_string(),
                    title: None,
                    completion_percentage: None,
                }],
            }),
            history_with(&[("user-123", "c1", 0)]),
        );

        let rec = e.next_course("user-123").await.unwrap();
        assert_eq!(rec.course_id, "related-to-c1");
    }

    #[tokio::test]
    async fn other_users_history_does_not_leak() {
        let e = engine(
            MockGateway::with_courses(vec![summary("c1", "T1")]),
            history_with(&[("someone-else", "c9", 0)]),
        );

        let rec = e.next_course("user-123").await.unwrap();
        // user-123 is still a new learner.
        assert_eq!(rec.course_id, "c1");
    }
}
