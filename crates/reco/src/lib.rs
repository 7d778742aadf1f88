//! Recommendation domain module (downstream service).
//!
//! State here is derived purely from events relayed by the learning
//! platform, plus live queries against it. Nothing in this crate is
//! authoritative for course or lesson data.

pub mod config;
pub mod history;
pub mod lms_client;
pub mod recommend;

pub use config::{FallbackCourse, RecommendationsConfig};
pub use history::{
    LEARNER_AGGREGATE_TYPE, InMemoryLearnerHistoryStore, LearnerHistoryProjection,
    LearnerHistoryRecord, LearnerHistoryStore, LearnerLessonCompleted, learner_stream_id,
};
pub use lms_client::{CourseStat, CourseSummary, HttpLmsClient, LmsGateway, UpstreamError, UserStatsDto};
pub use recommend::{Recommendation, RecommendationEngine};
