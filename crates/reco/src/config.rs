//! Fallback recommendation configuration.
//!
//! The engine must always return a usable value, even with no history and
//! no reachable upstream. These fallbacks are configuration, overridable
//! via environment variables.

/// A configured course to fall back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackCourse {
    pub course_id: String,
    pub title: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationsConfig {
    /// Served to learners with no history when the upstream course list is
    /// empty or unreachable.
    pub new_learner: FallbackCourse,
    /// Last-resort generic recommendation.
    pub popular: FallbackCourse,
}

impl Default for RecommendationsConfig {
    fn default() -> Self {
        Self {
            new_learner: FallbackCourse {
                course_id: "beginner-course-001".to_string(),
                title: "Introduction to Learning".to_string(),
                reason: "Recommended for new learners (fallback)".to_string(),
            },
            popular: FallbackCourse {
                course_id: "popular-course-001".to_string(),
                title: "Popular Course".to_string(),
                reason: "Recommended based on popular courses".to_string(),
            },
        }
    }
}

impl RecommendationsConfig {
    /// Read overrides from the environment, keeping defaults for anything
    /// unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            new_learner: FallbackCourse {
                course_id: env_or(
                    "FALLBACK_NEW_LEARNER_COURSE_ID",
                    &defaults.new_learner.course_id,
                ),
                title: env_or(
                    "FALLBACK_NEW_LEARNER_COURSE_TITLE",
                    &defaults.new_learner.title,
                ),
                reason: defaults.new_learner.reason,
            },
            popular: FallbackCourse {
                course_id: env_or("FALLBACK_POPULAR_COURSE_ID", &defaults.popular.course_id),
                title: env_or("FALLBACK_POPULAR_COURSE_TITLE", &defaults.popular.title),
                reason: defaults.popular.reason,
            },
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_shipped_fallbacks() {
        let cfg = RecommendationsConfig::default();
        assert_eq!(cfg.new_learner.course_id, "beginner-course-001");
        assert_eq!(cfg.new_learner.title, "Introduction to Learning");
        assert_eq!(cfg.popular.course_id, "popular-course-001");
    }
}
