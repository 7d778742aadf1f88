use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use campus_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use campus_events::{Command, Event};

use crate::course::CourseId;

/// Lesson identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LessonId(pub AggregateId);

impl LessonId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for LessonId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Lesson.
///
/// A lesson belongs to a course and can be completed any number of times by
/// any number of users. Who completed it is **not** aggregate state - the
/// aggregate validates and emits the completion fact; per-user completion
/// lives only in the read model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    course_id: Option<CourseId>,
    title: String,
    content: Option<String>,
    order: i32,
    created: bool,
    deleted: bool,
    version: u64,
}

impl Lesson {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: LessonId) -> Self {
        Self {
            id,
            course_id: None,
            title: String::new(),
            content: None,
            order: 0,
            created: false,
            deleted: false,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> LessonId {
        self.id
    }

    pub fn course_id(&self) -> Option<CourseId> {
        self.course_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl AggregateRoot for Lesson {
    type Id = LessonId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateLesson.
///
/// `order` is optional; an omitted order means position 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLesson {
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub title: String,
    pub content: Option<String>,
    pub order: Option<i32>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateLesson (partial - absent fields leave state untouched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLesson {
    pub lesson_id: LessonId,
    pub title: Option<String>,
    pub content: Option<String>,
    pub order: Option<i32>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteLesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteLesson {
    pub lesson_id: LessonId,
    pub occurred_at: DateTime<Utc>,
}

/// Command: CompleteLesson.
///
/// Repeated completions by the same user are accepted; deduplication happens
/// at query time in the read model, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompleteLesson {
    pub lesson_id: LessonId,
    pub user_id: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LessonCommand {
    CreateLesson(CreateLesson),
    UpdateLesson(UpdateLesson),
    DeleteLesson(DeleteLesson),
    CompleteLesson(CompleteLesson),
}

impl Command for LessonCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            LessonCommand::CreateLesson(c) => c.lesson_id.0,
            LessonCommand::UpdateLesson(c) => c.lesson_id.0,
            LessonCommand::DeleteLesson(c) => c.lesson_id.0,
            LessonCommand::CompleteLesson(c) => c.lesson_id.0,
        }
    }
}

/// Event: LessonCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCreated {
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub title: String,
    pub content: Option<String>,
    pub order: i32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LessonUpdated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonUpdated {
    pub lesson_id: LessonId,
    pub title: Option<String>,
    pub content: Option<String>,
    pub order: Option<i32>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LessonDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonDeleted {
    pub lesson_id: LessonId,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LessonCompleted.
///
/// Carries the full fact needed downstream: the completing user, the lesson,
/// its course, and the completion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonCompleted {
    pub user_id: String,
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LessonEvent {
    LessonCreated(LessonCreated),
    LessonUpdated(LessonUpdated),
    LessonDeleted(LessonDeleted),
    LessonCompleted(LessonCompleted),
}

impl Event for LessonEvent {
    fn event_type(&self) -> &'static str {
        match self {
            LessonEvent::LessonCreated(_) => "lms.lesson.created",
            LessonEvent::LessonUpdated(_) => "lms.lesson.updated",
            LessonEvent::LessonDeleted(_) => "lms.lesson.deleted",
            LessonEvent::LessonCompleted(_) => "lms.lesson.completed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            LessonEvent::LessonCreated(e) => e.occurred_at,
            LessonEvent::LessonUpdated(e) => e.occurred_at,
            LessonEvent::LessonDeleted(e) => e.occurred_at,
            LessonEvent::LessonCompleted(e) => e.completed_at,
        }
    }
}

impl Aggregate for Lesson {
    type Command = LessonCommand;
    type Event = LessonEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            LessonEvent::LessonCreated(e) => {
                self.id = e.lesson_id;
                self.course_id = Some(e.course_id);
                self.title = e.title.clone();
                self.content = e.content.clone();
                self.order = e.order;
                self.created = true;
            }
            LessonEvent::LessonUpdated(e) => {
                if let Some(title) = &e.title {
                    self.title = title.clone();
                }
                if let Some(content) = &e.content {
                    self.content = Some(content.clone());
                }
                if let Some(order) = e.order {
                    self.order = order;
                }
            }
            LessonEvent::LessonDeleted(_) => {
                self.deleted = true;
            }
            LessonEvent::LessonCompleted(_) => {
                // Per-user completion is read-model state only.
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            LessonCommand::CreateLesson(cmd) => self.handle_create(cmd),
            LessonCommand::UpdateLesson(cmd) => self.handle_update(cmd),
            LessonCommand::DeleteLesson(cmd) => self.handle_delete(cmd),
            LessonCommand::CompleteLesson(cmd) => self.handle_complete(cmd),
        }
    }
}

impl Lesson {
    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateLesson) -> Result<Vec<LessonEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("lesson already exists"));
        }

        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        let order = cmd.order.unwrap_or(0);
        if order < 0 {
            return Err(DomainError::validation("order must be non-negative"));
        }

        Ok(vec![LessonEvent::LessonCreated(LessonCreated {
            lesson_id: cmd.lesson_id,
            course_id: cmd.course_id,
            title: cmd.title.clone(),
            content: cmd.content.clone(),
            order,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateLesson) -> Result<Vec<LessonEvent>, DomainError> {
        self.ensure_live()?;

        if let Some(order) = cmd.order {
            if order < 0 {
                return Err(DomainError::validation("order must be non-negative"));
            }
        }

        Ok(vec![LessonEvent::LessonUpdated(LessonUpdated {
            lesson_id: cmd.lesson_id,
            title: cmd.title.clone(),
            content: cmd.content.clone(),
            order: cmd.order,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteLesson) -> Result<Vec<LessonEvent>, DomainError> {
        self.ensure_live()?;

        Ok(vec![LessonEvent::LessonDeleted(LessonDeleted {
            lesson_id: cmd.lesson_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_complete(&self, cmd: &CompleteLesson) -> Result<Vec<LessonEvent>, DomainError> {
        self.ensure_live()?;

        if cmd.user_id.trim().is_empty() {
            return Err(DomainError::validation("user_id cannot be empty"));
        }

        let course_id = self
            .course_id
            .ok_or_else(|| DomainError::invariant("lesson has no course"))?;

        Ok(vec![LessonEvent::LessonCompleted(LessonCompleted {
            user_id: cmd.user_id.clone(),
            lesson_id: cmd.lesson_id,
            course_id,
            completed_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campus_events::execute;

    fn test_lesson_id() -> LessonId {
        LessonId::new(AggregateId::new())
    }

    fn test_course_id() -> CourseId {
        CourseId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn create_cmd(lesson_id: LessonId, course_id: CourseId) -> CreateLesson {
        CreateLesson {
            lesson_id,
            course_id,
            title: "Variables".to_string(),
            content: Some("let and let mut".to_string()),
            order: Some(1),
            occurred_at: test_time(),
        }
    }

    #[test]
    fn create_lesson_round_trips_through_apply() {
        let lesson_id = test_lesson_id();
        let course_id = test_course_id();
        let mut lesson = Lesson::empty(lesson_id);

        execute(
            &mut lesson,
            &LessonCommand::CreateLesson(create_cmd(lesson_id, course_id)),
        )
        .unwrap();

        assert_eq!(lesson.course_id(), Some(course_id));
        assert_eq!(lesson.title(), "Variables");
        assert_eq!(lesson.content(), Some("let and let mut"));
        assert_eq!(lesson.order(), 1);
        assert_eq!(lesson.version(), 1);
    }

    #[test]
    fn create_lesson_defaults_order_to_zero() {
        let lesson_id = test_lesson_id();
        let mut cmd = create_cmd(lesson_id, test_course_id());
        cmd.order = None;

        let lesson = Lesson::empty(lesson_id);
        let events = lesson.handle(&LessonCommand::CreateLesson(cmd)).unwrap();

        match &events[0] {
            LessonEvent::LessonCreated(e) => assert_eq!(e.order, 0),
            _ => panic!("Expected LessonCreated event"),
        }
    }

    #[test]
    fn create_lesson_rejects_negative_order() {
        let lesson_id = test_lesson_id();
        let mut cmd = create_cmd(lesson_id, test_course_id());
        cmd.order = Some(-1);

        let lesson = Lesson::empty(lesson_id);
        let err = lesson
            .handle(&LessonCommand::CreateLesson(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn create_lesson_rejects_empty_title() {
        let lesson_id = test_lesson_id();
        let mut cmd = create_cmd(lesson_id, test_course_id());
        cmd.title = " ".to_string();

        let lesson = Lesson::empty(lesson_id);
        let err = lesson
            .handle(&LessonCommand::CreateLesson(cmd))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn update_lesson_applies_only_present_fields() {
        let lesson_id = test_lesson_id();
        let mut lesson = Lesson::empty(lesson_id);
        execute(
            &mut lesson,
            &LessonCommand::CreateLesson(create_cmd(lesson_id, test_course_id())),
        )
        .unwrap();

        let update = UpdateLesson {
            lesson_id,
            title: None,
            content: None,
            order: Some(5),
            occurred_at: test_time(),
        };
        execute(&mut lesson, &LessonCommand::UpdateLesson(update)).unwrap();

        assert_eq!(lesson.order(), 5);
        assert_eq!(lesson.title(), "Variables");
        assert_eq!(lesson.content(), Some("let and let mut"));
    }

    #[test]
    fn update_lesson_rejects_negative_order() {
        let lesson_id = test_lesson_id();
        let mut lesson = Lesson::empty(lesson_id);
        execute(
            &mut lesson,
            &LessonCommand::CreateLesson(create_cmd(lesson_id, test_course_id())),
        )
        .unwrap();

        let update = UpdateLesson {
            lesson_id,
            title: None,
            content: None,
            order: Some(-3),
            occurred_at: test_time(),
        };
        let err = lesson
            .handle(&LessonCommand::UpdateLesson(update))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn update_lesson_rejects_nonexistent_lesson() {
        let lesson_id = test_lesson_id();
        let lesson = Lesson::empty(lesson_id);

        let update = UpdateLesson {
            lesson_id,
            title: Some("New".to_string()),
            content: None,
            order: None,
            occurred_at: test_time(),
        };
        let err = lesson
            .handle(&LessonCommand::UpdateLesson(update))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[test]
    fn complete_lesson_emits_full_completion_fact() {
        let lesson_id = test_lesson_id();
        let course_id = test_course_id();
        let mut lesson = Lesson::empty(lesson_id);
        execute(
            &mut lesson,
            &LessonCommand::CreateLesson(create_cmd(lesson_id, course_id)),
        )
        .unwrap();

        let at = test_time();
        let complete = CompleteLesson {
            lesson_id,
            user_id: "user-123".to_string(),
            occurred_at: at,
        };
        let events = lesson
            .handle(&LessonCommand::CompleteLesson(complete))
            .unwrap();

        match &events[0] {
            LessonEvent::LessonCompleted(e) => {
                assert_eq!(e.user_id, "user-123");
                assert_eq!(e.lesson_id, lesson_id);
                assert_eq!(e.course_id, course_id);
                assert_eq!(e.completed_at, at);
            }
            _ => panic!("Expected LessonCompleted event"),
        }
    }

    #[test]
    fn complete_lesson_rejects_blank_user() {
        let lesson_id = test_lesson_id();
        let mut lesson = Lesson::empty(lesson_id);
        execute(
            &mut lesson,
            &LessonCommand::CreateLesson(create_cmd(lesson_id, test_course_id())),
        )
        .unwrap();

        let complete = CompleteLesson {
            lesson_id,
            user_id: "  ".to_string(),
            occurred_at: test_time(),
        };
        let err = lesson
            .handle(&LessonCommand::CompleteLesson(complete))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn repeated_completions_are_accepted() {
        let lesson_id = test_lesson_id();
        let mut lesson = Lesson::empty(lesson_id);
        execute(
            &mut lesson,
            &LessonCommand::CreateLesson(create_cmd(lesson_id, test_course_id())),
        )
        .unwrap();

        let complete = CompleteLesson {
            lesson_id,
            user_id: "user-123".to_string(),
            occurred_at: test_time(),
        };
        execute(&mut lesson, &LessonCommand::CompleteLesson(complete.clone())).unwrap();
        let events = execute(&mut lesson, &LessonCommand::CompleteLesson(complete)).unwrap();

        // No dedup at the aggregate; both completions emit an event.
        assert_eq!(events.len(), 1);
        assert_eq!(lesson.version(), 3);
    }

    #[test]
    fn complete_lesson_rejects_deleted_lesson() {
        let lesson_id = test_lesson_id();
        let mut lesson = Lesson::empty(lesson_id);
        execute(
            &mut lesson,
            &LessonCommand::CreateLesson(create_cmd(lesson_id, test_course_id())),
        )
        .unwrap();
        execute(
            &mut lesson,
            &LessonCommand::DeleteLesson(DeleteLesson {
                lesson_id,
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        let complete = CompleteLesson {
            lesson_id,
            user_id: "user-123".to_string(),
            occurred_at: test_time(),
        };
        let err = lesson
            .handle(&LessonCommand::CompleteLesson(complete))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[test]
    fn completion_does_not_touch_lesson_fields() {
        let lesson_id = test_lesson_id();
        let mut lesson = Lesson::empty(lesson_id);
        execute(
            &mut lesson,
            &LessonCommand::CreateLesson(create_cmd(lesson_id, test_course_id())),
        )
        .unwrap();

        let before_fields = (
            lesson.title().to_string(),
            lesson.content().map(str::to_string),
            lesson.order(),
        );
        execute(
            &mut lesson,
            &LessonCommand::CompleteLesson(CompleteLesson {
                lesson_id,
                user_id: "user-9".to_string(),
                occurred_at: test_time(),
            }),
        )
        .unwrap();

        assert_eq!(lesson.title(), before_fields.0);
        assert_eq!(lesson.content().map(str::to_string), before_fields.1);
        assert_eq!(lesson.order(), before_fields.2);
        assert_eq!(lesson.version(), 2);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: version increments by exactly one per applied event.
            #[test]
            fn version_increments_monotonically(
                title in "[A-Za-z][A-Za-z0-9 ]{0,60}",
                completions in 1usize..8,
            ) {
                let lesson_id = test_lesson_id();
                let course_id = test_course_id();
                let mut lesson = Lesson::empty(lesson_id);

                lesson.apply(&LessonEvent::LessonCreated(LessonCreated {
                    lesson_id,
                    course_id,
                    title,
                    content: None,
                    order: 0,
                    occurred_at: Utc::now(),
                }));
                prop_assert_eq!(lesson.version(), 1);

                for i in 0..completions {
                    lesson.apply(&LessonEvent::LessonCompleted(LessonCompleted {
                        user_id: "user-1".to_string(),
                        lesson_id,
                        course_id,
                        completed_at: Utc::now(),
                    }));
                    prop_assert_eq!(lesson.version(), 1 + i as u64 + 1);
                }
            }

            /// Property: handle is pure - repeated calls with the same
            /// command produce identical events and leave state unchanged.
            #[test]
            fn handle_is_deterministic(order in 0i32..100) {
                let lesson_id = test_lesson_id();
                let mut lesson = Lesson::empty(lesson_id);
                lesson.apply(&LessonEvent::LessonCreated(LessonCreated {
                    lesson_id,
                    course_id: test_course_id(),
                    title: "Loops".to_string(),
                    content: None,
                    order: 0,
                    occurred_at: Utc::now(),
                }));

                let update = LessonCommand::UpdateLesson(UpdateLesson {
                    lesson_id,
                    title: None,
                    content: None,
                    order: Some(order),
                    occurred_at: Utc::now(),
                });

                let before = lesson.clone();
                let first = lesson.handle(&update);
                let second = lesson.handle(&update);

                prop_assert_eq!(&before, &lesson);
                prop_assert_eq!(first.unwrap(), second.unwrap());
            }
        }
    }
}
