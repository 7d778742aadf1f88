use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use campus_core::{Aggregate, AggregateId, AggregateRoot, DomainError};
use campus_events::{Command, Event};

/// Course identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseId(pub AggregateId);

impl CourseId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for CourseId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Course.
///
/// State is fully derived by folding the course's event stream. Deletion is
/// terminal: once deleted, every further mutating command fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    id: CourseId,
    title: String,
    description: Option<String>,
    instructor_id: String,
    created: bool,
    deleted: bool,
    version: u64,
}

impl Course {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: CourseId) -> Self {
        Self {
            id,
            title: String::new(),
            description: None,
            instructor_id: String::new(),
            created: false,
            deleted: false,
            version: 0,
        }
    }

    pub fn id_typed(&self) -> CourseId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn instructor_id(&self) -> &str {
        &self.instructor_id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl AggregateRoot for Course {
    type Id = CourseId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateCourse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCourse {
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: String,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateCourse (partial - absent fields leave state untouched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCourse {
    pub course_id: CourseId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteCourse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteCourse {
    pub course_id: CourseId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseCommand {
    CreateCourse(CreateCourse),
    UpdateCourse(UpdateCourse),
    DeleteCourse(DeleteCourse),
}

impl Command for CourseCommand {
    fn target_aggregate_id(&self) -> AggregateId {
        match self {
            CourseCommand::CreateCourse(c) => c.course_id.0,
            CourseCommand::UpdateCourse(c) => c.course_id.0,
            CourseCommand::DeleteCourse(c) => c.course_id.0,
        }
    }
}

/// Event: CourseCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseCreated {
    pub course_id: CourseId,
    pub title: String,
    pub description: Option<String>,
    pub instructor_id: String,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CourseUpdated.
///
/// `None` fields were omitted from the update; there is no way to clear a
/// field back to empty through this event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseUpdated {
    pub course_id: CourseId,
    pub title: Option<String>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: CourseDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseDeleted {
    pub course_id: CourseId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseEvent {
    CourseCreated(CourseCreated),
    CourseUpdated(CourseUpdated),
    CourseDeleted(CourseDeleted),
}

impl Event for CourseEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CourseEvent::CourseCreated(_) => "lms.course.created",
            CourseEvent::CourseUpdated(_) => "lms.course.updated",
            CourseEvent::CourseDeleted(_) => "lms.course.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            CourseEvent::CourseCreated(e) => e.occurred_at,
            CourseEvent::CourseUpdated(e) => e.occurred_at,
            CourseEvent::CourseDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Course {
    type Command = CourseCommand;
    type Event = CourseEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CourseEvent::CourseCreated(e) => {
                self.id = e.course_id;
                self.title = e.title.clone();
                self.description = e.description.clone();
                self.instructor_id = e.instructor_id.clone();
                self.created = true;
            }
            CourseEvent::CourseUpdated(e) => {
                if let Some(title) = &e.title {
                    self.title = title.clone();
                }
                if let Some(description) = &e.description {
                    self.description = Some(description.clone());
                }
            }
            CourseEvent::CourseDeleted(_) => {
                self.deleted = true;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CourseCommand::CreateCourse(cmd) => self.handle_create(cmd),
            CourseCommand::UpdateCourse(cmd) => self.handle_update(cmd),
            CourseCommand::DeleteCourse(cmd) => self.handle_delete(cmd),
        }
    }
}

impl Course {
    /// Mutations require an existing, non-deleted course. A deleted course
    /// behaves as if it were gone.
    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found());
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateCourse) -> Result<Vec<CourseEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("course already exists"));
        }

        if cmd.title.trim().is_empty() {
            return Err(DomainError::validation("title cannot be empty"));
        }

        if cmd.instructor_id.trim().is_empty() {
            return Err(DomainError::validation("instructor_id cannot be empty"));
        }

        Ok(vec![CourseEvent::CourseCreated(CourseCreated {
            course_id: cmd.course_id,
            title: cmd.title.clone(),
            description: cmd.description.clone(),
            instructor_id: cmd.instructor_id.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateCourse) -> Result<Vec<CourseEvent>, DomainError> {
        self.ensure_live()?;

        Ok(vec![CourseEvent::CourseUpdated(CourseUpdated {
            course_id: cmd.course_id,
            title: cmd.title.clone(),
            description: cmd.description.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteCourse) -> Result<Vec<CourseEvent>, DomainError> {
        self.ensure_live()?;

        Ok(vec![CourseEvent::CourseDeleted(CourseDeleted {
            course_id: cmd.course_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
