use thiserror::Error;

use crate::app::models::TaskId;

// Failures of the persistence layer
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("could not create the database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

// Input rejected before anything is written
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("Category name cannot be empty")]
    EmptyCategoryName,

    #[error("A task named \"{0}\" already exists")]
    DuplicateTaskTitle(String),

    #[error("A category named \"{0}\" already exists")]
    DuplicateCategoryName(String),

    #[error("Date should be in format dd.mm.yyyy or dd.mm.yyyy HH:MM")]
    BadDate(String),

    #[error("Task {0} has no due date to remind about")]
    ReminderWithoutDueDate(TaskId),
}

impl StoreError {
    // Whether the message is meant for the user rather than the log
    pub fn is_validation(&self) -> bool {
        matches!(self, StoreError::Invalid(_))
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
