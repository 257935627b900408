// Checks run before a task or category is written.
// Uniqueness is advisory: the store itself accepts duplicates.
use chrono::{DateTime, Utc};

use crate::app::error::{StoreResult, ValidationError};
use crate::app::models::parse_due_date;
use crate::app::storage::Storage;

// Returns the trimmed title. `current` is the title being replaced on edit.
pub fn check_task_title(
    storage: &Storage,
    title: &str,
    current: Option<&str>,
) -> StoreResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::EmptyTitle.into());
    }
    if current != Some(title) && storage.is_task_name_exists(title)? {
        return Err(ValidationError::DuplicateTaskTitle(title.to_string()).into());
    }
    Ok(title.to_string())
}

pub fn check_category_name(
    storage: &Storage,
    name: &str,
    current: Option<&str>,
) -> StoreResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyCategoryName.into());
    }
    if current != Some(name) && storage.is_category_name_exists(name)? {
        return Err(ValidationError::DuplicateCategoryName(name.to_string()).into());
    }
    Ok(name.to_string())
}

// Empty input means no due date
pub fn parse_due_input(input: &str) -> Result<Option<DateTime<Utc>>, ValidationError> {
    if input.trim().is_empty() {
        return Ok(None);
    }
    parse_due_date(input)
        .map(Some)
        .ok_or_else(|| ValidationError::BadDate(input.to_string()))
}

// Blank notes are stored as absent
pub fn normalize_notes(notes: &str) -> Option<String> {
    let notes = notes.trim();
    (!notes.is_empty()).then(|| notes.to_string())
}
