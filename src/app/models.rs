use chrono::{DateTime, NaiveDate, NaiveDateTime, Timelike, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use std::cmp::Ordering;
use std::fmt;

pub type TaskId = i64;
pub type CategoryId = i64;

pub const DATE_FORMAT: &str = "%d.%m.%Y";
pub const DATE_TIME_FORMAT: &str = "%d.%m.%Y %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, clap::ValueEnum)]
pub enum Priority {
    #[default]
    Low,
    Medium,
    High,
}

impl Priority {
    // Stored as 0, 1, 2
    pub fn level(self) -> i64 {
        match self {
            Priority::Low => 0,
            Priority::Medium => 1,
            Priority::High => 2,
        }
    }

    pub fn from_level(level: i64) -> Option<Priority> {
        match level {
            0 => Some(Priority::Low),
            1 => Some(Priority::Medium),
            2 => Some(Priority::High),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    pub fn next(self) -> Priority {
        match self {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        }
    }

    pub fn previous(self) -> Priority {
        match self {
            Priority::Low => Priority::High,
            Priority::Medium => Priority::Low,
            Priority::High => Priority::Medium,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.level()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let level = value.as_i64()?;
        Priority::from_level(level).ok_or(FromSqlError::OutOfRange(level))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub notes: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub is_completed: bool,
    pub priority: Priority,
    pub reminder_enabled: bool,
    pub reminder_id: Option<String>,
    pub category_id: Option<CategoryId>,
}

impl Task {
    // Due strictly before the given instant and still open
    pub fn is_due_before(&self, instant: DateTime<Utc>) -> bool {
        !self.is_completed && self.due_date.map_or(false, |due| due < instant)
    }
}

// Fields the caller chooses when creating a task; the rest get defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTask {
    pub title: String,
    pub notes: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub category_id: Option<CategoryId>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> NewTask {
        NewTask {
            title: title.into(),
            ..NewTask::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    Any,
    Uncategorized,
    Only(CategoryId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TaskFilter {
    pub completed: Option<bool>,
    pub category: CategoryFilter,
}

impl TaskFilter {
    pub fn all() -> TaskFilter {
        TaskFilter::default()
    }

    pub fn completed(completed: bool) -> TaskFilter {
        TaskFilter {
            completed: Some(completed),
            ..TaskFilter::default()
        }
    }

    #[cfg(test)]
    pub fn in_category(category: CategoryFilter) -> TaskFilter {
        TaskFilter {
            category,
            ..TaskFilter::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        let completion_matches = self.completed.map_or(true, |c| task.is_completed == c);
        let category_matches = match self.category {
            CategoryFilter::Any => true,
            CategoryFilter::Uncategorized => task.category_id.is_none(),
            CategoryFilter::Only(id) => task.category_id == Some(id),
        };
        completion_matches && category_matches
    }
}

// Default list order: priority desc, due date asc (undated last), newest first
pub fn compare_tasks(a: &Task, b: &Task) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| compare_due_dates(a.due_date, b.due_date))
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

pub fn compare_due_dates(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

// Accepts dd.mm.yyyy or dd.mm.yyyy HH:MM, read as UTC
pub fn parse_due_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(date_time) = NaiveDateTime::parse_from_str(input, DATE_TIME_FORMAT) {
        return Some(date_time.and_utc());
    }
    NaiveDate::parse_from_str(input, DATE_FORMAT)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date_time| date_time.and_utc())
}

pub fn format_due_date(date: &DateTime<Utc>) -> String {
    if date.hour() == 0 && date.minute() == 0 {
        date.format(DATE_FORMAT).to_string()
    } else {
        date.format(DATE_TIME_FORMAT).to_string()
    }
}
