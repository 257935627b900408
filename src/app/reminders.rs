// Fire-once reminders keyed by task
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use crate::app::error::{StoreResult, ValidationError};
use crate::app::models::TaskId;
use crate::app::storage::Storage;

#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: String,
    pub task_id: TaskId,
    pub fire_at: DateTime<Utc>,
    pub delivered: bool,
}

// A reminder together with the title of the task it is about
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderNotice {
    pub reminder: Reminder,
    pub task_title: String,
}

const REMINDER_COLUMNS: &str = "r.id, r.task_id, r.fire_at, r.delivered";

fn reminder_from_row(row: &Row<'_>) -> rusqlite::Result<Reminder> {
    Ok(Reminder {
        id: row.get(0)?,
        task_id: row.get(1)?,
        fire_at: row.get(2)?,
        delivered: row.get(3)?,
    })
}

pub(super) fn reminder_for_task(
    conn: &Connection,
    task_id: TaskId,
) -> rusqlite::Result<Option<Reminder>> {
    conn.query_row(
        &format!("SELECT {REMINDER_COLUMNS} FROM reminder r WHERE r.task_id = ?1"),
        [task_id],
        reminder_from_row,
    )
    .optional()
}

// Replaces whatever reminder the task had
pub(super) fn schedule_in(
    conn: &Connection,
    task_id: TaskId,
    fire_at: DateTime<Utc>,
) -> rusqlite::Result<Reminder> {
    let reminder = Reminder {
        id: Uuid::new_v4().to_string(),
        task_id,
        fire_at,
        delivered: false,
    };
    conn.execute("DELETE FROM reminder WHERE task_id = ?1;", [task_id])?;
    conn.execute(
        "INSERT INTO reminder (id, task_id, fire_at, delivered) VALUES (?1, ?2, ?3, 0);",
        params![reminder.id, task_id, fire_at],
    )?;
    conn.execute(
        "UPDATE task SET reminder_enabled = 1, reminder_id = ?1 WHERE id = ?2;",
        params![reminder.id, task_id],
    )?;
    Ok(reminder)
}

pub(super) fn cancel_in(conn: &Connection, task_id: TaskId) -> rusqlite::Result<bool> {
    let removed = conn.execute("DELETE FROM reminder WHERE task_id = ?1;", [task_id])?;
    conn.execute(
        "UPDATE task SET reminder_enabled = 0, reminder_id = NULL WHERE id = ?1;",
        [task_id],
    )?;
    Ok(removed > 0)
}

impl Storage {
    // Remind at the task's due date
    pub fn schedule_reminder(&self, task_id: TaskId) -> StoreResult<Reminder> {
        let task = self.require_task(task_id)?;
        let fire_at = task
            .due_date
            .ok_or(ValidationError::ReminderWithoutDueDate(task_id))?;

        let tx = self.db_con.unchecked_transaction()?;
        let reminder = schedule_in(&tx, task_id, fire_at)?;
        tx.commit()?;

        info!(task_id, reminder_id = %reminder.id, %fire_at, "scheduled reminder");
        Ok(reminder)
    }

    pub fn cancel_reminder(&self, task_id: TaskId) -> StoreResult<bool> {
        let tx = self.db_con.unchecked_transaction()?;
        let removed = cancel_in(&tx, task_id)?;
        tx.commit()?;

        if removed {
            info!(task_id, "cancelled reminder");
        }
        Ok(removed)
    }

    pub fn reminder_for_task(&self, task_id: TaskId) -> StoreResult<Option<Reminder>> {
        Ok(reminder_for_task(&self.db_con, task_id)?)
    }

    // Undelivered reminders of open tasks, soonest first
    pub fn pending_reminders(&self) -> StoreResult<Vec<ReminderNotice>> {
        let mut notices = self.undelivered_open()?;
        notices.sort_by(|a, b| a.reminder.fire_at.cmp(&b.reminder.fire_at));
        Ok(notices)
    }

    // Every reminder due by `now` is delivered exactly once.
    // Reminders of completed tasks are consumed silently.
    pub fn take_due_reminders(&self, now: DateTime<Utc>) -> StoreResult<Vec<ReminderNotice>> {
        let due: Vec<(ReminderNotice, bool)> = self
            .undelivered_with_completion()?
            .into_iter()
            .filter(|(notice, _)| notice.reminder.fire_at <= now)
            .collect();
        if due.is_empty() {
            return Ok(Vec::new());
        }

        let tx = self.db_con.unchecked_transaction()?;
        for (notice, _) in &due {
            tx.execute(
                "UPDATE reminder SET delivered = 1 WHERE id = ?1;",
                [&notice.reminder.id],
            )?;
        }
        tx.commit()?;

        let mut fired: Vec<ReminderNotice> = due
            .into_iter()
            .filter_map(|(mut notice, completed)| {
                if completed {
                    debug!(
                        task_id = notice.reminder.task_id,
                        "dropped reminder of completed task"
                    );
                    None
                } else {
                    notice.reminder.delivered = true;
                    Some(notice)
                }
            })
            .collect();
        fired.sort_by(|a, b| a.reminder.fire_at.cmp(&b.reminder.fire_at));

        for notice in &fired {
            info!(task_id = notice.reminder.task_id, title = %notice.task_title, "reminder fired");
        }
        Ok(fired)
    }

    // A completed task's reminder would be dropped when due, so it is not pending
    fn undelivered_open(&self) -> StoreResult<Vec<ReminderNotice>> {
        Ok(self
            .undelivered_with_completion()?
            .into_iter()
            .filter_map(|(notice, completed)| (!completed).then_some(notice))
            .collect())
    }

    fn undelivered_with_completion(&self) -> StoreResult<Vec<(ReminderNotice, bool)>> {
        let mut stmt = self.db_con.prepare(&format!(
            "SELECT {REMINDER_COLUMNS}, t.title, t.is_completed
             FROM reminder r JOIN task t ON t.id = r.task_id
             WHERE r.delivered = 0"
        ))?;
        let rows = stmt
            .query_map([], |row| {
                let notice = ReminderNotice {
                    reminder: reminder_from_row(row)?,
                    task_title: row.get(4)?,
                };
                let completed: bool = row.get(5)?;
                Ok((notice, completed))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::error::StoreError;
    use crate::app::models::NewTask;
    use chrono::{Duration, TimeZone};
    use rstest::{fixture, rstest};

    #[fixture]
    fn storage() -> Storage {
        Storage::open_in_memory().unwrap()
    }

    fn due_task(storage: &Storage, title: &str, due: DateTime<Utc>) -> TaskId {
        storage
            .create_task(&NewTask {
                due_date: Some(due),
                ..NewTask::titled(title)
            })
            .unwrap()
            .id
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, hour, 0, 0).unwrap()
    }

    #[rstest]
    fn requires_a_due_date(storage: Storage) {
        let task = storage.create_task(&NewTask::titled("Someday")).unwrap();
        let result = storage.schedule_reminder(task.id);
        assert!(matches!(
            result,
            Err(StoreError::Invalid(ValidationError::ReminderWithoutDueDate(id))) if id == task.id
        ));
        assert!(matches!(
            storage.schedule_reminder(777),
            Err(StoreError::TaskNotFound(777))
        ));
    }

    #[rstest]
    fn scheduling_marks_the_task(storage: Storage) {
        let id = due_task(&storage, "Call mom", at(9));
        let reminder = storage.schedule_reminder(id).unwrap();

        let task = storage.fetch_task(id).unwrap().unwrap();
        assert!(task.reminder_enabled);
        assert_eq!(task.reminder_id.as_deref(), Some(reminder.id.as_str()));
        assert_eq!(reminder.fire_at, at(9));

        let again = storage.schedule_reminder(id).unwrap();
        assert_ne!(again.id, reminder.id);
        assert_eq!(storage.pending_reminders().unwrap().len(), 1);
    }

    #[rstest]
    fn fires_exactly_once(storage: Storage) {
        let early = due_task(&storage, "Early", at(8));
        let late = due_task(&storage, "Late", at(18));
        storage.schedule_reminder(early).unwrap();
        storage.schedule_reminder(late).unwrap();

        assert!(storage.take_due_reminders(at(7)).unwrap().is_empty());

        let fired = storage.take_due_reminders(at(8)).unwrap();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].task_title, "Early");
        assert!(fired[0].reminder.delivered);

        assert!(storage.take_due_reminders(at(12)).unwrap().is_empty());
        let pending = storage.pending_reminders().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].task_title, "Late");
    }

    #[rstest]
    fn completed_tasks_do_not_fire(storage: Storage) {
        let id = due_task(&storage, "Already done", at(8));
        storage.schedule_reminder(id).unwrap();
        storage.set_completed(id, true).unwrap();

        assert!(storage.take_due_reminders(at(9)).unwrap().is_empty());
        assert!(storage.pending_reminders().unwrap().is_empty());
    }

    #[rstest]
    fn completed_tasks_are_not_pending(storage: Storage) {
        let id = due_task(&storage, "Renew passport", at(10));
        storage.schedule_reminder(id).unwrap();

        storage.set_completed(id, true).unwrap();
        assert!(storage.pending_reminders().unwrap().is_empty());

        // Reopened before it was due, so it still fires
        storage.set_completed(id, false).unwrap();
        assert_eq!(storage.pending_reminders().unwrap().len(), 1);
        assert_eq!(storage.take_due_reminders(at(10)).unwrap().len(), 1);
    }

    #[rstest]
    fn deleting_task_cancels_reminder(storage: Storage) {
        let id = due_task(&storage, "Dentist", at(10));
        storage.schedule_reminder(id).unwrap();

        assert!(storage.delete_task(id).unwrap());
        assert!(storage.reminder_for_task(id).unwrap().is_none());
        assert!(storage.pending_reminders().unwrap().is_empty());
    }

    #[rstest]
    fn toggle_off_clears_the_task(storage: Storage) {
        let id = due_task(&storage, "Gym", at(6));
        storage.schedule_reminder(id).unwrap();

        assert!(storage.cancel_reminder(id).unwrap());
        assert!(!storage.cancel_reminder(id).unwrap());

        let task = storage.fetch_task(id).unwrap().unwrap();
        assert!(!task.reminder_enabled);
        assert_eq!(task.reminder_id, None);
    }

    #[rstest]
    fn reminder_follows_due_date_changes(storage: Storage) {
        let id = due_task(&storage, "Report", at(9));
        storage.schedule_reminder(id).unwrap();

        let mut task = storage.fetch_task(id).unwrap().unwrap();
        task.due_date = Some(at(9) + Duration::days(1));
        storage.update_task(&task).unwrap();
        let moved = storage.reminder_for_task(id).unwrap().unwrap();
        assert_eq!(moved.fire_at, at(9) + Duration::days(1));

        task.due_date = None;
        storage.update_task(&task).unwrap();
        assert!(storage.reminder_for_task(id).unwrap().is_none());
        assert!(!storage.fetch_task(id).unwrap().unwrap().reminder_enabled);
    }
}
