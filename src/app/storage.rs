// Communication with SQLite
// Philosophy of CRUD lives here
// Based on https://github.com/rusqlite/rusqlite/blob/master/examples/persons/main.rs
use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

use crate::app::error::{StoreError, StoreResult};
use crate::app::models::{
    compare_tasks, Category, CategoryFilter, CategoryId, NewTask, Task, TaskFilter, TaskId,
};
use crate::app::reminders;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

// Applied in order; PRAGMA user_version holds the last applied version
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: "CREATE TABLE IF NOT EXISTS category (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                color TEXT,
                created_at DATETIME NOT NULL
            );
            CREATE TABLE IF NOT EXISTS task (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                notes TEXT,
                due_date DATETIME,
                created_at DATETIME NOT NULL,
                is_completed TINYINT NOT NULL DEFAULT 0,
                priority INT NOT NULL DEFAULT 0,
                category_id INTEGER REFERENCES category(id)
            );
            CREATE INDEX IF NOT EXISTS task_category_id ON task(category_id);",
    },
    Migration {
        version: 2,
        name: "reminders",
        sql: "ALTER TABLE task ADD COLUMN reminder_enabled TINYINT NOT NULL DEFAULT 0;
            ALTER TABLE task ADD COLUMN reminder_id TEXT;
            CREATE TABLE IF NOT EXISTS reminder (
                id TEXT PRIMARY KEY,
                task_id INTEGER NOT NULL UNIQUE REFERENCES task(id),
                fire_at DATETIME NOT NULL,
                delivered TINYINT NOT NULL DEFAULT 0
            );",
    },
];

const TASK_COLUMNS: &str = "id, title, notes, due_date, created_at, is_completed, priority, \
                            reminder_enabled, reminder_id, category_id";

const CATEGORY_COLUMNS: &str = "id, name, color, created_at";

pub struct Storage {
    pub(super) db_con: Connection,
}

impl Storage {
    // Open (or create) the database file and bring the schema up to date
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Storage> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!(path = %path.display(), "opening task database");
        Storage::with_connection(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> StoreResult<Storage> {
        Storage::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(db_con: Connection) -> StoreResult<Storage> {
        db_con.execute_batch("PRAGMA foreign_keys = ON;")?;
        let storage = Storage { db_con };
        storage.run_migrations()?;
        Ok(storage)
    }

    fn run_migrations(&self) -> StoreResult<()> {
        let current = self.schema_version()?;

        for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
            let tx = self.db_con.unchecked_transaction()?;
            tx.execute_batch(migration.sql)?;
            tx.pragma_update(None, "user_version", migration.version)?;
            tx.commit()?;
            info!(
                version = migration.version,
                migration = migration.name,
                "applied schema migration"
            );
        }
        Ok(())
    }

    pub fn schema_version(&self) -> StoreResult<i64> {
        Ok(self
            .db_con
            .pragma_query_value(None, "user_version", |row| row.get(0))?)
    }

    // CREATE
    pub fn create_task(&self, new_task: &NewTask) -> StoreResult<Task> {
        let created_at = Utc::now();
        self.db_con.execute(
            "INSERT INTO task (title, notes, due_date, created_at, is_completed, priority, category_id)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6);",
            params![
                new_task.title,
                new_task.notes,
                new_task.due_date,
                created_at,
                new_task.priority,
                new_task.category_id,
            ],
        )?;
        let id = self.db_con.last_insert_rowid();
        info!(task_id = id, title = %new_task.title, "created task");

        Ok(Task {
            id,
            title: new_task.title.clone(),
            notes: new_task.notes.clone(),
            due_date: new_task.due_date,
            created_at,
            is_completed: false,
            priority: new_task.priority,
            reminder_enabled: false,
            reminder_id: None,
            category_id: new_task.category_id,
        })
    }

    // READ
    pub fn fetch_tasks(&self, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(completed) = filter.completed {
            clauses.push("is_completed = ?");
            values.push(Value::Integer(i64::from(completed)));
        }
        match filter.category {
            CategoryFilter::Any => {}
            CategoryFilter::Uncategorized => clauses.push("category_id IS NULL"),
            CategoryFilter::Only(id) => {
                clauses.push("category_id = ?");
                values.push(Value::Integer(id));
            }
        }

        let mut sql = format!("SELECT {TASK_COLUMNS} FROM task");
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }

        let mut stmt = self.db_con.prepare(&sql)?;
        let mut tasks = stmt
            .query_map(params_from_iter(values), task_from_row)?
            .collect::<Result<Vec<Task>, _>>()?;
        tasks.sort_by(compare_tasks);

        debug!(count = tasks.len(), ?filter, "fetched tasks");
        Ok(tasks)
    }

    // All tasks regardless of any filter
    pub fn count_tasks(&self) -> StoreResult<usize> {
        let count: i64 = self
            .db_con
            .query_row("SELECT COUNT(*) FROM task", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    pub fn fetch_task(&self, task_id: TaskId) -> StoreResult<Option<Task>> {
        Ok(self
            .db_con
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM task WHERE id = ?1"),
                [task_id],
                task_from_row,
            )
            .optional()?)
    }

    // UPDATE
    // Returns false when the task no longer exists
    pub fn update_task(&self, task: &Task) -> StoreResult<bool> {
        let tx = self.db_con.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE task SET title = ?1, notes = ?2, due_date = ?3, is_completed = ?4,
                 priority = ?5, category_id = ?6
             WHERE id = ?7;",
            params![
                task.title,
                task.notes,
                task.due_date,
                task.is_completed,
                task.priority,
                task.category_id,
                task.id,
            ],
        )?;
        if changed == 0 {
            debug!(task_id = task.id, "update skipped, task is gone");
            return Ok(false);
        }

        // A reminder follows the due date it was scheduled for
        if let Some(existing) = reminders::reminder_for_task(&tx, task.id)? {
            match task.due_date {
                Some(due) if due != existing.fire_at => {
                    reminders::schedule_in(&tx, task.id, due)?;
                }
                Some(_) => {}
                None => {
                    reminders::cancel_in(&tx, task.id)?;
                }
            }
        }
        tx.commit()?;

        info!(task_id = task.id, "updated task");
        Ok(true)
    }

    pub fn set_completed(&self, task_id: TaskId, completed: bool) -> StoreResult<bool> {
        let changed = self.db_con.execute(
            "UPDATE task SET is_completed = ?1 WHERE id = ?2;",
            params![completed, task_id],
        )?;
        info!(task_id, completed, "set completion");
        Ok(changed > 0)
    }

    // DELETE
    // Deleting a task that is already gone is a no-op
    pub fn delete_task(&self, task_id: TaskId) -> StoreResult<bool> {
        let tx = self.db_con.unchecked_transaction()?;
        reminders::cancel_in(&tx, task_id)?;
        let removed = tx.execute("DELETE FROM task WHERE id = ?1;", [task_id])?;
        tx.commit()?;

        if removed > 0 {
            info!(task_id, "deleted task");
        } else {
            debug!(task_id, "delete skipped, task is gone");
        }
        Ok(removed > 0)
    }

    pub fn is_task_name_exists(&self, title: &str) -> StoreResult<bool> {
        let count: i64 = self.db_con.query_row(
            "SELECT COUNT(*) FROM task WHERE title = ?1",
            [title],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    // Categories

    pub fn create_category(&self, name: &str, color: Option<&str>) -> StoreResult<Category> {
        let created_at = Utc::now();
        self.db_con.execute(
            "INSERT INTO category (name, color, created_at) VALUES (?1, ?2, ?3);",
            params![name, color, created_at],
        )?;
        let id = self.db_con.last_insert_rowid();
        info!(category_id = id, category = name, "created category");

        Ok(Category {
            id,
            name: name.to_string(),
            color: color.map(str::to_string),
            created_at,
        })
    }

    // Sorted by name
    pub fn fetch_categories(&self) -> StoreResult<Vec<Category>> {
        let mut stmt = self.db_con.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM category ORDER BY name ASC, id ASC"
        ))?;
        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<Result<Vec<Category>, _>>()?;
        Ok(categories)
    }

    pub fn fetch_category(&self, category_id: CategoryId) -> StoreResult<Option<Category>> {
        Ok(self
            .db_con
            .query_row(
                &format!("SELECT {CATEGORY_COLUMNS} FROM category WHERE id = ?1"),
                [category_id],
                category_from_row,
            )
            .optional()?)
    }

    // Names are not unique at the schema level; the oldest match wins
    pub fn find_category_by_name(&self, name: &str) -> StoreResult<Option<Category>> {
        Ok(self
            .db_con
            .query_row(
                &format!(
                    "SELECT {CATEGORY_COLUMNS} FROM category WHERE name = ?1 ORDER BY id LIMIT 1"
                ),
                [name],
                category_from_row,
            )
            .optional()?)
    }

    pub fn update_category(&self, category: &Category) -> StoreResult<bool> {
        let changed = self.db_con.execute(
            "UPDATE category SET name = ?1, color = ?2 WHERE id = ?3;",
            params![category.name, category.color, category.id],
        )?;
        info!(category_id = category.id, changed, "updated category");
        Ok(changed > 0)
    }

    // Orphan policy: tasks of a deleted category become uncategorized
    pub fn delete_category(&self, category_id: CategoryId) -> StoreResult<bool> {
        let tx = self.db_con.unchecked_transaction()?;
        let orphaned = tx.execute(
            "UPDATE task SET category_id = NULL WHERE category_id = ?1;",
            [category_id],
        )?;
        let removed = tx.execute("DELETE FROM category WHERE id = ?1;", [category_id])?;
        tx.commit()?;

        if removed > 0 {
            info!(category_id, orphaned, "deleted category");
        } else {
            debug!(category_id, "delete skipped, category is gone");
        }
        Ok(removed > 0)
    }

    pub fn is_category_name_exists(&self, name: &str) -> StoreResult<bool> {
        let count: i64 = self.db_con.query_row(
            "SELECT COUNT(*) FROM category WHERE name = ?1",
            [name],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn count_tasks_in_category(&self, category_id: CategoryId) -> StoreResult<usize> {
        let count: i64 = self.db_con.query_row(
            "SELECT COUNT(*) FROM task WHERE category_id = ?1",
            [category_id],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    // Every category with the number of tasks it owns, sorted by name
    pub fn category_task_counts(&self) -> StoreResult<Vec<(Category, usize)>> {
        let mut stmt = self.db_con.prepare(
            "SELECT c.id, c.name, c.color, c.created_at, COUNT(t.id)
             FROM category c LEFT JOIN task t ON t.category_id = c.id
             GROUP BY c.id
             ORDER BY c.name ASC, c.id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let count: i64 = row.get(4)?;
                let count = usize::try_from(count).unwrap_or(0);
                Ok((category_from_row(row)?, count))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn require_task(&self, task_id: TaskId) -> StoreResult<Task> {
        self.fetch_task(task_id)?
            .ok_or(StoreError::TaskNotFound(task_id))
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        notes: row.get(2)?,
        due_date: row.get(3)?,
        created_at: row.get(4)?,
        is_completed: row.get(5)?,
        priority: row.get(6)?,
        reminder_enabled: row.get(7)?,
        reminder_id: row.get(8)?,
        category_id: row.get(9)?,
    })
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        created_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::models::Priority;
    use chrono::{Duration, TimeZone};
    use rstest::{fixture, rstest};

    #[fixture]
    fn storage() -> Storage {
        Storage::open_in_memory().unwrap()
    }

    #[rstest]
    fn new_task_has_defaults(storage: Storage) {
        let task = storage.create_task(&NewTask::titled("T")).unwrap();

        assert!(!task.is_completed);
        assert!(task.created_at <= Utc::now());
        assert_eq!(task.notes, None);
        assert_eq!(task.due_date, None);
        assert_eq!(task.category_id, None);
        assert_eq!(task.priority, Priority::Low);
        assert!(!task.reminder_enabled);
        assert_eq!(task.reminder_id, None);

        let stored = storage.fetch_task(task.id).unwrap().unwrap();
        assert_eq!(stored, task);
    }

    #[rstest]
    fn stores_all_fields(storage: Storage) {
        let work = storage.create_category("Work", Some("#ff8800")).unwrap();
        let due = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let task = storage
            .create_task(&NewTask {
                title: "Full task".into(),
                notes: Some("with notes".into()),
                due_date: Some(due),
                priority: Priority::High,
                category_id: Some(work.id),
            })
            .unwrap();

        let stored = storage.fetch_task(task.id).unwrap().unwrap();
        assert_eq!(stored.notes.as_deref(), Some("with notes"));
        assert_eq!(stored.due_date, Some(due));
        assert_eq!(stored.priority, Priority::High);
        assert_eq!(stored.category_id, Some(work.id));
    }

    #[rstest]
    fn filters_by_completion(storage: Storage) {
        storage.create_task(&NewTask::titled("Task 1")).unwrap();
        let second = storage.create_task(&NewTask::titled("Task 2")).unwrap();
        assert!(storage.set_completed(second.id, true).unwrap());

        assert_eq!(storage.fetch_tasks(&TaskFilter::all()).unwrap().len(), 2);

        let open = storage.fetch_tasks(&TaskFilter::completed(false)).unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].title, "Task 1");

        let done = storage.fetch_tasks(&TaskFilter::completed(true)).unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].title, "Task 2");
    }

    #[rstest]
    fn filters_by_category(storage: Storage) {
        let home = storage.create_category("Home", None).unwrap();
        storage
            .create_task(&NewTask {
                category_id: Some(home.id),
                ..NewTask::titled("Dishes")
            })
            .unwrap();
        storage.create_task(&NewTask::titled("Loose end")).unwrap();

        let in_home = storage
            .fetch_tasks(&TaskFilter::in_category(CategoryFilter::Only(home.id)))
            .unwrap();
        assert_eq!(in_home.len(), 1);
        assert_eq!(in_home[0].title, "Dishes");

        let loose = storage
            .fetch_tasks(&TaskFilter::in_category(CategoryFilter::Uncategorized))
            .unwrap();
        assert_eq!(loose.len(), 1);
        assert_eq!(loose[0].title, "Loose end");
    }

    #[rstest]
    fn fetch_uses_default_order(storage: Storage) {
        let base = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
        storage
            .create_task(&NewTask {
                priority: Priority::Low,
                ..NewTask::titled("low")
            })
            .unwrap();
        storage
            .create_task(&NewTask {
                priority: Priority::High,
                due_date: Some(base + Duration::days(3)),
                ..NewTask::titled("high later")
            })
            .unwrap();
        storage
            .create_task(&NewTask {
                priority: Priority::High,
                due_date: Some(base),
                ..NewTask::titled("high sooner")
            })
            .unwrap();

        let titles: Vec<String> = storage
            .fetch_tasks(&TaskFilter::all())
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["high sooner", "high later", "low"]);
    }

    #[rstest]
    fn update_round_trips(storage: Storage) {
        let mut task = storage.create_task(&NewTask::titled("Original")).unwrap();
        task.title = "Renamed".into();
        task.is_completed = true;

        assert!(storage.update_task(&task).unwrap());

        let stored = storage.fetch_task(task.id).unwrap().unwrap();
        assert_eq!(stored.title, "Renamed");
        assert!(stored.is_completed);
        assert_eq!(stored.created_at, task.created_at);
    }

    #[rstest]
    fn update_of_missing_task_is_noop(storage: Storage) {
        let task = storage.create_task(&NewTask::titled("Gone")).unwrap();
        storage.delete_task(task.id).unwrap();

        assert!(!storage.update_task(&task).unwrap());
        assert!(!storage.set_completed(task.id, true).unwrap());
    }

    #[rstest]
    fn delete_is_idempotent(storage: Storage) {
        let task = storage.create_task(&NewTask::titled("Delete me")).unwrap();
        assert!(storage.delete_task(task.id).unwrap());
        assert!(!storage.delete_task(task.id).unwrap());
        assert!(!storage.delete_task(4242).unwrap());
        assert!(storage.fetch_tasks(&TaskFilter::all()).unwrap().is_empty());

        let category = storage.create_category("Temp", None).unwrap();
        assert!(storage.delete_category(category.id).unwrap());
        assert!(!storage.delete_category(category.id).unwrap());
    }

    #[rstest]
    fn deleting_category_orphans_its_tasks(storage: Storage) {
        let work = storage.create_category("Work", None).unwrap();
        let ids: Vec<TaskId> = (0..3)
            .map(|i| {
                storage
                    .create_task(&NewTask {
                        category_id: Some(work.id),
                        ..NewTask::titled(format!("Work item {i}"))
                    })
                    .unwrap()
                    .id
            })
            .collect();
        assert_eq!(storage.count_tasks_in_category(work.id).unwrap(), 3);

        assert!(storage.delete_category(work.id).unwrap());

        for id in ids {
            let task = storage.fetch_task(id).unwrap().unwrap();
            assert_eq!(task.category_id, None);
        }
        assert_eq!(storage.count_tasks_in_category(work.id).unwrap(), 0);
    }

    #[rstest]
    fn category_name_existence_follows_lifecycle(storage: Storage) {
        assert!(!storage.is_category_name_exists("Work").unwrap());
        let work = storage.create_category("Work", None).unwrap();
        assert!(storage.is_category_name_exists("Work").unwrap());
        assert!(!storage.is_category_name_exists("work").unwrap());

        storage.delete_category(work.id).unwrap();
        assert!(!storage.is_category_name_exists("Work").unwrap());
    }

    #[rstest]
    fn task_name_existence_is_exact(storage: Storage) {
        storage.create_task(&NewTask::titled("Buy milk")).unwrap();
        assert!(storage.is_task_name_exists("Buy milk").unwrap());
        assert!(!storage.is_task_name_exists("buy milk").unwrap());
        assert!(!storage.is_task_name_exists("Buy").unwrap());
    }

    #[rstest]
    fn categories_sorted_by_name_with_counts(storage: Storage) {
        let work = storage.create_category("Work", None).unwrap();
        storage.create_category("Errands", None).unwrap();
        storage
            .create_task(&NewTask {
                category_id: Some(work.id),
                ..NewTask::titled("Report")
            })
            .unwrap();

        let names: Vec<String> = storage
            .fetch_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Errands", "Work"]);

        let counts: Vec<(String, usize)> = storage
            .category_task_counts()
            .unwrap()
            .into_iter()
            .map(|(c, n)| (c.name, n))
            .collect();
        assert_eq!(
            counts,
            vec![("Errands".to_string(), 0), ("Work".to_string(), 1)]
        );
    }

    #[rstest]
    fn renames_category(storage: Storage) {
        let mut category = storage.create_category("Old", None).unwrap();
        category.name = "New".into();
        category.color = Some("#00ff00".into());
        assert!(storage.update_category(&category).unwrap());

        let found = storage.find_category_by_name("New").unwrap().unwrap();
        assert_eq!(found.id, category.id);
        assert_eq!(found.color.as_deref(), Some("#00ff00"));
        assert!(storage.find_category_by_name("Old").unwrap().is_none());
    }

    #[test]
    fn reopening_file_keeps_data_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("todo.db");

        {
            let storage = Storage::open(&path).unwrap();
            storage.create_task(&NewTask::titled("Persisted")).unwrap();
        }

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.schema_version().unwrap(), MIGRATIONS.len() as i64);
        let tasks = storage.fetch_tasks(&TaskFilter::all()).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Persisted");
    }

    #[rstest]
    fn unknown_category_is_rejected(storage: Storage) {
        let result = storage.create_task(&NewTask {
            category_id: Some(99),
            ..NewTask::titled("Dangling")
        });
        assert!(matches!(result, Err(StoreError::Database(_))));
    }

    #[rstest]
    #[case::existing(true)]
    #[case::missing(false)]
    fn fetches_category_by_id(storage: Storage, #[case] existing: bool) {
        let home = storage.create_category("Home", Some("#123456")).unwrap();
        let id = if existing { home.id } else { home.id + 100 };

        let fetched = storage.fetch_category(id).unwrap();
        assert_eq!(fetched, existing.then_some(home));
    }

    #[rstest]
    fn counts_every_task(storage: Storage) {
        for title in ["a", "b", "c"] {
            storage.create_task(&NewTask::titled(title)).unwrap();
        }
        storage.set_completed(1, true).unwrap();
        assert_eq!(storage.count_tasks().unwrap(), 3);
    }

    #[rstest]
    fn unknown_stored_priority_is_an_error(storage: Storage) {
        let task = storage.create_task(&NewTask::titled("Corrupted")).unwrap();
        storage
            .db_con
            .execute("UPDATE task SET priority = 7 WHERE id = ?1", [task.id])
            .unwrap();

        assert!(matches!(
            storage.fetch_tasks(&TaskFilter::all()),
            Err(StoreError::Database(_))
        ));
        assert!(matches!(
            storage.fetch_task(task.id),
            Err(StoreError::Database(_))
        ));
    }

    #[test]
    fn upgrades_a_version_one_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(MIGRATIONS[0].sql).unwrap();
            conn.pragma_update(None, "user_version", 1).unwrap();
            conn.execute(
                "INSERT INTO task (title, due_date, created_at, priority) VALUES (?1, ?2, ?3, 2)",
                params!["Legacy", Utc::now() + Duration::days(1), Utc::now()],
            )
            .unwrap();
        }

        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.schema_version().unwrap(), 2);

        let tasks = storage.fetch_tasks(&TaskFilter::all()).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Legacy");
        assert_eq!(tasks[0].priority, Priority::High);
        assert!(!tasks[0].reminder_enabled);
        assert_eq!(tasks[0].reminder_id, None);

        // The reminder table exists and works for old rows
        storage.schedule_reminder(tasks[0].id).unwrap();
        assert_eq!(storage.pending_reminders().unwrap().len(), 1);
    }
}
