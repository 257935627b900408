//! Command line interface: one-shot task commands next to the interactive list

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::app::error::StoreError;
use crate::app::models::{
    format_due_date, Category, CategoryFilter, CategoryId, NewTask, Priority, Task, TaskFilter,
    TaskId,
};
use crate::app::storage::Storage;
use crate::app::validation::{
    check_category_name, check_task_title, normalize_notes, parse_due_input,
};
use crate::config;

#[derive(Debug, Parser)]
#[command(name = "todolist")]
#[command(about = "A terminal task manager")]
#[command(version)]
pub struct Cli {
    /// Database file to use instead of the configured one
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the interactive task list (the default)
    Tui,

    #[command(flatten)]
    Tasks(TaskCommand),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigAction),
}

/// Commands that work on the task store
#[derive(Debug, Subcommand)]
pub enum TaskCommand {
    /// Add a task
    Add {
        /// Task title
        title: String,
        /// Free-form notes
        #[arg(short, long)]
        notes: Option<String>,
        /// Due date, dd.mm.yyyy or "dd.mm.yyyy HH:MM"
        #[arg(short, long)]
        due: Option<String>,
        #[arg(short, long, value_enum, default_value = "low")]
        priority: Priority,
        /// Category name
        #[arg(short, long)]
        category: Option<String>,
        /// Remind at the due date
        #[arg(short, long)]
        remind: bool,
    },

    /// List tasks in the default order
    List {
        /// Only completed tasks
        #[arg(long, conflicts_with = "pending")]
        completed: bool,
        /// Only tasks still to do
        #[arg(long)]
        pending: bool,
        /// Only tasks in this category
        #[arg(short, long, conflicts_with = "uncategorized")]
        category: Option<String>,
        /// Only tasks without a category
        #[arg(long)]
        uncategorized: bool,
    },

    /// Show task details
    Show {
        /// Task ID
        id: TaskId,
    },

    /// Change a task
    Edit {
        /// Task ID
        id: TaskId,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        #[arg(short, long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date (and any reminder)
        #[arg(long)]
        clear_due: bool,
        #[arg(short, long, value_enum)]
        priority: Option<Priority>,
        #[arg(short, long, conflicts_with = "no_category")]
        category: Option<String>,
        /// Remove the task from its category
        #[arg(long)]
        no_category: bool,
    },

    /// Mark a task as completed
    Done {
        /// Task ID
        id: TaskId,
    },

    /// Mark a task as still to do
    Undo {
        /// Task ID
        id: TaskId,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: TaskId,
    },

    /// Remind about a task at its due date
    Remind {
        /// Task ID
        id: TaskId,
        /// Cancel the reminder instead
        #[arg(long)]
        off: bool,
    },

    /// List reminders that have not fired yet
    Reminders,

    /// Manage categories
    #[command(subcommand)]
    Category(CategoryCommand),
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    /// Create a category
    Add {
        name: String,
        /// Display colour, e.g. "#ff8800"
        #[arg(long)]
        color: Option<String>,
    },
    /// List categories with their task counts
    List,
    /// Rename a category
    Rename { name: String, new_name: String },
    /// Delete a category; its tasks become uncategorized
    Rm { name: String },
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Get a configuration value
    Get { key: String },
    /// Set a configuration value
    Set { key: String, value: String },
    /// Show configuration file path
    Path,
}

fn resolve_category(storage: &Storage, name: &str) -> Result<CategoryId> {
    match storage.find_category_by_name(name.trim())? {
        Some(category) => Ok(category.id),
        None => bail!("No category named \"{}\"", name.trim()),
    }
}

fn find_category(storage: &Storage, name: &str) -> Result<Category> {
    match storage.find_category_by_name(name.trim())? {
        Some(category) => Ok(category),
        None => bail!("No category named \"{}\"", name.trim()),
    }
}

fn category_name(categories: &[Category], id: Option<CategoryId>) -> Option<&str> {
    id.and_then(|id| categories.iter().find(|c| c.id == id))
        .map(|c| c.name.as_str())
}

// One task per line: id, completion mark, title and a short summary
pub fn format_task_line(task: &Task, categories: &[Category]) -> String {
    let mut details = vec![task.priority.label().to_string()];
    if let Some(due) = &task.due_date {
        details.push(format!("due {}", format_due_date(due)));
    }
    if let Some(name) = category_name(categories, task.category_id) {
        details.push(name.to_string());
    }
    if task.reminder_enabled {
        details.push("reminder".to_string());
    }

    format!(
        "{:>4} [{}] {}  ({})",
        task.id,
        if task.is_completed { "x" } else { " " },
        task.title,
        details.join(", ")
    )
}

pub fn execute(command: TaskCommand, storage: &Storage, out: &mut impl Write) -> Result<()> {
    match command {
        TaskCommand::Add {
            title,
            notes,
            due,
            priority,
            category,
            remind,
        } => {
            let title = check_task_title(storage, &title, None)?;
            let due_date = parse_due_input(due.as_deref().unwrap_or_default())?;
            if remind && due_date.is_none() {
                bail!("--remind needs a due date");
            }
            let category_id = category
                .as_deref()
                .map(|name| resolve_category(storage, name))
                .transpose()?;

            let task = storage.create_task(&NewTask {
                notes: notes.as_deref().and_then(normalize_notes),
                due_date,
                priority,
                category_id,
                ..NewTask::titled(title)
            })?;
            writeln!(out, "Added task {}: {}", task.id, task.title)?;

            if remind {
                let reminder = storage.schedule_reminder(task.id)?;
                let fire_at = format_due_date(&reminder.fire_at);
                writeln!(out, "Reminder set for {fire_at}")?;
            }
        }

        TaskCommand::List {
            completed,
            pending,
            category,
            uncategorized,
        } => {
            let by_completion = match (completed, pending) {
                (true, _) => TaskFilter::completed(true),
                (_, true) => TaskFilter::completed(false),
                _ => TaskFilter::all(),
            };
            let category = match (category, uncategorized) {
                (Some(name), _) => CategoryFilter::Only(resolve_category(storage, &name)?),
                (None, true) => CategoryFilter::Uncategorized,
                (None, false) => CategoryFilter::Any,
            };

            let tasks = storage.fetch_tasks(&TaskFilter {
                category,
                ..by_completion
            })?;
            let categories = storage.fetch_categories()?;
            if tasks.is_empty() {
                writeln!(out, "No tasks")?;
            }
            for task in &tasks {
                writeln!(out, "{}", format_task_line(task, &categories))?;
            }
        }

        TaskCommand::Show { id } => {
            let task = storage.require_task(id)?;
            let category = match task.category_id {
                Some(category_id) => storage.fetch_category(category_id)?,
                None => None,
            };

            writeln!(out, "Task {}: {}", task.id, task.title)?;
            writeln!(
                out,
                "Status:    {}",
                if task.is_completed { "completed" } else { "to do" }
            )?;
            writeln!(out, "Priority:  {}", task.priority.label())?;
            if let Some(due) = &task.due_date {
                writeln!(out, "Due:       {}", format_due_date(due))?;
            }
            if let Some(category) = &category {
                writeln!(out, "Category:  {}", category.name)?;
            }
            if let Some(notes) = &task.notes {
                writeln!(out, "Notes:     {}", notes)?;
            }
            if let Some(reminder) = storage.reminder_for_task(id)? {
                let state = if reminder.delivered { "fired" } else { "pending" };
                writeln!(
                    out,
                    "Reminder:  {} ({})",
                    format_due_date(&reminder.fire_at),
                    state
                )?;
            }
            writeln!(out, "Created:   {}", format_due_date(&task.created_at))?;
        }

        TaskCommand::Edit {
            id,
            title,
            notes,
            due,
            clear_due,
            priority,
            category,
            no_category,
        } => {
            let mut task = storage.require_task(id)?;
            if let Some(title) = title {
                task.title = check_task_title(storage, &title, Some(&task.title))?;
            }
            if let Some(notes) = notes {
                task.notes = normalize_notes(&notes);
            }
            if clear_due {
                task.due_date = None;
            } else if let Some(due) = due {
                task.due_date = parse_due_input(&due)?;
            }
            if let Some(priority) = priority {
                task.priority = priority;
            }
            if no_category {
                task.category_id = None;
            } else if let Some(name) = category {
                task.category_id = Some(resolve_category(storage, &name)?);
            }

            if !storage.update_task(&task)? {
                return Err(StoreError::TaskNotFound(id).into());
            }
            writeln!(out, "Updated task {}: {}", task.id, task.title)?;
        }

        TaskCommand::Done { id } => {
            if !storage.set_completed(id, true)? {
                return Err(StoreError::TaskNotFound(id).into());
            }
            writeln!(out, "Completed task {}", id)?;
        }

        TaskCommand::Undo { id } => {
            if !storage.set_completed(id, false)? {
                return Err(StoreError::TaskNotFound(id).into());
            }
            writeln!(out, "Reopened task {}", id)?;
        }

        TaskCommand::Rm { id } => {
            if !storage.delete_task(id)? {
                return Err(StoreError::TaskNotFound(id).into());
            }
            writeln!(out, "Deleted task {}", id)?;
        }

        TaskCommand::Remind { id, off } => {
            let task = storage.require_task(id)?;
            if off {
                if storage.cancel_reminder(id)? {
                    writeln!(out, "Reminder off: {}", task.title)?;
                } else {
                    writeln!(out, "Task {} has no reminder", id)?;
                }
            } else {
                let reminder = storage.schedule_reminder(id)?;
                writeln!(
                    out,
                    "Reminder set: {} at {}",
                    task.title,
                    format_due_date(&reminder.fire_at)
                )?;
            }
        }

        TaskCommand::Reminders => {
            let pending = storage.pending_reminders()?;
            if pending.is_empty() {
                writeln!(out, "No pending reminders")?;
            }
            for notice in pending {
                writeln!(
                    out,
                    "{}  {} (task {})",
                    format_due_date(&notice.reminder.fire_at),
                    notice.task_title,
                    notice.reminder.task_id
                )?;
            }
        }

        TaskCommand::Category(command) => execute_category(command, storage, out)?,
    }
    Ok(())
}

fn execute_category(
    command: CategoryCommand,
    storage: &Storage,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        CategoryCommand::Add { name, color } => {
            let name = check_category_name(storage, &name, None)?;
            let category = storage.create_category(&name, color.as_deref())?;
            writeln!(out, "Added category {}", category.name)?;
        }
        CategoryCommand::List => {
            let counts = storage.category_task_counts()?;
            if counts.is_empty() {
                writeln!(out, "No categories")?;
            }
            for (category, count) in counts {
                match &category.color {
                    Some(color) => writeln!(out, "{} ({} tasks) {}", category.name, count, color)?,
                    None => writeln!(out, "{} ({} tasks)", category.name, count)?,
                }
            }
        }
        CategoryCommand::Rename { name, new_name } => {
            let mut category = find_category(storage, &name)?;
            let new_name = check_category_name(storage, &new_name, Some(&category.name))?;
            let old_name = std::mem::replace(&mut category.name, new_name);
            storage.update_category(&category)?;
            writeln!(out, "Renamed category {} to {}", old_name, category.name)?;
        }
        CategoryCommand::Rm { name } => {
            let category = find_category(storage, &name)?;
            let count = storage.count_tasks_in_category(category.id)?;
            storage.delete_category(category.id)?;
            writeln!(out, "Deleted category {}", category.name)?;
            if count > 0 {
                writeln!(out, "{} task(s) are now uncategorized", count)?;
            }
        }
    }
    Ok(())
}

pub fn handle_config(action: ConfigAction, config_file: &Path, out: &mut impl Write) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let cfg = config::load_config_from(config_file)?;
            let toml_str = toml::to_string_pretty(&cfg)?;
            writeln!(out, "{}", toml_str)?;
        }
        ConfigAction::Get { key } => {
            let cfg = config::load_config_from(config_file)?;
            match config::get_config_value(&cfg, &key) {
                Some(value) => writeln!(out, "{}", value)?,
                None if config::CONFIG_KEYS.contains(&key.as_str()) => writeln!(out, "(not set)")?,
                None => bail!("Unknown config key: {}", key),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut cfg = config::load_config_from(config_file)?;
            config::set_config_value(&mut cfg, &key, &value)?;
            config::save_config_to(&cfg, config_file)?;
            writeln!(out, "Set {} = {}", key, value)?;
        }
        ConfigAction::Path => {
            writeln!(out, "{}", config_file.display())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::error::ValidationError;
    use rstest::{fixture, rstest};

    #[fixture]
    fn storage() -> Storage {
        Storage::open_in_memory().unwrap()
    }

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("todolist").chain(args.iter().copied())).unwrap()
    }

    fn task_command(args: &[&str]) -> TaskCommand {
        match parse(args).command {
            Some(Command::Tasks(command)) => command,
            other => panic!("not a task command: {other:?}"),
        }
    }

    fn run(storage: &Storage, args: &[&str]) -> Result<String> {
        let mut out = Vec::new();
        execute(task_command(args), storage, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn no_arguments_means_tui() {
        let cli = parse(&[]);
        assert!(cli.command.is_none());
        assert!(cli.db.is_none());
    }

    #[test]
    fn db_flag_is_global() {
        let cli = parse(&["list", "--db", "/tmp/tasks.db"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/tasks.db")));
    }

    #[rstest]
    #[case(&["list", "--completed", "--pending"])]
    #[case(&["list", "--category", "Work", "--uncategorized"])]
    #[case(&["edit", "1", "--due", "01.01.2030", "--clear-due"])]
    #[case(&["add", "Title", "--priority", "urgent"])]
    #[case(&["done", "one"])]
    fn rejects_bad_arguments(#[case] args: &[&str]) {
        let result = Cli::try_parse_from(std::iter::once("todolist").chain(args.iter().copied()));
        assert!(result.is_err());
    }

    #[rstest]
    fn add_then_list(storage: Storage) {
        run(&storage, &["category", "add", "Home"]).unwrap();
        let added = run(
            &storage,
            &["add", "Fix the sink", "-p", "high", "-d", "03.02.2030", "-c", "Home"],
        )
        .unwrap();
        assert_eq!(added, "Added task 1: Fix the sink\n");

        let listed = run(&storage, &["list"]).unwrap();
        assert_eq!(
            listed,
            "   1 [ ] Fix the sink  (high, due 03.02.2030, Home)\n"
        );

        let shown = run(&storage, &["show", "1"]).unwrap();
        assert!(shown.contains("Category:  Home\n"), "{shown}");
    }

    #[rstest]
    fn add_rejects_duplicates_and_bad_dates(storage: Storage) {
        run(&storage, &["add", "Laundry"]).unwrap();

        let duplicate = run(&storage, &["add", "Laundry"]).unwrap_err();
        assert!(matches!(
            duplicate.downcast_ref::<StoreError>(),
            Some(StoreError::Invalid(ValidationError::DuplicateTaskTitle(_)))
        ));

        let bad_date = run(&storage, &["add", "Ironing", "--due", "tomorrow"]).unwrap_err();
        assert!(matches!(
            bad_date.downcast_ref::<ValidationError>(),
            Some(ValidationError::BadDate(_))
        ));
        assert_eq!(storage.fetch_tasks(&TaskFilter::all()).unwrap().len(), 1);
    }

    #[rstest]
    fn remind_without_due_date_creates_nothing(storage: Storage) {
        assert!(run(&storage, &["add", "Call mum", "--remind"]).is_err());
        assert!(storage.fetch_tasks(&TaskFilter::all()).unwrap().is_empty());
    }

    #[rstest]
    fn list_filters(storage: Storage) {
        run(&storage, &["category", "add", "Work"]).unwrap();
        run(&storage, &["add", "Report", "-c", "Work"]).unwrap();
        run(&storage, &["add", "Groceries"]).unwrap();
        run(&storage, &["done", "2"]).unwrap();

        let pending = run(&storage, &["list", "--pending"]).unwrap();
        assert!(pending.contains("Report"));
        assert!(!pending.contains("Groceries"));
        let uncategorized = run(&storage, &["list", "--uncategorized"]).unwrap();
        assert!(uncategorized.contains("Groceries"));
        let done_at_work = run(&storage, &["list", "--completed", "-c", "Work"]).unwrap();
        assert_eq!(done_at_work, "No tasks\n");
        assert!(run(&storage, &["list", "-c", "Nowhere"]).is_err());
    }

    #[rstest]
    fn edit_changes_only_given_fields(storage: Storage) {
        let add = ["add", "Draft", "--notes", "first pass", "--due", "10.10.2030"];
        run(&storage, &add).unwrap();
        let edit = ["edit", "1", "--title", "Final", "--clear-due", "-p", "medium"];
        run(&storage, &edit).unwrap();

        let task = storage.require_task(1).unwrap();
        assert_eq!(task.title, "Final");
        assert_eq!(task.notes.as_deref(), Some("first pass"));
        assert_eq!(task.due_date, None);
        assert_eq!(task.priority, Priority::Medium);

        // Keeping the same title is not a duplicate
        run(&storage, &["edit", "1", "--title", "Final"]).unwrap();
    }

    #[rstest]
    #[case(&["done", "42"])]
    #[case(&["undo", "42"])]
    #[case(&["rm", "42"])]
    #[case(&["show", "42"])]
    #[case(&["edit", "42", "--title", "x"])]
    #[case(&["remind", "42"])]
    fn missing_task_is_reported(storage: Storage, #[case] args: &[&str]) {
        let err = run(&storage, args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::TaskNotFound(42))
        ));
    }

    #[rstest]
    fn reminders_round(storage: Storage) {
        run(&storage, &["add", "Dentist", "--due", "05.06.2031 09:30"]).unwrap();
        let set = run(&storage, &["remind", "1"]).unwrap();
        assert_eq!(set, "Reminder set: Dentist at 05.06.2031 09:30\n");

        let pending = run(&storage, &["reminders"]).unwrap();
        assert_eq!(pending, "05.06.2031 09:30  Dentist (task 1)\n");
        assert!(run(&storage, &["show", "1"]).unwrap().contains("(pending)"));

        run(&storage, &["remind", "1", "--off"]).unwrap();
        assert_eq!(
            run(&storage, &["reminders"]).unwrap(),
            "No pending reminders\n"
        );
        assert_eq!(
            run(&storage, &["remind", "1", "--off"]).unwrap(),
            "Task 1 has no reminder\n"
        );
    }

    #[rstest]
    fn category_rename_and_removal(storage: Storage) {
        let add = ["category", "add", "Hobby", "--color", "#00ff00"];
        run(&storage, &add).unwrap();
        run(&storage, &["category", "add", "Chores"]).unwrap();
        run(&storage, &["add", "Paint", "-c", "Hobby"]).unwrap();

        assert!(run(&storage, &["category", "rename", "Hobby", "Chores"]).is_err());
        run(&storage, &["category", "rename", "Hobby", "Art"]).unwrap();
        assert_eq!(
            run(&storage, &["category", "list"]).unwrap(),
            "Art (1 tasks) #00ff00\nChores (0 tasks)\n"
        );

        let removed = run(&storage, &["category", "rm", "Art"]).unwrap();
        assert!(removed.contains("1 task(s) are now uncategorized"));
        assert_eq!(storage.require_task(1).unwrap().category_id, None);
    }

    fn get(key: &str) -> ConfigAction {
        ConfigAction::Get {
            key: key.to_string(),
        }
    }

    #[test]
    fn config_set_get_and_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("nested").join("config.toml");
        let mut out = Vec::new();

        handle_config(
            ConfigAction::Set {
                key: "ui.theme".to_string(),
                value: "dark".to_string(),
            },
            &file,
            &mut out,
        )
        .unwrap();
        handle_config(get("ui.theme"), &file, &mut out).unwrap();
        handle_config(get("logging.file"), &file, &mut out).unwrap();
        handle_config(ConfigAction::Path, &file, &mut out).unwrap();

        let printed = String::from_utf8(out).unwrap();
        assert_eq!(
            printed,
            format!("Set ui.theme = dark\ndark\n(not set)\n{}\n", file.display())
        );
        assert!(handle_config(get("nope"), &file, &mut Vec::new()).is_err());
    }
}
