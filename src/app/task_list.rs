use chrono::Utc;
use now::DateTimeNow;
use ratatui::style::{Style, Stylize};
use ratatui::text::{Line, Span};
use std::ops::Add;
use tracing::{error, warn};

use ratatui::widgets::*;

use crate::app::models::{
    compare_due_dates, compare_tasks, format_due_date, Category, CategoryFilter, CategoryId, Task,
    TaskFilter,
};
use crate::app::storage::Storage;
use crate::app::theme::Palette;

use super::ui::App;

// Possible task list sorting orders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortedBy {
    ByDueDate,
    ByName,
    ByPriority,
}

pub struct TaskList<'a> {
    pub state: ListState,
    pub items: Vec<Task>,
    pub categories: Vec<Category>,
    pub filter: TaskFilter,
    // Every stored task, whatever the filter
    pub total: usize,
    storage: &'a Storage,
    sorted_by: Option<SortedBy>,
    reversed: bool,
}

impl<'a> TaskList<'a> {
    // Initialize a task list with items from the database
    pub fn with_items_from_storage(storage: &'a Storage) -> TaskList<'a> {
        let mut list = TaskList {
            state: ListState::default(),
            items: Vec::new(),
            categories: Vec::new(),
            filter: TaskFilter::all(),
            total: 0,
            storage,
            sorted_by: None,
            reversed: false,
        };
        list.update_items();
        list
    }

    // Refresh the items of this list with the items from the database.
    // On failure the previous items stay on screen.
    pub fn update_items(&mut self) {
        match self.storage.fetch_categories() {
            Ok(categories) => self.categories = categories,
            Err(err) => warn!(%err, "could not reload categories"),
        }
        if let CategoryFilter::Only(id) = self.filter.category {
            if self.category_name(id).is_none() {
                self.filter.category = CategoryFilter::Any;
            }
        }

        match self.storage.fetch_tasks(&self.filter) {
            Ok(items) => self.items = items,
            Err(err) => warn!(%err, "could not reload tasks"),
        }
        match self.storage.count_tasks() {
            Ok(total) => self.total = total,
            Err(err) => warn!(%err, "could not count tasks"),
        }
        self.apply_sort();
        self.clamp_selection();
    }

    fn clamp_selection(&mut self) {
        match self.state.selected() {
            Some(_) if self.items.is_empty() => self.state.select(None),
            Some(i) if i >= self.items.len() => self.state.select(Some(self.items.len() - 1)),
            _ => {}
        }
    }

    // Move the selection to the next item
    pub fn next(&mut self) {
        let i = match self.state.selected() {
            Some(i) => {
                if self.items.is_empty() || i >= self.items.len() - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    // Move the selection to the previous item
    pub fn previous(&mut self) {
        let i = match self.state.selected() {
            Some(i) => {
                if self.items.is_empty() {
                    0
                } else if i == 0 {
                    self.items.len() - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn unselect(&mut self) {
        self.state.select(None);
    }

    // Change the state of the task to completed/to do; Save in database.
    pub fn toggle_completed(&mut self) {
        let storage = self.storage;
        self.apply_for_selected_task(|task| {
            match storage.set_completed(task.id, !task.is_completed) {
                Ok(_) => task.is_completed = !task.is_completed,
                Err(err) => error!(task_id = task.id, %err, "failed to update a task"),
            }
        });
        // The task may no longer match the filter
        let filter = self.filter;
        let selected = self.get_selected();
        if selected.is_some_and(|task| !filter.matches(task)) {
            self.update_items();
        }
    }

    // Perform a function on the object of the selected task
    fn apply_for_selected_task(&mut self, function: impl FnOnce(&mut Task)) {
        if let Some(item) = self.state.selected().and_then(|i| self.items.get_mut(i)) {
            function(item);
        }
    }

    // Delete the selected task from database; Update the items
    pub fn delete_selected(&mut self) {
        let storage = self.storage;
        self.apply_for_selected_task(|task| {
            if let Err(err) = storage.delete_task(task.id) {
                error!(task_id = task.id, %err, "failed to delete a task");
            }
        });
        self.update_items();
    }

    // Switch the reminder of the selected task on or off.
    // Returns a message for the user.
    pub fn toggle_reminder_selected(&mut self) -> Option<String> {
        let task = self.get_selected()?.clone();
        let result = if task.reminder_enabled {
            self.storage
                .cancel_reminder(task.id)
                .map(|_| format!("Reminder off: {}", task.title))
        } else {
            self.storage.schedule_reminder(task.id).map(|reminder| {
                format!(
                    "Reminder set: {} at {}",
                    task.title,
                    format_due_date(&reminder.fire_at)
                )
            })
        };
        self.update_items();

        match result {
            Ok(message) => Some(message),
            Err(err) if err.is_validation() => Some(err.to_string()),
            Err(err) => {
                error!(task_id = task.id, %err, "failed to change a reminder");
                Some("Could not change the reminder".to_string())
            }
        }
    }

    // Get the selected task
    pub fn get_selected(&self) -> Option<&Task> {
        self.state.selected().and_then(|i| self.items.get(i))
    }

    pub fn category_name(&self, id: CategoryId) -> Option<&str> {
        self.categories
            .iter()
            .find(|category| category.id == id)
            .map(|category| category.name.as_str())
    }

    // Get the uncompleted tasks
    pub fn get_uncompleted(&self) -> Vec<&Task> {
        self.items
            .iter()
            .filter(|task| !task.is_completed)
            .collect::<Vec<&Task>>()
    }

    // Get the tasks due next week
    pub fn get_due_next_week(&self) -> Vec<&Task> {
        let next_week = Utc::now().add(chrono::Duration::weeks(1));
        self.items
            .iter()
            .filter(|task| task.is_due_before(next_week))
            .collect::<Vec<&Task>>()
    }

    // Get the late tasks
    pub fn get_late(&self) -> Vec<&Task> {
        let today = Utc::now().beginning_of_day();
        self.items
            .iter()
            .filter(|task| task.is_due_before(today))
            .collect::<Vec<&Task>>()
    }

    // Sort the items by the given order; choosing the same order again reverses it
    pub fn set_sort(&mut self, sorted_by: SortedBy) {
        if self.sorted_by == Some(sorted_by) {
            self.reversed = !self.reversed;
        } else {
            self.sorted_by = Some(sorted_by);
            self.reversed = false;
        }
        self.apply_sort();
    }

    // Back to priority, due date, newest first
    pub fn reset_sort(&mut self) {
        self.sorted_by = None;
        self.reversed = false;
        self.apply_sort();
    }

    fn apply_sort(&mut self) {
        match self.sorted_by {
            Some(SortedBy::ByName) => self.items.sort_by(|a, b| a.title.cmp(&b.title)),
            Some(SortedBy::ByPriority) => self.items.sort_by(|a, b| a.priority.cmp(&b.priority)),
            Some(SortedBy::ByDueDate) => self
                .items
                .sort_by(|a, b| compare_due_dates(a.due_date, b.due_date)),
            None => self.items.sort_by(compare_tasks),
        }
        if self.reversed {
            self.items.reverse();
        }
    }

    // all -> pending -> completed -> all
    pub fn cycle_completion_filter(&mut self) {
        self.filter.completed = match self.filter.completed {
            None => Some(false),
            Some(false) => Some(true),
            Some(true) => None,
        };
        self.update_items();
    }

    // any -> uncategorized -> each category by name -> any
    pub fn cycle_category_filter(&mut self) {
        self.filter.category = match self.filter.category {
            CategoryFilter::Any => CategoryFilter::Uncategorized,
            CategoryFilter::Uncategorized => self
                .categories
                .first()
                .map_or(CategoryFilter::Any, |c| CategoryFilter::Only(c.id)),
            CategoryFilter::Only(id) => {
                let position = self.categories.iter().position(|c| c.id == id);
                position
                    .and_then(|i| self.categories.get(i + 1))
                    .map_or(CategoryFilter::Any, |c| CategoryFilter::Only(c.id))
            }
        };
        self.update_items();
    }

    pub fn set_category_filter(&mut self, category: CategoryFilter) {
        self.filter.category = category;
        self.update_items();
    }

    pub fn filter_label(&self) -> String {
        let completion = match self.filter.completed {
            None => "all",
            Some(false) => "pending",
            Some(true) => "completed",
        };
        let category = match self.filter.category {
            CategoryFilter::Any => "any category".to_string(),
            CategoryFilter::Uncategorized => "uncategorized".to_string(),
            CategoryFilter::Only(id) => self.category_name(id).unwrap_or("?").to_string(),
        };
        format!("{completion}, {category}")
    }
}

// Build the UI (list) for task list
pub fn get_list_items_ui<'a>(
    tasks: &'a [Task],
    categories: &'a [Category],
    palette: &Palette,
) -> Vec<ListItem<'a>> {
    tasks
        .iter()
        .map(|task| {
            let mut lines = Vec::new();

            let mut first_line = vec![
                Span::from(if task.is_completed { "[✓] " } else { "[ ] " }),
                Span::from(task.title.as_str()).fg(palette.priority(task.priority)),
            ];
            if task.reminder_enabled {
                first_line.push(Span::from(" [r]").fg(palette.notice));
            }
            lines.push(Line::from(first_line));

            let due = match &task.due_date {
                Some(due) => format!("    Due: {}", format_due_date(due)),
                None => "    No due date".to_string(),
            };
            let mut second_line = vec![Span::from(due)];
            if let Some(category) = task
                .category_id
                .and_then(|id| categories.iter().find(|c| c.id == id))
            {
                second_line.push(Span::from(format!(" Category: {}", category.name)));
            }
            if let Some(notes) = &task.notes {
                second_line.push(Span::from(format!(" Notes: {}", notes)).fg(palette.muted));
            }
            lines.push(Line::from(second_line));

            ListItem::new(lines).style(Style::default().fg(palette.text))
        })
        .collect()
}

// Build the UI (lines) for statistics infobox
pub fn get_statistics_ui<'a>(app: &'a App<'a>) -> Vec<Line<'a>> {
    vec![
        Line::from(format!("Showing: {}", app.items.filter_label())),
        Line::from(format!("Total tasks: {}", app.items.total)),
        Line::from(format!("Tasks shown: {}", app.items.items.len())),
        Line::from(format!(
            "Uncompleted tasks: {}",
            app.items.get_uncompleted().len()
        )),
        Line::from(format!(
            "Due next week: {}",
            app.items.get_due_next_week().len()
        )),
        Line::from(format!("Late: {}", app.items.get_late().len())),
        Line::from(format!("Categories: {}", app.items.categories.len())),
    ]
}

// Build the UI (lines) for instructions infobox
pub fn get_instructions_ui<'a>() -> Vec<Line<'a>> {
    vec![
        "Enter - toggle do/done".into(),
        "a - add a task".into(),
        "e - edit a task".into(),
        "x - delete a task".into(),
        "r - toggle reminder".into(),
        "d / f / g - sort by due date / name / priority".into(),
        "s - default order".into(),
        "c - show all / pending / completed".into(),
        "k - filter by category".into(),
        "m - manage categories".into(),
        "q - quit".into(),
    ]
}
