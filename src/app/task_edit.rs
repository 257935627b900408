use chrono::{DateTime, Utc};
use ratatui::style::Style;
use ratatui::text::{Line, Span};
use tracing::error;

use crate::app::error::{StoreError, StoreResult, ValidationError};
use crate::app::models::{format_due_date, Category, CategoryId, NewTask, Priority, Task, TaskId};
use crate::app::storage::Storage;
use crate::app::validation::{check_task_title, normalize_notes, parse_due_input};
use derivative::Derivative;

use super::ui::App;

const TITLE_ROW: usize = 0;
const NOTES_ROW: usize = 1;
const DUE_DATE_ROW: usize = 2;
const PRIORITY_ROW: usize = 3;
const CATEGORY_ROW: usize = 4;
const REMINDER_ROW: usize = 5;
const LAST_ROW: usize = REMINDER_ROW;

// State object for the task edit dialog
// Keeps track of the state of the dialog and the content of the task being edited
#[derive(Derivative)]
#[derivative(Default)]
pub struct TaskEditDialogState {
    pub dialog_active: bool,
    task_id: Option<TaskId>,
    original_title: Option<String>,
    content: Option<TaskEditDialogContent>,
    error_message: Option<String>,
    cursor_position: Option<(usize, usize)>,
}

// Current content of the task being edited/created
#[derive(Derivative)]
#[derivative(Default)]
struct TaskEditDialogContent {
    title: String,
    notes: String,
    due_date: String,
    priority: Priority,
    category_id: Option<CategoryId>,
    reminder: bool,
}

// Refer to https://stackoverflow.com/a/66609806
impl<'a> Default for &'a TaskEditDialogContent {
    fn default() -> &'a TaskEditDialogContent {
        static VALUE: TaskEditDialogContent = TaskEditDialogContent {
            title: String::new(),
            notes: String::new(),
            due_date: String::new(),
            priority: Priority::Low,
            category_id: None,
            reminder: false,
        };
        &VALUE
    }
}

// Byte offset of the char at `char_index`, or the end of the string
fn byte_index(value: &str, char_index: usize) -> usize {
    value
        .char_indices()
        .nth(char_index)
        .map_or(value.len(), |(i, _)| i)
}

impl TaskEditDialogState {
    // Opens the dialog and prepares to accept an input for the new task
    pub fn create_a_new_task(&mut self, category_id: Option<CategoryId>) {
        self.dialog_active = true;
        self.task_id = None;
        self.original_title = None;
        self.error_message = None;
        self.cursor_position = Some((0, TITLE_ROW));
        self.content = Some(TaskEditDialogContent {
            category_id,
            ..TaskEditDialogContent::default()
        });
    }

    // Opens the dialog and prepares to accept an input for the existing task
    pub fn edit_task(&mut self, task: &Task) {
        self.dialog_active = true;
        self.task_id = Some(task.id);
        self.original_title = Some(task.title.clone());
        self.error_message = None;
        self.cursor_position = Some((0, TITLE_ROW));
        self.content = Some(TaskEditDialogContent {
            title: task.title.clone(),
            notes: task.notes.clone().unwrap_or_default(),
            due_date: task
                .due_date
                .as_ref()
                .map(format_due_date)
                .unwrap_or_default(),
            priority: task.priority,
            category_id: task.category_id,
            reminder: task.reminder_enabled,
        });
    }

    pub fn cancel(&mut self) {
        self.dialog_active = false;
        self.error_message = None;
    }

    fn row(&self) -> usize {
        self.cursor_position.unwrap_or((0, 0)).1
    }

    // Priority, category and reminder rows pick from fixed choices
    pub fn is_on_selector(&self) -> bool {
        self.row() >= PRIORITY_ROW
    }

    // Move the cursor one line BELOW the current one.
    // Never past the last row; keep the horizontal position when the row is long enough
    pub fn move_cursor_down(&mut self) {
        let cursor_position = self.cursor_position.unwrap_or((0, 0));
        let future_y_position = (cursor_position.1 + 1).min(LAST_ROW);
        self.cursor_position = Some((
            cursor_position.0.min(self.chars_at_row(future_y_position)),
            future_y_position,
        ));
    }

    // Move the cursor one line ABOVE the current one.
    pub fn move_cursor_up(&mut self) {
        let cursor_position = self.cursor_position.unwrap_or((0, 0));
        if cursor_position.1 > 0 {
            let future_y_position = cursor_position.1 - 1;
            self.cursor_position = Some((
                cursor_position.0.min(self.chars_at_row(future_y_position)),
                future_y_position,
            ));
        }
    }

    // Move the cursor one char LEFT to the current one.
    // An overflow should be prevented, and the vertical cursor position shall not change
    pub fn move_cursor_left(&mut self) {
        let cursor_position = self.cursor_position.unwrap_or((0, 0));
        if cursor_position.0 > 0 {
            self.cursor_position = Some((cursor_position.0 - 1, cursor_position.1));
        }
    }

    // Move the cursor one char RIGHT to the current one.
    // An overflow should be prevented, and the vertical cursor position shall not change
    pub fn move_cursor_right(&mut self) {
        let cursor_position = self.cursor_position.unwrap_or((0, 0));
        self.cursor_position = Some((
            (cursor_position.0 + 1).min(self.chars_at_row(cursor_position.1)),
            cursor_position.1,
        ));
    }

    // Step through the choices of a selector row
    pub fn cycle_choice(&mut self, forward: bool, categories: &[Category]) {
        let row = self.row();
        let Some(content) = self.content.as_mut() else {
            return;
        };
        match row {
            PRIORITY_ROW => {
                content.priority = if forward {
                    content.priority.next()
                } else {
                    content.priority.previous()
                };
            }
            CATEGORY_ROW => {
                content.category_id = cycle_category(content.category_id, categories, forward)
            }
            REMINDER_ROW => content.reminder = !content.reminder,
            _ => {}
        }
    }

    // Delete the char before the cursor
    pub fn delete_char(&mut self) {
        let (x, y) = self.cursor_position.unwrap_or((0, 0));
        if x == 0 {
            return;
        }
        let Some(field) = self.text_field_mut(y) else {
            return;
        };
        let at = byte_index(field, x - 1);
        if at < field.len() {
            field.remove(at);
        }
        self.move_cursor_left();
    }

    fn text_field_mut(&mut self, y_position: usize) -> Option<&mut String> {
        let content = self.content.as_mut()?;
        match y_position {
            TITLE_ROW => Some(&mut content.title),
            NOTES_ROW => Some(&mut content.notes),
            DUE_DATE_ROW => Some(&mut content.due_date),
            _ => None,
        }
    }

    // Length in chars of the text at the given row; selector rows have none
    fn chars_at_row(&self, y_position: usize) -> usize {
        let content = self.content.as_ref().unwrap_or_default();
        match y_position {
            TITLE_ROW => content.title.chars().count(),
            NOTES_ROW => content.notes.chars().count(),
            DUE_DATE_ROW => content.due_date.chars().count(),
            _ => 0,
        }
    }

    // Saves the task to the database; returns whether the dialog closed
    pub fn save_task(&mut self, storage: &Storage) -> bool {
        let content = self.content.as_ref().unwrap_or_default();
        let result = parse_due_input(&content.due_date)
            .map_err(StoreError::from)
            .and_then(|due_date| -> StoreResult<()> {
                if content.reminder && due_date.is_none() {
                    return Err(ValidationError::ReminderWithoutDueDate(
                        self.task_id.unwrap_or_default(),
                    )
                    .into());
                }
                let title =
                    check_task_title(storage, &content.title, self.original_title.as_deref())?;
                persist(storage, self.task_id, content, title, due_date)
            });

        match result {
            Ok(()) => {
                self.error_message = None;
                self.dialog_active = false;
                true
            }
            Err(err) if err.is_validation() => {
                self.error_message = Some(match err {
                    StoreError::Invalid(ValidationError::ReminderWithoutDueDate(_)) => {
                        "A reminder needs a due date".to_string()
                    }
                    other => other.to_string(),
                });
                false
            }
            Err(err) => {
                error!(task_id = ?self.task_id, %err, "failed to save a task");
                self.error_message = Some(format!("Could not save the task: {err}"));
                false
            }
        }
    }

    // Handles the input of a char by inserting it into the currently active field
    pub fn input(&mut self, to_insert: char) {
        let (x, y) = self.cursor_position.unwrap_or((0, 0));
        match y {
            PRIORITY_ROW => {
                if let Some(content) = self.content.as_mut() {
                    match to_insert {
                        '0' | 'l' => content.priority = Priority::Low,
                        '1' | 'm' => content.priority = Priority::Medium,
                        '2' | 'h' => content.priority = Priority::High,
                        _ => {}
                    }
                }
            }
            REMINDER_ROW => {
                if let Some(content) = self.content.as_mut() {
                    match to_insert {
                        'y' => content.reminder = true,
                        'n' => content.reminder = false,
                        ' ' => content.reminder = !content.reminder,
                        _ => {}
                    }
                }
            }
            _ => {
                let x = x.min(self.chars_at_row(y));
                if let Some(field) = self.text_field_mut(y) {
                    let at = byte_index(field, x);
                    field.insert(at, to_insert);
                    self.cursor_position = Some((x, y));
                    self.move_cursor_right();
                }
            }
        }
    }
}

fn cycle_category(
    current: Option<CategoryId>,
    categories: &[Category],
    forward: bool,
) -> Option<CategoryId> {
    // Positions: None, then each category
    let count = categories.len() + 1;
    let position = match current {
        None => 0,
        Some(id) => categories
            .iter()
            .position(|c| c.id == id)
            .map_or(0, |i| i + 1),
    };
    let next = if forward {
        (position + 1) % count
    } else {
        (position + count - 1) % count
    };
    if next == 0 {
        None
    } else {
        Some(categories[next - 1].id)
    }
}

fn persist(
    storage: &Storage,
    task_id: Option<TaskId>,
    content: &TaskEditDialogContent,
    title: String,
    due_date: Option<DateTime<Utc>>,
) -> StoreResult<()> {
    match task_id {
        Some(id) => {
            let mut task = storage.require_task(id)?;
            task.title = title;
            task.notes = normalize_notes(&content.notes);
            task.due_date = due_date;
            task.priority = content.priority;
            task.category_id = content.category_id;
            storage.update_task(&task)?;

            if content.reminder && !task.reminder_enabled {
                storage.schedule_reminder(id)?;
            } else if !content.reminder && task.reminder_enabled {
                storage.cancel_reminder(id)?;
            }
        }
        None => {
            let task = storage.create_task(&NewTask {
                title,
                notes: normalize_notes(&content.notes),
                due_date,
                priority: content.priority,
                category_id: content.category_id,
            })?;
            if content.reminder {
                storage.schedule_reminder(task.id)?;
            }
        }
    }
    Ok(())
}

// Returns the UI content for the task edit dialog
pub fn get_task_edit_ui<'a>(app: &'a App<'a>) -> Vec<Line<'a>> {
    let palette = &app.palette;
    let dialog = &app.task_edit_dialog_state;
    let content = dialog.content.as_ref().unwrap_or_default();
    let mut text = Vec::new();

    struct TextDialogInputLine {
        prefix: &'static str,
        placeholder: &'static str,
        value: String,
    }

    let category = content
        .category_id
        .and_then(|id| app.items.category_name(id))
        .unwrap_or("none")
        .to_string();

    // Define the lines (input fields) of the dialog
    let lines = [
        TextDialogInputLine {
            prefix: "Title:       ",
            placeholder: "My task name",
            value: content.title.clone(),
        },
        TextDialogInputLine {
            prefix: "Notes:       ",
            placeholder: "Optional notes",
            value: content.notes.clone(),
        },
        TextDialogInputLine {
            prefix: "Due date:    ",
            placeholder: "23.11.2023 18:00",
            value: content.due_date.clone(),
        },
        TextDialogInputLine {
            prefix: "Priority:    ",
            placeholder: "",
            value: content.priority.label().to_string(),
        },
        TextDialogInputLine {
            prefix: "Category:    ",
            placeholder: "",
            value: category,
        },
        TextDialogInputLine {
            prefix: "Reminder:    ",
            placeholder: "",
            value: if content.reminder { "on" } else { "off" }.to_string(),
        },
    ];

    let cursor_position = dialog.cursor_position.unwrap_or((0, 0));

    for (i, line) in lines.into_iter().enumerate() {
        let mut spans = vec![Span::styled(line.prefix, palette.text())];
        let selected = cursor_position.1 == i;

        if i >= PRIORITY_ROW {
            // Selector rows show their current choice
            if selected {
                spans.push(Span::styled("< ", palette.muted()));
                spans.push(Span::styled(line.value, palette.cursor()));
                spans.push(Span::styled(" >", palette.muted()));
            } else {
                spans.push(Span::styled(line.value, palette.text()));
            }
        } else if line.value.is_empty() {
            // If the line is empty, a placeholder is displayed
            if selected {
                // Line is selected. First char is highlighted, the rest is gray
                spans.push(Span::styled(
                    line.placeholder.chars().take(1).collect::<String>(),
                    palette.cursor(),
                ));
                spans.push(Span::styled(
                    line.placeholder.chars().skip(1).collect::<String>(),
                    palette.muted(),
                ));
            } else {
                spans.push(Span::styled(line.placeholder, palette.muted()));
            }
        } else if selected {
            // All chars are plain, except for the one at the cursor position which is highlighted
            let x = cursor_position.0;
            spans.push(Span::styled(
                line.value.chars().take(x).collect::<String>(),
                palette.text(),
            ));
            spans.push(Span::styled(
                line.value.chars().skip(x).take(1).collect::<String>(),
                palette.cursor(),
            ));
            spans.push(Span::styled(
                line.value.chars().skip(x + 1).collect::<String>(),
                palette.text(),
            ));
            if x >= line.value.chars().count() {
                spans.push(Span::styled(" ", palette.cursor()));
            }
        } else {
            spans.push(Span::styled(line.value, palette.text()));
        }

        text.push(Line::from(spans));
    }

    text.push(Line::raw(""));

    // Display the error message if there is one
    if let Some(error_message) = &dialog.error_message {
        text.push(Line::from(Span::styled(
            error_message.as_str(),
            Style::new().fg(palette.error),
        )));
        text.push(Line::raw(""));
    }

    text.push(Line::styled(
        "Enter - save, Esc - cancel, Left/Right - change choice",
        palette.muted(),
    ));

    text
}
