use derivative::Derivative;
use ratatui::style::{Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{ListItem, ListState};
use tracing::{error, warn};

use crate::app::models::{Category, CategoryId};
use crate::app::storage::Storage;
use crate::app::validation::check_category_name;

use super::ui::App;

// State object for the category dialog: list with task counts,
// inline name input for a new category, two-step delete
#[derive(Derivative)]
#[derivative(Default)]
pub struct CategoryDialogState {
    pub dialog_active: bool,
    pub state: ListState,
    entries: Vec<(Category, usize)>,
    name_input: Option<String>,
    pending_delete: Option<CategoryId>,
    message: Option<String>,
}

impl CategoryDialogState {
    pub fn open(&mut self, storage: &Storage) {
        self.dialog_active = true;
        self.name_input = None;
        self.pending_delete = None;
        self.message = None;
        self.refresh(storage);
        if self.state.selected().is_none() && !self.entries.is_empty() {
            self.state.select(Some(0));
        }
    }

    pub fn close(&mut self) {
        self.dialog_active = false;
        self.name_input = None;
        self.pending_delete = None;
    }

    fn refresh(&mut self, storage: &Storage) {
        match storage.category_task_counts() {
            Ok(entries) => self.entries = entries,
            Err(err) => warn!(%err, "could not load categories"),
        }
        match self.state.selected() {
            Some(_) if self.entries.is_empty() => self.state.select(None),
            Some(i) if i >= self.entries.len() => self.state.select(Some(self.entries.len() - 1)),
            _ => {}
        }
    }

    pub fn entries(&self) -> &[(Category, usize)] {
        &self.entries
    }

    pub fn selected(&self) -> Option<&Category> {
        self.state
            .selected()
            .and_then(|i| self.entries.get(i))
            .map(|(category, _)| category)
    }

    pub fn next(&mut self) {
        self.pending_delete = None;
        let i = match self.state.selected() {
            Some(i) if !self.entries.is_empty() && i < self.entries.len() - 1 => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        self.pending_delete = None;
        let i = match self.state.selected() {
            Some(0) | None => self.entries.len().saturating_sub(1),
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    pub fn is_typing(&self) -> bool {
        self.name_input.is_some()
    }

    pub fn start_new(&mut self) {
        self.pending_delete = None;
        self.message = None;
        self.name_input = Some(String::new());
    }

    pub fn cancel_input(&mut self) {
        self.name_input = None;
    }

    pub fn input(&mut self, to_insert: char) {
        if let Some(name) = self.name_input.as_mut() {
            name.push(to_insert);
        }
    }

    pub fn delete_char(&mut self) {
        if let Some(name) = self.name_input.as_mut() {
            name.pop();
        }
    }

    // Create the category being typed; rejected names keep the input open
    pub fn submit_new(&mut self, storage: &Storage) {
        let Some(name) = self.name_input.clone() else {
            return;
        };

        let created = check_category_name(storage, &name, None)
            .and_then(|name| storage.create_category(&name, None));
        match created {
            Ok(category) => {
                self.name_input = None;
                self.message = Some(format!("Created category {}", category.name));
                self.refresh(storage);
                let position = self.entries.iter().position(|(c, _)| c.id == category.id);
                self.state.select(position);
            }
            Err(err) if err.is_validation() => self.message = Some(err.to_string()),
            Err(err) => {
                error!(%err, "failed to create a category");
                self.message = Some("Could not create the category".to_string());
            }
        }
    }

    // A category that still owns tasks needs a second press
    pub fn delete_selected(&mut self, storage: &Storage) {
        let Some((category, task_count)) = self
            .state
            .selected()
            .and_then(|i| self.entries.get(i))
            .cloned()
        else {
            return;
        };

        if task_count > 0 && self.pending_delete != Some(category.id) {
            self.pending_delete = Some(category.id);
            self.message = Some(format!(
                "{} has {} task(s); they will become uncategorized. Press x again to delete.",
                category.name, task_count
            ));
            return;
        }

        self.pending_delete = None;
        match storage.delete_category(category.id) {
            Ok(_) => self.message = Some(format!("Deleted category {}", category.name)),
            Err(err) => {
                error!(category_id = category.id, %err, "failed to delete a category");
                self.message = Some("Could not delete the category".to_string());
            }
        }
        self.refresh(storage);
    }
}

// Items own their text so the list state can be borrowed mutably while drawing
pub fn get_category_items_ui(app: &App) -> Vec<ListItem<'static>> {
    let palette = &app.palette;
    app.category_dialog_state
        .entries()
        .iter()
        .map(|(category, count)| {
            let mut spans = vec![Span::from(category.name.clone())];
            spans.push(Span::from(format!("  ({count})")).fg(palette.muted));
            if let Some(color) = &category.color {
                spans.push(Span::from(format!("  {color}")).fg(palette.muted));
            }
            ListItem::new(Line::from(spans)).style(Style::default().fg(palette.text))
        })
        .collect()
}

pub fn get_category_footer_ui<'a>(app: &'a App<'a>) -> Vec<Line<'a>> {
    let palette = &app.palette;
    let dialog = &app.category_dialog_state;
    let mut text = Vec::new();

    if let Some(name) = &dialog.name_input {
        text.push(Line::from(vec![
            Span::styled("New category: ", palette.text()),
            Span::styled(name.as_str(), palette.text()),
            Span::styled(" ", palette.cursor()),
        ]));
    }

    if let Some(message) = &dialog.message {
        let color = if dialog.pending_delete.is_some() {
            palette.error
        } else {
            palette.notice
        };
        text.push(Line::from(Span::styled(message.as_str(), Style::new().fg(color))));
    }

    text.push(Line::styled(
        if dialog.is_typing() {
            "Enter - create, Esc - cancel"
        } else {
            "Enter - show tasks, n - new, x - delete, Esc - close"
        },
        palette.muted(),
    ));
    text
}
