use chrono::{DateTime, Utc};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::{prelude::*, widgets::*};
use std::{
    io,
    time::{Duration, Instant},
};
use tracing::warn;

use crate::app::category_list::*;
use crate::app::models::{format_due_date, CategoryFilter};
use crate::app::storage::Storage;
use crate::app::theme::Palette;
use crate::app::{task_edit::*, task_list::*};
use crate::config::ThemeMode;

// Fired reminders and other messages kept on screen
const MAX_NOTICES: usize = 5;

pub struct App<'a> {
    pub items: TaskList<'a>,
    pub task_edit_dialog_state: TaskEditDialogState,
    pub category_dialog_state: CategoryDialogState,
    pub storage: &'a Storage,
    pub palette: Palette,
    pub notices: Vec<String>,
}

impl<'a> App<'a> {
    pub fn new(storage: &'a Storage, theme: ThemeMode) -> App<'a> {
        App {
            items: TaskList::with_items_from_storage(storage),
            task_edit_dialog_state: TaskEditDialogState::default(),
            category_dialog_state: CategoryDialogState::default(),
            storage,
            palette: Palette::for_theme(theme),
            notices: Vec::new(),
        }
    }

    pub fn push_notice(&mut self, notice: String) {
        self.notices.push(notice);
        if self.notices.len() > MAX_NOTICES {
            let overflow = self.notices.len() - MAX_NOTICES;
            self.notices.drain(..overflow);
        }
    }

    // Deliver reminders that came due since the last tick
    pub fn fire_due_reminders(&mut self, now: DateTime<Utc>) {
        match self.storage.take_due_reminders(now) {
            Ok(fired) => {
                for notice in fired {
                    self.push_notice(format!(
                        "Reminder: {} (due {})",
                        notice.task_title,
                        format_due_date(&notice.reminder.fire_at)
                    ));
                }
            }
            Err(err) => warn!(%err, "could not check reminders"),
        }
    }

    // Returns false when the user asked to quit
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.category_dialog_state.dialog_active {
            self.handle_category_dialog_key(code);
            return true;
        }

        if self.task_edit_dialog_state.dialog_active {
            // Handle input for the task edit dialog
            let dialog = &mut self.task_edit_dialog_state;
            match code {
                KeyCode::Down => dialog.move_cursor_down(),
                KeyCode::Up => dialog.move_cursor_up(),
                KeyCode::Esc => dialog.cancel(),
                KeyCode::Enter => {
                    if dialog.save_task(self.storage) {
                        self.items.update_items();
                    }
                }
                KeyCode::Left if dialog.is_on_selector() => {
                    dialog.cycle_choice(false, &self.items.categories)
                }
                KeyCode::Right if dialog.is_on_selector() => {
                    dialog.cycle_choice(true, &self.items.categories)
                }
                KeyCode::Left => dialog.move_cursor_left(),
                KeyCode::Right => dialog.move_cursor_right(),
                KeyCode::Backspace => dialog.delete_char(),
                KeyCode::Char(to_insert) => dialog.input(to_insert),
                _ => {}
            }
            return true;
        }

        // Handle input for the task list navigation, sorting and state change
        match code {
            KeyCode::Char('q') => return false,
            KeyCode::Char('x') => self.items.delete_selected(),
            KeyCode::Left => self.items.unselect(),
            KeyCode::Down => self.items.next(),
            KeyCode::Up => self.items.previous(),
            KeyCode::Char('a') => {
                let category = match self.items.filter.category {
                    CategoryFilter::Only(id) => Some(id),
                    _ => None,
                };
                self.task_edit_dialog_state.create_a_new_task(category);
            }
            KeyCode::Char('e') => {
                if let Some(task) = self.items.get_selected() {
                    self.task_edit_dialog_state.edit_task(task);
                }
            }
            KeyCode::Char('d') => self.items.set_sort(SortedBy::ByDueDate),
            KeyCode::Char('f') => self.items.set_sort(SortedBy::ByName),
            KeyCode::Char('g') => self.items.set_sort(SortedBy::ByPriority),
            KeyCode::Char('s') => self.items.reset_sort(),
            KeyCode::Char('c') => self.items.cycle_completion_filter(),
            KeyCode::Char('k') => self.items.cycle_category_filter(),
            KeyCode::Char('r') => {
                if let Some(message) = self.items.toggle_reminder_selected() {
                    self.push_notice(message);
                }
            }
            KeyCode::Char('m') => self.category_dialog_state.open(self.storage),
            KeyCode::Enter => self.items.toggle_completed(),
            _ => {}
        }
        true
    }

    fn handle_category_dialog_key(&mut self, code: KeyCode) {
        let dialog = &mut self.category_dialog_state;
        if dialog.is_typing() {
            match code {
                KeyCode::Enter => dialog.submit_new(self.storage),
                KeyCode::Esc => dialog.cancel_input(),
                KeyCode::Backspace => dialog.delete_char(),
                KeyCode::Char(to_insert) => dialog.input(to_insert),
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Down => dialog.next(),
            KeyCode::Up => dialog.previous(),
            KeyCode::Char('n') => dialog.start_new(),
            KeyCode::Char('x') => dialog.delete_selected(self.storage),
            KeyCode::Enter => {
                if let Some(id) = dialog.selected().map(|category| category.id) {
                    dialog.close();
                    self.items.set_category_filter(CategoryFilter::Only(id));
                }
            }
            KeyCode::Esc | KeyCode::Char('q') => {
                dialog.close();
                // Categories may have been added, renamed or removed
                self.items.update_items();
            }
            _ => {}
        }
    }
}

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    app.fire_due_reminders(Utc::now());
    loop {
        terminal.draw(|f| draw_ui(f, &mut app))?;
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && !app.handle_key(key.code) {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.fire_due_reminders(Utc::now());
            last_tick = Instant::now();
        }
    }
}

// Draws the whole user interface
pub fn draw_ui(f: &mut Frame, app: &mut App) {
    // Create two chunks of screen in 60-40 ratio
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(f.size());

    // DRAW LEFT PART
    // Create a List from the shown tasks and highlight the currently selected one
    let task_list = List::new(get_list_items_ui(
        app.items.items.as_slice(),
        app.items.categories.as_slice(),
        &app.palette,
    ))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Tasks ({})", app.items.filter_label())),
    )
    .highlight_style(app.palette.highlight())
    .highlight_symbol(">> ");

    f.render_stateful_widget(task_list, chunks[0], &mut app.items.state);

    // DRAW RIGHT PART
    if app.category_dialog_state.dialog_active {
        let right_side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(6)])
            .split(chunks[1]);

        let categories = List::new(get_category_items_ui(app))
            .block(Block::new().title("Categories").borders(Borders::ALL))
            .highlight_style(app.palette.highlight())
            .highlight_symbol(">> ");
        f.render_stateful_widget(
            categories,
            right_side[0],
            &mut app.category_dialog_state.state,
        );

        let footer = Paragraph::new(get_category_footer_ui(app))
            .block(Block::new().borders(Borders::ALL))
            .wrap(Wrap { trim: true });
        f.render_widget(footer, right_side[1]);
    } else if app.task_edit_dialog_state.dialog_active {
        let create_or_edit_task = Paragraph::new(get_task_edit_ui(app))
            .block(Block::new().title("Add/Edit Task").borders(Borders::ALL))
            .style(app.palette.text())
            .wrap(Wrap { trim: false });

        f.render_widget(create_or_edit_task, chunks[1]);
    } else {
        // If not editing, display instructions, statistics and notices in vertically split layout
        let right_side = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(45),
                Constraint::Percentage(30),
                Constraint::Percentage(25),
            ])
            .split(chunks[1]);

        let instructions = Paragraph::new(get_instructions_ui())
            .block(Block::new().title("Commands").borders(Borders::ALL))
            .style(app.palette.text());

        let statistics = Paragraph::new(get_statistics_ui(app))
            .block(Block::new().title("Statistics").borders(Borders::ALL))
            .style(app.palette.text());

        let notices = Paragraph::new(
            app.notices
                .iter()
                .rev()
                .map(|notice| Line::styled(notice.as_str(), Style::new().fg(app.palette.notice)))
                .collect::<Vec<Line>>(),
        )
        .block(Block::new().title("Notifications").borders(Borders::ALL))
        .wrap(Wrap { trim: true });

        f.render_widget(instructions, right_side[0]);
        f.render_widget(statistics, right_side[1]);
        f.render_widget(notices, right_side[2]);
    }
}
