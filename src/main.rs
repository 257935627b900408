use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::{io, path::PathBuf, time::Duration};
use tracing::{error, info};

use crate::app::storage::Storage;
use crate::cli::{Cli, Command};
use crate::config::Config;

mod app;
mod cli;
mod config;
mod logging;

pub fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_file = config::get_config_file()?;
    let config = config::load_config_from(&config_file)?;

    match cli.command {
        Some(Command::Config(action)) => {
            logging::init_stderr(&config.logging);
            cli::handle_config(action, &config_file, &mut io::stdout().lock())
        }
        Some(Command::Tasks(command)) => {
            logging::init_stderr(&config.logging);
            let storage = open_storage(cli.db, &config)?;
            cli::execute(command, &storage, &mut io::stdout().lock())
        }
        None | Some(Command::Tui) => run_tui(cli.db, &config),
    }
}

// A store that cannot be opened is fatal
fn open_storage(db: Option<PathBuf>, config: &Config) -> Result<Storage> {
    let path = match db {
        Some(path) => path,
        None => config::get_db_path(config)?,
    };
    Storage::open(&path)
        .with_context(|| format!("Failed to open the database: {}", path.display()))
}

// Start the interactive list.
// The terminal handling follows:
// https://github.com/ratatui-org/ratatui/blob/main/examples/list.rs
fn run_tui(db: Option<PathBuf>, config: &Config) -> Result<()> {
    logging::init_file(&config.logging, &config::get_log_file(config)?)?;
    let storage = open_storage(db, config)?;
    info!("starting the task list");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let tick_rate = Duration::from_millis(config.ui.tick_rate_ms.max(1));
    let app = app::ui::App::new(&storage, config.ui.theme);
    let res = app::ui::run_app(&mut terminal, app, tick_rate);

    // Restore previous terminal state after exit
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = &res {
        error!(%err, "the task list stopped");
    }
    res.context("The task list stopped unexpectedly")
}
