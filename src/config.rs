use anyhow::{bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const APP_NAME: &str = "todolist";
const CONFIG_DIR_ENV: &str = "TODOLIST_CONFIG_PATH";
const DATA_DIR_ENV: &str = "TODOLIST_DATA_PATH";

pub const CONFIG_KEYS: &[&str] = &[
    "database.path",
    "ui.theme",
    "ui.tick_rate_ms",
    "logging.level",
    "logging.file",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub theme: ThemeMode,
    pub tick_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            theme: ThemeMode::System,
            tick_rate_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Log file used while the terminal UI owns the screen
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

/// Colour scheme of the terminal UI. `System` keeps the terminal's own colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    System,
    Light,
    Dark,
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThemeMode::System => "system",
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        })
    }
}

impl FromStr for ThemeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Ok(ThemeMode::System),
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            other => bail!("Unknown theme: {} (expected system, light or dark)", other),
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("", "", APP_NAME).context("Could not determine the home directory")
}

pub fn get_config_dir() -> Result<PathBuf> {
    // TODOLIST_CONFIG_PATH overrides the default config directory
    if let Ok(path) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(project_dirs()?.config_dir().to_path_buf())
}

pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(DATA_DIR_ENV) {
        return Ok(PathBuf::from(path));
    }
    Ok(project_dirs()?.data_dir().to_path_buf())
}

pub fn get_config_file() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

pub fn get_db_path(config: &Config) -> Result<PathBuf> {
    if let Some(path) = &config.database.path {
        return Ok(path.clone());
    }
    Ok(get_data_dir()?.join("todolist.db"))
}

pub fn get_log_file(config: &Config) -> Result<PathBuf> {
    if let Some(path) = &config.logging.file {
        return Ok(path.clone());
    }
    Ok(get_data_dir()?.join("todolist.log"))
}

// A missing file means defaults
pub fn load_config_from(config_file: &Path) -> Result<Config> {
    if !config_file.exists() {
        return Ok(Config::default());
    }

    let contents = fs::read_to_string(config_file)
        .with_context(|| format!("Failed to read config file: {}", config_file.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", config_file.display()))
}

pub fn save_config_to(config: &Config, config_file: &Path) -> Result<()> {
    if let Some(config_dir) = config_file.parent() {
        if !config_dir.exists() {
            fs::create_dir_all(config_dir).with_context(|| {
                format!("Failed to create config directory: {}", config_dir.display())
            })?;
        }
    }

    let contents = toml::to_string_pretty(config)?;
    fs::write(config_file, contents)
        .with_context(|| format!("Failed to write config file: {}", config_file.display()))?;

    Ok(())
}

pub fn get_config_value(config: &Config, key: &str) -> Option<String> {
    match key {
        "database.path" => config.database.path.as_deref().map(display_path),
        "ui.theme" => Some(config.ui.theme.to_string()),
        "ui.tick_rate_ms" => Some(config.ui.tick_rate_ms.to_string()),
        "logging.level" => Some(config.logging.level.clone()),
        "logging.file" => config.logging.file.as_deref().map(display_path),
        _ => None,
    }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

pub fn set_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "database.path" => config.database.path = Some(PathBuf::from(value)),
        "ui.theme" => config.ui.theme = value.parse()?,
        "ui.tick_rate_ms" => {
            let tick_rate: u64 = value
                .parse()
                .with_context(|| format!("Invalid tick rate: {}", value))?;
            if tick_rate == 0 {
                bail!("Tick rate must be greater than zero");
            }
            config.ui.tick_rate_ms = tick_rate;
        }
        "logging.level" => config.logging.level = value.to_string(),
        "logging.file" => config.logging.file = Some(PathBuf::from(value)),
        _ => bail!("Unknown config key: {}", key),
    }
    Ok(())
}
