use crate::error::AppError;
use crate::model::SortOrder;
use crate::storage::{STORE_ENV_VAR, default_database_path};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const APP_DIR_NAME: &str = "todolist";
const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TODOLIST_CONFIG_PATH";
pub const DEFAULT_LOG_LEVEL: &str = "warn";

const RESET: &str = "\x1b[0m";

/// ANSI colors used when rendering; empty strings print plain text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    accent: &'static str,
    muted: &'static str,
}

impl Palette {
    fn paint(color: &str, text: &str) -> String {
        if color.is_empty() {
            text.to_string()
        } else {
            format!("{color}{text}{RESET}")
        }
    }

    pub fn accentize(&self, text: &str) -> String {
        Self::paint(self.accent, text)
    }

    pub fn mutedize(&self, text: &str) -> String {
        Self::paint(self.muted, text)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Theme {
    #[default]
    Plain,
    Noir,
    Solarized,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Noir => "noir",
            Self::Solarized => "solarized",
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Self::Plain => Palette {
                accent: "",
                muted: "",
            },
            Self::Noir => Palette {
                accent: "\x1b[38;5;208m",
                muted: "\x1b[38;5;250m",
            },
            Self::Solarized => Palette {
                accent: "\x1b[38;5;108m",
                muted: "\x1b[38;5;250m",
            },
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match name.as_str() {
            "" | "plain" | "default" | "light" | "vanilla" => Ok(Self::Plain),
            "noir" | "dark" | "dark_mode" | "darkmode" => Ok(Self::Noir),
            "solarized" => Ok(Self::Solarized),
            other => Err(AppError::invalid_input(format!(
                "unknown theme '{other}' (expected plain, noir or solarized)"
            ))),
        }
    }
}

impl TryFrom<String> for Theme {
    type Error = AppError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<Theme> for String {
    fn from(theme: Theme) -> Self {
        theme.as_str().to_string()
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub default_sort: Option<SortOrder>,
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub log_level: Option<String>,
}

impl Config {
    pub fn sort_order(&self) -> SortOrder {
        self.default_sort.unwrap_or_default()
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn palette(&self) -> Palette {
        self.theme.unwrap_or_default().palette()
    }

    /// A `--config-override` path wins over `$TODOLIST_DB_PATH`, which wins
    /// over the config file, which wins over the platform default.
    pub fn resolve_database_path(&self, overrides: &ConfigOverrides) -> Result<PathBuf, AppError> {
        let env_path = std::env::var(STORE_ENV_VAR).ok();
        self.pick_database_path(overrides, env_path.as_deref())
    }

    fn pick_database_path(
        &self,
        overrides: &ConfigOverrides,
        env_path: Option<&str>,
    ) -> Result<PathBuf, AppError> {
        if let Some(path) = overrides.database_path.as_ref() {
            return Ok(path.clone());
        }
        if let Some(path) = env_path.map(str::trim).filter(|path| !path.is_empty()) {
            return Ok(PathBuf::from(path));
        }
        match self.database_path.as_ref() {
            Some(path) => Ok(path.clone()),
            None => default_database_path(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<Theme>,
    pub default_sort: Option<SortOrder>,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Per-user directory holding the config file and the default database.
pub fn app_dir() -> Result<PathBuf, AppError> {
    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join(APP_DIR_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join(APP_DIR_NAME))
    }
}

pub fn config_path() -> Result<PathBuf, AppError> {
    match std::env::var(CONFIG_ENV_VAR) {
        Ok(path) if !path.trim().is_empty() => Ok(PathBuf::from(path)),
        _ => Ok(app_dir()?.join(CONFIG_FILE_NAME)),
    }
}

/// A missing file yields the defaults. An unreadable one yields the defaults
/// together with the error so the caller can warn about it.
pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path().and_then(|path| load_config_from_path(&path)) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(err) => return Err(AppError::io(format!("{}: {}", path.display(), err))),
    };

    serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid config in {}: {}", path.display(), err))
    })
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    Config {
        theme: overrides.theme.or(base.theme),
        default_sort: overrides.default_sort.or(base.default_sort),
        database_path: overrides
            .database_path
            .clone()
            .or_else(|| base.database_path.clone()),
        log_level: overrides
            .log_level
            .clone()
            .or_else(|| base.log_level.clone()),
    }
}
