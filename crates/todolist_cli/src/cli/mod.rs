use clap::{Parser, Subcommand};
use std::path::PathBuf;
use todolist_core::config::{ConfigOverrides, Theme};
use todolist_core::error::AppError;
use todolist_core::model::SortOrder;

#[derive(Parser, Debug)]
#[command(name = "todolist", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE). Keys: theme, sort,
    /// db, log_level. A db override wins over $TODOLIST_DB_PATH.
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new item
    ///
    /// Example: todolist add "Buy groceries" -d "Milk and eggs" --due "2025-12-24 18:00"
    Add {
        title: Option<String>,
        #[arg(short = 'd', long)]
        description: Option<String>,
        /// Due date: RFC3339, "YYYY-MM-DD HH:MM[:SS]" or "YYYY-MM-DD"
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
    },
    /// List items
    ///
    /// Example: todolist list --sort due
    List {
        /// title, created or due
        #[arg(long, value_name = "ORDER")]
        sort: Option<SortOrder>,
    },
    /// Change the sort order and list items
    ///
    /// Example: sort created
    Sort { order: SortOrder },
    /// Show details of an item
    ///
    /// Example: todolist show 1
    Show { id: i64 },
    /// Edit an item
    ///
    /// Example: todolist edit 1 --title "Buy new PC"
    /// Example: todolist edit 1 --clear-due
    Edit {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(short = 'd', long)]
        description: Option<String>,
        #[arg(long, value_name = "DATE", conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
    },
    /// Delete an item
    ///
    /// Example: todolist delete 1
    Delete { id: i64 },
    /// Start composing a new item
    New,
    /// Set the title of the item being composed
    SetTitle { title: String },
    /// Set the description of the item being composed
    SetDescription { description: String },
    /// Set the due date of the item being composed
    SetDue { datetime: String },
    /// Show the item being composed
    Draft,
    /// Save the item being composed
    Save,
    /// Discard the item being composed
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOverrideTarget {
    Theme,
    DefaultSort,
    DatabasePath,
    LogLevel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfigOverride {
    pub target: ConfigOverrideTarget,
    pub value: String,
}

/// Parse a raw `KEY=VALUE` override string into a structured target.
pub fn parse_config_override(raw: &str) -> Result<ParsedConfigOverride, String> {
    let trimmed = raw.trim();
    let (key_raw, value_raw) = trimmed
        .split_once('=')
        .ok_or_else(|| "override must be in KEY=VALUE format".to_string())?;

    let value = value_raw.trim().to_string();
    let field =
        canonicalize_flag_name(key_raw).ok_or_else(|| "override key cannot be empty".to_string())?;

    let target = match field.as_str() {
        "theme" => ConfigOverrideTarget::Theme,
        "sort" | "default_sort" => ConfigOverrideTarget::DefaultSort,
        "database_path" | "db" | "db_path" => ConfigOverrideTarget::DatabasePath,
        "log_level" | "log" => ConfigOverrideTarget::LogLevel,
        other => return Err(format!("unknown config field '{other}'")),
    };

    if value.is_empty() {
        return Err(format!("override for '{field}' needs a value"));
    }

    Ok(ParsedConfigOverride { target, value })
}

/// Folds every `--config-override` flag into one set of overrides; later
/// flags win.
pub fn collect_config_overrides(raw: &[String]) -> Result<ConfigOverrides, AppError> {
    let mut overrides = ConfigOverrides::default();

    for entry in raw {
        let parsed = parse_config_override(entry).map_err(AppError::invalid_input)?;
        match parsed.target {
            ConfigOverrideTarget::Theme => {
                overrides.theme = Some(parsed.value.parse::<Theme>()?)
            }
            ConfigOverrideTarget::DefaultSort => {
                overrides.default_sort = Some(parsed.value.parse::<SortOrder>()?)
            }
            ConfigOverrideTarget::DatabasePath => {
                overrides.database_path = Some(PathBuf::from(parsed.value))
            }
            ConfigOverrideTarget::LogLevel => overrides.log_level = Some(parsed.value),
        }
    }

    Ok(overrides)
}

fn canonicalize_flag_name(name: &str) -> Option<String> {
    let mut cleaned = String::new();
    let mut previous_underscore = false;

    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            cleaned.push(ch.to_ascii_lowercase());
            previous_underscore = false;
        } else if !previous_underscore && !cleaned.is_empty() {
            cleaned.push('_');
            previous_underscore = true;
        }
    }

    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
