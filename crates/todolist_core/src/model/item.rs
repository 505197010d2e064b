use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub title: String,
    pub description: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_on: Option<OffsetDateTime>,
}

/// An item that has not been stored yet and therefore has no id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub due_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_on: Option<OffsetDateTime>,
}

impl Item {
    pub fn with_id(item: NewItem, id: i64) -> Self {
        Self {
            id,
            title: item.title,
            description: item.description,
            due_date: item.due_date,
            created_on: item.created_on,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Title,
    CreatedOn,
    DueDate,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::CreatedOn => "created_on",
            Self::DueDate => "due_date",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(Self::Title),
            "created" | "created_on" | "created-on" => Ok(Self::CreatedOn),
            "due" | "due_date" | "due-date" => Ok(Self::DueDate),
            other => Err(AppError::invalid_input(format!(
                "unknown sort order '{other}' (expected title, created or due)"
            ))),
        }
    }
}
