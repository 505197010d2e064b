use crate::error::AppError;
use crate::model::{Item, NewItem, SortOrder};
use time::OffsetDateTime;

/// Fields of the item being composed in the creation dialog.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub description: String,
    pub due_date: Option<OffsetDateTime>,
}

impl Draft {
    pub fn to_new_item(&self, created_on: OffsetDateTime) -> NewItem {
        NewItem {
            title: self.title.clone(),
            description: self.description.clone(),
            due_date: self.due_date,
            created_on: Some(created_on),
        }
    }
}

/// Where the most recent failed list read happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadFailure {
    pub generation: u64,
    pub version: u64,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ItemState {
    /// Latest list read from the store in `sort_order`.
    pub items: Vec<Item>,
    pub draft: Draft,
    pub is_adding_item: bool,
    pub sort_order: SortOrder,
    /// Generation of the newest list subscription.
    pub generation: u64,
    /// Generation that produced `items`.
    pub items_generation: u64,
    /// Store version `items` was read at.
    pub synced_version: u64,
    /// Store version after the last completed write.
    pub required_version: u64,
    pub pending_writes: usize,
    pub saving: bool,
    pub last_inserted_id: Option<i64>,
    pub failed_read: Option<ReadFailure>,
    pub error: Option<AppError>,
}

impl ItemState {
    pub fn with_sort_order(sort_order: SortOrder) -> Self {
        Self {
            sort_order,
            ..Self::default()
        }
    }

    /// No write in flight and `items` reflects the newest subscription and
    /// every completed write.
    pub fn is_settled(&self) -> bool {
        self.pending_writes == 0
            && self.generation > 0
            && self.items_generation == self.generation
            && self.synced_version >= self.required_version
    }

    pub fn fatal_error(&self) -> Option<&AppError> {
        self.error.as_ref().filter(|err| err.is_fatal())
    }

    /// The error of the newest list read, when that read failed after every
    /// completed write. The list cannot settle until a later read succeeds.
    pub fn read_error(&self) -> Option<&AppError> {
        let failure = self.failed_read?;
        let current = self.pending_writes == 0
            && failure.generation == self.generation
            && failure.version >= self.required_version;
        if current { self.error.as_ref() } else { None }
    }
}
