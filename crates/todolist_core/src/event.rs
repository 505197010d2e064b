use crate::model::{Item, SortOrder};
use time::OffsetDateTime;

/// Intents forwarded by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemEvent {
    SetTitle(String),
    SetDescription(String),
    SetDueDate(OffsetDateTime),
    ShowDialog,
    HideDialog,
    SaveItem,
    UpdateItem(Item),
    DeleteItem(Item),
    DeleteItemById(i64),
    SortItems(SortOrder),
}
