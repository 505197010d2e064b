mod item;

pub use item::{Item, NewItem, SortOrder};
