use super::sqlite_store::ItemStore;
use crate::error::AppError;
use crate::model::{Item, SortOrder};
use tokio::sync::watch;

/// One emission of a live query, tagged with the store change version it
/// was read at. The rows reflect at least every write up to `version`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot<T> {
    pub version: u64,
    pub value: T,
}

#[derive(Debug)]
struct ChangeCursor {
    changes: watch::Receiver<u64>,
    primed: bool,
    version: u64,
}

impl ChangeCursor {
    fn new(changes: watch::Receiver<u64>) -> Self {
        Self {
            changes,
            primed: false,
            version: 0,
        }
    }

    /// First call returns immediately, later calls wait for the next write.
    async fn advance(&mut self) -> Option<u64> {
        if self.primed {
            self.changes.changed().await.ok()?;
        }
        self.primed = true;
        self.version = *self.changes.borrow_and_update();
        Some(self.version)
    }
}

/// Full item list in one sort order, re-read after every write to the table.
/// Dropping the subscription cancels it.
#[derive(Debug)]
pub struct ItemsSubscription {
    store: ItemStore,
    order: SortOrder,
    cursor: ChangeCursor,
}

impl ItemsSubscription {
    pub(crate) fn new(store: ItemStore, order: SortOrder, changes: watch::Receiver<u64>) -> Self {
        Self {
            store,
            order,
            cursor: ChangeCursor::new(changes),
        }
    }

    /// Store version the latest emission was read at, including failed reads.
    pub fn version(&self) -> u64 {
        self.cursor.version
    }

    pub async fn next(&mut self) -> Option<Result<Snapshot<Vec<Item>>, AppError>> {
        let version = self.cursor.advance().await?;
        Some(
            self.store
                .fetch_all(self.order)
                .await
                .map(|value| Snapshot { version, value }),
        )
    }
}

/// A single row by id. Emits `None` while the row does not exist.
#[derive(Debug)]
pub struct ItemSubscription {
    store: ItemStore,
    id: i64,
    cursor: ChangeCursor,
}

impl ItemSubscription {
    pub(crate) fn new(store: ItemStore, id: i64, changes: watch::Receiver<u64>) -> Self {
        Self {
            store,
            id,
            cursor: ChangeCursor::new(changes),
        }
    }

    pub async fn next(&mut self) -> Option<Result<Snapshot<Option<Item>>, AppError>> {
        let version = self.cursor.advance().await?;
        Some(
            self.store
                .fetch_by_id(self.id)
                .await
                .map(|value| Snapshot { version, value }),
        )
    }
}
