use super::live_query::{ItemSubscription, ItemsSubscription};
use crate::config::app_dir;
use crate::error::AppError;
use crate::model::{Item, NewItem, SortOrder};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const SCHEMA_VERSION: i64 = 1;
const STORE_FILE_NAME: &str = "items.db";
pub const STORE_ENV_VAR: &str = "TODOLIST_DB_PATH";

const SELECT_COLUMNS: &str = "SELECT id, title, description, due_date, created_on FROM item";

/// Handle to the item table. Clones share one connection and one change feed.
#[derive(Debug, Clone)]
pub struct ItemStore {
    pool: Pool<Sqlite>,
    changes: Arc<watch::Sender<u64>>,
}

pub fn default_database_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(STORE_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    Ok(app_dir()?.join(STORE_FILE_NAME))
}

pub fn database_url_for_path(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy().replace('\\', "/"))
}

impl ItemStore {
    pub async fn open(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|err| AppError::storage_unavailable(format!("{database_url}: {err}")))?;
        if let Some(path) = sqlite_path(database_url) {
            ensure_parent_dir(&path)?;
        }
        Self::connect(options.create_if_missing(true)).await
    }

    pub async fn open_path(path: &Path) -> Result<Self, AppError> {
        ensure_parent_dir(path)?;
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect(options).await
    }

    pub async fn open_in_memory() -> Result<Self, AppError> {
        Self::open("sqlite::memory:").await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self, AppError> {
        // A single long-lived connection: in-memory databases live exactly as
        // long as their connection, and writes are serialized anyway.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|err| AppError::storage_unavailable(err.to_string()))?;

        prepare_schema(&pool).await?;

        let (changes, _) = watch::channel(0);
        Ok(Self {
            pool,
            changes: Arc::new(changes),
        })
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|err| AppError::storage_unavailable(format!("sqlite ping failed: {err}")))?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Change version of the table; bumped once per successful mutation.
    pub fn version(&self) -> u64 {
        *self.changes.borrow()
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    fn notify_changed(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    pub async fn insert(&self, item: &NewItem) -> Result<i64, AppError> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO item (title, description, due_date, created_on)
             VALUES (?, ?, ?, ?)
             RETURNING id",
        )
        .bind(item.title.as_str())
        .bind(item.description.as_str())
        .bind(item.due_date.map(to_millis))
        .bind(item.created_on.map(to_millis))
        .fetch_one(&self.pool)
        .await
        .map_err(|err| AppError::write_failed(format!("insert failed: {err}")))?;

        debug!(id, "inserted item");
        self.notify_changed();
        Ok(id)
    }

    /// Replaces title, description and due date. `created_on` is fixed at
    /// insert time and never rewritten.
    pub async fn update(&self, item: &Item) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE item SET title = ?, description = ?, due_date = ? WHERE id = ?",
        )
        .bind(item.title.as_str())
        .bind(item.description.as_str())
        .bind(item.due_date.map(to_millis))
        .bind(item.id)
        .execute(&self.pool)
        .await
        .map_err(|err| AppError::write_failed(format!("update failed: {err}")))?;

        if result.rows_affected() == 0 {
            return Err(AppError::RecordNotFound(item.id));
        }

        debug!(id = item.id, "updated item");
        self.notify_changed();
        Ok(())
    }

    pub async fn delete_item(&self, item: &Item) -> Result<(), AppError> {
        self.delete_by_id(item.id).await
    }

    /// Deleting an id that is not stored is not an error.
    pub async fn delete_by_id(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM item WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|err| AppError::write_failed(format!("delete failed: {err}")))?;

        if result.rows_affected() > 0 {
            debug!(id, "deleted item");
            self.notify_changed();
        }
        Ok(())
    }

    pub async fn fetch_all(&self, order: SortOrder) -> Result<Vec<Item>, AppError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY {}", order_clause(order));
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|err| AppError::storage_unavailable(format!("query failed: {err}")))?;
        rows.iter().map(item_from_row).collect()
    }

    pub async fn fetch_by_id(&self, id: i64) -> Result<Option<Item>, AppError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| AppError::storage_unavailable(format!("query failed: {err}")))?;
        row.as_ref().map(item_from_row).transpose()
    }

    pub fn query_all(&self, order: SortOrder) -> ItemsSubscription {
        ItemsSubscription::new(self.clone(), order, self.changes.subscribe())
    }

    pub fn query_by_id(&self, id: i64) -> ItemSubscription {
        ItemSubscription::new(self.clone(), id, self.changes.subscribe())
    }
}

// SQLite sorts NULL before any value in ascending order, so items without a
// due date come first. Ties fall back to insertion order.
fn order_clause(order: SortOrder) -> &'static str {
    match order {
        SortOrder::Title => "title ASC, id ASC",
        SortOrder::CreatedOn => "created_on ASC, id ASC",
        SortOrder::DueDate => "due_date ASC, id ASC",
    }
}

async fn prepare_schema(pool: &Pool<Sqlite>) -> Result<(), AppError> {
    let unavailable = |err: sqlx::Error| AppError::storage_unavailable(err.to_string());

    let found: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await
        .map_err(unavailable)?;

    if found != SCHEMA_VERSION {
        if found != 0 {
            warn!(
                found,
                expected = SCHEMA_VERSION,
                "item schema version mismatch, recreating table"
            );
        }
        sqlx::query("DROP TABLE IF EXISTS item")
            .execute(pool)
            .await
            .map_err(unavailable)?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS item (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            title       TEXT NOT NULL,
            description TEXT NOT NULL,
            due_date    INTEGER,
            created_on  INTEGER
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(unavailable)?;

    let set_version = format!("PRAGMA user_version = {SCHEMA_VERSION}");
    sqlx::query(&set_version)
        .execute(pool)
        .await
        .map_err(unavailable)?;

    info!(schema_version = SCHEMA_VERSION, "item store ready");
    Ok(())
}

fn item_from_row(row: &SqliteRow) -> Result<Item, AppError> {
    let column_error = |err: sqlx::Error| AppError::invalid_data(err.to_string());

    let due_date: Option<i64> = row.try_get("due_date").map_err(column_error)?;
    let created_on: Option<i64> = row.try_get("created_on").map_err(column_error)?;

    Ok(Item {
        id: row.try_get("id").map_err(column_error)?,
        title: row.try_get("title").map_err(column_error)?,
        description: row.try_get("description").map_err(column_error)?,
        due_date: due_date.map(from_millis).transpose()?,
        created_on: created_on.map(from_millis).transpose()?,
    })
}

fn to_millis(value: OffsetDateTime) -> i64 {
    (value.unix_timestamp_nanos() / 1_000_000) as i64
}

fn from_millis(millis: i64) -> Result<OffsetDateTime, AppError> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .map_err(|err| AppError::invalid_data(format!("stored timestamp out of range: {err}")))
}

fn ensure_parent_dir(path: &Path) -> Result<(), AppError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }

    std::fs::create_dir_all(parent).map_err(|err| {
        AppError::storage_unavailable(format!(
            "failed to create directory '{}': {err}",
            parent.display()
        ))
    })
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.contains(":memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(PathBuf::from(path))
}
