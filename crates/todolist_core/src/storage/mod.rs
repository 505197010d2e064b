mod live_query;
mod sqlite_store;

pub use live_query::{ItemSubscription, ItemsSubscription, Snapshot};
pub use sqlite_store::{
    ItemStore, SCHEMA_VERSION, STORE_ENV_VAR, database_url_for_path, default_database_path,
};
