pub mod config;
pub mod dates;
pub mod error;
pub mod event;
pub mod model;
pub mod reducer;
pub mod state;
pub mod storage;
pub mod view_model;
