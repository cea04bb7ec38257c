pub mod backend;
pub mod database;
pub mod error;
pub mod manager;
pub mod notes;
pub mod row_helpers;
pub mod schema;

pub use backend::{NoteBackend, SqliteBackend};
pub use database::Database;
pub use error::StoreError;
pub use manager::BackendManager;
