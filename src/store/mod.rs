//! Session and message persistence

mod migration;
mod sqlite;
mod traits;
mod types;

pub use migration::run_migrations;
pub use sqlite::{create_memory_pool, create_pool, SqliteSessionStore};
pub use traits::SessionStore;
pub use types::{Session, SessionUpdate, StoreError, StoreResult, StoredMessage};
