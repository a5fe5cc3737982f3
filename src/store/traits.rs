// src/store/traits.rs

//! Storage seam for sessions and their messages.
//! Handlers and the relay only talk to this trait, never to SQL directly.

use async_trait::async_trait;

use super::types::{Session, SessionUpdate, StoreResult, StoredMessage};
use crate::chat::types::Role;
use crate::emotion::EmotionLabel;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session with a fresh random id
    async fn create_session(&self) -> StoreResult<Session>;

    /// Create the session if it does not exist yet.
    ///
    /// Idempotent, including under concurrent calls for the same new id.
    async fn ensure_session(&self, session_id: &str) -> StoreResult<()>;

    async fn get_session(&self, session_id: &str) -> StoreResult<Session>;

    /// All sessions, most recently updated first
    async fn list_sessions(&self) -> StoreResult<Vec<Session>>;

    async fn update_session(&self, session_id: &str, update: &SessionUpdate) -> StoreResult<Session>;

    /// Delete a session together with its messages
    async fn delete_session(&self, session_id: &str) -> StoreResult<()>;

    /// Append to an existing session. Fails with `NotFound` if the session is
    /// missing; callers decide whether to `ensure_session` first.
    async fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        emotion: Option<EmotionLabel>,
    ) -> StoreResult<StoredMessage>;

    /// Messages of a session in creation order. Unknown sessions yield an
    /// empty list.
    async fn get_session_messages(&self, session_id: &str) -> StoreResult<Vec<StoredMessage>>;

    /// Cheap liveness check
    async fn health_check(&self) -> StoreResult<()>;
}
