//! One conversational turn, end to end
//!
//! ```text
//! ensure session ─► lock session ─► read history ─► build context
//!        ─► persist user turn ─► provider call ─► classify ─► persist reply
//! ```
//!
//! The session lock is held for the whole turn, so a second message on the
//! same session waits until the first reply is stored.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::context_builder::{build, ContextConfig};
use super::locks::SessionLocks;
use super::types::{Role, Turn};
use crate::emotion::{classify_reply, AffectVector, EmotionLabel};
use crate::provider::{Provider, ProviderReply};
use crate::store::{SessionStore, StoreResult};

/// Provider timing for one turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timings {
    /// When the provider request was issued
    pub sent: DateTime<Utc>,
    /// Provider latency in milliseconds
    pub thinking_duration: u64,
}

/// What the client gets back for a turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayReply {
    pub message: String,
    pub emotion: Option<AffectVector>,
    pub label: EmotionLabel,
    pub timings: Timings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnOutcome {
    pub session_id: String,
    pub reply: RelayReply,
}

/// Runs turns against a store and a provider
#[derive(Clone)]
pub struct ChatRelay {
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn Provider>,
    context: Arc<ContextConfig>,
    locks: Arc<SessionLocks>,
}

impl ChatRelay {
    pub fn new(
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn Provider>,
        context: ContextConfig,
    ) -> Self {
        Self {
            store,
            provider,
            context: Arc::new(context),
            locks: Arc::new(SessionLocks::new()),
        }
    }

    pub fn locks(&self) -> &Arc<SessionLocks> {
        &self.locks
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Run one turn. Without a session id a new session is created.
    ///
    /// Provider problems never surface here: they come back as the sentinel
    /// reply labelled `neutral`. Only storage failures are errors.
    pub async fn handle_turn(
        &self,
        session_id: Option<&str>,
        message: &str,
    ) -> StoreResult<TurnOutcome> {
        let session_id = match session_id {
            Some(id) => id.to_string(),
            None => self.store.create_session().await?.session_id,
        };

        let reply = self
            .locks
            .run_exclusive(&session_id, self.run_turn(&session_id, message))
            .await?;

        Ok(TurnOutcome { session_id, reply })
    }

    /// The turn itself; the caller holds the session lock
    async fn run_turn(&self, session_id: &str, message: &str) -> StoreResult<RelayReply> {
        // A delete may have run while this turn waited for the lock
        self.store.ensure_session(session_id).await?;

        let history: Vec<Turn> = self
            .store
            .get_session_messages(session_id)
            .await?
            .iter()
            .map(Turn::from)
            .collect();

        let context = build(&history, message, &self.context);
        debug!(
            session_id = %session_id,
            history = history.len(),
            replayed = context.replayed().len(),
            replayed_chars = context.replayed_chars(),
            "Built conversation context"
        );

        self.store
            .append_message(session_id, Role::User, message, None)
            .await?;

        let sent = Utc::now();
        let started = Instant::now();
        let reply = self.provider.complete(&context).await;
        let thinking_duration = started.elapsed().as_millis() as u64;

        if let ProviderReply::Failed { failure, .. } = &reply {
            warn!(
                session_id = %session_id,
                provider = self.provider.name(),
                "Replying with sentinel: {}",
                failure
            );
        }

        let emotion = reply.emotion();
        let label = classify_reply(emotion);

        self.store
            .append_message(session_id, Role::Assistant, reply.message(), Some(label))
            .await?;

        info!(
            session_id = %session_id,
            model = self.provider.model(),
            label = %label,
            thinking_ms = thinking_duration,
            "Turn complete"
        );

        Ok(RelayReply {
            message: reply.message().to_string(),
            emotion,
            label,
            timings: Timings {
                sent,
                thinking_duration,
            },
        })
    }
}
