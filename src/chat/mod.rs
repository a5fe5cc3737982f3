//! Chat module - bounded context assembly and the per-turn relay
//!
//! - `context_builder`: turns history into a provider-ready context
//! - `relay`: runs a full turn against the store and provider
//! - `locks`: per-session serialization

pub mod context_builder;
pub mod locks;
pub mod relay;
pub mod types;

// Re-export key types for external use
pub use context_builder::{build, ContextConfig, ConversationContext};
pub use locks::SessionLocks;
pub use relay::{ChatRelay, RelayReply, Timings, TurnOutcome};
pub use types::{Role, Turn};
