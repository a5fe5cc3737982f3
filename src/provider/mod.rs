//! Provider abstraction for structured chat completions
//!
//! One non-streaming completion per conversational turn. Implementations never
//! surface transport or shape errors to the caller: every outcome is folded
//! into a [`ProviderReply`], and logging a failure is left to the caller.

mod openrouter;
mod types;

pub use openrouter::{parse_completion, response_format, OpenRouterProvider};
pub use types::{AssistantReply, ProviderFailure, ProviderReply, SENTINEL_REPLY};

use async_trait::async_trait;

use crate::chat::context_builder::ConversationContext;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Request one structured completion for `context`
    async fn complete(&self, context: &ConversationContext) -> ProviderReply;

    /// Model identifier sent with each request
    fn model(&self) -> &str;

    /// Get the provider name for logging
    fn name(&self) -> &'static str;
}
