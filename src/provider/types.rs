//! Reply types produced by a provider call

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::emotion::AffectVector;

/// Shown to the user whenever the provider reply is unusable
pub const SENTINEL_REPLY: &str = "(error while generating response)";

/// A well-formed structured reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub message: String,
    pub emotion: Option<AffectVector>,
}

/// Why a provider reply could not be used
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderFailure {
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("completion object not complete")]
    Incomplete,

    #[error("provider flagged the completion as an error")]
    FinishedWithError,

    #[error("reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("reply is missing the message field")]
    MissingMessage,
}

/// Outcome of one provider call, always usable by the caller
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderReply {
    Parsed(AssistantReply),
    Failed {
        failure: ProviderFailure,
        /// Affect vector salvaged from a partially valid reply
        emotion: Option<AffectVector>,
    },
}

impl ProviderReply {
    pub fn failed(failure: ProviderFailure) -> Self {
        ProviderReply::Failed {
            failure,
            emotion: None,
        }
    }

    /// Text to show and persist; the sentinel for failures
    pub fn message(&self) -> &str {
        match self {
            ProviderReply::Parsed(reply) => &reply.message,
            ProviderReply::Failed { .. } => SENTINEL_REPLY,
        }
    }

    /// Usable affect vector, if any
    pub fn emotion(&self) -> Option<AffectVector> {
        match self {
            ProviderReply::Parsed(reply) => reply.emotion,
            ProviderReply::Failed { emotion, .. } => *emotion,
        }
    }
}
