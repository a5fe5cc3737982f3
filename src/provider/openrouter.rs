//! OpenRouter provider implementation (Chat Completions API)
//!
//! Sends the conversation context with a strict JSON-schema response format so
//! the model answers with `{ message, emotion: { valence, arousal } }`, then
//! parses that answer into a [`ProviderReply`].

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::types::{AssistantReply, ProviderFailure, ProviderReply};
use super::Provider;
use crate::chat::context_builder::ConversationContext;
use crate::config::AppConfig;
use crate::emotion::AffectVector;

/// Longest error body kept in a failure
const MAX_ERROR_BODY_CHARS: usize = 200;

/// OpenRouter (or any OpenAI-compatible) provider
pub struct OpenRouterProvider {
    client: HttpClient,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl OpenRouterProvider {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = HttpClient::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;
        Self::new(
            config.completions_url(),
            api_key,
            config.model.clone(),
            config.max_tokens,
            Duration::from_secs(config.provider_timeout),
        )
    }

    fn build_request<'a>(&'a self, context: &'a ConversationContext) -> ChatCompletionRequest<'a> {
        ChatCompletionRequest {
            model: &self.model,
            messages: context,
            response_format: response_format(),
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl Provider for OpenRouterProvider {
    async fn complete(&self, context: &ConversationContext) -> ProviderReply {
        let body = self.build_request(context);
        debug!(
            model = %self.model,
            turns = context.len(),
            "Sending chat completion request"
        );

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return ProviderReply::failed(ProviderFailure::Transport(e.to_string())),
        };

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => return ProviderReply::failed(ProviderFailure::Transport(e.to_string())),
        };

        debug!(status, bytes = text.len(), "Chat completion response received");
        parse_completion(status, &text)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &'static str {
        "openrouter"
    }
}

/// Response-shape constraint sent with every request
pub fn response_format() -> Value {
    json!({
        "type": "json_schema",
        "json_schema": {
            "name": "response",
            "strict": true,
            "schema": {
                "type": "object",
                "properties": {
                    "emotion": {
                        "type": "object",
                        "properties": {
                            "arousal": {
                                "type": "number",
                                "description": "How stimulating the response feels, from -1 (no arousal at all) to +1 (maximal arousal), inclusive."
                            },
                            "valence": {
                                "type": "number",
                                "description": "How positive the response feels, from -1 (extremely negative) to +1 (extremely positive), inclusive."
                            }
                        },
                        "required": ["valence", "arousal"],
                        "additionalProperties": false
                    },
                    "message": {
                        "type": "string",
                        "description": "The reply to the user, in plain text without markdown formatting."
                    }
                },
                "required": ["emotion", "message"],
                "additionalProperties": false
            }
        }
    })
}

/// Turn a raw HTTP status and body into a [`ProviderReply`].
///
/// Never coerces: anything that does not match the expected shape becomes a
/// failure carrying the reason.
pub fn parse_completion(status: u16, body: &str) -> ProviderReply {
    if !(200..300).contains(&status) {
        return ProviderReply::failed(ProviderFailure::Http {
            status,
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    let completion: ChatCompletionResponse = match serde_json::from_str(body) {
        Ok(c) => c,
        Err(_) => return ProviderReply::failed(ProviderFailure::Incomplete),
    };

    let Some(choice) = completion.choices.into_iter().next() else {
        return ProviderReply::failed(ProviderFailure::Incomplete);
    };

    let content = match choice.message.and_then(|m| m.content) {
        Some(content) if !content.is_empty() => content,
        _ => return ProviderReply::failed(ProviderFailure::Incomplete),
    };

    if choice.finish_reason.as_deref() == Some("error") {
        return ProviderReply::failed(ProviderFailure::FinishedWithError);
    }

    let raw: RawReply = match serde_json::from_str(&content) {
        Ok(raw) => raw,
        Err(e) => return ProviderReply::failed(ProviderFailure::InvalidJson(e.to_string())),
    };

    let emotion = raw.emotion.and_then(RawEmotion::usable);

    match raw.message {
        Some(message) => ProviderReply::Parsed(AssistantReply { message, emotion }),
        None => ProviderReply::Failed {
            failure: ProviderFailure::MissingMessage,
            emotion,
        },
    }
}

// ============================================================================
// Chat Completions wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    /// Serializes as the `[{role, content}, ...]` array
    messages: &'a ConversationContext,
    response_format: Value,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// The model's JSON answer, before validation
#[derive(Debug, Deserialize)]
struct RawReply {
    message: Option<String>,
    emotion: Option<RawEmotion>,
}

#[derive(Debug, Deserialize)]
struct RawEmotion {
    valence: Option<f64>,
    arousal: Option<f64>,
}

impl RawEmotion {
    fn usable(self) -> Option<AffectVector> {
        let vector = AffectVector::new(self.valence?, self.arousal?);
        vector.is_finite().then_some(vector)
    }
}
