//! Supportive chat replies conditioned on the detected emotion.
//!
//! The text itself comes from a [`TextGenerator`]. This module owns the
//! prompt, the way the emotion is attached to the user turn, and the
//! fallback used when the service answers without text.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ports::TextGenerator;

/// Instruction sent with every chat turn.
pub const SYSTEM_PROMPT: &str = "Always be calm, gentle, and reassuring.\n\n\
Use warm, supportive language with a soft, encouraging tone.\n\n\
Emotion Handling:\n\
Ignore Emotion: <emotion> in responses but adjust tone accordingly.\n\
Do not mention the detected emotion unless the user does.\n\n\
Response Behavior:\n\
Sad -> Offer comfort and reassurance.\n\
Anxious -> Use calming, grounding language.\n\
Angry -> Stay neutral, de-escalate tension.\n\
Happy -> Reflect warmth and encouragement.\n\n\
Guidelines:\n\
Validate feelings without confrontation.\n\
Use soft phrasing (\"That sounds tough, but you're doing your best.\").\n\
Guide gently instead of giving direct instructions.\n\n\
Example Responses:\n\
User: \"I don't know what to do.\" (Emotion: anxious)\n\
Bot: \"It is okay to feel uncertain. Take a breath, one step at a time.\"\n\n\
User: \"Nothing feels right.\" (Emotion: sad)\n\
Bot: \"I am here. You are not alone. What is on your mind?\"";

/// Reply used when the service returns no usable text.
pub const CHAT_FALLBACK: &str =
    "I'm here for you. Could you tell me a little more about how you're feeling?";

/// Errors from the text-generation service.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The client is missing required settings, such as the API key.
    #[error("chat is not configured: {0}")]
    Config(String),

    /// The request could not be sent or the response could not be read.
    #[error("chat request failed: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("chat service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// A chat turn from the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_input: String,
    /// Emotion to condition the reply on, usually the last detection.
    pub emotion: String,
}

/// The reply to a [`ChatRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    pub bot_response: String,
}

/// Formats the user turn with the emotion appended.
#[must_use]
pub fn compose_user_turn(user_input: &str, emotion: &str) -> String {
    format!("{} (Emotion: {})", user_input.trim(), emotion.trim())
}

/// Produces chat replies through a [`TextGenerator`].
#[derive(Debug, Clone)]
pub struct ChatResponder<G> {
    generator: G,
}

impl<G: TextGenerator> ChatResponder<G> {
    pub const fn new(generator: G) -> Self {
        Self { generator }
    }

    /// Answers one chat turn.
    ///
    /// An empty answer from the service becomes [`CHAT_FALLBACK`].
    ///
    /// # Errors
    ///
    /// Returns the generator's error if the service could not be reached
    /// or rejected the request.
    pub async fn respond(&self, request: &ChatRequest) -> Result<ChatReply, ChatError> {
        let turn = compose_user_turn(&request.user_input, &request.emotion);
        debug!("Sending chat turn ({} chars)", turn.len());

        let text = self.generator.generate(SYSTEM_PROMPT, &turn).await?;
        let bot_response = match text {
            Some(text) if !text.trim().is_empty() => text,
            _ => {
                warn!("Chat service returned no text, using fallback reply");
                CHAT_FALLBACK.to_string()
            }
        };
        Ok(ChatReply { bot_response })
    }

    pub const fn generator(&self) -> &G {
        &self.generator
    }
}
