//! Wire types for the chat API.

use serde::{Deserialize, Serialize};

use embedchat_core::types::ConversationTurn;

use crate::error::TransportError;

/// Body POSTed to the chat endpoint.
///
/// `conversation_history` is the whole history including the turn carrying
/// `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_history: Vec<ConversationTurn>,
}

/// Body returned by the chat endpoint.
///
/// Every field is optional on the wire; anything but `success: true` with a
/// non-empty `reply` counts as a failed exchange.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatReply {
    /// Extract the assistant text, or explain why there is none.
    pub fn into_reply(self) -> Result<String, TransportError> {
        match self.reply {
            Some(reply) if self.success && !reply.is_empty() => Ok(reply),
            _ => Err(TransportError::Rejected(
                self.error.unwrap_or_else(|| "Unknown error".to_string()),
            )),
        }
    }
}
