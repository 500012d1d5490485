use serde::{Deserialize, Serialize};

/// Chat identifier as used by the transport.
pub type ChatId = i64;

/// Message identifier, unique and monotonically increasing within a chat.
pub type MessageId = i64;

// ──────────────────── Channel Types ────────────────────

/// A plain-text chat message delivered to the command interpreter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Chat the message was posted in.
    pub chat_id: ChatId,
    /// Id of the message itself.
    pub message_id: MessageId,
    /// Raw message text.
    pub text: String,
    /// Id of the parent message when this one is a reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
}

/// A text reply the bot wants to post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundText {
    pub chat_id: ChatId,
    pub text: String,
    /// Post the text as a reply to this message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
}

// ──────────────────── Transport ────────────────────

/// Outbound side of a chat platform.
///
/// Implementations must be cheap to share behind an `Arc`; every method takes
/// `&self`.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a text message and return the id the platform assigned to it.
    async fn send_text(&self, message: OutboundText) -> anyhow::Result<MessageId>;

    /// Delete a single message.
    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> anyhow::Result<()>;
}
