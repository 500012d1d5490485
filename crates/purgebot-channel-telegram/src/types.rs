//! Telegram Bot API types (minimal subset).

use serde::{Deserialize, Serialize};

/// Generic Telegram API response wrapper.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Bot identity returned by `getMe`.
#[derive(Debug, Deserialize)]
pub struct BotInfo {
    pub id: i64,
    pub is_bot: bool,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

/// A Telegram Update object.
#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TgMessage>,
    /// Posts in channels the bot administers.
    #[serde(default)]
    pub channel_post: Option<TgMessage>,
}

impl Update {
    /// The message carried by this update, whether from a group or a channel.
    pub fn into_message(self) -> Option<TgMessage> {
        self.message.or(self.channel_post)
    }
}

/// A Telegram message.
#[derive(Debug, Deserialize)]
pub struct TgMessage {
    pub message_id: i64,
    pub date: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub entities: Vec<MessageEntity>,
    #[serde(default)]
    pub reply_to_message: Option<Box<TgMessage>>,
}

impl TgMessage {
    /// Whether the text starts with a `/command` entity.
    pub fn is_bot_command(&self) -> bool {
        self.entities
            .iter()
            .any(|e| e.entity_type == "bot_command" && e.offset == 0)
    }
}

/// A message entity (bold, command, mention, etc.).
#[derive(Debug, Deserialize)]
pub struct MessageEntity {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub offset: i64,
    pub length: i64,
}

/// A Telegram chat.
#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type")]
    pub chat_type: String,
}

/// Parameters for `getUpdates`.
#[derive(Debug, Serialize)]
pub struct GetUpdatesParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_updates: Option<Vec<String>>,
}

/// Parameters for `sendMessage`.
#[derive(Debug, Serialize)]
pub struct SendMessageParams {
    pub chat_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to_message_id: Option<i64>,
}

/// Parameters for `deleteMessage`.
#[derive(Debug, Serialize)]
pub struct DeleteMessageParams {
    pub chat_id: i64,
    pub message_id: i64,
}
