//! Telegram transport for purgebot.
//!
//! Uses the Telegram Bot API with long-polling (no webhook required). The bot
//! must be an administrator of the chat to delete other members' messages.

pub mod api;
pub mod polling;
pub mod types;

use std::sync::Arc;

use anyhow::{bail, Context};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use purgebot_types::{ChatId, ChatMessage, ChatTransport, MessageId, OutboundText};

use api::TelegramApi;
use types::{DeleteMessageParams, SendMessageParams};

/// Telegram bot: inbound long polling plus the outbound [`ChatTransport`].
pub struct TelegramChannel {
    api: Arc<TelegramApi>,
    state: Mutex<TelegramState>,
}

struct TelegramState {
    cancel: Option<CancellationToken>,
    poll_handle: Option<JoinHandle<()>>,
}

impl TelegramChannel {
    /// Create a new Telegram channel for the given bot token.
    pub fn new(bot_token: &str) -> anyhow::Result<Self> {
        Ok(Self {
            api: Arc::new(TelegramApi::new(bot_token)?),
            state: Mutex::new(TelegramState {
                cancel: None,
                poll_handle: None,
            }),
        })
    }

    /// Authenticate and start forwarding inbound messages to `sender`.
    ///
    /// Polling stops when `cancel` (or [`stop`](Self::stop)) fires.
    pub async fn start(
        &self,
        sender: mpsc::Sender<ChatMessage>,
        cancel: &CancellationToken,
    ) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        if state.poll_handle.is_some() {
            bail!("Telegram channel is already running");
        }

        // Verify bot token
        let bot = self
            .api
            .get_me()
            .await
            .context("Failed to authenticate Telegram bot")?;
        info!(
            bot_username = bot.username.as_deref().unwrap_or("unknown"),
            "Telegram bot authenticated"
        );

        let cancel_child = cancel.child_token();
        let api = self.api.clone();
        let poll_cancel = cancel_child.clone();
        let handle = tokio::spawn(async move {
            polling::run_polling_loop(&api, sender, poll_cancel).await;
        });

        state.cancel = Some(cancel_child);
        state.poll_handle = Some(handle);

        Ok(())
    }

    /// Stop polling and wait for the loop to exit.
    pub async fn stop(&self) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;

        if let Some(cancel) = state.cancel.take() {
            cancel.cancel();
        }

        if let Some(handle) = state.poll_handle.take() {
            let _ = handle.await;
            info!("Telegram channel stopped");
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl ChatTransport for TelegramChannel {
    async fn send_text(&self, message: OutboundText) -> anyhow::Result<MessageId> {
        let sent = self
            .api
            .send_message(&SendMessageParams {
                chat_id: message.chat_id,
                text: message.text,
                reply_to_message_id: message.reply_to,
            })
            .await?;
        Ok(sent.message_id)
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> anyhow::Result<()> {
        self.api
            .delete_message(&DeleteMessageParams {
                chat_id,
                message_id,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let channel = TelegramChannel::new("123:ABC").unwrap();
        channel.stop().await.unwrap();
        assert!(channel.state.lock().await.poll_handle.is_none());
    }
}
