//! Telegram long-polling loop.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use purgebot_types::ChatMessage;

use crate::api::TelegramApi;
use crate::types::{GetUpdatesParams, TgMessage};

/// Convert a Telegram message into a [`ChatMessage`].
///
/// Only plain text that is not a `/command` is forwarded.
pub fn to_chat_message(msg: TgMessage) -> Option<ChatMessage> {
    if msg.is_bot_command() {
        return None;
    }
    let text = msg.text?;
    Some(ChatMessage {
        chat_id: msg.chat.id,
        message_id: msg.message_id,
        text,
        reply_to: msg.reply_to_message.map(|parent| parent.message_id),
    })
}

/// Run the long-polling loop, forwarding text messages to `sender`.
///
/// Exits when `cancel` is cancelled or the `sender` is closed.
pub async fn run_polling_loop(
    api: &TelegramApi,
    sender: mpsc::Sender<ChatMessage>,
    cancel: CancellationToken,
) {
    let mut offset: Option<i64> = None;
    let mut backoff = Duration::from_secs(1);
    let max_backoff = Duration::from_secs(30);

    info!("Telegram polling loop started");

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let params = GetUpdatesParams {
            offset,
            timeout: Some(30),
            allowed_updates: Some(vec!["message".into(), "channel_post".into()]),
        };

        let updates = tokio::select! {
            _ = cancel.cancelled() => break,
            result = api.get_updates(&params) => result,
        };

        match updates {
            Ok(updates) => {
                backoff = Duration::from_secs(1);

                for update in updates {
                    offset = Some(update.update_id + 1);
                    let update_id = update.update_id;

                    let Some(message) = update.into_message().and_then(to_chat_message) else {
                        continue;
                    };

                    debug!(
                        update_id,
                        chat_id = message.chat_id,
                        message_id = message.message_id,
                        "Forwarding Telegram message"
                    );

                    if sender.send(message).await.is_err() {
                        info!("Inbound channel closed, stopping polling");
                        return;
                    }
                }
            }
            Err(e) => {
                warn!(backoff_secs = backoff.as_secs(), "getUpdates error: {e:#}");

                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {},
                }

                backoff = (backoff * 2).min(max_backoff);
            }
        }
    }

    info!("Telegram polling loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(json: &str) -> TgMessage {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_to_chat_message_reply() {
        let msg = message(
            r#"{
                "message_id": 43,
                "date": 0,
                "chat": {"id": 7, "type": "group"},
                "text": "delete today 10:00",
                "reply_to_message": {"message_id": 42, "date": 0, "chat": {"id": 7, "type": "group"}}
            }"#,
        );
        assert_eq!(
            to_chat_message(msg),
            Some(ChatMessage {
                chat_id: 7,
                message_id: 43,
                text: "delete today 10:00".into(),
                reply_to: Some(42),
            })
        );
    }

    #[test]
    fn test_to_chat_message_skips_non_text() {
        let msg = message(r#"{"message_id": 1, "date": 0, "chat": {"id": 7, "type": "group"}}"#);
        assert_eq!(to_chat_message(msg), None);
    }

    #[test]
    fn test_to_chat_message_skips_commands() {
        let msg = message(
            r#"{
                "message_id": 1,
                "date": 0,
                "chat": {"id": 7, "type": "group"},
                "text": "/clear",
                "entities": [{"type": "bot_command", "offset": 0, "length": 6}]
            }"#,
        );
        assert_eq!(to_chat_message(msg), None);
    }

    #[tokio::test]
    async fn test_polling_loop_cancellation() {
        // The request would fail against a fake token, but the cancel should win.
        let api = TelegramApi::new("fake_token").unwrap();
        let (tx, _rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(2), run_polling_loop(&api, tx, cancel))
            .await
            .expect("polling loop should exit promptly on cancel");
    }
}
