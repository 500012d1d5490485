//! purgebot-gateway: chat command handling for the deletion bot.
//!
//! Provides:
//! - The command grammar (`hey`, `lock`, `unlock`, `clear`, `delete ...`)
//! - The shared [`AppState`] (deletion queue, clock, clear lock)
//! - [`run_bot`], which drives the scheduler and the inbound message loop

pub mod commands;
pub mod interpreter;
pub mod lock;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use purgebot_cron::clock::Clock;
use purgebot_cron::queue::DeleteQueue;
use purgebot_cron::scheduler::Scheduler;
use purgebot_types::{ChatMessage, ChatTransport};

use interpreter::CommandInterpreter;
use lock::LockState;

/// State shared by the message handler and the scheduler.
pub struct AppState {
    pub queue: Arc<DeleteQueue>,
    pub clock: Arc<dyn Clock>,
    pub lock: LockState,
}

impl AppState {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            queue: Arc::new(DeleteQueue::new()),
            clock,
            lock: LockState::new(),
        }
    }
}

/// Run the bot until `cancel` fires or the inbound channel closes.
///
/// Spawns the deletion scheduler, then handles every inbound message on its
/// own task so slow replies never hold up the next message.
pub async fn run_bot(
    state: Arc<AppState>,
    transport: Arc<dyn ChatTransport>,
    mut inbound: mpsc::Receiver<ChatMessage>,
    cancel: CancellationToken,
) {
    let scheduler = Scheduler::new(state.queue.clone(), state.clock.clone(), transport.clone());
    let scheduler_cancel = cancel.child_token();
    let scheduler_handle = tokio::spawn(async move { scheduler.run(scheduler_cancel).await });

    let interpreter = Arc::new(CommandInterpreter::new(state, transport));

    info!("Bot message loop started");

    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = inbound.recv() => message,
        };
        let Some(message) = message else {
            info!("Inbound channel closed");
            break;
        };

        let interpreter = interpreter.clone();
        tokio::spawn(async move {
            if !interpreter.handle(&message).await {
                debug!(
                    chat_id = message.chat_id,
                    message_id = message.message_id,
                    "Ignoring non-command message"
                );
            }
        });
    }

    cancel.cancel();
    let _ = scheduler_handle.await;
    info!("Bot message loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use chrono::{FixedOffset, TimeZone};
    use purgebot_cron::clock::ManualClock;
    use purgebot_types::{ChatId, MessageId, OutboundText};

    #[derive(Default)]
    struct FakeTransport {
        sent: Mutex<Vec<OutboundText>>,
        deleted: Mutex<Vec<(ChatId, MessageId)>>,
    }

    #[async_trait::async_trait]
    impl ChatTransport for FakeTransport {
        async fn send_text(&self, message: OutboundText) -> anyhow::Result<MessageId> {
            let mut sent = self.sent.lock().unwrap();
            sent.push(message);
            Ok(1000 + sent.len() as MessageId)
        }

        async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> anyhow::Result<()> {
            self.deleted.lock().unwrap().push((chat_id, message_id));
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_command_chatter_is_cleaned_up() {
        let start = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 8, 0, 0)
            .unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let state = Arc::new(AppState::new(clock.clone()));
        let transport = Arc::new(FakeTransport::default());
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_bot(state.clone(), transport.clone(), rx, cancel.clone()));

        tx.send(ChatMessage {
            chat_id: 7,
            message_id: 43,
            text: "hey".into(),
            reply_to: None,
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(transport.sent.lock().unwrap().len(), 1);
        assert_eq!(state.queue.len().await, 2);

        clock.advance(chrono::Duration::seconds(11));
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(state.queue.is_empty().await);
        let mut deleted = transport.deleted.lock().unwrap().clone();
        deleted.sort();
        assert_eq!(deleted, vec![(7, 43), (7, 1001)]);

        drop(tx);
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("bot should stop when inbound closes")
            .unwrap();
    }

    #[tokio::test]
    async fn test_stops_on_cancel() {
        let clock = Arc::new(ManualClock::new(chrono::Utc::now().fixed_offset()));
        let state = Arc::new(AppState::new(clock));
        let (_tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(
            Duration::from_secs(2),
            run_bot(state, Arc::new(FakeTransport::default()), rx, cancel),
        )
        .await
        .expect("bot should exit promptly on cancel");
    }
}
