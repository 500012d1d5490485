//! Executes chat commands against the shared bot state.

use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};

use purgebot_cron::{Job, SYSTEM_TAG};
use purgebot_types::{ChatMessage, ChatTransport, MessageId, OutboundText};

use crate::commands::{self, Command, DeleteRequest};
use crate::lock::{LockOutcome, UnlockOutcome};
use crate::AppState;

/// Grace period before the bot removes its own command chatter, in seconds.
pub const WAIT_BEFORE_DELETE_SYSTEM_MSG: i64 = 10;

/// What executing a command produced.
#[derive(Debug, PartialEq, Eq)]
enum Outcome {
    /// Not actionable; behave as if the message was never a command.
    Ignored,
    /// Handled without a reply.
    Silent,
    Reply(OutboundText),
}

/// Turns inbound chat messages into queue mutations and replies.
pub struct CommandInterpreter {
    state: Arc<AppState>,
    transport: Arc<dyn ChatTransport>,
}

impl CommandInterpreter {
    pub fn new(state: Arc<AppState>, transport: Arc<dyn ChatTransport>) -> Self {
        Self { state, transport }
    }

    /// Handle one inbound message. Returns `true` if it was a command.
    ///
    /// Never fails: transport errors are logged and swallowed.
    pub async fn handle(&self, message: &ChatMessage) -> bool {
        let Some(command) = commands::parse(&message.text) else {
            return false;
        };
        debug!(chat_id = message.chat_id, message_id = message.message_id, ?command, "Command received");

        // Bare lock/unlock gets no cleanup jobs.
        let cleanup = !matches!(command, Command::MissingPassword);

        let sent = match self.execute(command, message).await {
            Outcome::Ignored => return false,
            Outcome::Silent => None,
            Outcome::Reply(reply) => self.send(reply).await,
        };

        if cleanup {
            self.schedule_cleanup(message, sent).await;
        }
        true
    }

    async fn execute(&self, command: Command, message: &ChatMessage) -> Outcome {
        let chat_id = message.chat_id;
        let reply = |text: String| {
            Outcome::Reply(OutboundText {
                chat_id,
                text,
                reply_to: None,
            })
        };

        match command {
            Command::ListQueue => reply(self.render_queue().await),
            Command::MissingPassword => reply("Error: specify password".into()),
            Command::Lock(secret) => match self.state.lock.lock(&secret).await {
                LockOutcome::Locked => {
                    info!(chat_id, "Clear command locked");
                    reply(format!("Locked by password '{secret}'"))
                }
                LockOutcome::AlreadyLocked => reply("Error: unlock first".into()),
            },
            Command::Unlock(secret) => match self.state.lock.unlock(&secret).await {
                UnlockOutcome::Unlocked => reply("Unlocked".into()),
                UnlockOutcome::WrongPassword => reply("Wrong password".into()),
            },
            Command::Clear => {
                if self.state.lock.is_locked().await {
                    return reply("Error: unlock first".into());
                }
                let executed = self
                    .state
                    .queue
                    .clear(Some(SYSTEM_TAG), self.transport.as_ref())
                    .await;
                info!(chat_id, executed, "Deletion queue cleared");
                Outcome::Silent
            }
            Command::Delete(request) => self.schedule_delete(request, message).await,
        }
    }

    async fn schedule_delete(&self, request: DeleteRequest, message: &ChatMessage) -> Outcome {
        let Some(attached_id) = message.reply_to else {
            return Outcome::Ignored;
        };
        let Some(schedule) = request.resolve(self.state.clock.now()) else {
            return Outcome::Ignored;
        };
        let job = match Job::new(schedule, message.chat_id, attached_id, request.count) {
            Ok(job) => job,
            Err(e) => {
                debug!("Rejected delete request: {e}");
                return Outcome::Ignored;
            }
        };

        let text = match request.count {
            1 => format!("Deleting attached message at {schedule}"),
            n => format!(
                "Deleting attached message and {} previous at {schedule}",
                n - 1
            ),
        };
        info!(%job, "Deletion scheduled");
        self.state.queue.add(job).await;

        Outcome::Reply(OutboundText {
            chat_id: message.chat_id,
            text,
            reply_to: Some(attached_id),
        })
    }

    async fn render_queue(&self) -> String {
        let mut jobs = self.state.queue.snapshot().await;
        if jobs.is_empty() {
            return "Queue is empty".into();
        }
        jobs.sort_by_key(|job| (job.chat_id(), job.message_id(), job.count()));
        let lines: Vec<String> = jobs.iter().map(ToString::to_string).collect();
        format!("Queue:\n\n{}", lines.join("\n\n"))
    }

    async fn send(&self, reply: OutboundText) -> Option<MessageId> {
        let chat_id = reply.chat_id;
        match self.transport.send_text(reply).await {
            Ok(id) => Some(id),
            Err(e) => {
                warn!(chat_id, "Failed to send reply: {e:#}");
                None
            }
        }
    }

    /// Queue removal of the command message and of the bot's reply, if any.
    async fn schedule_cleanup(&self, message: &ChatMessage, sent: Option<MessageId>) {
        let at = self.state.clock.now() + Duration::seconds(WAIT_BEFORE_DELETE_SYSTEM_MSG);
        self.state
            .queue
            .add(Job::system(at, message.chat_id, message.message_id))
            .await;
        if let Some(sent_id) = sent {
            self.state
                .queue
                .add(Job::system(at, message.chat_id, sent_id))
                .await;
        }
    }
}
