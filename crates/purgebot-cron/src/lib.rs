//! purgebot-cron: deferred message deletion.
//!
//! Holds the [`Job`] value type, the shared [`queue::DeleteQueue`] and the
//! polling [`scheduler::Scheduler`] that fires due jobs against a
//! [`ChatTransport`](purgebot_types::ChatTransport).

pub mod clock;
pub mod queue;
pub mod scheduler;

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use purgebot_types::{ChatId, MessageId};

/// Tag carried by the bot's own bookkeeping jobs.
pub const SYSTEM_TAG: &str = "system";

/// Rendering used for job instants in replies and queue listings.
pub const DATE_TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("job must target at least one message")]
    ZeroCount,
    #[error("cannot delete {count} messages ending at message {message_id}")]
    CountExceedsAnchor { count: u32, message_id: MessageId },
    #[error("window end {until} is not after its start {from}")]
    EmptyWindow {
        from: DateTime<FixedOffset>,
        until: DateTime<FixedOffset>,
    },
}

/// When a job becomes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobSchedule {
    /// No time constraint: due on the next tick.
    Immediate,
    /// Due at any point once `at` has passed.
    Deadline { at: DateTime<FixedOffset> },
    /// Due inside the half-open interval `[from, until)`.
    Window {
        from: DateTime<FixedOffset>,
        until: DateTime<FixedOffset>,
    },
}

impl JobSchedule {
    /// Build a window, rejecting empty or inverted intervals.
    pub fn window(
        from: DateTime<FixedOffset>,
        until: DateTime<FixedOffset>,
    ) -> Result<Self, JobError> {
        if until <= from {
            return Err(JobError::EmptyWindow { from, until });
        }
        Ok(Self::Window { from, until })
    }

    /// Whether a job with this schedule should fire at `now`.
    pub fn is_due(&self, now: DateTime<FixedOffset>) -> bool {
        match *self {
            Self::Immediate => true,
            Self::Deadline { at } => now >= at,
            Self::Window { from, until } => from <= now && now < until,
        }
    }
}

impl fmt::Display for JobSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Immediate => write!(f, "now"),
            Self::Deadline { at } => write!(f, "{}", at.format(DATE_TIME_FORMAT)),
            Self::Window { from, until } => write!(
                f,
                "[{} .. {}]",
                from.format(DATE_TIME_FORMAT),
                until.format(DATE_TIME_FORMAT)
            ),
        }
    }
}

/// A pending deletion of one message and, optionally, the messages right before it.
///
/// Jobs are plain values: equality and hashing cover every field, so the
/// queue collapses duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Job {
    schedule: JobSchedule,
    chat_id: ChatId,
    message_id: MessageId,
    count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tag: Option<String>,
}

impl Job {
    /// Create an untagged job deleting `count` messages ending at `message_id`.
    pub fn new(
        schedule: JobSchedule,
        chat_id: ChatId,
        message_id: MessageId,
        count: u32,
    ) -> Result<Self, JobError> {
        if count == 0 {
            return Err(JobError::ZeroCount);
        }
        // Message ids start at 1.
        if i64::from(count) > message_id {
            return Err(JobError::CountExceedsAnchor { count, message_id });
        }
        if let JobSchedule::Window { from, until } = schedule {
            JobSchedule::window(from, until)?;
        }
        Ok(Self {
            schedule,
            chat_id,
            message_id,
            count,
            tag: None,
        })
    }

    /// A self-cleanup job for one of the bot's own command or reply messages.
    pub fn system(at: DateTime<FixedOffset>, chat_id: ChatId, message_id: MessageId) -> Self {
        Self {
            schedule: JobSchedule::Deadline { at },
            chat_id,
            message_id,
            count: 1,
            tag: Some(SYSTEM_TAG.to_string()),
        }
    }

    /// Return a copy carrying `tag`.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn schedule(&self) -> JobSchedule {
        self.schedule
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn is_system(&self) -> bool {
        self.tag() == Some(SYSTEM_TAG)
    }

    pub fn is_due(&self, now: DateTime<FixedOffset>) -> bool {
        self.schedule.is_due(now)
    }

    /// Ids this job deletes, newest first.
    pub fn target_ids(&self) -> impl Iterator<Item = MessageId> + '_ {
        (0..i64::from(self.count)).map(move |shift| self.message_id - shift)
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chat {} message {}", self.chat_id, self.message_id)?;
        if self.count > 1 {
            write!(f, " (+{} previous)", self.count - 1)?;
        }
        write!(f, " at {}", self.schedule)?;
        if let Some(tag) = &self.tag {
            write!(f, " #{tag}")?;
        }
        Ok(())
    }
}
