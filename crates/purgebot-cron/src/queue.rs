//! The shared set of pending deletion jobs.

use std::collections::HashSet;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use purgebot_types::ChatTransport;

use crate::Job;

/// Pending jobs, shared between the message handler and the scheduler.
///
/// The lock is only held for set mutation; transport calls always happen
/// after it is released.
#[derive(Debug, Default)]
pub struct DeleteQueue {
    jobs: RwLock<HashSet<Job>>,
}

impl DeleteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a job. Returns `false` if an identical job was already queued.
    pub async fn add(&self, job: Job) -> bool {
        debug!(%job, "Queueing deletion job");
        self.jobs.write().await.insert(job)
    }

    /// Copy of the queue at call time; safe to iterate while removing from the live set.
    pub async fn snapshot(&self) -> Vec<Job> {
        self.jobs.read().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }

    pub async fn contains(&self, job: &Job) -> bool {
        self.jobs.read().await.contains(job)
    }

    /// Remove a job if present. Returns whether it was there.
    pub async fn remove(&self, job: &Job) -> bool {
        self.jobs.write().await.remove(job)
    }

    /// Remove `job`, then delete every message it targets.
    ///
    /// Each failed deletion is logged and skipped; the remaining ids are still
    /// attempted. If the job had already been removed by someone else nothing
    /// is deleted. Returns the number of delete requests issued.
    pub async fn execute_and_remove(&self, job: &Job, transport: &dyn ChatTransport) -> usize {
        if !self.remove(job).await {
            debug!(%job, "Job already gone, skipping");
            return 0;
        }

        let mut attempts = 0;
        for message_id in job.target_ids() {
            attempts += 1;
            if let Err(e) = transport.delete_message(job.chat_id(), message_id).await {
                warn!(
                    chat_id = job.chat_id(),
                    message_id,
                    "Failed to delete message: {e:#}"
                );
            }
        }
        attempts
    }

    /// Execute every job whose tag equals `tag_filter` (every job when `None`),
    /// then forget whatever is left without deleting its messages.
    ///
    /// The final wipe also drops jobs added after the snapshot was taken,
    /// including cleanup jobs queued by concurrent handlers.
    ///
    /// Returns the number of jobs executed.
    pub async fn clear(&self, tag_filter: Option<&str>, transport: &dyn ChatTransport) -> usize {
        let mut executed = 0;
        for job in self.snapshot().await {
            let selected = match tag_filter {
                Some(tag) => job.tag() == Some(tag),
                None => true,
            };
            if selected && self.execute_and_remove(&job, transport).await > 0 {
                executed += 1;
            }
        }

        let mut jobs = self.jobs.write().await;
        let dropped = jobs.len();
        jobs.clear();
        drop(jobs);

        debug!(executed, dropped, "Queue cleared");
        executed
    }
}
