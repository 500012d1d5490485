//! Polling daemon that fires due deletion jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use purgebot_types::ChatTransport;

use crate::clock::Clock;
use crate::queue::DeleteQueue;

/// How often the queue is scanned.
pub const CRON_PERIOD: Duration = Duration::from_secs(1);

/// Scans the queue once per period and executes every due job.
pub struct Scheduler {
    queue: Arc<DeleteQueue>,
    clock: Arc<dyn Clock>,
    transport: Arc<dyn ChatTransport>,
}

impl Scheduler {
    pub fn new(
        queue: Arc<DeleteQueue>,
        clock: Arc<dyn Clock>,
        transport: Arc<dyn ChatTransport>,
    ) -> Self {
        Self {
            queue,
            clock,
            transport,
        }
    }

    /// Run one scan. Returns the number of jobs fired.
    pub async fn tick(&self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;
        for job in self.queue.snapshot().await {
            if !job.is_due(now) {
                continue;
            }
            debug!(%job, "Job due");
            if self
                .queue
                .execute_and_remove(&job, self.transport.as_ref())
                .await
                > 0
            {
                fired += 1;
            }
        }
        fired
    }

    /// Scan forever until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(period_ms = CRON_PERIOD.as_millis() as u64, "Deletion scheduler started");
        loop {
            let fired = self.tick().await;
            if fired > 0 {
                info!(fired, "Executed deletion jobs");
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(CRON_PERIOD) => {},
            }
        }
        info!("Deletion scheduler stopped");
    }
}
