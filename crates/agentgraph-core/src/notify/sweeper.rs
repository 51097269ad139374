use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::persistence::{StoreError, TaskStore};

use super::queue::WorkQueueProducer;

/// Re-enqueues every currently-`PENDING` task on a timer.
///
/// This is the at-least-once half of the change-notification contract: a
/// listener reconnect or a missed trigger can drop a notification on the
/// floor, but it can never leave a task stuck, because the sweep eventually
/// re-discovers it via `list_pending_tasks` regardless of whether a
/// notification ever arrived.
pub struct ReconciliationSweeper {
    store: Arc<dyn TaskStore>,
    producer: WorkQueueProducer,
    interval: Duration,
}

impl ReconciliationSweeper {
    pub fn new(store: Arc<dyn TaskStore>, producer: WorkQueueProducer, interval: Duration) -> Self {
        Self {
            store,
            producer,
            interval,
        }
    }

    /// Runs a single sweep immediately, then on every tick of `interval`,
    /// until the process is torn down. Intended to be spawned once at
    /// startup and again whenever the listener reconnects.
    #[instrument(skip(self))]
    pub async fn run(self) {
        loop {
            if let Err(err) = self.sweep_once().await {
                warn!(error = %err, "reconciliation sweep failed");
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    #[instrument(skip(self))]
    pub async fn sweep_once(&self) -> Result<usize, StoreError> {
        let pending = self.store.list_pending_tasks().await?;
        let count = pending.len();
        for task in pending {
            self.producer.push(task.id).await;
        }
        if count > 0 {
            info!(count, "reconciliation sweep re-enqueued pending tasks");
        } else {
            debug!("reconciliation sweep found nothing pending");
        }
        Ok(count)
    }
}
