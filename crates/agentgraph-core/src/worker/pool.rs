//! [`WorkerPool`]: drives a [`GraphEngine`] concurrently off a work queue,
//! bounding in-flight dispatches with a semaphore and shedding load via
//! [`BackpressureState`] before a slot is even requested.

use std::sync::Arc;

use tokio::sync::{watch, Semaphore};
use tracing::{debug, info, warn};

use crate::engine::GraphEngine;
use crate::notify::WorkQueueConsumer;

use super::backpressure::{BackpressureConfig, BackpressureState};

/// Tunables for a [`WorkerPool`].
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Upper bound on concurrently in-flight dispatch cycles.
    pub max_concurrency: usize,
    pub backpressure: BackpressureConfig,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 20,
            backpressure: BackpressureConfig::default(),
        }
    }
}

impl WorkerPoolConfig {
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency,
            ..Self::default()
        }
    }

    pub fn with_backpressure(mut self, config: BackpressureConfig) -> Self {
        self.backpressure = config;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerPoolError {
    #[error("invalid worker pool configuration: {0}")]
    InvalidConfig(String),
}

/// Owns the work queue consumer and fans dispatch cycles out across
/// `max_concurrency` concurrent tasks, pausing intake under backpressure and
/// draining in-flight work on a graceful shutdown signal.
pub struct WorkerPool {
    engine: Arc<GraphEngine>,
    backpressure: Arc<BackpressureState>,
    semaphore: Arc<Semaphore>,
    max_concurrency: u32,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl WorkerPool {
    pub fn new(engine: GraphEngine, config: WorkerPoolConfig) -> Result<Self, WorkerPoolError> {
        config
            .backpressure
            .validate()
            .map_err(|e| WorkerPoolError::InvalidConfig(e.to_string()))?;
        if config.max_concurrency == 0 {
            return Err(WorkerPoolError::InvalidConfig(
                "max_concurrency must be at least 1".into(),
            ));
        }
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            engine: Arc::new(engine),
            backpressure: Arc::new(BackpressureState::new(config.backpressure, config.max_concurrency)),
            semaphore: Arc::new(Semaphore::new(config.max_concurrency)),
            max_concurrency: config.max_concurrency as u32,
            shutdown_tx,
            shutdown_rx,
        })
    }

    /// A handle callers can use to trigger shutdown from elsewhere (e.g. a
    /// signal handler) while `run` is in progress.
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    pub fn backpressure(&self) -> &BackpressureState {
        &self.backpressure
    }

    /// Drains `consumer`, spawning one dispatch cycle per popped task id.
    /// Intake pauses (without dropping the id -- it simply isn't popped yet)
    /// once [`BackpressureState::should_accept`] says no; the loop polls
    /// again once existing work completes.
    pub async fn run(&self, mut consumer: WorkQueueConsumer) {
        let mut shutdown = self.shutdown_rx.clone();
        loop {
            if !self.backpressure.should_accept() {
                debug!(reason = ?self.backpressure.backpressure_reason(), "backpressure active, pausing intake");
                tokio::select! {
                    biased;
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(std::time::Duration::from_millis(50)) => {}
                }
                continue;
            }

            let task_id = tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("shutdown signal received, draining in-flight work");
                        break;
                    }
                    continue;
                }
                popped = consumer.pop() => match popped {
                    Some(id) => id,
                    None => {
                        debug!("work queue closed, pool exiting");
                        break;
                    }
                },
            };

            let permit = match Arc::clone(&self.semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };
            let engine = Arc::clone(&self.engine);
            let backpressure = Arc::clone(&self.backpressure);
            backpressure.task_started();

            tokio::spawn(async move {
                if let Err(err) = engine.dispatch_one(task_id).await {
                    warn!(%task_id, error = %err, "dispatch cycle failed");
                }
                backpressure.task_completed();
                drop(permit);
            });
        }

        // Acquiring every permit only succeeds once all spawned dispatches
        // have returned theirs, which is exactly the drain condition.
        if let Ok(permit) = Arc::clone(&self.semaphore).acquire_many_owned(self.max_concurrency).await {
            drop(permit);
        }
    }

    /// Signals the run loop to stop accepting new work and exit once
    /// in-flight dispatches drain.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
