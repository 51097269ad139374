use serde::Deserialize;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use super::queue::WorkQueueProducer;

/// The JSON payload a `tasks` trigger publishes on `task_created` /
/// `task_updated`.
#[derive(Debug, Deserialize)]
struct NotifyPayload {
    task_id: Uuid,
}

/// Holds the dedicated autocommit `LISTEN` connection and forwards every
/// notification's `task_id` onto the work queue.
///
/// Never shares its connection with worker code -- `PgListener` owns a
/// single connection for its whole lifetime, separate from the pool used
/// for claims and updates.
pub struct NotificationListener {
    listener: PgListener,
    producer: WorkQueueProducer,
}

impl NotificationListener {
    pub async fn connect(
        pool: &PgPool,
        producer: WorkQueueProducer,
    ) -> Result<Self, sqlx::Error> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen_all(["task_created", "task_updated"]).await?;
        Ok(Self { listener, producer })
    }

    /// Runs until the connection is lost or the process is asked to stop.
    /// Callers typically spawn this as its own task and restart it (with a
    /// reconciliation sweep) on error.
    #[instrument(skip(self))]
    pub async fn run(mut self) -> Result<(), sqlx::Error> {
        info!("notification listener connected, awaiting task_created/task_updated");
        loop {
            let notification = self.listener.recv().await?;
            let channel = notification.channel().to_string();
            match serde_json::from_str::<NotifyPayload>(notification.payload()) {
                Ok(payload) => {
                    debug!(channel, task_id = %payload.task_id, "notification received");
                    if !self.producer.try_push(payload.task_id) {
                        warn!(
                            task_id = %payload.task_id,
                            "work queue full, dropping notification -- reconciliation sweep will recover it"
                        );
                    }
                }
                Err(err) => {
                    error!(channel, error = %err, payload = notification.payload(), "malformed notification payload");
                }
            }
        }
    }
}
