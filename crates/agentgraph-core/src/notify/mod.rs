//! The change-notification pipeline: database trigger → channel
//! notification → in-memory queue → claim.
//!
//! [`NotificationListener`] holds the dedicated `LISTEN` connection and
//! forwards task ids onto a [`WorkQueueProducer`]; [`ReconciliationSweeper`]
//! covers the gaps a listener reconnect leaves behind. Engine workers drain
//! the paired [`WorkQueueConsumer`].

mod listener;
mod queue;
mod sweeper;

pub use listener::NotificationListener;
pub use queue::{work_queue, WorkQueueConsumer, WorkQueueProducer};
pub use sweeper::ReconciliationSweeper;
