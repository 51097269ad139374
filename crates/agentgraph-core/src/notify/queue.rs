use tokio::sync::mpsc;
use uuid::Uuid;

/// FIFO delivery of task ids from the notification pipeline to engine
/// workers.
///
/// Backed by a `tokio::sync::mpsc` channel -- any durable or in-memory MPMC
/// queue satisfies the same contract; this one is in-process and is lost on
/// restart, which is why the reconciliation sweep (see [`super::sweeper`])
/// exists.
pub struct WorkQueueProducer {
    sender: mpsc::Sender<Uuid>,
}

impl WorkQueueProducer {
    /// Enqueues a task id. Returns `false` if the consumer has been dropped.
    pub async fn push(&self, task_id: Uuid) -> bool {
        self.sender.send(task_id).await.is_ok()
    }

    /// Non-blocking enqueue; used by the trigger-driven listener so a full
    /// queue never stalls notification delivery.
    pub fn try_push(&self, task_id: Uuid) -> bool {
        self.sender.try_send(task_id).is_ok()
    }
}

impl Clone for WorkQueueProducer {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

pub struct WorkQueueConsumer {
    receiver: mpsc::Receiver<Uuid>,
}

impl WorkQueueConsumer {
    /// Blocking pop; the engine worker's only point of suspension between
    /// dispatch cycles.
    pub async fn pop(&mut self) -> Option<Uuid> {
        self.receiver.recv().await
    }
}

/// Bounded channel of task ids shared between the notification pipeline and
/// one or more engine workers.
pub fn work_queue(capacity: usize) -> (WorkQueueProducer, WorkQueueConsumer) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (WorkQueueProducer { sender }, WorkQueueConsumer { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_then_pop_delivers_in_fifo_order() {
        let (producer, mut consumer) = work_queue(8);
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        assert!(producer.push(a).await);
        assert!(producer.push(b).await);
        assert_eq!(consumer.pop().await, Some(a));
        assert_eq!(consumer.pop().await, Some(b));
    }

    #[tokio::test]
    async fn pop_returns_none_once_every_producer_dropped() {
        let (producer, mut consumer) = work_queue(1);
        drop(producer);
        assert_eq!(consumer.pop().await, None);
    }

    #[tokio::test]
    async fn duplicate_pushes_are_each_delivered() {
        // Duplicate delivery is tolerated, not collapsed: the claim step,
        // not the queue, is what makes dispatch idempotent.
        let (producer, mut consumer) = work_queue(8);
        let id = Uuid::now_v7();
        producer.push(id).await;
        producer.push(id).await;
        assert_eq!(consumer.pop().await, Some(id));
        assert_eq!(consumer.pop().await, Some(id));
    }
}
