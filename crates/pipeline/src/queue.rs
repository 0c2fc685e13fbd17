//! Work queue between the generation producer and the transfer workers.
//!
//! An unbounded FIFO hand-off channel: one producer, any number of
//! consumers sharing the receive side. Closure is signaled in-band with
//! one [`QueueItem::Shutdown`] sentinel per worker, so each worker sees
//! exactly one and drains nothing that belongs to its siblings.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use restyle_core::order::WorkOrder;

use crate::PipelineError;

/// One queue slot: a transfer order, or the closure sentinel telling a
/// single worker to terminate.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueItem {
    Job(WorkOrder),
    Shutdown,
}

/// Producer side of the work queue.
pub struct QueueSender {
    tx: mpsc::UnboundedSender<QueueItem>,
}

/// Consumer side of the work queue, shared by all workers.
///
/// Cloning is cheap; every clone pulls from the same FIFO, so each item
/// is delivered to exactly one consumer.
#[derive(Clone)]
pub struct QueueReceiver {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<QueueItem>>>,
}

/// Create an empty work queue.
pub fn work_queue() -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        QueueSender { tx },
        QueueReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

impl QueueSender {
    /// Enqueue one transfer order.
    ///
    /// Fails only when every consumer has gone away, which means a
    /// worker crashed and there is no point producing further.
    pub fn submit(&self, order: WorkOrder) -> Result<(), PipelineError> {
        self.tx
            .send(QueueItem::Job(order))
            .map_err(|_| PipelineError::QueueClosed)
    }

    /// Enqueue one closure sentinel per worker and consume the sender.
    pub fn shutdown(self, worker_count: usize) -> Result<(), PipelineError> {
        for _ in 0..worker_count {
            self.tx
                .send(QueueItem::Shutdown)
                .map_err(|_| PipelineError::QueueClosed)?;
        }
        Ok(())
    }
}

impl QueueReceiver {
    /// Wait for the next item.
    ///
    /// Returns `None` when the producer side was dropped without
    /// sentinels (the abort path); workers treat that like a shutdown.
    pub async fn recv(&self) -> Option<QueueItem> {
        // Holding the lock across the await is intentional: exactly one
        // idle consumer waits on the channel, the rest wait on the lock.
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::PathBuf;

    use super::*;

    fn order(style_index: u32, prompt_id: &str) -> WorkOrder {
        WorkOrder {
            style_index,
            prompt_id: prompt_id.to_string(),
            content_image: PathBuf::from(format!("/out/{style_index:02}/{prompt_id}.png")),
            style_folder: PathBuf::from("/data/styles"),
            output_dir: PathBuf::from(format!("/out/{style_index:02}")),
            result_filename: format!("{prompt_id}.png"),
        }
    }

    #[tokio::test]
    async fn single_consumer_sees_fifo_order() {
        let (tx, rx) = work_queue();
        for i in 0..4 {
            tx.submit(order(0, &i.to_string())).unwrap();
        }
        tx.shutdown(1).unwrap();

        let mut ids = Vec::new();
        while let Some(QueueItem::Job(o)) = rx.recv().await {
            ids.push(o.prompt_id);
        }
        assert_eq!(ids, ["0", "1", "2", "3"]);
    }

    #[tokio::test]
    async fn each_item_is_delivered_to_exactly_one_consumer() {
        const CONSUMERS: usize = 3;
        const ITEMS: u32 = 50;

        let (tx, rx) = work_queue();
        let mut handles = Vec::new();
        for _ in 0..CONSUMERS {
            let rx = rx.clone();
            handles.push(tokio::spawn(async move {
                let mut seen = Vec::new();
                let mut sentinels = 0usize;
                loop {
                    match rx.recv().await {
                        Some(QueueItem::Job(o)) => seen.push(o.prompt_id),
                        Some(QueueItem::Shutdown) => {
                            sentinels += 1;
                            break;
                        }
                        None => break,
                    }
                }
                (seen, sentinels)
            }));
        }

        for i in 0..ITEMS {
            tx.submit(order(0, &i.to_string())).unwrap();
        }
        tx.shutdown(CONSUMERS).unwrap();

        let mut all_ids: Vec<String> = Vec::new();
        for handle in handles {
            let (seen, sentinels) = handle.await.unwrap();
            // Exactly one sentinel per consumer.
            assert_eq!(sentinels, 1);
            all_ids.extend(seen);
        }

        // No loss, no duplication.
        assert_eq!(all_ids.len(), ITEMS as usize);
        let unique: HashSet<&String> = all_ids.iter().collect();
        assert_eq!(unique.len(), ITEMS as usize);
    }

    #[tokio::test]
    async fn dropped_sender_ends_the_queue() {
        let (tx, rx) = work_queue();
        tx.submit(order(0, "0")).unwrap();
        drop(tx);

        assert!(matches!(rx.recv().await, Some(QueueItem::Job(_))));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn submit_after_all_consumers_dropped_fails() {
        let (tx, rx) = work_queue();
        drop(rx);
        assert!(matches!(
            tx.submit(order(0, "0")),
            Err(PipelineError::QueueClosed)
        ));
    }
}
