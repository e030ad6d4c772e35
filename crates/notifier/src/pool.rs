//! Fixed worker pool consuming the bounded delivery queue.

use std::sync::Arc;

use store::{NotificationId, SourcingStore};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use crate::dispatcher::Dispatcher;
use crate::mailer::Mailer;

/// Sizing of the delivery queue and its worker set.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Number of delivery workers.
    pub worker_count: usize,
    /// Capacity of the bounded nudge queue. A full queue drops the nudge,
    /// never the work: rows are durable and batch passes pick them up.
    pub queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            worker_count: 4,
            queue_capacity: 256,
        }
    }
}

/// Owns the delivery workers behind a [`Dispatcher`].
///
/// [`start`](Self::start) wires a bounded queue between dispatcher handles
/// and a fixed set of workers; [`shutdown`](Self::shutdown) signals the
/// workers, lets them drain anything still queued, and joins them before
/// returning.
pub struct DispatcherPool {
    workers: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl DispatcherPool {
    /// Starts the pool, returning the dispatcher handle to hand out and
    /// the pool itself to shut down later.
    pub fn start<S, M>(store: S, mailer: M, config: PoolConfig) -> (Dispatcher<S, M>, Self)
    where
        S: SourcingStore + Clone + Send + 'static,
        M: Mailer + Clone + Send + 'static,
    {
        let (queue_tx, queue_rx) = mpsc::channel::<NotificationId>(config.queue_capacity);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let dispatcher = Dispatcher::with_queue(store, mailer, queue_tx);
        let receiver = Arc::new(Mutex::new(queue_rx));

        let mut workers = Vec::with_capacity(config.worker_count);
        for worker_id in 0..config.worker_count {
            let dispatcher = dispatcher.clone();
            let receiver = receiver.clone();
            let shutdown_rx = shutdown_rx.clone();
            workers.push(tokio::spawn(async move {
                worker_loop(worker_id, dispatcher, receiver, shutdown_rx).await;
            }));
        }

        tracing::info!(
            worker_count = config.worker_count,
            queue_capacity = config.queue_capacity,
            "notification dispatcher pool started"
        );

        (dispatcher, Self { workers, shutdown: shutdown_tx })
    }

    /// Signals shutdown, drains the queue, and joins every worker.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for (worker_id, worker) in self.workers.into_iter().enumerate() {
            if let Err(err) = worker.await {
                tracing::error!(worker_id, %err, "delivery worker panicked");
            }
        }
        tracing::info!("notification dispatcher pool shut down");
    }
}

async fn worker_loop<S, M>(
    worker_id: usize,
    dispatcher: Dispatcher<S, M>,
    receiver: Arc<Mutex<mpsc::Receiver<NotificationId>>>,
    mut shutdown: watch::Receiver<bool>,
) where
    S: SourcingStore,
    M: Mailer,
{
    tracing::debug!(worker_id, "delivery worker started");
    loop {
        // Take the receiver lock only long enough to pull one nudge; the
        // delivery attempt itself runs unlocked so workers overlap.
        let next = {
            let mut rx = receiver.lock().await;
            tokio::select! {
                id = rx.recv() => id,
                _ = shutdown.changed() => None,
            }
        };

        match next {
            Some(id) => {
                if let Err(err) = dispatcher.deliver(id).await {
                    tracing::error!(worker_id, notification_id = %id, %err, "delivery attempt errored");
                }
            }
            None => {
                // Shutting down: drain whatever is still queued, then exit.
                loop {
                    let drained = receiver.lock().await.try_recv();
                    match drained {
                        Ok(id) => {
                            if let Err(err) = dispatcher.deliver(id).await {
                                tracing::error!(worker_id, notification_id = %id, %err, "delivery attempt errored during drain");
                            }
                        }
                        Err(_) => break,
                    }
                }
                tracing::debug!(worker_id, "delivery worker stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::InMemoryMailer;
    use std::time::Duration;
    use store::{InMemoryStore, NotificationStatus, SourcingStore as _};

    async fn wait_until(mut check: impl FnMut() -> bool) -> bool {
        for _ in 0..100 {
            if check() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        false
    }

    #[tokio::test]
    async fn enqueued_email_is_delivered_by_a_worker() {
        let store = InMemoryStore::new();
        let mailer = InMemoryMailer::new();
        let (dispatcher, pool) =
            DispatcherPool::start(store.clone(), mailer.clone(), PoolConfig::default());

        let id = dispatcher
            .enqueue_email("v@example.com", "subject", "body")
            .await
            .unwrap();

        assert!(wait_until(|| mailer.sent_count() == 1).await);
        let item = store.get_notification(id).await.unwrap().unwrap();
        assert_eq!(item.status, NotificationStatus::Sent);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_drains_queued_items() {
        let store = InMemoryStore::new();
        let mailer = InMemoryMailer::new();
        let (dispatcher, pool) = DispatcherPool::start(
            store.clone(),
            mailer.clone(),
            PoolConfig {
                worker_count: 1,
                queue_capacity: 16,
            },
        );

        for i in 0..5 {
            dispatcher
                .enqueue_email(&format!("v{i}@example.com"), "subject", "body")
                .await
                .unwrap();
        }
        pool.shutdown().await;

        assert_eq!(mailer.sent_count(), 5);
    }

    #[tokio::test]
    async fn full_queue_leaves_rows_for_the_batch_pass() {
        let store = InMemoryStore::new();
        let mailer = InMemoryMailer::new();
        // No pool attached: nudges go nowhere, rows stay pending.
        let dispatcher = Dispatcher::new(store.clone(), mailer.clone());

        let id = dispatcher
            .enqueue_email("v@example.com", "subject", "body")
            .await
            .unwrap();
        let item = store.get_notification(id).await.unwrap().unwrap();
        assert_eq!(item.status, NotificationStatus::Pending);

        // The maintenance pass recovers it.
        let outcome = dispatcher.process_deliverable().await.unwrap();
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(mailer.sent_count(), 1);
    }
}
