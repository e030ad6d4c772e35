//! Delivery dispatcher driving the work-item state machine.

use chrono::Utc;
use store::{Notification, NotificationId, SourcingStore};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::mailer::Mailer;

/// Tally of one batch reprocessing pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Items the pass attempted.
    pub processed: usize,
    /// Items delivered by this pass.
    pub succeeded: usize,
    /// Items whose attempt failed (now `retry` or `failed`).
    pub failed: usize,
}

/// Persists notification work items and attempts their delivery.
///
/// Cheap to clone; every handle shares the same store, transport, and
/// delivery queue. The dispatcher never blocks a caller on the transport:
/// `enqueue_email` returns once the row is durable, and the actual send
/// happens on a pool worker or in a batch pass.
pub struct Dispatcher<S, M> {
    store: S,
    mailer: M,
    queue: Option<mpsc::Sender<NotificationId>>,
}

impl<S: Clone, M: Clone> Clone for Dispatcher<S, M> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            mailer: self.mailer.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<S, M> Dispatcher<S, M>
where
    S: SourcingStore,
    M: Mailer,
{
    /// Creates a dispatcher without a delivery queue.
    ///
    /// Enqueued items stay durable and are picked up by the next
    /// [`process_deliverable`](Self::process_deliverable) pass. Production
    /// wiring goes through [`DispatcherPool::start`](crate::DispatcherPool),
    /// which attaches the queue.
    pub fn new(store: S, mailer: M) -> Self {
        Self {
            store,
            mailer,
            queue: None,
        }
    }

    pub(crate) fn with_queue(store: S, mailer: M, queue: mpsc::Sender<NotificationId>) -> Self {
        Self {
            store,
            mailer,
            queue: Some(queue),
        }
    }

    /// Persists a pending email work item and nudges the delivery queue.
    ///
    /// Returns as soon as the row is durable; delivery is out-of-band.
    #[tracing::instrument(skip(self, subject, body))]
    pub async fn enqueue_email(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<NotificationId> {
        let item = Notification::email(to, subject, body, Utc::now());
        let id = item.id;
        self.store.insert_notification(&item).await?;
        metrics::counter!("notifications_enqueued_total").increment(1);

        self.submit(id);
        Ok(id)
    }

    /// Nudges the delivery queue for an already-persisted work item.
    ///
    /// Used after a transactional outbox commit. A full or closed queue is
    /// not an error: the row is durable and the next batch pass will take
    /// it.
    pub fn submit(&self, id: NotificationId) {
        if let Some(queue) = &self.queue {
            if let Err(err) = queue.try_send(id) {
                tracing::debug!(notification_id = %id, %err, "delivery queue unavailable, leaving item for batch pass");
            }
        }
    }

    /// Attempts delivery of one work item by ID.
    ///
    /// Re-reads the row first so items already handled elsewhere (or in a
    /// terminal state) are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn deliver(&self, id: NotificationId) -> Result<()> {
        let Some(item) = self.store.get_notification(id).await? else {
            tracing::warn!(notification_id = %id, "work item vanished before delivery");
            return Ok(());
        };

        if !item.is_deliverable() {
            tracing::debug!(notification_id = %id, status = %item.status, "skipping non-deliverable item");
            return Ok(());
        }

        self.attempt(item).await?;
        Ok(())
    }

    /// Attempts delivery of every `pending` or `retry` work item.
    ///
    /// Each invocation is one immediate retry wave with no backoff between
    /// items; terminal items never reappear in the candidate set.
    #[tracing::instrument(skip(self))]
    pub async fn process_deliverable(&self) -> Result<BatchOutcome> {
        let items = self.store.deliverable_notifications().await?;

        let mut outcome = BatchOutcome::default();
        for item in items {
            outcome.processed += 1;
            if self.attempt(item).await? {
                outcome.succeeded += 1;
            } else {
                outcome.failed += 1;
            }
        }

        metrics::counter!("notification_batch_runs_total").increment(1);
        tracing::info!(
            processed = outcome.processed,
            succeeded = outcome.succeeded,
            failed = outcome.failed,
            "batch delivery pass finished"
        );
        Ok(outcome)
    }

    /// Runs one delivery attempt and writes the outcome back.
    ///
    /// Returns true when the item was delivered.
    async fn attempt(&self, mut item: Notification) -> Result<bool> {
        match self
            .mailer
            .send(&item.recipient, &item.subject, &item.body)
            .await
        {
            Ok(()) => {
                item.record_sent(Utc::now());
                self.store.update_notification(&item).await?;
                metrics::counter!("notifications_delivered_total").increment(1);
                tracing::info!(notification_id = %item.id, recipient = %item.recipient, "notification delivered");
                Ok(true)
            }
            Err(err) => {
                item.record_failure(err.to_string(), Utc::now());
                self.store.update_notification(&item).await?;
                metrics::counter!("notification_delivery_failures_total").increment(1);
                tracing::warn!(
                    notification_id = %item.id,
                    retry_count = item.retry_count,
                    status = %item.status,
                    %err,
                    "notification delivery attempt failed"
                );
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::InMemoryMailer;
    use store::{InMemoryStore, NotificationStatus, SourcingStore as _};

    fn dispatcher() -> (Dispatcher<InMemoryStore, InMemoryMailer>, InMemoryStore, InMemoryMailer)
    {
        let store = InMemoryStore::new();
        let mailer = InMemoryMailer::new();
        let dispatcher = Dispatcher::new(store.clone(), mailer.clone());
        (dispatcher, store, mailer)
    }

    #[tokio::test]
    async fn enqueue_persists_a_pending_row_without_sending() {
        let (dispatcher, store, mailer) = dispatcher();

        let id = dispatcher
            .enqueue_email("v@example.com", "New RFP Request: Chairs", "body")
            .await
            .unwrap();

        let item = store.get_notification(id).await.unwrap().unwrap();
        assert_eq!(item.status, NotificationStatus::Pending);
        assert_eq!(mailer.sent_count(), 0);
    }

    #[tokio::test]
    async fn deliver_marks_item_sent_on_success() {
        let (dispatcher, store, mailer) = dispatcher();
        let id = dispatcher
            .enqueue_email("v@example.com", "subject", "body")
            .await
            .unwrap();

        dispatcher.deliver(id).await.unwrap();

        let item = store.get_notification(id).await.unwrap().unwrap();
        assert_eq!(item.status, NotificationStatus::Sent);
        assert!(item.sent_at.is_some());
        assert_eq!(mailer.sent_count(), 1);
    }

    #[tokio::test]
    async fn failed_attempts_walk_retry_then_failed() {
        let (dispatcher, store, mailer) = dispatcher();
        mailer.set_fail_always(true);
        let id = dispatcher
            .enqueue_email("v@example.com", "subject", "body")
            .await
            .unwrap();

        dispatcher.deliver(id).await.unwrap();
        let item = store.get_notification(id).await.unwrap().unwrap();
        assert_eq!(item.status, NotificationStatus::Retry);
        assert_eq!(item.retry_count, 1);

        dispatcher.deliver(id).await.unwrap();
        dispatcher.deliver(id).await.unwrap();
        let item = store.get_notification(id).await.unwrap().unwrap();
        assert_eq!(item.status, NotificationStatus::Failed);
        assert_eq!(item.retry_count, 3);
        assert_eq!(item.last_error.as_deref(), Some("Mail transport error: SMTP unavailable"));
    }

    #[tokio::test]
    async fn terminal_items_are_never_attempted_again() {
        let (dispatcher, store, mailer) = dispatcher();
        mailer.set_fail_always(true);
        let id = dispatcher
            .enqueue_email("v@example.com", "subject", "body")
            .await
            .unwrap();

        // Three batch passes exhaust the attempts.
        for _ in 0..3 {
            let outcome = dispatcher.process_deliverable().await.unwrap();
            assert_eq!(outcome.processed, 1);
            assert_eq!(outcome.failed, 1);
        }
        let item = store.get_notification(id).await.unwrap().unwrap();
        assert_eq!(item.status, NotificationStatus::Failed);

        // A fourth pass finds nothing to do, even with the transport healthy.
        mailer.set_fail_always(false);
        let outcome = dispatcher.process_deliverable().await.unwrap();
        assert_eq!(outcome, BatchOutcome::default());
        assert_eq!(mailer.sent_count(), 0);

        let item = store.get_notification(id).await.unwrap().unwrap();
        assert_eq!(item.status, NotificationStatus::Failed);
        assert_eq!(item.retry_count, 3);
    }

    #[tokio::test]
    async fn batch_pass_recovers_retry_items_once_transport_heals() {
        let (dispatcher, store, mailer) = dispatcher();
        mailer.fail_next(1);
        let id = dispatcher
            .enqueue_email("v@example.com", "subject", "body")
            .await
            .unwrap();

        let first = dispatcher.process_deliverable().await.unwrap();
        assert_eq!(first.failed, 1);

        let second = dispatcher.process_deliverable().await.unwrap();
        assert_eq!(second.processed, 1);
        assert_eq!(second.succeeded, 1);

        let item = store.get_notification(id).await.unwrap().unwrap();
        assert_eq!(item.status, NotificationStatus::Sent);
        assert_eq!(item.retry_count, 1);
    }

    #[tokio::test]
    async fn batch_pass_tallies_mixed_outcomes() {
        let (dispatcher, _store, mailer) = dispatcher();
        dispatcher.enqueue_email("a@example.com", "s", "b").await.unwrap();
        dispatcher.enqueue_email("b@example.com", "s", "b").await.unwrap();
        mailer.fail_next(1);

        let outcome = dispatcher.process_deliverable().await.unwrap();
        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed, 1);
    }
}
