use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::UserId;
use tokio::sync::RwLock;

use crate::{
    EligibilityLink, Notification, NotificationId, PasswordResetCode, Quote, Result, Rfp,
    RfpFilter, RfpId, RfpStatus, StoreError, store::SourcingStore,
};

#[derive(Debug, Default)]
struct Tables {
    rfps: Vec<Rfp>,
    links: Vec<EligibilityLink>,
    quotes: Vec<Quote>,
    notifications: Vec<Notification>,
    reset_codes: HashMap<String, PasswordResetCode>,
}

/// In-memory sourcing store implementation for testing.
///
/// All tables live behind one lock, so multi-table operations (RFP
/// creation, cascade deletes, the vendor listings) see and mutate a single
/// snapshot, matching the transactional behavior of the PostgreSQL
/// implementation.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of stored RFPs.
    pub async fn rfp_count(&self) -> usize {
        self.tables.read().await.rfps.len()
    }

    /// Returns the total number of notification work items.
    pub async fn notification_count(&self) -> usize {
        self.tables.read().await.notifications.len()
    }

    /// Clears every table.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        tables.rfps.clear();
        tables.links.clear();
        tables.quotes.clear();
        tables.notifications.clear();
        tables.reset_codes.clear();
    }
}

fn newest_first(rfps: &mut [Rfp]) {
    rfps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait]
impl SourcingStore for InMemoryStore {
    async fn create_rfp(
        &self,
        rfp: &Rfp,
        invited: &[UserId],
        outbox: &[Notification],
    ) -> Result<()> {
        let mut tables = self.tables.write().await;

        tables.rfps.push(rfp.clone());
        for vendor_id in invited {
            tables.links.push(EligibilityLink {
                rfp_id: rfp.id,
                vendor_id: *vendor_id,
                invited_at: rfp.created_at,
            });
        }
        tables.notifications.extend(outbox.iter().cloned());

        Ok(())
    }

    async fn get_rfp(&self, id: RfpId) -> Result<Option<Rfp>> {
        let tables = self.tables.read().await;
        Ok(tables.rfps.iter().find(|r| r.id == id).cloned())
    }

    async fn rfps_for_admin(&self, admin: UserId, filter: &RfpFilter) -> Result<Vec<Rfp>> {
        let tables = self.tables.read().await;
        let mut rfps: Vec<Rfp> = tables
            .rfps
            .iter()
            .filter(|r| r.created_by == admin)
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .filter(|r| filter.category.is_none_or(|c| r.category_id == c))
            .cloned()
            .collect();
        newest_first(&mut rfps);
        Ok(rfps)
    }

    async fn set_rfp_status(
        &self,
        id: RfpId,
        admin: UserId,
        status: RfpStatus,
        is_active: bool,
    ) -> Result<Option<Rfp>> {
        let mut tables = self.tables.write().await;
        let Some(rfp) = tables
            .rfps
            .iter_mut()
            .find(|r| r.id == id && r.created_by == admin)
        else {
            return Ok(None);
        };

        rfp.status = status;
        rfp.is_active = is_active;
        rfp.updated_at = Utc::now();
        Ok(Some(rfp.clone()))
    }

    async fn delete_rfp(&self, id: RfpId, admin: UserId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(index) = tables
            .rfps
            .iter()
            .position(|r| r.id == id && r.created_by == admin)
        else {
            return Ok(false);
        };

        tables.rfps.remove(index);
        tables.links.retain(|l| l.rfp_id != id);
        tables.quotes.retain(|q| q.rfp_id != id);
        Ok(true)
    }

    async fn links_for_rfp(&self, rfp_id: RfpId) -> Result<Vec<EligibilityLink>> {
        let tables = self.tables.read().await;
        Ok(tables
            .links
            .iter()
            .filter(|l| l.rfp_id == rfp_id)
            .cloned()
            .collect())
    }

    async fn is_invited(&self, rfp_id: RfpId, vendor: UserId) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .links
            .iter()
            .any(|l| l.rfp_id == rfp_id && l.vendor_id == vendor))
    }

    async fn open_rfps_for_vendor(&self, vendor: UserId, now: DateTime<Utc>) -> Result<Vec<Rfp>> {
        let tables = self.tables.read().await;
        let mut rfps: Vec<Rfp> = tables
            .rfps
            .iter()
            .filter(|r| r.is_open(now))
            .filter(|r| {
                tables
                    .links
                    .iter()
                    .any(|l| l.rfp_id == r.id && l.vendor_id == vendor)
            })
            .filter(|r| {
                !tables
                    .quotes
                    .iter()
                    .any(|q| q.rfp_id == r.id && q.vendor_id == vendor)
            })
            .cloned()
            .collect();
        newest_first(&mut rfps);
        Ok(rfps)
    }

    async fn invited_rfps_with_quotes(
        &self,
        vendor: UserId,
    ) -> Result<Vec<(Rfp, Option<Quote>)>> {
        let tables = self.tables.read().await;
        let mut rfps: Vec<Rfp> = tables
            .rfps
            .iter()
            .filter(|r| {
                tables
                    .links
                    .iter()
                    .any(|l| l.rfp_id == r.id && l.vendor_id == vendor)
            })
            .cloned()
            .collect();
        newest_first(&mut rfps);

        Ok(rfps
            .into_iter()
            .map(|rfp| {
                let quote = tables
                    .quotes
                    .iter()
                    .find(|q| q.rfp_id == rfp.id && q.vendor_id == vendor)
                    .cloned();
                (rfp, quote)
            })
            .collect())
    }

    async fn insert_quote(&self, quote: &Quote) -> Result<()> {
        let mut tables = self.tables.write().await;

        // Unique (rfp_id, vendor_id) constraint simulation
        if tables
            .quotes
            .iter()
            .any(|q| q.rfp_id == quote.rfp_id && q.vendor_id == quote.vendor_id)
        {
            return Err(StoreError::DuplicateQuote {
                rfp_id: quote.rfp_id,
                vendor_id: quote.vendor_id,
            });
        }

        tables.quotes.push(quote.clone());
        Ok(())
    }

    async fn quote_for_vendor(&self, rfp_id: RfpId, vendor: UserId) -> Result<Option<Quote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .quotes
            .iter()
            .find(|q| q.rfp_id == rfp_id && q.vendor_id == vendor)
            .cloned())
    }

    async fn quotes_for_rfp(&self, rfp_id: RfpId) -> Result<Vec<Quote>> {
        let tables = self.tables.read().await;
        Ok(tables
            .quotes
            .iter()
            .filter(|q| q.rfp_id == rfp_id)
            .cloned()
            .collect())
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.notifications.push(notification.clone());
        Ok(())
    }

    async fn get_notification(&self, id: NotificationId) -> Result<Option<Notification>> {
        let tables = self.tables.read().await;
        Ok(tables.notifications.iter().find(|n| n.id == id).cloned())
    }

    async fn update_notification(&self, notification: &Notification) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(stored) = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == notification.id)
        {
            *stored = notification.clone();
        }
        Ok(())
    }

    async fn deliverable_notifications(&self) -> Result<Vec<Notification>> {
        let tables = self.tables.read().await;
        Ok(tables
            .notifications
            .iter()
            .filter(|n| n.is_deliverable())
            .cloned()
            .collect())
    }

    async fn replace_reset_code(&self, code: &PasswordResetCode) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .reset_codes
            .insert(code.email.clone(), code.clone());
        Ok(())
    }

    async fn reset_code_for_email(&self, email: &str) -> Result<Option<PasswordResetCode>> {
        let tables = self.tables.read().await;
        Ok(tables.reset_codes.get(email).cloned())
    }

    async fn update_reset_attempts(&self, email: &str, attempts: u32) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(code) = tables.reset_codes.get_mut(email) {
            code.attempts = attempts;
        }
        Ok(())
    }

    async fn delete_reset_code(&self, email: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.reset_codes.remove(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common::{CategoryId, Money};

    fn rfp_for(admin: UserId, deadline: DateTime<Utc>) -> Rfp {
        let now = Utc::now();
        Rfp {
            id: RfpId::new(),
            title: "Steel brackets".to_string(),
            description: "Galvanized, batch of 500".to_string(),
            quantity: 500,
            deadline,
            budget_min: Money::from_dollars(1_000),
            budget_max: Money::from_dollars(4_000),
            status: RfpStatus::Open,
            is_active: true,
            category_id: CategoryId::new(),
            created_by: admin,
            created_at: now,
            updated_at: now,
        }
    }

    fn quote_for(rfp: &Rfp, vendor: UserId) -> Quote {
        Quote {
            id: crate::QuoteId::new(),
            rfp_id: rfp.id,
            vendor_id: vendor,
            unit_price: Money::from_cents(450),
            description: "Per unit, delivered".to_string(),
            quantity: rfp.quantity,
            total_cost: Money::from_cents(450).multiply(rfp.quantity),
            status: crate::QuoteStatus::Pending,
            submitted_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn create_rfp_persists_links_and_outbox_together() {
        let store = InMemoryStore::new();
        let admin = UserId::new();
        let vendors = [UserId::new(), UserId::new()];
        let rfp = rfp_for(admin, Utc::now() + Duration::days(3));
        let outbox = vec![Notification::email(
            "a@example.com",
            "New RFP Request: Steel brackets",
            "body",
            Utc::now(),
        )];

        store.create_rfp(&rfp, &vendors, &outbox).await.unwrap();

        assert_eq!(store.rfp_count().await, 1);
        assert_eq!(store.links_for_rfp(rfp.id).await.unwrap().len(), 2);
        assert!(store.is_invited(rfp.id, vendors[0]).await.unwrap());
        assert!(
            !store
                .is_invited(rfp.id, UserId::new())
                .await
                .unwrap()
        );
        assert_eq!(store.notification_count().await, 1);
    }

    #[tokio::test]
    async fn duplicate_quote_is_rejected_by_constraint() {
        let store = InMemoryStore::new();
        let admin = UserId::new();
        let vendor = UserId::new();
        let rfp = rfp_for(admin, Utc::now() + Duration::days(3));
        store.create_rfp(&rfp, &[vendor], &[]).await.unwrap();

        store.insert_quote(&quote_for(&rfp, vendor)).await.unwrap();
        let err = store
            .insert_quote(&quote_for(&rfp, vendor))
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::DuplicateQuote { rfp_id, vendor_id }
            if rfp_id == rfp.id && vendor_id == vendor));
    }

    #[tokio::test]
    async fn open_rfps_for_vendor_excludes_quoted_closed_and_expired() {
        let store = InMemoryStore::new();
        let admin = UserId::new();
        let vendor = UserId::new();
        let now = Utc::now();

        let open = rfp_for(admin, now + Duration::days(3));
        let expired = rfp_for(admin, now - Duration::hours(1));
        let mut closed = rfp_for(admin, now + Duration::days(3));
        closed.status = RfpStatus::Closed;
        closed.is_active = false;
        let quoted = rfp_for(admin, now + Duration::days(3));
        let uninvited = rfp_for(admin, now + Duration::days(3));

        for rfp in [&open, &expired, &closed, &quoted] {
            store.create_rfp(rfp, &[vendor], &[]).await.unwrap();
        }
        store.create_rfp(&uninvited, &[], &[]).await.unwrap();
        store.insert_quote(&quote_for(&quoted, vendor)).await.unwrap();

        let available = store.open_rfps_for_vendor(vendor, now).await.unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, open.id);
    }

    #[tokio::test]
    async fn invited_rfps_with_quotes_pairs_own_quote() {
        let store = InMemoryStore::new();
        let admin = UserId::new();
        let vendor = UserId::new();
        let other = UserId::new();

        let quoted = rfp_for(admin, Utc::now() + Duration::days(1));
        let unquoted = rfp_for(admin, Utc::now() + Duration::days(1));
        store
            .create_rfp(&quoted, &[vendor, other], &[])
            .await
            .unwrap();
        store.create_rfp(&unquoted, &[vendor], &[]).await.unwrap();
        store.insert_quote(&quote_for(&quoted, vendor)).await.unwrap();
        // Another vendor's quote must not leak into this vendor's listing.
        store.insert_quote(&quote_for(&unquoted, other)).await.unwrap();

        let listed = store.invited_rfps_with_quotes(vendor).await.unwrap();
        assert_eq!(listed.len(), 2);
        let quoted_entry = listed.iter().find(|(r, _)| r.id == quoted.id).unwrap();
        assert!(quoted_entry.1.is_some());
        let unquoted_entry = listed.iter().find(|(r, _)| r.id == unquoted.id).unwrap();
        assert!(unquoted_entry.1.is_none());
    }

    #[tokio::test]
    async fn delete_rfp_cascades_and_checks_ownership() {
        let store = InMemoryStore::new();
        let admin = UserId::new();
        let vendor = UserId::new();
        let rfp = rfp_for(admin, Utc::now() + Duration::days(1));
        store.create_rfp(&rfp, &[vendor], &[]).await.unwrap();
        store.insert_quote(&quote_for(&rfp, vendor)).await.unwrap();

        // Foreign admin can't delete
        assert!(!store.delete_rfp(rfp.id, UserId::new()).await.unwrap());
        assert_eq!(store.rfp_count().await, 1);

        assert!(store.delete_rfp(rfp.id, admin).await.unwrap());
        assert_eq!(store.rfp_count().await, 0);
        assert!(store.links_for_rfp(rfp.id).await.unwrap().is_empty());
        assert!(store.quotes_for_rfp(rfp.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deliverable_notifications_skip_terminal_items() {
        let store = InMemoryStore::new();
        let now = Utc::now();

        let pending = Notification::email("a@example.com", "s", "b", now);
        let mut retried = Notification::email("b@example.com", "s", "b", now);
        retried.record_failure("timeout", now);
        let mut sent = Notification::email("c@example.com", "s", "b", now);
        sent.record_sent(now);
        let mut failed = Notification::email("d@example.com", "s", "b", now);
        for _ in 0..3 {
            failed.record_failure("bounced", now);
        }

        for n in [&pending, &retried, &sent, &failed] {
            store.insert_notification(n).await.unwrap();
        }

        let deliverable = store.deliverable_notifications().await.unwrap();
        let ids: Vec<NotificationId> = deliverable.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![pending.id, retried.id]);
    }

    #[tokio::test]
    async fn replace_reset_code_keeps_one_per_email() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let first = PasswordResetCode {
            email: "user@example.com".to_string(),
            code: "111111".to_string(),
            attempts: 2,
            expires_at: now + Duration::minutes(15),
            created_at: now,
        };
        let second = PasswordResetCode {
            code: "222222".to_string(),
            attempts: 0,
            ..first.clone()
        };

        store.replace_reset_code(&first).await.unwrap();
        store.replace_reset_code(&second).await.unwrap();

        let stored = store
            .reset_code_for_email("user@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.code, "222222");
        assert_eq!(stored.attempts, 0);

        store.update_reset_attempts("user@example.com", 1).await.unwrap();
        let stored = store
            .reset_code_for_email("user@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.attempts, 1);

        store.delete_reset_code("user@example.com").await.unwrap();
        assert!(
            store
                .reset_code_for_email("user@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }
}
