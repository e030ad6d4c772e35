//! RFP lifecycle engine.

use std::collections::HashSet;

use chrono::Utc;
use common::UserId;
use notifier::{Dispatcher, Mailer};
use store::{Notification, Quote, Rfp, RfpFilter, RfpId, RfpStatus, SourcingStore};

use crate::commands::CreateRfp;
use crate::eligibility::EligibilityResolver;
use crate::error::DomainError;
use directory::VendorDirectory;

/// Result of publishing an RFP.
#[derive(Debug, Clone)]
pub struct RfpCreated {
    pub rfp: Rfp,
    /// Eligibility links written.
    pub invited: usize,
    /// Notification work items enqueued (one per resolved vendor email).
    pub notified: usize,
    /// Invited IDs that did not resolve to a vendor account.
    pub unresolved: usize,
}

/// Service owning RFP state and its admin-triggered transitions.
pub struct RfpService<S, D, M> {
    store: S,
    resolver: EligibilityResolver<S, D>,
    dispatcher: Dispatcher<S, M>,
}

impl<S, D, M> RfpService<S, D, M>
where
    S: SourcingStore + Clone,
    D: VendorDirectory,
    M: Mailer,
{
    /// Creates an RFP service over the given store, directory, and
    /// dispatcher.
    pub fn new(store: S, directory: D, dispatcher: Dispatcher<S, M>) -> Self {
        let resolver = EligibilityResolver::new(store.clone(), directory);
        Self {
            store,
            resolver,
            dispatcher,
        }
    }

    /// Publishes a new RFP.
    ///
    /// The RFP row, its eligibility links, and one notification work item
    /// per resolved vendor email commit in a single transaction; delivery
    /// is nudged after the commit and never blocks this call. Directory
    /// degradation shrinks the notified audience, it does not fail the
    /// creation.
    #[tracing::instrument(skip(self, cmd), fields(title = %cmd.title))]
    pub async fn create_rfp(
        &self,
        admin: UserId,
        cmd: CreateRfp,
    ) -> Result<RfpCreated, DomainError> {
        if cmd.title.trim().is_empty() {
            return Err(DomainError::Validation("Title is required".to_string()));
        }
        if cmd.description.trim().is_empty() {
            return Err(DomainError::Validation(
                "Description is required".to_string(),
            ));
        }
        if cmd.quantity == 0 {
            return Err(DomainError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        if cmd.budget_max < cmd.budget_min {
            return Err(DomainError::Validation(format!(
                "Maximum budget {} must not be less than minimum budget {}",
                cmd.budget_max, cmd.budget_min
            )));
        }
        let now = Utc::now();
        if cmd.deadline <= now {
            return Err(DomainError::Validation(
                "Deadline must be in the future".to_string(),
            ));
        }
        if cmd.vendor_ids.is_empty() {
            return Err(DomainError::Validation(
                "Select at least one vendor".to_string(),
            ));
        }

        // Links are written for exactly the supplied IDs; the notified
        // audience is the subset that resolves to a vendor account.
        // Dedup keeps the first occurrence so fan-out follows request order.
        let mut seen = HashSet::new();
        let mut invited = cmd.vendor_ids.clone();
        invited.retain(|id| seen.insert(*id));

        let audience = self
            .resolver
            .resolve_audience(&invited, cmd.category_id)
            .await;

        let rfp = Rfp {
            id: RfpId::new(),
            title: cmd.title,
            description: cmd.description,
            quantity: cmd.quantity,
            deadline: cmd.deadline,
            budget_min: cmd.budget_min,
            budget_max: cmd.budget_max,
            status: RfpStatus::Open,
            is_active: true,
            category_id: cmd.category_id,
            created_by: admin,
            created_at: now,
            updated_at: now,
        };

        let subject = format!("New RFP Request: {}", rfp.title);
        let body = format!(
            "A new RFP \"{}\" is open for quotes.\n\n{}\n\nQuantity: {}\nBudget: {} - {}\nDeadline: {}\n\nSubmit your quote before the deadline.",
            rfp.title,
            rfp.description,
            rfp.quantity,
            rfp.budget_min,
            rfp.budget_max,
            rfp.deadline.to_rfc3339(),
        );
        let outbox: Vec<Notification> = audience
            .profiles
            .iter()
            .map(|profile| Notification::email(&profile.email, &subject, &body, now))
            .collect();

        self.store.create_rfp(&rfp, &invited, &outbox).await?;

        // Rows are durable; a dropped nudge only delays delivery until the
        // next batch pass.
        for item in &outbox {
            self.dispatcher.submit(item.id);
        }

        metrics::counter!("rfps_created_total").increment(1);
        tracing::info!(
            rfp_id = %rfp.id,
            invited = invited.len(),
            notified = outbox.len(),
            unresolved = audience.skipped,
            "RFP published"
        );

        Ok(RfpCreated {
            rfp,
            invited: invited.len(),
            notified: outbox.len(),
            unresolved: audience.skipped,
        })
    }

    /// Lists the RFPs created by this admin, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_rfps(
        &self,
        admin: UserId,
        filter: &RfpFilter,
    ) -> Result<Vec<Rfp>, DomainError> {
        Ok(self.store.rfps_for_admin(admin, filter).await?)
    }

    /// Lists all quotes submitted for an RFP.
    #[tracing::instrument(skip(self))]
    pub async fn rfp_quotes(&self, rfp_id: RfpId) -> Result<Vec<Quote>, DomainError> {
        if self.store.get_rfp(rfp_id).await?.is_none() {
            return Err(DomainError::NotFound("RFP"));
        }
        Ok(self.store.quotes_for_rfp(rfp_id).await?)
    }

    /// Closes an RFP: status `closed`, active flag off.
    ///
    /// One-way; no reopen operation exists. Scoped to RFPs this admin
    /// owns, a foreign or unknown ID reads as not found.
    #[tracing::instrument(skip(self))]
    pub async fn close_rfp(&self, admin: UserId, rfp_id: RfpId) -> Result<Rfp, DomainError> {
        let updated = self
            .store
            .set_rfp_status(rfp_id, admin, RfpStatus::Closed, false)
            .await?
            .ok_or(DomainError::NotFound("RFP"))?;

        metrics::counter!("rfps_closed_total").increment(1);
        tracing::info!(rfp_id = %rfp_id, "RFP closed");
        Ok(updated)
    }

    /// Deletes an RFP this admin owns, cascading to its links and quotes.
    #[tracing::instrument(skip(self))]
    pub async fn delete_rfp(&self, admin: UserId, rfp_id: RfpId) -> Result<(), DomainError> {
        if !self.store.delete_rfp(rfp_id, admin).await? {
            return Err(DomainError::NotFound("RFP"));
        }
        tracing::info!(rfp_id = %rfp_id, "RFP deleted");
        Ok(())
    }
}
