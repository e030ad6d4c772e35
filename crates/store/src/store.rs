use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::UserId;

use crate::{
    EligibilityLink, Notification, NotificationId, PasswordResetCode, Quote, Result, Rfp,
    RfpFilter, RfpId, RfpStatus,
};

/// Core trait for sourcing-store implementations.
///
/// One seam covers the five record families (RFPs, eligibility links,
/// quotes, notification work items, reset codes) so services can stay
/// generic over a single handle. All implementations must be thread-safe
/// (Send + Sync).
#[async_trait]
pub trait SourcingStore: Send + Sync {
    /// Persists an RFP together with its eligibility links and the
    /// notification work items its creation produced.
    ///
    /// The three writes commit atomically: a crash can never leave an RFP
    /// without its links, or links without their outbox rows.
    async fn create_rfp(
        &self,
        rfp: &Rfp,
        invited: &[UserId],
        outbox: &[Notification],
    ) -> Result<()>;

    /// Retrieves an RFP by ID.
    async fn get_rfp(&self, id: RfpId) -> Result<Option<Rfp>>;

    /// Lists the RFPs created by an admin, newest first, with optional
    /// status and category filters.
    async fn rfps_for_admin(&self, admin: UserId, filter: &RfpFilter) -> Result<Vec<Rfp>>;

    /// Updates the stored status (and active flag) of an RFP owned by the
    /// given admin.
    ///
    /// Returns the updated record, or None when the RFP doesn't exist or
    /// belongs to someone else.
    async fn set_rfp_status(
        &self,
        id: RfpId,
        admin: UserId,
        status: RfpStatus,
        is_active: bool,
    ) -> Result<Option<Rfp>>;

    /// Deletes an RFP owned by the given admin, cascading to its
    /// eligibility links and quotes.
    ///
    /// Returns false when the RFP doesn't exist or belongs to someone else.
    async fn delete_rfp(&self, id: RfpId, admin: UserId) -> Result<bool>;

    /// Retrieves the eligibility links of an RFP.
    async fn links_for_rfp(&self, rfp_id: RfpId) -> Result<Vec<EligibilityLink>>;

    /// Returns true if the vendor holds an eligibility link for the RFP.
    async fn is_invited(&self, rfp_id: RfpId, vendor: UserId) -> Result<bool>;

    /// Lists the RFPs a vendor can quote right now: linked, open at `now`,
    /// and not yet quoted by this vendor.
    ///
    /// Evaluated as a single consistent read so eligibility, openness, and
    /// quoted-ness come from one snapshot.
    async fn open_rfps_for_vendor(&self, vendor: UserId, now: DateTime<Utc>) -> Result<Vec<Rfp>>;

    /// Lists every RFP a vendor is linked to, paired with the vendor's own
    /// quote where one exists. Newest RFP first.
    async fn invited_rfps_with_quotes(&self, vendor: UserId)
    -> Result<Vec<(Rfp, Option<Quote>)>>;

    /// Persists a quote.
    ///
    /// Fails with [`StoreError::DuplicateQuote`](crate::StoreError) when the
    /// vendor already has a quote for the RFP; the unique constraint is the
    /// authoritative guard, racing read-side checks notwithstanding.
    async fn insert_quote(&self, quote: &Quote) -> Result<()>;

    /// Retrieves the quote a vendor submitted for an RFP, if any.
    async fn quote_for_vendor(&self, rfp_id: RfpId, vendor: UserId) -> Result<Option<Quote>>;

    /// Lists all quotes submitted for an RFP, oldest first.
    async fn quotes_for_rfp(&self, rfp_id: RfpId) -> Result<Vec<Quote>>;

    /// Persists a standalone notification work item.
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    /// Retrieves a work item by ID.
    async fn get_notification(&self, id: NotificationId) -> Result<Option<Notification>>;

    /// Writes back the mutable delivery fields of a work item.
    async fn update_notification(&self, notification: &Notification) -> Result<()>;

    /// Lists work items a delivery pass should attempt: status `pending` or
    /// `retry`, oldest first. Terminal items never appear.
    async fn deliverable_notifications(&self) -> Result<Vec<Notification>>;

    /// Stores a reset code, replacing any outstanding code for the same
    /// email.
    async fn replace_reset_code(&self, code: &PasswordResetCode) -> Result<()>;

    /// Retrieves the outstanding reset code for an email, if any.
    async fn reset_code_for_email(&self, email: &str) -> Result<Option<PasswordResetCode>>;

    /// Overwrites the failed-attempt counter of an outstanding reset code.
    async fn update_reset_attempts(&self, email: &str, attempts: u32) -> Result<()>;

    /// Deletes the outstanding reset code for an email, if any.
    async fn delete_reset_code(&self, email: &str) -> Result<()>;
}

/// Extension trait providing convenience methods for sourcing stores.
#[async_trait]
pub trait SourcingStoreExt: SourcingStore {
    /// Checks if an RFP exists.
    async fn rfp_exists(&self, id: RfpId) -> Result<bool> {
        Ok(self.get_rfp(id).await?.is_some())
    }

    /// Checks if a vendor has already quoted an RFP.
    async fn has_quoted(&self, rfp_id: RfpId, vendor: UserId) -> Result<bool> {
        Ok(self.quote_for_vendor(rfp_id, vendor).await?.is_some())
    }
}

// Blanket implementation for all SourcingStore implementations
impl<T: SourcingStore + ?Sized> SourcingStoreExt for T {}
