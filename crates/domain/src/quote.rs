//! Quote admission controller.

use chrono::Utc;
use common::{Money, UserId};
use store::{Quote, QuoteId, QuoteStatus, SourcingStore, StoreError};

use crate::commands::SubmitQuote;
use crate::error::DomainError;

/// Service gating quote submissions against an RFP's live state.
pub struct QuoteService<S> {
    store: S,
}

impl<S: SourcingStore> QuoteService<S> {
    /// Creates a quote service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Admits a vendor's quote against an RFP.
    ///
    /// Checks run strictly in order: the RFP exists, it is open right now,
    /// this vendor has not quoted it, and the total falls inside the
    /// budget range (inclusive). The first failing check reports. The
    /// read-side duplicate check is a fast path; the store's unique
    /// constraint stays authoritative when two submissions race.
    ///
    /// Eligibility links are not consulted here: listings are already
    /// eligibility-filtered, and a vendor who arrives with a bare RFP ID
    /// is held only to the four checks above.
    #[tracing::instrument(skip(self, cmd), fields(rfp_id = %cmd.rfp_id))]
    pub async fn submit_quote(
        &self,
        vendor: UserId,
        cmd: SubmitQuote,
    ) -> Result<Quote, DomainError> {
        if cmd.unit_price < Money::from_cents(0) {
            return Err(DomainError::Validation(
                "Unit price must not be negative".to_string(),
            ));
        }
        if cmd.quantity == 0 {
            return Err(DomainError::Validation(
                "Quantity must be at least 1".to_string(),
            ));
        }
        if cmd.description.trim().is_empty() {
            return Err(DomainError::Validation(
                "Item description is required".to_string(),
            ));
        }

        let rfp = self
            .store
            .get_rfp(cmd.rfp_id)
            .await?
            .ok_or(DomainError::NotFound("RFP"))?;

        let now = Utc::now();
        if !rfp.is_open(now) {
            metrics::counter!("quotes_rejected_total", "reason" => "closed").increment(1);
            return Err(DomainError::RfpClosed);
        }

        if self
            .store
            .quote_for_vendor(cmd.rfp_id, vendor)
            .await?
            .is_some()
        {
            metrics::counter!("quotes_rejected_total", "reason" => "duplicate").increment(1);
            return Err(DomainError::DuplicateQuote);
        }

        if cmd.total_cost < rfp.budget_min || cmd.total_cost > rfp.budget_max {
            metrics::counter!("quotes_rejected_total", "reason" => "budget").increment(1);
            return Err(DomainError::OutOfBudget {
                total: cmd.total_cost,
                min: rfp.budget_min,
                max: rfp.budget_max,
            });
        }

        let quote = Quote {
            id: QuoteId::new(),
            rfp_id: cmd.rfp_id,
            vendor_id: vendor,
            unit_price: cmd.unit_price,
            description: cmd.description,
            quantity: cmd.quantity,
            total_cost: cmd.total_cost,
            status: QuoteStatus::Pending,
            submitted_at: now,
        };

        match self.store.insert_quote(&quote).await {
            Ok(()) => {}
            Err(StoreError::DuplicateQuote { .. }) => {
                // Lost the race to a concurrent submission by the same
                // vendor; report it exactly like the fast-path check.
                metrics::counter!("quotes_rejected_total", "reason" => "duplicate").increment(1);
                return Err(DomainError::DuplicateQuote);
            }
            Err(err) => return Err(err.into()),
        }

        metrics::counter!("quotes_admitted_total").increment(1);
        tracing::info!(quote_id = %quote.id, rfp_id = %quote.rfp_id, "quote admitted");
        Ok(quote)
    }
}
