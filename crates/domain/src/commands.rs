//! Commands accepted by the domain services.

use chrono::{DateTime, Utc};
use common::{CategoryId, Money, UserId};
use store::RfpId;

/// Command to publish a new RFP.
#[derive(Debug, Clone)]
pub struct CreateRfp {
    pub title: String,
    pub description: String,
    /// Number of units being sourced.
    pub quantity: u32,
    pub deadline: DateTime<Utc>,
    pub budget_min: Money,
    pub budget_max: Money,
    pub category_id: CategoryId,
    /// Vendors to invite. Must not be empty.
    pub vendor_ids: Vec<UserId>,
}

/// Command to submit a quote against an RFP.
#[derive(Debug, Clone)]
pub struct SubmitQuote {
    pub rfp_id: RfpId,
    pub unit_price: Money,
    pub description: String,
    pub quantity: u32,
    pub total_cost: Money,
}

impl SubmitQuote {
    /// Creates a submission with the total derived from unit price and
    /// quantity.
    pub fn priced(rfp_id: RfpId, unit_price: Money, quantity: u32, description: &str) -> Self {
        Self {
            rfp_id,
            unit_price,
            description: description.to_string(),
            quantity,
            total_cost: Money::from_cents(unit_price.cents() * i64::from(quantity)),
        }
    }
}
