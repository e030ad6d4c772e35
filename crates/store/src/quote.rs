//! Quote records submitted by vendors against RFPs.

use chrono::{DateTime, Utc};
use common::{Money, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rfp::RfpId;

/// Unique identifier for a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteId(Uuid);

impl QuoteId {
    /// Creates a new random quote ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a quote ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for QuoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QuoteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for QuoteId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<QuoteId> for Uuid {
    fn from(id: QuoteId) -> Self {
        id.0
    }
}

/// Review status of a submitted quote.
///
/// Admission always writes `pending`; no transition out of it is exposed
/// yet, the other variants keep stored data representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    Pending,
    Accepted,
    Rejected,
}

impl QuoteStatus {
    /// Returns the lowercase stored name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QuoteStatus::Pending),
            "accepted" => Ok(QuoteStatus::Accepted),
            "rejected" => Ok(QuoteStatus::Rejected),
            other => Err(format!("unknown quote status: {other}")),
        }
    }
}

/// A vendor's priced offer for an RFP.
///
/// At most one quote per (rfp, vendor) pair exists; the store enforces
/// this with a unique constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub id: QuoteId,
    pub rfp_id: RfpId,
    pub vendor_id: UserId,
    pub unit_price: Money,
    pub description: String,
    pub quantity: u32,
    pub total_cost: Money,
    pub status: QuoteStatus,
    pub submitted_at: DateTime<Utc>,
}
