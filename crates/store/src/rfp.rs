//! RFP records and their derived lifecycle predicates.

use chrono::{DateTime, Utc};
use common::{CategoryId, Money, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an RFP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RfpId(Uuid);

impl RfpId {
    /// Creates a new random RFP ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an RFP ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RfpId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RfpId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RfpId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<RfpId> for Uuid {
    fn from(id: RfpId) -> Self {
        id.0
    }
}

/// Stored lifecycle status of an RFP.
///
/// Deadline expiry is deliberately not a status: it is derived from the
/// clock at read time, so a closed RFP and an expired one stay
/// distinguishable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RfpStatus {
    Draft,
    Open,
    Closed,
}

impl RfpStatus {
    /// Returns the lowercase stored name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RfpStatus::Draft => "draft",
            RfpStatus::Open => "open",
            RfpStatus::Closed => "closed",
        }
    }
}

impl std::fmt::Display for RfpStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RfpStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(RfpStatus::Draft),
            "open" => Ok(RfpStatus::Open),
            "closed" => Ok(RfpStatus::Closed),
            other => Err(format!("unknown RFP status: {other}")),
        }
    }
}

/// A request-for-proposal record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rfp {
    pub id: RfpId,
    pub title: String,
    pub description: String,
    /// Number of units being sourced.
    pub quantity: u32,
    /// Submission deadline. Quotes are rejected at or after this instant.
    pub deadline: DateTime<Utc>,
    pub budget_min: Money,
    pub budget_max: Money,
    pub status: RfpStatus,
    pub is_active: bool,
    pub category_id: CategoryId,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rfp {
    /// Returns true if the submission deadline has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline <= now
    }

    /// Returns true if the RFP currently accepts quotes.
    ///
    /// Open means all three hold at once: stored status is `open`, the
    /// active flag is set, and the deadline has not passed.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        self.status == RfpStatus::Open && self.is_active && now < self.deadline
    }
}

/// An eligibility link inviting one vendor to one RFP.
///
/// Links are written once at RFP creation and never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityLink {
    pub rfp_id: RfpId,
    pub vendor_id: UserId,
    pub invited_at: DateTime<Utc>,
}

/// Optional filters for the admin RFP listing.
#[derive(Debug, Clone, Default)]
pub struct RfpFilter {
    pub status: Option<RfpStatus>,
    pub category: Option<CategoryId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample_rfp(deadline: DateTime<Utc>) -> Rfp {
        let now = Utc::now();
        Rfp {
            id: RfpId::new(),
            title: "Office chairs".to_string(),
            description: "200 ergonomic chairs".to_string(),
            quantity: 200,
            deadline,
            budget_min: Money::from_dollars(5_000),
            budget_max: Money::from_dollars(20_000),
            status: RfpStatus::Open,
            is_active: true,
            category_id: CategoryId::new(),
            created_by: UserId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn open_requires_status_active_and_future_deadline() {
        let now = Utc::now();
        let rfp = sample_rfp(now + Duration::days(7));
        assert!(rfp.is_open(now));

        let mut closed = rfp.clone();
        closed.status = RfpStatus::Closed;
        assert!(!closed.is_open(now));

        let mut inactive = rfp.clone();
        inactive.is_active = false;
        assert!(!inactive.is_open(now));

        let mut draft = rfp.clone();
        draft.status = RfpStatus::Draft;
        assert!(!draft.is_open(now));
    }

    #[test]
    fn deadline_passing_expires_without_changing_status() {
        let now = Utc::now();
        let rfp = sample_rfp(now + Duration::hours(1));

        assert!(!rfp.is_expired(now));
        assert!(rfp.is_open(now));

        let later = now + Duration::hours(2);
        assert!(rfp.is_expired(later));
        assert!(!rfp.is_open(later));
        // Stored status is untouched by the clock.
        assert_eq!(rfp.status, RfpStatus::Open);
    }

    #[test]
    fn deadline_boundary_is_exclusive() {
        let now = Utc::now();
        let rfp = sample_rfp(now);
        assert!(rfp.is_expired(now));
        assert!(!rfp.is_open(now));
    }

    #[test]
    fn status_round_trips_through_stored_name() {
        for status in [RfpStatus::Draft, RfpStatus::Open, RfpStatus::Closed] {
            assert_eq!(status.as_str().parse::<RfpStatus>().unwrap(), status);
        }
        assert!("archived".parse::<RfpStatus>().is_err());
    }
}
