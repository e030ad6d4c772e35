//! Vendor eligibility resolution.
//!
//! Answers two questions: which vendors may quote a given RFP (computed
//! once, at creation), and which RFPs a given vendor can see or quote
//! right now.

use chrono::{DateTime, Utc};
use common::{CategoryId, UserId};
use directory::{VendorDirectory, VendorProfile};
use store::{QuoteStatus, Rfp, SourcingStore};

use crate::error::DomainError;

/// Outcome of resolving an RFP's vendor audience.
///
/// Carries the shortfall explicitly: `skipped` counts requested IDs that
/// did not resolve to a vendor account, so callers can surface partial
/// failure instead of dropping recipients silently.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAudience {
    pub profiles: Vec<VendorProfile>,
    /// Explicitly requested vendor IDs (0 when resolving by category).
    pub requested: usize,
    pub resolved: usize,
    pub skipped: usize,
}

/// Which slice of a vendor's invited RFPs a listing should return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RfpScope {
    /// Open, not yet quoted.
    Available,
    /// Already quoted by this vendor.
    Quoted,
    #[default]
    All,
}

impl std::str::FromStr for RfpScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(RfpScope::Available),
            "quoted" => Ok(RfpScope::Quoted),
            "all" => Ok(RfpScope::All),
            other => Err(format!("unknown scope: {other}")),
        }
    }
}

/// One entry of the vendor-facing RFP listing.
#[derive(Debug, Clone)]
pub struct VendorRfpView {
    pub rfp: Rfp,
    pub has_quoted: bool,
    /// True when the vendor could submit a quote right now.
    pub can_quote: bool,
    pub is_expired: bool,
    /// Status of the vendor's own quote, if one exists.
    pub quote_status: Option<QuoteStatus>,
}

/// Resolves vendor audiences and vendor-facing RFP listings.
pub struct EligibilityResolver<S, D> {
    store: S,
    directory: D,
}

impl<S, D> EligibilityResolver<S, D>
where
    S: SourcingStore,
    D: VendorDirectory,
{
    /// Creates a resolver over the given store and directory.
    pub fn new(store: S, directory: D) -> Self {
        Self { store, directory }
    }

    /// Computes the vendor audience for an RFP.
    ///
    /// A non-empty explicit list wins: each ID is resolved through the
    /// directory and non-vendor or unknown IDs are skipped (and counted).
    /// An empty list falls back to every directory vendor in the RFP's
    /// category. Directory failure degrades to an empty audience; it never
    /// fails the caller.
    #[tracing::instrument(skip(self, vendor_ids), fields(requested = vendor_ids.len()))]
    pub async fn resolve_audience(
        &self,
        vendor_ids: &[UserId],
        category: CategoryId,
    ) -> ResolvedAudience {
        if vendor_ids.is_empty() {
            return match self.directory.vendors_by_category(category).await {
                Ok(profiles) => ResolvedAudience {
                    requested: 0,
                    resolved: profiles.len(),
                    skipped: 0,
                    profiles,
                },
                Err(err) => {
                    tracing::warn!(%category, %err, "category audience lookup failed, degrading to empty audience");
                    ResolvedAudience::default()
                }
            };
        }

        let requested = vendor_ids.len();
        let profiles = match self.directory.vendors_by_ids(vendor_ids).await {
            Ok(profiles) => profiles,
            Err(err) => {
                tracing::warn!(requested, %err, "vendor lookup failed, degrading to empty audience");
                return ResolvedAudience {
                    requested,
                    resolved: 0,
                    skipped: requested,
                    profiles: Vec::new(),
                };
            }
        };

        let vendors: Vec<VendorProfile> =
            profiles.into_iter().filter(VendorProfile::is_vendor).collect();
        let resolved = vendors.len();
        let skipped = requested - resolved;
        if skipped > 0 {
            tracing::warn!(requested, resolved, skipped, "some invited IDs did not resolve to vendor accounts");
        }

        ResolvedAudience {
            profiles: vendors,
            requested,
            resolved,
            skipped,
        }
    }

    /// Lists the RFPs a vendor can quote right now: invited, open at
    /// `now`, and not yet quoted.
    ///
    /// The store answers this from one snapshot, so a quote committed an
    /// instant ago never shows its RFP as still available.
    pub async fn available_rfps(
        &self,
        vendor: UserId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Rfp>, DomainError> {
        Ok(self.store.open_rfps_for_vendor(vendor, now).await?)
    }

    /// Lists a vendor's invited RFPs, annotated and filtered by scope.
    pub async fn vendor_rfps(
        &self,
        vendor: UserId,
        scope: RfpScope,
        now: DateTime<Utc>,
    ) -> Result<Vec<VendorRfpView>, DomainError> {
        let pairs = self.store.invited_rfps_with_quotes(vendor).await?;

        Ok(pairs
            .into_iter()
            .map(|(rfp, quote)| {
                let has_quoted = quote.is_some();
                VendorRfpView {
                    has_quoted,
                    can_quote: !has_quoted && rfp.is_open(now),
                    is_expired: rfp.is_expired(now),
                    quote_status: quote.map(|q| q.status),
                    rfp,
                }
            })
            .filter(|view| match scope {
                RfpScope::Available => view.can_quote,
                RfpScope::Quoted => view.has_quoted,
                RfpScope::All => true,
            })
            .collect())
    }
}
