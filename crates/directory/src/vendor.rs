//! Vendor directory trait and the profile record it resolves.

use async_trait::async_trait;
use common::{CategoryId, Role, UserId};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Contact profile of a directory account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorProfile {
    pub id: UserId,
    pub email: String,
    pub role: Role,
    /// Category the vendor operates in. Absent for admin accounts.
    pub category_id: Option<CategoryId>,
}

impl VendorProfile {
    /// Returns true if this profile belongs to a vendor account.
    pub fn is_vendor(&self) -> bool {
        self.role == Role::Vendor
    }
}

/// Trait for resolving vendor identity and contact data.
///
/// Both lookups are best-effort at the call site: eligibility resolution
/// degrades on failure rather than failing the caller's primary write.
#[async_trait]
pub trait VendorDirectory: Send + Sync {
    /// Resolves a set of account IDs to profiles.
    ///
    /// IDs the directory does not know are omitted from the result; the
    /// caller decides how to surface the shortfall.
    async fn vendors_by_ids(&self, ids: &[UserId]) -> Result<Vec<VendorProfile>>;

    /// Lists every vendor account in a category.
    async fn vendors_by_category(&self, category: CategoryId) -> Result<Vec<VendorProfile>>;
}
