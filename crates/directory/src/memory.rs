//! In-memory vendor directory for testing.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CategoryId, Role, UserId};

use crate::error::{DirectoryError, Result};
use crate::vendor::{VendorDirectory, VendorProfile};

#[derive(Debug, Default)]
struct InMemoryDirectoryState {
    profiles: HashMap<UserId, VendorProfile>,
    fail_lookups: bool,
}

/// In-memory vendor directory for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVendorDirectory {
    state: Arc<RwLock<InMemoryDirectoryState>>,
}

impl InMemoryVendorDirectory {
    /// Creates a new empty in-memory directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a vendor account and returns its ID.
    pub fn add_vendor(&self, email: impl Into<String>, category: CategoryId) -> UserId {
        let id = UserId::new();
        self.state.write().unwrap().profiles.insert(
            id,
            VendorProfile {
                id,
                email: email.into(),
                role: Role::Vendor,
                category_id: Some(category),
            },
        );
        id
    }

    /// Registers an admin account and returns its ID.
    pub fn add_admin(&self, email: impl Into<String>) -> UserId {
        let id = UserId::new();
        self.state.write().unwrap().profiles.insert(
            id,
            VendorProfile {
                id,
                email: email.into(),
                role: Role::Admin,
                category_id: None,
            },
        );
        id
    }

    /// Configures the directory to fail all lookups.
    pub fn set_fail_lookups(&self, fail: bool) {
        self.state.write().unwrap().fail_lookups = fail;
    }

    /// Returns the number of registered accounts.
    pub fn account_count(&self) -> usize {
        self.state.read().unwrap().profiles.len()
    }
}

#[async_trait]
impl VendorDirectory for InMemoryVendorDirectory {
    async fn vendors_by_ids(&self, ids: &[UserId]) -> Result<Vec<VendorProfile>> {
        let state = self.state.read().unwrap();
        if state.fail_lookups {
            return Err(DirectoryError::Unavailable(
                "Directory offline".to_string(),
            ));
        }

        Ok(ids
            .iter()
            .filter_map(|id| state.profiles.get(id).cloned())
            .collect())
    }

    async fn vendors_by_category(&self, category: CategoryId) -> Result<Vec<VendorProfile>> {
        let state = self.state.read().unwrap();
        if state.fail_lookups {
            return Err(DirectoryError::Unavailable(
                "Directory offline".to_string(),
            ));
        }

        Ok(state
            .profiles
            .values()
            .filter(|p| p.role == Role::Vendor && p.category_id == Some(category))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_ids_and_skips_unknown() {
        let directory = InMemoryVendorDirectory::new();
        let category = CategoryId::new();
        let v1 = directory.add_vendor("v1@example.com", category);
        let unknown = UserId::new();

        let profiles = directory.vendors_by_ids(&[v1, unknown]).await.unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].id, v1);
        assert_eq!(profiles[0].email, "v1@example.com");
    }

    #[tokio::test]
    async fn category_listing_excludes_other_categories_and_admins() {
        let directory = InMemoryVendorDirectory::new();
        let furniture = CategoryId::new();
        let catering = CategoryId::new();
        let v1 = directory.add_vendor("chairs@example.com", furniture);
        directory.add_vendor("food@example.com", catering);
        directory.add_admin("admin@example.com");

        let vendors = directory.vendors_by_category(furniture).await.unwrap();
        assert_eq!(vendors.len(), 1);
        assert_eq!(vendors[0].id, v1);
    }

    #[tokio::test]
    async fn fail_toggle_makes_lookups_unavailable() {
        let directory = InMemoryVendorDirectory::new();
        let category = CategoryId::new();
        directory.add_vendor("v@example.com", category);
        directory.set_fail_lookups(true);

        assert!(directory.vendors_by_ids(&[UserId::new()]).await.is_err());
        assert!(directory.vendors_by_category(category).await.is_err());
    }
}
