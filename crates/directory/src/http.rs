//! HTTP implementation of the vendor directory against the auth service.

use async_trait::async_trait;
use common::{CategoryId, UserId};
use serde::Deserialize;

use crate::error::{DirectoryError, Result};
use crate::vendor::{VendorDirectory, VendorProfile};

/// JSON envelope the auth service wraps single-resource responses in.
#[derive(Debug, Deserialize)]
struct UserEnvelope {
    data: VendorProfile,
}

/// JSON envelope for list responses.
#[derive(Debug, Deserialize)]
struct VendorListEnvelope {
    data: Vec<VendorProfile>,
}

/// Vendor directory backed by the auth service's REST API.
#[derive(Clone)]
pub struct HttpVendorDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVendorDirectory {
    /// Creates a directory client against the given service base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn fetch_user(&self, id: UserId) -> Result<VendorProfile> {
        let url = format!("{}/api/v1/auth/users/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Remote {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let envelope: UserEnvelope = response.json().await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl VendorDirectory for HttpVendorDirectory {
    /// Resolves IDs one request at a time; the auth service exposes no
    /// batch lookup. Individual misses are skipped, not propagated.
    async fn vendors_by_ids(&self, ids: &[UserId]) -> Result<Vec<VendorProfile>> {
        let mut profiles = Vec::with_capacity(ids.len());
        for &id in ids {
            match self.fetch_user(id).await {
                Ok(profile) => profiles.push(profile),
                Err(DirectoryError::Remote { status, .. }) => {
                    tracing::warn!(user_id = %id, status, "directory lookup miss, skipping");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(profiles)
    }

    async fn vendors_by_category(&self, category: CategoryId) -> Result<Vec<VendorProfile>> {
        let url = format!("{}/api/v1/vendors", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("category_id", category.as_uuid().to_string())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Remote {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let envelope: VendorListEnvelope = response.json().await?;
        // The remote does not guarantee server-side filtering; filter here
        // so eligibility never widens past the requested category.
        Ok(envelope
            .data
            .into_iter()
            .filter(|v| v.category_id == Some(category))
            .collect())
    }
}
