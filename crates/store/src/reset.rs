//! Password reset code records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A one-time password reset code issued for an email address.
///
/// The store keeps at most one row per email; issuing a new code replaces
/// any outstanding one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordResetCode {
    pub email: String,
    pub code: String,
    /// Failed verification attempts so far.
    pub attempts: u32,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PasswordResetCode {
    /// Returns true if the code can no longer be redeemed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expiry_boundary_is_inclusive() {
        let now = Utc::now();
        let code = PasswordResetCode {
            email: "user@example.com".to_string(),
            code: "042137".to_string(),
            attempts: 0,
            expires_at: now + Duration::minutes(15),
            created_at: now,
        };

        assert!(!code.is_expired(now));
        assert!(code.is_expired(now + Duration::minutes(15)));
        assert!(code.is_expired(now + Duration::minutes(16)));
    }
}
