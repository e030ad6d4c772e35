//! OTP password reset issuance and verification.

use chrono::{Duration, Utc};
use notifier::{Dispatcher, Mailer};
use rand::Rng;
use store::{PasswordResetCode, SourcingStore};

use crate::error::DomainError;

/// Minutes a reset code stays redeemable after issuance.
pub const RESET_CODE_TTL_MINUTES: i64 = 15;

/// Failed verification attempts that destroy a code.
pub const RESET_MAX_ATTEMPTS: u32 = 3;

/// Service issuing and verifying one-time password reset codes.
///
/// At most one code is outstanding per email; issuing a new one replaces
/// it. A code dies on expiry, on its third failed attempt, or on
/// successful redemption.
pub struct PasswordResetService<S, M> {
    store: S,
    dispatcher: Dispatcher<S, M>,
}

impl<S, M> PasswordResetService<S, M>
where
    S: SourcingStore,
    M: Mailer,
{
    /// Creates a reset service over the given store and dispatcher.
    pub fn new(store: S, dispatcher: Dispatcher<S, M>) -> Self {
        Self { store, dispatcher }
    }

    /// Issues a fresh 6-digit code for an email address.
    ///
    /// Replaces any outstanding code for the address and enqueues the code
    /// email. Answers uniformly whether or not the address belongs to a
    /// known account, so the endpoint cannot be used to enumerate users.
    #[tracing::instrument(skip(self, email))]
    pub async fn request_reset(&self, email: &str) -> Result<(), DomainError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || !email.contains('@') {
            return Err(DomainError::Validation(
                "A valid email address is required".to_string(),
            ));
        }

        let code = format!("{:06}", rand::rng().random_range(0..1_000_000));
        let now = Utc::now();
        let record = PasswordResetCode {
            email: email.clone(),
            code: code.clone(),
            attempts: 0,
            expires_at: now + Duration::minutes(RESET_CODE_TTL_MINUTES),
            created_at: now,
        };
        self.store.replace_reset_code(&record).await?;

        let body = format!(
            "Your password reset code is {code}. It expires in {RESET_CODE_TTL_MINUTES} minutes.\n\nIf you did not request a reset, ignore this email."
        );
        self.dispatcher
            .enqueue_email(&email, "Password Reset Code", &body)
            .await?;

        metrics::counter!("password_resets_requested_total").increment(1);
        Ok(())
    }

    /// Redeems a reset code.
    ///
    /// On success the record is deleted (the code is single-use) and a
    /// confirmation email is enqueued. Expiry and the third failed attempt
    /// also delete the record; the caller must request a new code.
    #[tracing::instrument(skip(self, email, code))]
    pub async fn verify_reset(&self, email: &str, code: &str) -> Result<(), DomainError> {
        let email = email.trim().to_lowercase();
        let Some(record) = self.store.reset_code_for_email(&email).await? else {
            return Err(DomainError::InvalidResetCode(
                "Invalid or expired reset code".to_string(),
            ));
        };

        let now = Utc::now();
        if record.is_expired(now) {
            self.store.delete_reset_code(&email).await?;
            return Err(DomainError::InvalidResetCode(
                "Reset code has expired, request a new one".to_string(),
            ));
        }

        if record.code != code {
            let attempts = record.attempts + 1;
            if attempts >= RESET_MAX_ATTEMPTS {
                self.store.delete_reset_code(&email).await?;
                return Err(DomainError::InvalidResetCode(
                    "Too many failed attempts, request a new code".to_string(),
                ));
            }
            self.store.update_reset_attempts(&email, attempts).await?;
            let remaining = RESET_MAX_ATTEMPTS - attempts;
            return Err(DomainError::InvalidResetCode(format!(
                "Invalid code, {remaining} attempts remaining"
            )));
        }

        self.store.delete_reset_code(&email).await?;
        self.dispatcher
            .enqueue_email(
                &email,
                "Password Reset Verified",
                "Your reset code was verified. You can now set a new password.",
            )
            .await?;

        metrics::counter!("password_resets_verified_total").increment(1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notifier::InMemoryMailer;
    use store::{InMemoryStore, SourcingStore as _};

    fn service() -> (PasswordResetService<InMemoryStore, InMemoryMailer>, InMemoryStore) {
        let store = InMemoryStore::new();
        let dispatcher = Dispatcher::new(store.clone(), InMemoryMailer::new());
        (PasswordResetService::new(store.clone(), dispatcher), store)
    }

    async fn issued_code(store: &InMemoryStore, email: &str) -> String {
        store
            .reset_code_for_email(email)
            .await
            .unwrap()
            .unwrap()
            .code
    }

    #[tokio::test]
    async fn issued_code_is_six_digits_and_redeemable_once() {
        let (service, store) = service();
        service.request_reset("User@Example.com").await.unwrap();

        // Address is normalized before storage.
        let code = issued_code(&store, "user@example.com").await;
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        service.verify_reset("user@example.com", &code).await.unwrap();

        // Single-use: the record is gone.
        let err = service
            .verify_reset("user@example.com", &code)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidResetCode(ref m) if m.contains("Invalid or expired")));
    }

    #[tokio::test]
    async fn third_failed_attempt_destroys_the_code() {
        let (service, store) = service();
        service.request_reset("user@example.com").await.unwrap();
        let code = issued_code(&store, "user@example.com").await;
        let wrong = if code == "000000" { "000001" } else { "000000" };

        let first = service.verify_reset("user@example.com", wrong).await.unwrap_err();
        assert!(matches!(first, DomainError::InvalidResetCode(ref m) if m.contains("2 attempts")));

        let second = service.verify_reset("user@example.com", wrong).await.unwrap_err();
        assert!(matches!(second, DomainError::InvalidResetCode(ref m) if m.contains("1 attempts")));

        let third = service.verify_reset("user@example.com", wrong).await.unwrap_err();
        assert!(matches!(third, DomainError::InvalidResetCode(ref m) if m.contains("Too many")));

        // Even the right code is now invalid: the record is deleted.
        let after = service.verify_reset("user@example.com", &code).await.unwrap_err();
        assert!(matches!(after, DomainError::InvalidResetCode(ref m) if m.contains("Invalid or expired")));
    }

    #[tokio::test]
    async fn new_request_replaces_the_outstanding_code() {
        let (service, store) = service();
        service.request_reset("user@example.com").await.unwrap();
        let first = issued_code(&store, "user@example.com").await;

        // Burn an attempt so replacement is observable even if the two
        // random codes collide.
        let wrong = if first == "000000" { "000001" } else { "000000" };
        let _ = service.verify_reset("user@example.com", wrong).await;

        service.request_reset("user@example.com").await.unwrap();
        let record = store
            .reset_code_for_email("user@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.attempts, 0);

        service
            .verify_reset("user@example.com", &record.code)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_code_is_rejected_and_deleted() {
        let (service, store) = service();
        let now = Utc::now();
        let record = PasswordResetCode {
            email: "user@example.com".to_string(),
            code: "123456".to_string(),
            attempts: 0,
            expires_at: now - Duration::minutes(1),
            created_at: now - Duration::minutes(16),
        };
        store.replace_reset_code(&record).await.unwrap();

        let err = service
            .verify_reset("user@example.com", "123456")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidResetCode(ref m) if m.contains("expired")));
        assert!(store
            .reset_code_for_email("user@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn request_validates_the_address() {
        let (service, _store) = service();
        assert!(matches!(
            service.request_reset("not-an-email").await.unwrap_err(),
            DomainError::Validation(_)
        ));
    }
}
