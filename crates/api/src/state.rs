//! Shared application state.

use axum::http::HeaderMap;
use common::Role;
use directory::VendorDirectory;
use domain::{EligibilityResolver, PasswordResetService, QuoteService, RfpService};
use notifier::{Dispatcher, Mailer};
use store::SourcingStore;

use crate::auth::{AuthClaims, Authenticator, bearer_token};
use crate::error::ApiError;

/// Services and capabilities shared by all handlers.
///
/// Everything is injected through the constructor: tests assemble the
/// state from in-memory implementations, the binary from Postgres and the
/// HTTP collaborators.
pub struct AppState<S, D, M, A> {
    pub rfps: RfpService<S, D, M>,
    pub quotes: QuoteService<S>,
    pub eligibility: EligibilityResolver<S, D>,
    pub reset: PasswordResetService<S, M>,
    pub dispatcher: Dispatcher<S, M>,
    pub store: S,
    pub authenticator: A,
}

impl<S, D, M, A> AppState<S, D, M, A>
where
    S: SourcingStore + Clone,
    D: VendorDirectory + Clone,
    M: Mailer + Clone,
    A: Authenticator,
{
    /// Assembles the application state over the given capabilities.
    pub fn new(store: S, directory: D, dispatcher: Dispatcher<S, M>, authenticator: A) -> Self {
        Self {
            rfps: RfpService::new(store.clone(), directory.clone(), dispatcher.clone()),
            quotes: QuoteService::new(store.clone()),
            eligibility: EligibilityResolver::new(store.clone(), directory),
            reset: PasswordResetService::new(store.clone(), dispatcher.clone()),
            dispatcher,
            store,
            authenticator,
        }
    }

    /// Validates the bearer token and enforces the required role.
    pub fn authorize(&self, headers: &HeaderMap, role: Role) -> Result<AuthClaims, ApiError> {
        let token = bearer_token(headers)?;
        self.authenticator.validate(token)?.require_role(role)
    }
}
