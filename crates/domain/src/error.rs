//! Domain error types.

use common::Money;
use thiserror::Error;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Malformed or missing input, reported before any store access.
    #[error("{0}")]
    Validation(String),

    /// A referenced resource does not exist (or is not visible to the
    /// caller).
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The RFP no longer accepts quotes.
    #[error("RFP is closed or expired")]
    RfpClosed,

    /// The vendor already submitted a quote for this RFP.
    #[error("You have already submitted a quote for this RFP")]
    DuplicateQuote,

    /// The quoted total falls outside the RFP's budget range.
    #[error("Total cost {total} is outside the budget range {min} - {max}")]
    OutOfBudget { total: Money, min: Money, max: Money },

    /// An OTP verification failure, surfaced as an auth error.
    #[error("{0}")]
    InvalidResetCode(String),

    /// The store failed.
    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    /// The notification layer failed while persisting a work item.
    #[error("Notifier error: {0}")]
    Notifier(#[from] notifier::NotifierError),
}
