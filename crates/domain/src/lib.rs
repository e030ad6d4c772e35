//! Domain services for the RFP sourcing workflow.
//!
//! This crate owns the business rules between the HTTP surface and the
//! store:
//! - RFP lifecycle (validated creation with audience fan-out, listing,
//!   one-way close, cascade delete)
//! - vendor eligibility resolution against the directory service
//! - quote admission checks
//! - OTP password reset issuance and verification

pub mod commands;
pub mod eligibility;
pub mod error;
pub mod quote;
pub mod reset;
pub mod rfp;

pub use commands::{CreateRfp, SubmitQuote};
pub use eligibility::{EligibilityResolver, ResolvedAudience, RfpScope, VendorRfpView};
pub use error::DomainError;
pub use quote::QuoteService;
pub use reset::{PasswordResetService, RESET_CODE_TTL_MINUTES, RESET_MAX_ATTEMPTS};
pub use rfp::{RfpCreated, RfpService};
