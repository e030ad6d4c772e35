//! Shared value types for the RFP sourcing platform.
//!
//! Typed identifiers, account roles, and money amounts used across the
//! store, domain, and API crates.

pub mod money;
pub mod types;

pub use money::Money;
pub use types::{CategoryId, Role, UserId};
