//! Persistence layer for the RFP sourcing platform.
//!
//! Defines the entity records (RFPs, eligibility links, quotes,
//! notification work items, password reset codes) and the [`SourcingStore`]
//! trait with PostgreSQL and in-memory implementations.

pub mod error;
pub mod memory;
pub mod notification;
pub mod postgres;
pub mod quote;
pub mod reset;
pub mod rfp;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use notification::{
    Channel, DEFAULT_MAX_RETRIES, Notification, NotificationId, NotificationStatus,
};
pub use postgres::PostgresStore;
pub use quote::{Quote, QuoteId, QuoteStatus};
pub use reset::PasswordResetCode;
pub use rfp::{EligibilityLink, Rfp, RfpFilter, RfpId, RfpStatus};
pub use store::{SourcingStore, SourcingStoreExt};
