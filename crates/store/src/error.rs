use common::UserId;
use thiserror::Error;

use crate::rfp::RfpId;

/// Errors that can occur when interacting with the sourcing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The vendor already has a quote for this RFP.
    /// Raised by the unique (rfp_id, vendor_id) constraint, which stays
    /// authoritative even when a read-side check raced.
    #[error("Duplicate quote for RFP {rfp_id} by vendor {vendor_id}")]
    DuplicateQuote { rfp_id: RfpId, vendor_id: UserId },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored column held a value the record type cannot represent.
    #[error("Invalid value in column {column}: {value}")]
    InvalidColumn { column: &'static str, value: String },
}

/// Result type for sourcing store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
