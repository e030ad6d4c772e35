//! Vendor directory client for the RFP sourcing platform.
//!
//! Vendor accounts live in a separate service; this crate is the thin,
//! replaceable boundary the eligibility resolver talks to. [`VendorDirectory`]
//! is the capability trait, backed by an HTTP implementation for production
//! and an in-memory one for tests.

pub mod error;
pub mod http;
pub mod memory;
pub mod vendor;

pub use error::{DirectoryError, Result};
pub use http::HttpVendorDirectory;
pub use memory::InMemoryVendorDirectory;
pub use vendor::{VendorDirectory, VendorProfile};
