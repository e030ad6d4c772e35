//! Route handler modules.

pub mod health;
pub mod metrics;
pub mod notifications;
pub mod quotes;
pub mod reset;
pub mod rfps;
