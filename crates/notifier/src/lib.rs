//! Durable notification outbox and delivery workers.
//!
//! Work items are persisted through the sourcing store (often in the same
//! transaction as the domain write that produced them) and delivered
//! out-of-band: a [`Dispatcher`] attempts individual items against a
//! [`Mailer`], and a [`DispatcherPool`] of workers consumes a bounded queue
//! of delivery nudges so the request path never waits on the transport.

pub mod dispatcher;
pub mod error;
pub mod mailer;
pub mod pool;
pub mod relay;

pub use dispatcher::{BatchOutcome, Dispatcher};
pub use error::{NotifierError, Result};
pub use mailer::{InMemoryMailer, Mailer};
pub use pool::{DispatcherPool, PoolConfig};
pub use relay::RelayMailer;
