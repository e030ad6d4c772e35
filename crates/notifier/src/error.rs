use thiserror::Error;

/// Errors that can occur in the notification layer.
#[derive(Debug, Error)]
pub enum NotifierError {
    /// The mail transport rejected or failed a send.
    #[error("Mail transport error: {0}")]
    Transport(String),

    /// The outbox store failed.
    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),
}

/// Result type for notifier operations.
pub type Result<T> = std::result::Result<T, NotifierError>;
