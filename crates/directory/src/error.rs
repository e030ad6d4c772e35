use thiserror::Error;

/// Errors that can occur when querying the vendor directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The directory service could not be reached or returned a transport
    /// error.
    #[error("Directory transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The directory service answered with a non-success status.
    #[error("Directory service returned {status}: {message}")]
    Remote { status: u16, message: String },

    /// The directory service is unavailable (used by test doubles).
    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

/// Result type for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;
