//! Error types for session operations.

/// Error type for session operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The session was constructed with missing or invalid settings.
    #[error("Wrong session config: {0}")]
    Config(String),

    /// The persistent store could not be read or written.
    #[error("Store error: {0}")]
    Store(String),

    /// A round trip to the identity server did not complete.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The session handle has been torn down.
    #[error("Session handle closed")]
    Closed,
}

impl Error {
    /// Check if this is a construction-time configuration error.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Store(format!("Failed to encode store contents: {}", e))
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, Error>;
