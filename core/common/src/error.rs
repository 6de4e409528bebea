//! Common error types for debridgate.

use thiserror::Error;

use crate::types::StoreName;

/// Top-level error type for gateway operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Requested content or file is absent upstream.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Capability is not offered by this provider.
    #[error("{store}: {operation} is not supported")]
    Unsupported {
        store: StoreName,
        operation: &'static str,
    },

    /// Malformed locked link or proxy link token.
    #[error("Invalid link: {0}")]
    InvalidLink(String),

    /// Signature or expiry check failed on a proxy link token.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Encryption or decryption failed.
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Async task did not reach a terminal phase within the retry budget.
    #[error("Task incomplete: {0}")]
    TaskIncomplete(String),

    /// Caller aborted a blocking wait.
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Backend returned an unexpected status or shape.
    #[error("{store}: upstream error: {message}")]
    Upstream { store: StoreName, message: String },

    /// Folder listing could not be flattened (e.g. depth bound exceeded).
    #[error("Corrupt listing: {0}")]
    CorruptListing(String),

    /// Transport-level failure talking to a backend.
    #[error("Network error: {0}")]
    Network(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Resource already exists.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for an upstream failure attributed to `store`.
    pub fn upstream(store: StoreName, message: impl Into<String>) -> Self {
        Self::Upstream {
            store,
            message: message.into(),
        }
    }

    /// Shorthand for a capability `store` does not offer.
    pub fn unsupported(store: StoreName, operation: &'static str) -> Self {
        Self::Unsupported { store, operation }
    }

    /// Whether the call site may recover (e.g. report a queued item).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::TaskIncomplete(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_names_store_and_operation() {
        let err = Error::unsupported(StoreName::Seedr, "add_magnet");
        assert_eq!(err.to_string(), "seedr: add_magnet is not supported");
    }

    #[test]
    fn test_only_task_incomplete_is_recoverable() {
        assert!(Error::TaskIncomplete("phase running".into()).is_recoverable());
        assert!(!Error::Cancelled("request aborted".into()).is_recoverable());
        assert!(!Error::upstream(StoreName::PikPak, "500").is_recoverable());
    }
}
