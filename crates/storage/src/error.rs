/// All errors that can be returned by a hierarchical or flat store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The store could not be reached (connection refused, DNS failure, ...).
    #[error("store at {endpoint} is unreachable: {message}")]
    Unreachable { endpoint: String, message: String },

    /// The request did not complete within its deadline.
    #[error("{operation} timed out")]
    Timeout { operation: String },

    /// The store answered with a non-success HTTP status.
    #[error("store returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// No key or directory exists at the requested path.
    #[error("key not found: {key}")]
    NotFound { key: String },

    /// The response body could not be decoded.
    #[error("malformed store response: {0}")]
    Decode(String),

    /// A backend-specific error with no better classification.
    #[error("storage backend error: {0}")]
    Backend(String),
}
