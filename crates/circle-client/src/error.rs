//! Backend client error types.

/// Errors from backend calls.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The backend returned a non-2xx status.
    #[error("{endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The backend rejected a write because it violates a uniqueness
    /// constraint (HTTP 409), e.g. a duplicate follow edge.
    #[error("{endpoint} conflicts with an existing row: {body}")]
    Conflict { endpoint: String, body: String },
    /// No row matched the request.
    #[error("{endpoint}: not found")]
    NotFound { endpoint: String },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The operation needs a signed-in user and there is none.
    #[error("not authenticated")]
    NotAuthenticated,
    /// A user attempted to follow themselves.
    #[error("a user cannot follow themselves")]
    SelfFollow,
    /// Realtime socket failure.
    #[error("realtime error: {0}")]
    Realtime(String),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] super::config::ConfigError),
}
