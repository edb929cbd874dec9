//! Error types for the Constant Contact client.
//!
//! # Design
//! Non-2xx status codes are not errors here: the server answered, and the
//! answer is classified into an `Outcome` (see `outcome.rs`). `ApiError`
//! only covers the cases where no usable answer exists: bad local
//! configuration, a failed round-trip, or a body that does not decode.

use thiserror::Error;

/// Errors returned by the client and its transports.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Credentials or endpoint settings are missing or unusable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The HTTP round-trip itself failed (DNS, refused connection, timeout).
    /// The underlying transport error is kept as the source.
    #[error("transport failure: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A successful response body could not be deserialized into the
    /// expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ApiError::Transport(Box::new(err))
    }
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        ApiError::transport(err)
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
