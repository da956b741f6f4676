//! FOFA API client error types.

use std::sync::Arc;

use assetq_core::Error;

/// Errors from the FOFA search API client.
#[derive(Debug, thiserror::Error)]
pub enum FofaError {
    /// Missing API key.
    #[error("missing API key: ASSETQ_API_KEY not set")]
    MissingApiKey,

    /// Invalid page size (must be 1-10000).
    #[error("invalid size: must be 1-10000")]
    InvalidSize,

    /// Invalid page number (must be at least 1).
    #[error("invalid page: must be at least 1")]
    InvalidPage,

    /// Authentication failed (invalid API key).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// Rate limited by the API.
    #[error("rate limited: too many requests")]
    RateLimited,

    /// HTTP error response.
    #[error("HTTP error: {status}")]
    HttpError { status: u16 },

    /// Request timeout.
    #[error("request timeout")]
    Timeout,

    /// Network error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Response parse error.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FofaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { FofaError::Timeout } else { FofaError::Network(Arc::new(err)) }
    }
}

impl From<FofaError> for Error {
    fn from(err: FofaError) -> Self {
        let message = err.to_string();
        match err {
            FofaError::Timeout => {
                Error::FetchTimeout("search request timed out; reduce the page size or raise the timeout".into())
            }
            FofaError::Parse(msg) => Error::MalformedResponse(msg),
            FofaError::MissingApiKey | FofaError::InvalidSize | FofaError::InvalidPage => Error::InvalidInput(message),
            _ => Error::HttpError(message),
        }
    }
}
