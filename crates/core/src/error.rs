//! Unified error types for assetq.
//!
//! Every message carries a stable upper-case code prefix so callers (and
//! log scrapers) can match on the failure class without parsing prose.

use arrow::error::ArrowError;

/// Unified error type for the asset cache and merge engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., a project name with path separators).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// The API payload could not be interpreted as a search result.
    #[error("MALFORMED_RESPONSE: {0}")]
    MalformedResponse(String),

    /// The search API reported an error in its response body.
    #[error("API_ERROR: {0}")]
    ApiError(String),

    /// The search API answered but matched zero assets.
    #[error("NO_ASSETS: {0}")]
    NoAssets(String),

    /// Request timed out.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// HTTP or transport failure.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Two tables share no column and cannot be merged.
    #[error("NO_COMMON_FIELDS: tables share no column")]
    NoCommonFields,

    /// Merge input is not a recognized tabular representation.
    #[error("TYPE_MISMATCH: {0}")]
    TypeMismatch(String),

    /// Reading a cache file failed.
    #[error("CACHE_READ: {0}")]
    CacheRead(String),

    /// Writing a cache file failed.
    #[error("CACHE_WRITE: {0}")]
    CacheWrite(String),

    /// Arrow compute or construction failure.
    #[error("TABLE_ERROR: {0}")]
    Arrow(#[from] ArrowError),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::CacheWrite(err.to_string())
    }
}

impl Error {
    /// Whether the error is a caller-recoverable merge rejection rather than
    /// a failure of the fetch pipeline.
    pub fn is_merge_rejection(&self) -> bool {
        matches!(self, Error::NoCommonFields | Error::TypeMismatch(_))
    }
}
