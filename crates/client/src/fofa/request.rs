//! FOFA search request parameters and validation.

use assetq_core::FieldSet;
use serde::Serialize;

use super::FofaError;
use super::query::EncodedQuery;

/// Largest page the API serves in one request.
pub const MAX_SIZE: u32 = 10_000;

/// Search request parameters, serialized as the URL query string.
///
/// The API key is attached by the client and never stored here.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SearchRequest {
    /// Base64-encoded query expression.
    pub qbase64: String,

    /// Number of results per page.
    pub size: u32,

    /// Page number, 1-based.
    pub page: u32,

    /// Comma-joined result fields.
    pub fields: String,
}

impl SearchRequest {
    pub fn new(query: &EncodedQuery, fields: &FieldSet, size: u32, page: u32) -> Self {
        Self { qbase64: query.as_str().to_string(), size, page, fields: fields.joined() }
    }

    /// Validate the request parameters.
    ///
    /// Returns an error if any parameters are out of range.
    pub fn validate(&self) -> Result<(), FofaError> {
        if !(1..=MAX_SIZE).contains(&self.size) {
            return Err(FofaError::InvalidSize);
        }
        if self.page == 0 {
            return Err(FofaError::InvalidPage);
        }
        Ok(())
    }
}
