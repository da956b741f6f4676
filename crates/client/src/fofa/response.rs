//! Typed view over a FOFA search response.
//!
//! Only the envelope is typed; result rows stay as raw JSON so they can be
//! zipped against whatever field list was requested.

use serde::Deserialize;
use serde_json::Value;

use super::FofaError;

/// Envelope of a search response body.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub error: bool,

    #[serde(default)]
    pub errmsg: Option<String>,

    /// Total number of matching assets reported by the API.
    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub results: Vec<Value>,
}

impl SearchResponse {
    /// Parse the envelope out of a decoded payload.
    pub fn from_payload(payload: &Value) -> Result<Self, FofaError> {
        Self::deserialize(payload).map_err(|e| FofaError::Parse(e.to_string()))
    }
}
