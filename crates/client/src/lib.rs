//! Client code for assetq.
//!
//! This crate provides the FOFA search client, query encoding, and the
//! fetch-or-reuse pipeline that feeds the asset cache.

pub mod assets;
pub mod fofa;

pub use assets::AssetQuery;
pub use fofa::{
    AssetSource, EncodedQuery, FofaClient, FofaConfig, FofaError, QueryParams, QueryValue, SearchRequest,
    SearchResponse, encode_query, query_expression,
};
