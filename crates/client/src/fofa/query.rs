//! Encoding of field/value parameters into the `qbase64` query token.
//!
//! Clause forms, joined with ` && `:
//!
//! - boolean: `(key=true)`, unquoted
//! - list: `(key="a"||key="b")`
//! - anything else: `key="value"`
//!
//! Empty strings and empty lists are skipped. Keys are encoded whether or
//! not they appear in the requested field list.

use std::fmt;

use assetq_core::FieldSet;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};

/// A single query parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Bool(bool),
    Text(String),
    List(Vec<String>),
}

impl QueryValue {
    /// Empty strings and zero-length lists carry no constraint.
    pub fn is_empty(&self) -> bool {
        match self {
            QueryValue::Bool(_) => false,
            QueryValue::Text(s) => s.is_empty(),
            QueryValue::List(items) => items.is_empty(),
        }
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Bool(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(items: Vec<String>) -> Self {
        QueryValue::List(items)
    }
}

impl From<Vec<&str>> for QueryValue {
    fn from(items: Vec<&str>) -> Self {
        QueryValue::List(items.into_iter().map(str::to_string).collect())
    }
}

/// Query parameters in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, QueryValue)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, replacing an earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Builder-style [`QueryParams::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

impl<'de> Deserialize<'de> for QueryParams {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ParamsVisitor;

        impl<'de> Visitor<'de> for ParamsVisitor {
            type Value = QueryParams;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of query parameters")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut params = QueryParams::new();
                while let Some((key, value)) = map.next_entry::<String, QueryValue>()? {
                    params.insert(key, value);
                }
                Ok(params)
            }
        }

        deserializer.deserialize_map(ParamsVisitor)
    }
}

/// Base64 query token sent as `qbase64`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedQuery(String);

impl EncodedQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The plain query expression this token encodes.
    pub fn decoded(&self) -> String {
        BASE64
            .decode(self.0.as_bytes())
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Display for EncodedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build the plain query expression for `params`.
pub fn query_expression(fields: &FieldSet, params: &QueryParams) -> String {
    if fields.is_empty() || params.is_empty() {
        return String::new();
    }

    params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| match value {
            QueryValue::Bool(b) => format!("({key}={b})"),
            QueryValue::List(items) => {
                let alternatives: Vec<String> = items.iter().map(|item| format!("{key}=\"{item}\"")).collect();
                format!("({})", alternatives.join("||"))
            }
            QueryValue::Text(text) => format!("{key}=\"{text}\""),
        })
        .collect::<Vec<_>>()
        .join(" && ")
}

/// Encode `params` into the base64 query token.
pub fn encode_query(fields: &FieldSet, params: &QueryParams) -> EncodedQuery {
    EncodedQuery(BASE64.encode(query_expression(fields, params).as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fields() -> FieldSet {
        FieldSet::new(["link", "ip", "port"]).unwrap()
    }

    #[test]
    fn test_single_domain() {
        let params = QueryParams::new().with("domain", "example.com");
        let encoded = encode_query(&fields(), &params);

        assert!(!encoded.as_str().is_empty());
        assert_eq!(encoded.decoded(), r#"domain="example.com""#);
    }

    #[test]
    fn test_empty_list_dropped() {
        let params = QueryParams::new().with("tag", Vec::<String>::new()).with("country", "US");
        assert_eq!(encode_query(&fields(), &params).decoded(), r#"country="US""#);
    }

    #[test]
    fn test_clause_forms() {
        let params = QueryParams::new()
            .with("domain", "example.com")
            .with("is_domain", true)
            .with("port", vec!["80", "443"]);

        assert_eq!(
            query_expression(&fields(), &params),
            r#"domain="example.com" && (is_domain=true) && (port="80"||port="443")"#
        );
    }

    #[test]
    fn test_keys_outside_fields_are_encoded() {
        let params = QueryParams::new().with("cert.subject", "Acme");
        assert_eq!(query_expression(&fields(), &params), r#"cert.subject="Acme""#);
    }

    #[test]
    fn test_empty_inputs_match_baseline() {
        let baseline = encode_query(&FieldSet::empty(), &QueryParams::new());
        assert_eq!(baseline.as_str(), "");

        let params = QueryParams::new().with("domain", "example.com");
        assert_eq!(encode_query(&fields(), &QueryParams::new()), baseline);
        assert_eq!(encode_query(&FieldSet::empty(), &params), baseline);
    }

    #[test]
    fn test_insertion_order_preserved_from_json() {
        let params: QueryParams =
            serde_json::from_str(r#"{"title": "login", "domain": "example.com", "is_ipv6": false}"#).unwrap();

        assert_eq!(
            query_expression(&fields(), &params),
            r#"title="login" && domain="example.com" && (is_ipv6=false)"#
        );
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut params = QueryParams::new().with("a", "1").with("b", "2");
        params.insert("a", "3");
        assert_eq!(query_expression(&fields(), &params), r#"a="3" && b="2""#);
    }

    fn value_strategy() -> impl Strategy<Value = QueryValue> {
        prop_oneof![
            any::<bool>().prop_map(QueryValue::Bool),
            "[a-z0-9.]{0,6}".prop_map(QueryValue::Text),
            proptest::collection::vec("[a-z0-9]{1,4}", 0..3).prop_map(QueryValue::List),
        ]
    }

    fn params_strategy() -> impl Strategy<Value = QueryParams> {
        proptest::collection::vec(("[a-z]{1,6}", value_strategy()), 0..6)
            .prop_map(|pairs| pairs.into_iter().collect::<QueryParams>())
    }

    proptest! {
        #[test]
        fn prop_encoding_is_deterministic(params in params_strategy()) {
            prop_assert_eq!(encode_query(&fields(), &params), encode_query(&fields(), &params.clone()));
        }

        #[test]
        fn prop_empty_values_never_appear(params in params_strategy()) {
            let expression = query_expression(&fields(), &params);
            let clauses: Vec<&str> = expression.split(" && ").collect();
            for (key, value) in params.iter() {
                if value.is_empty() {
                    let prefix_eq = format!("{key}=");
                    let prefix_group = format!("({key}=");
                    prop_assert!(!clauses.iter().any(|c| c.starts_with(&prefix_eq) || c.starts_with(&prefix_group)));
                }
            }
        }

        #[test]
        fn prop_empty_fields_yield_baseline(params in params_strategy()) {
            let encoded = encode_query(&FieldSet::empty(), &params);
            prop_assert_eq!(encoded.as_str(), "");
        }
    }
}
