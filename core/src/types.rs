//! Wire types exchanged with the mock server.
//!
//! # Design
//! Optional fields are `Option`s and are left out of the serialized form when
//! unset or empty: an empty header/query map, a missing body and a zero or
//! unset `times` never appear on the wire. `method`, `path` and `response`
//! are always written, `response` as `null` when absent.
//!
//! Decoding is lenient because the server reports unexpected calls without a
//! response and may omit either result list.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A request the mock server should expect, with the response it answers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedRequest {
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "is_unset_body")]
    pub body: Option<Value>,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub path: String,
    #[serde(default, skip_serializing_if = "is_unset_count")]
    pub times: Option<i64>,
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub query: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub response: Option<ResponseSpec>,
}

/// The response the mock server replies with once a request matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseSpec {
    #[serde(default, skip_serializing_if = "is_empty_map")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "is_unset_body")]
    pub body: Option<Value>,
    #[serde(default)]
    pub status: i64,
}

/// Pending expectations and observed-but-unregistered calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub expected: Vec<ExpectedRequest>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub unexpected: Vec<ExpectedRequest>,
}

impl ExpectedRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>, response: ResponseSpec) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            response: Some(response),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// How many matching calls the server should answer. Zero means unspecified.
    pub fn times(mut self, times: i64) -> Self {
        self.times = Some(times);
        self
    }
}

impl ResponseSpec {
    pub fn new(status: u16) -> Self {
        Self {
            status: i64::from(status),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl ResultSet {
    pub fn is_empty(&self) -> bool {
        self.expected.is_empty() && self.unexpected.is_empty()
    }
}

fn is_empty_map(map: &Option<BTreeMap<String, String>>) -> bool {
    map.as_ref().is_none_or(BTreeMap::is_empty)
}

fn is_unset_count(times: &Option<i64>) -> bool {
    matches!(times, None | Some(0))
}

fn is_unset_body(body: &Option<Value>) -> bool {
    matches!(body, None | Some(Value::Null))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
