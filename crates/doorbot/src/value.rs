// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Response body normalization.
//!
//! The provider emits 64-bit event identifiers next to a `created_at` field
//! and millisecond UTC timestamps as plain strings. Bodies are rewritten so
//! those identifiers arrive as strings, then parsed into [`ApiValue`], a JSON
//! tree that carries timestamps as [`DateTime<Utc>`].

use std::ops::Index;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

/// A parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Timestamp(DateTime<Utc>),
    Array(Vec<ApiValue>),
    Object(Vec<(String, ApiValue)>),
}

static NULL: ApiValue = ApiValue::Null;

impl ApiValue {
    /// Look up a key on an object.
    pub fn get(&self, key: &str) -> Option<&ApiValue> {
        match self {
            Self::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ApiValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Render back to plain JSON; timestamps become RFC 3339 strings.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Timestamp(ts) => {
                Value::String(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(fields) => {
                let mut map = Map::with_capacity(fields.len());
                for (k, v) in fields {
                    map.insert(k.clone(), v.to_json());
                }
                Value::Object(map)
            }
        }
    }

    /// Decode into a typed structure.
    pub fn deserialize<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_value(self.to_json())
    }
}

impl From<Value> for ApiValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => match parse_timestamp(&s) {
                Some(ts) => Self::Timestamp(ts),
                None => Self::String(s),
            },
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl Index<&str> for ApiValue {
    type Output = ApiValue;

    fn index(&self, key: &str) -> &ApiValue {
        self.get(key).unwrap_or(&NULL)
    }
}

impl Index<usize> for ApiValue {
    type Output = ApiValue;

    fn index(&self, idx: usize) -> &ApiValue {
        match self {
            Self::Array(items) => items.get(idx).unwrap_or(&NULL),
            _ => &NULL,
        }
    }
}

// Literal patterns; compilation cannot fail.
#[allow(clippy::expect_used)]
static BIG_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""id"\s*:\s*(\d+)\s*,\s*"created_at""#).expect("big id pattern")
});

#[allow(clippy::expect_used)]
static TIMESTAMP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z$").expect("timestamp pattern")
});

/// Quote numeric `id` fields that precede `created_at`.
pub fn quote_big_ids(raw: &str) -> std::borrow::Cow<'_, str> {
    BIG_ID.replace_all(raw, r#""id":"$1","created_at""#)
}

/// Parse a millisecond-precision UTC timestamp (`2017-01-05T19:05:40.000Z`).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if !TIMESTAMP.is_match(s) {
        return None;
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.3fZ").ok().map(|naive| naive.and_utc())
}

/// Normalize a raw response body.
///
/// Empty bodies become `Null`; bodies that are not JSON are kept verbatim
/// as a string.
pub fn normalize_body(raw: &str) -> ApiValue {
    if raw.trim().is_empty() {
        return ApiValue::Null;
    }
    let rewritten = quote_big_ids(raw);
    match serde_json::from_str::<Value>(&rewritten) {
        Ok(json) => ApiValue::from(json),
        Err(_) => ApiValue::String(raw.to_owned()),
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
