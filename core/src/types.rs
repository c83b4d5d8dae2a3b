//! Caller-facing parameter values.
//!
//! # Design
//! The API accepts loosely typed parameters: strings, numbers, lists of
//! vessel identifiers, or "not given". `ParamValue` models exactly that set so
//! validators can tell an integer IMO from a string that merely looks like
//! one. `Params` keeps caller arguments in insertion order; key matching and
//! defaults are the builder's job, not this container's.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single parameter value as supplied by the caller.
///
/// Deserializes untagged, so `null`, `42`, `1.5`, `"json"` and
/// `[9228801, 9441271]` map to the obvious variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ParamValue::Null)
    }

    /// Wire form of the value. Lists are comma-joined.
    pub fn render(&self) -> String {
        match self {
            ParamValue::Null => String::new(),
            ParamValue::Int(n) => n.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Text(s) => s.clone(),
            ParamValue::List(items) => items
                .iter()
                .map(ParamValue::render)
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Scalars are viewed as a one-element list.
    pub fn elements(&self) -> &[ParamValue] {
        match self {
            ParamValue::List(items) => items,
            other => std::slice::from_ref(other),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(value.into())
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<Vec<i64>> for ParamValue {
    fn from(values: Vec<i64>) -> Self {
        ParamValue::List(values.into_iter().map(ParamValue::Int).collect())
    }
}

impl From<&[i64]> for ParamValue {
    fn from(values: &[i64]) -> Self {
        ParamValue::List(values.iter().copied().map(ParamValue::Int).collect())
    }
}

impl<const N: usize> From<[i64; N]> for ParamValue {
    fn from(values: [i64; N]) -> Self {
        ParamValue::List(values.into_iter().map(ParamValue::Int).collect())
    }
}

impl From<Vec<ParamValue>> for ParamValue {
    fn from(values: Vec<ParamValue>) -> Self {
        ParamValue::List(values)
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ParamValue::Null, Into::into)
    }
}

/// Optional caller arguments for an operation, in insertion order.
///
/// Keys are matched case-insensitively against the operation's schema when
/// the request is built; keys the operation does not know are dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace the entry with exactly this key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Exact-key lookup.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Body format the caller asked the service for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Xml,
}

impl Format {
    /// `xml` selects XML; anything else, including no `format` at all, is JSON.
    pub fn from_param(value: Option<&ParamValue>) -> Self {
        match value {
            Some(ParamValue::Text(s)) if s == "xml" => Format::Xml,
            _ => Format::Json,
        }
    }
}
