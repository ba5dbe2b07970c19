//! Inbound request parameters and their sanitization.
//!
//! This module defines the [`ParamValue`] enum covering the three value
//! shapes an HTTP layer hands over (a single string, a repeated parameter,
//! a boolean flag), the [`QueryParams`] mapping built from them, and the
//! pure paging coercions.
//!
//! Paging coercion is deliberately lenient: any missing or malformed value
//! falls back to a default instead of erroring.
//!
//! ```
//! use trawler::params::{ParamValue, sanitize_page};
//!
//! assert_eq!(sanitize_page(Some(&ParamValue::text("3"))), 3);
//! assert_eq!(sanitize_page(Some(&ParamValue::text("not-a-number"))), 1);
//! assert_eq!(sanitize_page(None), 1);
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A single inbound parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamValue {
    /// A single string value.
    Text(String),
    /// A repeated parameter carrying several values.
    List(Vec<String>),
    /// A boolean flag.
    Flag(bool),
}

impl ParamValue {
    /// Create a text value.
    pub fn text<S: Into<String>>(value: S) -> Self {
        ParamValue::Text(value.into())
    }

    /// Create a list value.
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ParamValue::List(values.into_iter().map(Into::into).collect())
    }

    /// View this value as a flat list of string items.
    pub fn items(&self) -> Vec<String> {
        match self {
            ParamValue::Text(s) => vec![s.clone()],
            ParamValue::List(values) => values.clone(),
            ParamValue::Flag(b) => vec![b.to_string()],
        }
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

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        ParamValue::List(values)
    }
}

/// The raw parameter mapping for one query execution.
///
/// One instance per request; values are whatever the inbound HTTP layer
/// parsed out of the URL query string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryParams {
    values: HashMap<String, ParamValue>,
}

impl QueryParams {
    /// Create an empty parameter mapping.
    pub fn new() -> Self {
        QueryParams::default()
    }

    /// Build a mapping from `(name, value)` pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ParamValue>,
    {
        let mut params = QueryParams::new();
        for (key, value) in pairs {
            params.insert(key, value);
        }
        params
    }

    /// Get a parameter value.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    /// Get a parameter as a single string, if it is a text value.
    pub fn get_text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get all items carried by a parameter, coerced to strings.
    ///
    /// Absent parameters yield an empty list.
    pub fn get_all(&self, name: &str) -> Vec<String> {
        self.values.get(name).map(ParamValue::items).unwrap_or_default()
    }

    /// Set a parameter, overwriting any previous value.
    pub fn insert<K: Into<String>, V: Into<ParamValue>>(&mut self, name: K, value: V) {
        self.values.insert(name.into(), value.into());
    }

    /// Append to a parameter, promoting a single value to a list.
    pub fn append<K: Into<String>, V: Into<ParamValue>>(&mut self, name: K, value: V) {
        let name = name.into();
        let mut items = match self.values.remove(&name) {
            Some(existing) => existing.items(),
            None => Vec::new(),
        };
        items.extend(value.into().items());
        self.values.insert(name, ParamValue::List(items));
    }

    /// Remove a parameter.
    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.values.remove(name)
    }

    /// Check whether a parameter is present.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(name, value)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.values.iter()
    }
}

/// Coerce a raw `page` parameter into a 1-based page number.
///
/// Missing, non-numeric, or sub-1 input resets to page 1.
pub fn sanitize_page(value: Option<&ParamValue>) -> usize {
    match value {
        Some(ParamValue::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(|page| page.max(1) as usize)
            .unwrap_or(1),
        _ => 1,
    }
}

/// Coerce a raw `page_size` parameter into a usable window size.
///
/// Missing, non-numeric, zero, or negative input resets to `default`.
pub fn sanitize_page_size(value: Option<&ParamValue>, default: usize) -> usize {
    match value {
        Some(ParamValue::Text(s)) => match s.trim().parse::<i64>() {
            Ok(size) if size > 0 => size as usize,
            _ => default,
        },
        _ => default,
    }
}
