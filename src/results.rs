//! Result pages and scan iterators.
//!
//! [`SearchPage`] wraps one bounded page of an engine response; the
//! [`SearchIterator`] wraps a server-side cursor into a lazy, forward-only,
//! finite sequence of raw hits. Both expose on-demand deserialization into
//! caller-supplied document types.

use std::collections::VecDeque;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::backend::ScrollCursor;
use crate::error::Result;

/// A single raw hit as returned by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawHit {
    /// The document identifier.
    pub id: String,
    /// The engine document type, when reported.
    pub doc_type: Option<String>,
    /// The relevance score, absent for sorted or scanned results.
    pub score: Option<f64>,
    /// The stored document source.
    pub source: Value,
    /// Sort values echoed back by the engine, when sorting was requested.
    pub sort_values: Option<Value>,
}

impl RawHit {
    /// Parse one hit from the engine's hit shape; `None` without an id.
    pub fn from_value(value: &Value) -> Option<RawHit> {
        let id = value.get("_id")?.as_str()?.to_string();
        Some(RawHit {
            id,
            doc_type: value
                .get("_type")
                .and_then(Value::as_str)
                .map(str::to_string),
            score: value.get("_score").and_then(Value::as_f64),
            source: value.get("_source").cloned().unwrap_or(Value::Null),
            sort_values: value.get("sort").cloned(),
        })
    }

    /// Deserialize the hit source into a caller-supplied document type.
    pub fn source_as<D: DeserializeOwned>(&self) -> Result<D> {
        Ok(serde_json::from_value(self.source.clone())?)
    }
}

/// One bounded page of search results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// The hits on this page.
    pub hits: Vec<RawHit>,
    /// Total matching documents across all pages.
    pub total: u64,
    /// Maximum score among the matches, when scored.
    pub max_score: Option<f64>,
    /// Aggregation buckets, when the query requested facets.
    pub aggregations: Option<Value>,
    /// The 1-based page this window covers.
    pub page: usize,
    /// The page size used for the window.
    pub page_size: usize,
    /// True when this page stands in for a failed engine call.
    pub degraded: bool,
}

impl SearchPage {
    /// Parse a page from a raw engine response.
    ///
    /// Tolerant of shape drift: missing sections yield empty defaults, and
    /// both total shapes (`10` and `{"value": 10}`) are accepted.
    pub fn from_response(raw: &Value, page: usize, page_size: usize) -> SearchPage {
        let hits_section = raw.get("hits");
        let total = hits_section
            .and_then(|section| section.get("total"))
            .map(parse_total)
            .unwrap_or(0);
        let max_score = hits_section
            .and_then(|section| section.get("max_score"))
            .and_then(Value::as_f64);
        let hits = hits_section
            .and_then(|section| section.get("hits"))
            .and_then(Value::as_array)
            .map(|entries| entries.iter().filter_map(RawHit::from_value).collect())
            .unwrap_or_default();

        SearchPage {
            hits,
            total,
            max_score,
            aggregations: raw.get("aggregations").cloned(),
            page,
            page_size,
            degraded: false,
        }
    }

    /// An empty page standing in for a failed engine call.
    pub fn degraded(page: usize, page_size: usize) -> SearchPage {
        SearchPage {
            page,
            page_size,
            degraded: true,
            ..SearchPage::default()
        }
    }

    /// Number of pages needed to cover every match.
    pub fn pages(&self) -> u64 {
        if self.page_size == 0 {
            return 0;
        }
        self.total.div_ceil(self.page_size as u64)
    }

    /// Deserialize every hit source into a caller-supplied document type.
    pub fn deserialize<D: DeserializeOwned>(&self) -> Result<Vec<D>> {
        self.hits.iter().map(RawHit::source_as).collect()
    }
}

fn parse_total(value: &Value) -> u64 {
    match value {
        Value::Number(number) => number.as_u64().unwrap_or(0),
        Value::Object(object) => object.get("value").and_then(Value::as_u64).unwrap_or(0),
        _ => 0,
    }
}

/// A lazy, forward-only, finite sequence of raw hits backed by a cursor.
///
/// Not restartable; open a new scan to re-read. A cursor failure mid-stream
/// is logged and ends the iteration.
pub struct SearchIterator {
    cursor: Option<Box<dyn ScrollCursor>>,
    buffer: VecDeque<RawHit>,
    failed: bool,
}

impl SearchIterator {
    /// Wrap an open cursor.
    pub fn new(cursor: Box<dyn ScrollCursor>) -> Self {
        SearchIterator {
            cursor: Some(cursor),
            buffer: VecDeque::new(),
            failed: false,
        }
    }

    /// An immediately exhausted iterator standing in for a failed open.
    pub fn failed() -> Self {
        SearchIterator {
            cursor: None,
            buffer: VecDeque::new(),
            failed: true,
        }
    }

    /// True when the scan could not be opened.
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Adapt into an iterator of deserialized documents.
    pub fn typed<D: DeserializeOwned>(self) -> impl Iterator<Item = Result<D>> {
        self.map(|hit| Ok(serde_json::from_value(hit.source)?))
    }
}

impl Iterator for SearchIterator {
    type Item = RawHit;

    fn next(&mut self) -> Option<RawHit> {
        loop {
            if let Some(hit) = self.buffer.pop_front() {
                return Some(hit);
            }
            let cursor = self.cursor.as_mut()?;
            match cursor.next_batch() {
                Ok(Some(batch)) => self.buffer.extend(batch),
                Ok(None) => {
                    self.cursor = None;
                    return None;
                }
                Err(err) => {
                    warn!("scan cursor failed mid-stream: {err}");
                    self.cursor = None;
                    return None;
                }
            }
        }
    }
}

impl std::fmt::Debug for SearchIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchIterator")
            .field("buffered", &self.buffer.len())
            .field("open", &self.cursor.is_some())
            .field("failed", &self.failed)
            .finish()
    }
}
