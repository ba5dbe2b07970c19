//! The engine seam: a pluggable, blocking search transport.
//!
//! The query builder produces request bodies; everything network-shaped
//! lives behind [`SearchBackend`]. Connection pooling, timeouts, and retry
//! policy are implementation concerns, not part of this crate.

use serde_json::Value;

use crate::error::Result;
use crate::results::RawHit;

/// A blocking client for the external search engine.
pub trait SearchBackend: Send + Sync {
    /// Execute a bounded search request and return the raw response body.
    fn search(&self, doc_type: &str, body: &Value) -> Result<Value>;

    /// Open a server-side scrolling cursor over the full result set.
    fn scan(&self, doc_type: &str, body: &Value) -> Result<Box<dyn ScrollCursor>>;

    /// Register a document mapping for the given document type.
    fn put_mapping(&self, doc_type: &str, mapping: &Value) -> Result<()>;
}

/// A server-side cursor yielding raw hits in sequential batches.
///
/// Forward-only and finite: once a pull returns `None` the cursor is
/// drained and a new scan must be opened to re-read.
pub trait ScrollCursor {
    /// Pull the next batch of hits; `None` when the cursor is drained.
    fn next_batch(&mut self) -> Result<Option<Vec<RawHit>>>;
}
