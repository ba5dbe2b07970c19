//! Error types for the Trawler library.
//!
//! All fallible operations return [`Result`], built on the [`TrawlerError`]
//! enum. Parameter coercion never errors (malformed paging input falls back
//! to defaults); adapter lookup and backend failures do.
//!
//! # Examples
//!
//! ```
//! use trawler::error::{Result, TrawlerError};
//!
//! fn lookup(name: &str) -> Result<()> {
//!     Err(TrawlerError::unknown_adapter(name))
//! }
//!
//! assert!(lookup("Dataset").is_err());
//! ```

use anyhow;
use thiserror::Error;

/// The main error type for Trawler operations.
#[derive(Error, Debug)]
pub enum TrawlerError {
    /// Parameter-related errors (malformed inbound values that cannot be
    /// recovered by default substitution).
    #[error("Parameter error: {0}")]
    InvalidParams(String),

    /// No adapter registered for the requested entity type.
    #[error("Unknown search adapter: {0}")]
    UnknownAdapter(String),

    /// An adapter was registered twice for the same entity type.
    #[error("Duplicate search adapter: {0}")]
    DuplicateAdapter(String),

    /// Transport, protocol, or server errors reported by the search engine.
    #[error("Backend error: {0}")]
    Backend(String),

    /// URL parsing errors while serializing query links.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization/deserialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic anyhow error, typically surfaced by backend implementations.
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with [`TrawlerError`].
pub type Result<T> = std::result::Result<T, TrawlerError>;

impl TrawlerError {
    /// Create a new parameter error.
    pub fn params<S: Into<String>>(msg: S) -> Self {
        TrawlerError::InvalidParams(msg.into())
    }

    /// Create a new unknown-adapter error.
    pub fn unknown_adapter<S: Into<String>>(entity: S) -> Self {
        TrawlerError::UnknownAdapter(entity.into())
    }

    /// Create a new duplicate-adapter error.
    pub fn duplicate_adapter<S: Into<String>>(entity: S) -> Self {
        TrawlerError::DuplicateAdapter(entity.into())
    }

    /// Create a new backend error.
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        TrawlerError::Backend(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = TrawlerError::unknown_adapter("Organization");
        assert_eq!(error.to_string(), "Unknown search adapter: Organization");

        let error = TrawlerError::duplicate_adapter("Organization");
        assert_eq!(error.to_string(), "Duplicate search adapter: Organization");

        let error = TrawlerError::backend("connection refused");
        assert_eq!(error.to_string(), "Backend error: connection refused");
    }

    #[test]
    fn test_json_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = TrawlerError::from(json_error);

        match error {
            TrawlerError::Json(_) => {}
            _ => panic!("Expected JSON error variant"),
        }
    }
}
