//! Facet variants: user-selectable filter dimensions backed by aggregations.
//!
//! Each variant exposes two operations: translating a request parameter into
//! a filter clause, and requesting the engine-side aggregation buckets that
//! power the facet display. Malformed filter values behave like absent ones.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::params::{ParamValue, QueryParams};
use crate::query::clause::{BoolClause, keyed};

/// Default bucket count for terms aggregations.
pub const DEFAULT_TERMS_SIZE: usize = 20;

lazy_static! {
    static ref RANGE_PATTERN: Regex = Regex::new(r"^(\d+)-(\d+)$").expect("valid range pattern");
    static ref DATE_RANGE_PATTERN: Regex =
        Regex::new(r"^(\d{4}-\d{2}-\d{2})-(\d{4}-\d{2}-\d{2})$")
            .expect("valid date range pattern");
}

/// A declarative facet definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facet {
    /// Term buckets over a keyword field; filters are exact term matches.
    Terms {
        /// The indexed field holding the terms.
        field: String,
        /// Maximum number of buckets to request.
        size: usize,
    },
    /// A boolean flag field; filtering selects or excludes flagged documents.
    Bool {
        /// The indexed boolean field.
        field: String,
    },
    /// A numeric field filtered by an inclusive `min-max` parameter.
    Range {
        /// The indexed numeric field.
        field: String,
    },
    /// A date field filtered by a `YYYY-MM-DD-YYYY-MM-DD` parameter.
    DateRange {
        /// The indexed date field.
        field: String,
    },
}

impl Facet {
    /// Create a terms facet with the default bucket count.
    pub fn terms<S: Into<String>>(field: S) -> Self {
        Facet::Terms {
            field: field.into(),
            size: DEFAULT_TERMS_SIZE,
        }
    }

    /// Create a terms facet with an explicit bucket count.
    pub fn terms_sized<S: Into<String>>(field: S, size: usize) -> Self {
        Facet::Terms {
            field: field.into(),
            size,
        }
    }

    /// Create a boolean facet.
    pub fn boolean<S: Into<String>>(field: S) -> Self {
        Facet::Bool {
            field: field.into(),
        }
    }

    /// Create a numeric range facet.
    pub fn range<S: Into<String>>(field: S) -> Self {
        Facet::Range {
            field: field.into(),
        }
    }

    /// Create a date range facet.
    pub fn date_range<S: Into<String>>(field: S) -> Self {
        Facet::DateRange {
            field: field.into(),
        }
    }

    /// The indexed field this facet operates on.
    pub fn field(&self) -> &str {
        match self {
            Facet::Terms { field, .. }
            | Facet::Bool { field }
            | Facet::Range { field }
            | Facet::DateRange { field } => field,
        }
    }

    /// Translate the request parameter named after this facet into a filter
    /// clause. Returns `None` when the parameter is absent or malformed.
    pub fn filter_clause(&self, name: &str, params: &QueryParams) -> Option<BoolClause> {
        match self {
            Facet::Terms { field, .. } => {
                let mut clause = BoolClause::new();
                for value in params.get_all(name) {
                    if value.is_empty() {
                        continue;
                    }
                    clause.add_must(json!({"term": keyed(field, json!(value))}));
                }
                (!clause.is_empty()).then_some(clause)
            }
            Facet::Bool { field } => {
                let value = params.get(name)?;
                let flagged = match value {
                    ParamValue::Flag(flag) => *flag,
                    ParamValue::Text(text) => match text.as_str() {
                        "true" => true,
                        "false" => false,
                        _ => return None,
                    },
                    ParamValue::List(_) => return None,
                };
                let mut clause = BoolClause::new();
                let term = json!({"term": keyed(field, json!(true))});
                if flagged {
                    clause.add_must(term);
                } else {
                    clause.add_must_not(term);
                }
                Some(clause)
            }
            Facet::Range { field } => {
                let raw = params.get_all(name);
                let value = raw.first()?;
                let captures = RANGE_PATTERN.captures(value)?;
                let min = captures[1].parse::<i64>().ok()?;
                let max = captures[2].parse::<i64>().ok()?;
                if min > max {
                    return None;
                }
                let mut clause = BoolClause::new();
                clause.add_must(json!({
                    "range": keyed(field, json!({"gte": min, "lte": max}))
                }));
                Some(clause)
            }
            Facet::DateRange { field } => {
                let raw = params.get_all(name);
                let value = raw.first()?;
                let captures = DATE_RANGE_PATTERN.captures(value)?;
                let start = NaiveDate::parse_from_str(&captures[1], "%Y-%m-%d").ok()?;
                let end = NaiveDate::parse_from_str(&captures[2], "%Y-%m-%d").ok()?;
                if start > end {
                    return None;
                }
                let mut clause = BoolClause::new();
                clause.add_must(json!({
                    "range": keyed(
                        field,
                        json!({"gte": start.to_string(), "lte": end.to_string()})
                    )
                }));
                Some(clause)
            }
        }
    }

    /// Request the aggregation buckets for this facet, as named specs to
    /// attach to the engine request.
    pub fn aggregation_request(&self, name: &str) -> Option<Vec<(String, Value)>> {
        match self {
            Facet::Terms { field, size } => Some(vec![(
                name.to_string(),
                json!({"terms": {"field": field, "size": size}}),
            )]),
            Facet::Bool { field } => Some(vec![(
                name.to_string(),
                json!({"terms": {"field": field}}),
            )]),
            Facet::Range { field } => Some(vec![(
                name.to_string(),
                json!({"stats": {"field": field}}),
            )]),
            Facet::DateRange { field } => Some(vec![
                (format!("{name}_min"), json!({"min": {"field": field}})),
                (format!("{name}_max"), json!({"max": {"field": field}})),
            ]),
        }
    }
}
