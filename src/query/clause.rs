//! Boolean clause fragments for composing engine queries.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Occurrence requirements for boolean clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Occur {
    /// The clause must match (equivalent to AND).
    Must,
    /// The clause should match (equivalent to OR).
    Should,
    /// The clause must not match (equivalent to NOT).
    MustNot,
}

impl Occur {
    /// The engine's key name for this occurrence kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Occur::Must => "must",
            Occur::Should => "should",
            Occur::MustNot => "must_not",
        }
    }
}

/// A boolean query fragment holding clauses grouped by occurrence kind.
///
/// Fragments merge by kind, so a text query and a set of facet filters can
/// be built independently and combined afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolClause {
    /// Clauses that must match.
    pub must: Vec<Value>,
    /// Clauses that must not match.
    pub must_not: Vec<Value>,
    /// Clauses that should match.
    pub should: Vec<Value>,
}

impl BoolClause {
    /// Create an empty fragment.
    pub fn new() -> Self {
        BoolClause::default()
    }

    /// Add a clause under the given occurrence kind.
    pub fn add(&mut self, occur: Occur, clause: Value) {
        match occur {
            Occur::Must => self.must.push(clause),
            Occur::MustNot => self.must_not.push(clause),
            Occur::Should => self.should.push(clause),
        }
    }

    /// Add a MUST clause.
    pub fn add_must(&mut self, clause: Value) {
        self.add(Occur::Must, clause);
    }

    /// Add a MUST_NOT clause.
    pub fn add_must_not(&mut self, clause: Value) {
        self.add(Occur::MustNot, clause);
    }

    /// Add a SHOULD clause.
    pub fn add_should(&mut self, clause: Value) {
        self.add(Occur::Should, clause);
    }

    /// Merge another fragment into this one, kind by kind.
    pub fn extend(&mut self, other: BoolClause) {
        self.must.extend(other.must);
        self.must_not.extend(other.must_not);
        self.should.extend(other.should);
    }

    /// Check whether all three kinds are empty.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty() && self.must_not.is_empty() && self.should.is_empty()
    }

    /// Render this fragment as an engine query clause.
    ///
    /// Empty kinds are omitted; a fully empty fragment degrades to a
    /// match-everything clause so unfiltered browse queries stay valid.
    pub fn to_query(&self) -> Value {
        if self.is_empty() {
            return serde_json::json!({"match_all": {}});
        }
        let mut body = Map::new();
        if !self.must.is_empty() {
            body.insert("must".to_string(), Value::Array(self.must.clone()));
        }
        if !self.must_not.is_empty() {
            body.insert("must_not".to_string(), Value::Array(self.must_not.clone()));
        }
        if !self.should.is_empty() {
            body.insert("should".to_string(), Value::Array(self.should.clone()));
        }
        let mut query = Map::new();
        query.insert("bool".to_string(), Value::Object(body));
        Value::Object(query)
    }
}

/// Build a single-key JSON object, for clauses keyed by a field name.
pub(crate) fn keyed(key: &str, value: Value) -> Value {
    let mut object = Map::new();
    object.insert(key.to_string(), value);
    Value::Object(object)
}
