//! Per-entity index descriptors.
//!
//! An [`AdapterDescriptor`] is the declarative, immutable configuration of
//! one entity type's search surface: which fields free text runs over (with
//! optional boost weights), which sort keys and facets are exposed, which
//! boosters shape relevance, and the mapping handed through to the engine.
//! A [`SearchAdapter`] couples the descriptor with the two domain hooks that
//! turn an entity into an indexable document.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::query::booster::Booster;
use crate::query::facet::Facet;

/// A searchable field with an optional boost weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchField {
    /// The indexed field name.
    pub name: String,
    /// Optional boost weight applied when matching this field.
    pub boost: Option<f32>,
}

impl SearchField {
    /// Create an unboosted field.
    pub fn new<S: Into<String>>(name: S) -> Self {
        SearchField {
            name: name.into(),
            boost: None,
        }
    }

    /// Create a boosted field.
    pub fn boosted<S: Into<String>>(name: S, boost: f32) -> Self {
        SearchField {
            name: name.into(),
            boost: Some(boost),
        }
    }
}

impl fmt::Display for SearchField {
    /// Render in the engine's `name^boost` form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.boost {
            Some(boost) => write!(f, "{}^{}", self.name, boost),
            None => write!(f, "{}", self.name),
        }
    }
}

impl From<&str> for SearchField {
    /// Parse the engine's `name^boost` form; an unparseable boost leaves
    /// the whole input as the field name.
    fn from(value: &str) -> Self {
        match value.split_once('^') {
            Some((name, boost)) => match boost.parse::<f32>() {
                Ok(boost) => SearchField::boosted(name, boost),
                Err(_) => SearchField::new(value),
            },
            None => SearchField::new(value),
        }
    }
}

/// Multi-field match strategies understood by the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    /// Score by the single best matching field.
    #[default]
    BestFields,
    /// Combine scores from every matching field.
    MostFields,
    /// Treat all fields as one combined field.
    CrossFields,
    /// Match the terms as a phrase.
    Phrase,
    /// Match the terms as a phrase prefix.
    PhrasePrefix,
}

impl MatchType {
    /// The engine's token for this match type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::BestFields => "best_fields",
            MatchType::MostFields => "most_fields",
            MatchType::CrossFields => "cross_fields",
            MatchType::Phrase => "phrase",
            MatchType::PhrasePrefix => "phrase_prefix",
        }
    }
}

/// Maps a public sort key to the underlying indexed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// The indexed field sorted on.
    pub field: String,
}

impl Sort {
    /// Create a sort mapping.
    pub fn new<S: Into<String>>(field: S) -> Self {
        Sort {
            field: field.into(),
        }
    }
}

/// Immutable per-entity search configuration.
///
/// Defined once at startup, read-only thereafter.
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterDescriptor {
    /// The engine document type this entity indexes into.
    pub doc_type: String,
    /// Fields free-text queries run over, in declaration order.
    pub fields: Vec<SearchField>,
    /// Whether approximate matching is allowed.
    pub fuzzy: bool,
    /// Multi-field match strategy.
    pub match_type: MatchType,
    /// Optional analyzer name passed through to the engine.
    pub analyzer: Option<String>,
    /// Exposed sort keys mapped to indexed fields.
    pub sorts: BTreeMap<String, Sort>,
    /// Exposed facet dimensions.
    pub facets: BTreeMap<String, Facet>,
    /// Score-function contributors, in declaration order.
    pub boosters: Vec<Booster>,
    /// Schema passed through to the engine, opaque to the query builder.
    pub mapping: Value,
}

impl AdapterDescriptor {
    /// Create a descriptor for the given document type.
    pub fn new<S: Into<String>>(doc_type: S) -> Self {
        AdapterDescriptor {
            doc_type: doc_type.into(),
            fields: Vec::new(),
            fuzzy: false,
            match_type: MatchType::default(),
            analyzer: None,
            sorts: BTreeMap::new(),
            facets: BTreeMap::new(),
            boosters: Vec::new(),
            mapping: Value::Null,
        }
    }

    /// Set the searchable fields.
    pub fn with_fields<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = SearchField>,
    {
        self.fields = fields.into_iter().collect();
        self
    }

    /// Enable or disable fuzzy matching.
    pub fn fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    /// Set the multi-field match strategy.
    pub fn with_match_type(mut self, match_type: MatchType) -> Self {
        self.match_type = match_type;
        self
    }

    /// Set the analyzer name.
    pub fn with_analyzer<S: Into<String>>(mut self, analyzer: S) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Expose a sort key.
    pub fn with_sort<K: Into<String>, F: Into<String>>(mut self, key: K, field: F) -> Self {
        self.sorts.insert(key.into(), Sort::new(field));
        self
    }

    /// Expose a facet dimension.
    pub fn with_facet<K: Into<String>>(mut self, name: K, facet: Facet) -> Self {
        self.facets.insert(name.into(), facet);
        self
    }

    /// Add a score-function contributor.
    pub fn with_booster(mut self, booster: Booster) -> Self {
        self.boosters.push(booster);
        self
    }

    /// Set the engine mapping.
    pub fn with_mapping(mut self, mapping: Value) -> Self {
        self.mapping = mapping;
        self
    }
}

/// A descriptor coupled with the hooks that turn entities into documents.
pub struct SearchAdapter<T> {
    descriptor: Arc<AdapterDescriptor>,
    serialize: fn(&T) -> Value,
    is_indexable: fn(&T) -> bool,
}

impl<T> SearchAdapter<T> {
    /// Create an adapter whose entities are all indexable.
    pub fn new(descriptor: AdapterDescriptor, serialize: fn(&T) -> Value) -> Self {
        SearchAdapter {
            descriptor: Arc::new(descriptor),
            serialize,
            is_indexable: |_| true,
        }
    }

    /// Restrict which entities are included in the index.
    pub fn with_indexable_check(mut self, is_indexable: fn(&T) -> bool) -> Self {
        self.is_indexable = is_indexable;
        self
    }

    /// The descriptor this adapter serves.
    pub fn descriptor(&self) -> &Arc<AdapterDescriptor> {
        &self.descriptor
    }

    /// Whether the entity belongs in the index.
    pub fn is_indexable(&self, entity: &T) -> bool {
        (self.is_indexable)(entity)
    }

    /// Serialize an entity into its indexable document, or `None` when the
    /// entity is excluded from the index.
    pub fn document(&self, entity: &T) -> Option<Value> {
        self.is_indexable(entity).then(|| (self.serialize)(entity))
    }
}

impl<T> fmt::Debug for SearchAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchAdapter")
            .field("descriptor", &self.descriptor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Organization {
        name: String,
        deleted: bool,
    }

    fn serialize_org(org: &Organization) -> Value {
        json!({"name": org.name})
    }

    #[test]
    fn test_search_field_display() {
        assert_eq!(SearchField::boosted("name", 6.0).to_string(), "name^6");
        assert_eq!(SearchField::new("description").to_string(), "description");
        assert_eq!(SearchField::boosted("title", 2.5).to_string(), "title^2.5");
    }

    #[test]
    fn test_search_field_parse() {
        assert_eq!(SearchField::from("name^6"), SearchField::boosted("name", 6.0));
        assert_eq!(SearchField::from("description"), SearchField::new("description"));
        assert_eq!(SearchField::from("name^x"), SearchField::new("name^x"));
    }

    #[test]
    fn test_match_type_tokens() {
        assert_eq!(MatchType::BestFields.as_str(), "best_fields");
        assert_eq!(MatchType::CrossFields.as_str(), "cross_fields");
        assert_eq!(MatchType::default(), MatchType::BestFields);
    }

    #[test]
    fn test_descriptor_builder() {
        let descriptor = AdapterDescriptor::new("organization")
            .with_fields([SearchField::boosted("name", 6.0), SearchField::new("description")])
            .fuzzy(true)
            .with_analyzer("i18n")
            .with_sort("name", "name.raw")
            .with_facet("public_services", Facet::boolean("public_service"))
            .with_booster(Booster::bool_boost("public_service", 1.5))
            .with_mapping(json!({"properties": {}}));

        assert_eq!(descriptor.doc_type, "organization");
        assert_eq!(descriptor.fields.len(), 2);
        assert!(descriptor.fuzzy);
        assert_eq!(descriptor.analyzer.as_deref(), Some("i18n"));
        assert_eq!(descriptor.sorts["name"].field, "name.raw");
        assert!(descriptor.facets.contains_key("public_services"));
        assert_eq!(descriptor.boosters.len(), 1);
    }

    #[test]
    fn test_adapter_document_respects_indexable_check() {
        let adapter = SearchAdapter::new(AdapterDescriptor::new("organization"), serialize_org)
            .with_indexable_check(|org: &Organization| !org.deleted);

        let live = Organization {
            name: "Etalab".to_string(),
            deleted: false,
        };
        let gone = Organization {
            name: "Defunct".to_string(),
            deleted: true,
        };

        assert_eq!(adapter.document(&live), Some(json!({"name": "Etalab"})));
        assert!(adapter.document(&gone).is_none());
        assert!(!adapter.is_indexable(&gone));
    }
}
