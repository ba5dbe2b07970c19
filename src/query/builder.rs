//! The search query builder.
//!
//! A [`SearchQuery`] wraps one logical query: an adapter descriptor plus the
//! raw request parameters. It derives the engine request body (text query,
//! facet filters, sorts, pagination window, aggregation requests, score
//! functions) and either executes it for a single page or opens a scan over
//! the full result set.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use trawler::adapter::{AdapterDescriptor, SearchField};
//! use trawler::params::QueryParams;
//! use trawler::query::SearchQuery;
//!
//! let descriptor = Arc::new(
//!     AdapterDescriptor::new("dataset")
//!         .with_fields([SearchField::boosted("title", 6.0)]),
//! );
//! let params = QueryParams::from_pairs([("q", "population -census")]);
//! let query = SearchQuery::new(descriptor, params);
//!
//! let body = query.body();
//! assert!(body.get("query").is_some());
//! ```

use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::{debug, error};
use url::Url;

use crate::adapter::descriptor::AdapterDescriptor;
use crate::adapter::registry;
use crate::backend::SearchBackend;
use crate::config::SearchConfig;
use crate::error::Result;
use crate::params::{ParamValue, QueryParams, sanitize_page, sanitize_page_size};
use crate::query::clause::{BoolClause, keyed};
use crate::results::{SearchIterator, SearchPage};

/// Leading characters matched literally before fuzziness applies.
const FUZZY_PREFIX_LENGTH: u64 = 2;

/// One logical search query over a single entity type.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    descriptor: Arc<AdapterDescriptor>,
    params: QueryParams,
    config: SearchConfig,
    page: usize,
    page_size: usize,
    seed: BoolClause,
}

impl SearchQuery {
    /// Create a query from a descriptor and raw request parameters.
    ///
    /// Paging parameters are normalized here: any missing or malformed
    /// `page` becomes 1, any unusable `page_size` becomes the configured
    /// default.
    pub fn new(descriptor: Arc<AdapterDescriptor>, params: QueryParams) -> Self {
        let config = SearchConfig::default();
        let page = sanitize_page(params.get("page"));
        let page_size = sanitize_page_size(params.get("page_size"), config.default_page_size);
        SearchQuery {
            descriptor,
            params,
            config,
            page,
            page_size,
            seed: BoolClause::new(),
        }
    }

    /// Create a query for a registered entity type.
    pub fn for_entity<T: 'static>(params: QueryParams) -> Result<Self> {
        let descriptor = registry::descriptor_of::<T>()?;
        Ok(SearchQuery::new(descriptor, params))
    }

    /// Replace the configuration, re-deriving the page size default.
    pub fn with_config(mut self, config: SearchConfig) -> Self {
        self.page_size =
            sanitize_page_size(self.params.get("page_size"), config.default_page_size);
        self.config = config;
        self
    }

    /// Seed the boolean query with a fixed clause, merged ahead of the text
    /// query and facet filters.
    pub fn with_seed_clause(mut self, seed: BoolClause) -> Self {
        self.seed = seed;
        self
    }

    /// The descriptor this query runs against.
    pub fn descriptor(&self) -> &Arc<AdapterDescriptor> {
        &self.descriptor
    }

    /// The raw request parameters.
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// The normalized 1-based page number.
    pub fn page(&self) -> usize {
        self.page
    }

    /// The normalized page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Build the free-text boolean fragment from the `q` parameter.
    ///
    /// Terms are whitespace-split; a `-` prefix moves a term into the
    /// must-not clause.
    pub fn text_query(&self) -> BoolClause {
        let terms: Vec<String> = match self.params.get("q") {
            Some(ParamValue::Text(text)) => {
                text.split_whitespace().map(str::to_string).collect()
            }
            Some(ParamValue::List(values)) => values.clone(),
            _ => Vec::new(),
        };

        let mut included = Vec::new();
        let mut excluded = Vec::new();
        for term in &terms {
            let term = term.trim();
            if term.is_empty() {
                continue;
            }
            match term.strip_prefix('-') {
                Some(rest) if !rest.is_empty() => excluded.push(rest.to_string()),
                Some(_) => {}
                None => included.push(term.to_string()),
            }
        }

        let mut clause = BoolClause::new();
        if !included.is_empty() {
            clause.add_must(self.multi_match(&included));
        }
        if !excluded.is_empty() {
            clause.add_must_not(self.multi_match(&excluded));
        }
        clause
    }

    fn multi_match(&self, terms: &[String]) -> Value {
        let mut inner = Map::new();
        inner.insert("query".to_string(), json!(terms.join(" ")));
        inner.insert(
            "type".to_string(),
            json!(self.descriptor.match_type.as_str()),
        );
        if !self.descriptor.fields.is_empty() {
            let fields: Vec<String> = self
                .descriptor
                .fields
                .iter()
                .map(ToString::to_string)
                .collect();
            inner.insert("fields".to_string(), json!(fields));
        }
        if let Some(analyzer) = &self.descriptor.analyzer {
            inner.insert("analyzer".to_string(), json!(analyzer));
        }
        if self.descriptor.fuzzy {
            inner.insert("fuzziness".to_string(), json!("AUTO"));
            inner.insert("prefix_length".to_string(), json!(FUZZY_PREFIX_LENGTH));
        }
        json!({"multi_match": Value::Object(inner)})
    }

    /// Merge every declared facet's filter clause for the parameters
    /// present on this request.
    pub fn facet_filter_query(&self) -> BoolClause {
        let mut merged = BoolClause::new();
        for (name, facet) in &self.descriptor.facets {
            if let Some(clause) = facet.filter_clause(name, &self.params) {
                merged.extend(clause);
            }
        }
        merged
    }

    /// The merged main query clause: seed, text query, and facet filters,
    /// degrading to match-all when nothing constrains the query.
    pub fn query_clause(&self) -> Value {
        let mut clause = self.seed.clone();
        clause.extend(self.text_query());
        clause.extend(self.facet_filter_query());
        clause.to_query()
    }

    /// Build sort clauses from the `sort` parameter.
    ///
    /// A `-` prefix means descending order on the mapped field; keys the
    /// descriptor does not declare are dropped.
    pub fn sort_clauses(&self) -> Vec<Value> {
        let entries: Vec<String> = match self.params.get("sort") {
            Some(ParamValue::Text(value)) => vec![value.clone()],
            Some(ParamValue::List(values)) => values.clone(),
            _ => Vec::new(),
        };

        let mut clauses = Vec::new();
        for entry in &entries {
            let (key, direction) = match entry.strip_prefix('-') {
                Some(rest) => (rest, "desc"),
                None => (entry.as_str(), "asc"),
            };
            match self.descriptor.sorts.get(key) {
                Some(sort) => clauses.push(keyed(&sort.field, json!(direction))),
                None => debug!(
                    doc_type = %self.descriptor.doc_type,
                    "dropping undeclared sort key: {key}"
                ),
            }
        }
        clauses
    }

    /// Facet names selected by the `facets` parameter: an explicit list
    /// intersected with the declared facets, or all of them for the `all`
    /// sentinel (or a bare `true` flag).
    pub fn requested_facets(&self) -> Vec<String> {
        let declared = &self.descriptor.facets;
        if declared.is_empty() {
            return Vec::new();
        }
        match self.params.get("facets") {
            Some(ParamValue::Flag(true)) => declared.keys().cloned().collect(),
            Some(ParamValue::Text(value)) if value == "all" => {
                declared.keys().cloned().collect()
            }
            Some(ParamValue::Text(value)) if declared.contains_key(value) => {
                vec![value.clone()]
            }
            Some(ParamValue::List(values)) => {
                if values.iter().any(|value| value == "all") {
                    declared.keys().cloned().collect()
                } else {
                    declared
                        .keys()
                        .filter(|key| values.iter().any(|value| value == *key))
                        .cloned()
                        .collect()
                }
            }
            _ => Vec::new(),
        }
    }

    /// Aggregation bucket requests for every requested facet, or `None`
    /// when no facet was requested.
    pub fn aggregation_requests(&self) -> Option<Value> {
        let mut aggregations = Map::new();
        for name in self.requested_facets() {
            if let Some(facet) = self.descriptor.facets.get(&name) {
                if let Some(requests) = facet.aggregation_request(&name) {
                    for (aggregation_name, spec) in requests {
                        aggregations.insert(aggregation_name, spec);
                    }
                }
            }
        }
        if aggregations.is_empty() {
            None
        } else {
            Some(Value::Object(aggregations))
        }
    }

    /// Compile every declared booster into its score-function spec.
    pub fn score_functions(&self) -> Vec<Value> {
        self.descriptor
            .boosters
            .iter()
            .map(|booster| booster.to_score_function())
            .collect()
    }

    /// Compose the full engine request body: sorts, pagination window,
    /// aggregations, no stored fields, and the main query (wrapped in a
    /// function-score envelope when the descriptor declares boosters).
    pub fn body(&self) -> Value {
        let mut body = Map::new();

        let sorts = self.sort_clauses();
        if !sorts.is_empty() {
            body.insert("sort".to_string(), Value::Array(sorts));
        }

        let start = (self.page - 1) * self.page_size;
        body.insert("from".to_string(), json!(start));
        body.insert("size".to_string(), json!(self.page_size));

        if let Some(aggregations) = self.aggregation_requests() {
            body.insert("aggregations".to_string(), aggregations);
        }

        // Only identifiers and metadata come back; documents are rebuilt
        // by the caller's codec.
        body.insert("fields".to_string(), json!([]));

        let query = self.query_clause();
        let query = if self.descriptor.boosters.is_empty() {
            query
        } else {
            json!({
                "function_score": {
                    "query": query,
                    "functions": self.score_functions(),
                    "boost_mode": "multiply",
                }
            })
        };
        body.insert("query".to_string(), query);

        Value::Object(body)
    }

    /// Execute the query for a single page.
    ///
    /// Backend failures are logged with the document type and raw
    /// parameters, then surfaced to the caller.
    pub fn execute(&self, backend: &dyn SearchBackend) -> Result<SearchPage> {
        let body = self.body();
        match backend.search(&self.descriptor.doc_type, &body) {
            Ok(raw) => Ok(SearchPage::from_response(&raw, self.page, self.page_size)),
            Err(err) => {
                error!(
                    doc_type = %self.descriptor.doc_type,
                    params = ?self.params,
                    "unable to execute search query: {err}"
                );
                Err(err)
            }
        }
    }

    /// Execute the query, degrading a backend failure into an empty page.
    ///
    /// The returned page is flagged `degraded` so callers can still tell
    /// "no results" from "query failed".
    pub fn execute_or_empty(&self, backend: &dyn SearchBackend) -> SearchPage {
        self.execute(backend)
            .unwrap_or_else(|_| SearchPage::degraded(self.page, self.page_size))
    }

    /// Open a scan over the full result set.
    ///
    /// The request body is built without its aggregations section: bucket
    /// computation is wasted work when walking the whole corpus. A failed
    /// open is logged and yields an immediately exhausted iterator.
    pub fn scan(&self, backend: &dyn SearchBackend) -> SearchIterator {
        let mut body = self.body();
        if let Some(object) = body.as_object_mut() {
            object.remove("aggregations");
        }
        match backend.scan(&self.descriptor.doc_type, &body) {
            Ok(cursor) => SearchIterator::new(cursor),
            Err(err) => {
                error!(
                    doc_type = %self.descriptor.doc_type,
                    params = ?self.params,
                    "unable to open search scan: {err}"
                );
                SearchIterator::failed()
            }
        }
    }

    /// Serialize the current parameters into a URL on `base`.
    ///
    /// `extra` pairs merge into the parameters: when `replace` is false an
    /// existing key accumulates values into a list, when true it is
    /// overwritten. Supplying any extra parameter drops `page`, so a new
    /// filter always lands on the first page. The `facets` parameter is
    /// never serialized; it is re-derived from context by the caller.
    pub fn to_url(&self, base: &str, replace: bool, extra: &[(&str, ParamValue)]) -> Result<String> {
        let mut params = self.params.clone();
        params.remove("facets");
        if !extra.is_empty() {
            params.remove("page");
            for (key, value) in extra {
                if !replace && params.contains(key) {
                    params.append(*key, value.clone());
                } else {
                    params.insert(*key, value.clone());
                }
            }
        }

        let mut url = Url::parse(base)?;
        url.set_query(None);
        if !params.is_empty() {
            let mut pairs: Vec<(String, String)> = params
                .iter()
                .flat_map(|(name, value)| {
                    value
                        .items()
                        .into_iter()
                        .map(move |item| (name.clone(), item))
                })
                .collect();
            pairs.sort();
            let mut serializer = url.query_pairs_mut();
            for (name, item) in &pairs {
                serializer.append_pair(name, item);
            }
        }
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::descriptor::{MatchType, SearchField};
    use crate::query::booster::{Booster, Origin};
    use crate::query::facet::Facet;

    fn descriptor() -> Arc<AdapterDescriptor> {
        Arc::new(
            AdapterDescriptor::new("organization")
                .with_fields([
                    SearchField::boosted("name", 6.0),
                    SearchField::new("description"),
                ])
                .fuzzy(true)
                .with_analyzer("i18n")
                .with_sort("name", "name.raw")
                .with_sort("followers", "metrics.followers")
                .with_facet("reuses", Facet::range("metrics.reuses"))
                .with_facet("public_services", Facet::boolean("public_service"))
                .with_facet("tag", Facet::terms("tags")),
        )
    }

    fn query(pairs: Vec<(&str, ParamValue)>) -> SearchQuery {
        SearchQuery::new(descriptor(), QueryParams::from_pairs(pairs))
    }

    #[test]
    fn test_paging_normalization() {
        let q = query(vec![("page", "3".into()), ("page_size", "2".into())]);
        assert_eq!(q.page(), 3);
        assert_eq!(q.page_size(), 2);
        assert_eq!(q.body()["from"], json!(4));
        assert_eq!(q.body()["size"], json!(2));

        let q = query(vec![("page", "zero".into()), ("page_size", "0".into())]);
        assert_eq!(q.page(), 1);
        assert_eq!(q.page_size(), SearchConfig::default().default_page_size);
    }

    #[test]
    fn test_config_override_rederives_page_size() {
        let q = query(vec![]).with_config(SearchConfig {
            default_page_size: 5,
        });
        assert_eq!(q.page_size(), 5);
    }

    #[test]
    fn test_text_query_excluded_terms() {
        let q = query(vec![("q", "paris -hotel".into())]);
        let clause = q.text_query();

        assert_eq!(clause.must.len(), 1);
        assert_eq!(clause.must_not.len(), 1);
        assert_eq!(clause.must[0]["multi_match"]["query"], json!("paris"));
        assert_eq!(clause.must_not[0]["multi_match"]["query"], json!("hotel"));
    }

    #[test]
    fn test_multi_match_shape() {
        let q = query(vec![("q", "paris".into())]);
        let clause = q.text_query();
        let multi_match = &clause.must[0]["multi_match"];

        assert_eq!(multi_match["type"], json!("best_fields"));
        assert_eq!(multi_match["fields"], json!(["name^6", "description"]));
        assert_eq!(multi_match["analyzer"], json!("i18n"));
        assert_eq!(multi_match["fuzziness"], json!("AUTO"));
        assert_eq!(multi_match["prefix_length"], json!(2));
    }

    #[test]
    fn test_multi_match_without_fuzziness() {
        let descriptor = Arc::new(
            AdapterDescriptor::new("dataset")
                .with_fields([SearchField::new("title")])
                .with_match_type(MatchType::CrossFields),
        );
        let q = SearchQuery::new(descriptor, QueryParams::from_pairs([("q", "population")]));
        let multi_match = &q.text_query().must[0]["multi_match"];

        assert_eq!(multi_match["type"], json!("cross_fields"));
        assert!(multi_match.get("fuzziness").is_none());
        assert!(multi_match.get("analyzer").is_none());
    }

    #[test]
    fn test_empty_query_degrades_to_match_all() {
        let q = query(vec![]);
        assert_eq!(q.query_clause(), json!({"match_all": {}}));
    }

    #[test]
    fn test_seed_clause_prevents_match_all() {
        let mut seed = BoolClause::new();
        seed.add_must(json!({"term": {"owner": "etalab"}}));
        let q = query(vec![]).with_seed_clause(seed);

        assert_eq!(
            q.query_clause(),
            json!({"bool": {"must": [{"term": {"owner": "etalab"}}]}})
        );
    }

    #[test]
    fn test_sort_clauses() {
        let q = query(vec![(
            "sort",
            ParamValue::list(["-followers", "name", "unknown"]),
        )]);
        assert_eq!(
            q.sort_clauses(),
            vec![
                json!({"metrics.followers": "desc"}),
                json!({"name.raw": "asc"}),
            ]
        );
    }

    #[test]
    fn test_requested_facets_selection() {
        let all = ["public_services", "reuses", "tag"];

        let q = query(vec![("facets", ParamValue::text("all"))]);
        assert_eq!(q.requested_facets(), all);

        let q = query(vec![("facets", ParamValue::Flag(true))]);
        assert_eq!(q.requested_facets(), all);

        let q = query(vec![("facets", ParamValue::list(["tag", "bogus"]))]);
        assert_eq!(q.requested_facets(), vec!["tag"]);

        let q = query(vec![("facets", ParamValue::Flag(false))]);
        assert!(q.requested_facets().is_empty());

        let q = query(vec![]);
        assert!(q.requested_facets().is_empty());
    }

    #[test]
    fn test_aggregation_requests() {
        let q = query(vec![("facets", ParamValue::list(["tag", "reuses"]))]);
        let aggregations = q.aggregation_requests().unwrap();

        assert_eq!(
            aggregations["tag"],
            json!({"terms": {"field": "tags", "size": 20}})
        );
        assert_eq!(
            aggregations["reuses"],
            json!({"stats": {"field": "metrics.reuses"}})
        );

        assert!(query(vec![]).aggregation_requests().is_none());
    }

    #[test]
    fn test_body_composition() {
        let q = query(vec![
            ("q", "paris".into()),
            ("sort", "-followers".into()),
            ("facets", ParamValue::text("all")),
            ("public_services", ParamValue::Flag(true)),
        ]);
        let body = q.body();

        assert_eq!(body["sort"], json!([{"metrics.followers": "desc"}]));
        assert_eq!(body["from"], json!(0));
        assert_eq!(body["fields"], json!([]));
        assert!(body["aggregations"].is_object());

        let query_clause = &body["query"];
        let bool_clause = &query_clause["bool"];
        assert_eq!(bool_clause["must"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_boosters_wrap_query_in_function_score() {
        let descriptor = Arc::new(
            AdapterDescriptor::new("organization")
                .with_fields([SearchField::new("name")])
                .with_booster(Booster::bool_boost("public_service", 1.5))
                .with_booster(Booster::gauss_decay(
                    "metrics.followers",
                    Origin::Fixed(100.0),
                    0.8,
                )),
        );
        let q = SearchQuery::new(descriptor, QueryParams::new());
        let body = q.body();

        let envelope = &body["query"]["function_score"];
        assert_eq!(envelope["query"], json!({"match_all": {}}));
        assert_eq!(envelope["boost_mode"], json!("multiply"));
        assert_eq!(envelope["functions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_to_url_accumulates_values() {
        let q = query(vec![("tag", "food".into()), ("page", "2".into())]);

        let link = q
            .to_url("http://example.test/search", false, &[("tag", "drink".into())])
            .unwrap();
        assert_eq!(link, "http://example.test/search?tag=drink&tag=food");

        let link = q
            .to_url("http://example.test/search", true, &[("tag", "drink".into())])
            .unwrap();
        assert_eq!(link, "http://example.test/search?tag=drink");
    }

    #[test]
    fn test_to_url_keeps_page_without_extras() {
        let q = query(vec![("q", "paris".into()), ("page", "2".into())]);
        let link = q.to_url("http://example.test/search", false, &[]).unwrap();
        assert_eq!(link, "http://example.test/search?page=2&q=paris");
    }

    #[test]
    fn test_to_url_drops_facets_parameter() {
        let q = query(vec![
            ("q", "paris".into()),
            ("facets", ParamValue::text("all")),
        ]);
        let link = q.to_url("http://example.test/search", false, &[]).unwrap();
        assert_eq!(link, "http://example.test/search?q=paris");
    }
}
