//! Query registry.
//!
//! A query is a named request whose result is a list of identifiers into the
//! store. Queries never own resource bodies, so they can be recomputed against
//! any later snapshot.

use crate::{
    error::Result, Error, QueryName, ResourceCollection, ResourceIdentifier, ResourceType,
};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Lifecycle status of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QueryStatus {
    #[default]
    Init,
    Success,
    Fail,
}

/// Request parameters of a query. Only the resource type is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Value>,
}

impl QueryParams {
    pub fn new(resource_type: impl Into<ResourceType>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            filter: None,
            sort: None,
            include: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// A registered query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub name: QueryName,
    pub params: QueryParams,
    pub status: QueryStatus,
    /// Identifiers of the last successful result, in result order
    pub results: Vec<ResourceIdentifier>,
    /// Diagnostic payload of the last failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl Query {
    fn new(name: QueryName, params: QueryParams) -> Self {
        Self {
            name,
            params,
            status: QueryStatus::Init,
            results: Vec::new(),
            error: None,
        }
    }

    /// Whether some result no longer exists in the collection.
    pub fn is_stale(&self, collection: &ResourceCollection) -> bool {
        self.results.iter().any(|id| !collection.contains(id))
    }
}

/// Registry of active queries, keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRegistry {
    queries: BTreeMap<QueryName, Arc<Query>>,
}

impl QueryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Query> {
        self.queries.get(name).map(Arc::as_ref)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.queries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Query> {
        self.queries.values().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Every identifier referenced by any query result.
    pub fn referenced(&self) -> impl Iterator<Item = &ResourceIdentifier> {
        self.iter().flat_map(|query| query.results.iter())
    }

    /// Create or replace a query; it starts in `Init` with no results.
    pub fn register(&self, name: impl Into<QueryName>, params: QueryParams) -> Self {
        let name = name.into();
        let mut next = self.clone();
        next.queries
            .insert(name.clone(), Arc::new(Query::new(name, params)));
        next
    }

    /// Record a successful result.
    pub fn resolve(&self, name: &str, results: Vec<ResourceIdentifier>) -> Result<Self> {
        self.update(name, |query| {
            query.status = QueryStatus::Success;
            query.results = results;
            query.error = None;
        })
    }

    /// Record a failure. The previous results stay visible.
    pub fn fail(&self, name: &str, error: Option<Value>) -> Result<Self> {
        self.update(name, |query| {
            query.status = QueryStatus::Fail;
            query.error = error;
        })
    }

    /// Mark a query as loading again, keeping its results.
    pub fn refresh(&self, name: &str) -> Result<Self> {
        self.update(name, |query| {
            query.status = QueryStatus::Init;
            query.error = None;
        })
    }

    /// Remove a query. Removing an unknown name returns an equal registry.
    pub fn remove(&self, name: &str) -> Self {
        let mut next = self.clone();
        next.queries.remove(name);
        next
    }

    fn update<F>(&self, name: &str, change: F) -> Result<Self>
    where
        F: FnOnce(&mut Query),
    {
        let current = self
            .queries
            .get(name)
            .ok_or_else(|| Error::QueryNotFound(name.to_string()))?;

        let mut query = Query::clone(current);
        change(&mut query);

        let mut next = self.clone();
        next.queries.insert(name.to_string(), Arc::new(query));
        Ok(next)
    }
}

impl Serialize for QueryRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.queries.iter().map(|(name, query)| (name, query.as_ref())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(values: &[&str]) -> Vec<ResourceIdentifier> {
        values
            .iter()
            .map(|id| ResourceIdentifier::new("Article", *id))
            .collect()
    }

    #[test]
    fn register_starts_in_init() {
        let registry = QueryRegistry::new().register("all", QueryParams::new("Article"));
        let query = registry.get("all").unwrap();

        assert_eq!(query.status, QueryStatus::Init);
        assert!(query.results.is_empty());
    }

    #[test]
    fn resolve_keeps_order() {
        let registry = QueryRegistry::new()
            .register("all", QueryParams::new("Article"))
            .resolve("all", ids(&["3", "1", "2"]))
            .unwrap();

        let query = registry.get("all").unwrap();
        assert_eq!(query.status, QueryStatus::Success);
        assert_eq!(query.results, ids(&["3", "1", "2"]));
    }

    #[test]
    fn fail_keeps_stale_results() {
        let registry = QueryRegistry::new()
            .register("all", QueryParams::new("Article"))
            .resolve("all", ids(&["1"]))
            .unwrap()
            .fail("all", Some(json!({"status": 500})))
            .unwrap();

        let query = registry.get("all").unwrap();
        assert_eq!(query.status, QueryStatus::Fail);
        assert_eq!(query.results, ids(&["1"]));
        assert_eq!(query.error, Some(json!({"status": 500})));
    }

    #[test]
    fn reregister_resets_results() {
        let registry = QueryRegistry::new()
            .register("q", QueryParams::new("Article"))
            .resolve("q", ids(&["1"]))
            .unwrap()
            .register("q", QueryParams::new("Article").with_filter(json!({"title": "A"})));

        let query = registry.get("q").unwrap();
        assert_eq!(query.status, QueryStatus::Init);
        assert!(query.results.is_empty());
        assert!(query.params.filter.is_some());
    }

    #[test]
    fn refresh_keeps_results() {
        let registry = QueryRegistry::new()
            .register("q", QueryParams::new("Article"))
            .resolve("q", ids(&["1"]))
            .unwrap()
            .refresh("q")
            .unwrap();

        let query = registry.get("q").unwrap();
        assert_eq!(query.status, QueryStatus::Init);
        assert_eq!(query.results, ids(&["1"]));
    }

    #[test]
    fn remove_unknown_is_noop() {
        let registry = QueryRegistry::new().register("q", QueryParams::new("Article"));
        assert_eq!(registry.remove("missing"), registry);
        assert!(registry.remove("q").is_empty());
    }

    #[test]
    fn resolve_unknown_is_an_error() {
        let result = QueryRegistry::new().resolve("missing", vec![]);
        assert!(matches!(result, Err(Error::QueryNotFound(name)) if name == "missing"));
    }

    #[test]
    fn previous_registry_untouched() {
        let before = QueryRegistry::new().register("q", QueryParams::new("Article"));
        let _after = before.resolve("q", ids(&["1"])).unwrap();
        assert_eq!(before.get("q").unwrap().status, QueryStatus::Init);
    }
}
