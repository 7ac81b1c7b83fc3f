//! Store - the immutable state snapshot.
//!
//! A `Store` is never modified once published. The transition engine clones
//! the previous snapshot (a handful of `Arc` bumps) and replaces only the
//! parts an event touches, so unmodified substructures stay shared.

use crate::{
    Query, QueryRegistry, ResourceCollection, ResourceDefinitions, ResourceIdentifier,
    StoredResource,
};
use serde::Serialize;
use std::sync::Arc;

/// Kinds of remote operation tracked by an in-flight flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Create,
    Read,
    Update,
    Delete,
    Apply,
}

/// One snapshot of the whole store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub(crate) is_creating: bool,
    pub(crate) is_reading: bool,
    pub(crate) is_updating: bool,
    pub(crate) is_deleting: bool,
    pub(crate) is_applying: bool,
    #[serde(rename = "resourcesDefinition")]
    pub(crate) resources_definition: Arc<ResourceDefinitions>,
    pub(crate) data: Arc<ResourceCollection>,
    pub(crate) queries: Arc<QueryRegistry>,
}

impl Store {
    /// Create the initial store: no data, no queries, nothing in flight.
    pub fn new(definitions: ResourceDefinitions) -> Self {
        Self::with_definitions(Arc::new(definitions))
    }

    /// Create an initial store sharing an existing definition table.
    pub fn with_definitions(definitions: Arc<ResourceDefinitions>) -> Self {
        Self {
            is_creating: false,
            is_reading: false,
            is_updating: false,
            is_deleting: false,
            is_applying: false,
            resources_definition: definitions,
            data: Arc::new(ResourceCollection::new()),
            queries: Arc::new(QueryRegistry::new()),
        }
    }

    pub fn is_creating(&self) -> bool {
        self.is_creating
    }

    pub fn is_reading(&self) -> bool {
        self.is_reading
    }

    pub fn is_updating(&self) -> bool {
        self.is_updating
    }

    pub fn is_deleting(&self) -> bool {
        self.is_deleting
    }

    pub fn is_applying(&self) -> bool {
        self.is_applying
    }

    /// Whether an operation of the given kind is in flight.
    pub fn is_pending(&self, kind: OperationKind) -> bool {
        match kind {
            OperationKind::Create => self.is_creating,
            OperationKind::Read => self.is_reading,
            OperationKind::Update => self.is_updating,
            OperationKind::Delete => self.is_deleting,
            OperationKind::Apply => self.is_applying,
        }
    }

    pub(crate) fn set_pending(&mut self, kind: OperationKind, pending: bool) {
        let flag = match kind {
            OperationKind::Create => &mut self.is_creating,
            OperationKind::Read => &mut self.is_reading,
            OperationKind::Update => &mut self.is_updating,
            OperationKind::Delete => &mut self.is_deleting,
            OperationKind::Apply => &mut self.is_applying,
        };
        *flag = pending;
    }

    pub fn definitions(&self) -> &ResourceDefinitions {
        &self.resources_definition
    }

    pub(crate) fn shared_definitions(&self) -> &Arc<ResourceDefinitions> {
        &self.resources_definition
    }

    /// The normalized resource collection.
    pub fn data(&self) -> &ResourceCollection {
        &self.data
    }

    /// Shared handle of the collection, for cheap identity comparisons.
    pub fn shared_data(&self) -> &Arc<ResourceCollection> {
        &self.data
    }

    pub fn queries(&self) -> &QueryRegistry {
        &self.queries
    }

    /// Get a resource by identifier.
    pub fn get(&self, identifier: &ResourceIdentifier) -> Option<&StoredResource> {
        self.data.get(identifier)
    }

    pub fn query(&self, name: &str) -> Option<&Query> {
        self.queries.get(name)
    }

    /// Resources of a query's last result, in result order.
    ///
    /// Results whose resource has left the store are skipped, so a stale query
    /// yields a partial list.
    pub fn query_results(&self, name: &str) -> Option<Vec<&StoredResource>> {
        self.queries.get(name).map(|query| {
            query
                .results
                .iter()
                .filter_map(|identifier| self.data.get(identifier))
                .collect()
        })
    }

    /// Count of resources with uncommitted local changes.
    pub fn pending_count(&self) -> usize {
        self.data.pending().count()
    }
}
