//! The flat resource collection.
//!
//! Entries are reference counted so that snapshots share every resource a
//! transition did not touch. A collection value is never changed once it is
//! reachable from a published store; transitions build a new one.

use crate::{ResourceIdentifier, StoredResource};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::sync::Arc;

/// An ordered collection of stored resources, unique by (type, id).
///
/// Resources without an id are kept in insertion order but never indexed.
#[derive(Debug, Clone, Default)]
pub struct ResourceCollection {
    entries: Vec<Arc<StoredResource>>,
    index: HashMap<ResourceIdentifier, usize>,
}

impl ResourceCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a resource by identifier.
    pub fn get(&self, identifier: &ResourceIdentifier) -> Option<&StoredResource> {
        self.get_shared(identifier).map(Arc::as_ref)
    }

    /// Get the shared handle of a resource by identifier.
    pub fn get_shared(&self, identifier: &ResourceIdentifier) -> Option<&Arc<StoredResource>> {
        self.index.get(identifier).map(|&pos| &self.entries[pos])
    }

    /// Whether a resource with this identity is stored.
    pub fn contains(&self, identifier: &ResourceIdentifier) -> bool {
        self.index.contains_key(identifier)
    }

    /// Position of a resource in insertion order.
    pub fn position(&self, identifier: &ResourceIdentifier) -> Option<usize> {
        self.index.get(identifier).copied()
    }

    /// Resource at a position.
    pub fn at(&self, position: usize) -> Option<&StoredResource> {
        self.entries.get(position).map(Arc::as_ref)
    }

    /// All resources in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &StoredResource> {
        self.entries.iter().map(Arc::as_ref)
    }

    /// All resources of one type, in insertion order.
    pub fn of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a StoredResource> + 'a {
        self.iter()
            .filter(move |r| r.resource.resource_type == resource_type)
    }

    /// Resources carrying an uncommitted local change.
    pub fn pending(&self) -> impl Iterator<Item = &StoredResource> {
        self.iter().filter(|r| r.is_pending())
    }

    /// Number of stored resources, pending ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether both collections share every entry by pointer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .zip(&other.entries)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }

    /// Append a resource. The caller guarantees its identity is not present.
    pub(crate) fn push(&mut self, resource: StoredResource) {
        if let Some(identifier) = resource.identifier() {
            self.index.insert(identifier, self.entries.len());
        }
        self.entries.push(Arc::new(resource));
    }

    /// Replace the resource at a position, keeping its place. A resource that
    /// gained an id is indexed; the caller guarantees that id is not taken.
    pub(crate) fn replace(&mut self, position: usize, resource: StoredResource) {
        if let Some(identifier) = resource.identifier() {
            self.index.insert(identifier, position);
        }
        self.entries[position] = Arc::new(resource);
    }

    /// Keep only resources matching the predicate. Returns how many were dropped.
    pub(crate) fn retain<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&StoredResource) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|entry| keep(entry));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            self.reindex();
        }
        dropped
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(pos, entry)| entry.identifier().map(|id| (id, pos)))
            .collect();
    }
}

impl PartialEq for ResourceCollection {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl FromIterator<StoredResource> for ResourceCollection {
    fn from_iter<I: IntoIterator<Item = StoredResource>>(iter: I) -> Self {
        let mut collection = Self::new();
        for resource in iter {
            collection.push(resource);
        }
        collection
    }
}

impl Serialize for ResourceCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Resource;

    fn article(id: &str) -> StoredResource {
        StoredResource::in_sync(Resource::new("Article", id))
    }

    #[test]
    fn lookup_by_identifier() {
        let collection: ResourceCollection = vec![article("1"), article("2")].into_iter().collect();

        let id = ResourceIdentifier::new("Article", "2");
        assert_eq!(collection.position(&id), Some(1));
        assert!(collection.contains(&id));
        assert!(collection.get(&ResourceIdentifier::new("Article", "3")).is_none());
    }

    #[test]
    fn unsaved_resources_are_not_indexed() {
        let mut collection = ResourceCollection::new();
        collection.push(StoredResource::in_sync(Resource::unsaved("Article")));
        collection.push(StoredResource::in_sync(Resource::unsaved("Article")));

        assert_eq!(collection.len(), 2);
        assert!(collection.index.is_empty());
    }

    #[test]
    fn retain_reindexes() {
        let mut collection: ResourceCollection =
            vec![article("1"), article("2"), article("3")].into_iter().collect();

        let dropped = collection.retain(|r| r.resource.id.as_deref() != Some("1"));
        assert_eq!(dropped, 1);
        assert_eq!(
            collection.position(&ResourceIdentifier::new("Article", "3")),
            Some(1)
        );
        assert!(!collection.contains(&ResourceIdentifier::new("Article", "1")));
    }

    #[test]
    fn clones_share_entries() {
        let collection: ResourceCollection = vec![article("1")].into_iter().collect();
        let copy = collection.clone();
        assert!(collection.ptr_eq(&copy));

        let mut changed = copy.clone();
        changed.replace(0, article("1"));
        assert!(!collection.ptr_eq(&changed));
        assert_eq!(collection, changed);
    }
}
