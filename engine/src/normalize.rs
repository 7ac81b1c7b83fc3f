//! Normalization of documents into the flat collection.
//!
//! # Merge rule
//!
//! Merging is two-level. For attributes, relationships and meta, every key
//! present in the incoming resource replaces the existing value wholesale; keys
//! absent from the incoming resource are left untouched. Values are never
//! merged below the key.
//!
//! # Document order
//!
//! Primary resources are folded before included ones, and the last write wins
//! per key. An included fragment therefore overrides a field the primary data
//! set for the same resource.

use crate::{Document, Relationship, Resource, ResourceCollection, StoredResource};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Merge two attribute (or meta) maps: incoming keys replace existing ones.
pub fn merge_attributes(
    existing: &Map<String, Value>,
    incoming: &Map<String, Value>,
) -> Map<String, Value> {
    let mut merged = existing.clone();
    for (key, value) in incoming {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Merge two relationship maps: incoming names replace existing linkage.
pub fn merge_relationships(
    existing: &BTreeMap<String, Relationship>,
    incoming: &BTreeMap<String, Relationship>,
) -> BTreeMap<String, Relationship> {
    let mut merged = existing.clone();
    for (name, relationship) in incoming {
        merged.insert(name.clone(), relationship.clone());
    }
    merged
}

/// Produce the resource resulting from applying `incoming` over `existing`.
///
/// Type and id always come from `existing`.
pub fn merge_resource(existing: &Resource, incoming: &Resource) -> Resource {
    let meta = match (&existing.meta, &incoming.meta) {
        (Some(existing), Some(incoming)) => Some(merge_attributes(existing, incoming)),
        (None, Some(incoming)) => Some(incoming.clone()),
        (existing, None) => existing.clone(),
    };

    Resource {
        resource_type: existing.resource_type.clone(),
        id: existing.id.clone(),
        attributes: merge_attributes(&existing.attributes, &incoming.attributes),
        relationships: merge_relationships(&existing.relationships, &incoming.relationships),
        meta,
    }
}

/// Fold one remote resource into the collection.
///
/// New identities are appended as in-sync. Known identities are merged in
/// place; their local status and errors are kept, and a pending resource's
/// persisted snapshot receives the same fragment.
pub fn update_or_insert(
    mut collection: ResourceCollection,
    resource: &Resource,
) -> ResourceCollection {
    let position = resource
        .identifier()
        .and_then(|identifier| collection.position(&identifier));

    let Some(position) = position else {
        tracing::trace!(
            resource_type = %resource.resource_type,
            id = ?resource.id,
            "inserting resource"
        );
        collection.push(StoredResource::in_sync(resource.clone()));
        return collection;
    };

    let merged = match collection.at(position) {
        Some(current) => {
            let merged = StoredResource {
                resource: merge_resource(&current.resource, resource),
                status: current.status,
                errors: current.errors.clone(),
                persisted: current
                    .persisted
                    .as_ref()
                    .map(|persisted| merge_resource(persisted, resource)),
            };
            (merged != *current).then_some(merged)
        }
        None => None,
    };

    if let Some(merged) = merged {
        tracing::trace!(
            resource_type = %resource.resource_type,
            id = ?resource.id,
            "merging resource"
        );
        collection.replace(position, merged);
    }

    collection
}

/// Fold a whole document into the collection.
///
/// A document without primary data returns the collection unchanged, even if
/// it carries included resources.
pub fn merge_document(collection: ResourceCollection, document: &Document) -> ResourceCollection {
    if document.data.is_none() {
        return collection;
    }

    document.resources().fold(collection, update_or_insert)
}
