//! Pending-change ledger.
//!
//! Local edits are staged directly on the stored resources: each carries a
//! status and, while pending, the last in-sync snapshot it was derived from.
//! Committing or rolling back walks the whole collection and produces a new
//! one in a single step, so either every staged change settles or none does.

use crate::{
    error::Result, normalize::merge_resource, Error, QueryRegistry, Resource, ResourceCollection,
    ResourceError, ResourceIdentifier, ResourceStatus, StoredResource,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// A local change to stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "resource", rename_all = "camelCase")]
pub enum StagedChange {
    /// A new resource; its id may be absent
    Create(Resource),
    /// A partial update merged onto the local view
    Update(Resource),
    /// Mark a resource for deletion
    Delete(ResourceIdentifier),
}

/// How `set_errors` combines the given errors with existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorMode {
    /// Replace the resource's errors
    Set,
    /// Append errors not already present
    Add,
    /// Drop errors equal to the given ones
    Remove,
    /// Clear errors on every resource of the target's type, then set the
    /// target's errors
    ReplaceTypeScoped,
}

/// Counts reported by commit and rollback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    /// Resources now in sync
    pub settled: usize,
    /// Resources dropped from the collection
    pub removed: usize,
}

fn not_found(identifier: &ResourceIdentifier) -> Error {
    Error::ResourceNotFound {
        resource_type: identifier.resource_type.clone(),
        id: identifier.id.clone(),
    }
}

fn locate(collection: &ResourceCollection, identifier: &ResourceIdentifier) -> Result<usize> {
    collection
        .position(identifier)
        .ok_or_else(|| not_found(identifier))
}

/// Record a local change.
///
/// Repeated updates to the same resource compose into one pending update.
pub fn stage(collection: &ResourceCollection, change: StagedChange) -> Result<ResourceCollection> {
    match change {
        StagedChange::Create(resource) => stage_create(collection, resource),
        StagedChange::Update(resource) => stage_update(collection, resource),
        StagedChange::Delete(identifier) => stage_delete(collection, &identifier),
    }
}

fn stage_create(collection: &ResourceCollection, resource: Resource) -> Result<ResourceCollection> {
    if let Some(identifier) = resource.identifier() {
        if collection.contains(&identifier) {
            return Err(Error::ResourceAlreadyExists {
                resource_type: identifier.resource_type,
                id: identifier.id,
            });
        }
    }

    let mut next = collection.clone();
    next.push(StoredResource {
        resource,
        status: ResourceStatus::Created,
        errors: Vec::new(),
        persisted: None,
    });
    Ok(next)
}

fn stage_update(collection: &ResourceCollection, patch: Resource) -> Result<ResourceCollection> {
    let identifier = patch
        .identifier()
        .ok_or_else(|| Error::MissingResourceId(patch.resource_type.clone()))?;
    let position = locate(collection, &identifier)?;
    let current = collection
        .at(position)
        .ok_or_else(|| not_found(&identifier))?;

    let (status, persisted) = match current.status {
        ResourceStatus::Deleted => {
            return Err(Error::OperationOnDeleted {
                resource_type: identifier.resource_type,
                id: identifier.id,
            })
        }
        ResourceStatus::Created => (ResourceStatus::Created, None),
        ResourceStatus::InSync => (ResourceStatus::Updated, Some(current.resource.clone())),
        ResourceStatus::Updated => (ResourceStatus::Updated, current.persisted.clone()),
    };

    let resource = merge_resource(&current.resource, &patch);
    if resource == current.resource {
        return Ok(collection.clone());
    }

    let updated = StoredResource {
        resource,
        status,
        errors: current.errors.clone(),
        persisted,
    };

    let mut next = collection.clone();
    next.replace(position, updated);
    Ok(next)
}

fn stage_delete(
    collection: &ResourceCollection,
    identifier: &ResourceIdentifier,
) -> Result<ResourceCollection> {
    let position = locate(collection, identifier)?;
    let current = collection
        .at(position)
        .ok_or_else(|| not_found(identifier))?;

    let persisted = match current.status {
        ResourceStatus::Deleted => return Ok(collection.clone()),
        ResourceStatus::Created => {
            // Never reached the remote; nothing to delete there.
            let mut next = collection.clone();
            next.retain(|r| !r.resource.is(identifier));
            return Ok(next);
        }
        ResourceStatus::InSync => Some(current.resource.clone()),
        ResourceStatus::Updated => current.persisted.clone(),
    };

    let deleted = StoredResource {
        resource: current.resource.clone(),
        status: ResourceStatus::Deleted,
        errors: current.errors.clone(),
        persisted,
    };

    let mut next = collection.clone();
    next.replace(position, deleted);
    Ok(next)
}

/// Attach errors to a resource.
pub fn set_errors(
    collection: &ResourceCollection,
    target: &ResourceIdentifier,
    errors: Vec<ResourceError>,
    mode: ErrorMode,
) -> Result<ResourceCollection> {
    let position = locate(collection, target)?;
    let mut next = collection.clone();

    if mode == ErrorMode::ReplaceTypeScoped {
        for pos in 0..next.len() {
            let cleared = match next.at(pos) {
                Some(r)
                    if pos != position
                        && r.resource.resource_type == target.resource_type
                        && !r.errors.is_empty() =>
                {
                    Some(StoredResource {
                        errors: Vec::new(),
                        ..r.clone()
                    })
                }
                _ => None,
            };
            if let Some(cleared) = cleared {
                next.replace(pos, cleared);
            }
        }
    }

    let current = next.at(position).ok_or_else(|| not_found(target))?;
    let combined = match mode {
        ErrorMode::Set | ErrorMode::ReplaceTypeScoped => errors,
        ErrorMode::Add => {
            let mut combined = current.errors.clone();
            for error in errors {
                if !combined.contains(&error) {
                    combined.push(error);
                }
            }
            combined
        }
        ErrorMode::Remove => current
            .errors
            .iter()
            .filter(|existing| !errors.contains(existing))
            .cloned()
            .collect(),
    };

    if combined != current.errors {
        let updated = StoredResource {
            errors: combined,
            ..current.clone()
        };
        next.replace(position, updated);
    }

    Ok(next)
}

/// Commit every staged change.
///
/// Created and updated resources become in sync; deleted ones are removed.
/// A created resource without an id takes the id the remote assigned: it is
/// paired, in order, with the next response resource of its type that is not
/// already in the collection. One left without a counterpart is dropped.
pub fn apply<'a, I>(
    collection: &ResourceCollection,
    responses: I,
) -> (ResourceCollection, LedgerSummary)
where
    I: IntoIterator<Item = &'a Resource>,
{
    let mut assigned: HashMap<&str, VecDeque<&Resource>> = HashMap::new();
    let mut claimed = HashSet::new();
    for response in responses {
        let Some(identifier) = response.identifier() else {
            continue;
        };
        if !collection.contains(&identifier) && claimed.insert(identifier) {
            assigned
                .entry(response.resource_type.as_str())
                .or_default()
                .push_back(response);
        }
    }

    let mut summary = LedgerSummary::default();
    let mut next = collection.clone();

    for pos in 0..next.len() {
        let settled = match next.at(pos) {
            Some(r) if r.status == ResourceStatus::Created && r.resource.id.is_none() => assigned
                .get_mut(r.resource.resource_type.as_str())
                .and_then(VecDeque::pop_front)
                .map(|response| {
                    let mut resource = merge_resource(&r.resource, response);
                    resource.id = response.id.clone();
                    StoredResource::in_sync(resource)
                }),
            Some(r) if matches!(r.status, ResourceStatus::Created | ResourceStatus::Updated) => {
                Some(StoredResource::in_sync(r.resource.clone()))
            }
            _ => None,
        };
        if let Some(settled) = settled {
            next.replace(pos, settled);
            summary.settled += 1;
        }
    }

    // Whatever is still created here never received an id.
    summary.removed = next.retain(|r| {
        !matches!(r.status, ResourceStatus::Deleted | ResourceStatus::Created)
    });
    (next, summary)
}

/// Discard every staged change and every attached error.
///
/// Updated and deleted resources return to their persisted snapshot; created
/// ones are removed.
pub fn rollback(collection: &ResourceCollection) -> (ResourceCollection, LedgerSummary) {
    let mut summary = LedgerSummary::default();
    let mut next = collection.clone();

    for pos in 0..next.len() {
        let restored = match next.at(pos) {
            Some(r) if matches!(r.status, ResourceStatus::Updated | ResourceStatus::Deleted) => {
                summary.settled += 1;
                let snapshot = r.persisted.clone().unwrap_or_else(|| r.resource.clone());
                Some(StoredResource::in_sync(snapshot))
            }
            Some(r) if r.status == ResourceStatus::InSync && !r.errors.is_empty() => {
                Some(StoredResource::in_sync(r.resource.clone()))
            }
            _ => None,
        };
        if let Some(restored) = restored {
            next.replace(pos, restored);
        }
    }

    summary.removed = next.retain(|r| r.status != ResourceStatus::Created);
    (next, summary)
}

/// Identifiers a stored resource keeps alive: its own links and, while
/// pending, the links of the snapshot a rollback would restore.
fn retained_references(resource: &StoredResource) -> impl Iterator<Item = &ResourceIdentifier> {
    resource
        .resource
        .references()
        .chain(resource.persisted.iter().flat_map(Resource::references))
}

/// Drop in-sync resources that no query result, pending change or retained
/// relationship can reach. Returns how many were dropped.
pub fn compact(
    collection: &ResourceCollection,
    queries: &QueryRegistry,
) -> (ResourceCollection, usize) {
    let mut frontier: Vec<&ResourceIdentifier> = queries.referenced().collect();
    for pending in collection.pending() {
        frontier.extend(retained_references(pending));
    }

    let mut reachable: HashSet<&ResourceIdentifier> = HashSet::new();
    while let Some(identifier) = frontier.pop() {
        if !reachable.insert(identifier) {
            continue;
        }
        if let Some(resource) = collection.get(identifier) {
            frontier.extend(retained_references(resource));
        }
    }

    let mut next = collection.clone();
    let removed = next.retain(|r| {
        r.is_pending()
            || r
                .identifier()
                .is_some_and(|identifier| reachable.contains(&identifier))
    });
    (next, removed)
}
