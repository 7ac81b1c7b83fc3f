//! Resource model.
//!
//! Resources follow the JSON:API resource object shape. Relationships only ever
//! hold identifiers; the body of a related resource lives in the store's flat
//! collection.

use crate::{RelationType, ResourceId, ResourceType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A (type, id) pair pointing at a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub id: ResourceId,
}

impl ResourceIdentifier {
    pub fn new(resource_type: impl Into<ResourceType>, id: impl Into<ResourceId>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: id.into(),
        }
    }
}

impl std::fmt::Display for ResourceIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.resource_type, self.id)
    }
}

/// Linkage data of a relationship.
///
/// `null` decodes as an empty to-one relationship; arrays decode as to-many.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipData {
    ToMany(Vec<ResourceIdentifier>),
    ToOne(Option<ResourceIdentifier>),
}

impl RelationshipData {
    /// Identifiers referenced by this linkage, in order.
    pub fn identifiers(&self) -> impl Iterator<Item = &ResourceIdentifier> {
        let (one, many) = match self {
            RelationshipData::ToOne(one) => (one.as_ref(), &[][..]),
            RelationshipData::ToMany(many) => (None, many.as_slice()),
        };
        one.into_iter().chain(many.iter())
    }

    /// Cardinality implied by the linkage shape.
    pub fn relation_type(&self) -> RelationType {
        match self {
            RelationshipData::ToOne(_) => RelationType::HasOne,
            RelationshipData::ToMany(_) => RelationType::HasMany,
        }
    }
}

/// A relationship object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub data: RelationshipData,
}

impl Relationship {
    pub fn to_one(target: Option<ResourceIdentifier>) -> Self {
        Self {
            data: RelationshipData::ToOne(target),
        }
    }

    pub fn to_many(targets: Vec<ResourceIdentifier>) -> Self {
        Self {
            data: RelationshipData::ToMany(targets),
        }
    }
}

/// A JSON:API resource object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// `None` for client-created resources that have not been persisted yet
    #[serde(default)]
    pub id: Option<ResourceId>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub relationships: BTreeMap<String, Relationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Map<String, Value>>,
}

impl Resource {
    /// Create an identified resource with no attributes or relationships.
    pub fn new(resource_type: impl Into<ResourceType>, id: impl Into<ResourceId>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: Some(id.into()),
            attributes: Map::new(),
            relationships: BTreeMap::new(),
            meta: None,
        }
    }

    /// Create a resource that has no id yet.
    pub fn unsaved(resource_type: impl Into<ResourceType>) -> Self {
        Self {
            resource_type: resource_type.into(),
            id: None,
            attributes: Map::new(),
            relationships: BTreeMap::new(),
            meta: None,
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder-style to-one relationship setter.
    pub fn with_to_one(
        mut self,
        name: impl Into<String>,
        target: Option<ResourceIdentifier>,
    ) -> Self {
        self.relationships
            .insert(name.into(), Relationship::to_one(target));
        self
    }

    /// Builder-style to-many relationship setter.
    pub fn with_to_many(
        mut self,
        name: impl Into<String>,
        targets: Vec<ResourceIdentifier>,
    ) -> Self {
        self.relationships
            .insert(name.into(), Relationship::to_many(targets));
        self
    }

    /// The identifier of this resource, if it has an id.
    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        self.id
            .as_ref()
            .map(|id| ResourceIdentifier::new(self.resource_type.clone(), id.clone()))
    }

    /// Whether this resource has the given identity.
    pub fn is(&self, identifier: &ResourceIdentifier) -> bool {
        self.resource_type == identifier.resource_type
            && self.id.as_deref() == Some(identifier.id.as_str())
    }

    /// All identifiers referenced through relationships.
    pub fn references(&self) -> impl Iterator<Item = &ResourceIdentifier> {
        self.relationships
            .values()
            .flat_map(|relationship| relationship.data.identifiers())
    }
}

/// Local persistence status of a stored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceStatus {
    /// Matches the last state confirmed by the remote
    #[default]
    InSync,
    /// Created locally, never confirmed
    Created,
    /// Patched locally, not yet confirmed
    Updated,
    /// Marked for deletion, still present until commit
    Deleted,
}

/// Where in the request an error originated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
}

/// A validation or remote error attached to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<ErrorSource>,
}

impl ResourceError {
    /// An error pointing at an attribute, JSON:API style.
    pub fn for_attribute(attribute: &str, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            source: Some(ErrorSource {
                pointer: Some(format!("/data/attributes/{attribute}")),
                parameter: None,
            }),
            ..Self::default()
        }
    }
}

/// A resource as held by the store, with its transient bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredResource {
    #[serde(flatten)]
    pub resource: Resource,
    #[serde(default)]
    pub status: ResourceStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ResourceError>,
    /// Last in-sync snapshot, kept while local edits are pending
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persisted: Option<Resource>,
}

impl StoredResource {
    /// Wrap a resource confirmed by the remote.
    pub fn in_sync(resource: Resource) -> Self {
        Self {
            resource,
            status: ResourceStatus::InSync,
            errors: Vec::new(),
            persisted: None,
        }
    }

    /// Check if the resource carries an uncommitted local change.
    pub fn is_pending(&self) -> bool {
        self.status != ResourceStatus::InSync
    }

    pub fn identifier(&self) -> Option<ResourceIdentifier> {
        self.resource.identifier()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_relationship_shapes() {
        let resource: Resource = serde_json::from_value(json!({
            "type": "Article",
            "id": "1",
            "attributes": {"title": "JSON API paints my bikeshed!"},
            "relationships": {
                "author": {"data": {"type": "Person", "id": "9"}},
                "editor": {"data": null},
                "tags": {"data": [{"type": "Tag", "id": "a"}, {"type": "Tag", "id": "b"}]}
            }
        }))
        .unwrap();

        assert_eq!(
            resource.relationships["author"].data,
            RelationshipData::ToOne(Some(ResourceIdentifier::new("Person", "9")))
        );
        assert_eq!(
            resource.relationships["editor"].data,
            RelationshipData::ToOne(None)
        );
        assert!(matches!(
            &resource.relationships["tags"].data,
            RelationshipData::ToMany(tags) if tags.len() == 2
        ));
    }

    #[test]
    fn missing_id_is_unsaved() {
        let resource: Resource = serde_json::from_value(json!({"type": "Article"})).unwrap();
        assert_eq!(resource, Resource::unsaved("Article"));
        assert!(resource.identifier().is_none());
    }

    #[test]
    fn references_in_order() {
        let resource = Resource::new("Article", "1")
            .with_to_one("author", Some(ResourceIdentifier::new("Person", "9")))
            .with_to_many(
                "tags",
                vec![
                    ResourceIdentifier::new("Tag", "a"),
                    ResourceIdentifier::new("Tag", "b"),
                ],
            );

        let refs: Vec<String> = resource.references().map(|r| r.to_string()).collect();
        assert_eq!(refs, vec!["Person/9", "Tag/a", "Tag/b"]);
    }

    #[test]
    fn transient_fields_skipped_when_default() {
        let stored = StoredResource::in_sync(Resource::new("Article", "1"));
        let value = serde_json::to_value(&stored).unwrap();
        assert_eq!(value, json!({"type": "Article", "id": "1", "status": "inSync"}));
    }

    #[test]
    fn attribute_error_pointer() {
        let error = ResourceError::for_attribute("title", "must not be blank");
        assert_eq!(
            error.source.unwrap().pointer.as_deref(),
            Some("/data/attributes/title")
        );
    }
}
