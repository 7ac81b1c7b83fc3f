//! Resource definitions and validation.
//!
//! The definition table is static configuration handed to the store at
//! start-up. It is never mutated; resources entering the store are checked
//! against it.

use crate::{error::Result, Error, Resource, ResourceType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cardinality of a declared relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RelationType {
    HasOne,
    HasMany,
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationType::HasOne => write!(f, "hasOne"),
            RelationType::HasMany => write!(f, "hasMany"),
        }
    }
}

/// Definition of a relationship on a resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipDefinition {
    /// Type of the related resource
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub relation_type: RelationType,
}

impl RelationshipDefinition {
    pub fn has_one(resource_type: impl Into<ResourceType>) -> Self {
        Self {
            resource_type: resource_type.into(),
            relation_type: RelationType::HasOne,
        }
    }

    pub fn has_many(resource_type: impl Into<ResourceType>) -> Self {
        Self {
            resource_type: resource_type.into(),
            relation_type: RelationType::HasMany,
        }
    }
}

/// Definition of one resource type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    /// Singular path segment, e.g. `article`
    pub path: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Collection path segment, e.g. `articles`
    pub collection_path: String,
    #[serde(default)]
    pub attributes: Vec<String>,
    #[serde(default)]
    pub relationships: BTreeMap<String, RelationshipDefinition>,
}

impl ResourceDefinition {
    /// Create a definition with no attributes or relationships.
    pub fn new(
        path: impl Into<String>,
        resource_type: impl Into<ResourceType>,
        collection_path: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            resource_type: resource_type.into(),
            collection_path: collection_path.into(),
            attributes: Vec::new(),
            relationships: BTreeMap::new(),
        }
    }

    pub fn with_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_relationship(
        mut self,
        name: impl Into<String>,
        relationship: RelationshipDefinition,
    ) -> Self {
        self.relationships.insert(name.into(), relationship);
        self
    }

    /// Check that every relationship on the resource is declared and has the
    /// declared cardinality.
    pub fn validate_resource(&self, resource: &Resource) -> Result<()> {
        for (name, relationship) in &resource.relationships {
            let declared =
                self.relationships
                    .get(name)
                    .ok_or_else(|| Error::UnknownRelationship {
                        resource_type: self.resource_type.clone(),
                        relationship: name.clone(),
                    })?;

            let got = relationship.data.relation_type();
            if got != declared.relation_type {
                return Err(Error::RelationshipShapeMismatch {
                    resource_type: self.resource_type.clone(),
                    relationship: name.clone(),
                    expected: declared.relation_type.to_string(),
                    got: got.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// The ordered table of resource definitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceDefinitions {
    definitions: Vec<ResourceDefinition>,
}

impl ResourceDefinitions {
    pub fn new(definitions: Vec<ResourceDefinition>) -> Self {
        Self { definitions }
    }

    /// Builder-style method to add a definition.
    pub fn with_definition(mut self, definition: ResourceDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Parse a definition table from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidDefinitions(e.to_string()))
    }

    /// Look up the definition of a resource type.
    pub fn get(&self, resource_type: &str) -> Result<&ResourceDefinition> {
        self.definitions
            .iter()
            .find(|d| d.resource_type == resource_type)
            .ok_or_else(|| Error::DefinitionNotFound(resource_type.to_string()))
    }

    /// Look up a definition by its singular or collection path.
    pub fn get_by_path(&self, path: &str) -> Result<&ResourceDefinition> {
        self.definitions
            .iter()
            .find(|d| d.path == path || d.collection_path == path)
            .ok_or_else(|| Error::PathNotFound(path.to_string()))
    }

    /// Singular path of a resource type.
    pub fn resource_path(&self, resource_type: &str) -> Result<&str> {
        self.get(resource_type).map(|d| d.path.as_str())
    }

    pub fn contains(&self, resource_type: &str) -> bool {
        self.get(resource_type).is_ok()
    }

    /// Validate a resource against its type's definition.
    pub fn validate_resource(&self, resource: &Resource) -> Result<()> {
        self.get(&resource.resource_type)?
            .validate_resource(resource)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResourceDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceIdentifier;

    fn test_definitions() -> ResourceDefinitions {
        ResourceDefinitions::from_json(
            r#"[
                {
                    "path": "article",
                    "type": "Article",
                    "collectionPath": "articles",
                    "attributes": ["title", "subtitle"],
                    "relationships": {
                        "author": {"type": "People", "relationType": "hasOne"},
                        "tags": {"type": "Tag", "relationType": "hasMany"}
                    }
                },
                {
                    "path": "person",
                    "type": "Person",
                    "collectionPath": "people",
                    "attributes": ["name"],
                    "relationships": {}
                }
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn resource_path_lookup() {
        let definitions = test_definitions();
        assert_eq!(definitions.resource_path("Article").unwrap(), "article");
        assert_eq!(definitions.len(), 2);
    }

    #[test]
    fn missing_definition_is_an_error() {
        let definitions = test_definitions();
        let result = definitions.resource_path("Spam");
        assert!(matches!(result, Err(Error::DefinitionNotFound(t)) if t == "Spam"));
    }

    #[test]
    fn lookup_by_collection_path() {
        let definitions = test_definitions();
        assert_eq!(
            definitions.get_by_path("people").unwrap().resource_type,
            "Person"
        );
        assert!(matches!(
            definitions.get_by_path("spam"),
            Err(Error::PathNotFound(_))
        ));
    }

    #[test]
    fn validate_declared_relationships() {
        let definitions = test_definitions();
        let resource = Resource::new("Article", "1")
            .with_to_one("author", Some(ResourceIdentifier::new("Person", "1")))
            .with_to_many("tags", vec![ResourceIdentifier::new("Tag", "a")]);

        assert!(definitions.validate_resource(&resource).is_ok());
    }

    #[test]
    fn validate_shape_mismatch() {
        let definitions = test_definitions();
        let resource = Resource::new("Article", "1").with_to_many("author", vec![]);

        let result = definitions.validate_resource(&resource);
        assert!(matches!(
            result,
            Err(Error::RelationshipShapeMismatch { relationship, .. }) if relationship == "author"
        ));
    }

    #[test]
    fn validate_unknown_relationship() {
        let definitions = test_definitions();
        let resource = Resource::new("Person", "1").with_to_one("pet", None);

        assert!(matches!(
            definitions.validate_resource(&resource),
            Err(Error::UnknownRelationship { .. })
        ));
    }

    #[test]
    fn invalid_json_rejected() {
        let result = ResourceDefinitions::from_json(r#"[{"path": "article"}]"#);
        assert!(matches!(result, Err(Error::InvalidDefinitions(_))));
    }

    #[test]
    fn builder_matches_json() {
        let built = ResourceDefinitions::default()
            .with_definition(
                ResourceDefinition::new("article", "Article", "articles")
                    .with_attributes(["title", "subtitle"])
                    .with_relationship("author", RelationshipDefinition::has_one("People"))
                    .with_relationship("tags", RelationshipDefinition::has_many("Tag")),
            )
            .with_definition(
                ResourceDefinition::new("person", "Person", "people").with_attributes(["name"]),
            );

        assert_eq!(built, test_definitions());
    }
}
