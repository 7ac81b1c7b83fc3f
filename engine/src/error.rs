//! Error types for the store engine.

use crate::{QueryName, ResourceType};
use thiserror::Error;

/// All possible errors from the store engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Definition errors
    #[error("definition not found for resource type: {0}")]
    DefinitionNotFound(ResourceType),

    #[error("definition not found for path: {0}")]
    PathNotFound(String),

    #[error("unknown relationship '{relationship}' on resource type {resource_type}")]
    UnknownRelationship {
        resource_type: ResourceType,
        relationship: String,
    },

    #[error("relationship '{relationship}' on {resource_type}: expected {expected}, got {got}")]
    RelationshipShapeMismatch {
        resource_type: ResourceType,
        relationship: String,
        expected: String,
        got: String,
    },

    #[error("invalid resource definitions: {0}")]
    InvalidDefinitions(String),

    // Ledger errors
    #[error("resource not found: {resource_type}/{id}")]
    ResourceNotFound { resource_type: ResourceType, id: String },

    #[error("resource already exists: {resource_type}/{id}")]
    ResourceAlreadyExists { resource_type: ResourceType, id: String },

    #[error("operation on deleted resource: {resource_type}/{id}")]
    OperationOnDeleted { resource_type: ResourceType, id: String },

    #[error("resource of type {0} has no id")]
    MissingResourceId(ResourceType),

    // Query errors
    #[error("query not found: {0}")]
    QueryNotFound(QueryName),

    // Boundary errors
    #[error("invalid event: {0}")]
    InvalidEvent(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::DefinitionNotFound("Spam".into());
        assert_eq!(
            err.to_string(),
            "definition not found for resource type: Spam"
        );

        let err = Error::ResourceNotFound {
            resource_type: "Article".into(),
            id: "1".into(),
        };
        assert_eq!(err.to_string(), "resource not found: Article/1");

        let err = Error::RelationshipShapeMismatch {
            resource_type: "Article".into(),
            relationship: "author".into(),
            expected: "hasOne".into(),
            got: "hasMany".into(),
        };
        assert_eq!(
            err.to_string(),
            "relationship 'author' on Article: expected hasOne, got hasMany"
        );
    }
}
