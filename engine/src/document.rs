//! JSON:API documents.

use crate::{Resource, ResourceIdentifier};
use serde::{Deserialize, Serialize};

/// Primary data of a document: a single resource or a list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryData {
    Many(Vec<Resource>),
    One(Box<Resource>),
}

impl PrimaryData {
    pub fn as_slice(&self) -> &[Resource] {
        match self {
            PrimaryData::Many(resources) => resources,
            PrimaryData::One(resource) => std::slice::from_ref(resource.as_ref()),
        }
    }
}

/// A top-level document: primary data plus side-loaded resources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<PrimaryData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included: Option<Vec<Resource>>,
}

impl Document {
    /// A document with a single primary resource.
    pub fn one(resource: Resource) -> Self {
        Self {
            data: Some(PrimaryData::One(Box::new(resource))),
            included: None,
        }
    }

    /// A document with a list of primary resources.
    pub fn many(resources: Vec<Resource>) -> Self {
        Self {
            data: Some(PrimaryData::Many(resources)),
            included: None,
        }
    }

    /// Builder-style setter for side-loaded resources.
    pub fn with_included(mut self, included: Vec<Resource>) -> Self {
        self.included = Some(included);
        self
    }

    /// Primary resources, in document order.
    pub fn primary(&self) -> &[Resource] {
        self.data.as_ref().map(PrimaryData::as_slice).unwrap_or(&[])
    }

    /// Primary resources followed by included ones.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.primary()
            .iter()
            .chain(self.included.iter().flatten())
    }

    /// Identifiers of the primary resources that have an id, in order.
    pub fn primary_identifiers(&self) -> Vec<ResourceIdentifier> {
        self.primary()
            .iter()
            .filter_map(Resource::identifier)
            .collect()
    }
}
