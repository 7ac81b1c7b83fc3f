//! # JSON:API Store
//!
//! A normalized, immutable store for JSON:API resources.
//!
//! This crate holds resources fetched from a JSON:API server in a flat,
//! deduplicated collection, tracks local edits until they are committed or
//! rolled back, and keeps named queries as lists of identifiers. Every change
//! goes through one pure function, [`transition()`], that maps a snapshot and an
//! event to the next snapshot.
//!
//! ## Design Principles
//!
//! - **No IO**: The engine never talks to a server; callers feed it events
//! - **Immutable**: A published snapshot is never modified
//! - **Structural sharing**: Unchanged parts of a snapshot are shared by `Arc`
//! - **Deterministic**: Same snapshot and event always produce the same result
//!
//! ## Core Concepts
//!
//! ### Resources and Definitions
//!
//! A [`Resource`] is identified by its `(type, id)` pair. Every type the store
//! accepts is described by a [`ResourceDefinition`], which names its paths and
//! declares its relationships as [`RelationType::HasOne`] or
//! [`RelationType::HasMany`].
//!
//! ### Normalization
//!
//! Documents are folded into the [`ResourceCollection`] with a two-level merge:
//! each attribute or relationship present in the incoming resource replaces
//! the stored value, anything absent is left as it was. See [`normalize`].
//!
//! ### Pending Changes
//!
//! Local edits are staged on the stored resources themselves. A
//! [`StoredResource`] carries a [`ResourceStatus`], attached errors and the
//! last in-sync snapshot. [`Event::ApplySuccess`] commits all staged changes,
//! [`Event::Rollback`] discards them. See [`ledger`].
//!
//! ### Queries
//!
//! A [`Query`] records the identifiers of its last result. Results resolve
//! against the current collection, so a query whose resources were compacted
//! away reports partial results.
//!
//! ## Quick Start
//!
//! ```rust
//! use jsonapi_store::{
//!     transition, Document, Event, Resource, ResourceDefinition, ResourceDefinitions,
//!     ResourceIdentifier, ResourceStatus, Store,
//! };
//! use std::sync::Arc;
//!
//! // 1. Describe the resource types
//! let definitions = ResourceDefinitions::default()
//!     .with_definition(ResourceDefinition::new("article", "Article", "articles"));
//!
//! // 2. Create the initial snapshot
//! let store = Arc::new(Store::new(definitions));
//!
//! // 3. Feed it a server response
//! let store = transition(&store, Event::ReadInit { query: None }).unwrap();
//! let store = transition(
//!     &store,
//!     Event::ReadSuccess {
//!         payload: Document::one(Resource::new("Article", "1").with_attribute("title", "Hello")),
//!         query: None,
//!     },
//! )
//! .unwrap();
//!
//! // 4. Stage a local edit
//! let store = transition(
//!     &store,
//!     Event::PatchStoreResource {
//!         payload: Resource::new("Article", "1").with_attribute("title", "Edited"),
//!     },
//! )
//! .unwrap();
//!
//! let article = store.get(&ResourceIdentifier::new("Article", "1")).unwrap();
//! assert_eq!(article.status, ResourceStatus::Updated);
//! ```
//!
//! ## Observing
//!
//! [`StoreDispatcher`] owns the current snapshot and publishes every new one
//! on a `tokio::sync::watch` channel.

pub mod collection;
pub mod definition;
pub mod dispatcher;
pub mod document;
pub mod error;
pub mod event;
pub mod ledger;
pub mod normalize;
pub mod query;
pub mod resource;
pub mod store;
pub mod transition;

// Re-export main types at crate root
pub use collection::ResourceCollection;
pub use definition::{
    RelationType, RelationshipDefinition, ResourceDefinition, ResourceDefinitions,
};
pub use dispatcher::{StoreDispatcher, StoreReceiver};
pub use document::{Document, PrimaryData};
pub use error::{Error, Result};
pub use event::{ErrorsPayload, Event, QueryRequest, QueryResults};
pub use ledger::{ErrorMode, LedgerSummary, StagedChange};
pub use query::{Query, QueryParams, QueryRegistry, QueryStatus};
pub use resource::{
    ErrorSource, Relationship, RelationshipData, Resource, ResourceError, ResourceIdentifier,
    ResourceStatus, StoredResource,
};
pub use store::{OperationKind, Store};
pub use transition::transition;

/// Type aliases for clarity
pub type ResourceType = String;
pub type ResourceId = String;
pub type QueryName = String;
