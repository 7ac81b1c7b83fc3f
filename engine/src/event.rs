//! Events that drive store transitions.
//!
//! Every change to the store is expressed as an event, never as a direct
//! mutation. Events arrive as JSON objects tagged by `type`:
//!
//! ```json
//! { "type": "READ_SUCCESS", "payload": { "data": [...] }, "query": "articles" }
//! ```
//!
//! Unknown tags decode to [`Event::Unrecognized`], which leaves the store as
//! it is.

use crate::{
    error::Result, Document, Error, ErrorMode, QueryName, QueryParams, Resource, ResourceError,
    ResourceIdentifier,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Registration of a named query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub name: QueryName,
    pub params: QueryParams,
}

impl QueryRequest {
    pub fn new(name: impl Into<QueryName>, params: QueryParams) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// A locally computed query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResults {
    pub name: QueryName,
    /// Identifiers in result order
    pub results: Vec<ResourceIdentifier>,
}

/// Errors to attach to one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorsPayload {
    pub id: ResourceIdentifier,
    #[serde(default)]
    pub errors: Vec<ResourceError>,
    pub mode: ErrorMode,
}

/// An event accepted by [`crate::transition()`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    CreateInit,
    CreateSuccess {
        payload: Document,
    },
    CreateFail {
        #[serde(default)]
        payload: Option<Value>,
    },
    ReadInit {
        /// Query to register alongside the read
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query: Option<QueryRequest>,
    },
    ReadSuccess {
        payload: Document,
        /// Query to resolve with the primary identifiers
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query: Option<QueryName>,
    },
    ReadFail {
        #[serde(default)]
        payload: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        query: Option<QueryName>,
    },
    UpdateInit,
    UpdateSuccess {
        payload: Document,
    },
    UpdateFail {
        #[serde(default)]
        payload: Option<Value>,
    },
    DeleteInit,
    DeleteSuccess,
    DeleteFail {
        #[serde(default)]
        payload: Option<Value>,
    },
    ApplyInit,
    ApplySuccess {
        /// Server responses merged after the ledger commits
        #[serde(default)]
        payload: Vec<Document>,
    },
    ApplyFail {
        #[serde(default)]
        payload: Option<Value>,
    },
    Rollback,
    LocalQueryInit {
        payload: QueryRequest,
    },
    LocalQuerySuccess {
        payload: QueryResults,
    },
    DeleteStoreResource {
        payload: ResourceIdentifier,
    },
    PatchStoreResource {
        payload: Resource,
    },
    PostStoreResource {
        payload: Resource,
    },
    RemoveQuery {
        payload: QueryName,
    },
    ClearStore,
    CompactStore,
    ApiQueryRefresh {
        payload: QueryName,
    },
    ModifyStoreResourceErrors {
        payload: ErrorsPayload,
    },
    #[serde(other)]
    Unrecognized,
}

impl Event {
    /// Parse an event from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidEvent(e.to_string()))
    }

    /// Parse an event from an already decoded value.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidEvent(e.to_string()))
    }

    /// The wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::CreateInit => "CREATE_INIT",
            Event::CreateSuccess { .. } => "CREATE_SUCCESS",
            Event::CreateFail { .. } => "CREATE_FAIL",
            Event::ReadInit { .. } => "READ_INIT",
            Event::ReadSuccess { .. } => "READ_SUCCESS",
            Event::ReadFail { .. } => "READ_FAIL",
            Event::UpdateInit => "UPDATE_INIT",
            Event::UpdateSuccess { .. } => "UPDATE_SUCCESS",
            Event::UpdateFail { .. } => "UPDATE_FAIL",
            Event::DeleteInit => "DELETE_INIT",
            Event::DeleteSuccess => "DELETE_SUCCESS",
            Event::DeleteFail { .. } => "DELETE_FAIL",
            Event::ApplyInit => "APPLY_INIT",
            Event::ApplySuccess { .. } => "APPLY_SUCCESS",
            Event::ApplyFail { .. } => "APPLY_FAIL",
            Event::Rollback => "ROLLBACK",
            Event::LocalQueryInit { .. } => "LOCAL_QUERY_INIT",
            Event::LocalQuerySuccess { .. } => "LOCAL_QUERY_SUCCESS",
            Event::DeleteStoreResource { .. } => "DELETE_STORE_RESOURCE",
            Event::PatchStoreResource { .. } => "PATCH_STORE_RESOURCE",
            Event::PostStoreResource { .. } => "POST_STORE_RESOURCE",
            Event::RemoveQuery { .. } => "REMOVE_QUERY",
            Event::ClearStore => "CLEAR_STORE",
            Event::CompactStore => "COMPACT_STORE",
            Event::ApiQueryRefresh { .. } => "API_QUERY_REFRESH",
            Event::ModifyStoreResourceErrors { .. } => "MODIFY_STORE_RESOURCE_ERRORS",
            Event::Unrecognized => "UNRECOGNIZED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_tagged_events() {
        let event = Event::from_json(r#"{"type": "CREATE_INIT"}"#).unwrap();
        assert_eq!(event, Event::CreateInit);

        let event = Event::from_value(json!({
            "type": "READ_SUCCESS",
            "payload": {"data": [{"type": "Article", "id": "1"}]},
            "query": "all"
        }))
        .unwrap();
        match event {
            Event::ReadSuccess { payload, query } => {
                assert_eq!(payload.primary().len(), 1);
                assert_eq!(query.as_deref(), Some("all"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn fail_payload_is_optional() {
        let event = Event::from_json(r#"{"type": "UPDATE_FAIL"}"#).unwrap();
        assert_eq!(event, Event::UpdateFail { payload: None });
    }

    #[test]
    fn unknown_tag_is_unrecognized() {
        let event = Event::from_json(r#"{"type": "SOMETHING_ELSE", "payload": 1}"#).unwrap();
        assert_eq!(event, Event::Unrecognized);
    }

    #[test]
    fn malformed_payload_is_rejected() {
        let result = Event::from_json(r#"{"type": "PATCH_STORE_RESOURCE", "payload": 42}"#);
        assert!(matches!(result, Err(Error::InvalidEvent(_))));

        assert!(Event::from_json("not json").is_err());
    }

    #[test]
    fn modify_errors_payload() {
        let event = Event::from_value(json!({
            "type": "MODIFY_STORE_RESOURCE_ERRORS",
            "payload": {
                "id": {"type": "Article", "id": "1"},
                "errors": [{"title": "required", "source": {"pointer": "/data/attributes/title"}}],
                "mode": "REPLACE_TYPE_SCOPED"
            }
        }))
        .unwrap();

        match event {
            Event::ModifyStoreResourceErrors { payload } => {
                assert_eq!(payload.mode, ErrorMode::ReplaceTypeScoped);
                assert_eq!(payload.errors.len(), 1);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn kind_matches_wire_tag() {
        let events = vec![
            Event::ApiQueryRefresh {
                payload: "all".to_string(),
            },
            Event::ClearStore,
            Event::LocalQueryInit {
                payload: QueryRequest::new("all", QueryParams::new("Article")),
            },
        ];

        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.kind());
        }
    }
}
