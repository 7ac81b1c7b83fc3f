//! The transition function.
//!
//! `transition` is the only way to derive a new snapshot. It never modifies
//! its input: on success it returns a fresh snapshot, or the very same `Arc`
//! when the event changes nothing; on error the input stays authoritative.

use crate::{
    error::Result, ledger, normalize, Document, ErrorsPayload, Event, OperationKind, QueryName,
    QueryRequest, QueryResults, ResourceCollection, StagedChange, Store,
};
use serde_json::Value;
use std::sync::Arc;

/// Derive the snapshot that follows `store` after `event`.
pub fn transition(store: &Arc<Store>, event: Event) -> Result<Arc<Store>> {
    let kind = event.kind();
    tracing::debug!(event = kind, "transition");

    let mut next = Store::clone(store);
    match event {
        Event::CreateInit => next.set_pending(OperationKind::Create, true),
        Event::CreateSuccess { payload } => {
            merge_payload(&mut next, &payload)?;
            next.set_pending(OperationKind::Create, false);
        }
        Event::CreateFail { payload } => {
            report_failure(kind, payload.as_ref());
            next.set_pending(OperationKind::Create, false);
        }

        Event::ReadInit { query } => {
            if let Some(request) = query {
                register_query(&mut next, request)?;
            }
            next.set_pending(OperationKind::Read, true);
        }
        Event::ReadSuccess { payload, query } => {
            merge_payload(&mut next, &payload)?;
            if let Some(name) = tracked_query(&next, query) {
                let results = payload.primary_identifiers();
                next.queries = Arc::new(next.queries.resolve(&name, results)?);
            }
            next.set_pending(OperationKind::Read, false);
        }
        Event::ReadFail { payload, query } => {
            report_failure(kind, payload.as_ref());
            if let Some(name) = tracked_query(&next, query) {
                next.queries = Arc::new(next.queries.fail(&name, payload)?);
            }
            next.set_pending(OperationKind::Read, false);
        }

        Event::UpdateInit => next.set_pending(OperationKind::Update, true),
        Event::UpdateSuccess { payload } => {
            merge_payload(&mut next, &payload)?;
            next.set_pending(OperationKind::Update, false);
        }
        Event::UpdateFail { payload } => {
            report_failure(kind, payload.as_ref());
            next.set_pending(OperationKind::Update, false);
        }

        Event::DeleteInit => next.set_pending(OperationKind::Delete, true),
        Event::DeleteSuccess => next.set_pending(OperationKind::Delete, false),
        Event::DeleteFail { payload } => {
            report_failure(kind, payload.as_ref());
            next.set_pending(OperationKind::Delete, false);
        }

        Event::ApplyInit => next.set_pending(OperationKind::Apply, true),
        Event::ApplySuccess { payload } => {
            commit(&mut next, &payload)?;
            next.set_pending(OperationKind::Apply, false);
        }
        Event::ApplyFail { payload } => {
            report_failure(kind, payload.as_ref());
            next.set_pending(OperationKind::Apply, false);
        }
        Event::Rollback => {
            let (data, summary) = ledger::rollback(&next.data);
            tracing::info!(
                settled = summary.settled,
                removed = summary.removed,
                "rolled back pending changes"
            );
            next.data = Arc::new(data);
        }

        Event::LocalQueryInit { payload } => register_query(&mut next, payload)?,
        Event::LocalQuerySuccess { payload } => resolve_local_query(&mut next, payload)?,

        Event::DeleteStoreResource { payload } => {
            next.definitions().get(&payload.resource_type)?;
            stage(&mut next, StagedChange::Delete(payload))?;
        }
        Event::PatchStoreResource { payload } => {
            next.definitions().validate_resource(&payload)?;
            stage(&mut next, StagedChange::Update(payload))?;
        }
        Event::PostStoreResource { payload } => {
            next.definitions().validate_resource(&payload)?;
            stage(&mut next, StagedChange::Create(payload))?;
        }
        Event::ModifyStoreResourceErrors { payload } => modify_errors(&mut next, payload)?,

        Event::RemoveQuery { payload } => {
            if !next.queries.contains(&payload) {
                return Ok(Arc::clone(store));
            }
            next.queries = Arc::new(next.queries.remove(&payload));
        }
        Event::ApiQueryRefresh { payload } => {
            if !next.queries.contains(&payload) {
                return Ok(Arc::clone(store));
            }
            next.queries = Arc::new(next.queries.refresh(&payload)?);
        }

        Event::ClearStore => {
            tracing::info!(resources = store.data.len(), "clearing store");
            next = Store::with_definitions(Arc::clone(store.shared_definitions()));
        }
        Event::CompactStore => {
            let (data, dropped) = ledger::compact(&next.data, &next.queries);
            tracing::info!(dropped, remaining = data.len(), "compacted store");
            if dropped > 0 {
                next.data = Arc::new(data);
            }
        }

        Event::Unrecognized => return Ok(Arc::clone(store)),
    }

    Ok(Arc::new(next))
}

/// Validate and fold a remote document into the collection.
fn merge_payload(store: &mut Store, document: &Document) -> Result<()> {
    if document.data.is_none() {
        return Ok(());
    }

    for resource in document.resources() {
        store.definitions().validate_resource(resource)?;
    }

    let merged = normalize::merge_document(ResourceCollection::clone(&store.data), document);
    if !merged.ptr_eq(&store.data) {
        store.data = Arc::new(merged);
    }
    Ok(())
}

/// Commit the ledger, then fold the server's responses.
fn commit(store: &mut Store, documents: &[Document]) -> Result<()> {
    let incoming = documents
        .iter()
        .filter(|document| document.data.is_some())
        .flat_map(Document::resources);
    for resource in incoming {
        store.definitions().validate_resource(resource)?;
    }

    let responses = documents.iter().flat_map(Document::primary);
    let (data, summary) = ledger::apply(&store.data, responses);
    tracing::info!(
        settled = summary.settled,
        removed = summary.removed,
        "applied pending changes"
    );

    let data = documents.iter().fold(data, normalize::merge_document);
    store.data = Arc::new(data);
    Ok(())
}

/// The query a read reports to, if it is still registered. A query removed
/// while its read was in flight has nothing left to resolve.
fn tracked_query(store: &Store, query: Option<QueryName>) -> Option<QueryName> {
    let name = query?;
    if store.queries.contains(&name) {
        Some(name)
    } else {
        tracing::debug!(query = %name, "read finished for a removed query");
        None
    }
}

fn stage(store: &mut Store, change: StagedChange) -> Result<()> {
    let staged = ledger::stage(&store.data, change)?;
    if !staged.ptr_eq(&store.data) {
        store.data = Arc::new(staged);
    }
    Ok(())
}

fn modify_errors(store: &mut Store, payload: ErrorsPayload) -> Result<()> {
    let ErrorsPayload { id, errors, mode } = payload;
    store.data = Arc::new(ledger::set_errors(&store.data, &id, errors, mode)?);
    Ok(())
}

fn register_query(store: &mut Store, request: QueryRequest) -> Result<()> {
    store.definitions().get(&request.params.resource_type)?;
    tracing::debug!(
        query = %request.name,
        resource_type = %request.params.resource_type,
        "registering query"
    );
    store.queries = Arc::new(store.queries.register(request.name, request.params));
    Ok(())
}

fn resolve_local_query(store: &mut Store, payload: QueryResults) -> Result<()> {
    store.queries = Arc::new(store.queries.resolve(&payload.name, payload.results)?);
    Ok(())
}

fn report_failure(kind: &str, payload: Option<&Value>) {
    match payload {
        Some(payload) => tracing::warn!(event = kind, %payload, "remote operation failed"),
        None => tracing::warn!(event = kind, "remote operation failed"),
    }
}
