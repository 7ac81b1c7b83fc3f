//! Publishing snapshots to observers.
//!
//! The dispatcher owns the current snapshot and runs events through
//! [`transition()`]. Every new snapshot is published on a watch channel;
//! observers only ever see complete snapshots, and an event that changes
//! nothing publishes nothing.

use crate::{error::Result, transition, Event, ResourceDefinitions, Store};
use std::sync::Arc;
use tokio::sync::watch;

/// Receiving end handed to observers.
pub type StoreReceiver = watch::Receiver<Arc<Store>>;

/// Single writer of store snapshots.
#[derive(Debug)]
pub struct StoreDispatcher {
    sender: watch::Sender<Arc<Store>>,
}

impl StoreDispatcher {
    /// Start from an empty store with the given definitions.
    pub fn new(definitions: ResourceDefinitions) -> Self {
        Self::from_store(Store::new(definitions))
    }

    /// Start from an existing snapshot.
    pub fn from_store(store: Store) -> Self {
        let (sender, _) = watch::channel(Arc::new(store));
        Self { sender }
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<Store> {
        Arc::clone(&self.sender.borrow())
    }

    /// Subscribe to future snapshots. The current one counts as seen.
    pub fn subscribe(&self) -> StoreReceiver {
        self.sender.subscribe()
    }

    /// Run one event. On error nothing is published and the current snapshot
    /// stays in place.
    pub fn dispatch(&mut self, event: Event) -> Result<Arc<Store>> {
        let current = self.snapshot();
        let next = transition(&current, event)?;

        if !Arc::ptr_eq(&current, &next) {
            self.sender.send_replace(Arc::clone(&next));
        }
        Ok(next)
    }

    /// Decode a JSON event and run it.
    pub fn dispatch_json(&mut self, json: &str) -> Result<Arc<Store>> {
        self.dispatch(Event::from_json(json)?)
    }

    /// Run events in order, stopping at the first error. Snapshots produced
    /// before the failing event stay published.
    pub fn dispatch_all<I>(&mut self, events: I) -> Result<Arc<Store>>
    where
        I: IntoIterator<Item = Event>,
    {
        let mut latest = self.snapshot();
        for event in events {
            latest = self.dispatch(event)?;
        }
        Ok(latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Document, Error, Resource, ResourceDefinition, ResourceIdentifier};

    fn dispatcher() -> StoreDispatcher {
        StoreDispatcher::new(
            ResourceDefinitions::default()
                .with_definition(ResourceDefinition::new("article", "Article", "articles")),
        )
    }

    #[test]
    fn publishes_new_snapshots() {
        let mut dispatcher = dispatcher();
        let mut receiver = dispatcher.subscribe();
        assert!(!receiver.has_changed().unwrap());

        dispatcher.dispatch(Event::ReadInit { query: None }).unwrap();

        assert!(receiver.has_changed().unwrap());
        assert!(receiver.borrow_and_update().is_reading());
    }

    #[test]
    fn identity_transition_publishes_nothing() {
        let mut dispatcher = dispatcher();
        let receiver = dispatcher.subscribe();

        let before = dispatcher.snapshot();
        let after = dispatcher.dispatch(Event::Unrecognized).unwrap();

        assert!(Arc::ptr_eq(&before, &after));
        assert!(!receiver.has_changed().unwrap());
    }

    #[test]
    fn failed_event_keeps_current_snapshot() {
        let mut dispatcher = dispatcher();
        let receiver = dispatcher.subscribe();
        let before = dispatcher.snapshot();

        let result = dispatcher.dispatch(Event::PatchStoreResource {
            payload: Resource::new("Article", "missing"),
        });

        assert!(matches!(result, Err(Error::ResourceNotFound { .. })));
        assert!(Arc::ptr_eq(&before, &dispatcher.snapshot()));
        assert!(!receiver.has_changed().unwrap());
    }

    #[test]
    fn dispatch_json_and_sequence() {
        let mut dispatcher = dispatcher();
        dispatcher
            .dispatch_json(
                r#"{"type": "READ_SUCCESS", "payload": {"data": {"type": "Article", "id": "1"}}}"#,
            )
            .unwrap();

        let store = dispatcher
            .dispatch_all(vec![
                Event::UpdateInit,
                Event::UpdateSuccess {
                    payload: Document::one(
                        Resource::new("Article", "1").with_attribute("title", "A"),
                    ),
                },
            ])
            .unwrap();

        assert!(!store.is_updating());
        assert!(store.get(&ResourceIdentifier::new("Article", "1")).is_some());
        assert!(Arc::ptr_eq(&store, &dispatcher.snapshot()));
    }

    #[test]
    fn invalid_json_is_rejected() {
        let mut dispatcher = dispatcher();
        let result = dispatcher.dispatch_json("{");
        assert!(matches!(result, Err(Error::InvalidEvent(_))));
    }
}
