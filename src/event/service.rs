//! The event service: mediates mutations and fans events out.
//!
//! Every operation takes the originating `client_id`; fanout skips the
//! subscriptions registered under that id (echo suppression). Subscriber
//! queues are bounded; a full queue drops the event for that subscriber
//! only, and a closed one is pruned, so a stuck client can never block the
//! producer or its peers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{ElementEvent, EventPayload};
use crate::app::{DraftElement, ElementError, ElementId, ElementKind, SessionElement, UpdateValue};
use crate::repo::{RepoError, SessionRepository};

/// Client id the reload supervisor acts under.
pub const SERVER_CLIENT_ID: &str = "server";

/// Per-subscriber queue bound.
const SUBSCRIBER_BUFFER: usize = 100;

/// A value update submitted by a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementUpdate {
    pub element_id: ElementId,
    pub value: UpdateValue,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EventError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Element(#[from] ElementError),
}

struct Subscription {
    key: u64,
    session_id: String,
    client_id: String,
    cancel: CancellationToken,
    tx: mpsc::Sender<ElementEvent>,
}

/// Concurrent mediator between clients, the repository and subscribers.
pub struct EventService {
    repo: Arc<dyn SessionRepository>,
    subs: Arc<Mutex<Vec<Subscription>>>,
    next_key: AtomicU64,
}

impl EventService {
    pub fn new(repo: Arc<dyn SessionRepository>) -> Self {
        Self {
            repo,
            subs: Arc::new(Mutex::new(Vec::new())),
            next_key: AtomicU64::new(0),
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Apply a value update. The payload slot must match the element kind.
    pub fn update_element(
        &self,
        session_id: &str,
        client_id: &str,
        update: &ElementUpdate,
    ) -> Result<SessionElement, EventError> {
        let session = self.repo.read(session_id)?;
        let mut element = session
            .get(update.element_id)
            .cloned()
            .ok_or(ElementError::NotFound(update.element_id))?;
        element.value.apply(&update.value)?;

        self.repo.update_element(session_id, element.clone())?;
        self.publish(session_id, client_id, EventPayload::UpdatedElement {
            element: element.clone(),
        });
        Ok(element)
    }

    /// Fire an action. No state changes; only an event goes out.
    pub fn trigger_action(
        &self,
        session_id: &str,
        client_id: &str,
        element_id: ElementId,
    ) -> Result<(), EventError> {
        let session = self.repo.read(session_id)?;
        let element = session
            .get(element_id)
            .cloned()
            .ok_or(ElementError::NotFound(element_id))?;
        if element.kind() != ElementKind::Action {
            return Err(ElementError::NotAnAction {
                id: element_id,
                kind: element.kind(),
            }
            .into());
        }

        self.publish(session_id, client_id, EventPayload::TriggeredActionElement {
            element,
        });
        Ok(())
    }

    /// Attach a new subtree and announce it: one AddedElement for the root,
    /// then one per descendant, in pre-order.
    pub fn add_element(
        &self,
        session_id: &str,
        client_id: &str,
        parent_id: Option<ElementId>,
        element: DraftElement,
    ) -> Result<SessionElement, EventError> {
        let root = self.repo.add_element(session_id, parent_id, element)?;
        let session = self.repo.read(session_id)?;

        for id in session.subtree(root.id) {
            if let Some(added) = session.get(id) {
                self.publish(session_id, client_id, EventPayload::AddedElement {
                    element: added.clone(),
                });
            }
        }
        Ok(root)
    }

    /// Remove an element (subtree included). One RemovedElement event for
    /// the root; descendants are implied.
    pub fn remove_element(
        &self,
        session_id: &str,
        client_id: &str,
        element_id: ElementId,
    ) -> Result<SessionElement, EventError> {
        let removed = self.repo.remove_element(session_id, element_id)?;
        self.repo.read(session_id)?;

        self.publish(session_id, client_id, EventPayload::RemovedElement {
            element: removed.clone(),
        });
        Ok(removed)
    }

    /// Current state of a session, for consumers that need a snapshot.
    pub fn read_session(&self, session_id: &str) -> Result<crate::app::Session, EventError> {
        Ok(self.repo.read(session_id)?)
    }

    /// Persist a schema-driven element change (rename/relabel) and announce it.
    pub fn update_element_label(
        &self,
        session_id: &str,
        client_id: &str,
        element: SessionElement,
    ) -> Result<(), EventError> {
        self.repo.update_element(session_id, element.clone())?;
        self.publish(session_id, client_id, EventPayload::UpdatedElement { element });
        Ok(())
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Register a subscription and return its bounded event stream.
    ///
    /// Must be called within a tokio runtime: a watcher task unregisters
    /// the subscription (closing the stream) when `cancel` fires.
    pub fn subscribe(
        &self,
        cancel: CancellationToken,
        session_id: &str,
        client_id: &str,
    ) -> mpsc::Receiver<ElementEvent> {
        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let key = self.next_key.fetch_add(1, Ordering::Relaxed);

        self.subs.lock().push(Subscription {
            key,
            session_id: session_id.to_string(),
            client_id: client_id.to_string(),
            cancel: cancel.clone(),
            tx,
        });
        crate::debug!("event"; "subscribed client `{}` to session `{}`", client_id, session_id);

        let subs = Arc::clone(&self.subs);
        tokio::spawn(async move {
            cancel.cancelled().await;
            subs.lock().retain(|s| s.key != key);
        });

        rx
    }

    /// Currently registered subscription count.
    pub fn subscriber_count(&self) -> usize {
        self.subs.lock().len()
    }

    /// Deliver to every live subscription of the session except the
    /// source client's. Senders are snapshotted first so no lock is held
    /// across a send.
    fn publish(&self, session_id: &str, source_client_id: &str, payload: EventPayload) {
        let event = ElementEvent {
            app_session_id: session_id.to_string(),
            source_client_id: source_client_id.to_string(),
            payload,
        };

        let targets: Vec<mpsc::Sender<ElementEvent>> = self
            .subs
            .lock()
            .iter()
            .filter(|s| {
                s.session_id == session_id
                    && s.client_id != source_client_id
                    && !s.cancel.is_cancelled()
            })
            .map(|s| s.tx.clone())
            .collect();

        if targets.is_empty() {
            crate::debug!("event"; "no subscribers for {} event", event.payload.event_type());
            return;
        }

        let mut pruned = false;
        for tx in targets {
            match tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    crate::debug!("event"; "subscriber queue full, dropping {} event", event.payload.event_type());
                }
                Err(mpsc::error::TrySendError::Closed(_)) => pruned = true,
            }
        }
        if pruned {
            self.subs.lock().retain(|s| !s.tx.is_closed());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{DefaultValue, Definition, DefinitionElement, ElementValue};
    use crate::event::EventType;
    use crate::repo::MemoryRepository;

    fn definition(elements: Vec<DefinitionElement>) -> Definition {
        Definition {
            name: "demo".to_string(),
            title: None,
            elements,
        }
    }

    fn string_def(name: &str, default: &str) -> DefinitionElement {
        DefinitionElement::new(name, name, ElementKind::String)
            .with_default(DefaultValue::Text(default.to_string()))
    }

    fn service_with(def: Definition) -> EventService {
        let repo = Arc::new(MemoryRepository::new());
        repo.create(&def).unwrap();
        EventService::new(repo)
    }

    fn text_update(element_id: ElementId, text: &str) -> ElementUpdate {
        ElementUpdate {
            element_id,
            value: UpdateValue::Text(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_string_round_trip() {
        let service = service_with(definition(vec![string_def("greeting", "hi")]));

        let element = service.repo.read("0").unwrap().elements()[0].clone();
        assert_eq!(element.id, 0);
        assert_eq!(element.name, "greeting");
        assert_eq!(
            element.value,
            ElementValue::String {
                value: "hi".to_string()
            }
        );

        let mut c1 = service.subscribe(CancellationToken::new(), "0", "c1");
        let mut c2 = service.subscribe(CancellationToken::new(), "0", "c2");

        service.update_element("0", "c1", &text_update(0, "hello")).unwrap();

        let event = c2.recv().await.unwrap();
        assert_eq!(event.source_client_id, "c1");
        assert_eq!(event.payload.event_type(), EventType::Updated);
        assert_eq!(
            event.payload.element().value,
            ElementValue::String {
                value: "hello".to_string()
            }
        );

        // echo suppression: the source client sees nothing
        assert!(c1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_wrong_slot_rejected() {
        let service = service_with(definition(vec![string_def("greeting", "hi")]));
        let err = service
            .update_element("0", "c1", &ElementUpdate {
                element_id: 0,
                value: UpdateValue::Real(1.0),
            })
            .unwrap_err();
        assert_eq!(
            err,
            EventError::Element(ElementError::ValueMismatch {
                kind: ElementKind::String
            })
        );

        // nothing persisted
        let binding = service.repo.read("0").unwrap();
        let element = &binding.elements()[0];
        assert_eq!(
            element.value,
            ElementValue::String {
                value: "hi".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_trigger_requires_action() {
        let service = service_with(definition(vec![
            string_def("greeting", "hi"),
            DefinitionElement::new("go", "Go", ElementKind::Action),
        ]));
        let mut rx = service.subscribe(CancellationToken::new(), "0", "watcher");

        assert!(matches!(
            service.trigger_action("0", "c1", 0).unwrap_err(),
            EventError::Element(ElementError::NotAnAction { .. })
        ));

        service.trigger_action("0", "c1", 1).unwrap();
        let event = rx.recv().await.unwrap();
        assert_eq!(event.payload.event_type(), EventType::Triggered);
        assert_eq!(event.payload.element().name, "go");
    }

    #[tokio::test]
    async fn test_add_fans_out_subtree_preorder() {
        let service = service_with(definition(vec![string_def("existing", "")]));
        let mut rx = service.subscribe(CancellationToken::new(), "0", "watcher");

        service
            .add_element(
                "0",
                "c1",
                None,
                DraftElement {
                    name: "box".to_string(),
                    label: "box".to_string(),
                    value: ElementValue::Container,
                    children: vec![
                        DraftElement {
                            name: "a".to_string(),
                            label: "a".to_string(),
                            value: ElementValue::Action,
                            children: vec![],
                        },
                        DraftElement {
                            name: "b".to_string(),
                            label: "b".to_string(),
                            value: ElementValue::Action,
                            children: vec![],
                        },
                    ],
                },
            )
            .unwrap();

        let mut names = Vec::new();
        for _ in 0..3 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.payload.event_type(), EventType::Added);
            names.push(event.payload.element().name.clone());
        }
        assert_eq!(names, vec!["box", "a", "b"]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_emits_single_event() {
        let service = service_with(definition(vec![
            DefinitionElement::new("box", "box", ElementKind::Container)
                .with_children(vec![string_def("inner", "")]),
        ]));
        let mut rx = service.subscribe(CancellationToken::new(), "0", "watcher");

        service.remove_element("0", "c1", 0).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.payload.event_type(), EventType::Removed);
        assert_eq!(event.payload.element().name, "box");
        // descendants are implied, not announced
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_missing_is_reported() {
        let service = service_with(definition(vec![string_def("a", "")]));
        assert!(matches!(
            service.remove_element("0", "c1", 41).unwrap_err(),
            EventError::Repo(RepoError::Element(ElementError::NotFound(41)))
        ));
    }

    #[tokio::test]
    async fn test_update_label_persists_and_fans_out() {
        let service = service_with(definition(vec![string_def("greeting", "hi")]));
        let mut rx = service.subscribe(CancellationToken::new(), "0", "watcher");

        let mut element = service.repo.read("0").unwrap().elements()[0].clone();
        element.label = "Hello there".to_string();
        service
            .update_element_label("0", SERVER_CLIENT_ID, element)
            .unwrap();

        assert_eq!(
            service.repo.read("0").unwrap().elements()[0].label,
            "Hello there"
        );
        let event = rx.recv().await.unwrap();
        assert_eq!(event.source_client_id, SERVER_CLIENT_ID);
        assert_eq!(event.payload.element().label, "Hello there");
    }

    #[tokio::test]
    async fn test_cancel_closes_stream() {
        let service = service_with(definition(vec![string_def("greeting", "hi")]));

        let token = CancellationToken::new();
        let mut rx = service.subscribe(token.clone(), "0", "c2");
        token.cancel();

        // stream drains to closed, and no later event reaches it
        assert!(rx.recv().await.is_none());
        assert_eq!(service.subscriber_count(), 0);

        service.update_element("0", "c1", &text_update(0, "x")).unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_queue_drops_not_blocks() {
        let service = service_with(definition(vec![string_def("greeting", "hi")]));
        let mut rx = service.subscribe(CancellationToken::new(), "0", "slow");

        for i in 0..(SUBSCRIBER_BUFFER + 20) {
            service
                .update_element("0", "c1", &text_update(0, &i.to_string()))
                .unwrap();
        }

        // the subscriber kept exactly the buffered prefix; the producer
        // never blocked
        let mut received = 0;
        while rx.try_recv().is_ok() {
            received += 1;
        }
        assert_eq!(received, SUBSCRIBER_BUFFER);
    }

    #[tokio::test]
    async fn test_events_scoped_to_session() {
        let repo = Arc::new(crate::repo::MapRepository::new());
        repo.create(&definition(vec![string_def("a", "")])).unwrap(); // "0"
        repo.create(&definition(vec![string_def("a", "")])).unwrap(); // "1"
        let service = EventService::new(repo);

        let mut other = service.subscribe(CancellationToken::new(), "1", "c2");
        service.update_element("0", "c1", &text_update(0, "x")).unwrap();
        assert!(other.try_recv().is_err());
    }
}
