//! Event records delivered to subscribers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::app::SessionElement;

/// What happened to an element. Exactly one variant per event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A value or label changed.
    UpdatedElement { element: SessionElement },
    /// An action fired (no state change).
    TriggeredActionElement { element: SessionElement },
    /// A new element appeared. For a subtree, the root event comes first,
    /// then one event per descendant in pre-order.
    AddedElement { element: SessionElement },
    /// An element (and implicitly its subtree) went away.
    RemovedElement { element: SessionElement },
}

impl EventPayload {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::UpdatedElement { .. } => EventType::Updated,
            Self::TriggeredActionElement { .. } => EventType::Triggered,
            Self::AddedElement { .. } => EventType::Added,
            Self::RemovedElement { .. } => EventType::Removed,
        }
    }

    pub fn element(&self) -> &SessionElement {
        match self {
            Self::UpdatedElement { element }
            | Self::TriggeredActionElement { element }
            | Self::AddedElement { element }
            | Self::RemovedElement { element } => element,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Updated,
    Triggered,
    Added,
    Removed,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Updated => "updated",
            Self::Triggered => "triggered",
            Self::Added => "added",
            Self::Removed => "removed",
        })
    }
}

/// One event as delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementEvent {
    pub app_session_id: String,
    /// The client whose call produced this event; it never receives the echo.
    pub source_client_id: String,
    #[serde(flatten)]
    pub payload: EventPayload,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ElementValue;

    fn element() -> SessionElement {
        SessionElement {
            id: 0,
            app_session_id: "0".to_string(),
            parent_id: None,
            name: "greeting".to_string(),
            label: "Greeting".to_string(),
            value: ElementValue::String {
                value: "hi".to_string(),
            },
        }
    }

    #[test]
    fn test_event_type_from_payload() {
        let payload = EventPayload::AddedElement { element: element() };
        assert_eq!(payload.event_type(), EventType::Added);
        assert_eq!(payload.event_type().to_string(), "added");
    }

    #[test]
    fn test_event_wire_shape() {
        let event = ElementEvent {
            app_session_id: "0".to_string(),
            source_client_id: "c1".to_string(),
            payload: EventPayload::UpdatedElement { element: element() },
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "updated_element");
        assert_eq!(json["source_client_id"], "c1");
        assert_eq!(json["element"]["name"], "greeting");
        assert_eq!(json["element"]["kind"], "string");
    }
}
