//! Element events and the fanout service.
//!
//! ```text
//! client/supervisor --op--> EventService --repo mutation--> Session
//!                               |
//!                               +--[try_send]--> every other subscriber
//! ```

mod model;
mod service;

pub use model::{ElementEvent, EventPayload, EventType};
pub use service::{ElementUpdate, EventError, EventService, SERVER_CLIENT_ID};
