//! Actor system for the dev loop.
//!
//! ```text
//! WatchActor --Pulse--> SupervisorActor --apply--> EventService --> subscribers
//! ```
//!
//! `coordinator` wires the channels and runs the actors; business logic
//! lives in the leaf modules.

pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod supervisor;
