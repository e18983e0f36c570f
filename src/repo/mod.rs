//! Session repositories.
//!
//! One trait, two in-memory implementations with deliberately different
//! lifetimes:
//!
//! - [`MemoryRepository`], **single-slot**: `create` replaces the sole
//!   session and `read` ignores the id. The reload supervisor depends on
//!   these semantics (it always reads session "0").
//! - [`MapRepository`], **multi-slot**: one session per id, the shape a
//!   persistent backing store would have.

mod map;
mod memory;

pub use map::MapRepository;
pub use memory::MemoryRepository;

use thiserror::Error;

use crate::app::{Definition, DraftElement, ElementError, ElementId, Session, SessionElement};

/// Repository-level errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RepoError {
    /// `read` before any `create` on the single-slot repository.
    #[error("no session has been created")]
    NotCreated,

    /// Lookup by id failed on the multi-slot repository.
    #[error("session `{0}` not found")]
    SessionNotFound(String),

    #[error(transparent)]
    Element(#[from] ElementError),
}

/// Storage contract for sessions.
///
/// Implementations serialise their own mutations; callers may share a
/// repository across tasks freely.
pub trait SessionRepository: Send + Sync {
    /// Build a session from a definition: materialise, assign identities
    /// in depth-first pre-order starting at 0, index children.
    fn create(&self, def: &Definition) -> Result<Session, RepoError>;

    /// Fetch a session by id.
    fn read(&self, session_id: &str) -> Result<Session, RepoError>;

    /// Replace the element with matching id. Fails if absent.
    fn update_element(&self, session_id: &str, element: SessionElement) -> Result<(), RepoError>;

    /// Attach a new subtree under `parent_id` (root level when `None`),
    /// continuing the session's id counter in pre-order. Returns the
    /// identified root of the added subtree.
    fn add_element(
        &self,
        session_id: &str,
        parent_id: Option<ElementId>,
        element: DraftElement,
    ) -> Result<SessionElement, RepoError>;

    /// Remove the element with matching id together with its subtree.
    /// Fails if absent. Returns the removed root.
    fn remove_element(
        &self,
        session_id: &str,
        element_id: ElementId,
    ) -> Result<SessionElement, RepoError>;

    /// Drop a session entirely.
    fn delete(&self, session_id: &str) -> Result<(), RepoError>;
}
