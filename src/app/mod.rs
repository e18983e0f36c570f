//! App element model.
//!
//! Two tree shapes share this module:
//!
//! - **Definition**: the static schema the developer authored, produced by
//!   introspecting the app module. Carries names, labels, kinds and defaults.
//! - **Session**: a running instance of a definition. Every element has a
//!   stable id and a current value; the session exposes both a flat view
//!   (pre-order list) and a nested view (children index) over one arena.
//!
//! `builder` materialises a definition into unidentified draft elements;
//! the repository turns drafts into identified session elements.

mod builder;
mod definition;
mod kind;
mod session;
mod value;

pub use builder::{DraftElement, materialise_app, materialise_element};
pub use definition::{DefaultValue, Definition, DefinitionElement};
pub use kind::ElementKind;
pub use session::{ElementId, Session, SessionElement};
pub use value::{ElementValue, UpdateValue};

use thiserror::Error;

/// Element-level errors: materialisation, lookup and value updates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ElementError {
    /// The default value's dynamic type does not match the element kind.
    #[error("default value for `{name}` does not match kind `{kind}`")]
    DefaultMismatch { name: String, kind: ElementKind },

    /// The introspector reported a kind outside the closed set.
    #[error("unknown element kind `{0}`")]
    UnknownKind(String),

    /// Path lookup walked off the tree.
    #[error("no element at path `{0}`")]
    PathNotFound(String),

    /// Id lookup failed against the session.
    #[error("element {0} not found")]
    NotFound(ElementId),

    /// Update payload carries the wrong slot for the element kind.
    #[error("update value does not match kind `{kind}`")]
    ValueMismatch { kind: ElementKind },

    /// Trigger against anything but an action.
    #[error("element {id} is `{kind}`, only actions can be triggered")]
    NotAnAction { id: ElementId, kind: ElementKind },
}
