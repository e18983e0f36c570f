//! Edit-script engine: reconcile a live session with a new definition.
//!
//! Pure function over its inputs. Elements correspond iff their full name
//! paths from root are equal (and kinds match); identity and current values
//! survive through label updates, so a reload never resets session state.

use crate::app::{
    Definition, DefinitionElement, DraftElement, ElementId, ElementKind, Session, SessionElement,
    materialise_element,
};

/// A freshly materialised subtree to attach, with the session id of its
/// surviving parent (absent for root level). Descendants ride inside the
/// draft; they are never listed separately.
#[derive(Debug, Clone, PartialEq)]
pub struct AddedElement {
    pub parent_id: Option<String>,
    pub element: DraftElement,
}

/// The Added/Removed/Updated triple.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditScript {
    pub added: Vec<AddedElement>,
    pub removed: Vec<SessionElement>,
    pub updated: Vec<SessionElement>,
}

impl EditScript {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    /// Total number of edits.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.updated.len()
    }
}

/// One session element as seen by the matcher.
struct Entry {
    id: ElementId,
    kind: ElementKind,
    path: Vec<String>,
    used: bool,
}

/// Where an unmatched definition node hangs off the live session.
#[derive(Clone, Copy)]
enum Anchor {
    Root,
    Matched(ElementId),
}

/// Compute the edit script turning `session` into the shape of `def`.
///
/// Matching walks the definition in depth-first pre-order and claims, for
/// each node, the first unclaimed session element with the same name path
/// and kind, so duplicated sibling names match positionally. Session
/// elements left unclaimed at the end are removals. A kind change at the
/// same path claims nothing and therefore falls out as remove + add.
pub fn diff(session: &Session, def: &Definition) -> EditScript {
    let mut entries: Vec<Entry> = session
        .elements()
        .iter()
        .map(|element| Entry {
            id: element.id,
            kind: element.kind(),
            path: session.path_of(element.id),
            used: false,
        })
        .collect();

    let mut script = EditScript::default();
    let mut path = Vec::new();
    for element in &def.elements {
        visit(
            element,
            &mut path,
            Anchor::Root,
            &mut entries,
            session,
            &mut script,
        );
    }

    for entry in entries.iter().filter(|e| !e.used) {
        if let Some(element) = session.get(entry.id) {
            script.removed.push(element.clone());
        }
    }

    script
}

fn visit(
    def_element: &DefinitionElement,
    path: &mut Vec<String>,
    anchor: Anchor,
    entries: &mut [Entry],
    session: &Session,
    script: &mut EditScript,
) {
    path.push(def_element.name.clone());

    let matched = entries
        .iter_mut()
        .find(|e| !e.used && e.kind == def_element.kind && e.path == *path);

    match matched {
        Some(entry) => {
            entry.used = true;
            let id = entry.id;
            if let Some(live) = session.get(id)
                && live.label != def_element.label
            {
                let mut updated = live.clone();
                updated.label = def_element.label.clone();
                script.updated.push(updated);
            }
            for child in &def_element.children {
                visit(child, path, Anchor::Matched(id), entries, session, script);
            }
        }
        None => {
            // The whole subtree is new: one Added record, children nested.
            match materialise_element(def_element) {
                Ok(draft) => script.added.push(AddedElement {
                    parent_id: match anchor {
                        Anchor::Root => None,
                        Anchor::Matched(id) => Some(id.to_string()),
                    },
                    element: draft,
                }),
                Err(err) => crate::log!("warning"; "skipping element: {err}"),
            }
        }
    }

    path.pop();
}
