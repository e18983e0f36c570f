//! Live session: one arena of identified elements, two views.
//!
//! The flat view is the arena itself: elements in pre-order insertion
//! order, each carrying its `parent_id`. The nested view is the `children`
//! index walked from the root list. Both views see the same nodes; there is
//! no duplication to keep consistent.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use super::builder::DraftElement;
use super::{ElementError, ElementKind, ElementValue};

/// Stable element identity. Assigned once, never reused within a session.
pub type ElementId = u64;

/// A single live element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionElement {
    pub id: ElementId,
    pub app_session_id: String,
    /// Decimal string form of the parent element's id; absent for
    /// root-level elements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub value: ElementValue,
}

impl SessionElement {
    pub fn kind(&self) -> ElementKind {
        self.value.kind()
    }

    /// Parent id parsed back to a numeric id.
    pub fn parent_ref(&self) -> Option<ElementId> {
        self.parent_id.as_deref().and_then(|s| s.parse().ok())
    }
}

/// A running instance of a definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    app_session_id: String,
    app_name: String,
    title: Option<String>,
    /// The arena; iteration order is pre-order insertion order (flat view).
    elements: Vec<SessionElement>,
    /// Root-level element ids, in order.
    roots: Vec<ElementId>,
    /// Nested view index: element id → ordered child ids.
    children: FxHashMap<ElementId, Vec<ElementId>>,
    /// Monotonic id counter; continues across `add`, never reused.
    next_id: ElementId,
}

impl Session {
    pub fn new(app_session_id: impl Into<String>, app_name: impl Into<String>, title: Option<String>) -> Self {
        Self {
            app_session_id: app_session_id.into(),
            app_name: app_name.into(),
            title,
            elements: Vec::new(),
            roots: Vec::new(),
            children: FxHashMap::default(),
            next_id: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.app_session_id
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    // ========================================================================
    // Views
    // ========================================================================

    /// Flat view: every element once, pre-order.
    pub fn elements(&self) -> &[SessionElement] {
        &self.elements
    }

    /// Root-level element ids, in order.
    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    /// Ordered child ids of an element (empty for leaves).
    pub fn children_of(&self, id: ElementId) -> &[ElementId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Lookup by id. Linear scan over the arena; sessions stay small
    /// (hundreds of elements at most).
    pub fn get(&self, id: ElementId) -> Option<&SessionElement> {
        self.elements.iter().find(|e| e.id == id)
    }

    fn get_mut(&mut self, id: ElementId) -> Option<&mut SessionElement> {
        self.elements.iter_mut().find(|e| e.id == id)
    }

    /// Ordered sequence of names from root to the element.
    pub fn path_of(&self, id: ElementId) -> Vec<String> {
        let mut segments = Vec::new();
        let mut cursor = self.get(id);
        while let Some(element) = cursor {
            segments.push(element.name.clone());
            cursor = element.parent_ref().and_then(|pid| self.get(pid));
        }
        segments.reverse();
        segments
    }

    /// Ids of the subtree rooted at `id` (inclusive), pre-order.
    pub fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        let mut ids = Vec::new();
        self.collect_subtree(id, &mut ids);
        ids
    }

    fn collect_subtree(&self, id: ElementId, into: &mut Vec<ElementId>) {
        into.push(id);
        for child in self.children_of(id).to_vec() {
            self.collect_subtree(child, into);
        }
    }

    /// Depth-first pre-order traversal of the nested view.
    pub fn nested_preorder(&self) -> Vec<ElementId> {
        let mut ids = Vec::new();
        for root in self.roots.clone() {
            self.collect_subtree(root, &mut ids);
        }
        ids
    }

    // ========================================================================
    // Mutation (repository-facing)
    // ========================================================================

    /// Attach a draft subtree under `parent` (or at root level), assigning
    /// ids in pre-order from the session counter. Returns the root id of
    /// the inserted subtree.
    pub(crate) fn insert_tree(&mut self, parent: Option<ElementId>, draft: DraftElement) -> ElementId {
        let id = self.next_id;
        self.next_id += 1;

        self.elements.push(SessionElement {
            id,
            app_session_id: self.app_session_id.clone(),
            parent_id: parent.map(|p| p.to_string()),
            name: draft.name,
            label: draft.label,
            value: draft.value,
        });

        match parent {
            Some(parent) => self.children.entry(parent).or_default().push(id),
            None => self.roots.push(id),
        }

        for child in draft.children {
            self.insert_tree(Some(id), child);
        }
        id
    }

    /// Replace the stored name/label/value of the element with matching id.
    /// Identity and tree position are not touched.
    pub(crate) fn replace(&mut self, element: SessionElement) -> Result<(), ElementError> {
        let slot = self
            .get_mut(element.id)
            .ok_or(ElementError::NotFound(element.id))?;
        slot.name = element.name;
        slot.label = element.label;
        slot.value = element.value;
        Ok(())
    }

    /// Detach the element and its entire subtree from the arena.
    /// Returns the removed root.
    pub(crate) fn remove_subtree(&mut self, id: ElementId) -> Result<SessionElement, ElementError> {
        let root = self.get(id).cloned().ok_or(ElementError::NotFound(id))?;
        let doomed = self.subtree(id);

        self.elements.retain(|e| !doomed.contains(&e.id));
        for gone in &doomed {
            self.children.remove(gone);
        }
        self.roots.retain(|r| *r != id);
        if let Some(parent) = root.parent_ref()
            && let Some(siblings) = self.children.get_mut(&parent)
        {
            siblings.retain(|c| *c != id);
        }
        Ok(root)
    }
}
