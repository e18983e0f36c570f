//! Single-slot in-memory repository.
//!
//! Holds at most one live session. `create` replaces whatever is in the
//! slot and `read` returns the sole session regardless of the id passed:
//! the dev loop owns exactly one session at a time and always asks for
//! session "0".

use parking_lot::RwLock;

use super::{RepoError, SessionRepository};
use crate::app::{Definition, DraftElement, ElementId, Session, SessionElement, materialise_app};

/// Session id handed out by the single slot.
pub const SOLE_SESSION_ID: &str = "0";

#[derive(Default)]
pub struct MemoryRepository {
    slot: RwLock<Option<Session>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionRepository for MemoryRepository {
    fn create(&self, def: &Definition) -> Result<Session, RepoError> {
        let mut session = Session::new(SOLE_SESSION_ID, def.name.clone(), def.title.clone());
        for draft in materialise_app(def) {
            session.insert_tree(None, draft);
        }
        *self.slot.write() = Some(session.clone());
        Ok(session)
    }

    fn read(&self, _session_id: &str) -> Result<Session, RepoError> {
        self.slot.read().clone().ok_or(RepoError::NotCreated)
    }

    fn update_element(&self, _session_id: &str, element: SessionElement) -> Result<(), RepoError> {
        let mut slot = self.slot.write();
        let session = slot.as_mut().ok_or(RepoError::NotCreated)?;
        session.replace(element)?;
        Ok(())
    }

    fn add_element(
        &self,
        _session_id: &str,
        parent_id: Option<ElementId>,
        element: DraftElement,
    ) -> Result<SessionElement, RepoError> {
        let mut slot = self.slot.write();
        let session = slot.as_mut().ok_or(RepoError::NotCreated)?;
        let root_id = session.insert_tree(parent_id, element);
        Ok(session.get(root_id).cloned().expect("just inserted"))
    }

    fn remove_element(
        &self,
        _session_id: &str,
        element_id: ElementId,
    ) -> Result<SessionElement, RepoError> {
        let mut slot = self.slot.write();
        let session = slot.as_mut().ok_or(RepoError::NotCreated)?;
        Ok(session.remove_subtree(element_id)?)
    }

    fn delete(&self, _session_id: &str) -> Result<(), RepoError> {
        *self.slot.write() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{DefaultValue, DefinitionElement, ElementError, ElementKind, ElementValue};

    fn definition(elements: Vec<DefinitionElement>) -> Definition {
        Definition {
            name: "demo".to_string(),
            title: Some("Demo".to_string()),
            elements,
        }
    }

    fn string_def(name: &str, default: &str) -> DefinitionElement {
        DefinitionElement::new(name, name, ElementKind::String)
            .with_default(DefaultValue::Text(default.to_string()))
    }

    #[test]
    fn test_read_before_create() {
        let repo = MemoryRepository::new();
        assert_eq!(repo.read("0").unwrap_err(), RepoError::NotCreated);
    }

    #[test]
    fn test_create_assigns_contiguous_ids() {
        let repo = MemoryRepository::new();
        let def = definition(vec![
            DefinitionElement::new("root", "root", ElementKind::Container).with_children(vec![
                DefinitionElement::new("middle", "middle", ElementKind::Container)
                    .with_children(vec![string_def("leaf", "")]),
            ]),
        ]);

        let session = repo.create(&def).unwrap();
        let ids: Vec<_> = session.elements().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(session.get(1).unwrap().parent_id, Some("0".to_string()));
        assert_eq!(session.get(2).unwrap().parent_id, Some("1".to_string()));
        assert_eq!(session.id(), SOLE_SESSION_ID);
    }

    #[test]
    fn test_create_invariants_on_mixed_tree() {
        let repo = MemoryRepository::new();
        let def = definition(vec![
            string_def("top", "t"),
            DefinitionElement::new("box", "box", ElementKind::Container).with_children(vec![
                string_def("a", ""),
                DefinitionElement::new("nested", "nested", ElementKind::Container)
                    .with_children(vec![string_def("deep", "")]),
                string_def("b", ""),
            ]),
            DefinitionElement::new("go", "go", ElementKind::Action),
        ]);

        let session = repo.create(&def).unwrap();

        // ids are a contiguous prefix of 0.. in pre-order
        let ids: Vec<_> = session.elements().iter().map(|e| e.id).collect();
        assert_eq!(ids, (0..7).collect::<Vec<_>>());

        // flat view is exactly the depth-first traversal of the nested view
        assert_eq!(ids, session.nested_preorder());

        // every non-root element's parent_id points at the element whose
        // children list contains it
        for element in session.elements() {
            match element.parent_ref() {
                Some(parent) => assert!(session.children_of(parent).contains(&element.id)),
                None => assert!(session.roots().contains(&element.id)),
            }
        }
    }

    #[test]
    fn test_create_replaces_slot() {
        let repo = MemoryRepository::new();
        repo.create(&definition(vec![string_def("a", "1")])).unwrap();
        repo.create(&definition(vec![string_def("b", "2")])).unwrap();

        // read ignores the id and returns the sole (latest) session
        let session = repo.read("whatever").unwrap();
        assert_eq!(session.elements().len(), 1);
        assert_eq!(session.elements()[0].name, "b");
    }

    #[test]
    fn test_update_element() {
        let repo = MemoryRepository::new();
        repo.create(&definition(vec![string_def("a", "1")])).unwrap();

        let mut element = repo.read("0").unwrap().elements()[0].clone();
        element.value = ElementValue::String {
            value: "changed".to_string(),
        };
        repo.update_element("0", element).unwrap();

        assert_eq!(
            repo.read("0").unwrap().elements()[0].value,
            ElementValue::String {
                value: "changed".to_string()
            }
        );
    }

    #[test]
    fn test_update_missing_element() {
        let repo = MemoryRepository::new();
        repo.create(&definition(vec![string_def("a", "1")])).unwrap();

        let mut element = repo.read("0").unwrap().elements()[0].clone();
        element.id = 42;
        assert_eq!(
            repo.update_element("0", element).unwrap_err(),
            RepoError::Element(ElementError::NotFound(42))
        );
    }

    #[test]
    fn test_add_element_continues_counter() {
        let repo = MemoryRepository::new();
        repo.create(&definition(vec![string_def("a", "1"), string_def("b", "2")]))
            .unwrap();

        let added = repo
            .add_element(
                "0",
                None,
                DraftElement {
                    name: "late".to_string(),
                    label: "late".to_string(),
                    value: ElementValue::Action,
                    children: vec![],
                },
            )
            .unwrap();
        assert_eq!(added.id, 2);
        assert_eq!(repo.read("0").unwrap().elements().len(), 3);
    }

    #[test]
    fn test_add_nested_sets_parent_ids() {
        let repo = MemoryRepository::new();
        repo.create(&definition(vec![string_def("a", "1")])).unwrap();

        let added = repo
            .add_element(
                "0",
                None,
                DraftElement {
                    name: "box".to_string(),
                    label: "box".to_string(),
                    value: ElementValue::Container,
                    children: vec![DraftElement {
                        name: "inner".to_string(),
                        label: "inner".to_string(),
                        value: ElementValue::String {
                            value: "x".to_string(),
                        },
                        children: vec![],
                    }],
                },
            )
            .unwrap();

        let session = repo.read("0").unwrap();
        assert_eq!(added.id, 1);
        let inner = session.get(2).unwrap();
        assert_eq!(inner.name, "inner");
        assert_eq!(inner.parent_id, Some("1".to_string()));
        assert_eq!(session.children_of(1), &[2]);
    }

    #[test]
    fn test_remove_container_removes_subtree() {
        let repo = MemoryRepository::new();
        let def = definition(vec![
            DefinitionElement::new("box", "box", ElementKind::Container)
                .with_children(vec![string_def("inner", "")]),
            string_def("other", ""),
        ]);
        repo.create(&def).unwrap();

        let removed = repo.remove_element("0", 0).unwrap();
        assert_eq!(removed.name, "box");

        let session = repo.read("0").unwrap();
        assert_eq!(session.elements().len(), 1);
        assert_eq!(session.elements()[0].name, "other");
    }

    #[test]
    fn test_remove_missing_element() {
        let repo = MemoryRepository::new();
        repo.create(&definition(vec![string_def("a", "1")])).unwrap();
        assert!(matches!(
            repo.remove_element("0", 9).unwrap_err(),
            RepoError::Element(ElementError::NotFound(9))
        ));
    }

    #[test]
    fn test_delete_empties_slot() {
        let repo = MemoryRepository::new();
        repo.create(&definition(vec![string_def("a", "1")])).unwrap();
        repo.delete("0").unwrap();
        assert_eq!(repo.read("0").unwrap_err(), RepoError::NotCreated);
    }
}
