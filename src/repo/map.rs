//! Multi-slot in-memory repository.
//!
//! One session per id, ids issued by an incrementing counter. This is the
//! shape a persistent backing store has: `read(id)` means that id, and
//! `create` never clobbers an existing session.

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::{RepoError, SessionRepository};
use crate::app::{Definition, DraftElement, ElementId, Session, SessionElement, materialise_app};

#[derive(Default)]
pub struct MapRepository {
    inner: RwLock<Slots>,
}

#[derive(Default)]
struct Slots {
    sessions: FxHashMap<String, Session>,
    next_session: u64,
}

impl MapRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_session<T>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut Session) -> Result<T, RepoError>,
    ) -> Result<T, RepoError> {
        let mut inner = self.inner.write();
        let session = inner
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| RepoError::SessionNotFound(session_id.to_string()))?;
        f(session)
    }
}

impl SessionRepository for MapRepository {
    fn create(&self, def: &Definition) -> Result<Session, RepoError> {
        let mut inner = self.inner.write();
        let session_id = inner.next_session.to_string();
        inner.next_session += 1;

        let mut session = Session::new(session_id.clone(), def.name.clone(), def.title.clone());
        for draft in materialise_app(def) {
            session.insert_tree(None, draft);
        }
        inner.sessions.insert(session_id, session.clone());
        Ok(session)
    }

    fn read(&self, session_id: &str) -> Result<Session, RepoError> {
        self.inner
            .read()
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| RepoError::SessionNotFound(session_id.to_string()))
    }

    fn update_element(&self, session_id: &str, element: SessionElement) -> Result<(), RepoError> {
        self.with_session(session_id, |session| Ok(session.replace(element)?))
    }

    fn add_element(
        &self,
        session_id: &str,
        parent_id: Option<ElementId>,
        element: DraftElement,
    ) -> Result<SessionElement, RepoError> {
        self.with_session(session_id, |session| {
            let root_id = session.insert_tree(parent_id, element);
            Ok(session.get(root_id).cloned().expect("just inserted"))
        })
    }

    fn remove_element(
        &self,
        session_id: &str,
        element_id: ElementId,
    ) -> Result<SessionElement, RepoError> {
        self.with_session(session_id, |session| Ok(session.remove_subtree(element_id)?))
    }

    fn delete(&self, session_id: &str) -> Result<(), RepoError> {
        let mut inner = self.inner.write();
        inner
            .sessions
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| RepoError::SessionNotFound(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{DefaultValue, DefinitionElement, ElementKind};

    fn definition(name: &str) -> Definition {
        Definition {
            name: name.to_string(),
            title: None,
            elements: vec![
                DefinitionElement::new("greeting", "Greeting", ElementKind::String)
                    .with_default(DefaultValue::Text("hi".to_string())),
            ],
        }
    }

    #[test]
    fn test_create_does_not_clobber() {
        let repo = MapRepository::new();
        let first = repo.create(&definition("one")).unwrap();
        let second = repo.create(&definition("two")).unwrap();

        assert_eq!(first.id(), "0");
        assert_eq!(second.id(), "1");
        assert_eq!(repo.read("0").unwrap().app_name(), "one");
        assert_eq!(repo.read("1").unwrap().app_name(), "two");
    }

    #[test]
    fn test_read_unknown_session() {
        let repo = MapRepository::new();
        assert_eq!(
            repo.read("7").unwrap_err(),
            RepoError::SessionNotFound("7".to_string())
        );
    }

    #[test]
    fn test_delete_is_per_id() {
        let repo = MapRepository::new();
        repo.create(&definition("one")).unwrap();
        repo.create(&definition("two")).unwrap();

        repo.delete("0").unwrap();
        assert!(repo.read("0").is_err());
        assert!(repo.read("1").is_ok());
    }

    #[test]
    fn test_mutations_target_one_slot() {
        let repo = MapRepository::new();
        repo.create(&definition("one")).unwrap();
        repo.create(&definition("two")).unwrap();

        let mut element = repo.read("1").unwrap().elements()[0].clone();
        element.label = "renamed".to_string();
        repo.update_element("1", element).unwrap();

        assert_eq!(repo.read("0").unwrap().elements()[0].label, "Greeting");
        assert_eq!(repo.read("1").unwrap().elements()[0].label, "renamed");
    }
}
