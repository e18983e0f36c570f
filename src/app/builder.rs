//! Materialise a definition tree into draft session elements.
//!
//! Drafts carry values but no identities; the repository assigns ids when
//! the drafts are attached to a session.
//!
//! A node whose default does not fit its kind is skipped with a warning;
//! the rest of the tree still materialises. Callers rely on this.

use serde::{Deserialize, Serialize};

use super::value::{SLIDER_MAX_DEFAULT, SLIDER_MIN_DEFAULT};
use super::{DefaultValue, Definition, DefinitionElement, ElementError, ElementKind, ElementValue};

/// A materialised element that has not been given an identity yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftElement {
    pub name: String,
    pub label: String,
    #[serde(flatten)]
    pub value: ElementValue,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DraftElement>,
}

/// Materialise every root element of a definition. Nodes that fail the
/// kind/default check are omitted, not fatal.
pub fn materialise_app(def: &Definition) -> Vec<DraftElement> {
    def.elements
        .iter()
        .filter_map(|element| match materialise_element(element) {
            Ok(draft) => Some(draft),
            Err(err) => {
                crate::log!("warning"; "skipping element: {err}");
                None
            }
        })
        .collect()
}

/// Materialise one definition node (and, for containers, its children).
pub fn materialise_element(def: &DefinitionElement) -> Result<DraftElement, ElementError> {
    let mismatch = || ElementError::DefaultMismatch {
        name: def.name.clone(),
        kind: def.kind,
    };

    let value = match def.kind {
        ElementKind::String => match &def.default {
            Some(DefaultValue::Text(text)) => ElementValue::String { value: text.clone() },
            _ => return Err(mismatch()),
        },
        ElementKind::Html => match &def.default {
            Some(DefaultValue::Text(text)) => ElementValue::Html { value: text.clone() },
            _ => return Err(mismatch()),
        },
        ElementKind::Number => match &def.default {
            Some(DefaultValue::Real(real)) => ElementValue::Number { value: *real },
            _ => return Err(mismatch()),
        },
        ElementKind::Slider => match &def.default {
            Some(DefaultValue::Real(real)) => ElementValue::Slider {
                value: *real,
                min: def.slider_min.unwrap_or(SLIDER_MIN_DEFAULT),
                max: def.slider_max.unwrap_or(SLIDER_MAX_DEFAULT),
            },
            _ => return Err(mismatch()),
        },
        ElementKind::Action => ElementValue::Action,
        ElementKind::Container => ElementValue::Container,
    };

    let children = if def.kind.has_children() {
        def.children
            .iter()
            .filter_map(|child| match materialise_element(child) {
                Ok(draft) => Some(draft),
                Err(err) => {
                    crate::log!("warning"; "skipping element: {err}");
                    None
                }
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(DraftElement {
        name: def.name.clone(),
        label: def.label.clone(),
        value,
        children,
    })
}
