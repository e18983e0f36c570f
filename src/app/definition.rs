//! Definition tree: the schema the developer authored.
//!
//! Paths are threaded through recursion rather than stored as back-links;
//! a node's path is the ordered sequence of names from root to the node.

use super::ElementKind;

/// A named, titled root holding the app's root elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub title: Option<String>,
    pub elements: Vec<DefinitionElement>,
}

/// A single schema node.
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionElement {
    /// Identifier, unique among siblings.
    pub name: String,
    /// Display label.
    pub label: String,
    pub kind: ElementKind,
    /// Declared default; dynamic type must match `kind` at materialisation.
    pub default: Option<DefaultValue>,
    /// Slider bounds; only meaningful when kind is `slider`.
    pub slider_min: Option<f64>,
    pub slider_max: Option<f64>,
    /// Ordered children; non-empty only for containers.
    pub children: Vec<DefinitionElement>,
}

/// A default value as declared: text or a real number.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Text(String),
    Real(f64),
}

impl std::fmt::Display for DefaultValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Real(real) => write!(f, "{real}"),
        }
    }
}

impl Definition {
    /// Walk children by name, descending into containers. Returns `None`
    /// if any path segment is missing.
    pub fn find_by_path(&self, path: &[&str]) -> Option<&DefinitionElement> {
        let (first, rest) = path.split_first()?;
        let mut current = self.elements.iter().find(|e| e.name == *first)?;
        for segment in rest {
            current = current.children.iter().find(|e| e.name == *segment)?;
        }
        Some(current)
    }

    /// Total node count, all levels.
    pub fn len(&self) -> usize {
        fn count(elements: &[DefinitionElement]) -> usize {
            elements.iter().map(|e| 1 + count(&e.children)).sum()
        }
        count(&self.elements)
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl DefinitionElement {
    /// Leaf constructor; children and slider bounds start empty.
    pub fn new(name: impl Into<String>, label: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind,
            default: None,
            slider_min: None,
            slider_max: None,
            children: Vec::new(),
        }
    }

    pub fn with_default(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_children(mut self, children: Vec<DefinitionElement>) -> Self {
        self.children = children;
        self
    }
}
