//! The closed set of element kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ElementError;

/// What a UI element is. Only `container` has children; only `action`
/// carries no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    String,
    Number,
    Slider,
    Html,
    Action,
    Container,
}

impl ElementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Slider => "slider",
            Self::Html => "html",
            Self::Action => "action",
            Self::Container => "container",
        }
    }

    /// Only containers may hold children.
    pub fn has_children(self) -> bool {
        matches!(self, Self::Container)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElementKind {
    type Err = ElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "slider" => Ok(Self::Slider),
            "html" => Ok(Self::Html),
            "action" => Ok(Self::Action),
            "container" => Ok(Self::Container),
            other => Err(ElementError::UnknownKind(other.to_string())),
        }
    }
}
