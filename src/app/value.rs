//! Element values as a tagged variant.
//!
//! Each session element carries exactly the value slot(s) its kind allows;
//! the variant IS the kind, so a string element holding a number is
//! unrepresentable.

use serde::{Deserialize, Serialize};

use super::{ElementError, ElementKind};

/// Default slider bounds when the definition leaves them out.
pub(crate) const SLIDER_MIN_DEFAULT: f64 = 0.0;
pub(crate) const SLIDER_MAX_DEFAULT: f64 = 100.0;

/// The current value of a session element, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ElementValue {
    String { value: String },
    Number { value: f64 },
    Html { value: String },
    Slider { value: f64, min: f64, max: f64 },
    Action,
    Container,
}

impl ElementValue {
    /// The kind this value belongs to.
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::String { .. } => ElementKind::String,
            Self::Number { .. } => ElementKind::Number,
            Self::Html { .. } => ElementKind::Html,
            Self::Slider { .. } => ElementKind::Slider,
            Self::Action => ElementKind::Action,
            Self::Container => ElementKind::Container,
        }
    }

    /// Apply an update payload, enforcing the kind/slot matrix:
    /// text for string/html, real for number/slider, nothing else.
    ///
    /// Slider bounds are never touched by an update.
    pub fn apply(&mut self, update: &UpdateValue) -> Result<(), ElementError> {
        let kind = self.kind();
        match (&mut *self, update) {
            (Self::String { value }, UpdateValue::Text(text)) => {
                *value = text.clone();
                Ok(())
            }
            (Self::Html { value }, UpdateValue::Text(text)) => {
                *value = text.clone();
                Ok(())
            }
            (Self::Number { value }, UpdateValue::Real(real)) => {
                *value = *real;
                Ok(())
            }
            (Self::Slider { value, .. }, UpdateValue::Real(real)) => {
                *value = *real;
                Ok(())
            }
            _ => Err(ElementError::ValueMismatch { kind }),
        }
    }
}

/// An update payload: the one slot a client may write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UpdateValue {
    Real(f64),
    Text(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_string() {
        let mut value = ElementValue::String {
            value: "hi".to_string(),
        };
        value.apply(&UpdateValue::Text("hello".to_string())).unwrap();
        assert_eq!(
            value,
            ElementValue::String {
                value: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_update_slider_keeps_bounds() {
        let mut value = ElementValue::Slider {
            value: 10.0,
            min: 0.0,
            max: 50.0,
        };
        value.apply(&UpdateValue::Real(25.0)).unwrap();
        assert_eq!(
            value,
            ElementValue::Slider {
                value: 25.0,
                min: 0.0,
                max: 50.0
            }
        );
    }

    #[test]
    fn test_update_wrong_slot_rejected() {
        let mut value = ElementValue::Number { value: 1.0 };
        let err = value
            .apply(&UpdateValue::Text("nope".to_string()))
            .unwrap_err();
        assert_eq!(
            err,
            ElementError::ValueMismatch {
                kind: ElementKind::Number
            }
        );
        // value untouched on rejection
        assert_eq!(value, ElementValue::Number { value: 1.0 });
    }

    #[test]
    fn test_update_action_rejected() {
        let mut value = ElementValue::Action;
        assert!(value.apply(&UpdateValue::Real(1.0)).is_err());
        assert!(value.apply(&UpdateValue::Text("x".to_string())).is_err());
    }

    #[test]
    fn test_kind_matches_variant() {
        assert_eq!(
            ElementValue::Html {
                value: "<b>x</b>".to_string()
            }
            .kind(),
            ElementKind::Html
        );
        assert_eq!(ElementValue::Container.kind(), ElementKind::Container);
    }
}
