//! Introspection wire format.
//!
//! The child interpreter prints exactly one JSON document on stdout:
//! either `{"app": {...}}` or `{"error": {...}}` with one of four error
//! shapes inside. Unknown fields are ignored. Nodes with a kind outside
//! the closed set are skipped with a warning, mirroring the
//! skip-on-mismatch materialisation policy.

mod run;

pub use run::introspect;

use owo_colors::OwoColorize;
use serde::Deserialize;
use thiserror::Error;

use crate::app::{DefaultValue, Definition, DefinitionElement, ElementKind};

// ============================================================================
// Errors
// ============================================================================

/// Everything that can go wrong between "spawn the interpreter" and
/// "hold a definition tree".
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntrospectError {
    #[error("app `{app}` not found")]
    AppNotFound { app: String, found_apps: Vec<String> },

    #[error("module `{module}` not found")]
    ModuleNotFound { module: String },

    #[error("app syntax error: {msg}")]
    AppSyntax {
        context: String,
        msg: String,
        line: u64,
        offset: u64,
    },

    #[error("interpreter error: {typename}")]
    Unknown { typename: String, traceback: String },

    #[error("malformed introspection output: {0}")]
    Malformed(String),

    #[error("failed to run interpreter: {0}")]
    Spawn(String),
}

impl IntrospectError {
    /// Multi-line colored detail for the watch status display.
    pub fn detail(&self) -> String {
        match self {
            Self::AppNotFound { found_apps, .. } if !found_apps.is_empty() => {
                format!(
                    "{} {}",
                    "available apps:".dimmed(),
                    found_apps.join(", ").cyan()
                )
            }
            Self::AppSyntax {
                context,
                line,
                offset,
                ..
            } => format!("{} {}:{}\n{}", "-->".red(), line, offset, context.dimmed()),
            Self::Unknown { traceback, .. } => format!("{}", traceback.dimmed()),
            _ => String::new(),
        }
    }
}

// ============================================================================
// Wire model
// ============================================================================

#[derive(Debug, Deserialize)]
struct ReadOutput {
    app: Option<WireApp>,
    error: Option<WireErrors>,
}

#[derive(Debug, Deserialize)]
struct WireApp {
    title: Option<String>,
    name: String,
    #[serde(default)]
    elements: Vec<WireElement>,
}

#[derive(Debug, Deserialize)]
struct WireElement {
    name: String,
    label: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    default: Option<serde_json::Value>,
    slider_min_value: Option<f64>,
    slider_max_value: Option<f64>,
    #[serde(default)]
    elements: Vec<WireElement>,
}

#[derive(Debug, Deserialize)]
struct WireErrors {
    appnotfound: Option<WireAppNotFound>,
    modulenotfound: Option<WireModuleNotFound>,
    appsyntax: Option<WireAppSyntax>,
    unknown: Option<WireUnknown>,
}

#[derive(Debug, Deserialize)]
struct WireAppNotFound {
    app: String,
    #[serde(default)]
    found_apps: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct WireModuleNotFound {
    module: String,
}

#[derive(Debug, Deserialize)]
struct WireAppSyntax {
    context: String,
    msg: String,
    pos: WirePos,
}

#[derive(Debug, Deserialize)]
struct WirePos {
    line: u64,
    offset: u64,
}

#[derive(Debug, Deserialize)]
struct WireUnknown {
    typename: String,
    traceback: String,
}

// ============================================================================
// Parsing
// ============================================================================

/// Parse raw introspector stdout into a definition tree.
pub fn parse(bytes: &[u8]) -> Result<Definition, IntrospectError> {
    let output: ReadOutput = serde_json::from_slice(bytes)
        .map_err(|e| IntrospectError::Malformed(e.to_string()))?;

    if let Some(error) = output.error {
        return Err(convert_error(error));
    }

    let Some(app) = output.app else {
        return Err(IntrospectError::Malformed(
            "output carries neither `app` nor `error`".to_string(),
        ));
    };

    Ok(Definition {
        name: app.name,
        title: app.title,
        elements: convert_elements(app.elements),
    })
}

fn convert_error(error: WireErrors) -> IntrospectError {
    if let Some(e) = error.appnotfound {
        IntrospectError::AppNotFound {
            app: e.app,
            found_apps: e.found_apps,
        }
    } else if let Some(e) = error.modulenotfound {
        IntrospectError::ModuleNotFound { module: e.module }
    } else if let Some(e) = error.appsyntax {
        IntrospectError::AppSyntax {
            context: e.context,
            msg: e.msg,
            line: e.pos.line,
            offset: e.pos.offset,
        }
    } else if let Some(e) = error.unknown {
        IntrospectError::Unknown {
            typename: e.typename,
            traceback: e.traceback,
        }
    } else {
        IntrospectError::Malformed("error object with no known shape".to_string())
    }
}

fn convert_elements(elements: Vec<WireElement>) -> Vec<DefinitionElement> {
    elements
        .into_iter()
        .filter_map(|element| match element.kind.parse::<ElementKind>() {
            Ok(kind) => Some(convert_element(element, kind)),
            Err(err) => {
                crate::log!("warning"; "skipping `{}`: {err}", element.name);
                None
            }
        })
        .collect()
}

fn convert_element(element: WireElement, kind: ElementKind) -> DefinitionElement {
    let children = if kind.has_children() {
        convert_elements(element.elements)
    } else {
        Vec::new()
    };

    DefinitionElement {
        label: element.label.unwrap_or_else(|| element.name.clone()),
        name: element.name,
        kind,
        default: element.default.and_then(convert_default),
        slider_min: element.slider_min_value,
        slider_max: element.slider_max_value,
        children,
    }
}

/// Text and reals survive; any other JSON type is dropped here and the
/// node then fails the kind/default check downstream.
fn convert_default(value: serde_json::Value) -> Option<DefaultValue> {
    match value {
        serde_json::Value::String(text) => Some(DefaultValue::Text(text)),
        serde_json::Value::Number(real) => real.as_f64().map(DefaultValue::Real),
        _ => None,
    }
}
