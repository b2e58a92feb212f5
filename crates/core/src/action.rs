//! The Action model: one atomic form-interaction instruction.
//!
//! An action plan is an ordered list of [`Action`]s, produced either by
//! the plan generator or replayed from a cached form template. The JSON
//! wire shape matches what the reasoning backend is prompted to emit and
//! what the `form_templates.actions` column stores.

use serde::{Deserialize, Serialize};

/// What an action does to its target element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Type text into an input, or select a dropdown option by visible text.
    Fill,
    /// Click a button, checkbox, or radio button.
    Click,
    /// Set files on an `<input type="file">`.
    Upload,
    /// Pause and ask a human for the value; `value` carries the question label.
    AskUser,
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fill => write!(f, "fill"),
            Self::Click => write!(f, "click"),
            Self::Upload => write!(f, "upload"),
            Self::AskUser => write!(f, "ask_user"),
        }
    }
}

/// One form-interaction step.
///
/// `selector` must resolve to exactly one addressable element across the
/// main document or any nested frame at execution time; otherwise the
/// action is skipped as failed, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub selector: String,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Action {
    pub fn new(selector: impl Into<String>, kind: ActionKind, value: Option<String>) -> Self {
        Self {
            selector: selector.into(),
            kind,
            value,
        }
    }

    /// Shorthand for an `ask_user` recovery action.
    pub fn ask_user(selector: impl Into<String>, label: impl Into<String>) -> Self {
        Self::new(selector, ActionKind::AskUser, Some(label.into()))
    }
}

/// True when a fill value must be treated as absent.
///
/// Reasoning backends occasionally serialize missing data as the literal
/// strings `undefined` or `null`; those must never reach a form field.
pub fn is_missing_value(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || v.eq_ignore_ascii_case("undefined") || v.eq_ignore_ascii_case("null")
}

/// Parse an action/upload value into a list of file paths.
///
/// The value may be a JSON string array (the prompt asks for one) or a
/// bare single path.
pub fn file_list(value: &str) -> Vec<String> {
    if let Ok(parsed) = serde_json::from_str::<Vec<String>>(value) {
        return parsed;
    }
    if value.trim().is_empty() {
        return Vec::new();
    }
    vec![value.to_string()]
}
