//! Plan generation: turning a cleaned DOM snapshot plus profile data
//! into an ordered action list via the reasoning backend.
//!
//! Parsing is deliberately lenient. Reasoning backends wrap JSON in
//! markdown fences, rename keys, or return a bare array; all of these
//! shapes are accepted. A transport or parse failure yields an empty
//! plan, never a hard error, so the orchestrator can fall through to
//! its recovery pass.

use async_trait::async_trait;
use serde_json::Value;

use formflow_core::action::{is_missing_value, Action, ActionKind};

use crate::controls::ProfileData;
use crate::error::AutomationError;

/// One field the validation pass flagged as still missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingField {
    pub label: String,
    pub selector: String,
}

/// Produces action plans and post-execution validations.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Action plan for the current snapshot. Empty on any failure.
    async fn generate(
        &self,
        html: &str,
        profile: &ProfileData,
    ) -> Result<Vec<Action>, AutomationError>;

    /// Fields still empty or invalid after execution. Empty on failure.
    async fn validate(&self, html: &str) -> Result<Vec<MissingField>, AutomationError>;

    /// Raw JS snippet that forces a stuck `<select>` to `value`, or an
    /// empty string when no fix could be produced.
    async fn dropdown_fix_script(&self, html: &str, selector: &str, value: &str) -> String;
}

const MAX_PLAN_TOKENS: u32 = 4000;
const MAX_VALIDATE_TOKENS: u32 = 1000;
const MAX_FIX_TOKENS: u32 = 500;

/// Reasoner-backed planner.
pub struct PlanGenerator {
    reasoner: formflow_llm::Reasoner,
}

impl PlanGenerator {
    pub fn new(reasoner: formflow_llm::Reasoner) -> Self {
        Self { reasoner }
    }
}

#[async_trait]
impl Planner for PlanGenerator {
    async fn generate(
        &self,
        html: &str,
        profile: &ProfileData,
    ) -> Result<Vec<Action>, AutomationError> {
        let messages = [
            formflow_llm::ChatMessage::system(PLAN_SYSTEM_PROMPT),
            formflow_llm::ChatMessage::user(plan_prompt(html, profile)),
        ];
        match self
            .reasoner
            .complete(&messages, formflow_llm::ResponseFormat::JsonObject, MAX_PLAN_TOKENS)
            .await
        {
            Ok(text) => Ok(parse_plan(&text)),
            Err(e) => {
                tracing::warn!(error = %e, "Plan generation failed, continuing with empty plan");
                Ok(Vec::new())
            }
        }
    }

    async fn validate(&self, html: &str) -> Result<Vec<MissingField>, AutomationError> {
        let messages = [
            formflow_llm::ChatMessage::system(VALIDATE_SYSTEM_PROMPT),
            formflow_llm::ChatMessage::user(validate_prompt(html)),
        ];
        match self
            .reasoner
            .complete(
                &messages,
                formflow_llm::ResponseFormat::JsonObject,
                MAX_VALIDATE_TOKENS,
            )
            .await
        {
            Ok(text) => Ok(parse_missing_fields(&text)),
            Err(e) => {
                tracing::warn!(error = %e, "Validation query failed, assuming nothing missing");
                Ok(Vec::new())
            }
        }
    }

    async fn dropdown_fix_script(&self, html: &str, selector: &str, value: &str) -> String {
        let messages = [
            formflow_llm::ChatMessage::system(FIX_SYSTEM_PROMPT),
            formflow_llm::ChatMessage::user(fix_prompt(html, selector, value)),
        ];
        match self
            .reasoner
            .complete(&messages, formflow_llm::ResponseFormat::Text, MAX_FIX_TOKENS)
            .await
        {
            Ok(text) => strip_fences(&text).to_string(),
            Err(e) => {
                tracing::warn!(selector, error = %e, "Dropdown fix generation failed");
                String::new()
            }
        }
    }
}

const PLAN_SYSTEM_PROMPT: &str = "You are a form automation planner. You receive the \
HTML of a web form and a user data object, and you respond with a JSON object \
{\"actions\": [...]} describing how to fill and submit the form. Respond with JSON only.";

fn plan_prompt(html: &str, profile: &ProfileData) -> String {
    format!(
        "Fill out the form in the HTML below using the user data.\n\
         Rules:\n\
         - Emit one action per visible form field, in document order.\n\
         - Action shape: {{\"selector\": \"css\", \"type\": \"fill|click|upload|ask_user\", \"value\": \"...\"}}.\n\
         - Fill every visible field you can resolve from the user data.\n\
         - If a visible required field has no matching user data, emit an \
           ask_user action with the field's human-readable label as the value. \
           Never invent data and never emit the literal strings \"undefined\" or \"null\".\n\
         - For <select> dropdowns, use type \"fill\" with the visible option text as the value.\n\
         - For buttons without ids, use text-content selectors like button:has-text(\"Submit\").\n\
         - For file inputs, emit an upload action; leave the value empty unless \
           the user data contains a file path.\n\
         - For date fields, use the current_date / current_day / current_year \
           entries of the user data when the form asks for today's date.\n\
         - The final action must be the single click that submits the form. \
           Emit it last and emit no action after it.\n\n\
         User data:\n{}\n\nForm HTML:\n{}",
        profile.to_json(),
        html
    )
}

const VALIDATE_SYSTEM_PROMPT: &str = "You are a form QA checker. You receive the HTML of \
a form after an automated fill attempt and respond with a JSON object \
{\"missing\": [{\"label\": \"...\", \"selector\": \"css\"}]} listing visible required \
fields that are still empty or invalid. Respond with JSON only.";

fn validate_prompt(html: &str) -> String {
    format!(
        "List the visible required fields that are still empty or carry a \
         validation error in this HTML. Respond {{\"missing\": []}} if the form \
         looks complete.\n\nForm HTML:\n{html}"
    )
}

const FIX_SYSTEM_PROMPT: &str = "You write minimal vanilla JavaScript snippets that set a \
<select> element to a given option and fire its change handlers. Respond with raw \
JavaScript only, no markdown, no explanation.";

fn fix_prompt(html: &str, selector: &str, value: &str) -> String {
    format!(
        "The select element matching `{selector}` refuses normal selection. \
         Write JavaScript that sets it to the option matching \"{value}\" \
         (by visible text or value), then dispatches change and input events.\n\n\
         Surrounding HTML:\n{html}"
    )
}

/// Strip a leading/trailing markdown code fence if present.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. ```json) up to the first newline.
    let rest = match rest.find('\n') {
        Some(nl) => &rest[nl + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a plan response into actions, accepting the documented shape
/// variants. Unusable entries are dropped individually.
pub fn parse_plan(text: &str) -> Vec<Action> {
    let Ok(value) = serde_json::from_str::<Value>(strip_fences(text)) else {
        tracing::warn!("Plan response is not JSON, treating as empty plan");
        return Vec::new();
    };
    let items = match extract_array(&value) {
        Some(items) => items,
        None => return Vec::new(),
    };
    items.iter().filter_map(parse_action).collect()
}

/// Find the action array: the value itself, its `actions` key, or the
/// first array-valued key of the object.
fn extract_array(value: &Value) -> Option<&Vec<Value>> {
    if let Some(items) = value.as_array() {
        return Some(items);
    }
    let obj = value.as_object()?;
    if let Some(items) = obj.get("actions").and_then(Value::as_array) {
        return Some(items);
    }
    obj.values().find_map(Value::as_array)
}

fn parse_action(item: &Value) -> Option<Action> {
    let obj = item.as_object()?;
    let selector = obj
        .get("selector")
        .or_else(|| obj.get("target_selector"))
        .and_then(Value::as_str)?
        .trim()
        .to_string();
    if selector.is_empty() {
        return None;
    }
    let kind = match obj.get("type").or_else(|| obj.get("action")).and_then(Value::as_str) {
        Some("fill") => ActionKind::Fill,
        Some("click") => ActionKind::Click,
        Some("upload") => ActionKind::Upload,
        Some("ask_user") => ActionKind::AskUser,
        other => {
            tracing::debug!(?other, selector, "Dropping action with unknown type");
            return None;
        }
    };
    let value = obj
        .get("value")
        .or_else(|| obj.get("question_label"))
        .and_then(Value::as_str)
        .map(str::to_string);

    // A fill whose value came back as a missing sentinel is really an
    // unresolved field; downgrade it to an input request.
    if kind == ActionKind::Fill {
        match value.as_deref() {
            None => return Some(Action::ask_user(selector.clone(), selector)),
            Some(v) if is_missing_value(v) => {
                return Some(Action::ask_user(selector.clone(), selector))
            }
            Some(_) => {}
        }
    }
    Some(Action::new(selector, kind, value))
}

/// Parse a validation response into missing fields, same leniency.
pub fn parse_missing_fields(text: &str) -> Vec<MissingField> {
    let Ok(value) = serde_json::from_str::<Value>(strip_fences(text)) else {
        return Vec::new();
    };
    let items = match extract_array(&value) {
        Some(items) => items,
        None => return Vec::new(),
    };
    items
        .iter()
        .filter_map(|item| {
            let obj = item.as_object()?;
            let selector = obj.get("selector").and_then(Value::as_str)?.trim();
            if selector.is_empty() {
                return None;
            }
            let label = obj
                .get("label")
                .and_then(Value::as_str)
                .unwrap_or(selector)
                .to_string();
            Some(MissingField {
                label,
                selector: selector.to_string(),
            })
        })
        .collect()
}
