//! Page and frame operation traits.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::BrowserError;

/// One option of a `<select>` element, as seen in the live DOM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    /// Visible text, trimmed.
    pub text: String,
    /// Underlying `value` attribute.
    pub value: String,
    /// Zero-based option index.
    pub index: usize,
}

/// Browser context launch parameters, read from settings per job.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    pub viewport: Option<(u32, u32)>,
    pub user_agent: Option<String>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: None,
            user_agent: None,
        }
    }
}

/// Element operations scoped to one document: the main document or one
/// child frame. Selectors are CSS.
#[async_trait]
pub trait DomScope: Send + Sync {
    /// True when at least one element matches in this scope.
    async fn exists(&self, selector: &str) -> bool;

    /// False for read-only/disabled controls.
    async fn is_editable(&self, selector: &str) -> Result<bool, BrowserError>;

    /// Upper-cased tag name of the first match (e.g. `SELECT`).
    async fn tag_name(&self, selector: &str) -> Result<String, BrowserError>;

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    async fn focus(&self, selector: &str) -> Result<(), BrowserError>;

    async fn blur(&self, selector: &str) -> Result<(), BrowserError>;

    /// Dispatch a DOM event (`change`, `input`, ...) on the first match.
    async fn dispatch_event(&self, selector: &str, event: &str) -> Result<(), BrowserError>;

    /// All options of a `<select>` element.
    async fn select_options(&self, selector: &str) -> Result<Vec<SelectOption>, BrowserError>;

    async fn select_by_value(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    async fn select_by_index(&self, selector: &str, index: usize) -> Result<(), BrowserError>;

    async fn select_by_label(&self, selector: &str, label: &str) -> Result<(), BrowserError>;

    /// Last-resort select mechanism: set the element value directly and
    /// dispatch `change`, `input`, `click`, and `blur` manually. Used
    /// when the regular selection mechanism throws.
    async fn force_select_value(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    async fn set_input_files(&self, selector: &str, paths: &[String]) -> Result<(), BrowserError>;

    async fn get_attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    /// Human-readable label for an element: associated `<label>`,
    /// `aria-label`, or `placeholder`, in that order.
    async fn field_label(&self, selector: &str) -> Result<Option<String>, BrowserError>;

    /// Evaluate a script in this scope and return its JSON result.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError>;
}

/// One live page (one browser context per job).
#[async_trait]
pub trait Page: Send + Sync {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Full HTML of the main document.
    async fn content(&self) -> Result<String, BrowserError>;

    /// Concatenated visible text of the page, for success detection.
    async fn visible_text(&self) -> Result<String, BrowserError>;

    /// The main document scope.
    fn scope(&self) -> Arc<dyn DomScope>;

    /// Child frame scopes, main frame excluded.
    async fn frames(&self) -> Vec<Arc<dyn DomScope>>;

    /// HTML of each same-origin child frame, for snapshot aggregation.
    /// Cross-origin frames are silently skipped.
    async fn frame_contents(&self) -> Vec<String>;

    /// Pruned clone of the document containing only currently visible
    /// elements, with live input/select/checkbox state synced into
    /// attributes. Implementations evaluate
    /// [`crate::snapshot::VISIBLE_SNAPSHOT_SCRIPT`].
    async fn visible_snapshot(&self) -> Result<String, BrowserError>;

    /// Wait for network idle, giving up after `timeout`. Returns whether
    /// idle was actually reached; callers fall back to a fixed delay on
    /// false (ad/streaming content may never quiesce).
    async fn wait_for_network_idle(&self, timeout: Duration) -> bool;

    /// Plain sleep, as a cooperative yield between interactions.
    async fn wait(&self, duration: Duration);

    async fn close(&self) -> Result<(), BrowserError>;
}

/// Opens one page per job.
#[async_trait]
pub trait BrowserProvider: Send + Sync {
    async fn open_page(&self, options: &LaunchOptions) -> Result<Arc<dyn Page>, BrowserError>;
}
