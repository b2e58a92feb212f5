//! Ordered action execution against a live page.
//!
//! Every action is applied independently: a failing action is logged
//! and counted, and the loop moves on. Only cancellation intent (a
//! human declining a blocking request, or a stop status observed at a
//! checkpoint) aborts the whole run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;

use formflow_browser::page::{DomScope, Page, SelectOption};
use formflow_core::action::{file_list, is_missing_value, Action, ActionKind};
use formflow_core::dates::normalize_date;
use formflow_core::matcher::match_profile_value;

use crate::controls::{AskKind, AutomationLogger, JobControls, ProfileData, SKIP_SENTINEL};
use crate::error::AutomationError;
use crate::plan::Planner;

/// Outcome of one plan execution.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionReport {
    /// At least one click ran, so the page may have re-rendered.
    pub did_navigate: bool,
    /// Actions that could not be applied.
    pub failed: u32,
}

/// Applies an action plan to a page.
pub struct ActionExecutor {
    element_timeout: Duration,
    action_delay: Duration,
    upload_root: Option<String>,
}

impl ActionExecutor {
    pub fn new(element_timeout: Duration, upload_root: Option<String>) -> Self {
        Self {
            element_timeout,
            action_delay: Duration::from_millis(500),
            upload_root,
        }
    }

    pub async fn execute(
        &self,
        page: &dyn Page,
        actions: &[Action],
        profile: &ProfileData,
        logger: &dyn AutomationLogger,
        controls: &dyn JobControls,
        planner: Option<&dyn Planner>,
    ) -> Result<ExecutionReport, AutomationError> {
        let mut report = ExecutionReport::default();
        for action in actions {
            controls.check_pause().await?;

            let result = self
                .apply(page, action, profile, logger, controls, planner)
                .await;
            match result {
                Ok(navigated) => report.did_navigate |= navigated,
                Err(e) if e.is_cancellation() => return Err(e),
                Err(e) => {
                    report.failed += 1;
                    logger
                        .log(
                            "warning",
                            &format!("Action failed: {} {} ({e})", action.kind, action.selector),
                            None,
                        )
                        .await;
                }
            }
            page.wait(self.action_delay).await;
        }
        Ok(report)
    }

    /// Apply one action. `Ok(true)` when the page may have re-rendered.
    async fn apply(
        &self,
        page: &dyn Page,
        action: &Action,
        profile: &ProfileData,
        logger: &dyn AutomationLogger,
        controls: &dyn JobControls,
        planner: Option<&dyn Planner>,
    ) -> Result<bool, AutomationError> {
        let Some((scope, selector)) = self.locate(page, &action.selector).await else {
            return Err(AutomationError::Internal(format!(
                "No element matches {}",
                action.selector
            )));
        };

        match action.kind {
            ActionKind::Fill => {
                self.fill(page, &scope, &selector, action, profile, logger, controls, planner)
                    .await?;
                Ok(false)
            }
            ActionKind::Click => {
                self.click(page, &scope, &selector, logger).await?;
                Ok(true)
            }
            ActionKind::Upload => {
                self.upload(&scope, &selector, action, profile, logger, controls)
                    .await?;
                Ok(false)
            }
            ActionKind::AskUser => {
                let label = match action.value.as_deref() {
                    Some(v) if !v.trim().is_empty() => v.to_string(),
                    _ => self.derive_label(&scope, &selector).await,
                };
                self.resolve_input(page, &scope, &selector, &label, profile, logger, controls)
                    .await?;
                Ok(false)
            }
        }
    }

    /// Find the scope containing `selector`: main document first, then
    /// each child frame, one brief retry, then a case-insensitive
    /// attribute variant of the selector.
    async fn locate(
        &self,
        page: &dyn Page,
        selector: &str,
    ) -> Option<(Arc<dyn DomScope>, String)> {
        for attempt in 0..2 {
            if attempt > 0 {
                page.wait(Duration::from_millis(1000)).await;
            }
            let main = page.scope();
            if main.exists(selector).await {
                return Some((main, selector.to_string()));
            }
            for frame in page.frames().await {
                if frame.exists(selector).await {
                    return Some((frame, selector.to_string()));
                }
            }
        }
        if let Some(relaxed) = case_insensitive_variant(selector) {
            let main = page.scope();
            if main.exists(&relaxed).await {
                return Some((main, relaxed));
            }
            for frame in page.frames().await {
                if frame.exists(&relaxed).await {
                    return Some((frame, relaxed));
                }
            }
        }
        None
    }

    #[allow(clippy::too_many_arguments)]
    async fn fill(
        &self,
        page: &dyn Page,
        scope: &Arc<dyn DomScope>,
        selector: &str,
        action: &Action,
        profile: &ProfileData,
        logger: &dyn AutomationLogger,
        controls: &dyn JobControls,
        planner: Option<&dyn Planner>,
    ) -> Result<(), AutomationError> {
        let value = action.value.as_deref().unwrap_or("");
        if is_missing_value(value) {
            let label = self.derive_label(scope, selector).await;
            return self
                .resolve_input(page, scope, selector, &label, profile, logger, controls)
                .await;
        }

        if !scope.is_editable(selector).await? {
            return Err(AutomationError::Internal(format!(
                "Element {selector} is not editable"
            )));
        }

        let tag = scope.tag_name(selector).await?;
        if tag == "SELECT" {
            return self
                .fill_select(page, scope, selector, value, logger, planner)
                .await;
        }

        let input_type = scope.get_attribute(selector, "type").await?.unwrap_or_default();
        let value = if input_type == "date" {
            normalize_date(value).unwrap_or_else(|| value.to_string())
        } else {
            value.to_string()
        };
        scope.fill(selector, &value).await?;
        Ok(())
    }

    /// The select protocol: focus, select a different option first so
    /// the real selection always fires a state change, brief wait, then
    /// the target option plus manual change/input events and blur.
    async fn fill_select(
        &self,
        page: &dyn Page,
        scope: &Arc<dyn DomScope>,
        selector: &str,
        wanted: &str,
        logger: &dyn AutomationLogger,
        planner: Option<&dyn Planner>,
    ) -> Result<(), AutomationError> {
        let options = scope.select_options(selector).await?;
        let Some(target) = resolve_option(&options, wanted) else {
            return Err(AutomationError::Internal(format!(
                "No option of {selector} matches \"{wanted}\""
            )));
        };

        let protocol: Result<(), formflow_browser::BrowserError> = async {
            scope.focus(selector).await?;
            if let Some(other) = options.iter().find(|o| o.index != target.index) {
                scope.select_by_index(selector, other.index).await?;
                page.wait(Duration::from_millis(200)).await;
            }
            scope.select_by_value(selector, &target.value).await?;
            scope.dispatch_event(selector, "change").await?;
            scope.dispatch_event(selector, "input").await?;
            scope.blur(selector).await?;
            Ok(())
        }
        .await;

        if let Err(e) = protocol {
            logger
                .log(
                    "warning",
                    &format!("Select protocol failed on {selector}, forcing value ({e})"),
                    None,
                )
                .await;
            if scope.force_select_value(selector, &target.value).await.is_err() {
                if let Some(planner) = planner {
                    let html = page.content().await.unwrap_or_default();
                    let script = planner.dropdown_fix_script(&html, selector, wanted).await;
                    if !script.is_empty() {
                        scope.evaluate(&script).await?;
                        return Ok(());
                    }
                }
                return Err(AutomationError::Internal(format!(
                    "Select {selector} rejected all mechanisms"
                )));
            }
        }
        Ok(())
    }

    async fn click(
        &self,
        page: &dyn Page,
        scope: &Arc<dyn DomScope>,
        selector: &str,
        logger: &dyn AutomationLogger,
    ) -> Result<(), AutomationError> {
        if let Err(e) = scope.click(selector).await {
            // Planners sometimes emit a click on an <option>; heal it
            // into a selection on the parent <select>.
            if let Some((parent, _)) = selector.rsplit_once(" option") {
                let value = scope.get_attribute(selector, "value").await?.unwrap_or_default();
                logger
                    .log(
                        "info",
                        &format!("Healing option click on {selector} into select on {parent}"),
                        None,
                    )
                    .await;
                scope.select_by_value(parent, &value).await?;
            } else {
                logger
                    .log(
                        "warning",
                        &format!("Click on {selector} failed, dispatching directly ({e})"),
                        None,
                    )
                    .await;
                scope.dispatch_event(selector, "click").await?;
            }
        }
        if !page.wait_for_network_idle(self.element_timeout).await {
            page.wait(Duration::from_millis(2000)).await;
        }
        Ok(())
    }

    async fn upload(
        &self,
        scope: &Arc<dyn DomScope>,
        selector: &str,
        action: &Action,
        profile: &ProfileData,
        logger: &dyn AutomationLogger,
        controls: &dyn JobControls,
    ) -> Result<(), AutomationError> {
        let mut candidates: Vec<String> = Vec::new();
        if let Some(path) = profile.uploaded_file_path() {
            candidates.push(path.to_string());
        }
        if candidates.is_empty() {
            if let Some(value) = action.value.as_deref() {
                candidates.extend(file_list(value));
            }
        }
        candidates = candidates
            .into_iter()
            .filter_map(|p| self.resolve_upload_path(&p))
            .collect();

        if candidates.is_empty() {
            let label = self.derive_label(scope, selector).await;
            let answer = controls
                .ask_user(AskKind::File, &label)
                .await?
                .ok_or(AutomationError::UserCancelled)?;
            if answer.eq_ignore_ascii_case(SKIP_SENTINEL) {
                logger
                    .log("info", &format!("Upload skipped by user: {label}"), None)
                    .await;
                return Ok(());
            }
            candidates = file_list(&answer)
                .iter()
                .filter_map(|p| self.resolve_upload_path(p))
                .collect();
            if candidates.is_empty() {
                return Err(AutomationError::Internal(format!(
                    "No usable file path supplied for {selector}"
                )));
            }
        }
        scope.set_input_files(selector, &candidates).await?;
        Ok(())
    }

    /// Fill a field whose value the plan could not resolve: fuzzy match
    /// against the profile first, ask the human only as a last resort.
    #[allow(clippy::too_many_arguments)]
    async fn resolve_input(
        &self,
        page: &dyn Page,
        scope: &Arc<dyn DomScope>,
        selector: &str,
        label: &str,
        profile: &ProfileData,
        logger: &dyn AutomationLogger,
        controls: &dyn JobControls,
    ) -> Result<(), AutomationError> {
        if let Some(value) = match_profile_value(label, profile.values()) {
            logger
                .log(
                    "info",
                    &format!("Auto-answered \"{label}\" from profile data"),
                    None,
                )
                .await;
            // Simulated think time; the value came from the profile so
            // no learned-data write happens.
            page.wait(Duration::from_millis(500)).await;
            scope.fill(selector, &value).await?;
            return Ok(());
        }

        let answer = controls
            .ask_user(AskKind::Text, label)
            .await?
            .ok_or(AutomationError::UserCancelled)?;
        if answer.eq_ignore_ascii_case(SKIP_SENTINEL) {
            logger
                .log("info", &format!("Field skipped by user: {label}"), None)
                .await;
            return Ok(());
        }

        if profile.has_profile() && !profile.contains_value(&answer) {
            controls.save_learned_data(&learned_key(label), &answer).await;
        }

        // Best effort: the answer is already persisted, so a fill
        // failure here is counted, not re-asked.
        scope.fill(selector, &answer).await?;
        Ok(())
    }

    async fn derive_label(&self, scope: &Arc<dyn DomScope>, selector: &str) -> String {
        match scope.field_label(selector).await {
            Ok(Some(label)) if !label.trim().is_empty() => label,
            _ => selector.to_string(),
        }
    }

    /// Uploads must be absolute, or relative to the configured upload
    /// root, and must exist on disk. Parent traversal out of the root
    /// is rejected. A stale candidate resolves to `None` so the run
    /// falls through to asking the human for a file.
    fn resolve_upload_path(&self, path: &str) -> Option<String> {
        let resolved = if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            let root = self.upload_root.as_deref()?;
            if path.split('/').any(|seg| seg == "..") {
                return None;
            }
            Path::new(root).join(path)
        };
        if !resolved.exists() {
            return None;
        }
        Some(resolved.to_string_lossy().into_owned())
    }
}

/// Profile key for a learned answer: the label, slugged.
fn learned_key(label: &str) -> String {
    let mut key = String::with_capacity(label.len());
    let mut last_underscore = true;
    for c in label.chars() {
        if c.is_alphanumeric() {
            key.extend(c.to_lowercase());
            last_underscore = false;
        } else if !last_underscore {
            key.push('_');
            last_underscore = true;
        }
    }
    key.trim_end_matches('_').to_string()
}

/// Resolve the option a fill value refers to: exact text, normalized
/// text, normalized substring (either direction), exact value, then
/// case-insensitive value.
pub fn resolve_option<'a>(options: &'a [SelectOption], wanted: &str) -> Option<&'a SelectOption> {
    let norm = |s: &str| s.trim().to_lowercase();
    let wanted_norm = norm(wanted);

    options
        .iter()
        .find(|o| o.text == wanted)
        .or_else(|| options.iter().find(|o| norm(&o.text) == wanted_norm))
        .or_else(|| {
            options.iter().find(|o| {
                let text = norm(&o.text);
                !wanted_norm.is_empty()
                    && (text.contains(&wanted_norm) || wanted_norm.contains(&text) && !text.is_empty())
            })
        })
        .or_else(|| options.iter().find(|o| o.value == wanted))
        .or_else(|| options.iter().find(|o| norm(&o.value) == wanted_norm))
}

/// Relax `[attr="Value"]` selector segments with the CSS
/// case-insensitivity flag. Returns `None` when the selector has no
/// quoted attribute comparison to relax. One pattern per quote style;
/// the regex engine has no backreferences.
fn case_insensitive_variant(selector: &str) -> Option<String> {
    if selector.contains(" i]") {
        return None;
    }
    let double = Regex::new(r#"\[\s*([\w-]+)\s*([*^$|~]?=)\s*"([^"]*)"\s*\]"#).ok()?;
    let single = Regex::new(r"\[\s*([\w-]+)\s*([*^$|~]?=)\s*'([^']*)'\s*\]").ok()?;
    if !double.is_match(selector) && !single.is_match(selector) {
        return None;
    }
    let relaxed = double.replace_all(selector, "[$1$2\"$3\" i]");
    let relaxed = single.replace_all(&relaxed, "[$1$2'$3' i]");
    Some(relaxed.into_owned())
}
