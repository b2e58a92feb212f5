//! Scripted in-memory stand-ins for the browser, the planner, the
//! template cache, and the job controls.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use formflow_automation::cache::TemplateCache;
use formflow_automation::controls::{AskKind, AutomationLogger, JobControls};
use formflow_automation::plan::{MissingField, Planner};
use formflow_automation::{AutomationError, ProfileData};
use formflow_browser::page::{DomScope, Page, SelectOption};
use formflow_browser::BrowserError;
use formflow_core::action::Action;

#[derive(Debug)]
pub struct FakeElement {
    pub tag: String,
    pub editable: bool,
    pub value: Mutex<String>,
    pub attrs: HashMap<String, String>,
    pub options: Vec<SelectOption>,
    pub label: Option<String>,
    pub files: Mutex<Vec<String>>,
}

impl FakeElement {
    fn input(input_type: &str, label: Option<&str>) -> Self {
        let mut attrs = HashMap::new();
        attrs.insert("type".to_string(), input_type.to_string());
        Self {
            tag: "INPUT".to_string(),
            editable: true,
            value: Mutex::new(String::new()),
            attrs,
            options: Vec::new(),
            label: label.map(str::to_string),
            files: Mutex::new(Vec::new()),
        }
    }
}

/// One scripted document scope; the event log records every mutation
/// in order.
#[derive(Default)]
pub struct FakeScope {
    elements: Mutex<HashMap<String, Arc<FakeElement>>>,
    pub events: Mutex<Vec<String>>,
    pub failing_clicks: Mutex<Vec<String>>,
}

impl FakeScope {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_input(self: Arc<Self>, selector: &str, label: Option<&str>) -> Arc<Self> {
        self.add(selector, FakeElement::input("text", label))
    }

    pub fn add_date_input(self: Arc<Self>, selector: &str) -> Arc<Self> {
        self.add(selector, FakeElement::input("date", None))
    }

    pub fn add_file_input(self: Arc<Self>, selector: &str, label: Option<&str>) -> Arc<Self> {
        self.add(selector, FakeElement::input("file", label))
    }

    pub fn add_button(self: Arc<Self>, selector: &str) -> Arc<Self> {
        let mut el = FakeElement::input("submit", None);
        el.tag = "BUTTON".to_string();
        self.add(selector, el)
    }

    pub fn add_select(self: Arc<Self>, selector: &str, options: &[(&str, &str)]) -> Arc<Self> {
        let mut el = FakeElement::input("", None);
        el.tag = "SELECT".to_string();
        el.options = options
            .iter()
            .enumerate()
            .map(|(index, (text, value))| SelectOption {
                text: text.to_string(),
                value: value.to_string(),
                index,
            })
            .collect();
        self.add(selector, el)
    }

    fn add(self: Arc<Self>, selector: &str, element: FakeElement) -> Arc<Self> {
        self.elements
            .lock()
            .unwrap()
            .insert(selector.to_string(), Arc::new(element));
        self
    }

    pub fn value_of(&self, selector: &str) -> String {
        self.element(selector).unwrap().value.lock().unwrap().clone()
    }

    pub fn files_of(&self, selector: &str) -> Vec<String> {
        self.element(selector).unwrap().files.lock().unwrap().clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn element(&self, selector: &str) -> Option<Arc<FakeElement>> {
        self.elements.lock().unwrap().get(selector).cloned()
    }

    fn require(&self, selector: &str) -> Result<Arc<FakeElement>, BrowserError> {
        self.element(selector)
            .ok_or_else(|| BrowserError::NotFound(selector.to_string()))
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl DomScope for FakeScope {
    async fn exists(&self, selector: &str) -> bool {
        self.element(selector).is_some()
    }

    async fn is_editable(&self, selector: &str) -> Result<bool, BrowserError> {
        Ok(self.require(selector)?.editable)
    }

    async fn tag_name(&self, selector: &str) -> Result<String, BrowserError> {
        Ok(self.require(selector)?.tag.clone())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let el = self.require(selector)?;
        *el.value.lock().unwrap() = value.to_string();
        self.record(format!("fill {selector}={value}"));
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.require(selector)?;
        if self.failing_clicks.lock().unwrap().contains(&selector.to_string()) {
            return Err(BrowserError::Interaction {
                selector: selector.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        self.record(format!("click {selector}"));
        Ok(())
    }

    async fn focus(&self, selector: &str) -> Result<(), BrowserError> {
        self.require(selector)?;
        self.record(format!("focus {selector}"));
        Ok(())
    }

    async fn blur(&self, selector: &str) -> Result<(), BrowserError> {
        self.require(selector)?;
        self.record(format!("blur {selector}"));
        Ok(())
    }

    async fn dispatch_event(&self, selector: &str, event: &str) -> Result<(), BrowserError> {
        self.require(selector)?;
        self.record(format!("dispatch {selector} {event}"));
        Ok(())
    }

    async fn select_options(&self, selector: &str) -> Result<Vec<SelectOption>, BrowserError> {
        Ok(self.require(selector)?.options.clone())
    }

    async fn select_by_value(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let el = self.require(selector)?;
        *el.value.lock().unwrap() = value.to_string();
        self.record(format!("select {selector}={value}"));
        Ok(())
    }

    async fn select_by_index(&self, selector: &str, index: usize) -> Result<(), BrowserError> {
        let el = self.require(selector)?;
        let value = el
            .options
            .get(index)
            .map(|o| o.value.clone())
            .ok_or_else(|| BrowserError::NotFound(format!("{selector} option {index}")))?;
        *el.value.lock().unwrap() = value.clone();
        self.record(format!("select {selector}={value}"));
        Ok(())
    }

    async fn select_by_label(&self, selector: &str, label: &str) -> Result<(), BrowserError> {
        let el = self.require(selector)?;
        let value = el
            .options
            .iter()
            .find(|o| o.text == label)
            .map(|o| o.value.clone())
            .ok_or_else(|| BrowserError::NotFound(format!("{selector} option {label}")))?;
        *el.value.lock().unwrap() = value.clone();
        self.record(format!("select {selector}={value}"));
        Ok(())
    }

    async fn force_select_value(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let el = self.require(selector)?;
        *el.value.lock().unwrap() = value.to_string();
        self.record(format!("force_select {selector}={value}"));
        Ok(())
    }

    async fn set_input_files(&self, selector: &str, paths: &[String]) -> Result<(), BrowserError> {
        let el = self.require(selector)?;
        *el.files.lock().unwrap() = paths.to_vec();
        self.record(format!("upload {selector}={}", paths.join(",")));
        Ok(())
    }

    async fn get_attribute(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        Ok(self.require(selector)?.attrs.get(name).cloned())
    }

    async fn field_label(&self, selector: &str) -> Result<Option<String>, BrowserError> {
        Ok(self.require(selector)?.label.clone())
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        self.record(format!("evaluate {script}"));
        Ok(serde_json::Value::Null)
    }
}

/// Scripted page. `visible_text` walks a queue, so tests can flip the
/// page into its success state after a submit. Waits are no-ops.
pub struct FakePage {
    pub scope: Arc<FakeScope>,
    pub frames: Vec<Arc<FakeScope>>,
    pub snapshot: String,
    texts: Mutex<VecDeque<String>>,
    pub navigations: Mutex<Vec<String>>,
    pub failing_navigations: Mutex<u32>,
}

impl FakePage {
    pub fn new(scope: Arc<FakeScope>, texts: &[&str]) -> Self {
        Self {
            scope,
            frames: Vec::new(),
            snapshot: "<body><form></form></body>".to_string(),
            texts: Mutex::new(texts.iter().map(|s| s.to_string()).collect()),
            navigations: Mutex::new(Vec::new()),
            failing_navigations: Mutex::new(0),
        }
    }
}

#[async_trait]
impl Page for FakePage {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        let mut failing = self.failing_navigations.lock().unwrap();
        self.navigations.lock().unwrap().push(url.to_string());
        if *failing > 0 {
            *failing -= 1;
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(())
    }

    async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.snapshot.clone())
    }

    async fn visible_text(&self) -> Result<String, BrowserError> {
        let mut texts = self.texts.lock().unwrap();
        if texts.len() > 1 {
            Ok(texts.pop_front().unwrap_or_default())
        } else {
            Ok(texts.front().cloned().unwrap_or_default())
        }
    }

    fn scope(&self) -> Arc<dyn DomScope> {
        Arc::clone(&self.scope) as Arc<dyn DomScope>
    }

    async fn frames(&self) -> Vec<Arc<dyn DomScope>> {
        self.frames
            .iter()
            .map(|f| Arc::clone(f) as Arc<dyn DomScope>)
            .collect()
    }

    async fn frame_contents(&self) -> Vec<String> {
        Vec::new()
    }

    async fn visible_snapshot(&self) -> Result<String, BrowserError> {
        Ok(self.snapshot.clone())
    }

    async fn wait_for_network_idle(&self, _timeout: Duration) -> bool {
        true
    }

    async fn wait(&self, _duration: Duration) {}

    async fn close(&self) -> Result<(), BrowserError> {
        Ok(())
    }
}

/// Scripted controls: answers are consumed front to back; running out
/// means the test asked more than it scripted.
#[derive(Default)]
pub struct FakeControls {
    answers: Mutex<VecDeque<Option<String>>>,
    pub asks: Mutex<Vec<(AskKind, String)>>,
    pub learned: Mutex<Vec<(String, String)>>,
}

impl FakeControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answers(answers: &[Option<&str>]) -> Self {
        Self {
            answers: Mutex::new(answers.iter().map(|a| a.map(str::to_string)).collect()),
            ..Self::default()
        }
    }

    pub fn asks(&self) -> Vec<(AskKind, String)> {
        self.asks.lock().unwrap().clone()
    }

    pub fn learned(&self) -> Vec<(String, String)> {
        self.learned.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobControls for FakeControls {
    async fn check_pause(&self) -> Result<(), AutomationError> {
        Ok(())
    }

    async fn ask_user(
        &self,
        kind: AskKind,
        label: &str,
    ) -> Result<Option<String>, AutomationError> {
        self.asks.lock().unwrap().push((kind, label.to_string()));
        let answer = self
            .answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unscripted ask_user for {label:?}"));
        Ok(answer)
    }

    async fn save_learned_data(&self, key: &str, value: &str) {
        self.learned
            .lock()
            .unwrap()
            .push((key.to_string(), value.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingLogger {
    pub entries: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl AutomationLogger for RecordingLogger {
    async fn log(&self, severity: &str, message: &str, _metadata: Option<serde_json::Value>) {
        self.entries
            .lock()
            .unwrap()
            .push((severity.to_string(), message.to_string()));
    }
}

/// Planner that replays scripted plans and validations in order, then
/// yields empty ones.
#[derive(Default)]
pub struct ScriptedPlanner {
    plans: Mutex<VecDeque<Vec<Action>>>,
    validations: Mutex<VecDeque<Vec<MissingField>>>,
    pub generate_calls: Mutex<u32>,
    pub validate_calls: Mutex<u32>,
}

impl ScriptedPlanner {
    pub fn with_plans(plans: Vec<Vec<Action>>) -> Self {
        Self {
            plans: Mutex::new(plans.into()),
            ..Self::default()
        }
    }

    pub fn push_validation(&self, missing: Vec<MissingField>) {
        self.validations.lock().unwrap().push_back(missing);
    }

    pub fn generate_calls(&self) -> u32 {
        *self.generate_calls.lock().unwrap()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn generate(
        &self,
        _html: &str,
        _profile: &ProfileData,
    ) -> Result<Vec<Action>, AutomationError> {
        *self.generate_calls.lock().unwrap() += 1;
        Ok(self.plans.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn validate(&self, _html: &str) -> Result<Vec<MissingField>, AutomationError> {
        *self.validate_calls.lock().unwrap() += 1;
        Ok(self
            .validations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn dropdown_fix_script(&self, _html: &str, _selector: &str, _value: &str) -> String {
        String::new()
    }
}

#[derive(Default)]
pub struct InMemoryTemplateCache {
    pub entries: Mutex<HashMap<String, Vec<Action>>>,
    pub stores: Mutex<Vec<String>>,
}

impl InMemoryTemplateCache {
    pub fn with_entry(url: &str, actions: Vec<Action>) -> Self {
        let cache = Self::default();
        cache.entries.lock().unwrap().insert(url.to_string(), actions);
        cache
    }

    pub fn stored(&self, url: &str) -> Option<Vec<Action>> {
        self.entries.lock().unwrap().get(url).cloned()
    }
}

#[async_trait]
impl TemplateCache for InMemoryTemplateCache {
    async fn lookup(&self, url: &str) -> Result<Option<Vec<Action>>, sqlx::Error> {
        Ok(self.entries.lock().unwrap().get(url).cloned())
    }

    async fn store(&self, url: &str, actions: &[Action]) -> Result<(), sqlx::Error> {
        self.stores.lock().unwrap().push(url.to_string());
        self.entries
            .lock()
            .unwrap()
            .insert(url.to_string(), actions.to_vec());
        Ok(())
    }
}
