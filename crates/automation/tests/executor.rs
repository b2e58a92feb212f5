mod common;

use std::time::Duration;

use assert_matches::assert_matches;

use common::{FakeControls, FakePage, FakeScope, RecordingLogger};
use formflow_automation::executor::ActionExecutor;
use formflow_automation::{AskKind, AutomationError, ProfileData};
use formflow_core::action::{Action, ActionKind};

fn executor() -> ActionExecutor {
    ActionExecutor::new(Duration::from_millis(10), None)
}

fn fill(selector: &str, value: &str) -> Action {
    Action::new(selector, ActionKind::Fill, Some(value.to_string()))
}

fn click(selector: &str) -> Action {
    Action::new(selector, ActionKind::Click, None)
}

/// Uploads only accept paths that exist, so tests write real files.
fn temp_file(name: &str) -> String {
    let path = std::env::temp_dir().join(format!("formflow-{}-{name}", std::process::id()));
    std::fs::write(&path, b"pdf").unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn fills_and_submits_in_order() {
    let scope = FakeScope::new().add_input("#name", None).add_button("#submit");
    let page = FakePage::new(scope.clone(), &["form"]);
    let controls = FakeControls::new();
    let logger = RecordingLogger::default();

    let report = executor()
        .execute(
            &page,
            &[fill("#name", "Jane Roe"), click("#submit")],
            &ProfileData::default(),
            &logger,
            &controls,
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.failed, 0);
    assert!(report.did_navigate);
    assert_eq!(scope.value_of("#name"), "Jane Roe");
    assert_eq!(scope.events(), vec!["fill #name=Jane Roe", "click #submit"]);
}

#[tokio::test]
async fn select_fill_runs_the_two_phase_protocol() {
    let scope = FakeScope::new().add_select(
        "#country",
        &[("Canada", "CA"), ("United States", "US"), ("Mexico", "MX")],
    );
    let page = FakePage::new(scope.clone(), &["form"]);
    let controls = FakeControls::new();
    let logger = RecordingLogger::default();

    let report = executor()
        .execute(
            &page,
            &[fill("#country", "united states")],
            &ProfileData::default(),
            &logger,
            &controls,
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.failed, 0);
    assert_eq!(scope.value_of("#country"), "US");
    // A different option is selected first so the target fires a change.
    assert_eq!(
        scope.events(),
        vec![
            "focus #country",
            "select #country=CA",
            "select #country=US",
            "dispatch #country change",
            "dispatch #country input",
            "blur #country",
        ]
    );
}

#[tokio::test]
async fn unmatched_select_value_counts_as_failed() {
    let scope = FakeScope::new().add_select("#country", &[("Canada", "CA")]);
    let page = FakePage::new(scope.clone(), &["form"]);

    let report = executor()
        .execute(
            &page,
            &[fill("#country", "France")],
            &ProfileData::default(),
            &RecordingLogger::default(),
            &FakeControls::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(scope.value_of("#country"), "");
}

#[tokio::test]
async fn missing_element_is_skipped_not_fatal() {
    let scope = FakeScope::new().add_input("#name", None);
    let page = FakePage::new(scope.clone(), &["form"]);

    let report = executor()
        .execute(
            &page,
            &[fill("#ghost", "x"), fill("#name", "Jane")],
            &ProfileData::default(),
            &RecordingLogger::default(),
            &FakeControls::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert_eq!(scope.value_of("#name"), "Jane");
}

#[tokio::test]
async fn date_inputs_get_iso_values() {
    let scope = FakeScope::new().add_date_input("#dob");
    let page = FakePage::new(scope.clone(), &["form"]);

    executor()
        .execute(
            &page,
            &[fill("#dob", "March 5, 1990")],
            &ProfileData::default(),
            &RecordingLogger::default(),
            &FakeControls::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(scope.value_of("#dob"), "1990-03-05");
}

#[tokio::test]
async fn ask_user_auto_answers_from_profile_without_blocking() {
    let scope = FakeScope::new().add_input("#email", Some("Email Address"));
    let page = FakePage::new(scope.clone(), &["form"]);
    let controls = FakeControls::new();
    let mut profile = ProfileData::new(Some(1), Some(1));
    profile.insert("email_address", "jane@example.com");

    let report = executor()
        .execute(
            &page,
            &[Action::ask_user("#email", "Email Address")],
            &profile,
            &RecordingLogger::default(),
            &controls,
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.failed, 0);
    assert_eq!(scope.value_of("#email"), "jane@example.com");
    assert!(controls.asks().is_empty());
    assert!(controls.learned().is_empty());
}

#[tokio::test]
async fn ask_user_persists_fresh_answers_as_learned_data() {
    let scope = FakeScope::new().add_input("#visa", Some("Visa Status"));
    let page = FakePage::new(scope.clone(), &["form"]);
    let controls = FakeControls::with_answers(&[Some("H-1B")]);
    let profile = ProfileData::new(Some(1), Some(1));

    executor()
        .execute(
            &page,
            &[Action::ask_user("#visa", "Visa Status")],
            &profile,
            &RecordingLogger::default(),
            &controls,
            None,
        )
        .await
        .unwrap();

    assert_eq!(scope.value_of("#visa"), "H-1B");
    assert_eq!(controls.asks(), vec![(AskKind::Text, "Visa Status".to_string())]);
    assert_eq!(controls.learned(), vec![("visa_status".to_string(), "H-1B".to_string())]);
}

#[tokio::test]
async fn ask_user_without_profile_skips_the_learned_write() {
    let scope = FakeScope::new().add_input("#visa", None);
    let page = FakePage::new(scope.clone(), &["form"]);
    let controls = FakeControls::with_answers(&[Some("H-1B")]);

    executor()
        .execute(
            &page,
            &[Action::ask_user("#visa", "Visa Status")],
            &ProfileData::new(Some(1), None),
            &RecordingLogger::default(),
            &controls,
            None,
        )
        .await
        .unwrap();

    assert!(controls.learned().is_empty());
    assert_eq!(scope.value_of("#visa"), "H-1B");
}

#[tokio::test]
async fn cancelled_ask_aborts_the_run() {
    let scope = FakeScope::new().add_input("#visa", None).add_input("#after", None);
    let page = FakePage::new(scope.clone(), &["form"]);
    let controls = FakeControls::with_answers(&[None]);

    let err = executor()
        .execute(
            &page,
            &[Action::ask_user("#visa", "Visa Status"), fill("#after", "x")],
            &ProfileData::default(),
            &RecordingLogger::default(),
            &controls,
            None,
        )
        .await
        .unwrap_err();

    assert_matches!(err, AutomationError::UserCancelled);
    assert_eq!(scope.value_of("#after"), "");
}

#[tokio::test]
async fn skip_answer_leaves_field_unfilled_and_unfailed() {
    let scope = FakeScope::new().add_input("#visa", None);
    let page = FakePage::new(scope.clone(), &["form"]);
    let controls = FakeControls::with_answers(&[Some("skip")]);

    let report = executor()
        .execute(
            &page,
            &[Action::ask_user("#visa", "Visa Status")],
            &ProfileData::default(),
            &RecordingLogger::default(),
            &controls,
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.failed, 0);
    assert_eq!(scope.value_of("#visa"), "");
    assert!(controls.learned().is_empty());
}

#[tokio::test]
async fn fill_with_sentinel_value_falls_back_to_resolution() {
    let scope = FakeScope::new().add_input("#email", Some("Email Address"));
    let page = FakePage::new(scope.clone(), &["form"]);
    let mut profile = ProfileData::default();
    profile.insert("email_address", "jane@example.com");

    executor()
        .execute(
            &page,
            &[fill("#email", "undefined")],
            &profile,
            &RecordingLogger::default(),
            &FakeControls::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(scope.value_of("#email"), "jane@example.com");
}

#[tokio::test]
async fn upload_prefers_the_job_file() {
    let scope = FakeScope::new().add_file_input("#cv", None);
    let page = FakePage::new(scope.clone(), &["form"]);
    let resume = temp_file("resume.pdf");
    let mut profile = ProfileData::default();
    profile.insert("uploaded_file_path", &resume);

    executor()
        .execute(
            &page,
            &[Action::new("#cv", ActionKind::Upload, None)],
            &profile,
            &RecordingLogger::default(),
            &FakeControls::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(scope.files_of("#cv"), vec![resume]);
}

#[tokio::test]
async fn upload_without_candidates_asks_for_a_file() {
    let scope = FakeScope::new().add_file_input("#cv", Some("Resume"));
    let page = FakePage::new(scope.clone(), &["form"]);
    let answer = temp_file("answer-cv.pdf");
    let controls = FakeControls::with_answers(&[Some(answer.as_str())]);

    executor()
        .execute(
            &page,
            &[Action::new("#cv", ActionKind::Upload, None)],
            &ProfileData::default(),
            &RecordingLogger::default(),
            &controls,
            None,
        )
        .await
        .unwrap();

    assert_eq!(controls.asks(), vec![(AskKind::File, "Resume".to_string())]);
    assert_eq!(scope.files_of("#cv"), vec![answer]);
}

#[tokio::test]
async fn upload_with_a_stale_job_file_asks_for_a_replacement() {
    let scope = FakeScope::new().add_file_input("#cv", Some("Resume"));
    let page = FakePage::new(scope.clone(), &["form"]);
    let replacement = temp_file("replacement-cv.pdf");
    let controls = FakeControls::with_answers(&[Some(replacement.as_str())]);
    let mut profile = ProfileData::default();
    profile.insert("uploaded_file_path", "/definitely/not/there.pdf");

    executor()
        .execute(
            &page,
            &[Action::new("#cv", ActionKind::Upload, None)],
            &profile,
            &RecordingLogger::default(),
            &controls,
            None,
        )
        .await
        .unwrap();

    assert_eq!(controls.asks(), vec![(AskKind::File, "Resume".to_string())]);
    assert_eq!(scope.files_of("#cv"), vec![replacement]);
}

#[tokio::test]
async fn upload_rejects_relative_paths() {
    let scope = FakeScope::new().add_file_input("#cv", Some("Resume"));
    let page = FakePage::new(scope.clone(), &["form"]);
    let controls = FakeControls::with_answers(&[Some("../../etc/passwd")]);

    let report = executor()
        .execute(
            &page,
            &[Action::new("#cv", ActionKind::Upload, None)],
            &ProfileData::default(),
            &RecordingLogger::default(),
            &controls,
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.failed, 1);
    assert!(scope.files_of("#cv").is_empty());
}

#[tokio::test]
async fn upload_resolves_relative_paths_under_the_root() {
    let scope = FakeScope::new().add_file_input("#cv", Some("Resume"));
    let page = FakePage::new(scope.clone(), &["form"]);
    let root = std::env::temp_dir().join(format!("formflow-root-{}", std::process::id()));
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("cv.pdf"), b"pdf").unwrap();
    let controls = FakeControls::with_answers(&[Some("cv.pdf")]);
    let executor = ActionExecutor::new(
        Duration::from_millis(10),
        Some(root.to_string_lossy().into_owned()),
    );

    executor
        .execute(
            &page,
            &[Action::new("#cv", ActionKind::Upload, None)],
            &ProfileData::default(),
            &RecordingLogger::default(),
            &controls,
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        scope.files_of("#cv"),
        vec![root.join("cv.pdf").to_string_lossy().into_owned()]
    );
}

#[tokio::test]
async fn failed_click_falls_back_to_direct_dispatch() {
    let scope = FakeScope::new().add_button("#submit");
    scope
        .failing_clicks
        .lock()
        .unwrap()
        .push("#submit".to_string());
    let page = FakePage::new(scope.clone(), &["form"]);

    let report = executor()
        .execute(
            &page,
            &[click("#submit")],
            &ProfileData::default(),
            &RecordingLogger::default(),
            &FakeControls::new(),
            None,
        )
        .await
        .unwrap();

    assert_eq!(report.failed, 0);
    assert_eq!(scope.events(), vec!["dispatch #submit click"]);
}
