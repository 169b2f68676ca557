use std::path::PathBuf;
use std::time::Duration;

use test_case::test_case;

use todomvc_e2e::assertions::Expectations;
use todomvc_e2e::fake::{FakeBrowser, FakeConfig, FakeTodoApp, Quirks};
use todomvc_e2e::keys::Platform;
use todomvc_e2e::runner::StepFailure;
use todomvc_e2e::scenario::NEW_TODO_PLACEHOLDER;
use todomvc_e2e::settle::SettlePolicy;
use todomvc_e2e::{
    Driver, ElementHandle, FailureKind, HarnessConfig, Scenario, ScenarioRunner, Selection, Step,
    SuiteReport,
};

const SUBJECT: &str = "http://todomvc.test/";
const T0: &str = "complete code challenge for reach";
const T1: &str = "ensure coverage for all items is automated";

fn scenarios_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

fn config(platform: Platform) -> HarnessConfig {
    let mut config = HarnessConfig::default();
    config.subject.base_url = SUBJECT.to_string();
    config.subject.preflight = false;
    config.run.platform = platform;
    config.run.scenarios_dir = scenarios_dir();
    config
}

/// Short settle window for scenarios that are expected to fail.
fn impatient(platform: Platform) -> HarnessConfig {
    let mut config = config(platform);
    config.settle = SettlePolicy::new(Duration::from_millis(400), Duration::from_millis(50));
    config
}

fn runner(config: HarnessConfig, quirks: Quirks) -> ScenarioRunner<FakeBrowser> {
    let fake = FakeBrowser::new(FakeConfig {
        platform: config.run.platform,
        quirks,
        ..Default::default()
    });
    ScenarioRunner::new(fake, config)
}

fn only(name: &str) -> Selection {
    Selection {
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn failure_of<'a>(report: &'a SuiteReport, name: &str) -> &'a StepFailure {
    let scenario = report
        .get(name)
        .unwrap_or_else(|| panic!("scenario {} missing from report", name));
    assert!(!scenario.passed(), "{} was expected to fail", name);
    scenario.failure.as_ref().expect("failed scenario carries a failure")
}

fn describe_failures(report: &SuiteReport) -> String {
    report
        .scenarios
        .iter()
        .filter_map(|s| s.failure.as_ref().map(|f| format!("{}: {}", s.name, f.message)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test_case(Platform::Macos ; "macos")]
#[test_case(Platform::Windows ; "windows")]
#[test_case(Platform::Linux ; "linux")]
#[tokio::test(start_paused = true)]
async fn shipped_suite_passes_against_a_correct_subject(platform: Platform) {
    let runner = runner(config(platform), Quirks::default());
    let report = runner.run_selected(&Selection::default()).await.unwrap();

    assert!(report.all_passed(), "failures:\n{}", describe_failures(&report));
    assert_eq!(report.total, 27);
    assert_eq!(report.passed, report.total);
    // One fresh subject per scenario.
    assert_eq!(runner.factory().launched(), report.total);
}

#[tokio::test(start_paused = true)]
async fn parallel_workers_keep_report_order() {
    let mut config = config(Platform::Linux);
    config.run.workers = 4;
    let runner = runner(config, Quirks::default());

    let expected: Vec<String> = Scenario::load_all(&scenarios_dir())
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    let report = runner.run_selected(&Selection::default()).await.unwrap();

    assert!(report.all_passed(), "failures:\n{}", describe_failures(&report));
    let actual: Vec<String> = report.scenarios.iter().map(|s| s.name.clone()).collect();
    assert_eq!(actual, expected);
}

#[tokio::test(start_paused = true)]
async fn scenarios_do_not_share_state() {
    let yaml = format!(
        r#"
suite: isolation
scenarios:
  - name: writer
    steps:
      - action: add_todo
        title: {T0}
      - action: expect_stored_count
        count: 1
  - name: reader
    expect_empty_baseline: true
    steps:
      - action: expect_count
        target: {{ test_id: todo-title }}
        count: 0
      - action: expect_stored_count
        count: 0
"#
    );
    let scenarios = Scenario::parse_file(&yaml).unwrap();
    let mut config = config(Platform::Linux);
    config.run.workers = 2;
    let runner = runner(config, Quirks::default());

    let report = runner.run_scenarios(&scenarios).await;
    assert!(report.all_passed(), "failures:\n{}", describe_failures(&report));
    assert_eq!(runner.factory().launched(), 2);
}

#[tokio::test(start_paused = true)]
async fn untrimmed_titles_fail_as_assertions() {
    let quirks = Quirks {
        skip_trim: true,
        ..Default::default()
    };
    let runner = runner(impatient(Platform::Linux), quirks);
    let report = runner.run_selected(&only("trim-entered-text")).await.unwrap();

    let failure = failure_of(&report, "trim-entered-text");
    assert_eq!(failure.kind, FailureKind::Assertion);
    assert_eq!(failure.step_index, Some(1));
    assert!(failure.step.starts_with("expect_texts"));
    assert!(failure.expected.as_deref().unwrap().contains(T0));
    assert!(failure
        .actual
        .as_deref()
        .unwrap()
        .contains(" complete code challenge for reach  "));
}

#[tokio::test(start_paused = true)]
async fn missing_persistence_is_a_settle_timeout() {
    let quirks = Quirks {
        never_persist: true,
        ..Default::default()
    };
    let runner = runner(impatient(Platform::Linux), quirks);
    let report = runner.run_selected(&only("create-new-items")).await.unwrap();

    let failure = failure_of(&report, "create-new-items");
    assert_eq!(failure.kind, FailureKind::SettleTimeout);
    assert_eq!(failure.step_index, Some(4));
    assert!(failure.message.contains("never appeared"));
    // Steps after the failing one never run.
    assert_eq!(report.scenarios[0].steps_run, 4);
}

#[tokio::test(start_paused = true)]
async fn corrupt_storage_is_reported_as_malformed() {
    let quirks = Quirks {
        corrupt_storage: true,
        ..Default::default()
    };
    let runner = runner(impatient(Platform::Linux), quirks);
    let report = runner.run_selected(&only("create-new-items")).await.unwrap();

    let failure = failure_of(&report, "create-new-items");
    assert_eq!(failure.kind, FailureKind::MalformedState);
    assert_eq!(failure.step_index, Some(4));
    assert!(failure.message.contains("react-todos"));
}

#[tokio::test(start_paused = true)]
async fn unreachable_subject_fails_during_setup() {
    let quirks = Quirks {
        unreachable: true,
        ..Default::default()
    };
    let runner = runner(impatient(Platform::Linux), quirks);
    let report = runner.run_selected(&only("append-to-bottom")).await.unwrap();

    let failure = failure_of(&report, "append-to-bottom");
    assert_eq!(failure.kind, FailureKind::Driver);
    assert_eq!(failure.step_index, None);
    assert_eq!(failure.step, "setup");
    assert_eq!(report.scenarios[0].steps_run, 0);
}

#[tokio::test(start_paused = true)]
async fn blank_titles_accepted_by_the_subject_are_caught() {
    let quirks = Quirks {
        accept_blank: true,
        ..Default::default()
    };
    let runner = runner(impatient(Platform::Linux), quirks);
    let report = runner.run_selected(&only("no-whitespace-item")).await.unwrap();

    let failure = failure_of(&report, "no-whitespace-item");
    assert_eq!(failure.kind, FailureKind::Assertion);
    assert_eq!(failure.step_index, Some(3));
}

#[tokio::test(start_paused = true)]
async fn storage_lost_on_reload_is_caught() {
    let quirks = Quirks {
        volatile_storage: true,
        ..Default::default()
    };
    let runner = runner(impatient(Platform::Linux), quirks);
    let report = runner.run_selected(&only("persist-on-refresh")).await.unwrap();

    let failure = failure_of(&report, "persist-on-refresh");
    assert_eq!(failure.kind, FailureKind::SettleTimeout);
    assert_eq!(failure.step_index, Some(4));
}

#[tokio::test(start_paused = true)]
async fn wrong_select_all_chord_leaves_text_behind() {
    // The harness thinks it drives Linux, the subject runs on macOS.
    let config = impatient(Platform::Linux);
    let fake = FakeBrowser::new(FakeConfig {
        platform: Platform::Macos,
        ..Default::default()
    });
    let runner = ScenarioRunner::new(fake, config);
    let report = runner.run_selected(&only("edit-record")).await.unwrap();

    let failure = failure_of(&report, "edit-record");
    assert_eq!(failure.kind, FailureKind::Assertion);
    assert_eq!(failure.step_index, Some(7));
}

#[tokio::test(start_paused = true)]
async fn delayed_persistence_settles_within_the_window() {
    let quirks = Quirks {
        persist_delay: Some(Duration::from_millis(300)),
        ..Default::default()
    };
    let runner = runner(config(Platform::Linux), quirks);
    let report = runner.run_selected(&Selection::default()).await.unwrap();

    assert_eq!(report.total, 27);
    assert!(report.all_passed(), "failures:\n{}", describe_failures(&report));
}

#[tokio::test(start_paused = true)]
async fn reload_right_after_a_debounced_write_keeps_it() {
    let yaml = format!(
        r#"
name: add-then-reload
steps:
  - action: add_todo
    title: {T0}
  - action: reload
  - action: expect_texts
    target: {{ test_id: todo-title }}
    texts: ["{T0}"]
  - action: expect_stored_count
    count: 1
"#
    );
    let scenario = Scenario::from_yaml(&yaml).unwrap();
    let quirks = Quirks {
        persist_delay: Some(Duration::from_millis(300)),
        ..Default::default()
    };
    let runner = runner(impatient(Platform::Linux), quirks);

    let report = runner.run_scenarios(&[scenario]).await;
    assert!(report.all_passed(), "failures:\n{}", describe_failures(&report));
}

#[tokio::test(start_paused = true)]
async fn write_landing_after_the_quiet_window_is_lost_on_reload() {
    let quirks = Quirks {
        persist_delay: Some(Duration::from_millis(300)),
        ..Default::default()
    };
    let mut config = impatient(Platform::Linux);
    config.settle = config.settle.with_quiet(Duration::from_millis(100));
    let runner = runner(config, quirks);
    let report = runner.run_selected(&only("persist-on-refresh")).await.unwrap();

    let failure = failure_of(&report, "persist-on-refresh");
    assert_eq!(failure.kind, FailureKind::SettleTimeout);
}

#[tokio::test(start_paused = true)]
async fn seeded_corrupt_blob_is_malformed_state() {
    let app = FakeTodoApp::default();
    app.set_storage_item("react-todos", "{\"todos\": [").await;
    app.navigate(SUBJECT).await.unwrap();

    let expect = Expectations::new(&app, "react-todos", SettlePolicy::default());
    let err = expect.stored_count(0).await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::MalformedState);
    // The page itself comes up empty.
    expect.count(&ElementHandle::test_id("todo-title"), 0).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn seeded_envelope_blob_is_read() {
    let app = FakeTodoApp::default();
    app.set_storage_item(
        "react-todos",
        r#"{"todos":[{"id":"a1","title":"legacy","completed":true}],"filter":"completed"}"#,
    )
    .await;
    app.navigate(SUBJECT).await.unwrap();

    let expect = Expectations::new(&app, "react-todos", SettlePolicy::default());
    expect.stored_count(1).await.unwrap();
    expect.completed_count(1).await.unwrap();
    expect.stored_title("legacy").await.unwrap();
    let snapshot = expect.inspector().snapshot().await.unwrap();
    assert_eq!(snapshot.filter, Some(todomvc_e2e::storage::Filter::Completed));
}

#[tokio::test(start_paused = true)]
async fn grep_selects_by_name() {
    let runner = runner(config(Platform::Linux), Quirks::default());
    let selection = Selection {
        grep: Some(regex::Regex::new("^delete-").unwrap()),
        ..Default::default()
    };
    let report = runner.run_selected(&selection).await.unwrap();

    let names: Vec<&str> = report.scenarios.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["delete-key-removes-record", "delete-with-x"]);
    assert!(report.all_passed());
}

#[tokio::test(start_paused = true)]
async fn tag_selects_one_suite() {
    let runner = runner(config(Platform::Linux), Quirks::default());
    let selection = Selection {
        tag: Some("edit".to_string()),
        ..Default::default()
    };
    let report = runner.run_selected(&selection).await.unwrap();

    assert_eq!(report.total, 6);
    assert!(report
        .scenarios
        .iter()
        .all(|s| s.suite.as_deref() == Some("Editing existing todos")));
    assert!(report.all_passed(), "failures:\n{}", describe_failures(&report));
}

#[tokio::test]
async fn unknown_scenario_name_is_an_error() {
    let runner = runner(config(Platform::Linux), Quirks::default());
    assert!(runner.run_selected(&only("no-such-scenario")).await.is_err());
}

#[test_case("" ; "empty")]
#[test_case(" " ; "single space")]
#[test_case("  \t  " ; "tabs and spaces")]
#[tokio::test(start_paused = true)]
async fn blank_titles_are_never_stored(title: &str) {
    let scenario = Scenario {
        name: "blank".to_string(),
        suite: None,
        description: String::new(),
        tags: Vec::new(),
        url: None,
        expect_empty_baseline: true,
        steps: vec![
            Step::AddTodo {
                title: title.to_string(),
            },
            Step::ExpectCount {
                target: ElementHandle::test_id("todo-title"),
                count: 0,
            },
            Step::ExpectStoredCount { count: 0 },
        ],
    };
    let runner = runner(config(Platform::Linux), Quirks::default());
    let report = runner.run_scenarios(&[scenario]).await;
    assert!(report.all_passed(), "failures:\n{}", describe_failures(&report));
}

#[tokio::test(start_paused = true)]
async fn toggling_twice_restores_the_snapshot() {
    let app = FakeTodoApp::default();
    app.navigate(SUBJECT).await.unwrap();
    let input = ElementHandle::placeholder(NEW_TODO_PLACEHOLDER);
    for title in [T0, T1] {
        app.fill(&input, title).await.unwrap();
        app.press_key(&input, "Enter").await.unwrap();
    }

    let expect = Expectations::new(&app, "react-todos", SettlePolicy::default());
    let before = expect.inspector().snapshot().await.unwrap();

    let toggle = ElementHandle::role("checkbox", "Toggle Todo").nth(1);
    app.click(&toggle).await.unwrap();
    expect.completed_count(1).await.unwrap();
    app.click(&toggle).await.unwrap();
    expect.completed_count(0).await.unwrap();

    assert_eq!(expect.inspector().snapshot().await.unwrap(), before);
    expect.reload_preserves_state().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn report_is_written_as_json() {
    let out = tempfile::tempdir().unwrap();
    let mut config = config(Platform::Linux);
    config.run.output_dir = out.path().join("results");
    let runner = runner(config, Quirks::default());

    let report = runner.run_selected(&only("persist-on-refresh")).await.unwrap();
    let path = runner.write_report(&report).unwrap();

    let written: SuiteReport =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(written.total, 1);
    assert!(written.all_passed());
    assert_eq!(written.scenarios[0].suite.as_deref(), Some("Other functions"));
}
