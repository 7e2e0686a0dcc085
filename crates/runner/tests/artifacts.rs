//! Failure-artifact capture pipeline

mod support;

use std::path::Path;

use testwright_common::SuiteNode;
use testwright_runner::{ArtifactConfig, RunConfig};

use support::{failing, passing, run_with_session, self_skipping, FakeSession};

fn armed(dir: &Path) -> RunConfig {
    RunConfig {
        artifacts: Some(ArtifactConfig {
            output_dir: dir.to_path_buf(),
        }),
        ..Default::default()
    }
}

fn dir_entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn assert_bundle(dir: &Path, stem: &str) {
    let expected: Vec<String> = ["browser.txt", "driver.txt", "html", "png"]
        .iter()
        .map(|ext| format!("{}.{}", stem, ext))
        .collect();
    assert_eq!(dir_entries(dir), expected);
}

#[tokio::test]
async fn failing_test_writes_exactly_four_artifacts() {
    let out = tempfile::tempdir().unwrap();
    let suite = SuiteNode::new("failure artifacts").test(failing("it failure"));

    let report = run_with_session(armed(out.path()), FakeSession::new(), vec![suite]).await;

    assert_bundle(out.path(), "failure artifacts it failure");
    assert_eq!(report.stats.tests, 1);
    assert_eq!(report.stats.failures, 1);

    let png = std::fs::read(out.path().join("failure artifacts it failure.png")).unwrap();
    assert_eq!(&png[1..4], b"PNG");
    let html =
        std::fs::read_to_string(out.path().join("failure artifacts it failure.html")).unwrap();
    assert!(html.starts_with("<html>"));
}

#[tokio::test]
async fn passing_test_leaves_the_directory_empty() {
    let out = tempfile::tempdir().unwrap();
    let suite = SuiteNode::new("failure artifacts").test(passing("it success"));

    let report = run_with_session(armed(out.path()), FakeSession::new(), vec![suite]).await;

    assert!(dir_entries(out.path()).is_empty());
    assert_eq!(report.stats.passes, 1);
}

#[tokio::test]
async fn author_skip_produces_no_artifacts() {
    let out = tempfile::tempdir().unwrap();
    let suite = SuiteNode::new("failure artifacts").test(failing("it it.skip").with_skip());

    let report = run_with_session(armed(out.path()), FakeSession::new(), vec![suite]).await;

    assert!(dir_entries(out.path()).is_empty());
    assert_eq!(report.stats.pending, 1);
}

#[tokio::test]
async fn runtime_skip_produces_no_artifacts() {
    let out = tempfile::tempdir().unwrap();
    let suite = SuiteNode::new("failure artifacts").test(self_skipping("it this.skip"));

    let report = run_with_session(armed(out.path()), FakeSession::new(), vec![suite]).await;

    assert!(dir_entries(out.path()).is_empty());
    assert_eq!(report.stats.pending, 1);
}

#[tokio::test]
async fn before_each_failure_is_attributed_to_the_covered_test() {
    let out = tempfile::tempdir().unwrap();
    let suite = SuiteNode::new("failure artifacts")
        .before_each("before each", |_| async {
            Err("setup exploded".to_string())
        })
        .test(passing("beforeEach failure"));

    let report = run_with_session(armed(out.path()), FakeSession::new(), vec![suite]).await;

    assert_bundle(out.path(), "failure artifacts beforeEach failure");
    assert_eq!(report.stats.tests, 0);
    assert_eq!(report.stats.failures, 1);
    assert!(report.cases[0].hook);
    assert_eq!(report.cases[0].error.as_deref(), Some("setup exploded"));
}

#[tokio::test]
async fn after_each_failure_keeps_the_test_outcome() {
    let out = tempfile::tempdir().unwrap();
    let suite = SuiteNode::new("failure artifacts")
        .after_each("after each", |_| async {
            Err("teardown exploded".to_string())
        })
        .test(passing("afterEach failure"));

    let report = run_with_session(armed(out.path()), FakeSession::new(), vec![suite]).await;

    assert_bundle(out.path(), "failure artifacts afterEach failure");
    assert_eq!(report.stats.tests, 1);
    assert_eq!(report.stats.passes, 1);
    assert_eq!(report.stats.failures, 1);
}

#[tokio::test]
async fn unarmed_runs_touch_nothing() {
    let out = tempfile::tempdir().unwrap();
    let suite = SuiteNode::new("failure artifacts").test(failing("it failure"));

    let report = run_with_session(RunConfig::default(), FakeSession::new(), vec![suite]).await;

    assert!(dir_entries(out.path()).is_empty());
    assert_eq!(report.stats.failures, 1);
}

#[tokio::test]
async fn missing_session_skips_capture_silently() {
    let out = tempfile::tempdir().unwrap();
    let suite = SuiteNode::new("failure artifacts").test(failing("it failure"));

    let report = support::run(armed(out.path()), vec![suite]).await;

    assert!(dir_entries(out.path()).is_empty());
    assert_eq!(report.stats.failures, 1);
}

#[tokio::test]
async fn capture_error_before_any_write_leaves_nothing() {
    let out = tempfile::tempdir().unwrap();
    let suite = SuiteNode::new("failure artifacts").test(failing("it failure"));

    let report =
        run_with_session(armed(out.path()), FakeSession::failing_screenshot(), vec![suite]).await;

    assert!(dir_entries(out.path()).is_empty());
    // the failure still counts even though capture was abandoned
    assert_eq!(report.stats.failures, 1);
}

#[tokio::test]
async fn capture_error_midway_abandons_the_partial_bundle() {
    let out = tempfile::tempdir().unwrap();
    let suite = SuiteNode::new("failure artifacts").test(failing("it failure"));

    let report = run_with_session(
        armed(out.path()),
        FakeSession::failing_browser_log(),
        vec![suite],
    )
    .await;

    assert!(dir_entries(out.path()).is_empty());
    assert_eq!(report.stats.failures, 1);
}

#[tokio::test]
async fn stems_are_sanitized_for_the_filesystem() {
    let out = tempfile::tempdir().unwrap();
    let suite = SuiteNode::new("artifacts").test(failing("path/unsafe: name?"));

    run_with_session(armed(out.path()), FakeSession::new(), vec![suite]).await;

    assert_bundle(out.path(), "artifacts path-unsafe- name-");
}
