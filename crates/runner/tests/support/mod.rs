//! Shared fixtures for the orchestrator integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use testwright_common::{AutomationSession, Error, Result, SuiteNode, TestNode, Verdict};
use testwright_runner::{RunConfig, RunReport, Runner};

/// Minimal in-memory automation session for capture tests.
#[derive(Default)]
pub struct FakeSession {
    /// Fail the very first capture call (screenshot).
    pub fail_screenshot: bool,
    /// Fail partway through the bundle (browser log), after files exist.
    pub fail_browser_log: bool,
}

impl FakeSession {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_screenshot() -> Arc<Self> {
        Arc::new(Self {
            fail_screenshot: true,
            ..Self::default()
        })
    }

    pub fn failing_browser_log() -> Arc<Self> {
        Arc::new(Self {
            fail_browser_log: true,
            ..Self::default()
        })
    }
}

#[async_trait]
impl AutomationSession for FakeSession {
    async fn screenshot(&self) -> Result<Vec<u8>> {
        if self.fail_screenshot {
            return Err(Error::Session("screenshot unavailable".to_string()));
        }
        Ok(vec![0x89, b'P', b'N', b'G'])
    }

    async fn page_source(&self) -> Result<String> {
        Ok("<html><body>fixture page</body></html>".to_string())
    }

    async fn browser_log(&self) -> Result<Vec<String>> {
        if self.fail_browser_log {
            return Err(Error::Session("console log unavailable".to_string()));
        }
        Ok(vec!["[log] fixture console entry".to_string()])
    }

    async fn driver_log(&self) -> Result<Vec<String>> {
        Ok(vec![r#"{"cmd":"navigate","url":"/"}"#.to_string()])
    }
}

pub fn passing(name: &str) -> TestNode {
    TestNode::new(name, |_| async { Verdict::Pass })
}

pub fn failing(name: &str) -> TestNode {
    TestNode::new(name, |_| async { Verdict::Fail("boom".to_string()) })
}

pub fn self_skipping(name: &str) -> TestNode {
    TestNode::new(name, |_| async { Verdict::Skip })
}

/// Fails the first `failures` attempts, then passes. Returns the attempt
/// counter alongside the node.
pub fn flaky(name: &str, failures: usize) -> (TestNode, Arc<AtomicUsize>) {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let node = TestNode::new(name, move |_| {
        let n = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < failures {
                Verdict::Fail(format!("flaky attempt {}", n + 1))
            } else {
                Verdict::Pass
            }
        }
    });
    (node, attempts)
}

/// A runtime-skipping body with an invocation counter.
pub fn counted_skip(name: &str) -> (TestNode, Arc<AtomicUsize>) {
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);
    let node = TestNode::new(name, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Verdict::Skip }
    });
    (node, invocations)
}

/// Mirror of the original acceptance fixture: five passing tests, one tagged
/// `tag1` and one tagged `tag`, markers kept in the test names.
pub fn tag_fixture() -> SuiteNode {
    SuiteNode::new("tags")
        .test(passing("one #tag1").with_tags(&["tag1"]))
        .test(passing("two #tag").with_tags(&["tag"]))
        .test(passing("three"))
        .test(passing("four"))
        .test(passing("five"))
}

/// Three tests, one per role, one anonymous.
pub fn role_fixture() -> SuiteNode {
    SuiteNode::new("roles")
        .test(passing("admin sees the audit log").with_tags(&["role1"]))
        .test(passing("viewer sees the dashboard").with_tags(&["role2"]))
        .test(passing("anonymous sees the landing page"))
}

pub fn tags(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

/// Run `suites` under `config`, panicking on driver-level errors.
pub async fn run(config: RunConfig, mut suites: Vec<SuiteNode>) -> RunReport {
    Runner::new(&config)
        .expect("runner config should be valid")
        .run(&mut suites)
        .await
        .expect("run should complete")
}

/// Same as [`run`], with a session attached for the capturer.
pub async fn run_with_session(
    config: RunConfig,
    session: Arc<FakeSession>,
    mut suites: Vec<SuiteNode>,
) -> RunReport {
    Runner::new(&config)
        .expect("runner config should be valid")
        .with_session(session)
        .run(&mut suites)
        .await
        .expect("run should complete")
}
