//! The discovered test tree
//!
//! Suites own their child suites and tests outright; a node never outlives
//! its parent. The tree is produced once at discovery time and only the
//! execution driver mutates test statuses afterwards.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::session::AutomationSession;
use crate::tags::{tag_set, TagSet};

/// Resolved status of a test node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    /// Not yet run (or never will be: an aborted or deselected node).
    Pending,
    Passed,
    Failed,
    Skipped,
}

/// Outcome of one attempt at a test body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    /// Assertion or runtime failure, with the message the host framework
    /// produced.
    Fail(String),
    /// The body signalled a runtime skip for itself.
    Skip,
}

/// Context handed to every test body and hook invocation.
#[derive(Clone, Default)]
pub struct TestContext {
    /// The attached automation session, when one is active for this run.
    pub session: Option<Arc<dyn AutomationSession>>,
}

type BodyFn = Arc<dyn Fn(TestContext) -> BoxFuture<'static, Verdict> + Send + Sync>;
type HookFn =
    Arc<dyn Fn(TestContext) -> BoxFuture<'static, Result<(), String>> + Send + Sync>;

/// A setup/teardown routine run around tests.
///
/// Not itself a test node, but capable of failing and of triggering
/// failure-artifact capture.
#[derive(Clone)]
pub struct Hook {
    pub label: String,
    body: HookFn,
}

impl Hook {
    pub fn new<F, Fut>(label: impl Into<String>, body: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), String>> + Send + 'static,
    {
        Self {
            label: label.into(),
            body: Arc::new(move |ctx| body(ctx).boxed()),
        }
    }

    pub async fn invoke(&self, ctx: TestContext) -> Result<(), String> {
        (self.body)(ctx).await
    }
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook").field("label", &self.label).finish()
    }
}

/// A leaf test case.
#[derive(Clone)]
pub struct TestNode {
    pub name: String,
    pub tags: TagSet,
    /// Author-declared skip; resolves to `Skipped` without running the body.
    pub skip: bool,
    /// Mutated only by the execution driver.
    pub status: TestStatus,
    body: BodyFn,
}

impl TestNode {
    pub fn new<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Verdict> + Send + 'static,
    {
        Self {
            name: name.into(),
            tags: TagSet::new(),
            skip: false,
            status: TestStatus::Pending,
            body: Arc::new(move |ctx| body(ctx).boxed()),
        }
    }

    pub fn with_tags(mut self, labels: &[&str]) -> Self {
        self.tags.extend(tag_set(labels.iter().copied()));
        self
    }

    pub fn with_skip(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Run one attempt of the body.
    pub async fn invoke(&self, ctx: TestContext) -> Verdict {
        (self.body)(ctx).await
    }
}

impl std::fmt::Debug for TestNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestNode")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("skip", &self.skip)
            .field("status", &self.status)
            .finish()
    }
}

/// A grouping of tests and nested suites, owning both.
#[derive(Debug, Clone, Default)]
pub struct SuiteNode {
    pub name: String,
    /// Inherited by all descendants, merged at selection time.
    pub tags: TagSet,
    /// Author-declared skip; cascades to every descendant test.
    pub skip: bool,
    pub before_each: Vec<Hook>,
    pub after_each: Vec<Hook>,
    pub suites: Vec<SuiteNode>,
    pub tests: Vec<TestNode>,
}

impl SuiteNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_tags(mut self, labels: &[&str]) -> Self {
        self.tags.extend(tag_set(labels.iter().copied()));
        self
    }

    pub fn with_skip(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn test(mut self, test: TestNode) -> Self {
        self.tests.push(test);
        self
    }

    pub fn suite(mut self, suite: SuiteNode) -> Self {
        self.suites.push(suite);
        self
    }

    pub fn before_each<F, Fut>(mut self, label: impl Into<String>, body: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), String>> + Send + 'static,
    {
        self.before_each.push(Hook::new(label, body));
        self
    }

    pub fn after_each<F, Fut>(mut self, label: impl Into<String>, body: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), String>> + Send + 'static,
    {
        self.after_each.push(Hook::new(label, body));
        self
    }

    /// Total number of test nodes in this subtree.
    pub fn len(&self) -> usize {
        self.tests.len() + self.suites.iter().map(SuiteNode::len).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fully-qualified name of a node: ancestor suite names then the node's own
/// name, space-joined. Used for filtering and artifact stems.
pub fn full_name(path: &[String], name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", path.join(" "), name)
    }
}
